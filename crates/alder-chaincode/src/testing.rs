//! Deterministic in-memory test double for the host capability surface.
//!
//! [`MemoryStub`] implements [`ChaincodeStub`] with no host process behind
//! it: BTreeMap-backed public state (so range queries come back in key
//! order), per-collection private state, a recorded history of every write
//! and delete, canned rich-query results keyed by selector string, canned
//! cross-contract responses keyed by (channel, contract), and recorded
//! events and logging level.
//!
//! Rich-query execution and cross-contract routing belong to the real peer;
//! the double answers them from whatever was registered up front with the
//! `with_*` builders, which keeps tests deterministic and free of any query
//! engine.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::ops::Bound;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;

use crate::api::ContractEvent;
use crate::api::KeyModification;
use crate::api::KvPair;
use crate::api::LoggingLevel;
use crate::api::QueryMetadata;
use crate::api::Response;
use crate::stub::ChaincodeStub;
use crate::stub::HistoryIterator;
use crate::stub::StateIterator;
use crate::stub::clamp_page_size;
use crate::stub::validate_collection;
use crate::stub::validate_event_name;
use crate::stub::validate_key;

#[derive(Default)]
struct StubState {
    state: BTreeMap<String, Vec<u8>>,
    collections: HashMap<String, BTreeMap<String, Vec<u8>>>,
    history: HashMap<String, Vec<KeyModification>>,
    canned_queries: HashMap<String, Vec<KvPair>>,
    canned_invocations: HashMap<(String, String), Response>,
    committed_events: Vec<ContractEvent>,
    pending_event: Option<ContractEvent>,
    logging_level: Option<LoggingLevel>,
    tx_counter: u64,
    clock_ms: u64,
}

impl StubState {
    /// Record one modification of a public key. Every modification gets a
    /// fresh transaction id and a strictly increasing timestamp.
    fn record(&mut self, key: &str, value: Option<&[u8]>) {
        self.tx_counter += 1;
        self.clock_ms += 1;
        let entry = KeyModification {
            tx_id: hex::encode(self.tx_counter.to_be_bytes()),
            value: value.map(<[u8]>::to_vec).unwrap_or_default(),
            timestamp_ms: self.clock_ms,
            is_delete: value.is_none(),
        };
        self.history.entry(key.to_string()).or_default().push(entry);
    }

    fn range_rows(&self, start_key: &str, end_key: &str) -> impl Iterator<Item = KvPair> + '_ {
        let lower = if start_key.is_empty() {
            Bound::Unbounded
        } else {
            Bound::Included(start_key.to_string())
        };
        let upper = if end_key.is_empty() {
            Bound::Unbounded
        } else {
            Bound::Excluded(end_key.to_string())
        };
        self.state.range((lower, upper)).map(|(key, value)| KvPair {
            key: key.clone(),
            value: value.clone(),
        })
    }
}

/// In-memory [`ChaincodeStub`] with canned query and cross-contract answers.
#[derive(Default)]
pub struct MemoryStub {
    inner: Mutex<StubState>,
}

impl MemoryStub {
    /// Create an empty stub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the rows a rich query for `selector` should return.
    pub fn with_query_result(self, selector: impl Into<String>, rows: Vec<KvPair>) -> Self {
        if let Ok(mut inner) = self.inner.lock() {
            inner.canned_queries.insert(selector.into(), rows);
        }
        self
    }

    /// Register the response a cross-contract call should return.
    pub fn with_chaincode_response(
        self,
        channel: impl Into<String>,
        contract: impl Into<String>,
        response: Response,
    ) -> Self {
        if let Ok(mut inner) = self.inner.lock() {
            inner
                .canned_invocations
                .insert((channel.into(), contract.into()), response);
        }
        self
    }

    /// Advance the transaction boundary, committing any pending event.
    ///
    /// The real peer commits at most one event per transaction; tests call
    /// this between simulated transactions to observe that behavior.
    pub fn begin_tx(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            if let Some(event) = inner.pending_event.take() {
                inner.committed_events.push(event);
            }
        }
    }

    /// All emitted events, committed ones first and the current
    /// transaction's pending event (if any) last.
    pub fn events(&self) -> Vec<ContractEvent> {
        let Ok(inner) = self.inner.lock() else {
            return Vec::new();
        };
        let mut events = inner.committed_events.clone();
        events.extend(inner.pending_event.clone());
        events
    }

    /// The most recently set logging level, if any.
    pub fn logging_level(&self) -> Option<LoggingLevel> {
        self.inner.lock().ok().and_then(|inner| inner.logging_level)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, StubState>> {
        self.inner.lock().map_err(|e| anyhow::anyhow!("stub mutex poisoned: {e}"))
    }
}

#[async_trait]
impl ChaincodeStub for MemoryStub {
    async fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>> {
        validate_key(key).map_err(anyhow::Error::msg)?;
        Ok(self.lock()?.state.get(key).cloned())
    }

    async fn put_state(&self, key: &str, value: &[u8]) -> Result<()> {
        validate_key(key).map_err(anyhow::Error::msg)?;
        let mut inner = self.lock()?;
        inner.state.insert(key.to_string(), value.to_vec());
        inner.record(key, Some(value));
        Ok(())
    }

    async fn delete_state(&self, key: &str) -> Result<()> {
        validate_key(key).map_err(anyhow::Error::msg)?;
        let mut inner = self.lock()?;
        inner.state.remove(key);
        inner.record(key, None);
        Ok(())
    }

    async fn get_private_data(&self, collection: &str, key: &str) -> Result<Option<Vec<u8>>> {
        validate_collection(collection).map_err(anyhow::Error::msg)?;
        validate_key(key).map_err(anyhow::Error::msg)?;
        let inner = self.lock()?;
        Ok(inner
            .collections
            .get(collection)
            .and_then(|kv| kv.get(key))
            .cloned())
    }

    async fn put_private_data(&self, collection: &str, key: &str, value: &[u8]) -> Result<()> {
        validate_collection(collection).map_err(anyhow::Error::msg)?;
        validate_key(key).map_err(anyhow::Error::msg)?;
        let mut inner = self.lock()?;
        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn delete_private_data(&self, collection: &str, key: &str) -> Result<()> {
        validate_collection(collection).map_err(anyhow::Error::msg)?;
        validate_key(key).map_err(anyhow::Error::msg)?;
        let mut inner = self.lock()?;
        if let Some(kv) = inner.collections.get_mut(collection) {
            kv.remove(key);
        }
        Ok(())
    }

    async fn get_state_by_range(&self, start_key: &str, end_key: &str) -> Result<StateIterator> {
        let inner = self.lock()?;
        let rows: Vec<KvPair> = inner.range_rows(start_key, end_key).collect();
        Ok(StateIterator::from_entries(rows))
    }

    async fn get_state_by_range_with_pagination(
        &self,
        start_key: &str,
        end_key: &str,
        page_size: u32,
        bookmark: &str,
    ) -> Result<(StateIterator, QueryMetadata)> {
        let inner = self.lock()?;
        // A bookmark narrows the lower bound to where the previous page left off.
        let effective_start = if bookmark.is_empty() { start_key } else { bookmark };
        let rows = inner.range_rows(effective_start, end_key);
        Ok(paginate(rows, page_size))
    }

    async fn get_query_result(&self, selector: &str) -> Result<StateIterator> {
        let inner = self.lock()?;
        match inner.canned_queries.get(selector) {
            Some(rows) => Ok(StateIterator::from_entries(rows.clone())),
            None => Ok(StateIterator::empty()),
        }
    }

    async fn get_query_result_with_pagination(
        &self,
        selector: &str,
        page_size: u32,
        bookmark: &str,
    ) -> Result<(StateIterator, QueryMetadata)> {
        let inner = self.lock()?;
        let rows = inner
            .canned_queries
            .get(selector)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .skip_while(|row| !bookmark.is_empty() && row.key.as_str() < bookmark);
        Ok(paginate(rows, page_size))
    }

    async fn get_history_for_key(&self, key: &str) -> Result<HistoryIterator> {
        validate_key(key).map_err(anyhow::Error::msg)?;
        let inner = self.lock()?;
        let rows = inner.history.get(key).cloned().unwrap_or_default();
        Ok(HistoryIterator::from_entries(rows))
    }

    async fn set_event(&self, name: &str, payload: &[u8]) -> Result<()> {
        validate_event_name(name).map_err(anyhow::Error::msg)?;
        let mut inner = self.lock()?;
        inner.pending_event = Some(ContractEvent {
            name: name.to_string(),
            payload: payload.to_vec(),
        });
        Ok(())
    }

    async fn invoke_chaincode(&self, contract: &str, _args: &[Vec<u8>], channel: &str) -> Response {
        let Ok(inner) = self.inner.lock() else {
            return Response::failure("stub mutex poisoned");
        };
        match inner
            .canned_invocations
            .get(&(channel.to_string(), contract.to_string()))
        {
            Some(response) => response.clone(),
            None => Response::failure(format!("no contract '{contract}' on channel '{channel}'")),
        }
    }

    fn set_logging_level(&self, level: LoggingLevel) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.logging_level = Some(level);
        }
    }
}

/// Take one page from a row sequence and build its metadata.
///
/// The bookmark is the key of the first row beyond the page, so feeding it
/// back as the next lower bound resumes exactly where this page ended.
fn paginate(rows: impl Iterator<Item = KvPair>, page_size: u32) -> (StateIterator, QueryMetadata) {
    let page_size = clamp_page_size(page_size) as usize;
    let mut page = Vec::with_capacity(page_size.min(64));
    let mut bookmark = String::new();
    for row in rows {
        if page.len() == page_size {
            bookmark = row.key;
            break;
        }
        page.push(row);
    }
    let metadata = QueryMetadata {
        fetched_count: page.len() as u32,
        bookmark,
    };
    (StateIterator::from_entries(page), metadata)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(key: &str, value: &[u8]) -> KvPair {
        KvPair {
            key: key.to_string(),
            value: value.to_vec(),
        }
    }

    #[tokio::test]
    async fn state_roundtrip() {
        let stub = MemoryStub::new();
        stub.put_state("key", b"value").await.unwrap();
        assert_eq!(stub.get_state("key").await.unwrap(), Some(b"value".to_vec()));
        stub.delete_state("key").await.unwrap();
        assert_eq!(stub.get_state("key").await.unwrap(), None);
    }

    #[tokio::test]
    async fn deleting_an_absent_key_succeeds() {
        let stub = MemoryStub::new();
        stub.delete_state("ghost").await.unwrap();
    }

    #[tokio::test]
    async fn empty_key_is_rejected_before_any_write() {
        let stub = MemoryStub::new();
        assert!(stub.put_state("", b"v").await.is_err());
        assert!(stub.get_state("").await.is_err());
    }

    #[tokio::test]
    async fn collections_are_disjoint_namespaces() {
        let stub = MemoryStub::new();
        stub.put_state("key", b"public").await.unwrap();
        stub.put_private_data("alpha", "key", b"a").await.unwrap();
        stub.put_private_data("beta", "key", b"b").await.unwrap();

        assert_eq!(stub.get_state("key").await.unwrap(), Some(b"public".to_vec()));
        assert_eq!(stub.get_private_data("alpha", "key").await.unwrap(), Some(b"a".to_vec()));
        assert_eq!(stub.get_private_data("beta", "key").await.unwrap(), Some(b"b".to_vec()));

        stub.delete_private_data("alpha", "key").await.unwrap();
        assert_eq!(stub.get_private_data("alpha", "key").await.unwrap(), None);
        assert_eq!(stub.get_private_data("beta", "key").await.unwrap(), Some(b"b".to_vec()));
    }

    #[tokio::test]
    async fn range_is_half_open_and_ordered() {
        let stub = MemoryStub::new();
        for key in ["d", "b", "a", "c", "e"] {
            stub.put_state(key, key.as_bytes()).await.unwrap();
        }
        let keys: Vec<String> =
            stub.get_state_by_range("b", "d").await.unwrap().map(|row| row.key).collect();
        assert_eq!(keys, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn empty_bounds_leave_the_range_open() {
        let stub = MemoryStub::new();
        for key in ["b", "a", "c"] {
            stub.put_state(key, b"v").await.unwrap();
        }
        let keys: Vec<String> =
            stub.get_state_by_range("", "").await.unwrap().map(|row| row.key).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn pagination_walks_the_range_in_pages() {
        let stub = MemoryStub::new();
        for key in ["k1", "k2", "k3", "k4", "k5"] {
            stub.put_state(key, b"v").await.unwrap();
        }

        let (page, meta) = stub.get_state_by_range_with_pagination("", "", 2, "").await.unwrap();
        assert_eq!(page.map(|row| row.key).collect::<Vec<_>>(), vec!["k1", "k2"]);
        assert_eq!(meta.fetched_count, 2);
        assert_eq!(meta.bookmark, "k3");

        let (page, meta) =
            stub.get_state_by_range_with_pagination("", "", 2, &meta.bookmark).await.unwrap();
        assert_eq!(page.map(|row| row.key).collect::<Vec<_>>(), vec!["k3", "k4"]);
        assert_eq!(meta.bookmark, "k5");

        let (page, meta) =
            stub.get_state_by_range_with_pagination("", "", 2, &meta.bookmark).await.unwrap();
        assert_eq!(page.map(|row| row.key).collect::<Vec<_>>(), vec!["k5"]);
        assert_eq!(meta.fetched_count, 1);
        assert_eq!(meta.bookmark, "", "final page carries an empty bookmark");
    }

    #[tokio::test]
    async fn zero_page_size_uses_the_default() {
        let stub = MemoryStub::new();
        stub.put_state("k", b"v").await.unwrap();
        let (page, meta) = stub.get_state_by_range_with_pagination("", "", 0, "").await.unwrap();
        assert_eq!(page.count(), 1);
        assert_eq!(meta.fetched_count, 1);
    }

    #[tokio::test]
    async fn rich_query_answers_from_canned_rows() {
        let selector = r#"{"selector":{"age":"20"}}"#;
        let stub = MemoryStub::new()
            .with_query_result(selector, vec![pair("person:1", b"alice"), pair("person:2", b"bob")]);

        let rows: Vec<KvPair> = stub.get_query_result(selector).await.unwrap().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].key, "person:1");

        let mut unknown = stub.get_query_result("{}").await.unwrap();
        assert!(!unknown.has_next());
    }

    #[tokio::test]
    async fn rich_query_pagination_resumes_from_bookmark() {
        let selector = "sql";
        let stub = MemoryStub::new().with_query_result(
            selector,
            vec![pair("r1", b"1"), pair("r2", b"2"), pair("r3", b"3")],
        );

        let (page, meta) = stub.get_query_result_with_pagination(selector, 2, "").await.unwrap();
        assert_eq!(page.map(|row| row.key).collect::<Vec<_>>(), vec!["r1", "r2"]);
        assert_eq!(meta.bookmark, "r3");

        let (page, meta) =
            stub.get_query_result_with_pagination(selector, 2, &meta.bookmark).await.unwrap();
        assert_eq!(page.map(|row| row.key).collect::<Vec<_>>(), vec!["r3"]);
        assert_eq!(meta.bookmark, "");
    }

    #[tokio::test]
    async fn history_records_writes_and_deletes_in_order() {
        let stub = MemoryStub::new();
        stub.put_state("key", b"v1").await.unwrap();
        stub.put_state("key", b"v2").await.unwrap();
        stub.delete_state("key").await.unwrap();

        let rows: Vec<KeyModification> = stub.get_history_for_key("key").await.unwrap().collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].value, b"v1");
        assert_eq!(rows[1].value, b"v2");
        assert!(rows[2].is_delete);
        assert!(rows[0].timestamp_ms < rows[1].timestamp_ms);
        assert_ne!(rows[0].tx_id, rows[1].tx_id);
        assert_ne!(rows[1].tx_id, rows[2].tx_id);
    }

    #[tokio::test]
    async fn history_of_an_untouched_key_is_empty() {
        let stub = MemoryStub::new();
        let mut rows = stub.get_history_for_key("ghost").await.unwrap();
        assert!(!rows.has_next());
    }

    #[tokio::test]
    async fn later_event_replaces_earlier_within_a_transaction() {
        let stub = MemoryStub::new();
        stub.set_event("First", b"1").await.unwrap();
        stub.set_event("Second", b"2").await.unwrap();

        let events = stub.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "Second");

        stub.begin_tx();
        stub.set_event("Third", b"3").await.unwrap();
        let events = stub.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].name, "Second");
        assert_eq!(events[1].name, "Third");
    }

    #[tokio::test]
    async fn cross_contract_call_returns_the_canned_response() {
        let stub = MemoryStub::new().with_chaincode_response(
            "main",
            "tokens",
            Response::success(b"ten".to_vec()),
        );

        let args = vec![b"invoke".to_vec(), b"transfer".to_vec(), b"a".to_vec()];
        let response = stub.invoke_chaincode("tokens", &args, "main").await;
        assert_eq!(response.payload(), Some(b"ten".as_slice()));

        let response = stub.invoke_chaincode("tokens", &args, "other").await;
        assert!(!response.is_ok(), "unknown channel should fail");
    }

    #[tokio::test]
    async fn logging_level_is_recorded() {
        let stub = MemoryStub::new();
        assert_eq!(stub.logging_level(), None);
        stub.set_logging_level(LoggingLevel::Debug);
        assert_eq!(stub.logging_level(), Some(LoggingLevel::Debug));
    }
}
