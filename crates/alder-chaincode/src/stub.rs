//! Host capability surface for contracts.
//!
//! [`ChaincodeStub`] is the contract's only view of the peer: key/value
//! state, private-data collections, range and rich queries with optional
//! pagination, per-key history, event emission, cross-contract invocation,
//! and a logging-level setter. Durability, consensus, endorsement, and query
//! execution all live behind the trait in the host process; a contract never
//! allocates or caches any of the resources it reaches through here.
//!
//! ## Iterator model
//!
//! Range, rich-query, and history results come back as a
//! [`ResultIterator`]: a forward-only, one-shot, finite sequence with
//! explicit exhaustion signaling via [`ResultIterator::has_next`]. Hosts may
//! feed it lazily; consumers drain it at most once and then drop it.

use anyhow::Result;
use async_trait::async_trait;
use tracing::warn;

use crate::api::DEFAULT_PAGE_SIZE;
use crate::api::KeyModification;
use crate::api::KvPair;
use crate::api::LoggingLevel;
use crate::api::MAX_EVENT_NAME_LEN;
use crate::api::MAX_KEY_LEN;
use crate::api::MAX_PAGE_SIZE;
use crate::api::QueryMetadata;
use crate::api::Response;

/// Forward-only iterator over host-owned query results.
///
/// Wraps whatever sequence the host produced. `has_next` peeks without
/// consuming, so callers can mirror the `hasNext`/`next` loop shape the peer
/// API documents while still using ordinary `Iterator` combinators.
pub struct ResultIterator<T> {
    inner: std::iter::Peekable<Box<dyn Iterator<Item = T> + Send>>,
}

impl<T: Send + 'static> ResultIterator<T> {
    /// Wrap a host-produced sequence.
    pub fn new(inner: impl Iterator<Item = T> + Send + 'static) -> Self {
        let boxed: Box<dyn Iterator<Item = T> + Send> = Box::new(inner);
        Self {
            inner: boxed.peekable(),
        }
    }

    /// Wrap an already materialized result set.
    pub fn from_entries(entries: Vec<T>) -> Self {
        Self::new(entries.into_iter())
    }

    /// An exhausted iterator.
    pub fn empty() -> Self {
        Self::new(std::iter::empty())
    }

    /// Whether another row is available.
    pub fn has_next(&mut self) -> bool {
        self.inner.peek().is_some()
    }
}

impl<T> Iterator for ResultIterator<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.inner.next()
    }
}

/// Iterator over range and rich-query rows.
pub type StateIterator = ResultIterator<KvPair>;

/// Iterator over per-key history rows.
pub type HistoryIterator = ResultIterator<KeyModification>;

/// The peer-provided state access API a contract calls into.
///
/// One instance is handed to the contract per lifecycle call and must be
/// treated as scoped to that call. Implementations are host bindings or test
/// doubles; the dispatcher never depends on a concrete runtime.
#[async_trait]
pub trait ChaincodeStub: Send + Sync {
    /// Read a key from public world state. `None` if absent.
    async fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Write a key into public world state.
    async fn put_state(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Delete a key from public world state. Deleting an absent key succeeds.
    async fn delete_state(&self, key: &str) -> Result<()>;

    /// Read a key from a named private-data collection.
    async fn get_private_data(&self, collection: &str, key: &str) -> Result<Option<Vec<u8>>>;

    /// Write a key into a named private-data collection.
    async fn put_private_data(&self, collection: &str, key: &str, value: &[u8]) -> Result<()>;

    /// Delete a key from a named private-data collection.
    async fn delete_private_data(&self, collection: &str, key: &str) -> Result<()>;

    /// Query public state over the key range `[start_key, end_key)`.
    ///
    /// An empty bound string leaves that side of the range open. Rows come
    /// back in key order; useful only when keys sort meaningfully.
    async fn get_state_by_range(&self, start_key: &str, end_key: &str) -> Result<StateIterator>;

    /// Paginated variant of [`ChaincodeStub::get_state_by_range`].
    ///
    /// `page_size` zero selects the default page size; an empty `bookmark`
    /// starts from the beginning of the range. The returned metadata carries
    /// the bookmark for the next page, empty once exhausted.
    async fn get_state_by_range_with_pagination(
        &self,
        start_key: &str,
        end_key: &str,
        page_size: u32,
        bookmark: &str,
    ) -> Result<(StateIterator, QueryMetadata)>;

    /// Run a rich query from a selector document string.
    ///
    /// The selector is opaque to the contract; execution and indexing are
    /// entirely the host's concern.
    async fn get_query_result(&self, selector: &str) -> Result<StateIterator>;

    /// Paginated variant of [`ChaincodeStub::get_query_result`].
    async fn get_query_result_with_pagination(
        &self,
        selector: &str,
        page_size: u32,
        bookmark: &str,
    ) -> Result<(StateIterator, QueryMetadata)>;

    /// All committed modifications of a key, oldest first.
    async fn get_history_for_key(&self, key: &str) -> Result<HistoryIterator>;

    /// Emit an event that surfaces to subscribers once the transaction
    /// commits. At most one event survives per transaction; a later call
    /// replaces an earlier one.
    async fn set_event(&self, name: &str, payload: &[u8]) -> Result<()>;

    /// Synchronously invoke another contract on a channel.
    ///
    /// The target's response comes back verbatim, success or failure.
    async fn invoke_chaincode(&self, contract: &str, args: &[Vec<u8>], channel: &str) -> Response;

    /// Set the host-side log severity floor for this contract.
    fn set_logging_level(&self, level: LoggingLevel);
}

/// Validate a state key before any host call.
///
/// Fail-fast before I/O; violations come back as messages suitable for a
/// failure response.
pub fn validate_key(key: &str) -> Result<(), String> {
    if key.is_empty() {
        let msg = "state key must not be empty".to_string();
        warn!("{}", msg);
        return Err(msg);
    }
    if key.len() > MAX_KEY_LEN {
        let msg = format!("state key too long: {} bytes (max {})", key.len(), MAX_KEY_LEN);
        warn!("{}", msg);
        return Err(msg);
    }
    Ok(())
}

/// Validate a private-data collection name.
pub fn validate_collection(collection: &str) -> Result<(), String> {
    if collection.is_empty() {
        let msg = "collection name must not be empty".to_string();
        warn!("{}", msg);
        return Err(msg);
    }
    Ok(())
}

/// Validate an event name before emission.
pub fn validate_event_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        let msg = "event name must not be empty".to_string();
        warn!("{}", msg);
        return Err(msg);
    }
    if name.len() > MAX_EVENT_NAME_LEN {
        let msg = format!("event name too long: {} bytes (max {})", name.len(), MAX_EVENT_NAME_LEN);
        warn!("{}", msg);
        return Err(msg);
    }
    Ok(())
}

/// Clamp a requested page size to the configured bounds.
///
/// Zero selects the default page size.
pub fn clamp_page_size(page_size: u32) -> u32 {
    if page_size == 0 {
        DEFAULT_PAGE_SIZE
    } else {
        page_size.min(MAX_PAGE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iterator_signals_exhaustion_explicitly() {
        let mut iter = StateIterator::from_entries(vec![KvPair {
            key: "a".to_string(),
            value: b"1".to_vec(),
        }]);
        assert!(iter.has_next());
        assert!(iter.next().is_some());
        assert!(!iter.has_next());
        assert!(iter.next().is_none());
    }

    #[test]
    fn empty_iterator_is_exhausted() {
        let mut iter = StateIterator::empty();
        assert!(!iter.has_next());
        assert!(iter.next().is_none());
    }

    #[test]
    fn has_next_does_not_consume() {
        let mut iter = ResultIterator::from_entries(vec![1u32, 2, 3]);
        assert!(iter.has_next());
        assert!(iter.has_next());
        assert_eq!(iter.next(), Some(1));
        assert_eq!(iter.collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn wraps_lazy_sequences() {
        let mut iter = ResultIterator::new((0u32..3).map(|n| n * 2));
        assert!(iter.has_next());
        assert_eq!(iter.next(), Some(0));
        assert_eq!(iter.next(), Some(2));
        assert_eq!(iter.next(), Some(4));
        assert!(!iter.has_next());
    }

    #[test]
    fn empty_key_is_rejected() {
        assert!(validate_key("").is_err());
        assert!(validate_key("k").is_ok());
    }

    #[test]
    fn oversized_key_is_rejected() {
        let key = "k".repeat(MAX_KEY_LEN + 1);
        assert!(validate_key(&key).is_err());
        assert!(validate_key(&key[..MAX_KEY_LEN]).is_ok());
    }

    #[test]
    fn empty_collection_is_rejected() {
        assert!(validate_collection("").is_err());
        assert!(validate_collection("private").is_ok());
    }

    #[test]
    fn oversized_event_name_is_rejected() {
        let name = "e".repeat(MAX_EVENT_NAME_LEN + 1);
        assert!(validate_event_name(&name).is_err());
        assert!(validate_event_name("InitEvent").is_ok());
        assert!(validate_event_name("").is_err());
    }

    #[test]
    fn page_size_clamps_to_bounds() {
        assert_eq!(clamp_page_size(0), DEFAULT_PAGE_SIZE);
        assert_eq!(clamp_page_size(10), 10);
        assert_eq!(clamp_page_size(MAX_PAGE_SIZE + 1), MAX_PAGE_SIZE);
    }
}
