//! Contract lifecycle trait and the sample dispatcher.
//!
//! A [`Chaincode`] receives two lifecycle callbacks from the peer: `init` on
//! deployment or upgrade, and `invoke` once per transaction or query
//! request. Both take the host capability surface and the decoded
//! invocation, and both report their outcome as a [`Response`] rather than
//! an error; the peer surfaces whatever status comes back, verbatim.
//!
//! [`SampleChaincode`] is the reference contract: a flat dispatch over a
//! closed set of function names with a default fallthrough. Calls are
//! independent and stateless; there is no sequencing constraint between
//! them and no shared state across them.

use async_trait::async_trait;
use tracing::debug;
use tracing::info;

use crate::api::Invocation;
use crate::api::Response;
use crate::stub::ChaincodeStub;

/// Fixed payload returned by the sample contract's read-only handler.
pub const QUERY_PAYLOAD: &[u8] = b"value";

/// A contract loadable by the peer runtime.
#[async_trait]
pub trait Chaincode: Send + Sync {
    /// Contract name used for registration and cross-contract routing.
    fn name(&self) -> &str;

    /// Called once per deployment or upgrade.
    async fn init(&self, stub: &dyn ChaincodeStub, invocation: Invocation) -> Response;

    /// Called once per transaction or query request.
    async fn invoke(&self, stub: &dyn ChaincodeStub, invocation: Invocation) -> Response;
}

/// The closed set of operations the sample contract dispatches on.
///
/// Resolution is an exact, case-sensitive match; anything else (including
/// the empty string) maps to `None` and falls through to the default
/// response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// State-changing transaction intended for commit.
    Invoke,
    /// Read-only call, never submitted to the ledger.
    Query,
}

impl Operation {
    /// Resolve a function name to a known operation.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "invoke" => Some(Self::Invoke),
            "query" => Some(Self::Query),
            _ => None,
        }
    }
}

/// Reference contract with intentionally empty handlers.
///
/// `init` echoes what it received and succeeds. `invoke` routes `"invoke"`
/// to a no-op transactional handler and `"query"` to a handler returning
/// [`QUERY_PAYLOAD`]; unrecognized names succeed with an empty payload.
/// The handlers stay stubs on purpose, so the full call path can be
/// exercised without any business semantics attached.
#[derive(Debug, Default)]
pub struct SampleChaincode;

#[async_trait]
impl Chaincode for SampleChaincode {
    fn name(&self) -> &str {
        "sample"
    }

    async fn init(&self, _stub: &dyn ChaincodeStub, invocation: Invocation) -> Response {
        // Observability only. Init owns no state, so repeated calls with
        // different arguments never change anything.
        info!(
            function = %invocation.function,
            args = ?invocation.args,
            "contract init"
        );
        Response::success_empty()
    }

    async fn invoke(&self, stub: &dyn ChaincodeStub, invocation: Invocation) -> Response {
        match Operation::from_name(&invocation.function) {
            Some(Operation::Invoke) => self.apply(stub, &invocation.args).await,
            Some(Operation::Query) => self.read(stub, &invocation.args).await,
            None => {
                debug!(function = %invocation.function, "no handler, returning default success");
                Response::success_empty()
            }
        }
    }
}

impl SampleChaincode {
    /// Transactional handler. Accepts any argument list, performs no
    /// operation, and succeeds with an empty payload.
    async fn apply(&self, _stub: &dyn ChaincodeStub, _args: &[String]) -> Response {
        Response::success_empty()
    }

    /// Read-only handler. Ignores its arguments and returns a fixed payload.
    async fn read(&self, _stub: &dyn ChaincodeStub, _args: &[String]) -> Response {
        Response::success(QUERY_PAYLOAD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_operations_resolve() {
        assert_eq!(Operation::from_name("invoke"), Some(Operation::Invoke));
        assert_eq!(Operation::from_name("query"), Some(Operation::Query));
    }

    #[test]
    fn resolution_is_case_sensitive() {
        assert_eq!(Operation::from_name("Invoke"), None);
        assert_eq!(Operation::from_name("Query"), None);
        assert_eq!(Operation::from_name("QUERY"), None);
    }

    #[test]
    fn unknown_and_empty_names_do_not_resolve() {
        assert_eq!(Operation::from_name(""), None);
        assert_eq!(Operation::from_name("transfer"), None);
        assert_eq!(Operation::from_name("invoke "), None);
    }
}
