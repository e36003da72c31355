//! Contract-side shim for Alder ledger peer chaincode.
//!
//! A chaincode is contract code that an external ledger peer loads and
//! drives through two lifecycle callbacks: `init` on deployment or upgrade
//! and `invoke` once per transaction or query request. Everything hard
//! (consensus, ordering, endorsement, storage, query execution) stays in
//! the peer; this crate is the thin binding a contract sees.
//!
//! ## Call path
//!
//! 1. The peer registers a [`Chaincode`] instance with a [`ContractRegistry`]
//! 2. Incoming requests arrive as raw argument lists; `marshal` decodes them
//!    into an [`Invocation`] (first argument = function name)
//! 3. The registry routes the call to the named contract, which dispatches
//!    on the function name and answers with a [`Response`]
//! 4. The contract reaches the ledger only through the [`ChaincodeStub`]
//!    capability trait; `testing::MemoryStub` supplies a deterministic
//!    in-memory double for tests
//!
//! Calls are independent and stateless. A contract holds no resources
//! across calls and introduces no shared mutable state of its own.

pub mod api;
pub mod contract;
pub mod marshal;
pub mod registry;
pub mod stub;

/// Deterministic test doubles for the host capability surface.
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use api::Invocation;
pub use api::LoggingLevel;
pub use api::Response;
pub use contract::Chaincode;
pub use contract::SampleChaincode;
pub use registry::ContractRegistry;
pub use stub::ChaincodeStub;
pub use stub::HistoryIterator;
pub use stub::StateIterator;
