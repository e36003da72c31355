//! Contract registration and lifecycle routing.
//!
//! The peer's execution environment owns a [`ContractRegistry`]. Starting a
//! contract means registering an instance under its name; from then on the
//! peer drives it exclusively through [`ContractRegistry::dispatch_init`]
//! and [`ContractRegistry::dispatch_invoke`] with the raw argument list it
//! received from the client.
//!
//! ## Error posture
//!
//! Routing never panics and never returns a Rust error to the peer. Decode
//! failures and unknown contract names come back as failure responses, so
//! the peer can surface them to the caller the same way it surfaces a
//! contract's own failures.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;
use tracing::warn;

use crate::api::Response;
use crate::contract::Chaincode;
use crate::marshal;
use crate::stub::ChaincodeStub;

/// Registry of contract instances keyed by contract name.
pub struct ContractRegistry {
    contracts: RwLock<HashMap<String, Arc<dyn Chaincode>>>,
}

impl Default for ContractRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ContractRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            contracts: RwLock::new(HashMap::new()),
        }
    }

    /// Register a contract instance under its own name.
    ///
    /// Re-registering a name replaces the previous instance; this is the
    /// upgrade path, and the peer calls `dispatch_init` again afterwards.
    pub async fn register(&self, contract: Arc<dyn Chaincode>) {
        let name = contract.name().to_string();
        let mut contracts = self.contracts.write().await;
        if contracts.insert(name.clone(), contract).is_some() {
            info!(contract = %name, "contract instance replaced");
        } else {
            info!(contract = %name, "contract registered");
        }
    }

    /// Remove a contract. Returns `true` if it was registered.
    pub async fn deregister(&self, name: &str) -> bool {
        let removed = self.contracts.write().await.remove(name).is_some();
        if removed {
            info!(contract = %name, "contract deregistered");
        }
        removed
    }

    /// Route a deployment/upgrade call to the named contract.
    pub async fn dispatch_init(
        &self,
        name: &str,
        stub: &dyn ChaincodeStub,
        raw_args: &[Vec<u8>],
    ) -> Response {
        let (contract, invocation) = match self.resolve(name, raw_args).await {
            Ok(pair) => pair,
            Err(response) => return response,
        };
        info!(contract = %name, function = %invocation.function, "dispatching init");
        contract.init(stub, invocation).await
    }

    /// Route a transaction or query request to the named contract.
    pub async fn dispatch_invoke(
        &self,
        name: &str,
        stub: &dyn ChaincodeStub,
        raw_args: &[Vec<u8>],
    ) -> Response {
        let (contract, invocation) = match self.resolve(name, raw_args).await {
            Ok(pair) => pair,
            Err(response) => return response,
        };
        contract.invoke(stub, invocation).await
    }

    /// Number of registered contracts.
    pub async fn len(&self) -> usize {
        self.contracts.read().await.len()
    }

    /// Whether any contracts are registered.
    pub async fn is_empty(&self) -> bool {
        self.contracts.read().await.is_empty()
    }

    /// Look up a contract and decode its arguments, converting both failure
    /// modes into the response the peer should forward.
    async fn resolve(
        &self,
        name: &str,
        raw_args: &[Vec<u8>],
    ) -> Result<(Arc<dyn Chaincode>, crate::api::Invocation), Response> {
        let Some(contract) = self.contracts.read().await.get(name).cloned() else {
            warn!(contract = %name, "dispatch to unknown contract");
            return Err(Response::failure(format!("unknown contract '{name}'")));
        };
        match marshal::invocation_from_args(raw_args) {
            Ok(invocation) => Ok((contract, invocation)),
            Err(e) => {
                warn!(contract = %name, error = %e, "invalid dispatch arguments");
                Err(Response::failure(format!("invalid arguments: {e}")))
            }
        }
    }
}
