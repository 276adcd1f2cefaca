//! Process-wide client registry.
//!
//! A process keeps at most one [`InvokeClient`] per `(function name,
//! region)` pair so repeated lookups share one connection pool instead
//! of duplicating it. The registry owns the clients; lookups hand out
//! shared `Arc` references.
//!
//! # Example
//!
//! ```rust
//! use quipu_invoke::registry::shared_client;
//!
//! # fn example() -> Result<(), quipu_invoke::Error> {
//! let a = shared_client("sigma-inference", "us-east-1")?;
//! let b = shared_client("sigma-inference", "us-east-1")?;
//! assert!(std::sync::Arc::ptr_eq(&a, &b));
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use crate::client::InvokeClient;
use crate::config::InvokeConfig;
use crate::error::Result;

type RegistryKey = (String, String);
type Registry = Mutex<HashMap<RegistryKey, Arc<InvokeClient>>>;

static REGISTRY: OnceLock<Registry> = OnceLock::new();

fn registry() -> &'static Registry {
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Shared client for `function_name` in `region`, with default
/// configuration.
///
/// The first lookup for a key constructs the client; every later lookup
/// returns the same instance.
///
/// # Errors
///
/// Returns [`crate::Error::InvalidInput`] when the function name is
/// empty.
pub fn shared_client(function_name: &str, region: &str) -> Result<Arc<InvokeClient>> {
    shared_client_with_config(function_name, region, InvokeConfig::new())
}

/// Shared client for `function_name` in `region`.
///
/// `config` is applied only when this call creates the client; a key
/// that is already registered keeps its original configuration.
///
/// # Errors
///
/// Returns [`crate::Error::InvalidInput`] when the function name is
/// empty.
pub fn shared_client_with_config(
    function_name: &str,
    region: &str,
    config: InvokeConfig,
) -> Result<Arc<InvokeClient>> {
    let mut clients = registry().lock();
    let key = (function_name.to_string(), region.to_string());
    if let Some(client) = clients.get(&key) {
        return Ok(Arc::clone(client));
    }
    let client = Arc::new(InvokeClient::with_region(function_name, region)?.with_config(config));
    clients.insert(key, Arc::clone(&client));
    Ok(client)
}
