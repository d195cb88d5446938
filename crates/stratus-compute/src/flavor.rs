//! Server flavors

use serde::Deserialize;
use serde_json::Value;

/// A hardware configuration. Flavors are read-only; there is nothing to
/// refresh or wait on.
#[derive(Debug, Clone, Deserialize)]
pub struct Flavor {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub ram: u64,
    #[serde(default)]
    pub vcpus: u64,
    #[serde(default)]
    pub disk: u64,
    // The API reports swap as a number or as an empty string.
    #[serde(default)]
    pub swap: Option<Value>,
}

impl Flavor {
    /// Swap in MB, treating the API's empty-string form as none.
    pub fn swap_mb(&self) -> Option<u64> {
        self.swap.as_ref().and_then(Value::as_u64)
    }
}
