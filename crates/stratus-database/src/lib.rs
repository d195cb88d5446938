//! Managed database instances for the Stratus cloud API
//!
//! [`Databases`] carries the instance lifecycle; [`Instance`] carries the
//! per-instance database and user management plus the actions. Status waits
//! on this service compare case-insensitively because the API mixes
//! `ACTIVE` and `active`.

pub mod api;
pub mod instance;
pub mod types;

// Re-exports
pub use api::{CreateInstanceOptions, Databases};
pub use instance::{Instance, InstanceDetail};
pub use types::{Database, DatabaseRef, DatabaseSpec, DatabaseUser, UserSpec};

#[cfg(test)]
pub(crate) mod tests {
    use stratus_client::{
        Client, Endpoint, ServiceCatalog, ServiceCatalogEntry, Session, Token,
    };

    /// A client whose catalog resolves the database endpoint without ever
    /// touching the network.
    pub(crate) fn offline_client() -> Client {
        Client::from_session(Session {
            token: Token {
                id: "tok-test".to_string(),
                expires: None,
            },
            service_catalog: ServiceCatalog::new(vec![ServiceCatalogEntry {
                service_type: "rax:database".to_string(),
                name: "cloudDatabases".to_string(),
                endpoints: vec![Endpoint {
                    region: Some("ORD".to_string()),
                    public_url: "https://ord.databases.example/v1.0/1234".to_string(),
                }],
            }]),
            default_region: "ORD".to_string(),
        })
    }
}
