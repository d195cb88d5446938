//! Load balancers and node management for the Stratus cloud API
//!
//! [`LoadBalancers`] carries the collection-level operations and node CRUD;
//! [`LoadBalancer`] plugs into the polling engine so callers can wait out
//! the `BUILD` and `PENDING_UPDATE` states between mutations.

pub mod api;
pub mod loadbalancer;
pub mod types;

// Re-exports
pub use api::{CreateLoadBalancerOptions, LoadBalancerUpdate, LoadBalancers};
pub use loadbalancer::{LoadBalancer, LoadBalancerDetail};
pub use types::{
    NewNode, Node, NodeCondition, Protocol, SessionPersistence, VirtualIp, VirtualIpType,
};

#[cfg(test)]
pub(crate) mod tests {
    use stratus_client::{
        Client, Endpoint, ServiceCatalog, ServiceCatalogEntry, Session, Token,
    };

    /// A client whose catalog resolves the load balancer endpoint without
    /// ever touching the network.
    pub(crate) fn offline_client() -> Client {
        Client::from_session(Session {
            token: Token {
                id: "tok-test".to_string(),
                expires: None,
            },
            service_catalog: ServiceCatalog::new(vec![ServiceCatalogEntry {
                service_type: "rax:load-balancer".to_string(),
                name: "cloudLoadBalancers".to_string(),
                endpoints: vec![Endpoint {
                    region: Some("ORD".to_string()),
                    public_url: "https://ord.loadbalancers.example/v1.0/1234".to_string(),
                }],
            }]),
            default_region: "ORD".to_string(),
        })
    }
}
