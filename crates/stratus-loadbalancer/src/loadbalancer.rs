//! Load balancer projection

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use stratus_client::{
    ApiRequest, Client, EndpointSelector, Predicate, Refresh, Result, WaitOptions, wait_for,
};

use crate::types::{Node, VirtualIp};

/// Wire shape of a load balancer as the API returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct LoadBalancerDetail {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub algorithm: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub timeout: Option<u32>,
    #[serde(rename = "nodeCount", default)]
    pub node_count: Option<u32>,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(rename = "virtualIps", default)]
    pub virtual_ips: Vec<VirtualIp>,
    #[serde(rename = "sessionPersistence", default)]
    pub session_persistence: Option<Value>,
    #[serde(default)]
    pub created: Option<Value>,
    #[serde(default)]
    pub updated: Option<Value>,
}

/// A cloud load balancer. Mutations put it through `PENDING_UPDATE` back to
/// `ACTIVE`; the engine is used to wait that out before the next change.
#[derive(Debug, Clone)]
pub struct LoadBalancer {
    client: Client,
    pub id: u64,
    pub name: String,
    pub protocol: Option<String>,
    pub port: Option<u16>,
    pub algorithm: Option<String>,
    pub status: String,
    pub timeout: Option<u32>,
    pub node_count: Option<u32>,
    pub nodes: Vec<Node>,
    pub virtual_ips: Vec<VirtualIp>,
}

impl LoadBalancer {
    pub(crate) fn from_detail(client: &Client, detail: LoadBalancerDetail) -> Self {
        let mut balancer = Self {
            client: client.clone(),
            id: 0,
            name: String::new(),
            protocol: None,
            port: None,
            algorithm: None,
            status: String::new(),
            timeout: None,
            node_count: None,
            nodes: Vec::new(),
            virtual_ips: Vec::new(),
        };
        balancer.apply(detail);
        balancer
    }

    pub(crate) fn apply(&mut self, detail: LoadBalancerDetail) {
        self.id = detail.id;
        self.name = detail.name;
        self.protocol = detail.protocol;
        self.port = detail.port;
        self.algorithm = detail.algorithm;
        self.status = detail.status;
        self.timeout = detail.timeout;
        self.node_count = detail.node_count.or(Some(detail.nodes.len() as u32));
        self.nodes = detail.nodes;
        self.virtual_ips = detail.virtual_ips;
    }

    /// Poll until the balancer reaches `status` (exact match), typically
    /// `ACTIVE` after a create or mutation.
    pub async fn wait_for_status(self, status: &str, options: WaitOptions) -> Result<LoadBalancer> {
        wait_for(self, Predicate::status(status), options).await
    }
}

#[async_trait]
impl Refresh for LoadBalancer {
    async fn refresh(&mut self) -> Result<()> {
        let response = self
            .client
            .request(
                ApiRequest::get(format!("/loadbalancers/{}", self.id))
                    .endpoint(EndpointSelector::load_balancer()),
            )
            .await?
            .success()?;
        self.apply(response.field("loadBalancer")?);
        Ok(())
    }

    fn attribute(&self, key: &str) -> Option<String> {
        match key {
            "id" => Some(self.id.to_string()),
            "name" => Some(self.name.clone()),
            "status" => Some(self.status.clone()),
            "protocol" => self.protocol.clone(),
            "algorithm" => self.algorithm.clone(),
            "port" => self.port.map(|port| port.to_string()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::offline_client;

    #[test]
    fn test_load_balancer_detail_deserializes() {
        let detail: LoadBalancerDetail = serde_json::from_str(
            r#"{
                "id": 71,
                "name": "web-lb",
                "protocol": "HTTP",
                "port": 80,
                "algorithm": "LEAST_CONNECTIONS",
                "status": "ACTIVE",
                "nodes": [
                    { "id": 410, "address": "10.1.1.1", "port": 80, "condition": "ENABLED" }
                ],
                "virtualIps": [
                    { "id": 9, "address": "203.0.113.10", "type": "PUBLIC" }
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(detail.id, 71);
        assert_eq!(detail.nodes.len(), 1);
        assert_eq!(detail.virtual_ips.len(), 1);
    }

    #[test]
    fn test_node_count_falls_back_to_node_list() {
        let detail: LoadBalancerDetail = serde_json::from_str(
            r#"{
                "id": 72,
                "name": "api-lb",
                "status": "BUILD",
                "nodes": [
                    { "id": 1, "address": "10.1.1.1", "port": 80, "condition": "ENABLED" },
                    { "id": 2, "address": "10.1.1.2", "port": 80, "condition": "ENABLED" }
                ]
            }"#,
        )
        .unwrap();
        let balancer = LoadBalancer::from_detail(&offline_client(), detail);
        assert_eq!(balancer.node_count, Some(2));
        assert_eq!(balancer.attribute("status").as_deref(), Some("BUILD"));
    }
}
