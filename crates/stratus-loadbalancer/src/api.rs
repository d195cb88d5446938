//! Load balancer operations

use serde_json::{Value, json};
use stratus_client::{
    ApiRequest, Client, EndpointSelector, Error, Predicate, Result, StatusCode, WaitOptions,
    wait_for,
};

use crate::loadbalancer::{LoadBalancer, LoadBalancerDetail};
use crate::types::{NewNode, Node, NodeCondition, Protocol, SessionPersistence, VirtualIpType};

const MAX_NAME_LEN: usize = 128;
const MAX_NODES: usize = 25;

fn lb_endpoint() -> EndpointSelector {
    EndpointSelector::load_balancer()
}

/// Options for creating a load balancer. A name, a protocol, at least one
/// node and at least one virtual IP are required. The port defaults to the
/// protocol's conventional one.
#[derive(Debug, Clone)]
pub struct CreateLoadBalancerOptions {
    pub name: String,
    pub protocol: Protocol,
    pub port: Option<u16>,
    pub nodes: Vec<NewNode>,
    pub virtual_ips: Vec<VirtualIpType>,
    pub algorithm: Option<String>,
    pub timeout: Option<u32>,
    pub session_persistence: Option<SessionPersistence>,
}

impl CreateLoadBalancerOptions {
    pub fn new(name: impl Into<String>, protocol: Protocol) -> Self {
        Self {
            name: name.into(),
            protocol,
            port: None,
            nodes: Vec::new(),
            virtual_ips: Vec::new(),
            algorithm: None,
            timeout: None,
            session_persistence: None,
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn node(mut self, node: NewNode) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn virtual_ip(mut self, ip_type: VirtualIpType) -> Self {
        self.virtual_ips.push(ip_type);
        self
    }

    pub fn algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.algorithm = Some(algorithm.into());
        self
    }

    pub fn timeout(mut self, timeout: u32) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn session_persistence(mut self, persistence: SessionPersistence) -> Self {
        self.session_persistence = Some(persistence);
        self
    }
}

pub(crate) fn validate_create(options: &CreateLoadBalancerOptions) -> Result<()> {
    if options.name.is_empty() {
        return Err(Error::MissingArgument("name"));
    }
    if options.name.len() > MAX_NAME_LEN {
        return Err(Error::UnexpectedResponse(format!(
            "load balancer name exceeds {MAX_NAME_LEN} characters"
        )));
    }
    if options.nodes.is_empty() {
        return Err(Error::MissingArgument("nodes"));
    }
    if options.nodes.len() > MAX_NODES {
        return Err(Error::UnexpectedResponse(format!(
            "a load balancer takes at most {MAX_NODES} nodes"
        )));
    }
    if options.virtual_ips.is_empty() {
        return Err(Error::MissingArgument("virtualIps"));
    }
    Ok(())
}

pub(crate) fn create_body(options: &CreateLoadBalancerOptions) -> Result<Value> {
    let nodes = options
        .nodes
        .iter()
        .map(serde_json::to_value)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let virtual_ips = options
        .virtual_ips
        .iter()
        .map(|ip_type| json!({ "type": ip_type }))
        .collect::<Vec<_>>();

    let mut balancer = json!({
        "name": options.name,
        "protocol": options.protocol.as_str(),
        "port": options.port.unwrap_or(options.protocol.default_port()),
        "nodes": nodes,
        "virtualIps": virtual_ips,
    });
    if let Some(algorithm) = &options.algorithm {
        balancer["algorithm"] = json!(algorithm);
    }
    if let Some(timeout) = options.timeout {
        balancer["timeout"] = json!(timeout);
    }
    if let Some(persistence) = options.session_persistence {
        balancer["sessionPersistence"] = json!({ "persistenceType": persistence.as_str() });
    }
    Ok(json!({ "loadBalancer": balancer }))
}

/// Fields of a load balancer that can be changed in place.
#[derive(Debug, Clone, Default)]
pub struct LoadBalancerUpdate {
    pub name: Option<String>,
    pub protocol: Option<Protocol>,
    pub port: Option<u16>,
    pub algorithm: Option<String>,
    pub timeout: Option<u32>,
}

fn update_body(update: &LoadBalancerUpdate) -> Value {
    let mut body = json!({});
    if let Some(name) = &update.name {
        body["name"] = json!(name);
    }
    if let Some(protocol) = update.protocol {
        body["protocol"] = json!(protocol.as_str());
    }
    if let Some(port) = update.port {
        body["port"] = json!(port);
    }
    if let Some(algorithm) = &update.algorithm {
        body["algorithm"] = json!(algorithm);
    }
    if let Some(timeout) = update.timeout {
        body["timeout"] = json!(timeout);
    }
    body
}

/// Load balancer API surface.
#[derive(Debug, Clone)]
pub struct LoadBalancers {
    client: Client,
}

impl LoadBalancers {
    pub fn new(client: &Client) -> Self {
        Self {
            client: client.clone(),
        }
    }

    pub async fn list(&self) -> Result<Vec<LoadBalancer>> {
        let response = self
            .client
            .request(ApiRequest::get("/loadbalancers").endpoint(lb_endpoint()))
            .await?
            .success()?;
        let details: Vec<LoadBalancerDetail> = response.field("loadBalancers")?;
        Ok(details
            .into_iter()
            .map(|detail| LoadBalancer::from_detail(&self.client, detail))
            .collect())
    }

    pub async fn get(&self, id: u64) -> Result<LoadBalancer> {
        let response = self
            .client
            .request(ApiRequest::get(format!("/loadbalancers/{id}")).endpoint(lb_endpoint()))
            .await?
            .success()?;
        Ok(LoadBalancer::from_detail(
            &self.client,
            response.field("loadBalancer")?,
        ))
    }

    pub async fn create(&self, options: &CreateLoadBalancerOptions) -> Result<LoadBalancer> {
        validate_create(options)?;

        let response = self
            .client
            .request(
                ApiRequest::post("/loadbalancers")
                    .endpoint(lb_endpoint())
                    .body(create_body(options)?),
            )
            .await?
            .success()?;
        Ok(LoadBalancer::from_detail(
            &self.client,
            response.field("loadBalancer")?,
        ))
    }

    /// Create a load balancer and poll until it reports `ACTIVE`.
    pub async fn create_with_wait(
        &self,
        options: &CreateLoadBalancerOptions,
        wait: WaitOptions,
    ) -> Result<LoadBalancer> {
        let balancer = self.create(options).await?;
        tracing::debug!(id = balancer.id, "load balancer created, waiting for ACTIVE");
        wait_for(balancer, Predicate::status("ACTIVE"), wait).await
    }

    pub async fn update(&self, id: u64, update: &LoadBalancerUpdate) -> Result<()> {
        self.client
            .request(
                ApiRequest::put(format!("/loadbalancers/{id}"))
                    .endpoint(lb_endpoint())
                    .body(update_body(update)),
            )
            .await?
            .expect_status(StatusCode::ACCEPTED)?;
        Ok(())
    }

    pub async fn delete(&self, id: u64) -> Result<()> {
        self.client
            .request(ApiRequest::delete(format!("/loadbalancers/{id}")).endpoint(lb_endpoint()))
            .await?
            .expect_status(StatusCode::ACCEPTED)?;
        Ok(())
    }

    pub async fn add_nodes(&self, balancer_id: u64, nodes: &[NewNode]) -> Result<Vec<Node>> {
        if nodes.is_empty() {
            return Err(Error::MissingArgument("nodes"));
        }

        let body = json!({
            "nodes": nodes
                .iter()
                .map(serde_json::to_value)
                .collect::<std::result::Result<Vec<_>, _>>()?,
        });
        let response = self
            .client
            .request(
                ApiRequest::post(format!("/loadbalancers/{balancer_id}/nodes"))
                    .endpoint(lb_endpoint())
                    .body(body),
            )
            .await?
            .expect_status(StatusCode::ACCEPTED)?;
        response.field("nodes")
    }

    pub async fn update_node(
        &self,
        balancer_id: u64,
        node_id: u64,
        condition: NodeCondition,
        weight: Option<u32>,
    ) -> Result<()> {
        let mut node = json!({ "condition": condition });
        if let Some(weight) = weight {
            node["weight"] = json!(weight);
        }

        self.client
            .request(
                ApiRequest::put(format!("/loadbalancers/{balancer_id}/nodes/{node_id}"))
                    .endpoint(lb_endpoint())
                    .body(json!({ "node": node })),
            )
            .await?
            .expect_status(StatusCode::ACCEPTED)?;
        Ok(())
    }

    pub async fn remove_node(&self, balancer_id: u64, node_id: u64) -> Result<()> {
        self.client
            .request(
                ApiRequest::delete(format!("/loadbalancers/{balancer_id}/nodes/{node_id}"))
                    .endpoint(lb_endpoint()),
            )
            .await?
            .expect_status(StatusCode::ACCEPTED)?;
        Ok(())
    }
}
