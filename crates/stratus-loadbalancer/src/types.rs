//! Load balancer wire types

use serde::{Deserialize, Serialize};

/// Protocols the load balancing service accepts, with their conventional
/// ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Http,
    Https,
    Ftp,
    Imapv4,
    Ldap,
    Mysql,
    Pop3,
    Smtp,
    Tcp,
}

impl Protocol {
    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Http => "HTTP",
            Protocol::Https => "HTTPS",
            Protocol::Ftp => "FTP",
            Protocol::Imapv4 => "IMAPv4",
            Protocol::Ldap => "LDAP",
            Protocol::Mysql => "MYSQL",
            Protocol::Pop3 => "POP3",
            Protocol::Smtp => "SMTP",
            Protocol::Tcp => "TCP",
        }
    }

    pub fn default_port(self) -> u16 {
        match self {
            Protocol::Http => 80,
            Protocol::Https => 443,
            Protocol::Ftp => 21,
            Protocol::Imapv4 => 143,
            Protocol::Ldap => 389,
            Protocol::Mysql => 3306,
            Protocol::Pop3 => 110,
            Protocol::Smtp => 25,
            Protocol::Tcp => 0,
        }
    }
}

/// Whether a node receives traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeCondition {
    Enabled,
    Disabled,
    Draining,
}

/// A backend node as the API returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct Node {
    pub id: u64,
    pub address: String,
    pub port: u16,
    pub condition: NodeCondition,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub weight: Option<u32>,
    #[serde(rename = "type", default)]
    pub node_type: Option<String>,
}

/// A backend node to be added.
#[derive(Debug, Clone, Serialize)]
pub struct NewNode {
    pub address: String,
    pub port: u16,
    pub condition: NodeCondition,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<u32>,
}

impl NewNode {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
            condition: NodeCondition::Enabled,
            weight: None,
        }
    }

    pub fn condition(mut self, condition: NodeCondition) -> Self {
        self.condition = condition;
        self
    }

    pub fn weight(mut self, weight: u32) -> Self {
        self.weight = Some(weight);
        self
    }
}

/// Public addresses are internet-facing; ServiceNet ones are only reachable
/// inside the region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VirtualIpType {
    Public,
    Servicenet,
}

/// A virtual IP as the API returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct VirtualIp {
    pub id: u64,
    pub address: String,
    #[serde(rename = "type")]
    pub ip_type: VirtualIpType,
    #[serde(rename = "ipVersion", default)]
    pub ip_version: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPersistence {
    HttpCookie,
    SourceIp,
}

impl SessionPersistence {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionPersistence::HttpCookie => "HTTP_COOKIE",
            SessionPersistence::SourceIp => "SOURCE_IP",
        }
    }
}
