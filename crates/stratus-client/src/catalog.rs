//! Service catalog and endpoint resolution
//!
//! The identity service returns a catalog of every backend service the
//! account can reach, each with one or more regional endpoints. Resolution is
//! pure and re-run on every dispatched request; the catalog never changes
//! during a session.

use serde::Deserialize;

use crate::error::{Error, Result};

/// One regional endpoint of a catalog entry.
#[derive(Debug, Clone, Deserialize)]
pub struct Endpoint {
    #[serde(default)]
    pub region: Option<String>,
    #[serde(rename = "publicURL")]
    pub public_url: String,
}

/// One service in the catalog, with its endpoints in the order the API
/// returned them.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceCatalogEntry {
    #[serde(rename = "type")]
    pub service_type: String,
    pub name: String,
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
}

/// Ordered, immutable list of catalog entries received at authentication.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct ServiceCatalog {
    entries: Vec<ServiceCatalogEntry>,
}

/// Picks one endpoint out of the catalog: logical service (type, name) plus a
/// preferred region. The region is usually left empty and filled in from the
/// session default by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointSelector {
    pub service_type: String,
    pub name: String,
    pub region: String,
}

impl EndpointSelector {
    pub fn new(service_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            service_type: service_type.into(),
            name: name.into(),
            region: String::new(),
        }
    }

    /// The compute service. This is the dispatcher default.
    pub fn compute() -> Self {
        Self::new("compute", "cloudServersOpenStack")
    }

    pub fn dns() -> Self {
        Self::new("rax:dns", "cloudDNS")
    }

    pub fn load_balancer() -> Self {
        Self::new("rax:load-balancer", "cloudLoadBalancers")
    }

    pub fn block_storage() -> Self {
        Self::new("volume", "cloudBlockStorage")
    }

    pub fn database() -> Self {
        Self::new("rax:database", "cloudDatabases")
    }

    /// Override the region instead of inheriting the session default.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }
}

impl ServiceCatalog {
    pub fn new(entries: Vec<ServiceCatalogEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[ServiceCatalogEntry] {
        &self.entries
    }

    /// Resolve a selector to a base URL.
    ///
    /// Entries are scanned in catalog order for a (type, name) match. An
    /// entry with exactly one endpoint wins regardless of region; otherwise
    /// its endpoints are scanned in order for the selector's region. A miss
    /// is `Ok(None)`, not an error: the dispatcher decides how to surface it.
    pub fn find_endpoint(&self, selector: &EndpointSelector) -> Result<Option<&str>> {
        if selector.service_type.is_empty() {
            return Err(Error::MissingArgument("type"));
        }
        if selector.name.is_empty() {
            return Err(Error::MissingArgument("name"));
        }
        if selector.region.is_empty() {
            return Err(Error::MissingArgument("region"));
        }

        for entry in &self.entries {
            if entry.service_type != selector.service_type || entry.name != selector.name {
                continue;
            }

            // Single-region services carry one endpoint with no region tag.
            if let [only] = entry.endpoints.as_slice() {
                return Ok(Some(only.public_url.as_str()));
            }

            for endpoint in &entry.endpoints {
                if endpoint.region.as_deref() == Some(selector.region.as_str()) {
                    return Ok(Some(endpoint.public_url.as_str()));
                }
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> ServiceCatalog {
        ServiceCatalog::new(vec![
            ServiceCatalogEntry {
                service_type: "compute".to_string(),
                name: "cloudServersOpenStack".to_string(),
                endpoints: vec![Endpoint {
                    region: Some("ORD".to_string()),
                    public_url: "https://ord.example/v2".to_string(),
                }],
            },
            ServiceCatalogEntry {
                service_type: "rax:dns".to_string(),
                name: "cloudDNS".to_string(),
                endpoints: vec![
                    Endpoint {
                        region: Some("ORD".to_string()),
                        public_url: "https://dns-ord.example/v1".to_string(),
                    },
                    Endpoint {
                        region: Some("DFW".to_string()),
                        public_url: "https://dns-dfw.example/v1".to_string(),
                    },
                ],
            },
        ])
    }

    #[test]
    fn test_single_endpoint_ignores_region() {
        let catalog = catalog();
        let selector = EndpointSelector::compute().with_region("DFW");
        let url = catalog.find_endpoint(&selector).unwrap();
        assert_eq!(url, Some("https://ord.example/v2"));
    }

    #[test]
    fn test_region_match_in_order() {
        let catalog = catalog();
        let selector = EndpointSelector::dns().with_region("DFW");
        let url = catalog.find_endpoint(&selector).unwrap();
        assert_eq!(url, Some("https://dns-dfw.example/v1"));
    }

    #[test]
    fn test_region_miss_is_soft() {
        let catalog = catalog();
        let selector = EndpointSelector::dns().with_region("LON");
        let url = catalog.find_endpoint(&selector).unwrap();
        assert_eq!(url, None);
    }

    #[test]
    fn test_unknown_service_is_soft_miss() {
        let catalog = catalog();
        let selector = EndpointSelector::new("volume", "cloudBlockStorage").with_region("ORD");
        let url = catalog.find_endpoint(&selector).unwrap();
        assert_eq!(url, None);
    }

    #[test]
    fn test_empty_selector_fields_fail_fast() {
        let missing_region = EndpointSelector::compute();
        assert!(matches!(
            catalog().find_endpoint(&missing_region),
            Err(Error::MissingArgument("region"))
        ));

        let missing_name = EndpointSelector::new("compute", "").with_region("ORD");
        assert!(matches!(
            catalog().find_endpoint(&missing_name),
            Err(Error::MissingArgument("name"))
        ));

        let missing_type = EndpointSelector::new("", "cloudServersOpenStack").with_region("ORD");
        assert!(matches!(
            catalog().find_endpoint(&missing_type),
            Err(Error::MissingArgument("type"))
        ));
    }

    #[test]
    fn test_catalog_deserializes_wire_shape() {
        let raw = r#"[
            {
                "name": "cloudServersOpenStack",
                "type": "compute",
                "endpoints": [
                    { "region": "ORD", "publicURL": "https://ord.example/v2" }
                ]
            }
        ]"#;
        let parsed: ServiceCatalog = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.entries().len(), 1);
        assert_eq!(parsed.entries()[0].service_type, "compute");
        assert_eq!(parsed.entries()[0].endpoints[0].region.as_deref(), Some("ORD"));
    }
}
