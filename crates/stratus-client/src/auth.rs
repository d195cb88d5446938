//! Authentication and session state
//!
//! A [`Client`] is produced by one explicit `authenticate` call. The session
//! it carries (token, service catalog, default region) is immutable for the
//! client's lifetime and is never renewed automatically: once the token
//! expires, requests fail with [`Error::Unauthorized`] and the caller builds
//! a new client.

use std::env;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::catalog::ServiceCatalog;
use crate::error::{Error, Result};

const US_AUTH_URL: &str = "https://identity.api.rackspacecloud.com/v2.0";
const UK_AUTH_URL: &str = "https://lon.identity.api.rackspacecloud.com/v2.0";

/// API key credentials for the identity service.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub api_key: String,
}

/// Which identity endpoint to authenticate against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Location {
    #[default]
    Us,
    Uk,
}

/// Configuration for building an authenticated [`Client`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub credentials: Credentials,
    pub location: Location,
    /// Full identity URL override; wins over `location` when set.
    pub auth_url: Option<String>,
    /// Region override; wins over the account's default region when set.
    pub region: Option<String>,
}

impl ClientConfig {
    pub fn new(username: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            credentials: Credentials {
                username: username.into(),
                api_key: api_key.into(),
            },
            location: Location::Us,
            auth_url: None,
            region: None,
        }
    }

    /// Read configuration from `STRATUS_USERNAME`, `STRATUS_API_KEY` and the
    /// optional `STRATUS_LOCATION` ("UK") and `STRATUS_REGION` variables.
    pub fn from_env() -> Result<Self> {
        let username = env::var("STRATUS_USERNAME")
            .map_err(|_| Error::MissingEnvVar("STRATUS_USERNAME".to_string()))?;
        let api_key = env::var("STRATUS_API_KEY")
            .map_err(|_| Error::MissingEnvVar("STRATUS_API_KEY".to_string()))?;

        let mut config = Self::new(username, api_key);
        if let Ok(location) = env::var("STRATUS_LOCATION") {
            if location.eq_ignore_ascii_case("uk") {
                config.location = Location::Uk;
            }
        }
        if let Ok(region) = env::var("STRATUS_REGION") {
            config.region = Some(region);
        }
        Ok(config)
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_auth_url(mut self, auth_url: impl Into<String>) -> Self {
        self.auth_url = Some(auth_url.into());
        self
    }

    fn auth_url(&self) -> &str {
        match (&self.auth_url, self.location) {
            (Some(url), _) => url,
            (None, Location::Us) => US_AUTH_URL,
            (None, Location::Uk) => UK_AUTH_URL,
        }
    }
}

/// Opaque auth token. The expiry timestamp is carried for inspection but is
/// never enforced locally.
#[derive(Debug, Clone, Deserialize)]
pub struct Token {
    pub id: String,
    #[serde(default)]
    pub expires: Option<DateTime<Utc>>,
}

/// Everything a successful authentication produced.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: Token,
    pub service_catalog: ServiceCatalog,
    pub default_region: String,
}

/// Handle to the authenticated API. Cheap to clone; every clone shares the
/// same session and connection pool.
#[derive(Debug, Clone)]
pub struct Client {
    pub(crate) inner: Arc<ClientInner>,
}

#[derive(Debug)]
pub(crate) struct ClientInner {
    pub(crate) http: reqwest::Client,
    pub(crate) session: Session,
}

impl Client {
    /// Authenticate against the identity service and build a client around
    /// the returned session.
    pub async fn authenticate(config: ClientConfig) -> Result<Client> {
        if config.credentials.username.is_empty() {
            return Err(Error::MissingArgument("username"));
        }
        if config.credentials.api_key.is_empty() {
            return Err(Error::MissingArgument("api_key"));
        }

        let url = format!("{}/tokens", config.auth_url());
        tracing::debug!(%url, username = %config.credentials.username, "authenticating");

        let http = reqwest::Client::new();
        let body = AuthRequest {
            auth: AuthPayload {
                api_key_credentials: ApiKeyCredentials {
                    username: &config.credentials.username,
                    api_key: &config.credentials.api_key,
                },
            },
        };

        let response = http.post(&url).json(&body).send().await?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(Error::Unauthorized(status.as_u16()));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }

        let auth: AuthResponse = response.json().await?;
        let default_region = config
            .region
            .or(auth.access.user.default_region)
            .unwrap_or_default();

        tracing::debug!(
            %default_region,
            services = auth.access.service_catalog.entries().len(),
            "authenticated"
        );

        Ok(Client::from_session(Session {
            token: auth.access.token,
            service_catalog: auth.access.service_catalog,
            default_region,
        }))
    }

    /// Build a client from an existing session, e.g. a token persisted from a
    /// previous run. No validation happens here; a stale token surfaces as
    /// [`Error::Unauthorized`] on the first request.
    pub fn from_session(session: Session) -> Client {
        Client {
            inner: Arc::new(ClientInner {
                http: reqwest::Client::new(),
                session,
            }),
        }
    }

    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    pub fn default_region(&self) -> &str {
        &self.inner.session.default_region
    }
}

// ============ Identity wire types ============

#[derive(Serialize)]
struct AuthRequest<'a> {
    auth: AuthPayload<'a>,
}

#[derive(Serialize)]
struct AuthPayload<'a> {
    #[serde(rename = "RAX-KSKEY:apiKeyCredentials")]
    api_key_credentials: ApiKeyCredentials<'a>,
}

#[derive(Serialize)]
struct ApiKeyCredentials<'a> {
    username: &'a str,
    #[serde(rename = "apiKey")]
    api_key: &'a str,
}

#[derive(Deserialize)]
struct AuthResponse {
    access: Access,
}

#[derive(Deserialize)]
struct Access {
    token: Token,
    #[serde(rename = "serviceCatalog", default)]
    service_catalog: ServiceCatalog,
    #[serde(default)]
    user: AuthUser,
}

#[derive(Deserialize, Default)]
struct AuthUser {
    #[serde(rename = "RAX-AUTH:defaultRegion", default)]
    default_region: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::EndpointSelector;

    #[test]
    fn test_auth_request_body_shape() {
        let body = AuthRequest {
            auth: AuthPayload {
                api_key_credentials: ApiKeyCredentials {
                    username: "alice",
                    api_key: "0123456789abcdef",
                },
            },
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json["auth"]["RAX-KSKEY:apiKeyCredentials"]["username"],
            "alice"
        );
        assert_eq!(
            json["auth"]["RAX-KSKEY:apiKeyCredentials"]["apiKey"],
            "0123456789abcdef"
        );
    }

    #[test]
    fn test_auth_response_populates_session() {
        let raw = r#"{
            "access": {
                "token": { "id": "tok-123", "expires": "2026-09-01T00:00:00Z" },
                "serviceCatalog": [
                    {
                        "name": "cloudServersOpenStack",
                        "type": "compute",
                        "endpoints": [
                            { "region": "DFW", "publicURL": "https://dfw.example/v2" },
                            { "region": "ORD", "publicURL": "https://ord.example/v2" }
                        ]
                    }
                ],
                "user": { "RAX-AUTH:defaultRegion": "DFW" }
            }
        }"#;

        let parsed: AuthResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.access.token.id, "tok-123");
        assert!(parsed.access.token.expires.is_some());
        assert_eq!(parsed.access.user.default_region.as_deref(), Some("DFW"));

        let selector = EndpointSelector::compute().with_region("ORD");
        let url = parsed
            .access
            .service_catalog
            .find_endpoint(&selector)
            .unwrap();
        assert_eq!(url, Some("https://ord.example/v2"));
    }

    #[test]
    fn test_auth_url_selection() {
        let us = ClientConfig::new("a", "k");
        assert_eq!(us.auth_url(), US_AUTH_URL);

        let uk = ClientConfig::new("a", "k").with_location(Location::Uk);
        assert_eq!(uk.auth_url(), UK_AUTH_URL);

        let custom = ClientConfig::new("a", "k").with_auth_url("https://keystone.local/v2.0");
        assert_eq!(custom.auth_url(), "https://keystone.local/v2.0");
    }
}
