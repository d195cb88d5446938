//! Authenticated request dispatch
//!
//! The single chokepoint every service operation goes through: resolve the
//! base URL from the catalog, attach the session token, perform exactly one
//! network call. No retries live here; retrying is the polling engine's job.

use reqwest::Method;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::auth::Client;
use crate::catalog::EndpointSelector;
use crate::error::{Error, Result};

/// One API call: path relative to the resolved endpoint, method, optional
/// query string and JSON body, and the endpoint selector. The selector
/// defaults to the compute service; its region, when empty, is filled in from
/// the session default at dispatch time.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    path: String,
    method: Method,
    query: Vec<(String, String)>,
    body: Option<Value>,
    endpoint: EndpointSelector,
}

impl ApiRequest {
    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method,
            query: Vec::new(),
            body: None,
            endpoint: EndpointSelector::compute(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn endpoint(mut self, selector: EndpointSelector) -> Self {
        self.endpoint = selector;
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Status, headers and parsed JSON body of a dispatched call. Operations
/// check the status they expect themselves, mirroring the API's mixed use of
/// 200/202/204.
#[derive(Debug)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl ApiResponse {
    /// Deserialize a top-level field of the response body, e.g. the `server`
    /// in `{"server": {...}}`.
    pub fn field<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self.body.get(key).ok_or_else(|| {
            Error::UnexpectedResponse(format!("missing `{key}` in response body"))
        })?;
        Ok(serde_json::from_value(value.clone())?)
    }

    /// Deserialize the whole response body.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.body.clone())?)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Turn any non-2xx status into [`Error::Api`].
    pub fn success(self) -> Result<ApiResponse> {
        if self.status.is_success() {
            Ok(self)
        } else {
            Err(self.into_api_error())
        }
    }

    /// Turn anything but the given status into [`Error::Api`]. The API mixes
    /// 200, 202 and 204 depending on the operation.
    pub fn expect_status(self, expected: StatusCode) -> Result<ApiResponse> {
        if self.status == expected {
            Ok(self)
        } else {
            Err(self.into_api_error())
        }
    }

    fn into_api_error(self) -> Error {
        Error::Api {
            status: self.status.as_u16(),
            message: self.body.to_string(),
        }
    }
}

impl Client {
    /// Dispatch one authenticated request.
    ///
    /// Fails fast with [`Error::MissingArgument`] on an empty path or
    /// selector field, and with [`Error::EndpointNotFound`] when the catalog
    /// has no endpoint for the selector. 401/403 surface as
    /// [`Error::Unauthorized`]; every other status is handed back to the
    /// caller untouched.
    pub async fn request(&self, request: ApiRequest) -> Result<ApiResponse> {
        if request.path.is_empty() {
            return Err(Error::MissingArgument("path"));
        }

        let mut selector = request.endpoint.clone();
        if selector.region.is_empty() {
            selector.region = self.inner.session.default_region.clone();
        }

        let base = match self.inner.session.service_catalog.find_endpoint(&selector)? {
            Some(url) => url.to_owned(),
            None => {
                return Err(Error::EndpointNotFound {
                    service_type: selector.service_type,
                    name: selector.name,
                    region: selector.region,
                });
            }
        };

        let url = format!("{}{}", base, request.path);
        tracing::debug!(method = %request.method, %url, "dispatching authenticated request");

        let mut builder = self
            .inner
            .http
            .request(request.method.clone(), &url)
            .header("X-Auth-Token", &self.inner.session.token.id);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(Error::Unauthorized(status.as_u16()));
        }

        let headers = response.headers().clone();
        let bytes = response.bytes().await?;
        // 204s and some error pages have no JSON body; treat those as Null
        // and let the operation decide based on the status code.
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Session, Token};
    use crate::catalog::{Endpoint, ServiceCatalog, ServiceCatalogEntry};
    use serde_json::json;

    fn offline_client(default_region: &str) -> Client {
        Client::from_session(Session {
            token: Token {
                id: "tok-test".to_string(),
                expires: None,
            },
            service_catalog: ServiceCatalog::new(vec![ServiceCatalogEntry {
                service_type: "compute".to_string(),
                name: "cloudServersOpenStack".to_string(),
                endpoints: vec![Endpoint {
                    region: Some("ORD".to_string()),
                    public_url: "https://ord.example/v2".to_string(),
                }],
            }]),
            default_region: default_region.to_string(),
        })
    }

    #[test]
    fn test_builder_defaults_to_get_and_compute() {
        let request = ApiRequest::get("/servers/detail");
        assert_eq!(request.method(), &Method::GET);
        assert_eq!(request.path(), "/servers/detail");
        assert_eq!(request.endpoint, EndpointSelector::compute());
        assert!(request.body.is_none());
    }

    #[tokio::test]
    async fn test_empty_path_fails_fast() {
        let client = offline_client("ORD");
        let result = client.request(ApiRequest::get("")).await;
        assert!(matches!(result, Err(Error::MissingArgument("path"))));
    }

    #[tokio::test]
    async fn test_missing_region_fails_fast() {
        // No session default and no override: resolution must reject the
        // empty region before any network activity.
        let client = offline_client("");
        let result = client.request(ApiRequest::get("/servers")).await;
        assert!(matches!(result, Err(Error::MissingArgument("region"))));
    }

    #[tokio::test]
    async fn test_unknown_service_is_endpoint_not_found() {
        let client = offline_client("ORD");
        let request = ApiRequest::get("/volumes").endpoint(EndpointSelector::block_storage());
        let result = client.request(request).await;
        match result {
            Err(Error::EndpointNotFound {
                service_type,
                name,
                region,
            }) => {
                assert_eq!(service_type, "volume");
                assert_eq!(name, "cloudBlockStorage");
                assert_eq!(region, "ORD");
            }
            other => panic!("expected EndpointNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_response_field_extraction() {
        let response = ApiResponse {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: json!({ "server": { "id": "abc", "status": "ACTIVE" } }),
        };

        #[derive(serde::Deserialize)]
        struct Detail {
            id: String,
            status: String,
        }

        let detail: Detail = response.field("server").unwrap();
        assert_eq!(detail.id, "abc");
        assert_eq!(detail.status, "ACTIVE");

        let missing = response.field::<Detail>("volume");
        assert!(matches!(missing, Err(Error::UnexpectedResponse(_))));
    }

    #[test]
    fn test_expect_status() {
        let accepted = ApiResponse {
            status: StatusCode::ACCEPTED,
            headers: HeaderMap::new(),
            body: Value::Null,
        };
        assert!(accepted.expect_status(StatusCode::ACCEPTED).is_ok());

        let conflict = ApiResponse {
            status: StatusCode::CONFLICT,
            headers: HeaderMap::new(),
            body: json!({ "message": "already exists" }),
        };
        match conflict.expect_status(StatusCode::ACCEPTED) {
            Err(Error::Api { status, .. }) => assert_eq!(status, 409),
            other => panic!("expected Api error, got {other:?}"),
        }
    }
}
