//! Client error types

use thiserror::Error;

/// Errors surfaced by the core client and the service crates built on it.
#[derive(Error, Debug)]
pub enum Error {
    #[error("{0} is a required argument")]
    MissingArgument(&'static str),

    #[error("missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("token rejected by the API (HTTP {0}); re-authenticate and retry")]
    Unauthorized(u16),

    #[error("no endpoint in the service catalog for {service_type}/{name} in region {region}")]
    EndpointNotFound {
        service_type: String,
        name: String,
        region: String,
    },

    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("max wait elapsed before the resource reached the requested state")]
    WaitTimeout,

    #[error("consecutive refresh failures exceeded the configured limit")]
    WaitFailed,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
