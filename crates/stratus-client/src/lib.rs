//! Core client for the Stratus cloud API
//!
//! This crate carries the machinery every service crate shares:
//!
//! - **Session/auth state**: one explicit [`Client::authenticate`] call
//!   produces an immutable session (token, service catalog, default region).
//!   Tokens are never renewed automatically.
//! - **Endpoint resolution**: [`catalog::ServiceCatalog`] maps a logical
//!   (service type, name, region) selector onto a concrete base URL, re-run
//!   on every request.
//! - **Authenticated dispatch**: [`request::ApiRequest`] goes through the
//!   one chokepoint that resolves the endpoint and attaches the token.
//! - **Poll-until-condition engine**: [`wait::start_wait`] repeatedly
//!   refreshes a resource until a predicate matches, a deadline elapses or
//!   the caller cancels. Every `*_with_wait` operation in the service crates
//!   is built on it.
//!
//! # Example
//!
//! ```ignore
//! use stratus_client::{Client, ClientConfig};
//! use stratus_client::wait::{Predicate, WaitOptions, wait_for};
//!
//! let client = Client::authenticate(ClientConfig::from_env()?).await?;
//! let compute = stratus_compute::Compute::new(&client);
//!
//! let server = compute.create_server(&options).await?;
//! let server = wait_for(server, Predicate::status("ACTIVE"), WaitOptions::default()).await?;
//! ```

pub mod auth;
pub mod catalog;
pub mod error;
pub mod request;
pub mod wait;

// Re-exports
pub use auth::{Client, ClientConfig, Credentials, Location, Session, Token};
pub use catalog::{Endpoint, EndpointSelector, ServiceCatalog, ServiceCatalogEntry};
pub use error::{Error, Result};
pub use request::{ApiRequest, ApiResponse};
pub use wait::{
    Predicate, Refresh, WaitHandle, WaitOptions, WaitOutcome, WaitState, start_wait, wait_for,
};

// Service crates match expected statuses without taking a reqwest
// dependency of their own.
pub use reqwest::StatusCode;
