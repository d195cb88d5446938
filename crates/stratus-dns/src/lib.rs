//! DNS domains, records and async job tracking for the Stratus cloud API
//!
//! DNS is the one service where every mutation is asynchronous: the API
//! answers 202 with a [`JobStatus`] that has to be polled to `COMPLETED` or
//! `ERROR`. Every mutating call returns the pending job; the record
//! operations on [`Domain`] additionally offer `*_with_wait` variants built
//! on the polling engine.

pub mod api;
pub mod domain;
pub mod job;
pub mod record;

// Re-exports
pub use api::{CreateDomainOptions, Dns, DomainUpdate};
pub use domain::{Domain, DomainDetail};
pub use job::{JobDetail, JobStatus};
pub use record::{NewRecord, Record};
