//! Core types and algorithms for the mailgate email gateway
//!
//! This crate is the I/O-free heart of the gateway:
//!
//! - **Email types**: [`email`] - normalized emails, send results, address
//!   parsing
//! - **Job types**: [`job`] - pollable batch-submission state
//! - **Provider contract**: [`provider`] / [`registry`] - the capability a
//!   provider exposes and the table the server selects from
//! - **Batch pipeline**: [`batch`] - bounded-concurrency, rate-limited,
//!   order-preserving chunk dispatch
//! - **Errors**: [`error`] - typed conditions consumed by the HTTP layer
//!
//! Everything here is pure data and coordination; HTTP transports live in
//! `mailgate-providers`, admission control and job storage in
//! `mailgate-server`.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod batch;
pub mod email;
pub mod error;
pub mod job;
pub mod provider;
pub mod registry;

// Re-export commonly used types at crate level
pub use batch::{BatchOptions, chunk, process_batches};
pub use email::{Email, ParsedAddress, SendResult, SendStatus, Substitutions};
pub use error::{Error, Result};
pub use job::{ItemOutcome, ItemStatus, Job, JobItemResult, JobStatus};
pub use provider::{EmailProvider, ProviderCapabilities};
pub use registry::ProviderRegistry;

// Re-export key dependencies for convenience
pub use async_trait::async_trait;
pub use secrecy::SecretString;
