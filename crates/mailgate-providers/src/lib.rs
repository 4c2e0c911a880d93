//! Outbound provider implementations for mailgate
//!
//! Each provider adapts the gateway's [`EmailProvider`] contract to one
//! vendor API:
//!
//! - [`resend`] - true batch endpoint, dispatched through the core batch
//!   pipeline with bounded concurrency
//! - [`unione`] - per-message endpoint with region-selected base URL
//!
//! Providers convert transport and API failures into per-item failed
//! results; an error escaping `send_batch` means the whole submission was
//! unusable before any dispatch.
//!
//! [`EmailProvider`]: mailgate_core::EmailProvider

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod transport;

pub mod resend;
pub mod unione;

pub use resend::ResendProvider;
pub use unione::{UniOneProvider, UniOneRegion};
