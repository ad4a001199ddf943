#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Chain-agnostic building blocks for the x402 payment protocol.
//!
//! This crate provides the pieces every scheme implementation and the HTTP
//! middleware share: currency conversion, the proof codec, the error
//! taxonomy, per-resource configuration, an injectable clock, and the
//! [`Facilitator`](facilitator::Facilitator) trait. Ledger-specific logic
//! (transaction parsing, replay caching, transfer and channel verification)
//! lives in `x402-ledger`.
//!
//! # Modules
//!
//! - [`amount`] — USD→micro-unit conversion (C1)
//! - [`asset`] — per-network stablecoin mint registry (C1)
//! - [`encoding`] — base64/JSON header codec (C2)
//! - [`error`] — [`error::PaymentError`], the full §7 error taxonomy
//! - [`config`] — [`config::ResourceConfig`], per-route pricing declaration
//! - [`clock`] — injectable time source for deterministic expiry tests
//! - [`timestamp`] — [`timestamp::UnixTimestamp`]
//! - [`result`] — [`result::VerificationOutcome`] / [`result::TransferRecord`]
//! - [`facilitator`] — the [`facilitator::Facilitator`] trait (C9)

pub mod amount;
pub mod asset;
pub mod clock;
pub mod config;
pub mod encoding;
pub mod error;
pub mod facilitator;
pub mod result;
pub mod timestamp;

pub use error::PaymentError;
pub use facilitator::Facilitator;
pub use result::{TransferRecord, VerificationOutcome};
