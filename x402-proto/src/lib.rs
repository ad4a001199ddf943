#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Wire types for the x402 payment protocol.
//!
//! This crate is pure data: the structs and enums exchanged over HTTP between
//! a resource origin, a client, and a facilitator. It has no opinion on how a
//! proof is verified — only on what a proof, a requirement, and a receipt
//! look like on the wire.
//!
//! # Modules
//!
//! - [`requirement`] — `PaymentRequirement` / `PaymentRequirementsDocument` (the 402 body)
//! - [`proof`] — `PaymentProof` and its per-scheme payloads (the `X-PAYMENT` header)
//! - [`receipt`] — `PaymentReceipt` (the `X-PAYMENT-RESPONSE` header)
//! - [`facilitator`] — request/response bodies for the facilitator HTTP surface
//! - [`error`] — [`ProtocolError`], the structural decode error

pub mod error;
pub mod facilitator;
pub mod proof;
pub mod receipt;
pub mod requirement;

pub use error::ProtocolError;
pub use facilitator::{SettleRequest, SettleResponse, SupportedPair, SupportedResponse, VerifyRequest, VerifyResponse};
pub use proof::{ChannelProofPayload, ExactProofPayload, PaymentProof};
pub use receipt::PaymentReceipt;
pub use requirement::{Network, PaymentRequirement, PaymentRequirementsDocument, Scheme};

/// The only protocol version this crate understands.
pub const X402_VERSION: u32 = 1;
