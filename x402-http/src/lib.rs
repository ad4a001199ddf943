#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Axum integration for the x402 payment protocol (C8, C9).
//!
//! - [`middleware`] — [`middleware::PaymentLayer`], enforcing payment on
//!   protected routes
//! - [`facilitator`] — the facilitator HTTP surface (`/verify`, `/settle`,
//!   `/supported`)

pub mod facilitator;
pub mod middleware;

pub use middleware::{PaymentLayer, PaymentMiddleware};
