#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Solana-backed verification for the x402 payment protocol.
//!
//! This crate implements the three hard subsystems: the transaction parser
//! (C3), the replay-prevention cache (C4), the transfer verifier (C5), the
//! channel verifier (C6), and the requirements generator (C7). It also
//! assembles [`facilitator::LedgerFacilitator`], the concrete
//! [`x402_core::Facilitator`] implementation the HTTP layer drives.
//!
//! # Modules
//!
//! - [`address`] — associated-token-account derivation
//! - [`client`] — the [`client::LedgerClient`] RPC collaborator trait and its
//!   Solana RPC implementation
//! - [`parser`] — balance-delta transaction parsing (C3)
//! - [`replay`] — the replay cache (C4)
//! - [`exact`] — the transfer verifier (C5)
//! - [`channel`] — the channel verifier (C6)
//! - [`requirements`] — the requirements generator (C7)
//! - [`facilitator`] — glue implementing [`x402_core::Facilitator`]

pub mod address;
pub mod channel;
pub mod client;
pub mod exact;
pub mod facilitator;
pub mod parser;
pub mod replay;
pub mod requirements;

pub use channel::{ChannelRecord, ChannelStatus, ChannelVerifier};
pub use client::{LedgerClient, RpcLedgerClient};
pub use exact::TransferVerifier;
pub use facilitator::LedgerFacilitator;
pub use replay::{ExternalKvReplayCache, InMemoryReplayCache, KvBackend, ReplayCache};
pub use requirements::RequirementsGenerator;
