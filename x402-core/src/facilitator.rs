//! The [`Facilitator`] trait: a neutral third party's verify/settle/supported
//! surface (C9), implemented concretely against Solana in `x402-ledger`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use x402_proto::{PaymentProof, PaymentRequirement, SupportedPair};

use crate::error::PaymentError;
use crate::result::VerificationOutcome;

/// A boxed, `Send` future — the dyn-compatible shape async trait methods
/// need until `async fn` in traits supports object safety across crate
/// boundaries.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Performs payment verification and settlement for one or more
/// scheme/network pairs.
///
/// `verify` never contacts the ledger; `settle` always does. A `verify`
/// success does not imply `settle` will succeed (§4.8).
pub trait Facilitator: Send + Sync {
    /// Lightweight check: header structure, scheme/network support, payload
    /// shape. Does not contact the ledger.
    fn verify<'a>(&'a self, proof: &'a PaymentProof, requirement: &'a PaymentRequirement) -> BoxFuture<'a, Result<(), PaymentError>>;

    /// Full verification: ledger fetch, transfer/claim validation, and
    /// replay consumption.
    fn settle<'a>(&'a self, proof: &'a PaymentProof, requirement: &'a PaymentRequirement) -> BoxFuture<'a, Result<VerificationOutcome, PaymentError>>;

    /// The scheme/network pairs this facilitator serves.
    fn supported(&self) -> Vec<SupportedPair>;
}

impl<T: Facilitator + ?Sized> Facilitator for Arc<T> {
    fn verify<'a>(&'a self, proof: &'a PaymentProof, requirement: &'a PaymentRequirement) -> BoxFuture<'a, Result<(), PaymentError>> {
        (**self).verify(proof, requirement)
    }

    fn settle<'a>(&'a self, proof: &'a PaymentProof, requirement: &'a PaymentRequirement) -> BoxFuture<'a, Result<VerificationOutcome, PaymentError>> {
        (**self).settle(proof, requirement)
    }

    fn supported(&self) -> Vec<SupportedPair> {
        (**self).supported()
    }
}
