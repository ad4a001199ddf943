//! [`LedgerFacilitator`]: the concrete [`Facilitator`] implementation
//! dispatching by scheme to the transfer and channel verifiers.

use std::sync::Arc;
use std::time::Duration;

use x402_core::PaymentError;
use x402_core::clock::{Clock, SystemClock};
use x402_core::facilitator::{BoxFuture, Facilitator};
use x402_core::result::VerificationOutcome;
use x402_proto::proof::ProofPayload;
use x402_proto::{Network, PaymentProof, PaymentRequirement, Scheme, SupportedPair};

use crate::channel::{ChannelVerifier, ChannelVerifyOptions};
use crate::exact::{TransferVerifier, VerifyOptions};
use crate::replay::ReplayCache;

/// A [`Facilitator`] backed by real Solana transfer and channel verification.
pub struct LedgerFacilitator {
    transfer: TransferVerifier,
    channel: ChannelVerifier,
    clock: Arc<dyn Clock>,
    networks: Vec<Network>,
}

impl std::fmt::Debug for LedgerFacilitator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerFacilitator").field("networks", &self.networks).finish_non_exhaustive()
    }
}

impl LedgerFacilitator {
    /// Assembles a facilitator over the given ledger client and replay
    /// cache, serving `networks`.
    #[must_use]
    pub fn new(client: Arc<dyn crate::client::LedgerClient>, replay: Arc<dyn ReplayCache>, min_replay_ttl: Duration, networks: Vec<Network>) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Self { transfer: TransferVerifier::new(Arc::clone(&client), replay, Arc::clone(&clock), min_replay_ttl), channel: ChannelVerifier::new(client), clock, networks }
    }

    fn check_scheme_and_network(&self, proof: &PaymentProof, requirement: &PaymentRequirement) -> Result<(), PaymentError> {
        if proof.scheme != requirement.scheme {
            return Err(PaymentError::UnsupportedScheme(requirement.scheme.as_str().to_string()));
        }
        if !self.networks.contains(&requirement.network) {
            return Err(PaymentError::UnsupportedNetwork(requirement.network.as_str().to_string()));
        }
        Ok(())
    }
}

impl Facilitator for LedgerFacilitator {
    fn verify<'a>(&'a self, proof: &'a PaymentProof, requirement: &'a PaymentRequirement) -> BoxFuture<'a, Result<(), PaymentError>> {
        Box::pin(async move {
            self.check_scheme_and_network(proof, requirement)?;
            // Lightweight: structural checks only, no ledger contact (§4.8).
            proof.parse_payload()?;
            Ok(())
        })
    }

    fn settle<'a>(&'a self, proof: &'a PaymentProof, requirement: &'a PaymentRequirement) -> BoxFuture<'a, Result<VerificationOutcome, PaymentError>> {
        Box::pin(async move {
            self.check_scheme_and_network(proof, requirement)?;
            match requirement.scheme {
                Scheme::Exact => self.transfer.verify_proof(proof, requirement, VerifyOptions::default()).await,
                Scheme::Channel => {
                    let ProofPayload::Channel(claim) = proof.parse_payload()? else {
                        return Err(PaymentError::InvalidHeader("proof payload does not match channel scheme".to_string()));
                    };
                    let now = i64::try_from(self.clock.now().as_secs()).unwrap_or(i64::MAX);
                    self.channel.verify_claim(&claim, requirement, now, ChannelVerifyOptions::default()).await
                }
            }
        })
    }

    fn supported(&self) -> Vec<SupportedPair> {
        self.networks.iter().flat_map(|&network| [SupportedPair { scheme: Scheme::Exact, network }, SupportedPair { scheme: Scheme::Channel, network }]).collect()
    }
}
