//! [`PaymentLayer`]/[`PaymentMiddleware`]: the tower `Layer`/`Service` pair
//! gating a downstream handler on a successful transfer or channel
//! verification (§4.7), in the shape of the teacher's `X402MiddlewareService`.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::Json;
use axum_core::extract::Request;
use axum_core::response::{IntoResponse, Response};
use http::{HeaderValue, StatusCode};
use tower::util::BoxCloneSyncService;
use tower::{Layer, Service};

use x402_core::Facilitator;
use x402_core::encoding::decode_header;
use x402_core::error::PaymentError;
use x402_core::result::VerificationOutcome;
use x402_proto::receipt::PaymentReceipt;
use x402_proto::{PaymentProof, PaymentRequirement, PaymentRequirementsDocument};

const PAYMENT_HEADER: &str = "x-payment";
const PAYMENT_RESPONSE_HEADER: &str = "x-payment-response";

/// The verification outcome attached to a request's extensions once payment
/// has cleared, so downstream handlers can read who paid and how much.
#[derive(Debug, Clone)]
pub struct PaymentInfo(pub VerificationOutcome);

/// A [`tower::Layer`] enforcing payment on the wrapped service.
///
/// `accepts` is checked in order (§3 tiered-pricing note) — the first entry
/// whose scheme and network match the presented proof is used.
pub struct PaymentLayer<F> {
    facilitator: Arc<F>,
    accepts: Arc<Vec<PaymentRequirement>>,
}

impl<F> Clone for PaymentLayer<F> {
    fn clone(&self) -> Self {
        Self { facilitator: Arc::clone(&self.facilitator), accepts: Arc::clone(&self.accepts) }
    }
}

impl<F: std::fmt::Debug> std::fmt::Debug for PaymentLayer<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentLayer").field("facilitator", &self.facilitator).field("accepts", &self.accepts.len()).finish()
    }
}

impl<F> PaymentLayer<F> {
    /// Gates a route on `accepts`, verified through `facilitator`.
    #[must_use]
    pub fn new(facilitator: Arc<F>, accepts: Vec<PaymentRequirement>) -> Self {
        Self { facilitator, accepts: Arc::new(accepts) }
    }
}

impl<S, F> Layer<S> for PaymentLayer<F>
where
    S: Service<Request, Response = Response, Error = Infallible> + Clone + Send + Sync + 'static,
    S::Future: Send + 'static,
    F: Facilitator + 'static,
{
    type Service = PaymentMiddleware<F>;

    fn layer(&self, inner: S) -> Self::Service {
        PaymentMiddleware { facilitator: Arc::clone(&self.facilitator), accepts: Arc::clone(&self.accepts), inner: BoxCloneSyncService::new(inner) }
    }
}

/// The `tower::Service` produced by [`PaymentLayer`].
#[allow(missing_debug_implementations)]
pub struct PaymentMiddleware<F> {
    facilitator: Arc<F>,
    accepts: Arc<Vec<PaymentRequirement>>,
    inner: BoxCloneSyncService<Request, Response, Infallible>,
}

impl<F> Clone for PaymentMiddleware<F> {
    fn clone(&self) -> Self {
        Self { facilitator: Arc::clone(&self.facilitator), accepts: Arc::clone(&self.accepts), inner: self.inner.clone() }
    }
}

impl<F> Service<Request> for PaymentMiddleware<F>
where
    F: Facilitator + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let facilitator = Arc::clone(&self.facilitator);
        let accepts = Arc::clone(&self.accepts);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            // Step 1: missing header -> 402 with the requirements document.
            let Some(header) = req.headers().get(PAYMENT_HEADER).and_then(|v| v.to_str().ok()) else {
                tracing::debug!("request carries no x-payment header, returning 402");
                return Ok(payment_required(&accepts, None));
            };

            // Step 2: structural decode failure -> 402 with an error message.
            let proof: PaymentProof = match decode_header(header) {
                Ok(proof) => proof,
                Err(e) => {
                    tracing::warn!(error = %e, "x-payment header failed to decode");
                    return Ok(payment_required(&accepts, Some(e.to_string())));
                }
            };

            // Step 3: select the first requirement matching scheme+network.
            let Some(requirement) = accepts.iter().find(|r| r.scheme == proof.scheme && r.network == proof.network) else {
                return Ok(payment_required(&accepts, Some(PaymentError::UnsupportedScheme(proof.scheme.as_str().to_string()).to_string())));
            };

            // Step 4: route to the transfer or channel verifier via settle.
            // This is the one call that consumes the replay cache; once
            // entered, this future runs to completion rather than being
            // raced against cancellation (§4.7's ordering note).
            let outcome = match facilitator.settle(&proof, requirement).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::warn!(error = %e, kind = e.kind(), "payment settlement failed");
                    return Ok(payment_required(&accepts, Some(e.to_string())));
                }
            };

            tracing::debug!(signature = ?outcome.signature, amount = outcome.amount, "payment settled");
            req.extensions_mut().insert(PaymentInfo(outcome.clone()));

            // Step 5: forward, then decorate the response with a receipt.
            let response = inner.call(req).await?;
            Ok(attach_receipt(response, requirement, &outcome))
        })
    }
}

fn payment_required(accepts: &[PaymentRequirement], error: Option<String>) -> Response {
    let body = error.map_or_else(|| PaymentRequirementsDocument::new(accepts.to_vec()), |e| PaymentRequirementsDocument::with_error(accepts.to_vec(), e));
    (StatusCode::PAYMENT_REQUIRED, Json(body)).into_response()
}

fn attach_receipt(mut response: Response, requirement: &PaymentRequirement, outcome: &VerificationOutcome) -> Response {
    let receipt = PaymentReceipt {
        signature: outcome.signature.clone().unwrap_or_default(),
        network: requirement.network.as_str().to_string(),
        amount: outcome.amount,
        timestamp: x402_core::timestamp::UnixTimestamp::now().as_millis(),
        status: PaymentReceipt::VERIFIED.to_string(),
        block_time: outcome.block_time,
        slot: outcome.slot,
    };
    if let Ok(encoded) = x402_core::encoding::encode_header(&receipt) {
        if let Ok(value) = HeaderValue::from_str(&encoded) {
            response.headers_mut().insert(PAYMENT_RESPONSE_HEADER, value);
        }
    }
    response
}
