//! The facilitator HTTP surface (C9, §6/§4.8): `POST /verify`, `POST
//! /settle`, `GET /supported`.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};

use x402_core::Facilitator;
use x402_core::encoding::decode_header;
use x402_core::result::VerificationOutcome;
use x402_proto::facilitator::{SettleRequest, SettleResponse, SupportedResponse, VerifyRequest, VerifyResponse};
use x402_proto::{PaymentProof, PaymentRequirement};

/// Builds the facilitator's axum [`Router`] over `facilitator`.
///
/// `verify` never contacts the ledger; `settle` always does — mirroring the
/// distinction in [`x402_core::Facilitator`].
pub fn router<F: Facilitator + 'static>(facilitator: Arc<F>) -> Router {
    Router::new().route("/verify", post(verify::<F>)).route("/settle", post(settle::<F>)).route("/supported", get(supported::<F>)).with_state(facilitator)
}

fn decode_request(req: &VerifyRequest) -> Result<PaymentProof, Response> {
    decode_header(&req.payment_header).map_err(|e| (StatusCode::BAD_REQUEST, Json(VerifyResponse::invalid(e.kind()))).into_response())
}

async fn verify<F: Facilitator + 'static>(State(facilitator): State<Arc<F>>, Json(req): Json<VerifyRequest>) -> Response {
    let proof = match decode_request(&req) {
        Ok(proof) => proof,
        Err(response) => return response,
    };
    match facilitator.verify(&proof, &req.payment_requirements).await {
        Ok(()) => (StatusCode::OK, Json(VerifyResponse::valid())).into_response(),
        Err(e) => {
            tracing::debug!(kind = e.kind(), "verify rejected proof");
            (StatusCode::OK, Json(VerifyResponse::invalid(e.kind()))).into_response()
        }
    }
}

async fn settle<F: Facilitator + 'static>(State(facilitator): State<Arc<F>>, Json(req): Json<SettleRequest>) -> Response {
    let proof = match decode_request(&req) {
        Ok(proof) => proof,
        Err(_) => return (StatusCode::OK, Json(SettleResponse::error("InvalidHeader"))).into_response(),
    };
    match facilitator.settle(&proof, &req.payment_requirements).await {
        Ok(outcome) => (StatusCode::OK, Json(settle_success(&req.payment_requirements, &outcome))).into_response(),
        Err(e) => {
            tracing::warn!(kind = e.kind(), "settle failed");
            (StatusCode::OK, Json(SettleResponse::error(e.kind()))).into_response()
        }
    }
}

fn settle_success(requirement: &PaymentRequirement, outcome: &VerificationOutcome) -> SettleResponse {
    let tx_hash = outcome.signature.clone().unwrap_or_default();
    SettleResponse::success(tx_hash, requirement.network.as_str())
}

async fn supported<F: Facilitator + 'static>(State(facilitator): State<Arc<F>>) -> Json<SupportedResponse> {
    Json(SupportedResponse { supported: facilitator.supported() })
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;
    use x402_core::PaymentError;
    use x402_core::facilitator::BoxFuture;
    use x402_proto::{Network, Scheme, SupportedPair};

    use super::*;

    #[derive(Debug)]
    struct FakeFacilitator;

    impl Facilitator for FakeFacilitator {
        fn verify<'a>(&'a self, _proof: &'a PaymentProof, _requirement: &'a PaymentRequirement) -> BoxFuture<'a, Result<(), PaymentError>> {
            Box::pin(async { Ok(()) })
        }

        fn settle<'a>(&'a self, _proof: &'a PaymentProof, _requirement: &'a PaymentRequirement) -> BoxFuture<'a, Result<VerificationOutcome, PaymentError>> {
            Box::pin(async { Err(PaymentError::TxNotFound) })
        }

        fn supported(&self) -> Vec<SupportedPair> {
            vec![SupportedPair { scheme: Scheme::Exact, network: Network::SolanaDevnet }]
        }
    }

    #[tokio::test]
    async fn supported_reports_the_facilitators_pairs() {
        let app = router(Arc::new(FakeFacilitator));
        let response = app.oneshot(Request::builder().uri("/supported").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn verify_rejects_a_malformed_header() {
        let app = router(Arc::new(FakeFacilitator));
        let body = serde_json::to_vec(&VerifyRequest {
            x402_version: 1,
            payment_header: "not base64!!".to_string(),
            payment_requirements: PaymentRequirement::exact(Network::SolanaDevnet, "R", "A", 1, "/x"),
        })
        .unwrap();
        let response = app.oneshot(Request::builder().method("POST").uri("/verify").header("content-type", "application/json").body(Body::from(body)).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
