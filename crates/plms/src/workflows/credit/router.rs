use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::gate::{EligibilityGate, MINIMUM_QUALIFYING_SCORE};
use super::store::CreditProfileStore;

#[derive(Debug, Deserialize)]
pub struct CreditScoreRequest {
    pub pan: String,
}

/// Router builder exposing the credit check and eligibility endpoints.
pub fn credit_router<S>(gate: Arc<EligibilityGate<S>>) -> Router
where
    S: CreditProfileStore + 'static,
{
    Router::new()
        .route("/api/credit/score", post(score_handler::<S>))
        .route("/api/credit/eligibility", get(eligibility_handler::<S>))
        .with_state(gate)
}

pub(crate) async fn score_handler<S>(
    State(gate): State<Arc<EligibilityGate<S>>>,
    axum::Json(request): axum::Json<CreditScoreRequest>,
) -> Response
where
    S: CreditProfileStore + 'static,
{
    match gate.record_credit_check(&request.pan) {
        Ok(score) => {
            let payload = json!({
                "score": score,
                "eligible": score > MINIMUM_QUALIFYING_SCORE,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => {
            let payload = json!({
                "error": error.to_string(),
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn eligibility_handler<S>(
    State(gate): State<Arc<EligibilityGate<S>>>,
) -> Response
where
    S: CreditProfileStore + 'static,
{
    (StatusCode::OK, axum::Json(gate.check())).into_response()
}
