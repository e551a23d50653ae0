use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Local;
use serde_json::json;

use crate::workflows::credit::store::CreditProfileStore;

use super::intake::{
    loan_purposes, loan_tenures, professions, IntakeOutcome, LoanApplicationRepository, LoanDraft,
    LoanIntakeError, LoanIntakeService, MINIMUM_LOAN_AMOUNT,
};

pub fn loans_router<S, L>(service: Arc<LoanIntakeService<S, L>>) -> Router
where
    S: CreditProfileStore + 'static,
    L: LoanApplicationRepository + 'static,
{
    Router::new()
        .route("/api/loans/catalog", get(catalog_handler))
        .route("/api/loans/apply", post(apply_handler::<S, L>))
        .with_state(service)
}

pub(crate) async fn catalog_handler() -> Response {
    Json(json!({
        "professions": professions(),
        "purposes": loan_purposes(),
        "tenures": loan_tenures(),
        "minimum_amount": MINIMUM_LOAN_AMOUNT,
    }))
    .into_response()
}

pub(crate) async fn apply_handler<S, L>(
    State(service): State<Arc<LoanIntakeService<S, L>>>,
    Json(draft): Json<LoanDraft>,
) -> Response
where
    S: CreditProfileStore,
    L: LoanApplicationRepository,
{
    match service.submit(draft, Local::now().date_naive()) {
        Ok(IntakeOutcome::Accepted(record)) => {
            (StatusCode::ACCEPTED, Json(record)).into_response()
        }
        Ok(IntakeOutcome::RedirectToCreditCheck { reason }) => (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": reason, "redirect": "/credit-score" })),
        )
            .into_response(),
        Err(LoanIntakeError::Validation(error)) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": error.to_string() })),
        )
            .into_response(),
        Err(LoanIntakeError::Store(error)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": error.to_string() })),
        )
            .into_response(),
    }
}
