use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Local;
use serde::Deserialize;
use serde_json::json;

use crate::error::AppError;

use super::domain::{ApplicationId, Installment, RepaymentId};
use super::service::{InstallmentRepository, RepaymentError, RepaymentService};

/// Query parameters accepted by the simulated payment endpoint.
#[derive(Debug, Deserialize)]
pub struct SimulatePayParams {
    #[serde(rename = "repaymentId")]
    pub repayment_id: String,
    pub method: String,
}

pub fn repayment_router<R>(service: Arc<RepaymentService<R>>) -> Router
where
    R: InstallmentRepository + 'static,
{
    Router::new()
        .route("/api/repayments/loan/:application_id", get(schedule_handler::<R>))
        .route("/api/repayments/simulatepay", post(simulate_pay_handler::<R>))
        .route("/api/repayments/pay/:repayment_id", post(pay_handler::<R>))
        .with_state(service)
}

pub(crate) async fn schedule_handler<R>(
    State(service): State<Arc<RepaymentService<R>>>,
    Path(application_id): Path<String>,
) -> Result<Json<Vec<Installment>>, AppError>
where
    R: InstallmentRepository,
{
    let schedule = service.schedule(
        &ApplicationId(application_id),
        Local::now().date_naive(),
    )?;
    Ok(Json(schedule))
}

pub(crate) async fn simulate_pay_handler<R>(
    State(service): State<Arc<RepaymentService<R>>>,
    Query(params): Query<SimulatePayParams>,
) -> Response
where
    R: InstallmentRepository,
{
    let id = RepaymentId(params.repayment_id);
    match service.simulate_pay(&id, &params.method, Local::now().date_naive()) {
        Ok(receipt) => (StatusCode::OK, Json(receipt)).into_response(),
        Err(error) => payment_error_response(error),
    }
}

pub(crate) async fn pay_handler<R>(
    State(service): State<Arc<RepaymentService<R>>>,
    Path(repayment_id): Path<String>,
) -> Response
where
    R: InstallmentRepository,
{
    let id = RepaymentId(repayment_id);
    match service.pay(&id, Local::now().date_naive()) {
        Ok(receipt) => (
            StatusCode::OK,
            Json(json!({
                "status": "PAID",
                "transactionId": receipt.transaction_id,
                "paymentMethod": receipt.payment_method,
            })),
        )
            .into_response(),
        Err(error) => payment_error_response(error),
    }
}

// Payment endpoints surface errors under "message"; that is the field
// the dialog reads for its failure screen.
fn payment_error_response(error: RepaymentError) -> Response {
    let status = match error {
        RepaymentError::NotFound => StatusCode::NOT_FOUND,
        RepaymentError::AlreadyPaid => StatusCode::CONFLICT,
        RepaymentError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "message": error.to_string() }))).into_response()
}
