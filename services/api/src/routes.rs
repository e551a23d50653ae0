use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use plms::workflows::credit::{credit_router, CreditProfileStore, EligibilityGate};
use plms::workflows::loans::{loans_router, LoanApplicationRepository, LoanIntakeService};
use plms::workflows::repayment::{repayment_router, InstallmentRepository, RepaymentService};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_routes<S, L, R>(
    gate: Arc<EligibilityGate<S>>,
    loans: Arc<LoanIntakeService<S, L>>,
    repayments: Arc<RepaymentService<R>>,
) -> axum::Router
where
    S: CreditProfileStore + 'static,
    L: LoanApplicationRepository + 'static,
    R: InstallmentRepository + 'static,
{
    credit_router(gate)
        .merge(loans_router(loans))
        .merge(repayment_router(repayments))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
