use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryInstallmentRepository, InMemoryLoanRepository};
use crate::routes::with_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::{Local, Months};
use plms::config::AppConfig;
use plms::error::AppError;
use plms::telemetry;
use plms::workflows::credit::{EligibilityGate, InMemoryProfileStore};
use plms::workflows::loans::LoanIntakeService;
use plms::workflows::repayment::{ApplicationId, RepaymentService};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let gate = Arc::new(EligibilityGate::new(Arc::new(
        InMemoryProfileStore::default(),
    )));
    let loans = Arc::new(LoanIntakeService::new(
        gate.clone(),
        Arc::new(InMemoryLoanRepository::default()),
    ));

    // The in-memory store ships with one schedule so the repayment
    // endpoints answer something useful out of the box.
    let installments = Arc::new(InMemoryInstallmentRepository::default());
    let demo_application = ApplicationId("loan-000001".to_string());
    let today = Local::now().date_naive();
    let first_due = today.checked_add_months(Months::new(1)).unwrap_or(today);
    let seeded = installments.seed_schedule(&demo_application, first_due, 12_500, 6);
    info!(
        application = %demo_application,
        emis = seeded.len(),
        "seeded demo repayment schedule"
    );
    let repayments = Arc::new(RepaymentService::new(installments));

    let app = with_routes(gate, loans, repayments)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "loan servicing API ready");

    axum::serve(listener, app).await?;
    Ok(())
}
