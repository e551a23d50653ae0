use crate::infra::{
    ConsoleNotificationSink, InMemoryInstallmentRepository, InMemoryLoanRepository,
    SimulatedBankGateway,
};
use chrono::{Local, Months, NaiveDate};
use clap::Args;
use plms::config::AppConfig;
use plms::error::AppError;
use plms::workflows::credit::{
    check, EligibilityGate, InMemoryProfileStore, MINIMUM_QUALIFYING_SCORE,
};
use plms::workflows::loans::{IntakeOutcome, LoanDraft, LoanIntakeService};
use plms::workflows::repayment::{
    available_methods, format_card_number, method_descriptor, providers_for, CardDetails,
    FlowTiming, PaymentFlow, PaymentMethodKind, PaymentMode, PaymentStep, RepaymentId,
    RepaymentService, SessionError, COUNTDOWN_SECONDS,
};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// PAN to run the credit check and application with. Defaults to ABCDE1234F.
    #[arg(long)]
    pub(crate) pan: Option<String>,
    /// Due date of the first EMI (YYYY-MM-DD). Defaults to one month from today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) first_due: Option<NaiveDate>,
    /// Decline the first settlement attempt to walk the failure screen.
    #[arg(long)]
    pub(crate) decline_first: bool,
    /// Skip the EMI payment portion of the demo.
    #[arg(long)]
    pub(crate) skip_payment: bool,
}

#[derive(Args, Debug)]
pub(crate) struct CreditScoreArgs {
    /// PAN to score (format: ABCDE1234F)
    #[arg(long)]
    pub(crate) pan: String,
}

type DemoFlow =
    PaymentFlow<SimulatedBankGateway<InMemoryInstallmentRepository>, ConsoleNotificationSink>;

pub(crate) fn run_credit_score(args: CreditScoreArgs) -> Result<(), AppError> {
    let score = check(&args.pan)?;
    let verdict = if score > MINIMUM_QUALIFYING_SCORE {
        "eligible"
    } else {
        "below the cutoff"
    };
    println!(
        "{}: score {score} ({verdict}, cutoff {MINIMUM_QUALIFYING_SCORE})",
        args.pan.trim().to_uppercase()
    );
    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        pan,
        first_due,
        decline_first,
        skip_payment,
    } = args;

    let config = AppConfig::load()?;
    let pan = pan.unwrap_or_else(|| "ABCDE1234F".to_string());
    let today = Local::now().date_naive();
    let first_due =
        first_due.unwrap_or_else(|| today.checked_add_months(Months::new(1)).unwrap_or(today));

    println!("Personal loan servicing demo");

    let gate = Arc::new(EligibilityGate::new(Arc::new(
        InMemoryProfileStore::default(),
    )));
    let loans = Arc::new(LoanIntakeService::new(
        gate.clone(),
        Arc::new(InMemoryLoanRepository::default()),
    ));
    let draft = demo_loan_draft(&pan);

    println!("\nCredit check gate");
    match loans.submit(draft.clone(), today) {
        Ok(IntakeOutcome::RedirectToCreditCheck { reason }) => {
            println!("- Applying before any credit check -> redirected: {reason}");
        }
        Ok(IntakeOutcome::Accepted(record)) => {
            println!("- Application {} accepted without a credit check", record.id);
        }
        Err(err) => println!("- Submission failed: {err}"),
    }
    match gate.record_credit_check("not-a-pan") {
        Ok(score) => println!("- 'not-a-pan' scored {score}"),
        Err(err) => println!("- 'not-a-pan' rejected: {err}"),
    }
    let score = gate.record_credit_check(&pan)?;
    let verdict = if score > MINIMUM_QUALIFYING_SCORE {
        "eligible"
    } else {
        "not eligible"
    };
    println!("- {pan} scores {score} -> {verdict} (cutoff {MINIMUM_QUALIFYING_SCORE})");

    println!("\nLoan application intake");
    let record = match loans.submit(draft, today) {
        Ok(IntakeOutcome::Accepted(record)) => record,
        Ok(IntakeOutcome::RedirectToCreditCheck { reason }) => {
            println!("- Still redirected: {reason}");
            return Ok(());
        }
        Err(err) => {
            println!("- Submission rejected: {err}");
            return Ok(());
        }
    };
    println!(
        "- Accepted application {} -> status {}",
        record.id,
        record.status.label()
    );
    println!(
        "  {} | {} | \u{20b9}{} over {} months",
        record.full_name, record.purpose, record.amount, record.tenure_months
    );
    println!("  Score on file: {}", record.score_preview);

    if skip_payment {
        return Ok(());
    }

    println!("\nEMI payment dialog");
    let installments = Arc::new(InMemoryInstallmentRepository::default());
    let emi_amount = (record.amount / u32::from(record.tenure_months)).max(1);
    installments.seed_schedule(&record.id, first_due, emi_amount, 6);
    let service = Arc::new(RepaymentService::new(installments));
    let rail = Arc::new(SimulatedBankGateway::new(service));
    if decline_first || config.simulation.fail_first_payment {
        rail.decline_next_payment();
        println!("- Rail armed to decline the first settlement");
    }

    let flow = PaymentFlow::new(
        record.id.clone(),
        PaymentMode::All,
        rail,
        Arc::new(ConsoleNotificationSink),
        FlowTiming::from_simulation(&config.simulation),
    );

    if let Err(err) = flow.refresh() {
        println!("- Dialog refused the refresh: {err}");
        return Ok(());
    }
    if let Some(err) = flow.fetch_error() {
        println!("- Schedule fetch failed: {err}");
        return Ok(());
    }

    println!("- Methods on offer:");
    for method in available_methods() {
        println!("    {} ({})", method.display_name, method.kind.id());
    }

    println!("- Schedule as fetched:");
    print_rows(&flow);

    let Some(target) = flow.rows().into_iter().find(|row| row.payable) else {
        println!("- Nothing payable; the schedule is already settled");
        return Ok(());
    };
    println!(
        "- Paying EMI #{} ({}) through Google Pay",
        target.emi_number, target.repayment_id
    );
    if let Err(err) = pay_by_upi(&flow, &target.repayment_id).await {
        println!("  Dialog error: {err}");
        flow.close();
        return Ok(());
    }

    match flow.step() {
        PaymentStep::Success => println!(
            "- Success screen; the dialog auto-returns to the list after {COUNTDOWN_SECONDS} seconds"
        ),
        PaymentStep::Failure => {
            if let Some(reason) = flow.failure_reason() {
                println!("- Failure screen: {reason}");
            }
            println!(
                "- Trying again with {}",
                method_descriptor(PaymentMethodKind::Card).display_name
            );
            match settle_by_card(&flow, &record.full_name).await {
                Ok(PaymentStep::Success) => println!("- Card settlement went through"),
                Ok(step) => println!("- Dialog ended on the '{}' screen", step.label()),
                Err(err) => println!("  Dialog error: {err}"),
            }
        }
        step => println!("- Dialog ended on the '{}' screen", step.label()),
    }

    println!("- Rows with the local attempt overlaid:");
    print_rows(&flow);

    println!("- Reopening the dialog against the server state:");
    flow.close();
    if let Err(err) = flow.refresh() {
        println!("- Dialog refused the refresh: {err}");
        return Ok(());
    }
    print_rows(&flow);

    println!("- Sequential mode offers only the next EMI due:");
    if let Err(err) = flow.set_mode(PaymentMode::Sequential) {
        println!("- Mode switch failed: {err}");
        return Ok(());
    }
    print_rows(&flow);
    flow.close();

    Ok(())
}

async fn pay_by_upi(flow: &DemoFlow, id: &RepaymentId) -> Result<(), SessionError> {
    flow.select_installment(id)?;
    flow.choose_method(PaymentMethodKind::Upi).await?;
    match providers_for(PaymentMethodKind::Upi) {
        Ok(providers) => {
            let names: Vec<&str> = providers.iter().map(|provider| provider.name).collect();
            println!("    UPI apps: {}", names.join(", "));
        }
        Err(err) => println!("    {err}"),
    }
    flow.choose_provider("Google Pay")?;
    flow.verify_upi("demo@okbank").await?;
    flow.submit_upi_pin("1234").await?;
    Ok(())
}

async fn settle_by_card(flow: &DemoFlow, holder: &str) -> Result<PaymentStep, SessionError> {
    flow.retry()?;
    flow.choose_method(PaymentMethodKind::Card).await?;
    flow.submit_card(CardDetails {
        number: format_card_number("4111111111111111"),
        expiry: "12/27".to_string(),
        cvv: "123".to_string(),
        name: holder.to_string(),
    })
    .await
}

fn print_rows(flow: &DemoFlow) {
    let rows = flow.rows();
    if rows.is_empty() {
        println!("    (no rows)");
        return;
    }
    for row in rows {
        let note = match (&row.transaction_id, &row.failure_reason) {
            (Some(txn), _) => format!(" | txn {txn}"),
            (None, Some(reason)) => format!(" | {reason}"),
            (None, None) => String::new(),
        };
        println!(
            "    EMI #{:02} due {} | \u{20b9}{} | {}{}",
            row.emi_number,
            row.due_date,
            row.emi_amount,
            row.status.label(),
            note
        );
    }
}

fn demo_loan_draft(pan: &str) -> LoanDraft {
    LoanDraft {
        full_name: "Asha Verma".to_string(),
        profession: "Chartered Accountant".to_string(),
        purpose: "Home Renovation".to_string(),
        amount: 600_000,
        tenure_months: 48,
        pan: pan.to_string(),
    }
}
