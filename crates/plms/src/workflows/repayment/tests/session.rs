use crate::workflows::repayment::domain::{
    CardDetails, InstallmentStatus, PaymentAttempt, PaymentMode, TransactionReceipt,
};
use crate::workflows::repayment::gateway::{PaymentError, VerificationError};
use crate::workflows::repayment::methods::PaymentMethodKind;
use crate::workflows::repayment::schedule::EffectiveStatus;
use crate::workflows::repayment::session::{
    CountdownTicket, MethodRoute, PaymentOutcome, PaymentSession, PaymentStep, SessionError,
    TickOutcome, VerifyOutcome, COUNTDOWN_SECONDS,
};

use super::common::{date, installment, rid, sample_schedule};

fn session_with_schedule(mode: PaymentMode) -> PaymentSession {
    let mut session = PaymentSession::new(mode);
    session.sync_installments(sample_schedule()).unwrap();
    session
}

fn receipt(transaction_id: &str, payment_method: &str) -> TransactionReceipt {
    TransactionReceipt {
        transaction_id: transaction_id.to_string(),
        payment_method: payment_method.to_string(),
    }
}

fn drain_countdown(session: &mut PaymentSession, countdown: CountdownTicket) {
    loop {
        match session.countdown_tick(countdown) {
            TickOutcome::Continue(_) => {}
            TickOutcome::Finished => break,
            TickOutcome::Stale => panic!("countdown went stale while draining"),
        }
    }
}

fn pay_through_upi(session: &mut PaymentSession, id: &str) -> CountdownTicket {
    session.select_installment(&rid(id)).unwrap();
    session.choose_method(PaymentMethodKind::Upi).unwrap();
    session.choose_provider("Google Pay").unwrap();
    let verify = session.submit_upi_id("user@upi").unwrap();
    assert_eq!(
        session.complete_upi_verification(verify, Ok(())),
        VerifyOutcome::Verified
    );
    let ticket = session.submit_upi_pin("1234").unwrap();
    match session.complete_payment(
        ticket,
        Ok(receipt("txn-000042", "Google Pay")),
        date(2025, 6, 10),
    ) {
        PaymentOutcome::Succeeded { countdown, .. } => countdown,
        other => panic!("expected a settled payment, got {other:?}"),
    }
}

#[test]
fn upi_path_walks_every_screen() {
    let mut session = session_with_schedule(PaymentMode::All);

    session.select_installment(&rid("r2")).unwrap();
    assert_eq!(session.step(), PaymentStep::Method);

    let route = session.choose_method(PaymentMethodKind::Upi).unwrap();
    assert!(matches!(route, MethodRoute::CollectProvider));
    assert_eq!(session.step(), PaymentStep::Bank);

    session.choose_provider("PhonePe").unwrap();
    assert_eq!(session.step(), PaymentStep::UpiVerify);

    let verify = session.submit_upi_id("  user@upi  ").unwrap();
    assert_eq!(verify.upi_id, "user@upi");
    assert!(session.is_in_flight());

    assert_eq!(
        session.complete_upi_verification(verify, Ok(())),
        VerifyOutcome::Verified
    );
    assert!(session.upi_verified());
    assert_eq!(session.step(), PaymentStep::UpiPin);

    let ticket = session.submit_upi_pin("1234").unwrap();
    assert_eq!(ticket.repayment_id, rid("r2"));
    assert_eq!(ticket.method_label, "PhonePe");
    assert_eq!(session.step(), PaymentStep::Processing);

    let outcome = session.complete_payment(
        ticket,
        Ok(receipt("txn-000007", "PhonePe")),
        date(2025, 6, 10),
    );
    assert!(matches!(outcome, PaymentOutcome::Succeeded { .. }));
    assert_eq!(session.step(), PaymentStep::Success);
    assert_eq!(session.countdown_remaining(), COUNTDOWN_SECONDS);
    assert!(matches!(
        session.attempts().get(&rid("r2")),
        Some(PaymentAttempt::Paid(_))
    ));
}

#[test]
fn net_banking_submits_straight_from_method_selection() {
    let mut session = session_with_schedule(PaymentMode::All);
    session.select_installment(&rid("r2")).unwrap();

    let route = session.choose_method(PaymentMethodKind::NetBanking).unwrap();
    let ticket = match route {
        MethodRoute::Submit(ticket) => ticket,
        other => panic!("expected an immediate submission, got {other:?}"),
    };
    assert_eq!(ticket.method_label, "netbanking");
    assert_eq!(session.step(), PaymentStep::Processing);
    assert!(session.is_in_flight());
}

#[test]
fn card_path_requires_complete_details() {
    let mut session = session_with_schedule(PaymentMode::All);
    session.select_installment(&rid("r3")).unwrap();
    session.choose_method(PaymentMethodKind::Card).unwrap();
    assert_eq!(session.step(), PaymentStep::Card);

    let partial = CardDetails {
        number: "4111111111111111".to_string(),
        expiry: "12/27".to_string(),
        cvv: String::new(),
        name: "A Borrower".to_string(),
    };
    assert_eq!(
        session.submit_card(partial).unwrap_err(),
        SessionError::IncompleteCard
    );
    assert_eq!(session.step(), PaymentStep::Card);

    let complete = CardDetails {
        number: "4111111111111111".to_string(),
        expiry: "12/27".to_string(),
        cvv: "123".to_string(),
        name: "A Borrower".to_string(),
    };
    let ticket = session.submit_card(complete).unwrap();
    assert_eq!(ticket.method_label, "card");
}

#[test]
fn upi_pin_must_be_four_digits() {
    let mut session = session_with_schedule(PaymentMode::All);
    session.select_installment(&rid("r2")).unwrap();
    session.choose_method(PaymentMethodKind::Upi).unwrap();
    session.choose_provider("Paytm").unwrap();
    let verify = session.submit_upi_id("user@upi").unwrap();
    session.complete_upi_verification(verify, Ok(()));

    for pin in ["123", "12345", "12a4", ""] {
        assert_eq!(
            session.submit_upi_pin(pin).unwrap_err(),
            SessionError::InvalidPin,
            "pin {pin:?} should be rejected"
        );
    }
    assert!(session.submit_upi_pin("0000").is_ok());
}

#[test]
fn empty_upi_id_is_rejected() {
    let mut session = session_with_schedule(PaymentMode::All);
    session.select_installment(&rid("r2")).unwrap();
    session.choose_method(PaymentMethodKind::Upi).unwrap();
    session.choose_provider("BHIM UPI").unwrap();

    assert_eq!(
        session.submit_upi_id("   ").unwrap_err(),
        SessionError::EmptyUpiId
    );
    assert!(!session.is_in_flight());
}

#[test]
fn rejected_verification_keeps_the_verify_screen() {
    let mut session = session_with_schedule(PaymentMode::All);
    session.select_installment(&rid("r2")).unwrap();
    session.choose_method(PaymentMethodKind::Upi).unwrap();
    session.choose_provider("Google Pay").unwrap();
    let verify = session.submit_upi_id("typo@upi").unwrap();

    let outcome = session.complete_upi_verification(verify, Err(VerificationError::Rejected));
    assert_eq!(outcome, VerifyOutcome::Rejected(VerificationError::Rejected));
    assert_eq!(session.step(), PaymentStep::UpiVerify);
    assert!(!session.upi_verified());
    assert!(!session.is_in_flight());
}

#[test]
fn in_flight_session_rejects_everything_but_close() {
    let mut session = session_with_schedule(PaymentMode::All);
    session.select_installment(&rid("r2")).unwrap();
    session.choose_method(PaymentMethodKind::Upi).unwrap();
    session.choose_provider("Google Pay").unwrap();
    let verify = session.submit_upi_id("user@upi").unwrap();

    assert_eq!(
        session.select_installment(&rid("r3")).unwrap_err(),
        SessionError::Busy
    );
    assert_eq!(
        session.set_mode(PaymentMode::Sequential).unwrap_err(),
        SessionError::Busy
    );
    assert_eq!(
        session.sync_installments(sample_schedule()).unwrap_err(),
        SessionError::Busy
    );

    session.close();
    assert_eq!(session.step(), PaymentStep::List);
    assert_eq!(
        session.complete_upi_verification(verify, Ok(())),
        VerifyOutcome::Stale
    );
    assert!(!session.upi_verified());
}

#[test]
fn paid_installments_cannot_be_selected() {
    let mut session = session_with_schedule(PaymentMode::All);
    assert_eq!(
        session.select_installment(&rid("r1")).unwrap_err(),
        SessionError::AlreadyPaid(rid("r1"))
    );
}

#[test]
fn sequential_mode_only_offers_the_next_unpaid() {
    let mut session = session_with_schedule(PaymentMode::Sequential);
    assert_eq!(
        session.select_installment(&rid("r3")).unwrap_err(),
        SessionError::NotUpNext(rid("r3"))
    );
    session.select_installment(&rid("r2")).unwrap();
    assert_eq!(session.step(), PaymentStep::Method);
}

#[test]
fn selecting_an_unknown_installment_errors() {
    let mut session = session_with_schedule(PaymentMode::All);
    assert_eq!(
        session.select_installment(&rid("r9")).unwrap_err(),
        SessionError::UnknownInstallment(rid("r9"))
    );
}

#[test]
fn countdown_returns_to_list_and_keeps_attempts() {
    let mut session = session_with_schedule(PaymentMode::All);
    let countdown = pay_through_upi(&mut session, "r2");

    for remaining in (1..COUNTDOWN_SECONDS).rev() {
        assert_eq!(session.countdown_tick(countdown), TickOutcome::Continue(remaining));
    }
    assert_eq!(session.countdown_tick(countdown), TickOutcome::Finished);

    assert_eq!(session.step(), PaymentStep::List);
    assert!(session.selected().is_none());
    assert!(session.method().is_none());
    let row = session
        .rows()
        .into_iter()
        .find(|row| row.repayment_id == rid("r2"))
        .unwrap();
    assert_eq!(row.status, EffectiveStatus::Paid);
    assert_eq!(row.transaction_id.as_deref(), Some("txn-000042"));
}

#[test]
fn countdown_tick_is_stale_off_the_result_screens() {
    let mut session = session_with_schedule(PaymentMode::All);
    session.select_installment(&rid("r2")).unwrap();
    session.choose_method(PaymentMethodKind::Upi).unwrap();
    session.choose_provider("Google Pay").unwrap();
    let verify = session.submit_upi_id("user@upi").unwrap();
    session.complete_upi_verification(verify, Ok(()));
    let ticket = session.submit_upi_pin("1234").unwrap();
    let countdown = match session.complete_payment(
        ticket,
        Err(PaymentError::Declined("Insufficient funds".to_string())),
        date(2025, 6, 10),
    ) {
        PaymentOutcome::Failed { countdown, .. } => countdown,
        other => panic!("expected a declined payment, got {other:?}"),
    };

    session.retry().unwrap();
    assert_eq!(session.step(), PaymentStep::Method);
    assert_eq!(session.countdown_tick(countdown), TickOutcome::Stale);
    assert_eq!(session.step(), PaymentStep::Method);
}

#[test]
fn declined_payment_shows_the_failure_screen() {
    let mut session = session_with_schedule(PaymentMode::All);
    session.select_installment(&rid("r2")).unwrap();
    let route = session.choose_method(PaymentMethodKind::NetBanking).unwrap();
    let ticket = match route {
        MethodRoute::Submit(ticket) => ticket,
        other => panic!("expected an immediate submission, got {other:?}"),
    };

    let outcome = session.complete_payment(
        ticket,
        Err(PaymentError::Declined("Insufficient funds".to_string())),
        date(2025, 6, 10),
    );
    match outcome {
        PaymentOutcome::Failed { reason, .. } => assert_eq!(reason, "Insufficient funds"),
        other => panic!("expected a declined payment, got {other:?}"),
    }
    assert_eq!(session.step(), PaymentStep::Failure);
    assert_eq!(session.failure_reason(), Some("Insufficient funds"));
    let row = session
        .rows()
        .into_iter()
        .find(|row| row.repayment_id == rid("r2"))
        .unwrap();
    assert_eq!(row.status, EffectiveStatus::Failed);
    assert_eq!(row.failure_reason.as_deref(), Some("Insufficient funds"));
}

#[test]
fn retry_clears_the_failure_but_keeps_the_selection() {
    let mut session = session_with_schedule(PaymentMode::All);
    session.select_installment(&rid("r2")).unwrap();
    session.choose_method(PaymentMethodKind::Upi).unwrap();
    session.choose_provider("Google Pay").unwrap();
    let verify = session.submit_upi_id("user@upi").unwrap();
    session.complete_upi_verification(verify, Ok(()));
    let ticket = session.submit_upi_pin("1234").unwrap();
    session.complete_payment(
        ticket,
        Err(PaymentError::Unreachable),
        date(2025, 6, 10),
    );

    assert_eq!(session.step(), PaymentStep::Failure);
    assert_eq!(
        session.failure_reason(),
        Some("Payment failed due to an unexpected error.")
    );
    assert!(matches!(
        session.attempts().get(&rid("r2")),
        Some(PaymentAttempt::Failed { .. })
    ));

    session.retry().unwrap();
    assert_eq!(session.step(), PaymentStep::Method);
    assert!(session.failure_reason().is_none());
    assert_eq!(session.selected(), Some(&rid("r2")));
    assert!(session.method().is_none());
    assert!(session.provider().is_none());
}

#[test]
fn close_resets_mode_and_recorded_attempts() {
    let mut session = session_with_schedule(PaymentMode::All);
    session.set_mode(PaymentMode::Sequential).unwrap();
    let countdown = pay_through_upi(&mut session, "r2");

    session.close();
    assert_eq!(session.step(), PaymentStep::List);
    assert_eq!(session.mode(), PaymentMode::All);
    assert!(session.attempts().is_empty());
    assert_eq!(session.countdown_remaining(), COUNTDOWN_SECONDS);
    assert_eq!(session.countdown_tick(countdown), TickOutcome::Stale);
}

#[test]
fn switching_mode_mid_flow_resets_to_the_list() {
    let mut session = session_with_schedule(PaymentMode::All);
    session.select_installment(&rid("r2")).unwrap();
    assert_eq!(session.step(), PaymentStep::Method);

    session.set_mode(PaymentMode::Sequential).unwrap();
    assert_eq!(session.step(), PaymentStep::List);
    assert_eq!(session.mode(), PaymentMode::Sequential);
    assert!(session.selected().is_none());
}

#[test]
fn payment_finishing_after_close_is_discarded() {
    let mut session = session_with_schedule(PaymentMode::All);
    session.select_installment(&rid("r2")).unwrap();
    session.choose_method(PaymentMethodKind::Upi).unwrap();
    session.choose_provider("Google Pay").unwrap();
    let verify = session.submit_upi_id("user@upi").unwrap();
    session.complete_upi_verification(verify, Ok(()));
    let ticket = session.submit_upi_pin("1234").unwrap();

    session.close();
    let outcome = session.complete_payment(
        ticket,
        Ok(receipt("txn-000099", "Google Pay")),
        date(2025, 6, 10),
    );
    assert_eq!(outcome, PaymentOutcome::Stale);
    assert!(session.attempts().is_empty());
    assert_eq!(session.step(), PaymentStep::List);
}

#[test]
fn syncing_prunes_attempts_the_server_confirmed() {
    let mut session = session_with_schedule(PaymentMode::All);
    let countdown = pay_through_upi(&mut session, "r2");
    drain_countdown(&mut session, countdown);
    let countdown = pay_through_upi(&mut session, "r4");
    drain_countdown(&mut session, countdown);
    assert_eq!(session.attempts().len(), 2);

    // The refetch confirms r2 as settled and drops r4 entirely.
    let mut refreshed = sample_schedule();
    refreshed[1].status = InstallmentStatus::Paid;
    refreshed[1].paid_date = Some(date(2025, 6, 10));
    refreshed[1].transaction_id = Some("txn-000042".to_string());
    refreshed[1].payment_method = Some("Google Pay".to_string());
    refreshed.remove(3);
    session.sync_installments(refreshed).unwrap();

    assert!(session.attempts().is_empty());
    let row = session
        .rows()
        .into_iter()
        .find(|row| row.repayment_id == rid("r2"))
        .unwrap();
    assert_eq!(row.status, EffectiveStatus::Paid);
}

#[test]
fn change_method_returns_to_method_selection() {
    let mut session = session_with_schedule(PaymentMode::All);
    session.select_installment(&rid("r2")).unwrap();
    session.choose_method(PaymentMethodKind::Upi).unwrap();
    session.choose_provider("Google Pay").unwrap();

    session.change_method().unwrap();
    assert_eq!(session.step(), PaymentStep::Method);
    assert!(session.provider().is_none());
    assert!(session.method().is_none());
    assert_eq!(session.selected(), Some(&rid("r2")));
}

#[test]
fn back_to_list_clears_the_selection() {
    let mut session = session_with_schedule(PaymentMode::All);
    session.select_installment(&rid("r2")).unwrap();

    session.back_to_list().unwrap();
    assert_eq!(session.step(), PaymentStep::List);
    assert!(session.selected().is_none());
}

#[test]
fn wrong_step_error_names_the_screen() {
    let mut session = session_with_schedule(PaymentMode::All);
    let error = session.submit_upi_pin("1234").unwrap_err();
    assert_eq!(
        error.to_string(),
        "action not available on the 'list' screen"
    );
}

#[test]
fn unknown_provider_is_rejected() {
    let mut session = session_with_schedule(PaymentMode::All);
    session.select_installment(&rid("r2")).unwrap();
    session.choose_method(PaymentMethodKind::Upi).unwrap();
    assert_eq!(
        session.choose_provider("Some Wallet").unwrap_err(),
        SessionError::UnknownProvider("Some Wallet".to_string())
    );
}

#[test]
fn a_vanished_selection_resets_the_dialog_to_the_list() {
    let mut session = session_with_schedule(PaymentMode::All);
    session.select_installment(&rid("r2")).unwrap();
    assert_eq!(session.step(), PaymentStep::Method);

    let shorter = vec![
        installment(1, InstallmentStatus::Paid),
        installment(3, InstallmentStatus::Pending),
    ];
    session.sync_installments(shorter).unwrap();
    assert_eq!(session.step(), PaymentStep::List);
    assert!(session.selected().is_none());
}
