use chrono::Utc;
use pg_settle::domain::parties::{PayeeInfo, PayerInfo};
use pg_settle::domain::payment::Payment;
use pg_settle::domain::pg_info::PgInfo;
use pg_settle::domain::status::PaymentStatus;
use pg_settle::error::{ErrorKind, PaymentError};
use rust_decimal_macros::dec;

fn pending() -> Payment {
    Payment::create(
        "ORDER-001",
        dec!(10000),
        PgInfo::new("TOSS", "pg-1", Some("key".into()), None, Some(Utc::now())).unwrap(),
        PayerInfo::new("payer-co", "Payer", None, None).unwrap(),
        PayeeInfo::new("payee-co", "Payee").unwrap(),
    )
    .unwrap()
}

/// Drives a fresh payment into `status` through legal transitions only.
fn payment_in(status: PaymentStatus) -> Payment {
    let mut payment = pending();
    let verify = |p: &mut Payment| {
        p.start_verification().unwrap();
        p.verify_success().unwrap();
    };
    match status {
        PaymentStatus::Pending => {}
        PaymentStatus::Verifying => payment.start_verification().unwrap(),
        PaymentStatus::Verified => verify(&mut payment),
        PaymentStatus::VerificationFailed => {
            payment.start_verification().unwrap();
            payment.verify_failed("mismatch").unwrap();
        }
        PaymentStatus::Refunding => {
            verify(&mut payment);
            payment.start_refund(dec!(10000), "order failed").unwrap();
        }
        PaymentStatus::PartiallyRefunded => {
            verify(&mut payment);
            payment.start_refund(dec!(4000), "partial").unwrap();
            payment.complete_refund(dec!(4000), "refund-1").unwrap();
        }
        PaymentStatus::Refunded => {
            verify(&mut payment);
            payment.start_refund(dec!(10000), "order failed").unwrap();
            payment.complete_refund(dec!(10000), "refund-1").unwrap();
        }
        PaymentStatus::RefundFailed => {
            verify(&mut payment);
            payment.start_refund(dec!(10000), "order failed").unwrap();
            payment.fail_refund("gateway down").unwrap();
        }
        PaymentStatus::Cancelled => payment.cancel("abandoned").unwrap(),
    }
    assert_eq!(payment.status(), status);
    payment
}

type Transition = (&'static str, fn(&mut Payment) -> Result<(), PaymentError>);

fn transitions() -> [Transition; 7] {
    [
        ("start_verification", |p| p.start_verification()),
        ("verify_success", |p| p.verify_success()),
        ("verify_failed", |p| p.verify_failed("nope")),
        ("start_refund", |p| p.start_refund(dec!(1000), "reason")),
        ("complete_refund", |p| p.complete_refund(dec!(1000), "refund-x")),
        ("fail_refund", |p| p.fail_refund("nope")),
        ("cancel", |p| p.cancel("nope")),
    ]
}

fn is_legal(name: &str, status: PaymentStatus) -> bool {
    match name {
        "start_verification" => status == PaymentStatus::Pending,
        "verify_success" | "verify_failed" => status == PaymentStatus::Verifying,
        "start_refund" => status.is_refundable(),
        "complete_refund" | "fail_refund" => status == PaymentStatus::Refunding,
        "cancel" => !status.is_final_state(),
        other => panic!("unknown transition {other}"),
    }
}

#[test]
fn test_illegal_transitions_leave_payment_untouched() {
    for status in PaymentStatus::ALL {
        for (name, transition) in transitions() {
            if is_legal(name, status) {
                continue;
            }
            let before = payment_in(status);
            let mut after = before.clone();

            let err = transition(&mut after).unwrap_err();
            assert_eq!(
                err.kind(),
                ErrorKind::InvalidState,
                "{name} from {status}: {err}"
            );
            assert_eq!(after, before, "{name} from {status} mutated the payment");
        }
    }
}

#[test]
fn test_legal_transitions_succeed() {
    for status in PaymentStatus::ALL {
        for (name, transition) in transitions() {
            if !is_legal(name, status) {
                continue;
            }
            let mut payment = payment_in(status);
            transition(&mut payment).unwrap_or_else(|err| panic!("{name} from {status}: {err}"));
        }
    }
}

#[test]
fn test_final_statuses_accept_no_transition() {
    for status in PaymentStatus::ALL.into_iter().filter(|s| s.is_final_state()) {
        let accepted: Vec<&str> = transitions()
            .into_iter()
            .filter(|(name, _)| is_legal(name, status))
            .map(|(name, _)| name)
            .collect();
        assert!(accepted.is_empty(), "{status} accepts {accepted:?}");
    }
}

#[test]
fn test_partial_refunds_until_exhausted() {
    let mut payment = payment_in(PaymentStatus::Verified);

    payment.start_refund(dec!(3000), "first").unwrap();
    payment.complete_refund(dec!(3000), "refund-1").unwrap();
    assert_eq!(payment.status(), PaymentStatus::PartiallyRefunded);
    assert!(payment.is_partially_refunded());
    assert_eq!(payment.pg_info().pg_refund_id(), Some("refund-1"));

    let err = payment.start_refund(dec!(7001), "too much").unwrap_err();
    assert!(matches!(err, PaymentError::RefundAmountExceedsPayment { .. }));
    assert_eq!(payment.status(), PaymentStatus::PartiallyRefunded);

    payment.start_refund(dec!(7000), "rest").unwrap();
    payment.complete_refund(dec!(7000), "refund-2").unwrap();
    assert_eq!(payment.status(), PaymentStatus::Refunded);
    assert!(payment.is_fully_refunded());
    assert!(!payment.is_refundable());
    assert_eq!(payment.pg_info().pg_refund_id(), Some("refund-2"));
}

#[test]
fn test_refund_amount_guards_do_not_mutate() {
    let payment = payment_in(PaymentStatus::Verified);

    for amount in [dec!(0), dec!(-1)] {
        let mut attempt = payment.clone();
        let err = attempt.start_refund(amount, "bad").unwrap_err();
        assert!(matches!(err, PaymentError::InvalidRefundAmount(_)));
        assert_eq!(attempt, payment);
    }

    let mut attempt = payment.clone();
    let err = attempt.start_refund(dec!(10000.01), "bad").unwrap_err();
    assert!(matches!(err, PaymentError::RefundAmountExceedsPayment { .. }));
    assert_eq!(attempt, payment);
}
