//! End-to-end admission flow: validate -> reserve -> external call -> commit.

use std::sync::{Arc, Barrier};
use std::thread;

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal_macros::dec;

use prompt_gate::{
    AdmissionGate, DenyReason, GateConfig, GateDecision, GlobalDailyLedger, RejectReason, Session,
    SessionId, SessionRegistry, UsageReport,
};

fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    init_tracing();
    Utc.with_ymd_and_hms(2024, 3, 1, hour, minute, 0).unwrap()
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[test]
fn full_flow_admits_and_accounts() {
    let registry = SessionRegistry::new();
    let gate = AdmissionGate::builder().build().unwrap();

    let session = registry.get_or_create(&SessionId::from("tab-1"));
    let decision = gate.admit(&session, "Summarize the water cycle", "gpt-3.5-turbo", at(9, 0));
    let reservation = decision.reservation().expect("should be admitted");

    // The caller runs the metered call, then reports usage.
    let usage = UsageReport::new(900, 1100);
    let cost = gate.commit(&session, "gpt-3.5-turbo", &usage, at(9, 0));
    assert_eq!(cost, dec!(0.0031));

    let snapshot = session.usage();
    assert_eq!(snapshot.cumulative_tokens, 2000);
    assert_eq!(snapshot.cumulative_cost, cost);
    assert_eq!(snapshot.recent_requests, 1);

    // Reservation tokens are unique per admission.
    let second = gate
        .admit(&session, "And the carbon cycle", "gpt-3.5-turbo", at(9, 1))
        .reservation()
        .expect("should be admitted");
    assert_ne!(reservation, second);
}

#[test]
fn sessions_rate_limit_independently() {
    let gate = AdmissionGate::builder().build().unwrap();
    let a = Session::new();
    let b = Session::new();

    for _ in 0..5 {
        assert!(gate.admit(&a, "prompt", "gpt-4", at(9, 0)).is_admitted());
    }
    assert_eq!(
        gate.admit(&a, "prompt", "gpt-4", at(9, 0)),
        GateDecision::Denied(DenyReason::TenMinuteCapExceeded)
    );

    // Session B has its own windows.
    assert!(gate.admit(&b, "prompt", "gpt-4", at(9, 0)).is_admitted());
}

#[test]
fn daily_ceiling_is_shared_across_sessions() {
    let ledger = Arc::new(GlobalDailyLedger::new());
    let gate = AdmissionGate::builder()
        .daily_ledger(ledger)
        .build()
        .unwrap();

    let spender = Session::new();
    assert!(gate.admit(&spender, "long analysis", "gpt-4", at(9, 0)).is_admitted());
    // $0.90 input + $0.12 output = $1.02, past the $1.00 daily ceiling.
    gate.commit(&spender, "gpt-4", &UsageReport::new(30_000, 2_000), at(9, 0));

    let other = Session::new();
    assert_eq!(
        gate.admit(&other, "a tiny prompt", "gpt-4", at(9, 1)),
        GateDecision::Denied(DenyReason::DailyGlobalBudgetExceeded)
    );

    // Next calendar day the ledger has rolled over.
    let tomorrow = Utc.with_ymd_and_hms(2024, 3, 2, 9, 0, 0).unwrap();
    assert!(gate.admit(&other, "a tiny prompt", "gpt-4", tomorrow).is_admitted());
}

#[test]
fn config_from_json_drives_the_gate() {
    let config = GateConfig::from_json(
        r#"{
            "windows": [
                {"duration": "10m", "max_requests": 1, "deny_reason": "TenMinuteCapExceeded"}
            ],
            "validation": {"prompt_char_ceiling": 40}
        }"#,
    )
    .unwrap();
    let gate = AdmissionGate::builder().config(config).build().unwrap();
    let session = Session::new();

    assert_eq!(
        gate.admit(&session, &"x ".repeat(30), "gpt-4", at(9, 0)),
        GateDecision::RejectedInput(RejectReason::TooLong)
    );

    assert!(gate.admit(&session, "first", "gpt-4", at(9, 0)).is_admitted());
    assert_eq!(
        gate.admit(&session, "second", "gpt-4", at(9, 5)),
        GateDecision::Denied(DenyReason::TenMinuteCapExceeded)
    );
    // The single-slot window drains after ten minutes.
    assert!(gate.admit(&session, "third", "gpt-4", at(9, 11)).is_admitted());
}

#[test]
fn uncommitted_failures_charge_nothing_but_keep_the_slot() {
    let gate = AdmissionGate::builder().build().unwrap();
    let session = Session::new();

    // Five admissions whose downstream calls all "failed": never committed.
    for _ in 0..5 {
        assert!(gate.admit(&session, "prompt", "gpt-4", at(9, 0)).is_admitted());
    }

    let snapshot = session.usage();
    assert_eq!(snapshot.cumulative_tokens, 0);
    assert_eq!(snapshot.cumulative_cost, dec!(0));
    // The attempts still occupied their window slots.
    assert_eq!(snapshot.recent_requests, 5);
    assert!(!gate.admit(&session, "prompt", "gpt-4", at(9, 1)).is_admitted());
}

#[test]
fn concurrent_admissions_never_oversubscribe_the_last_slot() {
    let gate = Arc::new(AdmissionGate::builder().build().unwrap());
    let session = Arc::new(Session::new());
    let now = at(9, 0);

    for _ in 0..4 {
        assert!(gate.admit(&session, "warmup", "gpt-4", now).is_admitted());
    }

    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let gate = Arc::clone(&gate);
            let session = Arc::clone(&session);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                gate.admit(&session, "race", "gpt-4", now).is_admitted()
            })
        })
        .collect();

    let admitted = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|admitted| *admitted)
        .count();
    assert_eq!(admitted, 1);
}

#[test]
fn clear_history_resets_spend_but_not_the_limiter() {
    let gate = AdmissionGate::builder().build().unwrap();
    let session = Session::new();

    for _ in 0..5 {
        assert!(gate.admit(&session, "prompt", "gpt-4", at(9, 0)).is_admitted());
        gate.commit(&session, "gpt-4", &UsageReport::new(100, 100), at(9, 0));
    }

    session.reset_usage();
    assert_eq!(session.usage().cumulative_tokens, 0);
    assert_eq!(session.usage().cumulative_cost, dec!(0));

    // Clearing the cosmetic history does not refill the burst allowance.
    assert_eq!(
        gate.admit(&session, "prompt", "gpt-4", at(9, 0)),
        GateDecision::Denied(DenyReason::TenMinuteCapExceeded)
    );
}

#[test]
fn token_budget_outlasts_every_window() {
    let gate = AdmissionGate::builder().build().unwrap();
    let session = Session::new();

    assert!(gate.admit(&session, "prompt", "gpt-4", at(9, 0)).is_admitted());
    gate.commit(&session, "gpt-4", &UsageReport::new(40_000, 10_001), at(9, 0));

    // Days later the session is still out of tokens.
    let much_later = Utc.with_ymd_and_hms(2024, 3, 9, 9, 0, 0).unwrap();
    assert_eq!(
        gate.admit(&session, "prompt", "gpt-4", much_later),
        GateDecision::Denied(DenyReason::SessionTokenBudgetExceeded)
    );
}
