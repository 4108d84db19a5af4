//! 策略热替换语义。
//!
//! # 教案级导览
//! - **Why**：控制面随时可能推送新版本，数据面必须保证“在途请求不被打断、计数不串账、坏更新不生效”；
//! - **What**：覆盖 `Reset` 与 `CarryOver` 两种计数交接、旧快照的持续可用性、被拒更新保留旧版本。

#![cfg(not(any(loom, spark_loom)))]

use std::sync::Arc;

use spark_fault::test_stubs::ConstantDraw;
use spark_fault::{
    CounterHandoff, DecisionEngine, FaultAbort, FaultConfigError, FaultDelay, FaultInjector,
    FractionalPercent, HttpFault, HttpFaultConfig, RequestSnapshot, StatusCode,
};
use tracing_test::traced_test;

fn injector() -> FaultInjector {
    FaultInjector::new(DecisionEngine::default().with_draws(Arc::new(ConstantDraw::always_hit())))
}

fn abort_policy(cluster: &str, max_active: u32) -> HttpFault {
    HttpFault::new(cluster)
        .with_abort(FaultAbort::for_status(
            StatusCode::Unavailable,
            FractionalPercent::per_hundred(100),
        ))
        .with_max_active_faults(max_active)
}

#[test]
fn reset_handoff_starts_new_policy_from_zero() {
    let injector = injector();
    injector.install(1, abort_policy("svc-a", 1), CounterHandoff::Reset);

    let in_flight = injector.decide(&RequestSnapshot::new("svc-a"));
    assert!(in_flight.is_fault());
    let old_slot = injector.snapshot();
    assert_eq!(old_slot.counter().current(), 1);

    injector.install(2, abort_policy("svc-a", 1), CounterHandoff::Reset);
    assert_eq!(injector.active_faults(), 0, "新策略不继承旧策略的在途故障");

    let fresh = injector.decide(&RequestSnapshot::new("svc-a"));
    assert!(fresh.is_fault(), "新策略的名额不被旧在途故障占用");

    drop(in_flight);
    assert_eq!(old_slot.counter().current(), 0, "在途名额归还到其来源计数器");
    assert_eq!(injector.active_faults(), 1, "旧名额的归还不影响新计数器");
}

#[test]
fn carry_over_handoff_keeps_in_flight_faults_counted() {
    let injector = injector();
    injector.install(1, abort_policy("svc-a", 1), CounterHandoff::Reset);

    let in_flight = injector.decide(&RequestSnapshot::new("svc-a"));
    assert!(in_flight.is_fault());

    injector.install(2, abort_policy("svc-a", 1), CounterHandoff::CarryOver);
    assert_eq!(injector.revision(), 2);
    assert_eq!(injector.active_faults(), 1);
    assert!(
        !injector.decide(&RequestSnapshot::new("svc-a")).is_fault(),
        "沿用计数时旧在途故障继续占用新策略的上限"
    );

    drop(in_flight);
    assert_eq!(injector.active_faults(), 0);
    assert!(injector.decide(&RequestSnapshot::new("svc-a")).is_fault());
}

#[test]
fn loaded_snapshot_keeps_evaluating_old_policy() {
    let injector = injector();
    injector.install(1, abort_policy("svc-a", 4), CounterHandoff::Reset);
    let before = injector.snapshot();

    injector.install(
        2,
        HttpFault::new("svc-b").with_delay(FaultDelay::for_fixed_delay(
            10,
            FractionalPercent::per_hundred(100),
        )),
        CounterHandoff::Reset,
    );

    let old_policy = before.policy().expect("revision 1 carries a policy");
    assert_eq!(before.revision(), 1);
    assert_eq!(old_policy.upstream_cluster(), "svc-a");
    let verdict = DecisionEngine::default().decide(
        old_policy,
        &RequestSnapshot::new("svc-a"),
        before.counter(),
    );
    assert!(verdict.is_fault(), "先前加载到的快照完整保留旧策略");

    assert!(!injector.decide(&RequestSnapshot::new("svc-a")).is_fault());
    assert!(injector.decide(&RequestSnapshot::new("svc-b")).is_fault());
}

#[test]
fn rejected_update_keeps_previous_policy() {
    let injector = injector();
    let config = HttpFaultConfig::from_json_str(
        r#"{
            "upstream_cluster": "svc-a",
            "abort": { "status_code": 14, "percent": { "numerator": 100 } }
        }"#,
    )
    .expect("valid message");
    injector
        .apply(7, config, Vec::new(), CounterHandoff::Reset)
        .expect("valid policy");

    let broken = HttpFaultConfig::from_json_str(
        r#"{
            "upstream_cluster": "svc-a",
            "abort": { "status_code": 14, "percent": { "numerator": 100 } },
            "max_active_faults": -1
        }"#,
    )
    .expect("syntactically valid message");
    let err = injector
        .apply(8, broken, Vec::new(), CounterHandoff::Reset)
        .expect_err("negative ceiling must be rejected");
    assert_eq!(err, FaultConfigError::NegativeMaxActiveFaults { value: -1 });

    assert_eq!(injector.revision(), 7, "被拒的更新不得替换当前版本");
    assert!(injector.decide(&RequestSnapshot::new("svc-a")).is_fault());
}

#[test]
fn clear_disables_injection_until_next_install() {
    let injector = injector();
    injector.install(1, abort_policy("svc-a", 2), CounterHandoff::Reset);
    injector.clear(2);
    assert!(!injector.decide(&RequestSnapshot::new("svc-a")).is_fault());

    injector.install(3, abort_policy("svc-a", 2), CounterHandoff::CarryOver);
    assert!(injector.decide(&RequestSnapshot::new("svc-a")).is_fault());
}

#[test]
#[traced_test]
fn policy_lifecycle_is_logged_with_revision() {
    let injector = injector();
    injector.install(11, abort_policy("svc-a", 1), CounterHandoff::CarryOver);
    assert!(logs_contain("fault policy installed"));
    assert!(logs_contain("spark.fault.revision=11"));

    let broken = HttpFaultConfig::from_toml_str(
        r#"
upstream_cluster = "svc-a"
max_active_faults = -7
"#,
    )
    .expect("syntactically valid message");
    assert!(injector.apply(12, broken, Vec::new(), CounterHandoff::Reset).is_err());
    assert!(logs_contain("fault policy update rejected, previous policy kept"));
    assert!(logs_contain("fault.config.negative_max_active_faults"));

    injector.clear(13);
    assert!(logs_contain("fault policy cleared"));
}
