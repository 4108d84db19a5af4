//! 判定引擎：按固定顺序对单个请求求值策略。
//!
//! # 求值顺序（What）
//! 1. 作用范围不匹配 → 无故障；
//! 2. 配置了上限且计数已达上限 → 无故障（准入控制优先于抽样）；
//! 3. 配置了延迟：抽样一次，命中后解析时延，解析成功则延迟生效；
//! 4. 配置了中止：独立抽样一次，命中后解析状态，解析成功则中止生效；
//! 5. 合成指令；
//! 6. 任一故障生效时原子地占用一个活跃名额；占用失败（并发下上限刚被占满）→ 无故障。
//!
//! # 并发（Why）
//! - 步骤 2 只是读取，用于避免在已饱和时白白消耗抽样；真正的“比较并递增”发生在步骤 6，
//!   两者合起来保证任意交错下都不会越过上限；
//! - 引擎不休眠、不做 I/O，调用立即返回。

use alloc::sync::Arc;

use tracing::Level;

use crate::counter::ActiveFaultCounter;
use crate::decision::{Decision, FaultVerdict};
use crate::draw::{DrawSource, ThreadRngDraws};
use crate::headers::FaultHeaders;
use crate::policy::HttpFault;
use crate::request::{HeaderValueResolver, RequestView};

const TARGET: &str = "spark.fault.engine";

/// 判定引擎，持有请求头解析器与抽样源。
///
/// # 教案式说明
/// - **意图 (Why)**：把“随机性”与“覆写头解析”两个外部依赖显式注入，
///   使相同的抽样序列在任意部署上得到相同的判定；
/// - **契约 (What)**：实例本身无可变状态，可在任意多个线程间共享；
///   唯一的共享可变状态是调用方传入的 [`ActiveFaultCounter`]。
#[derive(Clone)]
pub struct DecisionEngine {
    resolver: Arc<dyn HeaderValueResolver>,
    draws: Arc<dyn DrawSource>,
}

impl DecisionEngine {
    pub fn new(resolver: Arc<dyn HeaderValueResolver>, draws: Arc<dyn DrawSource>) -> Self {
        Self { resolver, draws }
    }

    /// 替换抽样源，常用于测试与回放。
    pub fn with_draws(mut self, draws: Arc<dyn DrawSource>) -> Self {
        self.draws = draws;
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn HeaderValueResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// 对单个请求求值策略。
    pub fn decide(
        &self,
        policy: &HttpFault,
        request: &dyn RequestView,
        counter: &Arc<ActiveFaultCounter>,
    ) -> FaultVerdict {
        if !policy.matches(request) {
            tracing::event!(
                target: TARGET,
                Level::TRACE,
                spark.fault.cluster = request.upstream_cluster(),
                "request outside fault scope"
            );
            return FaultVerdict::no_fault();
        }

        let ceiling = policy.max_active_faults();
        if counter.is_saturated(ceiling) {
            tracing::event!(
                target: TARGET,
                Level::DEBUG,
                spark.fault.cluster = policy.upstream_cluster(),
                spark.fault.active = counter.current(),
                spark.fault.max_active = ceiling,
                "fault suppressed by active fault ceiling"
            );
            return FaultVerdict::no_fault();
        }

        let delay = policy.fault_delay().and_then(|delay| {
            if !delay.percent().roll(self.draws.as_ref()) {
                return None;
            }
            let resolved = delay.resolve(request, self.resolver.as_ref());
            if resolved.is_none() {
                tracing::trace!(target: TARGET, "header delay not resolvable, skipped");
            }
            resolved
        });

        let abort = policy.fault_abort().and_then(|abort| {
            if !abort.percent().roll(self.draws.as_ref()) {
                return None;
            }
            let resolved = abort.resolve(request, self.resolver.as_ref());
            if resolved.is_none() {
                tracing::trace!(target: TARGET, "header abort not resolvable, skipped");
            }
            resolved
        });

        let decision = Decision::combine(delay, abort);
        if !decision.is_fault() {
            return FaultVerdict::no_fault();
        }

        match counter.try_acquire(ceiling) {
            Some(permit) => {
                tracing::event!(
                    target: TARGET,
                    Level::DEBUG,
                    spark.fault.cluster = policy.upstream_cluster(),
                    spark.fault.decision = ?decision,
                    "fault injected"
                );
                FaultVerdict::injected(decision, permit)
            }
            None => {
                tracing::event!(
                    target: TARGET,
                    Level::DEBUG,
                    spark.fault.cluster = policy.upstream_cluster(),
                    spark.fault.max_active = ceiling,
                    "fault suppressed by active fault ceiling"
                );
                FaultVerdict::no_fault()
            }
        }
    }
}

impl Default for DecisionEngine {
    /// 默认组合：`x-envoy-fault-*` 覆写头解析与线程本地 RNG。
    fn default() -> Self {
        Self::new(Arc::new(FaultHeaders), Arc::new(ThreadRngDraws))
    }
}

impl core::fmt::Debug for DecisionEngine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DecisionEngine").finish_non_exhaustive()
    }
}

// 计数器在 `--cfg loom` 下切换为 Loom 原子类型，只能在 `loom::model` 内使用。
#[cfg(all(test, not(any(loom, spark_loom))))]
mod tests {
    use super::*;
    use crate::fault::{FaultAbort, FaultDelay};
    use crate::percent::FractionalPercent;
    use crate::request::RequestSnapshot;
    use crate::status::StatusCode;
    use crate::test_stubs::ScriptedDraws;
    use core::time::Duration;

    fn scripted_engine(draws: ScriptedDraws) -> (DecisionEngine, Arc<ScriptedDraws>) {
        let draws = Arc::new(draws);
        let engine = DecisionEngine::default().with_draws(draws.clone());
        (engine, draws)
    }

    #[test]
    fn delay_and_abort_are_sampled_independently() {
        let policy = HttpFault::new("svc-a")
            .with_delay(FaultDelay::for_fixed_delay(1_000, FractionalPercent::per_hundred(50)))
            .with_abort(FaultAbort::for_status(
                StatusCode::Aborted,
                FractionalPercent::per_hundred(50),
            ));
        let counter = Arc::new(ActiveFaultCounter::new());
        let request = RequestSnapshot::new("svc-a");

        // 延迟命中（10 < 50），中止未命中（70 >= 50）。
        let (engine, draws) = scripted_engine(ScriptedDraws::new([10, 70]));
        let verdict = engine.decide(&policy, &request, &counter);
        assert_eq!(verdict.decision(), &Decision::Delay(Duration::from_nanos(1_000)));
        assert_eq!(draws.consumed(), 2, "两类故障必须各抽样一次");

        // 延迟未命中，中止命中。
        let (engine, _) = scripted_engine(ScriptedDraws::new([99, 0]));
        let verdict = engine.decide(&policy, &request, &counter);
        assert!(matches!(verdict.decision(), Decision::Abort(_)));
    }

    #[test]
    fn abort_only_policy_never_draws_for_delay() {
        let policy = HttpFault::new("svc-a").with_abort(FaultAbort::for_status(
            StatusCode::Unavailable,
            FractionalPercent::per_hundred(100),
        ));
        let (engine, draws) = scripted_engine(ScriptedDraws::new([0]));
        let counter = Arc::new(ActiveFaultCounter::new());
        let verdict = engine.decide(&policy, &RequestSnapshot::new("svc-a"), &counter);
        assert!(verdict.is_fault());
        assert_eq!(draws.consumed(), 1);
    }

    #[test]
    fn saturated_counter_skips_sampling() {
        let policy = HttpFault::new("svc-a")
            .with_abort(FaultAbort::for_status(
                StatusCode::Unavailable,
                FractionalPercent::per_hundred(100),
            ))
            .with_max_active_faults(1);
        let counter = Arc::new(ActiveFaultCounter::new());
        let held = counter.try_acquire(None).expect("预占名额");

        let (engine, draws) = scripted_engine(ScriptedDraws::new([0]));
        let verdict = engine.decide(&policy, &RequestSnapshot::new("svc-a"), &counter);
        assert_eq!(verdict.decision(), &Decision::NoFault);
        assert_eq!(draws.consumed(), 0, "准入控制必须先于抽样");
        drop(held);
    }

    #[test]
    fn permit_is_released_with_verdict() {
        let policy = HttpFault::new("svc-a").with_delay(FaultDelay::for_fixed_delay(
            10,
            FractionalPercent::per_hundred(100),
        ));
        let counter = Arc::new(ActiveFaultCounter::new());
        let verdict =
            DecisionEngine::default().decide(&policy, &RequestSnapshot::new("svc-a"), &counter);
        assert!(verdict.permit().is_some());
        assert_eq!(counter.current(), 1);
        drop(verdict);
        assert_eq!(counter.current(), 0);
    }
}
