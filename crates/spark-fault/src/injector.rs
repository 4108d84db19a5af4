//! 可热更新的故障注入入口。
//!
//! # 设计动机（Why）
//! - **热更新友好**：控制面推送新策略时只需一次 `store`，正在求值的请求继续使用它们加载到的旧快照；
//! - **读路径零锁**：每次判定仅 `load` 一次快照，不与写路径竞争；
//! - **计数器归属明确**：计数器与策略一同存放在快照里，替换策略时按 [`CounterHandoff`] 明确选择延续或清零。
//!
//! # 行为概览（How）
//! 1. [`FaultInjector::install`] 把 `(revision, policy, counter)` 组装为 [`PolicySlot`] 并交给 `ArcSwap`；
//! 2. [`FaultInjector::decide`] 加载快照、委托 [`DecisionEngine`] 求值；
//! 3. [`FaultInjector::apply`] 先校验控制面消息，校验失败时快照保持不变；
//! 4. [`FaultInjector::clear`] 撤下策略，后续判定恒为无故障。

use alloc::sync::Arc;

use arc_swap::ArcSwap;
use tracing::Level;

use crate::config::HttpFaultConfig;
use crate::counter::ActiveFaultCounter;
use crate::decision::FaultVerdict;
use crate::engine::DecisionEngine;
use crate::error::FaultConfigError;
use crate::policy::HttpFault;
use crate::request::{HeaderMatcher, RequestView};

const TARGET: &str = "spark.fault.injector";

/// 替换策略时活跃故障计数的交接方式。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CounterHandoff {
    /// 新策略使用全新的计数器，从零开始计数。
    ///
    /// 旧策略下的在途故障仍向旧计数器归还，不占用新策略的上限。
    #[default]
    Reset,
    /// 新策略沿用当前计数器，在途故障继续计入新策略的上限。
    CarryOver,
}

/// 某一修订版本的策略快照。
#[derive(Debug)]
pub struct PolicySlot {
    revision: u64,
    policy: Option<Arc<HttpFault>>,
    counter: Arc<ActiveFaultCounter>,
}

impl PolicySlot {
    fn empty() -> Self {
        Self {
            revision: 0,
            policy: None,
            counter: Arc::new(ActiveFaultCounter::new()),
        }
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn policy(&self) -> Option<&Arc<HttpFault>> {
        self.policy.as_ref()
    }

    pub fn counter(&self) -> &Arc<ActiveFaultCounter> {
        &self.counter
    }
}

/// 基于 `ArcSwap` 的策略持有者与判定入口。
///
/// # 使用契约（What）
/// - **前置条件**：初始为空快照（修订号 0），此时所有判定均为无故障；
/// - **后置条件**：`install`/`apply`/`clear` 成功后新快照立即对后续判定可见，
///   旧快照在最后一个读者与最后一个在途名额释放后回收；
/// - **线程安全**：结构体 `Send + Sync`，可在多线程运行时共享。
#[derive(Debug)]
pub struct FaultInjector {
    slot: ArcSwap<PolicySlot>,
    engine: DecisionEngine,
}

impl FaultInjector {
    pub fn new(engine: DecisionEngine) -> Self {
        Self {
            slot: ArcSwap::from_pointee(PolicySlot::empty()),
            engine,
        }
    }

    /// 整体替换策略。
    pub fn install(&self, revision: u64, policy: HttpFault, handoff: CounterHandoff) {
        self.store(revision, Some(Arc::new(policy)), handoff);
        tracing::event!(
            target: TARGET,
            Level::INFO,
            spark.fault.revision = revision,
            spark.fault.handoff = ?handoff,
            "fault policy installed"
        );
    }

    /// 校验控制面消息并安装；失败时保留当前策略。
    pub fn apply<H>(
        &self,
        revision: u64,
        config: HttpFaultConfig,
        headers: H,
        handoff: CounterHandoff,
    ) -> Result<(), FaultConfigError>
    where
        H: IntoIterator<Item = Arc<dyn HeaderMatcher>>,
    {
        match config.into_policy(headers) {
            Ok(policy) => {
                self.install(revision, policy, handoff);
                Ok(())
            }
            Err(err) => {
                tracing::event!(
                    target: TARGET,
                    Level::WARN,
                    spark.fault.revision = revision,
                    spark.fault.error_code = err.code(),
                    error = %err,
                    "fault policy update rejected, previous policy kept"
                );
                Err(err)
            }
        }
    }

    /// 撤下策略。
    pub fn clear(&self, revision: u64) {
        self.store(revision, None, CounterHandoff::Reset);
        tracing::event!(
            target: TARGET,
            Level::INFO,
            spark.fault.revision = revision,
            "fault policy cleared"
        );
    }

    fn store(&self, revision: u64, policy: Option<Arc<HttpFault>>, handoff: CounterHandoff) {
        // `rcu` 保证沿用的计数器正是被替换掉的那个快照上的计数器。
        self.slot.rcu(|current| {
            let counter = match handoff {
                CounterHandoff::Reset => Arc::new(ActiveFaultCounter::new()),
                CounterHandoff::CarryOver => Arc::clone(current.counter()),
            };
            PolicySlot {
                revision,
                policy: policy.clone(),
                counter,
            }
        });
    }

    /// 当前快照。
    pub fn snapshot(&self) -> Arc<PolicySlot> {
        self.slot.load_full()
    }

    pub fn revision(&self) -> u64 {
        self.slot.load().revision()
    }

    /// 当前快照计数器上的在途故障数。
    pub fn active_faults(&self) -> u32 {
        self.slot.load().counter().current()
    }

    /// 以当前快照对请求求值。
    pub fn decide(&self, request: &dyn RequestView) -> FaultVerdict {
        let slot = self.slot.load();
        match slot.policy() {
            Some(policy) => self.engine.decide(policy, request, slot.counter()),
            None => FaultVerdict::no_fault(),
        }
    }
}

impl Default for FaultInjector {
    fn default() -> Self {
        Self::new(DecisionEngine::default())
    }
}
