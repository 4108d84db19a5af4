//! 判定结果：交给过滤链执行的故障指令。

use core::time::Duration;

use crate::counter::ActiveFaultPermit;
use crate::status::AbortStatus;

/// 单次请求的故障指令。
///
/// - `Delay`：过滤链挂起请求给定时长后照常转发；
/// - `Abort`：过滤链立即以合成状态结束请求；
/// - `DelayThenAbort`：先挂起，再以合成状态结束。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    NoFault,
    Delay(Duration),
    Abort(AbortStatus),
    DelayThenAbort(Duration, AbortStatus),
}

impl Decision {
    /// 由两类故障各自的生效结果合成指令。
    pub fn combine(delay: Option<Duration>, abort: Option<AbortStatus>) -> Self {
        match (delay, abort) {
            (None, None) => Decision::NoFault,
            (Some(delay), None) => Decision::Delay(delay),
            (None, Some(status)) => Decision::Abort(status),
            (Some(delay), Some(status)) => Decision::DelayThenAbort(delay, status),
        }
    }

    pub fn is_fault(&self) -> bool {
        !matches!(self, Decision::NoFault)
    }

    pub fn delay(&self) -> Option<Duration> {
        match self {
            Decision::Delay(delay) | Decision::DelayThenAbort(delay, _) => Some(*delay),
            Decision::NoFault | Decision::Abort(_) => None,
        }
    }

    pub fn abort_status(&self) -> Option<&AbortStatus> {
        match self {
            Decision::Abort(status) | Decision::DelayThenAbort(_, status) => Some(status),
            Decision::NoFault | Decision::Delay(_) => None,
        }
    }
}

/// 判定结果与其占用的活跃故障名额。
///
/// # 教案式说明
/// - **意图 (Why)**：让“在途故障”的生命周期与过滤链执行注入行为的生命周期绑定；
/// - **契约 (What)**：
///   - `decision` 为 [`Decision::NoFault`] 时不持有名额；
///   - 其余情况下持有一个 [`ActiveFaultPermit`]，verdict（或拆出的 permit）被丢弃时计数即归还，
///     因此请求被取消、超时或提前结束都不会泄漏上限额度。
#[derive(Debug)]
pub struct FaultVerdict {
    decision: Decision,
    permit: Option<ActiveFaultPermit>,
}

impl FaultVerdict {
    pub(crate) fn no_fault() -> Self {
        Self {
            decision: Decision::NoFault,
            permit: None,
        }
    }

    pub(crate) fn injected(decision: Decision, permit: ActiveFaultPermit) -> Self {
        Self {
            decision,
            permit: Some(permit),
        }
    }

    pub fn decision(&self) -> &Decision {
        &self.decision
    }

    pub fn is_fault(&self) -> bool {
        self.decision.is_fault()
    }

    pub fn permit(&self) -> Option<&ActiveFaultPermit> {
        self.permit.as_ref()
    }

    /// 拆分为指令与名额；调用方需保留名额直到注入行为结束。
    pub fn into_parts(self) -> (Decision, Option<ActiveFaultPermit>) {
        (self.decision, self.permit)
    }
}
