//! 活跃故障计数器：策略级唯一的共享可变状态。
//!
//! # 设计总览（Why）
//! - 并发上限 `max_active_faults` 需要在所有共享同一策略的请求之间生效，
//!   “检查是否达到上限”与“计数加一”必须是同一个原子步骤，否则两个并发判定可能同时越过上限；
//! - 计数器归属于策略实例，随策略创建、随策略替换而丢弃，不存在进程级单例。
//!
//! # 执行逻辑（How）
//! - [`ActiveFaultCounter::try_acquire`] 以 `compare_exchange` 循环完成“比较并递增”；
//! - 成功时返回 [`ActiveFaultPermit`]，其 `Drop` 负责递减，请求在任何路径上结束
//!   （正常完成、被调用方取消、panic 展开）都会归还额度。

use alloc::sync::Arc;

use tracing::Level;

//
// 教案级说明：启用 `--cfg loom` 时切换到 Loom 的原子类型，以便模型检查穷举调度交错；
// `Arc` 保持标准实现。
#[cfg(not(any(loom, spark_loom)))]
use core::sync::atomic::{AtomicU32, Ordering};
#[cfg(any(loom, spark_loom))]
use loom::sync::atomic::{AtomicU32, Ordering};

/// 有界活跃故障计数器。
///
/// # 教案式说明
/// - **意图 (Why)**：为并发上限提供无锁、不可超发的准入控制；
/// - **契约 (What)**：
///   - `try_acquire(None)` 表示不设上限，仍然计数，便于观测当前在途故障数；
///   - `try_acquire(Some(k))` 在计数已达 `k` 时返回 `None` 且不修改计数；`k == 0` 时恒为 `None`；
///   - 计数只会经由 [`ActiveFaultPermit`] 的释放而递减，永不低于零。
/// - **风险提示 (Trade-offs)**：递减低于零意味着记账缺陷：调试构建直接断言失败，
///   发布构建钳制为零并记录 `error` 日志。
#[derive(Debug)]
pub struct ActiveFaultCounter {
    active: AtomicU32,
}

impl ActiveFaultCounter {
    pub fn new() -> Self {
        Self {
            active: AtomicU32::new(0),
        }
    }

    /// 当前在途故障数。
    pub fn current(&self) -> u32 {
        self.active.load(Ordering::Acquire)
    }

    /// 非原子的快速预检，仅用于在抽样前提前放弃；最终准入仍以 [`Self::try_acquire`] 为准。
    pub fn is_saturated(&self, ceiling: Option<u32>) -> bool {
        ceiling.is_some_and(|limit| self.current() >= limit)
    }

    /// 在上限内占用一个活跃故障名额。
    pub fn try_acquire(self: &Arc<Self>, ceiling: Option<u32>) -> Option<ActiveFaultPermit> {
        let limit = ceiling.unwrap_or(u32::MAX);
        let mut current = self.active.load(Ordering::Acquire);
        loop {
            if current >= limit {
                return None;
            }
            match self.active.compare_exchange(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    return Some(ActiveFaultPermit {
                        counter: Arc::clone(self),
                    });
                }
                Err(actual) => current = actual,
            }
        }
    }

    fn release(&self) {
        let mut current = self.active.load(Ordering::Acquire);
        loop {
            if current == 0 {
                debug_assert!(current > 0, "active fault counter released below zero");
                tracing::event!(
                    target: "spark.fault.counter",
                    Level::ERROR,
                    spark.fault.active = current,
                    "active fault counter underflow, clamped to zero"
                );
                return;
            }
            match self.active.compare_exchange(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }
}

impl Default for ActiveFaultCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// 一个在途故障占用的名额，析构时归还。
///
/// 过滤链应持有该值直到注入行为（延迟结束或中止已下发）完成。
#[must_use = "dropping the permit immediately releases the active fault slot"]
#[derive(Debug)]
pub struct ActiveFaultPermit {
    counter: Arc<ActiveFaultCounter>,
}

impl ActiveFaultPermit {
    /// 名额所属的计数器。
    pub fn counter(&self) -> &Arc<ActiveFaultCounter> {
        &self.counter
    }
}

impl Drop for ActiveFaultPermit {
    fn drop(&mut self) {
        self.counter.release();
    }
}

#[cfg(all(test, not(any(loom, spark_loom))))]
mod tests {
    use super::*;

    #[test]
    fn ceiling_blocks_further_acquisition() {
        let counter = Arc::new(ActiveFaultCounter::new());
        let first = counter.try_acquire(Some(2)).expect("首个名额应成功");
        let second = counter.try_acquire(Some(2)).expect("第二个名额应成功");
        assert!(counter.try_acquire(Some(2)).is_none(), "达到上限后必须拒绝");
        assert_eq!(counter.current(), 2);
        assert!(counter.is_saturated(Some(2)));

        drop(first);
        assert_eq!(counter.current(), 1);
        let third = counter.try_acquire(Some(2));
        assert!(third.is_some(), "归还后应可再次占用");
        drop((second, third));
        assert_eq!(counter.current(), 0);
    }

    #[test]
    fn zero_ceiling_is_a_kill_switch() {
        let counter = Arc::new(ActiveFaultCounter::new());
        assert!(counter.try_acquire(Some(0)).is_none());
        assert!(counter.is_saturated(Some(0)));
        assert_eq!(counter.current(), 0);
    }

    #[test]
    fn unbounded_acquisition_still_counts() {
        let counter = Arc::new(ActiveFaultCounter::new());
        let permits: Vec<_> = (0..5).filter_map(|_| counter.try_acquire(None)).collect();
        assert_eq!(permits.len(), 5);
        assert_eq!(counter.current(), 5);
        assert!(!counter.is_saturated(None));
        drop(permits);
        assert_eq!(counter.current(), 0);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "released below zero")]
    fn underflow_is_fatal_in_debug_builds() {
        ActiveFaultCounter::new().release();
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn underflow_clamps_to_zero_in_release_builds() {
        let counter = Arc::new(ActiveFaultCounter::new());
        counter.release();
        assert_eq!(counter.current(), 0, "计数不得回绕为 u32::MAX");

        let permit = counter.try_acquire(Some(1));
        assert!(permit.is_some(), "钳制后上限仍按零计数生效");
        assert_eq!(counter.current(), 1);
        drop(permit);
        assert_eq!(counter.current(), 0);
    }
}
