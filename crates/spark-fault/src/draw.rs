//! 抽样源能力。
//!
//! 判定引擎不直接依赖全局随机数，而是通过 [`DrawSource`] 取值：生产环境使用线程本地 RNG，
//! 测试与回放使用固定种子或脚本化序列，从而让同一组抽样值在任意实现上得到同一判定。

use parking_lot::Mutex;
use rand::{Rng, SeedableRng, rngs::StdRng};

/// 在 `[0, bound)` 区间内产出均匀整数的抽样源。
///
/// # 教案式说明
/// - **意图 (Why)**：将随机性从判定逻辑中剥离，使 [`crate::FractionalPercent::roll`] 可被确定性驱动；
/// - **契约 (What)**：
///   - 返回值必须落在 `[0, bound)`；`bound == 0` 时返回 `0`；
///   - 实现需满足 `Send + Sync`，同一实例会被多个工作线程并发调用；
///   - 每次调用都视为一次独立抽样。
pub trait DrawSource: Send + Sync {
    /// 取一次抽样值。
    fn draw(&self, bound: u32) -> u32;
}

/// 基于 `rand::thread_rng` 的默认抽样源，无共享状态。
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadRngDraws;

impl DrawSource for ThreadRngDraws {
    fn draw(&self, bound: u32) -> u32 {
        if bound == 0 {
            return 0;
        }
        rand::thread_rng().gen_range(0..bound)
    }
}

/// 固定种子的抽样源，用于压测回放与可复现实验。
///
/// 内部以 `parking_lot::Mutex` 保护 `StdRng`，多线程调用时抽样序列整体可复现，
/// 但各线程拿到哪一段取决于调度顺序。
#[derive(Debug)]
pub struct SeededDraws {
    rng: Mutex<StdRng>,
}

impl SeededDraws {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl DrawSource for SeededDraws {
    fn draw(&self, bound: u32) -> u32 {
        if bound == 0 {
            return 0;
        }
        self.rng.lock().gen_range(0..bound)
    }
}
