//! 测试桩：确定性抽样源与基于闭包的请求头匹配器。
//!
//! # 设计背景（Why）
//! - 判定依赖随机抽样与外部匹配引擎，集成测试与示例需要可控的替身；
//! - 集中维护桩对象，避免各测试文件重复定义。
//!
//! 这些实现只服务于测试与演示，生产匹配语义由外部请求头匹配引擎提供。

use alloc::{collections::VecDeque, string::String, sync::Arc};
use core::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::draw::DrawSource;
use crate::request::{HeaderLookup, HeaderMatcher};

fn clamp_to_bound(value: u32, bound: u32) -> u32 {
    value.min(bound.saturating_sub(1))
}

/// 每次返回同一个值的抽样源（超出区间时截断到 `bound - 1`）。
#[derive(Clone, Copy, Debug)]
pub struct ConstantDraw(pub u32);

impl ConstantDraw {
    /// 对任意非零分子都命中。
    pub const fn always_hit() -> Self {
        ConstantDraw(0)
    }

    /// 除必中百分比外都不命中。
    pub const fn always_miss() -> Self {
        ConstantDraw(u32::MAX)
    }
}

impl DrawSource for ConstantDraw {
    fn draw(&self, bound: u32) -> u32 {
        clamp_to_bound(self.0, bound)
    }
}

/// 按脚本顺序返回抽样值；脚本耗尽后重复最后一个值，空脚本返回 `0`。
#[derive(Debug)]
pub struct ScriptedDraws {
    script: Mutex<VecDeque<u32>>,
    last: Mutex<u32>,
    consumed: AtomicUsize,
}

impl ScriptedDraws {
    pub fn new(script: impl IntoIterator<Item = u32>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            last: Mutex::new(0),
            consumed: AtomicUsize::new(0),
        }
    }

    /// 已被取走的抽样次数。
    pub fn consumed(&self) -> usize {
        self.consumed.load(Ordering::Acquire)
    }
}

impl DrawSource for ScriptedDraws {
    fn draw(&self, bound: u32) -> u32 {
        self.consumed.fetch_add(1, Ordering::AcqRel);
        let mut last = self.last.lock();
        if let Some(next) = self.script.lock().pop_front() {
            *last = next;
        }
        clamp_to_bound(*last, bound)
    }
}

/// 以闭包实现的请求头匹配器。
pub struct FnMatcher<F>(F);

impl<F> HeaderMatcher for FnMatcher<F>
where
    F: Fn(&dyn HeaderLookup) -> bool + Send + Sync,
{
    fn matches(&self, headers: &dyn HeaderLookup) -> bool {
        (self.0)(headers)
    }
}

/// 将闭包包装为共享的匹配器。
pub fn matcher<F>(predicate: F) -> Arc<dyn HeaderMatcher>
where
    F: Fn(&dyn HeaderLookup) -> bool + Send + Sync + 'static,
{
    Arc::new(FnMatcher(predicate))
}

/// 请求头值精确相等。
pub fn exact_header(name: impl Into<String>, value: impl Into<String>) -> Arc<dyn HeaderMatcher> {
    let name = name.into();
    let value = value.into();
    matcher(move |headers| headers.get(&name) == Some(value.as_str()))
}

/// 请求头存在即可。
pub fn header_present(name: impl Into<String>) -> Arc<dyn HeaderMatcher> {
    let name = name.into();
    matcher(move |headers| headers.get(&name).is_some())
}
