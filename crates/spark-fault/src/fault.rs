//! 延迟与中止两类故障规格。
//!
//! # 设计总览（Why）
//! - 每类故障只有两种构造路径：固定值或请求头覆写。用私有枚举承载模式，
//!   “同时设置”与“都不设置”在类型层面即不可表达；
//! - 两类故障各自携带 [`FractionalPercent`] 闸门，抽样彼此独立。
//!
//! # 解析语义（What）
//! - 固定模式：`resolve` 无条件返回配置值；
//! - 请求头模式：委托 [`HeaderValueResolver`]，解析失败即视为本次请求不适用。

use core::time::Duration;

use crate::percent::FractionalPercent;
use crate::request::{HeaderValueResolver, RequestView};
use crate::status::AbortStatus;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum DelayMode {
    Fixed { delay_nanos: u64 },
    Header,
}

/// 延迟故障规格。
///
/// # 教案式说明
/// - **意图 (Why)**：按概率为命中请求追加人工时延，用于验证调用方超时与重试策略；
/// - **契约 (What)**：
///   - [`Self::for_fixed_delay`] 构造固定时延，[`Self::delay_nanos`] 返回 `Some`；
///   - [`Self::for_header`] 构造请求头模式，[`Self::is_header_delay`] 为 `true`；
///   - 引擎本身不休眠，时延作为调度指令交给过滤链执行。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FaultDelay {
    mode: DelayMode,
    percent: FractionalPercent,
}

impl FaultDelay {
    pub const fn for_fixed_delay(delay_nanos: u64, percent: FractionalPercent) -> Self {
        Self {
            mode: DelayMode::Fixed { delay_nanos },
            percent,
        }
    }

    pub const fn for_header(percent: FractionalPercent) -> Self {
        Self {
            mode: DelayMode::Header,
            percent,
        }
    }

    /// 固定模式下的时延纳秒数；请求头模式返回 `None`。
    pub const fn delay_nanos(&self) -> Option<u64> {
        match self.mode {
            DelayMode::Fixed { delay_nanos } => Some(delay_nanos),
            DelayMode::Header => None,
        }
    }

    pub const fn is_header_delay(&self) -> bool {
        matches!(self.mode, DelayMode::Header)
    }

    pub const fn percent(&self) -> FractionalPercent {
        self.percent
    }

    /// 解析本次请求实际使用的时延。
    pub fn resolve(
        &self,
        request: &dyn RequestView,
        resolver: &dyn HeaderValueResolver,
    ) -> Option<Duration> {
        match self.mode {
            DelayMode::Fixed { delay_nanos } => Some(Duration::from_nanos(delay_nanos)),
            DelayMode::Header => resolver.resolve_delay(request.headers()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum AbortMode {
    Fixed(AbortStatus),
    Header,
}

/// 中止故障规格，结构与 [`FaultDelay`] 对称。
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FaultAbort {
    mode: AbortMode,
    percent: FractionalPercent,
}

impl FaultAbort {
    pub fn for_status(status: impl Into<AbortStatus>, percent: FractionalPercent) -> Self {
        Self {
            mode: AbortMode::Fixed(status.into()),
            percent,
        }
    }

    pub const fn for_header(percent: FractionalPercent) -> Self {
        Self {
            mode: AbortMode::Header,
            percent,
        }
    }

    /// 固定模式下的中止状态；请求头模式返回 `None`。
    pub fn status(&self) -> Option<&AbortStatus> {
        match &self.mode {
            AbortMode::Fixed(status) => Some(status),
            AbortMode::Header => None,
        }
    }

    pub fn is_header_abort(&self) -> bool {
        matches!(self.mode, AbortMode::Header)
    }

    pub const fn percent(&self) -> FractionalPercent {
        self.percent
    }

    pub fn resolve(
        &self,
        request: &dyn RequestView,
        resolver: &dyn HeaderValueResolver,
    ) -> Option<AbortStatus> {
        match &self.mode {
            AbortMode::Fixed(status) => Some(status.clone()),
            AbortMode::Header => resolver.resolve_abort(request.headers()),
        }
    }
}
