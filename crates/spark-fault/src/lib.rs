#![deny(unsafe_code)]

//! # spark-fault
//!
//! ## 定位与职责（Why）
//! - 为数据面 HTTP 过滤链提供故障注入策略：对命中的请求按概率注入人工延迟、以合成状态中止，
//!   或先延迟再中止，并受活跃故障并发上限约束；
//! - 只负责“该对这个请求下达什么故障指令”，不负责真正挂起连接或编码状态。
//!
//! ## 架构嵌入（Where）
//! - `percent`/`draw`：整数分数采样与可注入的抽样源；
//! - `fault`/`policy`/`status`：不可变策略模型；
//! - `request`/`headers`：请求视图、匹配器与覆写头解析等外部协作能力；
//! - `counter`/`engine`/`decision`：准入控制、判定流程与交给过滤链的指令；
//! - `injector`：基于 `ArcSwap` 的热更新入口；
//! - `config`/`error`：控制面消息的反序列化与校验。
//!
//! ## 数据流（How）
//! 控制面消息 → [`HttpFaultConfig::into_policy`] 校验 → [`FaultInjector::install`] 整体替换快照 →
//! 每个请求 [`FaultInjector::decide`] → 过滤链执行 [`Decision`] 并持有名额直至注入结束。

extern crate alloc;

pub mod config;
pub mod counter;
pub mod decision;
pub mod draw;
pub mod engine;
pub mod error;
pub mod fault;
pub mod headers;
pub mod injector;
pub mod percent;
pub mod policy;
pub mod request;
pub mod status;
/// 测试桩命名空间：确定性抽样源与闭包匹配器，供集成测试与示例复用。
pub mod test_stubs;

pub use config::{FaultAbortConfig, FaultDelayConfig, FractionalPercentConfig, HttpFaultConfig};
pub use counter::{ActiveFaultCounter, ActiveFaultPermit};
pub use decision::{Decision, FaultVerdict};
pub use draw::{DrawSource, SeededDraws, ThreadRngDraws};
pub use engine::DecisionEngine;
pub use error::FaultConfigError;
pub use fault::{FaultAbort, FaultDelay};
pub use headers::FaultHeaders;
pub use injector::{CounterHandoff, FaultInjector, PolicySlot};
pub use percent::{DenominatorType, FractionalPercent};
pub use policy::HttpFault;
pub use request::{
    HeaderList, HeaderLookup, HeaderMatcher, HeaderValueResolver, RequestSnapshot, RequestView,
};
pub use status::{AbortStatus, StatusCode};
