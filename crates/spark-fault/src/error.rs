//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 集中定义控制面策略更新在构造期可能触发的校验错误；
//! - 任何错误都只意味着“拒绝本次更新、保留旧策略”，绝不影响在途请求。
//!
//! ## 设计要求（What）
//! - 所有变体派生 `thiserror::Error`，携带出错字段路径与原始值，便于排障；
//! - [`FaultConfigError::code`] 提供稳定的 `fault.config.*` 错误码，供告警与审计聚合；
//! - 每请求的覆写头解析失败不属于本模块：它们在数据面本地降级为“故障不适用”。

use alloc::string::String;

use thiserror::Error;

/// 策略配置校验错误。
///
/// # 教案式说明
/// - **意图 (Why)**：把“同时设置两种模式”“负数计数”等畸形更新拦截在构造边界，
///   而不是静默纠正为某个默认值；
/// - **契约 (What)**：
///   - `field` 为点分字段路径，例如 `delay.percent.numerator`；
///   - 变体均满足 `Send + Sync + 'static`，可跨线程传播；
/// - **风险 (Trade-offs)**：字段路径使用 `String`，牺牲少量分配换取可读性。
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FaultConfigError {
    #[error("delay sets both `fixed_delay_nanos` and `header_delay`")]
    DelayModeConflict,

    #[error("delay sets neither `fixed_delay_nanos` nor `header_delay`")]
    DelayModeMissing,

    #[error("abort sets both `status_code` and `header_abort`")]
    AbortModeConflict,

    #[error("abort sets neither `status_code` nor `header_abort`")]
    AbortModeMissing,

    #[error("`{field}` must be non-negative, got {value}")]
    NegativeNumerator { field: String, value: i64 },

    #[error("`{field}` exceeds the supported range, got {value}")]
    NumeratorOutOfRange { field: String, value: i64 },

    #[error("`{field}` must be non-negative, got {value}")]
    NegativeDelay { field: String, value: i64 },

    #[error("`max_active_faults` must be non-negative, got {value}")]
    NegativeMaxActiveFaults { value: i64 },

    #[error("`max_active_faults` exceeds the supported range, got {value}")]
    MaxActiveFaultsOutOfRange { value: i64 },

    #[error("`{field}` is not a canonical status code: {value}")]
    UnknownStatusCode { field: String, value: i64 },

    #[error("failed to parse {format} fault policy: {detail}")]
    Parse { format: &'static str, detail: String },
}

impl FaultConfigError {
    /// 稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            FaultConfigError::DelayModeConflict => "fault.config.delay_mode_conflict",
            FaultConfigError::DelayModeMissing => "fault.config.delay_mode_missing",
            FaultConfigError::AbortModeConflict => "fault.config.abort_mode_conflict",
            FaultConfigError::AbortModeMissing => "fault.config.abort_mode_missing",
            FaultConfigError::NegativeNumerator { .. } => "fault.config.negative_numerator",
            FaultConfigError::NumeratorOutOfRange { .. } => "fault.config.numerator_out_of_range",
            FaultConfigError::NegativeDelay { .. } => "fault.config.negative_delay",
            FaultConfigError::NegativeMaxActiveFaults { .. } => {
                "fault.config.negative_max_active_faults"
            }
            FaultConfigError::MaxActiveFaultsOutOfRange { .. } => {
                "fault.config.max_active_faults_out_of_range"
            }
            FaultConfigError::UnknownStatusCode { .. } => "fault.config.unknown_status_code",
            FaultConfigError::Parse { .. } => "fault.config.parse",
        }
    }
}
