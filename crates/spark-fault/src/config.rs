//! 控制面下发的策略消息及其校验。
//!
//! # 设计总览（Why）
//! - 控制面消息是“未经校验的结构化数据”，数值字段使用有符号整数，
//!   以便负数等畸形值能被显式识别并拒绝，而不是在反序列化阶段就以含糊的类型错误失败；
//! - 校验通过后才产出不可变的 [`HttpFault`]；校验失败时调用方保留旧策略。
//!
//! # 消息形态（What）
//! ```toml
//! upstream_cluster = "svc-a"
//! downstream_nodes = ["node-1"]
//! max_active_faults = 10
//!
//! [delay]
//! fixed_delay_nanos = 5000000
//! percent = { numerator = 50, denominator = "HUNDRED" }
//!
//! [abort]
//! header_abort = true
//! percent = { numerator = 1, denominator = "MILLION" }
//! ```
//!
//! 请求头匹配器不在消息中出现：它们由外部匹配引擎构造后经 [`HttpFaultConfig::into_policy`] 传入。

use alloc::{format, string::String, sync::Arc, vec::Vec};

use serde::{Deserialize, Serialize};

use crate::error::FaultConfigError;
use crate::fault::{FaultAbort, FaultDelay};
use crate::percent::{DenominatorType, FractionalPercent};
use crate::policy::HttpFault;
use crate::request::HeaderMatcher;
use crate::status::{AbortStatus, StatusCode};

fn default_denominator() -> DenominatorType {
    DenominatorType::Hundred
}

/// 采样概率消息；分母缺省为 `HUNDRED`。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FractionalPercentConfig {
    pub numerator: i64,
    #[serde(default = "default_denominator")]
    pub denominator: DenominatorType,
}

impl FractionalPercentConfig {
    pub fn build(&self, field: &str) -> Result<FractionalPercent, FaultConfigError> {
        if self.numerator < 0 {
            return Err(FaultConfigError::NegativeNumerator {
                field: format!("{field}.numerator"),
                value: self.numerator,
            });
        }
        let numerator =
            u32::try_from(self.numerator).map_err(|_| FaultConfigError::NumeratorOutOfRange {
                field: format!("{field}.numerator"),
                value: self.numerator,
            })?;
        Ok(FractionalPercent::new(numerator, self.denominator))
    }
}

/// 延迟故障消息：`fixed_delay_nanos` 与 `header_delay = true` 二选一。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FaultDelayConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_delay_nanos: Option<i64>,
    #[serde(default)]
    pub header_delay: bool,
    pub percent: FractionalPercentConfig,
}

impl FaultDelayConfig {
    pub fn build(&self) -> Result<FaultDelay, FaultConfigError> {
        let percent = self.percent.build("delay.percent")?;
        match (self.fixed_delay_nanos, self.header_delay) {
            (Some(_), true) => Err(FaultConfigError::DelayModeConflict),
            (None, false) => Err(FaultConfigError::DelayModeMissing),
            (None, true) => Ok(FaultDelay::for_header(percent)),
            (Some(nanos), false) => {
                let nanos = u64::try_from(nanos).map_err(|_| FaultConfigError::NegativeDelay {
                    field: "delay.fixed_delay_nanos".into(),
                    value: nanos,
                })?;
                Ok(FaultDelay::for_fixed_delay(nanos, percent))
            }
        }
    }
}

/// 中止故障消息：`status_code` 与 `header_abort = true` 二选一。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FaultAbortConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub header_abort: bool,
    pub percent: FractionalPercentConfig,
}

impl FaultAbortConfig {
    pub fn build(&self) -> Result<FaultAbort, FaultConfigError> {
        let percent = self.percent.build("abort.percent")?;
        match (self.status_code, self.header_abort) {
            (Some(_), true) => Err(FaultConfigError::AbortModeConflict),
            (None, false) => Err(FaultConfigError::AbortModeMissing),
            (None, true) => Ok(FaultAbort::for_header(percent)),
            (Some(raw), false) => {
                let code = i32::try_from(raw)
                    .ok()
                    .and_then(StatusCode::from_code)
                    .ok_or_else(|| FaultConfigError::UnknownStatusCode {
                        field: "abort.status_code".into(),
                        value: raw,
                    })?;
                let mut status = AbortStatus::new(code);
                if let Some(message) = &self.message {
                    status = status.with_message(message.as_str());
                }
                Ok(FaultAbort::for_status(status, percent))
            }
        }
    }
}

/// 单条策略的控制面消息。
///
/// # 教案式说明
/// - **意图 (Why)**：承接 JSON/TOML 等结构化载荷，与不可变策略模型解耦；
/// - **契约 (What)**：
///   - `upstream_cluster` 必填；`downstream_nodes` 缺省为空（不限制来源）；
///   - `delay`/`abort` 均可缺省，均缺省时产出惰性策略；
///   - `max_active_faults` 缺省表示不限并发，`0` 表示停用；
/// - **执行逻辑 (How)**：[`Self::into_policy`] 依次校验延迟、中止与上限，任一失败立即返回错误。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpFaultConfig {
    pub upstream_cluster: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub downstream_nodes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<FaultDelayConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abort: Option<FaultAbortConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_active_faults: Option<i64>,
}

impl HttpFaultConfig {
    pub fn from_json_str(input: &str) -> Result<Self, FaultConfigError> {
        serde_json::from_str(input).map_err(|err| FaultConfigError::Parse {
            format: "json",
            detail: err.to_string(),
        })
    }

    pub fn from_toml_str(input: &str) -> Result<Self, FaultConfigError> {
        toml::from_str(input).map_err(|err| FaultConfigError::Parse {
            format: "toml",
            detail: err.to_string(),
        })
    }

    /// 校验消息并以给定的请求头匹配器构造策略。
    pub fn into_policy<H>(self, headers: H) -> Result<HttpFault, FaultConfigError>
    where
        H: IntoIterator<Item = Arc<dyn HeaderMatcher>>,
    {
        let fault_delay = self.delay.as_ref().map(FaultDelayConfig::build).transpose()?;
        let fault_abort = self.abort.as_ref().map(FaultAbortConfig::build).transpose()?;
        let max_active_faults = self.max_active_faults.map(check_max_active).transpose()?;

        Ok(HttpFault::create(
            fault_delay,
            fault_abort,
            self.upstream_cluster,
            self.downstream_nodes,
            headers,
            max_active_faults,
        ))
    }
}

impl TryFrom<HttpFaultConfig> for HttpFault {
    type Error = FaultConfigError;

    /// 不带请求头限制的转换。
    fn try_from(config: HttpFaultConfig) -> Result<Self, Self::Error> {
        config.into_policy(Vec::new())
    }
}

fn check_max_active(value: i64) -> Result<u32, FaultConfigError> {
    if value < 0 {
        return Err(FaultConfigError::NegativeMaxActiveFaults { value });
    }
    u32::try_from(value).map_err(|_| FaultConfigError::MaxActiveFaultsOutOfRange { value })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn percent(numerator: i64) -> FractionalPercentConfig {
        FractionalPercentConfig {
            numerator,
            denominator: DenominatorType::Hundred,
        }
    }

    #[test]
    fn delay_with_both_modes_is_rejected() {
        let config = FaultDelayConfig {
            fixed_delay_nanos: Some(1),
            header_delay: true,
            percent: percent(10),
        };
        assert_eq!(config.build(), Err(FaultConfigError::DelayModeConflict));
    }

    #[test]
    fn delay_without_mode_is_rejected() {
        let config = FaultDelayConfig {
            fixed_delay_nanos: None,
            header_delay: false,
            percent: percent(10),
        };
        assert_eq!(config.build(), Err(FaultConfigError::DelayModeMissing));
    }

    #[test]
    fn negative_values_are_rejected_not_coerced() {
        let config = FaultDelayConfig {
            fixed_delay_nanos: Some(-1),
            header_delay: false,
            percent: percent(10),
        };
        assert!(matches!(
            config.build(),
            Err(FaultConfigError::NegativeDelay { value: -1, .. })
        ));

        let config = FaultAbortConfig {
            status_code: Some(14),
            message: None,
            header_abort: false,
            percent: percent(-1),
        };
        assert_eq!(
            config.build(),
            Err(FaultConfigError::NegativeNumerator {
                field: "abort.percent.numerator".into(),
                value: -1,
            })
        );

        assert_eq!(
            check_max_active(-2),
            Err(FaultConfigError::NegativeMaxActiveFaults { value: -2 })
        );
        assert_eq!(check_max_active(0), Ok(0));
    }

    #[test]
    fn oversized_numerator_is_out_of_range() {
        let err = percent(i64::from(u32::MAX) + 1).build("delay.percent");
        assert!(matches!(
            err,
            Err(FaultConfigError::NumeratorOutOfRange { .. })
        ));
        assert_eq!(
            percent(500).build("delay.percent"),
            Ok(FractionalPercent::per_hundred(500)),
            "分子超过分母应保留，不在构造期拒绝"
        );
    }

    #[test]
    fn abort_status_must_be_canonical() {
        let config = FaultAbortConfig {
            status_code: Some(42),
            message: None,
            header_abort: false,
            percent: percent(100),
        };
        assert!(matches!(
            config.build(),
            Err(FaultConfigError::UnknownStatusCode { value: 42, .. })
        ));
    }
}
