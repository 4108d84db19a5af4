//! 默认的故障覆写请求头解析器。
//!
//! 当策略以请求头模式配置延迟或中止时，具体参数由调用方通过以下请求头逐请求给出：
//! - `x-envoy-fault-delay-request`：延迟毫秒数（非负整数）；
//! - `x-envoy-fault-abort-grpc-request`：标准状态码整数，优先级高于 HTTP 形式；
//! - `x-envoy-fault-abort-request`：`200..=599` 范围内的 HTTP 状态，按 HTTP→标准码映射转换。
//!
//! 任意值缺失或无法解析时返回 `None`，不会产生错误。

use core::time::Duration;

use crate::request::{HeaderLookup, HeaderValueResolver};
use crate::status::{AbortStatus, StatusCode};

pub const HEADER_DELAY_KEY: &str = "x-envoy-fault-delay-request";
pub const HEADER_ABORT_GRPC_STATUS_KEY: &str = "x-envoy-fault-abort-grpc-request";
pub const HEADER_ABORT_HTTP_STATUS_KEY: &str = "x-envoy-fault-abort-request";

const INJECTED_BY_HEADER: &str = "RPC terminated due to fault injection: HTTP status code";
const INJECTED_BY_GRPC_HEADER: &str = "RPC terminated due to fault injection";

/// 解析 `x-envoy-fault-*` 覆写头的 [`HeaderValueResolver`]。
#[derive(Clone, Copy, Debug, Default)]
pub struct FaultHeaders;

impl FaultHeaders {
    fn parse_grpc_status(raw: &str) -> Option<AbortStatus> {
        let code = raw.trim().parse::<i32>().ok()?;
        let code = StatusCode::from_code(code)?;
        Some(AbortStatus::new(code).with_message(INJECTED_BY_GRPC_HEADER))
    }

    fn parse_http_status(raw: &str) -> Option<AbortStatus> {
        let http_status = raw.trim().parse::<u16>().ok()?;
        if !(200..=599).contains(&http_status) {
            return None;
        }
        let code = StatusCode::from_http_status(http_status);
        Some(AbortStatus::new(code).with_message(format!("{INJECTED_BY_HEADER} {http_status}")))
    }
}

impl HeaderValueResolver for FaultHeaders {
    fn resolve_delay(&self, headers: &dyn HeaderLookup) -> Option<Duration> {
        let millis = headers.get(HEADER_DELAY_KEY)?.trim().parse::<u64>().ok()?;
        Some(Duration::from_millis(millis))
    }

    fn resolve_abort(&self, headers: &dyn HeaderLookup) -> Option<AbortStatus> {
        // gRPC 形式存在时不再回退到 HTTP 形式，即便前者无法解析。
        if let Some(raw) = headers.get(HEADER_ABORT_GRPC_STATUS_KEY) {
            return Self::parse_grpc_status(raw);
        }
        headers
            .get(HEADER_ABORT_HTTP_STATUS_KEY)
            .and_then(Self::parse_http_status)
    }
}
