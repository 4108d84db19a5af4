//! 中止故障使用的合成状态。
//!
//! 状态码沿用 gRPC 规范定义的 17 个标准码；HTTP 状态到标准码的映射与 gRPC HTTP/2
//! 传输约定保持一致，供请求头覆写（`x-envoy-fault-abort-request`）时转换使用。

use alloc::sync::Arc;
use core::fmt;

/// 标准状态码。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(i32)]
pub enum StatusCode {
    Ok = 0,
    Cancelled = 1,
    Unknown = 2,
    InvalidArgument = 3,
    DeadlineExceeded = 4,
    NotFound = 5,
    AlreadyExists = 6,
    PermissionDenied = 7,
    ResourceExhausted = 8,
    FailedPrecondition = 9,
    Aborted = 10,
    OutOfRange = 11,
    Unimplemented = 12,
    Internal = 13,
    Unavailable = 14,
    DataLoss = 15,
    Unauthenticated = 16,
}

impl StatusCode {
    const ALL: [StatusCode; 17] = [
        StatusCode::Ok,
        StatusCode::Cancelled,
        StatusCode::Unknown,
        StatusCode::InvalidArgument,
        StatusCode::DeadlineExceeded,
        StatusCode::NotFound,
        StatusCode::AlreadyExists,
        StatusCode::PermissionDenied,
        StatusCode::ResourceExhausted,
        StatusCode::FailedPrecondition,
        StatusCode::Aborted,
        StatusCode::OutOfRange,
        StatusCode::Unimplemented,
        StatusCode::Internal,
        StatusCode::Unavailable,
        StatusCode::DataLoss,
        StatusCode::Unauthenticated,
    ];

    /// 由整数码还原；非标准码返回 `None`。
    pub fn from_code(code: i32) -> Option<Self> {
        usize::try_from(code)
            .ok()
            .and_then(|index| Self::ALL.get(index).copied())
    }

    pub const fn code(self) -> i32 {
        self as i32
    }

    /// 规范中的大写名称，例如 `UNAVAILABLE`。
    pub const fn name(self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::Cancelled => "CANCELLED",
            StatusCode::Unknown => "UNKNOWN",
            StatusCode::InvalidArgument => "INVALID_ARGUMENT",
            StatusCode::DeadlineExceeded => "DEADLINE_EXCEEDED",
            StatusCode::NotFound => "NOT_FOUND",
            StatusCode::AlreadyExists => "ALREADY_EXISTS",
            StatusCode::PermissionDenied => "PERMISSION_DENIED",
            StatusCode::ResourceExhausted => "RESOURCE_EXHAUSTED",
            StatusCode::FailedPrecondition => "FAILED_PRECONDITION",
            StatusCode::Aborted => "ABORTED",
            StatusCode::OutOfRange => "OUT_OF_RANGE",
            StatusCode::Unimplemented => "UNIMPLEMENTED",
            StatusCode::Internal => "INTERNAL",
            StatusCode::Unavailable => "UNAVAILABLE",
            StatusCode::DataLoss => "DATA_LOSS",
            StatusCode::Unauthenticated => "UNAUTHENTICATED",
        }
    }

    /// HTTP 状态到标准码的映射。
    ///
    /// # 教案式说明
    /// - **意图 (Why)**：请求头只能携带 HTTP 状态时，需要与 gRPC 客户端观察到的状态保持一致；
    /// - **契约 (What)**：`400→INTERNAL`、`401→UNAUTHENTICATED`、`403→PERMISSION_DENIED`、
    ///   `404→UNIMPLEMENTED`、`429/502/503/504→UNAVAILABLE`，其余一律 `UNKNOWN`。
    pub const fn from_http_status(http_status: u16) -> Self {
        match http_status {
            400 => StatusCode::Internal,
            401 => StatusCode::Unauthenticated,
            403 => StatusCode::PermissionDenied,
            404 => StatusCode::Unimplemented,
            429 | 502 | 503 | 504 => StatusCode::Unavailable,
            _ => StatusCode::Unknown,
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 注入中止时交给过滤链的合成状态：状态码加可选描述。
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AbortStatus {
    code: StatusCode,
    message: Option<Arc<str>>,
}

impl AbortStatus {
    pub const fn new(code: StatusCode) -> Self {
        Self {
            code,
            message: None,
        }
    }

    /// 附加人类可读描述。
    pub fn with_message(mut self, message: impl Into<Arc<str>>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub const fn code(&self) -> StatusCode {
        self.code
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl From<StatusCode> for AbortStatus {
    fn from(code: StatusCode) -> Self {
        Self::new(code)
    }
}

impl fmt::Display for AbortStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}: {message}", self.code),
            None => fmt::Display::fmt(&self.code, f),
        }
    }
}
