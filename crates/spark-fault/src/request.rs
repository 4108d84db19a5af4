//! 外部协作方能力：请求视图、请求头匹配器与请求头取值解析器。
//!
//! # 定位（Why）
//! - 策略模型只消费“已解析”的请求视图与匹配能力，从不解析原始字节，也从不构造匹配器；
//! - 过滤链、请求头匹配引擎与覆写头解析均可在不改动策略模型的前提下替换实现。
//!
//! # 组成（What）
//! - [`HeaderLookup`]：按名称读取请求头；
//! - [`RequestView`]：判定所需的最小请求切面（目标集群、来源节点、请求头）；
//! - [`HeaderMatcher`]：单条请求头谓词；
//! - [`HeaderValueResolver`]：请求头模式下的延迟/中止参数解析；
//! - [`RequestSnapshot`]：`RequestView` 的自有实现，供过滤链适配层与测试直接使用。

use alloc::{string::String, vec::Vec};
use core::time::Duration;

use crate::status::AbortStatus;

/// 只读请求头视图。
pub trait HeaderLookup {
    /// 读取指定名称的首个值；名称比较规则由实现决定。
    fn get(&self, name: &str) -> Option<&str>;
}

/// 单次判定看到的请求切面。
pub trait RequestView {
    /// 请求被路由到的上游集群。
    fn upstream_cluster(&self) -> &str;

    /// 发起请求的下游节点标识；未知时返回 `None`。
    fn downstream_node(&self) -> Option<&str>;

    fn headers(&self) -> &dyn HeaderLookup;
}

/// 请求头谓词。
///
/// # 教案式说明
/// - **意图 (Why)**：匹配语义（精确、前缀、正则、取反等）属于外部匹配引擎，策略只持有其能力；
/// - **契约 (What)**：实现必须无副作用、幂等，并满足 `Send + Sync` 以便在工作线程间共享。
pub trait HeaderMatcher: Send + Sync {
    fn matches(&self, headers: &dyn HeaderLookup) -> bool;
}

/// 请求头模式下的故障参数解析器。
///
/// # 契约说明（What）
/// - 读取哪些请求头由解析器自身决定，策略与引擎只提供整组请求头，不传入头名称；
///   默认实现 [`crate::FaultHeaders`] 固定使用 `x-envoy-fault-*` 系列请求头；
/// - 请求头缺失或格式错误时返回 `None`，该次请求视为“故障不适用”；
/// - 绝不因覆写值异常而 panic 或向数据面传播错误。
pub trait HeaderValueResolver: Send + Sync {
    fn resolve_delay(&self, headers: &dyn HeaderLookup) -> Option<Duration>;

    fn resolve_abort(&self, headers: &dyn HeaderLookup) -> Option<AbortStatus>;
}

/// 有序请求头列表，名称按 ASCII 大小写不敏感比较。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HeaderList {
    entries: Vec<(String, String)>,
}

impl HeaderList {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一条请求头，同名请求头保留全部值。
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl HeaderLookup for HeaderList {
    fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

impl<N, V> FromIterator<(N, V)> for HeaderList
where
    N: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut headers = HeaderList::new();
        for (name, value) in iter {
            headers.push(name, value);
        }
        headers
    }
}

/// 自有数据的请求视图。
///
/// 过滤链在进入判定前把请求的目标集群、来源节点与请求头拷贝到这里，
/// 判定过程中不再回访原始请求对象。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestSnapshot {
    upstream_cluster: String,
    downstream_node: Option<String>,
    headers: HeaderList,
}

impl RequestSnapshot {
    pub fn new(upstream_cluster: impl Into<String>) -> Self {
        Self {
            upstream_cluster: upstream_cluster.into(),
            downstream_node: None,
            headers: HeaderList::new(),
        }
    }

    pub fn with_downstream_node(mut self, node: impl Into<String>) -> Self {
        self.downstream_node = Some(node.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(name, value);
        self
    }

    pub fn with_headers(mut self, headers: HeaderList) -> Self {
        self.headers = headers;
        self
    }
}

impl RequestView for RequestSnapshot {
    fn upstream_cluster(&self) -> &str {
        &self.upstream_cluster
    }

    fn downstream_node(&self) -> Option<&str> {
        self.downstream_node.as_deref()
    }

    fn headers(&self) -> &dyn HeaderLookup {
        &self.headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_names_are_case_insensitive() {
        let headers: HeaderList = [("X-Fault", "1"), ("x-fault", "2")].into_iter().collect();
        assert_eq!(headers.get("x-FAULT"), Some("1"), "同名请求头应返回首个值");
        assert_eq!(headers.get("x-missing"), None);
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn snapshot_exposes_request_facets() {
        let request = RequestSnapshot::new("svc-a")
            .with_downstream_node("node-1")
            .with_header("x-user", "alice");
        assert_eq!(request.upstream_cluster(), "svc-a");
        assert_eq!(request.downstream_node(), Some("node-1"));
        assert_eq!(request.headers().get("X-User"), Some("alice"));
    }
}
