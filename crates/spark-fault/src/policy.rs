//! `HttpFault` 策略聚合体。
//!
//! # 设计总览（Why）
//! - 一条策略描述一个故障注入规则：可选延迟、可选中止、作用范围与并发上限；
//! - 构造后不可变，在所有并发判定间只读共享，直到被新版本整体替换。
//!
//! # 作用范围（What）
//! 请求命中策略当且仅当：
//! 1. 目标集群与 `upstream_cluster` 相等；
//! 2. `downstream_nodes` 为空，或请求来源节点属于其中；
//! 3. `headers` 中每个匹配器都接受请求头（逻辑与，首个失败即短路）。

use alloc::{sync::Arc, vec::Vec};
use core::fmt;

use crate::fault::{FaultAbort, FaultDelay};
use crate::request::{HeaderMatcher, RequestView};

/// 单条故障注入策略。
///
/// # 教案式说明
/// - **意图 (Why)**：把控制面下发的规则固化为只读值，供判定引擎在热路径上无锁读取；
/// - **契约 (What)**：
///   - 列表字段在构造时从调用方迭代器拷贝，之后与调用方集合不存在别名；
///   - 延迟与中止都缺失的策略合法但惰性，判定结果恒为无故障；
///   - `max_active_faults` 缺失表示不限并发，`Some(0)` 表示已配置但当前停用；
/// - **执行逻辑 (How)**：`with_*` 系列在构造阶段按值链式组装，产出后不再暴露任何修改入口。
#[derive(Clone)]
pub struct HttpFault {
    fault_delay: Option<FaultDelay>,
    fault_abort: Option<FaultAbort>,
    upstream_cluster: Arc<str>,
    downstream_nodes: Arc<[Arc<str>]>,
    headers: Arc<[Arc<dyn HeaderMatcher>]>,
    max_active_faults: Option<u32>,
}

impl HttpFault {
    /// 以目标集群创建不含任何故障的策略骨架。
    pub fn new(upstream_cluster: impl Into<Arc<str>>) -> Self {
        Self {
            fault_delay: None,
            fault_abort: None,
            upstream_cluster: upstream_cluster.into(),
            downstream_nodes: Arc::from(Vec::new()),
            headers: Arc::from(Vec::new()),
            max_active_faults: None,
        }
    }

    /// 一次性给出全部字段的构造入口。
    pub fn create<N, S, H>(
        fault_delay: Option<FaultDelay>,
        fault_abort: Option<FaultAbort>,
        upstream_cluster: impl Into<Arc<str>>,
        downstream_nodes: N,
        headers: H,
        max_active_faults: Option<u32>,
    ) -> Self
    where
        N: IntoIterator<Item = S>,
        S: Into<Arc<str>>,
        H: IntoIterator<Item = Arc<dyn HeaderMatcher>>,
    {
        Self {
            fault_delay,
            fault_abort,
            upstream_cluster: upstream_cluster.into(),
            downstream_nodes: downstream_nodes.into_iter().map(Into::into).collect(),
            headers: headers.into_iter().collect(),
            max_active_faults,
        }
    }

    pub fn with_delay(mut self, delay: FaultDelay) -> Self {
        self.fault_delay = Some(delay);
        self
    }

    pub fn with_abort(mut self, abort: FaultAbort) -> Self {
        self.fault_abort = Some(abort);
        self
    }

    /// 替换下游节点白名单。
    pub fn with_downstream_nodes<N, S>(mut self, nodes: N) -> Self
    where
        N: IntoIterator<Item = S>,
        S: Into<Arc<str>>,
    {
        self.downstream_nodes = nodes.into_iter().map(Into::into).collect();
        self
    }

    /// 替换请求头匹配器列表。
    pub fn with_headers<H>(mut self, headers: H) -> Self
    where
        H: IntoIterator<Item = Arc<dyn HeaderMatcher>>,
    {
        self.headers = headers.into_iter().collect();
        self
    }

    pub fn with_max_active_faults(mut self, max_active_faults: u32) -> Self {
        self.max_active_faults = Some(max_active_faults);
        self
    }

    pub fn fault_delay(&self) -> Option<&FaultDelay> {
        self.fault_delay.as_ref()
    }

    pub fn fault_abort(&self) -> Option<&FaultAbort> {
        self.fault_abort.as_ref()
    }

    pub fn upstream_cluster(&self) -> &str {
        &self.upstream_cluster
    }

    pub fn downstream_nodes(&self) -> &[Arc<str>] {
        &self.downstream_nodes
    }

    pub fn headers(&self) -> &[Arc<dyn HeaderMatcher>] {
        &self.headers
    }

    pub fn max_active_faults(&self) -> Option<u32> {
        self.max_active_faults
    }

    /// 既无延迟也无中止。
    pub fn is_inert(&self) -> bool {
        self.fault_delay.is_none() && self.fault_abort.is_none()
    }

    /// 判断请求是否落在本策略的作用范围内，无副作用。
    pub fn matches(&self, request: &dyn RequestView) -> bool {
        if request.upstream_cluster() != &*self.upstream_cluster {
            return false;
        }

        if !self.downstream_nodes.is_empty() {
            let Some(node) = request.downstream_node() else {
                return false;
            };
            if !self.downstream_nodes.iter().any(|allowed| &**allowed == node) {
                return false;
            }
        }

        let headers = request.headers();
        self.headers.iter().all(|matcher| matcher.matches(headers))
    }
}

impl fmt::Debug for HttpFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpFault")
            .field("fault_delay", &self.fault_delay)
            .field("fault_abort", &self.fault_abort)
            .field("upstream_cluster", &self.upstream_cluster)
            .field("downstream_nodes", &self.downstream_nodes)
            .field("headers", &self.headers.len())
            .field("max_active_faults", &self.max_active_faults)
            .finish()
    }
}
