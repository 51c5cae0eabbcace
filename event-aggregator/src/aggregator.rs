//! 事件聚合器（EventAggregator）
//!
//! 进程内发布/订阅注册表：
//! - `add_listener`：按订阅者声明的能力逐个挂载去重后的弱引用；
//! - `send_message`：同步分发到所有存活订阅者，并顺带清理已失效条目；
//! - `publish`：异步版本，见 [`async_dispatch`](crate::async_dispatch)；
//! - `has_listener`：查询某对象当前是否持有任何存活订阅。
//!
//! 聚合器不持有订阅者：订阅者在别处被释放后，其条目在下一次
//! 针对该能力的分发中被移除。应用负责在所需作用域内只构造一个实例并共享它。
//!
use crate::config::AggregatorConfig;
use crate::error::{AggregatorError, AggregatorResult};
use crate::listener::{AsyncListener, Listener};
use crate::message::{Loggable, Message};
use crate::registry::{SubscriptionRegistry, identity};
use crate::subscriber::{Capabilities, Subscriber};
use bon::Builder;
use std::sync::Arc;
use tracing::{debug, trace, warn};

#[derive(Builder)]
pub struct EventAggregator {
    #[builder(skip)]
    pub(crate) registry: SubscriptionRegistry,
    #[builder(default)]
    pub(crate) config: AggregatorConfig,
}

impl Default for EventAggregator {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl EventAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// 注册监听者
    ///
    /// 对 `L` 声明的每个能力插入一条弱引用；同一对象重复注册不会产生重复条目，
    /// 未声明任何能力的对象注册为静默空操作。
    pub fn add_listener<L: Subscriber>(&self, listener: &Arc<L>) {
        let caps = Capabilities::<L>::of();

        for (capability, inserted) in caps.attach(&self.registry, listener) {
            if inserted {
                debug!(capability, "listener subscribed");
            } else {
                trace!(capability, "listener already subscribed");
            }
        }
    }

    /// `candidate` 当前是否在任一能力下持有存活订阅
    ///
    /// 这是时间点快照：已释放但尚未被分发清理的订阅者不会被计入（其弱引用已无法升级）。
    pub fn has_listener<T: ?Sized>(&self, candidate: &Arc<T>) -> bool {
        self.registry.holds_live(identity(Arc::as_ptr(candidate)))
    }

    /// 同步分发消息
    ///
    /// - 先按消息的具体类型分发给 `Listener<M>` 订阅者；
    /// - 若启用了可记录旁路且消息声明了 `Loggable`，再分发给 `Listener<dyn Loggable>` 订阅者；
    /// - 单个处理器失败不会中断本轮分发，失效条目总会被清理；
    /// - 返回本轮第一个失败（具体类型通道优先）。
    pub fn send_message<M: Message>(&self, message: &M) -> AggregatorResult<()> {
        let concrete = self.dispatch::<M>(message);

        let logged = match message.as_loggable() {
            Some(loggable) if self.config.log_channel => self.dispatch::<dyn Loggable>(loggable),
            _ => Ok(()),
        };

        concrete.and(logged)
    }

    fn dispatch<M: ?Sized + 'static>(&self, message: &M) -> AggregatorResult<()> {
        let topic = self.registry.get_or_create::<dyn Listener<M>>();
        let mut tally = FailureTally::new(topic.name());
        let mut expired = Vec::new();
        let mut delivered = 0usize;

        for entry in topic.snapshot() {
            match entry.upgrade() {
                Some(listener) => {
                    tally.record(listener.handle(message));
                    delivered += 1;
                }
                None => expired.push(identity(entry.as_ptr())),
            }
        }

        let evicted = topic.evict(&expired);
        trace!(capability = topic.name(), delivered, "dispatch pass finished");
        if evicted > 0 {
            debug!(capability = topic.name(), evicted, "evicted expired listeners");
        }

        tally.finish()
    }

    /// 同步能力 `Listener<M>` 当前存储的条目数（含尚未清理的失效条目）
    pub fn subscription_count<M: ?Sized + 'static>(&self) -> usize {
        self.registry.len_of::<dyn Listener<M>>()
    }

    /// 异步能力 `AsyncListener<M>` 当前存储的条目数（含尚未清理的失效条目）
    pub fn async_subscription_count<M: ?Sized + Sync + 'static>(&self) -> usize {
        self.registry.len_of::<dyn AsyncListener<M>>()
    }

    /// 已创建的能力键名称（包括空集合）
    pub fn registered_capabilities(&self) -> Vec<&'static str> {
        self.registry.capabilities()
    }
}

/// 一轮分发中的失败统计：记录第一个失败与失败总数
pub(crate) struct FailureTally {
    capability: &'static str,
    failures: usize,
    first: Option<anyhow::Error>,
}

impl FailureTally {
    pub(crate) fn new(capability: &'static str) -> Self {
        Self {
            capability,
            failures: 0,
            first: None,
        }
    }

    pub(crate) fn record(&mut self, outcome: anyhow::Result<()>) {
        if let Err(err) = outcome {
            warn!(capability = self.capability, error = %err, "listener failed");
            self.failures += 1;
            if self.first.is_none() {
                self.first = Some(err);
            }
        }
    }

    pub(crate) fn finish(self) -> AggregatorResult<()> {
        match self.first {
            Some(source) => Err(AggregatorError::handler(self.capability, self.failures, source)),
            None => Ok(()),
        }
    }
}
