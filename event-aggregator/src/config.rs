//! 事件聚合器配置
//!
use std::num::NonZeroUsize;

/// 异步分发策略
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum AsyncDispatch {
    /// 逐个等待：前一个处理器完成后才启动下一个，完成顺序与集合顺序一致
    #[default]
    Sequential,
    /// 并发执行，最多 `limit` 个处理器同时在途，完成顺序不保证
    Concurrent { limit: NonZeroUsize },
}

/// 事件聚合器配置
#[derive(Clone, Copy, Debug)]
pub struct AggregatorConfig {
    /// 是否启用可记录旁路：声明了 `Loggable` 的消息额外分发给 `dyn Loggable` 订阅者
    pub log_channel: bool,
    /// `publish` 使用的分发策略
    pub async_dispatch: AsyncDispatch,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            log_channel: true,
            async_dispatch: AsyncDispatch::Sequential,
        }
    }
}
