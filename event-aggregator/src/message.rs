//! 消息（Message）与可记录能力（Loggable）
//!
//! 任何 `Send + Sync + 'static` 的值都可以作为消息发送；
//! 消息可额外声明 [`Loggable`] 能力，从而在按具体类型分发之外，
//! 再被分发给订阅了 `dyn Loggable` 的日志类监听者。
//!
use std::fmt;
use tracing::Level;

/// 可被事件聚合器分发的消息
///
/// 通常通过 `#[message]` / `#[message(loggable)]` 宏实现。
pub trait Message: Send + Sync + 'static {
    /// 若消息同时声明了可记录能力，返回其 `Loggable` 视图
    fn as_loggable(&self) -> Option<&(dyn Loggable + 'static)> {
        None
    }
}

/// 可记录能力：与消息的具体类型无关的日志旁路
pub trait Loggable: Send + Sync {
    /// 日志级别
    fn level(&self) -> Level {
        Level::INFO
    }

    /// 渲染为一行日志文本
    fn render(&self) -> String;
}

impl fmt::Debug for dyn Loggable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Loggable")
            .field("level", &self.level())
            .field("text", &self.render())
            .finish()
    }
}
