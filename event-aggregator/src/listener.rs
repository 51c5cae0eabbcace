//! 监听能力（Listener Capability）
//!
//! 一个对象可以为任意多个互不相关的消息类型分别实现 [`Listener`] 或 [`AsyncListener`]；
//! 同步与异步能力在注册表中使用不同的键，互不干扰。
//!
use async_trait::async_trait;

/// 同步监听能力：对象可以处理类型为 `M` 的消息
pub trait Listener<M: ?Sized>: Send + Sync + 'static {
    fn handle(&self, message: &M) -> anyhow::Result<()>;
}

/// 异步监听能力：处理结果需要等待
#[async_trait]
pub trait AsyncListener<M: ?Sized + Sync>: Send + Sync + 'static {
    async fn handle(&self, message: &M) -> anyhow::Result<()>;
}
