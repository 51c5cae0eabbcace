//! 事件聚合器错误定义
//!
//! 注册与分发本身没有失败路径（无能力注册、重复注册、向无人订阅的类型发送、
//! 遇到已失效订阅者均不视为错误），唯一的错误来源是处理器自身返回的失败。
//!
use thiserror::Error;

/// 统一错误类型
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum AggregatorError {
    /// 一轮分发中至少有一个处理器失败；`source` 为该轮第一个失败
    #[error("handler failed: capability={capability}, failures={failures}: {source}")]
    Handler {
        capability: &'static str,
        failures: usize,
        #[source]
        source: anyhow::Error,
    },
}

impl AggregatorError {
    pub(crate) fn handler(capability: &'static str, failures: usize, source: anyhow::Error) -> Self {
        Self::Handler {
            capability,
            failures,
            source,
        }
    }

    /// 本轮失败的处理器数量
    pub fn failures(&self) -> usize {
        match self {
            Self::Handler { failures, .. } => *failures,
        }
    }
}

/// 统一 Result 类型别名
pub type AggregatorResult<T> = Result<T, AggregatorError>;
