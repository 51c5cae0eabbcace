//! 进程内事件聚合器（event-aggregator）
//!
//! 让彼此独立构造的对象按消息类型声明兴趣并接收消息，发布者与订阅者之间不持有任何直接引用：
//! - 订阅表以能力类型（`dyn Listener<M>` / `dyn AsyncListener<M>`）为键，值为弱引用集合；
//! - 订阅者无需显式退订，被释放后在下一次针对该能力的分发中被惰性清理；
//! - 同一对象对同一能力重复注册只保留一条（按身份去重）；
//! - 声明了 [`Loggable`] 的消息额外分发给 `dyn Loggable` 订阅者（日志旁路）；
//! - 注册与分发可在任意线程并发调用，处理器总在锁外执行，可重入聚合器。
//!
//! 典型用法：
//! ```rust
//! use event_aggregator::{EventAggregator, Listener, listener, message};
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! #[message]
//! struct OrderPlaced {
//!     id: u64,
//! }
//!
//! #[listener(OrderPlaced)]
//! #[derive(Default)]
//! struct Billing {
//!     seen: AtomicUsize,
//! }
//!
//! impl Listener<OrderPlaced> for Billing {
//!     fn handle(&self, message: &OrderPlaced) -> anyhow::Result<()> {
//!         assert_eq!(message.id, 42);
//!         self.seen.fetch_add(1, Ordering::SeqCst);
//!         Ok(())
//!     }
//! }
//!
//! let aggregator = EventAggregator::new();
//! let billing = Arc::new(Billing::default());
//! aggregator.add_listener(&billing);
//!
//! aggregator.send_message(&OrderPlaced { id: 42 }).unwrap();
//! assert_eq!(billing.seen.load(Ordering::SeqCst), 1);
//! assert!(aggregator.has_listener(&billing));
//! ```
//!
pub mod aggregator;
pub mod async_dispatch;
pub mod config;
pub mod error;
pub mod listener;
pub mod message;
pub(crate) mod registry;
pub mod subscriber;

pub use aggregator::EventAggregator;
pub use config::{AggregatorConfig, AsyncDispatch};
pub use error::{AggregatorError, AggregatorResult};
pub use event_aggregator_macros::{listener, message};
pub use listener::{AsyncListener, Listener};
pub use message::{Loggable, Message};
pub use subscriber::{Capabilities, Subscriber};

// 允许在本 crate 内部通过 ::event_aggregator 进行自引用，
// 以便过程宏在本 crate 的单元测试中也能解析到 ::event_aggregator 路径。
extern crate self as event_aggregator;
