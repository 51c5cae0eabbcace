//! 异步分发（publish）
//!
//! 与同步分发相同的算法，区别只在调用方式：
//! - 处理器实现 [`AsyncListener`]，与同步 `Listener` 使用不同的注册键；
//! - 本轮开始时将存活条目升级为强引用，保证处理器在整轮等待期间存活；
//! - 任何锁都不会跨越 `.await`；
//! - 所有处理器完成后才清理失效条目。
//!
//! 顺序由 [`AsyncDispatch`] 决定：`Sequential` 逐个等待，
//! `Concurrent` 以有限并发执行且不保证完成顺序。
//!
use crate::aggregator::{EventAggregator, FailureTally};
use crate::config::AsyncDispatch;
use crate::error::AggregatorResult;
use crate::listener::AsyncListener;
use crate::message::{Loggable, Message};
use futures_util::{StreamExt, stream};
use tracing::{debug, trace};

impl EventAggregator {
    /// 异步分发消息
    ///
    /// 语义与 [`send_message`](EventAggregator::send_message) 一致：
    /// 先按具体类型分发，再按需走可记录旁路；失败不中断本轮，返回第一个失败。
    pub async fn publish<M: Message>(&self, message: &M) -> AggregatorResult<()> {
        let concrete = self.dispatch_async::<M>(message).await;

        let logged = match message.as_loggable() {
            Some(loggable) if self.config.log_channel => {
                self.dispatch_async::<dyn Loggable>(loggable).await
            }
            _ => Ok(()),
        };

        concrete.and(logged)
    }

    async fn dispatch_async<M: ?Sized + Sync + 'static>(&self, message: &M) -> AggregatorResult<()> {
        let topic = self.registry.get_or_create::<dyn AsyncListener<M>>();
        let (live, expired) = topic.partition();
        let mut tally = FailureTally::new(topic.name());

        match self.config.async_dispatch {
            AsyncDispatch::Sequential => {
                for listener in &live {
                    tally.record(listener.handle(message).await);
                }
            }
            AsyncDispatch::Concurrent { limit } => {
                // async_trait 返回的 future 是惰性的，并发上限由 buffer_unordered 控制
                let pending: Vec<_> = live.iter().map(|listener| listener.handle(message)).collect();
                let outcomes: Vec<anyhow::Result<()>> = stream::iter(pending)
                    .buffer_unordered(limit.get())
                    .collect()
                    .await;

                for outcome in outcomes {
                    tally.record(outcome);
                }
            }
        }

        let evicted = topic.evict(&expired);
        trace!(capability = topic.name(), delivered = live.len(), "async dispatch pass finished");
        if evicted > 0 {
            debug!(capability = topic.name(), evicted, "evicted expired listeners");
        }

        tally.finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{AggregatorConfig, AsyncDispatch};
    use crate::{AggregatorError, AsyncListener, EventAggregator, listener, message};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::num::NonZeroUsize;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[message]
    struct Tick(u64);

    #[listener(async(Tick))]
    struct Slow {
        id: u64,
        delay_ms: u64,
        journal: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl AsyncListener<Tick> for Slow {
        async fn handle(&self, message: &Tick) -> anyhow::Result<()> {
            self.journal.lock().push(format!("start-{}", self.id));
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            self.journal.lock().push(format!("end-{}", self.id));
            anyhow::ensure!(message.0 != self.id, "listener {} rejects tick", self.id);
            Ok(())
        }
    }

    fn slow(id: u64, delay_ms: u64, journal: &Arc<Mutex<Vec<String>>>) -> Arc<Slow> {
        Arc::new(Slow {
            id,
            delay_ms,
            journal: journal.clone(),
        })
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn sequential_awaits_each_handler_in_order() {
        let aggregator = EventAggregator::new();
        let journal = Arc::new(Mutex::new(Vec::new()));
        let a = slow(1, 30, &journal);
        let b = slow(2, 1, &journal);
        aggregator.add_listener(&a);
        aggregator.add_listener(&b);

        aggregator.publish(&Tick(0)).await.unwrap();

        assert_eq!(
            *journal.lock(),
            vec!["start-1", "end-1", "start-2", "end-2"]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_runs_handlers_overlapping() {
        let aggregator = EventAggregator::builder()
            .config(AggregatorConfig {
                async_dispatch: AsyncDispatch::Concurrent {
                    limit: NonZeroUsize::new(4).unwrap(),
                },
                ..Default::default()
            })
            .build();
        let journal = Arc::new(Mutex::new(Vec::new()));
        let a = slow(1, 60, &journal);
        let b = slow(2, 1, &journal);
        aggregator.add_listener(&a);
        aggregator.add_listener(&b);

        aggregator.publish(&Tick(0)).await.unwrap();

        let journal = journal.lock();
        assert_eq!(journal.len(), 4);
        // 两个处理器都在任何一个完成之前启动
        assert!(journal[..2].iter().all(|e| e.starts_with("start-")));
        assert_eq!(journal.last().map(String::as_str), Some("end-1"));
    }

    #[listener(async(Tick))]
    struct Gauge {
        in_flight: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
        done: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl AsyncListener<Tick> for Gauge {
        async fn handle(&self, _message: &Tick) -> anyhow::Result<()> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.done.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_respects_in_flight_limit() {
        let aggregator = EventAggregator::builder()
            .config(AggregatorConfig {
                async_dispatch: AsyncDispatch::Concurrent {
                    limit: NonZeroUsize::new(2).unwrap(),
                },
                ..Default::default()
            })
            .build();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let done = Arc::new(AtomicUsize::new(0));
        let gauges: Vec<Arc<Gauge>> = (0..6)
            .map(|_| {
                Arc::new(Gauge {
                    in_flight: in_flight.clone(),
                    peak: peak.clone(),
                    done: done.clone(),
                })
            })
            .collect();
        for gauge in &gauges {
            aggregator.add_listener(gauge);
        }

        aggregator.publish(&Tick(0)).await.unwrap();

        assert_eq!(done.load(Ordering::SeqCst), 6);
        assert_eq!(in_flight.load(Ordering::SeqCst), 0);
        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn failures_are_reported_after_the_whole_pass() {
        let aggregator = EventAggregator::new();
        let journal = Arc::new(Mutex::new(Vec::new()));
        let a = slow(1, 1, &journal);
        let b = slow(2, 1, &journal);
        aggregator.add_listener(&a);
        aggregator.add_listener(&b);

        let err = aggregator.publish(&Tick(1)).await.unwrap_err();

        assert!(matches!(err, AggregatorError::Handler { failures: 1, .. }));
        assert_eq!(journal.lock().len(), 4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn expired_async_listeners_are_evicted_after_publish() {
        let aggregator = EventAggregator::new();
        let journal = Arc::new(Mutex::new(Vec::new()));
        let keep = slow(1, 1, &journal);
        let gone = slow(2, 1, &journal);
        aggregator.add_listener(&keep);
        aggregator.add_listener(&gone);
        drop(gone);

        assert_eq!(aggregator.async_subscription_count::<Tick>(), 2);
        aggregator.publish(&Tick(0)).await.unwrap();
        assert_eq!(aggregator.async_subscription_count::<Tick>(), 1);
        assert_eq!(journal.lock().len(), 2);
    }

    #[listener(Tick, async(Tick))]
    struct Hybrid {
        sync_calls: AtomicUsize,
        async_calls: AtomicUsize,
    }

    impl crate::Listener<Tick> for Hybrid {
        fn handle(&self, _message: &Tick) -> anyhow::Result<()> {
            self.sync_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[async_trait]
    impl AsyncListener<Tick> for Hybrid {
        async fn handle(&self, _message: &Tick) -> anyhow::Result<()> {
            self.async_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn sync_and_async_capabilities_are_keyed_separately() {
        let aggregator = EventAggregator::new();
        let hybrid = Arc::new(Hybrid {
            sync_calls: AtomicUsize::new(0),
            async_calls: AtomicUsize::new(0),
        });
        aggregator.add_listener(&hybrid);

        aggregator.send_message(&Tick(0)).unwrap();
        aggregator.publish(&Tick(0)).await.unwrap();
        aggregator.publish(&Tick(0)).await.unwrap();

        assert_eq!(hybrid.sync_calls.load(Ordering::SeqCst), 1);
        assert_eq!(hybrid.async_calls.load(Ordering::SeqCst), 2);
    }
}
