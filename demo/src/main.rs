use async_trait::async_trait;
use event_aggregator::{
    AsyncListener, EventAggregator, Listener, Loggable, Subscriber, listener, message,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[message(loggable)]
#[derive(Debug, Clone)]
struct Deposited {
    account: String,
    amount: i64,
}

impl Loggable for Deposited {
    fn render(&self) -> String {
        format!("deposited {} into {}", self.amount, self.account)
    }
}

#[message(loggable)]
#[derive(Debug, Clone)]
struct Overdrawn {
    account: String,
}

impl Loggable for Overdrawn {
    fn level(&self) -> Level {
        Level::WARN
    }

    fn render(&self) -> String {
        format!("account {} overdrawn", self.account)
    }
}

#[listener(Deposited, Overdrawn)]
#[derive(Default)]
struct BalanceView {
    total: AtomicI64,
}

impl Listener<Deposited> for BalanceView {
    fn handle(&self, message: &Deposited) -> anyhow::Result<()> {
        self.total.fetch_add(message.amount, Ordering::SeqCst);
        Ok(())
    }
}

impl Listener<Overdrawn> for BalanceView {
    fn handle(&self, message: &Overdrawn) -> anyhow::Result<()> {
        anyhow::bail!("cannot reconcile overdrawn account {}", message.account)
    }
}

#[listener(async(Deposited))]
struct Notifier;

#[async_trait]
impl AsyncListener<Deposited> for Notifier {
    async fn handle(&self, message: &Deposited) -> anyhow::Result<()> {
        tokio::task::yield_now().await;
        println!("notify: {} received {}", message.account, message.amount);
        Ok(())
    }
}

/// 日志代理：把所有可记录消息写入 tracing
#[listener(dyn Loggable, async(dyn Loggable))]
struct LogBroker;

impl Listener<dyn Loggable> for LogBroker {
    fn handle(&self, message: &(dyn Loggable + 'static)) -> anyhow::Result<()> {
        let line = message.render();
        match message.level() {
            Level::ERROR => tracing::error!(target: "demo::log", "{line}"),
            Level::WARN => tracing::warn!(target: "demo::log", "{line}"),
            Level::INFO => tracing::info!(target: "demo::log", "{line}"),
            Level::DEBUG => tracing::debug!(target: "demo::log", "{line}"),
            _ => tracing::trace!(target: "demo::log", "{line}"),
        }
        Ok(())
    }
}

#[async_trait]
impl AsyncListener<dyn Loggable> for LogBroker {
    async fn handle(&self, message: &(dyn Loggable + 'static)) -> anyhow::Result<()> {
        tracing::info!(target: "demo::log", "(async) {}", message.render());
        Ok(())
    }
}

/// 极简“容器”：构造组件时自动注册到聚合器
struct Container {
    aggregator: Arc<EventAggregator>,
}

impl Container {
    fn make<T: Subscriber>(&self, component: T) -> Arc<T> {
        let component = Arc::new(component);
        self.aggregator.add_listener(&component);
        component
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .init();

    let aggregator = Arc::new(EventAggregator::new());
    let container = Container {
        aggregator: aggregator.clone(),
    };

    let view = container.make(BalanceView::default());
    let _broker = container.make(LogBroker);
    let notifier = container.make(Notifier);

    let deposit = Deposited {
        account: "acc-1".into(),
        amount: 100,
    };
    aggregator.send_message(&deposit)?;
    aggregator.publish(&deposit).await?;
    println!("balance: {}", view.total.load(Ordering::SeqCst));

    if let Err(err) = aggregator.send_message(&Overdrawn {
        account: "acc-1".into(),
    }) {
        eprintln!("handler failure surfaced: {err}");
    }

    // 释放通知器后，下一次异步分发会清理它的条目
    drop(notifier);
    println!(
        "async entries before publish: {}",
        aggregator.async_subscription_count::<Deposited>()
    );
    aggregator.publish(&deposit).await?;
    println!(
        "async entries after publish: {}",
        aggregator.async_subscription_count::<Deposited>()
    );

    println!("capabilities: {:#?}", aggregator.registered_capabilities());
    Ok(())
}
