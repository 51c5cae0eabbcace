use event_aggregator::{EventAggregator, Listener, Loggable, listener, message};
use std::sync::Arc;
use tracing::Level;

/// 将可记录消息转发到 tracing 的日志监听者
#[listener(dyn Loggable)]
struct TracingSink;

impl Listener<dyn Loggable> for TracingSink {
    fn handle(&self, message: &(dyn Loggable + 'static)) -> anyhow::Result<()> {
        let line = message.render();
        match message.level() {
            Level::ERROR => tracing::error!(target: "app", "{line}"),
            Level::WARN => tracing::warn!(target: "app", "{line}"),
            Level::INFO => tracing::info!(target: "app", "{line}"),
            Level::DEBUG => tracing::debug!(target: "app", "{line}"),
            _ => tracing::trace!(target: "app", "{line}"),
        }
        Ok(())
    }
}

#[message(loggable)]
struct DiskAlmostFull {
    percent: u8,
}

impl Loggable for DiskAlmostFull {
    fn level(&self) -> Level {
        Level::WARN
    }

    fn render(&self) -> String {
        format!("disk usage at {}%", self.percent)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(Level::TRACE)
        .init();

    let aggregator = EventAggregator::new();
    let sink = Arc::new(TracingSink);
    aggregator.add_listener(&sink);

    aggregator.send_message(&DiskAlmostFull { percent: 93 })?;
    Ok(())
}
