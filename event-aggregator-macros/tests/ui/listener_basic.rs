use event_aggregator::{AsyncListener, EventAggregator, Listener, Loggable, listener, message};
use std::sync::Arc;

#[message]
struct Created;

#[message]
struct Deleted;

#[listener(Created, Deleted, dyn Loggable, async(Created))]
struct Audit;

impl Listener<Created> for Audit {
    fn handle(&self, _message: &Created) -> anyhow::Result<()> {
        Ok(())
    }
}

impl Listener<Deleted> for Audit {
    fn handle(&self, _message: &Deleted) -> anyhow::Result<()> {
        Ok(())
    }
}

impl Listener<dyn Loggable> for Audit {
    fn handle(&self, _message: &(dyn Loggable + 'static)) -> anyhow::Result<()> {
        Ok(())
    }
}

#[async_trait::async_trait]
impl AsyncListener<Created> for Audit {
    async fn handle(&self, _message: &Created) -> anyhow::Result<()> {
        Ok(())
    }
}

// 无参数：不声明任何能力
#[listener]
struct Bystander;

fn main() {
    let aggregator = EventAggregator::new();
    let audit = Arc::new(Audit);
    let bystander = Arc::new(Bystander);

    aggregator.add_listener(&audit);
    aggregator.add_listener(&bystander);

    assert!(aggregator.has_listener(&audit));
    assert!(!aggregator.has_listener(&bystander));
    assert_eq!(aggregator.subscription_count::<Created>(), 1);
    assert_eq!(aggregator.async_subscription_count::<Created>(), 1);
}
