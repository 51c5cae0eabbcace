//! 订阅者（Subscriber）与能力声明（Capabilities）
//!
//! Rust 没有运行时反射，订阅者类型需要在编译期列出自己实现的全部能力。
//! 通常由 `#[listener(...)]` 宏生成：
//!
//! ```rust
//! use event_aggregator::{Capabilities, Listener, Subscriber};
//!
//! struct Audit;
//!
//! impl Listener<u32> for Audit {
//!     fn handle(&self, _message: &u32) -> anyhow::Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! impl Subscriber for Audit {
//!     fn capabilities(caps: &mut Capabilities<Self>) {
//!         caps.listen::<u32>();
//!     }
//! }
//! ```
//!
use crate::listener::{AsyncListener, Listener};
use crate::registry::SubscriptionRegistry;
use std::any::{TypeId, type_name};
use std::sync::{Arc, Weak};

/// 可被注册到事件聚合器的对象
///
/// 默认实现不声明任何能力：注册这样的对象是静默的空操作。
pub trait Subscriber: Send + Sync + 'static {
    fn capabilities(_caps: &mut Capabilities<Self>)
    where
        Self: Sized,
    {
    }
}

type Attach<L> = fn(&SubscriptionRegistry, &Arc<L>) -> bool;

struct Capability<L> {
    key: TypeId,
    name: &'static str,
    attach: Attach<L>,
}

/// 订阅者 `L` 声明的能力列表
pub struct Capabilities<L> {
    declared: Vec<Capability<L>>,
}

impl<L: Subscriber> Capabilities<L> {
    pub(crate) fn of() -> Self {
        let mut caps = Self {
            declared: Vec::new(),
        };
        L::capabilities(&mut caps);
        caps
    }

    /// 声明同步能力 `Listener<M>`
    pub fn listen<M>(&mut self) -> &mut Self
    where
        M: ?Sized + 'static,
        L: Listener<M>,
    {
        self.declare(
            TypeId::of::<dyn Listener<M>>(),
            type_name::<dyn Listener<M>>(),
            attach_sync::<L, M>,
        )
    }

    /// 声明异步能力 `AsyncListener<M>`
    pub fn listen_async<M>(&mut self) -> &mut Self
    where
        M: ?Sized + Sync + 'static,
        L: AsyncListener<M>,
    {
        self.declare(
            TypeId::of::<dyn AsyncListener<M>>(),
            type_name::<dyn AsyncListener<M>>(),
            attach_async::<L, M>,
        )
    }

    fn declare(&mut self, key: TypeId, name: &'static str, attach: Attach<L>) -> &mut Self {
        if !self.declared.iter().any(|c| c.key == key) {
            self.declared.push(Capability { key, name, attach });
        }
        self
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.declared.len()
    }

    /// 声明的能力名称，按声明顺序
    #[cfg(test)]
    fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.declared.iter().map(|c| c.name)
    }

    /// 逐个能力挂载弱引用；返回 (能力名, 是否新增条目)
    pub(crate) fn attach<'a>(
        &'a self,
        registry: &'a SubscriptionRegistry,
        listener: &'a Arc<L>,
    ) -> impl Iterator<Item = (&'static str, bool)> + 'a {
        self.declared
            .iter()
            .map(move |c| (c.name, (c.attach)(registry, listener)))
    }
}

fn attach_sync<L, M>(registry: &SubscriptionRegistry, listener: &Arc<L>) -> bool
where
    M: ?Sized + 'static,
    L: Listener<M>,
{
    let entry = Arc::downgrade(listener) as Weak<dyn Listener<M>>;
    registry.get_or_create::<dyn Listener<M>>().insert(entry)
}

fn attach_async<L, M>(registry: &SubscriptionRegistry, listener: &Arc<L>) -> bool
where
    M: ?Sized + Sync + 'static,
    L: AsyncListener<M>,
{
    let entry = Arc::downgrade(listener) as Weak<dyn AsyncListener<M>>;
    registry.get_or_create::<dyn AsyncListener<M>>().insert(entry)
}
