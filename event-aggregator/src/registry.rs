//! 订阅注册表（SubscriptionRegistry）
//!
//! 以“能力类型”的 `TypeId` 为键（例如 `dyn Listener<OrderPlaced>`），
//! 值为按插入顺序排列的弱引用集合 [`Topic`]：
//! - 键集合由 `DashMap` 承载，首次并发访问同一键时只有一个胜出者发布集合；
//! - 每个集合的结构性修改（去重插入、移除失效项）都在互斥锁内完成；
//! - 处理器调用永远发生在锁外，`snapshot` 只复制弱引用。
//!
//! 身份比较使用共享分配的地址：只要还有任何 `Weak` 指向该分配，
//! 其地址就不会被新的对象复用，因此失效条目不可能与新的存活对象混淆。
//!
use dashmap::DashMap;
use parking_lot::Mutex;
use std::any::{Any, TypeId, type_name};
use std::sync::{Arc, Weak};

/// 取共享分配的地址作为对象身份（忽略 trait object 元数据）
pub(crate) fn identity<T: ?Sized>(ptr: *const T) -> usize {
    ptr.cast::<()>() as usize
}

/// 类型擦除后的集合视图，供不依赖具体能力类型的操作使用
pub(crate) trait Slot: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    fn len(&self) -> usize;

    /// 是否存在指向 `target` 且仍存活的条目
    fn holds_live(&self, target: usize) -> bool;

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// 某一能力下的弱引用集合
pub(crate) struct Topic<T: ?Sized> {
    name: &'static str,
    entries: Mutex<Vec<Weak<T>>>,
}

impl<T: ?Sized + Send + Sync + 'static> Topic<T> {
    fn new() -> Self {
        Self {
            name: type_name::<T>(),
            entries: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn name(&self) -> &'static str {
        self.name
    }

    /// 去重插入：同一身份已存在时不做任何事，返回 `false`
    pub(crate) fn insert(&self, entry: Weak<T>) -> bool {
        let id = identity(entry.as_ptr());
        let mut entries = self.entries.lock();

        if entries.iter().any(|e| identity(e.as_ptr()) == id) {
            return false;
        }

        entries.push(entry);
        true
    }

    /// 当前条目的快照（只复制弱引用，不延长订阅者生命周期）
    pub(crate) fn snapshot(&self) -> Vec<Weak<T>> {
        self.entries.lock().clone()
    }

    /// 将快照拆分为存活订阅者的强引用与已失效条目的身份
    pub(crate) fn partition(&self) -> (Vec<Arc<T>>, Vec<usize>) {
        let mut live = Vec::new();
        let mut expired = Vec::new();

        for entry in self.snapshot() {
            match entry.upgrade() {
                Some(target) => live.push(target),
                None => expired.push(identity(entry.as_ptr())),
            }
        }

        (live, expired)
    }

    /// 移除分发过程中记录下的失效条目，返回实际移除的数量
    pub(crate) fn evict(&self, expired: &[usize]) -> usize {
        if expired.is_empty() {
            return 0;
        }

        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|e| !(e.strong_count() == 0 && expired.contains(&identity(e.as_ptr()))));
        before - entries.len()
    }
}

impl<T: ?Sized + Send + Sync + 'static> Slot for Topic<T> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }

    fn holds_live(&self, target: usize) -> bool {
        self.entries
            .lock()
            .iter()
            .any(|e| identity(e.as_ptr()) == target && e.strong_count() > 0)
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// 能力类型 -> 弱引用集合
#[derive(Default)]
pub(crate) struct SubscriptionRegistry {
    topics: DashMap<TypeId, Arc<dyn Slot>>,
}

impl SubscriptionRegistry {
    /// 获取（必要时创建）能力 `T` 的集合
    ///
    /// 并发首次访问时由 `DashMap::entry` 保证只有一个集合被发布，
    /// 其余调用方拿到的是胜出者的集合。
    pub(crate) fn get_or_create<T: ?Sized + Send + Sync + 'static>(&self) -> Arc<Topic<T>> {
        let slot = self
            .topics
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Arc::new(Topic::<T>::new()) as Arc<dyn Slot>)
            .value()
            .clone();

        match slot.into_any().downcast::<Topic<T>>() {
            Ok(topic) => topic,
            // 键与集合由同一泛型 T 推导，永远不会走到这里
            Err(_) => unreachable!("capability key {} bound to a foreign topic", type_name::<T>()),
        }
    }

    /// 能力 `T` 当前存储的条目数（含尚未被清理的失效条目），不会创建新键
    pub(crate) fn len_of<T: ?Sized + 'static>(&self) -> usize {
        self.topics
            .get(&TypeId::of::<T>())
            .map(|slot| slot.len())
            .unwrap_or(0)
    }

    /// 是否有任一能力持有指向 `target` 的存活条目
    pub(crate) fn holds_live(&self, target: usize) -> bool {
        let slots: Vec<Arc<dyn Slot>> = self.topics.iter().map(|e| e.value().clone()).collect();
        slots.iter().any(|slot| slot.holds_live(target))
    }

    /// 已创建的能力键名称（含空集合）
    pub(crate) fn capabilities(&self) -> Vec<&'static str> {
        self.topics.iter().map(|e| e.value().name()).collect()
    }
}
