//! 观察者注册表。

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// 订阅句柄。注册时单调分配，是移除观察者的唯一凭据。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

struct RegistryInner<T: ?Sized> {
    next_id: u64,
    entries: BTreeMap<u64, Arc<T>>,
}

/// 按句柄有序保存的观察者注册表。
///
/// 通知按注册顺序进行；移除是幂等的，注销未注册的句柄是无操作。
pub struct ObserverRegistry<T: ?Sized> {
    inner: Mutex<RegistryInner<T>>,
}

impl<T: ?Sized> ObserverRegistry<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RegistryInner {
                next_id: 0,
                entries: BTreeMap::new(),
            }),
        }
    }

    /// 注册一个观察者，返回其订阅句柄。
    pub fn subscribe(&self, observer: Arc<T>) -> SubscriptionId {
        let mut inner = self.locked();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.entries.insert(id, observer);
        SubscriptionId(id)
    }

    /// 注销一个观察者。句柄未注册时返回 false。
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.locked().entries.remove(&id.0).is_some()
    }

    /// 清空全部观察者。
    pub fn clear(&self) {
        self.locked().entries.clear();
    }

    pub fn len(&self) -> usize {
        self.locked().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locked().entries.is_empty()
    }

    /// 对每个观察者执行一次回调。先快照后通知，回调内可安全增删订阅。
    pub fn notify_each(&self, mut f: impl FnMut(&T)) {
        let snapshot: Vec<Arc<T>> = self.locked().entries.values().cloned().collect();
        for observer in snapshot {
            f(&observer);
        }
    }

    fn locked(&self) -> MutexGuard<'_, RegistryInner<T>> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
