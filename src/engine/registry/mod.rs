//! ### English
//! Handle registry: opaque non-zero `u32` handles → shared instances.
//!
//! Lookups come from the caller, the render thread and the FFI error accessors concurrently, so
//! they take the shared side of a `parking_lot::RwLock`; create/destroy take the exclusive side.
//! Removing a handle only drops the registry's reference: anything still holding an `Arc` (an
//! in-flight submission) keeps the instance alive until it lets go.
//!
//! ### 中文
//! 句柄注册表：不透明的非 0 `u32` 句柄 → 共享实例。
//!
//! 调用方、渲染线程与 FFI 错误访问器会并发查找，因此查找使用 `parking_lot::RwLock` 的共享端；
//! 创建/销毁使用独占端。移除句柄只会丢弃注册表自身的引用：仍持有 `Arc` 的一方（在途提交）
//! 会让实例存活到其释放为止。
mod u32_hash;

use std::fmt;
use std::num::NonZeroU32;
use std::sync::Arc;

use parking_lot::RwLock;

use u32_hash::U32HashMap;

/// ### English
/// Opaque instance handle. `0` is never a valid handle; the boundary uses it for "none / global".
///
/// ### 中文
/// 不透明实例句柄。`0` 永远不是有效句柄；边界层用它表示“无 / 全局”。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Handle(NonZeroU32);

impl Handle {
    pub fn new(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

struct Slots<T> {
    map: U32HashMap<Arc<T>>,
    next: u32,
}

pub struct HandleRegistry<T> {
    slots: RwLock<Slots<T>>,
}

impl<T> Default for HandleRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> HandleRegistry<T> {
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(Slots {
                map: U32HashMap::default(),
                next: 1,
            }),
        }
    }

    /// ### English
    /// Registers `value` under the next unused handle. Returns `None` only if all `u32::MAX - 1`
    /// handles are taken.
    ///
    /// ### 中文
    /// 以下一个未使用的句柄注册 `value`。仅当 `u32::MAX - 1` 个句柄全部被占用时返回 `None`。
    pub fn insert(&self, value: Arc<T>) -> Option<Handle> {
        let mut slots = self.slots.write();
        if slots.map.len() >= (u32::MAX - 1) as usize {
            return None;
        }

        let mut candidate = slots.next;
        while candidate == 0 || slots.map.contains_key(&candidate) {
            candidate = candidate.wrapping_add(1);
        }
        slots.next = candidate.wrapping_add(1);
        slots.map.insert(candidate, value);
        Handle::new(candidate)
    }

    /// ### English
    /// Looks up a raw handle. Unknown or zero handles yield `None`.
    ///
    /// ### 中文
    /// 查找原始句柄。未知句柄或 0 返回 `None`。
    pub fn get(&self, raw: u32) -> Option<Arc<T>> {
        self.slots.read_recursive().map.get(&raw).cloned()
    }

    /// ### English
    /// Unregisters a raw handle and returns the registry's reference (idempotent).
    ///
    /// ### 中文
    /// 注销原始句柄并返回注册表持有的引用（幂等）。
    pub fn remove(&self, raw: u32) -> Option<Arc<T>> {
        self.slots.write().map.remove(&raw)
    }

    pub fn len(&self) -> usize {
        self.slots.read_recursive().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
