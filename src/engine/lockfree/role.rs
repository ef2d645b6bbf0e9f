//! ### English
//! Single-entrant role token.
//!
//! Ring cursors are sound only while each role (producer, consumer, client) is played by one
//! thread at a time. Instead of a lock, a role is claimed with one CAS; a concurrent second entrant
//! is a contract violation and gets `None` immediately instead of waiting.
//!
//! ### 中文
//! 单进入者角色令牌。
//!
//! ring 游标只有在每个角色（生产者、消费者、客户端）同一时刻只由一个线程扮演时才是安全的。
//! 这里不用锁，而是用一次 CAS 占有角色；并发的第二个进入者属于违约，会立即得到 `None` 而不是等待。

use std::sync::atomic::{AtomicBool, Ordering};

pub(crate) struct RoleFlag {
    busy: AtomicBool,
}

/// ### English
/// Proof that the current thread holds a role; released on drop.
///
/// ### 中文
/// 当前线程持有某个角色的凭证；drop 时释放。
pub(crate) struct RoleGuard<'a> {
    busy: &'a AtomicBool,
}

impl RoleFlag {
    pub(crate) const fn new() -> Self {
        Self {
            busy: AtomicBool::new(false),
        }
    }

    /// ### English
    /// Claims the role. Acquire pairs with the previous holder's Release so that everything it
    /// wrote is visible to the new holder, even on another thread.
    ///
    /// ### 中文
    /// 占有角色。Acquire 与上一持有者的 Release 配对，保证其写入对新持有者可见（即使位于其它线程）。
    #[inline]
    pub(crate) fn try_enter(&self) -> Option<RoleGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| RoleGuard { busy: &self.busy })
    }
}

impl Drop for RoleGuard<'_> {
    #[inline]
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}
