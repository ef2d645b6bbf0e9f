//! ### English
//! Monotonic ring cursors and circular range containment.
//!
//! A ring of capacity `N` is described by a handful of cursors that only ever move forward
//! (mod `N`). The phase of a slot is never stored as a flag the other side has to synchronize on;
//! it is derived from which half-open interval `[start, end)` between two cursors the slot's index
//! falls into. Each cursor has exactly one writer, so advancing is a plain `Release` store and
//! observing is an `Acquire` load.
//!
//! ### 中文
//! 单调 ring 游标与环形区间包含判断。
//!
//! 容量为 `N` 的 ring 由若干只前进（模 `N`）的游标描述。槽位所处阶段不会存成需要对端同步的
//! 标记，而是由其索引落在两个游标之间哪个半开区间 `[start, end)` 推导得出。每个游标只有一个
//! 写者，因此推进是一次 `Release` store，观察是一次 `Acquire` load。

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::engine::cache::pad_after;

/// ### English
/// Returns `true` iff `index` lies in the circular half-open interval `[start, end)`.
///
/// `start == end` denotes the empty interval. Callers must already have checked `index < capacity`.
///
/// ### 中文
/// 当且仅当 `index` 位于环形半开区间 `[start, end)` 内时返回 `true`。
///
/// `start == end` 表示空区间。调用方需事先确认 `index < capacity`。
#[inline]
pub(crate) fn in_range(start: usize, end: usize, index: usize) -> bool {
    if start <= end {
        start <= index && index < end
    } else {
        index >= start || index < end
    }
}

/// ### English
/// Next slot index after `index` in a ring of `capacity` slots.
///
/// ### 中文
/// 容量为 `capacity` 的 ring 中 `index` 的下一个槽位索引。
#[inline]
pub(crate) fn next_index(index: usize, capacity: usize) -> usize {
    (index + 1) % capacity
}

/// ### English
/// Number of slots in `[start, end)`.
///
/// ### 中文
/// `[start, end)` 区间内的槽位数量。
#[inline]
pub(crate) fn span_len(start: usize, end: usize, capacity: usize) -> usize {
    (end + capacity - start) % capacity
}

/// ### English
/// One ring pointer, padded to its own cache line.
///
/// ### 中文
/// 单个 ring 指针，独占一个 cache line。
#[repr(C, align(64))]
pub(crate) struct RingCursor {
    value: AtomicUsize,
    _pad: [u8; pad_after::<AtomicUsize>()],
}

impl RingCursor {
    pub(crate) fn new() -> Self {
        Self {
            value: AtomicUsize::new(0),
            _pad: [0; pad_after::<AtomicUsize>()],
        }
    }

    /// ### English
    /// Loads the cursor with Acquire ordering: every slot write published before the matching
    /// [`Self::advance`] is visible afterwards.
    ///
    /// ### 中文
    /// 以 Acquire 顺序读取游标：对应 [`Self::advance`] 之前发布的槽位写入此后均可见。
    #[inline]
    pub(crate) fn load(&self) -> usize {
        self.value.load(Ordering::Acquire)
    }

    /// ### English
    /// Loads the cursor with Relaxed ordering (only valid for the cursor's own writer).
    ///
    /// ### 中文
    /// 以 Relaxed 顺序读取游标（仅限该游标自己的写者使用）。
    #[inline]
    pub(crate) fn load_owned(&self) -> usize {
        self.value.load(Ordering::Relaxed)
    }

    /// ### English
    /// Advances the cursor by one slot with Release ordering and returns the previous position.
    ///
    /// Must only be called by the cursor's single writer.
    ///
    /// ### 中文
    /// 以 Release 顺序把游标推进一个槽位，并返回推进前的位置。
    ///
    /// 只能由该游标唯一的写者调用。
    #[inline]
    pub(crate) fn advance(&self, capacity: usize) -> usize {
        let current = self.value.load(Ordering::Relaxed);
        self.value
            .store(next_index(current, capacity), Ordering::Release);
        current
    }

    /// ### English
    /// Rewinds the cursor to slot 0 (queue reset only; all roles must be quiescent).
    ///
    /// ### 中文
    /// 把游标回绕到槽位 0（仅用于队列重置；所有角色必须处于静止状态）。
    #[inline]
    pub(crate) fn rewind(&self) {
        self.value.store(0, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_without_wrap() {
        assert!(in_range(1, 3, 1));
        assert!(in_range(1, 3, 2));
        assert!(!in_range(1, 3, 3));
        assert!(!in_range(1, 3, 0));
    }

    #[test]
    fn range_with_wrap() {
        // capacity 5: [3, 1) = {3, 4, 0}
        assert!(in_range(3, 1, 3));
        assert!(in_range(3, 1, 4));
        assert!(in_range(3, 1, 0));
        assert!(!in_range(3, 1, 1));
        assert!(!in_range(3, 1, 2));
    }

    #[test]
    fn empty_range_contains_nothing() {
        for i in 0..4 {
            assert!(!in_range(2, 2, i));
        }
    }

    #[test]
    fn span_len_wraps() {
        assert_eq!(span_len(0, 0, 3), 0);
        assert_eq!(span_len(1, 0, 3), 2);
        assert_eq!(span_len(2, 1, 3), 2);
        assert_eq!(span_len(0, 2, 3), 2);
    }

    #[test]
    fn cursor_advances_mod_capacity() {
        let cursor = RingCursor::new();
        assert_eq!(cursor.advance(3), 0);
        assert_eq!(cursor.advance(3), 1);
        assert_eq!(cursor.advance(3), 2);
        assert_eq!(cursor.load(), 0);
        cursor.advance(3);
        cursor.rewind();
        assert_eq!(cursor.load_owned(), 0);
    }
}
