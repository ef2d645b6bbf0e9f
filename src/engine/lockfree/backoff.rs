//! ### English
//! Spin-then-yield backoff used by the encode thread before it parks.
//!
//! - Spin briefly: the render thread usually submits the next frame within microseconds.
//! - Yield for a bounded number of steps, then report completion so the caller can `park()`.
//!
//! ### 中文
//! 编码线程在 park 之前使用的“短自旋 + 让出调度”退避。
//!
//! - 先短暂自旋：渲染线程通常会在几微秒内提交下一帧；
//! - 再有限次数地 `yield`，之后报告完成，由调用方 `park()`。

use std::thread;

/// ### English
/// Spin budget before switching to `yield_now()`.
///
/// ### 中文
/// 在切换到 `yield_now()` 之前允许的自旋次数预算。
const SPIN_LIMIT: u32 = 64;

/// ### English
/// Yield budget after spinning; once exhausted the waiter should park.
///
/// ### 中文
/// 自旋结束后的 yield 次数预算；耗尽后等待方应当 park。
const YIELD_LIMIT: u32 = 16;

/// ### English
/// Spin-then-yield backoff state.
///
/// ### 中文
/// “短自旋 + 让出调度”的退避状态。
pub(crate) struct Backoff {
    spins: u32,
}

impl Backoff {
    #[inline]
    pub(crate) fn new() -> Self {
        Self { spins: 0 }
    }

    /// ### English
    /// Performs one backoff step.
    ///
    /// ### 中文
    /// 执行一次退避步骤。
    #[inline]
    pub(crate) fn snooze(&mut self) {
        if self.spins < SPIN_LIMIT {
            std::hint::spin_loop();
        } else {
            thread::yield_now();
        }
        self.spins = self.spins.saturating_add(1);
    }

    /// ### English
    /// Returns `true` once both budgets are spent (time to park instead of snoozing).
    ///
    /// ### 中文
    /// 两段预算都耗尽后返回 `true`（此时应 park，而不是继续 snooze）。
    #[inline]
    pub(crate) fn is_completed(&self) -> bool {
        self.spins >= SPIN_LIMIT + YIELD_LIMIT
    }

    #[inline]
    pub(crate) fn reset(&mut self) {
        self.spins = 0;
    }
}
