//! ### English
//! Cache-line padding for the ring cursors.
//!
//! Each ring pointer is advanced by exactly one role; keeping them on separate cache lines stops the
//! encode thread's `encoded` stores from invalidating the line the render thread polls `pending` on.
//!
//! ### 中文
//! ring 游标使用的 cache line padding。
//!
//! 每个 ring 指针只由一个角色推进；让它们分处不同 cache line，可避免编码线程写 `encoded`
//! 时使渲染线程轮询 `pending` 所在的缓存行失效。

/// ### English
/// The cache line size we optimize for (bytes).
///
/// ### 中文
/// 作为优化目标的 cache line 大小（字节）。
pub(crate) const CACHE_LINE_BYTES: usize = 64;

/// ### English
/// Returns the padding bytes needed after a single field of type `T` to reach the next cache line.
///
/// ### 中文
/// 返回在单个 `T` 字段之后推进到下一个 cache line 所需的 padding 字节数。
#[inline]
pub(crate) const fn pad_after<T>() -> usize {
    let rem = std::mem::size_of::<T>() % CACHE_LINE_BYTES;
    if rem == 0 { 0 } else { CACHE_LINE_BYTES - rem }
}
