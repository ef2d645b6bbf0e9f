//! ### English
//! Identity hasher for handle lookups (handles are already unique small integers).
//!
//! ### 中文
//! 句柄查找使用的恒等哈希（句柄本身就是唯一的小整数）。

use std::collections::HashMap;
use std::hash::{BuildHasherDefault, Hasher};

#[derive(Default)]
pub(super) struct U32IdentityHasher(u64);

impl Hasher for U32IdentityHasher {
    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.0 = (self.0 << 8) | u64::from(byte);
        }
    }

    fn write_u32(&mut self, i: u32) {
        self.0 = u64::from(i);
    }

    fn finish(&self) -> u64 {
        self.0
    }
}

/// ### English
/// `u32 -> V` map without SipHash on the render-thread lookup path.
///
/// ### 中文
/// 渲染线程查找路径上不经过 SipHash 的 `u32 -> V` 映射。
pub(super) type U32HashMap<V> = HashMap<u32, V, BuildHasherDefault<U32IdentityHasher>>;
