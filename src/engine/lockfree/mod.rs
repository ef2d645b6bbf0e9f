//! ### English
//! Lock-free primitives shared by the encoder ring and the submission ring.
//!
//! ### 中文
//! 编码 ring 与提交 ring 共用的无锁原语。
mod backoff;
mod ring;
mod role;

pub(crate) use backoff::Backoff;
pub(crate) use ring::{RingCursor, in_range, next_index, span_len};
pub(crate) use role::{RoleFlag, RoleGuard};
