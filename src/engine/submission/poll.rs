//! ### English
//! Render-thread poll step.
//!
//! Called once per frame. Order inside one poll:
//!
//! 1. drain orphans left by a reset;
//! 2. submit phase: `[submitted, pending)` → encoder rings;
//! 3. completion phase: advance `done` over finished entries, stopping at the first one that is
//!    still encoding, so completion is reported strictly in submission order.
//!
//! ### 中文
//! 渲染线程轮询步骤。
//!
//! 每帧调用一次。一次轮询内部顺序：
//!
//! 1. 清理重置遗留的孤儿任务；
//! 2. 提交阶段：`[submitted, pending)` → 编码 ring；
//! 3. 完成阶段：推进 `done` 越过已完成条目，遇到第一个仍在编码的条目即停止，保证完成严格按提交顺序报告。

use std::sync::Arc;

use tracing::trace;

use super::reset::drain_orphans;
use super::{PollState, SubmissionQueue};
use crate::engine::instance::Instance;

/// ### English
/// What one poll did.
///
/// ### 中文
/// 一次轮询的处理结果。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PollStats {
    pub submitted: usize,
    pub completed: usize,
    pub orphans_remaining: usize,
}

impl SubmissionQueue {
    pub fn poll(&self) -> PollStats {
        let mut state = self.poll.lock();
        let mut stats = PollStats::default();

        drain_orphans(&mut state.orphans);

        let pending = self.pending.load();
        loop {
            let submitted = self.submitted.load_owned();
            if submitted == pending {
                break;
            }
            // SAFETY: `[submitted, pending)` belongs to the render thread, serialized by `poll`.
            unsafe { self.entries[submitted].get_mut() }.submit(submitted);
            self.submitted.advance(self.capacity);
            stats.submitted += 1;
        }

        loop {
            let done = self.done.load_owned();
            if done == self.submitted.load_owned() {
                break;
            }
            // SAFETY: `[done, submitted)` belongs to the render thread, serialized by `poll`.
            let entry = unsafe { self.entries[done].get_mut() };
            if waits_on_orphan(&state, entry.instance.as_ref()) || !entry.try_complete(done) {
                break;
            }
            self.done.advance(self.capacity);
            stats.completed += 1;
        }

        stats.orphans_remaining = state.orphans.len();
        if stats.submitted != 0 || stats.completed != 0 {
            trace!(
                submitted = stats.submitted,
                completed = stats.completed,
                orphans = stats.orphans_remaining,
                "render thread poll"
            );
        }
        stats
    }
}

/// ### English
/// An encoder with orphaned tasks must clear those first: its ring only accepts in-order clears.
///
/// ### 中文
/// 仍有孤儿任务的编码器必须先清除它们：其 ring 只接受按顺序清除。
fn waits_on_orphan(state: &PollState, instance: Option<&Arc<Instance>>) -> bool {
    let Some(instance) = instance else {
        return false;
    };
    state
        .orphans
        .iter()
        .any(|orphan| Arc::ptr_eq(&orphan.instance, instance))
}
