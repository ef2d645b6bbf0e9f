//! ### English
//! Queue reset and orphan draining.
//!
//! A reset forgets every outer entry at once. Entries already handed to an encoder still occupy a
//! slot in that encoder's ring; they become orphans that later polls wait for and clear, oldest
//! first per encoder, so encoder rings never lose capacity.
//!
//! ### 中文
//! 队列重置与孤儿任务清理。
//!
//! 重置会一次性丢弃所有外层条目。已交给编码器的条目仍占用该编码器 ring 的槽位；它们成为孤儿任务，
//! 由后续轮询等待并清除（每个编码器内按从旧到新），因此编码 ring 永远不会丢失容量。

use std::sync::Arc;

use tracing::{debug, warn};

use super::SubmissionQueue;
use super::entry::EntryState;
use crate::engine::error::{PipelineError, ProtocolViolation};
use crate::engine::instance::Instance;
use crate::engine::lockfree::{in_range, next_index};

pub(super) struct Orphan {
    pub(super) instance: Arc<Instance>,
    pub(super) encoder_task: usize,
}

impl SubmissionQueue {
    /// ### English
    /// Drops every outer entry and rewinds all four cursors. Takes the poll lock and both caller
    /// roles, so it never overlaps a poll, an enqueue or a clear. Returns how many uncleared tasks
    /// were dropped.
    ///
    /// ### 中文
    /// 丢弃所有外层条目并把四个游标全部回绕。会获取轮询锁与两个调用方角色，因此不会与轮询、入队或
    /// 清除重叠。返回被丢弃的未清除任务数。
    pub fn reset(&self) -> Result<usize, PipelineError> {
        let _producer = self.enter_producer()?;
        let _client = self.enter_client()?;
        let mut state = self.poll.lock();

        let cleared = self.cleared.load_owned();
        let done = self.done.load_owned();
        let submitted = self.submitted.load_owned();
        let pending = self.pending.load_owned();

        let mut dropped = 0;
        let mut slot = cleared;
        while slot != pending {
            // SAFETY: every role is held or quiescent.
            let entry = unsafe { self.entries[slot].get_mut() };
            if in_range(done, submitted, slot) {
                if let (EntryState::Submitted { encoder_task }, Some(instance)) =
                    (&entry.state, entry.instance.take())
                {
                    state.orphans.push(Orphan {
                        instance,
                        encoder_task: *encoder_task,
                    });
                }
            }
            entry.reset();
            dropped += 1;
            slot = next_index(slot, self.capacity);
        }

        self.pending.rewind();
        self.submitted.rewind();
        self.done.rewind();
        self.cleared.rewind();

        debug!(dropped, orphans = state.orphans.len(), "submission queue reset");
        Ok(dropped)
    }
}

/// ### English
/// Clears every orphan whose encoder task has finished. An orphan still encoding blocks the later
/// orphans of the same encoder.
///
/// ### 中文
/// 清除所有编码任务已结束的孤儿。仍在编码的孤儿会阻塞同一编码器后续的孤儿。
pub(super) fn drain_orphans(orphans: &mut Vec<Orphan>) {
    let mut blocked: Vec<*const Instance> = Vec::new();
    let mut discard = Vec::new();
    orphans.retain(|orphan| {
        let key = Arc::as_ptr(&orphan.instance);
        if blocked.contains(&key) {
            return true;
        }
        let Some(encoder) = orphan.instance.as_async_texture_encoder() else {
            return false;
        };
        match encoder.take_done(orphan.encoder_task, &mut discard) {
            Ok(None)
            | Err(PipelineError::Protocol(ProtocolViolation::ConcurrentAccess { .. })) => {
                blocked.push(key);
                true
            }
            Ok(Some(_)) => false,
            Err(err) => {
                warn!(encoder_task = orphan.encoder_task, error = %err, "orphan dropped");
                false
            }
        }
    });
}
