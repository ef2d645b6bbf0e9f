//! ### English
//! Outer submission queue: bridges "any thread enqueues a texture encode" to "the render thread
//! executes it once per frame".
//!
//! Four cursors partition the ring (capacity `M`, default 20):
//!
//! - `[cleared, done)`: finished; the caller may read the result and must clear in order.
//! - `[done, submitted)`: handed to an async texture encoder, waiting for completion.
//! - `[submitted, pending)`: queued by the caller, not yet seen by the render thread.
//! - everything else: free.
//!
//! The caller writes `pending` and `cleared`; the render thread writes `submitted` and `done` under
//! `poll`. Each entry keeps an `Arc<Instance>`, so destroying a handle never frees an instance that
//! still has work in this ring.
//!
//! ### 中文
//! 外层提交队列：把“任意线程入队纹理编码”桥接到“渲染线程每帧执行”。
//!
//! 四个游标划分 ring（容量 `M`，默认 20）：
//!
//! - `[cleared, done)`：已完成；调用方可读取结果，且必须按顺序清除；
//! - `[done, submitted)`：已交给异步纹理编码器，等待完成；
//! - `[submitted, pending)`：调用方已入队，渲染线程尚未处理；
//! - 其余：空闲。
//!
//! 调用方写 `pending` 与 `cleared`；渲染线程在 `poll` 锁内写 `submitted` 与 `done`。每个条目持有
//! `Arc<Instance>`，因此销毁句柄不会释放仍在本 ring 中有任务的实例。
mod entry;
mod enqueue;
mod poll;
mod query;
mod reset;

pub use entry::EncodeRequest;
pub use poll::PollStats;
pub use query::TaskView;

use std::fmt;
use std::num::NonZeroU32;

use parking_lot::Mutex;

use super::error::{PipelineError, ProtocolViolation};
use super::lockfree::{RingCursor, RoleFlag, RoleGuard, in_range, span_len};
use entry::EntryCell;
use reset::Orphan;

/// ### English
/// Outer task id: slot index + 1, so that `0` stays free as the boundary's "rejected" value.
///
/// ### 中文
/// 外层任务 id：槽位索引 + 1，使 `0` 保留为边界层的“被拒绝”值。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TaskId(NonZeroU32);

impl TaskId {
    pub fn new(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }

    fn from_slot(slot: usize) -> Self {
        // Capacity is validated below `u32::MAX`, so `slot + 1` fits and is non-zero.
        Self(NonZeroU32::MIN.saturating_add(slot as u32))
    }

    fn slot(self) -> usize {
        (self.0.get() - 1) as usize
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EntryPhase {
    Free,
    Pending,
    Done,
}

/// ### English
/// State owned by the render thread between polls.
///
/// ### 中文
/// 渲染线程在两次轮询之间持有的状态。
#[derive(Default)]
struct PollState {
    /// ### English
    /// Encoder tasks whose outer entries were dropped by a reset; drained by later polls.
    ///
    /// ### 中文
    /// 外层条目已被重置丢弃的编码任务；由后续轮询清理。
    orphans: Vec<Orphan>,
}

pub struct SubmissionQueue {
    pending: RingCursor,
    submitted: RingCursor,
    done: RingCursor,
    cleared: RingCursor,
    entries: Box<[EntryCell]>,
    capacity: usize,
    poll: Mutex<PollState>,
    producer: RoleFlag,
    client: RoleFlag,
}

impl SubmissionQueue {
    pub fn new(capacity: usize) -> Result<Self, PipelineError> {
        if capacity < 2 || capacity >= u32::MAX as usize {
            return Err(PipelineError::InvalidArgument(format!(
                "submission ring capacity must be in 2..{}, got {capacity}",
                u32::MAX
            )));
        }
        Ok(Self {
            pending: RingCursor::new(),
            submitted: RingCursor::new(),
            done: RingCursor::new(),
            cleared: RingCursor::new(),
            entries: (0..capacity).map(|_| EntryCell::new()).collect(),
            capacity,
            poll: Mutex::new(PollState::default()),
            producer: RoleFlag::new(),
            client: RoleFlag::new(),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// ### English
    /// Tasks enqueued and not yet cleared.
    ///
    /// ### 中文
    /// 已入队且尚未清除的任务数。
    pub fn in_flight(&self) -> usize {
        span_len(self.cleared.load(), self.pending.load(), self.capacity)
    }

    /// ### English
    /// Encoder tasks left over from a reset that have not been drained yet.
    ///
    /// ### 中文
    /// 重置后遗留、尚未清理的编码任务数。
    pub fn orphan_count(&self) -> usize {
        self.poll.lock().orphans.len()
    }

    /// ### English
    /// Maps a task id to its slot and phase. `done` is loaded before `pending` so the snapshot is
    /// ordered.
    ///
    /// ### 中文
    /// 把任务 id 映射为槽位与阶段。先读 `done` 再读 `pending`，保证快照有序。
    fn phase(&self, task: TaskId) -> (usize, EntryPhase) {
        let slot = task.slot();
        if slot >= self.capacity {
            return (slot, EntryPhase::Free);
        }
        let cleared = self.cleared.load();
        let done = self.done.load();
        let pending = self.pending.load();
        let phase = if in_range(cleared, done, slot) {
            EntryPhase::Done
        } else if in_range(done, pending, slot) {
            EntryPhase::Pending
        } else {
            EntryPhase::Free
        };
        (slot, phase)
    }

    fn enter_producer(&self) -> Result<RoleGuard<'_>, PipelineError> {
        self.producer.try_enter().ok_or_else(|| {
            ProtocolViolation::ConcurrentAccess {
                role: "submission producer",
            }
            .report()
        })
    }

    fn enter_client(&self) -> Result<RoleGuard<'_>, PipelineError> {
        self.client.try_enter().ok_or_else(|| {
            ProtocolViolation::ConcurrentAccess {
                role: "submission client",
            }
            .report()
        })
    }
}
