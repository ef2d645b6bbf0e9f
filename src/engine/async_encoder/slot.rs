//! ### English
//! Encoder ring slot storage.
//!
//! A slot owns its GPU staging buffer and its host output buffer for the whole lifetime of the
//! encoder; only the task metadata changes between frames. Ownership of a slot is never recorded in
//! the slot itself: whoever the cursors say owns the index may touch it, nobody else.
//!
//! ### 中文
//! 编码 ring 的槽位存储。
//!
//! 槽位在编码器整个生命周期内持有自己的 GPU 暂存缓冲与主机输出缓冲；帧与帧之间只有任务元数据变化。
//! 槽位的归属从不记录在槽位本身：游标判定谁拥有该索引，谁才能访问它。

use std::cell::UnsafeCell;

use crate::engine::device::StagingBuffer;
use crate::engine::error::PipelineError;

/// ### English
/// Result state written by the encode thread.
///
/// ### 中文
/// 由编码线程写入的结果状态。
#[derive(Debug)]
pub(super) enum TaskOutcome {
    /// ### English
    /// Slot is free or was just cleared.
    ///
    /// ### 中文
    /// 槽位空闲或刚被清除。
    Empty,
    Queued,
    Encoded {
        size: u64,
    },
    Failed(PipelineError),
}

#[derive(Debug)]
pub(super) struct AsyncTask {
    pub(super) width: u32,
    pub(super) height: u32,
    pub(super) force_iframe: bool,
    pub(super) outcome: TaskOutcome,
}

impl AsyncTask {
    const EMPTY: Self = Self {
        width: 0,
        height: 0,
        force_iframe: false,
        outcome: TaskOutcome::Empty,
    };
}

pub(super) struct SlotData {
    pub(super) staging: StagingBuffer,
    pub(super) output: Box<[u8]>,
    pub(super) task: AsyncTask,
}

pub(super) struct EncodeSlot {
    cell: UnsafeCell<SlotData>,
}

// SAFETY: access to `cell` is partitioned by the ring cursors; at any time exactly one role owns a
// given slot index, and ownership is handed over through Release/Acquire cursor updates.
unsafe impl Sync for EncodeSlot {}

impl EncodeSlot {
    pub(super) fn new(row_bytes: usize, rows: usize, output_len: usize) -> Self {
        Self {
            cell: UnsafeCell::new(SlotData {
                staging: StagingBuffer::new(row_bytes, rows),
                output: vec![0u8; output_len].into_boxed_slice(),
                task: AsyncTask::EMPTY,
            }),
        }
    }

    /// ### English
    /// Shared view of the slot.
    ///
    /// # Safety
    /// The caller's role must own this index according to the cursors, and no `data_mut` borrow of
    /// the same slot may be live.
    ///
    /// ### 中文
    /// 槽位的共享视图。
    ///
    /// # Safety
    /// 调用方角色必须按游标拥有该索引，且同一槽位不能存在活跃的 `data_mut` 借用。
    #[inline]
    pub(super) unsafe fn data(&self) -> &SlotData {
        unsafe { &*self.cell.get() }
    }

    /// ### English
    /// Exclusive view of the slot.
    ///
    /// # Safety
    /// The caller's role must own this index according to the cursors.
    ///
    /// ### 中文
    /// 槽位的独占视图。
    ///
    /// # Safety
    /// 调用方角色必须按游标拥有该索引。
    #[inline]
    #[allow(clippy::mut_from_ref)]
    pub(super) unsafe fn data_mut(&self) -> &mut SlotData {
        unsafe { &mut *self.cell.get() }
    }
}

impl SlotData {
    pub(super) fn reset_task(&mut self) {
        self.task = AsyncTask::EMPTY;
    }
}
