use std::ffi::CStr;

use tracing::trace;

use super::entry::EntryState;
use super::{EntryPhase, SubmissionQueue, TaskId};
use crate::engine::async_encoder::TaskState;
use crate::engine::error::{PipelineError, ProtocolViolation};

/// ### English
/// Borrowed view of one outer task, valid inside [`SubmissionQueue::inspect`].
///
/// ### 中文
/// 单个外层任务的借用视图，仅在 [`SubmissionQueue::inspect`] 内有效。
#[derive(Debug)]
pub enum TaskView<'a> {
    Pending,
    Encoded(&'a [u8]),
    Failed {
        error: &'a PipelineError,
        message: Option<&'a CStr>,
    },
}

impl TaskView<'_> {
    pub fn state(&self) -> TaskState {
        match self {
            Self::Pending => TaskState::Pending,
            Self::Encoded(bytes) => TaskState::Encoded {
                size: bytes.len() as u64,
            },
            Self::Failed { error, .. } => TaskState::Failed((*error).clone()),
        }
    }
}

impl SubmissionQueue {
    /// ### English
    /// Runs `f` on the current view of `task` while holding the client role.
    ///
    /// Ids outside `[cleared, pending)` are `InvalidTaskId`. Bytes and message stay where they are
    /// until the task is cleared, so raw pointers taken from them remain valid until then.
    ///
    /// ### 中文
    /// 持有客户端角色时，对 `task` 的当前视图执行 `f`。
    ///
    /// 不在 `[cleared, pending)` 内的 id 返回 `InvalidTaskId`。字节与消息在任务清除之前不会移动，
    /// 因此从中取得的裸指针在此之前一直有效。
    pub fn inspect<R>(
        &self,
        task: TaskId,
        f: impl FnOnce(TaskView<'_>) -> R,
    ) -> Result<R, PipelineError> {
        let _client = self.enter_client()?;
        let (slot, phase) = self.phase(task);
        match phase {
            EntryPhase::Free => Err(PipelineError::InvalidTaskId(u64::from(task.get()))),
            EntryPhase::Pending => Ok(f(TaskView::Pending)),
            EntryPhase::Done => {
                // SAFETY: `[cleared, done)` belongs to the client role, which we hold.
                let entry = unsafe { self.entries[slot].get() };
                let view = match &entry.state {
                    EntryState::Done(Ok(_)) => TaskView::Encoded(&entry.result),
                    EntryState::Done(Err(error)) => TaskView::Failed {
                        error,
                        message: entry.message.as_deref(),
                    },
                    EntryState::Empty | EntryState::Queued | EntryState::Submitted { .. } => {
                        return Err(PipelineError::InvalidTaskId(u64::from(task.get())));
                    }
                };
                Ok(f(view))
            }
        }
    }

    pub fn query(&self, task: TaskId) -> Result<TaskState, PipelineError> {
        self.inspect(task, |view| view.state())
    }

    /// ### English
    /// Copies the encoded bytes of a finished task into `out`.
    ///
    /// ### 中文
    /// 把已完成任务的编码字节拷贝到 `out`。
    pub fn read_output(&self, task: TaskId, out: &mut Vec<u8>) -> Result<u64, PipelineError> {
        self.inspect(task, |view| match view {
            TaskView::Pending => Err(ProtocolViolation::NotDone {
                index: u64::from(task.get()),
            }
            .report()),
            TaskView::Encoded(bytes) => {
                out.clear();
                out.extend_from_slice(bytes);
                Ok(bytes.len() as u64)
            }
            TaskView::Failed { error, .. } => Err(error.clone()),
        })?
    }

    /// ### English
    /// Releases `task`: only the oldest uncleared task may be cleared, and only once it is done.
    /// Drops the entry's instance reference, which may free a destroyed instance.
    ///
    /// ### 中文
    /// 释放 `task`：只能清除最早的未清除任务，且该任务必须已完成。会丢弃条目持有的实例引用，
    /// 可能因此释放一个已销毁的实例。
    pub fn clear_task(&self, task: TaskId) -> Result<(), PipelineError> {
        let _client = self.enter_client()?;

        let slot = task.slot();
        let cleared = self.cleared.load_owned();
        if slot != cleared {
            return Err(ProtocolViolation::OutOfOrderClear {
                expected: TaskId::from_slot(cleared).get().into(),
                got: task.get().into(),
            }
            .report());
        }
        if slot == self.done.load() {
            return Err(ProtocolViolation::NotDone {
                index: task.get().into(),
            }
            .report());
        }

        // SAFETY: `slot == cleared != done`, so the entry is in the client's range.
        let instance = unsafe { self.entries[slot].get_mut() }.instance.take();
        unsafe { self.entries[slot].get_mut() }.reset();
        self.cleared.advance(self.capacity);
        trace!(%task, "submission cleared");

        // Dropped after the slot is released: this may join an encode thread.
        drop(instance);
        Ok(())
    }
}
