use tracing::trace;

use super::slot::TaskOutcome;
use super::{AsyncTextureEncoder, SlotPhase, TaskState};
use crate::engine::error::{PipelineError, ProtocolViolation};

impl AsyncTextureEncoder {
    /// ### English
    /// Reports the state of task `index`.
    ///
    /// Indices outside `[cleared, pending)` (including `>= capacity`) are `InvalidTaskId`.
    ///
    /// ### 中文
    /// 报告任务 `index` 的状态。
    ///
    /// 不在 `[cleared, pending)` 内的索引（包括 `>= capacity`）返回 `InvalidTaskId`。
    pub fn query(&self, index: usize) -> Result<TaskState, PipelineError> {
        let _client = self.enter_client()?;
        match self.shared.phase(index) {
            SlotPhase::Free => Err(PipelineError::InvalidTaskId(index as u64)),
            SlotPhase::Pending => Ok(TaskState::Pending),
            SlotPhase::Done => {
                // SAFETY: `[cleared, encoded)` belongs to the client role, which we hold.
                let data = unsafe { self.shared.slots[index].data() };
                match &data.task.outcome {
                    TaskOutcome::Encoded { size } => Ok(TaskState::Encoded { size: *size }),
                    TaskOutcome::Failed(err) => Ok(TaskState::Failed(err.clone())),
                    TaskOutcome::Empty | TaskOutcome::Queued => {
                        Err(PipelineError::InvalidTaskId(index as u64))
                    }
                }
            }
        }
    }

    /// ### English
    /// Copies the encoded bytes of task `index` into `out` (replacing its contents) and returns
    /// their length.
    ///
    /// A task that is still pending is a protocol violation; a failed task returns its error.
    ///
    /// ### 中文
    /// 把任务 `index` 的编码字节拷贝到 `out`（替换其原有内容），并返回字节数。
    ///
    /// 仍在等待中的任务属于协议违规；失败的任务返回其错误。
    pub fn acquire_data(&self, index: usize, out: &mut Vec<u8>) -> Result<u64, PipelineError> {
        let _client = self.enter_client()?;
        match self.shared.phase(index) {
            SlotPhase::Free => Err(PipelineError::InvalidTaskId(index as u64)),
            SlotPhase::Pending => Err(ProtocolViolation::NotDone {
                index: index as u64,
            }
            .report()),
            SlotPhase::Done => {
                // SAFETY: `[cleared, encoded)` belongs to the client role, which we hold.
                let data = unsafe { self.shared.slots[index].data() };
                match &data.task.outcome {
                    TaskOutcome::Encoded { size } => {
                        out.clear();
                        out.extend_from_slice(&data.output[..*size as usize]);
                        Ok(*size)
                    }
                    TaskOutcome::Failed(err) => Err(err.clone()),
                    TaskOutcome::Empty | TaskOutcome::Queued => {
                        Err(PipelineError::InvalidTaskId(index as u64))
                    }
                }
            }
        }
    }

    /// ### English
    /// Query, read and clear in one step, under a single hold of the client role.
    ///
    /// Returns `Ok(None)` while task `index` is still pending. Once it is done, its outcome
    /// (byte count, with the bytes copied into `out`, or the task's own error) is returned and
    /// the slot is released. The outer `Err` means nothing changed: the role was busy, the index
    /// is not live, or it is not the oldest task.
    ///
    /// ### 中文
    /// 在一次持有客户端角色期间完成查询、读取与清除。
    ///
    /// 任务 `index` 仍在等待时返回 `Ok(None)`。完成后返回其结果（字节数，字节已拷贝到 `out`；或该任务
    /// 自身的错误），并释放该槽位。外层 `Err` 表示没有任何改变：角色被占用、索引不在有效区间，或它不是
    /// 最早的任务。
    pub fn take_done(
        &self,
        index: usize,
        out: &mut Vec<u8>,
    ) -> Result<Option<Result<u64, PipelineError>>, PipelineError> {
        let _client = self.enter_client()?;
        let shared = &*self.shared;
        match shared.phase(index) {
            SlotPhase::Free => return Err(PipelineError::InvalidTaskId(index as u64)),
            SlotPhase::Pending => return Ok(None),
            SlotPhase::Done => {}
        }
        let cleared = shared.cleared.load_owned();
        if index != cleared {
            return Err(ProtocolViolation::OutOfOrderClear {
                expected: cleared as u64,
                got: index as u64,
            }
            .report());
        }

        // SAFETY: `index == cleared` and the slot is done, so it is in the client's range.
        let data = unsafe { shared.slots[index].data_mut() };
        let outcome = match &data.task.outcome {
            TaskOutcome::Encoded { size } => {
                out.clear();
                out.extend_from_slice(&data.output[..*size as usize]);
                Ok(*size)
            }
            TaskOutcome::Failed(err) => Err(err.clone()),
            TaskOutcome::Empty | TaskOutcome::Queued => {
                return Err(PipelineError::InvalidTaskId(index as u64));
            }
        };
        data.reset_task();
        shared.cleared.advance(shared.capacity);
        trace!(index, "encoder task taken");
        Ok(Some(outcome))
    }

    /// ### English
    /// Releases task `index`. Only the oldest uncleared task may be cleared, and only once it is
    /// done; anything else is rejected as a protocol violation and changes nothing.
    ///
    /// ### 中文
    /// 释放任务 `index`。只能清除最早的未清除任务，且该任务必须已完成；否则视为协议违规并被拒绝，
    /// 不改变任何状态。
    pub fn clear_task(&self, index: usize) -> Result<(), PipelineError> {
        let _client = self.enter_client()?;
        let shared = &*self.shared;

        let cleared = shared.cleared.load_owned();
        if index != cleared {
            return Err(ProtocolViolation::OutOfOrderClear {
                expected: cleared as u64,
                got: index as u64,
            }
            .report());
        }
        if index == shared.encoded.load() {
            return Err(ProtocolViolation::NotDone {
                index: index as u64,
            }
            .report());
        }

        // SAFETY: `index == cleared != encoded`, so the slot is in the client's range.
        unsafe { shared.slots[index].data_mut() }.reset_task();
        shared.cleared.advance(shared.capacity);
        trace!(index, "encoder task cleared");
        Ok(())
    }
}
