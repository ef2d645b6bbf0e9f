use std::sync::Arc;

use tracing::{trace, warn};

use super::entry::EncodeRequest;
use super::{SubmissionQueue, TaskId};
use crate::engine::error::{PipelineError, RingKind};
use crate::engine::instance::Instance;
use crate::engine::lockfree::next_index;

impl SubmissionQueue {
    /// ### English
    /// Queues `request` for `instance`; the render thread submits it on its next poll.
    ///
    /// The entry holds `instance` until the task is cleared. Fails with `ResourceExhausted` when
    /// `M - 1` tasks are uncleared; nothing is modified in that case.
    ///
    /// ### 中文
    /// 为 `instance` 排队 `request`；渲染线程会在下一次轮询时提交它。
    ///
    /// 条目会持有 `instance` 直到任务被清除。若已有 `M - 1` 个未清除任务，返回
    /// `ResourceExhausted`，且不修改任何状态。
    pub fn enqueue(
        &self,
        instance: Arc<Instance>,
        request: EncodeRequest,
    ) -> Result<TaskId, PipelineError> {
        let _producer = self.enter_producer()?;

        let pending = self.pending.load_owned();
        if next_index(pending, self.capacity) == self.cleared.load() {
            warn!(capacity = self.capacity, "submission ring is full");
            return Err(PipelineError::ResourceExhausted {
                ring: RingKind::Submission,
                capacity: self.capacity,
            });
        }

        // SAFETY: `pending` is free; the render thread only reads up to `pending` and the client
        // only up to `done`.
        unsafe { self.entries[pending].get_mut() }.load(instance, request);
        self.pending.advance(self.capacity);

        let task = TaskId::from_slot(pending);
        trace!(%task, texture = request.texture.id, "submission enqueued");
        Ok(task)
    }
}
