use tracing::{trace, warn};

use super::AsyncTextureEncoder;
use super::slot::{AsyncTask, TaskOutcome};
use crate::engine::device::TextureRef;
use crate::engine::error::{PipelineError, RingKind};
use crate::engine::lockfree::next_index;

impl AsyncTextureEncoder {
    /// ### English
    /// Downloads `texture` into the next free slot and hands it to the encode thread.
    ///
    /// The GPU copy completes before this returns, so the caller may reuse the texture at once.
    /// Returns the slot index, which is the task index for [`Self::query`],
    /// [`Self::acquire_data`] and [`Self::clear_task`].
    ///
    /// Fails with `ResourceExhausted` when `N - 1` tasks are already in flight; nothing is
    /// modified in that case.
    ///
    /// ### 中文
    /// 把 `texture` 下载到下一个空闲槽位并交给编码线程。
    ///
    /// 返回前 GPU 拷贝已完成，调用方可以立即复用该纹理。返回值为槽位索引，即
    /// [`Self::query`]、[`Self::acquire_data`]、[`Self::clear_task`] 使用的任务索引。
    ///
    /// 若已有 `N - 1` 个在途任务，返回 `ResourceExhausted`，且不修改任何状态。
    pub fn enqueue(
        &self,
        texture: TextureRef,
        width: u32,
        height: u32,
        force_iframe: bool,
    ) -> Result<usize, PipelineError> {
        let _producer = self.enter_producer()?;
        let shared = &*self.shared;

        if width == 0 || height == 0 || width > shared.width || height > shared.height {
            return Err(PipelineError::InvalidArgument(format!(
                "texture region {width}x{height} does not fit encoder size {}x{}",
                shared.width, shared.height
            )));
        }

        let pending = shared.pending.load_owned();
        if next_index(pending, shared.capacity) == shared.cleared.load() {
            warn!(capacity = shared.capacity, "encoder ring is full");
            return Err(PipelineError::ResourceExhausted {
                ring: RingKind::Encoder,
                capacity: shared.capacity,
            });
        }

        // SAFETY: `pending` is outside `[cleared, pending)`; neither the encode thread nor the
        // client touches it until `pending` advances below.
        let slot = unsafe { shared.slots[pending].data_mut() };
        shared
            .device
            .download(texture, width, height, &mut slot.staging)?;
        slot.task = AsyncTask {
            width,
            height,
            force_iframe,
            outcome: TaskOutcome::Queued,
        };

        shared.pending.advance(shared.capacity);
        trace!(index = pending, texture = texture.id, "texture enqueued");
        self.wake_worker();
        Ok(pending)
    }
}
