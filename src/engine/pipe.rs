//! ### English
//! `FramePipe`: one pipeline = one handle registry + one submission queue + shared collaborators.
//!
//! This is the safe Rust API; the C ABI in `ffi` is a thin layer over one process-wide instance.
//!
//! ### 中文
//! `FramePipe`：一条管线 = 一个句柄注册表 + 一个提交队列 + 共享的外部协作者。
//!
//! 这是安全的 Rust API；`ffi` 中的 C ABI 只是覆盖在一个进程级实例之上的薄层。

use std::sync::Arc;

use tracing::debug;

use super::async_encoder::{AsyncTextureEncoder, TaskState};
use super::codec::{CodecBackend, FrameRef};
use super::config::{DecoderParams, EncoderParams, PipelineConfig};
use super::device::{TextureDevice, TextureRef};
use super::error::{InstanceRole, PipelineError};
use super::instance::{Instance, PlainDecoder, PlainEncoder};
use super::registry::{Handle, HandleRegistry};
use super::submission::{EncodeRequest, PollStats, SubmissionQueue, TaskId, TaskView};

pub struct FramePipe {
    config: PipelineConfig,
    backend: Arc<dyn CodecBackend>,
    device: Arc<dyn TextureDevice>,
    registry: HandleRegistry<Instance>,
    submissions: SubmissionQueue,
}

impl FramePipe {
    pub fn new(
        config: PipelineConfig,
        backend: Arc<dyn CodecBackend>,
        device: Arc<dyn TextureDevice>,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            config,
            backend,
            device,
            registry: HandleRegistry::new(),
            submissions: SubmissionQueue::new(config.submission_ring_capacity)?,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn device(&self) -> &Arc<dyn TextureDevice> {
        &self.device
    }

    pub fn submissions(&self) -> &SubmissionQueue {
        &self.submissions
    }

    pub fn instance_count(&self) -> usize {
        self.registry.len()
    }

    pub fn create_encoder(&self, params: EncoderParams) -> Result<Handle, PipelineError> {
        let instance = Instance::encoder(self.backend.as_ref(), params)?;
        self.register(instance)
    }

    pub fn create_decoder(&self, params: DecoderParams) -> Result<Handle, PipelineError> {
        let instance = Instance::decoder(self.backend.as_ref(), params)?;
        self.register(instance)
    }

    /// ### English
    /// Creates an async texture encoder with `encoder_ring_capacity` slots and its encode thread.
    ///
    /// ### 中文
    /// 创建带 `encoder_ring_capacity` 个槽位及编码线程的异步纹理编码器。
    pub fn create_async_texture_encoder(
        &self,
        params: EncoderParams,
    ) -> Result<Handle, PipelineError> {
        let instance = Instance::async_texture_encoder(
            self.backend.as_ref(),
            params,
            self.config.encoder_ring_capacity,
            self.device.clone(),
        )?;
        self.register(instance)
    }

    fn register(&self, instance: Instance) -> Result<Handle, PipelineError> {
        let role = instance.role();
        let handle = self
            .registry
            .insert(Arc::new(instance))
            .ok_or_else(|| PipelineError::InvalidArgument("no free instance handles".to_string()))?;
        debug!(%handle, ?role, "instance created");
        Ok(handle)
    }

    /// ### English
    /// Unregisters `handle`. Idempotent. Tasks still in the submission queue keep the instance alive
    /// until they are cleared; returns whether the handle was registered.
    ///
    /// ### 中文
    /// 注销 `handle`，幂等。提交队列中仍有任务时，实例会存活到这些任务被清除；返回该句柄此前是否已注册。
    pub fn destroy(&self, handle: Handle) -> bool {
        let Some(instance) = self.registry.remove(handle.get()) else {
            return false;
        };
        debug!(
            %handle,
            in_flight_refs = Arc::strong_count(&instance) - 1,
            "instance destroyed"
        );
        true
    }

    pub fn instance(&self, handle: Handle) -> Result<Arc<Instance>, PipelineError> {
        self.registry
            .get(handle.get())
            .ok_or(PipelineError::InvalidHandle(handle.get()))
    }

    fn with_encoder<R>(
        &self,
        handle: Handle,
        f: impl FnOnce(&PlainEncoder) -> Result<R, PipelineError>,
    ) -> Result<R, PipelineError> {
        let instance = self.instance(handle)?;
        let encoder = instance
            .as_encoder()
            .ok_or(PipelineError::WrongInstanceKind {
                handle: handle.get(),
                expected: InstanceRole::Encoder,
            })?;
        f(encoder)
    }

    fn with_decoder<R>(
        &self,
        handle: Handle,
        f: impl FnOnce(&PlainDecoder) -> Result<R, PipelineError>,
    ) -> Result<R, PipelineError> {
        let instance = self.instance(handle)?;
        let decoder = instance
            .as_decoder()
            .ok_or(PipelineError::WrongInstanceKind {
                handle: handle.get(),
                expected: InstanceRole::Decoder,
            })?;
        f(decoder)
    }

    /// ### English
    /// Runs `f` on the async texture encoder behind `handle`.
    ///
    /// ### 中文
    /// 对 `handle` 背后的异步纹理编码器执行 `f`。
    pub fn with_async_texture_encoder<R>(
        &self,
        handle: Handle,
        f: impl FnOnce(&AsyncTextureEncoder) -> R,
    ) -> Result<R, PipelineError> {
        let instance = self.instance(handle)?;
        let encoder =
            instance
                .as_async_texture_encoder()
                .ok_or(PipelineError::WrongInstanceKind {
                    handle: handle.get(),
                    expected: InstanceRole::AsyncTextureEncoder,
                })?;
        Ok(f(encoder))
    }

    pub fn set_bitrate(
        &self,
        handle: Handle,
        bitrate: u64,
        target_fps: u32,
    ) -> Result<(), PipelineError> {
        self.with_encoder(handle, |encoder| encoder.set_bitrate(bitrate, target_fps))
    }

    pub fn encode(
        &self,
        handle: Handle,
        frame: FrameRef<'_>,
        dst: &mut [u8],
        force_iframe: bool,
    ) -> Result<u64, PipelineError> {
        self.with_encoder(handle, |encoder| encoder.encode(frame, dst, force_iframe))
    }

    pub fn encode_texture(
        &self,
        handle: Handle,
        texture: TextureRef,
        width: u32,
        height: u32,
        dst: &mut [u8],
        force_iframe: bool,
    ) -> Result<u64, PipelineError> {
        self.with_encoder(handle, |encoder| {
            encoder.encode_texture(
                self.device.as_ref(),
                texture,
                width,
                height,
                dst,
                force_iframe,
            )
        })
    }

    pub fn decode(
        &self,
        handle: Handle,
        src: &[u8],
        dst: &mut [u8],
        width: u32,
        height: u32,
    ) -> Result<u64, PipelineError> {
        self.with_decoder(handle, |decoder| decoder.decode(src, dst, width, height))
    }

    pub fn decode_texture(
        &self,
        handle: Handle,
        src: &[u8],
        texture: TextureRef,
        width: u32,
        height: u32,
    ) -> Result<u64, PipelineError> {
        self.with_decoder(handle, |decoder| {
            decoder.decode_texture(self.device.as_ref(), src, texture, width, height)
        })
    }

    /// ### English
    /// Queues a texture encode on the async texture encoder behind `handle`. The GPU copy happens
    /// on the next [`Self::poll_render_thread`], not here.
    ///
    /// ### 中文
    /// 在 `handle` 背后的异步纹理编码器上排队一次纹理编码。GPU 拷贝发生在下一次
    /// [`Self::poll_render_thread`] 中，而不是这里。
    pub fn enqueue_texture_encode(
        &self,
        handle: Handle,
        request: EncodeRequest,
    ) -> Result<TaskId, PipelineError> {
        let instance = self.instance(handle)?;
        if instance.as_async_texture_encoder().is_none() {
            return Err(PipelineError::WrongInstanceKind {
                handle: handle.get(),
                expected: InstanceRole::AsyncTextureEncoder,
            });
        }
        self.submissions.enqueue(instance, request)
    }

    /// ### English
    /// Render-thread step; call once per rendered frame with the graphics context current.
    ///
    /// ### 中文
    /// 渲染线程步骤；在图形上下文为当前上下文时，每渲染一帧调用一次。
    pub fn poll_render_thread(&self) -> PollStats {
        self.submissions.poll()
    }

    pub fn query_task(&self, task: TaskId) -> Result<TaskState, PipelineError> {
        self.submissions.query(task)
    }

    pub fn inspect_task<R>(
        &self,
        task: TaskId,
        f: impl FnOnce(TaskView<'_>) -> R,
    ) -> Result<R, PipelineError> {
        self.submissions.inspect(task, f)
    }

    pub fn read_task_output(&self, task: TaskId, out: &mut Vec<u8>) -> Result<u64, PipelineError> {
        self.submissions.read_output(task, out)
    }

    pub fn clear_task(&self, task: TaskId) -> Result<(), PipelineError> {
        self.submissions.clear_task(task)
    }

    pub fn reset_encode_tasks(&self) -> Result<usize, PipelineError> {
        self.submissions.reset()
    }
}
