/// ### English
/// `frame_pipe` crate root.
/// Exposes the C ABI via `ffi`; the pipeline itself lives under `engine` and is usable directly from
/// Rust through the re-exports below.
///
/// ### 中文
/// `frame_pipe` 的 crate 根。
/// 通过 `ffi` 导出 C ABI；管线本体位于 `engine` 模块，也可通过下方的重导出直接在 Rust 中使用。
pub mod engine;
mod ffi;

pub use engine::async_encoder::{AsyncTextureEncoder, TaskState};
pub use engine::codec::{CodecBackend, FrameDecoder, FrameEncoder, FrameRef, PassthroughBackend};
pub use engine::config::{
    Codec, Compression, DEFAULT_ENCODER_RING_CAPACITY, DEFAULT_SUBMISSION_RING_CAPACITY,
    DecoderParams, EncoderParams, Format, PipelineConfig,
};
pub use engine::device::{
    GlProcLoader, GlTextureDevice, STAGING_PITCH_ALIGN, StagingBuffer, TextureDevice, TextureRef,
};
pub use engine::error::{
    CodecError, GpuError, InstanceRole, PipelineError, ProtocolViolation, RingKind,
};
pub use engine::instance::{Instance, InstanceKind};
pub use engine::pipe::FramePipe;
pub use engine::registry::Handle;
pub use engine::submission::{EncodeRequest, PollStats, SubmissionQueue, TaskId, TaskView};
