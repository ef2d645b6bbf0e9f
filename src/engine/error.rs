//! ### English
//! Error taxonomy for the pipeline.
//!
//! Every fallible engine operation returns [`PipelineError`]. Codec and GPU failures are `Clone`
//! because they are stored in a ring slot and handed out again when the task is polled.
//!
//! ### 中文
//! 管线的错误分类。
//!
//! 所有可能失败的引擎操作都返回 [`PipelineError`]。编解码与 GPU 错误实现了 `Clone`，
//! 因为它们会被存入 ring 槽位，并在轮询任务时再次交出。

use std::fmt;

use thiserror::Error;
use tracing::error;

/// ### English
/// Which bounded ring rejected the work.
///
/// ### 中文
/// 拒绝该工作的有界 ring。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RingKind {
    /// ### English
    /// Per-instance async texture encoder ring.
    ///
    /// ### 中文
    /// 每实例的异步纹理编码 ring。
    Encoder,
    /// ### English
    /// Process-wide submission ring between caller and render thread.
    ///
    /// ### 中文
    /// 调用方与渲染线程之间的全局提交 ring。
    Submission,
}

impl fmt::Display for RingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encoder => f.write_str("encoder"),
            Self::Submission => f.write_str("submission"),
        }
    }
}

/// ### English
/// Instance kind expected by an operation.
///
/// ### 中文
/// 某个操作期望的实例类型。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstanceRole {
    Encoder,
    Decoder,
    AsyncTextureEncoder,
}

impl fmt::Display for InstanceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encoder => f.write_str("an encoder"),
            Self::Decoder => f.write_str("a decoder"),
            Self::AsyncTextureEncoder => f.write_str("an async texture encoder"),
        }
    }
}

/// ### English
/// Caller misuse of the cursor protocol. Never recovered silently: the offending call is
/// rejected and the violation is logged at error level.
///
/// ### 中文
/// 调用方违反游标协议。不会被静默恢复：违规调用会被拒绝，并以 error 级别记录日志。
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ProtocolViolation {
    #[error("only the oldest uncleared task ({expected}) may be cleared, got {got}")]
    OutOfOrderClear { expected: u64, got: u64 },

    #[error("task {index} is not done yet")]
    NotDone { index: u64 },

    #[error("the {role} role is already held by another thread")]
    ConcurrentAccess { role: &'static str },
}

impl ProtocolViolation {
    /// ### English
    /// Logs the violation at error level and converts it into the returned error.
    ///
    /// ### 中文
    /// 以 error 级别记录违规，并转换为返回的错误。
    pub(crate) fn report(self) -> PipelineError {
        error!(violation = %self, "ring protocol violation");
        PipelineError::Protocol(self)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("unsupported codec configuration: {0}")]
    Unsupported(String),

    #[error("output buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall { needed: usize, available: usize },

    #[error("codec failure: {0}")]
    Failed(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GpuError {
    #[error("no GL function loader installed")]
    Unavailable,

    #[error("texture {0} is not a valid 2D texture")]
    InvalidTexture(u32),

    #[error("texture is {actual_width}x{actual_height}, expected {width}x{height}")]
    SizeMismatch {
        width: u32,
        height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("GL error 0x{0:04X}")]
    Driver(u32),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error(
        "{ring} ring is full ({capacity} slots); clear finished tasks or submit fewer at once"
    )]
    ResourceExhausted { ring: RingKind, capacity: usize },

    #[error("no instance is registered for handle {0}")]
    InvalidHandle(u32),

    #[error("task {0} does not exist")]
    InvalidTaskId(u64),

    #[error("instance {handle} is not {expected}")]
    WrongInstanceKind { handle: u32, expected: InstanceRole },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("failed to spawn encode thread: {0}")]
    Thread(String),

    #[error(transparent)]
    Protocol(#[from] ProtocolViolation),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Gpu(#[from] GpuError),
}

impl PipelineError {
    /// ### English
    /// `true` for errors that only mean "try again later".
    ///
    /// ### 中文
    /// 仅表示“稍后重试”的错误返回 `true`。
    pub fn is_backpressure(&self) -> bool {
        matches!(self, Self::ResourceExhausted { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_ring() {
        let err = PipelineError::ResourceExhausted {
            ring: RingKind::Submission,
            capacity: 20,
        };
        assert!(err.to_string().starts_with("submission ring is full (20 slots)"));
        assert!(err.is_backpressure());
    }

    #[test]
    fn transparent_variants_keep_inner_message() {
        let err: PipelineError = GpuError::Driver(0x0502).into();
        assert_eq!(err.to_string(), "GL error 0x0502");
        let err: PipelineError = ProtocolViolation::OutOfOrderClear {
            expected: 1,
            got: 2,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "only the oldest uncleared task (1) may be cleared, got 2"
        );
        assert!(!err.is_backpressure());
    }
}
