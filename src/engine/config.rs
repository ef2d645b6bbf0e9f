//! ### English
//! Pipeline configuration and codec parameters.
//!
//! Enum discriminants are part of the C ABI: hosts pass them as plain `u32`.
//!
//! ### 中文
//! 管线配置与编解码参数。
//!
//! 枚举判别值属于 C ABI 的一部分：宿主以普通 `u32` 传入。

use super::error::PipelineError;

/// ### English
/// Default encoder ring capacity (holds `N - 1` in-flight frames).
///
/// ### 中文
/// 编码 ring 的默认容量（最多容纳 `N - 1` 个在途帧）。
pub const DEFAULT_ENCODER_RING_CAPACITY: usize = 3;

/// ### English
/// Default submission ring capacity.
///
/// ### 中文
/// 提交 ring 的默认容量。
pub const DEFAULT_SUBMISSION_RING_CAPACITY: usize = 20;

/// ### English
/// Smallest usable ring: one slot always stays free to tell "full" from "empty".
///
/// ### 中文
/// 最小可用 ring：始终保留一个空槽位以区分“满”与“空”。
const MIN_RING_CAPACITY: usize = 2;

/// ### English
/// Largest accepted frame width or height, matching the common GL texture size limit.
///
/// ### 中文
/// 可接受的最大帧宽或帧高，与常见的 GL 纹理尺寸上限一致。
pub const MAX_FRAME_DIMENSION: u32 = 16384;

/// ### English
/// Ring sizing for one pipeline. The two limits are independent tunables.
///
/// ### 中文
/// 单条管线的 ring 尺寸。两个上限是相互独立的可调参数。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PipelineConfig {
    /// ### English
    /// Slots per async texture encoder (GPU staging + host output buffers each).
    ///
    /// ### 中文
    /// 每个异步纹理编码器的槽位数（每个槽位各含 GPU 暂存与主机输出缓冲）。
    pub encoder_ring_capacity: usize,
    /// ### English
    /// Slots in the caller → render-thread submission ring.
    ///
    /// ### 中文
    /// 调用方 → 渲染线程提交 ring 的槽位数。
    pub submission_ring_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            encoder_ring_capacity: DEFAULT_ENCODER_RING_CAPACITY,
            submission_ring_capacity: DEFAULT_SUBMISSION_RING_CAPACITY,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.encoder_ring_capacity < MIN_RING_CAPACITY {
            return Err(PipelineError::InvalidArgument(format!(
                "encoder ring capacity must be at least {MIN_RING_CAPACITY}, got {}",
                self.encoder_ring_capacity
            )));
        }
        // Task ids are `slot + 1` as a `u32`.
        if self.submission_ring_capacity < MIN_RING_CAPACITY
            || self.submission_ring_capacity >= u32::MAX as usize
        {
            return Err(PipelineError::InvalidArgument(format!(
                "submission ring capacity must be in {MIN_RING_CAPACITY}..{}, got {}",
                u32::MAX,
                self.submission_ring_capacity
            )));
        }
        Ok(())
    }
}

/// ### English
/// Pixel format of frames handed to the codec.
///
/// ### 中文
/// 交给编解码器的帧像素格式。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum Format {
    Rgba32 = 0,
    Uint4 = 1,
    Uint8 = 2,
    Uint16 = 3,
    Uint32 = 4,
}

impl Format {
    /// ### English
    /// Bytes occupied by one tightly packed row of `width` pixels, or `None` if that does not fit
    /// in `usize`.
    ///
    /// ### 中文
    /// `width` 个像素紧密排列时一行所占的字节数；超出 `usize` 范围时返回 `None`。
    pub fn row_bytes(self, width: u32) -> Option<usize> {
        let width = usize::try_from(width).ok()?;
        match self {
            Self::Rgba32 | Self::Uint32 => width.checked_mul(4),
            Self::Uint16 => width.checked_mul(2),
            Self::Uint8 => Some(width),
            Self::Uint4 => Some(width.div_ceil(2)),
        }
    }

    /// ### English
    /// Bytes occupied by a tightly packed `width x height` frame, or `None` on overflow.
    ///
    /// ### 中文
    /// 紧密排列的 `width x height` 帧所占字节数；溢出时返回 `None`。
    pub fn frame_bytes(self, width: u32, height: u32) -> Option<usize> {
        self.row_bytes(width)?.checked_mul(usize::try_from(height).ok()?)
    }
}

impl TryFrom<u32> for Format {
    type Error = PipelineError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Rgba32),
            1 => Ok(Self::Uint4),
            2 => Ok(Self::Uint8),
            3 => Ok(Self::Uint16),
            4 => Ok(Self::Uint32),
            other => Err(PipelineError::InvalidArgument(format!(
                "unknown pixel format {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum Codec {
    H264 = 0,
    Hevc = 1,
}

impl TryFrom<u32> for Codec {
    type Error = PipelineError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::H264),
            1 => Ok(Self::Hevc),
            other => Err(PipelineError::InvalidArgument(format!("unknown codec {other}"))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum Compression {
    Lossy = 0,
    Lossless = 1,
}

impl TryFrom<u32> for Compression {
    type Error = PipelineError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Lossy),
            1 => Ok(Self::Lossless),
            other => Err(PipelineError::InvalidArgument(format!(
                "unknown compression mode {other}"
            ))),
        }
    }
}

/// ### English
/// Parameters for creating an encoder (plain or async texture).
///
/// ### 中文
/// 创建编码器（普通或异步纹理）的参数。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncoderParams {
    pub format: Format,
    pub codec: Codec,
    pub compression: Compression,
    /// ### English
    /// Target bitrate in bits per second (ignored for lossless compression).
    ///
    /// ### 中文
    /// 目标码率（bit/s；无损压缩时忽略）。
    pub bitrate: u64,
    pub target_fps: u32,
    pub width: u32,
    pub height: u32,
}

impl EncoderParams {
    pub fn validate(&self) -> Result<(), PipelineError> {
        validate_size(self.width, self.height)?;
        if self.target_fps == 0 {
            return Err(PipelineError::InvalidArgument(
                "target frame rate must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// ### English
/// Parameters for creating a decoder.
///
/// ### 中文
/// 创建解码器的参数。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecoderParams {
    pub format: Format,
    pub codec: Codec,
    pub width: u32,
    pub height: u32,
}

impl DecoderParams {
    pub fn validate(&self) -> Result<(), PipelineError> {
        validate_size(self.width, self.height)
    }
}

fn validate_size(width: u32, height: u32) -> Result<(), PipelineError> {
    if width == 0 || height == 0 {
        return Err(PipelineError::InvalidArgument(format!(
            "frame size must be non-zero, got {width}x{height}"
        )));
    }
    if width > MAX_FRAME_DIMENSION || height > MAX_FRAME_DIMENSION {
        return Err(PipelineError::InvalidArgument(format!(
            "frame size {width}x{height} exceeds {MAX_FRAME_DIMENSION}x{MAX_FRAME_DIMENSION}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abi_discriminants_round_trip() {
        assert_eq!(Format::try_from(Format::Uint16 as u32), Ok(Format::Uint16));
        assert_eq!(Codec::try_from(1), Ok(Codec::Hevc));
        assert_eq!(Compression::try_from(0), Ok(Compression::Lossy));
        assert!(Format::try_from(5).is_err());
        assert!(Codec::try_from(2).is_err());
        assert!(Compression::try_from(7).is_err());
    }

    #[test]
    fn row_bytes_per_format() {
        assert_eq!(Format::Rgba32.row_bytes(3), Some(12));
        assert_eq!(Format::Uint16.row_bytes(3), Some(6));
        assert_eq!(Format::Uint8.row_bytes(3), Some(3));
        assert_eq!(Format::Uint4.row_bytes(3), Some(2));
        assert_eq!(Format::Uint32.frame_bytes(2, 2), Some(16));
    }

    #[test]
    fn frame_bytes_overflow_is_none() {
        assert_eq!(Format::Rgba32.frame_bytes(u32::MAX, u32::MAX), None);
        assert_eq!(Format::Uint8.frame_bytes(u32::MAX, 1), Some(u32::MAX as usize));
        assert_eq!(
            Format::Rgba32.frame_bytes(MAX_FRAME_DIMENSION, MAX_FRAME_DIMENSION),
            Some(1 << 30)
        );
    }

    #[test]
    fn config_rejects_degenerate_rings() {
        assert!(PipelineConfig::default().validate().is_ok());
        let config = PipelineConfig {
            encoder_ring_capacity: 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        let config = PipelineConfig {
            submission_ring_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn params_reject_empty_frames() {
        let params = EncoderParams {
            format: Format::Rgba32,
            codec: Codec::H264,
            compression: Compression::Lossy,
            bitrate: 4_000_000,
            target_fps: 60,
            width: 0,
            height: 16,
        };
        assert!(params.validate().is_err());
        assert!(EncoderParams { width: 16, ..params }.validate().is_ok());
        assert!(
            EncoderParams {
                width: MAX_FRAME_DIMENSION,
                height: MAX_FRAME_DIMENSION,
                ..params
            }
            .validate()
            .is_ok()
        );
        assert!(
            EncoderParams {
                width: MAX_FRAME_DIMENSION + 1,
                ..params
            }
            .validate()
            .is_err()
        );
        assert!(
            DecoderParams {
                format: Format::Rgba32,
                codec: Codec::H264,
                width: 4,
                height: u32::MAX,
            }
            .validate()
            .is_err()
        );
        assert!(
            EncoderParams {
                width: 16,
                target_fps: 0,
                ..params
            }
            .validate()
            .is_err()
        );
    }
}
