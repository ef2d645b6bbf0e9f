//! ### English
//! Codec seam.
//!
//! The pipeline never looks inside a codec: encoding is "frame in, byte count out or failure".
//! A [`CodecBackend`] builds encoders/decoders from parameters; [`PassthroughBackend`] is the
//! built-in uncompressed backend used by the C ABI.
//!
//! ### 中文
//! 编解码接口。
//!
//! 管线从不关心编解码器内部：编码即“输入一帧，输出字节数或失败”。[`CodecBackend`] 根据参数构建
//! 编码器/解码器；[`PassthroughBackend`] 是 C ABI 默认使用的内置无压缩后端。
mod passthrough;

pub use passthrough::PassthroughBackend;

use super::config::{DecoderParams, EncoderParams};
use super::error::CodecError;

/// ### English
/// Borrowed input frame: `height` rows of `pitch` bytes, the first `row_bytes` of each row valid.
///
/// ### 中文
/// 借用的输入帧：`height` 行、每行 `pitch` 字节，每行前 `row_bytes` 字节有效。
#[derive(Clone, Copy, Debug)]
pub struct FrameRef<'a> {
    pub data: &'a [u8],
    pub pitch: usize,
    pub width: u32,
    pub height: u32,
}

impl<'a> FrameRef<'a> {
    /// ### English
    /// Returns row `y`, truncated to `row_bytes`, or `None` if the frame is too short.
    ///
    /// ### 中文
    /// 返回第 `y` 行（截断为 `row_bytes`）；若帧数据不足则返回 `None`。
    pub fn row(&self, y: usize, row_bytes: usize) -> Option<&'a [u8]> {
        let start = y.checked_mul(self.pitch)?;
        self.data.get(start..start.checked_add(row_bytes)?)
    }
}

pub trait FrameEncoder: Send {
    /// ### English
    /// Encodes one frame into `dst` and returns the number of bytes written.
    ///
    /// ### 中文
    /// 把一帧编码到 `dst`，返回写入的字节数。
    fn encode(
        &mut self,
        frame: FrameRef<'_>,
        dst: &mut [u8],
        force_iframe: bool,
    ) -> Result<u64, CodecError>;

    fn set_bitrate(&mut self, bitrate: u64, target_fps: u32) -> Result<(), CodecError>;
}

pub trait FrameDecoder: Send {
    /// ### English
    /// Decodes one access unit from `src` into `dst` and returns the number of bytes written.
    ///
    /// ### 中文
    /// 从 `src` 解码一个访问单元到 `dst`，返回写入的字节数。
    fn decode(
        &mut self,
        src: &[u8],
        dst: &mut [u8],
        width: u32,
        height: u32,
    ) -> Result<u64, CodecError>;
}

/// ### English
/// Factory for codec sessions. Shared by every instance of one pipeline.
///
/// ### 中文
/// 编解码会话工厂，由同一管线的所有实例共享。
pub trait CodecBackend: Send + Sync {
    fn create_encoder(&self, params: &EncoderParams) -> Result<Box<dyn FrameEncoder>, CodecError>;

    fn create_decoder(&self, params: &DecoderParams) -> Result<Box<dyn FrameDecoder>, CodecError>;
}
