//! ### English
//! Uncompressed backend: "encoding" packs rows tightly, "decoding" copies them back out.
//!
//! ### 中文
//! 无压缩后端：“编码”把各行紧密打包，“解码”再原样拷出。
use tracing::trace;

use super::{CodecBackend, FrameDecoder, FrameEncoder, FrameRef};
use crate::engine::config::{DecoderParams, EncoderParams, Format};
use crate::engine::error::CodecError;

#[derive(Clone, Copy, Debug, Default)]
pub struct PassthroughBackend;

impl CodecBackend for PassthroughBackend {
    fn create_encoder(&self, params: &EncoderParams) -> Result<Box<dyn FrameEncoder>, CodecError> {
        Ok(Box::new(PassthroughEncoder {
            format: params.format,
            width: params.width,
            height: params.height,
            frames: 0,
        }))
    }

    fn create_decoder(&self, params: &DecoderParams) -> Result<Box<dyn FrameDecoder>, CodecError> {
        Ok(Box::new(PassthroughDecoder {
            format: params.format,
            width: params.width,
            height: params.height,
        }))
    }
}

struct PassthroughEncoder {
    format: Format,
    width: u32,
    height: u32,
    frames: u64,
}

impl FrameEncoder for PassthroughEncoder {
    fn encode(
        &mut self,
        frame: FrameRef<'_>,
        dst: &mut [u8],
        force_iframe: bool,
    ) -> Result<u64, CodecError> {
        if frame.width > self.width || frame.height > self.height {
            return Err(CodecError::Unsupported(format!(
                "frame {}x{} exceeds session size {}x{}",
                frame.width, frame.height, self.width, self.height
            )));
        }

        let row_bytes = self.format.row_bytes(frame.width);
        let needed = self.format.frame_bytes(frame.width, frame.height);
        let (Some(row_bytes), Some(needed)) = (row_bytes, needed) else {
            return Err(CodecError::Unsupported(format!(
                "frame {}x{} is too large",
                frame.width, frame.height
            )));
        };
        if dst.len() < needed {
            return Err(CodecError::BufferTooSmall {
                needed,
                available: dst.len(),
            });
        }

        for (y, out) in dst[..needed].chunks_exact_mut(row_bytes.max(1)).enumerate() {
            let row = frame.row(y, row_bytes).ok_or_else(|| {
                CodecError::Failed(format!("input frame is truncated at row {y}"))
            })?;
            out.copy_from_slice(row);
        }

        self.frames += 1;
        trace!(frame = self.frames, bytes = needed, force_iframe, "passthrough encode");
        Ok(needed as u64)
    }

    fn set_bitrate(&mut self, _bitrate: u64, target_fps: u32) -> Result<(), CodecError> {
        if target_fps == 0 {
            return Err(CodecError::Unsupported(
                "target frame rate must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

struct PassthroughDecoder {
    format: Format,
    width: u32,
    height: u32,
}

impl FrameDecoder for PassthroughDecoder {
    fn decode(
        &mut self,
        src: &[u8],
        dst: &mut [u8],
        width: u32,
        height: u32,
    ) -> Result<u64, CodecError> {
        if width > self.width || height > self.height {
            return Err(CodecError::Unsupported(format!(
                "frame {width}x{height} exceeds session size {}x{}",
                self.width, self.height
            )));
        }
        let needed = self.format.frame_bytes(width, height).ok_or_else(|| {
            CodecError::Unsupported(format!("frame {width}x{height} is too large"))
        })?;
        if src.len() < needed {
            return Err(CodecError::Failed(format!(
                "access unit holds {} bytes, frame needs {needed}",
                src.len()
            )));
        }
        if dst.len() < needed {
            return Err(CodecError::BufferTooSmall {
                needed,
                available: dst.len(),
            });
        }
        dst[..needed].copy_from_slice(&src[..needed]);
        Ok(needed as u64)
    }
}
