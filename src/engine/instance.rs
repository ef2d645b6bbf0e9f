//! ### English
//! Instances: the objects behind handles.
//!
//! Each instance owns exactly one codec role. Plain encoders/decoders are called synchronously by
//! whichever thread holds the handle, so their codec session sits behind a `parking_lot::Mutex`.
//! The async texture encoder hands its session to its own encode thread and needs no lock.
//!
//! ### 中文
//! 实例：句柄背后的对象。
//!
//! 每个实例恰好拥有一种编解码角色。普通编码器/解码器由持有句柄的线程同步调用，因此其编解码会话
//! 放在 `parking_lot::Mutex` 之后。异步纹理编码器把会话交给自己的编码线程，不需要锁。

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use super::async_encoder::AsyncTextureEncoder;
use super::codec::{CodecBackend, FrameDecoder, FrameEncoder, FrameRef};
use super::config::{DecoderParams, EncoderParams, Format};
use super::device::{StagingBuffer, TextureDevice, TextureRef};
use super::error::{CodecError, InstanceRole, PipelineError};

pub struct Instance {
    kind: InstanceKind,
}

pub enum InstanceKind {
    Encoder(PlainEncoder),
    Decoder(PlainDecoder),
    AsyncTextureEncoder(AsyncTextureEncoder),
}

impl Instance {
    pub fn encoder(backend: &dyn CodecBackend, params: EncoderParams) -> Result<Self, PipelineError> {
        params.validate()?;
        let codec = backend.create_encoder(&params)?;
        Ok(Self {
            kind: InstanceKind::Encoder(PlainEncoder {
                params,
                session: Mutex::new(EncoderSession {
                    codec,
                    staging: None,
                }),
            }),
        })
    }

    pub fn decoder(backend: &dyn CodecBackend, params: DecoderParams) -> Result<Self, PipelineError> {
        params.validate()?;
        let codec = backend.create_decoder(&params)?;
        Ok(Self {
            kind: InstanceKind::Decoder(PlainDecoder {
                params,
                session: Mutex::new(DecoderSession {
                    codec,
                    scratch: Vec::new(),
                }),
            }),
        })
    }

    pub fn async_texture_encoder(
        backend: &dyn CodecBackend,
        params: EncoderParams,
        capacity: usize,
        device: Arc<dyn TextureDevice>,
    ) -> Result<Self, PipelineError> {
        params.validate()?;
        let codec = backend.create_encoder(&params)?;
        Ok(Self {
            kind: InstanceKind::AsyncTextureEncoder(AsyncTextureEncoder::new(
                &params, capacity, codec, device,
            )?),
        })
    }

    pub fn kind(&self) -> &InstanceKind {
        &self.kind
    }

    pub fn role(&self) -> InstanceRole {
        match self.kind {
            InstanceKind::Encoder(_) => InstanceRole::Encoder,
            InstanceKind::Decoder(_) => InstanceRole::Decoder,
            InstanceKind::AsyncTextureEncoder(_) => InstanceRole::AsyncTextureEncoder,
        }
    }

    pub fn as_encoder(&self) -> Option<&PlainEncoder> {
        match &self.kind {
            InstanceKind::Encoder(encoder) => Some(encoder),
            _ => None,
        }
    }

    pub fn as_decoder(&self) -> Option<&PlainDecoder> {
        match &self.kind {
            InstanceKind::Decoder(decoder) => Some(decoder),
            _ => None,
        }
    }

    pub fn as_async_texture_encoder(&self) -> Option<&AsyncTextureEncoder> {
        match &self.kind {
            InstanceKind::AsyncTextureEncoder(encoder) => Some(encoder),
            _ => None,
        }
    }
}

struct EncoderSession {
    codec: Box<dyn FrameEncoder>,
    /// ### English
    /// Readback buffer for [`PlainEncoder::encode_texture`], allocated on first use.
    ///
    /// ### 中文
    /// [`PlainEncoder::encode_texture`] 使用的回读缓冲，首次使用时分配。
    staging: Option<StagingBuffer>,
}

/// ### English
/// Synchronous encoder: host memory or texture in, encoded bytes out, on the calling thread.
///
/// ### 中文
/// 同步编码器：在调用线程上把主机内存或纹理编码为字节。
pub struct PlainEncoder {
    params: EncoderParams,
    session: Mutex<EncoderSession>,
}

impl PlainEncoder {
    pub fn params(&self) -> &EncoderParams {
        &self.params
    }

    pub fn encode(
        &self,
        frame: FrameRef<'_>,
        dst: &mut [u8],
        force_iframe: bool,
    ) -> Result<u64, PipelineError> {
        let written = self.session.lock().codec.encode(frame, dst, force_iframe)?;
        trace!(bytes = written, "frame encoded");
        Ok(written)
    }

    /// ### English
    /// Reads `texture` back and encodes it. RGBA32 sessions only.
    ///
    /// ### 中文
    /// 回读 `texture` 并编码。仅支持 RGBA32 会话。
    pub fn encode_texture(
        &self,
        device: &dyn TextureDevice,
        texture: TextureRef,
        width: u32,
        height: u32,
        dst: &mut [u8],
        force_iframe: bool,
    ) -> Result<u64, PipelineError> {
        if self.params.format != Format::Rgba32 {
            return Err(CodecError::Unsupported(
                "texture encoding only supports RGBA32".to_string(),
            )
            .into());
        }
        if width > self.params.width || height > self.params.height {
            return Err(PipelineError::InvalidArgument(format!(
                "texture region {width}x{height} does not fit encoder size {}x{}",
                self.params.width, self.params.height
            )));
        }

        let width_limit = self.params.width;
        let row_bytes = self.params.format.row_bytes(width_limit).ok_or_else(|| {
            PipelineError::InvalidArgument(format!("encoder width {width_limit} is too large"))
        })?;

        let mut session = self.session.lock();
        let EncoderSession { codec, staging } = &mut *session;
        let staging = staging
            .get_or_insert_with(|| StagingBuffer::new(row_bytes, self.params.height as usize));
        device.download(texture, width, height, staging)?;
        let frame = FrameRef {
            data: staging.as_slice(),
            pitch: staging.pitch(),
            width,
            height,
        };
        let written = codec.encode(frame, dst, force_iframe)?;
        trace!(texture = texture.id, bytes = written, "texture encoded");
        Ok(written)
    }

    pub fn set_bitrate(&self, bitrate: u64, target_fps: u32) -> Result<(), PipelineError> {
        if target_fps == 0 {
            return Err(PipelineError::InvalidArgument(
                "target frame rate must be non-zero".to_string(),
            ));
        }
        self.session.lock().codec.set_bitrate(bitrate, target_fps)?;
        Ok(())
    }
}

struct DecoderSession {
    codec: Box<dyn FrameDecoder>,
    scratch: Vec<u8>,
}

pub struct PlainDecoder {
    params: DecoderParams,
    session: Mutex<DecoderSession>,
}

impl PlainDecoder {
    pub fn params(&self) -> &DecoderParams {
        &self.params
    }

    fn check_region(&self, width: u32, height: u32) -> Result<(), PipelineError> {
        if width > self.params.width || height > self.params.height {
            return Err(PipelineError::InvalidArgument(format!(
                "frame {width}x{height} does not fit decoder size {}x{}",
                self.params.width, self.params.height
            )));
        }
        Ok(())
    }

    pub fn decode(
        &self,
        src: &[u8],
        dst: &mut [u8],
        width: u32,
        height: u32,
    ) -> Result<u64, PipelineError> {
        self.check_region(width, height)?;
        Ok(self.session.lock().codec.decode(src, dst, width, height)?)
    }

    /// ### English
    /// Decodes `src` and uploads the frame into `texture`. RGBA32 sessions only.
    ///
    /// ### 中文
    /// 解码 `src` 并把帧上传到 `texture`。仅支持 RGBA32 会话。
    pub fn decode_texture(
        &self,
        device: &dyn TextureDevice,
        src: &[u8],
        texture: TextureRef,
        width: u32,
        height: u32,
    ) -> Result<u64, PipelineError> {
        if self.params.format != Format::Rgba32 {
            return Err(CodecError::Unsupported(
                "texture decoding only supports RGBA32".to_string(),
            )
            .into());
        }
        self.check_region(width, height)?;
        let needed = self.params.format.frame_bytes(width, height).ok_or_else(|| {
            PipelineError::InvalidArgument(format!("frame {width}x{height} is too large"))
        })?;

        let mut session = self.session.lock();
        let DecoderSession { codec, scratch } = &mut *session;
        scratch.resize(needed, 0);
        let written = codec.decode(src, scratch, width, height)?;
        let frame = scratch.get(..written as usize).ok_or_else(|| {
            CodecError::Failed(format!(
                "decoder reported {written} bytes for a {} byte frame",
                scratch.len()
            ))
        })?;
        device.upload(frame, texture, width, height)?;
        trace!(texture = texture.id, bytes = written, "texture decoded");
        Ok(written)
    }
}
