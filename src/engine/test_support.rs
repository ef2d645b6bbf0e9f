//! Deterministic codec and texture fakes shared by the unit tests.

use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;

use super::codec::{CodecBackend, FrameDecoder, FrameEncoder, FrameRef, PassthroughBackend};
use super::config::{Codec, Compression, DecoderParams, EncoderParams, Format};
use super::device::{StagingBuffer, TextureDevice, TextureRef};
use super::error::{CodecError, GpuError};

/// First byte that makes [`GatedEncoder`] fail the frame.
pub(crate) const POISON: u8 = 0xEE;

/// Fills every downloaded row with the low byte of the texture id. Texture `0` is invalid.
pub(crate) struct FillDevice;

impl TextureDevice for FillDevice {
    fn download(
        &self,
        texture: TextureRef,
        width: u32,
        height: u32,
        dst: &mut StagingBuffer,
    ) -> Result<(), GpuError> {
        if texture.id == 0 {
            return Err(GpuError::InvalidTexture(0));
        }
        let row_bytes = width as usize * 4;
        for y in 0..height as usize {
            dst.row_mut(y)[..row_bytes].fill(texture.id as u8);
        }
        Ok(())
    }

    fn upload(&self, _: &[u8], _: TextureRef, _: u32, _: u32) -> Result<(), GpuError> {
        Ok(())
    }
}

/// Waits for one token per frame; a dropped sender opens the gate for good.
pub(crate) struct GatedEncoder {
    gate: Receiver<()>,
}

impl FrameEncoder for GatedEncoder {
    fn encode(
        &mut self,
        frame: FrameRef<'_>,
        dst: &mut [u8],
        _force_iframe: bool,
    ) -> Result<u64, CodecError> {
        let _ = self.gate.recv();
        let row_bytes = frame.width as usize * 4;
        if frame.row(0, row_bytes).map(|row| row[0]) == Some(POISON) {
            return Err(CodecError::Failed("poisoned frame".to_string()));
        }
        let mut written = 0;
        for y in 0..frame.height as usize {
            let row = frame.row(y, row_bytes).unwrap();
            dst[written..written + row_bytes].copy_from_slice(row);
            written += row_bytes;
        }
        Ok(written as u64)
    }

    fn set_bitrate(&mut self, _: u64, _: u32) -> Result<(), CodecError> {
        Ok(())
    }
}

pub(crate) struct GatedBackend {
    pub(crate) gate: Receiver<()>,
}

impl CodecBackend for GatedBackend {
    fn create_encoder(&self, _: &EncoderParams) -> Result<Box<dyn FrameEncoder>, CodecError> {
        Ok(Box::new(GatedEncoder {
            gate: self.gate.clone(),
        }))
    }

    fn create_decoder(&self, params: &DecoderParams) -> Result<Box<dyn FrameDecoder>, CodecError> {
        PassthroughBackend.create_decoder(params)
    }
}

pub(crate) fn gated_encoder(gate: Receiver<()>) -> Box<dyn FrameEncoder> {
    Box::new(GatedEncoder { gate })
}

/// 4x2 RGBA32 session: 32 bytes per frame.
pub(crate) fn rgba_params() -> EncoderParams {
    EncoderParams {
        format: Format::Rgba32,
        codec: Codec::H264,
        compression: Compression::Lossy,
        bitrate: 1_000_000,
        target_fps: 60,
        width: 4,
        height: 2,
    }
}

/// Polls `done` until it returns `Some`, failing the test after five seconds.
pub(crate) fn wait_for<T>(mut done: impl FnMut() -> Option<T>) -> T {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if let Some(value) = done() {
            return value;
        }
        assert!(Instant::now() < deadline, "condition never became true");
        std::thread::sleep(Duration::from_millis(1));
    }
}
