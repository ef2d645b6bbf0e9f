//! Shared fixtures for the integration tests: a gated copy codec and a fill-pattern texture device.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, unbounded};
use frame_pipe::{
    Codec, CodecBackend, CodecError, Compression, DecoderParams, EncodeRequest, EncoderParams,
    Format, FrameDecoder, FrameEncoder, FramePipe, FrameRef, GpuError, PassthroughBackend,
    PipelineConfig, StagingBuffer, TaskId, TaskState, TextureDevice, TextureRef,
};

pub const WIDTH: u32 = 8;
pub const HEIGHT: u32 = 4;
pub const FRAME_BYTES: u64 = WIDTH as u64 * HEIGHT as u64 * 4;

/// Writes the low byte of the texture id into every pixel. Texture `0` does not exist.
pub struct FillDevice;

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
        for y in 0..height as usize {
            dst.row_mut(y)[..width as usize * 4].fill(texture.id as u8);
        }
        Ok(())
    }

    fn upload(&self, _: &[u8], _: TextureRef, _: u32, _: u32) -> Result<(), GpuError> {
        Ok(())
    }
}

/// Copies frames verbatim, but only after taking one token from the gate per frame.
struct GatedCopyEncoder {
    gate: Receiver<()>,
}

impl FrameEncoder for GatedCopyEncoder {
    fn encode(
        &mut self,
        frame: FrameRef<'_>,
        dst: &mut [u8],
        _force_iframe: bool,
    ) -> Result<u64, CodecError> {
        // A disconnected gate lets every remaining frame through.
        let _ = self.gate.recv();
        let row_bytes = frame.width as usize * 4;
        let needed = row_bytes * frame.height as usize;
        if dst.len() < needed {
            return Err(CodecError::BufferTooSmall {
                needed,
                available: dst.len(),
            });
        }
        for (y, out) in dst[..needed].chunks_exact_mut(row_bytes).enumerate() {
            let row = frame
                .row(y, row_bytes)
                .ok_or_else(|| CodecError::Failed("short frame".to_string()))?;
            out.copy_from_slice(row);
        }
        Ok(needed as u64)
    }

    fn set_bitrate(&mut self, _: u64, _: u32) -> Result<(), CodecError> {
        Ok(())
    }
}

pub struct GatedBackend {
    gate: Receiver<()>,
}

impl CodecBackend for GatedBackend {
    fn create_encoder(&self, _: &EncoderParams) -> Result<Box<dyn FrameEncoder>, CodecError> {
        Ok(Box::new(GatedCopyEncoder {
            gate: self.gate.clone(),
        }))
    }

    fn create_decoder(&self, params: &DecoderParams) -> Result<Box<dyn FrameDecoder>, CodecError> {
        PassthroughBackend.create_decoder(params)
    }
}

/// A pipe whose encoders wait on the returned gate. Drop the sender to let everything through.
pub fn gated_pipe(config: PipelineConfig) -> (FramePipe, Sender<()>) {
    let (tx, rx) = unbounded();
    let pipe = FramePipe::new(
        config,
        Arc::new(GatedBackend { gate: rx }),
        Arc::new(FillDevice),
    )
    .expect("valid pipeline config");
    (pipe, tx)
}

pub fn encoder_params() -> EncoderParams {
    EncoderParams {
        format: Format::Rgba32,
        codec: Codec::H264,
        compression: Compression::Lossy,
        bitrate: 2_000_000,
        target_fps: 30,
        width: WIDTH,
        height: HEIGHT,
    }
}

pub fn request(texture: u32) -> EncodeRequest {
    EncodeRequest {
        texture: TextureRef::texture_2d(texture),
        width: WIDTH,
        height: HEIGHT,
        force_iframe: false,
    }
}

/// Polls `done` until it yields a value; panics after five seconds.
pub fn wait_for<T>(mut done: impl FnMut() -> Option<T>) -> T {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if let Some(value) = done() {
            return value;
        }
        assert!(Instant::now() < deadline, "timed out waiting for the pipeline");
        std::thread::sleep(Duration::from_millis(1));
    }
}

/// Drives the render-thread poll until `task` leaves the pending state.
pub fn poll_until_done(pipe: &FramePipe, task: TaskId) -> TaskState {
    wait_for(|| {
        pipe.poll_render_thread();
        match pipe.query_task(task).expect("task is live") {
            TaskState::Pending => None,
            state => Some(state),
        }
    })
}
