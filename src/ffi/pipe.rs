//! ### English
//! C ABI bindings for setup, instance lifecycle and the synchronous encode/decode calls.
//!
//! ### 中文
//! 初始化、实例生命周期以及同步编解码调用的 C ABI 绑定。

use std::slice;

use tracing::warn;

use super::abi::{FramePipeConfig, FramePipeFrame};
use super::{CONFIG, PIPE, call, errors, gl_device, handle};
use crate::engine::codec::FrameRef;
use crate::engine::config::{
    Codec, Compression, DecoderParams, EncoderParams, Format, PipelineConfig,
};
use crate::engine::device::{GlProcLoader, TEXTURE_TARGET_2D, TextureRef};
use crate::engine::error::PipelineError;

fn texture_ref(texture_id: u32, target: u32) -> TextureRef {
    TextureRef {
        id: texture_id,
        target: if target == 0 { TEXTURE_TARGET_2D } else { target },
    }
}

/// ### English
/// Borrows `len` bytes at `ptr`. NULL is only accepted for an empty range.
///
/// # Safety
/// A non-null `ptr` must be valid for reads of `len` bytes for the duration of the call.
///
/// ### 中文
/// 借用 `ptr` 处的 `len` 字节。只有长度为 0 时才接受 NULL。
///
/// # Safety
/// 非 NULL 的 `ptr` 在本次调用期间必须可读 `len` 字节。
unsafe fn input<'a>(ptr: *const u8, len: usize) -> Result<&'a [u8], PipelineError> {
    match (ptr.is_null(), len) {
        (_, 0) => Ok(&[]),
        (true, _) => Err(PipelineError::InvalidArgument("input pointer is NULL".to_string())),
        (false, _) => Ok(unsafe { slice::from_raw_parts(ptr, len) }),
    }
}

/// ### English
/// Mutable counterpart of [`input`].
///
/// # Safety
/// A non-null `ptr` must be valid for writes of `len` bytes for the duration of the call.
///
/// ### 中文
/// [`input`] 的可变版本。
///
/// # Safety
/// 非 NULL 的 `ptr` 在本次调用期间必须可写 `len` 字节。
unsafe fn output<'a>(ptr: *mut u8, len: usize) -> Result<&'a mut [u8], PipelineError> {
    match (ptr.is_null(), len) {
        (_, 0) => Ok(&mut []),
        (true, _) => Err(PipelineError::InvalidArgument("output pointer is NULL".to_string())),
        (false, _) => Ok(unsafe { slice::from_raw_parts_mut(ptr, len) }),
    }
}

#[unsafe(no_mangle)]
/// ### English
/// Overrides the ring capacities. Must be called before any other `frame_pipe_*` call that uses
/// the pipeline, and at most once.
///
/// Returns `1` on success, `0` if `config` is NULL or invalid, or the pipeline already exists.
///
/// ### 中文
/// 覆盖 ring 容量。必须在任何使用管线的 `frame_pipe_*` 调用之前调用，且最多调用一次。
///
/// 成功返回 `1`；`config` 为 NULL 或非法、或管线已存在时返回 `0`。
pub unsafe extern "C" fn frame_pipe_configure(config: *const FramePipeConfig) -> u8 {
    if config.is_null() {
        return 0;
    }
    let raw = unsafe { *config };
    let defaults = PipelineConfig::default();
    let config = PipelineConfig {
        encoder_ring_capacity: match raw.encoder_ring_capacity {
            0 => defaults.encoder_ring_capacity,
            n => n as usize,
        },
        submission_ring_capacity: match raw.submission_ring_capacity {
            0 => defaults.submission_ring_capacity,
            n => n as usize,
        },
    };

    if let Err(err) = config.validate() {
        errors::stage(0, &err);
        return 0;
    }
    if PIPE.get().is_some() || CONFIG.set(config).is_err() {
        warn!("frame_pipe_configure called after the pipeline was configured or built");
        return 0;
    }
    1
}

#[unsafe(no_mangle)]
/// ### English
/// Installs the host's `glGetProcAddress`. Texture calls fail with "no GL function loader
/// installed" until this is done. Call it with the host's GL context current.
///
/// Returns `1` on success.
///
/// ### 中文
/// 安装宿主的 `glGetProcAddress`。在此之前，纹理相关调用都会以“未安装 GL 加载函数”失败。
/// 调用时宿主的 GL 上下文必须为 current。
///
/// 成功返回 `1`。
pub unsafe extern "C" fn frame_pipe_install_gl_loader(loader: Option<GlProcLoader>) -> u8 {
    let Some(loader) = loader else {
        return 0;
    };
    unsafe { gl_device().install_loader(loader) };
    1
}

#[unsafe(no_mangle)]
/// ### English
/// Creates a synchronous encoder. Returns its handle, or `0` on failure (see
/// `frame_pipe_get_error(0)`).
///
/// ### 中文
/// 创建同步编码器。返回其句柄；失败返回 `0`（见 `frame_pipe_get_error(0)`）。
pub extern "C" fn frame_pipe_create_encoder(
    format: u32,
    codec: u32,
    compression: u32,
    bitrate: u64,
    target_fps: u32,
    width: u32,
    height: u32,
) -> u32 {
    call(0, 0, |pipe| {
        let params = encoder_params(format, codec, compression, bitrate, target_fps, width, height)?;
        Ok(pipe.create_encoder(params)?.get())
    })
}

#[unsafe(no_mangle)]
/// ### English
/// Creates an async texture encoder (RGBA32 only) with its own encode thread. Returns its handle,
/// or `0` on failure.
///
/// ### 中文
/// 创建带独立编码线程的异步纹理编码器（仅 RGBA32）。返回其句柄；失败返回 `0`。
pub extern "C" fn frame_pipe_create_texture_async_encoder(
    format: u32,
    codec: u32,
    compression: u32,
    bitrate: u64,
    target_fps: u32,
    width: u32,
    height: u32,
) -> u32 {
    call(0, 0, |pipe| {
        let params = encoder_params(format, codec, compression, bitrate, target_fps, width, height)?;
        Ok(pipe.create_async_texture_encoder(params)?.get())
    })
}

#[unsafe(no_mangle)]
/// ### English
/// Creates a decoder. Returns its handle, or `0` on failure.
///
/// ### 中文
/// 创建解码器。返回其句柄；失败返回 `0`。
pub extern "C" fn frame_pipe_create_decoder(
    format: u32,
    codec: u32,
    width: u32,
    height: u32,
) -> u32 {
    call(0, 0, |pipe| {
        let params = DecoderParams {
            format: Format::try_from(format)?,
            codec: Codec::try_from(codec)?,
            width,
            height,
        };
        Ok(pipe.create_decoder(params)?.get())
    })
}

fn encoder_params(
    format: u32,
    codec: u32,
    compression: u32,
    bitrate: u64,
    target_fps: u32,
    width: u32,
    height: u32,
) -> Result<EncoderParams, PipelineError> {
    Ok(EncoderParams {
        format: Format::try_from(format)?,
        codec: Codec::try_from(codec)?,
        compression: Compression::try_from(compression)?,
        bitrate,
        target_fps,
        width,
        height,
    })
}

#[unsafe(no_mangle)]
/// ### English
/// Destroys an instance. Idempotent, and safe while its tasks are still in flight: they complete
/// normally and the instance is freed when the last one is cleared.
///
/// ### 中文
/// 销毁实例。幂等，且在其任务仍在途时调用也是安全的：这些任务会正常完成，最后一个被清除时实例才释放。
pub extern "C" fn frame_pipe_destroy(handle_id: u32) {
    call(0, (), |pipe| {
        if let Ok(handle) = handle(handle_id) {
            pipe.destroy(handle);
        }
        Ok(())
    });
    if handle_id != 0 {
        errors::forget(handle_id);
    }
}

#[unsafe(no_mangle)]
/// ### English
/// Updates the bitrate of a synchronous encoder. Returns `1` on success.
///
/// ### 中文
/// 更新同步编码器的码率。成功返回 `1`。
pub extern "C" fn frame_pipe_set_bitrate(handle_id: u32, bitrate: u64, target_fps: u32) -> u8 {
    call(handle_id, 0, |pipe| {
        pipe.set_bitrate(handle(handle_id)?, bitrate, target_fps)?;
        Ok(1)
    })
}

#[unsafe(no_mangle)]
/// ### English
/// Encodes one host-memory frame into `dst`. Returns the number of bytes written, or `0` on
/// failure (see `frame_pipe_get_error(handle)`).
///
/// ### 中文
/// 把一帧主机内存编码到 `dst`。返回写入的字节数；失败返回 `0`（见 `frame_pipe_get_error(handle)`）。
pub unsafe extern "C" fn frame_pipe_encode(
    handle_id: u32,
    frame: *const FramePipeFrame,
    dst: *mut u8,
    dst_len: usize,
    force_iframe: u8,
) -> u64 {
    call(handle_id, 0, |pipe| {
        if frame.is_null() {
            return Err(PipelineError::InvalidArgument("frame is NULL".to_string()));
        }
        let frame = unsafe { *frame };
        let len = frame.pitch as usize * frame.height as usize;
        let data = unsafe { input(frame.data, len)? };
        let dst = unsafe { output(dst, dst_len)? };
        pipe.encode(
            handle(handle_id)?,
            FrameRef {
                data,
                pitch: frame.pitch as usize,
                width: frame.width,
                height: frame.height,
            },
            dst,
            force_iframe != 0,
        )
    })
}

#[unsafe(no_mangle)]
/// ### English
/// Reads a GL texture back and encodes it into `dst` (RGBA32 encoders only). `target = 0` means
/// `GL_TEXTURE_2D`. Must run with the host's GL context current.
///
/// ### 中文
/// 回读 GL 纹理并编码到 `dst`（仅 RGBA32 编码器）。`target = 0` 表示 `GL_TEXTURE_2D`。
/// 调用时宿主的 GL 上下文必须为 current。
pub unsafe extern "C" fn frame_pipe_encode_texture(
    handle_id: u32,
    texture_id: u32,
    target: u32,
    dst: *mut u8,
    dst_len: usize,
    width: u32,
    height: u32,
    force_iframe: u8,
) -> u64 {
    call(handle_id, 0, |pipe| {
        let dst = unsafe { output(dst, dst_len)? };
        pipe.encode_texture(
            handle(handle_id)?,
            texture_ref(texture_id, target),
            width,
            height,
            dst,
            force_iframe != 0,
        )
    })
}

#[unsafe(no_mangle)]
/// ### English
/// Decodes `src` into `dst`. Returns the number of bytes written, or `0` on failure.
///
/// ### 中文
/// 把 `src` 解码到 `dst`。返回写入的字节数；失败返回 `0`。
pub unsafe extern "C" fn frame_pipe_decode(
    handle_id: u32,
    src: *const u8,
    src_len: usize,
    dst: *mut u8,
    dst_len: usize,
    width: u32,
    height: u32,
) -> u64 {
    call(handle_id, 0, |pipe| {
        let src = unsafe { input(src, src_len)? };
        let dst = unsafe { output(dst, dst_len)? };
        pipe.decode(handle(handle_id)?, src, dst, width, height)
    })
}

#[unsafe(no_mangle)]
/// ### English
/// Decodes `src` and uploads the frame into a GL texture (RGBA32 decoders only).
///
/// ### 中文
/// 解码 `src` 并把帧上传到 GL 纹理（仅 RGBA32 解码器）。
pub unsafe extern "C" fn frame_pipe_decode_texture(
    handle_id: u32,
    src: *const u8,
    src_len: usize,
    texture_id: u32,
    target: u32,
    width: u32,
    height: u32,
) -> u64 {
    call(handle_id, 0, |pipe| {
        let src = unsafe { input(src, src_len)? };
        pipe.decode_texture(
            handle(handle_id)?,
            src,
            texture_ref(texture_id, target),
            width,
            height,
        )
    })
}
