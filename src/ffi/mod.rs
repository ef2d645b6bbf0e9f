//! ### English
//! C ABI surface for `frame_pipe`.
//!
//! All exported symbols are `extern "C"` functions; structs are `#[repr(C)]`. The boundary speaks
//! in handles (`u32`, `0` = none) and task ids (`u32`, `0` = rejected); nothing owned crosses it.
//! Failures never unwind into the host: every call returns a sentinel and stages the message as a
//! sticky error readable through `frame_pipe_get_error`.
//!
//! One process-wide [`FramePipe`] backs the ABI. It is built on first use from the configuration
//! given to `frame_pipe_configure` (or the defaults), with the built-in passthrough codec and the GL
//! texture device.
//!
//! ### 中文
//! `frame_pipe` 的 C ABI 接口层。
//!
//! 所有导出符号均为 `extern "C"` 函数；结构体使用 `#[repr(C)]`。边界只使用句柄（`u32`，`0` 表示无）
//! 与任务 id（`u32`，`0` 表示被拒绝），不会有任何带所有权的对象跨越边界。失败永远不会 unwind 到宿主：
//! 每个调用返回哨兵值，并把错误消息暂存为可通过 `frame_pipe_get_error` 读取的粘性错误。
//!
//! ABI 背后是一个进程级的 [`FramePipe`]。它在首次使用时，根据 `frame_pipe_configure` 提供的配置
//! （或默认值）、内置直通编解码器与 GL 纹理设备构建。
mod abi;
mod errors;
mod pipe;
mod task;

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};

use tracing::error;

use crate::engine::FramePipe;
use crate::engine::codec::PassthroughBackend;
use crate::engine::config::PipelineConfig;
use crate::engine::device::GlTextureDevice;
use crate::engine::error::PipelineError;
use crate::engine::registry::Handle;

/// ### English
/// Ring sizes requested by `frame_pipe_configure`; read once when the pipe is built.
///
/// ### 中文
/// `frame_pipe_configure` 请求的 ring 尺寸；仅在构建管线时读取一次。
static CONFIG: OnceLock<PipelineConfig> = OnceLock::new();

static PIPE: OnceLock<Option<FramePipe>> = OnceLock::new();

static GL_DEVICE: OnceLock<Arc<GlTextureDevice>> = OnceLock::new();

fn gl_device() -> &'static Arc<GlTextureDevice> {
    GL_DEVICE.get_or_init(|| Arc::new(GlTextureDevice::new()))
}

/// ### English
/// Returns the process-wide pipe, building it on first use.
///
/// ### 中文
/// 返回进程级管线，首次使用时构建。
fn pipe() -> Result<&'static FramePipe, PipelineError> {
    PIPE.get_or_init(|| {
        let config = CONFIG.get().copied().unwrap_or_default();
        match FramePipe::new(config, Arc::new(PassthroughBackend), gl_device().clone()) {
            Ok(pipe) => Some(pipe),
            Err(err) => {
                error!(error = %err, "failed to build the frame pipe");
                None
            }
        }
    })
    .as_ref()
    .ok_or_else(|| PipelineError::InvalidArgument("frame pipe is unavailable".to_string()))
}

fn handle(raw: u32) -> Result<Handle, PipelineError> {
    Handle::new(raw).ok_or(PipelineError::InvalidHandle(raw))
}

/// ### English
/// Error slot for a failure reported against `raw`: the handle itself while it is registered,
/// otherwise the global slot.
///
/// ### 中文
/// 针对 `raw` 报告的失败所使用的错误槽位：句柄已注册时为该句柄本身，否则为全局槽位。
fn route_error_slot(raw: u32) -> u32 {
    let registered = PIPE
        .get()
        .and_then(Option::as_ref)
        .zip(Handle::new(raw))
        .is_some_and(|(pipe, handle)| pipe.instance(handle).is_ok());
    if registered { raw } else { 0 }
}

/// ### English
/// Runs one ABI call against the pipe.
///
/// On failure (including a panic) the error is staged under `error_slot` if that handle is
/// registered, or under the global slot `0` otherwise, and `fallback` is returned.
///
/// ### 中文
/// 针对管线执行一次 ABI 调用。
///
/// 失败（包括 panic）时，若 `error_slot` 是已注册的句柄，错误暂存到该槽位，否则暂存到全局槽位 `0`；
/// 然后返回 `fallback`。
fn call<T>(
    error_slot: u32,
    fallback: T,
    f: impl FnOnce(&'static FramePipe) -> Result<T, PipelineError>,
) -> T {
    let result = panic::catch_unwind(AssertUnwindSafe(|| f(pipe()?)))
        .unwrap_or_else(|_| Err(PipelineError::InvalidArgument("internal panic".to_string())));
    match result {
        Ok(value) => value,
        Err(err) => {
            errors::stage(route_error_slot(error_slot), &err);
            fallback
        }
    }
}
