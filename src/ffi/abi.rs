//! ### English
//! ABI version and the `#[repr(C)]` structs shared with the host.
//!
//! ### 中文
//! ABI 版本号以及与宿主共享的 `#[repr(C)]` 结构体。

use std::ffi::c_char;

/// ### English
/// C ABI version for `frame_pipe`.
///
/// ### 中文
/// `frame_pipe` 的 C ABI 版本号。
pub const FRAME_PIPE_ABI_VERSION: u32 = 1;

/// ### English
/// `frame_pipe_query_task` result: the id is outside the live window (or `0`).
///
/// ### 中文
/// `frame_pipe_query_task` 结果：id 不在有效窗口内（或为 `0`）。
pub const FRAME_PIPE_TASK_NOT_FOUND: u32 = 0;
pub const FRAME_PIPE_TASK_PENDING: u32 = 1;
pub const FRAME_PIPE_TASK_DONE: u32 = 2;
pub const FRAME_PIPE_TASK_FAILED: u32 = 3;

#[repr(C)]
#[derive(Clone, Copy, Debug)]
/// ### English
/// Ring sizes for `frame_pipe_configure`. `0` keeps the default for that ring.
///
/// ### 中文
/// `frame_pipe_configure` 使用的 ring 尺寸。`0` 表示该 ring 保持默认值。
pub struct FramePipeConfig {
    pub encoder_ring_capacity: u32,
    pub submission_ring_capacity: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug)]
/// ### English
/// Host-memory frame for `frame_pipe_encode`: `height` rows of `pitch` bytes at `data`.
///
/// ### 中文
/// `frame_pipe_encode` 使用的主机内存帧：`data` 处共 `height` 行、每行 `pitch` 字节。
pub struct FramePipeFrame {
    pub data: *const u8,
    pub pitch: u32,
    pub width: u32,
    pub height: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug)]
/// ### English
/// Output of `frame_pipe_query_task`.
///
/// ### 中文
/// `frame_pipe_query_task` 的输出。
pub struct FramePipeTaskStatus {
    /// ### English
    /// One of the `FRAME_PIPE_TASK_*` values (same as the function's return value).
    ///
    /// ### 中文
    /// `FRAME_PIPE_TASK_*` 之一（与函数返回值相同）。
    pub state: u32,
    /// ### English
    /// Encoded bytes when `state == DONE`, else NULL. Owned by the library; valid until the task
    /// is cleared.
    ///
    /// ### 中文
    /// `state == DONE` 时为编码字节，否则为 NULL。由本库持有；在任务被清除前有效。
    pub data: *const u8,
    pub size: u64,
    /// ### English
    /// NUL-terminated error text when `state == FAILED`, else NULL. Valid until the task is
    /// cleared.
    ///
    /// ### 中文
    /// `state == FAILED` 时为以 NUL 结尾的错误文本，否则为 NULL。在任务被清除前有效。
    pub error: *const c_char,
}

impl FramePipeTaskStatus {
    pub(super) const NOT_FOUND: Self = Self {
        state: FRAME_PIPE_TASK_NOT_FOUND,
        data: std::ptr::null(),
        size: 0,
        error: std::ptr::null(),
    };
}

#[unsafe(no_mangle)]
/// ### English
/// Returns the C ABI version.
///
/// ### 中文
/// 返回 C ABI 版本号。
pub extern "C" fn frame_pipe_abi_version() -> u32 {
    FRAME_PIPE_ABI_VERSION
}
