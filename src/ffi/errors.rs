//! ### English
//! Sticky error strings for the C boundary.
//!
//! Each handle has at most one staged message; handle `0` is the global slot used before an
//! instance exists (failed creation) and for task-level calls. A returned pointer stays valid until
//! the same slot is overwritten or cleared.
//!
//! ### 中文
//! C 边界使用的粘性错误字符串。
//!
//! 每个句柄最多暂存一条消息；句柄 `0` 是全局槽位，用于实例尚不存在时（创建失败）以及任务级调用。
//! 返回的指针在同一槽位被覆盖或清除之前一直有效。

use std::collections::HashMap;
use std::ffi::{CString, c_char};
use std::sync::OnceLock;

use parking_lot::Mutex;
use tracing::debug;

use crate::engine::error::PipelineError;

type ErrorSlots = HashMap<u32, CString>;

static ERRORS: OnceLock<Mutex<ErrorSlots>> = OnceLock::new();

fn slots() -> &'static Mutex<ErrorSlots> {
    ERRORS.get_or_init(|| Mutex::new(HashMap::new()))
}

pub(super) fn stage(handle: u32, err: &PipelineError) {
    debug!(handle, error = %err, "call failed");
    // Display output never contains NUL, except through caller-supplied text.
    let message = CString::new(err.to_string())
        .unwrap_or_else(|_| CString::from(c"error message contained NUL"));
    slots().lock().insert(handle, message);
}

pub(super) fn forget(handle: u32) {
    slots().lock().remove(&handle);
}

#[unsafe(no_mangle)]
/// ### English
/// Returns the sticky error of `handle` (`0` = global), or NULL if none is staged.
///
/// The string is NUL-terminated UTF-8 owned by this library; it stays valid until the next failure
/// on the same slot, `frame_pipe_clear_error`, or `frame_pipe_destroy` of that handle.
///
/// ### 中文
/// 返回 `handle`（`0` 表示全局）的粘性错误；没有则返回 NULL。
///
/// 该字符串为本库持有的、以 NUL 结尾的 UTF-8；在同一槽位下一次失败、`frame_pipe_clear_error`
/// 或对该句柄调用 `frame_pipe_destroy` 之前一直有效。
pub extern "C" fn frame_pipe_get_error(handle: u32) -> *const c_char {
    slots()
        .lock()
        .get(&handle)
        .map_or(std::ptr::null(), |message| message.as_ptr())
}

#[unsafe(no_mangle)]
/// ### English
/// Clears the sticky error of `handle` (`0` = global).
///
/// ### 中文
/// 清除 `handle`（`0` 表示全局）的粘性错误。
pub extern "C" fn frame_pipe_clear_error(handle: u32) {
    forget(handle);
}
