//! ### English
//! C ABI bindings for the async texture encode queue and the render-thread poll.
//!
//! A rejected enqueue is staged under its encoder handle; the other task-level calls use the global
//! slot (`frame_pipe_get_error(0)`). Failures of an individual encode are reported through
//! `frame_pipe_query_task`.
//!
//! ### 中文
//! 异步纹理编码队列与渲染线程轮询的 C ABI 绑定。
//!
//! 被拒绝的入队暂存在其编码器句柄下；其他任务级调用使用全局槽位（`frame_pipe_get_error(0)`）。
//! 单次编码的失败通过 `frame_pipe_query_task` 报告。

use tracing::trace;

use super::abi::{
    FRAME_PIPE_TASK_DONE, FRAME_PIPE_TASK_FAILED, FRAME_PIPE_TASK_NOT_FOUND,
    FRAME_PIPE_TASK_PENDING, FramePipeTaskStatus,
};
use super::{call, handle};
use crate::engine::device::TextureRef;
use crate::engine::error::PipelineError;
use crate::engine::submission::{EncodeRequest, TaskId, TaskView};

/// ### English
/// Render-event callback signature the host registers with its render loop.
///
/// ### 中文
/// 宿主注册到其渲染循环的渲染事件回调签名。
pub type FramePipeRenderEvent = extern "C" fn(event_id: i32);

fn task_id(raw: u32) -> Result<TaskId, PipelineError> {
    TaskId::new(raw).ok_or(PipelineError::InvalidTaskId(0))
}

#[unsafe(no_mangle)]
/// ### English
/// Queues an async encode of a `GL_TEXTURE_2D` texture. The GPU copy happens during the next
/// `frame_pipe_poll_render_thread`, so the texture must stay valid until then.
///
/// Returns a non-zero task id, or `0` if the handle is not an async texture encoder or the
/// submission ring is full (retry after clearing finished tasks). The reason is staged under
/// `handle_id` (see `frame_pipe_get_error`).
///
/// ### 中文
/// 排队一次 `GL_TEXTURE_2D` 纹理的异步编码。GPU 拷贝发生在下一次
/// `frame_pipe_poll_render_thread` 中，因此在此之前纹理必须保持有效。
///
/// 返回非 0 任务 id；若句柄不是异步纹理编码器或提交 ring 已满（清除已完成任务后重试），返回 `0`。
/// 原因暂存在 `handle_id` 下（见 `frame_pipe_get_error`）。
pub extern "C" fn frame_pipe_enqueue_texture_encode(
    handle_id: u32,
    texture_id: u32,
    width: u32,
    height: u32,
    force_iframe: u8,
) -> u32 {
    call(handle_id, 0, |pipe| {
        let request = EncodeRequest {
            texture: TextureRef::texture_2d(texture_id),
            width,
            height,
            force_iframe: force_iframe != 0,
        };
        Ok(pipe.enqueue_texture_encode(handle(handle_id)?, request)?.get())
    })
}

#[unsafe(no_mangle)]
/// ### English
/// Render-thread step: submits queued encodes and collects finished ones. Call exactly once per
/// rendered frame, on the render thread, with the GL context current. `event_id` is ignored.
///
/// ### 中文
/// 渲染线程步骤：提交排队中的编码并收集已完成的编码。每渲染一帧在渲染线程上调用一次，
/// 且 GL 上下文必须为 current。`event_id` 会被忽略。
pub extern "C" fn frame_pipe_poll_render_thread(event_id: i32) {
    call(0, (), |pipe| {
        let stats = pipe.poll_render_thread();
        trace!(event_id, ?stats, "render event");
        Ok(())
    });
}

#[unsafe(no_mangle)]
/// ### English
/// Returns `frame_pipe_poll_render_thread` as a callback for hosts that register render events by
/// function pointer.
///
/// ### 中文
/// 以回调形式返回 `frame_pipe_poll_render_thread`，供通过函数指针注册渲染事件的宿主使用。
pub extern "C" fn frame_pipe_get_render_thread_poll_func() -> FramePipeRenderEvent {
    frame_pipe_poll_render_thread
}

#[unsafe(no_mangle)]
/// ### English
/// Reports the state of `task_id` and fills `status` (if non-NULL). Returns the same
/// `FRAME_PIPE_TASK_*` value as `status.state`.
///
/// `data` and `error` point into library-owned memory and stay valid until the task is cleared.
///
/// ### 中文
/// 报告 `task_id` 的状态并填写 `status`（若非 NULL）。返回值与 `status.state` 相同，为
/// `FRAME_PIPE_TASK_*` 之一。
///
/// `data` 与 `error` 指向本库持有的内存，在任务被清除前一直有效。
pub unsafe extern "C" fn frame_pipe_query_task(
    task_id_raw: u32,
    status: *mut FramePipeTaskStatus,
) -> u32 {
    let result = call(0, FramePipeTaskStatus::NOT_FOUND, |pipe| {
        pipe.inspect_task(task_id(task_id_raw)?, |view| match view {
            TaskView::Pending => FramePipeTaskStatus {
                state: FRAME_PIPE_TASK_PENDING,
                ..FramePipeTaskStatus::NOT_FOUND
            },
            TaskView::Encoded(bytes) => FramePipeTaskStatus {
                state: FRAME_PIPE_TASK_DONE,
                data: bytes.as_ptr(),
                size: bytes.len() as u64,
                error: std::ptr::null(),
            },
            TaskView::Failed { message, .. } => FramePipeTaskStatus {
                state: FRAME_PIPE_TASK_FAILED,
                error: message.map_or(std::ptr::null(), |message| message.as_ptr()),
                ..FramePipeTaskStatus::NOT_FOUND
            },
        })
    });

    if !status.is_null() {
        unsafe { status.write(result) };
    }
    debug_assert!(result.state <= FRAME_PIPE_TASK_FAILED);
    if result.state == FRAME_PIPE_TASK_NOT_FOUND {
        trace!(task = task_id_raw, "task not found");
    }
    result.state
}

#[unsafe(no_mangle)]
/// ### English
/// Releases a finished task. Must be called exactly once per task, oldest first; anything else is
/// rejected, logged, and returns `0`.
///
/// ### 中文
/// 释放已完成的任务。每个任务必须恰好调用一次，且从最旧的开始；否则会被拒绝、记录日志并返回 `0`。
pub extern "C" fn frame_pipe_clear_task(task_id_raw: u32) -> u8 {
    call(0, 0, |pipe| {
        pipe.clear_task(task_id(task_id_raw)?)?;
        Ok(1)
    })
}

#[unsafe(no_mangle)]
/// ### English
/// Drops every queued and unread task and rewinds the task ids. Work already handed to an encoder
/// is finished and discarded in the background by later polls. Returns `1` on success.
///
/// ### 中文
/// 丢弃所有排队中与未读取的任务，并回绕任务 id。已交给编码器的工作会由后续轮询在后台完成并丢弃。
/// 成功返回 `1`。
pub extern "C" fn frame_pipe_reset_encode_tasks() -> u8 {
    call(0, 0, |pipe| {
        pipe.reset_encode_tasks()?;
        Ok(1)
    })
}
