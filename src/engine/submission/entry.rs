use std::cell::UnsafeCell;
use std::ffi::CString;
use std::sync::Arc;

use tracing::{trace, warn};

use crate::engine::device::TextureRef;
use crate::engine::error::{InstanceRole, PipelineError, ProtocolViolation};
use crate::engine::instance::Instance;

/// ### English
/// One texture encode request as submitted by the caller.
///
/// ### 中文
/// 调用方提交的一次纹理编码请求。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncodeRequest {
    pub texture: TextureRef,
    pub width: u32,
    pub height: u32,
    pub force_iframe: bool,
}

impl EncodeRequest {
    const NONE: Self = Self {
        texture: TextureRef { id: 0, target: 0 },
        width: 0,
        height: 0,
        force_iframe: false,
    };
}

/// ### English
/// Explicit lifecycle of an entry. The cursors decide who may look at it; this tag records what
/// the render thread has done with it.
///
/// ### 中文
/// 条目的显式生命周期。游标决定谁可以访问它；此标签记录渲染线程对它做过什么。
#[derive(Debug)]
pub(super) enum EntryState {
    Empty,
    Queued,
    Submitted { encoder_task: usize },
    Done(Result<u64, PipelineError>),
}

pub(super) struct Entry {
    pub(super) instance: Option<Arc<Instance>>,
    pub(super) request: EncodeRequest,
    pub(super) state: EntryState,
    /// ### English
    /// Encoded bytes copied out of the encoder slot. Reused across tasks.
    ///
    /// ### 中文
    /// 从编码槽位拷出的编码字节，跨任务复用。
    pub(super) result: Vec<u8>,
    /// ### English
    /// NUL-terminated error text for the C boundary, set together with a failed `Done`.
    ///
    /// ### 中文
    /// 供 C 边界使用的以 NUL 结尾的错误文本，与失败的 `Done` 一同设置。
    pub(super) message: Option<CString>,
}

impl Entry {
    pub(super) fn load(&mut self, instance: Arc<Instance>, request: EncodeRequest) {
        self.instance = Some(instance);
        self.request = request;
        self.state = EntryState::Queued;
        self.result.clear();
        self.message = None;
    }

    /// ### English
    /// Drops the instance reference and forgets the task; the result buffer keeps its capacity.
    ///
    /// ### 中文
    /// 丢弃实例引用并清空任务；结果缓冲保留其容量。
    pub(super) fn reset(&mut self) {
        self.instance = None;
        self.request = EncodeRequest::NONE;
        self.state = EntryState::Empty;
        self.result.clear();
        self.message = None;
    }

    fn finish(&mut self, result: Result<u64, PipelineError>) {
        if let Err(err) = &result {
            self.message = CString::new(err.to_string()).ok();
        }
        self.state = EntryState::Done(result);
    }

    /// ### English
    /// Submit phase: hands the request to the instance's encoder ring. Any rejection, including a
    /// full encoder ring, finishes the entry with that error.
    ///
    /// ### 中文
    /// 提交阶段：把请求交给实例的编码 ring。任何拒绝（包括编码 ring 已满）都会以该错误结束此条目。
    pub(super) fn submit(&mut self, slot: usize) {
        let request = self.request;
        let outcome = match self.instance.as_deref() {
            Some(instance) => match instance.as_async_texture_encoder() {
                Some(encoder) => encoder.enqueue(
                    request.texture,
                    request.width,
                    request.height,
                    request.force_iframe,
                ),
                None => Err(PipelineError::WrongInstanceKind {
                    handle: 0,
                    expected: InstanceRole::AsyncTextureEncoder,
                }),
            },
            None => Err(PipelineError::InvalidHandle(0)),
        };

        match outcome {
            Ok(encoder_task) => {
                trace!(slot, encoder_task, "submission handed to encoder");
                self.state = EntryState::Submitted { encoder_task };
            }
            Err(err) => {
                warn!(slot, error = %err, "submission failed");
                self.finish(Err(err));
            }
        }
    }

    /// ### English
    /// Completion phase: returns `true` once the entry is done. Encoded bytes are copied into
    /// `result` and the encoder slot is cleared right away.
    ///
    /// ### 中文
    /// 完成阶段：条目完成后返回 `true`。编码字节被拷贝到 `result`，并立即清除编码槽位。
    pub(super) fn try_complete(&mut self, slot: usize) -> bool {
        let encoder_task = match self.state {
            EntryState::Done(_) => return true,
            EntryState::Submitted { encoder_task } => encoder_task,
            EntryState::Empty | EntryState::Queued => return false,
        };
        let Some(encoder) = self
            .instance
            .as_deref()
            .and_then(Instance::as_async_texture_encoder)
        else {
            self.finish(Err(PipelineError::InvalidHandle(0)));
            return true;
        };

        // Query, read and clear must share one hold of the client role.
        let result = match encoder.take_done(encoder_task, &mut self.result) {
            Ok(None) => return false,
            Err(PipelineError::Protocol(ProtocolViolation::ConcurrentAccess { .. })) => {
                return false;
            }
            Ok(Some(outcome)) => outcome,
            Err(err) => Err(err),
        };

        match &result {
            Ok(size) => trace!(slot, encoder_task, size, "submission done"),
            Err(err) => warn!(slot, encoder_task, error = %err, "submission failed"),
        }
        self.finish(result);
        true
    }
}

pub(super) struct EntryCell {
    cell: UnsafeCell<Entry>,
}

// SAFETY: the cursors hand each entry to exactly one role at a time, with Release/Acquire on the
// cursor that transfers it.
unsafe impl Sync for EntryCell {}

impl EntryCell {
    pub(super) fn new() -> Self {
        Self {
            cell: UnsafeCell::new(Entry {
                instance: None,
                request: EncodeRequest::NONE,
                state: EntryState::Empty,
                result: Vec::new(),
                message: None,
            }),
        }
    }

    /// # Safety
    /// The caller's role must own this entry and no `get_mut` borrow of it may be live.
    #[inline]
    pub(super) unsafe fn get(&self) -> &Entry {
        unsafe { &*self.cell.get() }
    }

    /// # Safety
    /// The caller's role must own this entry.
    #[inline]
    #[allow(clippy::mut_from_ref)]
    pub(super) unsafe fn get_mut(&self) -> &mut Entry {
        unsafe { &mut *self.cell.get() }
    }
}
