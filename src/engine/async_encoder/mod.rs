//! ### English
//! Async texture encoder: a bounded ring of GPU-download + encode slots drained by one background
//! thread.
//!
//! Three cursors partition the ring (capacity `N`, default 3):
//!
//! - `[cleared, encoded)`: encoded (or failed) and waiting for the client to read and clear.
//! - `[encoded, pending)`: downloaded and waiting for the encode thread.
//! - everything else: free.
//!
//! `pending` is written only by the producer ([`AsyncTextureEncoder::enqueue`]), `encoded` only by
//! the encode thread, `cleared` only by the client ([`AsyncTextureEncoder::clear_task`]). The ring
//! holds at most `N - 1` tasks: it is full when advancing `pending` would land on `cleared`.
//!
//! ### 中文
//! 异步纹理编码器：由一个后台线程消费的“GPU 下载 + 编码”有界 ring。
//!
//! 三个游标划分 ring（容量 `N`，默认 3）：
//!
//! - `[cleared, encoded)`：已编码（或失败），等待客户端读取并清除；
//! - `[encoded, pending)`：已下载，等待编码线程处理；
//! - 其余：空闲。
//!
//! `pending` 只由生产者（[`AsyncTextureEncoder::enqueue`]）写入，`encoded` 只由编码线程写入，
//! `cleared` 只由客户端（[`AsyncTextureEncoder::clear_task`]）写入。ring 最多容纳 `N - 1` 个任务：
//! 当推进 `pending` 会与 `cleared` 重合时即为已满。
mod enqueue;
mod query;
mod slot;
mod worker;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use tracing::{debug, warn};

use super::codec::FrameEncoder;
use super::config::{EncoderParams, Format};
use super::device::TextureDevice;
use super::error::{CodecError, PipelineError, ProtocolViolation};
use super::lockfree::{RingCursor, RoleFlag, RoleGuard, in_range, span_len};
use slot::EncodeSlot;

/// ### English
/// Status of one encoder ring task as seen by the client.
///
/// ### 中文
/// 客户端视角下单个编码 ring 任务的状态。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Encoded { size: u64 },
    Failed(PipelineError),
}

/// ### English
/// Phase of a slot index, derived from the cursors.
///
/// ### 中文
/// 由游标推导出的槽位阶段。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SlotPhase {
    Free,
    Pending,
    Done,
}

pub(super) struct EncoderShared {
    pending: RingCursor,
    encoded: RingCursor,
    cleared: RingCursor,
    slots: Box<[EncodeSlot]>,
    capacity: usize,
    width: u32,
    height: u32,
    device: Arc<dyn TextureDevice>,
    producer: RoleFlag,
    client: RoleFlag,
    closed: AtomicBool,
    wake_pending: AtomicBool,
}

impl EncoderShared {
    /// ### English
    /// Classifies `index`. `encoded` is loaded before `pending` so the snapshot never shows
    /// `encoded` ahead of `pending`.
    ///
    /// ### 中文
    /// 判定 `index` 所处阶段。先读 `encoded` 再读 `pending`，保证快照中 `encoded` 不会越过 `pending`。
    fn phase(&self, index: usize) -> SlotPhase {
        if index >= self.capacity {
            return SlotPhase::Free;
        }
        let cleared = self.cleared.load();
        let encoded = self.encoded.load();
        let pending = self.pending.load();
        if in_range(cleared, encoded, index) {
            SlotPhase::Done
        } else if in_range(encoded, pending, index) {
            SlotPhase::Pending
        } else {
            SlotPhase::Free
        }
    }
}

/// ### English
/// One async texture encoder instance and its encode thread.
///
/// Dropping it stops the thread (after the frame currently being encoded, if any) and joins it.
///
/// ### 中文
/// 单个异步纹理编码器实例及其编码线程。
///
/// drop 时会停止线程（若正在编码则等当前帧完成）并 join。
pub struct AsyncTextureEncoder {
    shared: Arc<EncoderShared>,
    worker: Option<thread::JoinHandle<()>>,
    worker_thread: thread::Thread,
}

impl AsyncTextureEncoder {
    /// ### English
    /// Allocates `capacity` slots sized for `params` and starts the encode thread, which takes
    /// ownership of `encoder`.
    ///
    /// Only [`Format::Rgba32`] is accepted: textures are always read back as RGBA8.
    ///
    /// ### 中文
    /// 按 `params` 分配 `capacity` 个槽位并启动编码线程，`encoder` 的所有权转交给该线程。
    ///
    /// 只接受 [`Format::Rgba32`]：纹理总是以 RGBA8 读回。
    pub fn new(
        params: &EncoderParams,
        capacity: usize,
        encoder: Box<dyn FrameEncoder>,
        device: Arc<dyn TextureDevice>,
    ) -> Result<Self, PipelineError> {
        params.validate()?;
        if params.format != Format::Rgba32 {
            return Err(CodecError::Unsupported(format!(
                "texture encoding only supports RGBA32, got {:?}",
                params.format
            ))
            .into());
        }
        if capacity < 2 {
            return Err(PipelineError::InvalidArgument(format!(
                "encoder ring capacity must be at least 2, got {capacity}"
            )));
        }

        let row_bytes = params.format.row_bytes(params.width);
        let output_len = params.format.frame_bytes(params.width, params.height);
        let (Some(row_bytes), Some(output_len)) = (row_bytes, output_len) else {
            return Err(PipelineError::InvalidArgument(format!(
                "frame size {}x{} is too large",
                params.width, params.height
            )));
        };
        let rows = params.height as usize;
        let slots = (0..capacity)
            .map(|_| EncodeSlot::new(row_bytes, rows, output_len))
            .collect();

        let shared = Arc::new(EncoderShared {
            pending: RingCursor::new(),
            encoded: RingCursor::new(),
            cleared: RingCursor::new(),
            slots,
            capacity,
            width: params.width,
            height: params.height,
            device,
            producer: RoleFlag::new(),
            client: RoleFlag::new(),
            closed: AtomicBool::new(false),
            wake_pending: AtomicBool::new(false),
        });

        let thread_shared = shared.clone();
        let worker = thread::Builder::new()
            .name("frame-pipe-encode".to_string())
            .spawn(move || worker::run_encode_thread(thread_shared, encoder))
            .map_err(|err| PipelineError::Thread(err.to_string()))?;
        let worker_thread = worker.thread().clone();

        debug!(
            width = params.width,
            height = params.height,
            capacity,
            "async texture encoder started"
        );

        Ok(Self {
            shared,
            worker: Some(worker),
            worker_thread,
        })
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    pub fn size(&self) -> (u32, u32) {
        (self.shared.width, self.shared.height)
    }

    /// ### English
    /// Number of tasks between `cleared` and `pending` (queued, encoding or awaiting clear).
    ///
    /// ### 中文
    /// `cleared` 与 `pending` 之间的任务数（排队、编码中或等待清除）。
    pub fn in_flight(&self) -> usize {
        span_len(
            self.shared.cleared.load(),
            self.shared.pending.load(),
            self.shared.capacity,
        )
    }

    fn wake_worker(&self) {
        if !self.shared.wake_pending.swap(true, Ordering::AcqRel) {
            self.worker_thread.unpark();
        }
    }

    fn enter_client(&self) -> Result<RoleGuard<'_>, PipelineError> {
        self.shared.client.try_enter().ok_or_else(|| {
            ProtocolViolation::ConcurrentAccess {
                role: "encoder client",
            }
            .report()
        })
    }

    fn enter_producer(&self) -> Result<RoleGuard<'_>, PipelineError> {
        self.shared.producer.try_enter().ok_or_else(|| {
            ProtocolViolation::ConcurrentAccess {
                role: "encoder producer",
            }
            .report()
        })
    }
}

impl Drop for AsyncTextureEncoder {
    fn drop(&mut self) {
        self.shared.closed.store(true, Ordering::Release);
        self.worker_thread.unpark();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("encode thread panicked");
            }
        }
        debug!("async texture encoder stopped");
    }
}
