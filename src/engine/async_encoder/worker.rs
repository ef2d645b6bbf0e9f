//! ### English
//! Encode thread main loop.
//!
//! The thread owns the codec session. It drains `[encoded, pending)` in order, spins briefly when
//! the ring is empty, then parks until the producer unparks it. Wakeups are coalesced through
//! `wake_pending` so a burst of enqueues costs at most one `unpark`.
//!
//! ### 中文
//! 编码线程主循环。
//!
//! 该线程持有编解码会话。它按顺序处理 `[encoded, pending)`，ring 为空时先短暂自旋，然后 park，
//! 直到生产者 unpark。唤醒通过 `wake_pending` 合并，一连串入队最多只触发一次 `unpark`。

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread;

use tracing::{debug, trace, warn};

use super::EncoderShared;
use super::slot::TaskOutcome;
use crate::engine::codec::{FrameEncoder, FrameRef};
use crate::engine::error::{CodecError, PipelineError};
use crate::engine::lockfree::Backoff;

pub(super) fn run_encode_thread(shared: Arc<EncoderShared>, mut encoder: Box<dyn FrameEncoder>) {
    debug!("encode thread running");
    let mut backoff = Backoff::new();

    loop {
        if shared.closed.load(Ordering::Acquire) {
            break;
        }

        let encoded = shared.encoded.load_owned();
        if encoded != shared.pending.load() {
            backoff.reset();
            encode_slot(&shared, encoder.as_mut(), encoded);
            shared.encoded.advance(shared.capacity);
            continue;
        }

        if !backoff.is_completed() {
            backoff.snooze();
            continue;
        }

        // Clear the wake flag before the final check: an enqueue that lands after this swap sees
        // the flag down and unparks us, and one that landed before it is visible below.
        shared.wake_pending.swap(false, Ordering::AcqRel);
        if encoded != shared.pending.load() || shared.closed.load(Ordering::Acquire) {
            continue;
        }
        thread::park();
    }

    debug!("encode thread exiting");
}

fn encode_slot(shared: &EncoderShared, encoder: &mut dyn FrameEncoder, index: usize) {
    // SAFETY: `index` is in `[encoded, pending)`, which only the encode thread touches until
    // `encoded` advances.
    let data = unsafe { shared.slots[index].data_mut() };
    let task = &mut data.task;
    let frame = FrameRef {
        data: data.staging.as_slice(),
        pitch: data.staging.pitch(),
        width: task.width,
        height: task.height,
    };
    let output = &mut data.output[..];
    let available = output.len();

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        encoder.encode(frame, output, task.force_iframe)
    }))
    .unwrap_or_else(|_| Err(CodecError::Failed("codec panicked".to_string())));

    task.outcome = match result {
        Ok(size) if size as usize <= available => {
            trace!(index, size, "frame encoded");
            TaskOutcome::Encoded { size }
        }
        Ok(size) => {
            warn!(index, size, available, "codec reported more bytes than it was given");
            TaskOutcome::Failed(PipelineError::Codec(CodecError::Failed(format!(
                "codec reported {size} bytes for a {available} byte buffer"
            ))))
        }
        Err(err) => {
            warn!(index, error = %err, "frame encode failed");
            TaskOutcome::Failed(err.into())
        }
    };
}
