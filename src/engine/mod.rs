//! ### English
//! Engine internals: rings, encode thread, instances and the collaborator seams.
//!
//! ### 中文
//! 引擎内部实现：ring、编码线程、实例以及外部协作者接口。
pub mod async_encoder;
pub(crate) mod cache;
pub mod codec;
pub mod config;
pub mod device;
pub mod error;
pub mod instance;
pub(crate) mod lockfree;
pub mod pipe;
pub mod registry;
pub mod submission;

#[cfg(test)]
pub(crate) mod test_support;

pub use async_encoder::{AsyncTextureEncoder, TaskState};
pub use pipe::FramePipe;
