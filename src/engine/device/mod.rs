//! ### English
//! GPU texture transfer seam.
//!
//! The pipeline treats the GPU as an opaque "copy device resource into device buffer" operation.
//! [`GlTextureDevice`] implements it with `glow`; tests plug in their own device.
//!
//! ### 中文
//! GPU 纹理传输接口。
//!
//! 管线把 GPU 视为不透明的“把设备资源拷贝到设备缓冲”操作。[`GlTextureDevice`] 基于 `glow`
//! 实现；测试可替换为自定义设备。
mod gl;
mod staging;

pub use gl::{GlProcLoader, GlTextureDevice};
pub use staging::{STAGING_PITCH_ALIGN, StagingBuffer};

use super::error::GpuError;

/// ### English
/// `GL_TEXTURE_2D`, the only target the async path submits.
///
/// ### 中文
/// `GL_TEXTURE_2D`：异步路径唯一提交的纹理目标。
pub const TEXTURE_TARGET_2D: u32 = 0x0DE1;

/// ### English
/// A host texture reference (`GLuint` name + bind target).
///
/// ### 中文
/// 宿主纹理引用（`GLuint` 名称 + 绑定目标）。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureRef {
    pub id: u32,
    pub target: u32,
}

impl TextureRef {
    pub fn texture_2d(id: u32) -> Self {
        Self {
            id,
            target: TEXTURE_TARGET_2D,
        }
    }
}

/// ### English
/// Moves RGBA8 pixels between host textures and staging memory.
///
/// Calls happen on whichever thread owns the graphics context (caller or render thread) and must
/// complete synchronously: once `download` returns, the source texture may be rebound or freed.
///
/// ### 中文
/// 在宿主纹理与暂存内存之间搬运 RGBA8 像素。
///
/// 调用发生在持有图形上下文的线程（调用方或渲染线程）上，且必须同步完成：`download` 返回后，
/// 源纹理即可被重新绑定或释放。
pub trait TextureDevice: Send + Sync {
    /// ### English
    /// Copies `width x height` RGBA8 pixels of `texture` into `dst`, one row per `dst.pitch()`.
    ///
    /// ### 中文
    /// 把 `texture` 的 `width x height` 个 RGBA8 像素拷贝到 `dst`，每行占 `dst.pitch()` 字节。
    fn download(
        &self,
        texture: TextureRef,
        width: u32,
        height: u32,
        dst: &mut StagingBuffer,
    ) -> Result<(), GpuError>;

    /// ### English
    /// Uploads tightly packed RGBA8 `pixels` into `texture`.
    ///
    /// ### 中文
    /// 把紧密排列的 RGBA8 `pixels` 上传到 `texture`。
    fn upload(
        &self,
        pixels: &[u8],
        texture: TextureRef,
        width: u32,
        height: u32,
    ) -> Result<(), GpuError>;
}
