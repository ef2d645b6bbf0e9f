//! ### English
//! OpenGL texture device built on `glow`.
//!
//! The host owns the GL context; it only hands us `glGetProcAddress`. Every call assumes the
//! host's context is current on the calling thread (the render thread during polls).
//!
//! ### 中文
//! 基于 `glow` 的 OpenGL 纹理设备。
//!
//! GL 上下文由宿主持有，宿主只提供 `glGetProcAddress`。每次调用都假定宿主上下文在调用线程上
//! 为 current（轮询期间即渲染线程）。
use std::ffi::{CString, c_char, c_void};
use std::num::NonZeroU32;
use std::sync::Arc;

use glow::HasContext as _;
use parking_lot::RwLock;
use tracing::debug;

use super::{StagingBuffer, TextureDevice, TextureRef};
use crate::engine::error::GpuError;

/// ### English
/// Host-provided `glGetProcAddress`-style loader.
///
/// ### 中文
/// 宿主提供的 `glGetProcAddress` 风格加载函数。
pub type GlProcLoader = unsafe extern "C" fn(name: *const c_char) -> *const c_void;

/// ### English
/// Loaded GL function table.
///
/// SAFETY: the table only holds function pointers resolved once at install time; each call still
/// requires a current context on the calling thread, which is the host's contract.
///
/// ### 中文
/// 已加载的 GL 函数表。
///
/// SAFETY：该表只包含安装时解析好的函数指针；每次调用仍要求调用线程上存在 current 上下文，
/// 这是宿主的约定。
struct LoadedGl {
    context: glow::Context,
    /// `glGetTexLevelParameteriv`, which `glow` does not wrap.
    tex_level_parameter: Option<TexLevelParameteriv>,
}

unsafe impl Send for LoadedGl {}
unsafe impl Sync for LoadedGl {}

type TexLevelParameteriv =
    unsafe extern "system" fn(target: u32, level: i32, pname: u32, params: *mut i32);

impl LoadedGl {
    /// Level-0 size of `texture`, or `None` without `glGetTexLevelParameteriv`.
    unsafe fn level0_size(
        &self,
        texture: TextureRef,
        native: glow::NativeTexture,
    ) -> Option<(i32, i32)> {
        let query = self.tex_level_parameter?;
        let gl = &self.context;
        let (mut width, mut height) = (0, 0);
        unsafe {
            gl.bind_texture(texture.target, Some(native));
            query(texture.target, 0, glow::TEXTURE_WIDTH, &mut width);
            query(texture.target, 0, glow::TEXTURE_HEIGHT, &mut height);
            gl.bind_texture(texture.target, None);
        }
        Some((width, height))
    }
}

/// ### English
/// Rejects a readback of `width x height` from a texture whose level 0 is smaller.
///
/// ### 中文
/// 当纹理第 0 级小于 `width x height` 时拒绝回读。
fn check_level0(
    width: u32,
    height: u32,
    actual_width: i32,
    actual_height: i32,
) -> Result<(), GpuError> {
    let actual_width = u32::try_from(actual_width).unwrap_or(0);
    let actual_height = u32::try_from(actual_height).unwrap_or(0);
    if actual_width < width || actual_height < height {
        return Err(GpuError::SizeMismatch {
            width,
            height,
            actual_width,
            actual_height,
        });
    }
    Ok(())
}

/// ### English
/// [`TextureDevice`] that reads/writes host GL textures through a temporary read framebuffer.
///
/// ### 中文
/// 通过临时 read framebuffer 读写宿主 GL 纹理的 [`TextureDevice`]。
#[derive(Default)]
pub struct GlTextureDevice {
    gl: RwLock<Option<Arc<LoadedGl>>>,
}

impl GlTextureDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// ### English
    /// Resolves GL entry points through `loader`. Re-installing replaces the previous table.
    ///
    /// # Safety
    /// `loader` must return valid GL function pointers (or null) for the host's context.
    ///
    /// ### 中文
    /// 通过 `loader` 解析 GL 入口。重复安装会替换之前的函数表。
    ///
    /// # Safety
    /// `loader` 必须为宿主上下文返回有效的 GL 函数指针（或 null）。
    pub unsafe fn install_loader(&self, loader: GlProcLoader) {
        let context = unsafe {
            glow::Context::from_loader_function(|name| match CString::new(name) {
                Ok(name) => loader(name.as_ptr()),
                Err(_) => std::ptr::null(),
            })
        };
        let address = unsafe { loader(c"glGetTexLevelParameteriv".as_ptr()) };
        // SAFETY: a non-null address from the loader is the named GL entry point.
        let tex_level_parameter = (!address.is_null()).then(|| unsafe {
            std::mem::transmute::<*const c_void, TexLevelParameteriv>(address)
        });
        debug!(
            version = ?context.version(),
            level_query = tex_level_parameter.is_some(),
            "GL loader installed"
        );
        *self.gl.write() = Some(Arc::new(LoadedGl {
            context,
            tex_level_parameter,
        }));
    }

    pub fn is_installed(&self) -> bool {
        self.gl.read().is_some()
    }

    fn context(&self) -> Result<Arc<LoadedGl>, GpuError> {
        self.gl.read().clone().ok_or(GpuError::Unavailable)
    }
}

fn native_texture(texture: TextureRef) -> Result<glow::NativeTexture, GpuError> {
    NonZeroU32::new(texture.id)
        .map(glow::NativeTexture)
        .ok_or(GpuError::InvalidTexture(texture.id))
}

fn check_error(gl: &glow::Context) -> Result<(), GpuError> {
    match unsafe { gl.get_error() } {
        glow::NO_ERROR => Ok(()),
        code => Err(GpuError::Driver(code)),
    }
}

impl TextureDevice for GlTextureDevice {
    fn download(
        &self,
        texture: TextureRef,
        width: u32,
        height: u32,
        dst: &mut StagingBuffer,
    ) -> Result<(), GpuError> {
        let row_bytes = width as usize * 4;
        if row_bytes > dst.pitch() || height as usize > dst.rows() {
            return Err(GpuError::SizeMismatch {
                width: (dst.pitch() / 4) as u32,
                height: dst.rows() as u32,
                actual_width: width,
                actual_height: height,
            });
        }

        let loaded = self.context()?;
        let gl = &loaded.context;
        let native = native_texture(texture)?;
        let level0 = unsafe { loaded.level0_size(texture, native) };
        if let Some((actual_width, actual_height)) = level0 {
            check_error(gl)?;
            check_level0(width, height, actual_width, actual_height)?;
        }

        unsafe {
            let framebuffer = gl.create_framebuffer().map_err(|_| GpuError::Driver(0))?;
            gl.bind_framebuffer(glow::READ_FRAMEBUFFER, Some(framebuffer));
            gl.framebuffer_texture_2d(
                glow::READ_FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                texture.target,
                Some(native),
                0,
            );

            let status = gl.check_framebuffer_status(glow::READ_FRAMEBUFFER);
            let result = if status != glow::FRAMEBUFFER_COMPLETE {
                Err(GpuError::InvalidTexture(texture.id))
            } else {
                gl.pixel_store_i32(glow::PACK_ALIGNMENT, 4);
                gl.pixel_store_i32(glow::PACK_ROW_LENGTH, (dst.pitch() / 4) as i32);
                gl.read_pixels(
                    0,
                    0,
                    width as i32,
                    height as i32,
                    glow::RGBA,
                    glow::UNSIGNED_BYTE,
                    glow::PixelPackData::Slice(Some(dst.as_mut_slice())),
                );
                gl.pixel_store_i32(glow::PACK_ROW_LENGTH, 0);
                check_error(gl)
            };

            gl.bind_framebuffer(glow::READ_FRAMEBUFFER, None);
            gl.delete_framebuffer(framebuffer);
            result
        }
    }

    fn upload(
        &self,
        pixels: &[u8],
        texture: TextureRef,
        width: u32,
        height: u32,
    ) -> Result<(), GpuError> {
        let needed = width as usize * height as usize * 4;
        if pixels.len() < needed {
            return Err(GpuError::SizeMismatch {
                width,
                height,
                actual_width: width,
                actual_height: (pixels.len() / (width as usize * 4).max(1)) as u32,
            });
        }

        let loaded = self.context()?;
        let gl = &loaded.context;
        let native = native_texture(texture)?;

        unsafe {
            gl.bind_texture(texture.target, Some(native));
            gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            gl.tex_sub_image_2d(
                texture.target,
                0,
                0,
                0,
                width as i32,
                height as i32,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(Some(&pixels[..needed])),
            );
            let result = check_error(gl);
            gl.bind_texture(texture.target, None);
            result
        }
    }
}
