//! Device abstraction.
//!
//! Everything that touches the graphics device funnels through the
//! [`Visitor`] trait, so the rest of the crate stays testable without a
//! context. The OpenGL implementation lives under [`gl`], and [`headless`]
//! provides a no-op stand-in.

use crate::errors::Result;
use crate::math::Vector2;
use crate::program::ProgramHandle;
use crate::texture::{TextureHandle, TextureParams};
use crate::uniforms::UniformVariable;
use crate::utils::color::Color;

pub mod headless;
mod utils;

#[cfg(not(target_arch = "wasm32"))]
pub mod gl;

/// The device operations a canvas needs. Methods are unsafe since most
/// implementations require a current context on the calling thread.
pub trait Visitor {
    unsafe fn compile_program(
        &mut self,
        handle: ProgramHandle,
        vs: &str,
        fs: &str,
    ) -> Result<()>;

    unsafe fn delete_program(&mut self, handle: ProgramHandle);

    unsafe fn uniform_location(
        &mut self,
        handle: ProgramHandle,
        name: &str,
    ) -> Result<Option<i32>>;

    unsafe fn attribute_location(
        &mut self,
        handle: ProgramHandle,
        name: &str,
    ) -> Result<Option<i32>>;

    unsafe fn bind_uniform(
        &mut self,
        handle: ProgramHandle,
        location: i32,
        var: &UniformVariable,
    ) -> Result<()>;

    unsafe fn create_texture(
        &mut self,
        handle: TextureHandle,
        params: TextureParams,
        data: Option<&[u8]>,
    ) -> Result<()>;

    unsafe fn update_texture(
        &mut self,
        handle: TextureHandle,
        params: TextureParams,
        data: &[u8],
    ) -> Result<()>;

    unsafe fn delete_texture(&mut self, handle: TextureHandle);

    unsafe fn bind_texture(&mut self, unit: usize, handle: TextureHandle) -> Result<()>;

    unsafe fn set_viewport(&mut self, dimensions: Vector2<u32>);

    unsafe fn clear(&mut self, color: Color);

    unsafe fn draw(&mut self, handle: ProgramHandle) -> Result<()>;

    unsafe fn flush(&mut self) -> Result<()>;
}

/// Creates the OpenGL visitor. The caller must have made a context current
/// on this thread and loaded the function pointers via [`gl::load_with`].
#[cfg(not(target_arch = "wasm32"))]
pub fn new() -> Result<Box<dyn Visitor>> {
    let visitor = unsafe { gl::visitor::GLVisitor::new()? };
    Ok(Box::new(visitor))
}

/// Creates a visitor that accepts every call and draws nothing.
pub fn new_headless() -> Box<dyn Visitor> {
    Box::new(headless::HeadlessVisitor::new())
}
