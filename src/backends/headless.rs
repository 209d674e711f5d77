//! A visitor that draws nothing. Used in tests and on machines without a
//! usable context.

use crate::errors::Result;
use crate::math::Vector2;
use crate::program::ProgramHandle;
use crate::texture::{TextureHandle, TextureParams};
use crate::uniforms::UniformVariable;
use crate::utils::color::Color;

use super::Visitor;

#[derive(Default)]
pub struct HeadlessVisitor {}

impl HeadlessVisitor {
    pub fn new() -> Self {
        HeadlessVisitor {}
    }
}

impl Visitor for HeadlessVisitor {
    unsafe fn compile_program(
        &mut self,
        _: ProgramHandle,
        _: &str,
        _: &str,
    ) -> Result<()> {
        Ok(())
    }

    unsafe fn delete_program(&mut self, _: ProgramHandle) {}

    unsafe fn uniform_location(&mut self, _: ProgramHandle, _: &str) -> Result<Option<i32>> {
        Ok(Some(0))
    }

    unsafe fn attribute_location(&mut self, _: ProgramHandle, _: &str) -> Result<Option<i32>> {
        Ok(Some(0))
    }

    unsafe fn bind_uniform(
        &mut self,
        _: ProgramHandle,
        _: i32,
        _: &UniformVariable,
    ) -> Result<()> {
        Ok(())
    }

    unsafe fn create_texture(
        &mut self,
        _: TextureHandle,
        _: TextureParams,
        _: Option<&[u8]>,
    ) -> Result<()> {
        Ok(())
    }

    unsafe fn update_texture(
        &mut self,
        _: TextureHandle,
        _: TextureParams,
        _: &[u8],
    ) -> Result<()> {
        Ok(())
    }

    unsafe fn delete_texture(&mut self, _: TextureHandle) {}

    unsafe fn bind_texture(&mut self, _: usize, _: TextureHandle) -> Result<()> {
        Ok(())
    }

    unsafe fn set_viewport(&mut self, _: Vector2<u32>) {}

    unsafe fn clear(&mut self, _: Color) {}

    unsafe fn draw(&mut self, _: ProgramHandle) -> Result<()> {
        Ok(())
    }

    unsafe fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}
