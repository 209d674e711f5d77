//! # glslbox
//!
//! A tiny runtime that keeps a user-supplied pair of GLSL shaders rendering
//! onto a full-surface quad, frame after frame, while doing as little work as
//! possible per frame. The interesting parts live in three places:
//!
//! - [`uniforms`] classifies arbitrarily nested value trees into flat, typed
//!   uniform bindings, preserving declaration order.
//! - [`program`] owns the shader program lifecycle and a per-program state
//!   cache that suppresses redundant GPU writes.
//! - [`canvas`] schedules redraws based on an animation heuristic, pause
//!   state, visibility and one-shot force flags, and keeps the backing
//!   buffer sized to the display.
//!
//! Everything that talks to the GPU goes through the [`backends::Visitor`]
//! trait, with a real OpenGL implementation and a headless one. Surface and
//! context acquisition, source fetching and image decoding are the host's
//! job; the runtime only consumes raw strings and pixel buffers.

#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;
#[macro_use]
extern crate serde;

#[macro_use]
pub mod utils;
pub mod errors;
pub mod math;

pub mod backends;
pub mod canvas;
pub mod diagnostics;
pub mod events;
pub mod program;
pub mod texture;
pub mod uniforms;

pub mod prelude {
    pub use crate::canvas::{Canvas, CanvasParams};
    pub use crate::errors::{Error, Result, ShaderStage};
    pub use crate::events::{CanvasEvent, EventListener, EventListenerHandle};
    pub use crate::program::ShaderProgram;
    pub use crate::texture::{TextureFilter, TextureParams, TextureSource, TextureWrap};
    pub use crate::uniforms::{UniformBinding, UniformType, UniformValue, UniformVariable};
    pub use crate::utils::prelude::Color;
}

pub use self::canvas::{Canvas, CanvasParams};
