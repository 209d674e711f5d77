//! The shader canvas itself.
//!
//! A [`Canvas`] owns a device visitor, a shader program, the attached
//! textures and the listener registry, and drives them from a caller-owned
//! loop through [`Canvas::tick`]. Every frame it re-checks the display size,
//! decides whether a draw is warranted and publishes the built-in
//! `u_time` / `u_resolution` / `u_mouse` uniforms before issuing the quad.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::backends::{self, Visitor};
use crate::errors::{Result, ShaderStage};
use crate::events::{CanvasEvent, ErrorEvent, EventListener, EventListenerHandle, Events};
use crate::math::Vector2;
use crate::program::{self, ShaderProgram};
use crate::texture::{TextureParams, TextureRegistry, TextureSource};
use crate::uniforms::{self, UniformType, UniformValue};
use crate::utils::color::Color;

/// Construction parameters. `fragment` and `vertex` fall back to the
/// built-in pass-through pair when absent, and `fragment_url` / `vertex_url`
/// record sources the embedder still has to fetch.
#[derive(Debug, Clone)]
pub struct CanvasParams {
    pub background: Color,
    pub fragment: Option<String>,
    pub vertex: Option<String>,
    pub fragment_url: Option<String>,
    pub vertex_url: Option<String>,
    pub textures: Vec<String>,
    pub dimensions: Vector2<u32>,
    pub device_pixel_ratio: f32,
}

impl Default for CanvasParams {
    fn default() -> Self {
        CanvasParams {
            background: Color(1.0, 1.0, 1.0, 0.0),
            fragment: None,
            vertex: None,
            fragment_url: None,
            vertex_url: None,
            textures: Vec::new(),
            dimensions: Vector2::new(300, 150),
            device_pixel_ratio: 1.0,
        }
    }
}

impl CanvasParams {
    /// Builds parameters from embedder-supplied key/value attributes, the
    /// keys being `fragment`, `vertex`, `fragment-url`, `vertex-url` and
    /// `textures` (a comma separated list). Unknown keys are ignored.
    pub fn from_attributes<'a, T>(attributes: T) -> Self
    where
        T: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut params = CanvasParams::default();

        for (key, value) in attributes {
            match key {
                "fragment" => params.fragment = Some(value.to_string()),
                "vertex" => params.vertex = Some(value.to_string()),
                "fragment-url" => params.fragment_url = Some(value.to_string()),
                "vertex-url" => params.vertex_url = Some(value.to_string()),
                "textures" => {
                    params.textures = value
                        .split(',')
                        .map(|v| v.trim().to_string())
                        .filter(|v| !v.is_empty())
                        .collect();
                }
                _ => {}
            }
        }

        params
    }
}

struct RenderState {
    force_render: bool,
    paused: bool,
    visible: bool,
    destroyed: bool,
    time_load: Instant,
    last_dimensions: Vector2<u32>,
    buffer_dimensions: Vector2<u32>,
}

pub struct Canvas {
    visitor: Box<dyn Visitor>,
    program: ShaderProgram,
    textures: TextureRegistry,
    events: Events,
    state: RenderState,
    background: Color,
    display: Vector2<u32>,
    device_pixel_ratio: f32,
    mouse: Vector2<f32>,
    pending: Vec<(ShaderStage, String)>,
}

impl Canvas {
    /// Creates a canvas on the OpenGL backend. A context must be current and
    /// the function pointers loaded.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn new(params: CanvasParams) -> Result<Self> {
        let visitor = backends::new()?;
        Ok(Self::with_visitor(params, visitor))
    }

    /// Creates a canvas that draws nothing.
    pub fn headless(params: CanvasParams) -> Self {
        Self::with_visitor(params, backends::new_headless())
    }

    /// Creates a canvas on a caller-supplied visitor. A failing initial load
    /// is reported through the event stream rather than aborting
    /// construction, matching reloads later in the canvas's life.
    pub fn with_visitor(params: CanvasParams, visitor: Box<dyn Visitor>) -> Self {
        let mut pending = Vec::new();
        if let Some(url) = params.fragment_url.clone() {
            pending.push((ShaderStage::Fragment, url));
        }
        if let Some(url) = params.vertex_url.clone() {
            pending.push((ShaderStage::Vertex, url));
        }

        let mut canvas = Canvas {
            visitor,
            program: ShaderProgram::new(),
            textures: TextureRegistry::new(),
            events: Events::new(),
            state: RenderState {
                force_render: true,
                paused: false,
                visible: true,
                destroyed: false,
                time_load: Instant::now(),
                last_dimensions: Vector2::new(0, 0),
                buffer_dimensions: Vector2::new(0, 0),
            },
            background: params.background,
            display: params.dimensions,
            device_pixel_ratio: params.device_pixel_ratio,
            mouse: Vector2::new(0.0, 0.0),
            pending,
        };

        let fragment = params
            .fragment
            .unwrap_or_else(|| program::DEFAULT_FRAGMENT_SHADER.to_string());
        let vertex = params
            .vertex
            .unwrap_or_else(|| program::DEFAULT_VERTEX_SHADER.to_string());

        // Failures here are already logged and emitted by `load` itself.
        let _ = canvas.load(&fragment, &vertex);

        for (i, url) in params.textures.iter().enumerate() {
            let name = format!("u_tex{}", i);
            if let Err(err) = canvas.load_texture(&name, TextureSource::Reference(url.clone())) {
                warn!("Texture '{}' failed to register. {}", name, err);
            }
        }

        canvas
    }

    pub fn attach(&mut self, listener: Arc<Mutex<dyn EventListener>>) -> EventListenerHandle {
        self.events.attach(listener)
    }

    pub fn detach(&mut self, handle: EventListenerHandle) {
        self.events.detach(handle);
    }

    /// Compiles and installs a new source pair. On failure the previous
    /// program, if any, keeps rendering and the error is also delivered to
    /// listeners.
    pub fn load(&mut self, fragment: &str, vertex: &str) -> Result<()> {
        if self.state.destroyed {
            return Ok(());
        }

        match self.program.load(&mut *self.visitor, fragment, vertex) {
            Ok(()) => {
                self.state.force_render = true;
                self.warm_attributes();
                self.events.emit(&CanvasEvent::Load);
                Ok(())
            }
            Err(err) => {
                warn!("Shader load failed. {}", err);
                self.events
                    .emit(&CanvasEvent::Error(ErrorEvent::from_error(&err)));
                Err(err)
            }
        }
    }

    /// Sets one named uniform. The value may be any supported shape,
    /// including nested maps and sequences.
    pub fn set_uniform<T>(&mut self, name: &str, value: T) -> Result<()>
    where
        T: Into<UniformValue>,
    {
        let value = value.into();
        let bindings = uniforms::parse_uniforms(&value, Some(name));
        self.apply_bindings(bindings)
    }

    /// Sets a batch of uniforms from a value tree, usually a deserialized
    /// map. Bindings apply in declaration order.
    pub fn set_uniforms(&mut self, value: &UniformValue) -> Result<()> {
        let bindings = uniforms::parse_uniforms(value, None);
        self.apply_bindings(bindings)
    }

    fn apply_bindings(&mut self, bindings: Vec<uniforms::UniformBinding>) -> Result<()> {
        if self.state.destroyed {
            return Ok(());
        }

        for binding in bindings {
            match binding.tp {
                UniformType::Sampler2D => {
                    if let uniforms::UniformData::Textures(ref refs) = binding.data {
                        for url in refs {
                            self.load_texture(
                                &binding.name,
                                TextureSource::Reference(url.clone()),
                            )?;
                        }
                    }
                }
                UniformType::Sampler2DArray => {
                    if let uniforms::UniformData::Textures(ref refs) = binding.data {
                        for (i, url) in refs.iter().enumerate() {
                            let name = format!("{}[{}]", binding.name, i);
                            self.load_texture(&name, TextureSource::Reference(url.clone()))?;
                        }
                    }
                }
                UniformType::Unsupported => {
                    warn!("Uniform '{}' has an unsupported shape, skipped.", binding.name);
                }
                tp => {
                    if let Some(var) = binding.to_variable() {
                        self.program
                            .bind_uniform(&mut *self.visitor, tp, &binding.name, var)?;
                    }
                }
            }
        }

        self.state.force_render = true;
        Ok(())
    }

    /// Registers a texture under `name`. References stay pending until
    /// pixels arrive through [`Canvas::update_texture`].
    pub fn load_texture(&mut self, name: &str, source: TextureSource) -> Result<()> {
        if self.state.destroyed {
            return Ok(());
        }

        let ready = self.textures.load(&mut *self.visitor, name, source)?;
        if ready {
            self.state.force_render = true;
        }

        Ok(())
    }

    /// Supplies pixels for a registered texture, typically when a pending
    /// reference finishes loading.
    pub fn update_texture(
        &mut self,
        name: &str,
        params: TextureParams,
        data: &[u8],
    ) -> Result<()> {
        if self.state.destroyed {
            return Ok(());
        }

        self.textures.update(&mut *self.visitor, name, params, data)?;
        self.state.force_render = true;
        Ok(())
    }

    /// Texture references waiting for the embedder to fetch, as (uniform
    /// name, url).
    pub fn pending_textures(&self) -> Vec<(String, String)> {
        self.textures.pending_references()
    }

    /// Shader sources waiting for the embedder to fetch, as (stage, url).
    pub fn pending_shaders(&self) -> &[(ShaderStage, String)] {
        &self.pending
    }

    /// Mouse position in display coordinates, origin at the top left.
    pub fn set_mouse(&mut self, x: f32, y: f32) {
        self.mouse = Vector2::new(x, y);
    }

    /// Marks the canvas as on or off screen. Hidden animated canvases stop
    /// drawing until visible again.
    pub fn set_visible(&mut self, visible: bool) {
        self.state.visible = visible;
    }

    pub fn set_display_dimensions(&mut self, dimensions: Vector2<u32>) {
        self.display = dimensions;
    }

    pub fn set_device_pixel_ratio(&mut self, ratio: f32) {
        self.device_pixel_ratio = ratio;
    }

    pub fn set_background(&mut self, background: Color) {
        self.background = background;
    }

    pub fn pause(&mut self) {
        self.state.paused = true;
    }

    pub fn play(&mut self) {
        self.state.paused = false;
    }

    /// Schedules a draw on the next tick regardless of the animation gate.
    pub fn force_render(&mut self) {
        self.state.force_render = true;
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.state.paused
    }

    #[inline]
    pub fn is_animated(&self) -> bool {
        self.program.animated()
    }

    #[inline]
    pub fn is_compiled(&self) -> bool {
        self.program.compiled()
    }

    /// Seconds since the canvas was created, as published to `u_time`.
    #[inline]
    pub fn time(&self) -> f32 {
        let elapsed = self.state.time_load.elapsed();
        elapsed.as_secs() as f32 + elapsed.subsec_millis() as f32 / 1_000.0
    }

    #[inline]
    pub fn buffer_dimensions(&self) -> Vector2<u32> {
        self.state.buffer_dimensions
    }

    #[inline]
    pub fn display_dimensions(&self) -> Vector2<u32> {
        self.display
    }

    /// Advances the canvas one frame. Checks the display size, draws when
    /// warranted and reports failures through the event stream instead of
    /// returning them, so a broken frame never stops the caller's loop.
    pub fn tick(&mut self) {
        if self.state.destroyed {
            return;
        }

        if self.resize() {
            self.state.force_render = true;
        }

        if let Err(err) = self.render() {
            warn!("Frame failed. {}", err);
            self.events
                .emit(&CanvasEvent::Error(ErrorEvent::from_error(&err)));
        }
    }

    /// Re-reads the display size, recomputing the backing buffer from the
    /// device pixel ratio. Returns whether the display size changed.
    fn resize(&mut self) -> bool {
        if self.display == self.state.last_dimensions {
            return false;
        }

        self.state.last_dimensions = self.display;

        let buffer = Vector2::new(
            (self.display.x as f32 * self.device_pixel_ratio) as u32,
            (self.display.y as f32 * self.device_pixel_ratio) as u32,
        );

        if buffer != self.state.buffer_dimensions {
            self.state.buffer_dimensions = buffer;
            unsafe { self.visitor.set_viewport(buffer) };
        }

        true
    }

    fn render(&mut self) -> Result<()> {
        let gate = self.state.force_render
            || (self.program.animated() && self.state.visible && !self.state.paused);

        // A pending forced draw survives until a program is installed.
        if !gate || !self.program.compiled() {
            return Ok(());
        }

        let buffer = self.state.buffer_dimensions;

        let time = self.time();
        self.program.bind_uniform(
            &mut *self.visitor,
            UniformType::Float,
            "u_time",
            uniforms::UniformVariable::F32(time),
        )?;

        self.program.bind_uniform(
            &mut *self.visitor,
            UniformType::Vec2,
            "u_resolution",
            uniforms::UniformVariable::Vector2f([buffer.x as f32, buffer.y as f32]),
        )?;

        let inside = self.mouse.x >= 0.0
            && self.mouse.x <= self.display.x as f32
            && self.mouse.y >= 0.0
            && self.mouse.y <= self.display.y as f32;
        if inside {
            // Shader-side coordinates grow upwards.
            self.program.bind_uniform(
                &mut *self.visitor,
                UniformType::Vec2,
                "u_mouse",
                uniforms::UniformVariable::Vector2f([
                    self.mouse.x,
                    buffer.y as f32 - self.mouse.y,
                ]),
            )?;
        }

        unsafe { self.visitor.clear(self.background) };

        self.textures.bind_frame(&mut *self.visitor, &mut self.program)?;

        if let Some(handle) = self.program.handle() {
            unsafe { self.visitor.draw(handle)? };
            unsafe { self.visitor.flush()? };
        }

        self.state.force_render = false;
        self.program.finish_refresh();
        self.events.emit(&CanvasEvent::Render);

        Ok(())
    }

    /// Releases every device object. Safe to call twice; later calls and
    /// every other entry point become no-ops.
    pub fn destroy(&mut self) {
        if self.state.destroyed {
            return;
        }

        self.textures.destroy(&mut *self.visitor);
        self.program.destroy(&mut *self.visitor);
        self.pending.clear();
        self.state.destroyed = true;
    }

    fn warm_attributes(&mut self) {
        for name in &["a_position", "a_texcoord"] {
            match self.program.attribute_location(&mut *self.visitor, name) {
                Ok(Some(_)) => {}
                Ok(None) => warn!("Vertex attribute '{}' is missing.", name),
                Err(err) => warn!("Attribute lookup for '{}' failed. {}", name, err),
            }
        }
    }
}

impl Drop for Canvas {
    fn drop(&mut self) {
        self.destroy();
    }
}
