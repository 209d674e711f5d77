//! Texture bookkeeping and per-frame sampler unit assignment.

use crate::backends::Visitor;
use crate::errors::{Error, Result};
use crate::math::Vector2;
use crate::program::ShaderProgram;
use crate::uniforms::{UniformType, UniformVariable};
use crate::utils::handle_pool::HandlePool;

impl_handle!(TextureHandle);

/// Minification and magnification filter.
#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TextureFilter {
    Nearest,
    Linear,
}

/// Behaviour of sampling outside the [0, 1] coordinate range.
#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TextureWrap {
    Repeat,
    Mirror,
    Clamp,
}

/// In-memory pixel layout.
#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    RGB8,
    RGBA8,
}

impl TextureFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            TextureFormat::RGB8 => 3,
            TextureFormat::RGBA8 => 4,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq)]
pub struct TextureParams {
    pub filter: TextureFilter,
    pub wrap: TextureWrap,
    pub format: TextureFormat,
    pub dimensions: Vector2<u32>,
}

impl Default for TextureParams {
    fn default() -> Self {
        TextureParams {
            filter: TextureFilter::Linear,
            wrap: TextureWrap::Clamp,
            format: TextureFormat::RGBA8,
            dimensions: Vector2::new(1, 1),
        }
    }
}

impl TextureParams {
    fn validate(&self, name: &str, data: &[u8]) -> Result<()> {
        let expected = self.dimensions.x as usize
            * self.dimensions.y as usize
            * self.format.bytes_per_pixel();

        if data.len() != expected {
            return Err(Error::TextureInvalid(
                name.to_string(),
                format!("Expected {} bytes, got {}.", expected, data.len()),
            ));
        }

        Ok(())
    }
}

/// Where a texture's pixels come from.
pub enum TextureSource {
    /// An external reference the embedder resolves asynchronously. The
    /// texture stays unbound until pixels arrive through `update`.
    Reference(String),
    /// Pixels supplied directly.
    Pixels {
        data: Vec<u8>,
        params: TextureParams,
    },
}

struct TextureBinding {
    name: String,
    handle: TextureHandle,
    params: TextureParams,
    reference: Option<String>,
    ready: bool,
}

/// The set of textures attached to a canvas.
///
/// Unit assignment is positional: the n-th registered texture binds to unit
/// n on every frame, so units stay stable across frames and reloads.
/// Re-registering an existing name updates it in place without moving its
/// unit. Alongside each sampler a `<name>Resolution` vec2 is published so
/// shaders can read the texture's pixel dimensions.
pub struct TextureRegistry {
    handles: HandlePool<TextureHandle>,
    entries: Vec<TextureBinding>,
}

impl TextureRegistry {
    pub fn new() -> Self {
        TextureRegistry {
            handles: HandlePool::new(),
            entries: Vec::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registers `name` with the given source, creating the device texture.
    /// Returns whether the texture is immediately drawable.
    pub fn load(
        &mut self,
        visitor: &mut dyn Visitor,
        name: &str,
        source: TextureSource,
    ) -> Result<bool> {
        let (params, data, reference, ready) = match source {
            TextureSource::Reference(url) => {
                (TextureParams::default(), None, Some(url), false)
            }
            TextureSource::Pixels { data, params } => {
                params.validate(name, &data)?;
                (params, Some(data), None, true)
            }
        };

        if params.wrap == TextureWrap::Repeat && !is_power_of_two(params.dimensions) {
            warn!(
                "Texture '{}' repeats but is {}x{}. Non power-of-two repeat \
                 is unavailable on some devices.",
                name, params.dimensions.x, params.dimensions.y
            );
        }

        if let Some(index) = self.index_of(name) {
            let entry = &mut self.entries[index];
            entry.params = params;
            entry.reference = reference;
            entry.ready = ready;

            if let Some(data) = data {
                unsafe { visitor.update_texture(entry.handle, entry.params, &data)? };
            }

            return Ok(ready);
        }

        let handle = self.handles.create();
        unsafe { visitor.create_texture(handle, params, data.as_ref().map(|v| &v[..]))? };

        self.entries.push(TextureBinding {
            name: name.to_string(),
            handle,
            params,
            reference,
            ready,
        });

        Ok(ready)
    }

    /// Supplies pixels for a previously registered name, typically once an
    /// external reference resolves.
    pub fn update(
        &mut self,
        visitor: &mut dyn Visitor,
        name: &str,
        params: TextureParams,
        data: &[u8],
    ) -> Result<()> {
        params.validate(name, data)?;

        let index = self
            .index_of(name)
            .ok_or_else(|| Error::TextureInvalid(name.to_string(), "Not registered.".to_string()))?;

        let entry = &mut self.entries[index];
        entry.params = params;
        entry.ready = true;

        unsafe { visitor.update_texture(entry.handle, entry.params, data)? };
        Ok(())
    }

    /// Binds every texture for the coming draw. Sampler uniforms and the
    /// `<name>Resolution` companions are published even for textures whose
    /// pixels have not arrived yet, so locations settle early.
    pub fn bind_frame(
        &self,
        visitor: &mut dyn Visitor,
        program: &mut ShaderProgram,
    ) -> Result<()> {
        for (unit, entry) in self.entries.iter().enumerate() {
            program.bind_uniform(
                visitor,
                UniformType::Sampler2D,
                &entry.name,
                UniformVariable::I32(unit as i32),
            )?;

            let resolution = format!("{}Resolution", entry.name);
            program.bind_uniform(
                visitor,
                UniformType::Vec2,
                &resolution,
                UniformVariable::Vector2f([
                    entry.params.dimensions.x as f32,
                    entry.params.dimensions.y as f32,
                ]),
            )?;

            if entry.ready {
                unsafe { visitor.bind_texture(unit, entry.handle)? };
            }
        }

        Ok(())
    }

    /// The (name, unit) pairs in binding order.
    pub fn unit_assignments(&self) -> Vec<(String, usize)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(unit, entry)| (entry.name.clone(), unit))
            .collect()
    }

    /// External references still waiting for pixels, as (name, url).
    pub fn pending_references(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .filter(|v| !v.ready)
            .filter_map(|v| v.reference.as_ref().map(|url| (v.name.clone(), url.clone())))
            .collect()
    }

    pub fn destroy(&mut self, visitor: &mut dyn Visitor) {
        for entry in self.entries.drain(..) {
            unsafe { visitor.delete_texture(entry.handle) };
            self.handles.free(entry.handle);
        }
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|v| v.name == name)
    }
}

impl Default for TextureRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn is_power_of_two(dimensions: Vector2<u32>) -> bool {
    dimensions.x.is_power_of_two() && dimensions.y.is_power_of_two()
}
