//! Shader program lifecycle and uniform write caching.

use crate::backends::Visitor;
use crate::errors::Result;
use crate::uniforms::{UniformType, UniformVariable};
use crate::utils::handle_pool::HandlePool;
use crate::utils::hash::FastHashMap;
use crate::utils::hash_value::HashValue;

impl_handle!(ProgramHandle);

/// The vertex shader used when the embedder supplies only a fragment source.
/// It forwards the unit quad positions untouched.
pub const DEFAULT_VERTEX_SHADER: &str = "
#ifdef GL_ES
precision mediump float;
#endif

attribute vec2 a_position;
attribute vec2 a_texcoord;

varying vec2 v_texcoord;

void main() {
    gl_Position = vec4(a_position, 0.0, 1.0);
    v_texcoord = a_texcoord;
}
";

/// The fragment shader used before the embedder loads one.
pub const DEFAULT_FRAGMENT_SHADER: &str = "
#ifdef GL_ES
precision mediump float;
#endif

varying vec2 v_texcoord;

void main(){
    gl_FragColor = vec4(0.0);
}
";

const TIME_TOKEN: &str = "u_time";
const MOUSE_TOKEN: &str = "u_mouse";

/// A fragment source is treated as animated when it actually reads `u_time`
/// or `u_mouse`. One occurrence is just the declaration, so the threshold is
/// two.
pub fn classify_animated(fragment: &str) -> bool {
    fragment.matches(TIME_TOKEN).count() > 1 || fragment.matches(MOUSE_TOKEN).count() > 1
}

struct UniformSlot {
    name: String,
    tp: UniformType,
    var: Option<UniformVariable>,
    location: Option<i32>,
}

/// A linked vertex plus fragment pair together with its uniform and
/// attribute location caches.
///
/// `load` keeps the previously linked program installed when a new source
/// pair fails to compile, so a running canvas survives a broken edit. All
/// uniform writes flow through `bind_uniform`, which suppresses uploads whose
/// value matches the cached one.
pub struct ShaderProgram {
    handles: HandlePool<ProgramHandle>,
    handle: Option<ProgramHandle>,
    vs: String,
    fs: String,
    compiled: bool,
    animated: bool,
    refresh: bool,
    attributes: FastHashMap<HashValue<str>, Option<i32>>,
    uniforms: FastHashMap<HashValue<str>, UniformSlot>,
}

impl ShaderProgram {
    pub fn new() -> Self {
        ShaderProgram {
            handles: HandlePool::new(),
            handle: None,
            vs: String::new(),
            fs: String::new(),
            compiled: false,
            animated: false,
            refresh: false,
            attributes: FastHashMap::default(),
            uniforms: FastHashMap::default(),
        }
    }

    #[inline]
    pub fn handle(&self) -> Option<ProgramHandle> {
        self.handle
    }

    /// True when a linked program is currently installed. Stays true after a
    /// failed reload as long as an older program survives.
    #[inline]
    pub fn compiled(&self) -> bool {
        self.compiled
    }

    #[inline]
    pub fn animated(&self) -> bool {
        self.animated
    }

    #[inline]
    pub fn fragment_source(&self) -> &str {
        &self.fs
    }

    #[inline]
    pub fn vertex_source(&self) -> &str {
        &self.vs
    }

    /// Compiles and links a new source pair and installs it on success. On
    /// failure the previous program, if any, stays installed and usable.
    pub fn load(&mut self, visitor: &mut dyn Visitor, fragment: &str, vertex: &str) -> Result<()> {
        let candidate = self.handles.create();

        if let Err(err) = unsafe { visitor.compile_program(candidate, vertex, fragment) } {
            self.handles.free(candidate);
            self.compiled = self.handle.is_some();
            return Err(err);
        }

        if let Some(old) = self.handle.take() {
            unsafe { visitor.delete_program(old) };
            self.handles.free(old);
        }

        self.handle = Some(candidate);
        self.vs = vertex.to_string();
        self.fs = fragment.to_string();
        self.compiled = true;
        self.animated = classify_animated(fragment);

        // Locations belong to the old program. Keep cached values so they
        // re-upload against the new one.
        self.refresh = true;
        self.attributes.clear();
        for slot in self.uniforms.values_mut() {
            slot.location = None;
        }

        Ok(())
    }

    /// Uploads a uniform value, skipping the device write when the cached
    /// value already matches. Returns whether a write actually happened.
    /// Values set before the first successful `load` are cached and flushed
    /// once a program is installed.
    pub fn bind_uniform(
        &mut self,
        visitor: &mut dyn Visitor,
        tp: UniformType,
        name: &str,
        var: UniformVariable,
    ) -> Result<bool> {
        let key = HashValue::from(name);
        let slot = self.uniforms.entry(key).or_insert_with(|| UniformSlot {
            name: name.to_string(),
            tp,
            var: None,
            location: None,
        });

        if slot.tp != tp {
            warn!(
                "Uniform '{}' reclassified from {:?} to {:?}.",
                slot.name, slot.tp, tp
            );
            slot.tp = tp;
            slot.var = None;
        }

        let changed = slot.var.as_ref() != Some(&var);
        let write = changed || self.refresh || slot.location.is_none();
        slot.var = Some(var);

        let handle = match self.handle {
            Some(handle) => handle,
            None => return Ok(false),
        };

        if !write {
            return Ok(false);
        }

        if self.refresh || slot.location.is_none() {
            slot.location = unsafe { visitor.uniform_location(handle, &slot.name)? };
        }

        match (slot.location, &slot.var) {
            (Some(location), Some(var)) => {
                unsafe { visitor.bind_uniform(handle, location, var)? };
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Resolves a vertex attribute location, caching the answer per program.
    pub fn attribute_location(
        &mut self,
        visitor: &mut dyn Visitor,
        name: &str,
    ) -> Result<Option<i32>> {
        let handle = match self.handle {
            Some(handle) => handle,
            None => return Ok(None),
        };

        let key = HashValue::from(name);
        if let Some(location) = self.attributes.get(&key) {
            return Ok(*location);
        }

        let location = unsafe { visitor.attribute_location(handle, name)? };
        self.attributes.insert(key, location);
        Ok(location)
    }

    /// Clears the post-reload flag. Called once the first frame against a
    /// freshly installed program has been drawn.
    #[inline]
    pub fn finish_refresh(&mut self) {
        self.refresh = false;
    }

    pub fn destroy(&mut self, visitor: &mut dyn Visitor) {
        if let Some(handle) = self.handle.take() {
            unsafe { visitor.delete_program(handle) };
            self.handles.free(handle);
        }

        self.compiled = false;
        self.uniforms.clear();
        self.attributes.clear();
    }
}

impl Default for ShaderProgram {
    fn default() -> Self {
        Self::new()
    }
}
