use std::ffi::CString;
use std::ptr;

use gl;
use gl::types::*;
use smallvec::SmallVec;

use crate::diagnostics;
use crate::errors::{Error, Result, ShaderStage};
use crate::math::Vector2;
use crate::program::ProgramHandle;
use crate::texture::{TextureHandle, TextureParams};
use crate::uniforms::UniformVariable;
use crate::utils::color::Color;

use super::super::utils::DataVec;
use super::super::Visitor;

// The full-surface quad, two triangles in clip space.
const QUAD_POSITIONS: [f32; 12] = [
    -1.0, -1.0, 1.0, -1.0, -1.0, 1.0, -1.0, 1.0, 1.0, -1.0, 1.0, 1.0,
];
const QUAD_TEXCOORDS: [f32; 12] = [
    0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0, 1.0,
];

const POSITION_ATTRIBUTE: &str = "a_position";
const TEXCOORD_ATTRIBUTE: &str = "a_texcoord";

struct GLProgramData {
    id: GLuint,
    vao: GLuint,
    vbos: [GLuint; 2],
}

struct GLTextureData {
    id: GLuint,
    params: TextureParams,
}

#[derive(Default)]
struct GLState {
    binded_program: Option<GLuint>,
    binded_textures: SmallVec<[Option<GLuint>; 8]>,
    viewport: Option<Vector2<u32>>,
}

pub struct GLVisitor {
    state: GLState,
    programs: DataVec<GLProgramData>,
    textures: DataVec<GLTextureData>,
}

impl GLVisitor {
    /// The function pointers must be loaded and a context current on this
    /// thread.
    pub unsafe fn new() -> Result<Self> {
        gl::PixelStorei(gl::UNPACK_ALIGNMENT, 1);
        gl::Disable(gl::DEPTH_TEST);
        gl::Enable(gl::BLEND);
        gl::BlendFunc(gl::SRC_ALPHA, gl::ONE_MINUS_SRC_ALPHA);
        check()?;

        Ok(GLVisitor {
            state: GLState::default(),
            programs: DataVec::new(),
            textures: DataVec::new(),
        })
    }

    unsafe fn bind_program(&mut self, id: GLuint) {
        if self.state.binded_program == Some(id) {
            return;
        }

        gl::UseProgram(id);
        self.state.binded_program = Some(id);
    }

    unsafe fn compile(stage: ShaderStage, src: &str) -> Result<GLuint> {
        let tp = match stage {
            ShaderStage::Vertex => gl::VERTEX_SHADER,
            ShaderStage::Fragment => gl::FRAGMENT_SHADER,
        };

        let id = gl::CreateShader(tp);
        let c_str = CString::new(src.as_bytes()).unwrap();
        gl::ShaderSource(id, 1, &c_str.as_ptr(), ptr::null());
        gl::CompileShader(id);

        let mut status = GLint::from(gl::FALSE);
        gl::GetShaderiv(id, gl::COMPILE_STATUS, &mut status);

        if status != GLint::from(gl::TRUE) {
            let log = shader_log(id);
            gl::DeleteShader(id);

            let diagnostics = diagnostics::parse(&log);
            return Err(Error::ShaderCompile {
                stage,
                log,
                diagnostics,
            });
        }

        Ok(id)
    }

    unsafe fn link(vs_id: GLuint, fs_id: GLuint, vs: &str, fs: &str) -> Result<GLuint> {
        let id = gl::CreateProgram();
        gl::AttachShader(id, vs_id);
        gl::AttachShader(id, fs_id);
        gl::LinkProgram(id);

        gl::DetachShader(id, vs_id);
        gl::DeleteShader(vs_id);
        gl::DetachShader(id, fs_id);
        gl::DeleteShader(fs_id);

        let mut status = GLint::from(gl::FALSE);
        gl::GetProgramiv(id, gl::LINK_STATUS, &mut status);

        if status != GLint::from(gl::TRUE) {
            let log = program_log(id);

            gl::ValidateProgram(id);
            let mut validation = GLint::from(gl::FALSE);
            gl::GetProgramiv(id, gl::VALIDATE_STATUS, &mut validation);

            let last_gl_error = gl::GetError();
            gl::DeleteProgram(id);

            return Err(Error::ProgramLink {
                log,
                validation: validation == GLint::from(gl::TRUE),
                last_gl_error,
                vs: vs.to_string(),
                fs: fs.to_string(),
            });
        }

        Ok(id)
    }

    /// Uploads the quad and wires its attributes to whichever of the two
    /// expected slots the program actually declares.
    unsafe fn create_quad(id: GLuint) -> Result<(GLuint, [GLuint; 2])> {
        let mut vao = 0;
        gl::GenVertexArrays(1, &mut vao);
        gl::BindVertexArray(vao);

        let mut vbos = [0; 2];
        gl::GenBuffers(2, vbos.as_mut_ptr());

        let attributes = [
            (POSITION_ATTRIBUTE, &QUAD_POSITIONS, vbos[0]),
            (TEXCOORD_ATTRIBUTE, &QUAD_TEXCOORDS, vbos[1]),
        ];

        for &(name, data, vbo) in &attributes {
            gl::BindBuffer(gl::ARRAY_BUFFER, vbo);
            gl::BufferData(
                gl::ARRAY_BUFFER,
                ::std::mem::size_of_val(data) as GLsizeiptr,
                data.as_ptr() as *const ::std::os::raw::c_void,
                gl::STATIC_DRAW,
            );

            let c_name = CString::new(name.as_bytes()).unwrap();
            let location = gl::GetAttribLocation(id, c_name.as_ptr());
            if location >= 0 {
                gl::EnableVertexAttribArray(location as GLuint);
                gl::VertexAttribPointer(
                    location as GLuint,
                    2,
                    gl::FLOAT,
                    gl::FALSE,
                    0,
                    ptr::null(),
                );
            }
        }

        gl::BindVertexArray(0);
        check()?;

        Ok((vao, vbos))
    }
}

impl Visitor for GLVisitor {
    unsafe fn compile_program(
        &mut self,
        handle: ProgramHandle,
        vs: &str,
        fs: &str,
    ) -> Result<()> {
        let vs_id = Self::compile(ShaderStage::Vertex, vs)?;
        let fs_id = match Self::compile(ShaderStage::Fragment, fs) {
            Ok(id) => id,
            Err(err) => {
                gl::DeleteShader(vs_id);
                return Err(err);
            }
        };

        let id = Self::link(vs_id, fs_id, vs, fs)?;
        let (vao, vbos) = match Self::create_quad(id) {
            Ok(v) => v,
            Err(err) => {
                gl::DeleteProgram(id);
                return Err(err);
            }
        };

        self.programs.create(handle, GLProgramData { id, vao, vbos });
        check()
    }

    unsafe fn delete_program(&mut self, handle: ProgramHandle) {
        if let Some(data) = self.programs.free(handle) {
            if self.state.binded_program == Some(data.id) {
                self.state.binded_program = None;
            }

            gl::DeleteBuffers(2, data.vbos.as_ptr());
            gl::DeleteVertexArrays(1, &data.vao);
            gl::DeleteProgram(data.id);
        }
    }

    unsafe fn uniform_location(
        &mut self,
        handle: ProgramHandle,
        name: &str,
    ) -> Result<Option<i32>> {
        let data = self
            .programs
            .get(handle)
            .ok_or_else(|| Error::HandleInvalid(format!("{}", handle)))?;

        let c_name = CString::new(name.as_bytes()).unwrap();
        let location = gl::GetUniformLocation(data.id, c_name.as_ptr());
        check()?;

        Ok(if location < 0 { None } else { Some(location) })
    }

    unsafe fn attribute_location(
        &mut self,
        handle: ProgramHandle,
        name: &str,
    ) -> Result<Option<i32>> {
        let data = self
            .programs
            .get(handle)
            .ok_or_else(|| Error::HandleInvalid(format!("{}", handle)))?;

        let c_name = CString::new(name.as_bytes()).unwrap();
        let location = gl::GetAttribLocation(data.id, c_name.as_ptr());
        check()?;

        Ok(if location < 0 { None } else { Some(location) })
    }

    unsafe fn bind_uniform(
        &mut self,
        handle: ProgramHandle,
        location: i32,
        var: &UniformVariable,
    ) -> Result<()> {
        let id = self
            .programs
            .get(handle)
            .map(|v| v.id)
            .ok_or_else(|| Error::HandleInvalid(format!("{}", handle)))?;

        self.bind_program(id);

        match *var {
            UniformVariable::I32(v) => gl::Uniform1i(location, v),
            UniformVariable::F32(v) => gl::Uniform1f(location, v),
            UniformVariable::Vector2f(v) => gl::Uniform2f(location, v[0], v[1]),
            UniformVariable::Vector3f(v) => gl::Uniform3f(location, v[0], v[1], v[2]),
            UniformVariable::Vector4f(v) => gl::Uniform4f(location, v[0], v[1], v[2], v[3]),
            UniformVariable::FloatArray(ref v) => {
                gl::Uniform1fv(location, v.len() as GLsizei, v.as_ptr())
            }
        }

        check()
    }

    unsafe fn create_texture(
        &mut self,
        handle: TextureHandle,
        params: TextureParams,
        data: Option<&[u8]>,
    ) -> Result<()> {
        let mut id = 0;
        gl::GenTextures(1, &mut id);

        gl::ActiveTexture(gl::TEXTURE0);
        gl::BindTexture(gl::TEXTURE_2D, id);
        if self.state.binded_textures.is_empty() {
            self.state.binded_textures.push(Some(id));
        } else {
            self.state.binded_textures[0] = Some(id);
        }

        let wrap = GLenum::from(params.wrap) as GLint;
        let filter = GLenum::from(params.filter) as GLint;
        gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_WRAP_S, wrap);
        gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_WRAP_T, wrap);
        gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_MIN_FILTER, filter);
        gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_MAG_FILTER, filter);

        let (internal, format, tp) = params.format.gl_formats();
        let value = match data {
            Some(v) if !v.is_empty() => v.as_ptr() as *const ::std::os::raw::c_void,
            _ => ptr::null(),
        };

        gl::TexImage2D(
            gl::TEXTURE_2D,
            0,
            internal as GLint,
            params.dimensions.x as GLsizei,
            params.dimensions.y as GLsizei,
            0,
            format,
            tp,
            value,
        );

        self.textures.create(handle, GLTextureData { id, params });
        check()
    }

    unsafe fn update_texture(
        &mut self,
        handle: TextureHandle,
        params: TextureParams,
        data: &[u8],
    ) -> Result<()> {
        let (id, resized) = {
            let stored = self
                .textures
                .get(handle)
                .ok_or_else(|| Error::HandleInvalid(format!("{}", handle)))?;
            (stored.id, stored.params != params)
        };

        gl::ActiveTexture(gl::TEXTURE0);
        gl::BindTexture(gl::TEXTURE_2D, id);
        if self.state.binded_textures.is_empty() {
            self.state.binded_textures.push(Some(id));
        } else {
            self.state.binded_textures[0] = Some(id);
        }

        let (internal, format, tp) = params.format.gl_formats();
        if resized {
            let wrap = GLenum::from(params.wrap) as GLint;
            let filter = GLenum::from(params.filter) as GLint;
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_WRAP_S, wrap);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_WRAP_T, wrap);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_MIN_FILTER, filter);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_MAG_FILTER, filter);

            gl::TexImage2D(
                gl::TEXTURE_2D,
                0,
                internal as GLint,
                params.dimensions.x as GLsizei,
                params.dimensions.y as GLsizei,
                0,
                format,
                tp,
                data.as_ptr() as *const ::std::os::raw::c_void,
            );
        } else {
            gl::TexSubImage2D(
                gl::TEXTURE_2D,
                0,
                0,
                0,
                params.dimensions.x as GLsizei,
                params.dimensions.y as GLsizei,
                format,
                tp,
                data.as_ptr() as *const ::std::os::raw::c_void,
            );
        }

        if let Some(stored) = self.textures.get_mut(handle) {
            stored.params = params;
        }

        check()
    }

    unsafe fn delete_texture(&mut self, handle: TextureHandle) {
        if let Some(data) = self.textures.free(handle) {
            for slot in self.state.binded_textures.iter_mut() {
                if *slot == Some(data.id) {
                    *slot = None;
                }
            }

            gl::DeleteTextures(1, &data.id);
        }
    }

    unsafe fn bind_texture(&mut self, unit: usize, handle: TextureHandle) -> Result<()> {
        let id = self
            .textures
            .get(handle)
            .map(|v| v.id)
            .ok_or_else(|| Error::HandleInvalid(format!("{}", handle)))?;

        while self.state.binded_textures.len() <= unit {
            self.state.binded_textures.push(None);
        }

        if self.state.binded_textures[unit] == Some(id) {
            return Ok(());
        }

        gl::ActiveTexture(gl::TEXTURE0 + unit as GLenum);
        gl::BindTexture(gl::TEXTURE_2D, id);
        self.state.binded_textures[unit] = Some(id);

        check()
    }

    unsafe fn set_viewport(&mut self, dimensions: Vector2<u32>) {
        if self.state.viewport == Some(dimensions) {
            return;
        }

        gl::Viewport(
            0,
            0,
            dimensions.x as GLsizei,
            dimensions.y as GLsizei,
        );
        self.state.viewport = Some(dimensions);
    }

    unsafe fn clear(&mut self, color: Color) {
        gl::ClearColor(color.0, color.1, color.2, color.3);
        gl::Clear(gl::COLOR_BUFFER_BIT);
    }

    unsafe fn draw(&mut self, handle: ProgramHandle) -> Result<()> {
        let (id, vao) = {
            let data = self
                .programs
                .get(handle)
                .ok_or_else(|| Error::HandleInvalid(format!("{}", handle)))?;
            (data.id, data.vao)
        };

        self.bind_program(id);
        gl::BindVertexArray(vao);
        gl::DrawArrays(gl::TRIANGLES, 0, 6);
        gl::BindVertexArray(0);

        check()
    }

    unsafe fn flush(&mut self) -> Result<()> {
        gl::Flush();
        check()
    }
}

unsafe fn shader_log(id: GLuint) -> String {
    let mut len = 0;
    gl::GetShaderiv(id, gl::INFO_LOG_LENGTH, &mut len);
    if len <= 0 {
        return String::new();
    }

    let mut buf = vec![0u8; len as usize];
    gl::GetShaderInfoLog(id, len, ptr::null_mut(), buf.as_mut_ptr() as *mut GLchar);
    buf.pop();
    String::from_utf8_lossy(&buf).into_owned()
}

unsafe fn program_log(id: GLuint) -> String {
    let mut len = 0;
    gl::GetProgramiv(id, gl::INFO_LOG_LENGTH, &mut len);
    if len <= 0 {
        return String::new();
    }

    let mut buf = vec![0u8; len as usize];
    gl::GetProgramInfoLog(id, len, ptr::null_mut(), buf.as_mut_ptr() as *mut GLchar);
    buf.pop();
    String::from_utf8_lossy(&buf).into_owned()
}

unsafe fn check() -> Result<()> {
    let err = match gl::GetError() {
        gl::NO_ERROR => return Ok(()),

        gl::INVALID_ENUM => {
            "[GL] An unacceptable value is specified for an enumerated argument."
        }
        gl::INVALID_VALUE => "[GL] A numeric argument is out of range.",
        gl::INVALID_OPERATION => {
            "[GL] The specified operation is not allowed in the current state."
        }
        gl::INVALID_FRAMEBUFFER_OPERATION => {
            "[GL] The framebuffer object is not complete."
        }
        gl::OUT_OF_MEMORY => "[GL] There is not enough memory left to execute the command.",
        _ => "[GL] Unknown OpenGL error.",
    };

    Err(Error::Backend(err.to_string()))
}
