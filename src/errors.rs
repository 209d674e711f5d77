use std::fmt;

use crate::diagnostics::Diagnostic;

/// The shader stage a source string belongs to.
#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ShaderStage::Vertex => write!(f, "vertex"),
            ShaderStage::Fragment => write!(f, "fragment"),
        }
    }
}

#[derive(Debug, Fail)]
pub enum Error {
    #[fail(display = "{} shader failed to compile.\n{}", stage, log)]
    ShaderCompile {
        stage: ShaderStage,
        log: String,
        diagnostics: Vec<Diagnostic>,
    },
    #[fail(display = "Program failed to link. {}", log)]
    ProgramLink {
        log: String,
        validation: bool,
        last_gl_error: u32,
        vs: String,
        fs: String,
    },
    #[fail(display = "Uniform '{}' has unsupported shape. {}", _0, _1)]
    UniformUnsupported(String, String),
    #[fail(display = "Texture '{}' is invalid. {}", _0, _1)]
    TextureInvalid(String, String),
    #[fail(display = "{} is invalid.", _0)]
    HandleInvalid(String),
    #[fail(display = "{}", _0)]
    Backend(String),
}

pub type Result<T> = ::std::result::Result<T, Error>;
