//! Math types, mainly re-exported from `cgmath`.

pub use cgmath::*;

pub mod prelude {
    pub use cgmath::prelude::*;
    pub use cgmath::{Vector2, Vector3, Vector4};
}
