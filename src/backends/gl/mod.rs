pub mod types;
pub mod visitor;

pub use self::visitor::GLVisitor;

/// Loads the OpenGL function pointers with the host's symbol lookup. Must be
/// called once before [`GLVisitor::new`], with a context current.
pub fn load_with<F>(loadfn: F)
where
    F: FnMut(&'static str) -> *const ::std::os::raw::c_void,
{
    gl::load_with(loadfn);
}
