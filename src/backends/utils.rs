use crate::utils::handle::HandleLike;

/// Plain handle-indexed storage for backend objects.
pub struct DataVec<T: Sized> {
    pub buf: Vec<Option<T>>,
}

impl<T: Sized> DataVec<T> {
    pub fn new() -> Self {
        DataVec { buf: Vec::new() }
    }

    pub fn get<H: HandleLike>(&self, handle: H) -> Option<&T> {
        self.buf.get(handle.index() as usize).and_then(|v| v.as_ref())
    }

    pub fn get_mut<H: HandleLike>(&mut self, handle: H) -> Option<&mut T> {
        self.buf
            .get_mut(handle.index() as usize)
            .and_then(|v| v.as_mut())
    }

    pub fn create<H: HandleLike>(&mut self, handle: H, value: T) {
        let index = handle.index() as usize;

        while self.buf.len() <= index {
            self.buf.push(None);
        }

        self.buf[index] = Some(value);
    }

    pub fn free<H: HandleLike>(&mut self, handle: H) -> Option<T> {
        self.buf.get_mut(handle.index() as usize).and_then(|v| v.take())
    }
}
