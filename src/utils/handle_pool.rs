use std::cmp::Ordering;
use std::collections::binary_heap::BinaryHeap;
use std::marker::PhantomData;

use super::handle::{HandleIndex, HandleLike};

#[derive(PartialEq, Eq)]
struct InverseHandleIndex(HandleIndex);

impl PartialOrd for InverseHandleIndex {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        other.0.partial_cmp(&self.0)
    }
}

impl Ord for InverseHandleIndex {
    fn cmp(&self, other: &Self) -> Ordering {
        other.0.cmp(&self.0)
    }
}

/// `HandlePool` manages the manipulations of a `Handle` collection, which are
/// created with a continuous `index` field. It also has the ability to find
/// out the current status of a specified `Handle`.
#[derive(Default)]
pub struct HandlePool<H: HandleLike> {
    versions: Vec<HandleIndex>,
    frees: BinaryHeap<InverseHandleIndex>,
    _marker: PhantomData<H>,
}

impl<H: HandleLike> HandlePool<H> {
    /// Constructs a new, empty `HandlePool`.
    pub fn new() -> Self {
        HandlePool {
            versions: Vec::new(),
            frees: BinaryHeap::new(),
            _marker: PhantomData,
        }
    }

    /// Creates an unused `Handle`.
    pub fn create(&mut self) -> H {
        if let Some(InverseHandleIndex(index)) = self.frees.pop() {
            // If we have available free slots.
            self.versions[index as usize] += 1;
            H::new(index, self.versions[index as usize])
        } else {
            // Or we just spawn a new index and corresponding version.
            self.versions.push(1);
            H::new(self.versions.len() as HandleIndex - 1, 1)
        }
    }

    /// Returns true if this `Handle` was created by this `HandlePool`, and
    /// has not been freed yet.
    pub fn is_alive(&self, handle: H) -> bool {
        let index = handle.index() as usize;
        self.is_alive_at(index) && (self.versions[index] == handle.version())
    }

    #[inline]
    fn is_alive_at(&self, index: usize) -> bool {
        (index < self.versions.len()) && ((self.versions[index] & 0x1) == 1)
    }

    /// Recycles the `Handle` index, and marks its version as dead.
    pub fn free(&mut self, handle: H) -> bool {
        if !self.is_alive(handle) {
            false
        } else {
            self.versions[handle.index() as usize] += 1;
            self.frees.push(InverseHandleIndex(handle.index()));
            true
        }
    }

    /// Returns the total number of alive handles in this `HandlePool`.
    #[inline]
    pub fn len(&self) -> usize {
        self.versions.len() - self.frees.len()
    }

    /// Checks if the pool is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns an iterator over alive handles.
    pub fn iter(&self) -> HandleIter<H> {
        HandleIter {
            versions: &self.versions,
            index: 0,
            _marker: PhantomData,
        }
    }
}

/// Immutable `HandlePool` iterator, created by the `iter` method.
pub struct HandleIter<'a, H: HandleLike> {
    versions: &'a [HandleIndex],
    index: HandleIndex,
    _marker: PhantomData<H>,
}

impl<'a, H: HandleLike> Iterator for HandleIter<'a, H> {
    type Item = H;

    fn next(&mut self) -> Option<H> {
        while (self.index as usize) < self.versions.len() {
            let i = self.index;
            self.index += 1;

            let v = self.versions[i as usize];
            if v & 0x1 == 1 {
                return Some(H::new(i, v));
            }
        }

        None
    }
}
