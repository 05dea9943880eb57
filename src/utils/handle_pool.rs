use std::cmp::Reverse;
use std::collections::binary_heap::BinaryHeap;
use std::marker::PhantomData;

use super::handle::{HandleIndex, HandleLike};

/// `HandlePool` manages the lifecycle of a `Handle` collection with
/// continuous `index` fields. Freed indices are recycled lowest-first,
/// with the `version` field bumped so that stale handles never compare
/// equal to their reincarnations.
pub struct HandlePool<H: HandleLike> {
    versions: Vec<HandleIndex>,
    frees: BinaryHeap<Reverse<HandleIndex>>,
    _marker: PhantomData<H>,
}

impl<H: HandleLike> Default for HandlePool<H> {
    fn default() -> Self {
        HandlePool::new()
    }
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

    /// Constructs a new `HandlePool` with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        HandlePool {
            versions: Vec::with_capacity(capacity),
            frees: BinaryHeap::with_capacity(capacity),
            _marker: PhantomData,
        }
    }

    /// Creates an unused `Handle`.
    pub fn create(&mut self) -> H {
        if let Some(Reverse(index)) = self.frees.pop() {
            self.versions[index as usize] += 1;
            H::new(index, self.versions[index as usize])
        } else {
            self.versions.push(1);
            H::new(self.versions.len() as HandleIndex - 1, 1)
        }
    }

    /// Returns true if this `Handle` was created by this pool and has not
    /// been freed yet.
    pub fn contains(&self, handle: H) -> bool {
        let index = handle.index() as usize;
        self.is_alive_at(index) && (self.versions[index] == handle.version())
    }

    #[inline]
    fn is_alive_at(&self, index: usize) -> bool {
        (index < self.versions.len()) && ((self.versions[index] & 0x1) == 1)
    }

    /// Recycles the `Handle` index and marks its version as dead.
    pub fn free(&mut self, handle: H) -> bool {
        if !self.contains(handle) {
            false
        } else {
            self.versions[handle.index() as usize] += 1;
            self.frees.push(Reverse(handle.index()));
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

    /// Returns an iterator over the alive handles.
    #[inline]
    pub fn iter(&self) -> Iter<H> {
        Iter {
            versions: &self.versions,
            next: 0,
            _marker: PhantomData,
        }
    }
}

/// Immutable `HandlePool` iterator, created by the `iter` method.
pub struct Iter<'a, H: HandleLike> {
    versions: &'a [HandleIndex],
    next: HandleIndex,
    _marker: PhantomData<H>,
}

impl<'a, H: HandleLike> Iterator for Iter<'a, H> {
    type Item = H;

    fn next(&mut self) -> Option<H> {
        for i in (self.next as usize)..self.versions.len() {
            let v = self.versions[i];
            if v & 0x1 == 1 {
                self.next = i as HandleIndex + 1;
                return Some(H::new(i as HandleIndex, v));
            }
        }

        self.next = self.versions.len() as HandleIndex;
        None
    }
}
