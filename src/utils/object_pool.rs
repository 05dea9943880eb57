use super::handle::HandleLike;
use super::handle_pool::{HandlePool, Iter};

/// A named object collection. Every time a handle is created or freed, an
/// attached instance `T` is created or freed along with it.
#[derive(Default)]
pub struct ObjectPool<H: HandleLike, T: Sized> {
    handles: HandlePool<H>,
    entries: Vec<Option<T>>,
}

impl<H: HandleLike, T: Sized> ObjectPool<H, T> {
    /// Constructs a new, empty `ObjectPool`.
    pub fn new() -> Self {
        ObjectPool {
            handles: HandlePool::new(),
            entries: Vec::new(),
        }
    }

    /// Creates a `T` and names it with a `Handle`.
    pub fn create(&mut self, value: T) -> H {
        let handle = self.handles.create();

        if handle.index() as usize >= self.entries.len() {
            self.entries.push(Some(value));
        } else {
            self.entries[handle.index() as usize] = Some(value);
        }

        handle
    }

    /// Returns a mutable reference to the value named by `handle`.
    #[inline]
    pub fn get_mut(&mut self, handle: H) -> Option<&mut T> {
        if self.handles.contains(handle) {
            self.entries[handle.index() as usize].as_mut()
        } else {
            None
        }
    }

    /// Returns an immutable reference to the value named by `handle`.
    #[inline]
    pub fn get(&self, handle: H) -> Option<&T> {
        if self.handles.contains(handle) {
            self.entries[handle.index() as usize].as_ref()
        } else {
            None
        }
    }

    /// Returns true if `handle` was created by this pool and has not been
    /// freed yet.
    #[inline]
    pub fn contains(&self, handle: H) -> bool {
        self.handles.contains(handle)
    }

    /// Recycles the value named by `handle`.
    #[inline]
    pub fn free(&mut self, handle: H) -> Option<T> {
        if self.handles.free(handle) {
            self.entries[handle.index() as usize].take()
        } else {
            None
        }
    }

    /// Returns the total number of alive objects in this `ObjectPool`.
    #[inline]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Checks if the pool is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns an iterator over the alive handles.
    #[inline]
    pub fn iter(&self) -> Iter<H> {
        self.handles.iter()
    }

    /// Returns an iterator over mutable references to all alive values.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.entries.iter_mut().filter_map(|v| v.as_mut())
    }
}

#[cfg(test)]
mod test {
    use super::super::handle::Handle;
    use super::*;

    #[test]
    fn basic() {
        let mut pool = ObjectPool::<Handle, i32>::new();

        let h1 = pool.create(3);
        assert_eq!(pool.get(h1), Some(&3));
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.free(h1), Some(3));
        assert_eq!(pool.len(), 0);
        assert_eq!(pool.get(h1), None);
        assert_eq!(pool.free(h1), None);
    }

    #[test]
    fn values_mut() {
        let mut pool = ObjectPool::<Handle, i32>::new();
        let h1 = pool.create(1);
        let _h2 = pool.create(2);

        for v in pool.values_mut() {
            *v += 10;
        }

        assert_eq!(pool.get(h1), Some(&11));
    }
}
