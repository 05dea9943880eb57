use std::borrow::Borrow;
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

pub type FastHashMap<K, V> = HashMap<K, V>;
pub type FastHashSet<V> = HashSet<V>;

pub fn hash64<T: Hash + ?Sized>(t: &T) -> u64 {
    let mut s = DefaultHasher::new();
    t.hash(&mut s);
    s.finish()
}

/// A pre-hashed key, used where strings would otherwise be hashed over and
/// over (texture group names, for instance).
#[derive(Debug, PartialEq, Eq)]
pub struct HashValue<T>(u64, PhantomData<T>)
where
    T: Hash + ?Sized;

impl<T> Clone for HashValue<T>
where
    T: Hash + ?Sized,
{
    fn clone(&self) -> Self {
        HashValue(self.0, self.1)
    }
}

impl<T> Copy for HashValue<T> where T: Hash + ?Sized {}

impl<T> Hash for HashValue<T>
where
    T: Hash + ?Sized,
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl<F> From<F> for HashValue<str>
where
    F: Borrow<str>,
{
    fn from(v: F) -> Self {
        HashValue(hash64(v.borrow()), PhantomData)
    }
}
