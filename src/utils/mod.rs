//! Commonly used utilities: versioned handles, pools and hashing.

#[macro_use]
pub mod handle;
pub mod handle_pool;
pub mod hash;
pub mod object_pool;

pub mod prelude {
    pub use super::handle::{Handle, HandleIndex, HandleLike};
    pub use super::handle_pool::HandlePool;
    pub use super::hash::{hash64, FastHashMap, FastHashSet, HashValue};
    pub use super::object_pool::ObjectPool;
}
