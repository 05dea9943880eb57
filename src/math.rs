//! Re-exports of the linear algebra types used across the crate.

pub use cgmath::prelude::*;
pub use cgmath::{Matrix4, Vector2, Vector3, Vector4};
