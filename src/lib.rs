//! Prism is a render-state synchronization engine that sits between a
//! high-level drawing API and a stateful graphics device. Callers describe
//! the state they *want* at arbitrary granularity; immediately before each
//! draw, prism issues the minimum sequence of device calls required to get
//! there, correctly ordered and exactly once per actual change.
//!
//! The building blocks:
//!
//! - [`state::cache::StateCache`]: desired/current copies of every
//!   frequently-changing state field, with a deferred commit-function
//!   registry partitioned into per-draw and per-pass timing classes.
//! - [`state::snapshot::SnapshotTable`]: deduplicated, id-referenced
//!   bundles of rarely-toggled state, applied with one id comparison
//!   instead of per-field diffing.
//! - [`state::constants::ConstantCache`]: diffed shader-constant register
//!   files with range-coalesced batch writes.
//! - [`texture::TextureRegistry`]: handle-indexed texture lifecycle
//!   records with per-group memory accounting.
//! - [`engine::StateEngine`]: the context object tying them together over
//!   a [`device::Device`] implementation.

#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

#[macro_use]
pub mod utils;

pub mod device;
pub mod engine;
pub mod errors;
pub mod math;
pub mod state;
pub mod sync;
pub mod system;
pub mod texture;

pub mod prelude;
