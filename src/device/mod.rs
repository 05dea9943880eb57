//! The graphics-device interface the engine reconciles against. Prism
//! never talks to a concrete API directly; commit functions, the snapshot
//! table and the texture registry all call through [`Device`].

pub mod headless;

use std::time::Duration;

use crate::errors::Result;
use crate::math::{Matrix4, Vector4};
use crate::state::snapshot::{AlphaBlendState, AlphaTestMiscState, DepthTestState, FogMiscState};
use crate::state::{
    BindFlags, CullMode, FogParams, SamplerParams, ScissorRect, TransformKind, VertexBlendState,
};
use crate::texture::TextureDesc;

/// Opaque identity of a device-resident texture resource.
pub type DeviceTextureId = u32;

/// Opaque identity of a device fence/query object.
pub type FenceId = u32;

/// Primitive state-set and resource calls. State setters are infallible by
/// contract: a lost or deactivated device is expected to swallow them, and
/// the engine stops issuing them entirely while deactivated. Only resource
/// creation and upload can fail.
pub trait Device {
    fn set_transform(&mut self, kind: TransformKind, matrix: Matrix4<f32>);
    fn set_fog(&mut self, fog: FogParams);
    fn set_cull_mode(&mut self, cull: CullMode);
    fn set_scissor(&mut self, scissor: Option<ScissorRect>);
    fn set_sampler(&mut self, unit: usize, sampler: SamplerParams);
    fn bind_texture(&mut self, unit: usize, binding: Option<(DeviceTextureId, BindFlags)>);
    fn set_vertex_blend(&mut self, blend: VertexBlendState);
    fn set_clip_plane(&mut self, index: usize, plane: Option<Vector4<f32>>);

    fn set_alpha_blend(&mut self, blend: AlphaBlendState);
    fn set_depth_test(&mut self, depth: DepthTestState);
    fn set_alpha_test_misc(&mut self, misc: AlphaTestMiscState);
    fn set_fog_misc(&mut self, misc: FogMiscState);

    fn set_vec4_constants(&mut self, start: usize, values: &[[f32; 4]]);
    fn set_bool_constants(&mut self, start: usize, values: &[bool]);
    fn set_int_constants(&mut self, start: usize, values: &[[i32; 4]]);

    fn create_texture(&mut self, desc: &TextureDesc) -> Result<DeviceTextureId>;
    fn update_texture(&mut self, id: DeviceTextureId, level: u8, bytes: &[u8]) -> Result<()>;
    fn destroy_texture(&mut self, id: DeviceTextureId);

    fn insert_fence(&mut self) -> FenceId;

    /// Blocks until `fence` is signaled or `timeout` elapses. Returns
    /// false on timeout.
    fn wait_fence(&mut self, fence: FenceId, timeout: Duration) -> bool;
}
