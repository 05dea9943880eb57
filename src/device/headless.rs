//! A no-op device that records every call it receives. It backs the test
//! suite (every "exactly N hardware calls" property is asserted against
//! its call log) and doubles as a stand-in on platforms without a real
//! device.

use std::time::Duration;

use crate::errors::Result;
use crate::math::{Matrix4, Vector4};
use crate::state::snapshot::{AlphaBlendState, AlphaTestMiscState, DepthTestState, FogMiscState};
use crate::state::{
    BindFlags, CullMode, FogParams, SamplerParams, ScissorRect, TransformKind, VertexBlendState,
};
use crate::texture::TextureDesc;

use super::{Device, DeviceTextureId, FenceId};

/// One recorded device call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    SetTransform(TransformKind, Matrix4<f32>),
    SetFog(FogParams),
    SetCullMode(CullMode),
    SetScissor(Option<ScissorRect>),
    SetSampler(usize, SamplerParams),
    BindTexture(usize, Option<(DeviceTextureId, BindFlags)>),
    SetVertexBlend(VertexBlendState),
    SetClipPlane(usize, Option<Vector4<f32>>),

    SetAlphaBlend(AlphaBlendState),
    SetDepthTest(DepthTestState),
    SetAlphaTestMisc(AlphaTestMiscState),
    SetFogMisc(FogMiscState),

    SetVec4Constants(usize, Vec<[f32; 4]>),
    SetBoolConstants(usize, Vec<bool>),
    SetIntConstants(usize, Vec<[i32; 4]>),

    CreateTexture(DeviceTextureId),
    UpdateTexture(DeviceTextureId, u8, usize),
    DestroyTexture(DeviceTextureId),

    InsertFence(FenceId),
    WaitFence(FenceId),
}

#[derive(Default)]
pub struct HeadlessDevice {
    calls: Vec<Call>,
    next_texture: DeviceTextureId,
    next_fence: FenceId,
}

impl HeadlessDevice {
    pub fn new() -> Self {
        HeadlessDevice::default()
    }

    /// Takes the recorded call log, leaving it empty.
    pub fn take_calls(&mut self) -> Vec<Call> {
        ::std::mem::replace(&mut self.calls, Vec::new())
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }
}

impl Device for HeadlessDevice {
    fn set_transform(&mut self, kind: TransformKind, matrix: Matrix4<f32>) {
        self.calls.push(Call::SetTransform(kind, matrix));
    }

    fn set_fog(&mut self, fog: FogParams) {
        self.calls.push(Call::SetFog(fog));
    }

    fn set_cull_mode(&mut self, cull: CullMode) {
        self.calls.push(Call::SetCullMode(cull));
    }

    fn set_scissor(&mut self, scissor: Option<ScissorRect>) {
        self.calls.push(Call::SetScissor(scissor));
    }

    fn set_sampler(&mut self, unit: usize, sampler: SamplerParams) {
        self.calls.push(Call::SetSampler(unit, sampler));
    }

    fn bind_texture(&mut self, unit: usize, binding: Option<(DeviceTextureId, BindFlags)>) {
        self.calls.push(Call::BindTexture(unit, binding));
    }

    fn set_vertex_blend(&mut self, blend: VertexBlendState) {
        self.calls.push(Call::SetVertexBlend(blend));
    }

    fn set_clip_plane(&mut self, index: usize, plane: Option<Vector4<f32>>) {
        self.calls.push(Call::SetClipPlane(index, plane));
    }

    fn set_alpha_blend(&mut self, blend: AlphaBlendState) {
        self.calls.push(Call::SetAlphaBlend(blend));
    }

    fn set_depth_test(&mut self, depth: DepthTestState) {
        self.calls.push(Call::SetDepthTest(depth));
    }

    fn set_alpha_test_misc(&mut self, misc: AlphaTestMiscState) {
        self.calls.push(Call::SetAlphaTestMisc(misc));
    }

    fn set_fog_misc(&mut self, misc: FogMiscState) {
        self.calls.push(Call::SetFogMisc(misc));
    }

    fn set_vec4_constants(&mut self, start: usize, values: &[[f32; 4]]) {
        self.calls.push(Call::SetVec4Constants(start, values.to_vec()));
    }

    fn set_bool_constants(&mut self, start: usize, values: &[bool]) {
        self.calls.push(Call::SetBoolConstants(start, values.to_vec()));
    }

    fn set_int_constants(&mut self, start: usize, values: &[[i32; 4]]) {
        self.calls.push(Call::SetIntConstants(start, values.to_vec()));
    }

    fn create_texture(&mut self, _desc: &TextureDesc) -> Result<DeviceTextureId> {
        self.next_texture += 1;
        self.calls.push(Call::CreateTexture(self.next_texture));
        Ok(self.next_texture)
    }

    fn update_texture(&mut self, id: DeviceTextureId, level: u8, bytes: &[u8]) -> Result<()> {
        self.calls.push(Call::UpdateTexture(id, level, bytes.len()));
        Ok(())
    }

    fn destroy_texture(&mut self, id: DeviceTextureId) {
        self.calls.push(Call::DestroyTexture(id));
    }

    fn insert_fence(&mut self) -> FenceId {
        self.next_fence += 1;
        self.calls.push(Call::InsertFence(self.next_fence));
        self.next_fence
    }

    fn wait_fence(&mut self, fence: FenceId, _timeout: Duration) -> bool {
        self.calls.push(Call::WaitFence(fence));
        true
    }
}
