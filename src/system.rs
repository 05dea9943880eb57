//! The thread-safe entry point. One coarse mutex guards the whole engine;
//! every public call acquires it, so hardware calls only ever happen under
//! the lock and callers never observe a half-reconciled device.

use std::sync::Mutex;

use crate::device::Device;
use crate::engine::{EngineOptions, StateEngine};
use crate::errors::Result;
use crate::math::{Matrix4, Vector4};
use crate::state::commit::TimingClass;
use crate::state::snapshot::{ShadowState, SnapshotId};
use crate::state::{
    BindFlags, CullMode, FogParams, SamplerParams, ScissorRect, TransformKind, VertexBlendState,
};
use crate::texture::{GroupStats, StdTexture, TextureDesc, TextureHandle};

pub struct RenderSystem<D: Device> {
    inner: Mutex<StateEngine<D>>,
}

impl<D: Device> RenderSystem<D> {
    pub fn new(device: D, options: EngineOptions) -> Self {
        RenderSystem {
            inner: Mutex::new(StateEngine::new(device, options)),
        }
    }

    /// Runs `f` with the engine locked. The escape hatch for call
    /// sequences that must be atomic with respect to other threads.
    pub fn with<T, F: FnOnce(&mut StateEngine<D>) -> T>(&self, f: F) -> T {
        f(&mut self.inner.lock().unwrap())
    }

    pub fn set_transform(&self, kind: TransformKind, matrix: Matrix4<f32>) {
        self.inner.lock().unwrap().set_transform(kind, matrix);
    }

    pub fn set_fog(&self, fog: FogParams) {
        self.inner.lock().unwrap().set_fog(fog);
    }

    pub fn set_cull_mode(&self, cull: CullMode) {
        self.inner.lock().unwrap().set_cull_mode(cull);
    }

    pub fn set_scissor(&self, scissor: Option<ScissorRect>) {
        self.inner.lock().unwrap().set_scissor(scissor);
    }

    pub fn set_vertex_blend(&self, blend: VertexBlendState) {
        self.inner.lock().unwrap().set_vertex_blend(blend);
    }

    pub fn set_sampler(&self, unit: usize, sampler: SamplerParams) {
        self.inner.lock().unwrap().set_sampler(unit, sampler);
    }

    pub fn set_clip_plane(&self, index: usize, plane: Option<Vector4<f32>>) {
        self.inner.lock().unwrap().set_clip_plane(index, plane);
    }

    pub fn bind_texture(&self, unit: usize, flags: BindFlags, handle: Option<TextureHandle>) {
        self.inner.lock().unwrap().bind_texture(unit, flags, handle);
    }

    pub fn unbind_texture(&self, handle: TextureHandle) {
        self.inner.lock().unwrap().unbind_texture(handle);
    }

    pub fn commit_all(&self, class: TimingClass, force: bool) {
        self.inner.lock().unwrap().commit_all(class, force);
    }

    pub fn take_snapshot(&self, bundle: ShadowState) -> SnapshotId {
        self.inner.lock().unwrap().take_snapshot(bundle)
    }

    pub fn default_snapshot(&self) -> SnapshotId {
        self.inner.lock().unwrap().default_snapshot()
    }

    pub fn use_snapshot(&self, id: SnapshotId, deferred: bool) {
        self.inner.lock().unwrap().use_snapshot(id, deferred);
    }

    pub fn set_vec4_constants(&self, start: usize, values: &[[f32; 4]], force: bool) {
        self.inner
            .lock()
            .unwrap()
            .set_vec4_constants(start, values, force);
    }

    pub fn set_bool_constants(&self, start: usize, values: &[bool], force: bool) {
        self.inner
            .lock()
            .unwrap()
            .set_bool_constants(start, values, force);
    }

    pub fn set_int_constants(&self, start: usize, values: &[[i32; 4]], force: bool) {
        self.inner
            .lock()
            .unwrap()
            .set_int_constants(start, values, force);
    }

    pub fn create_texture(
        &self,
        desc: TextureDesc,
        copy_count: usize,
        group: &str,
    ) -> Result<TextureHandle> {
        self.inner
            .lock()
            .unwrap()
            .create_texture(desc, copy_count, group)
    }

    pub fn create_texture_handles(
        &self,
        out: &mut Vec<TextureHandle>,
        count: usize,
        reuse_existing: bool,
    ) {
        self.inner
            .lock()
            .unwrap()
            .create_texture_handles(out, count, reuse_existing);
    }

    pub fn delete_texture(&self, handle: TextureHandle) {
        self.inner.lock().unwrap().delete_texture(handle);
    }

    /// Uploads `bytes` into one mip level of `handle` under a single lock
    /// acquisition. Multi-copy textures advance to their next copy first.
    pub fn update_texture(&self, handle: TextureHandle, level: u8, bytes: &[u8]) -> Result<()> {
        let mut engine = self.inner.lock().unwrap();
        let mut scope = engine.begin_modify(handle)?;
        scope.upload(level, bytes)
    }

    pub fn setup_texture_group(&self, handle: TextureHandle, group: &str) -> Result<()> {
        self.inner.lock().unwrap().setup_texture_group(handle, group)
    }

    pub fn set_texture_sampler(&self, handle: TextureHandle, sampler: SamplerParams) -> Result<()> {
        self.inner.lock().unwrap().set_texture_sampler(handle, sampler)
    }

    pub fn set_std_texture(&self, slot: StdTexture, handle: Option<TextureHandle>) {
        self.inner.lock().unwrap().set_std_texture(slot, handle);
    }

    pub fn std_texture(&self, slot: StdTexture) -> Option<TextureHandle> {
        self.inner.lock().unwrap().std_texture(slot)
    }

    pub fn group_stats(&self, group: &str) -> Option<GroupStats> {
        self.inner.lock().unwrap().textures().group_stats(group)
    }

    pub fn set_active(&self, active: bool) {
        self.inner.lock().unwrap().set_active(active);
    }

    pub fn invalidate(&self) {
        self.inner.lock().unwrap().invalidate();
    }

    pub fn advance_frame(&self) {
        self.inner.lock().unwrap().advance_frame();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::device::headless::HeadlessDevice;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn shared_across_threads() {
        let system = Arc::new(RenderSystem::new(
            HeadlessDevice::new(),
            EngineOptions::default(),
        ));

        let threads: Vec<_> = (0..4)
            .map(|i| {
                let system = system.clone();
                thread::spawn(move || {
                    let desc = TextureDesc {
                        width: 16,
                        height: 16,
                        debug_name: format!("worker-{}", i),
                        ..Default::default()
                    };
                    let handle = system.create_texture(desc, 1, "workers").unwrap();
                    system.bind_texture(i, BindFlags::default(), Some(handle));
                    system.commit_all(TimingClass::PerDraw, false);
                })
            })
            .collect();

        for t in threads {
            t.join().unwrap();
        }

        assert_eq!(system.group_stats("workers").unwrap().global_bytes, 4 * 16 * 16 * 4);
    }

    // Compile-time check that the facade is shareable.
    fn _assert_sync<T: Send + Sync>() {}
    #[allow(dead_code)]
    fn _facade_is_sync() {
        _assert_sync::<RenderSystem<HeadlessDevice>>();
    }
}
