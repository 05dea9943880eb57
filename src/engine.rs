//! The engine context: one object owning the device and every cache that
//! shadows it. All state flows through here; callers mutate desired
//! state, and `commit_all` reconciles the device right before drawing.

use std::time::Duration;

use crate::device::Device;
use crate::errors::{Error, Result};
use crate::math::{Matrix4, Vector4};
use crate::state::cache::StateCache;
use crate::state::commit::{CommitFunc, TimingClass};
use crate::state::constants::ConstantCache;
use crate::state::snapshot::{ShadowState, SnapshotId, SnapshotTable};
use crate::state::{
    BindFlags, CullMode, FogParams, SamplerParams, ScissorRect, TransformKind, VertexBlendState,
    MAX_TEXTURE_UNITS,
};
use crate::sync::FrameSync;
use crate::texture::{
    ModifyScope, StdTexture, TextureDesc, TextureHandle, TextureRegistry,
};

/// Construction parameters for [`StateEngine`].
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Size of the vec4 shader-constant register file.
    pub vec4_registers: usize,
    /// Size of the boolean shader-constant register file.
    pub bool_registers: usize,
    /// Size of the ivec4 shader-constant register file.
    pub int_registers: usize,
    /// How many frames the CPU may run ahead of the device.
    pub frame_lag: usize,
    /// Upper bound on a single frame-fence wait.
    pub fence_timeout: Duration,
    /// Per-frame bound-texture byte budget per group; `None` disables the
    /// budget entirely.
    pub texture_frame_budget: Option<u64>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            vec4_registers: 256,
            bool_registers: 16,
            int_registers: 16,
            frame_lag: 2,
            fence_timeout: Duration::from_millis(100),
            texture_frame_budget: None,
        }
    }
}

/// The render-state synchronization context. Owns a device plus the dual
/// state cache, the snapshot table, the constant cache, the texture
/// registry and the frame fence ring.
///
/// While deactivated (device lost or minimized) every mutation still lands
/// in the desired state and every registration is kept, but commits issue
/// no hardware calls; reactivation goes through [`StateEngine::invalidate`]
/// so the first commit afterwards re-issues everything.
pub struct StateEngine<D: Device> {
    device: D,
    active: bool,
    states: StateCache,
    snapshots: SnapshotTable,
    constants: ConstantCache,
    textures: TextureRegistry,
    sync: FrameSync,
    /// Snapshot scheduled for application at the next commit drain.
    pending_snapshot: Option<SnapshotId>,
    default_snapshot: Option<SnapshotId>,
}

impl<D: Device> StateEngine<D> {
    pub fn new(device: D, options: EngineOptions) -> Self {
        info!(
            "state engine up (lag {}, budget {:?})",
            options.frame_lag, options.texture_frame_budget
        );

        StateEngine {
            device,
            active: true,
            states: StateCache::new(),
            snapshots: SnapshotTable::new(),
            constants: ConstantCache::new(
                options.vec4_registers,
                options.bool_registers,
                options.int_registers,
            ),
            textures: TextureRegistry::new(options.texture_frame_budget),
            sync: FrameSync::new(options.frame_lag, options.fence_timeout),
            pending_snapshot: None,
            default_snapshot: None,
        }
    }

    #[inline]
    pub fn device(&self) -> &D {
        &self.device
    }

    #[inline]
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    #[inline]
    pub fn textures(&self) -> &TextureRegistry {
        &self.textures
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }
}

/// State mutators. These touch only the desired copy and the commit
/// registry; nothing reaches the device until `commit_all`.
impl<D: Device> StateEngine<D> {
    pub fn set_transform(&mut self, kind: TransformKind, matrix: Matrix4<f32>) {
        self.states.set_transform(kind, matrix);
    }

    pub fn force_transform(&mut self, kind: TransformKind, matrix: Matrix4<f32>) {
        self.states.force_transform(kind, matrix);
    }

    pub fn set_fog(&mut self, fog: FogParams) {
        self.states.set_fog(fog);
    }

    pub fn force_fog(&mut self, fog: FogParams) {
        self.states.force_fog(fog);
    }

    pub fn set_cull_mode(&mut self, cull: CullMode) {
        self.states.set_cull_mode(cull);
    }

    pub fn force_cull_mode(&mut self, cull: CullMode) {
        self.states.force_cull_mode(cull);
    }

    pub fn set_scissor(&mut self, scissor: Option<ScissorRect>) {
        self.states.set_scissor(scissor);
    }

    pub fn force_scissor(&mut self, scissor: Option<ScissorRect>) {
        self.states.force_scissor(scissor);
    }

    pub fn set_vertex_blend(&mut self, blend: VertexBlendState) {
        self.states.set_vertex_blend(blend);
    }

    pub fn force_vertex_blend(&mut self, blend: VertexBlendState) {
        self.states.force_vertex_blend(blend);
    }

    pub fn set_sampler(&mut self, unit: usize, sampler: SamplerParams) {
        self.states.set_sampler(unit, sampler);
    }

    pub fn force_sampler(&mut self, unit: usize, sampler: SamplerParams) {
        self.states.force_sampler(unit, sampler);
    }

    pub fn set_clip_plane(&mut self, index: usize, plane: Option<Vector4<f32>>) {
        self.states.set_clip_plane(index, plane);
    }

    pub fn force_clip_plane(&mut self, index: usize, plane: Option<Vector4<f32>>) {
        self.states.force_clip_plane(index, plane);
    }

    /// Requests `handle` on `unit`. `None` (or a stale handle, in release
    /// builds) disables texturing on the unit.
    pub fn bind_texture(
        &mut self,
        unit: usize,
        flags: BindFlags,
        handle: Option<TextureHandle>,
    ) {
        debug_assert!(unit < MAX_TEXTURE_UNITS);
        if let Some(handle) = handle {
            debug_assert!(self.textures.contains(handle), "{} is stale", handle);
        }

        self.states.set_binding(unit, handle.map(|h| (h, flags)));
    }

    /// Removes `handle` from every unit it is bound to: desired state,
    /// current state and the device itself. On return nothing references
    /// the handle.
    pub fn unbind_texture(&mut self, handle: TextureHandle) {
        let device: Option<&mut dyn Device> = if self.active {
            Some(&mut self.device)
        } else {
            None
        };
        self.states.unbind(handle, device);
    }

    /// The desired binding of `unit`.
    pub fn binding(&self, unit: usize) -> Option<(TextureHandle, BindFlags)> {
        self.states.desired().bindings[unit]
    }
}

/// Snapshots and commits.
impl<D: Device> StateEngine<D> {
    /// Registers `bundle` in the snapshot table, deduplicating by content.
    pub fn take_snapshot(&mut self, bundle: ShadowState) -> SnapshotId {
        self.snapshots.take_snapshot(bundle)
    }

    /// The snapshot of the startup state, registered on first request.
    pub fn default_snapshot(&mut self) -> SnapshotId {
        match self.default_snapshot {
            Some(id) => id,
            None => {
                let id = self.snapshots.take_snapshot(ShadowState::default());
                self.default_snapshot = Some(id);
                id
            }
        }
    }

    /// Applies a registered snapshot. With `deferred` it is scheduled to
    /// run inside the next per-draw commit drain instead of immediately;
    /// scheduling twice before a drain keeps only the last id.
    pub fn use_snapshot(&mut self, id: SnapshotId, deferred: bool) {
        if deferred {
            self.pending_snapshot = Some(id);
            self.states.register(CommitFunc::Snapshot);
        } else if self.active {
            self.snapshots.use_snapshot(id, &mut self.device);
        } else {
            // Remember the request so reactivation lands on it.
            self.pending_snapshot = Some(id);
            self.states.register(CommitFunc::Snapshot);
        }
    }

    /// The snapshot the device currently holds, if known.
    pub fn current_snapshot(&self) -> Option<SnapshotId> {
        self.snapshots.current()
    }

    /// Drains the registered commit functions of `class`, reconciling
    /// desired against current state with the minimum number of device
    /// calls. With `force`, diffing is skipped and every drained group is
    /// re-issued. While deactivated this is a no-op that keeps every
    /// registration queued.
    pub fn commit_all(&mut self, class: TimingClass, force: bool) {
        if !self.active {
            return;
        }

        let funcs = self.states.take_registered(class);
        let force = force || self.states.force_all();

        let StateEngine {
            ref mut device,
            ref mut states,
            ref mut snapshots,
            ref mut textures,
            ref mut pending_snapshot,
            ..
        } = *self;

        for func in funcs {
            match func {
                CommitFunc::Snapshot => {
                    if let Some(id) = pending_snapshot.take() {
                        snapshots.use_snapshot(id, &mut *device);
                    }
                }
                func => states.reconcile(func, force, &mut *device, textures),
            }
        }

        self.states.settle();
    }

    /// Number of commit functions still queued under `class`.
    pub fn pending_commits(&self, class: TimingClass) -> usize {
        self.states.pending(class)
    }
}

/// Shader constants. Write-through with per-register diffing; no commit
/// drain involved. While deactivated, writes are recorded into the cache
/// and reach the device on the reactivation flush.
impl<D: Device> StateEngine<D> {
    pub fn set_vec4_constants(&mut self, start: usize, values: &[[f32; 4]], force: bool) {
        if !self.active {
            self.constants.record_vec4(start, values);
            return;
        }
        self.constants.set_vec4(&mut self.device, start, values, force);
    }

    pub fn set_bool_constants(&mut self, start: usize, values: &[bool], force: bool) {
        if !self.active {
            self.constants.record_bools(start, values);
            return;
        }
        self.constants.set_bools(&mut self.device, start, values, force);
    }

    pub fn set_int_constants(&mut self, start: usize, values: &[[i32; 4]], force: bool) {
        if !self.active {
            self.constants.record_ints(start, values);
            return;
        }
        self.constants.set_ints(&mut self.device, start, values, force);
    }
}

/// Texture lifecycle passthroughs.
impl<D: Device> StateEngine<D> {
    /// Reserves a handle with no storage behind it.
    pub fn create_texture_handle(&mut self) -> TextureHandle {
        self.textures.create_handle()
    }

    /// Ensures `out` holds `count` live handles, reusing still-valid ones
    /// when `reuse_existing` is set.
    pub fn create_texture_handles(
        &mut self,
        out: &mut Vec<TextureHandle>,
        count: usize,
        reuse_existing: bool,
    ) {
        self.textures.create_handles(out, count, reuse_existing);
    }

    /// Allocates device storage behind a reserved handle.
    pub fn allocate_texture(
        &mut self,
        handle: TextureHandle,
        desc: TextureDesc,
        copy_count: usize,
        group: &str,
    ) -> Result<()> {
        self.textures
            .allocate(&mut self.device, handle, desc, copy_count, group)
    }

    /// Reserves a handle and allocates its storage in one step.
    pub fn create_texture(
        &mut self,
        desc: TextureDesc,
        copy_count: usize,
        group: &str,
    ) -> Result<TextureHandle> {
        self.textures
            .create_texture(&mut self.device, desc, copy_count, group)
    }

    /// Unbinds `handle` everywhere, then destroys its device resources and
    /// frees the handle.
    pub fn delete_texture(&mut self, handle: TextureHandle) {
        self.unbind_texture(handle);
        self.textures.delete(&mut self.device, handle);
    }

    /// Locks `handle` for writes. Multi-copy storage is first unbound from
    /// every unit and advanced to its next copy, so in-flight draws keep
    /// reading the previous one.
    pub fn begin_modify(&mut self, handle: TextureHandle) -> Result<ModifyScope<'_, D>> {
        let multi = match self.textures.get(handle) {
            Some(record) => record.storage.is_multi_copy(),
            None => return Err(Error::TextureHandleInvalid(handle)),
        };

        if multi {
            self.unbind_texture(handle);
        }

        let target = self.textures.begin_modify(handle)?;
        Ok(ModifyScope::new(
            &mut self.textures,
            &mut self.device,
            handle,
            target,
        ))
    }

    pub fn setup_texture_group(&mut self, handle: TextureHandle, group: &str) -> Result<()> {
        self.textures.setup_texture_group(handle, group)
    }

    pub fn set_texture_sampler(
        &mut self,
        handle: TextureHandle,
        sampler: SamplerParams,
    ) -> Result<()> {
        self.textures.set_sampler(handle, sampler)
    }

    pub fn set_std_texture(&mut self, slot: StdTexture, handle: Option<TextureHandle>) {
        self.textures.set_std_texture(slot, handle);
    }

    pub fn std_texture(&self, slot: StdTexture) -> Option<TextureHandle> {
        self.textures.std_texture(slot)
    }
}

/// Device lifecycle.
impl<D: Device> StateEngine<D> {
    /// Activates or deactivates hardware access. Deactivation keeps every
    /// desired-state mutation and queued registration; reactivation is
    /// expected to be followed by [`StateEngine::invalidate`].
    pub fn set_active(&mut self, active: bool) {
        if self.active != active {
            info!("device {}", if active { "activated" } else { "deactivated" });
            self.active = active;

            // Constants recorded during the outage reach the device now.
            if active {
                self.constants.flush(&mut self.device);
            }
        }
    }

    /// The device-lost protocol: forgets everything believed about the
    /// device's state. Snapshot tracking, constant validity and current
    /// state are all cleared and every commit function is queued, so the
    /// next drains rebuild the device from desired state. Constants that
    /// were ever written (including writes recorded while deactivated)
    /// are re-issued here.
    pub fn invalidate(&mut self) {
        warn!("device state invalidated");
        self.snapshots.reset();
        self.constants.invalidate();
        self.states.invalidate();
        self.sync.reset();

        if self.active {
            self.constants.flush(&mut self.device);
        }
    }

    /// Marks the frame boundary: resets per-frame texture accounting and
    /// performs the bounded fence wait that keeps the CPU at most
    /// `frame_lag` frames ahead.
    pub fn advance_frame(&mut self) {
        self.textures.advance_frame();
        self.states.requeue_missed_bindings();

        if self.active {
            self.sync.advance(&mut self.device);
        }
    }
}
