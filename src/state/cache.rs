//! The dual state cache: two parallel copies of every frequently-changing
//! state field, desired (what callers most recently requested) and
//! current (what the device is believed to hold), plus the commit
//! registry that remembers which field groups have diverged.

use crate::device::Device;
use crate::math::{Matrix, Matrix4, SquareMatrix, Vector4};
use crate::texture::{TextureHandle, TextureRegistry};

use super::commit::{CommitFunc, CommitRegistry, TimingClass};
use super::{
    BindFlags, CullMode, FogParams, SamplerParams, ScissorRect, TransformKind, VertexBlendState,
    MAX_CLIP_PLANES, MAX_TEXTURE_UNITS,
};

/// One complete copy of the frequently-changing state fields.
#[derive(Debug, Clone, PartialEq)]
pub struct StateValues {
    pub transforms: [Matrix4<f32>; 3],
    pub fog: FogParams,
    pub cull: CullMode,
    pub scissor: Option<ScissorRect>,
    pub vertex_blend: VertexBlendState,
    pub samplers: [SamplerParams; MAX_TEXTURE_UNITS],
    pub bindings: [Option<(TextureHandle, BindFlags)>; MAX_TEXTURE_UNITS],
    pub clip_planes: [Option<Vector4<f32>>; MAX_CLIP_PLANES],
}

impl Default for StateValues {
    fn default() -> Self {
        StateValues {
            transforms: [Matrix4::identity(); 3],
            fog: FogParams::default(),
            cull: CullMode::default(),
            scissor: None,
            vertex_blend: VertexBlendState::default(),
            samplers: [SamplerParams::default(); MAX_TEXTURE_UNITS],
            bindings: [None; MAX_TEXTURE_UNITS],
            clip_planes: [None; MAX_CLIP_PLANES],
        }
    }
}

/// Desired and current state copies plus the registry of pending commit
/// functions. Mutators compare against desired and queue the group's
/// commit function on an actual change; reconciliation diffs desired
/// against current, issues the delta and copies desired into current.
pub struct StateCache {
    desired: StateValues,
    current: StateValues,
    registry: CommitRegistry,
    /// Set after a device reset: current is known stale, so reconcilers
    /// skip the diff and re-issue everything until both queues drain.
    force_all: bool,
}

impl Default for StateCache {
    fn default() -> Self {
        StateCache::new()
    }
}

impl StateCache {
    pub fn new() -> Self {
        StateCache {
            desired: StateValues::default(),
            current: StateValues::default(),
            registry: CommitRegistry::new(),
            force_all: false,
        }
    }

    #[inline]
    pub fn desired(&self) -> &StateValues {
        &self.desired
    }

    #[inline]
    pub fn current(&self) -> &StateValues {
        &self.current
    }

    #[inline]
    pub(crate) fn register(&mut self, func: CommitFunc) {
        self.registry.register(func);
    }

    #[inline]
    pub(crate) fn take_registered(&mut self, class: TimingClass) -> Vec<CommitFunc> {
        self.registry.take(class)
    }

    #[inline]
    pub(crate) fn force_all(&self) -> bool {
        self.force_all
    }

    /// Clears the post-reset force flag once every queue has drained.
    pub(crate) fn settle(&mut self) {
        if self.registry.is_empty() {
            self.force_all = false;
        }
    }

    pub fn pending(&self, class: TimingClass) -> usize {
        self.registry.len(class)
    }
}

impl StateCache {
    pub fn set_transform(&mut self, kind: TransformKind, matrix: Matrix4<f32>) {
        if self.desired.transforms[kind.slot()] != matrix {
            self.desired.transforms[kind.slot()] = matrix;
            self.registry.register(CommitFunc::Transform(kind));

            // Clip planes are derived from the view and projection
            // matrices, so those invalidate the per-pass derivation too.
            if kind != TransformKind::World && self.any_clip_plane() {
                self.registry.register(CommitFunc::ClipPlanes);
            }
        }
    }

    pub fn force_transform(&mut self, kind: TransformKind, matrix: Matrix4<f32>) {
        self.desired.transforms[kind.slot()] = matrix;
        self.registry.register(CommitFunc::Transform(kind));
    }

    pub fn set_fog(&mut self, fog: FogParams) {
        if self.desired.fog != fog {
            self.desired.fog = fog;
            self.registry.register(CommitFunc::Fog);
        }
    }

    pub fn force_fog(&mut self, fog: FogParams) {
        self.desired.fog = fog;
        self.registry.register(CommitFunc::Fog);
    }

    pub fn set_cull_mode(&mut self, cull: CullMode) {
        if self.desired.cull != cull {
            self.desired.cull = cull;
            self.registry.register(CommitFunc::CullMode);
        }
    }

    pub fn force_cull_mode(&mut self, cull: CullMode) {
        self.desired.cull = cull;
        self.registry.register(CommitFunc::CullMode);
    }

    pub fn set_scissor(&mut self, scissor: Option<ScissorRect>) {
        if self.desired.scissor != scissor {
            self.desired.scissor = scissor;
            self.registry.register(CommitFunc::Scissor);
        }
    }

    pub fn force_scissor(&mut self, scissor: Option<ScissorRect>) {
        self.desired.scissor = scissor;
        self.registry.register(CommitFunc::Scissor);
    }

    pub fn set_vertex_blend(&mut self, blend: VertexBlendState) {
        if self.desired.vertex_blend != blend {
            self.desired.vertex_blend = blend;
            self.registry.register(CommitFunc::VertexBlend);
        }
    }

    pub fn force_vertex_blend(&mut self, blend: VertexBlendState) {
        self.desired.vertex_blend = blend;
        self.registry.register(CommitFunc::VertexBlend);
    }

    pub fn set_sampler(&mut self, unit: usize, sampler: SamplerParams) {
        debug_assert!(unit < MAX_TEXTURE_UNITS);
        if self.desired.samplers[unit] != sampler {
            self.desired.samplers[unit] = sampler;
            self.registry.register(CommitFunc::Sampler(unit));
        }
    }

    pub fn force_sampler(&mut self, unit: usize, sampler: SamplerParams) {
        debug_assert!(unit < MAX_TEXTURE_UNITS);
        self.desired.samplers[unit] = sampler;
        self.registry.register(CommitFunc::Sampler(unit));
    }

    pub fn set_binding(&mut self, unit: usize, binding: Option<(TextureHandle, BindFlags)>) {
        debug_assert!(unit < MAX_TEXTURE_UNITS);
        if self.desired.bindings[unit] != binding {
            self.desired.bindings[unit] = binding;
            self.registry.register(CommitFunc::TextureBinding(unit));
        }
    }

    pub fn set_clip_plane(&mut self, index: usize, plane: Option<Vector4<f32>>) {
        debug_assert!(index < MAX_CLIP_PLANES);
        if self.desired.clip_planes[index] != plane {
            self.desired.clip_planes[index] = plane;
            self.registry.register(CommitFunc::ClipPlanes);
        }
    }

    pub fn force_clip_plane(&mut self, index: usize, plane: Option<Vector4<f32>>) {
        debug_assert!(index < MAX_CLIP_PLANES);
        self.desired.clip_planes[index] = plane;
        self.registry.register(CommitFunc::ClipPlanes);
    }

    fn any_clip_plane(&self) -> bool {
        self.desired.clip_planes.iter().any(|p| p.is_some())
    }

    /// Queues the binding commit function for every unit whose desired
    /// binding never reached the device, so binds degraded by the frame
    /// budget are retried once the budget resets.
    pub(crate) fn requeue_missed_bindings(&mut self) {
        for unit in 0..MAX_TEXTURE_UNITS {
            if self.desired.bindings[unit] != self.current.bindings[unit] {
                self.registry.register(CommitFunc::TextureBinding(unit));
            }
        }
    }

    /// Removes `handle` from every unit. Desired entries are cleared with
    /// the unit's commit function queued; current entries are cleared
    /// immediately, with an unbind issued through `device` when one is
    /// supplied (the device may be deactivated).
    pub fn unbind(&mut self, handle: TextureHandle, mut device: Option<&mut dyn Device>) {
        for unit in 0..MAX_TEXTURE_UNITS {
            if self.desired.bindings[unit].map(|(h, _)| h) == Some(handle) {
                self.desired.bindings[unit] = None;
                self.registry.register(CommitFunc::TextureBinding(unit));
            }

            if self.current.bindings[unit].map(|(h, _)| h) == Some(handle) {
                self.current.bindings[unit] = None;
                if let Some(ref mut device) = device {
                    device.bind_texture(unit, None);
                }
            }
        }
    }

    /// Marks every tracked field stale and queues every commit function;
    /// the next drains re-issue the full desired state.
    pub fn invalidate(&mut self) {
        self.current = StateValues::default();
        self.force_all = true;
        for func in CommitFunc::all() {
            self.registry.register(func);
        }
    }

    /// Runs one commit function: diff desired against current for its
    /// slice of state, issue the minimal device calls and copy desired
    /// into current for the fields it touched.
    pub(crate) fn reconcile(
        &mut self,
        func: CommitFunc,
        force: bool,
        device: &mut dyn Device,
        textures: &mut TextureRegistry,
    ) {
        let force = force || self.force_all;

        match func {
            CommitFunc::Snapshot => {
                debug_assert!(false, "pending snapshots are applied by the engine");
            }

            CommitFunc::Transform(kind) => {
                let slot = kind.slot();
                if force || self.desired.transforms[slot] != self.current.transforms[slot] {
                    device.set_transform(kind, self.desired.transforms[slot]);
                    self.current.transforms[slot] = self.desired.transforms[slot];
                }
            }

            CommitFunc::Fog => {
                if force || self.desired.fog != self.current.fog {
                    device.set_fog(self.desired.fog);
                    self.current.fog = self.desired.fog;
                }
            }

            CommitFunc::CullMode => {
                if force || self.desired.cull != self.current.cull {
                    device.set_cull_mode(self.desired.cull);
                    self.current.cull = self.desired.cull;
                }
            }

            CommitFunc::Scissor => {
                if force || self.desired.scissor != self.current.scissor {
                    device.set_scissor(self.desired.scissor);
                    self.current.scissor = self.desired.scissor;
                }
            }

            CommitFunc::VertexBlend => {
                if force || self.desired.vertex_blend != self.current.vertex_blend {
                    device.set_vertex_blend(self.desired.vertex_blend);
                    self.current.vertex_blend = self.desired.vertex_blend;
                }
            }

            CommitFunc::Sampler(unit) => {
                if force || self.desired.samplers[unit] != self.current.samplers[unit] {
                    device.set_sampler(unit, self.desired.samplers[unit]);
                    self.current.samplers[unit] = self.desired.samplers[unit];
                }
            }

            CommitFunc::TextureBinding(unit) => {
                if force || self.desired.bindings[unit] != self.current.bindings[unit] {
                    let resolved = self.desired.bindings[unit].and_then(|(handle, flags)| {
                        textures.note_bind(handle).map(|id| (id, flags))
                    });
                    device.bind_texture(unit, resolved);
                    // Record what actually reached the device. A degraded
                    // bind leaves current at None, so the request stays
                    // visible as unconverged and can be retried.
                    self.current.bindings[unit] = if resolved.is_some() {
                        self.desired.bindings[unit]
                    } else {
                        None
                    };
                }
            }

            CommitFunc::ClipPlanes => {
                // Planes are declared in world space and sent to the
                // device in clip space, so this derivation must re-run
                // every pass the source state was touched in, even when
                // the raw plane values are unchanged.
                let clip = self.clip_space_matrix();
                for index in 0..MAX_CLIP_PLANES {
                    match self.desired.clip_planes[index] {
                        Some(plane) => device.set_clip_plane(index, Some(clip * plane)),
                        None => {
                            if force || self.current.clip_planes[index].is_some() {
                                device.set_clip_plane(index, None);
                            }
                        }
                    }
                    self.current.clip_planes[index] = self.desired.clip_planes[index];
                }
            }
        }
    }

    fn clip_space_matrix(&self) -> Matrix4<f32> {
        let view = self.desired.transforms[TransformKind::View.slot()];
        let projection = self.desired.transforms[TransformKind::Projection.slot()];

        (projection * view)
            .invert()
            .unwrap_or_else(Matrix4::identity)
            .transpose()
    }
}
