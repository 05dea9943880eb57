//! The deferred commit-function registry. Mutating a desired state field
//! queues the field group's commit function; draining the queue right
//! before a draw (or once per render pass) reconciles desired against
//! current state with the minimum number of device calls.

use super::{TransformKind, MAX_TEXTURE_UNITS};

/// When a queued commit function runs: before every draw call, or once per
/// render pass. Per-pass exists for state whose derived value is
/// invalidated by the pass boundary itself (projection-dependent clip
/// planes), even when the source fields are unchanged since the last draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimingClass {
    PerDraw,
    PerPass,
}

impl TimingClass {
    #[inline]
    fn index(self) -> usize {
        match self {
            TimingClass::PerDraw => 0,
            TimingClass::PerPass => 1,
        }
    }
}

/// One reconcilable slice of render state. A single variant may cover
/// several logically-adjacent fields (all wrap axes and filters of one
/// sampler, say) so that one device call can batch them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitFunc {
    /// Apply a pending deferred snapshot before per-field reconciliation.
    Snapshot,
    Transform(TransformKind),
    Fog,
    CullMode,
    Scissor,
    VertexBlend,
    ClipPlanes,
    Sampler(usize),
    TextureBinding(usize),
}

impl CommitFunc {
    /// Total number of distinct commit functions; sizes the dense
    /// registration bitmap.
    pub const COUNT: usize = 9 + 2 * MAX_TEXTURE_UNITS;

    /// The dense identity of this function inside the registration bitmap.
    pub fn bit_index(self) -> usize {
        match self {
            CommitFunc::Snapshot => 0,
            CommitFunc::Transform(kind) => 1 + kind.slot(),
            CommitFunc::Fog => 4,
            CommitFunc::CullMode => 5,
            CommitFunc::Scissor => 6,
            CommitFunc::VertexBlend => 7,
            CommitFunc::ClipPlanes => 8,
            CommitFunc::Sampler(unit) => 9 + unit,
            CommitFunc::TextureBinding(unit) => 9 + MAX_TEXTURE_UNITS + unit,
        }
    }

    /// The timing class this field group is declared with.
    pub fn timing_class(self) -> TimingClass {
        match self {
            CommitFunc::ClipPlanes => TimingClass::PerPass,
            _ => TimingClass::PerDraw,
        }
    }

    /// Every reconcilable function, used to force a full re-issue after a
    /// device reset. The pending-snapshot function is excluded since there
    /// is nothing pending to apply.
    pub fn all() -> impl Iterator<Item = CommitFunc> {
        let fixed = [
            CommitFunc::Transform(TransformKind::World),
            CommitFunc::Transform(TransformKind::View),
            CommitFunc::Transform(TransformKind::Projection),
            CommitFunc::Fog,
            CommitFunc::CullMode,
            CommitFunc::Scissor,
            CommitFunc::VertexBlend,
            CommitFunc::ClipPlanes,
        ];

        let samplers = (0..MAX_TEXTURE_UNITS).map(CommitFunc::Sampler);
        let bindings = (0..MAX_TEXTURE_UNITS).map(CommitFunc::TextureBinding);

        fixed.to_vec().into_iter().chain(samplers).chain(bindings)
    }
}

/// Pending commit functions, partitioned by timing class. Each class keeps
/// a dense boolean array keyed by function identity (so re-registering is
/// an O(1) no-op) plus a FIFO queue in first-registration order.
pub struct CommitRegistry {
    registered: [[bool; CommitFunc::COUNT]; 2],
    queues: [Vec<CommitFunc>; 2],
}

impl Default for CommitRegistry {
    fn default() -> Self {
        CommitRegistry::new()
    }
}

impl CommitRegistry {
    pub fn new() -> Self {
        CommitRegistry {
            registered: [[false; CommitFunc::COUNT]; 2],
            queues: [Vec::new(), Vec::new()],
        }
    }

    /// Queues `func` under its declared timing class. Returns false if it
    /// was already queued.
    pub fn register(&mut self, func: CommitFunc) -> bool {
        let class = func.timing_class().index();
        let bit = func.bit_index();

        if self.registered[class][bit] {
            false
        } else {
            self.registered[class][bit] = true;
            self.queues[class].push(func);
            true
        }
    }

    /// Returns true if `func` is currently queued.
    pub fn is_registered(&self, func: CommitFunc) -> bool {
        self.registered[func.timing_class().index()][func.bit_index()]
    }

    /// Removes and returns every queued function of `class`, in
    /// registration order.
    pub fn take(&mut self, class: TimingClass) -> Vec<CommitFunc> {
        let class = class.index();
        for func in &self.queues[class] {
            self.registered[class][func.bit_index()] = false;
        }

        ::std::mem::replace(&mut self.queues[class], Vec::new())
    }

    /// Drops every queued function of `class` without invoking anything.
    pub fn clear(&mut self, class: TimingClass) {
        self.take(class);
    }

    pub fn len(&self, class: TimingClass) -> usize {
        self.queues[class.index()].len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues[0].is_empty() && self.queues[1].is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn register_dedup() {
        let mut registry = CommitRegistry::new();

        assert!(registry.register(CommitFunc::Fog));
        assert!(!registry.register(CommitFunc::Fog));
        assert!(registry.register(CommitFunc::Sampler(3)));
        assert!(registry.register(CommitFunc::Sampler(4)));

        assert_eq!(registry.len(TimingClass::PerDraw), 3);
    }

    #[test]
    fn fifo_order() {
        let mut registry = CommitRegistry::new();
        registry.register(CommitFunc::CullMode);
        registry.register(CommitFunc::Fog);
        registry.register(CommitFunc::CullMode);

        let drained = registry.take(TimingClass::PerDraw);
        assert_eq!(drained, vec![CommitFunc::CullMode, CommitFunc::Fog]);
        assert!(registry.is_empty());

        // Draining clears the identity bits, so re-registration works.
        assert!(registry.register(CommitFunc::CullMode));
    }

    #[test]
    fn timing_classes_are_disjoint() {
        let mut registry = CommitRegistry::new();
        registry.register(CommitFunc::Fog);
        registry.register(CommitFunc::ClipPlanes);

        assert_eq!(registry.take(TimingClass::PerDraw), vec![CommitFunc::Fog]);
        assert_eq!(
            registry.take(TimingClass::PerPass),
            vec![CommitFunc::ClipPlanes]
        );
    }

    #[test]
    fn bit_indices_are_unique() {
        let mut seen = [false; CommitFunc::COUNT];
        for func in CommitFunc::all().chain(Some(CommitFunc::Snapshot)) {
            assert!(!seen[func.bit_index()], "{:?}", func);
            seen[func.bit_index()] = true;
        }
    }
}
