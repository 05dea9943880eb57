//! The shadow-state snapshot table. Field clusters that historically
//! change in lockstep (blend, depth test, alpha test, fill) are bundled
//! into immutable snapshots, deduplicated by content and referenced by a
//! small-integer id; applying a material becomes one id comparison instead
//! of dozens of per-field diffs.

use crate::device::Device;
use crate::utils::hash::FastHashMap;

use super::{BlendFactor, BlendOp, Comparison, CullMode};

/// A stable id for a registered [`ShadowState`]. Ids are indices into the
/// snapshot list and remain valid until the table is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SnapshotId(pub(crate) u32);

/// The alpha-blend block of a shadow state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AlphaBlendState {
    pub enabled: bool,
    pub src: BlendFactor,
    pub dst: BlendFactor,
    pub op: BlendOp,
    /// Separate blend function for the alpha channel, if enabled.
    pub separate_alpha: Option<(BlendFactor, BlendFactor, BlendOp)>,
}

impl Default for AlphaBlendState {
    fn default() -> Self {
        AlphaBlendState {
            enabled: false,
            src: BlendFactor::One,
            dst: BlendFactor::Zero,
            op: BlendOp::Add,
            separate_alpha: None,
        }
    }
}

/// Depth bias presets; the concrete scale/units pairs are a device concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepthBias {
    Disable,
    Decal,
    ShadowBias,
}

/// The depth-test block of a shadow state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthTestState {
    pub write: bool,
    pub test: Comparison,
    pub bias: DepthBias,
    /// Per-channel color write mask (r, g, b, a).
    pub color_write: (bool, bool, bool, bool),
}

impl Default for DepthTestState {
    fn default() -> Self {
        DepthTestState {
            write: true,
            test: Comparison::LessOrEqual,
            bias: DepthBias::Disable,
            color_write: (true, true, true, true),
        }
    }
}

/// The alpha-test/cull/fill block of a shadow state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AlphaTestMiscState {
    /// Comparison and 8-bit reference value, if alpha testing is enabled.
    pub alpha_test: Option<(Comparison, u8)>,
    pub alpha_to_coverage: bool,
    pub cull: CullMode,
    pub wireframe: bool,
}

impl Default for AlphaTestMiscState {
    fn default() -> Self {
        AlphaTestMiscState {
            alpha_test: None,
            alpha_to_coverage: false,
            cull: CullMode::CounterClockwise,
            wireframe: false,
        }
    }
}

/// The fog/sRGB enable block of a shadow state.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FogMiscState {
    pub srgb_write: bool,
    pub vertex_fog: bool,
}

/// An immutable bundle of rarely-toggled, jointly-meaningful state fields.
/// Snapshots with identical content are interchangeable; the table hands
/// out one id per distinct content.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShadowState {
    pub blend: AlphaBlendState,
    pub depth: DepthTestState,
    pub alpha_misc: AlphaTestMiscState,
    pub fog_misc: FogMiscState,
}

/// Registered snapshots plus the bookkeeping of which one the device is
/// believed to hold. Application diffs the four sub-blocks against the
/// board copy, so switching between snapshots that share blocks only
/// issues the blocks that differ.
pub struct SnapshotTable {
    snapshots: Vec<ShadowState>,
    dedup: FastHashMap<ShadowState, SnapshotId>,
    current: Option<SnapshotId>,
    board: ShadowState,
    board_valid: bool,
}

impl Default for SnapshotTable {
    fn default() -> Self {
        SnapshotTable::new()
    }
}

impl SnapshotTable {
    pub fn new() -> Self {
        SnapshotTable {
            snapshots: Vec::with_capacity(256),
            dedup: FastHashMap::default(),
            current: None,
            board: ShadowState::default(),
            board_valid: false,
        }
    }

    /// Registers `state`, returning the existing id if an identical bundle
    /// was registered before.
    pub fn take_snapshot(&mut self, state: ShadowState) -> SnapshotId {
        if let Some(id) = self.dedup.get(&state) {
            return *id;
        }

        let id = SnapshotId(self.snapshots.len() as u32);
        self.snapshots.push(state);
        self.dedup.insert(state, id);
        trace!("registered snapshot {:?} ({} total)", id, self.snapshots.len());
        id
    }

    /// Returns the bundle registered under `id`.
    pub fn get(&self, id: SnapshotId) -> &ShadowState {
        &self.snapshots[id.0 as usize]
    }

    /// The id the device is believed to hold, if any.
    #[inline]
    pub fn current(&self) -> Option<SnapshotId> {
        self.current
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Makes the device state match `id`. No-ops when `id` is already
    /// current; otherwise only the sub-blocks that differ from the board
    /// copy are issued. Returns true if any device state changed.
    pub fn use_snapshot(&mut self, id: SnapshotId, device: &mut dyn Device) -> bool {
        debug_assert!((id.0 as usize) < self.snapshots.len(), "{:?}", id);

        if self.current == Some(id) {
            return false;
        }

        let state = self.snapshots[id.0 as usize];
        let mut changed = false;

        if !self.board_valid || self.board.blend != state.blend {
            device.set_alpha_blend(state.blend);
            changed = true;
        }

        if !self.board_valid || self.board.depth != state.depth {
            device.set_depth_test(state.depth);
            changed = true;
        }

        if !self.board_valid || self.board.alpha_misc != state.alpha_misc {
            device.set_alpha_test_misc(state.alpha_misc);
            changed = true;
        }

        if !self.board_valid || self.board.fog_misc != state.fog_misc {
            device.set_fog_misc(state.fog_misc);
            changed = true;
        }

        self.board = state;
        self.board_valid = true;
        self.current = Some(id);
        changed
    }

    /// Forgets which snapshot is active. The next `use_snapshot` call
    /// re-applies every sub-block regardless of id match; required after a
    /// device reset clobbers the physical state out from under us.
    pub fn reset(&mut self) {
        self.current = None;
        self.board_valid = false;
    }
}
