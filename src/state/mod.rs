//! Render-state field groups and the machinery that keeps them
//! synchronized with the device: the dual desired/current cache, the
//! deferred commit-function registry, the shadow-state snapshot table and
//! the shader-constant register cache.

pub mod cache;
pub mod commit;
pub mod constants;
pub mod snapshot;

/// Number of hardware texture/sampler units tracked by the cache.
pub const MAX_TEXTURE_UNITS: usize = 16;

/// Number of user clip planes tracked by the cache.
pub const MAX_CLIP_PLANES: usize = 6;

/// Specify whether front- or back-facing polygons can be culled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullMode {
    Nothing,
    Clockwise,
    CounterClockwise,
}

impl Default for CullMode {
    fn default() -> Self {
        CullMode::CounterClockwise
    }
}

/// The comparison applied by depth and alpha tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    Never,
    Less,
    Equal,
    LessOrEqual,
    Greater,
    NotEqual,
    GreaterOrEqual,
    Always,
}

impl Default for Comparison {
    fn default() -> Self {
        Comparison::Always
    }
}

/// Specifies how incoming fragments are combined with the render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    InvSrcColor,
    SrcAlpha,
    InvSrcAlpha,
    DstAlpha,
    InvDstAlpha,
    DstColor,
    InvDstColor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendOp {
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

/// The fixed-function fog configuration. Equality is structural with exact
/// float comparison, matching the bitwise diffing the commit functions
/// perform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FogMode {
    Disabled,
    Linear { start: f32, end: f32 },
    Exp { density: f32 },
    Exp2 { density: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FogParams {
    pub mode: FogMode,
    pub color: [f32; 4],
}

impl Default for FogParams {
    fn default() -> Self {
        FogParams {
            mode: FogMode::Disabled,
            color: [0.0; 4],
        }
    }
}

/// Sets the wrap parameter for one sampler axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerWrap {
    Repeat,
    Mirror,
    Clamp,
    Border,
}

/// Specify how the texture is sampled whenever a pixel is being looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerFilter {
    Point,
    Linear,
    Anisotropic,
}

/// Filtering between mip levels; `None` disables mipmapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MipFilter {
    None,
    Point,
    Linear,
}

/// The full sampler configuration of one texture unit, batched into a
/// single commit function so that all wrap axes and filters for a unit go
/// out in one reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerParams {
    pub wrap_s: SamplerWrap,
    pub wrap_t: SamplerWrap,
    pub wrap_u: SamplerWrap,
    pub min_filter: SamplerFilter,
    pub mag_filter: SamplerFilter,
    pub mip_filter: MipFilter,
}

impl Default for SamplerParams {
    fn default() -> Self {
        SamplerParams {
            wrap_s: SamplerWrap::Repeat,
            wrap_t: SamplerWrap::Repeat,
            wrap_u: SamplerWrap::Repeat,
            min_filter: SamplerFilter::Linear,
            mag_filter: SamplerFilter::Linear,
            mip_filter: MipFilter::None,
        }
    }
}

/// Flags a texture was last bound with.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindFlags {
    /// Read texels through gamma conversion.
    pub srgb_read: bool,
    /// Sample with hardware shadow-map comparison filtering.
    pub shadow_filter: bool,
}

/// The scissor box, relative to the top-left corner of the render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScissorRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Which transform slot a matrix belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformKind {
    World,
    View,
    Projection,
}

impl TransformKind {
    #[inline]
    pub(crate) fn slot(self) -> usize {
        match self {
            TransformKind::World => 0,
            TransformKind::View => 1,
            TransformKind::Projection => 2,
        }
    }
}

/// Fixed-function vertex blending (skinning) configuration.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexBlendState {
    pub enabled: bool,
    pub weight_count: u8,
}
