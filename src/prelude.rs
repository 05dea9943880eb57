pub use crate::device::{Device, DeviceTextureId, FenceId};
pub use crate::engine::{EngineOptions, StateEngine};
pub use crate::state::commit::TimingClass;
pub use crate::state::snapshot::{ShadowState, SnapshotId};
pub use crate::state::{
    BindFlags, CullMode, FogParams, SamplerParams, ScissorRect, TransformKind, VertexBlendState,
};
pub use crate::system::RenderSystem;
pub use crate::texture::{
    StdTexture, TextureDesc, TextureFlags, TextureFormat, TextureHandle, TextureRegistry,
};
