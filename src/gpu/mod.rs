mod buffers;
mod compute;
mod context;
mod render;
mod substrate;

pub use buffers::{DisplayBuffers, GridBuffers, RenderParams, SimParams};
pub use compute::{workgroup_counts, ComputePipeline};
pub use context::{GpuContext, SurfaceContext};
pub use render::RenderPipeline;
pub use substrate::GpuSubstrate;
