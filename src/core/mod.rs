pub mod gpu_context;
pub mod gpu_rasterizer;
pub mod software_rasterizer;

pub use gpu_context::GpuContext;
pub use gpu_rasterizer::GpuRasterizer;
pub use software_rasterizer::SoftwareRasterizer;
