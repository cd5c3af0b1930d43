pub mod rasterizer;

pub use rasterizer::*;
