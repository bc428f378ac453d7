pub mod pipeline;
pub mod shader;

pub use pipeline::{ComputePipeline, GraphicsPipeline, PipelineLayout};
pub use shader::ShaderModule;
