pub mod acceleration_structure;
pub mod raytracing_pipeline;

pub use acceleration_structure::AccelerationStructure;
pub use raytracing_pipeline::RaytracingPipeline;
