use crate::{handle::kind, owner::ResourceOwner};

#[derive(Debug, Default, PartialEq)]
pub struct PipelineLayout {
    inner: ResourceOwner<kind::PipelineLayout>,
}

gpu_resource!(PipelineLayout => PipelineLayout);

impl PipelineLayout {
    pub(crate) fn new(inner: ResourceOwner<kind::PipelineLayout>) -> Self {
        Self { inner }
    }
}

/// 使用 dynamic rendering 的图形管线，不依赖 render pass
#[derive(Debug, Default, PartialEq)]
pub struct GraphicsPipeline {
    inner: ResourceOwner<kind::GraphicsPipeline>,
}

gpu_resource!(GraphicsPipeline => GraphicsPipeline);

impl GraphicsPipeline {
    pub(crate) fn new(inner: ResourceOwner<kind::GraphicsPipeline>) -> Self {
        Self { inner }
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct ComputePipeline {
    inner: ResourceOwner<kind::ComputePipeline>,
}

gpu_resource!(ComputePipeline => ComputePipeline);

impl ComputePipeline {
    pub(crate) fn new(inner: ResourceOwner<kind::ComputePipeline>) -> Self {
        Self { inner }
    }
}
