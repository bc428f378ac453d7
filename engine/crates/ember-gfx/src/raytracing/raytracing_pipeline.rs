use crate::{handle::kind, owner::ResourceOwner};

/// 光追管线，只在设备开启了 `ray_tracing_pipeline` 特性时可以创建
#[derive(Debug, Default, PartialEq)]
pub struct RaytracingPipeline {
    inner: ResourceOwner<kind::RaytracingPipeline>,
}

gpu_resource!(RaytracingPipeline => RaytracingPipeline);

impl RaytracingPipeline {
    pub(crate) fn new(inner: ResourceOwner<kind::RaytracingPipeline>) -> Self {
        Self { inner }
    }

    /// 从 `first_group` 开始的 `group_count` 个 shader group handle，首尾相接
    pub fn shader_group_handles(&self, first_group: u32, group_count: u32) -> Vec<u8> {
        self.inner
            .read(|rm, pipeline| rm.raytracing_shader_group_handles(pipeline, first_group, group_count))
            .unwrap_or_default()
    }
}
