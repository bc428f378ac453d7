use crate::{
    handle::{BindGroupLayoutHandle, PipelineLayoutHandle, ShaderModuleHandle},
    types::{
        ColorComponentFlags, CompareOperation, CullMode, Format, FrontFace, PolygonMode, PrimitiveTopology,
        RaytracingShaderGroupType, SampleCount, ShaderStageFlags, VertexRate,
    },
};

#[derive(Clone, Debug)]
pub struct ShaderStage {
    pub shader_module: ShaderModuleHandle,
    pub stage: ShaderStageFlags,
    pub entry_point: String,
}

impl ShaderStage {
    pub fn new(shader_module: ShaderModuleHandle, stage: ShaderStageFlags) -> Self {
        Self {
            shader_module,
            stage,
            entry_point: "main".to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PushConstantRange {
    pub offset: u32,
    pub size: u32,
    pub shader_stages: ShaderStageFlags,
}

#[derive(Clone, Debug, Default)]
pub struct PipelineLayoutOptions {
    pub label: Option<String>,
    pub bind_group_layouts: Vec<BindGroupLayoutHandle>,
    pub push_constant_ranges: Vec<PushConstantRange>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VertexBufferLayout {
    pub binding: u32,
    pub stride: u32,
    pub input_rate: VertexRate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VertexAttribute {
    pub location: u32,
    pub binding: u32,
    pub format: Format,
    pub offset: u32,
}

#[derive(Clone, Debug, Default)]
pub struct VertexOptions {
    pub buffers: Vec<VertexBufferLayout>,
    pub attributes: Vec<VertexAttribute>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderTargetOptions {
    pub format: Format,
    /// 开启后使用标准的 alpha 混合
    pub blend_enabled: bool,
    pub write_mask: ColorComponentFlags,
}

impl Default for RenderTargetOptions {
    fn default() -> Self {
        Self {
            format: Format::B8G8R8A8Unorm,
            blend_enabled: false,
            write_mask: ColorComponentFlags::all(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DepthStencilOptions {
    pub format: Format,
    pub depth_test_enabled: bool,
    pub depth_writes_enabled: bool,
    pub depth_compare_operation: CompareOperation,
}

impl Default for DepthStencilOptions {
    fn default() -> Self {
        Self {
            format: Format::D32Sfloat,
            depth_test_enabled: true,
            depth_writes_enabled: true,
            depth_compare_operation: CompareOperation::Less,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PrimitiveOptions {
    pub topology: PrimitiveTopology,
    pub cull_mode: CullMode,
    pub front_face: FrontFace,
    pub polygon_mode: PolygonMode,
}

#[derive(Clone, Debug, Default)]
pub struct GraphicsPipelineOptions {
    pub label: Option<String>,
    pub shader_stages: Vec<ShaderStage>,
    pub layout: PipelineLayoutHandle,
    pub vertex: VertexOptions,
    pub render_targets: Vec<RenderTargetOptions>,
    pub depth_stencil: Option<DepthStencilOptions>,
    pub primitive: PrimitiveOptions,
    pub samples: SampleCount,
}

#[derive(Clone, Debug)]
pub struct ComputePipelineOptions {
    pub label: Option<String>,
    pub layout: PipelineLayoutHandle,
    pub shader_stage: ShaderStage,
}

/// 下标都指向 [`RaytracingPipelineOptions::shader_stages`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RaytracingShaderGroup {
    pub group_type: RaytracingShaderGroupType,
    /// 只在 `General` 组中使用
    pub general_shader_index: Option<u32>,
    pub closest_hit_shader_index: Option<u32>,
    pub any_hit_shader_index: Option<u32>,
    /// 只在 `ProceduralHit` 组中使用，且必须存在
    pub intersection_shader_index: Option<u32>,
}

impl RaytracingShaderGroup {
    pub fn general(shader_index: u32) -> Self {
        Self {
            group_type: RaytracingShaderGroupType::General,
            general_shader_index: Some(shader_index),
            closest_hit_shader_index: None,
            any_hit_shader_index: None,
            intersection_shader_index: None,
        }
    }

    pub fn triangles_hit(closest_hit_shader_index: Option<u32>, any_hit_shader_index: Option<u32>) -> Self {
        Self {
            group_type: RaytracingShaderGroupType::TrianglesHit,
            general_shader_index: None,
            closest_hit_shader_index,
            any_hit_shader_index,
            intersection_shader_index: None,
        }
    }

    /// 引用的下标都在 `stage_count` 之内，且与组的种类相符
    pub fn is_valid(&self, stage_count: usize) -> bool {
        let in_range = |index: Option<u32>| index.is_none_or(|index| (index as usize) < stage_count);
        let indices_in_range = in_range(self.general_shader_index)
            && in_range(self.closest_hit_shader_index)
            && in_range(self.any_hit_shader_index)
            && in_range(self.intersection_shader_index);

        let shape_ok = match self.group_type {
            RaytracingShaderGroupType::General => {
                self.general_shader_index.is_some()
                    && self.closest_hit_shader_index.is_none()
                    && self.any_hit_shader_index.is_none()
                    && self.intersection_shader_index.is_none()
            }
            RaytracingShaderGroupType::TrianglesHit => {
                self.general_shader_index.is_none() && self.intersection_shader_index.is_none()
            }
            RaytracingShaderGroupType::ProceduralHit => {
                self.general_shader_index.is_none() && self.intersection_shader_index.is_some()
            }
        };
        indices_in_range && shape_ok
    }
}

#[derive(Clone, Debug, Default)]
pub struct RaytracingPipelineOptions {
    pub label: Option<String>,
    pub shader_stages: Vec<ShaderStage>,
    pub shader_groups: Vec<RaytracingShaderGroup>,
    pub layout: PipelineLayoutHandle,
    /// 0 表示使用设备允许的最大递归深度
    pub max_recursion_depth: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shader_group_validation() {
        assert!(RaytracingShaderGroup::general(0).is_valid(1));
        assert!(!RaytracingShaderGroup::general(1).is_valid(1));
        assert!(RaytracingShaderGroup::triangles_hit(Some(2), None).is_valid(3));
        assert!(RaytracingShaderGroup::triangles_hit(None, None).is_valid(0));

        let procedural = RaytracingShaderGroup {
            group_type: RaytracingShaderGroupType::ProceduralHit,
            general_shader_index: None,
            closest_hit_shader_index: Some(0),
            any_hit_shader_index: None,
            intersection_shader_index: None,
        };
        assert!(!procedural.is_valid(2));
        assert!(
            RaytracingShaderGroup {
                intersection_shader_index: Some(1),
                ..procedural
            }
            .is_valid(2)
        );

        let general_with_hit = RaytracingShaderGroup {
            closest_hit_shader_index: Some(0),
            ..RaytracingShaderGroup::general(0)
        };
        assert!(!general_with_hit.is_valid(1));
    }
}
