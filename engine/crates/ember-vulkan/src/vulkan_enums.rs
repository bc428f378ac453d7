//! ember 类型到 Vulkan 类型的转换

use ash::vk;
use ember_gfx::{
    options::TextureSubresourceRange,
    types::*,
};

pub fn format_to_vk(format: Format) -> vk::Format {
    match format {
        Format::Undefined => vk::Format::UNDEFINED,
        Format::R8Unorm => vk::Format::R8_UNORM,
        Format::R8G8Unorm => vk::Format::R8G8_UNORM,
        Format::R8G8B8A8Unorm => vk::Format::R8G8B8A8_UNORM,
        Format::R8G8B8A8Srgb => vk::Format::R8G8B8A8_SRGB,
        Format::B8G8R8A8Unorm => vk::Format::B8G8R8A8_UNORM,
        Format::B8G8R8A8Srgb => vk::Format::B8G8R8A8_SRGB,
        Format::R16G16B16A16Sfloat => vk::Format::R16G16B16A16_SFLOAT,
        Format::R32Uint => vk::Format::R32_UINT,
        Format::R32Sfloat => vk::Format::R32_SFLOAT,
        Format::R32G32Sfloat => vk::Format::R32G32_SFLOAT,
        Format::R32G32B32Sfloat => vk::Format::R32G32B32_SFLOAT,
        Format::R32G32B32A32Sfloat => vk::Format::R32G32B32A32_SFLOAT,
        Format::D16Unorm => vk::Format::D16_UNORM,
        Format::D24UnormS8Uint => vk::Format::D24_UNORM_S8_UINT,
        Format::D32Sfloat => vk::Format::D32_SFLOAT,
        Format::G8B8R82Plane420Unorm => vk::Format::G8_B8R8_2PLANE_420_UNORM,
    }
}

// 标志位与 Vulkan 取值相同，直接按位转换
#[inline]
pub fn buffer_usage_to_vk(usage: BufferUsageFlags) -> vk::BufferUsageFlags {
    vk::BufferUsageFlags::from_raw(usage.bits())
}

#[inline]
pub fn texture_usage_to_vk(usage: TextureUsageFlags) -> vk::ImageUsageFlags {
    vk::ImageUsageFlags::from_raw(usage.bits())
}

#[inline]
pub fn shader_stages_to_vk(stages: ShaderStageFlags) -> vk::ShaderStageFlags {
    vk::ShaderStageFlags::from_raw(stages.bits())
}

#[inline]
pub fn color_components_to_vk(components: ColorComponentFlags) -> vk::ColorComponentFlags {
    vk::ColorComponentFlags::from_raw(components.bits())
}

#[inline]
pub fn queue_flags_from_vk(flags: vk::QueueFlags) -> QueueFlags {
    QueueFlags::from_bits_truncate(flags.as_raw())
}

/// aspect 为空时根据格式推导
pub fn subresource_range_to_vk(range: &TextureSubresourceRange, format: Format) -> vk::ImageSubresourceRange {
    let aspect_mask = if range.aspect_mask.is_empty() {
        match format {
            Format::D24UnormS8Uint => vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL,
            format if format.is_depth() => vk::ImageAspectFlags::DEPTH,
            _ => vk::ImageAspectFlags::COLOR,
        }
    } else {
        vk::ImageAspectFlags::from_raw(range.aspect_mask.bits())
    };

    vk::ImageSubresourceRange::default()
        .aspect_mask(aspect_mask)
        .base_mip_level(range.base_mip_level)
        .level_count(range.level_count)
        .base_array_layer(range.base_array_layer)
        .layer_count(range.layer_count)
}

pub fn image_type_to_vk(texture_type: TextureType) -> vk::ImageType {
    match texture_type {
        TextureType::TextureType1D => vk::ImageType::TYPE_1D,
        TextureType::TextureType2D | TextureType::TextureTypeCube => vk::ImageType::TYPE_2D,
        TextureType::TextureType3D => vk::ImageType::TYPE_3D,
    }
}

pub fn view_type_to_vk(view_type: ViewType) -> vk::ImageViewType {
    match view_type {
        ViewType::ViewType1D => vk::ImageViewType::TYPE_1D,
        ViewType::ViewType2D => vk::ImageViewType::TYPE_2D,
        ViewType::ViewType3D => vk::ImageViewType::TYPE_3D,
        ViewType::ViewTypeCube => vk::ImageViewType::CUBE,
        ViewType::ViewType1DArray => vk::ImageViewType::TYPE_1D_ARRAY,
        ViewType::ViewType2DArray => vk::ImageViewType::TYPE_2D_ARRAY,
        ViewType::ViewTypeCubeArray => vk::ImageViewType::CUBE_ARRAY,
    }
}

pub fn sample_count_to_vk(samples: SampleCount) -> vk::SampleCountFlags {
    match samples {
        SampleCount::Samples1 => vk::SampleCountFlags::TYPE_1,
        SampleCount::Samples2 => vk::SampleCountFlags::TYPE_2,
        SampleCount::Samples4 => vk::SampleCountFlags::TYPE_4,
        SampleCount::Samples8 => vk::SampleCountFlags::TYPE_8,
        SampleCount::Samples16 => vk::SampleCountFlags::TYPE_16,
    }
}

pub fn filter_to_vk(filter: FilterMode) -> vk::Filter {
    match filter {
        FilterMode::Nearest => vk::Filter::NEAREST,
        FilterMode::Linear => vk::Filter::LINEAR,
    }
}

pub fn mipmap_mode_to_vk(filter: MipmapFilterMode) -> vk::SamplerMipmapMode {
    match filter {
        MipmapFilterMode::Nearest => vk::SamplerMipmapMode::NEAREST,
        MipmapFilterMode::Linear => vk::SamplerMipmapMode::LINEAR,
    }
}

pub fn address_mode_to_vk(mode: AddressMode) -> vk::SamplerAddressMode {
    match mode {
        AddressMode::Repeat => vk::SamplerAddressMode::REPEAT,
        AddressMode::MirroredRepeat => vk::SamplerAddressMode::MIRRORED_REPEAT,
        AddressMode::ClampToEdge => vk::SamplerAddressMode::CLAMP_TO_EDGE,
        AddressMode::ClampToBorder => vk::SamplerAddressMode::CLAMP_TO_BORDER,
    }
}

pub fn compare_op_to_vk(op: CompareOperation) -> vk::CompareOp {
    match op {
        CompareOperation::Never => vk::CompareOp::NEVER,
        CompareOperation::Less => vk::CompareOp::LESS,
        CompareOperation::Equal => vk::CompareOp::EQUAL,
        CompareOperation::LessOrEqual => vk::CompareOp::LESS_OR_EQUAL,
        CompareOperation::Greater => vk::CompareOp::GREATER,
        CompareOperation::NotEqual => vk::CompareOp::NOT_EQUAL,
        CompareOperation::GreaterOrEqual => vk::CompareOp::GREATER_OR_EQUAL,
        CompareOperation::Always => vk::CompareOp::ALWAYS,
    }
}

pub fn descriptor_type_to_vk(binding_type: ResourceBindingType) -> vk::DescriptorType {
    match binding_type {
        ResourceBindingType::Sampler => vk::DescriptorType::SAMPLER,
        ResourceBindingType::CombinedImageSampler => vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
        ResourceBindingType::SampledImage => vk::DescriptorType::SAMPLED_IMAGE,
        ResourceBindingType::StorageImage => vk::DescriptorType::STORAGE_IMAGE,
        ResourceBindingType::UniformBuffer => vk::DescriptorType::UNIFORM_BUFFER,
        ResourceBindingType::StorageBuffer => vk::DescriptorType::STORAGE_BUFFER,
        ResourceBindingType::DynamicUniformBuffer => vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC,
        ResourceBindingType::DynamicStorageBuffer => vk::DescriptorType::STORAGE_BUFFER_DYNAMIC,
        ResourceBindingType::AccelerationStructure => vk::DescriptorType::ACCELERATION_STRUCTURE_KHR,
    }
}

pub fn topology_to_vk(topology: PrimitiveTopology) -> vk::PrimitiveTopology {
    match topology {
        PrimitiveTopology::PointList => vk::PrimitiveTopology::POINT_LIST,
        PrimitiveTopology::LineList => vk::PrimitiveTopology::LINE_LIST,
        PrimitiveTopology::LineStrip => vk::PrimitiveTopology::LINE_STRIP,
        PrimitiveTopology::TriangleList => vk::PrimitiveTopology::TRIANGLE_LIST,
        PrimitiveTopology::TriangleStrip => vk::PrimitiveTopology::TRIANGLE_STRIP,
    }
}

pub fn polygon_mode_to_vk(mode: PolygonMode) -> vk::PolygonMode {
    match mode {
        PolygonMode::Fill => vk::PolygonMode::FILL,
        PolygonMode::Line => vk::PolygonMode::LINE,
        PolygonMode::Point => vk::PolygonMode::POINT,
    }
}

pub fn cull_mode_to_vk(mode: CullMode) -> vk::CullModeFlags {
    match mode {
        CullMode::None => vk::CullModeFlags::NONE,
        CullMode::Front => vk::CullModeFlags::FRONT,
        CullMode::Back => vk::CullModeFlags::BACK,
        CullMode::FrontAndBack => vk::CullModeFlags::FRONT_AND_BACK,
    }
}

pub fn front_face_to_vk(face: FrontFace) -> vk::FrontFace {
    match face {
        FrontFace::CounterClockwise => vk::FrontFace::COUNTER_CLOCKWISE,
        FrontFace::Clockwise => vk::FrontFace::CLOCKWISE,
    }
}

pub fn vertex_rate_to_vk(rate: VertexRate) -> vk::VertexInputRate {
    match rate {
        VertexRate::Vertex => vk::VertexInputRate::VERTEX,
        VertexRate::Instance => vk::VertexInputRate::INSTANCE,
    }
}

pub fn device_type_from_vk(device_type: vk::PhysicalDeviceType) -> AdapterDeviceType {
    match device_type {
        vk::PhysicalDeviceType::INTEGRATED_GPU => AdapterDeviceType::IntegratedGpu,
        vk::PhysicalDeviceType::DISCRETE_GPU => AdapterDeviceType::DiscreteGpu,
        vk::PhysicalDeviceType::VIRTUAL_GPU => AdapterDeviceType::VirtualGpu,
        vk::PhysicalDeviceType::CPU => AdapterDeviceType::Cpu,
        _ => AdapterDeviceType::Other,
    }
}

pub fn present_mode_to_vk(mode: PresentMode) -> vk::PresentModeKHR {
    match mode {
        PresentMode::Immediate => vk::PresentModeKHR::IMMEDIATE,
        PresentMode::Mailbox => vk::PresentModeKHR::MAILBOX,
        PresentMode::Fifo => vk::PresentModeKHR::FIFO,
        PresentMode::FifoRelaxed => vk::PresentModeKHR::FIFO_RELAXED,
    }
}

pub fn color_space_to_vk(color_space: ColorSpace) -> vk::ColorSpaceKHR {
    match color_space {
        ColorSpace::SRgbNonlinear => vk::ColorSpaceKHR::SRGB_NONLINEAR,
    }
}

pub fn command_buffer_level_to_vk(level: CommandBufferLevel) -> vk::CommandBufferLevel {
    match level {
        CommandBufferLevel::Primary => vk::CommandBufferLevel::PRIMARY,
        CommandBufferLevel::Secondary => vk::CommandBufferLevel::SECONDARY,
    }
}

pub fn ycbcr_model_to_vk(model: SamplerYcbcrModelConversion) -> vk::SamplerYcbcrModelConversion {
    match model {
        SamplerYcbcrModelConversion::RgbIdentity => vk::SamplerYcbcrModelConversion::RGB_IDENTITY,
        SamplerYcbcrModelConversion::YcbcrIdentity => vk::SamplerYcbcrModelConversion::YCBCR_IDENTITY,
        SamplerYcbcrModelConversion::Ycbcr709 => vk::SamplerYcbcrModelConversion::YCBCR_709,
        SamplerYcbcrModelConversion::Ycbcr601 => vk::SamplerYcbcrModelConversion::YCBCR_601,
        SamplerYcbcrModelConversion::Ycbcr2020 => vk::SamplerYcbcrModelConversion::YCBCR_2020,
    }
}

pub fn ycbcr_range_to_vk(range: SamplerYcbcrRange) -> vk::SamplerYcbcrRange {
    match range {
        SamplerYcbcrRange::ItuFull => vk::SamplerYcbcrRange::ITU_FULL,
        SamplerYcbcrRange::ItuNarrow => vk::SamplerYcbcrRange::ITU_NARROW,
    }
}

pub fn acceleration_structure_type_to_vk(ty: AccelerationStructureType) -> vk::AccelerationStructureTypeKHR {
    match ty {
        AccelerationStructureType::TopLevel => vk::AccelerationStructureTypeKHR::TOP_LEVEL,
        AccelerationStructureType::BottomLevel => vk::AccelerationStructureTypeKHR::BOTTOM_LEVEL,
    }
}

pub fn shader_group_type_to_vk(ty: RaytracingShaderGroupType) -> vk::RayTracingShaderGroupTypeKHR {
    match ty {
        RaytracingShaderGroupType::General => vk::RayTracingShaderGroupTypeKHR::GENERAL,
        RaytracingShaderGroupType::TrianglesHit => vk::RayTracingShaderGroupTypeKHR::TRIANGLES_HIT_GROUP,
        RaytracingShaderGroupType::ProceduralHit => vk::RayTracingShaderGroupTypeKHR::PROCEDURAL_HIT_GROUP,
    }
}

/// 未使用的着色器槽位写 `VK_SHADER_UNUSED_KHR`
#[inline]
pub fn shader_index_to_vk(index: Option<u32>) -> u32 {
    index.unwrap_or(vk::SHADER_UNUSED_KHR)
}

#[inline]
pub fn pipeline_stage_to_vk(stage: PipelineStageFlags) -> vk::PipelineStageFlags {
    vk::PipelineStageFlags::from_raw(stage.bits())
}

/// 不同用途的内存对应的 vma 分配参数
pub fn allocation_info(memory_usage: MemoryUsage) -> vk_mem::AllocationCreateInfo {
    let (usage, flags) = match memory_usage {
        MemoryUsage::GpuOnly => (vk_mem::MemoryUsage::AutoPreferDevice, vk_mem::AllocationCreateFlags::empty()),
        MemoryUsage::CpuToGpu => {
            (vk_mem::MemoryUsage::Auto, vk_mem::AllocationCreateFlags::HOST_ACCESS_SEQUENTIAL_WRITE)
        }
        MemoryUsage::CpuOnly | MemoryUsage::GpuToCpu => {
            (vk_mem::MemoryUsage::AutoPreferHost, vk_mem::AllocationCreateFlags::HOST_ACCESS_RANDOM)
        }
    };
    vk_mem::AllocationCreateInfo {
        usage,
        flags,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_keep_vulkan_bits() {
        let usage = BufferUsageFlags::TRANSFER_DST | BufferUsageFlags::STORAGE | BufferUsageFlags::SHADER_DEVICE_ADDRESS;
        assert_eq!(
            buffer_usage_to_vk(usage),
            vk::BufferUsageFlags::TRANSFER_DST
                | vk::BufferUsageFlags::STORAGE_BUFFER
                | vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS
        );
        assert_eq!(
            buffer_usage_to_vk(BufferUsageFlags::ACCELERATION_STRUCTURE_STORAGE),
            vk::BufferUsageFlags::ACCELERATION_STRUCTURE_STORAGE_KHR
        );
        assert_eq!(
            texture_usage_to_vk(TextureUsageFlags::COLOR_ATTACHMENT | TextureUsageFlags::SAMPLED),
            vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::SAMPLED
        );
        assert_eq!(
            shader_stages_to_vk(ShaderStageFlags::VERTEX | ShaderStageFlags::FRAGMENT | ShaderStageFlags::RAYGEN),
            vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT | vk::ShaderStageFlags::RAYGEN_KHR
        );
        assert_eq!(color_components_to_vk(ColorComponentFlags::all()), vk::ColorComponentFlags::RGBA);
    }

    #[test]
    fn test_queue_flags_drop_unknown_bits() {
        let flags = queue_flags_from_vk(
            vk::QueueFlags::GRAPHICS | vk::QueueFlags::TRANSFER | vk::QueueFlags::VIDEO_DECODE_KHR,
        );
        assert_eq!(flags, QueueFlags::GRAPHICS | QueueFlags::TRANSFER);
    }

    #[test]
    fn test_subresource_range_aspect() {
        let range = TextureSubresourceRange::default();
        assert_eq!(subresource_range_to_vk(&range, Format::R8G8B8A8Unorm).aspect_mask, vk::ImageAspectFlags::COLOR);
        assert_eq!(subresource_range_to_vk(&range, Format::D32Sfloat).aspect_mask, vk::ImageAspectFlags::DEPTH);
        assert_eq!(
            subresource_range_to_vk(&range, Format::D24UnormS8Uint).aspect_mask,
            vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
        );

        let explicit = TextureSubresourceRange {
            aspect_mask: TextureAspectFlags::DEPTH,
            level_count: 4,
            ..Default::default()
        };
        let vk_range = subresource_range_to_vk(&explicit, Format::D24UnormS8Uint);
        assert_eq!(vk_range.aspect_mask, vk::ImageAspectFlags::DEPTH);
        assert_eq!(vk_range.level_count, 4);
    }

    #[test]
    fn test_enum_tables() {
        assert_eq!(format_to_vk(Format::B8G8R8A8Srgb), vk::Format::B8G8R8A8_SRGB);
        assert_eq!(format_to_vk(Format::G8B8R82Plane420Unorm), vk::Format::G8_B8R8_2PLANE_420_UNORM);
        assert_eq!(image_type_to_vk(TextureType::TextureTypeCube), vk::ImageType::TYPE_2D);
        assert_eq!(view_type_to_vk(ViewType::ViewTypeCubeArray), vk::ImageViewType::CUBE_ARRAY);
        assert_eq!(sample_count_to_vk(SampleCount::Samples4), vk::SampleCountFlags::TYPE_4);
        assert_eq!(
            descriptor_type_to_vk(ResourceBindingType::DynamicUniformBuffer),
            vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC
        );
        assert_eq!(compare_op_to_vk(CompareOperation::GreaterOrEqual), vk::CompareOp::GREATER_OR_EQUAL);
        assert_eq!(cull_mode_to_vk(CullMode::None), vk::CullModeFlags::NONE);
        assert_eq!(present_mode_to_vk(PresentMode::Mailbox), vk::PresentModeKHR::MAILBOX);
        assert_eq!(device_type_from_vk(vk::PhysicalDeviceType::DISCRETE_GPU), AdapterDeviceType::DiscreteGpu);
        assert_eq!(device_type_from_vk(vk::PhysicalDeviceType::from_raw(42)), AdapterDeviceType::Other);
        assert_eq!(
            acceleration_structure_type_to_vk(AccelerationStructureType::TopLevel),
            vk::AccelerationStructureTypeKHR::TOP_LEVEL
        );
    }

    #[test]
    fn test_raytracing_conversions() {
        assert_eq!(
            shader_group_type_to_vk(RaytracingShaderGroupType::ProceduralHit),
            vk::RayTracingShaderGroupTypeKHR::PROCEDURAL_HIT_GROUP
        );
        assert_eq!(shader_index_to_vk(Some(3)), 3);
        assert_eq!(shader_index_to_vk(None), vk::SHADER_UNUSED_KHR);
        assert_eq!(
            pipeline_stage_to_vk(PipelineStageFlags::TOP_OF_PIPE | PipelineStageFlags::RAY_TRACING_SHADER),
            vk::PipelineStageFlags::TOP_OF_PIPE | vk::PipelineStageFlags::RAY_TRACING_SHADER_KHR
        );
        assert_eq!(
            pipeline_stage_to_vk(PipelineStageFlags::ACCELERATION_STRUCTURE_BUILD),
            vk::PipelineStageFlags::ACCELERATION_STRUCTURE_BUILD_KHR
        );
    }

    #[test]
    fn test_allocation_info() {
        let gpu = allocation_info(MemoryUsage::GpuOnly);
        assert!(matches!(gpu.usage, vk_mem::MemoryUsage::AutoPreferDevice));
        assert!(gpu.flags.is_empty());

        let upload = allocation_info(MemoryUsage::CpuToGpu);
        assert!(upload.flags.contains(vk_mem::AllocationCreateFlags::HOST_ACCESS_SEQUENTIAL_WRITE));

        let readback = allocation_info(MemoryUsage::GpuToCpu);
        assert!(readback.flags.contains(vk_mem::AllocationCreateFlags::HOST_ACCESS_RANDOM));
    }
}
