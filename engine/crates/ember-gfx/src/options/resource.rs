use crate::{
    handle::{SurfaceHandle, SwapchainHandle, YcbcrConversionHandle},
    types::{
        AccelerationStructureType, AddressMode, BufferUsageFlags, ColorSpace, CompareOperation, Extent2D, Extent3D,
        FilterMode, Format, MemoryUsage, MipmapFilterMode, PresentMode, SampleCount, SamplerYcbcrModelConversion,
        SamplerYcbcrRange, TextureAspectFlags, TextureType, TextureUsageFlags, ViewType,
    },
};

#[derive(Clone, Debug)]
pub struct BufferOptions {
    pub label: Option<String>,
    pub size: u64,
    pub usage: BufferUsageFlags,
    pub memory_usage: MemoryUsage,
}

impl Default for BufferOptions {
    fn default() -> Self {
        Self {
            label: None,
            size: 0,
            usage: BufferUsageFlags::empty(),
            memory_usage: MemoryUsage::GpuOnly,
        }
    }
}

#[derive(Clone, Debug)]
pub struct TextureOptions {
    pub label: Option<String>,
    pub texture_type: TextureType,
    pub format: Format,
    pub extent: Extent3D,
    pub mip_levels: u32,
    pub array_layers: u32,
    pub samples: SampleCount,
    pub usage: TextureUsageFlags,
    pub memory_usage: MemoryUsage,
}

impl Default for TextureOptions {
    fn default() -> Self {
        Self {
            label: None,
            texture_type: TextureType::TextureType2D,
            format: Format::R8G8B8A8Unorm,
            extent: Extent3D {
                width: 1,
                height: 1,
                depth: 1,
            },
            mip_levels: 1,
            array_layers: 1,
            samples: SampleCount::Samples1,
            usage: TextureUsageFlags::SAMPLED,
            memory_usage: MemoryUsage::GpuOnly,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureSubresourceRange {
    /// 为空时根据格式推导（深度格式取 DEPTH，其余取 COLOR）
    pub aspect_mask: TextureAspectFlags,
    pub base_mip_level: u32,
    pub level_count: u32,
    pub base_array_layer: u32,
    pub layer_count: u32,
}

impl Default for TextureSubresourceRange {
    fn default() -> Self {
        Self {
            aspect_mask: TextureAspectFlags::empty(),
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct TextureViewOptions {
    pub label: Option<String>,
    pub view_type: ViewType,
    /// `None` 表示沿用纹理本身的格式
    pub format: Option<Format>,
    pub range: TextureSubresourceRange,
}

#[derive(Clone, Debug)]
pub struct SamplerOptions {
    pub label: Option<String>,
    pub mag_filter: FilterMode,
    pub min_filter: FilterMode,
    pub mipmap_filter: MipmapFilterMode,
    pub u: AddressMode,
    pub v: AddressMode,
    pub w: AddressMode,
    pub lod_min_clamp: f32,
    pub lod_max_clamp: f32,
    pub anisotropy_enabled: bool,
    pub max_anisotropy: f32,
    pub compare_enabled: bool,
    pub compare: CompareOperation,
    pub normalized_coordinates: bool,
    pub ycbcr_conversion: Option<YcbcrConversionHandle>,
}

impl Default for SamplerOptions {
    fn default() -> Self {
        Self {
            label: None,
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Linear,
            mipmap_filter: MipmapFilterMode::Linear,
            u: AddressMode::Repeat,
            v: AddressMode::Repeat,
            w: AddressMode::Repeat,
            lod_min_clamp: 0.0,
            lod_max_clamp: f32::MAX,
            anisotropy_enabled: false,
            max_anisotropy: 1.0,
            compare_enabled: false,
            compare: CompareOperation::Always,
            normalized_coordinates: true,
            ycbcr_conversion: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct YcbcrConversionOptions {
    pub label: Option<String>,
    pub format: Format,
    pub model: SamplerYcbcrModelConversion,
    pub range: SamplerYcbcrRange,
    pub chroma_filter: FilterMode,
    pub force_explicit_reconstruction: bool,
}

impl Default for YcbcrConversionOptions {
    fn default() -> Self {
        Self {
            label: None,
            format: Format::G8B8R82Plane420Unorm,
            model: SamplerYcbcrModelConversion::Ycbcr709,
            range: SamplerYcbcrRange::ItuFull,
            chroma_filter: FilterMode::Linear,
            force_explicit_reconstruction: false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SwapchainOptions {
    pub label: Option<String>,
    pub surface: SurfaceHandle,
    pub format: Format,
    pub color_space: ColorSpace,
    pub min_image_count: u32,
    pub extent: Extent2D,
    pub image_layers: u32,
    pub image_usage: TextureUsageFlags,
    pub present_mode: PresentMode,
    pub clipped: bool,
    pub old_swapchain: Option<SwapchainHandle>,
}

impl Default for SwapchainOptions {
    fn default() -> Self {
        Self {
            label: None,
            surface: SurfaceHandle::default(),
            format: Format::B8G8R8A8Unorm,
            color_space: ColorSpace::SRgbNonlinear,
            min_image_count: 3,
            extent: Extent2D {
                width: 0,
                height: 0,
            },
            image_layers: 1,
            image_usage: TextureUsageFlags::COLOR_ATTACHMENT,
            present_mode: PresentMode::Fifo,
            clipped: true,
            old_swapchain: None,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct AccelerationStructureOptions {
    pub label: Option<String>,
    pub ty: AccelerationStructureType,
    /// 加速结构存储所需的字节数，通常来自 build sizes 查询
    pub size: u64,
}
