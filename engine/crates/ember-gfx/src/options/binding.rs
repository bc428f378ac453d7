use crate::{
    handle::{
        AccelerationStructureHandle, BindGroupLayoutHandle, BindGroupPoolHandle, BufferHandle, SamplerHandle,
        TextureViewHandle,
    },
    options::WHOLE_SIZE,
    types::{ResourceBindingType, ShaderStageFlags},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResourceBindingLayout {
    pub binding: u32,
    pub count: u32,
    pub resource_type: ResourceBindingType,
    pub shader_stages: ShaderStageFlags,
}

#[derive(Clone, Debug, Default)]
pub struct BindGroupLayoutOptions {
    pub label: Option<String>,
    pub bindings: Vec<ResourceBindingLayout>,
}

/// 一个 bind group pool 能容纳的各类描述符数量
#[derive(Clone, Debug)]
pub struct BindGroupPoolOptions {
    pub label: Option<String>,
    pub uniform_buffer_count: u32,
    pub dynamic_uniform_buffer_count: u32,
    pub storage_buffer_count: u32,
    pub texture_sampler_count: u32,
    pub texture_count: u32,
    pub sampler_count: u32,
    pub image_count: u32,
    pub acceleration_structure_count: u32,
    pub max_bind_group_count: u32,
}

impl Default for BindGroupPoolOptions {
    fn default() -> Self {
        Self {
            label: None,
            uniform_buffer_count: 10,
            dynamic_uniform_buffer_count: 0,
            storage_buffer_count: 0,
            texture_sampler_count: 0,
            texture_count: 0,
            sampler_count: 0,
            image_count: 0,
            acceleration_structure_count: 0,
            max_bind_group_count: 10,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindingResource {
    UniformBuffer {
        buffer: BufferHandle,
        offset: u64,
        size: u64,
    },
    StorageBuffer {
        buffer: BufferHandle,
        offset: u64,
        size: u64,
    },
    DynamicUniformBuffer {
        buffer: BufferHandle,
        offset: u64,
        size: u64,
    },
    TextureView(TextureViewHandle),
    StorageImage(TextureViewHandle),
    Sampler(SamplerHandle),
    TextureViewSampler {
        view: TextureViewHandle,
        sampler: SamplerHandle,
    },
    AccelerationStructure(AccelerationStructureHandle),
}

impl BindingResource {
    pub fn uniform_buffer(buffer: BufferHandle) -> Self {
        BindingResource::UniformBuffer {
            buffer,
            offset: 0,
            size: WHOLE_SIZE,
        }
    }

    pub fn storage_buffer(buffer: BufferHandle) -> Self {
        BindingResource::StorageBuffer {
            buffer,
            offset: 0,
            size: WHOLE_SIZE,
        }
    }

    /// 能否写入 layout 中声明为 `binding_type` 的槽位
    pub fn matches(&self, binding_type: ResourceBindingType) -> bool {
        use ResourceBindingType as Ty;
        matches!(
            (self, binding_type),
            (BindingResource::UniformBuffer { .. }, Ty::UniformBuffer)
                | (BindingResource::StorageBuffer { .. }, Ty::StorageBuffer | Ty::DynamicStorageBuffer)
                | (BindingResource::DynamicUniformBuffer { .. }, Ty::DynamicUniformBuffer)
                | (BindingResource::TextureView(_), Ty::SampledImage)
                | (BindingResource::StorageImage(_), Ty::StorageImage)
                | (BindingResource::Sampler(_), Ty::Sampler)
                | (BindingResource::TextureViewSampler { .. }, Ty::CombinedImageSampler)
                | (BindingResource::AccelerationStructure(_), Ty::AccelerationStructure)
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BindGroupEntry {
    pub binding: u32,
    pub array_element: u32,
    pub resource: BindingResource,
}

#[derive(Clone, Debug, Default)]
pub struct BindGroupOptions {
    pub label: Option<String>,
    pub layout: BindGroupLayoutHandle,
    pub resources: Vec<BindGroupEntry>,
    /// `None` 时从设备内部的默认 pool 分配
    pub bind_group_pool: Option<BindGroupPoolHandle>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binding_resource_matches() {
        let buffer = BufferHandle::default();
        assert!(BindingResource::uniform_buffer(buffer).matches(ResourceBindingType::UniformBuffer));
        assert!(!BindingResource::uniform_buffer(buffer).matches(ResourceBindingType::StorageBuffer));
        // dynamic storage buffer 的槽位接受普通的 storage buffer
        assert!(BindingResource::storage_buffer(buffer).matches(ResourceBindingType::DynamicStorageBuffer));
        let view = TextureViewHandle::default();
        assert!(BindingResource::TextureView(view).matches(ResourceBindingType::SampledImage));
        assert!(!BindingResource::TextureView(view).matches(ResourceBindingType::StorageImage));
    }
}
