use crate::{
    commands::{CommandRecorder, Fence, GpuSemaphore},
    descriptors::{BindGroup, BindGroupLayout, BindGroupPool},
    foundation::Queue,
    handle::kind,
    options::{
        AccelerationStructureOptions, BindGroupLayoutOptions, BindGroupOptions, BindGroupPoolOptions, BufferOptions,
        CommandRecorderOptions, ComputePipelineOptions, FenceOptions, GpuSemaphoreOptions, GraphicsPipelineOptions,
        PipelineLayoutOptions, RaytracingPipelineOptions, SamplerOptions, SwapchainOptions, TextureOptions,
        YcbcrConversionOptions,
    },
    owner::ResourceOwner,
    pipelines::{ComputePipeline, GraphicsPipeline, PipelineLayout, ShaderModule},
    raytracing::{AccelerationStructure, RaytracingPipeline},
    resources::{Buffer, Sampler, Texture, YcbcrConversion},
    swapchain::Swapchain,
};

/// 逻辑设备，所有设备级资源的工厂
///
/// Device 被销毁时，后端会一并释放仍然存活在这个设备上的资源；
/// 之后再销毁这些资源的前端对象是无操作。
#[derive(Debug, Default)]
pub struct Device {
    // queues 先于 device 释放
    queues: Vec<Queue>,
    inner: ResourceOwner<kind::Device>,
}

gpu_resource!(Device => Device);

// new & init
impl Device {
    pub(crate) fn new(inner: ResourceOwner<kind::Device>) -> Self {
        let descriptions = inner.read(|rm, device| rm.device_queues(device)).unwrap_or_default();
        let queues = descriptions
            .into_iter()
            .map(|desc| Queue::new(inner.adopt(inner.handle(), desc.queue)))
            .collect();

        Self { queues, inner }
    }
}

// getters
impl Device {
    #[inline]
    pub fn queues(&self) -> &[Queue] {
        &self.queues
    }
}

// tools
impl Device {
    pub fn wait_until_idle(&self) {
        self.inner.read(|rm, device| rm.wait_device_idle(device));
    }

    pub fn create_swapchain(&self, options: &SwapchainOptions) -> Swapchain {
        let inner = self.inner.spawn(self.handle(), |rm, device| rm.create_swapchain(device, options));
        Swapchain::new(inner)
    }

    pub fn create_texture(&self, options: &TextureOptions) -> Texture {
        Texture::new(self.inner.spawn(self.handle(), |rm, device| rm.create_texture(device, options)))
    }

    /// `initial_data` 不为空时，创建后立即写入 buffer 的开头
    pub fn create_buffer(&self, options: &BufferOptions, initial_data: Option<&[u8]>) -> Buffer {
        Buffer::new(self.inner.spawn(self.handle(), |rm, device| rm.create_buffer(device, options, initial_data)))
    }

    pub fn create_sampler(&self, options: &SamplerOptions) -> Sampler {
        Sampler::new(self.inner.spawn(self.handle(), |rm, device| rm.create_sampler(device, options)))
    }

    pub fn create_ycbcr_conversion(&self, options: &YcbcrConversionOptions) -> YcbcrConversion {
        YcbcrConversion::new(self.inner.spawn(self.handle(), |rm, device| rm.create_ycbcr_conversion(device, options)))
    }

    /// SPIR-V 字节码
    pub fn create_shader_module(&self, code: &[u32]) -> ShaderModule {
        ShaderModule::new(self.inner.spawn(self.handle(), |rm, device| rm.create_shader_module(device, code)))
    }

    pub fn create_bind_group_layout(&self, options: &BindGroupLayoutOptions) -> BindGroupLayout {
        BindGroupLayout::new(self.inner.spawn(self.handle(), |rm, device| rm.create_bind_group_layout(device, options)))
    }

    pub fn create_bind_group_pool(&self, options: &BindGroupPoolOptions) -> BindGroupPool {
        BindGroupPool::new(self.inner.spawn(self.handle(), |rm, device| rm.create_bind_group_pool(device, options)))
    }

    pub fn create_bind_group(&self, options: &BindGroupOptions) -> BindGroup {
        BindGroup::new(self.inner.spawn(self.handle(), |rm, device| rm.create_bind_group(device, options)))
    }

    pub fn create_pipeline_layout(&self, options: &PipelineLayoutOptions) -> PipelineLayout {
        PipelineLayout::new(self.inner.spawn(self.handle(), |rm, device| rm.create_pipeline_layout(device, options)))
    }

    pub fn create_graphics_pipeline(&self, options: &GraphicsPipelineOptions) -> GraphicsPipeline {
        GraphicsPipeline::new(
            self.inner.spawn(self.handle(), |rm, device| rm.create_graphics_pipeline(device, options)),
        )
    }

    pub fn create_compute_pipeline(&self, options: &ComputePipelineOptions) -> ComputePipeline {
        ComputePipeline::new(self.inner.spawn(self.handle(), |rm, device| rm.create_compute_pipeline(device, options)))
    }

    pub fn create_raytracing_pipeline(&self, options: &RaytracingPipelineOptions) -> RaytracingPipeline {
        RaytracingPipeline::new(
            self.inner.spawn(self.handle(), |rm, device| rm.create_raytracing_pipeline(device, options)),
        )
    }

    pub fn create_command_recorder(&self, options: &CommandRecorderOptions) -> CommandRecorder {
        CommandRecorder::new(self.inner.spawn(self.handle(), |rm, device| rm.create_command_recorder(device, options)))
    }

    pub fn create_fence(&self, options: &FenceOptions) -> Fence {
        Fence::new(self.inner.spawn(self.handle(), |rm, device| rm.create_fence(device, options)))
    }

    pub fn create_gpu_semaphore(&self, options: &GpuSemaphoreOptions) -> GpuSemaphore {
        GpuSemaphore::new(self.inner.spawn(self.handle(), |rm, device| rm.create_gpu_semaphore(device, options)))
    }

    pub fn create_acceleration_structure(&self, options: &AccelerationStructureOptions) -> AccelerationStructure {
        AccelerationStructure::new(
            self.inner.spawn(self.handle(), |rm, device| rm.create_acceleration_structure(device, options)),
        )
    }
}

impl PartialEq for Device {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}
