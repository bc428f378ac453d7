//! Vulkan 后端的资源管理器
//!
//! 实现按资源类别拆分在几个文件中：
//! - `impl_foundation`：instance、adapter、device、queue、surface、swapchain
//! - `impl_resources`：texture、buffer、sampler、ycbcr conversion
//! - `impl_pipelines`：shader、bind group、pipeline（含光追管线）
//! - `impl_commands`：command recorder、同步对象、timestamp 查询、加速结构
//!
//! 每个 `try_*` 方法返回 `anyhow::Result`，失败时不会在资源池中留下任何记录；
//! trait 方法在边界处记录错误并返回无效句柄。

mod impl_commands;
mod impl_foundation;
mod impl_pipelines;
mod impl_resources;

use std::ptr::NonNull;

use anyhow::Context;
use ember_gfx::{
    api::{ApiResource, ResourceManager},
    handle::*,
    options::*,
    pool::Pool,
    types::*,
};
use itertools::Itertools;

use crate::records::*;

const SPIRV_MAGIC: u32 = 0x0723_0203;

pub struct VulkanResourceManager {
    instances: Pool<VulkanInstance, kind::Instance>,
    adapters: Pool<VulkanAdapter, kind::Adapter>,
    surfaces: Pool<VulkanSurface, kind::Surface>,
    devices: Pool<VulkanDevice, kind::Device>,
    queues: Pool<VulkanQueue, kind::Queue>,
    swapchains: Pool<VulkanSwapchain, kind::Swapchain>,
    textures: Pool<VulkanTexture, kind::Texture>,
    texture_views: Pool<VulkanTextureView, kind::TextureView>,
    buffers: Pool<VulkanBuffer, kind::Buffer>,
    samplers: Pool<VulkanSampler, kind::Sampler>,
    ycbcr_conversions: Pool<VulkanYcbcrConversion, kind::YcbcrConversion>,
    shader_modules: Pool<VulkanShaderModule, kind::ShaderModule>,
    bind_group_layouts: Pool<VulkanBindGroupLayout, kind::BindGroupLayout>,
    bind_group_pools: Pool<VulkanBindGroupPool, kind::BindGroupPool>,
    bind_groups: Pool<VulkanBindGroup, kind::BindGroup>,
    pipeline_layouts: Pool<VulkanPipelineLayout, kind::PipelineLayout>,
    graphics_pipelines: Pool<VulkanGraphicsPipeline, kind::GraphicsPipeline>,
    compute_pipelines: Pool<VulkanComputePipeline, kind::ComputePipeline>,
    raytracing_pipelines: Pool<VulkanRaytracingPipeline, kind::RaytracingPipeline>,
    command_recorders: Pool<VulkanCommandRecorder, kind::CommandRecorder>,
    command_buffers: Pool<VulkanCommandBuffer, kind::CommandBuffer>,
    fences: Pool<VulkanFence, kind::Fence>,
    gpu_semaphores: Pool<VulkanGpuSemaphore, kind::GpuSemaphore>,
    timestamp_query_recorders: Pool<VulkanTimestampQueryRecorder, kind::TimestampQueryRecorder>,
    acceleration_structures: Pool<VulkanAccelerationStructure, kind::AccelerationStructure>,

    /// 动态库句柄，必须最后释放
    entry: ash::Entry,
}

// new & init
impl VulkanResourceManager {
    /// 在运行时加载 Vulkan loader，系统里没有 Vulkan 时返回错误
    pub fn new() -> anyhow::Result<Self> {
        let entry = unsafe { ash::Entry::load()? };
        log::info!("vulkan loader loaded");

        Ok(Self {
            instances: Pool::with_default_capacity(),
            adapters: Pool::with_default_capacity(),
            surfaces: Pool::with_default_capacity(),
            devices: Pool::with_default_capacity(),
            queues: Pool::with_default_capacity(),
            swapchains: Pool::with_default_capacity(),
            textures: Pool::with_default_capacity(),
            texture_views: Pool::with_default_capacity(),
            buffers: Pool::with_default_capacity(),
            samplers: Pool::with_default_capacity(),
            ycbcr_conversions: Pool::with_default_capacity(),
            shader_modules: Pool::with_default_capacity(),
            bind_group_layouts: Pool::with_default_capacity(),
            bind_group_pools: Pool::with_default_capacity(),
            bind_groups: Pool::with_default_capacity(),
            pipeline_layouts: Pool::with_default_capacity(),
            graphics_pipelines: Pool::with_default_capacity(),
            compute_pipelines: Pool::with_default_capacity(),
            raytracing_pipelines: Pool::with_default_capacity(),
            command_recorders: Pool::with_default_capacity(),
            command_buffers: Pool::with_default_capacity(),
            fences: Pool::with_default_capacity(),
            gpu_semaphores: Pool::with_default_capacity(),
            timestamp_query_recorders: Pool::with_default_capacity(),
            acceleration_structures: Pool::with_default_capacity(),
            entry,
        })
    }
}

/// 创建失败时记录错误并返回无效句柄
fn or_invalid<K: ResourceKind>(result: anyhow::Result<Handle<K>>) -> Handle<K> {
    result.unwrap_or_else(|err| {
        log::error!("Failed to create {:?}: {:#}", K::TYPE, err);
        Handle::default()
    })
}

/// 只借用单个资源池，调用方可以同时修改其他池
fn alive<T, K: ResourceKind>(pool: &Pool<T, K>, handle: Handle<K>) -> anyhow::Result<&T> {
    pool.get(handle).with_context(|| format!("{:?} is not alive", handle))
}

fn alive_mut<T, K: ResourceKind>(pool: &mut Pool<T, K>, handle: Handle<K>) -> anyhow::Result<&mut T> {
    pool.get_mut(handle).with_context(|| format!("{:?} is not alive", handle))
}

/// 从池中移除一个设备级资源并释放原生对象
fn release<T: DeviceChild, K: ResourceKind>(
    pool: &mut Pool<T, K>,
    devices: &Pool<VulkanDevice, kind::Device>,
    handle: Handle<K>,
) {
    let Some(record) = pool.remove(handle) else {
        return;
    };
    match devices.get(record.device()) {
        Some(device) => record.destroy(device),
        // 设备销毁时会先级联释放子资源，这里只可能是记录本身有误
        None => log::error!("{:?} belongs to a dead device, native object is lost", handle),
    }
}

/// 释放某个设备上残留的所有资源
fn release_device_children<T: DeviceChild, K: ResourceKind>(
    pool: &mut Pool<T, K>,
    device_handle: DeviceHandle,
    device: &VulkanDevice,
) {
    let orphans = pool.iter().filter(|(_, record)| record.device() == device_handle).map(|(h, _)| h).collect_vec();
    if orphans.is_empty() {
        return;
    }
    log::warn!("{:?} destroyed with {} live {:?} resources, releasing them", device_handle, orphans.len(), K::TYPE);
    for handle in orphans {
        if let Some(record) = pool.remove(handle) {
            record.destroy(device);
        }
    }
}

fn erase_all<T, K: ResourceKind>(pool: &Pool<T, K>, out: &mut Vec<ErasedHandle>) {
    out.extend(pool.iter().map(|(handle, _)| handle.erase()));
}

// destroy
impl VulkanResourceManager {
    fn delete_instance(&mut self, instance: InstanceHandle) {
        if !self.instances.contains(instance) {
            return;
        }
        let devices = self.devices.iter().filter(|(_, d)| d.instance == instance).map(|(h, _)| h).collect_vec();
        for device in devices {
            log::warn!("{:?} destroyed while {:?} is still alive", instance, device);
            self.delete_device(device);
        }
        let surfaces = self.surfaces.iter().filter(|(_, s)| s.instance == instance).map(|(h, _)| h).collect_vec();
        for surface in surfaces {
            self.delete_surface(surface);
        }
        let adapters = self.adapters.iter().filter(|(_, a)| a.instance == instance).map(|(h, _)| h).collect_vec();
        for adapter in adapters {
            self.adapters.remove(adapter);
        }
        if let Some(record) = self.instances.remove(instance) {
            record.destroy();
        }
    }

    fn delete_surface(&mut self, surface: SurfaceHandle) {
        let Some(record) = self.surfaces.remove(surface) else {
            return;
        };
        match self.instances.get(record.instance) {
            Some(instance) => unsafe { instance.surface_loader.destroy_surface(record.surface, None) },
            None => log::error!("{:?} outlived its instance", surface),
        }
    }

    fn delete_device(&mut self, device_handle: DeviceHandle) {
        let Some(device) = self.devices.get(device_handle) else {
            return;
        };
        if let Err(err) = unsafe { device.device.device_wait_idle() } {
            log::error!("device_wait_idle failed before releasing {:?}: {:?}", device_handle, err);
        }

        release_device_children(&mut self.bind_groups, device_handle, device);
        // 默认 pool 归设备所有，不算泄漏
        if let Some(pool) = self.bind_group_pools.remove(device.default_bind_group_pool) {
            pool.destroy(device);
        }
        release_device_children(&mut self.bind_group_pools, device_handle, device);
        release_device_children(&mut self.timestamp_query_recorders, device_handle, device);
        release_device_children(&mut self.command_buffers, device_handle, device);
        release_device_children(&mut self.command_recorders, device_handle, device);
        release_device_children(&mut self.texture_views, device_handle, device);
        release_device_children(&mut self.textures, device_handle, device);
        release_device_children(&mut self.swapchains, device_handle, device);
        release_device_children(&mut self.acceleration_structures, device_handle, device);
        release_device_children(&mut self.buffers, device_handle, device);
        release_device_children(&mut self.samplers, device_handle, device);
        release_device_children(&mut self.ycbcr_conversions, device_handle, device);
        release_device_children(&mut self.graphics_pipelines, device_handle, device);
        release_device_children(&mut self.compute_pipelines, device_handle, device);
        release_device_children(&mut self.raytracing_pipelines, device_handle, device);
        release_device_children(&mut self.pipeline_layouts, device_handle, device);
        release_device_children(&mut self.bind_group_layouts, device_handle, device);
        release_device_children(&mut self.shader_modules, device_handle, device);
        release_device_children(&mut self.fences, device_handle, device);
        release_device_children(&mut self.gpu_semaphores, device_handle, device);

        let queues = self.queues.iter().filter(|(_, q)| q.device == device_handle).map(|(h, _)| h).collect_vec();
        for queue in queues {
            self.queues.remove(queue);
        }
        if let Some(record) = self.devices.remove(device_handle) {
            record.destroy();
        }
    }

    fn delete_swapchain(&mut self, swapchain: SwapchainHandle) {
        let Some(record) = self.swapchains.remove(swapchain) else {
            return;
        };
        // 图像由 swapchain 持有，纹理记录只需要回收槽位
        for texture in &record.textures {
            self.textures.remove(*texture);
        }
        match self.devices.get(record.device) {
            Some(device) => record.destroy(device),
            None => log::error!("{:?} belongs to a dead device, native object is lost", swapchain),
        }
    }

    fn delete_bind_group(&mut self, bind_group: BindGroupHandle) {
        let Some(pool) = self.bind_groups.get(bind_group).map(|record| record.pool) else {
            return;
        };
        if let Some(pool) = self.bind_group_pools.get_mut(pool) {
            pool.bind_groups.retain(|handle| *handle != bind_group);
        }
        release(&mut self.bind_groups, &self.devices, bind_group);
    }

    fn delete_bind_group_pool(&mut self, pool: BindGroupPoolHandle) {
        self.reset_bind_group_pool(pool);
        release(&mut self.bind_group_pools, &self.devices, pool);
    }
}

impl Drop for VulkanResourceManager {
    fn drop(&mut self) {
        let leaked = self.live_resources();
        for handle in &leaked {
            log::error!("{} is still alive when the resource manager is destroyed", handle);
        }

        // 按依赖顺序释放残留的原生对象，device 在 instance 之前
        for instance in self.instances.handles() {
            self.delete_instance(instance);
        }

        if !std::thread::panicking() {
            debug_assert!(leaked.is_empty(), "{} resources leaked: {:?}", leaked.len(), leaked);
        }
    }
}

impl ResourceManager for VulkanResourceManager {
    fn create_instance(&mut self, options: &InstanceOptions) -> InstanceHandle {
        let _span = ember_crate_tools::profile_span!("VulkanResourceManager::create_instance");
        or_invalid(self.try_create_instance(options))
    }

    fn enumerate_adapters(&mut self, instance: InstanceHandle) -> Vec<AdapterHandle> {
        self.try_enumerate_adapters(instance).unwrap_or_else(|err| {
            log::error!("Failed to enumerate adapters: {:#}", err);
            vec![]
        })
    }

    fn create_surface(&mut self, instance: InstanceHandle, options: &SurfaceOptions) -> SurfaceHandle {
        or_invalid(self.try_create_surface(instance, options))
    }

    fn adapter_properties(&self, adapter: AdapterHandle) -> Option<AdapterProperties> {
        self.adapters.get(adapter).map(|record| record.properties.clone())
    }

    fn adapter_features(&self, adapter: AdapterHandle) -> Option<AdapterFeatures> {
        self.adapters.get(adapter).map(|record| record.features)
    }

    fn adapter_queue_types(&self, adapter: AdapterHandle) -> Vec<AdapterQueueType> {
        self.adapters.get(adapter).map(|record| record.queue_types.clone()).unwrap_or_default()
    }

    fn adapter_supports_presentation(
        &self,
        adapter: AdapterHandle,
        surface: SurfaceHandle,
        queue_type_index: u32,
    ) -> bool {
        self.supports_presentation(adapter, surface, queue_type_index)
    }

    fn create_device(&mut self, adapter: AdapterHandle, options: &DeviceOptions) -> DeviceHandle {
        let _span = ember_crate_tools::profile_span!("VulkanResourceManager::create_device");
        or_invalid(self.try_create_device(adapter, options))
    }

    fn device_queues(&self, device: DeviceHandle) -> Vec<QueueDescription> {
        self.devices.get(device).map(|record| record.queues.clone()).unwrap_or_default()
    }

    fn wait_device_idle(&self, device: DeviceHandle) {
        let Some(record) = self.devices.get(device) else {
            return;
        };
        if let Err(err) = unsafe { record.device.device_wait_idle() } {
            log::error!("device_wait_idle failed on {:?}: {:?}", device, err);
        }
    }

    fn submit(&mut self, queue: QueueHandle, options: &SubmitOptions) {
        let _span = ember_crate_tools::profile_span!("VulkanResourceManager::submit");
        if let Err(err) = self.try_submit(queue, options) {
            log::error!("Failed to submit to {:?}: {:#}", queue, err);
        }
    }

    fn present(&mut self, queue: QueueHandle, options: &PresentOptions) -> PresentResult {
        let _span = ember_crate_tools::profile_span!("VulkanResourceManager::present");
        self.present_swapchains(queue, options)
    }

    fn wait_queue_idle(&self, queue: QueueHandle) {
        let Some(record) = self.queues.get(queue) else {
            return;
        };
        let Some(device) = self.devices.get(record.device) else {
            return;
        };
        if let Err(err) = unsafe { device.device.queue_wait_idle(record.queue) } {
            log::error!("queue_wait_idle failed on {:?}: {:?}", queue, err);
        }
    }

    fn create_swapchain(&mut self, device: DeviceHandle, options: &SwapchainOptions) -> SwapchainHandle {
        let _span = ember_crate_tools::profile_span!("VulkanResourceManager::create_swapchain");
        or_invalid(self.try_create_swapchain(device, options))
    }

    fn swapchain_textures(&self, swapchain: SwapchainHandle) -> Vec<TextureHandle> {
        self.swapchains.get(swapchain).map(|record| record.textures.clone()).unwrap_or_default()
    }

    fn acquire_next_image(
        &mut self,
        swapchain: SwapchainHandle,
        semaphore: Option<GpuSemaphoreHandle>,
        fence: Option<FenceHandle>,
    ) -> AcquireImageResult {
        self.acquire_swapchain_image(swapchain, semaphore, fence)
    }

    fn create_texture(&mut self, device: DeviceHandle, options: &TextureOptions) -> TextureHandle {
        or_invalid(self.try_create_texture(device, options))
    }

    fn create_texture_view(
        &mut self,
        device: DeviceHandle,
        texture: TextureHandle,
        options: &TextureViewOptions,
    ) -> TextureViewHandle {
        or_invalid(self.try_create_texture_view(device, texture, options))
    }

    fn create_buffer(
        &mut self,
        device: DeviceHandle,
        options: &BufferOptions,
        initial_data: Option<&[u8]>,
    ) -> BufferHandle {
        let _span = ember_crate_tools::profile_span!("VulkanResourceManager::create_buffer");
        or_invalid(self.try_create_buffer(device, options, initial_data))
    }

    fn buffer_size(&self, buffer: BufferHandle) -> u64 {
        self.buffers.get(buffer).map(|record| record.size).unwrap_or(0)
    }

    fn map_buffer(&mut self, buffer: BufferHandle) -> Option<NonNull<u8>> {
        self.try_map_buffer(buffer)
            .inspect_err(|err| log::error!("Failed to map {:?}: {:#}", buffer, err))
            .ok()
            .flatten()
    }

    fn unmap_buffer(&mut self, buffer: BufferHandle) {
        self.unmap(buffer);
    }

    fn flush_buffer(&mut self, buffer: BufferHandle) {
        if let Err(err) = self.try_flush_buffer(buffer, false) {
            log::error!("Failed to flush {:?}: {:#}", buffer, err);
        }
    }

    fn invalidate_buffer(&mut self, buffer: BufferHandle) {
        if let Err(err) = self.try_flush_buffer(buffer, true) {
            log::error!("Failed to invalidate {:?}: {:#}", buffer, err);
        }
    }

    fn buffer_device_address(&self, buffer: BufferHandle) -> u64 {
        self.buffers.get(buffer).map(|record| record.device_address).unwrap_or(0)
    }

    fn create_sampler(&mut self, device: DeviceHandle, options: &SamplerOptions) -> SamplerHandle {
        or_invalid(self.try_create_sampler(device, options))
    }

    fn create_ycbcr_conversion(
        &mut self,
        device: DeviceHandle,
        options: &YcbcrConversionOptions,
    ) -> YcbcrConversionHandle {
        or_invalid(self.try_create_ycbcr_conversion(device, options))
    }

    fn create_shader_module(&mut self, device: DeviceHandle, code: &[u32]) -> ShaderModuleHandle {
        or_invalid(self.try_create_shader_module(device, code))
    }

    fn create_bind_group_layout(
        &mut self,
        device: DeviceHandle,
        options: &BindGroupLayoutOptions,
    ) -> BindGroupLayoutHandle {
        or_invalid(self.try_create_bind_group_layout(device, options))
    }

    fn create_pipeline_layout(
        &mut self,
        device: DeviceHandle,
        options: &PipelineLayoutOptions,
    ) -> PipelineLayoutHandle {
        or_invalid(self.try_create_pipeline_layout(device, options))
    }

    fn create_graphics_pipeline(
        &mut self,
        device: DeviceHandle,
        options: &GraphicsPipelineOptions,
    ) -> GraphicsPipelineHandle {
        let _span = ember_crate_tools::profile_span!("VulkanResourceManager::create_graphics_pipeline");
        or_invalid(self.try_create_graphics_pipeline(device, options))
    }

    fn create_compute_pipeline(
        &mut self,
        device: DeviceHandle,
        options: &ComputePipelineOptions,
    ) -> ComputePipelineHandle {
        or_invalid(self.try_create_compute_pipeline(device, options))
    }

    fn create_raytracing_pipeline(
        &mut self,
        device: DeviceHandle,
        options: &RaytracingPipelineOptions,
    ) -> RaytracingPipelineHandle {
        let _span = ember_crate_tools::profile_span!("VulkanResourceManager::create_raytracing_pipeline");
        or_invalid(self.try_create_raytracing_pipeline(device, options))
    }

    fn raytracing_shader_group_handles(
        &self,
        pipeline: RaytracingPipelineHandle,
        first_group: u32,
        group_count: u32,
    ) -> Vec<u8> {
        self.try_shader_group_handles(pipeline, first_group, group_count).unwrap_or_else(|err| {
            log::error!("Failed to get shader group handles of {:?}: {:#}", pipeline, err);
            vec![]
        })
    }

    fn create_bind_group_pool(&mut self, device: DeviceHandle, options: &BindGroupPoolOptions) -> BindGroupPoolHandle {
        or_invalid(self.try_create_bind_group_pool(device, options))
    }

    fn reset_bind_group_pool(&mut self, pool: BindGroupPoolHandle) {
        let Some(record) = self.bind_group_pools.get_mut(pool) else {
            return;
        };
        // vkResetDescriptorPool 一次性回收所有 set，记录直接丢弃
        for bind_group in std::mem::take(&mut record.bind_groups) {
            self.bind_groups.remove(bind_group);
        }
        let Some(device) = self.devices.get(record.device) else {
            return;
        };
        if let Err(err) =
            unsafe { device.device.reset_descriptor_pool(record.pool, ash::vk::DescriptorPoolResetFlags::empty()) }
        {
            log::error!("Failed to reset {:?}: {:?}", pool, err);
        }
    }

    fn bind_group_pool_allocated(&self, pool: BindGroupPoolHandle) -> u32 {
        self.bind_group_pools.get(pool).map(|record| record.bind_groups.len() as u32).unwrap_or(0)
    }

    fn create_bind_group(&mut self, device: DeviceHandle, options: &BindGroupOptions) -> BindGroupHandle {
        or_invalid(self.try_create_bind_group(device, options))
    }

    fn update_bind_group(&mut self, bind_group: BindGroupHandle, entry: &BindGroupEntry) {
        if let Err(err) = self.try_update_bind_group(bind_group, entry) {
            log::error!("Failed to update {:?}: {:#}", bind_group, err);
        }
    }

    fn create_command_recorder(
        &mut self,
        device: DeviceHandle,
        options: &CommandRecorderOptions,
    ) -> CommandRecorderHandle {
        or_invalid(self.try_create_command_recorder(device, options))
    }

    fn copy_buffer(&mut self, recorder: CommandRecorderHandle, copy: &BufferCopy) {
        if let Err(err) = self.try_copy_buffer(recorder, copy) {
            log::error!("invalid buffer copy {:?}: {:#}", copy, err);
        }
    }

    fn finish_command_recorder(&mut self, recorder: CommandRecorderHandle) -> CommandBufferHandle {
        or_invalid(self.try_finish_command_recorder(recorder))
    }

    fn create_timestamp_query_recorder(
        &mut self,
        device: DeviceHandle,
        recorder: CommandRecorderHandle,
        options: &TimestampQueryRecorderOptions,
    ) -> TimestampQueryRecorderHandle {
        or_invalid(self.try_create_timestamp_query_recorder(device, recorder, options))
    }

    fn write_timestamp(&mut self, timestamps: TimestampQueryRecorderHandle, stage: PipelineStageFlags) -> Option<u32> {
        self.try_write_timestamp(timestamps, stage)
            .inspect_err(|err| log::error!("Failed to write timestamp to {:?}: {:#}", timestamps, err))
            .ok()
            .flatten()
    }

    fn reset_timestamps(&mut self, timestamps: TimestampQueryRecorderHandle) {
        if let Err(err) = self.try_reset_timestamps(timestamps) {
            log::error!("Failed to reset {:?}: {:#}", timestamps, err);
        }
    }

    fn timestamp_results(&self, timestamps: TimestampQueryRecorderHandle) -> Vec<u64> {
        self.try_timestamp_results(timestamps).unwrap_or_else(|err| {
            log::error!("Failed to read {:?}: {:#}", timestamps, err);
            vec![]
        })
    }

    fn timestamp_period(&self, timestamps: TimestampQueryRecorderHandle) -> f32 {
        self.timestamp_query_recorders
            .get(timestamps)
            .and_then(|record| self.devices.get(record.device))
            .map(|device| device.limits.timestamp_period)
            .unwrap_or(0.0)
    }

    fn create_fence(&mut self, device: DeviceHandle, options: &FenceOptions) -> FenceHandle {
        or_invalid(self.try_create_fence(device, options))
    }

    fn fence_status(&self, fence: FenceHandle) -> FenceStatus {
        self.query_fence_status(fence)
    }

    fn wait_for_fence(&self, fence: FenceHandle) {
        self.wait_fence(fence);
    }

    fn reset_fence(&mut self, fence: FenceHandle) {
        self.reset(fence);
    }

    fn create_gpu_semaphore(&mut self, device: DeviceHandle, options: &GpuSemaphoreOptions) -> GpuSemaphoreHandle {
        or_invalid(self.try_create_gpu_semaphore(device, options))
    }

    fn create_acceleration_structure(
        &mut self,
        device: DeviceHandle,
        options: &AccelerationStructureOptions,
    ) -> AccelerationStructureHandle {
        or_invalid(self.try_create_acceleration_structure(device, options))
    }

    fn resource(&self, handle: ErasedHandle) -> Option<&dyn ApiResource> {
        fn get<'a, T: ApiResource, K: ResourceKind>(
            pool: &'a Pool<T, K>,
            handle: ErasedHandle,
        ) -> Option<&'a dyn ApiResource> {
            pool.get(handle.downcast::<K>()?).map(|record| record as &dyn ApiResource)
        }

        match handle.resource_type() {
            ResourceType::Instance => get(&self.instances, handle),
            ResourceType::Adapter => get(&self.adapters, handle),
            ResourceType::Device => get(&self.devices, handle),
            ResourceType::Queue => get(&self.queues, handle),
            ResourceType::Surface => get(&self.surfaces, handle),
            ResourceType::Swapchain => get(&self.swapchains, handle),
            ResourceType::Texture => get(&self.textures, handle),
            ResourceType::TextureView => get(&self.texture_views, handle),
            ResourceType::Buffer => get(&self.buffers, handle),
            ResourceType::Sampler => get(&self.samplers, handle),
            ResourceType::ShaderModule => get(&self.shader_modules, handle),
            ResourceType::BindGroupLayout => get(&self.bind_group_layouts, handle),
            ResourceType::BindGroupPool => get(&self.bind_group_pools, handle),
            ResourceType::BindGroup => get(&self.bind_groups, handle),
            ResourceType::PipelineLayout => get(&self.pipeline_layouts, handle),
            ResourceType::GraphicsPipeline => get(&self.graphics_pipelines, handle),
            ResourceType::ComputePipeline => get(&self.compute_pipelines, handle),
            ResourceType::RaytracingPipeline => get(&self.raytracing_pipelines, handle),
            ResourceType::CommandRecorder => get(&self.command_recorders, handle),
            ResourceType::CommandBuffer => get(&self.command_buffers, handle),
            ResourceType::Fence => get(&self.fences, handle),
            ResourceType::GpuSemaphore => get(&self.gpu_semaphores, handle),
            ResourceType::TimestampQueryRecorder => get(&self.timestamp_query_recorders, handle),
            ResourceType::YcbcrConversion => get(&self.ycbcr_conversions, handle),
            ResourceType::AccelerationStructure => get(&self.acceleration_structures, handle),
        }
    }

    fn delete_resource(&mut self, handle: ErasedHandle) {
        let _span = ember_crate_tools::profile_span!("VulkanResourceManager::delete_resource");

        match handle.resource_type() {
            ResourceType::Instance => handle.downcast().into_iter().for_each(|h| self.delete_instance(h)),
            ResourceType::Device => handle.downcast().into_iter().for_each(|h| self.delete_device(h)),
            ResourceType::Surface => handle.downcast().into_iter().for_each(|h| self.delete_surface(h)),
            ResourceType::Swapchain => handle.downcast().into_iter().for_each(|h| self.delete_swapchain(h)),
            ResourceType::BindGroup => handle.downcast().into_iter().for_each(|h| self.delete_bind_group(h)),
            ResourceType::BindGroupPool => handle.downcast().into_iter().for_each(|h| self.delete_bind_group_pool(h)),
            ResourceType::Adapter => {
                handle.downcast().into_iter().for_each(|h| {
                    self.adapters.remove(h);
                });
            }
            ResourceType::Queue => {
                handle.downcast().into_iter().for_each(|h| {
                    self.queues.remove(h);
                });
            }
            ResourceType::Texture => {
                handle.downcast().into_iter().for_each(|h| release(&mut self.textures, &self.devices, h))
            }
            ResourceType::TextureView => {
                handle.downcast().into_iter().for_each(|h| release(&mut self.texture_views, &self.devices, h))
            }
            ResourceType::Buffer => {
                handle.downcast().into_iter().for_each(|h| release(&mut self.buffers, &self.devices, h))
            }
            ResourceType::Sampler => {
                handle.downcast().into_iter().for_each(|h| release(&mut self.samplers, &self.devices, h))
            }
            ResourceType::ShaderModule => {
                handle.downcast().into_iter().for_each(|h| release(&mut self.shader_modules, &self.devices, h))
            }
            ResourceType::BindGroupLayout => {
                handle.downcast().into_iter().for_each(|h| release(&mut self.bind_group_layouts, &self.devices, h))
            }
            ResourceType::PipelineLayout => {
                handle.downcast().into_iter().for_each(|h| release(&mut self.pipeline_layouts, &self.devices, h))
            }
            ResourceType::GraphicsPipeline => {
                handle.downcast().into_iter().for_each(|h| release(&mut self.graphics_pipelines, &self.devices, h))
            }
            ResourceType::ComputePipeline => {
                handle.downcast().into_iter().for_each(|h| release(&mut self.compute_pipelines, &self.devices, h))
            }
            ResourceType::RaytracingPipeline => {
                handle.downcast().into_iter().for_each(|h| release(&mut self.raytracing_pipelines, &self.devices, h))
            }
            ResourceType::CommandRecorder => {
                handle.downcast().into_iter().for_each(|h| release(&mut self.command_recorders, &self.devices, h))
            }
            ResourceType::CommandBuffer => {
                handle.downcast().into_iter().for_each(|h| release(&mut self.command_buffers, &self.devices, h))
            }
            ResourceType::Fence => handle.downcast().into_iter().for_each(|h| release(&mut self.fences, &self.devices, h)),
            ResourceType::GpuSemaphore => {
                handle.downcast().into_iter().for_each(|h| release(&mut self.gpu_semaphores, &self.devices, h))
            }
            ResourceType::YcbcrConversion => {
                handle.downcast().into_iter().for_each(|h| release(&mut self.ycbcr_conversions, &self.devices, h))
            }
            ResourceType::TimestampQueryRecorder => handle
                .downcast()
                .into_iter()
                .for_each(|h| release(&mut self.timestamp_query_recorders, &self.devices, h)),
            ResourceType::AccelerationStructure => handle
                .downcast()
                .into_iter()
                .for_each(|h| release(&mut self.acceleration_structures, &self.devices, h)),
        }
    }

    fn live_resources(&self) -> Vec<ErasedHandle> {
        let mut live = vec![];
        erase_all(&self.instances, &mut live);
        erase_all(&self.adapters, &mut live);
        erase_all(&self.surfaces, &mut live);
        erase_all(&self.devices, &mut live);
        erase_all(&self.queues, &mut live);
        erase_all(&self.swapchains, &mut live);
        erase_all(&self.textures, &mut live);
        erase_all(&self.texture_views, &mut live);
        erase_all(&self.buffers, &mut live);
        erase_all(&self.samplers, &mut live);
        erase_all(&self.ycbcr_conversions, &mut live);
        erase_all(&self.shader_modules, &mut live);
        erase_all(&self.bind_group_layouts, &mut live);
        erase_all(&self.bind_group_pools, &mut live);
        erase_all(&self.bind_groups, &mut live);
        erase_all(&self.pipeline_layouts, &mut live);
        erase_all(&self.graphics_pipelines, &mut live);
        erase_all(&self.compute_pipelines, &mut live);
        erase_all(&self.raytracing_pipelines, &mut live);
        erase_all(&self.command_recorders, &mut live);
        erase_all(&self.command_buffers, &mut live);
        erase_all(&self.fences, &mut live);
        erase_all(&self.gpu_semaphores, &mut live);
        erase_all(&self.timestamp_query_recorders, &mut live);
        erase_all(&self.acceleration_structures, &mut live);
        live
    }
}
