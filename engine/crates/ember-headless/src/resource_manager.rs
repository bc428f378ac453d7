use std::{ops::Range, ptr::NonNull};

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
const DEVICE_ADDRESS_BASE: u64 = 0x1_0000_0000;
const DEVICE_ADDRESS_ALIGNMENT: u64 = 256;
const SHADER_GROUP_HANDLE_SIZE: usize = 32;
/// 模拟时钟在两次时间戳写入之间前进的 tick 数
const TIMESTAMP_TICK_STEP: u64 = 1000;

/// headless 后端的资源管理器，每种资源一个 [`Pool`]
pub struct HeadlessResourceManager {
    instances: Pool<HeadlessInstance, kind::Instance>,
    adapters: Pool<HeadlessAdapter, kind::Adapter>,
    surfaces: Pool<HeadlessSurface, kind::Surface>,
    devices: Pool<HeadlessDevice, kind::Device>,
    queues: Pool<HeadlessQueue, kind::Queue>,
    swapchains: Pool<HeadlessSwapchain, kind::Swapchain>,
    textures: Pool<HeadlessTexture, kind::Texture>,
    texture_views: Pool<HeadlessTextureView, kind::TextureView>,
    buffers: Pool<HeadlessBuffer, kind::Buffer>,
    samplers: Pool<HeadlessSampler, kind::Sampler>,
    ycbcr_conversions: Pool<HeadlessYcbcrConversion, kind::YcbcrConversion>,
    shader_modules: Pool<HeadlessShaderModule, kind::ShaderModule>,
    bind_group_layouts: Pool<HeadlessBindGroupLayout, kind::BindGroupLayout>,
    bind_group_pools: Pool<HeadlessBindGroupPool, kind::BindGroupPool>,
    bind_groups: Pool<HeadlessBindGroup, kind::BindGroup>,
    pipeline_layouts: Pool<HeadlessPipelineLayout, kind::PipelineLayout>,
    graphics_pipelines: Pool<HeadlessGraphicsPipeline, kind::GraphicsPipeline>,
    compute_pipelines: Pool<HeadlessComputePipeline, kind::ComputePipeline>,
    raytracing_pipelines: Pool<HeadlessRaytracingPipeline, kind::RaytracingPipeline>,
    command_recorders: Pool<HeadlessCommandRecorder, kind::CommandRecorder>,
    command_buffers: Pool<HeadlessCommandBuffer, kind::CommandBuffer>,
    timestamp_query_recorders: Pool<HeadlessTimestampQueryRecorder, kind::TimestampQueryRecorder>,
    fences: Pool<HeadlessFence, kind::Fence>,
    gpu_semaphores: Pool<HeadlessGpuSemaphore, kind::GpuSemaphore>,
    acceleration_structures: Pool<HeadlessAccelerationStructure, kind::AccelerationStructure>,

    next_device_address: u64,
    next_timestamp_tick: u64,
}

impl Default for HeadlessResourceManager {
    fn default() -> Self {
        Self::new()
    }
}

// new & init
impl HeadlessResourceManager {
    pub fn new() -> Self {
        Self {
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
            timestamp_query_recorders: Pool::with_default_capacity(),
            fences: Pool::with_default_capacity(),
            gpu_semaphores: Pool::with_default_capacity(),
            acceleration_structures: Pool::with_default_capacity(),
            next_device_address: DEVICE_ADDRESS_BASE,
            next_timestamp_tick: 0,
        }
    }

    /// headless 后端对外宣称的两个 adapter：一个全能的独显，一个只有传输队列的 CPU 设备
    fn default_adapters(instance: InstanceHandle) -> Vec<HeadlessAdapter> {
        vec![
            HeadlessAdapter {
                instance,
                properties: AdapterProperties {
                    api_version: (1 << 22) | (3 << 12),
                    driver_version: 1,
                    vendor_id: 0xE1B0,
                    device_id: 1,
                    device_type: AdapterDeviceType::DiscreteGpu,
                    device_name: "Ember Headless GPU".to_string(),
                },
                features: AdapterFeatures {
                    buffer_device_address: true,
                    sampler_ycbcr_conversion: true,
                    acceleration_structures: true,
                    ray_tracing_pipeline: true,
                },
                queue_types: vec![
                    AdapterQueueType {
                        flags: QueueFlags::GRAPHICS | QueueFlags::COMPUTE | QueueFlags::TRANSFER,
                        queue_count: 4,
                        timestamp_valid_bits: 64,
                    },
                    AdapterQueueType {
                        flags: QueueFlags::TRANSFER,
                        queue_count: 2,
                        timestamp_valid_bits: 64,
                    },
                ],
            },
            HeadlessAdapter {
                instance,
                properties: AdapterProperties {
                    api_version: (1 << 22) | (3 << 12),
                    driver_version: 1,
                    vendor_id: 0xE1B0,
                    device_id: 2,
                    device_type: AdapterDeviceType::Cpu,
                    device_name: "Ember Headless CPU".to_string(),
                },
                features: AdapterFeatures::default(),
                queue_types: vec![AdapterQueueType {
                    flags: QueueFlags::TRANSFER,
                    queue_count: 1,
                    timestamp_valid_bits: 0,
                }],
            },
        ]
    }
}

// tools
impl HeadlessResourceManager {
    fn check_device(&self, device: DeviceHandle, what: &str) -> bool {
        let alive = self.devices.contains(device);
        if !alive {
            log::error!("Failed to create {what}: device {:?} is not alive", device);
        }
        alive
    }

    fn execute_copy(&mut self, copy: &BufferCopy) {
        let Some(bytes) = self
            .buffers
            .get(copy.src)
            .and_then(|src| src.data.get(byte_range(copy.src_offset, copy.byte_size, src.data.len())?))
            .map(<[u8]>::to_vec)
        else {
            log::error!("copy source {:?} is not alive or out of range", copy.src);
            return;
        };
        let Some(target) = self
            .buffers
            .get_mut(copy.dst)
            .and_then(|dst| {
                let range = byte_range(copy.dst_offset, copy.byte_size, dst.data.len())?;
                dst.data.get_mut(range)
            })
        else {
            log::error!("copy destination {:?} is not alive or out of range", copy.dst);
            return;
        };
        target.copy_from_slice(&bytes);
    }

    fn signal_semaphores(&mut self, semaphores: &[GpuSemaphoreHandle], signalled: bool) {
        for semaphore in semaphores {
            if let Some(record) = self.gpu_semaphores.get_mut(*semaphore) {
                record.signalled = signalled;
            }
        }
    }

    fn signal_fence(&mut self, fence: Option<FenceHandle>) {
        if let Some(record) = fence.and_then(|fence| self.fences.get_mut(fence)) {
            record.signalled = true;
        }
    }
}

/// `offset..offset + size` 完全落在长度为 `len` 的数据内时返回对应区间
fn byte_range(offset: u64, size: u64, len: usize) -> Option<Range<usize>> {
    let end = offset.checked_add(size)?;
    if end > len as u64 {
        return None;
    }
    Some(usize::try_from(offset).ok()?..usize::try_from(end).ok()?)
}

/// 释放某个设备上残留的所有资源
fn release_device_children<T: ApiResource, K: ResourceKind>(pool: &mut Pool<T, K>, device: DeviceHandle) {
    let orphans = pool.iter().filter(|(_, record)| record.device() == device).map(|(handle, _)| handle).collect_vec();
    if orphans.is_empty() {
        return;
    }
    log::warn!("{:?} destroyed with {} live {:?} resources, releasing them", device, orphans.len(), K::TYPE);
    for handle in orphans {
        pool.remove(handle);
    }
}

fn erase_all<T, K: ResourceKind>(pool: &Pool<T, K>, out: &mut Vec<ErasedHandle>) {
    out.extend(pool.iter().map(|(handle, _)| handle.erase()));
}

// destroy
impl HeadlessResourceManager {
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
            self.surfaces.remove(surface);
        }
        let adapters = self.adapters.iter().filter(|(_, a)| a.instance == instance).map(|(h, _)| h).collect_vec();
        for adapter in adapters {
            self.adapters.remove(adapter);
        }
        self.instances.remove(instance);
    }

    fn delete_device(&mut self, device: DeviceHandle) {
        let Some(record) = self.devices.get(device) else {
            return;
        };
        let default_pool = record.default_bind_group_pool;

        release_device_children(&mut self.bind_groups, device);
        self.bind_group_pools.remove(default_pool);
        release_device_children(&mut self.bind_group_pools, device);
        release_device_children(&mut self.timestamp_query_recorders, device);
        release_device_children(&mut self.command_buffers, device);
        release_device_children(&mut self.command_recorders, device);
        release_device_children(&mut self.texture_views, device);
        release_device_children(&mut self.textures, device);
        release_device_children(&mut self.swapchains, device);
        release_device_children(&mut self.buffers, device);
        release_device_children(&mut self.samplers, device);
        release_device_children(&mut self.ycbcr_conversions, device);
        release_device_children(&mut self.graphics_pipelines, device);
        release_device_children(&mut self.compute_pipelines, device);
        release_device_children(&mut self.raytracing_pipelines, device);
        release_device_children(&mut self.pipeline_layouts, device);
        release_device_children(&mut self.bind_group_layouts, device);
        release_device_children(&mut self.shader_modules, device);
        release_device_children(&mut self.fences, device);
        release_device_children(&mut self.gpu_semaphores, device);
        release_device_children(&mut self.acceleration_structures, device);

        // queue 由 Device 自己持有，不算泄漏
        let queues = self.queues.iter().filter(|(_, q)| q.device == device).map(|(h, _)| h).collect_vec();
        for queue in queues {
            self.queues.remove(queue);
        }
        self.devices.remove(device);
    }

    fn delete_swapchain(&mut self, swapchain: SwapchainHandle) {
        let Some(record) = self.swapchains.remove(swapchain) else {
            return;
        };
        for texture in record.textures {
            self.textures.remove(texture);
        }
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        if let Some(HeadlessTexture {
            source: TextureSource::Swapchain(swapchain),
            ..
        }) = self.textures.remove(texture)
        {
            // 图像本身归 swapchain 所有，只回收槽位
            log::debug!("release {:?} of {:?}", texture, swapchain);
        }
    }

    fn delete_bind_group(&mut self, bind_group: BindGroupHandle) {
        let Some(record) = self.bind_groups.remove(bind_group) else {
            return;
        };
        if let Some(pool) = self.bind_group_pools.get_mut(record.pool) {
            pool.bind_groups.retain(|handle| *handle != bind_group);
        }
    }

    fn delete_bind_group_pool(&mut self, pool: BindGroupPoolHandle) {
        self.reset_bind_group_pool(pool);
        self.bind_group_pools.remove(pool);
    }
}

impl Drop for HeadlessResourceManager {
    fn drop(&mut self) {
        let leaked = self.live_resources();
        for handle in &leaked {
            log::error!("{} is still alive when the resource manager is destroyed", handle);
        }
        if !std::thread::panicking() {
            debug_assert!(leaked.is_empty(), "{} resources leaked: {:?}", leaked.len(), leaked);
        }
    }
}

impl ResourceManager for HeadlessResourceManager {
    fn create_instance(&mut self, options: &InstanceOptions) -> InstanceHandle {
        let _span = ember_crate_tools::profile_span!("HeadlessResourceManager::create_instance");
        log::info!("create headless instance for {}", options.application_name);
        self.instances.insert(HeadlessInstance {
            application_name: options.application_name.clone(),
            adapters: None,
        })
    }

    fn enumerate_adapters(&mut self, instance: InstanceHandle) -> Vec<AdapterHandle> {
        let Some(record) = self.instances.get(instance) else {
            return vec![];
        };
        if let Some(adapters) = &record.adapters {
            return adapters.iter().copied().filter(|adapter| self.adapters.contains(*adapter)).collect();
        }

        let adapters = Self::default_adapters(instance)
            .into_iter()
            .map(|adapter| self.adapters.insert(adapter))
            .collect_vec();
        if let Some(record) = self.instances.get_mut(instance) {
            record.adapters = Some(adapters.clone());
        }
        adapters
    }

    fn create_surface(&mut self, instance: InstanceHandle, _options: &SurfaceOptions) -> SurfaceHandle {
        if !self.instances.contains(instance) {
            log::error!("Failed to create surface: instance {:?} is not alive", instance);
            return SurfaceHandle::default();
        }
        self.surfaces.insert(HeadlessSurface { instance })
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
        if !self.surfaces.contains(surface) {
            return false;
        }
        self.adapters
            .get(adapter)
            .and_then(|record| record.queue_types.get(queue_type_index as usize))
            .is_some_and(|queue_type| queue_type.flags.contains(QueueFlags::GRAPHICS))
    }

    fn create_device(&mut self, adapter: AdapterHandle, options: &DeviceOptions) -> DeviceHandle {
        let _span = ember_crate_tools::profile_span!("HeadlessResourceManager::create_device");
        let Some(adapter_record) = self.adapters.get(adapter) else {
            log::error!("Failed to create device: adapter {:?} is not alive", adapter);
            return DeviceHandle::default();
        };

        let requested = options.requested_features;
        let available = adapter_record.features;
        if (requested.ray_tracing_pipeline && !available.ray_tracing_pipeline)
            || (requested.acceleration_structures && !available.acceleration_structures)
            || (requested.sampler_ycbcr_conversion && !available.sampler_ycbcr_conversion)
            || (requested.buffer_device_address && !available.buffer_device_address)
        {
            log::error!("Failed to create device: requested features {:?} are not supported", requested);
            return DeviceHandle::default();
        }

        let requested = AdapterFeatures {
            acceleration_structures: requested.acceleration_structures || requested.ray_tracing_pipeline,
            ..requested
        };

        let requests = if options.queues.is_empty() {
            let Some(index) = adapter_record.queue_types.iter().position(|q| q.flags.contains(QueueFlags::GRAPHICS))
            else {
                log::error!("Failed to create device: adapter has no graphics queue");
                return DeviceHandle::default();
            };
            vec![QueueRequest {
                queue_type_index: index as u32,
                count: 1,
                priorities: vec![1.0],
            }]
        } else {
            options.queues.clone()
        };
        for request in &requests {
            let valid = adapter_record
                .queue_types
                .get(request.queue_type_index as usize)
                .is_some_and(|queue_type| request.count > 0 && request.count <= queue_type.queue_count);
            if !valid {
                log::error!("Failed to create device: invalid queue request {:?}", request);
                return DeviceHandle::default();
            }
        }

        let instance = adapter_record.instance;
        let queue_types = adapter_record.queue_types.clone();
        let device = self.devices.insert(HeadlessDevice {
            instance,
            label: options.label.clone(),
            features: requested,
            queues: vec![],
            default_bind_group_pool: BindGroupPoolHandle::default(),
        });

        let mut queues = vec![];
        for request in &requests {
            let queue_type = queue_types[request.queue_type_index as usize];
            for index_in_family in 0..request.count {
                let queue = self.queues.insert(HeadlessQueue { device });
                queues.push(QueueDescription {
                    queue,
                    queue_type_index: request.queue_type_index,
                    index_in_family,
                    flags: queue_type.flags,
                    timestamp_valid_bits: queue_type.timestamp_valid_bits,
                });
            }
        }
        let default_pool = self.bind_group_pools.insert(HeadlessBindGroupPool {
            device,
            label: Some("default bind group pool".to_string()),
            max_bind_group_count: u32::MAX,
            bind_groups: vec![],
        });
        if let Some(record) = self.devices.get_mut(device) {
            record.queues = queues;
            record.default_bind_group_pool = default_pool;
        }

        log::info!("create headless device {:?} with {} queues", device, requests.len());
        device
    }

    fn device_queues(&self, device: DeviceHandle) -> Vec<QueueDescription> {
        self.devices.get(device).map(|record| record.queues.clone()).unwrap_or_default()
    }

    fn wait_device_idle(&self, _device: DeviceHandle) {}

    fn submit(&mut self, queue: QueueHandle, options: &SubmitOptions) {
        let _span = ember_crate_tools::profile_span!("HeadlessResourceManager::submit");
        if !self.queues.contains(queue) {
            log::error!("submit to {:?} which is not alive", queue);
            return;
        }

        for command_buffer in &options.command_buffers {
            let Some(commands) = self.command_buffers.get(*command_buffer).map(|record| record.commands.clone()) else {
                log::error!("submit {:?} which is not alive", command_buffer);
                continue;
            };
            for copy in &commands {
                self.execute_copy(copy);
            }
        }

        self.signal_semaphores(&options.wait_semaphores, false);
        self.signal_semaphores(&options.signal_semaphores, true);
        self.signal_fence(options.signal_fence);
    }

    fn present(&mut self, queue: QueueHandle, options: &PresentOptions) -> PresentResult {
        if !self.queues.contains(queue) {
            return PresentResult::Error;
        }
        self.signal_semaphores(&options.wait_semaphores, false);

        let all_valid = options.swapchain_images.iter().all(|image| {
            self.swapchains
                .get(image.swapchain)
                .is_some_and(|record| (image.image_index as usize) < record.textures.len())
        });
        if all_valid { PresentResult::Success } else { PresentResult::OutOfDate }
    }

    fn wait_queue_idle(&self, _queue: QueueHandle) {}

    fn create_swapchain(&mut self, device: DeviceHandle, options: &SwapchainOptions) -> SwapchainHandle {
        if !self.check_device(device, "swapchain") {
            return SwapchainHandle::default();
        }
        if !self.surfaces.contains(options.surface) {
            log::error!("Failed to create swapchain: surface {:?} is not alive", options.surface);
            return SwapchainHandle::default();
        }
        if options.extent.width == 0 || options.extent.height == 0 {
            log::error!("Failed to create swapchain: extent {:?} is empty", options.extent);
            return SwapchainHandle::default();
        }

        let swapchain = self.swapchains.insert(HeadlessSwapchain {
            device,
            label: options.label.clone(),
            textures: vec![],
            next_image: 0,
        });
        let textures = (0..options.min_image_count.max(1))
            .map(|_| {
                self.textures.insert(HeadlessTexture {
                    device,
                    label: options.label.clone(),
                    source: TextureSource::Swapchain(swapchain),
                })
            })
            .collect_vec();
        if let Some(record) = self.swapchains.get_mut(swapchain) {
            record.textures = textures;
        }
        swapchain
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
        let Some(record) = self.swapchains.get_mut(swapchain) else {
            return AcquireImageResult::Error;
        };
        let image_index = record.next_image;
        record.next_image = (image_index + 1) % record.textures.len().max(1) as u32;

        if let Some(semaphore) = semaphore {
            self.signal_semaphores(&[semaphore], true);
        }
        self.signal_fence(fence);
        AcquireImageResult::Success { image_index }
    }

    fn create_texture(&mut self, device: DeviceHandle, options: &TextureOptions) -> TextureHandle {
        if !self.check_device(device, "texture") {
            return TextureHandle::default();
        }
        let extent = options.extent;
        if extent.width == 0 || extent.height == 0 || extent.depth == 0 || options.mip_levels == 0 {
            log::error!("Failed to create texture: invalid extent {:?} / mip levels {}", extent, options.mip_levels);
            return TextureHandle::default();
        }
        self.textures.insert(HeadlessTexture {
            device,
            label: options.label.clone(),
            source: TextureSource::Owned,
        })
    }

    fn create_texture_view(
        &mut self,
        device: DeviceHandle,
        texture: TextureHandle,
        options: &TextureViewOptions,
    ) -> TextureViewHandle {
        if !self.check_device(device, "texture view") {
            return TextureViewHandle::default();
        }
        if !self.textures.contains(texture) {
            log::error!("Failed to create texture view: texture {:?} is not alive", texture);
            return TextureViewHandle::default();
        }
        self.texture_views.insert(HeadlessTextureView {
            device,
            label: options.label.clone(),
        })
    }

    fn create_buffer(
        &mut self,
        device: DeviceHandle,
        options: &BufferOptions,
        initial_data: Option<&[u8]>,
    ) -> BufferHandle {
        let _span = ember_crate_tools::profile_span!("HeadlessResourceManager::create_buffer");
        if !self.check_device(device, "buffer") {
            return BufferHandle::default();
        }
        if options.size == 0 {
            log::error!("Failed to create buffer {:?}: size is 0", options.label);
            return BufferHandle::default();
        }
        if initial_data.is_some_and(|data| data.len() as u64 > options.size) {
            log::error!("Failed to create buffer {:?}: initial data larger than the buffer", options.label);
            return BufferHandle::default();
        }

        let Some(mut data) = usize::try_from(options.size).ok().and_then(|size| {
            let mut data = Vec::new();
            data.try_reserve_exact(size).ok()?;
            data.resize(size, 0_u8);
            Some(data)
        }) else {
            log::error!("Failed to create buffer {:?}: cannot allocate {} bytes", options.label, options.size);
            return BufferHandle::default();
        };
        if let Some(initial_data) = initial_data {
            data[..initial_data.len()].copy_from_slice(initial_data);
        }

        let device_address = if options.usage.contains(BufferUsageFlags::SHADER_DEVICE_ADDRESS) {
            let address = self.next_device_address;
            self.next_device_address += options.size.div_ceil(DEVICE_ADDRESS_ALIGNMENT) * DEVICE_ADDRESS_ALIGNMENT;
            address
        } else {
            0
        };

        self.buffers.insert(HeadlessBuffer {
            device,
            label: options.label.clone(),
            usage: options.usage,
            memory_usage: options.memory_usage,
            data,
            device_address,
            map_count: 0,
        })
    }

    fn buffer_size(&self, buffer: BufferHandle) -> u64 {
        self.buffers.get(buffer).map(|record| record.data.len() as u64).unwrap_or(0)
    }

    fn map_buffer(&mut self, buffer: BufferHandle) -> Option<NonNull<u8>> {
        let record = self.buffers.get_mut(buffer)?;
        if !record.memory_usage.is_host_visible() {
            log::error!("{:?} lives in gpu only memory and cannot be mapped", buffer);
            return None;
        }
        record.map_count += 1;
        NonNull::new(record.data.as_mut_ptr())
    }

    fn unmap_buffer(&mut self, buffer: BufferHandle) {
        if let Some(record) = self.buffers.get_mut(buffer) {
            record.map_count = record.map_count.saturating_sub(1);
        }
    }

    fn flush_buffer(&mut self, _buffer: BufferHandle) {}

    fn invalidate_buffer(&mut self, _buffer: BufferHandle) {}

    fn buffer_device_address(&self, buffer: BufferHandle) -> u64 {
        self.buffers.get(buffer).map(|record| record.device_address).unwrap_or(0)
    }

    fn create_sampler(&mut self, device: DeviceHandle, options: &SamplerOptions) -> SamplerHandle {
        if !self.check_device(device, "sampler") {
            return SamplerHandle::default();
        }
        if let Some(conversion) = options.ycbcr_conversion
            && !self.ycbcr_conversions.contains(conversion)
        {
            log::error!("Failed to create sampler: ycbcr conversion {:?} is not alive", conversion);
            return SamplerHandle::default();
        }
        self.samplers.insert(HeadlessSampler {
            device,
            label: options.label.clone(),
        })
    }

    fn create_ycbcr_conversion(
        &mut self,
        device: DeviceHandle,
        options: &YcbcrConversionOptions,
    ) -> YcbcrConversionHandle {
        if !self.check_device(device, "ycbcr conversion") {
            return YcbcrConversionHandle::default();
        }
        if !self.devices.get(device).is_some_and(|record| record.features.sampler_ycbcr_conversion) {
            log::error!("Failed to create ycbcr conversion: feature not enabled on {:?}", device);
            return YcbcrConversionHandle::default();
        }
        self.ycbcr_conversions.insert(HeadlessYcbcrConversion {
            device,
            label: options.label.clone(),
        })
    }

    fn create_shader_module(&mut self, device: DeviceHandle, code: &[u32]) -> ShaderModuleHandle {
        if !self.check_device(device, "shader module") {
            return ShaderModuleHandle::default();
        }
        if code.first() != Some(&SPIRV_MAGIC) {
            log::error!("Failed to create shader module: code is not SPIR-V");
            return ShaderModuleHandle::default();
        }
        self.shader_modules.insert(HeadlessShaderModule { device })
    }

    fn create_bind_group_layout(
        &mut self,
        device: DeviceHandle,
        options: &BindGroupLayoutOptions,
    ) -> BindGroupLayoutHandle {
        if !self.check_device(device, "bind group layout") {
            return BindGroupLayoutHandle::default();
        }
        if !options.bindings.iter().map(|binding| binding.binding).all_unique() {
            log::error!("Failed to create bind group layout {:?}: duplicated binding", options.label);
            return BindGroupLayoutHandle::default();
        }
        self.bind_group_layouts.insert(HeadlessBindGroupLayout {
            device,
            label: options.label.clone(),
            bindings: options.bindings.clone(),
        })
    }

    fn create_pipeline_layout(
        &mut self,
        device: DeviceHandle,
        options: &PipelineLayoutOptions,
    ) -> PipelineLayoutHandle {
        if !self.check_device(device, "pipeline layout") {
            return PipelineLayoutHandle::default();
        }
        if let Some(missing) = options.bind_group_layouts.iter().find(|layout| !self.bind_group_layouts.contains(**layout))
        {
            log::error!("Failed to create pipeline layout: bind group layout {:?} is not alive", missing);
            return PipelineLayoutHandle::default();
        }
        self.pipeline_layouts.insert(HeadlessPipelineLayout {
            device,
            label: options.label.clone(),
        })
    }

    fn create_graphics_pipeline(
        &mut self,
        device: DeviceHandle,
        options: &GraphicsPipelineOptions,
    ) -> GraphicsPipelineHandle {
        if !self.check_device(device, "graphics pipeline") {
            return GraphicsPipelineHandle::default();
        }
        if !self.pipeline_layouts.contains(options.layout) {
            log::error!("Failed to create graphics pipeline: layout {:?} is not alive", options.layout);
            return GraphicsPipelineHandle::default();
        }
        if options.shader_stages.is_empty()
            || options.shader_stages.iter().any(|stage| !self.shader_modules.contains(stage.shader_module))
        {
            log::error!("Failed to create graphics pipeline {:?}: invalid shader stages", options.label);
            return GraphicsPipelineHandle::default();
        }
        self.graphics_pipelines.insert(HeadlessGraphicsPipeline {
            device,
            label: options.label.clone(),
        })
    }

    fn create_compute_pipeline(
        &mut self,
        device: DeviceHandle,
        options: &ComputePipelineOptions,
    ) -> ComputePipelineHandle {
        if !self.check_device(device, "compute pipeline") {
            return ComputePipelineHandle::default();
        }
        if !self.pipeline_layouts.contains(options.layout)
            || !self.shader_modules.contains(options.shader_stage.shader_module)
        {
            log::error!("Failed to create compute pipeline {:?}: layout or shader is not alive", options.label);
            return ComputePipelineHandle::default();
        }
        self.compute_pipelines.insert(HeadlessComputePipeline {
            device,
            label: options.label.clone(),
        })
    }

    fn create_raytracing_pipeline(
        &mut self,
        device: DeviceHandle,
        options: &RaytracingPipelineOptions,
    ) -> RaytracingPipelineHandle {
        if !self.check_device(device, "raytracing pipeline") {
            return RaytracingPipelineHandle::default();
        }
        if !self.devices.get(device).is_some_and(|record| record.features.ray_tracing_pipeline) {
            log::error!("Failed to create raytracing pipeline: feature not enabled on {:?}", device);
            return RaytracingPipelineHandle::default();
        }
        if !self.pipeline_layouts.contains(options.layout) {
            log::error!("Failed to create raytracing pipeline: layout {:?} is not alive", options.layout);
            return RaytracingPipelineHandle::default();
        }
        let stage_count = options.shader_stages.len();
        if options.shader_stages.iter().any(|stage| !self.shader_modules.contains(stage.shader_module))
            || options.shader_groups.is_empty()
            || !options.shader_groups.iter().all(|group| group.is_valid(stage_count))
        {
            log::error!("Failed to create raytracing pipeline {:?}: invalid shader stages or groups", options.label);
            return RaytracingPipelineHandle::default();
        }
        self.raytracing_pipelines.insert(HeadlessRaytracingPipeline {
            device,
            label: options.label.clone(),
            group_count: options.shader_groups.len() as u32,
        })
    }

    fn raytracing_shader_group_handles(
        &self,
        pipeline: RaytracingPipelineHandle,
        first_group: u32,
        group_count: u32,
    ) -> Vec<u8> {
        let Some(record) = self.raytracing_pipelines.get(pipeline) else {
            return vec![];
        };
        if first_group.checked_add(group_count).is_none_or(|end| end > record.group_count) {
            log::error!("shader groups {}+{} are out of range for {:?}", first_group, group_count, pipeline);
            return vec![];
        }
        // 每个 handle 的开头是组的下标，剩余部分补零
        (first_group..first_group + group_count)
            .flat_map(|group| {
                let mut handle = [0_u8; SHADER_GROUP_HANDLE_SIZE];
                handle[..4].copy_from_slice(&group.to_le_bytes());
                handle
            })
            .collect()
    }

    fn create_bind_group_pool(&mut self, device: DeviceHandle, options: &BindGroupPoolOptions) -> BindGroupPoolHandle {
        if !self.check_device(device, "bind group pool") {
            return BindGroupPoolHandle::default();
        }
        self.bind_group_pools.insert(HeadlessBindGroupPool {
            device,
            label: options.label.clone(),
            max_bind_group_count: options.max_bind_group_count,
            bind_groups: vec![],
        })
    }

    fn reset_bind_group_pool(&mut self, pool: BindGroupPoolHandle) {
        let Some(record) = self.bind_group_pools.get_mut(pool) else {
            return;
        };
        for bind_group in std::mem::take(&mut record.bind_groups) {
            self.bind_groups.remove(bind_group);
        }
    }

    fn bind_group_pool_allocated(&self, pool: BindGroupPoolHandle) -> u32 {
        self.bind_group_pools.get(pool).map(|record| record.bind_groups.len() as u32).unwrap_or(0)
    }

    fn create_bind_group(&mut self, device: DeviceHandle, options: &BindGroupOptions) -> BindGroupHandle {
        let Some(device_record) = self.devices.get(device) else {
            log::error!("Failed to create bind group: device {:?} is not alive", device);
            return BindGroupHandle::default();
        };
        let pool = options.bind_group_pool.unwrap_or(device_record.default_bind_group_pool);

        let Some(layout) = self.bind_group_layouts.get(options.layout) else {
            log::error!("Failed to create bind group: layout {:?} is not alive", options.layout);
            return BindGroupHandle::default();
        };
        if let Some(entry) = options.resources.iter().find(|entry| {
            !layout.bindings.iter().any(|b| b.binding == entry.binding && entry.resource.matches(b.resource_type))
        }) {
            log::error!("Failed to create bind group: binding {} is not in the layout or has another type", entry.binding);
            return BindGroupHandle::default();
        }

        match self.bind_group_pools.get(pool) {
            None => {
                log::error!("Failed to create bind group: pool {:?} is not alive", pool);
                return BindGroupHandle::default();
            }
            Some(record) if record.bind_groups.len() as u32 >= record.max_bind_group_count => {
                log::error!("Failed to create bind group: pool {:?} is exhausted", pool);
                return BindGroupHandle::default();
            }
            Some(_) => {}
        }

        let bind_group = self.bind_groups.insert(HeadlessBindGroup {
            device,
            label: options.label.clone(),
            pool,
            bindings: layout.bindings.clone(),
            entries: options.resources.clone(),
        });
        if let Some(record) = self.bind_group_pools.get_mut(pool) {
            record.bind_groups.push(bind_group);
        }
        bind_group
    }

    fn update_bind_group(&mut self, bind_group: BindGroupHandle, entry: &BindGroupEntry) {
        let Some(record) = self.bind_groups.get_mut(bind_group) else {
            return;
        };
        let layout_matches =
            record.bindings.iter().any(|b| b.binding == entry.binding && entry.resource.matches(b.resource_type));
        if !layout_matches {
            log::error!("Failed to update {:?}: binding {} has no matching layout slot", bind_group, entry.binding);
            return;
        }
        match record
            .entries
            .iter_mut()
            .find(|e| e.binding == entry.binding && e.array_element == entry.array_element)
        {
            Some(existing) => *existing = *entry,
            None => record.entries.push(*entry),
        }
    }

    fn create_command_recorder(
        &mut self,
        device: DeviceHandle,
        options: &CommandRecorderOptions,
    ) -> CommandRecorderHandle {
        if !self.check_device(device, "command recorder") {
            return CommandRecorderHandle::default();
        }
        self.command_recorders.insert(HeadlessCommandRecorder {
            device,
            label: options.label.clone(),
            commands: vec![],
            finished: false,
        })
    }

    fn copy_buffer(&mut self, recorder: CommandRecorderHandle, copy: &BufferCopy) {
        let src_ok = self.buffers.get(copy.src).is_some_and(|src| {
            src.usage.contains(BufferUsageFlags::TRANSFER_SRC)
                && byte_range(copy.src_offset, copy.byte_size, src.data.len()).is_some()
        });
        let dst_ok = self.buffers.get(copy.dst).is_some_and(|dst| {
            dst.usage.contains(BufferUsageFlags::TRANSFER_DST)
                && byte_range(copy.dst_offset, copy.byte_size, dst.data.len()).is_some()
        });
        if !src_ok || !dst_ok {
            log::error!("invalid buffer copy {:?}", copy);
            return;
        }

        match self.command_recorders.get_mut(recorder) {
            Some(record) if !record.finished => record.commands.push(*copy),
            Some(_) => log::error!("{:?} already finished", recorder),
            None => {}
        }
    }

    fn finish_command_recorder(&mut self, recorder: CommandRecorderHandle) -> CommandBufferHandle {
        let Some(record) = self.command_recorders.get_mut(recorder) else {
            return CommandBufferHandle::default();
        };
        if record.finished {
            log::error!("{:?} already finished", recorder);
            return CommandBufferHandle::default();
        }
        record.finished = true;
        let device = record.device;
        let commands = std::mem::take(&mut record.commands);
        self.command_buffers.insert(HeadlessCommandBuffer { device, commands })
    }

    fn create_timestamp_query_recorder(
        &mut self,
        device: DeviceHandle,
        recorder: CommandRecorderHandle,
        options: &TimestampQueryRecorderOptions,
    ) -> TimestampQueryRecorderHandle {
        if !self.check_device(device, "timestamp query recorder") {
            return TimestampQueryRecorderHandle::default();
        }
        if !self.command_recorders.get(recorder).is_some_and(|record| record.device == device && !record.finished) {
            log::error!("Failed to create timestamp query recorder: {:?} is not recording on {:?}", recorder, device);
            return TimestampQueryRecorderHandle::default();
        }
        if options.query_count == 0 {
            log::error!("Failed to create timestamp query recorder {:?}: query count is 0", options.label);
            return TimestampQueryRecorderHandle::default();
        }
        self.timestamp_query_recorders.insert(HeadlessTimestampQueryRecorder {
            device,
            label: options.label.clone(),
            recorder,
            query_count: options.query_count,
            ticks: vec![],
        })
    }

    fn write_timestamp(&mut self, timestamps: TimestampQueryRecorderHandle, _stage: PipelineStageFlags) -> Option<u32> {
        let record = self.timestamp_query_recorders.get_mut(timestamps)?;
        if !self.command_recorders.get(record.recorder).is_some_and(|recorder| !recorder.finished) {
            log::error!("cannot write timestamp: {:?} is no longer recording", record.recorder);
            return None;
        }

        self.next_timestamp_tick += TIMESTAMP_TICK_STEP;
        let tick = self.next_timestamp_tick;
        if record.ticks.len() as u32 == record.query_count {
            log::warn!("{:?} query count exceeded, overwriting last query", timestamps);
            record.ticks.pop();
        }
        record.ticks.push(tick);
        Some(record.ticks.len() as u32 - 1)
    }

    fn reset_timestamps(&mut self, timestamps: TimestampQueryRecorderHandle) {
        if let Some(record) = self.timestamp_query_recorders.get_mut(timestamps) {
            record.ticks.clear();
        }
    }

    fn timestamp_results(&self, timestamps: TimestampQueryRecorderHandle) -> Vec<u64> {
        self.timestamp_query_recorders.get(timestamps).map(|record| record.ticks.clone()).unwrap_or_default()
    }

    fn timestamp_period(&self, timestamps: TimestampQueryRecorderHandle) -> f32 {
        if self.timestamp_query_recorders.contains(timestamps) { 1.0 } else { 0.0 }
    }

    fn create_fence(&mut self, device: DeviceHandle, options: &FenceOptions) -> FenceHandle {
        if !self.check_device(device, "fence") {
            return FenceHandle::default();
        }
        self.fences.insert(HeadlessFence {
            device,
            label: options.label.clone(),
            signalled: options.create_signalled,
        })
    }

    fn fence_status(&self, fence: FenceHandle) -> FenceStatus {
        match self.fences.get(fence) {
            Some(record) if record.signalled => FenceStatus::Signalled,
            Some(_) => FenceStatus::Unsignalled,
            None => FenceStatus::Error,
        }
    }

    fn wait_for_fence(&self, fence: FenceHandle) {
        if self.fences.get(fence).is_some_and(|record| !record.signalled) {
            // 没有任何挂起的工作，永远不会被 signal
            log::warn!("waiting on {:?} which was never submitted", fence);
        }
    }

    fn reset_fence(&mut self, fence: FenceHandle) {
        if let Some(record) = self.fences.get_mut(fence) {
            record.signalled = false;
        }
    }

    fn create_gpu_semaphore(&mut self, device: DeviceHandle, options: &GpuSemaphoreOptions) -> GpuSemaphoreHandle {
        if !self.check_device(device, "gpu semaphore") {
            return GpuSemaphoreHandle::default();
        }
        self.gpu_semaphores.insert(HeadlessGpuSemaphore {
            device,
            label: options.label.clone(),
            signalled: false,
        })
    }

    fn create_acceleration_structure(
        &mut self,
        device: DeviceHandle,
        options: &AccelerationStructureOptions,
    ) -> AccelerationStructureHandle {
        if !self.check_device(device, "acceleration structure") {
            return AccelerationStructureHandle::default();
        }
        if !self.devices.get(device).is_some_and(|record| record.features.acceleration_structures) {
            log::error!("Failed to create acceleration structure: feature not enabled on {:?}", device);
            return AccelerationStructureHandle::default();
        }
        if options.size == 0 {
            log::error!("Failed to create acceleration structure {:?}: size is 0", options.label);
            return AccelerationStructureHandle::default();
        }
        self.acceleration_structures.insert(HeadlessAccelerationStructure {
            device,
            label: options.label.clone(),
        })
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
        let _span = ember_crate_tools::profile_span!("HeadlessResourceManager::delete_resource");

        fn remove<T, K: ResourceKind>(pool: &mut Pool<T, K>, handle: ErasedHandle) {
            if let Some(handle) = handle.downcast::<K>() {
                pool.remove(handle);
            }
        }

        match handle.resource_type() {
            ResourceType::Instance => handle.downcast().into_iter().for_each(|h| self.delete_instance(h)),
            ResourceType::Device => handle.downcast().into_iter().for_each(|h| self.delete_device(h)),
            ResourceType::Swapchain => handle.downcast().into_iter().for_each(|h| self.delete_swapchain(h)),
            ResourceType::BindGroup => handle.downcast().into_iter().for_each(|h| self.delete_bind_group(h)),
            ResourceType::BindGroupPool => handle.downcast().into_iter().for_each(|h| self.delete_bind_group_pool(h)),
            ResourceType::Adapter => remove(&mut self.adapters, handle),
            ResourceType::Queue => remove(&mut self.queues, handle),
            ResourceType::Surface => remove(&mut self.surfaces, handle),
            ResourceType::Texture => handle.downcast().into_iter().for_each(|h| self.delete_texture(h)),
            ResourceType::TextureView => remove(&mut self.texture_views, handle),
            ResourceType::Buffer => remove(&mut self.buffers, handle),
            ResourceType::Sampler => remove(&mut self.samplers, handle),
            ResourceType::ShaderModule => remove(&mut self.shader_modules, handle),
            ResourceType::BindGroupLayout => remove(&mut self.bind_group_layouts, handle),
            ResourceType::PipelineLayout => remove(&mut self.pipeline_layouts, handle),
            ResourceType::GraphicsPipeline => remove(&mut self.graphics_pipelines, handle),
            ResourceType::ComputePipeline => remove(&mut self.compute_pipelines, handle),
            ResourceType::RaytracingPipeline => remove(&mut self.raytracing_pipelines, handle),
            ResourceType::CommandRecorder => remove(&mut self.command_recorders, handle),
            ResourceType::CommandBuffer => remove(&mut self.command_buffers, handle),
            ResourceType::Fence => remove(&mut self.fences, handle),
            ResourceType::GpuSemaphore => remove(&mut self.gpu_semaphores, handle),
            ResourceType::TimestampQueryRecorder => remove(&mut self.timestamp_query_recorders, handle),
            ResourceType::YcbcrConversion => remove(&mut self.ycbcr_conversions, handle),
            ResourceType::AccelerationStructure => remove(&mut self.acceleration_structures, handle),
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
        erase_all(&self.timestamp_query_recorders, &mut live);
        erase_all(&self.fences, &mut live);
        erase_all(&self.gpu_semaphores, &mut live);
        erase_all(&self.acceleration_structures, &mut live);
        live
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (HeadlessResourceManager, InstanceHandle, DeviceHandle) {
        let mut rm = HeadlessResourceManager::new();
        let instance = rm.create_instance(&InstanceOptions::default());
        let adapters = rm.enumerate_adapters(instance);
        let device = rm.create_device(adapters[0], &DeviceOptions::default());
        assert!(device.is_valid());
        (rm, instance, device)
    }

    fn host_buffer(size: u64) -> BufferOptions {
        BufferOptions {
            label: None,
            size,
            usage: BufferUsageFlags::TRANSFER_SRC | BufferUsageFlags::TRANSFER_DST,
            memory_usage: MemoryUsage::CpuToGpu,
        }
    }

    #[test]
    fn test_enumerate_adapters_cached() {
        let mut rm = HeadlessResourceManager::new();
        let instance = rm.create_instance(&InstanceOptions::default());
        let first = rm.enumerate_adapters(instance);
        let second = rm.enumerate_adapters(instance);
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);

        rm.delete_resource(instance.erase());
        assert!(rm.live_resources().is_empty());
    }

    #[test]
    fn test_pools_start_with_kind_capacity() {
        let rm = HeadlessResourceManager::new();
        assert_eq!(rm.instances.capacity(), 1);
        assert_eq!(rm.queues.capacity(), 4);
        assert_eq!(rm.textures.capacity(), 128);
        assert_eq!(rm.buffers.capacity(), 128);
        assert_eq!(rm.timestamp_query_recorders.capacity(), 4);
        assert!(rm.live_resources().is_empty());
    }

    #[test]
    fn test_default_device_queue() {
        let (mut rm, instance, device) = setup();
        let queues = rm.device_queues(device);
        assert_eq!(queues.len(), 1);
        assert!(queues[0].flags.contains(QueueFlags::GRAPHICS));

        rm.delete_resource(instance.erase());
    }

    #[test]
    fn test_unsupported_feature_rejected() {
        let mut rm = HeadlessResourceManager::new();
        let instance = rm.create_instance(&InstanceOptions::default());
        let adapters = rm.enumerate_adapters(instance);
        let options = DeviceOptions {
            requested_features: AdapterFeatures {
                acceleration_structures: true,
                ..Default::default()
            },
            ..Default::default()
        };
        // 第二个 adapter 没有任何 feature
        let device = rm.create_device(adapters[1], &options);
        assert!(!device.is_valid());

        rm.delete_resource(instance.erase());
    }

    #[test]
    fn test_device_cascade_releases_children() {
        let (mut rm, instance, device) = setup();
        let buffer = rm.create_buffer(device, &host_buffer(16), None);
        let fence = rm.create_fence(device, &FenceOptions::default());
        assert!(rm.buffers.contains(buffer));

        rm.delete_resource(device.erase());
        assert!(!rm.buffers.contains(buffer));
        assert!(!rm.fences.contains(fence));
        assert!(rm.queues.is_empty());
        assert!(rm.bind_group_pools.is_empty());

        // 之后再删除是无操作
        rm.delete_resource(buffer.erase());
        rm.delete_resource(instance.erase());
        assert!(rm.live_resources().is_empty());
    }

    #[test]
    fn test_swapchain_owns_textures() {
        use ember_gfx::raw_window_handle::{RawDisplayHandle, RawWindowHandle, XlibDisplayHandle, XlibWindowHandle};

        let (mut rm, instance, device) = setup();
        let surface = rm.create_surface(
            instance,
            &SurfaceOptions {
                display_handle: RawDisplayHandle::Xlib(XlibDisplayHandle::new(None, 0)),
                window_handle: RawWindowHandle::Xlib(XlibWindowHandle::new(1)),
            },
        );
        let swapchain = rm.create_swapchain(
            device,
            &SwapchainOptions {
                surface,
                extent: Extent2D {
                    width: 64,
                    height: 64,
                },
                ..Default::default()
            },
        );
        let textures = rm.swapchain_textures(swapchain);
        assert_eq!(textures.len(), 3);

        assert_eq!(rm.acquire_next_image(swapchain, None, None), AcquireImageResult::Success { image_index: 0 });
        assert_eq!(rm.acquire_next_image(swapchain, None, None), AcquireImageResult::Success { image_index: 1 });

        rm.delete_resource(swapchain.erase());
        assert!(textures.iter().all(|texture| !rm.textures.contains(*texture)));

        rm.delete_resource(instance.erase());
        assert!(rm.live_resources().is_empty());
    }

    #[test]
    fn test_submit_executes_copies() {
        let (mut rm, instance, device) = setup();
        let queue = rm.device_queues(device)[0].queue;
        let src = rm.create_buffer(device, &host_buffer(8), Some(&[1, 2, 3, 4, 5, 6, 7, 8]));
        let dst = rm.create_buffer(device, &host_buffer(8), None);
        let fence = rm.create_fence(device, &FenceOptions::default());

        let recorder = rm.create_command_recorder(device, &CommandRecorderOptions::default());
        rm.copy_buffer(
            recorder,
            &BufferCopy {
                src,
                src_offset: 4,
                dst,
                dst_offset: 0,
                byte_size: 4,
            },
        );
        let command_buffer = rm.finish_command_recorder(recorder);
        assert!(command_buffer.is_valid());
        assert!(!rm.finish_command_recorder(recorder).is_valid());

        assert_eq!(rm.fence_status(fence), FenceStatus::Unsignalled);
        rm.submit(
            queue,
            &SubmitOptions {
                command_buffers: vec![command_buffer],
                signal_fence: Some(fence),
                ..Default::default()
            },
        );
        assert_eq!(rm.fence_status(fence), FenceStatus::Signalled);
        assert_eq!(&rm.buffers.get(dst).unwrap().data[..4], &[5, 6, 7, 8]);

        rm.delete_resource(instance.erase());
    }

    #[test]
    fn test_out_of_range_copy_is_not_recorded() {
        let (mut rm, instance, device) = setup();
        let src = rm.create_buffer(device, &host_buffer(4), None);
        let dst = rm.create_buffer(device, &host_buffer(4), None);
        let recorder = rm.create_command_recorder(device, &CommandRecorderOptions::default());
        rm.copy_buffer(
            recorder,
            &BufferCopy {
                src,
                src_offset: 2,
                dst,
                dst_offset: 0,
                byte_size: 4,
            },
        );
        assert!(rm.command_recorders.get(recorder).unwrap().commands.is_empty());

        rm.delete_resource(instance.erase());
    }

    #[test]
    fn test_overflowing_copy_is_rejected() {
        let (mut rm, instance, device) = setup();
        let src = rm.create_buffer(device, &host_buffer(4), Some(&[1, 2, 3, 4]));
        let dst = rm.create_buffer(device, &host_buffer(4), None);
        let recorder = rm.create_command_recorder(device, &CommandRecorderOptions::default());
        rm.copy_buffer(
            recorder,
            &BufferCopy {
                src,
                src_offset: u64::MAX,
                dst,
                dst_offset: 0,
                byte_size: 2,
            },
        );
        rm.copy_buffer(
            recorder,
            &BufferCopy {
                src,
                src_offset: 0,
                dst,
                dst_offset: u64::MAX - 1,
                byte_size: 4,
            },
        );
        assert!(rm.command_recorders.get(recorder).unwrap().commands.is_empty());

        // 直接执行同样的命令也只是被丢弃
        rm.execute_copy(&BufferCopy {
            src,
            src_offset: u64::MAX,
            dst,
            dst_offset: 0,
            byte_size: 2,
        });
        assert_eq!(rm.buffers.get(dst).unwrap().data, vec![0; 4]);

        rm.delete_resource(instance.erase());
    }

    #[test]
    fn test_byte_range() {
        assert_eq!(byte_range(2, 2, 4), Some(2..4));
        assert_eq!(byte_range(0, 0, 0), Some(0..0));
        assert_eq!(byte_range(3, 2, 4), None);
        assert_eq!(byte_range(u64::MAX, 2, 4), None);
    }

    #[test]
    fn test_huge_buffer_is_rejected() {
        let (mut rm, instance, device) = setup();
        let buffer = rm.create_buffer(device, &host_buffer(u64::MAX), None);
        assert!(!buffer.is_valid());
        assert!(rm.buffers.is_empty());

        rm.delete_resource(instance.erase());
    }

    #[test]
    fn test_bind_group_pool_reset() {
        let (mut rm, instance, device) = setup();
        let layout = rm.create_bind_group_layout(
            device,
            &BindGroupLayoutOptions {
                label: None,
                bindings: vec![ResourceBindingLayout {
                    binding: 0,
                    count: 1,
                    resource_type: ResourceBindingType::UniformBuffer,
                    shader_stages: ShaderStageFlags::VERTEX,
                }],
            },
        );
        let pool = rm.create_bind_group_pool(
            device,
            &BindGroupPoolOptions {
                max_bind_group_count: 2,
                ..Default::default()
            },
        );
        let options = BindGroupOptions {
            layout,
            bind_group_pool: Some(pool),
            ..Default::default()
        };
        let first = rm.create_bind_group(device, &options);
        let second = rm.create_bind_group(device, &options);
        let third = rm.create_bind_group(device, &options);
        assert!(first.is_valid() && second.is_valid());
        assert!(!third.is_valid());
        assert_eq!(rm.bind_group_pool_allocated(pool), 2);

        rm.delete_resource(first.erase());
        assert_eq!(rm.bind_group_pool_allocated(pool), 1);

        rm.reset_bind_group_pool(pool);
        assert_eq!(rm.bind_group_pool_allocated(pool), 0);
        assert!(!rm.bind_groups.contains(second));

        rm.delete_resource(instance.erase());
        assert!(rm.live_resources().is_empty());
    }

    #[test]
    fn test_bind_group_rejects_unknown_binding() {
        let (mut rm, instance, device) = setup();
        let layout = rm.create_bind_group_layout(device, &BindGroupLayoutOptions::default());
        let buffer = rm.create_buffer(device, &host_buffer(16), None);
        let bind_group = rm.create_bind_group(
            device,
            &BindGroupOptions {
                layout,
                resources: vec![BindGroupEntry {
                    binding: 3,
                    array_element: 0,
                    resource: BindingResource::uniform_buffer(buffer),
                }],
                ..Default::default()
            },
        );
        assert!(!bind_group.is_valid());

        rm.delete_resource(instance.erase());
    }

    #[test]
    fn test_shader_module_requires_spirv() {
        let (mut rm, instance, device) = setup();
        assert!(!rm.create_shader_module(device, &[0xDEAD_BEEF]).is_valid());
        assert!(!rm.create_shader_module(device, &[]).is_valid());
        assert!(rm.create_shader_module(device, &[SPIRV_MAGIC, 0x0001_0000]).is_valid());

        rm.delete_resource(instance.erase());
    }

    #[test]
    fn test_device_address() {
        let (mut rm, instance, device) = setup();
        let plain = rm.create_buffer(device, &host_buffer(16), None);
        let options = BufferOptions {
            usage: BufferUsageFlags::STORAGE | BufferUsageFlags::SHADER_DEVICE_ADDRESS,
            ..host_buffer(100)
        };
        let a = rm.create_buffer(device, &options, None);
        let b = rm.create_buffer(device, &options, None);
        assert_eq!(rm.buffer_device_address(plain), 0);
        assert_eq!(rm.buffer_device_address(a), DEVICE_ADDRESS_BASE);
        assert_eq!(rm.buffer_device_address(b), DEVICE_ADDRESS_BASE + DEVICE_ADDRESS_ALIGNMENT);

        rm.delete_resource(instance.erase());
    }

    #[test]
    fn test_resource_lookup_by_erased_handle() {
        let (mut rm, instance, device) = setup();
        let buffer = rm.create_buffer(
            device,
            &BufferOptions {
                label: Some("vertices".to_string()),
                ..host_buffer(4)
            },
            None,
        );
        let record = rm.resource(buffer.erase()).unwrap();
        assert_eq!(record.device(), device);
        assert_eq!(record.label(), Some("vertices"));
        assert!(record.as_any().downcast_ref::<HeadlessBuffer>().is_some());

        rm.delete_resource(buffer.erase());
        assert!(rm.resource(buffer.erase()).is_none());

        rm.delete_resource(instance.erase());
    }

    #[test]
    fn test_timestamps_follow_recorder() {
        let (mut rm, instance, device) = setup();
        let recorder = rm.create_command_recorder(device, &CommandRecorderOptions::default());
        let timestamps = rm.create_timestamp_query_recorder(
            device,
            recorder,
            &TimestampQueryRecorderOptions {
                query_count: 2,
                ..Default::default()
            },
        );
        assert!(timestamps.is_valid());

        assert_eq!(rm.write_timestamp(timestamps, PipelineStageFlags::TOP_OF_PIPE), Some(0));
        assert_eq!(rm.write_timestamp(timestamps, PipelineStageFlags::BOTTOM_OF_PIPE), Some(1));
        // 写满之后覆盖最后一个
        assert_eq!(rm.write_timestamp(timestamps, PipelineStageFlags::BOTTOM_OF_PIPE), Some(1));
        let results = rm.timestamp_results(timestamps);
        assert_eq!(results.len(), 2);
        assert_eq!(results[1] - results[0], 2 * TIMESTAMP_TICK_STEP);

        rm.reset_timestamps(timestamps);
        assert!(rm.timestamp_results(timestamps).is_empty());

        // recorder 结束后不能再写入，但仍然可以读取
        rm.write_timestamp(timestamps, PipelineStageFlags::TOP_OF_PIPE);
        rm.finish_command_recorder(recorder);
        assert_eq!(rm.write_timestamp(timestamps, PipelineStageFlags::TOP_OF_PIPE), None);
        assert_eq!(rm.timestamp_results(timestamps).len(), 1);
        assert!(!rm.create_timestamp_query_recorder(device, recorder, &Default::default()).is_valid());

        rm.delete_resource(device.erase());
        assert!(!rm.timestamp_query_recorders.contains(timestamps));
        rm.delete_resource(instance.erase());
        assert!(rm.live_resources().is_empty());
    }

    #[test]
    fn test_shader_group_handles() {
        let mut rm = HeadlessResourceManager::new();
        let instance = rm.create_instance(&InstanceOptions::default());
        let adapters = rm.enumerate_adapters(instance);
        let device = rm.create_device(
            adapters[0],
            &DeviceOptions {
                requested_features: AdapterFeatures {
                    ray_tracing_pipeline: true,
                    ..Default::default()
                },
                ..Default::default()
            },
        );
        assert!(rm.devices.get(device).unwrap().features.acceleration_structures);

        let module = rm.create_shader_module(device, &[SPIRV_MAGIC]);
        let layout = rm.create_pipeline_layout(device, &PipelineLayoutOptions::default());
        let options = RaytracingPipelineOptions {
            shader_stages: vec![
                ShaderStage::new(module, ShaderStageFlags::RAYGEN),
                ShaderStage::new(module, ShaderStageFlags::MISS),
                ShaderStage::new(module, ShaderStageFlags::CLOSEST_HIT),
            ],
            shader_groups: vec![
                RaytracingShaderGroup::general(0),
                RaytracingShaderGroup::general(1),
                RaytracingShaderGroup::triangles_hit(Some(2), None),
            ],
            layout,
            ..Default::default()
        };
        let pipeline = rm.create_raytracing_pipeline(device, &options);
        assert!(pipeline.is_valid());

        let handles = rm.raytracing_shader_group_handles(pipeline, 1, 2);
        assert_eq!(handles.len(), 2 * SHADER_GROUP_HANDLE_SIZE);
        assert_eq!(&handles[..4], &1_u32.to_le_bytes());
        assert_eq!(&handles[SHADER_GROUP_HANDLE_SIZE..SHADER_GROUP_HANDLE_SIZE + 4], &2_u32.to_le_bytes());
        assert!(rm.raytracing_shader_group_handles(pipeline, 2, 2).is_empty());
        assert!(rm.raytracing_shader_group_handles(pipeline, u32::MAX, 2).is_empty());

        let broken = RaytracingPipelineOptions {
            shader_groups: vec![RaytracingShaderGroup::general(3)],
            ..options
        };
        assert!(!rm.create_raytracing_pipeline(device, &broken).is_valid());

        rm.delete_resource(instance.erase());
        assert!(rm.live_resources().is_empty());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "resources leaked")]
    fn test_leak_detected_on_drop() {
        let mut rm = HeadlessResourceManager::new();
        rm.create_instance(&InstanceOptions::default());
    }
}
