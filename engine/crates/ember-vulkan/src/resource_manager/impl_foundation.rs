use std::{
    collections::HashMap,
    ffi::{CStr, CString, c_char},
    mem::ManuallyDrop,
};

use anyhow::Context;
use ash::vk;
use ember_gfx::{handle::*, options::*, types::*};
use itertools::Itertools;

use super::{VulkanResourceManager, alive, alive_mut};
use crate::{debug_messenger::VulkanDebugMessenger, records::*, vulkan_enums::*};

const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// 设备默认 bind group pool 中每类描述符的数量
const DEFAULT_POOL_CAPACITY: u32 = 1024;

/// 把用户传入的名字转成 C 字符串
fn c_strings(names: &[String]) -> anyhow::Result<Vec<CString>> {
    names
        .iter()
        .map(|name| CString::new(name.as_str()).with_context(|| format!("{:?} contains nul", name)))
        .collect()
}

fn log_names(what: &str, names: &[*const c_char]) {
    let mut names_str = String::new();
    for name in names {
        names_str.push_str(&format!("\n\t{:?}", unsafe { CStr::from_ptr(*name) }));
    }
    log::info!("{}: {}", what, names_str);
}

/// 创建 descriptor pool，允许单独释放 descriptor set
pub(super) fn create_descriptor_pool(
    device: &ash::Device,
    options: &BindGroupPoolOptions,
) -> anyhow::Result<vk::DescriptorPool> {
    let counts = [
        (vk::DescriptorType::UNIFORM_BUFFER, options.uniform_buffer_count),
        (vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC, options.dynamic_uniform_buffer_count),
        (vk::DescriptorType::STORAGE_BUFFER, options.storage_buffer_count),
        (vk::DescriptorType::COMBINED_IMAGE_SAMPLER, options.texture_sampler_count),
        (vk::DescriptorType::SAMPLED_IMAGE, options.texture_count),
        (vk::DescriptorType::SAMPLER, options.sampler_count),
        (vk::DescriptorType::STORAGE_IMAGE, options.image_count),
        (vk::DescriptorType::ACCELERATION_STRUCTURE_KHR, options.acceleration_structure_count),
    ];
    let pool_sizes = counts
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .map(|(ty, descriptor_count)| vk::DescriptorPoolSize { ty, descriptor_count })
        .collect_vec();
    anyhow::ensure!(!pool_sizes.is_empty(), "bind group pool {:?} has no descriptors", options.label);
    anyhow::ensure!(options.max_bind_group_count > 0, "bind group pool {:?} has max_bind_group_count 0", options.label);

    let create_info = vk::DescriptorPoolCreateInfo::default()
        .flags(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET)
        .max_sets(options.max_bind_group_count)
        .pool_sizes(&pool_sizes);
    let pool = unsafe { device.create_descriptor_pool(&create_info, None) }.context("vkCreateDescriptorPool")?;
    Ok(pool)
}

// instance & adapter
impl VulkanResourceManager {
    pub(super) fn try_create_instance(&mut self, options: &InstanceOptions) -> anyhow::Result<InstanceHandle> {
        let app_name = CString::new(options.application_name.as_str())?;
        let app_info = vk::ApplicationInfo::default()
            .api_version(vk::API_VERSION_1_3) // 版本过低时，有些函数无法正确加载
            .application_name(&app_name)
            .application_version(options.application_version)
            .engine_name(c"Ember")
            .engine_version(vk::make_api_version(0, 0, 1, 0));

        let available_exts = unsafe { self.entry.enumerate_instance_extension_properties(None)? };
        let ext_supported =
            |name: &CStr| available_exts.iter().any(|ext| ext.extension_name_as_c_str().is_ok_and(|ext| ext == name));
        let available_layers = unsafe { self.entry.enumerate_instance_layer_properties()? };
        let layer_supported =
            |name: &CStr| available_layers.iter().any(|layer| layer.layer_name_as_c_str().is_ok_and(|l| l == name));

        // extensions
        let user_exts = c_strings(&options.extensions)?;
        let mut extensions = vec![];
        for ext in &user_exts {
            anyhow::ensure!(ext_supported(ext), "instance extension {:?} is not supported", ext);
            extensions.push(ext.as_ptr());
        }
        let surface_enabled = options.display_handle.is_some();
        if let Some(display_handle) = options.display_handle {
            let required = ash_window::enumerate_required_extensions(display_handle)
                .context("no surface extensions for this display")?;
            extensions.extend_from_slice(required);
        }
        // debug messenger 与 debug name 都依赖这个扩展，缺失时只是少了调试信息
        let debug_utils_enabled = ext_supported(ash::ext::debug_utils::NAME);
        if debug_utils_enabled {
            extensions.push(ash::ext::debug_utils::NAME.as_ptr());
        } else {
            log::warn!("{:?} is not available", ash::ext::debug_utils::NAME);
        }
        let extensions = extensions.into_iter().unique().collect_vec();
        log_names("instance extensions", &extensions);

        // layers
        let user_layers = c_strings(&options.layers)?;
        let mut layers = vec![];
        for layer in &user_layers {
            anyhow::ensure!(layer_supported(layer), "instance layer {:?} is not available", layer);
            layers.push(layer.as_ptr());
        }
        if options.validation_enabled() {
            if layer_supported(VALIDATION_LAYER) {
                layers.push(VALIDATION_LAYER.as_ptr());
            } else {
                log::warn!("validation requested but {:?} is not installed", VALIDATION_LAYER);
            }
        }
        log_names("instance layers", &layers);

        let mut messenger_ci = VulkanDebugMessenger::messenger_ci();
        let mut instance_ci = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_extension_names(&extensions)
            .enabled_layer_names(&layers);
        if debug_utils_enabled {
            instance_ci = instance_ci.push_next(&mut messenger_ci);
        }
        let instance = unsafe { self.entry.create_instance(&instance_ci, None) }.context("vkCreateInstance")?;

        let debug_messenger = if debug_utils_enabled {
            VulkanDebugMessenger::new(&self.entry, &instance)
                .inspect_err(|err| log::warn!("Failed to create debug messenger: {:#}", err))
                .ok()
        } else {
            None
        };
        let surface_loader = ash::khr::surface::Instance::new(&self.entry, &instance);

        log::info!("create vulkan instance for {}", options.application_name);
        Ok(self.instances.insert(VulkanInstance {
            application_name: options.application_name.clone(),
            instance,
            surface_loader,
            debug_messenger,
            debug_utils_enabled,
            surface_enabled,
            adapters: None,
        }))
    }

    pub(super) fn try_enumerate_adapters(&mut self, instance_handle: InstanceHandle) -> anyhow::Result<Vec<AdapterHandle>> {
        let instance = alive(&self.instances, instance_handle)?;
        if let Some(adapters) = &instance.adapters {
            return Ok(adapters.iter().copied().filter(|adapter| self.adapters.contains(*adapter)).collect());
        }

        let physical_devices = unsafe { instance.instance.enumerate_physical_devices()? };
        let mut adapters = vec![];
        for physical_device in physical_devices {
            let record = Self::describe_adapter(&instance.instance, instance_handle, physical_device)?;
            log::info!(
                "found adapter {} ({:?}), queue families: {:?}",
                record.properties.device_name,
                record.properties.device_type,
                record.queue_types
            );
            adapters.push(self.adapters.insert(record));
        }

        alive_mut(&mut self.instances, instance_handle)?.adapters = Some(adapters.clone());
        Ok(adapters)
    }

    fn describe_adapter(
        instance: &ash::Instance,
        instance_handle: InstanceHandle,
        physical_device: vk::PhysicalDevice,
    ) -> anyhow::Result<VulkanAdapter> {
        let vk_properties = unsafe { instance.get_physical_device_properties(physical_device) };
        let properties = AdapterProperties {
            api_version: vk_properties.api_version,
            driver_version: vk_properties.driver_version,
            vendor_id: vk_properties.vendor_id,
            device_id: vk_properties.device_id,
            device_type: device_type_from_vk(vk_properties.device_type),
            device_name: vk_properties
                .device_name_as_c_str()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };

        let queue_types = unsafe { instance.get_physical_device_queue_family_properties(physical_device) }
            .iter()
            .map(|family| AdapterQueueType {
                flags: queue_flags_from_vk(family.queue_flags),
                queue_count: family.queue_count,
                timestamp_valid_bits: family.timestamp_valid_bits,
            })
            .collect_vec();

        let extensions = unsafe { instance.enumerate_device_extension_properties(physical_device)? }
            .iter()
            .filter_map(|ext| ext.extension_name_as_c_str().ok().map(CStr::to_owned))
            .collect_vec();
        let has_ext = |name: &CStr| extensions.iter().any(|ext| ext.as_c_str() == name);
        let as_exts_supported = has_ext(ash::khr::acceleration_structure::NAME)
            && has_ext(ash::khr::deferred_host_operations::NAME);
        let rt_ext_supported = as_exts_supported && has_ext(ash::khr::ray_tracing_pipeline::NAME);

        let mut ycbcr_features = vk::PhysicalDeviceSamplerYcbcrConversionFeatures::default();
        let mut address_features = vk::PhysicalDeviceBufferDeviceAddressFeatures::default();
        let mut as_features = vk::PhysicalDeviceAccelerationStructureFeaturesKHR::default();
        let mut rt_features = vk::PhysicalDeviceRayTracingPipelineFeaturesKHR::default();
        let mut features2 =
            vk::PhysicalDeviceFeatures2::default().push_next(&mut ycbcr_features).push_next(&mut address_features);
        if as_exts_supported {
            features2 = features2.push_next(&mut as_features);
        }
        if rt_ext_supported {
            features2 = features2.push_next(&mut rt_features);
        }
        unsafe { instance.get_physical_device_features2(physical_device, &mut features2) };

        let acceleration_structures = as_exts_supported && as_features.acceleration_structure == vk::TRUE;
        let features = AdapterFeatures {
            buffer_device_address: address_features.buffer_device_address == vk::TRUE,
            sampler_ycbcr_conversion: ycbcr_features.sampler_ycbcr_conversion == vk::TRUE,
            acceleration_structures,
            ray_tracing_pipeline: acceleration_structures
                && rt_ext_supported
                && rt_features.ray_tracing_pipeline == vk::TRUE,
        };

        let mut rt_properties = vk::PhysicalDeviceRayTracingPipelinePropertiesKHR::default();
        if features.ray_tracing_pipeline {
            let mut properties2 = vk::PhysicalDeviceProperties2::default().push_next(&mut rt_properties);
            unsafe { instance.get_physical_device_properties2(physical_device, &mut properties2) };
        }
        let limits = AdapterLimits {
            timestamp_period: vk_properties.limits.timestamp_period,
            shader_group_handle_size: rt_properties.shader_group_handle_size,
            max_ray_recursion_depth: rt_properties.max_ray_recursion_depth,
        };

        Ok(VulkanAdapter {
            instance: instance_handle,
            physical_device,
            properties,
            features,
            queue_types,
            extensions,
            limits,
        })
    }

    pub(super) fn supports_presentation(
        &self,
        adapter: AdapterHandle,
        surface: SurfaceHandle,
        queue_type_index: u32,
    ) -> bool {
        let (Some(adapter), Some(surface)) = (self.adapters.get(adapter), self.surfaces.get(surface)) else {
            return false;
        };
        let Some(instance) = self.instances.get(adapter.instance) else {
            return false;
        };
        unsafe {
            instance.surface_loader.get_physical_device_surface_support(
                adapter.physical_device,
                queue_type_index,
                surface.surface,
            )
        }
        .unwrap_or(false)
    }

    pub(super) fn try_create_surface(
        &mut self,
        instance_handle: InstanceHandle,
        options: &SurfaceOptions,
    ) -> anyhow::Result<SurfaceHandle> {
        let instance = alive(&self.instances, instance_handle)?;
        anyhow::ensure!(instance.surface_enabled, "instance was created without a display handle");

        let surface = unsafe {
            ash_window::create_surface(
                &self.entry,
                &instance.instance,
                options.display_handle,
                options.window_handle,
                None,
            )
        }
        .context("Failed to create surface")?;

        Ok(self.surfaces.insert(VulkanSurface {
            instance: instance_handle,
            surface,
        }))
    }
}

// device & queue
impl VulkanResourceManager {
    pub(super) fn try_create_device(
        &mut self,
        adapter_handle: AdapterHandle,
        options: &DeviceOptions,
    ) -> anyhow::Result<DeviceHandle> {
        let adapter = alive(&self.adapters, adapter_handle)?;
        let instance = alive(&self.instances, adapter.instance)?;

        anyhow::ensure!(
            adapter.properties.api_version >= vk::API_VERSION_1_3,
            "adapter {} does not support Vulkan 1.3",
            adapter.properties.device_name
        );
        let requested = options.requested_features;
        let available = adapter.features;
        anyhow::ensure!(
            (!requested.ray_tracing_pipeline || available.ray_tracing_pipeline)
                && (!requested.acceleration_structures || available.acceleration_structures)
                && (!requested.sampler_ycbcr_conversion || available.sampler_ycbcr_conversion)
                && (!requested.buffer_device_address || available.buffer_device_address),
            "requested features {:?} are not supported",
            requested
        );
        // 光追管线依赖加速结构
        let requested = AdapterFeatures {
            acceleration_structures: requested.acceleration_structures || requested.ray_tracing_pipeline,
            ..requested
        };

        // queues
        let requests = if options.queues.is_empty() {
            let index = adapter
                .queue_types
                .iter()
                .position(|queue_type| queue_type.flags.contains(QueueFlags::GRAPHICS))
                .context("adapter has no graphics queue")?;
            vec![QueueRequest {
                queue_type_index: index as u32,
                count: 1,
                priorities: vec![1.0],
            }]
        } else {
            options.queues.clone()
        };
        for request in &requests {
            let valid = adapter
                .queue_types
                .get(request.queue_type_index as usize)
                .is_some_and(|queue_type| request.count > 0 && request.count <= queue_type.queue_count);
            anyhow::ensure!(valid, "invalid queue request {:?}", request);
        }
        anyhow::ensure!(
            requests.iter().map(|request| request.queue_type_index).all_unique(),
            "each queue family can only be requested once"
        );
        let priorities = requests
            .iter()
            .map(|request| {
                let mut priorities = request.priorities.clone();
                priorities.resize(request.count as usize, 1.0);
                priorities
            })
            .collect_vec();
        let queue_cis = requests
            .iter()
            .zip(&priorities)
            .map(|(request, priorities)| {
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(request.queue_type_index)
                    .queue_priorities(priorities)
            })
            .collect_vec();

        // extensions
        let swapchain_enabled = instance.surface_enabled && adapter.supports_extension(ash::khr::swapchain::NAME);
        let user_exts = c_strings(&options.extensions)?;
        let mut extensions = vec![];
        for ext in &user_exts {
            anyhow::ensure!(adapter.supports_extension(ext), "device extension {:?} is not supported", ext);
            extensions.push(ext.as_ptr());
        }
        if swapchain_enabled {
            extensions.push(ash::khr::swapchain::NAME.as_ptr());
        }
        if requested.acceleration_structures {
            extensions.push(ash::khr::acceleration_structure::NAME.as_ptr());
            extensions.push(ash::khr::deferred_host_operations::NAME.as_ptr());
        }
        if requested.ray_tracing_pipeline {
            extensions.push(ash::khr::ray_tracing_pipeline::NAME.as_ptr());
        }
        let extensions = extensions.into_iter().unique().collect_vec();
        log_names("device extensions", &extensions);

        // features
        let mut vk11_features =
            vk::PhysicalDeviceVulkan11Features::default().sampler_ycbcr_conversion(requested.sampler_ycbcr_conversion);
        // 加速结构的存储 buffer 依赖 device address
        let device_address_enabled = requested.buffer_device_address || requested.acceleration_structures;
        let mut vk12_features =
            vk::PhysicalDeviceVulkan12Features::default().buffer_device_address(device_address_enabled);
        let mut vk13_features =
            vk::PhysicalDeviceVulkan13Features::default().dynamic_rendering(true).synchronization2(true);
        let mut as_features =
            vk::PhysicalDeviceAccelerationStructureFeaturesKHR::default().acceleration_structure(true);
        let mut features2 = vk::PhysicalDeviceFeatures2::default()
            .push_next(&mut vk11_features)
            .push_next(&mut vk12_features)
            .push_next(&mut vk13_features);
        let mut rt_features =
            vk::PhysicalDeviceRayTracingPipelineFeaturesKHR::default().ray_tracing_pipeline(true);
        if requested.acceleration_structures {
            features2 = features2.push_next(&mut as_features);
        }
        if requested.ray_tracing_pipeline {
            features2 = features2.push_next(&mut rt_features);
        }

        let device_ci = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_cis)
            .enabled_extension_names(&extensions)
            .push_next(&mut features2);
        let device = unsafe { instance.instance.create_device(adapter.physical_device, &device_ci, None) }
            .context("vkCreateDevice")?;

        let mut allocator_ci = vk_mem::AllocatorCreateInfo::new(&instance.instance, &device, adapter.physical_device);
        allocator_ci.vulkan_api_version = vk::API_VERSION_1_3;
        if device_address_enabled {
            allocator_ci.flags = vk_mem::AllocatorCreateFlags::BUFFER_DEVICE_ADDRESS;
        }
        let allocator = match unsafe { vk_mem::Allocator::new(allocator_ci) } {
            Ok(allocator) => allocator,
            Err(err) => {
                unsafe { device.destroy_device(None) };
                return Err(err).context("Failed to create memory allocator");
            }
        };

        let default_pool_options = BindGroupPoolOptions {
            label: Some(format!("{} default", options.label.as_deref().unwrap_or("device"))),
            uniform_buffer_count: DEFAULT_POOL_CAPACITY,
            dynamic_uniform_buffer_count: DEFAULT_POOL_CAPACITY,
            storage_buffer_count: DEFAULT_POOL_CAPACITY,
            texture_sampler_count: DEFAULT_POOL_CAPACITY,
            texture_count: DEFAULT_POOL_CAPACITY,
            sampler_count: DEFAULT_POOL_CAPACITY,
            image_count: DEFAULT_POOL_CAPACITY,
            acceleration_structure_count: if requested.acceleration_structures { DEFAULT_POOL_CAPACITY } else { 0 },
            max_bind_group_count: DEFAULT_POOL_CAPACITY,
        };
        let default_pool = match create_descriptor_pool(&device, &default_pool_options) {
            Ok(pool) => pool,
            Err(err) => {
                drop(allocator);
                unsafe { device.destroy_device(None) };
                return Err(err);
            }
        };

        let swapchain_loader = swapchain_enabled.then(|| ash::khr::swapchain::Device::new(&instance.instance, &device));
        let debug_utils =
            instance.debug_utils_enabled.then(|| ash::ext::debug_utils::Device::new(&instance.instance, &device));
        let acceleration_structure = requested
            .acceleration_structures
            .then(|| ash::khr::acceleration_structure::Device::new(&instance.instance, &device));
        let ray_tracing_pipeline = requested
            .ray_tracing_pipeline
            .then(|| ash::khr::ray_tracing_pipeline::Device::new(&instance.instance, &device));

        // 以下不会再失败，开始写入资源池
        let queue_types = adapter.queue_types.clone();
        let device_handle = self.devices.insert(VulkanDevice {
            instance: adapter.instance,
            label: options.label.clone(),
            physical_device: adapter.physical_device,
            device,
            swapchain_loader,
            debug_utils,
            acceleration_structure,
            ray_tracing_pipeline,
            allocator: ManuallyDrop::new(allocator),
            features: requested,
            limits: adapter.limits,
            queues: vec![],
            default_bind_group_pool: BindGroupPoolHandle::default(),
            command_pools: HashMap::new(),
        });
        let device = alive(&self.devices, device_handle)?;
        device.set_debug_name(default_pool, default_pool_options.label.as_deref());

        let mut queues = vec![];
        for request in &requests {
            let queue_type = queue_types[request.queue_type_index as usize];
            for index_in_family in 0..request.count {
                let vk_queue = unsafe { device.device.get_device_queue(request.queue_type_index, index_in_family) };
                let queue = self.queues.insert(VulkanQueue {
                    device: device_handle,
                    queue: vk_queue,
                    queue_family_index: request.queue_type_index,
                });
                queues.push(QueueDescription {
                    queue,
                    queue_type_index: request.queue_type_index,
                    index_in_family,
                    flags: queue_type.flags,
                    timestamp_valid_bits: queue_type.timestamp_valid_bits,
                });
            }
        }
        let default_bind_group_pool = self.bind_group_pools.insert(VulkanBindGroupPool {
            device: device_handle,
            label: default_pool_options.label,
            pool: default_pool,
            max_bind_group_count: default_pool_options.max_bind_group_count,
            bind_groups: vec![],
        });

        let record = alive_mut(&mut self.devices, device_handle)?;
        record.queues = queues;
        record.default_bind_group_pool = default_bind_group_pool;

        log::info!("create vulkan device {:?} with {} queue families", device_handle, requests.len());
        Ok(device_handle)
    }

    pub(super) fn try_submit(&mut self, queue_handle: QueueHandle, options: &SubmitOptions) -> anyhow::Result<()> {
        let queue = alive(&self.queues, queue_handle)?;
        let device = alive(&self.devices, queue.device)?;

        let command_buffers = options
            .command_buffers
            .iter()
            .map(|handle| alive(&self.command_buffers, *handle).map(|record| record.command_buffer))
            .collect::<anyhow::Result<Vec<_>>>()?;
        let wait_semaphores = options
            .wait_semaphores
            .iter()
            .map(|handle| alive(&self.gpu_semaphores, *handle).map(|record| record.semaphore))
            .collect::<anyhow::Result<Vec<_>>>()?;
        let wait_stages = vec![vk::PipelineStageFlags::ALL_COMMANDS; wait_semaphores.len()];
        let signal_semaphores = options
            .signal_semaphores
            .iter()
            .map(|handle| alive(&self.gpu_semaphores, *handle).map(|record| record.semaphore))
            .collect::<anyhow::Result<Vec<_>>>()?;
        let fence = match options.signal_fence {
            Some(fence) => alive(&self.fences, fence)?.fence,
            None => vk::Fence::null(),
        };

        let submit_info = vk::SubmitInfo::default()
            .command_buffers(&command_buffers)
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .signal_semaphores(&signal_semaphores);
        unsafe { device.device.queue_submit(queue.queue, &[submit_info], fence) }.context("vkQueueSubmit")?;
        Ok(())
    }

    pub(super) fn present_swapchains(&mut self, queue_handle: QueueHandle, options: &PresentOptions) -> PresentResult {
        let Some(queue) = self.queues.get(queue_handle) else {
            return PresentResult::Error;
        };
        let Some(loader) = self.devices.get(queue.device).and_then(|device| device.swapchain_loader.as_ref()) else {
            log::error!("present on {:?} whose device has no swapchain support", queue_handle);
            return PresentResult::Error;
        };

        let mut swapchains = vec![];
        let mut image_indices = vec![];
        for image in &options.swapchain_images {
            match self.swapchains.get(image.swapchain) {
                Some(record) if (image.image_index as usize) < record.textures.len() => {
                    swapchains.push(record.swapchain);
                    image_indices.push(image.image_index);
                }
                _ => return PresentResult::OutOfDate,
            }
        }
        let wait_semaphores = options
            .wait_semaphores
            .iter()
            .filter_map(|handle| self.gpu_semaphores.get(*handle).map(|record| record.semaphore))
            .collect_vec();

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);
        match unsafe { loader.queue_present(queue.queue, &present_info) } {
            Ok(false) => PresentResult::Success,
            Ok(true) => PresentResult::Suboptimal,
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => PresentResult::OutOfDate,
            Err(err) => {
                log::error!("vkQueuePresentKHR failed: {:?}", err);
                PresentResult::Error
            }
        }
    }
}

// swapchain
impl VulkanResourceManager {
    pub(super) fn try_create_swapchain(
        &mut self,
        device_handle: DeviceHandle,
        options: &SwapchainOptions,
    ) -> anyhow::Result<SwapchainHandle> {
        let device = alive(&self.devices, device_handle)?;
        let loader = device.swapchain_loader()?;
        let surface = alive(&self.surfaces, options.surface)?;
        let instance = alive(&self.instances, surface.instance)?;
        anyhow::ensure!(options.extent.width > 0 && options.extent.height > 0, "extent {:?} is empty", options.extent);

        let caps = unsafe {
            instance.surface_loader.get_physical_device_surface_capabilities(device.physical_device, surface.surface)
        }
        .context("Failed to query surface capabilities")?;

        let mut image_count = options.min_image_count.max(caps.min_image_count);
        if caps.max_image_count > 0 {
            image_count = image_count.min(caps.max_image_count);
        }
        // current_extent 为 u32::MAX 时由 swapchain 决定大小
        let extent = if caps.current_extent.width != u32::MAX {
            caps.current_extent
        } else {
            vk::Extent2D {
                width: options.extent.width.clamp(caps.min_image_extent.width, caps.max_image_extent.width),
                height: options.extent.height.clamp(caps.min_image_extent.height, caps.max_image_extent.height),
            }
        };
        let old_swapchain = options
            .old_swapchain
            .and_then(|handle| self.swapchains.get(handle))
            .map(|record| record.swapchain)
            .unwrap_or_default();

        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface.surface)
            .min_image_count(image_count)
            .image_format(format_to_vk(options.format))
            .image_color_space(color_space_to_vk(options.color_space))
            .image_extent(extent)
            .image_array_layers(options.image_layers.max(1))
            .image_usage(texture_usage_to_vk(options.image_usage))
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(caps.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode_to_vk(options.present_mode))
            .clipped(options.clipped)
            .old_swapchain(old_swapchain);
        let swapchain = unsafe { loader.create_swapchain(&create_info, None) }.context("vkCreateSwapchainKHR")?;
        let images = match unsafe { loader.get_swapchain_images(swapchain) } {
            Ok(images) => images,
            Err(err) => {
                unsafe { loader.destroy_swapchain(swapchain, None) };
                return Err(err).context("vkGetSwapchainImagesKHR");
            }
        };
        device.set_debug_name(swapchain, options.label.as_deref());

        let swapchain_handle = self.swapchains.insert(VulkanSwapchain {
            device: device_handle,
            label: options.label.clone(),
            swapchain,
            textures: vec![],
        });
        let textures = images
            .into_iter()
            .enumerate()
            .map(|(index, image)| {
                let label = options.label.as_ref().map(|label| format!("{}::image-{}", label, index));
                device.set_debug_name(image, label.as_deref());
                self.textures.insert(VulkanTexture {
                    device: device_handle,
                    label,
                    image,
                    format: options.format,
                    allocation: None,
                })
            })
            .collect_vec();
        log::info!("create swapchain {:?} with {} images, extent {:?}", swapchain_handle, textures.len(), extent);

        alive_mut(&mut self.swapchains, swapchain_handle)?.textures = textures;
        Ok(swapchain_handle)
    }

    pub(super) fn acquire_swapchain_image(
        &mut self,
        swapchain: SwapchainHandle,
        semaphore: Option<GpuSemaphoreHandle>,
        fence: Option<FenceHandle>,
    ) -> AcquireImageResult {
        let Some(record) = self.swapchains.get(swapchain) else {
            return AcquireImageResult::Error;
        };
        let Some(loader) = self.devices.get(record.device).and_then(|device| device.swapchain_loader.as_ref()) else {
            return AcquireImageResult::Error;
        };
        let semaphore = semaphore
            .and_then(|handle| self.gpu_semaphores.get(handle))
            .map(|record| record.semaphore)
            .unwrap_or_default();
        let fence = fence.and_then(|handle| self.fences.get(handle)).map(|record| record.fence).unwrap_or_default();

        match unsafe { loader.acquire_next_image(record.swapchain, u64::MAX, semaphore, fence) } {
            Ok((image_index, false)) => AcquireImageResult::Success { image_index },
            Ok((image_index, true)) => AcquireImageResult::Suboptimal { image_index },
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => AcquireImageResult::OutOfDate,
            Err(err) => {
                log::error!("vkAcquireNextImageKHR failed on {:?}: {:?}", swapchain, err);
                AcquireImageResult::Error
            }
        }
    }
}
