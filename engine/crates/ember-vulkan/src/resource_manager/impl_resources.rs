use std::ptr::NonNull;

use anyhow::Context;
use ash::vk;
use ember_gfx::{handle::*, options::*, types::*};
use vk_mem::Alloc;

use super::{VulkanResourceManager, alive};
use crate::{records::*, vulkan_enums::*};

/// 映射、拷贝、flush 之后解除映射
fn upload(allocator: &vk_mem::Allocator, allocation: &mut vk_mem::Allocation, data: &[u8]) -> anyhow::Result<()> {
    unsafe {
        let ptr = allocator.map_memory(allocation).context("Failed to map buffer for initial data")?;
        std::ptr::copy_nonoverlapping(data.as_ptr(), ptr, data.len());
    }
    let flushed = allocator.flush_allocation(allocation, 0, data.len() as vk::DeviceSize);
    unsafe { allocator.unmap_memory(allocation) };
    flushed.context("Failed to flush initial data")
}

// texture
impl VulkanResourceManager {
    pub(super) fn try_create_texture(
        &mut self,
        device_handle: DeviceHandle,
        options: &TextureOptions,
    ) -> anyhow::Result<TextureHandle> {
        let device = alive(&self.devices, device_handle)?;
        let extent = options.extent;
        anyhow::ensure!(
            extent.width > 0 && extent.height > 0 && extent.depth > 0 && options.mip_levels > 0,
            "invalid extent {:?} / mip levels {}",
            extent,
            options.mip_levels
        );

        let is_cube = options.texture_type == TextureType::TextureTypeCube;
        anyhow::ensure!(
            !is_cube || options.array_layers % 6 == 0,
            "cube texture needs a multiple of 6 layers, got {}",
            options.array_layers
        );
        let flags = if is_cube { vk::ImageCreateFlags::CUBE_COMPATIBLE } else { vk::ImageCreateFlags::empty() };

        let image_ci = vk::ImageCreateInfo::default()
            .flags(flags)
            .image_type(image_type_to_vk(options.texture_type))
            .format(format_to_vk(options.format))
            .extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: extent.depth,
            })
            .mip_levels(options.mip_levels)
            .array_layers(options.array_layers.max(1))
            .samples(sample_count_to_vk(options.samples))
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(texture_usage_to_vk(options.usage))
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);
        let (image, allocation) = unsafe { device.allocator.create_image(&image_ci, &allocation_info(options.memory_usage)) }
            .context("Failed to allocate image")?;
        device.set_debug_name(image, options.label.as_ref().map(|label| format!("Image::{}", label)).as_deref());

        Ok(self.textures.insert(VulkanTexture {
            device: device_handle,
            label: options.label.clone(),
            image,
            format: options.format,
            allocation: Some(allocation),
        }))
    }

    pub(super) fn try_create_texture_view(
        &mut self,
        device_handle: DeviceHandle,
        texture_handle: TextureHandle,
        options: &TextureViewOptions,
    ) -> anyhow::Result<TextureViewHandle> {
        let device = alive(&self.devices, device_handle)?;
        let texture = alive(&self.textures, texture_handle)?;
        anyhow::ensure!(texture.device == device_handle, "{:?} belongs to another device", texture_handle);

        let format = options.format.unwrap_or(texture.format);
        let view_ci = vk::ImageViewCreateInfo::default()
            .image(texture.image)
            .view_type(view_type_to_vk(options.view_type))
            .format(format_to_vk(format))
            .subresource_range(subresource_range_to_vk(&options.range, format));
        let view = unsafe { device.device.create_image_view(&view_ci, None) }.context("vkCreateImageView")?;
        device.set_debug_name(view, options.label.as_ref().map(|label| format!("ImageView::{}", label)).as_deref());

        Ok(self.texture_views.insert(VulkanTextureView {
            device: device_handle,
            label: options.label.clone(),
            view,
        }))
    }
}

// buffer
impl VulkanResourceManager {
    pub(super) fn try_create_buffer(
        &mut self,
        device_handle: DeviceHandle,
        options: &BufferOptions,
        initial_data: Option<&[u8]>,
    ) -> anyhow::Result<BufferHandle> {
        let device = alive(&self.devices, device_handle)?;
        anyhow::ensure!(options.size > 0, "buffer {:?} has size 0", options.label);
        anyhow::ensure!(
            initial_data.is_none_or(|data| data.len() as u64 <= options.size),
            "initial data larger than buffer {:?}",
            options.label
        );
        let wants_address = options.usage.contains(BufferUsageFlags::SHADER_DEVICE_ADDRESS);
        anyhow::ensure!(
            !wants_address || device.features.buffer_device_address,
            "buffer_device_address is not enabled on {:?}",
            device_handle
        );

        let mut alloc_info = allocation_info(options.memory_usage);
        // gpu only 的 buffer 需要初始数据时，要求分配一块主机可写的内存
        if initial_data.is_some() && !options.memory_usage.is_host_visible() {
            alloc_info.flags |= vk_mem::AllocationCreateFlags::HOST_ACCESS_SEQUENTIAL_WRITE;
        }
        let buffer_ci = vk::BufferCreateInfo::default()
            .size(options.size)
            .usage(buffer_usage_to_vk(options.usage))
            .sharing_mode(vk::SharingMode::EXCLUSIVE);
        let (buffer, mut allocation) =
            unsafe { device.allocator.create_buffer(&buffer_ci, &alloc_info) }.context("Failed to allocate buffer")?;

        if let Some(data) = initial_data.filter(|data| !data.is_empty())
            && let Err(err) = upload(&device.allocator, &mut allocation, data)
        {
            unsafe { device.allocator.destroy_buffer(buffer, &mut allocation) };
            return Err(err);
        }

        let device_address = if wants_address {
            unsafe { device.device.get_buffer_device_address(&vk::BufferDeviceAddressInfo::default().buffer(buffer)) }
        } else {
            0
        };
        device.set_debug_name(buffer, options.label.as_ref().map(|label| format!("Buffer::{}", label)).as_deref());

        Ok(self.buffers.insert(VulkanBuffer {
            device: device_handle,
            label: options.label.clone(),
            buffer,
            allocation,
            size: options.size,
            usage: options.usage,
            memory_usage: options.memory_usage,
            device_address,
            map_count: 0,
        }))
    }

    /// 句柄失效时返回 `Ok(None)`
    pub(super) fn try_map_buffer(&mut self, buffer: BufferHandle) -> anyhow::Result<Option<NonNull<u8>>> {
        let Some(record) = self.buffers.get_mut(buffer) else {
            return Ok(None);
        };
        anyhow::ensure!(record.memory_usage.is_host_visible(), "{:?} lives in gpu only memory", buffer);
        let device = alive(&self.devices, record.device)?;

        let ptr = unsafe { device.allocator.map_memory(&mut record.allocation) }.context("vmaMapMemory")?;
        record.map_count += 1;
        Ok(NonNull::new(ptr))
    }

    pub(super) fn unmap(&mut self, buffer: BufferHandle) {
        let Some(record) = self.buffers.get_mut(buffer) else {
            return;
        };
        if record.map_count == 0 {
            log::warn!("unmap {:?} which is not mapped", buffer);
            return;
        }
        let Some(device) = self.devices.get(record.device) else {
            return;
        };
        unsafe { device.allocator.unmap_memory(&mut record.allocation) };
        record.map_count -= 1;
    }

    /// `invalidate` 为 true 时让 GPU 的写入对 CPU 可见，否则把 CPU 的写入 flush 给 GPU
    pub(super) fn try_flush_buffer(&mut self, buffer: BufferHandle, invalidate: bool) -> anyhow::Result<()> {
        let Some(record) = self.buffers.get(buffer) else {
            return Ok(());
        };
        let device = alive(&self.devices, record.device)?;
        if invalidate {
            device.allocator.invalidate_allocation(&record.allocation, 0, vk::WHOLE_SIZE)?;
        } else {
            device.allocator.flush_allocation(&record.allocation, 0, vk::WHOLE_SIZE)?;
        }
        Ok(())
    }
}

// sampler
impl VulkanResourceManager {
    pub(super) fn try_create_sampler(
        &mut self,
        device_handle: DeviceHandle,
        options: &SamplerOptions,
    ) -> anyhow::Result<SamplerHandle> {
        let device = alive(&self.devices, device_handle)?;

        let mut sampler_ci = vk::SamplerCreateInfo::default()
            .mag_filter(filter_to_vk(options.mag_filter))
            .min_filter(filter_to_vk(options.min_filter))
            .mipmap_mode(mipmap_mode_to_vk(options.mipmap_filter))
            .address_mode_u(address_mode_to_vk(options.u))
            .address_mode_v(address_mode_to_vk(options.v))
            .address_mode_w(address_mode_to_vk(options.w))
            .min_lod(options.lod_min_clamp)
            .max_lod(options.lod_max_clamp)
            .anisotropy_enable(options.anisotropy_enabled)
            .max_anisotropy(options.max_anisotropy)
            .compare_enable(options.compare_enabled)
            .compare_op(compare_op_to_vk(options.compare))
            .unnormalized_coordinates(!options.normalized_coordinates);
        let mut ycbcr_info = vk::SamplerYcbcrConversionInfo::default();
        if let Some(conversion) = options.ycbcr_conversion {
            ycbcr_info = ycbcr_info.conversion(alive(&self.ycbcr_conversions, conversion)?.conversion);
            sampler_ci = sampler_ci.push_next(&mut ycbcr_info);
        }
        let sampler = unsafe { device.device.create_sampler(&sampler_ci, None) }.context("vkCreateSampler")?;
        device.set_debug_name(sampler, options.label.as_ref().map(|label| format!("Sampler::{}", label)).as_deref());

        Ok(self.samplers.insert(VulkanSampler {
            device: device_handle,
            label: options.label.clone(),
            sampler,
        }))
    }

    pub(super) fn try_create_ycbcr_conversion(
        &mut self,
        device_handle: DeviceHandle,
        options: &YcbcrConversionOptions,
    ) -> anyhow::Result<YcbcrConversionHandle> {
        let device = alive(&self.devices, device_handle)?;
        anyhow::ensure!(
            device.features.sampler_ycbcr_conversion,
            "sampler_ycbcr_conversion is not enabled on {:?}",
            device_handle
        );

        let conversion_ci = vk::SamplerYcbcrConversionCreateInfo::default()
            .format(format_to_vk(options.format))
            .ycbcr_model(ycbcr_model_to_vk(options.model))
            .ycbcr_range(ycbcr_range_to_vk(options.range))
            .components(vk::ComponentMapping::default())
            .x_chroma_offset(vk::ChromaLocation::MIDPOINT)
            .y_chroma_offset(vk::ChromaLocation::MIDPOINT)
            .chroma_filter(filter_to_vk(options.chroma_filter))
            .force_explicit_reconstruction(options.force_explicit_reconstruction);
        let conversion = unsafe { device.device.create_sampler_ycbcr_conversion(&conversion_ci, None) }
            .context("vkCreateSamplerYcbcrConversion")?;
        device.set_debug_name(conversion, options.label.as_deref());

        Ok(self.ycbcr_conversions.insert(VulkanYcbcrConversion {
            device: device_handle,
            label: options.label.clone(),
            conversion,
        }))
    }
}

