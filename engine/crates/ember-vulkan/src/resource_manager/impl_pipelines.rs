use std::ffi::CString;

use anyhow::Context;
use ash::vk;
use ember_gfx::{handle::*, options::*, types::*};
use itertools::Itertools;

use super::{SPIRV_MAGIC, VulkanResourceManager, alive, alive_mut, impl_foundation::create_descriptor_pool};
use crate::{records::*, vulkan_enums::*};

/// 0 表示使用设备上限，其余值截断到上限
fn recursion_depth(requested: u32, max_depth: u32) -> u32 {
    match requested {
        0 => max_depth,
        depth => depth.min(max_depth),
    }
}

fn check_entry(bindings: &[ResourceBindingLayout], entry: &BindGroupEntry) -> anyhow::Result<ResourceBindingLayout> {
    let layout = bindings
        .iter()
        .find(|binding| binding.binding == entry.binding)
        .copied()
        .with_context(|| format!("binding {} is not in the layout", entry.binding))?;
    anyhow::ensure!(
        entry.resource.matches(layout.resource_type),
        "binding {} expects {:?}, got {:?}",
        entry.binding,
        layout.resource_type,
        entry.resource
    );
    anyhow::ensure!(
        entry.array_element < layout.count,
        "array element {} out of range for binding {} (count {})",
        entry.array_element,
        entry.binding,
        layout.count
    );
    Ok(layout)
}

// shader
impl VulkanResourceManager {
    pub(super) fn try_create_shader_module(
        &mut self,
        device_handle: DeviceHandle,
        code: &[u32],
    ) -> anyhow::Result<ShaderModuleHandle> {
        let device = alive(&self.devices, device_handle)?;
        anyhow::ensure!(code.first() == Some(&SPIRV_MAGIC), "code is not SPIR-V");

        let shader_module_ci = vk::ShaderModuleCreateInfo::default().code(code);
        let shader_module =
            unsafe { device.device.create_shader_module(&shader_module_ci, None) }.context("vkCreateShaderModule")?;

        Ok(self.shader_modules.insert(VulkanShaderModule {
            device: device_handle,
            label: None,
            shader_module,
        }))
    }
}

// bind group
impl VulkanResourceManager {
    pub(super) fn try_create_bind_group_layout(
        &mut self,
        device_handle: DeviceHandle,
        options: &BindGroupLayoutOptions,
    ) -> anyhow::Result<BindGroupLayoutHandle> {
        let device = alive(&self.devices, device_handle)?;
        anyhow::ensure!(
            options.bindings.iter().map(|binding| binding.binding).all_unique(),
            "bind group layout {:?} has duplicated bindings",
            options.label
        );
        anyhow::ensure!(
            device.features.acceleration_structures
                || options.bindings.iter().all(|b| b.resource_type != ResourceBindingType::AccelerationStructure),
            "acceleration structure bindings need the acceleration_structures feature"
        );

        let bindings = options
            .bindings
            .iter()
            .map(|binding| {
                vk::DescriptorSetLayoutBinding::default()
                    .binding(binding.binding)
                    .descriptor_type(descriptor_type_to_vk(binding.resource_type))
                    .descriptor_count(binding.count)
                    .stage_flags(shader_stages_to_vk(binding.shader_stages))
            })
            .collect_vec();
        let layout_ci = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);
        let layout = unsafe { device.device.create_descriptor_set_layout(&layout_ci, None) }
            .context("vkCreateDescriptorSetLayout")?;
        device.set_debug_name(layout, options.label.as_deref());

        Ok(self.bind_group_layouts.insert(VulkanBindGroupLayout {
            device: device_handle,
            label: options.label.clone(),
            layout,
            bindings: options.bindings.clone(),
        }))
    }

    pub(super) fn try_create_bind_group_pool(
        &mut self,
        device_handle: DeviceHandle,
        options: &BindGroupPoolOptions,
    ) -> anyhow::Result<BindGroupPoolHandle> {
        let device = alive(&self.devices, device_handle)?;
        anyhow::ensure!(
            options.acceleration_structure_count == 0 || device.features.acceleration_structures,
            "acceleration structure descriptors need the acceleration_structures feature"
        );

        let pool = create_descriptor_pool(&device.device, options)?;
        device.set_debug_name(pool, options.label.as_deref());

        Ok(self.bind_group_pools.insert(VulkanBindGroupPool {
            device: device_handle,
            label: options.label.clone(),
            pool,
            max_bind_group_count: options.max_bind_group_count,
            bind_groups: vec![],
        }))
    }

    pub(super) fn try_create_bind_group(
        &mut self,
        device_handle: DeviceHandle,
        options: &BindGroupOptions,
    ) -> anyhow::Result<BindGroupHandle> {
        let device = alive(&self.devices, device_handle)?;
        let pool_handle = options.bind_group_pool.unwrap_or(device.default_bind_group_pool);
        let layout = alive(&self.bind_group_layouts, options.layout)?;
        for entry in &options.resources {
            check_entry(&layout.bindings, entry)?;
        }

        let pool = alive(&self.bind_group_pools, pool_handle)?;
        anyhow::ensure!(pool.device == device_handle, "{:?} belongs to another device", pool_handle);
        anyhow::ensure!(
            (pool.bind_groups.len() as u32) < pool.max_bind_group_count,
            "{:?} is exhausted",
            pool_handle
        );

        let set_layouts = [layout.layout];
        let allocate_info =
            vk::DescriptorSetAllocateInfo::default().descriptor_pool(pool.pool).set_layouts(&set_layouts);
        let descriptor_set = unsafe { device.device.allocate_descriptor_sets(&allocate_info) }
            .context("vkAllocateDescriptorSets")?
            .into_iter()
            .next()
            .context("no descriptor set allocated")?;
        device.set_debug_name(descriptor_set, options.label.as_deref());

        let bind_group = self.bind_groups.insert(VulkanBindGroup {
            device: device_handle,
            label: options.label.clone(),
            pool: pool_handle,
            descriptor_pool: pool.pool,
            descriptor_set,
            bindings: layout.bindings.clone(),
        });
        alive_mut(&mut self.bind_group_pools, pool_handle)?.bind_groups.push(bind_group);

        if let Err(err) = options.resources.iter().try_for_each(|entry| self.try_update_bind_group(bind_group, entry)) {
            self.delete_bind_group(bind_group);
            return Err(err);
        }
        Ok(bind_group)
    }

    pub(super) fn try_update_bind_group(
        &self,
        bind_group: BindGroupHandle,
        entry: &BindGroupEntry,
    ) -> anyhow::Result<()> {
        let record = alive(&self.bind_groups, bind_group)?;
        let device = alive(&self.devices, record.device)?;
        let layout = check_entry(&record.bindings, entry)?;

        let write = vk::WriteDescriptorSet::default()
            .dst_set(record.descriptor_set)
            .dst_binding(entry.binding)
            .dst_array_element(entry.array_element)
            .descriptor_type(descriptor_type_to_vk(layout.resource_type));

        let buffer_info;
        let image_info;
        let acceleration_structures;
        let mut acceleration_structure_write;
        let write = match entry.resource {
            BindingResource::UniformBuffer { buffer, offset, size }
            | BindingResource::StorageBuffer { buffer, offset, size }
            | BindingResource::DynamicUniformBuffer { buffer, offset, size } => {
                // WHOLE_SIZE 与 vk::WHOLE_SIZE 取值相同
                buffer_info = [vk::DescriptorBufferInfo {
                    buffer: alive(&self.buffers, buffer)?.buffer,
                    offset,
                    range: size,
                }];
                write.buffer_info(&buffer_info)
            }
            BindingResource::TextureView(view) => {
                image_info = [vk::DescriptorImageInfo {
                    sampler: vk::Sampler::null(),
                    image_view: alive(&self.texture_views, view)?.view,
                    image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                }];
                write.image_info(&image_info)
            }
            BindingResource::StorageImage(view) => {
                image_info = [vk::DescriptorImageInfo {
                    sampler: vk::Sampler::null(),
                    image_view: alive(&self.texture_views, view)?.view,
                    image_layout: vk::ImageLayout::GENERAL,
                }];
                write.image_info(&image_info)
            }
            BindingResource::Sampler(sampler) => {
                image_info = [vk::DescriptorImageInfo {
                    sampler: alive(&self.samplers, sampler)?.sampler,
                    image_view: vk::ImageView::null(),
                    image_layout: vk::ImageLayout::UNDEFINED,
                }];
                write.image_info(&image_info)
            }
            BindingResource::TextureViewSampler { view, sampler } => {
                image_info = [vk::DescriptorImageInfo {
                    sampler: alive(&self.samplers, sampler)?.sampler,
                    image_view: alive(&self.texture_views, view)?.view,
                    image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                }];
                write.image_info(&image_info)
            }
            BindingResource::AccelerationStructure(acceleration_structure) => {
                acceleration_structures =
                    [alive(&self.acceleration_structures, acceleration_structure)?.acceleration_structure];
                acceleration_structure_write = vk::WriteDescriptorSetAccelerationStructureKHR::default()
                    .acceleration_structures(&acceleration_structures);
                // 加速结构的数量只能从 pNext 中得到
                write.descriptor_count(1).push_next(&mut acceleration_structure_write)
            }
        };

        unsafe { device.device.update_descriptor_sets(&[write], &[]) };
        Ok(())
    }
}

// pipeline
impl VulkanResourceManager {
    pub(super) fn try_create_pipeline_layout(
        &mut self,
        device_handle: DeviceHandle,
        options: &PipelineLayoutOptions,
    ) -> anyhow::Result<PipelineLayoutHandle> {
        let device = alive(&self.devices, device_handle)?;
        let set_layouts = options
            .bind_group_layouts
            .iter()
            .map(|handle| alive(&self.bind_group_layouts, *handle).map(|record| record.layout))
            .collect::<anyhow::Result<Vec<_>>>()?;
        let push_constant_ranges = options
            .push_constant_ranges
            .iter()
            .map(|range| vk::PushConstantRange {
                stage_flags: shader_stages_to_vk(range.shader_stages),
                offset: range.offset,
                size: range.size,
            })
            .collect_vec();

        let layout_ci = vk::PipelineLayoutCreateInfo::default()
            .set_layouts(&set_layouts)
            .push_constant_ranges(&push_constant_ranges);
        let pipeline_layout =
            unsafe { device.device.create_pipeline_layout(&layout_ci, None) }.context("vkCreatePipelineLayout")?;
        device.set_debug_name(pipeline_layout, options.label.as_deref());

        Ok(self.pipeline_layouts.insert(VulkanPipelineLayout {
            device: device_handle,
            label: options.label.clone(),
            pipeline_layout,
        }))
    }

    pub(super) fn try_create_graphics_pipeline(
        &mut self,
        device_handle: DeviceHandle,
        options: &GraphicsPipelineOptions,
    ) -> anyhow::Result<GraphicsPipelineHandle> {
        let device = alive(&self.devices, device_handle)?;
        let layout = alive(&self.pipeline_layouts, options.layout)?;
        anyhow::ensure!(!options.shader_stages.is_empty(), "graphics pipeline {:?} has no shader stages", options.label);

        let entry_points = options
            .shader_stages
            .iter()
            .map(|stage| CString::new(stage.entry_point.as_str()))
            .collect::<Result<Vec<_>, _>>()?;
        let stages = options
            .shader_stages
            .iter()
            .zip(&entry_points)
            .map(|(stage, entry_point)| -> anyhow::Result<_> {
                let module = alive(&self.shader_modules, stage.shader_module)?.shader_module;
                Ok(vk::PipelineShaderStageCreateInfo::default()
                    .stage(shader_stages_to_vk(stage.stage))
                    .module(module)
                    .name(entry_point))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        let vertex_bindings = options
            .vertex
            .buffers
            .iter()
            .map(|buffer| vk::VertexInputBindingDescription {
                binding: buffer.binding,
                stride: buffer.stride,
                input_rate: vertex_rate_to_vk(buffer.input_rate),
            })
            .collect_vec();
        let vertex_attributes = options
            .vertex
            .attributes
            .iter()
            .map(|attribute| vk::VertexInputAttributeDescription {
                location: attribute.location,
                binding: attribute.binding,
                format: format_to_vk(attribute.format),
                offset: attribute.offset,
            })
            .collect_vec();
        let vertex_input = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&vertex_bindings)
            .vertex_attribute_descriptions(&vertex_attributes);

        let input_assembly =
            vk::PipelineInputAssemblyStateCreateInfo::default().topology(topology_to_vk(options.primitive.topology));
        // viewport 与 scissor 都是动态状态，这里只需要数量
        let viewport_state = vk::PipelineViewportStateCreateInfo::default().viewport_count(1).scissor_count(1);
        let rasterization = vk::PipelineRasterizationStateCreateInfo::default()
            .polygon_mode(polygon_mode_to_vk(options.primitive.polygon_mode))
            .cull_mode(cull_mode_to_vk(options.primitive.cull_mode))
            .front_face(front_face_to_vk(options.primitive.front_face))
            .line_width(1.0);
        let multisample =
            vk::PipelineMultisampleStateCreateInfo::default().rasterization_samples(sample_count_to_vk(options.samples));

        let depth_stencil = match options.depth_stencil {
            Some(depth) => vk::PipelineDepthStencilStateCreateInfo::default()
                .depth_test_enable(depth.depth_test_enabled)
                .depth_write_enable(depth.depth_writes_enabled)
                .depth_compare_op(compare_op_to_vk(depth.depth_compare_operation)),
            None => vk::PipelineDepthStencilStateCreateInfo::default(),
        };

        let blend_attachments = options
            .render_targets
            .iter()
            .map(|target| {
                vk::PipelineColorBlendAttachmentState::default()
                    .blend_enable(target.blend_enabled)
                    .src_color_blend_factor(vk::BlendFactor::SRC_ALPHA)
                    .dst_color_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
                    .color_blend_op(vk::BlendOp::ADD)
                    .src_alpha_blend_factor(vk::BlendFactor::ONE)
                    .dst_alpha_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
                    .alpha_blend_op(vk::BlendOp::ADD)
                    .color_write_mask(color_components_to_vk(target.write_mask))
            })
            .collect_vec();
        let color_blend = vk::PipelineColorBlendStateCreateInfo::default().attachments(&blend_attachments);

        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state = vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

        // dynamic rendering，不需要 render pass
        let color_formats = options.render_targets.iter().map(|target| format_to_vk(target.format)).collect_vec();
        let mut rendering = vk::PipelineRenderingCreateInfo::default().color_attachment_formats(&color_formats);
        if let Some(depth) = options.depth_stencil {
            rendering = rendering.depth_attachment_format(format_to_vk(depth.format));
            if depth.format == Format::D24UnormS8Uint {
                rendering = rendering.stencil_attachment_format(format_to_vk(depth.format));
            }
        }

        let pipeline_ci = vk::GraphicsPipelineCreateInfo::default()
            .stages(&stages)
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization)
            .multisample_state(&multisample)
            .depth_stencil_state(&depth_stencil)
            .color_blend_state(&color_blend)
            .dynamic_state(&dynamic_state)
            .layout(layout.pipeline_layout)
            .push_next(&mut rendering);
        let pipeline = unsafe { device.device.create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_ci], None) }
            .map_err(|(_, err)| err)
            .context("vkCreateGraphicsPipelines")?
            .into_iter()
            .next()
            .context("no graphics pipeline created")?;
        device.set_debug_name(pipeline, options.label.as_deref());

        Ok(self.graphics_pipelines.insert(VulkanGraphicsPipeline {
            device: device_handle,
            label: options.label.clone(),
            pipeline,
        }))
    }

    pub(super) fn try_create_compute_pipeline(
        &mut self,
        device_handle: DeviceHandle,
        options: &ComputePipelineOptions,
    ) -> anyhow::Result<ComputePipelineHandle> {
        let device = alive(&self.devices, device_handle)?;
        let layout = alive(&self.pipeline_layouts, options.layout)?;
        let shader_module = alive(&self.shader_modules, options.shader_stage.shader_module)?;

        let entry_point = CString::new(options.shader_stage.entry_point.as_str())?;
        let stage = vk::PipelineShaderStageCreateInfo::default()
            .stage(vk::ShaderStageFlags::COMPUTE)
            .module(shader_module.shader_module)
            .name(&entry_point);
        let pipeline_ci = vk::ComputePipelineCreateInfo::default().stage(stage).layout(layout.pipeline_layout);
        let pipeline = unsafe { device.device.create_compute_pipelines(vk::PipelineCache::null(), &[pipeline_ci], None) }
            .map_err(|(_, err)| err)
            .context("vkCreateComputePipelines")?
            .into_iter()
            .next()
            .context("no compute pipeline created")?;
        device.set_debug_name(pipeline, options.label.as_deref());

        Ok(self.compute_pipelines.insert(VulkanComputePipeline {
            device: device_handle,
            label: options.label.clone(),
            pipeline,
        }))
    }

    pub(super) fn try_create_raytracing_pipeline(
        &mut self,
        device_handle: DeviceHandle,
        options: &RaytracingPipelineOptions,
    ) -> anyhow::Result<RaytracingPipelineHandle> {
        let device = alive(&self.devices, device_handle)?;
        let loader = device.ray_tracing_pipeline_loader()?;
        let layout = alive(&self.pipeline_layouts, options.layout)?;
        anyhow::ensure!(!options.shader_groups.is_empty(), "raytracing pipeline {:?} has no shader groups", options.label);
        let stage_count = options.shader_stages.len();
        if let Some((index, group)) =
            options.shader_groups.iter().enumerate().find(|(_, group)| !group.is_valid(stage_count))
        {
            anyhow::bail!("shader group {} is malformed: {:?}", index, group);
        }

        let entry_points = options
            .shader_stages
            .iter()
            .map(|stage| CString::new(stage.entry_point.as_str()))
            .collect::<Result<Vec<_>, _>>()?;
        let stages = options
            .shader_stages
            .iter()
            .zip(&entry_points)
            .map(|(stage, entry_point)| -> anyhow::Result<_> {
                let module = alive(&self.shader_modules, stage.shader_module)?.shader_module;
                Ok(vk::PipelineShaderStageCreateInfo::default()
                    .stage(shader_stages_to_vk(stage.stage))
                    .module(module)
                    .name(entry_point))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        let groups = options
            .shader_groups
            .iter()
            .map(|group| {
                vk::RayTracingShaderGroupCreateInfoKHR::default()
                    .ty(shader_group_type_to_vk(group.group_type))
                    .general_shader(shader_index_to_vk(group.general_shader_index))
                    .closest_hit_shader(shader_index_to_vk(group.closest_hit_shader_index))
                    .any_hit_shader(shader_index_to_vk(group.any_hit_shader_index))
                    .intersection_shader(shader_index_to_vk(group.intersection_shader_index))
            })
            .collect_vec();

        let depth = recursion_depth(options.max_recursion_depth, device.limits.max_ray_recursion_depth);
        let pipeline_ci = vk::RayTracingPipelineCreateInfoKHR::default()
            .stages(&stages)
            .groups(&groups)
            .max_pipeline_ray_recursion_depth(depth)
            .layout(layout.pipeline_layout);
        let pipeline = unsafe {
            loader.create_ray_tracing_pipelines(
                vk::DeferredOperationKHR::null(),
                vk::PipelineCache::null(),
                &[pipeline_ci],
                None,
            )
        }
        .map_err(|(_, err)| err)
        .context("vkCreateRayTracingPipelinesKHR")?
        .into_iter()
        .next()
        .context("no raytracing pipeline created")?;
        device.set_debug_name(pipeline, options.label.as_deref());

        Ok(self.raytracing_pipelines.insert(VulkanRaytracingPipeline {
            device: device_handle,
            label: options.label.clone(),
            pipeline,
            group_count: groups.len() as u32,
        }))
    }

    /// 返回 `group_count` 个紧密排列的 handle，每个 `shader_group_handle_size` 字节
    pub(super) fn try_shader_group_handles(
        &self,
        pipeline: RaytracingPipelineHandle,
        first_group: u32,
        group_count: u32,
    ) -> anyhow::Result<Vec<u8>> {
        let record = alive(&self.raytracing_pipelines, pipeline)?;
        let device = alive(&self.devices, record.device)?;
        let end = first_group.checked_add(group_count).context("shader group range overflows")?;
        anyhow::ensure!(
            end <= record.group_count,
            "shader groups {}..{} out of range (pipeline has {})",
            first_group,
            end,
            record.group_count
        );
        if group_count == 0 {
            return Ok(vec![]);
        }

        let data_size = device.limits.shader_group_handle_size as usize * group_count as usize;
        let loader = device.ray_tracing_pipeline_loader()?;
        unsafe { loader.get_ray_tracing_shader_group_handles(record.pipeline, first_group, group_count, data_size) }
            .context("vkGetRayTracingShaderGroupHandlesKHR")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recursion_depth() {
        assert_eq!(recursion_depth(0, 31), 31);
        assert_eq!(recursion_depth(2, 31), 2);
        assert_eq!(recursion_depth(64, 31), 31);
    }
}
