use anyhow::Context;
use ash::vk;
use ember_gfx::{handle::*, options::*, types::*};
use vk_mem::Alloc;

use super::{VulkanResourceManager, alive, alive_mut};
use crate::{records::*, vulkan_enums::*};

// command
impl VulkanResourceManager {
    pub(super) fn try_create_command_recorder(
        &mut self,
        device_handle: DeviceHandle,
        options: &CommandRecorderOptions,
    ) -> anyhow::Result<CommandRecorderHandle> {
        let queue_handle = match options.queue {
            Some(queue) => queue,
            None => alive(&self.devices, device_handle)?.queues.first().map(|q| q.queue).context("device has no queue")?,
        };
        let queue = alive(&self.queues, queue_handle)?;
        anyhow::ensure!(queue.device == device_handle, "{:?} belongs to another device", queue_handle);
        let queue_family_index = queue.queue_family_index;

        let device = alive_mut(&mut self.devices, device_handle)?;
        let command_pool = device.command_pool(queue_family_index)?;

        let allocate_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(command_pool)
            .level(command_buffer_level_to_vk(options.level))
            .command_buffer_count(1);
        let command_buffer = unsafe { device.device.allocate_command_buffers(&allocate_info) }
            .context("vkAllocateCommandBuffers")?
            .into_iter()
            .next()
            .context("no command buffer allocated")?;

        let inheritance_info = vk::CommandBufferInheritanceInfo::default();
        let mut begin_info = vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        if options.level == CommandBufferLevel::Secondary {
            begin_info = begin_info.inheritance_info(&inheritance_info);
        }
        if let Err(err) = unsafe { device.device.begin_command_buffer(command_buffer, &begin_info) } {
            unsafe { device.device.free_command_buffers(command_pool, &[command_buffer]) };
            return Err(err).context("vkBeginCommandBuffer");
        }
        device.set_debug_name(
            command_buffer,
            options.label.as_ref().map(|label| format!("CommandBuffer::{}", label)).as_deref(),
        );

        Ok(self.command_recorders.insert(VulkanCommandRecorder {
            device: device_handle,
            label: options.label.clone(),
            command_pool,
            command_buffer,
            finished: false,
        }))
    }

    pub(super) fn try_copy_buffer(&mut self, recorder: CommandRecorderHandle, copy: &BufferCopy) -> anyhow::Result<()> {
        let src = alive(&self.buffers, copy.src)?;
        let dst = alive(&self.buffers, copy.dst)?;
        anyhow::ensure!(src.usage.contains(BufferUsageFlags::TRANSFER_SRC), "source lacks TRANSFER_SRC usage");
        anyhow::ensure!(dst.usage.contains(BufferUsageFlags::TRANSFER_DST), "destination lacks TRANSFER_DST usage");
        let in_range = |offset: u64, size: u64| offset.checked_add(copy.byte_size).is_some_and(|end| end <= size);
        anyhow::ensure!(in_range(copy.src_offset, src.size), "source range out of bounds");
        anyhow::ensure!(in_range(copy.dst_offset, dst.size), "destination range out of bounds");

        let Some(record) = self.command_recorders.get(recorder) else {
            return Ok(());
        };
        anyhow::ensure!(!record.finished, "{:?} already finished", recorder);
        let device = alive(&self.devices, record.device)?;

        let region = vk::BufferCopy {
            src_offset: copy.src_offset,
            dst_offset: copy.dst_offset,
            size: copy.byte_size,
        };
        unsafe { device.device.cmd_copy_buffer(record.command_buffer, src.buffer, dst.buffer, &[region]) };
        Ok(())
    }

    /// 句柄失效时返回无效句柄，不记录错误
    pub(super) fn try_finish_command_recorder(
        &mut self,
        recorder: CommandRecorderHandle,
    ) -> anyhow::Result<CommandBufferHandle> {
        let Some(record) = self.command_recorders.get_mut(recorder) else {
            return Ok(CommandBufferHandle::default());
        };
        anyhow::ensure!(!record.finished, "{:?} already finished", recorder);
        let device = alive(&self.devices, record.device)?;

        unsafe { device.device.end_command_buffer(record.command_buffer) }.context("vkEndCommandBuffer")?;
        record.finished = true;

        Ok(self.command_buffers.insert(VulkanCommandBuffer {
            device: record.device,
            label: record.label.clone(),
            command_pool: record.command_pool,
            command_buffer: record.command_buffer,
        }))
    }
}

// timestamp query
impl VulkanResourceManager {
    pub(super) fn try_create_timestamp_query_recorder(
        &mut self,
        device_handle: DeviceHandle,
        recorder: CommandRecorderHandle,
        options: &TimestampQueryRecorderOptions,
    ) -> anyhow::Result<TimestampQueryRecorderHandle> {
        let device = alive(&self.devices, device_handle)?;
        let recorder_record = alive(&self.command_recorders, recorder)?;
        anyhow::ensure!(recorder_record.device == device_handle, "{:?} belongs to another device", recorder);
        anyhow::ensure!(!recorder_record.finished, "{:?} already finished", recorder);
        anyhow::ensure!(options.query_count > 0, "timestamp query recorder needs at least one query");

        let pool_ci = vk::QueryPoolCreateInfo::default().query_type(vk::QueryType::TIMESTAMP).query_count(options.query_count);
        let query_pool = unsafe { device.device.create_query_pool(&pool_ci, None) }.context("vkCreateQueryPool")?;
        device.set_debug_name(query_pool, options.label.as_deref());
        unsafe { device.device.cmd_reset_query_pool(recorder_record.command_buffer, query_pool, 0, options.query_count) };

        Ok(self.timestamp_query_recorders.insert(VulkanTimestampQueryRecorder {
            device: device_handle,
            label: options.label.clone(),
            recorder,
            query_pool,
            query_count: options.query_count,
            written: 0,
        }))
    }

    /// recorder 已经 finish 时返回 `None`
    pub(super) fn try_write_timestamp(
        &mut self,
        timestamps: TimestampQueryRecorderHandle,
        stage: PipelineStageFlags,
    ) -> anyhow::Result<Option<u32>> {
        let Some(record) = self.timestamp_query_recorders.get_mut(timestamps) else {
            return Ok(None);
        };
        let recorder = alive(&self.command_recorders, record.recorder)?;
        if recorder.finished {
            log::error!("cannot write timestamp: {:?} is no longer recording", record.recorder);
            return Ok(None);
        }
        let device = alive(&self.devices, record.device)?;

        let index = if record.written == record.query_count {
            log::warn!("{:?} query count exceeded, overwriting last query", timestamps);
            let last = record.query_count - 1;
            // 同一个 query 再次写入之前必须先 reset
            unsafe { device.device.cmd_reset_query_pool(recorder.command_buffer, record.query_pool, last, 1) };
            last
        } else {
            record.written += 1;
            record.written - 1
        };
        unsafe {
            device.device.cmd_write_timestamp(
                recorder.command_buffer,
                pipeline_stage_to_vk(stage),
                record.query_pool,
                index,
            )
        };
        Ok(Some(index))
    }

    pub(super) fn try_reset_timestamps(&mut self, timestamps: TimestampQueryRecorderHandle) -> anyhow::Result<()> {
        let Some(record) = self.timestamp_query_recorders.get_mut(timestamps) else {
            return Ok(());
        };
        let recorder = alive(&self.command_recorders, record.recorder)?;
        anyhow::ensure!(!recorder.finished, "{:?} already finished", record.recorder);
        let device = alive(&self.devices, record.device)?;

        unsafe { device.device.cmd_reset_query_pool(recorder.command_buffer, record.query_pool, 0, record.query_count) };
        record.written = 0;
        Ok(())
    }

    /// 尚未完成的 query 读作 0
    pub(super) fn try_timestamp_results(&self, timestamps: TimestampQueryRecorderHandle) -> anyhow::Result<Vec<u64>> {
        let Some(record) = self.timestamp_query_recorders.get(timestamps) else {
            return Ok(vec![]);
        };
        if record.written == 0 {
            return Ok(vec![]);
        }
        let device = alive(&self.devices, record.device)?;

        // 每个 query 后面跟一个 availability 值
        let mut data = vec![[0u64; 2]; record.written as usize];
        let flags = vk::QueryResultFlags::TYPE_64 | vk::QueryResultFlags::WITH_AVAILABILITY;
        match unsafe { device.device.get_query_pool_results(record.query_pool, 0, &mut data, flags) } {
            Ok(()) | Err(vk::Result::NOT_READY) => {}
            Err(err) => return Err(err).context("vkGetQueryPoolResults"),
        }
        Ok(data.into_iter().map(|[value, available]| if available != 0 { value } else { 0 }).collect())
    }
}

// sync
impl VulkanResourceManager {
    pub(super) fn try_create_fence(
        &mut self,
        device_handle: DeviceHandle,
        options: &FenceOptions,
    ) -> anyhow::Result<FenceHandle> {
        let device = alive(&self.devices, device_handle)?;
        let flags = if options.create_signalled { vk::FenceCreateFlags::SIGNALED } else { vk::FenceCreateFlags::empty() };
        let fence = unsafe { device.device.create_fence(&vk::FenceCreateInfo::default().flags(flags), None) }
            .context("vkCreateFence")?;
        device.set_debug_name(fence, options.label.as_ref().map(|label| format!("Fence::{}", label)).as_deref());

        Ok(self.fences.insert(VulkanFence {
            device: device_handle,
            label: options.label.clone(),
            fence,
        }))
    }

    pub(super) fn query_fence_status(&self, fence: FenceHandle) -> FenceStatus {
        let Some(record) = self.fences.get(fence) else {
            return FenceStatus::Error;
        };
        let Some(device) = self.devices.get(record.device) else {
            return FenceStatus::Error;
        };
        match unsafe { device.device.get_fence_status(record.fence) } {
            Ok(true) => FenceStatus::Signalled,
            Ok(false) => FenceStatus::Unsignalled,
            Err(err) => {
                log::error!("vkGetFenceStatus failed on {:?}: {:?}", fence, err);
                FenceStatus::Error
            }
        }
    }

    pub(super) fn wait_fence(&self, fence: FenceHandle) {
        let Some(record) = self.fences.get(fence) else {
            return;
        };
        let Some(device) = self.devices.get(record.device) else {
            return;
        };
        if let Err(err) = unsafe { device.device.wait_for_fences(&[record.fence], true, u64::MAX) } {
            log::error!("vkWaitForFences failed on {:?}: {:?}", fence, err);
        }
    }

    pub(super) fn reset(&mut self, fence: FenceHandle) {
        let Some(record) = self.fences.get(fence) else {
            return;
        };
        let Some(device) = self.devices.get(record.device) else {
            return;
        };
        if let Err(err) = unsafe { device.device.reset_fences(&[record.fence]) } {
            log::error!("vkResetFences failed on {:?}: {:?}", fence, err);
        }
    }

    pub(super) fn try_create_gpu_semaphore(
        &mut self,
        device_handle: DeviceHandle,
        options: &GpuSemaphoreOptions,
    ) -> anyhow::Result<GpuSemaphoreHandle> {
        let device = alive(&self.devices, device_handle)?;
        let semaphore = unsafe { device.device.create_semaphore(&vk::SemaphoreCreateInfo::default(), None) }
            .context("vkCreateSemaphore")?;
        device.set_debug_name(semaphore, options.label.as_ref().map(|label| format!("Semaphore::{}", label)).as_deref());

        Ok(self.gpu_semaphores.insert(VulkanGpuSemaphore {
            device: device_handle,
            label: options.label.clone(),
            semaphore,
        }))
    }
}

// acceleration structure
impl VulkanResourceManager {
    pub(super) fn try_create_acceleration_structure(
        &mut self,
        device_handle: DeviceHandle,
        options: &AccelerationStructureOptions,
    ) -> anyhow::Result<AccelerationStructureHandle> {
        let device = alive(&self.devices, device_handle)?;
        let loader = device
            .acceleration_structure
            .as_ref()
            .with_context(|| format!("acceleration_structures is not enabled on {:?}", device_handle))?;
        anyhow::ensure!(options.size > 0, "acceleration structure {:?} has size 0", options.label);

        // 加速结构本身不占内存，存储在一块专用的 buffer 中
        let buffer_ci = vk::BufferCreateInfo::default()
            .size(options.size)
            .usage(
                vk::BufferUsageFlags::ACCELERATION_STRUCTURE_STORAGE_KHR | vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS,
            )
            .sharing_mode(vk::SharingMode::EXCLUSIVE);
        let (buffer, mut allocation) =
            unsafe { device.allocator.create_buffer(&buffer_ci, &allocation_info(MemoryUsage::GpuOnly)) }
                .context("Failed to allocate acceleration structure storage")?;

        let as_ci = vk::AccelerationStructureCreateInfoKHR::default()
            .ty(acceleration_structure_type_to_vk(options.ty))
            .buffer(buffer)
            .size(options.size);
        let acceleration_structure = match unsafe { loader.create_acceleration_structure(&as_ci, None) } {
            Ok(acceleration_structure) => acceleration_structure,
            Err(err) => {
                unsafe { device.allocator.destroy_buffer(buffer, &mut allocation) };
                return Err(err).context("vkCreateAccelerationStructureKHR");
            }
        };
        device.set_debug_name(acceleration_structure, options.label.as_deref());

        Ok(self.acceleration_structures.insert(VulkanAccelerationStructure {
            device: device_handle,
            label: options.label.clone(),
            acceleration_structure,
            buffer,
            allocation,
        }))
    }
}
