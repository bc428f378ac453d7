use std::{any::Any, ptr::NonNull};

use crate::{
    handle::*,
    options::*,
    types::{AcquireImageResult, FenceStatus, PipelineStageFlags, PresentResult},
};

pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// 存放在资源池槽位中的后端记录
///
/// 后端可以通过 [`AsAny`] 把它还原为自己的具体类型。
pub trait ApiResource: AsAny {
    /// 资源所属的设备；instance、adapter、surface 与 device 本身返回无效句柄
    fn device(&self) -> DeviceHandle;

    fn label(&self) -> Option<&str> {
        None
    }
}

/// 每个后端一个实现，为每种资源维护一个 [`Pool`](crate::pool::Pool)
///
/// # 约定
/// - `create_*` 在原生调用失败时记录错误日志并返回无效句柄，不会插入不完整的记录
/// - 所有接受句柄的方法在句柄失效时都是无操作，或者返回空结果
/// - 句柄只在发放它的管理器中有意义，跨管理器使用的结果是未定义的（不会检测）
pub trait ResourceManager {
    // instance
    fn create_instance(&mut self, options: &InstanceOptions) -> InstanceHandle;
    fn enumerate_adapters(&mut self, instance: InstanceHandle) -> Vec<AdapterHandle>;
    fn create_surface(&mut self, instance: InstanceHandle, options: &SurfaceOptions) -> SurfaceHandle;

    // adapter
    fn adapter_properties(&self, adapter: AdapterHandle) -> Option<AdapterProperties>;
    fn adapter_features(&self, adapter: AdapterHandle) -> Option<AdapterFeatures>;
    fn adapter_queue_types(&self, adapter: AdapterHandle) -> Vec<AdapterQueueType>;
    fn adapter_supports_presentation(&self, adapter: AdapterHandle, surface: SurfaceHandle, queue_type_index: u32)
    -> bool;
    fn create_device(&mut self, adapter: AdapterHandle, options: &DeviceOptions) -> DeviceHandle;

    // device
    fn device_queues(&self, device: DeviceHandle) -> Vec<QueueDescription>;
    fn wait_device_idle(&self, device: DeviceHandle);

    // queue
    fn submit(&mut self, queue: QueueHandle, options: &SubmitOptions);
    fn present(&mut self, queue: QueueHandle, options: &PresentOptions) -> PresentResult;
    fn wait_queue_idle(&self, queue: QueueHandle);

    // swapchain
    fn create_swapchain(&mut self, device: DeviceHandle, options: &SwapchainOptions) -> SwapchainHandle;
    /// swapchain 拥有的纹理，按 image index 排列
    fn swapchain_textures(&self, swapchain: SwapchainHandle) -> Vec<TextureHandle>;
    fn acquire_next_image(
        &mut self,
        swapchain: SwapchainHandle,
        semaphore: Option<GpuSemaphoreHandle>,
        fence: Option<FenceHandle>,
    ) -> AcquireImageResult;

    // texture
    fn create_texture(&mut self, device: DeviceHandle, options: &TextureOptions) -> TextureHandle;
    fn create_texture_view(
        &mut self,
        device: DeviceHandle,
        texture: TextureHandle,
        options: &TextureViewOptions,
    ) -> TextureViewHandle;

    // buffer
    /// `initial_data` 会在创建后通过映射写入 buffer 的开头
    fn create_buffer(
        &mut self,
        device: DeviceHandle,
        options: &BufferOptions,
        initial_data: Option<&[u8]>,
    ) -> BufferHandle;
    fn buffer_size(&self, buffer: BufferHandle) -> u64;
    fn map_buffer(&mut self, buffer: BufferHandle) -> Option<NonNull<u8>>;
    fn unmap_buffer(&mut self, buffer: BufferHandle);
    fn flush_buffer(&mut self, buffer: BufferHandle);
    fn invalidate_buffer(&mut self, buffer: BufferHandle);
    fn buffer_device_address(&self, buffer: BufferHandle) -> u64;

    // sampler
    fn create_sampler(&mut self, device: DeviceHandle, options: &SamplerOptions) -> SamplerHandle;
    fn create_ycbcr_conversion(
        &mut self,
        device: DeviceHandle,
        options: &YcbcrConversionOptions,
    ) -> YcbcrConversionHandle;

    // shader & pipeline
    fn create_shader_module(&mut self, device: DeviceHandle, code: &[u32]) -> ShaderModuleHandle;
    fn create_bind_group_layout(
        &mut self,
        device: DeviceHandle,
        options: &BindGroupLayoutOptions,
    ) -> BindGroupLayoutHandle;
    fn create_pipeline_layout(&mut self, device: DeviceHandle, options: &PipelineLayoutOptions)
    -> PipelineLayoutHandle;
    fn create_graphics_pipeline(
        &mut self,
        device: DeviceHandle,
        options: &GraphicsPipelineOptions,
    ) -> GraphicsPipelineHandle;
    fn create_compute_pipeline(
        &mut self,
        device: DeviceHandle,
        options: &ComputePipelineOptions,
    ) -> ComputePipelineHandle;

    fn create_raytracing_pipeline(
        &mut self,
        device: DeviceHandle,
        options: &RaytracingPipelineOptions,
    ) -> RaytracingPipelineHandle;
    /// 按组顺序拼接的 shader group handle 数据，用于构建 shader binding table
    fn raytracing_shader_group_handles(
        &self,
        pipeline: RaytracingPipelineHandle,
        first_group: u32,
        group_count: u32,
    ) -> Vec<u8>;

    // bind group
    fn create_bind_group_pool(&mut self, device: DeviceHandle, options: &BindGroupPoolOptions) -> BindGroupPoolHandle;
    /// 释放从该 pool 分配的所有 bind group，它们的句柄随之失效
    fn reset_bind_group_pool(&mut self, pool: BindGroupPoolHandle);
    fn bind_group_pool_allocated(&self, pool: BindGroupPoolHandle) -> u32;
    fn create_bind_group(&mut self, device: DeviceHandle, options: &BindGroupOptions) -> BindGroupHandle;
    fn update_bind_group(&mut self, bind_group: BindGroupHandle, entry: &BindGroupEntry);

    // command
    fn create_command_recorder(
        &mut self,
        device: DeviceHandle,
        options: &CommandRecorderOptions,
    ) -> CommandRecorderHandle;
    fn copy_buffer(&mut self, recorder: CommandRecorderHandle, copy: &BufferCopy);
    /// 结束录制，返回录制好的 command buffer；同一个 recorder 只能 finish 一次
    fn finish_command_recorder(&mut self, recorder: CommandRecorderHandle) -> CommandBufferHandle;

    // timestamp query
    /// 时间戳写入 `recorder` 正在录制的命令中，recorder 结束后仍然可以读取结果
    fn create_timestamp_query_recorder(
        &mut self,
        device: DeviceHandle,
        recorder: CommandRecorderHandle,
        options: &TimestampQueryRecorderOptions,
    ) -> TimestampQueryRecorderHandle;
    /// 返回写入的查询下标；写满之后覆盖最后一个
    fn write_timestamp(&mut self, timestamps: TimestampQueryRecorderHandle, stage: PipelineStageFlags) -> Option<u32>;
    fn reset_timestamps(&mut self, timestamps: TimestampQueryRecorderHandle);
    /// 已写入的时间戳，单位为 tick；尚未就绪的为 0
    fn timestamp_results(&self, timestamps: TimestampQueryRecorderHandle) -> Vec<u64>;
    /// 每个 tick 的纳秒数
    fn timestamp_period(&self, timestamps: TimestampQueryRecorderHandle) -> f32;

    // sync
    fn create_fence(&mut self, device: DeviceHandle, options: &FenceOptions) -> FenceHandle;
    fn fence_status(&self, fence: FenceHandle) -> FenceStatus;
    fn wait_for_fence(&self, fence: FenceHandle);
    fn reset_fence(&mut self, fence: FenceHandle);
    fn create_gpu_semaphore(&mut self, device: DeviceHandle, options: &GpuSemaphoreOptions) -> GpuSemaphoreHandle;

    // acceleration structure
    fn create_acceleration_structure(
        &mut self,
        device: DeviceHandle,
        options: &AccelerationStructureOptions,
    ) -> AccelerationStructureHandle;

    // 按类型标签分发的查找与删除
    /// 句柄失效时返回 `None`
    fn resource(&self, handle: ErasedHandle) -> Option<&dyn ApiResource>;
    /// 释放原生资源并回收槽位；句柄失效时什么都不做
    fn delete_resource(&mut self, handle: ErasedHandle);
    /// 所有存活资源的句柄
    fn live_resources(&self) -> Vec<ErasedHandle>;
}

impl dyn ResourceManager + '_ {
    #[inline]
    pub fn get<K: ResourceKind>(&self, handle: Handle<K>) -> Option<&dyn ApiResource> {
        self.resource(handle.erase())
    }

    #[inline]
    pub fn contains<K: ResourceKind>(&self, handle: Handle<K>) -> bool {
        self.resource(handle.erase()).is_some()
    }

    #[inline]
    pub fn delete<K: ResourceKind>(&mut self, handle: Handle<K>) {
        self.delete_resource(handle.erase())
    }
}
