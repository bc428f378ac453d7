use ember_gfx::{
    api::ApiResource,
    handle::*,
    options::{
        AdapterFeatures, AdapterProperties, AdapterQueueType, BindGroupEntry, BufferCopy, QueueDescription,
        ResourceBindingLayout,
    },
    types::{BufferUsageFlags, MemoryUsage},
};

pub(crate) struct HeadlessInstance {
    pub application_name: String,
    /// 第一次枚举之后缓存下来
    pub adapters: Option<Vec<AdapterHandle>>,
}

pub(crate) struct HeadlessAdapter {
    pub instance: InstanceHandle,
    pub properties: AdapterProperties,
    pub features: AdapterFeatures,
    pub queue_types: Vec<AdapterQueueType>,
}

pub(crate) struct HeadlessSurface {
    pub instance: InstanceHandle,
}

pub(crate) struct HeadlessDevice {
    pub instance: InstanceHandle,
    pub label: Option<String>,
    pub features: AdapterFeatures,
    pub queues: Vec<QueueDescription>,
    /// 没有指定 pool 的 bind group 从这里分配
    pub default_bind_group_pool: BindGroupPoolHandle,
}

pub(crate) struct HeadlessQueue {
    pub device: DeviceHandle,
}

pub(crate) struct HeadlessSwapchain {
    pub device: DeviceHandle,
    pub label: Option<String>,
    pub textures: Vec<TextureHandle>,
    pub next_image: u32,
}

pub(crate) enum TextureSource {
    Owned,
    Swapchain(SwapchainHandle),
}

pub(crate) struct HeadlessTexture {
    pub device: DeviceHandle,
    pub label: Option<String>,
    pub source: TextureSource,
}

pub(crate) struct HeadlessTextureView {
    pub device: DeviceHandle,
    pub label: Option<String>,
}

pub(crate) struct HeadlessBuffer {
    pub device: DeviceHandle,
    pub label: Option<String>,
    pub usage: BufferUsageFlags,
    pub memory_usage: MemoryUsage,
    pub data: Vec<u8>,
    pub device_address: u64,
    pub map_count: u32,
}

pub(crate) struct HeadlessSampler {
    pub device: DeviceHandle,
    pub label: Option<String>,
}

pub(crate) struct HeadlessYcbcrConversion {
    pub device: DeviceHandle,
    pub label: Option<String>,
}

pub(crate) struct HeadlessShaderModule {
    pub device: DeviceHandle,
}

pub(crate) struct HeadlessBindGroupLayout {
    pub device: DeviceHandle,
    pub label: Option<String>,
    pub bindings: Vec<ResourceBindingLayout>,
}

pub(crate) struct HeadlessBindGroupPool {
    pub device: DeviceHandle,
    pub label: Option<String>,
    pub max_bind_group_count: u32,
    pub bind_groups: Vec<BindGroupHandle>,
}

pub(crate) struct HeadlessBindGroup {
    pub device: DeviceHandle,
    pub label: Option<String>,
    pub pool: BindGroupPoolHandle,
    /// 从 layout 复制，layout 删除后仍然可以更新
    pub bindings: Vec<ResourceBindingLayout>,
    pub entries: Vec<BindGroupEntry>,
}

pub(crate) struct HeadlessPipelineLayout {
    pub device: DeviceHandle,
    pub label: Option<String>,
}

pub(crate) struct HeadlessGraphicsPipeline {
    pub device: DeviceHandle,
    pub label: Option<String>,
}

pub(crate) struct HeadlessComputePipeline {
    pub device: DeviceHandle,
    pub label: Option<String>,
}

pub(crate) struct HeadlessRaytracingPipeline {
    pub device: DeviceHandle,
    pub label: Option<String>,
    pub group_count: u32,
}

pub(crate) struct HeadlessCommandRecorder {
    pub device: DeviceHandle,
    pub label: Option<String>,
    pub commands: Vec<BufferCopy>,
    pub finished: bool,
}

pub(crate) struct HeadlessCommandBuffer {
    pub device: DeviceHandle,
    pub commands: Vec<BufferCopy>,
}

pub(crate) struct HeadlessTimestampQueryRecorder {
    pub device: DeviceHandle,
    pub label: Option<String>,
    pub recorder: CommandRecorderHandle,
    pub query_count: u32,
    /// 每次写入时的模拟时钟
    pub ticks: Vec<u64>,
}

pub(crate) struct HeadlessFence {
    pub device: DeviceHandle,
    pub label: Option<String>,
    pub signalled: bool,
}

pub(crate) struct HeadlessGpuSemaphore {
    pub device: DeviceHandle,
    pub label: Option<String>,
    pub signalled: bool,
}

pub(crate) struct HeadlessAccelerationStructure {
    pub device: DeviceHandle,
    pub label: Option<String>,
}

macro_rules! device_child {
    ($($record:ident),* $(,)?) => {
        $(
            impl ApiResource for $record {
                fn device(&self) -> DeviceHandle {
                    self.device
                }
            }
        )*
    };
    (@labeled $($record:ident),* $(,)?) => {
        $(
            impl ApiResource for $record {
                fn device(&self) -> DeviceHandle {
                    self.device
                }

                fn label(&self) -> Option<&str> {
                    self.label.as_deref()
                }
            }
        )*
    };
}

device_child!(HeadlessQueue, HeadlessShaderModule, HeadlessCommandBuffer);
device_child!(@labeled
    HeadlessSwapchain,
    HeadlessTexture,
    HeadlessTextureView,
    HeadlessBuffer,
    HeadlessSampler,
    HeadlessYcbcrConversion,
    HeadlessBindGroupLayout,
    HeadlessBindGroupPool,
    HeadlessBindGroup,
    HeadlessPipelineLayout,
    HeadlessGraphicsPipeline,
    HeadlessComputePipeline,
    HeadlessRaytracingPipeline,
    HeadlessCommandRecorder,
    HeadlessTimestampQueryRecorder,
    HeadlessFence,
    HeadlessGpuSemaphore,
    HeadlessAccelerationStructure,
);

impl ApiResource for HeadlessInstance {
    fn device(&self) -> DeviceHandle {
        DeviceHandle::default()
    }

    fn label(&self) -> Option<&str> {
        Some(&self.application_name)
    }
}

impl ApiResource for HeadlessAdapter {
    fn device(&self) -> DeviceHandle {
        DeviceHandle::default()
    }

    fn label(&self) -> Option<&str> {
        Some(&self.properties.device_name)
    }
}

impl ApiResource for HeadlessSurface {
    fn device(&self) -> DeviceHandle {
        DeviceHandle::default()
    }
}

impl ApiResource for HeadlessDevice {
    fn device(&self) -> DeviceHandle {
        DeviceHandle::default()
    }

    fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}
