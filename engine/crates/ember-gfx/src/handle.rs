//! 代际句柄（generational handle）
//!
//! 句柄由 `index` + `generation` 组成，只有在发放它的 [`Pool`](crate::pool::Pool) 中、
//! 且 generation 与槽位当前的 generation 一致时才能解引用。
//! generation 为 0 表示无效句柄，任何存活的槽位都不会拥有 generation 0。

use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    marker::PhantomData,
};

/// 资源种类的类型标签
///
/// 每个资源种类都是一个不可实例化的枚举，只在类型层面用来区分句柄。
pub trait ResourceKind: 'static {
    const TYPE: ResourceType;
}

/// 带类型的代际句柄，不持有资源，只是一个可以随意复制的标识
pub struct Handle<K> {
    index: u32,
    generation: u32,
    _marker: PhantomData<fn() -> K>,
}

// new & init
impl<K> Handle<K> {
    #[inline]
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self {
            index,
            generation,
            _marker: PhantomData,
        }
    }
}

// getters
impl<K> Handle<K> {
    #[inline]
    pub const fn index(&self) -> u32 {
        self.index
    }

    #[inline]
    pub const fn generation(&self) -> u32 {
        self.generation
    }

    /// generation 非 0 即有效；有效不代表仍然存活，存活与否只有资源池能回答
    #[inline]
    pub const fn is_valid(&self) -> bool {
        self.generation != 0
    }
}

impl<K: ResourceKind> Handle<K> {
    /// 擦除类型信息，用于不关心具体资源种类的簿记（删除、泄漏报告、延迟释放）
    #[inline]
    pub fn erase(self) -> ErasedHandle {
        ErasedHandle {
            ty: K::TYPE,
            index: self.index,
            generation: self.generation,
        }
    }
}

impl<K> Default for Handle<K> {
    #[inline]
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl<K> Clone for Handle<K> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for Handle<K> {}

impl<K> PartialEq for Handle<K> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<K> Eq for Handle<K> {}

impl<K> Hash for Handle<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

/// 先按 index 排序，index 相同时再比较 generation，保证与 `Eq` 一致
impl<K> Ord for Handle<K> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.index.cmp(&other.index).then(self.generation.cmp(&other.generation))
    }
}

impl<K> PartialOrd for Handle<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K: ResourceKind> fmt::Debug for Handle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}Handle({}v{})", K::TYPE, self.index, self.generation)
    }
}

impl<K: ResourceKind> From<Handle<K>> for ErasedHandle {
    #[inline]
    fn from(handle: Handle<K>) -> Self {
        handle.erase()
    }
}

/// 擦除了资源种类的句柄，携带 [`ResourceType`] 标签
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ErasedHandle {
    ty: ResourceType,
    index: u32,
    generation: u32,
}

impl ErasedHandle {
    #[inline]
    pub fn resource_type(&self) -> ResourceType {
        self.ty
    }

    #[inline]
    pub fn index(&self) -> u32 {
        self.index
    }

    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.generation != 0
    }

    /// 恢复类型信息，标签不匹配时返回 `None`
    pub fn downcast<K: ResourceKind>(self) -> Option<Handle<K>> {
        (self.ty == K::TYPE).then(|| Handle::new(self.index, self.generation))
    }
}

impl fmt::Debug for ErasedHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}Handle({}v{})", self.ty, self.index, self.generation)
    }
}

impl fmt::Display for ErasedHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}v{}", self.ty, self.index, self.generation)
    }
}

macro_rules! resource_kinds {
    ($($kind:ident => $alias:ident,)*) => {
        /// 资源种类的运行时标签，每个种类对应资源管理器中的一个资源池
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum ResourceType {
            $($kind,)*
        }

        impl ResourceType {
            pub const fn name(self) -> &'static str {
                match self {
                    $(ResourceType::$kind => stringify!($kind),)*
                }
            }
        }

        /// 各个资源种类的类型标签
        pub mod kind {
            $(
                pub enum $kind {}

                impl super::ResourceKind for $kind {
                    const TYPE: super::ResourceType = super::ResourceType::$kind;
                }
            )*
        }

        $(
            pub type $alias = Handle<kind::$kind>;
        )*
    };
}

resource_kinds! {
    Instance => InstanceHandle,
    Adapter => AdapterHandle,
    Device => DeviceHandle,
    Queue => QueueHandle,
    Surface => SurfaceHandle,
    Swapchain => SwapchainHandle,
    Texture => TextureHandle,
    TextureView => TextureViewHandle,
    Buffer => BufferHandle,
    Sampler => SamplerHandle,
    ShaderModule => ShaderModuleHandle,
    BindGroupLayout => BindGroupLayoutHandle,
    BindGroupPool => BindGroupPoolHandle,
    BindGroup => BindGroupHandle,
    PipelineLayout => PipelineLayoutHandle,
    GraphicsPipeline => GraphicsPipelineHandle,
    ComputePipeline => ComputePipelineHandle,
    RaytracingPipeline => RaytracingPipelineHandle,
    CommandRecorder => CommandRecorderHandle,
    CommandBuffer => CommandBufferHandle,
    Fence => FenceHandle,
    GpuSemaphore => GpuSemaphoreHandle,
    TimestampQueryRecorder => TimestampQueryRecorderHandle,
    YcbcrConversion => YcbcrConversionHandle,
    AccelerationStructure => AccelerationStructureHandle,
}

impl ResourceType {
    /// 资源管理器为这种资源预留的初始槽位数，按常见的使用量估计
    pub const fn default_pool_capacity(self) -> usize {
        use ResourceType::*;
        match self {
            Instance | Adapter | Device | Surface | Swapchain => 1,
            Queue | TimestampQueryRecorder => 4,
            Sampler | YcbcrConversion | Fence | BindGroupPool | RaytracingPipeline | AccelerationStructure => 16,
            CommandRecorder | GpuSemaphore => 32,
            ShaderModule | PipelineLayout | GraphicsPipeline | ComputePipeline => 64,
            Texture | TextureView | Buffer | BindGroupLayout | BindGroup | CommandBuffer => 128,
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_default_is_invalid() {
        let handle = BufferHandle::default();
        assert!(!handle.is_valid());
        assert_eq!(handle.index(), 0);
        assert_eq!(handle.generation(), 0);
    }

    #[test]
    fn test_equality_uses_both_fields() {
        let a = BufferHandle::new(3, 1);
        assert_eq!(a, BufferHandle::new(3, 1));
        assert_ne!(a, BufferHandle::new(3, 2));
        assert_ne!(a, BufferHandle::new(4, 1));
    }

    #[test]
    fn test_ordering_by_index_first() {
        let mut handles = vec![
            TextureHandle::new(2, 1),
            TextureHandle::new(0, 7),
            TextureHandle::new(2, 0),
            TextureHandle::new(1, 3),
        ];
        handles.sort();
        let order: Vec<_> = handles.iter().map(|h| (h.index(), h.generation())).collect();
        assert_eq!(order, vec![(0, 7), (1, 3), (2, 0), (2, 1)]);
    }

    #[test]
    fn test_hash_distinguishes_generation() {
        let set: HashSet<_> = [FenceHandle::new(1, 1), FenceHandle::new(1, 2), FenceHandle::new(1, 1)]
            .into_iter()
            .collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_erase_and_downcast() {
        let handle = SamplerHandle::new(5, 9);
        let erased = handle.erase();
        assert_eq!(erased.resource_type(), ResourceType::Sampler);
        assert_eq!(erased.downcast::<kind::Sampler>(), Some(handle));
        assert_eq!(erased.downcast::<kind::Buffer>(), None);
        assert_eq!(erased.to_string(), "Sampler#5v9");
    }

    #[test]
    fn test_default_pool_capacity() {
        assert_eq!(ResourceType::Instance.default_pool_capacity(), 1);
        assert_eq!(ResourceType::Queue.default_pool_capacity(), 4);
        assert_eq!(ResourceType::Texture.default_pool_capacity(), 128);
        assert_eq!(ResourceType::TimestampQueryRecorder.default_pool_capacity(), 4);
    }
}
