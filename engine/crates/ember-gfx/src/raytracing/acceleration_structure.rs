use crate::{handle::kind, owner::ResourceOwner};

/// 光追加速结构，只在设备开启了加速结构特性时可以创建
#[derive(Debug, Default, PartialEq)]
pub struct AccelerationStructure {
    inner: ResourceOwner<kind::AccelerationStructure>,
}

gpu_resource!(AccelerationStructure => AccelerationStructure);

impl AccelerationStructure {
    pub(crate) fn new(inner: ResourceOwner<kind::AccelerationStructure>) -> Self {
        Self { inner }
    }
}
