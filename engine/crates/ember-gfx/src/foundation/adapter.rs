use crate::{
    foundation::Device,
    handle::{SurfaceHandle, kind},
    options::{AdapterFeatures, AdapterProperties, AdapterQueueType, DeviceOptions},
    owner::ResourceOwner,
};

/// 物理设备，由 [`Instance`](crate::foundation::Instance) 枚举并持有
#[derive(Debug, Default, PartialEq)]
pub struct Adapter {
    inner: ResourceOwner<kind::Adapter>,
}

gpu_resource!(Adapter => Adapter);

impl Adapter {
    pub(crate) fn new(inner: ResourceOwner<kind::Adapter>) -> Self {
        Self { inner }
    }

    pub fn properties(&self) -> AdapterProperties {
        self.inner.read(|rm, adapter| rm.adapter_properties(adapter)).flatten().unwrap_or_default()
    }

    pub fn features(&self) -> AdapterFeatures {
        self.inner.read(|rm, adapter| rm.adapter_features(adapter)).flatten().unwrap_or_default()
    }

    pub fn queue_types(&self) -> Vec<AdapterQueueType> {
        self.inner.read(|rm, adapter| rm.adapter_queue_types(adapter)).unwrap_or_default()
    }

    pub fn supports_presentation(&self, surface: SurfaceHandle, queue_type_index: u32) -> bool {
        self.inner
            .read(|rm, adapter| rm.adapter_supports_presentation(adapter, surface, queue_type_index))
            .unwrap_or(false)
    }

    pub fn create_device(&self, options: &DeviceOptions) -> Device {
        let _span = ember_crate_tools::profile_span!("Adapter::create_device");
        let device = self.inner.write(|rm, adapter| rm.create_device(adapter, options)).unwrap_or_default();
        Device::new(self.inner.adopt(device, device))
    }
}
