use std::rc::Rc;

use crate::{
    api::GraphicsApi,
    foundation::Adapter,
    handle::{DeviceHandle, kind},
    options::{InstanceOptions, SurfaceOptions},
    owner::ResourceOwner,
    swapchain::Surface,
    types::AdapterDeviceType,
};

/// 后端实例，拥有枚举出来的所有 [`Adapter`]
#[derive(Debug, Default)]
pub struct Instance {
    // adapters 先于 instance 释放
    adapters: Vec<Adapter>,
    inner: ResourceOwner<kind::Instance>,
}

gpu_resource!(Instance => Instance);

// new & init
impl Instance {
    pub(crate) fn new(api: Rc<dyn GraphicsApi>, options: &InstanceOptions) -> Self {
        let _span = ember_crate_tools::profile_span!("Instance::new");

        let handle = api.resource_manager().borrow_mut().create_instance(options);
        let inner = ResourceOwner::new(api, DeviceHandle::default(), handle);

        let adapter_handles = inner.write(|rm, instance| rm.enumerate_adapters(instance)).unwrap_or_default();
        let adapters = adapter_handles
            .into_iter()
            .map(|adapter| Adapter::new(inner.adopt(DeviceHandle::default(), adapter)))
            .collect();

        Self { adapters, inner }
    }
}

// getters
impl Instance {
    #[inline]
    pub fn adapters(&self) -> &[Adapter] {
        &self.adapters
    }

    /// 选择第一个指定类型的 adapter
    pub fn select_adapter(&self, device_type: AdapterDeviceType) -> Option<&Adapter> {
        self.adapters.iter().find(|adapter| adapter.properties().device_type == device_type)
    }
}

// tools
impl Instance {
    pub fn create_surface(&self, options: &SurfaceOptions) -> Surface {
        Surface::new(self.inner.spawn(DeviceHandle::default(), |rm, instance| rm.create_surface(instance, options)))
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}
