use std::{cell::RefCell, rc::Rc};

use ember_gfx::{
    api::{GraphicsApi, ResourceManager},
    types::Api,
};

use crate::VulkanResourceManager;

pub struct VulkanGraphicsApi {
    resource_manager: RefCell<VulkanResourceManager>,
}

impl VulkanGraphicsApi {
    /// 加载 Vulkan loader；系统中没有 Vulkan 运行时会返回错误
    pub fn new() -> anyhow::Result<Self> {
        let _span = ember_crate_tools::profile_span!("VulkanGraphicsApi::new");
        Ok(Self {
            resource_manager: RefCell::new(VulkanResourceManager::new()?),
        })
    }

    pub fn new_shared() -> anyhow::Result<Rc<dyn GraphicsApi>> {
        Ok(Rc::new(Self::new()?))
    }
}

impl GraphicsApi for VulkanGraphicsApi {
    fn api(&self) -> Api {
        Api::Vulkan
    }

    fn resource_manager(&self) -> &RefCell<dyn ResourceManager> {
        &self.resource_manager
    }
}
