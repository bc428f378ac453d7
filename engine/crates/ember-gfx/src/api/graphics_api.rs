use std::{cell::RefCell, rc::Rc};

use crate::{api::ResourceManager, foundation::Instance, options::InstanceOptions, types::Api};

/// 一个后端的入口，持有该后端唯一的资源管理器
///
/// 前端对象通过 `Rc<dyn GraphicsApi>` 回到资源管理器，因此管理器的生命周期
/// 不短于任何一个前端对象。整个资源层是单线程的，不做内部同步。
pub trait GraphicsApi {
    fn api(&self) -> Api;

    fn api_name(&self) -> &'static str {
        match self.api() {
            Api::Vulkan => "Vulkan",
            Api::Metal => "Metal",
            Api::DirectX12 => "DirectX 12",
            Api::Headless => "Headless",
        }
    }

    fn resource_manager(&self) -> &RefCell<dyn ResourceManager>;
}

/// 从 `Rc<dyn GraphicsApi>` 上创建 [`Instance`]
pub trait GraphicsApiExt {
    fn create_instance(&self, options: &InstanceOptions) -> Instance;
}

impl GraphicsApiExt for Rc<dyn GraphicsApi> {
    fn create_instance(&self, options: &InstanceOptions) -> Instance {
        Instance::new(self.clone(), options)
    }
}
