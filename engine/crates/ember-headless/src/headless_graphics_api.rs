use std::{cell::RefCell, rc::Rc};

use ember_gfx::{
    api::{GraphicsApi, ResourceManager},
    types::Api,
};

use crate::HeadlessResourceManager;

#[derive(Default)]
pub struct HeadlessGraphicsApi {
    resource_manager: RefCell<HeadlessResourceManager>,
}

impl HeadlessGraphicsApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// 直接得到前端使用的 `Rc<dyn GraphicsApi>`
    pub fn new_shared() -> Rc<dyn GraphicsApi> {
        Rc::new(Self::new())
    }
}

impl GraphicsApi for HeadlessGraphicsApi {
    fn api(&self) -> Api {
        Api::Headless
    }

    fn resource_manager(&self) -> &RefCell<dyn ResourceManager> {
        &self.resource_manager
    }
}
