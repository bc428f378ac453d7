//! 前端与后端之间的接口
//!
//! 前端只认识 [`GraphicsApi`] 与 [`ResourceManager`] 两个 trait，
//! 新增后端只需要实现它们，不需要改动任何前端代码。

mod graphics_api;
mod resource_manager;

pub use graphics_api::*;
pub use resource_manager::*;
