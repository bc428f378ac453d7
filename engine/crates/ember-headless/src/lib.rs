//! Ember 的 headless 后端
//!
//! 所有资源都只存在于内存里：buffer 是一段 `Vec<u8>`，提交的拷贝命令立即执行，
//! fence 和 semaphore 在提交时立即被 signal。它实现了与 Vulkan 后端相同的
//! [`ResourceManager`](ember_gfx::api::ResourceManager) 约定，前端代码可以原封不动地运行在它上面。

mod records;

pub mod headless_graphics_api;
pub mod resource_manager;

pub use headless_graphics_api::HeadlessGraphicsApi;
pub use resource_manager::HeadlessResourceManager;
