//! Ember GFX 核心层
//!
//! 与后端无关的 GPU 资源模型：
//! - [`handle`]：带类型的代际句柄
//! - [`pool`]：代际资源池，O(1) 的创建、查找与删除，能识别失效句柄
//! - [`api`]：后端需要实现的 [`GraphicsApi`](api::GraphicsApi) 与 [`ResourceManager`](api::ResourceManager)
//! - 前端对象（[`foundation`]、[`resources`]、[`commands`] ...）：只能移动的 RAII 对象，
//!   销毁时通过资源管理器释放自己的资源
//!
//! 整个资源层是单线程的，前端对象通过 `Rc` 共享同一个后端。

#[macro_use]
mod owner;

pub mod api;
pub mod commands;
pub mod descriptors;
pub mod foundation;
pub mod handle;
pub mod options;
pub mod pipelines;
pub mod pool;
pub mod raytracing;
pub mod resources;
pub mod swapchain;
pub mod types;
pub mod utilities;

pub use raw_window_handle;
