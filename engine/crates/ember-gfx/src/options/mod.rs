//! 创建各类资源时使用的参数结构体
//!
//! 所有参数都只引用句柄，不包含任何后端类型。

mod binding;
mod command;
mod device;
mod instance;
mod pipeline;
mod resource;

pub use binding::*;
pub use command::*;
pub use device::*;
pub use instance::*;
pub use pipeline::*;
pub use resource::*;

/// 表示「从 offset 到末尾」的大小
pub const WHOLE_SIZE: u64 = u64::MAX;
