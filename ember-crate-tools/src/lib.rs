//! Ember 工具集
//!
//! 提供日志初始化与性能分析辅助宏，在各个 crate 之间共享。

pub mod init_log;
pub mod profile;

pub use init_log::init_log;

// profile_span! 宏在调用方展开，需要能访问到 tracy_client
#[doc(hidden)]
pub use tracy_client;
