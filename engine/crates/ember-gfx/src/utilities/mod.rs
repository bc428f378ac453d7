pub mod resource_deleter;

pub use resource_deleter::{FrameBin, ResourceDeleter};
