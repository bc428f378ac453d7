pub mod bind_group;
pub mod bind_group_layout;
pub mod bind_group_pool;

pub use bind_group::BindGroup;
pub use bind_group_layout::BindGroupLayout;
pub use bind_group_pool::BindGroupPool;
