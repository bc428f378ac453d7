use std::{fmt, rc::Rc};

use crate::{
    api::{GraphicsApi, ResourceManager},
    handle::{DeviceHandle, Handle, ResourceKind},
};

/// 前端对象共用的所有权三元组：`{api, device, handle}`
///
/// 只能移动不能复制。`Drop` 时如果句柄有效，就通过资源管理器删除它。
pub(crate) struct ResourceOwner<K: ResourceKind> {
    api: Option<Rc<dyn GraphicsApi>>,
    device: DeviceHandle,
    handle: Handle<K>,
}

// new & init
impl<K: ResourceKind> ResourceOwner<K> {
    #[inline]
    pub(crate) fn new(api: Rc<dyn GraphicsApi>, device: DeviceHandle, handle: Handle<K>) -> Self {
        Self {
            api: Some(api),
            device,
            handle,
        }
    }

    /// 在同一个 api 下接管一个已经存在的句柄
    pub(crate) fn adopt<C: ResourceKind>(&self, device: DeviceHandle, handle: Handle<C>) -> ResourceOwner<C> {
        match &self.api {
            Some(api) => ResourceOwner::new(api.clone(), device, handle),
            None => ResourceOwner::default(),
        }
    }

    /// 通过资源管理器创建一个子资源，并让新对象拥有它
    pub(crate) fn spawn<C: ResourceKind>(
        &self,
        device: DeviceHandle,
        create: impl FnOnce(&mut dyn ResourceManager, Handle<K>) -> Handle<C>,
    ) -> ResourceOwner<C> {
        match self.write(create) {
            Some(handle) => self.adopt(device, handle),
            None => ResourceOwner::default(),
        }
    }
}

// getters
impl<K: ResourceKind> ResourceOwner<K> {
    #[inline]
    pub(crate) fn handle(&self) -> Handle<K> {
        self.handle
    }

    #[inline]
    pub(crate) fn device(&self) -> DeviceHandle {
        self.device
    }

    #[inline]
    pub(crate) fn is_valid(&self) -> bool {
        self.handle.is_valid()
    }
}

// tools
impl<K: ResourceKind> ResourceOwner<K> {
    /// 只读访问资源管理器；对象无效时返回 `None`
    pub(crate) fn read<R>(&self, f: impl FnOnce(&dyn ResourceManager, Handle<K>) -> R) -> Option<R> {
        let api = self.api.as_ref()?;
        if !self.handle.is_valid() {
            return None;
        }
        let rm = api.resource_manager().borrow();
        Some(f(&*rm, self.handle))
    }

    /// 可变访问资源管理器；对象无效时返回 `None`
    pub(crate) fn write<R>(&self, f: impl FnOnce(&mut dyn ResourceManager, Handle<K>) -> R) -> Option<R> {
        let api = self.api.as_ref()?;
        if !self.handle.is_valid() {
            return None;
        }
        let mut rm = api.resource_manager().borrow_mut();
        Some(f(&mut *rm, self.handle))
    }
}

// destroy
impl<K: ResourceKind> Drop for ResourceOwner<K> {
    fn drop(&mut self) {
        if !self.handle.is_valid() {
            return;
        }
        let Some(api) = self.api.take() else {
            return;
        };
        match api.resource_manager().try_borrow_mut() {
            Ok(mut rm) => rm.delete(self.handle),
            Err(_) => log::error!("resource manager is busy, {} is leaked", self.handle.erase()),
        }
    }
}

impl<K: ResourceKind> Default for ResourceOwner<K> {
    fn default() -> Self {
        Self {
            api: None,
            device: DeviceHandle::default(),
            handle: Handle::default(),
        }
    }
}

impl<K: ResourceKind> PartialEq for ResourceOwner<K> {
    fn eq(&self, other: &Self) -> bool {
        same_rc(&self.api, &other.api) && self.device == other.device && self.handle == other.handle
    }
}

/// 只比较数据指针，忽略 vtable 指针
fn same_rc<T: ?Sized>(a: &Option<Rc<T>>, b: &Option<Rc<T>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b)),
        (None, None) => true,
        _ => false,
    }
}

impl<K: ResourceKind> fmt::Debug for ResourceOwner<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceOwner")
            .field("api", &self.api.as_ref().map(|api| api.api()))
            .field("device", &self.device)
            .field("handle", &self.handle)
            .finish()
    }
}

/// 为前端对象生成 `handle()`、`is_valid()` 与 `From<&T> for Handle<K>`
macro_rules! gpu_resource {
    ($wrapper:ident => $kind:ident) => {
        gpu_resource!(@handle $wrapper => $kind);

        impl $wrapper {
            #[inline]
            pub fn is_valid(&self) -> bool {
                self.inner.is_valid()
            }
        }
    };

    (@handle $wrapper:ident => $kind:ident) => {
        impl $wrapper {
            /// 非拥有的句柄，对象销毁后即失效
            #[inline]
            pub fn handle(&self) -> $crate::handle::Handle<$crate::handle::kind::$kind> {
                self.inner.handle()
            }
        }

        impl From<&$wrapper> for $crate::handle::Handle<$crate::handle::kind::$kind> {
            #[inline]
            fn from(value: &$wrapper) -> Self {
                value.inner.handle()
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_rc() {
        let a: Rc<dyn fmt::Debug> = Rc::new(1_u32);
        let b: Rc<dyn fmt::Debug> = Rc::new(1_u32);
        assert!(same_rc(&Some(a.clone()), &Some(a.clone())));
        assert!(!same_rc(&Some(a.clone()), &Some(b)));
        assert!(!same_rc(&Some(a), &None));
        assert!(same_rc::<dyn fmt::Debug>(&None, &None));
    }
}
