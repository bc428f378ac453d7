/// 在当前作用域内开启一个 tracy span
///
/// 没有运行中的 tracy client 时什么都不做，因此单元测试和无 GPU 的运行环境里也可以放心使用。
///
/// ```ignore
/// let _span = ember_crate_tools::profile_span!("ResourceManager::create_buffer");
/// ```
#[macro_export]
macro_rules! profile_span {
    ($name:expr) => {
        $crate::tracy_client::Client::running()
            .map(|client| client.span($crate::tracy_client::span_location!($name), 0))
    };
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_span_without_client() {
        let span = crate::profile_span!("tests::span");
        assert!(span.is_none());
    }
}
