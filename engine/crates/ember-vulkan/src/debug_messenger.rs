use std::ffi::CStr;

use ash::vk;

/// validation layer 的消息输出到 `log`
pub struct VulkanDebugMessenger {
    loader: ash::ext::debug_utils::Instance,
    messenger: vk::DebugUtilsMessengerEXT,
}

// new & init
impl VulkanDebugMessenger {
    pub fn new(entry: &ash::Entry, instance: &ash::Instance) -> anyhow::Result<Self> {
        let loader = ash::ext::debug_utils::Instance::new(entry, instance);
        let create_info = Self::messenger_ci();
        let messenger = unsafe { loader.create_debug_utils_messenger(&create_info, None)? };

        Ok(Self { loader, messenger })
    }

    /// 创建 instance 时也挂上同样的回调，覆盖 instance 创建与销毁期间的消息
    pub fn messenger_ci() -> vk::DebugUtilsMessengerCreateInfoEXT<'static> {
        vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::WARNING | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(vk_debug_callback))
    }
}

// destroy
impl VulkanDebugMessenger {
    /// 必须在 instance 销毁之前调用
    pub fn destroy(self) {
        log::info!("destroying debug messenger");
        unsafe {
            self.loader.destroy_debug_utils_messenger(self.messenger, None);
        }
    }
}

/// # Safety
/// 由 Vulkan loader 调用，`p_callback_data` 在回调期间有效
unsafe extern "system" fn vk_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user_data: *mut std::os::raw::c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() {
        return vk::FALSE;
    }
    let callback_data = unsafe { *p_callback_data };
    let msg = if callback_data.p_message.is_null() {
        std::borrow::Cow::from("")
    } else {
        unsafe { CStr::from_ptr(callback_data.p_message).to_string_lossy() }
    };

    let format_msg = format_validation_message(message_type, &msg);
    match message_severity {
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => log::error!("{}", format_msg),
        vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => log::warn!("{}", format_msg),
        _ => log::info!("{}", format_msg),
    };

    // 只有 layer developer 才需要返回 True
    vk::FALSE
}

/// 新版 validation layer 的消息是 json，`MainMessage` 字段里有换行符，需要单独输出
fn format_validation_message(message_type: vk::DebugUtilsMessageTypeFlagsEXT, msg: &str) -> String {
    let mut json_value = serde_json::from_str::<serde_json::Value>(msg);
    let json_obj = json_value.as_mut().ok().and_then(|v| v.as_object_mut());
    let Some(obj) = json_obj else {
        return format!("[{:?}]\n{}\n", message_type, msg);
    };

    let main_msg = obj.remove("MainMessage");
    let main_msg_str = main_msg.as_ref().and_then(|value| value.as_str()).unwrap_or_default();
    let total_msg_str = serde_json::to_string_pretty(&obj).unwrap_or_else(|_| msg.to_string());

    format!("[{:?}]\n{}\n{}\n", message_type, total_msg_str, main_msg_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_message() {
        let formatted = format_validation_message(vk::DebugUtilsMessageTypeFlagsEXT::GENERAL, "hello");
        assert!(formatted.ends_with("hello\n"));
    }

    #[test]
    fn test_json_message_extracts_main_message() {
        let msg = r#"{"MessageID": 42, "MainMessage": "line one\nline two"}"#;
        let formatted = format_validation_message(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION, msg);
        assert!(formatted.contains("\"MessageID\": 42"));
        assert!(!formatted.contains("MainMessage"));
        assert!(formatted.ends_with("line one\nline two\n"));
    }
}
