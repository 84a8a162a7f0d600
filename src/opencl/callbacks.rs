//! Callback-функции для OpenCL

use std::ffi::{c_char, c_void, CStr};

/// Тип callback-функции для контекста OpenCL
pub type ContextNotifyCallback = Option<
    unsafe extern "C" fn(
        errinfo: *const c_char,
        private_info: *const c_void,
        cb: usize,
        user_data: *mut c_void,
    ),
>;

/// Callback контекста: сообщения драйвера уходят в лог
///
/// Вызывается из глубин драйвера, поэтому здесь нельзя паниковать.
pub unsafe extern "C" fn context_notify(
    errinfo: *const c_char,
    _private_info: *const c_void,
    _cb: usize,
    _user_data: *mut c_void,
) {
    if errinfo.is_null() {
        return;
    }
    let message = CStr::from_ptr(errinfo).to_string_lossy();
    tracing::error!(target: "opencl", "context notification: {message}");
}
