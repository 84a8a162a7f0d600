//! OpenCL host driver for FPGA-accelerated matrix multiplication

pub mod config;
pub mod fpga;
pub mod matrix;
pub mod opencl;
pub mod utils;

// Реэкспортируем макросы на уровень крейта
#[macro_use]
mod macros {
    /// Макрос для вызовов OpenCL, возвращающих код состояния
    ///
    /// Разворачивается в вызов через загруженную таблицу точек входа;
    /// ненулевой код превращается в [`crate::opencl::ClError`] с именем
    /// вызова и ранний выход из функции.
    #[macro_export]
    macro_rules! cl_check {
        ($func:ident($($arg:expr),* $(,)?)) => {{
            let api = $crate::opencl::bindings::api()?;
            let code = unsafe { (api.$func)($($arg),*) };
            if code != $crate::opencl::types::CL_SUCCESS {
                return Err($crate::opencl::error::ClError::api(stringify!($func), code).into());
            }
            Ok(()) as anyhow::Result<()>
        }};
    }

    /// Макрос для вызовов OpenCL, создающих объект
    ///
    /// Сам дописывает завершающий аргумент `errcode_ret` и проверяет
    /// и код, и указатель.
    #[macro_export]
    macro_rules! cl_create {
        ($func:ident($($arg:expr),* $(,)?)) => {{
            let mut errcode: $crate::opencl::types::cl_int = 0;
            let api = $crate::opencl::bindings::api()?;
            let obj = unsafe { (api.$func)($($arg),*, &mut errcode) };
            if errcode != $crate::opencl::types::CL_SUCCESS || obj.is_null() {
                return Err($crate::opencl::error::ClError::api(stringify!($func), errcode).into());
            }
            Ok(obj) as anyhow::Result<_>
        }};
    }
}

// Реэкспорт основных типов для удобства
pub use config::HostConfig;
pub use matrix::MatrixKind;
pub use opencl::types::*;
