//! Ошибки OpenCL вызовов
//!
//! Каждый вызов API возвращает код состояния; здесь коды превращаются в
//! нормальные ошибки Rust с именем вызова и символьным именем кода.

use super::types::cl_int;

/// Ошибка уровня OpenCL: неудачный вызов API или недоступная библиотека
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClError {
    /// Вызов API вернул ненулевой код состояния
    #[error("{func} failed: {name} (code {code})")]
    Api {
        func: &'static str,
        code: cl_int,
        name: &'static str,
    },

    /// Библиотеку OpenCL не удалось загрузить или в ней нет нужного символа
    #[error("OpenCL runtime unavailable: {0}")]
    Runtime(String),
}

impl ClError {
    /// Собирает ошибку по имени вызова и коду возврата
    pub fn api(func: &'static str, code: cl_int) -> Self {
        ClError::Api {
            func,
            code,
            name: cl_error_name(code),
        }
    }

    /// Код состояния, если ошибка пришла из вызова API
    pub fn code(&self) -> Option<cl_int> {
        match self {
            ClError::Api { code, .. } => Some(*code),
            ClError::Runtime(_) => None,
        }
    }
}

/// Символьное имя кода состояния OpenCL
pub fn cl_error_name(code: cl_int) -> &'static str {
    match code {
        0 => "CL_SUCCESS",
        -1 => "CL_DEVICE_NOT_FOUND",
        -2 => "CL_DEVICE_NOT_AVAILABLE",
        -3 => "CL_COMPILER_NOT_AVAILABLE",
        -4 => "CL_MEM_OBJECT_ALLOCATION_FAILURE",
        -5 => "CL_OUT_OF_RESOURCES",
        -6 => "CL_OUT_OF_HOST_MEMORY",
        -7 => "CL_PROFILING_INFO_NOT_AVAILABLE",
        -8 => "CL_MEM_COPY_OVERLAP",
        -9 => "CL_IMAGE_FORMAT_MISMATCH",
        -10 => "CL_IMAGE_FORMAT_NOT_SUPPORTED",
        -11 => "CL_BUILD_PROGRAM_FAILURE",
        -12 => "CL_MAP_FAILURE",
        -30 => "CL_INVALID_VALUE",
        -31 => "CL_INVALID_DEVICE_TYPE",
        -32 => "CL_INVALID_PLATFORM",
        -33 => "CL_INVALID_DEVICE",
        -34 => "CL_INVALID_CONTEXT",
        -35 => "CL_INVALID_QUEUE_PROPERTIES",
        -36 => "CL_INVALID_COMMAND_QUEUE",
        -37 => "CL_INVALID_HOST_PTR",
        -38 => "CL_INVALID_MEM_OBJECT",
        -39 => "CL_INVALID_IMAGE_FORMAT_DESCRIPTOR",
        -40 => "CL_INVALID_IMAGE_SIZE",
        -41 => "CL_INVALID_SAMPLER",
        -42 => "CL_INVALID_BINARY",
        -43 => "CL_INVALID_BUILD_OPTIONS",
        -44 => "CL_INVALID_PROGRAM",
        -45 => "CL_INVALID_PROGRAM_EXECUTABLE",
        -46 => "CL_INVALID_KERNEL_NAME",
        -47 => "CL_INVALID_KERNEL_DEFINITION",
        -48 => "CL_INVALID_KERNEL",
        -49 => "CL_INVALID_ARG_INDEX",
        -50 => "CL_INVALID_ARG_VALUE",
        -51 => "CL_INVALID_ARG_SIZE",
        -52 => "CL_INVALID_KERNEL_ARGS",
        -53 => "CL_INVALID_WORK_DIMENSION",
        -54 => "CL_INVALID_WORK_GROUP_SIZE",
        -55 => "CL_INVALID_WORK_ITEM_SIZE",
        -56 => "CL_INVALID_GLOBAL_OFFSET",
        -57 => "CL_INVALID_EVENT_WAIT_LIST",
        -58 => "CL_INVALID_EVENT",
        -59 => "CL_INVALID_OPERATION",
        -60 => "CL_INVALID_GL_OBJECT",
        -61 => "CL_INVALID_BUFFER_SIZE",
        -62 => "CL_INVALID_MIP_LEVEL",
        -63 => "CL_INVALID_GLOBAL_WORK_SIZE",
        _ => "UNKNOWN_CL_ERROR",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_name_covers_common_codes() {
        assert_eq!(cl_error_name(0), "CL_SUCCESS");
        assert_eq!(cl_error_name(-1), "CL_DEVICE_NOT_FOUND");
        assert_eq!(cl_error_name(-42), "CL_INVALID_BINARY");
        assert_eq!(cl_error_name(-46), "CL_INVALID_KERNEL_NAME");
        assert_eq!(cl_error_name(-54), "CL_INVALID_WORK_GROUP_SIZE");
        assert_eq!(cl_error_name(-9999), "UNKNOWN_CL_ERROR");
    }

    #[test]
    fn api_error_message_names_call_and_code() {
        let err = ClError::api("clCreateBuffer", -61);
        let text = err.to_string();
        assert!(text.contains("clCreateBuffer"));
        assert!(text.contains("CL_INVALID_BUFFER_SIZE"));
        assert!(text.contains("-61"));
        assert_eq!(err.code(), Some(-61));
    }
}
