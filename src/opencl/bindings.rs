//! Низкоуровневые привязки к OpenCL API
//!
//! Библиотека подгружается во время выполнения через `libloading`, поэтому
//! сборка и host-тесты не требуют libOpenCL на машине. Путь к библиотеке
//! можно переопределить переменной окружения `OPENCL_LIBRARY`.

use super::callbacks::ContextNotifyCallback;
use super::error::ClError;
use super::types::*;
use std::env;
use std::ffi::{c_char, c_void};
use std::sync::OnceLock;

use libloading::{Library, Symbol};

/// Переменная окружения с путем к библиотеке OpenCL
pub const OPENCL_LIBRARY_ENV: &str = "OPENCL_LIBRARY";

/// Callback завершения сборки программы
pub type ProgramNotifyCallback = Option<unsafe extern "C" fn(program: cl_program, user_data: *mut c_void)>;

pub type ClGetPlatformIDsFn = unsafe extern "C" fn(
    num_entries: cl_uint,
    platforms: *mut cl_platform_id,
    num_platforms: *mut cl_uint,
) -> cl_int;

pub type ClGetPlatformInfoFn = unsafe extern "C" fn(
    platform: cl_platform_id,
    param_name: cl_platform_info,
    param_value_size: usize,
    param_value: *mut c_void,
    param_value_size_ret: *mut usize,
) -> cl_int;

pub type ClGetDeviceIDsFn = unsafe extern "C" fn(
    platform: cl_platform_id,
    device_type: cl_device_type,
    num_entries: cl_uint,
    devices: *mut cl_device_id,
    num_devices: *mut cl_uint,
) -> cl_int;

pub type ClGetDeviceInfoFn = unsafe extern "C" fn(
    device: cl_device_id,
    param_name: cl_device_info,
    param_value_size: usize,
    param_value: *mut c_void,
    param_value_size_ret: *mut usize,
) -> cl_int;

pub type ClCreateContextFn = unsafe extern "C" fn(
    properties: *const cl_context_properties,
    num_devices: cl_uint,
    devices: *const cl_device_id,
    pfn_notify: ContextNotifyCallback,
    user_data: *mut c_void,
    errcode_ret: *mut cl_int,
) -> cl_context;

pub type ClCreateCommandQueueFn = unsafe extern "C" fn(
    context: cl_context,
    device: cl_device_id,
    properties: cl_command_queue_properties,
    errcode_ret: *mut cl_int,
) -> cl_command_queue;

pub type ClCreateProgramWithBinaryFn = unsafe extern "C" fn(
    context: cl_context,
    num_devices: cl_uint,
    device_list: *const cl_device_id,
    lengths: *const usize,
    binaries: *const *const u8,
    binary_status: *mut cl_int,
    errcode_ret: *mut cl_int,
) -> cl_program;

pub type ClBuildProgramFn = unsafe extern "C" fn(
    program: cl_program,
    num_devices: cl_uint,
    device_list: *const cl_device_id,
    options: *const c_char,
    pfn_notify: ProgramNotifyCallback,
    user_data: *mut c_void,
) -> cl_int;

pub type ClGetProgramBuildInfoFn = unsafe extern "C" fn(
    program: cl_program,
    device: cl_device_id,
    param_name: cl_program_build_info,
    param_value_size: usize,
    param_value: *mut c_void,
    param_value_size_ret: *mut usize,
) -> cl_int;

pub type ClCreateKernelFn = unsafe extern "C" fn(
    program: cl_program,
    kernel_name: *const c_char,
    errcode_ret: *mut cl_int,
) -> cl_kernel;

pub type ClSetKernelArgFn = unsafe extern "C" fn(
    kernel: cl_kernel,
    arg_index: cl_uint,
    arg_size: usize,
    arg_value: *const c_void,
) -> cl_int;

pub type ClCreateBufferFn = unsafe extern "C" fn(
    context: cl_context,
    flags: cl_mem_flags,
    size: usize,
    host_ptr: *mut c_void,
    errcode_ret: *mut cl_int,
) -> cl_mem;

pub type ClEnqueueWriteBufferFn = unsafe extern "C" fn(
    command_queue: cl_command_queue,
    buffer: cl_mem,
    blocking_write: cl_bool,
    offset: usize,
    size: usize,
    ptr: *const c_void,
    num_events_in_wait_list: cl_uint,
    event_wait_list: *const cl_event,
    event: *mut cl_event,
) -> cl_int;

pub type ClEnqueueNDRangeKernelFn = unsafe extern "C" fn(
    command_queue: cl_command_queue,
    kernel: cl_kernel,
    work_dim: cl_uint,
    global_work_offset: *const usize,
    global_work_size: *const usize,
    local_work_size: *const usize,
    num_events_in_wait_list: cl_uint,
    event_wait_list: *const cl_event,
    event: *mut cl_event,
) -> cl_int;

pub type ClEnqueueReadBufferFn = unsafe extern "C" fn(
    command_queue: cl_command_queue,
    buffer: cl_mem,
    blocking_read: cl_bool,
    offset: usize,
    size: usize,
    ptr: *mut c_void,
    num_events_in_wait_list: cl_uint,
    event_wait_list: *const cl_event,
    event: *mut cl_event,
) -> cl_int;

pub type ClWaitForEventsFn = unsafe extern "C" fn(
    num_events: cl_uint,
    event_list: *const cl_event,
) -> cl_int;

pub type ClGetEventProfilingInfoFn = unsafe extern "C" fn(
    event: cl_event,
    param_name: cl_profiling_info,
    param_value_size: usize,
    param_value: *mut c_void,
    param_value_size_ret: *mut usize,
) -> cl_int;

pub type ClFinishFn = unsafe extern "C" fn(command_queue: cl_command_queue) -> cl_int;
pub type ClReleaseEventFn = unsafe extern "C" fn(event: cl_event) -> cl_int;
pub type ClReleaseMemObjectFn = unsafe extern "C" fn(memobj: cl_mem) -> cl_int;
pub type ClReleaseKernelFn = unsafe extern "C" fn(kernel: cl_kernel) -> cl_int;
pub type ClReleaseProgramFn = unsafe extern "C" fn(program: cl_program) -> cl_int;
pub type ClReleaseCommandQueueFn = unsafe extern "C" fn(command_queue: cl_command_queue) -> cl_int;
pub type ClReleaseContextFn = unsafe extern "C" fn(context: cl_context) -> cl_int;

/// Таблица загруженных точек входа OpenCL
///
/// Указатели действительны, пока жив `_lib`, поэтому библиотека хранится
/// в той же структуре. В host-тестах таблица собирается из локальных
/// заглушек, тогда библиотека не нужна.
#[allow(non_snake_case)]
pub struct OpenClApi {
    _lib: Option<Library>,
    pub clGetPlatformIDs: ClGetPlatformIDsFn,
    pub clGetPlatformInfo: ClGetPlatformInfoFn,
    pub clGetDeviceIDs: ClGetDeviceIDsFn,
    pub clGetDeviceInfo: ClGetDeviceInfoFn,
    pub clCreateContext: ClCreateContextFn,
    pub clCreateCommandQueue: ClCreateCommandQueueFn,
    pub clCreateProgramWithBinary: ClCreateProgramWithBinaryFn,
    pub clBuildProgram: ClBuildProgramFn,
    pub clGetProgramBuildInfo: ClGetProgramBuildInfoFn,
    pub clCreateKernel: ClCreateKernelFn,
    pub clSetKernelArg: ClSetKernelArgFn,
    pub clCreateBuffer: ClCreateBufferFn,
    pub clEnqueueWriteBuffer: ClEnqueueWriteBufferFn,
    pub clEnqueueNDRangeKernel: ClEnqueueNDRangeKernelFn,
    pub clEnqueueReadBuffer: ClEnqueueReadBufferFn,
    pub clWaitForEvents: ClWaitForEventsFn,
    pub clGetEventProfilingInfo: ClGetEventProfilingInfoFn,
    pub clFinish: ClFinishFn,
    pub clReleaseEvent: ClReleaseEventFn,
    pub clReleaseMemObject: ClReleaseMemObjectFn,
    pub clReleaseKernel: ClReleaseKernelFn,
    pub clReleaseProgram: ClReleaseProgramFn,
    pub clReleaseCommandQueue: ClReleaseCommandQueueFn,
    pub clReleaseContext: ClReleaseContextFn,
}

fn candidate_names() -> &'static [&'static str] {
    if cfg!(target_os = "windows") {
        &["OpenCL.dll"]
    } else if cfg!(target_os = "macos") {
        &["/System/Library/Frameworks/OpenCL.framework/OpenCL"]
    } else {
        &["libOpenCL.so.1", "libOpenCL.so"]
    }
}

fn open_library() -> Result<Library, ClError> {
    if let Ok(path) = env::var(OPENCL_LIBRARY_ENV) {
        return unsafe { Library::new(&path) }
            .map_err(|e| ClError::Runtime(format!("{path}: {e}")));
    }

    let mut last_error = String::new();
    for &name in candidate_names() {
        match unsafe { Library::new(name) } {
            Ok(lib) => {
                tracing::debug!(library = name, "OpenCL library loaded");
                return Ok(lib);
            }
            Err(e) => last_error = format!("{name}: {e}"),
        }
    }
    Err(ClError::Runtime(last_error))
}

fn load_symbols(lib: Library) -> Result<OpenClApi, ClError> {
    macro_rules! sym {
        ($name:ident, $ty:ty) => {{
            let symbol: Symbol<$ty> =
                unsafe { lib.get(concat!(stringify!($name), "\0").as_bytes()) }
                    .map_err(|e| ClError::Runtime(format!("{}: {}", stringify!($name), e)))?;
            *symbol
        }};
    }

    Ok(OpenClApi {
        clGetPlatformIDs: sym!(clGetPlatformIDs, ClGetPlatformIDsFn),
        clGetPlatformInfo: sym!(clGetPlatformInfo, ClGetPlatformInfoFn),
        clGetDeviceIDs: sym!(clGetDeviceIDs, ClGetDeviceIDsFn),
        clGetDeviceInfo: sym!(clGetDeviceInfo, ClGetDeviceInfoFn),
        clCreateContext: sym!(clCreateContext, ClCreateContextFn),
        clCreateCommandQueue: sym!(clCreateCommandQueue, ClCreateCommandQueueFn),
        clCreateProgramWithBinary: sym!(clCreateProgramWithBinary, ClCreateProgramWithBinaryFn),
        clBuildProgram: sym!(clBuildProgram, ClBuildProgramFn),
        clGetProgramBuildInfo: sym!(clGetProgramBuildInfo, ClGetProgramBuildInfoFn),
        clCreateKernel: sym!(clCreateKernel, ClCreateKernelFn),
        clSetKernelArg: sym!(clSetKernelArg, ClSetKernelArgFn),
        clCreateBuffer: sym!(clCreateBuffer, ClCreateBufferFn),
        clEnqueueWriteBuffer: sym!(clEnqueueWriteBuffer, ClEnqueueWriteBufferFn),
        clEnqueueNDRangeKernel: sym!(clEnqueueNDRangeKernel, ClEnqueueNDRangeKernelFn),
        clEnqueueReadBuffer: sym!(clEnqueueReadBuffer, ClEnqueueReadBufferFn),
        clWaitForEvents: sym!(clWaitForEvents, ClWaitForEventsFn),
        clGetEventProfilingInfo: sym!(clGetEventProfilingInfo, ClGetEventProfilingInfoFn),
        clFinish: sym!(clFinish, ClFinishFn),
        clReleaseEvent: sym!(clReleaseEvent, ClReleaseEventFn),
        clReleaseMemObject: sym!(clReleaseMemObject, ClReleaseMemObjectFn),
        clReleaseKernel: sym!(clReleaseKernel, ClReleaseKernelFn),
        clReleaseProgram: sym!(clReleaseProgram, ClReleaseProgramFn),
        clReleaseCommandQueue: sym!(clReleaseCommandQueue, ClReleaseCommandQueueFn),
        clReleaseContext: sym!(clReleaseContext, ClReleaseContextFn),
        _lib: Some(lib),
    })
}

static API: OnceLock<Result<OpenClApi, ClError>> = OnceLock::new();

/// Возвращает таблицу точек входа, загружая библиотеку при первом обращении
///
/// Результат загрузки кэшируется на все время работы процесса. Если тесты
/// установили таблицу-заглушку, она имеет приоритет над библиотекой.
pub fn api() -> Result<&'static OpenClApi, ClError> {
    #[cfg(test)]
    if let Some(table) = stub::installed() {
        return Ok(table);
    }
    API.get_or_init(|| open_library().and_then(load_symbols))
        .as_ref()
        .map_err(Clone::clone)
}
