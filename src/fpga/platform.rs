//! Поиск платформы и перечисление устройств
//!
//! Платформа выбирается по подстроке имени, как это делают утилиты
//! Intel FPGA SDK: сравнение без учета регистра, первое совпадение.

use crate::cl_check;
use crate::opencl::types::*;
use anyhow::{bail, Result};
use std::ffi::c_void;
use std::ptr;

/// Находит платформу, имя которой содержит подстроку (без учета регистра)
pub fn find_platform(name_substr: &str) -> Result<cl_platform_id> {
    let mut num_platforms: cl_uint = 0;
    cl_check!(clGetPlatformIDs(0, ptr::null_mut(), &mut num_platforms))?;
    if num_platforms == 0 {
        bail!("в системе нет ни одной платформы OpenCL");
    }

    let mut platforms: Vec<cl_platform_id> = vec![ptr::null_mut(); num_platforms as usize];
    cl_check!(clGetPlatformIDs(
        num_platforms,
        platforms.as_mut_ptr(),
        ptr::null_mut()
    ))?;

    let needle = name_substr.to_lowercase();
    for &platform in &platforms {
        let name = platform_name(platform)?;
        if name.to_lowercase().contains(&needle) {
            tracing::debug!(platform = %name, "платформа выбрана");
            return Ok(platform);
        }
    }

    let available: Vec<String> = platforms
        .iter()
        .map(|&p| platform_name(p).unwrap_or_else(|_| "<нечитаемое имя>".into()))
        .collect();
    bail!(
        "платформа \"{}\" не найдена; доступны: {}",
        name_substr,
        available.join(", ")
    )
}

/// Имя платформы
pub fn platform_name(platform: cl_platform_id) -> Result<String> {
    platform_info_string(platform, CL_PLATFORM_NAME)
}

/// Версия OpenCL, заявленная платформой
pub fn platform_version(platform: cl_platform_id) -> Result<String> {
    platform_info_string(platform, CL_PLATFORM_VERSION)
}

/// Все устройства платформы заданного типа
pub fn device_ids(
    platform: cl_platform_id,
    device_type: cl_device_type,
) -> Result<Vec<cl_device_id>> {
    let mut num_devices: cl_uint = 0;
    cl_check!(clGetDeviceIDs(
        platform,
        device_type,
        0,
        ptr::null_mut(),
        &mut num_devices
    ))?;
    if num_devices == 0 {
        bail!("на платформе нет устройств запрошенного типа");
    }

    let mut devices: Vec<cl_device_id> = vec![ptr::null_mut(); num_devices as usize];
    cl_check!(clGetDeviceIDs(
        platform,
        device_type,
        num_devices,
        devices.as_mut_ptr(),
        ptr::null_mut()
    ))?;
    Ok(devices)
}

/// Имя устройства
pub fn device_name(device: cl_device_id) -> Result<String> {
    device_info_string(device, CL_DEVICE_NAME)
}

/// Производитель устройства
pub fn device_vendor(device: cl_device_id) -> Result<String> {
    device_info_string(device, CL_DEVICE_VENDOR)
}

/// Число вычислительных блоков устройства
pub fn device_max_compute_units(device: cl_device_id) -> Result<cl_uint> {
    device_info_scalar::<cl_uint>(device, CL_DEVICE_MAX_COMPUTE_UNITS)
}

/// Максимальный размер рабочей группы устройства
pub fn device_max_work_group_size(device: cl_device_id) -> Result<usize> {
    device_info_scalar::<usize>(device, CL_DEVICE_MAX_WORK_GROUP_SIZE)
}

/// Объем глобальной памяти устройства в байтах
pub fn device_global_mem_size(device: cl_device_id) -> Result<cl_ulong> {
    device_info_scalar::<cl_ulong>(device, CL_DEVICE_GLOBAL_MEM_SIZE)
}

// Строковые запросы делаются в два вызова: сначала размер, потом данные
fn platform_info_string(platform: cl_platform_id, param: cl_platform_info) -> Result<String> {
    let mut size: usize = 0;
    cl_check!(clGetPlatformInfo(
        platform,
        param,
        0,
        ptr::null_mut(),
        &mut size
    ))?;
    let mut buf = vec![0u8; size];
    cl_check!(clGetPlatformInfo(
        platform,
        param,
        size,
        buf.as_mut_ptr() as *mut c_void,
        ptr::null_mut()
    ))?;
    Ok(trim_cl_string(buf))
}

fn device_info_string(device: cl_device_id, param: cl_device_info) -> Result<String> {
    let mut size: usize = 0;
    cl_check!(clGetDeviceInfo(device, param, 0, ptr::null_mut(), &mut size))?;
    let mut buf = vec![0u8; size];
    cl_check!(clGetDeviceInfo(
        device,
        param,
        size,
        buf.as_mut_ptr() as *mut c_void,
        ptr::null_mut()
    ))?;
    Ok(trim_cl_string(buf))
}

fn device_info_scalar<T: Copy + Default>(device: cl_device_id, param: cl_device_info) -> Result<T> {
    let mut value = T::default();
    cl_check!(clGetDeviceInfo(
        device,
        param,
        std::mem::size_of::<T>(),
        &mut value as *mut T as *mut c_void,
        ptr::null_mut()
    ))?;
    Ok(value)
}

// Драйверы кладут в буфер строку с завершающим нулем
fn trim_cl_string(buf: Vec<u8>) -> String {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::trim_cl_string;

    #[test]
    fn trims_at_first_nul() {
        assert_eq!(trim_cl_string(b"Intel(R) FPGA\0".to_vec()), "Intel(R) FPGA");
        assert_eq!(trim_cl_string(b"abc\0mus\0or".to_vec()), "abc");
    }

    #[test]
    fn survives_missing_nul() {
        assert_eq!(trim_cl_string(b"raw".to_vec()), "raw");
        assert_eq!(trim_cl_string(Vec::new()), "");
    }
}
