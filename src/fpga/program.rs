//! Загрузка бинарного образа ядра и создание программы
//!
//! Программа создается из заранее скомпилированного образа (.aocx),
//! онлайн-компиляции исходников здесь нет: образ для FPGA собирается
//! офлайн-компилятором за часы до запуска.

use crate::opencl::bindings::api;
use crate::opencl::error::{cl_error_name, ClError};
use crate::opencl::types::*;
use crate::{cl_check, cl_create};
use anyhow::{bail, Context, Result};
use std::ffi::c_void;
use std::fs;
use std::path::{Path, PathBuf};
use std::ptr;

/// Находит файл образа: сначала путь как задан, затем с расширением .aocx
pub fn resolve_binary(path: &Path) -> Result<PathBuf> {
    if path.is_file() {
        return Ok(path.to_path_buf());
    }
    if path.extension().is_none() {
        let with_ext = path.with_extension("aocx");
        if with_ext.is_file() {
            return Ok(with_ext);
        }
        bail!(
            "бинарный образ не найден: ни {}, ни {}",
            path.display(),
            with_ext.display()
        );
    }
    bail!("бинарный образ не найден: {}", path.display())
}

/// Читает образ в память
pub fn load_binary(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("не удалось прочитать образ {}", path.display()))
}

/// Создает программу из одного образа для всех перечисленных устройств
///
/// Статус загрузки образа проверяется отдельно для каждого устройства:
/// общий код возврата может быть нулевым, когда образ не подошел только
/// части устройств.
pub fn create_program(
    context: cl_context,
    devices: &[cl_device_id],
    binary: &[u8],
) -> Result<cl_program> {
    if devices.is_empty() {
        bail!("список устройств пуст");
    }
    if binary.is_empty() {
        bail!("бинарный образ пуст");
    }

    let lengths: Vec<usize> = vec![binary.len(); devices.len()];
    let binaries: Vec<*const u8> = vec![binary.as_ptr(); devices.len()];
    let mut binary_status: Vec<cl_int> = vec![CL_SUCCESS; devices.len()];

    let program = cl_create!(clCreateProgramWithBinary(
        context,
        devices.len() as cl_uint,
        devices.as_ptr(),
        lengths.as_ptr(),
        binaries.as_ptr(),
        binary_status.as_mut_ptr()
    ))?;

    for (i, &status) in binary_status.iter().enumerate() {
        if status != CL_SUCCESS {
            bail!(
                "устройство {} отвергло бинарный образ: {} (code {})",
                i,
                cl_error_name(status),
                status
            );
        }
    }

    // Для программы из образа clBuildProgram завершает подготовку;
    // вызов обязателен до clCreateKernel
    let api = api()?;
    let code = unsafe {
        (api.clBuildProgram)(
            program,
            devices.len() as cl_uint,
            devices.as_ptr(),
            ptr::null(),
            None,
            ptr::null_mut(),
        )
    };
    if code != CL_SUCCESS {
        // Образ один на все устройства, поэтому хватает лога первого
        let log = build_log(program, devices[0]).unwrap_or_default();
        if log.is_empty() {
            return Err(ClError::api("clBuildProgram", code).into());
        }
        return Err(ClError::api("clBuildProgram", code))
            .context(format!("лог сборки программы:\n{log}"));
    }

    Ok(program)
}

/// Лог сборки программы для устройства
pub fn build_log(program: cl_program, device: cl_device_id) -> Result<String> {
    let mut size: usize = 0;
    cl_check!(clGetProgramBuildInfo(
        program,
        device,
        CL_PROGRAM_BUILD_LOG,
        0,
        ptr::null_mut(),
        &mut size
    ))?;
    let mut log = vec![0u8; size];
    cl_check!(clGetProgramBuildInfo(
        program,
        device,
        CL_PROGRAM_BUILD_LOG,
        size,
        log.as_mut_ptr() as *mut c_void,
        ptr::null_mut()
    ))?;
    Ok(String::from_utf8_lossy(&log)
        .trim_end_matches('\0')
        .trim()
        .to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn resolve_prefers_exact_path() {
        let dir = tempfile::tempdir().unwrap();
        let exact = dir.path().join("matrix_mul.aocx");
        fs::write(&exact, b"img").unwrap();
        assert_eq!(resolve_binary(&exact).unwrap(), exact);
    }

    #[test]
    fn resolve_appends_aocx_extension() {
        let dir = tempfile::tempdir().unwrap();
        let full = dir.path().join("matrix_mul.aocx");
        fs::write(&full, b"img").unwrap();
        let bare = dir.path().join("matrix_mul");
        assert_eq!(resolve_binary(&bare).unwrap(), full);
    }

    #[test]
    fn resolve_reports_both_candidates() {
        let dir = tempfile::tempdir().unwrap();
        let bare = dir.path().join("no_such_kernel");
        let text = resolve_binary(&bare).unwrap_err().to_string();
        assert!(text.contains("no_such_kernel"));
        assert!(text.contains("no_such_kernel.aocx"));
    }

    #[test]
    fn load_binary_reads_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image.aocx");
        fs::write(&path, [0xAA, 0xBB, 0xCC]).unwrap();
        assert_eq!(load_binary(&path).unwrap(), vec![0xAA, 0xBB, 0xCC]);
    }

    #[test]
    fn load_binary_reports_path_on_error() {
        let missing = Path::new("/definitely/not/here.aocx");
        let text = format!("{:#}", load_binary(missing).unwrap_err());
        assert!(text.contains("here.aocx"));
    }
}
