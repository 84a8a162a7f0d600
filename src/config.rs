//! Конфигурация host-программы
//!
//! Значения по умолчанию повторяют классический host для образа
//! `matrix_mul`: матрицы 2000x2000 из `Matrix1.txt` и `Matrix2.txt`,
//! платформа Intel FPGA, рабочая группа 2x2. Любое поле можно
//! переопределить JSON-файлом конфигурации или флагом командной строки.

use crate::opencl::types::*;
use anyhow::{ensure, Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_SIZE: usize = 2000;
const DEFAULT_PLATFORM: &str = "Intel(R) FPGA";
const DEFAULT_BINARY: &str = "matrix_mul.aocx";
const DEFAULT_KERNEL: &str = "matrix_mul";
const DEFAULT_MATRIX_A: &str = "Matrix1.txt";
const DEFAULT_MATRIX_B: &str = "Matrix2.txt";
const DEFAULT_LOCAL: [usize; 2] = [2, 2];

/// Фильтр типа устройств при перечислении
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DeviceTypeFilter {
    All,
    Accelerator,
    Gpu,
    Cpu,
    Default,
}

impl DeviceTypeFilter {
    /// Битовая маска для clGetDeviceIDs
    pub fn to_cl(self) -> cl_device_type {
        match self {
            DeviceTypeFilter::All => CL_DEVICE_TYPE_ALL,
            DeviceTypeFilter::Accelerator => CL_DEVICE_TYPE_ACCELERATOR,
            DeviceTypeFilter::Gpu => CL_DEVICE_TYPE_GPU,
            DeviceTypeFilter::Cpu => CL_DEVICE_TYPE_CPU,
            DeviceTypeFilter::Default => CL_DEVICE_TYPE_DEFAULT,
        }
    }
}

/// Параметры запуска host-программы
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HostConfig {
    /// Порядок умножаемых матриц
    pub size: usize,
    /// Подстрока имени платформы (без учета регистра)
    pub platform: String,
    /// Какие устройства платформы брать
    pub device_type: DeviceTypeFilter,
    /// Путь к бинарному образу ядра
    pub binary: PathBuf,
    /// Имя ядра внутри образа
    pub kernel: String,
    /// Файл матрицы A
    pub matrix_a: PathBuf,
    /// Файл матрицы B
    pub matrix_b: PathBuf,
    /// Локальный размер рабочей группы
    pub local_work_size: [usize; 2],
}

impl Default for HostConfig {
    fn default() -> Self {
        HostConfig {
            size: DEFAULT_SIZE,
            platform: DEFAULT_PLATFORM.to_string(),
            device_type: DeviceTypeFilter::All,
            binary: PathBuf::from(DEFAULT_BINARY),
            kernel: DEFAULT_KERNEL.to_string(),
            matrix_a: PathBuf::from(DEFAULT_MATRIX_A),
            matrix_b: PathBuf::from(DEFAULT_MATRIX_B),
            local_work_size: DEFAULT_LOCAL,
        }
    }
}

impl HostConfig {
    /// Читает конфигурацию из JSON-файла
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("не удалось прочитать конфигурацию {}", path.display()))?;
        let cfg: HostConfig = serde_json::from_str(&text)
            .with_context(|| format!("разбор конфигурации {}", path.display()))?;
        Ok(cfg)
    }

    /// Число элементов каждой матрицы
    pub fn elements(&self) -> usize {
        self.size * self.size
    }

    /// Проверяет согласованность параметров до обращения к устройству
    pub fn validate(&self) -> Result<()> {
        ensure!(self.size > 0, "порядок матриц должен быть положительным");
        // Ядро принимает размеры как cl_int.
        ensure!(
            self.size <= i32::MAX as usize,
            "порядок матриц {} не помещается в cl_int",
            self.size
        );
        ensure!(
            self.size.checked_mul(self.size).is_some(),
            "число элементов матрицы {}x{} переполняет usize",
            self.size,
            self.size
        );
        ensure!(
            self.local_work_size[0] > 0 && self.local_work_size[1] > 0,
            "размеры рабочей группы должны быть положительными"
        );
        ensure!(
            self.size % self.local_work_size[0] == 0
                && self.size % self.local_work_size[1] == 0,
            "глобальный размер {}x{} не делится на группу {}x{}",
            self.size,
            self.size,
            self.local_work_size[0],
            self.local_work_size[1]
        );
        ensure!(!self.platform.is_empty(), "подстрока платформы пуста");
        ensure!(!self.kernel.is_empty(), "имя ядра пусто");
        Ok(())
    }
}
