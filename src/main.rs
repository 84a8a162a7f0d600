//! Host-программа умножения матриц на FPGA
//!
//! Последовательность классическая: найти платформу, загрузить бинарный
//! образ, отправить матрицы на каждое устройство, запустить ядро, прочитать
//! результат и сверить его с опорным умножением на CPU.

use anyhow::{bail, Result};
use clap::Parser;
use opencl_fpga::config::{DeviceTypeFilter, HostConfig};
use opencl_fpga::fpga::{AlignedVec, FpgaMatrixMul};
use opencl_fpga::matrix::{read_matrix, reference_multiply, verify_results};
use opencl_fpga::utils::{format_bytes, format_ms, measure_time, ns_to_ms};
use prettytable::{row, Table};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Умножение матриц на FPGA через OpenCL с проверкой на CPU
#[derive(Parser, Debug)]
#[command(name = "fpga_matrix_mul", version, about)]
struct Cli {
    /// JSON-файл конфигурации
    #[arg(long)]
    config: Option<PathBuf>,

    /// Порядок матриц
    #[arg(long)]
    size: Option<usize>,

    /// Подстрока имени платформы
    #[arg(long)]
    platform: Option<String>,

    /// Какие устройства платформы брать
    #[arg(long, value_enum)]
    device_type: Option<DeviceTypeFilter>,

    /// Путь к бинарному образу ядра (.aocx)
    #[arg(long)]
    binary: Option<PathBuf>,

    /// Имя ядра внутри образа
    #[arg(long)]
    kernel: Option<String>,

    /// Файл матрицы A
    #[arg(long)]
    matrix_a: Option<PathBuf>,

    /// Файл матрицы B
    #[arg(long)]
    matrix_b: Option<PathBuf>,

    /// Локальный размер рабочей группы, два числа
    #[arg(long, num_args = 2, value_names = ["X", "Y"])]
    local_work_size: Option<Vec<usize>>,
}

impl Cli {
    // Файл конфигурации задает основу, флаги перекрывают отдельные поля
    fn into_config(self) -> Result<HostConfig> {
        let mut cfg = match &self.config {
            Some(path) => HostConfig::from_file(path)?,
            None => HostConfig::default(),
        };
        if let Some(size) = self.size {
            cfg.size = size;
        }
        if let Some(platform) = self.platform {
            cfg.platform = platform;
        }
        if let Some(device_type) = self.device_type {
            cfg.device_type = device_type;
        }
        if let Some(binary) = self.binary {
            cfg.binary = binary;
        }
        if let Some(kernel) = self.kernel {
            cfg.kernel = kernel;
        }
        if let Some(matrix_a) = self.matrix_a {
            cfg.matrix_a = matrix_a;
        }
        if let Some(matrix_b) = self.matrix_b {
            cfg.matrix_b = matrix_b;
        }
        if let Some(lws) = self.local_work_size {
            cfg.local_work_size = [lws[0], lws[1]];
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cfg = Cli::parse().into_config()?;

    println!("Умножение матриц на FPGA");
    println!("Размер матриц: {}x{}", cfg.size, cfg.size);
    println!(
        "Рабочая группа: {}x{}",
        cfg.local_work_size[0], cfg.local_work_size[1]
    );

    println!("\nИнициализация OpenCL...");
    let mut engine = FpgaMatrixMul::new(&cfg)?;
    println!("Платформа: {}", engine.platform_name());
    println!("Образ ядра: {}", engine.binary_path().display());
    println!("Устройств готово: {}", engine.device_count());

    let mut devices_table = Table::new();
    devices_table.add_row(row![
        "Устройство",
        "Производитель",
        "CU",
        "Память",
        "Макс. группа"
    ]);
    for info in engine.device_infos()? {
        devices_table.add_row(row![
            info.name,
            info.vendor,
            info.compute_units,
            format_bytes(info.global_mem_bytes),
            info.max_work_group_size
        ]);
    }
    devices_table.printstd();

    println!("\nЧтение входных матриц...");
    let a = AlignedVec::from_slice(&read_matrix(&cfg.matrix_a, cfg.size)?);
    let b = AlignedVec::from_slice(&read_matrix(&cfg.matrix_b, cfg.size)?);
    println!(
        "Матрица A: {} ({} значений), матрица B: {} ({} значений)",
        cfg.matrix_a.display(),
        a.len(),
        cfg.matrix_b.display(),
        b.len()
    );

    println!("\nОпорное умножение на CPU...");
    let (expected, cpu_time) = measure_time(|| reference_multiply(&a, &b, cfg.size));

    println!("\nЗапуск ядра на устройствах...");
    let report = engine.run(&a, &b)?;

    println!("\nFPGA время (стена): {}", format_ms(report.wall_time));
    for run in &report.devices {
        println!(
            "Время ядра ({}): {:.3} ms",
            run.device_name,
            ns_to_ms(run.kernel_time_ns)
        );
    }
    println!("CPU время: {}", format_ms(cpu_time));

    println!("\nПроверка результатов...");
    let mut all_passed = true;
    for run in &report.devices {
        let verdict = verify_results(&run.output, &expected, cfg.size);
        if verdict.passed() {
            println!("{}: все {} элементов совпали", run.device_name, verdict.total);
        } else {
            all_passed = false;
            println!(
                "{}: расхождений {} из {}",
                run.device_name, verdict.mismatches, verdict.total
            );
            if let Some(m) = verdict.first_mismatch {
                println!(
                    "  первое: [{}][{}] = {} вместо {}",
                    m.row, m.col, m.actual, m.expected
                );
            }
        }
    }

    let max_kernel_ns = report
        .devices
        .iter()
        .map(|r| r.kernel_time_ns)
        .max()
        .unwrap_or(0);

    println!("\nИтоговая статистика:");
    let mut summary = Table::new();
    summary.add_row(row!["Метрика", "Значение"]);
    summary.add_row(row!["Размер задачи", format!("{0}x{0}", cfg.size)]);
    summary.add_row(row!["Устройств", engine.device_count()]);
    summary.add_row(row!["FPGA время (стена)", format_ms(report.wall_time)]);
    summary.add_row(row![
        "Время ядра (максимум)",
        format!("{:.3} ms", ns_to_ms(max_kernel_ns))
    ]);
    summary.add_row(row!["CPU время", format_ms(cpu_time)]);
    summary.add_row(row![
        "Проверка",
        if all_passed { "PASS" } else { "FAIL" }
    ]);
    summary.printstd();

    println!("\nVerification: {}", if all_passed { "PASS" } else { "FAIL" });
    if !all_passed {
        bail!("результаты устройства не совпали с опорными");
    }
    Ok(())
}
