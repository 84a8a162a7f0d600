//! Генератор входных матриц
//!
//! Создает пару файлов в формате, который читает host-программа:
//! целые числа через пробел, строка матрицы на строку файла.

use anyhow::Result;
use clap::Parser;
use opencl_fpga::config::DEFAULT_SIZE;
use opencl_fpga::matrix::{write_matrix, MatrixKind};
use std::path::PathBuf;

/// Генерация пары входных матриц для умножения
#[derive(Parser, Debug)]
#[command(name = "generate_matrices", version, about)]
struct Cli {
    /// Порядок матриц
    #[arg(long, default_value_t = DEFAULT_SIZE)]
    size: usize,

    /// Способ заполнения
    #[arg(long, value_enum, default_value = "random")]
    kind: MatrixKind,

    /// Файл матрицы A
    #[arg(long, default_value = "Matrix1.txt")]
    matrix_a: PathBuf,

    /// Файл матрицы B
    #[arg(long, default_value = "Matrix2.txt")]
    matrix_b: PathBuf,

    /// Зерно генератора для воспроизводимой пары матриц
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    println!(
        "Генерация матриц {}x{}, заполнение {:?}",
        cli.size, cli.size, cli.kind
    );

    // Обе матрицы из одного зерна совпадали бы, поэтому B сдвигает зерно.
    let fill = |offset: u64| match cli.seed {
        Some(seed) => cli.kind.generate_seeded(cli.size, seed.wrapping_add(offset)),
        None => cli.kind.generate(cli.size),
    };

    let a = fill(0);
    write_matrix(&cli.matrix_a, &a, cli.size)?;
    println!("Записано: {}", cli.matrix_a.display());

    let b = fill(1);
    write_matrix(&cli.matrix_b, &b, cli.size)?;
    println!("Записано: {}", cli.matrix_b.display());

    Ok(())
}
