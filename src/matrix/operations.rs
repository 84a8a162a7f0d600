//! Опорное умножение на CPU и проверка результатов устройства

use indicatif::{ProgressBar, ProgressStyle};

/// Перемножает квадратные матрицы на CPU
///
/// Арифметика: i32 по модулю 2^32, как в целочисленном тракте самого
/// ядра, поэтому сравнение с устройством точное на любых входах,
/// включая переполнение.
pub fn reference_multiply(a: &[i32], b: &[i32], size: usize) -> Vec<i32> {
    assert_eq!(a.len(), size * size, "матрица A неверного размера");
    assert_eq!(b.len(), size * size, "матрица B неверного размера");

    let bar = ProgressBar::new(size as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta})")
            .unwrap()
            .progress_chars("#>-"),
    );

    let mut c = vec![0i32; size * size];
    for i in 0..size {
        for j in 0..size {
            let mut sum = 0i32;
            for k in 0..size {
                sum = sum.wrapping_add(a[i * size + k].wrapping_mul(b[k * size + j]));
            }
            c[i * size + j] = sum;
        }
        bar.inc(1);
    }
    bar.finish_and_clear();
    c
}

/// Первое найденное расхождение
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mismatch {
    pub row: usize,
    pub col: usize,
    pub actual: i32,
    pub expected: i32,
}

/// Итог поэлементного сравнения с опорной матрицей
#[derive(Debug, Clone, Copy)]
pub struct VerifyReport {
    pub total: usize,
    pub mismatches: usize,
    pub first_mismatch: Option<Mismatch>,
}

impl VerifyReport {
    pub fn passed(&self) -> bool {
        self.mismatches == 0
    }
}

/// Сравнивает результат устройства с опорным поэлементно и точно
///
/// Значения целые, поэтому никакой допустимой погрешности нет: любое
/// отличие считается ошибкой.
pub fn verify_results(actual: &[i32], expected: &[i32], size: usize) -> VerifyReport {
    assert_eq!(actual.len(), size * size);
    assert_eq!(expected.len(), size * size);

    let mut mismatches = 0;
    let mut first_mismatch = None;
    for i in 0..size {
        for j in 0..size {
            let idx = i * size + j;
            if actual[idx] != expected[idx] {
                mismatches += 1;
                if first_mismatch.is_none() {
                    first_mismatch = Some(Mismatch {
                        row: i,
                        col: j,
                        actual: actual[idx],
                        expected: expected[idx],
                    });
                }
            }
        }
    }

    VerifyReport {
        total: size * size,
        mismatches,
        first_mismatch,
    }
}
