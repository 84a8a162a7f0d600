//! Виды заполнения генерируемых матриц

use clap::ValueEnum;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Способ заполнения квадратной матрицы
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MatrixKind {
    /// Случайные значения из [-10, 10]
    Random,
    /// Детерминированная лесенка: (строка + столбец) mod 17
    Ramp,
    /// Все элементы равны 1
    Ones,
}

impl MatrixKind {
    /// Генерирует матрицу порядка `size` построчно
    pub fn generate(self, size: usize) -> Vec<i32> {
        self.generate_with(size, &mut rand::thread_rng())
    }

    /// То же с фиксированным зерном, для воспроизводимых прогонов
    pub fn generate_seeded(self, size: usize, seed: u64) -> Vec<i32> {
        self.generate_with(size, &mut StdRng::seed_from_u64(seed))
    }

    fn generate_with<R: Rng>(self, size: usize, rng: &mut R) -> Vec<i32> {
        let n = size * size;
        match self {
            MatrixKind::Random => (0..n).map(|_| rng.gen_range(-10..=10)).collect(),
            MatrixKind::Ramp => (0..n)
                .map(|i| ((i / size + i % size) % 17) as i32)
                .collect(),
            MatrixKind::Ones => vec![1; n],
        }
    }
}
