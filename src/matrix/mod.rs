//! Модуль для работы с матрицами
//!
//! Предоставляет:
//! - Виды заполнения генерируемых матриц
//! - Текстовый ввод-вывод
//! - Опорное умножение и проверку результатов

mod types;
pub mod io;
pub mod operations;

pub use io::{read_matrix, write_matrix};
pub use operations::{reference_multiply, verify_results, Mismatch, VerifyReport};
pub use types::MatrixKind;
