//! Модуль работы с ускорителем
//!
//! Содержит:
//! - Поиск платформы и устройств
//! - Загрузку бинарного образа и создание программы
//! - Выровненные host-буферы для DMA
//! - Оркестрацию запуска на всех устройствах

pub mod device;
pub mod memory;
pub mod platform;
pub mod program;

pub use device::{DeviceInfo, DeviceRun, FpgaMatrixMul, RunReport};
pub use memory::{AlignedVec, DMA_ALIGNMENT};
