//! Модуль для работы с OpenCL
//!
//! Содержит привязки, загружаемые во время выполнения, типы, ошибки
//! и обертки над событиями.

pub mod bindings;
pub mod callbacks;
pub mod error;
pub mod event;
pub mod types;

pub use bindings::{api, OpenClApi, OPENCL_LIBRARY_ENV};
pub use error::{cl_error_name, ClError};
pub use event::{wait_all, Event};
