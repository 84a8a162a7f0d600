//! Обертка над событиями OpenCL
//!
//! Событие берется во владение сразу после enqueue-вызова и освобождается
//! в `Drop`, так что утечек не бывает и на ранних выходах по ошибке.

use super::bindings::api;
use super::types::*;
use anyhow::Result;
use std::ffi::c_void;
use std::ptr;

use crate::cl_check;

/// Событие очереди команд, владеющее своим хэндлом
#[repr(transparent)]
pub struct Event(cl_event);

impl Event {
    /// Забирает во владение хэндл, полученный от enqueue-вызова
    pub fn from_raw(raw: cl_event) -> Self {
        Event(raw)
    }

    /// Сырой хэндл для списков ожидания
    pub fn raw(&self) -> cl_event {
        self.0
    }

    /// Метки начала и конца выполнения команды в наносекундах
    ///
    /// Очередь должна быть создана с `CL_QUEUE_PROFILING_ENABLE`, а
    /// команда завершена, иначе драйвер вернет
    /// `CL_PROFILING_INFO_NOT_AVAILABLE`.
    pub fn start_end_ns(&self) -> Result<(cl_ulong, cl_ulong)> {
        let mut start: cl_ulong = 0;
        let mut end: cl_ulong = 0;
        cl_check!(clGetEventProfilingInfo(
            self.0,
            CL_PROFILING_COMMAND_START,
            std::mem::size_of::<cl_ulong>(),
            &mut start as *mut cl_ulong as *mut c_void,
            ptr::null_mut()
        ))?;
        cl_check!(clGetEventProfilingInfo(
            self.0,
            CL_PROFILING_COMMAND_END,
            std::mem::size_of::<cl_ulong>(),
            &mut end as *mut cl_ulong as *mut c_void,
            ptr::null_mut()
        ))?;
        Ok((start, end))
    }

    /// Длительность команды по счетчику устройства
    pub fn duration_ns(&self) -> Result<cl_ulong> {
        let (start, end) = self.start_end_ns()?;
        Ok(end.saturating_sub(start))
    }
}

impl Drop for Event {
    fn drop(&mut self) {
        if self.0.is_null() {
            return;
        }
        // К этому моменту таблица уже загружена: хэндл получен через нее
        if let Ok(api) = api() {
            unsafe {
                (api.clReleaseEvent)(self.0);
            }
        }
    }
}

/// Блокирует выполнение до завершения всех событий списка
pub fn wait_all(events: &[Event]) -> Result<()> {
    if events.is_empty() {
        return Ok(());
    }
    // repr(transparent): срез Event совпадает по памяти со срезом cl_event
    cl_check!(clWaitForEvents(
        events.len() as cl_uint,
        events.as_ptr() as *const cl_event
    ))?;
    Ok(())
}
