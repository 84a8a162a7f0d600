//! Оркестрация вычисления на устройствах
//!
//! Вся последовательность повторяет типовой host-код для FPGA: контекст на
//! все устройства платформы, программа из одного образа, затем на каждом
//! устройстве своя очередь, свое ядро и свои буферы. Каждое устройство
//! считает полное произведение и проверяется отдельно.
//!
//! Цепочка команд на устройство строится на событиях и нигде не блокирует
//! хост до финального ожидания: две неблокирующие записи, запуск ядра со
//! списком ожидания из обеих записей, неблокирующее чтение со списком
//! ожидания из события ядра. Если постановка или ожидание обрываются
//! ошибкой, очереди сначала останавливаются, чтобы команды в полете не
//! писали в уже освобожденную память.

use super::memory::AlignedVec;
use super::platform;
use super::program;
use crate::config::HostConfig;
use crate::opencl::bindings::api;
use crate::opencl::callbacks::context_notify;
use crate::opencl::event::{wait_all, Event};
use crate::opencl::types::*;
use crate::{cl_check, cl_create};
use anyhow::{ensure, Context, Result};
use std::ffi::{c_void, CString};
use std::path::{Path, PathBuf};
use std::ptr;
use std::time::{Duration, Instant};

/// Параметры устройства для сводной таблицы
pub struct DeviceInfo {
    pub name: String,
    pub vendor: String,
    pub compute_units: cl_uint,
    pub global_mem_bytes: cl_ulong,
    pub max_work_group_size: usize,
}

/// Результат одного устройства: имя, вычисленная матрица и время ядра
pub struct DeviceRun {
    pub device_name: String,
    pub output: AlignedVec<i32>,
    pub kernel_time_ns: cl_ulong,
}

/// Итог запуска по всем устройствам
pub struct RunReport {
    pub devices: Vec<DeviceRun>,
    /// Время стены от первой отправки до завершения последнего чтения
    pub wall_time: Duration,
}

struct DeviceSlot {
    device: cl_device_id,
    name: String,
    queue: cl_command_queue,
    kernel: cl_kernel,
    a_buf: cl_mem,
    b_buf: cl_mem,
    c_buf: cl_mem,
}

/// Загруженный и готовый к запускам умножитель матриц
pub struct FpgaMatrixMul {
    context: cl_context,
    program: cl_program,
    slots: Vec<DeviceSlot>,
    platform_name: String,
    binary_path: PathBuf,
    size: usize,
    local_size: [usize; 2],
}

impl FpgaMatrixMul {
    /// Находит платформу и устройства, загружает образ и готовит очереди,
    /// ядра и буферы на каждом устройстве
    pub fn new(cfg: &HostConfig) -> Result<Self> {
        cfg.validate()?;

        let platform = platform::find_platform(&cfg.platform)?;
        let platform_name = platform::platform_name(platform)?;
        tracing::info!(
            platform = %platform_name,
            version = %platform::platform_version(platform)?,
            "платформа найдена"
        );

        let devices = platform::device_ids(platform, cfg.device_type.to_cl())?;
        tracing::info!(count = devices.len(), "устройства перечислены");

        // Группа должна помещаться в устройство; делимость глобального
        // размера проверена конфигурацией
        for (i, &device) in devices.iter().enumerate() {
            let max_wg = platform::device_max_work_group_size(device)?;
            let requested = cfg.local_work_size[0] * cfg.local_work_size[1];
            ensure!(
                requested <= max_wg,
                "рабочая группа {}x{} велика для устройства {} (максимум {})",
                cfg.local_work_size[0],
                cfg.local_work_size[1],
                i,
                max_wg
            );
        }

        let context = cl_create!(clCreateContext(
            ptr::null(),
            devices.len() as cl_uint,
            devices.as_ptr(),
            Some(context_notify),
            ptr::null_mut()
        ))?;

        let binary_path = program::resolve_binary(&cfg.binary)?;
        let binary = program::load_binary(&binary_path)?;
        tracing::info!(
            path = %binary_path.display(),
            bytes = binary.len(),
            "бинарный образ прочитан"
        );
        let prog = program::create_program(context, &devices, &binary)?;

        let kernel_name =
            CString::new(cfg.kernel.as_str()).context("имя ядра содержит нулевой байт")?;

        let bytes = cfg.elements() * std::mem::size_of::<cl_int>();
        let mut slots = Vec::with_capacity(devices.len());
        for (i, &device) in devices.iter().enumerate() {
            let name = platform::device_name(device).unwrap_or_else(|_| format!("device {i}"));
            // Профилирование включается на очереди, иначе метки времени
            // событий будут недоступны
            let queue = cl_create!(clCreateCommandQueue(
                context,
                device,
                CL_QUEUE_PROFILING_ENABLE
            ))?;
            let kernel = cl_create!(clCreateKernel(prog, kernel_name.as_ptr()))?;
            let a_buf = cl_create!(clCreateBuffer(
                context,
                CL_MEM_READ_ONLY,
                bytes,
                ptr::null_mut()
            ))?;
            let b_buf = cl_create!(clCreateBuffer(
                context,
                CL_MEM_READ_ONLY,
                bytes,
                ptr::null_mut()
            ))?;
            let c_buf = cl_create!(clCreateBuffer(
                context,
                CL_MEM_WRITE_ONLY,
                bytes,
                ptr::null_mut()
            ))?;
            tracing::debug!(device = %name, "очередь, ядро и буферы готовы");
            slots.push(DeviceSlot {
                device,
                name,
                queue,
                kernel,
                a_buf,
                b_buf,
                c_buf,
            });
        }

        Ok(Self {
            context,
            program: prog,
            slots,
            platform_name,
            binary_path,
            size: cfg.size,
            local_size: cfg.local_work_size,
        })
    }

    /// Число подготовленных устройств
    pub fn device_count(&self) -> usize {
        self.slots.len()
    }

    /// Порядок умножаемых матриц
    pub fn size(&self) -> usize {
        self.size
    }

    /// Имя выбранной платформы
    pub fn platform_name(&self) -> &str {
        &self.platform_name
    }

    /// Путь к загруженному бинарному образу
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    /// Сведения об устройствах для сводной таблицы
    pub fn device_infos(&self) -> Result<Vec<DeviceInfo>> {
        let mut infos = Vec::with_capacity(self.slots.len());
        for slot in &self.slots {
            infos.push(DeviceInfo {
                name: slot.name.clone(),
                vendor: platform::device_vendor(slot.device)?,
                compute_units: platform::device_max_compute_units(slot.device)?,
                global_mem_bytes: platform::device_global_mem_size(slot.device)?,
                max_work_group_size: platform::device_max_work_group_size(slot.device)?,
            });
        }
        Ok(infos)
    }

    /// Прогоняет умножение на каждом устройстве и возвращает результаты
    ///
    /// Матрицы отправляются на все устройства, хост ждет один раз (по
    /// событиям чтения); время ядра берется из профилировочных меток.
    pub fn run(&mut self, a: &AlignedVec<i32>, b: &AlignedVec<i32>) -> Result<RunReport> {
        let n = self.size * self.size;
        ensure!(
            a.len() == n,
            "матрица A: ожидалось {} элементов, получено {}",
            n,
            a.len()
        );
        ensure!(
            b.len() == n,
            "матрица B: ожидалось {} элементов, получено {}",
            n,
            b.len()
        );

        let mut outputs: Vec<AlignedVec<i32>> = (0..self.slots.len())
            .map(|_| AlignedVec::zeroed(n))
            .collect();

        let started = Instant::now();
        let mut kernel_events: Vec<Event> = Vec::with_capacity(self.slots.len());
        let mut read_events: Vec<Event> = Vec::with_capacity(self.slots.len());

        // Неблокирующие чтения пишут прямо в outputs, поэтому после любой
        // ошибки очереди сначала останавливаются и только потом буферы
        // уходят из области видимости
        let finished = self
            .enqueue_chains(a, b, &mut outputs, &mut kernel_events, &mut read_events)
            .and_then(|()| wait_all(&read_events));
        if let Err(err) = finished {
            self.drain_queues();
            return Err(err);
        }
        let wall_time = started.elapsed();
        drop(read_events);

        let mut devices = Vec::with_capacity(self.slots.len());
        for ((slot, out), ev_kernel) in self.slots.iter().zip(outputs).zip(&kernel_events) {
            let kernel_time_ns = ev_kernel
                .duration_ns()
                .with_context(|| format!("профилирование ядра на {}", slot.name))?;
            devices.push(DeviceRun {
                device_name: slot.name.clone(),
                output: out,
                kernel_time_ns,
            });
        }

        Ok(RunReport { devices, wall_time })
    }

    // Ставит на очередь каждого устройства обе записи, запуск ядра и
    // чтение в соответствующий буфер outputs
    fn enqueue_chains(
        &self,
        a: &AlignedVec<i32>,
        b: &AlignedVec<i32>,
        outputs: &mut [AlignedVec<i32>],
        kernel_events: &mut Vec<Event>,
        read_events: &mut Vec<Event>,
    ) -> Result<()> {
        let global = [self.size, self.size];
        let local = self.local_size;

        for (slot, out) in self.slots.iter().zip(outputs.iter_mut()) {
            // Неблокирующая отправка обеих входных матриц
            let mut raw_a: cl_event = ptr::null_mut();
            cl_check!(clEnqueueWriteBuffer(
                slot.queue,
                slot.a_buf,
                CL_FALSE,
                0,
                a.byte_len(),
                a.as_ptr() as *const c_void,
                0,
                ptr::null(),
                &mut raw_a
            ))?;
            let ev_a = Event::from_raw(raw_a);

            let mut raw_b: cl_event = ptr::null_mut();
            cl_check!(clEnqueueWriteBuffer(
                slot.queue,
                slot.b_buf,
                CL_FALSE,
                0,
                b.byte_len(),
                b.as_ptr() as *const c_void,
                0,
                ptr::null(),
                &mut raw_b
            ))?;
            let ev_b = Event::from_raw(raw_b);

            // Аргументы ядра: порядок фиксирован образом
            let rows_a = self.size as cl_int;
            let cols_b = self.size as cl_int;
            cl_check!(clSetKernelArg(
                slot.kernel,
                0,
                std::mem::size_of::<cl_int>(),
                &rows_a as *const cl_int as *const c_void
            ))?;
            cl_check!(clSetKernelArg(
                slot.kernel,
                1,
                std::mem::size_of::<cl_int>(),
                &cols_b as *const cl_int as *const c_void
            ))?;
            cl_check!(clSetKernelArg(
                slot.kernel,
                2,
                std::mem::size_of::<cl_mem>(),
                &slot.a_buf as *const cl_mem as *const c_void
            ))?;
            cl_check!(clSetKernelArg(
                slot.kernel,
                3,
                std::mem::size_of::<cl_mem>(),
                &slot.b_buf as *const cl_mem as *const c_void
            ))?;
            cl_check!(clSetKernelArg(
                slot.kernel,
                4,
                std::mem::size_of::<cl_mem>(),
                &slot.c_buf as *const cl_mem as *const c_void
            ))?;

            // Запуск ядра ждет завершения обеих записей
            let write_list = [ev_a.raw(), ev_b.raw()];
            let mut raw_kernel: cl_event = ptr::null_mut();
            cl_check!(clEnqueueNDRangeKernel(
                slot.queue,
                slot.kernel,
                2,
                ptr::null(),
                global.as_ptr(),
                local.as_ptr(),
                write_list.len() as cl_uint,
                write_list.as_ptr(),
                &mut raw_kernel
            ))?;
            let ev_kernel = Event::from_raw(raw_kernel);

            // Чтение результата ждет завершения ядра
            let kernel_list = [ev_kernel.raw()];
            let mut raw_read: cl_event = ptr::null_mut();
            cl_check!(clEnqueueReadBuffer(
                slot.queue,
                slot.c_buf,
                CL_FALSE,
                0,
                out.byte_len(),
                out.as_mut_ptr() as *mut c_void,
                kernel_list.len() as cl_uint,
                kernel_list.as_ptr(),
                &mut raw_read
            ))?;

            tracing::debug!(device = %slot.name, "команды поставлены в очередь");
            kernel_events.push(ev_kernel);
            read_events.push(Event::from_raw(raw_read));

            // ev_a и ev_b освобождаются при выходе из итерации: ядро уже
            // в очереди, и рантайм держит собственные ссылки на события
        }
        Ok(())
    }

    // Останавливает все очереди, не глядя на статусы; вызывается на пути
    // ошибки, когда часть команд могла остаться в полете
    fn drain_queues(&self) {
        let Ok(api) = api() else { return };
        for slot in &self.slots {
            unsafe {
                (api.clFinish)(slot.queue);
            }
        }
    }
}

impl Drop for FpgaMatrixMul {
    fn drop(&mut self) {
        let Ok(api) = api() else { return };
        unsafe {
            for slot in &self.slots {
                (api.clReleaseMemObject)(slot.a_buf);
                (api.clReleaseMemObject)(slot.b_buf);
                (api.clReleaseMemObject)(slot.c_buf);
                (api.clReleaseKernel)(slot.kernel);
                (api.clReleaseCommandQueue)(slot.queue);
            }
            (api.clReleaseProgram)(self.program);
            (api.clReleaseContext)(self.context);
        }
    }
}

// Сценарии гоняются на рантайм-заглушке с двумя устройствами, без
// libOpenCL и без образа; настоящее устройство проверяет tests/fpga_smoke.rs
#[cfg(test)]
mod tests {
    use super::*;
    use crate::opencl::bindings::stub;

    fn stub_config(dir: &Path) -> HostConfig {
        let image = dir.join("stub_kernel.aocx");
        std::fs::write(&image, b"stub-image").unwrap();
        HostConfig {
            size: 4,
            platform: "Stub".into(),
            binary: image,
            ..HostConfig::default()
        }
    }

    #[test]
    fn run_chains_commands_and_collects_results() {
        let _guard = stub::setup();
        let dir = tempfile::tempdir().unwrap();
        let cfg = stub_config(dir.path());

        let mut engine = FpgaMatrixMul::new(&cfg).unwrap();
        assert_eq!(engine.device_count(), 2);
        assert_eq!(engine.platform_name(), "Stub OpenCL Platform");
        // На каждом устройстве три буфера под полную матрицу
        let bytes = cfg.elements() * std::mem::size_of::<cl_int>();
        assert_eq!(stub::buffer_sizes(), vec![bytes; 6]);

        let a = AlignedVec::from_slice(&[1i32; 16]);
        let b = AlignedVec::from_slice(&[1i32; 16]);
        let report = engine.run(&a, &b).unwrap();

        assert_eq!(report.devices.len(), 2);
        let names: Vec<&str> = report
            .devices
            .iter()
            .map(|dev| dev.device_name.as_str())
            .collect();
        assert_eq!(names, ["stub-accel-0", "stub-accel-1"]);
        for dev in &report.devices {
            assert_eq!(
                dev.kernel_time_ns,
                stub::KERNEL_END_NS - stub::KERNEL_START_NS
            );
            assert!(dev.output.iter().all(|&x| x == stub::READ_FILL));
        }

        // Ядро ждет обе записи, а чтение ждет событие ядра
        assert_eq!(stub::kernel_wait_lists(), vec![2, 2]);
        assert_eq!(stub::read_wait_lists(), vec![1, 1]);
        assert_eq!(stub::wait_calls(), 1);
        assert!(stub::finished_queues().is_empty());
        assert_eq!(stub::released_events(), stub::created_events());

        drop(engine);
        assert_eq!(stub::released_mem(), stub::created_buffers());
    }

    #[test]
    fn failed_enqueue_drains_queues_before_outputs_drop() {
        let _guard = stub::setup();
        let dir = tempfile::tempdir().unwrap();
        let cfg = stub_config(dir.path());

        let mut engine = FpgaMatrixMul::new(&cfg).unwrap();
        let a = AlignedVec::from_slice(&[1i32; 16]);
        let b = AlignedVec::from_slice(&[1i32; 16]);

        // Первая запись второго устройства; у первого к этому моменту вся
        // цепочка уже стоит в очереди и целится в локальные буферы run
        stub::fail_write_at(3);
        let err = match engine.run(&a, &b) {
            Ok(_) => panic!("ожидалась ошибка постановки в очередь"),
            Err(e) => e,
        };
        assert!(err.to_string().contains("clEnqueueWriteBuffer"));

        // Обе очереди остановлены до возврата ошибки, пока буферы
        // результата еще живы
        let drained = stub::finished_queues();
        assert_eq!(drained.len(), 2);
        assert_ne!(drained[0], drained[1]);
        assert_eq!(stub::wait_calls(), 0);
        assert_eq!(stub::released_events(), stub::created_events());
    }

    #[test]
    fn failed_wait_drains_queues_before_outputs_drop() {
        let _guard = stub::setup();
        let dir = tempfile::tempdir().unwrap();
        let cfg = stub_config(dir.path());

        let mut engine = FpgaMatrixMul::new(&cfg).unwrap();
        let a = AlignedVec::from_slice(&[1i32; 16]);
        let b = AlignedVec::from_slice(&[1i32; 16]);

        // Все цепочки стоят в очередях, а само ожидание возвращает ошибку
        stub::fail_wait(true);
        let err = match engine.run(&a, &b) {
            Ok(_) => panic!("ожидалась ошибка ожидания событий"),
            Err(e) => e,
        };
        assert!(err.to_string().contains("clWaitForEvents"));

        let drained = stub::finished_queues();
        assert_eq!(drained.len(), 2);
        assert_eq!(stub::released_events(), stub::created_events());
    }
}
