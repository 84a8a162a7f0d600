//! Вспомогательные функции и утилиты

use std::time::{Duration, Instant};

/// Измеряет время выполнения функции
pub fn measure_time<F, T>(f: F) -> (T, Duration)
where
    F: FnOnce() -> T,
{
    let start = Instant::now();
    let result = f();
    let duration = start.elapsed();
    (result, duration)
}

/// Длительность в миллисекундах с тремя знаками
pub fn format_ms(duration: Duration) -> String {
    format!("{:.3} ms", duration.as_secs_f64() * 1e3)
}

/// Наносекунды профилирования в миллисекунды
pub fn ns_to_ms(ns: u64) -> f64 {
    ns as f64 * 1e-6
}

/// Человекочитаемый объем памяти
pub fn format_bytes(bytes: u64) -> String {
    const GIB: f64 = 1024.0 * 1024.0 * 1024.0;
    const MIB: f64 = 1024.0 * 1024.0;
    let b = bytes as f64;
    if b >= GIB {
        format!("{:.1} GiB", b / GIB)
    } else if b >= MIB {
        format!("{:.1} MiB", b / MIB)
    } else {
        format!("{bytes} B")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measure_time_returns_closure_result() {
        let (value, duration) = measure_time(|| 21 * 2);
        assert_eq!(value, 42);
        assert!(duration.as_secs() < 60);
    }

    #[test]
    fn milliseconds_have_three_digits() {
        assert_eq!(format_ms(Duration::from_millis(1500)), "1500.000 ms");
        assert_eq!(format_ms(Duration::from_micros(1234)), "1.234 ms");
    }

    #[test]
    fn profiling_ns_converts_to_ms() {
        assert_eq!(ns_to_ms(1_000_000), 1.0);
        assert_eq!(ns_to_ms(2_500_000), 2.5);
    }

    #[test]
    fn byte_sizes_pick_sensible_units() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(8 * 1024 * 1024), "8.0 MiB");
        assert_eq!(format_bytes(4 * 1024 * 1024 * 1024), "4.0 GiB");
    }
}
