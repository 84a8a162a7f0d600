//! Сквозные host-тесты без устройства
//!
//! Прогоняют всю цепочку, доступную без FPGA: генерация матриц, файловый
//! ввод-вывод, выровненные буферы, опорное умножение и проверка.

use opencl_fpga::config::HostConfig;
use opencl_fpga::fpga::{AlignedVec, DMA_ALIGNMENT};
use opencl_fpga::matrix::{
    read_matrix, reference_multiply, verify_results, write_matrix, MatrixKind,
};

#[test]
fn generated_matrices_survive_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let size = 16;
    let path_a = dir.path().join("Matrix1.txt");
    let path_b = dir.path().join("Matrix2.txt");

    let a = MatrixKind::Random.generate(size);
    let b = MatrixKind::Ramp.generate(size);
    write_matrix(&path_a, &a, size).unwrap();
    write_matrix(&path_b, &b, size).unwrap();

    assert_eq!(read_matrix(&path_a, size).unwrap(), a);
    assert_eq!(read_matrix(&path_b, size).unwrap(), b);
}

#[test]
fn host_pipeline_passes_verification() {
    let dir = tempfile::tempdir().unwrap();
    let size = 12;
    let path_a = dir.path().join("Matrix1.txt");
    let path_b = dir.path().join("Matrix2.txt");
    write_matrix(&path_a, &MatrixKind::Random.generate(size), size).unwrap();
    write_matrix(&path_b, &MatrixKind::Random.generate(size), size).unwrap();

    // Тот же путь данных, что у главной программы, вплоть до запуска ядра
    let a = AlignedVec::from_slice(&read_matrix(&path_a, size).unwrap());
    let b = AlignedVec::from_slice(&read_matrix(&path_b, size).unwrap());
    assert_eq!(a.as_ptr() as usize % DMA_ALIGNMENT, 0);
    assert_eq!(b.as_ptr() as usize % DMA_ALIGNMENT, 0);

    let expected = reference_multiply(&a, &b, size);
    let report = verify_results(&expected, &expected, size);
    assert!(report.passed());
    assert_eq!(report.total, size * size);
}

#[test]
fn corrupted_device_output_is_caught() {
    let size = 8;
    let a = MatrixKind::Random.generate(size);
    let b = MatrixKind::Random.generate(size);
    let expected = reference_multiply(&a, &b, size);

    let mut corrupted = expected.clone();
    corrupted[size + 3] = corrupted[size + 3].wrapping_add(1);

    let report = verify_results(&corrupted, &expected, size);
    assert!(!report.passed());
    assert_eq!(report.mismatches, 1);
    let m = report.first_mismatch.unwrap();
    assert_eq!((m.row, m.col), (1, 3));
}

#[test]
fn config_file_drives_the_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let size = 4;
    let path_a = dir.path().join("a.txt");
    let path_b = dir.path().join("b.txt");
    write_matrix(&path_a, &MatrixKind::Ones.generate(size), size).unwrap();
    write_matrix(&path_b, &MatrixKind::Ones.generate(size), size).unwrap();

    let config_path = dir.path().join("host.json");
    let config_json = serde_json::json!({
        "size": size,
        "matrix_a": path_a,
        "matrix_b": path_b,
        "local_work_size": [2, 2],
    });
    std::fs::write(&config_path, config_json.to_string()).unwrap();

    let cfg = HostConfig::from_file(&config_path).unwrap();
    cfg.validate().unwrap();
    assert_eq!(cfg.size, size);

    let a = read_matrix(&cfg.matrix_a, cfg.size).unwrap();
    let b = read_matrix(&cfg.matrix_b, cfg.size).unwrap();
    let c = reference_multiply(&a, &b, cfg.size);
    // Произведение двух матриц из единиц состоит из значения size
    assert!(c.iter().all(|&x| x == size as i32));
}
