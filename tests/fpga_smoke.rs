//! Дымовой тест на реальном устройстве
//!
//! Требует работающую платформу OpenCL и бинарный образ `matrix_mul.aocx`
//! в рабочем каталоге, поэтому по умолчанию пропускается:
//! `cargo test -- --ignored` на машине с ускорителем.

use opencl_fpga::config::HostConfig;
use opencl_fpga::fpga::{AlignedVec, FpgaMatrixMul};
use opencl_fpga::matrix::{reference_multiply, verify_results, MatrixKind};

#[test]
#[ignore = "нужны устройство OpenCL и образ matrix_mul.aocx"]
fn full_pipeline_on_hardware() {
    let cfg = HostConfig {
        size: 64,
        ..HostConfig::default()
    };
    cfg.validate().unwrap();

    let mut engine = FpgaMatrixMul::new(&cfg).unwrap();
    assert!(engine.device_count() > 0);

    let a = AlignedVec::from_slice(&MatrixKind::Random.generate(cfg.size));
    let b = AlignedVec::from_slice(&MatrixKind::Random.generate(cfg.size));
    let report = engine.run(&a, &b).unwrap();
    assert_eq!(report.devices.len(), engine.device_count());

    let expected = reference_multiply(&a, &b, cfg.size);
    for run in &report.devices {
        let verdict = verify_results(&run.output, &expected, cfg.size);
        assert!(
            verdict.passed(),
            "{}: {} расхождений",
            run.device_name,
            verdict.mismatches
        );
    }
}
