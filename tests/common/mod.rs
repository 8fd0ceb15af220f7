use qcflow::geometry::Geometry;
use qcflow::io;
use qcflow::qcinput::QcInput;
use qcflow::qm_interface::{Execute, Result as QcResult, OUTPUT_FILE};
use qcflow::settings::Settings;
use std::path::{Path, PathBuf};

pub fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

pub fn test_atoms() -> Geometry {
    io::read_xyz(&fixtures_dir().join("test.xyz")).expect("test.xyz fixture")
}

/// Replays a pre-recorded Q-Chem output instead of running the real engine.
pub struct FixtureExecutor {
    fixture: &'static str,
}

impl FixtureExecutor {
    pub fn new(fixture: &'static str) -> Self {
        Self { fixture }
    }
}

impl Execute for FixtureExecutor {
    fn execute(&self, workdir: &Path) -> QcResult<()> {
        let src = fixtures_dir()
            .join("qchem")
            .join(format!("mol.qout.{}", self.fixture));
        std::fs::copy(&src, workdir.join(OUTPUT_FILE))?;
        Ok(())
    }
}

/// Executor for validation-error cases: the job must fail before execution.
pub struct RefusingExecutor;

impl Execute for RefusingExecutor {
    fn execute(&self, _workdir: &Path) -> QcResult<()> {
        panic!("executor invoked for a job that should have failed validation");
    }
}

pub fn test_settings(workdir: &Path) -> Settings {
    let mut settings = Settings::default();
    settings.runtime.check_convergence = false;
    settings.runtime.workdir = Some(workdir.to_path_buf());
    settings
}

/// Asserts that the gzipped input left in `workdir` is field-equal to a
/// reference fixture, with coordinates compared approximately.
pub fn assert_qcin_matches(workdir: &Path, reference: &str) {
    let generated =
        QcInput::from_file(&workdir.join("mol.qin")).expect("generated mol.qin(.gz)");
    let expected = QcInput::from_file(&fixtures_dir().join("qchem").join(reference))
        .expect("reference input fixture");
    if let Err(msg) = generated.nearly_equal(&expected, 1e-6) {
        panic!("generated input does not match {}: {}", reference, msg);
    }
}
