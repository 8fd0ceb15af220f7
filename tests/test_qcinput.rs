use qcflow::qcinput::QcInput;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("qchem")
        .join(name)
}

#[test]
fn test_parse_reference_input() {
    let input = QcInput::from_file(&fixture("mol.qin.intermediate")).unwrap();

    assert_eq!(input.molecule.charge, -1);
    assert_eq!(input.molecule.spin_multiplicity, 2);
    assert_eq!(input.molecule.geometry.num_atoms, 14);
    assert_eq!(input.molecule.geometry.formula_alphabetical(), "C4 H4 O6");

    assert_eq!(input.rem.get("job_type").unwrap(), "force");
    assert_eq!(input.rem.get("method").unwrap(), "b97mv");
    assert_eq!(input.rem.get("basis").unwrap(), "def2-svpd");
    assert_eq!(input.rem.get("solvent_method").unwrap(), "pcm");
    assert_eq!(input.pcm.get("theory").unwrap(), "cpcm");
    assert_eq!(input.solvent.get("dielectric").unwrap(), "3");
    assert!(input.smx.is_empty());
}

#[test]
fn test_gas_phase_reference_has_no_solvation() {
    let input = QcInput::from_file(&fixture("mol.qin.basic")).unwrap();
    assert!(input.rem.get("solvent_method").is_none());
    assert!(input.pcm.is_empty());
    assert!(input.solvent.is_empty());
}

#[test]
fn test_gzip_round_trip_preserves_fields() {
    let input = QcInput::from_file(&fixture("mol.qin.alternate")).unwrap();
    let dir = TempDir::new().unwrap();
    let gz = dir.path().join("mol.qin.gz");
    input.write_gzip(&gz).unwrap();

    // Read back through the plain-path fallback, as the recipes' callers do.
    let read_back = QcInput::from_file(&dir.path().join("mol.qin")).unwrap();
    read_back.nearly_equal(&input, 1e-9).unwrap();
    assert_eq!(read_back.rem.get("mem_total").unwrap(), "170000");
}

#[test]
fn test_reference_inputs_differ_only_in_geometry() {
    let static_in = QcInput::from_file(&fixture("mol.qin.basic")).unwrap();
    let stepped = QcInput::from_file(&fixture("mol.qin.basic.opt_iter1")).unwrap();

    // Same chemistry settings...
    assert_eq!(static_in.rem, stepped.rem);
    assert_eq!(static_in.molecule.charge, stepped.molecule.charge);
    // ...but the relaxed structure has moved.
    assert!(static_in.nearly_equal(&stepped, 1e-6).is_err());
    assert!(
        static_in
            .molecule
            .geometry
            .max_atom_distance(&stepped.molecule.geometry)
            > 1e-3
    );
}
