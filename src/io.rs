//! File I/O utilities for geometries and compressed calculation files.
//!
//! This module provides XYZ geometry reading/writing and the gzip helpers
//! used for calculation artifacts. Q-Chem working directories conventionally
//! hold gzipped inputs after a run (`mol.qin.gz`), so readers here accept
//! either a plain path or its `.gz` sibling.

use crate::geometry::Geometry;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{Read, Result, Write};
use std::path::{Path, PathBuf};

/// Writes a molecular geometry to an XYZ file.
///
/// The XYZ format consists of the atom count, a comment line (empty here),
/// and one `Element X Y Z` line per atom.
pub fn write_xyz(geom: &Geometry, path: &Path) -> Result<()> {
    let mut content = format!("{}\n\n", geom.num_atoms);

    for i in 0..geom.num_atoms {
        let coords = geom.get_atom_coords(i);
        content.push_str(&format!(
            "{}  {:.8}  {:.8}  {:.8}\n",
            geom.elements[i], coords[0], coords[1], coords[2]
        ));
    }

    std::fs::write(path, content)
}

/// Reads a molecular geometry from an XYZ file.
pub fn read_xyz(path: &Path) -> Result<Geometry> {
    let content = read_to_string_auto(path)?;
    let lines: Vec<&str> = content.lines().collect();
    if lines.len() < 2 {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("{}: not a valid XYZ file", path.display()),
        ));
    }

    let num_atoms: usize = lines[0].trim().parse().map_err(|_| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("{}: cannot parse atom count", path.display()),
        )
    })?;

    let mut elements = Vec::with_capacity(num_atoms);
    let mut coords = Vec::with_capacity(num_atoms * 3);
    for i in 2..2 + num_atoms {
        let line = lines.get(i).ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("{}: incomplete geometry", path.display()),
            )
        })?;
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 4 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("{}: malformed atom line: {}", path.display(), line),
            ));
        }
        elements.push(parts[0].to_string());
        for part in &parts[1..4] {
            coords.push(part.parse::<f64>().map_err(|_| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("{}: malformed coordinate: {}", path.display(), part),
                )
            })?);
        }
    }

    Ok(Geometry::new(elements, coords))
}

/// Resolve a path to itself or its gzipped sibling.
///
/// Returns `path` if it exists, otherwise `path.gz` if that exists, otherwise
/// the original path (so the caller surfaces a normal not-found error).
pub fn zpath(path: &Path) -> PathBuf {
    if path.exists() {
        return path.to_path_buf();
    }
    let mut gz = path.as_os_str().to_owned();
    gz.push(".gz");
    let gz = PathBuf::from(gz);
    if gz.exists() {
        gz
    } else {
        path.to_path_buf()
    }
}

/// Reads a file to a string, transparently decompressing `.gz` files.
///
/// If `path` does not exist, its `.gz` sibling is tried before failing.
pub fn read_to_string_auto(path: &Path) -> Result<String> {
    let resolved = zpath(path);
    let mut file = File::open(&resolved)?;
    let mut content = String::new();
    if resolved.extension().map(|e| e == "gz").unwrap_or(false) {
        let mut decoder = GzDecoder::new(file);
        decoder.read_to_string(&mut content)?;
    } else {
        file.read_to_string(&mut content)?;
    }
    Ok(content)
}

/// Writes a string to a gzip-compressed file.
pub fn write_gzip(path: &Path, content: &str) -> Result<()> {
    let file = File::create(path)?;
    let mut encoder = GzEncoder::new(file, Compression::default());
    encoder.write_all(content.as_bytes())?;
    encoder.finish()?;
    Ok(())
}
