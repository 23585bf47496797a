//! OFF mesh format.
//!
//! ```text
//! OFF
//! <vertex count> <face count> 0
//! x y z            (one line per vertex, 5 decimal places)
//! 3 i j k          (one line per face, 0-based)
//! ```

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{GiCoreError, Result};
use crate::mesh::TriangleMesh;

/// Counts reported after writing an OFF file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffStats {
    /// Vertex lines written.
    pub vertex_count: usize,
    /// Face lines written.
    pub face_count: usize,
}

/// Write a mesh as OFF text.
pub fn write_off<W: Write>(mesh: &TriangleMesh, writer: &mut W) -> Result<OffStats> {
    writeln!(writer, "OFF")?;
    writeln!(writer, "{} {} 0", mesh.vertex_count(), mesh.face_count())?;

    for v in mesh.vertices() {
        writeln!(writer, "{:.5} {:.5} {:.5}", v[0], v[1], v[2])?;
    }
    for f in mesh.faces() {
        writeln!(writer, "3 {} {} {}", f[0], f[1], f[2])?;
    }

    Ok(OffStats {
        vertex_count: mesh.vertex_count(),
        face_count: mesh.face_count(),
    })
}

/// Write a mesh to an OFF file, creating or truncating it.
pub fn write_off_file<P: AsRef<Path>>(mesh: &TriangleMesh, path: P) -> Result<OffStats> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    let stats = write_off(mesh, &mut writer)?;
    writer.flush()?;

    log::info!(
        "Wrote {} ({} vertices, {} faces)",
        path.display(),
        stats.vertex_count,
        stats.face_count
    );
    Ok(stats)
}

/// Parse OFF text into a mesh.
///
/// Blank lines and `#` comments are ignored. Only triangular faces are
/// accepted.
pub fn parse_off(text: &str) -> Result<TriangleMesh> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.split('#').next().unwrap_or("").trim()))
        .filter(|(_, l)| !l.is_empty());

    let malformed = |line: usize, message: &str| GiCoreError::MalformedOff {
        line,
        message: message.to_string(),
    };

    match lines.next() {
        Some((_, "OFF")) => {}
        Some((line, _)) => return Err(malformed(line, "expected OFF header")),
        None => return Err(malformed(0, "empty input")),
    }

    let (line, counts) = lines
        .next()
        .ok_or_else(|| malformed(0, "missing element counts"))?;
    let counts = parse_fields::<usize>(counts).ok_or_else(|| malformed(line, "invalid counts"))?;
    let (vertex_count, face_count) = match counts.as_slice() {
        [v, f, ..] => (*v, *f),
        _ => return Err(malformed(line, "expected vertex and face counts")),
    };

    let mut vertices = Vec::with_capacity(vertex_count);
    for _ in 0..vertex_count {
        let (line, text) = lines
            .next()
            .ok_or_else(|| malformed(0, "unexpected end of vertex block"))?;
        match parse_fields::<f32>(text).as_deref() {
            Some([x, y, z]) => vertices.push([*x, *y, *z]),
            _ => return Err(malformed(line, "expected three coordinates")),
        }
    }

    let mut faces = Vec::with_capacity(face_count);
    for _ in 0..face_count {
        let (line, text) = lines
            .next()
            .ok_or_else(|| malformed(0, "unexpected end of face block"))?;
        match parse_fields::<usize>(text).as_deref() {
            Some([3, i, j, k]) => faces.push([*i, *j, *k]),
            _ => return Err(malformed(line, "expected a triangle `3 i j k`")),
        }
    }

    TriangleMesh::new(vertices, faces)
}

/// Read and parse an OFF file.
pub fn read_off_file<P: AsRef<Path>>(path: P) -> Result<TriangleMesh> {
    let text = std::fs::read_to_string(path)?;
    parse_off(&text)
}

fn parse_fields<T: std::str::FromStr>(line: &str) -> Option<Vec<T>> {
    line.split_whitespace().map(|t| t.parse().ok()).collect()
}
