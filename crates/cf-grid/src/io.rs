//! Binary persistence for [`CubicLagrangeGrid`].
//!
//! All values are little endian:
//!
//! ```text
//! magic        8 bytes   "CFLGRID\0"
//! version      u32       1
//! min          3 x f64
//! max          3 x f64
//! resolution   3 x u32
//! field_count  u32
//! per field:
//!   node_count       u64,  node_count x f64
//!   set_cell_count   u64,  set_cell_count x 32 x u32
//!   cell_map_len     u64,  cell_map_len x u32   (u32::MAX = unset)
//! ```
//!
//! Writing a loaded grid reproduces the input byte for byte.

use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;

use nalgebra::Point3;
use tracing::info;

use crate::domain::GridDomain;
use crate::error::{GridError, GridResult};
use crate::field::{Field, UNSET};
use crate::grid::CubicLagrangeGrid;
use crate::lagrange::NODE_COUNT;

/// File signature.
pub const MAGIC: [u8; 8] = *b"CFLGRID\0";

/// Format version written by this build.
pub const FORMAT_VERSION: u32 = 1;

/// Upper bound on speculative allocation from untrusted counts.
const MAX_PREALLOC: usize = 1 << 20;

impl CubicLagrangeGrid {
    /// Writes the grid to a file.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::Io`] if the file cannot be created or written.
    /// The file contents are unspecified after a failed write.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> GridResult<()> {
        let path = path.as_ref();
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.write_to(&mut writer)?;
        writer.flush()?;

        info!(
            path = %path.display(),
            fields = self.fields.len(),
            cells = self.domain.n_cells(),
            "Saved grid"
        );
        Ok(())
    }

    /// Reads a grid from a file written by [`save`](Self::save).
    ///
    /// # Errors
    ///
    /// Returns [`GridError::Io`] if the file cannot be read, and a format
    /// error if its contents are not a valid grid.
    pub fn load<P: AsRef<Path>>(path: P) -> GridResult<Self> {
        let path = path.as_ref();
        let mut reader = BufReader::new(File::open(path)?);
        let grid = Self::read_from(&mut reader)?;

        info!(
            path = %path.display(),
            fields = grid.fields.len(),
            cells = grid.domain.n_cells(),
            "Loaded grid"
        );
        Ok(grid)
    }

    /// Serializes the grid into any writer.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::Io`] if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> GridResult<()> {
        writer.write_all(&MAGIC)?;
        write_u32(writer, FORMAT_VERSION)?;

        let (min, max) = (self.domain.min(), self.domain.max());
        for v in min.iter().chain(max.iter()) {
            write_f64(writer, *v)?;
        }
        for r in self.domain.resolution() {
            write_u32(writer, r)?;
        }

        write_u32(writer, len_u32(self.fields.len()))?;
        for field in &self.fields {
            write_u64(writer, field.nodes.len() as u64)?;
            for &v in &field.nodes {
                write_f64(writer, v)?;
            }

            write_u64(writer, field.cells.len() as u64)?;
            for cell in &field.cells {
                for &i in cell {
                    write_u32(writer, i)?;
                }
            }

            write_u64(writer, field.cell_map.len() as u64)?;
            for &slot in &field.cell_map {
                write_u32(writer, slot)?;
            }
        }

        Ok(())
    }

    /// Deserializes a grid from any reader.
    ///
    /// # Errors
    ///
    /// - [`GridError::InvalidFormat`] if the magic bytes are wrong
    /// - [`GridError::VersionMismatch`] for another format version
    /// - [`GridError::GeometryMismatch`] if a cell map does not match the grid
    /// - [`GridError::CorruptData`] for truncated or inconsistent data
    /// - [`GridError::Io`] for other read failures
    pub fn read_from<R: Read>(reader: &mut R) -> GridResult<Self> {
        let mut magic = [0_u8; 8];
        read_exact(reader, &mut magic, "magic")?;
        if magic != MAGIC {
            return Err(GridError::InvalidFormat(format!(
                "bad magic bytes {magic:?}"
            )));
        }

        let version = read_u32(reader)?;
        if version != FORMAT_VERSION {
            return Err(GridError::VersionMismatch {
                expected: FORMAT_VERSION,
                found: version,
            });
        }

        let min = Point3::new(read_f64(reader)?, read_f64(reader)?, read_f64(reader)?);
        let max = Point3::new(read_f64(reader)?, read_f64(reader)?, read_f64(reader)?);
        let resolution = [read_u32(reader)?, read_u32(reader)?, read_u32(reader)?];
        let domain = GridDomain::new(min, max, resolution)
            .map_err(|e| GridError::CorruptData(format!("stored domain: {e}")))?;

        let field_count = read_u32(reader)?;
        let mut grid = Self::from_domain(domain);
        for _ in 0..field_count {
            grid.fields.push(read_field(reader, &domain)?);
        }

        Ok(grid)
    }
}

fn read_field<R: Read>(reader: &mut R, domain: &GridDomain) -> GridResult<Field> {
    let n_nodes = read_count(reader)?;
    if n_nodes > domain.n_nodes() {
        return Err(GridError::CorruptData(format!(
            "{n_nodes} coefficients for a grid with {} nodes",
            domain.n_nodes()
        )));
    }
    let mut nodes = Vec::with_capacity(n_nodes.min(MAX_PREALLOC));
    for _ in 0..n_nodes {
        nodes.push(read_f64(reader)?);
    }

    let n_set = read_count(reader)?;
    if n_set > domain.n_cells() {
        return Err(GridError::CorruptData(format!(
            "{n_set} set cells for a grid with {} cells",
            domain.n_cells()
        )));
    }
    let mut cells = Vec::with_capacity(n_set.min(MAX_PREALLOC));
    for _ in 0..n_set {
        let mut cell = [0_u32; NODE_COUNT];
        for index in &mut cell {
            *index = read_u32(reader)?;
            if *index as usize >= n_nodes {
                return Err(GridError::CorruptData(format!(
                    "node index {index} out of range for {n_nodes} coefficients"
                )));
            }
        }
        cells.push(cell);
    }

    let map_len = read_count(reader)?;
    if map_len != domain.n_cells() {
        return Err(GridError::GeometryMismatch {
            what: "cell map length",
            expected: domain.n_cells() as u64,
            found: map_len as u64,
        });
    }
    let mut cell_map = Vec::with_capacity(map_len);
    let mut referenced = vec![false; n_set];
    for _ in 0..map_len {
        let slot = read_u32(reader)?;
        if slot != UNSET {
            match referenced.get_mut(slot as usize) {
                Some(seen) if !*seen => *seen = true,
                _ => {
                    return Err(GridError::CorruptData(format!(
                        "cell slot {slot} is out of range or used twice"
                    )));
                }
            }
        }
        cell_map.push(slot);
    }
    if referenced.iter().any(|seen| !seen) {
        return Err(GridError::CorruptData(
            "set cell not referenced by the cell map".to_string(),
        ));
    }

    Ok(Field {
        nodes,
        cells,
        cell_map,
    })
}

fn read_exact<R: Read>(reader: &mut R, buf: &mut [u8], what: &str) -> GridResult<()> {
    reader.read_exact(buf).map_err(|e| {
        if e.kind() == ErrorKind::UnexpectedEof {
            GridError::CorruptData(format!("unexpected end of data reading {what}"))
        } else {
            GridError::Io(e)
        }
    })
}

fn read_u32<R: Read>(reader: &mut R) -> GridResult<u32> {
    let mut buf = [0_u8; 4];
    read_exact(reader, &mut buf, "u32")?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64<R: Read>(reader: &mut R) -> GridResult<u64> {
    let mut buf = [0_u8; 8];
    read_exact(reader, &mut buf, "u64")?;
    Ok(u64::from_le_bytes(buf))
}

fn read_f64<R: Read>(reader: &mut R) -> GridResult<f64> {
    let mut buf = [0_u8; 8];
    read_exact(reader, &mut buf, "f64")?;
    Ok(f64::from_le_bytes(buf))
}

fn read_count<R: Read>(reader: &mut R) -> GridResult<usize> {
    let count = read_u64(reader)?;
    usize::try_from(count)
        .map_err(|_| GridError::CorruptData(format!("count {count} does not fit in memory")))
}

fn write_u32<W: Write>(writer: &mut W, v: u32) -> GridResult<()> {
    writer.write_all(&v.to_le_bytes())?;
    Ok(())
}

fn write_u64<W: Write>(writer: &mut W, v: u64) -> GridResult<()> {
    writer.write_all(&v.to_le_bytes())?;
    Ok(())
}

fn write_f64<W: Write>(writer: &mut W, v: f64) -> GridResult<()> {
    writer.write_all(&v.to_le_bytes())?;
    Ok(())
}

#[allow(clippy::cast_possible_truncation)]
// Field ids come from a Vec that add_function fills one at a time
const fn len_u32(len: usize) -> u32 {
    len as u32
}
