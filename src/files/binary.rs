use std::fs::File;
use std::io::{self, BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;

use super::{DataError, Result};
use crate::dataset::Dataset;
use crate::vector::Vector;

const HEADER_DENSE: u8 = 0x01;
const HEADER_SPARSE: u8 = 0x02;

// Layout (little-endian, packed, no magic or length):
//   header: u8, 0x01 dense | 0x02 sparse
//   dense:  u32 d, then per example: i8 y, d * f64
//   sparse: per example: i8 y, u32 m, m * (u32 index, f64 value)
// EOF at an example boundary terminates; EOF inside a record is fatal.

/// Reads a packed binary feature file.
pub fn read_binary_file(path: &Path) -> Result<Dataset> {
    let mut r = BufReader::new(File::open(path)?);

    let mut header = [0u8; 1];
    r.read_exact(&mut header)
        .map_err(|_| DataError::Truncated { what: "header" })?;

    match header[0] {
        HEADER_DENSE => read_dense(&mut r),
        HEADER_SPARSE => read_sparse(&mut r),
        other => Err(DataError::BadHeader(other)),
    }
}

fn read_dense<R: Read>(r: &mut R) -> Result<Dataset> {
    let d = read_u32(r, "dense width")? as usize;
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    while let Some(y) = try_read_label(r, xs.len())? {
        let mut row = Vec::with_capacity(d);
        for _ in 0..d {
            row.push(read_f64(r, "dense value")?);
        }
        xs.push(Vector::from_dense(row));
        ys.push(y);
    }
    Ok(Dataset::new(xs, ys))
}

fn read_sparse<R: Read>(r: &mut R) -> Result<Dataset> {
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    while let Some(y) = try_read_label(r, xs.len())? {
        let m = read_u32(r, "sparse entry count")?;
        let mut row = Vector::sparse();
        for _ in 0..m {
            let idx = read_u32(r, "feature index")? as usize;
            let value = read_f64(r, "feature value")?;
            *row.ensure(idx) = value;
        }
        xs.push(row);
        ys.push(y);
    }
    Ok(Dataset::new(xs, ys))
}

/// Writes `d` as a packed binary feature file in the chosen layout.
///
/// The dense layout pads every row to the dataset width with zeros; the
/// sparse layout writes each row's stored entries as they iterate.
pub fn write_binary_file(path: &Path, d: &Dataset, sparse: bool) -> Result<()> {
    let mut w = BufWriter::new(File::create(path)?);

    if sparse {
        w.write_all(&[HEADER_SPARSE])?;
        for (x, y) in d.rows() {
            w.write_all(&(y as i8).to_le_bytes())?;
            w.write_all(&(x.nnz() as u32).to_le_bytes())?;
            for (j, v) in x.iter() {
                w.write_all(&(j as u32).to_le_bytes())?;
                w.write_all(&v.to_le_bytes())?;
            }
        }
    } else {
        w.write_all(&[HEADER_DENSE])?;
        let width = d.dim();
        w.write_all(&(width as u32).to_le_bytes())?;
        for (x, y) in d.rows() {
            w.write_all(&(y as i8).to_le_bytes())?;
            for j in 0..width {
                let v = if j < x.highest_nonzero_dim() {
                    x.get(j)
                } else {
                    0.0
                };
                w.write_all(&v.to_le_bytes())?;
            }
        }
    }
    w.flush()?;
    Ok(())
}

/// Reads the next example's label, or `None` at a clean end of file.
/// `record` is the 0-based example ordinal, reported on bad labels.
fn try_read_label<R: Read>(r: &mut R, record: usize) -> Result<Option<f64>> {
    let mut buf = [0u8; 1];
    match r.read_exact(&mut buf) {
        Ok(()) => {
            let y = i8::from_le_bytes(buf) as f64;
            if y != -1.0 && y != 1.0 {
                return Err(DataError::BadLabel {
                    line: record,
                    got: format!("{}", buf[0] as i8),
                });
            }
            Ok(Some(y))
        }
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn read_u32<R: Read>(r: &mut R, what: &'static str) -> Result<u32> {
    let mut buf = [0u8; 4];
    fill(r, &mut buf, what)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_f64<R: Read>(r: &mut R, what: &'static str) -> Result<f64> {
    let mut buf = [0u8; 8];
    fill(r, &mut buf, what)?;
    Ok(f64::from_le_bytes(buf))
}

fn fill<R: Read>(r: &mut R, buf: &mut [u8], what: &'static str) -> Result<()> {
    r.read_exact(buf).map_err(|e: io::Error| {
        if e.kind() == ErrorKind::UnexpectedEof {
            DataError::Truncated { what }
        } else {
            e.into()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmp() -> tempfile::TempDir {
        tempfile::tempdir().unwrap()
    }

    #[test]
    fn dense_round_trip_is_bit_exact() {
        let dir = tmp();
        let path = dir.path().join("dense.bin");

        let d = Dataset::new(
            vec![
                Vector::from_dense(vec![1.0, -2.5, 0.0]),
                Vector::from_dense(vec![0.25, 1e-300, 3.0]),
            ],
            vec![1.0, -1.0],
        );
        write_binary_file(&path, &d, false).unwrap();
        let back = read_binary_file(&path).unwrap();

        assert_eq!(back.shape(), d.shape());
        assert_eq!(back.labels(), d.labels());
        for i in 0..d.len() {
            assert_eq!(back.x_at(i).as_ref(), d.x_at(i).as_ref());
        }
    }

    #[test]
    fn sparse_round_trip_preserves_pairs() {
        let dir = tmp();
        let path = dir.path().join("sparse.bin");

        let d = Dataset::new(
            vec![
                Vector::from_pairs(vec![(0, 1.0), (3, 2.5)]),
                Vector::from_pairs(vec![(1, -0.5)]),
                Vector::sparse(),
            ],
            vec![1.0, -1.0, 1.0],
        );
        write_binary_file(&path, &d, true).unwrap();
        let back = read_binary_file(&path).unwrap();

        assert_eq!(back.labels(), &[1.0, -1.0, 1.0]);
        assert_eq!(
            back.x_at(0).as_ref(),
            &Vector::from_pairs(vec![(0, 1.0), (3, 2.5)])
        );
        assert_eq!(back.x_at(1).as_ref(), &Vector::from_pairs(vec![(1, -0.5)]));
        assert_eq!(back.x_at(2).as_ref(), &Vector::sparse());
    }

    #[test]
    fn dense_layout_pads_sparse_rows() {
        let dir = tmp();
        let path = dir.path().join("mixed.bin");

        let d = Dataset::new(vec![Vector::from_pairs(vec![(2, 4.0)])], vec![1.0]);
        write_binary_file(&path, &d, false).unwrap();
        let back = read_binary_file(&path).unwrap();
        assert_eq!(back.x_at(0).as_ref(), &Vector::from_dense(vec![0.0, 0.0, 4.0]));
    }

    #[test]
    fn truncated_record_is_fatal() {
        let dir = tmp();
        let path = dir.path().join("trunc.bin");

        let d = Dataset::new(vec![Vector::from_dense(vec![1.0, 2.0])], vec![1.0]);
        write_binary_file(&path, &d, false).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 3]).unwrap();

        match read_binary_file(&path) {
            Err(DataError::Truncated { .. }) => {}
            other => panic!("expected truncation error, got {other:?}"),
        }
    }

    #[test]
    fn unknown_header_is_rejected() {
        let dir = tmp();
        let path = dir.path().join("hdr.bin");
        std::fs::write(&path, [0x7f]).unwrap();
        match read_binary_file(&path) {
            Err(DataError::BadHeader(0x7f)) => {}
            other => panic!("expected header error, got {other:?}"),
        }
    }
}
