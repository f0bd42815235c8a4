use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::{DataError, Result};
use crate::dataset::Dataset;
use crate::vector::Vector;

/// Reads a whitespace-separated ASCII feature file.
///
/// One example per line: the first token is the label (-1 or +1), the rest
/// are dense feature values. Rows may have differing widths; the dataset
/// dimension is the widest row.
pub fn read_ascii_file(path: &Path) -> Result<Dataset> {
    let reader = BufReader::new(File::open(path)?);
    let mut xs = Vec::new();
    let mut ys = Vec::new();

    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let mut tokens = line.split_whitespace();

        let label_tok = tokens.next().unwrap_or("");
        let y: f64 = label_tok.parse().map_err(|_| DataError::BadLabel {
            line: lineno + 1,
            got: label_tok.to_string(),
        })?;
        if y != -1.0 && y != 1.0 {
            return Err(DataError::BadLabel {
                line: lineno + 1,
                got: label_tok.to_string(),
            });
        }

        let mut row = Vec::new();
        for tok in tokens {
            let v: f64 = tok.parse().map_err(|_| DataError::BadToken {
                line: lineno + 1,
                got: tok.to_string(),
            })?;
            row.push(v);
        }
        xs.push(Vector::from_dense(row));
        ys.push(y);
    }

    Ok(Dataset::new(xs, ys))
}
