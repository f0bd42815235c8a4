use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::{DataError, Result};
use crate::dataset::Dataset;
use crate::vector::Vector;

/// Reads an SVMlight-like sparse-index text file.
///
/// Per line: a label in {-1, 0, +1} followed by ascending 1-based
/// `index:value` pairs. A label of 0 is remapped to -1 (callers relying on
/// a three-way label set should remap upstream). A bare token directly
/// after the label is treated as a namespace: the first one seen is
/// remembered and any later line naming a different one is rejected; other
/// bare tokens are ignored.
pub fn read_svmlight_file(path: &Path) -> Result<Dataset> {
    let reader = BufReader::new(File::open(path)?);
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    let mut namespace: Option<String> = None;

    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let mut tokens = line.split_whitespace();

        let label_tok = tokens.next().unwrap_or("");
        let y: f64 = label_tok.parse().map_err(|_| DataError::BadLabel {
            line: lineno + 1,
            got: label_tok.to_string(),
        })?;
        let y = match y {
            l if l == 1.0 => 1.0,
            l if l == -1.0 || l == 0.0 => -1.0,
            _ => {
                return Err(DataError::BadLabel {
                    line: lineno + 1,
                    got: label_tok.to_string(),
                })
            }
        };

        let mut row = Vector::sparse();
        for tok in tokens {
            let Some((idx_str, val_str)) = tok.split_once(':') else {
                match &namespace {
                    None => namespace = Some(tok.to_string()),
                    Some(ns) if ns != tok => {
                        return Err(DataError::NamespaceMismatch {
                            line: lineno + 1,
                            expected: ns.clone(),
                            got: tok.to_string(),
                        })
                    }
                    Some(_) => {}
                }
                continue;
            };
            let idx: usize = idx_str.parse().map_err(|_| DataError::BadToken {
                line: lineno + 1,
                got: tok.to_string(),
            })?;
            let value: f64 = val_str.parse().map_err(|_| DataError::BadToken {
                line: lineno + 1,
                got: tok.to_string(),
            })?;
            // Indices land where the file says; the 1-based convention just
            // leaves slot 0 unused.
            *row.ensure(idx) = value;
        }

        xs.push(row);
        ys.push(y);
    }

    Ok(Dataset::new(xs, ys))
}
