//! Plain text export of numeric tables, one row per line.

use std::{fs::File, io::BufWriter, path::Path};

pub fn save_table(table: &na::DMatrix<f64>, path: impl AsRef<Path>) -> std::io::Result<()> {
  let file = File::create(path)?;
  let writer = BufWriter::new(file);
  write_table(writer, table)
}

/// Writes the rows of `table` with space separated values in scientific notation
/// with 18 fractional digits.
pub fn write_table<W: std::io::Write>(
  mut writer: W,
  table: &na::DMatrix<f64>,
) -> std::io::Result<()> {
  for row in table.row_iter() {
    for (icol, value) in row.iter().enumerate() {
      if icol > 0 {
        write!(writer, " ")?;
      }
      write!(writer, "{value:.18e}")?;
    }
    writeln!(writer)?;
  }
  writer.flush()
}

#[cfg(test)]
mod test {
  use super::write_table;

  #[test]
  fn table_layout() {
    let table = na::DMatrix::from_row_slice(2, 2, &[0.0, -0.5, 1.0, 0.125]);
    let mut out = Vec::new();
    write_table(&mut out, &table).unwrap();
    let out = String::from_utf8(out).unwrap();
    assert_eq!(
      out,
      "0.000000000000000000e0 -5.000000000000000000e-1\n\
       1.000000000000000000e0 1.250000000000000000e-1\n"
    );
  }

  #[test]
  fn empty_table_writes_nothing() {
    let mut out = Vec::new();
    write_table(&mut out, &na::DMatrix::zeros(0, 4)).unwrap();
    assert!(out.is_empty());
  }
}
