//! Readers for the plain-text numeric files that samplers write.
//!
//! Sample files hold one row per saved particle, columns separated by
//! whitespace (or a single delimiter character), with `#` starting a
//! comment. Rows are typically written with a trailing separator, so a
//! naive split yields an empty last column; [`load_txt`] drops such columns.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use log::{debug, trace};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Could not read {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid number {token:?} on line {line}")]
    Parse { line: usize, token: String },
    #[error("Line {line} has {found} columns, expected {expected}")]
    RaggedRow {
        line: usize,
        expected: usize,
        found: usize,
    },
}

/// How columns are separated within a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Delimiter {
    /// Any run of whitespace.
    #[default]
    Whitespace,
    /// A single character. Consecutive delimiters give empty cells.
    Char(char),
}

impl Delimiter {
    fn split<'a>(&self, line: &'a str) -> Vec<&'a str> {
        match *self {
            Delimiter::Whitespace => line.split_whitespace().collect(),
            Delimiter::Char(c) => line.split(c).map(str::trim).collect(),
        }
    }
}

/// A rectangular block of numbers, stored row major.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub ncol: usize,
    pub rows: Vec<Vec<f64>>,
}

impl Table {
    pub fn nrow(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, i: usize) -> Option<&[f64]> {
        self.rows.get(i).map(Vec::as_slice)
    }

    /// Copy of column `j`, or `None` if out of range.
    pub fn column(&self, j: usize) -> Option<Vec<f64>> {
        if j >= self.ncol {
            return None;
        }
        Some(self.rows.iter().map(|row| row[j]).collect())
    }
}

/// Rows picked out of a file by [`load_rows`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RowSelection {
    /// Number of columns of the first data row, `None` for a file without data.
    pub ncol: Option<usize>,
    pub rows: BTreeMap<usize, Vec<f64>>,
}

fn open(path: &Path) -> Result<BufReader<File>, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(BufReader::new(file))
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(pos) => &line[..pos],
        None => line,
    }
}

fn parse_cell(cell: &str, line: usize) -> Result<f64, LoadError> {
    cell.parse::<f64>().map_err(|_| LoadError::Parse {
        line,
        token: cell.to_string(),
    })
}

/// Load every data row of a delimited text file.
///
/// Comments and blank lines are skipped. Columns with an empty cell in any
/// row are dropped, all other cells must parse as numbers and every row must
/// have the same number of cells.
pub fn load_txt<P: AsRef<Path>>(path: P, delimiter: Delimiter) -> Result<Table, LoadError> {
    let path = path.as_ref();
    let reader = open(path)?;

    let mut cells: Vec<(usize, Vec<String>)> = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let content = strip_comment(&line);
        if content.trim().is_empty() {
            trace!("Skipping line {} of {:?}", idx + 1, path);
            continue;
        }
        let row = delimiter
            .split(content)
            .into_iter()
            .map(str::to_string)
            .collect();
        cells.push((idx + 1, row));
    }

    let Some((_, first)) = cells.first() else {
        debug!("No data rows in {:?}", path);
        return Ok(Table::default());
    };
    let width = first.len();
    for (line, row) in &cells {
        if row.len() != width {
            return Err(LoadError::RaggedRow {
                line: *line,
                expected: width,
                found: row.len(),
            });
        }
    }

    let keep: Vec<usize> = (0..width)
        .filter(|&j| cells.iter().all(|(_, row)| !row[j].is_empty()))
        .collect();

    let rows = cells
        .iter()
        .map(|(line, row)| {
            keep.iter()
                .map(|&j| parse_cell(&row[j], *line))
                .collect::<Result<Vec<_>, _>>()
        })
        .collect::<Result<Vec<_>, _>>()?;

    debug!(
        "Loaded {} rows with {} columns from {:?}",
        rows.len(),
        keep.len(),
        path
    );
    Ok(Table {
        ncol: keep.len(),
        rows,
    })
}

/// Load only the data rows with the given indices.
///
/// Rows are whitespace separated and counted from zero. A comment line is
/// one whose first token is exactly `#`; it is skipped, but only if it has
/// as many tokens as a data row. Reading stops at the end of the file or at
/// the first line (comment or not) whose number of columns differs from the
/// first data row, which marks the end of a block that is still being
/// written.
pub fn load_rows<P: AsRef<Path>>(path: P, rows: &[usize]) -> Result<RowSelection, LoadError> {
    let path = path.as_ref();
    let reader = open(path)?;

    let mut selection = RowSelection::default();
    let mut row = 0usize;
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let cells: Vec<&str> = line.split_whitespace().collect();

        if matches!(selection.ncol, Some(ncol) if cells.len() != ncol) {
            break;
        }
        if matches!(cells.first(), None | Some(&"#")) {
            continue;
        }
        selection.ncol.get_or_insert(cells.len());

        if rows.contains(&row) {
            let values = cells
                .iter()
                .map(|cell| parse_cell(cell, idx + 1))
                .collect::<Result<Vec<_>, _>>()?;
            selection.rows.insert(row, values);
        }
        row += 1;
    }

    debug!(
        "Selected {} of {} requested rows from {:?}",
        selection.rows.len(),
        rows.len(),
        path
    );
    Ok(selection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> Result<PathBuf> {
        let path = dir.path().join(name);
        let mut file = File::create(&path)?;
        file.write_all(content.as_bytes())?;
        Ok(path)
    }

    #[test]
    fn drops_trailing_separator_column() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = write_file(
            &dir,
            "sample.txt",
            "# m, b, sigma\n1.5 -2 0.25 \n3 4 5 \n",
        )?;

        let table = load_txt(&path, Delimiter::Char(' '))?;
        assert_eq!(table.ncol, 3);
        assert_eq!(table.rows, vec![vec![1.5, -2., 0.25], vec![3., 4., 5.]]);
        assert_eq!(table.column(2), Some(vec![0.25, 5.]));
        assert_eq!(table.column(3), None);
        Ok(())
    }

    #[test]
    fn whitespace_and_inline_comments() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = write_file(&dir, "data.txt", "\n1\t2\n  3   4 # note\n\n")?;

        let table = load_txt(&path, Delimiter::Whitespace)?;
        assert_eq!(table.nrow(), 2);
        assert_eq!(table.row(1), Some(&[3., 4.][..]));
        Ok(())
    }

    #[test]
    fn reports_bad_tokens_and_ragged_rows() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let bad = write_file(&dir, "bad.txt", "1 2\n3 x\n")?;
        let ragged = write_file(&dir, "ragged.txt", "1 2\n3\n")?;

        match load_txt(&bad, Delimiter::Whitespace) {
            Err(LoadError::Parse { line, token }) => {
                assert_eq!(line, 2);
                assert_eq!(token, "x");
            }
            other => panic!("unexpected result {other:?}"),
        }
        assert!(matches!(
            load_txt(&ragged, Delimiter::Whitespace),
            Err(LoadError::RaggedRow {
                line: 2,
                expected: 2,
                found: 1
            })
        ));
        assert!(matches!(
            load_txt(dir.path().join("missing.txt"), Delimiter::Whitespace),
            Err(LoadError::Io { .. })
        ));
        Ok(())
    }

    #[test]
    fn selects_rows_until_width_changes() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = write_file(
            &dir,
            "levels.txt",
            "# header\n0 0.5\n1 1.5\n2 2.5\n3 3.5 extra\n4 4.5\n",
        )?;

        let selection = load_rows(&path, &[0, 2, 4])?;
        assert_eq!(selection.ncol, Some(2));
        assert_eq!(
            selection.rows.into_iter().collect::<Vec<_>>(),
            vec![(0, vec![0., 0.5]), (2, vec![2., 2.5])]
        );
        Ok(())
    }

    #[test]
    fn comment_width_counts_as_a_row_width() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = write_file(
            &dir,
            "levels.txt",
            "# a b c\n0 0.5\n# x\n1 1.5\n# new block\n2 2.5\n",
        )?;

        let selection = load_rows(&path, &[0, 1, 2])?;
        assert_eq!(selection.ncol, Some(2));
        assert_eq!(
            selection.rows.into_iter().collect::<Vec<_>>(),
            vec![(0, vec![0., 0.5]), (1, vec![1., 1.5])]
        );

        let glued = write_file(&dir, "glued.txt", "0 0.5\n#x 1\n")?;
        assert!(matches!(
            load_rows(&glued, &[1]),
            Err(LoadError::Parse { line: 2, .. })
        ));
        Ok(())
    }

    #[test]
    fn empty_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = write_file(&dir, "empty.txt", "# only a comment\n")?;

        assert_eq!(load_txt(&path, Delimiter::Whitespace)?, Table::default());
        assert_eq!(load_rows(&path, &[0])?, RowSelection::default());
        Ok(())
    }
}
