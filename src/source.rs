use crate::{
    error::{Result, SourceError, TrendgenError},
    models::InputRecord,
};
use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter, Trim};
use std::fs::File;
use std::path::{Path, PathBuf};

/// Opens the trends CSV. Re-open to iterate again.
#[derive(Debug)]
pub struct SourceReader {
    path: PathBuf,
    reader: csv::Reader<File>,
}

impl SourceReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(TrendgenError::InputNotFound(path.to_path_buf()));
        }

        let reader = ReaderBuilder::new()
            .flexible(true)
            .trim(Trim::All)
            .from_path(path)
            .map_err(SourceError::from)?;

        Ok(Self {
            path: path.to_path_buf(),
            reader,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lazily yields rows in file order. Fails if the header row cannot be decoded.
    pub fn records(mut self) -> Result<Records> {
        let headers = match self.reader.headers() {
            Ok(headers) => headers.clone(),
            Err(source) => {
                return Err(TrendgenError::InputHeader {
                    path: self.path,
                    source,
                })
            }
        };
        log::debug!(
            "Reading {} with columns {:?}",
            self.path.display(),
            headers.iter().collect::<Vec<_>>()
        );
        Ok(Records {
            headers,
            rows: self.reader.into_records(),
            row: 0,
        })
    }
}

pub struct Records {
    headers: StringRecord,
    rows: StringRecordsIntoIter<File>,
    row: usize,
}

impl Iterator for Records {
    type Item = std::result::Result<InputRecord, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.rows.next()?;
        self.row += 1;
        Some(
            next.map(|fields| {
                InputRecord::from_pairs(
                    self.row,
                    self.headers
                        .iter()
                        .zip(fields.iter())
                        .map(|(name, value)| (name.to_string(), value.trim().to_string())),
                )
            })
            .map_err(SourceError::from),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn csv_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_missing_input_is_reported() {
        let err = SourceReader::open("definitely/not/here.csv").unwrap_err();
        assert!(matches!(err, TrendgenError::InputNotFound(_)));
    }

    #[test]
    fn test_rows_are_trimmed_and_ordered() {
        let file = csv_file("Trends,Search volume\n  Cats , 120000\nAI/ML 2024!,\n,50\n");
        let records: Vec<_> = SourceReader::open(file.path())
            .unwrap()
            .records()
            .unwrap()
            .collect::<std::result::Result<_, _>>()
            .unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].trend(), "Cats");
        assert_eq!(records[0].search_volume(), "120000");
        assert_eq!(records[0].row, 1);
        assert_eq!(records[1].trend(), "AI/ML 2024!");
        assert_eq!(records[1].search_volume(), "");
        assert!(!records[2].has_trend());
    }

    #[test]
    fn test_short_rows_and_missing_columns() {
        let file = csv_file("Trends\nCats\nDogs,extra\n");
        let records: Vec<_> = SourceReader::open(file.path())
            .unwrap()
            .records()
            .unwrap()
            .map(|r| r.unwrap())
            .collect();

        assert_eq!(records.len(), 2);
        assert_eq!(records[1].trend(), "Dogs");
        assert_eq!(records[1].search_volume(), "");
    }

    #[test]
    fn test_undecodable_header_is_fatal() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"\xff\xfeTrends,Search volume\nCats,1\n").unwrap();

        let err = SourceReader::open(file.path())
            .unwrap()
            .records()
            .err()
            .unwrap();
        match err {
            TrendgenError::InputHeader { path, .. } => assert_eq!(path, file.path()),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_reopen_restarts() {
        let file = csv_file("Trends\nCats\nDogs\n");
        let first = SourceReader::open(file.path()).unwrap().records().unwrap().count();
        let second = SourceReader::open(file.path()).unwrap().records().unwrap().count();
        assert_eq!(first, 2);
        assert_eq!(second, 2);
    }
}
