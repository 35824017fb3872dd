use std::collections::HashMap;

pub const TREND_COLUMN: &str = "Trends";
pub const SEARCH_VOLUME_COLUMN: &str = "Search volume";

/// One row of the input file, keyed by header name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputRecord {
    /// 1-based data row number, header excluded.
    pub row: usize,
    fields: HashMap<String, String>,
}

impl InputRecord {
    pub fn new(row: usize, fields: HashMap<String, String>) -> Self {
        Self { row, fields }
    }

    pub fn from_pairs<I, K, V>(row: usize, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            row,
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }

    pub fn trend(&self) -> &str {
        self.get(TREND_COLUMN).unwrap_or("")
    }

    pub fn search_volume(&self) -> &str {
        self.get(SEARCH_VOLUME_COLUMN).unwrap_or("")
    }

    pub fn has_trend(&self) -> bool {
        !self.trend().trim().is_empty()
    }
}
