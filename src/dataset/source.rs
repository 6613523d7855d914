//! File-backed data sources.
//!
//! The training pipeline consumes postings through the [`DataSource`]
//! trait. Two readers are provided: [`CsvDataSource`] for the public
//! fake-job-postings CSV layout and [`JsonlDataSource`] for one JSON object
//! per line.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use csv::ReaderBuilder;

use crate::dataset::record::{Label, RawRecord};
use crate::error::{JobCheckError, Result};

/// A source of raw posting records.
pub trait DataSource: Send + Sync + std::fmt::Debug {
    /// Read every record from the source.
    fn records(&self) -> Result<Vec<RawRecord>>;

    /// Get the name of this source for logging.
    fn name(&self) -> &str;
}

/// Open a data source, choosing the reader from the file extension.
///
/// `.jsonl` and `.ndjson` files use [`JsonlDataSource`]; everything else is
/// read as CSV.
pub fn open_data_source<P: AsRef<Path>>(path: P) -> Box<dyn DataSource> {
    let path = path.as_ref();
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("jsonl") || ext.eq_ignore_ascii_case("ndjson") => {
            Box::new(JsonlDataSource::new(path))
        }
        _ => Box::new(CsvDataSource::new(path)),
    }
}

/// CSV data source with a header row.
///
/// Recognised columns are `description` (required), `requirements`,
/// `benefits`, and `fraudulent` (or `label`). Other columns are ignored.
#[derive(Debug, Clone)]
pub struct CsvDataSource {
    path: PathBuf,
    name: String,
    delimiter: u8,
}

impl CsvDataSource {
    /// Create a CSV source with comma delimiter.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        CsvDataSource {
            name: path.display().to_string(),
            path,
            delimiter: b',',
        }
    }

    /// Set a custom delimiter character.
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter as u8;
        self
    }

    /// Parse records from any reader.
    pub fn read_from<R: std::io::Read>(&self, reader: R) -> Result<Vec<RawRecord>> {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .flexible(true)
            .from_reader(reader);

        let headers = reader
            .headers()
            .map_err(|e| JobCheckError::data(format!("Failed to read CSV headers: {e}")))?
            .clone();

        let column = |name: &str| headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name));
        let description = column("description")
            .ok_or_else(|| JobCheckError::data("CSV is missing the 'description' column"))?;
        let requirements = column("requirements");
        let benefits = column("benefits");
        let label = column("fraudulent").or_else(|| column("label"));

        let mut records = Vec::new();
        for result in reader.records() {
            let row = result.map_err(|e| match e.position() {
                Some(position) => JobCheckError::data(format!(
                    "Failed to read CSV record at line {}: {e}",
                    position.line()
                )),
                None => JobCheckError::data(format!("Failed to read CSV record: {e}")),
            })?;
            // Quoted cells may span lines, so count from where the record starts.
            let line = row.position().map_or(0, |position| position.line());

            let cell = |index: Option<usize>| {
                index
                    .and_then(|i| row.get(i))
                    .filter(|value| !value.trim().is_empty())
                    .map(str::to_string)
            };

            let label = match cell(label) {
                Some(value) => Some(Label::parse(&value).ok_or_else(|| {
                    JobCheckError::data(format!("Invalid label {value:?} on CSV line {line}"))
                })?),
                None => None,
            };

            records.push(RawRecord {
                description: cell(Some(description)).unwrap_or_default(),
                requirements: cell(requirements),
                benefits: cell(benefits),
                label,
            });
        }

        Ok(records)
    }
}

impl DataSource for CsvDataSource {
    fn records(&self) -> Result<Vec<RawRecord>> {
        let file = File::open(&self.path)?;
        self.read_from(BufReader::new(file))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// JSON-lines data source; blank lines are skipped.
#[derive(Debug, Clone)]
pub struct JsonlDataSource {
    path: PathBuf,
    name: String,
}

impl JsonlDataSource {
    /// Create a JSON-lines source.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        JsonlDataSource {
            name: path.display().to_string(),
            path,
        }
    }

    /// Parse records from any buffered reader.
    pub fn read_from<R: BufRead>(&self, reader: R) -> Result<Vec<RawRecord>> {
        let mut records = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: RawRecord = serde_json::from_str(&line).map_err(|e| {
                JobCheckError::data(format!("Invalid record on line {}: {e}", index + 1))
            })?;
            records.push(record);
        }
        Ok(records)
    }
}

impl DataSource for JsonlDataSource {
    fn records(&self) -> Result<Vec<RawRecord>> {
        let file = File::open(&self.path)?;
        self.read_from(BufReader::new(file))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// An in-memory data source.
#[derive(Debug, Clone, Default)]
pub struct VecDataSource {
    records: Vec<RawRecord>,
}

impl VecDataSource {
    /// Wrap a vector of records.
    pub fn new(records: Vec<RawRecord>) -> Self {
        VecDataSource { records }
    }
}

impl DataSource for VecDataSource {
    fn records(&self) -> Result<Vec<RawRecord>> {
        Ok(self.records.clone())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
