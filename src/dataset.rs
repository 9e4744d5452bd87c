//! Reference dataset of fictitious companies.
//!
//! The first of `dadoscreditoficticios.{json,csv,parquet,xml}` found in the
//! data directory is parsed once, its column names mapped to the canonical
//! field set, and the resulting table kept in memory for the lifetime of the
//! process behind a [`DatasetStore`].

use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::record::Field;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;

pub const DATASET_STEM: &str = "dadoscreditoficticios";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetFormat {
    Json,
    Csv,
    Parquet,
    Xml,
}

impl DatasetFormat {
    /// Search order when several files are present.
    pub const PRECEDENCE: [DatasetFormat; 4] = [
        DatasetFormat::Json,
        DatasetFormat::Csv,
        DatasetFormat::Parquet,
        DatasetFormat::Xml,
    ];

    pub fn extension(&self) -> &'static str {
        match self {
            DatasetFormat::Json => "json",
            DatasetFormat::Csv => "csv",
            DatasetFormat::Parquet => "parquet",
            DatasetFormat::Xml => "xml",
        }
    }
}

#[derive(Debug)]
pub enum DatasetError {
    NoDatasetFile { dir: PathBuf },
    Io { path: PathBuf, source: std::io::Error },
    Json(serde_json::Error),
    Csv(csv::Error),
    Parquet(parquet::errors::ParquetError),
    Xml(quick_xml::Error),
    /// The JSON document is neither records nor a column mapping.
    UnsupportedLayout(String),
    /// The blocking load task did not complete.
    Task(String),
}

impl fmt::Display for DatasetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetError::NoDatasetFile { dir } => write!(
                f,
                "no dataset found in {} (expected {}.json/.csv/.parquet/.xml)",
                dir.display(),
                DATASET_STEM
            ),
            DatasetError::Io { path, source } => {
                write!(f, "failed to read {}: {}", path.display(), source)
            }
            DatasetError::Json(err) => write!(f, "invalid JSON dataset: {}", err),
            DatasetError::Csv(err) => write!(f, "invalid CSV dataset: {}", err),
            DatasetError::Parquet(err) => write!(f, "invalid Parquet dataset: {}", err),
            DatasetError::Xml(err) => write!(f, "invalid XML dataset: {}", err),
            DatasetError::UnsupportedLayout(msg) => write!(f, "unsupported dataset layout: {}", msg),
            DatasetError::Task(msg) => write!(f, "dataset load task failed: {}", msg),
        }
    }
}

impl std::error::Error for DatasetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DatasetError::Io { source, .. } => Some(source),
            DatasetError::Json(err) => Some(err),
            DatasetError::Csv(err) => Some(err),
            DatasetError::Parquet(err) => Some(err),
            DatasetError::Xml(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for DatasetError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<csv::Error> for DatasetError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}

impl From<parquet::errors::ParquetError> for DatasetError {
    fn from(value: parquet::errors::ParquetError) -> Self {
        Self::Parquet(value)
    }
}

impl From<quick_xml::Error> for DatasetError {
    fn from(value: quick_xml::Error) -> Self {
        Self::Xml(value)
    }
}

/// One company of the reference dataset, with canonical field names.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DatasetRow {
    #[serde(rename = "empresa")]
    pub name: String,
    #[serde(rename = "receita_anual")]
    pub annual_revenue: Option<f64>,
    #[serde(rename = "divida_total")]
    pub total_debt: Option<f64>,
    #[serde(rename = "prazo_pagamento_dias")]
    pub payment_term_days: Option<u32>,
    #[serde(rename = "setor")]
    pub sector: Option<String>,
    pub rating: Option<String>,
    #[serde(rename = "noticias_recentes")]
    pub recent_news: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Company,
    AnnualRevenue,
    TotalDebt,
    PaymentTermDays,
    Sector,
    Rating,
    RecentNews,
}

/// Maps the recognized header spellings to a canonical column.
fn canonical_column(header: &str) -> Option<Column> {
    let header = header.trim().trim_start_matches('\u{feff}');
    match header {
        "Empresa" | "empresa" => Some(Column::Company),
        "Receita Anual" | "Receita_Anual" | "receita_anual" => Some(Column::AnnualRevenue),
        "Dívida Total" | "Divida Total" | "Dívida_Total" | "Divida_Total" | "divida_total" => {
            Some(Column::TotalDebt)
        }
        "Prazo de Pagamento (dias)" | "Prazo_de_Pagamento_dias" | "prazo_pagamento_dias" => {
            Some(Column::PaymentTermDays)
        }
        "Setor" | "setor" => Some(Column::Sector),
        "Rating" | "rating" => Some(Column::Rating),
        "Notícias Recentes" | "Noticias Recentes" | "Notícias_Recentes" | "Noticias_Recentes"
        | "noticias_recentes" => Some(Column::RecentNews),
        _ => None,
    }
}

fn clean_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Unparseable, negative and non-finite amounts become absent.
fn parse_amount(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}

fn parse_days(value: &str) -> Option<u32> {
    parse_amount(value)
        .filter(|v| *v <= f64::from(u32::MAX))
        .map(|v| v.trunc() as u32)
}

impl DatasetRow {
    /// Builds a row from `(header, cell)` pairs.
    ///
    /// Unknown headers are ignored; when two headers map to the same column
    /// the first non-empty cell wins. Rows without a company name are dropped.
    fn from_cells<I>(cells: I) -> Option<Self>
    where
        I: IntoIterator<Item = (String, Option<String>)>,
    {
        let mut row = DatasetRow::default();
        let mut name: Option<String> = None;

        for (header, cell) in cells {
            let Some(column) = canonical_column(&header) else {
                continue;
            };
            let Some(cell) = clean_text(cell) else {
                continue;
            };

            match column {
                Column::Company => {
                    name.get_or_insert(cell);
                }
                Column::AnnualRevenue => {
                    row.annual_revenue = row.annual_revenue.or_else(|| parse_amount(&cell));
                }
                Column::TotalDebt => {
                    row.total_debt = row.total_debt.or_else(|| parse_amount(&cell));
                }
                Column::PaymentTermDays => {
                    row.payment_term_days = row.payment_term_days.or_else(|| parse_days(&cell));
                }
                Column::Sector => {
                    row.sector.get_or_insert(cell);
                }
                Column::Rating => {
                    row.rating.get_or_insert(cell);
                }
                Column::RecentNews => {
                    row.recent_news.get_or_insert(cell);
                }
            }
        }

        row.name = name?;
        Some(row)
    }
}

/// In-memory company table with case-insensitive name lookup.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    rows: Vec<DatasetRow>,
    keys: Vec<String>,
    source: Option<PathBuf>,
}

impl Dataset {
    pub fn from_rows(rows: Vec<DatasetRow>) -> Self {
        let keys = rows.iter().map(|row| row.name.to_lowercase()).collect();
        Self {
            rows,
            keys,
            source: None,
        }
    }

    fn with_source(mut self, path: &Path) -> Self {
        self.source = Some(path.to_path_buf());
        self
    }

    /// File the rows were read from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn rows(&self) -> &[DatasetRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Case-insensitive exact match, falling back to a prefix match.
    ///
    /// Ties go to the first row in file order.
    pub fn find(&self, name: &str) -> Option<&DatasetRow> {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }

        self.keys
            .iter()
            .position(|key| *key == needle)
            .or_else(|| self.keys.iter().position(|key| key.starts_with(&needle)))
            .map(|idx| &self.rows[idx])
    }
}

// ============ Parsers ============

fn json_cell(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn object_cells(object: &serde_json::Map<String, Value>) -> Vec<(String, Option<String>)> {
    object
        .iter()
        .map(|(key, value)| (key.clone(), json_cell(value)))
        .collect()
}

/// Parses NDJSON, a JSON array of records, or a column mapping
/// (`{"Empresa": {"0": ..}}` / `{"Empresa": [..]}`).
pub fn parse_json(content: &str) -> Result<Vec<DatasetRow>, DatasetError> {
    let lines: Vec<&str> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    // A record line holds scalars only; nested values mean a column mapping.
    let ndjson: Option<Vec<serde_json::Map<String, Value>>> = lines
        .iter()
        .map(|line| match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(object))
                if !object.values().any(|v| v.is_object() || v.is_array()) =>
            {
                Some(object)
            }
            _ => None,
        })
        .collect();

    if let Some(records) = ndjson.filter(|records| !records.is_empty()) {
        return Ok(records
            .iter()
            .filter_map(|object| DatasetRow::from_cells(object_cells(object)))
            .collect());
    }

    match serde_json::from_str::<Value>(content)? {
        Value::Array(items) => Ok(items
            .iter()
            .filter_map(|item| match item {
                Value::Object(object) => DatasetRow::from_cells(object_cells(object)),
                _ => None,
            })
            .collect()),
        Value::Object(columns) => Ok(rows_from_columns(&columns)),
        other => Err(DatasetError::UnsupportedLayout(format!(
            "expected an array or object at the top level, found {}",
            json_type(&other)
        ))),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn rows_from_columns(columns: &serde_json::Map<String, Value>) -> Vec<DatasetRow> {
    // Row keys in first-seen order, across all columns.
    let mut row_keys: Vec<String> = Vec::new();
    for values in columns.values() {
        match values {
            Value::Object(cells) => {
                for key in cells.keys() {
                    if !row_keys.contains(key) {
                        row_keys.push(key.clone());
                    }
                }
            }
            Value::Array(cells) => {
                for idx in row_keys.len()..cells.len() {
                    row_keys.push(idx.to_string());
                }
            }
            _ => {}
        }
    }

    row_keys
        .iter()
        .filter_map(|row_key| {
            let cells = columns.iter().map(|(header, values)| {
                let cell = match values {
                    Value::Object(cells) => cells.get(row_key).and_then(json_cell),
                    Value::Array(cells) => row_key
                        .parse::<usize>()
                        .ok()
                        .and_then(|idx| cells.get(idx))
                        .and_then(json_cell),
                    _ => None,
                };
                (header.clone(), cell)
            });
            DatasetRow::from_cells(cells)
        })
        .collect()
}

pub fn parse_csv<R: Read>(reader: R) -> Result<Vec<DatasetRow>, DatasetError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()?
        .iter()
        .map(|header| header.to_string())
        .collect();

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let cells = headers
            .iter()
            .zip(record.iter())
            .map(|(header, cell)| (header.clone(), Some(cell.to_string())));
        if let Some(row) = DatasetRow::from_cells(cells) {
            rows.push(row);
        }
    }

    Ok(rows)
}

/// Parses `<root><row><Empresa>..</Empresa>..</row>..</root>`.
///
/// Attributes of a row element are read as cells too.
pub fn parse_xml(content: &str) -> Result<Vec<DatasetRow>, DatasetError> {
    let mut reader = Reader::from_str(content);
    reader.trim_text(true);

    let mut rows = Vec::new();
    let mut depth = 0usize;
    let mut cells: Vec<(String, Option<String>)> = Vec::new();
    let mut column: Option<String> = None;
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(element) => {
                depth += 1;
                match depth {
                    2 => {
                        cells.clear();
                        for attr in element.attributes() {
                            let attr = attr.map_err(quick_xml::Error::from)?;
                            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
                            let value = attr.unescape_value()?.into_owned();
                            cells.push((key, Some(value)));
                        }
                    }
                    3 => {
                        column = Some(
                            String::from_utf8_lossy(element.name().as_ref()).into_owned(),
                        );
                        text.clear();
                    }
                    _ => {}
                }
            }
            Event::Empty(element) => match depth + 1 {
                2 => {
                    let mut attributes = Vec::new();
                    for attr in element.attributes() {
                        let attr = attr.map_err(quick_xml::Error::from)?;
                        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
                        let value = attr.unescape_value()?.into_owned();
                        attributes.push((key, Some(value)));
                    }
                    if let Some(row) = DatasetRow::from_cells(attributes) {
                        rows.push(row);
                    }
                }
                3 => {
                    let header = String::from_utf8_lossy(element.name().as_ref()).into_owned();
                    cells.push((header, None));
                }
                _ => {}
            },
            Event::Text(value) if depth == 3 => {
                text.push_str(&value.unescape()?);
            }
            Event::CData(value) if depth == 3 => {
                text.push_str(&String::from_utf8_lossy(&value.into_inner()));
            }
            Event::End(_) => {
                match depth {
                    3 => {
                        if let Some(header) = column.take() {
                            cells.push((header, Some(std::mem::take(&mut text))));
                        }
                    }
                    2 => {
                        if let Some(row) = DatasetRow::from_cells(std::mem::take(&mut cells)) {
                            rows.push(row);
                        }
                    }
                    _ => {}
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(rows)
}

fn parquet_cell(field: &Field) -> Option<String> {
    match field {
        Field::Null => None,
        Field::Str(value) => Some(value.clone()),
        other => Some(other.to_string()),
    }
}

pub fn read_parquet(file: File) -> Result<Vec<DatasetRow>, DatasetError> {
    let reader = SerializedFileReader::new(file)?;
    let mut rows = Vec::new();

    for record in reader.get_row_iter(None)? {
        let record = record?;
        let cells = record
            .get_column_iter()
            .map(|(header, field)| (header.to_string(), parquet_cell(field)));
        if let Some(row) = DatasetRow::from_cells(cells) {
            rows.push(row);
        }
    }

    Ok(rows)
}

// ============ Loading ============

/// Finds the first dataset file in `dir`, following [`DatasetFormat::PRECEDENCE`].
pub fn locate(dir: &Path) -> Result<(PathBuf, DatasetFormat), DatasetError> {
    DatasetFormat::PRECEDENCE
        .iter()
        .map(|format| {
            (
                dir.join(format!("{}.{}", DATASET_STEM, format.extension())),
                *format,
            )
        })
        .find(|(path, _)| path.is_file())
        .ok_or_else(|| DatasetError::NoDatasetFile {
            dir: dir.to_path_buf(),
        })
}

pub fn load_file(path: &Path, format: DatasetFormat) -> Result<Dataset, DatasetError> {
    let io_err = |source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    };

    let rows = match format {
        DatasetFormat::Json => parse_json(&std::fs::read_to_string(path).map_err(io_err)?)?,
        DatasetFormat::Csv => parse_csv(File::open(path).map_err(io_err)?)?,
        DatasetFormat::Parquet => read_parquet(File::open(path).map_err(io_err)?)?,
        DatasetFormat::Xml => parse_xml(&std::fs::read_to_string(path).map_err(io_err)?)?,
    };

    Ok(Dataset::from_rows(rows).with_source(path))
}

pub fn load_from_dir(dir: &Path) -> Result<Dataset, DatasetError> {
    let (path, format) = locate(dir)?;
    tracing::debug!("Reading dataset {} as {:?}", path.display(), format);
    load_file(&path, format)
}

/// Source of the dataset, called at most once per successful load.
pub trait DatasetLoader: Send + Sync + 'static {
    fn load(&self) -> Result<Dataset, DatasetError>;
}

/// Reads the dataset from a data directory.
#[derive(Debug, Clone)]
pub struct DirectoryLoader {
    dir: PathBuf,
}

impl DirectoryLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl DatasetLoader for DirectoryLoader {
    fn load(&self) -> Result<Dataset, DatasetError> {
        load_from_dir(&self.dir)
    }
}

/// An already built table; used to inject fixtures.
impl DatasetLoader for Dataset {
    fn load(&self) -> Result<Dataset, DatasetError> {
        Ok(self.clone())
    }
}

/// Process-wide, lazily populated dataset.
///
/// Concurrent first callers wait on the same initialization. A failed load is
/// not cached, so the next caller retries it.
pub struct DatasetStore {
    loader: Arc<dyn DatasetLoader>,
    cell: OnceCell<Arc<Dataset>>,
}

impl DatasetStore {
    pub fn new(loader: impl DatasetLoader) -> Self {
        Self {
            loader: Arc::new(loader),
            cell: OnceCell::new(),
        }
    }

    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        Self::new(DirectoryLoader::new(dir))
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }

    pub async fn get(&self) -> Result<Arc<Dataset>, DatasetError> {
        self.cell
            .get_or_try_init(|| async {
                let loader = Arc::clone(&self.loader);
                let dataset = tokio::task::spawn_blocking(move || loader.load())
                    .await
                    .map_err(|e| DatasetError::Task(e.to_string()))??;

                match dataset.source() {
                    Some(path) => tracing::info!(
                        "✓ Dataset loaded: {} companies from {}",
                        dataset.len(),
                        path.display()
                    ),
                    None => tracing::info!("✓ Dataset loaded: {} companies", dataset.len()),
                }

                Ok::<_, DatasetError>(Arc::new(dataset))
            })
            .await
            .map(Arc::clone)
    }
}

impl fmt::Debug for DatasetStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatasetStore")
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
