use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;

use polars::prelude::*;
use rayon::prelude::*;
use tracing::{debug, info, instrument};

use crate::domain::TVError;
use crate::search::{Field, FieldKind, Row, Schema, SearchConfig, Value};

#[derive(Debug, PartialEq)]
enum FileType {
    CSV,
    PARQUET,
    ARROW,
}

#[derive(Debug)]
struct FileInfo {
    path: PathBuf,
    file_size: u64,
    file_type: FileType,
}

/// Rows loaded from a data file, ready to be handed to a `SearchView`.
#[derive(Debug)]
pub struct Dataset {
    pub name: String,
    pub schema: Schema,
    pub rows: Vec<Row>,
}

impl Dataset {
    /// Fill in whatever `hints` leave open from the loaded schema.
    pub fn search_config(&self, hints: &SearchConfig) -> SearchConfig {
        let defaults = SearchConfig::for_schema(&self.schema);
        SearchConfig {
            keyword_fields: if hints.keyword_fields.is_empty() {
                defaults.keyword_fields
            } else {
                hints.keyword_fields.clone()
            },
            date_field: hints.date_field.clone().or(defaults.date_field),
        }
    }
}

/// Load a CSV, Parquet or Arrow IPC file.
///
/// Columns are converted in parallel, one rayon task per column. `hints` decide
/// which string columns are searchable text (the rest become categories) and
/// which column is forced to timestamps for the date range.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_data_file(path: &Path, hints: &SearchConfig) -> Result<Dataset, TVError> {
    let file_info = get_file_info(path.to_path_buf())?;
    debug!("Loading {:?}", file_info);
    let frame = match file_info.file_type {
        FileType::CSV => load_csv(&file_info.path)?,
        FileType::PARQUET => load_parquet(&file_info.path)?,
        FileType::ARROW => load_arrow(&file_info.path)?,
    };

    let start_time = Instant::now();
    let df = frame.collect()?;
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    if names.is_empty() {
        return Err(TVError::loading_failed("file has no columns"));
    }
    if let Some(missing) = hints
        .keyword_fields
        .iter()
        .chain(hints.date_field.iter())
        .find(|name| !names.contains(name))
    {
        return Err(TVError::UnknownField(missing.clone()));
    }

    let columns = names
        .par_iter()
        .map(|name| load_column(&df, name, hints))
        .collect::<Result<Vec<_>, PolarsError>>()?;

    let nrows = df.height();
    let mut fields = Vec::with_capacity(columns.len());
    let mut cells = Vec::with_capacity(columns.len());
    for (field, data) in columns {
        debug!("Column \"{}\": {:?}, {} rows", field.name, field.kind, data.len());
        fields.push(field);
        cells.push(data.into_iter());
    }
    let rows: Vec<Row> = (0..nrows)
        .map(|_| Row::new(cells.iter_mut().map(|c| c.next().flatten()).collect()))
        .collect();

    info!(
        "Loading {} rows ({} bytes) took {}ms ...",
        rows.len(),
        file_info.file_size,
        start_time.elapsed().as_millis()
    );

    let name = file_info
        .path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("???")
        .to_string();

    Ok(Dataset {
        name,
        schema: Schema::new(fields),
        rows,
    })
}

fn detect_file_type(path: &Path) -> Result<FileType, TVError> {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_uppercase())
        .as_deref()
    {
        Some("CSV") => Ok(FileType::CSV),
        Some("PARQUET") | Some("PQ") => Ok(FileType::PARQUET),
        Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::ARROW),
        _ => Err(TVError::UnknownFileType(path.to_path_buf())),
    }
}

fn get_file_info(path: PathBuf) -> Result<FileInfo, TVError> {
    let metadata = fs::metadata(&path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => TVError::FileNotFound(path.clone()),
        ErrorKind::PermissionDenied => TVError::PermissionDenied(path.clone()),
        _ => TVError::IoError(e),
    })?;
    if !metadata.is_file() {
        return Err(TVError::loading_failed(format!(
            "{} is not a file",
            path.display()
        )));
    }

    let file_type = detect_file_type(&path)?;

    Ok(FileInfo {
        path,
        file_size: metadata.len(),
        file_type,
    })
}

fn is_numeric_type(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

fn field_kind(dtype: &DataType, name: &str, hints: &SearchConfig) -> FieldKind {
    if hints.date_field.as_deref() == Some(name) {
        FieldKind::Timestamp
    } else if is_numeric_type(dtype) {
        FieldKind::Number
    } else if matches!(dtype, DataType::Date | DataType::Datetime(..)) {
        FieldKind::Timestamp
    } else if hints.keyword_fields.is_empty() || hints.keyword_fields.iter().any(|f| f == name) {
        FieldKind::Text
    } else {
        FieldKind::Category
    }
}

// Every column goes through its string form and is parsed back per kind,
// so nulls and unparseable cells both end up missing.
fn load_column(
    df: &DataFrame,
    col_name: &str,
    hints: &SearchConfig,
) -> Result<(Field, Vec<Option<Value>>), PolarsError> {
    let column = df.column(col_name)?;
    let kind = field_kind(column.dtype(), col_name, hints);

    let col = column.cast(&DataType::String)?;
    let series = col.str()?;
    let data = series
        .into_iter()
        .map(|value| value.and_then(|s| Value::parse(s, kind)))
        .collect();

    Ok((Field::new(col_name, kind), data))
}

fn load_csv(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyCsvReader::new(PlPath::Local(path.into()))
        .with_has_header(true)
        .with_try_parse_dates(true)
        .finish()
}

fn load_parquet(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_parquet(PlPath::Local(path.into()), ScanArgsParquet::default())
}

fn load_arrow(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_ipc(
        PlPath::Local(path.into()),
        polars::io::ipc::IpcScanOptions,
        UnifiedScanArgs::default(),
    )
}
