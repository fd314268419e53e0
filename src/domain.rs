use std::fmt;
use std::io::Error;
use std::path::PathBuf;

use derive_setters::Setters;
use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;
use tracing_error::SpanTrace;

#[derive(Debug)]
pub enum TVError {
    IoError(Error),
    PolarsError(PolarsError),
    LoadingFailed { reason: String, context: SpanTrace },
    FileNotFound(PathBuf),
    PermissionDenied(PathBuf),
    UnknownFileType(PathBuf),
    UnknownField(String),
}

impl TVError {
    pub fn loading_failed(reason: impl Into<String>) -> Self {
        TVError::LoadingFailed {
            reason: reason.into(),
            context: SpanTrace::capture(),
        }
    }
}

impl fmt::Display for TVError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TVError::IoError(e) => write!(f, "io error: {e}"),
            TVError::PolarsError(e) => write!(f, "could not read data: {e}"),
            TVError::LoadingFailed { reason, context } => {
                write!(f, "loading failed: {reason}")?;
                write!(f, "\n{context}")
            }
            TVError::FileNotFound(path) => write!(f, "file not found: {}", path.display()),
            TVError::PermissionDenied(path) => {
                write!(f, "permission denied: {}", path.display())
            }
            TVError::UnknownFileType(path) => {
                write!(f, "unknown file type: {}", path.display())
            }
            TVError::UnknownField(name) => write!(f, "no column named \"{name}\""),
        }
    }
}

impl std::error::Error for TVError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TVError::IoError(e) => Some(e),
            TVError::PolarsError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<Error> for TVError {
    fn from(err: Error) -> Self {
        TVError::IoError(err)
    }
}

impl From<PolarsError> for TVError {
    fn from(err: PolarsError) -> Self {
        TVError::PolarsError(err)
    }
}

#[derive(Debug, Clone, Setters)]
#[setters(into)]
pub struct TVConfig {
    pub path: PathBuf,
    pub keyword_fields: Vec<String>,
    pub date_field: Option<String>,
    pub max_column_width: usize,
    pub event_poll_time: u64,
    pub log_file: PathBuf,
}

impl Default for TVConfig {
    fn default() -> Self {
        TVConfig {
            path: PathBuf::new(),
            keyword_fields: Vec::new(),
            date_field: None,
            max_column_width: 32,
            event_poll_time: 100,
            log_file: std::env::temp_dir().join("tvsift.log"),
        }
    }
}

/// What the command line is currently reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CMDMode {
    Keyword,
    FilterColumn,
    DateRange,
}

impl CMDMode {
    pub fn prompt(&self) -> &'static str {
        match self {
            CMDMode::Keyword => "/",
            CMDMode::FilterColumn => "= ",
            CMDMode::DateRange => "from..to ",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    MovePageUp,
    MovePageDown,
    MoveBeginning,
    MoveEnd,
    Resize(usize, usize),
    CopyCell,
    CopyRow,
    Help,
    Exit,
    Keyword,
    FilterColumn,
    DateRange,
    ResetFilters,
    ToggleSort,
    SortAscending,
    SortDescending,
    RawKey(KeyEvent),
}

pub const HELP_TEXT: &str = "\
q            quit
arrows/hjkl  move
PgUp/PgDn    page
g / G        first / last row
/            keyword search
f            filter current column by value (empty clears)
D            date range FROM..TO (empty clears)
r            reset all filters
s            toggle sort on current column
a / z        sort ascending / descending
y / Y        copy cell / row
?            this help
Esc          close";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_setters_override_defaults() {
        let cfg = TVConfig::default()
            .path("spaces.csv")
            .keyword_fields(vec!["name".to_string()])
            .date_field(Some("created_at".to_string()));
        assert_eq!(cfg.path, PathBuf::from("spaces.csv"));
        assert_eq!(cfg.keyword_fields, vec!["name"]);
        assert_eq!(cfg.date_field.as_deref(), Some("created_at"));
        assert_eq!(cfg.max_column_width, 32);
    }

    #[test]
    fn errors_render_their_cause() {
        let err = TVError::UnknownField("owner".into());
        assert_eq!(err.to_string(), "no column named \"owner\"");
        let err: TVError = std::io::Error::other("boom").into();
        assert!(err.to_string().contains("boom"));
    }
}
