use std::collections::BTreeMap;

use chrono::NaiveDateTime;

use super::row::parse_timestamp;

/// Inclusive date range. `to` always covers its whole day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDateTime,
    pub to: NaiveDateTime,
}

impl DateRange {
    pub fn new(from: NaiveDateTime, to: NaiveDateTime) -> Self {
        DateRange { from, to }
    }

    /// `to` moved to 23:59:59.999 of its day, whatever time it carried.
    pub fn end_of_day(&self) -> Option<NaiveDateTime> {
        self.to.date().and_hms_milli_opt(23, 59, 59, 999)
    }

    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        match self.end_of_day() {
            Some(end) => self.from <= ts && ts <= end,
            None => false,
        }
    }

    /// Parses `FROM..TO` where both ends are accepted by [`parse_timestamp`].
    pub fn parse(input: &str) -> Option<DateRange> {
        let (from, to) = input.split_once("..")?;
        Some(DateRange {
            from: parse_timestamp(from)?,
            to: parse_timestamp(to)?,
        })
    }
}

/// One atomic change to a [`FilterState`].
#[derive(Debug, Clone, PartialEq)]
pub enum FilterUpdate {
    Keyword(String),
    Field { name: String, value: Option<String> },
    DateRange(Option<DateRange>),
    Reset,
}

/// Active keyword, per-field equality filters and date range of a view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterState {
    keyword: String,
    field_filters: BTreeMap<String, String>,
    date_range: Option<DateRange>,
}

impl FilterState {
    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn field_filters(&self) -> &BTreeMap<String, String> {
        &self.field_filters
    }

    pub fn field_filter(&self, name: &str) -> Option<&str> {
        self.field_filters.get(name).map(String::as_str)
    }

    pub fn date_range(&self) -> Option<DateRange> {
        self.date_range
    }

    pub fn is_empty(&self) -> bool {
        self.keyword.is_empty() && self.field_filters.is_empty() && self.date_range.is_none()
    }

    /// Merge a single update. Nothing outside the updated part changes.
    pub fn merge(&mut self, update: FilterUpdate) {
        match update {
            FilterUpdate::Keyword(keyword) => self.keyword = keyword,
            FilterUpdate::Field { name, value } => match value {
                Some(v) if !v.is_empty() => {
                    self.field_filters.insert(name, v);
                }
                _ => {
                    self.field_filters.remove(&name);
                }
            },
            FilterUpdate::DateRange(range) => self.date_range = range,
            FilterUpdate::Reset => *self = FilterState::default(),
        }
    }

    /// Short human readable form for the status line.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if !self.keyword.is_empty() {
            parts.push(format!("/{}", self.keyword));
        }
        for (name, value) in &self.field_filters {
            parts.push(format!("{name}={value}"));
        }
        if let Some(range) = &self.date_range {
            parts.push(format!(
                "{}..{}",
                range.from.format("%Y-%m-%d"),
                range.to.format("%Y-%m-%d")
            ));
        }
        parts.join(" ")
    }
}
