use super::SearchConfig;
use super::filter::{DateRange, FilterState};
use super::highlight::contains_match;
use super::row::{Row, Schema};

/// A single row test derived from a [`FilterState`].
///
/// Field references are resolved against the schema at compile time. A field that
/// does not exist compiles to `None` and never matches.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Case-insensitive needle, searched in every listed field.
    Keyword { needle: String, fields: Vec<usize> },
    FieldEquals { field: Option<usize>, value: String },
    DateRange { field: Option<usize>, range: DateRange },
}

impl Predicate {
    pub fn test(&self, row: &Row) -> bool {
        match self {
            Predicate::Keyword { needle, fields } => fields
                .iter()
                .filter_map(|&idx| row.get(idx))
                .any(|value| contains_match(&value.as_text(), needle)),
            Predicate::FieldEquals { field, value } => field
                .and_then(|idx| row.get(idx))
                .is_some_and(|v| v.as_text() == value.as_str()),
            Predicate::DateRange { field, range } => field
                .and_then(|idx| row.get(idx))
                .and_then(|v| v.as_timestamp())
                .is_some_and(|ts| range.contains(ts)),
        }
    }
}

/// Compile the active parts of `state` into an ordered predicate list:
/// keyword, then field filters by field name, then the date range.
pub fn compile(state: &FilterState, schema: &Schema, config: &SearchConfig) -> Vec<Predicate> {
    let mut predicates = Vec::new();

    if !state.keyword().is_empty() {
        let fields = config
            .keyword_fields
            .iter()
            .filter_map(|name| schema.index_of(name))
            .collect();
        predicates.push(Predicate::Keyword {
            needle: state.keyword().to_string(),
            fields,
        });
    }

    for (name, value) in state.field_filters() {
        predicates.push(Predicate::FieldEquals {
            field: schema.index_of(name),
            value: value.clone(),
        });
    }

    if let Some(range) = state.date_range() {
        predicates.push(Predicate::DateRange {
            field: config
                .date_field
                .as_deref()
                .and_then(|name| schema.index_of(name)),
            range,
        });
    }

    predicates
}

/// True iff every predicate accepts the row. An empty list accepts everything.
pub fn matches(predicates: &[Predicate], row: &Row) -> bool {
    predicates.iter().all(|p| p.test(row))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::filter::FilterUpdate;
    use crate::search::row::{Field, FieldKind, Value};
    use chrono::{NaiveDate, NaiveDateTime};

    fn ts(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn schema() -> Schema {
        Schema::new(vec![
            Field::new("name", FieldKind::Text),
            Field::new("owner", FieldKind::Text),
            Field::new("status", FieldKind::Category),
            Field::new("created_at", FieldKind::Timestamp),
        ])
    }

    fn config() -> SearchConfig {
        SearchConfig {
            keyword_fields: vec!["name".into(), "owner".into()],
            date_field: Some("created_at".into()),
        }
    }

    fn row(name: &str, owner: Option<&str>, status: &str, created: Option<NaiveDateTime>) -> Row {
        Row::new(vec![
            Some(Value::Text(name.into())),
            owner.map(|o| Value::Text(o.into())),
            Some(Value::Text(status.into())),
            created.map(Value::Timestamp),
        ])
    }

    fn compiled(updates: Vec<FilterUpdate>) -> Vec<Predicate> {
        let mut state = FilterState::default();
        for u in updates {
            state.merge(u);
        }
        compile(&state, &schema(), &config())
    }

    #[test]
    fn empty_state_compiles_to_nothing() {
        let predicates = compiled(vec![]);
        assert!(predicates.is_empty());
        assert!(matches(&predicates, &row("x", None, "", None)));
    }

    #[test]
    fn keyword_is_case_insensitive_over_declared_fields() {
        let predicates = compiled(vec![FilterUpdate::Keyword("SI".into())]);
        assert!(matches(&predicates, &row("Gamma", Some("Li Si"), "a", None)));
        assert!(matches(&predicates, &row("Sierra", None, "a", None)));
        // status is not a keyword field
        assert!(!matches(&predicates, &row("Gamma", None, "si", None)));
    }

    #[test]
    fn keyword_matches_only_what_gets_highlighted() {
        // 'İ' lowercases to "i\u{307}", a plain "i" is half of that char
        let predicates = compiled(vec![FilterUpdate::Keyword("i".into())]);
        assert!(!matches(&predicates, &row("İstanbul", None, "a", None)));
        assert!(crate::search::highlight("İstanbul", "i").iter().all(|s| !s.marked));

        let predicates = compiled(vec![FilterUpdate::Keyword("σ".into())]);
        assert!(matches(&predicates, &row("ΟΔΟΣ", None, "a", None)));
        assert!(crate::search::highlight("ΟΔΟΣ", "σ").iter().any(|s| s.marked));
    }

    #[test]
    fn field_equality_is_exact() {
        let predicates = compiled(vec![FilterUpdate::Field {
            name: "status".into(),
            value: Some("active".into()),
        }]);
        assert!(matches(&predicates, &row("a", None, "active", None)));
        assert!(!matches(&predicates, &row("a", None, "Active", None)));
        assert!(!matches(&predicates, &row("a", None, "active ", None)));
    }

    #[test]
    fn unknown_field_never_matches() {
        let predicates = compiled(vec![FilterUpdate::Field {
            name: "region".into(),
            value: Some("eu".into()),
        }]);
        assert!(!matches(&predicates, &row("a", None, "eu", None)));
    }

    #[test]
    fn date_range_is_inclusive_and_skips_missing_dates() {
        let predicates = compiled(vec![FilterUpdate::DateRange(Some(DateRange::new(
            ts(2025, 1, 10),
            ts(2025, 1, 31),
        )))]);
        assert!(matches(&predicates, &row("a", None, "", Some(ts(2025, 1, 10)))));
        let last_moment = NaiveDate::from_ymd_opt(2025, 1, 31)
            .unwrap()
            .and_hms_milli_opt(23, 59, 59, 999)
            .unwrap();
        assert!(matches(&predicates, &row("a", None, "", Some(last_moment))));
        assert!(!matches(&predicates, &row("a", None, "", Some(ts(2025, 2, 1)))));
        assert!(!matches(&predicates, &row("a", None, "", None)));
    }

    #[test]
    fn predicates_are_and_combined_in_order() {
        let predicates = compiled(vec![
            FilterUpdate::DateRange(Some(DateRange::new(ts(2025, 1, 1), ts(2025, 12, 31)))),
            FilterUpdate::Field {
                name: "status".into(),
                value: Some("active".into()),
            },
            FilterUpdate::Keyword("alp".into()),
        ]);
        assert!(matches!(predicates[0], Predicate::Keyword { .. }));
        assert!(matches!(predicates[1], Predicate::FieldEquals { .. }));
        assert!(matches!(predicates[2], Predicate::DateRange { .. }));

        assert!(matches(&predicates, &row("Alpha", None, "active", Some(ts(2025, 3, 1)))));
        assert!(!matches(&predicates, &row("Alpha", None, "deleted", Some(ts(2025, 3, 1)))));
        assert!(!matches(&predicates, &row("Beta", None, "active", Some(ts(2025, 3, 1)))));
    }
}
