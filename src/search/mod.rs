//! Client side search over an in-memory row collection.
//!
//! [`SearchView`] owns the rows, the active [`FilterState`] and [`SortState`], and
//! the derived list of visible row indices. Every mutation recomputes that list
//! exactly once, synchronously: filter with the compiled predicates, then a
//! stable single-key sort. Highlighting is applied separately per displayed cell.

pub mod filter;
pub mod highlight;
pub mod predicate;
pub mod row;
pub mod sort;

use std::sync::Arc;
use std::time::Instant;

use tracing::trace;

pub use filter::{DateRange, FilterState, FilterUpdate};
pub use highlight::{Segment, highlight};
pub use row::{Field, FieldKind, Row, Schema, Value};
pub use sort::{Direction, SortState};

/// Which fields the keyword searches and which field the date range applies to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchConfig {
    pub keyword_fields: Vec<String>,
    pub date_field: Option<String>,
}

impl SearchConfig {
    /// All text fields are searched, the first timestamp field takes the date range.
    pub fn for_schema(schema: &Schema) -> Self {
        SearchConfig {
            keyword_fields: schema.names_of_kind(FieldKind::Text),
            date_field: schema.names_of_kind(FieldKind::Timestamp).into_iter().next(),
        }
    }
}

pub struct SearchView {
    schema: Arc<Schema>,
    rows: Arc<Vec<Row>>,
    config: SearchConfig,
    filter: FilterState,
    sort: Option<SortState>,
    visible: Arc<Vec<usize>>, // Indices into rows, filtered and sorted
    generation: u64,
}

impl SearchView {
    pub fn new(schema: Schema, rows: Vec<Row>, config: SearchConfig) -> Self {
        let mut view = SearchView {
            schema: Arc::new(schema),
            rows: Arc::new(rows),
            config,
            filter: FilterState::default(),
            sort: None,
            visible: Arc::new(Vec::new()),
            generation: 0,
        };
        view.recompute();
        view
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn sort(&self) -> Option<&SortState> {
        self.sort.as_ref()
    }

    /// Indices of the rows that survive the filters, in display order.
    pub fn visible(&self) -> Arc<Vec<usize>> {
        Arc::clone(&self.visible)
    }

    pub fn len(&self) -> usize {
        self.visible.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visible.is_empty()
    }

    /// Row at display position `pos`.
    pub fn visible_row(&self, pos: usize) -> Option<&Row> {
        self.visible.get(pos).and_then(|&idx| self.rows.get(idx))
    }

    pub fn visible_rows(&self) -> impl Iterator<Item = &Row> + '_ {
        self.visible.iter().filter_map(|&idx| self.rows.get(idx))
    }

    /// Number of recomputes so far, the initial one included.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The keyword to highlight in `field`, if that field is searched by it.
    pub fn highlight_term(&self, field: usize) -> Option<&str> {
        let keyword = self.filter.keyword();
        if keyword.is_empty() {
            return None;
        }
        let name = &self.schema.field(field)?.name;
        self.config
            .keyword_fields
            .iter()
            .any(|f| f == name)
            .then_some(keyword)
    }

    /// Merge one filter update and recompute.
    pub fn apply(&mut self, update: FilterUpdate) {
        trace!("Apply filter update {:?}", update);
        self.filter.merge(update);
        self.recompute();
    }

    pub fn set_keyword(&mut self, keyword: impl Into<String>) {
        self.apply(FilterUpdate::Keyword(keyword.into()));
    }

    pub fn set_filter(&mut self, name: impl Into<String>, value: Option<String>) {
        self.apply(FilterUpdate::Field {
            name: name.into(),
            value,
        });
    }

    pub fn set_date_range(&mut self, range: Option<DateRange>) {
        self.apply(FilterUpdate::DateRange(range));
    }

    pub fn reset(&mut self) {
        self.apply(FilterUpdate::Reset);
    }

    pub fn set_sort(&mut self, sort: Option<SortState>) {
        trace!("Set sort {:?}", sort);
        self.sort = sort;
        self.recompute();
    }

    /// Column header click: a new key sorts ascending, the active key flips direction.
    pub fn toggle_sort(&mut self, key: &str) {
        let next = match &self.sort {
            Some(current) if current.key == key => SortState {
                key: current.key.clone(),
                direction: current.direction.flipped(),
            },
            _ => SortState::ascending(key),
        };
        self.set_sort(Some(next));
    }

    fn recompute(&mut self) {
        let start_time = Instant::now();
        let predicates = predicate::compile(&self.filter, &self.schema, &self.config);

        let mut visible: Vec<usize> = self
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| predicate::matches(&predicates, row))
            .map(|(idx, _)| idx)
            .collect();

        if let Some(sort) = &self.sort {
            let field = self.schema.index_of(&sort.key);
            sort::sort_indices(&mut visible, &self.rows, field, sort.direction);
        }

        self.visible = Arc::new(visible);
        self.generation += 1;
        trace!(
            "Recompute #{}: {} of {} rows visible, {} predicates, took {}us",
            self.generation,
            self.visible.len(),
            self.rows.len(),
            predicates.len(),
            start_time.elapsed().as_micros()
        );
    }
}
