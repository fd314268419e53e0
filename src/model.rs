use std::ops::Range;
use std::time::Instant;

use arboard::Clipboard;
use rayon::prelude::*;
use tracing::{info, trace, warn};

use crate::domain::{CMDMode, HELP_TEXT, Message, TVConfig, TVError};
use crate::inputter::{InputResult, Inputter};
use crate::loader::Dataset;
use crate::search::{DateRange, SearchConfig, SearchView, SortState};
use crate::ui::{CMDLINE_HEIGHT, COLUMN_WIDTH_MARGIN, TABLE_BORDER, TABLE_HEADER_HEIGHT};

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Status {
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    TABLE,
    POPUP,
    CMDINPUT,
}

#[derive(Default, Clone, Debug, PartialEq)]
pub struct UILayout {
    pub width: usize,
    pub height: usize,
    pub table_width: usize,
    pub table_height: usize,
}

impl UILayout {
    pub fn from_values(ui_width: usize, ui_height: usize) -> Self {
        let layout = UILayout {
            width: ui_width,
            height: ui_height,
            table_width: ui_width.saturating_sub(2 * TABLE_BORDER),
            table_height: ui_height
                .saturating_sub(CMDLINE_HEIGHT + 2 * TABLE_BORDER + TABLE_HEADER_HEIGHT)
                .max(1),
        };
        trace!("Build UILayout: {:?}", layout);
        layout
    }
}

pub struct Model {
    pub status: Status,
    modus: Modus,
    name: String,
    view: SearchView,
    column_widths: Vec<usize>,
    curser_row: usize,    // Row inside the current page
    offset_row: usize,    // First row of the current page
    curser_column: usize, // Absolute column index
    offset_column: usize,
    uilayout: UILayout,
    clipboard: Option<Clipboard>,
    input: Inputter,
    cmd_mode: Option<CMDMode>,
    last_input: InputResult,
    status_message: String,
    last_status_message_update: Instant,
}

impl Model {
    pub fn init(config: &TVConfig, dataset: Dataset, ui_width: usize, ui_height: usize) -> Self {
        let hints = SearchConfig {
            keyword_fields: config.keyword_fields.clone(),
            date_field: config.date_field.clone(),
        };
        let search_config = dataset.search_config(&hints);
        info!(
            "Keyword fields {:?}, date field {:?}",
            search_config.keyword_fields, search_config.date_field
        );
        let column_widths = Self::calculate_column_widths(&dataset, config.max_column_width);
        let view = SearchView::new(dataset.schema, dataset.rows, search_config);

        let mut model = Self {
            status: Status::READY,
            modus: Modus::TABLE,
            name: dataset.name,
            view,
            column_widths,
            curser_row: 0,
            offset_row: 0,
            curser_column: 0,
            offset_column: 0,
            uilayout: UILayout::from_values(ui_width, ui_height),
            clipboard: None,
            input: Inputter::default(),
            cmd_mode: None,
            last_input: InputResult::default(),
            status_message: String::new(),
            last_status_message_update: Instant::now(),
        };
        model.set_status_message(format!("Loaded {} rows", model.view.rows().len()));
        model
    }

    // Widest cell (or header) per column plus margin, capped at max_column_width.
    fn calculate_column_widths(dataset: &Dataset, max_column_width: usize) -> Vec<usize> {
        dataset
            .schema
            .fields()
            .par_iter()
            .enumerate()
            .map(|(idx, field)| {
                let widest = dataset
                    .rows
                    .iter()
                    .map(|row| row.text(idx).chars().count())
                    .max()
                    .unwrap_or(0);
                let width = std::cmp::max(field.name.chars().count() + 2, widest) + COLUMN_WIDTH_MARGIN;
                std::cmp::min(width, max_column_width)
            })
            .collect()
    }

    // ------------------------- Accessors for the UI ------------------------- //

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn view(&self) -> &SearchView {
        &self.view
    }

    pub fn layout(&self) -> &UILayout {
        &self.uilayout
    }

    pub fn raw_keyevents(&self) -> bool {
        self.modus == Modus::CMDINPUT
    }

    pub fn column_width(&self, column: usize) -> usize {
        self.column_widths.get(column).copied().unwrap_or(0)
    }

    /// Columns that fit into the table, starting at the horizontal offset.
    pub fn visible_columns(&self) -> Vec<usize> {
        let mut columns = Vec::new();
        let mut used = 0;
        for idx in self.offset_column..self.column_widths.len() {
            let width = self.column_widths[idx];
            if !columns.is_empty() && used + width > self.uilayout.table_width {
                break;
            }
            used += width;
            columns.push(idx);
        }
        columns
    }

    /// Display positions of the rows on the current page.
    pub fn page(&self) -> Range<usize> {
        let end = std::cmp::min(self.offset_row + self.uilayout.table_height, self.view.len());
        self.offset_row.min(end)..end
    }

    pub fn selected_row(&self) -> usize {
        self.offset_row + self.curser_row
    }

    pub fn selected_column(&self) -> usize {
        self.curser_column
    }

    pub fn cmd_input(&self) -> Option<(CMDMode, &InputResult)> {
        match (self.modus, self.cmd_mode) {
            (Modus::CMDINPUT, Some(mode)) => Some((mode, &self.last_input)),
            _ => None,
        }
    }

    pub fn popup(&self) -> Option<&str> {
        (self.modus == Modus::POPUP).then_some(HELP_TEXT)
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    pub fn status_age(&self) -> std::time::Duration {
        self.last_status_message_update.elapsed()
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.last_status_message_update = Instant::now();
    }

    fn current_column_name(&self) -> Option<String> {
        self.view
            .schema()
            .field(self.curser_column)
            .map(|f| f.name.clone())
    }

    // --------------------------- Message handling --------------------------- //

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    pub fn update(&mut self, message: Option<Message>) -> Result<(), TVError> {
        let Some(msg) = message else {
            return Ok(());
        };
        trace!("Update: Modus {:?}, Message {:?}", self.modus, msg);
        match self.modus {
            Modus::TABLE => match msg {
                Message::Quit => self.quit(),
                Message::MoveDown => self.move_selection_down(1),
                Message::MoveUp => self.move_selection_up(1),
                Message::MoveLeft => self.move_selection_left(),
                Message::MoveRight => self.move_selection_right(),
                Message::MovePageUp => self.move_selection_up(self.uilayout.table_height),
                Message::MovePageDown => self.move_selection_down(self.uilayout.table_height),
                Message::MoveBeginning => self.select_row(0),
                Message::MoveEnd => self.select_row(self.view.len().saturating_sub(1)),
                Message::Resize(width, height) => self.ui_resize(width, height),
                Message::CopyCell => self.copy_table_cell(),
                Message::CopyRow => self.copy_table_row(),
                Message::Help => self.modus = Modus::POPUP,
                Message::Keyword => self.enter_cmd_mode(CMDMode::Keyword),
                Message::FilterColumn => self.enter_cmd_mode(CMDMode::FilterColumn),
                Message::DateRange => self.enter_cmd_mode(CMDMode::DateRange),
                Message::ResetFilters => {
                    self.view.reset();
                    self.after_view_change();
                }
                Message::ToggleSort => self.sort_current_column(None),
                Message::SortAscending => self.sort_current_column(Some(true)),
                Message::SortDescending => self.sort_current_column(Some(false)),
                _ => (),
            },
            Modus::POPUP => match msg {
                Message::Quit => self.quit(),
                Message::Resize(width, height) => self.ui_resize(width, height),
                Message::Exit | Message::Help => self.modus = Modus::TABLE,
                _ => (),
            },
            Modus::CMDINPUT => match msg {
                Message::RawKey(key) => self.raw_input(key),
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => (),
            },
        }
        Ok(())
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.uilayout.width, width, self.uilayout.height, height
        );
        self.uilayout = UILayout::from_values(width, height);
        let selected = self.selected_row();
        self.offset_row = 0;
        self.curser_row = 0;
        self.select_row(selected);
        self.ensure_column_visible();
    }

    fn enter_cmd_mode(&mut self, mode: CMDMode) {
        let current = match mode {
            CMDMode::Keyword => self.view.filter().keyword().to_string(),
            CMDMode::FilterColumn => self
                .current_column_name()
                .and_then(|name| self.view.filter().field_filter(&name).map(str::to_string))
                .unwrap_or_default(),
            CMDMode::DateRange => {
                if self.view.config().date_field.is_none() {
                    self.set_status_message("No date column to filter on");
                    return;
                }
                self.view
                    .filter()
                    .date_range()
                    .map(|r| format!("{}..{}", r.from.format("%Y-%m-%d"), r.to.format("%Y-%m-%d")))
                    .unwrap_or_default()
            }
        };
        self.input.clear();
        self.input.set(&current);
        self.last_input = self.input.get();
        self.cmd_mode = Some(mode);
        self.modus = Modus::CMDINPUT;
    }

    fn raw_input(&mut self, key: ratatui::crossterm::event::KeyEvent) {
        self.last_input = self.input.read(key);
        if self.last_input.finished {
            self.modus = Modus::TABLE;
            if self.last_input.canceled {
                trace!("Command input canceled");
                self.cmd_mode = None;
            } else {
                self.handle_cmd_input();
            }
        }
    }

    fn handle_cmd_input(&mut self) {
        let cmd_input = self.last_input.input.clone();
        trace!("Handle cmd input {:?} for {:?}", cmd_input, self.cmd_mode);
        match self.cmd_mode.take() {
            Some(CMDMode::Keyword) => {
                self.view.set_keyword(cmd_input);
                self.after_view_change();
            }
            Some(CMDMode::FilterColumn) => {
                if let Some(name) = self.current_column_name() {
                    self.view.set_filter(name, Some(cmd_input));
                    self.after_view_change();
                }
            }
            Some(CMDMode::DateRange) => {
                let trimmed = cmd_input.trim();
                if trimmed.is_empty() {
                    self.view.set_date_range(None);
                    self.after_view_change();
                } else if let Some(range) = DateRange::parse(trimmed) {
                    self.view.set_date_range(Some(range));
                    self.after_view_change();
                } else {
                    warn!("Invalid date range input {:?}", trimmed);
                    self.set_status_message(format!("Invalid date range \"{trimmed}\", expected FROM..TO"));
                }
            }
            None => {
                info!("Cmd mode is none!")
            }
        }
    }

    fn sort_current_column(&mut self, ascending: Option<bool>) {
        let Some(name) = self.current_column_name() else {
            return;
        };
        match ascending {
            None => self.view.toggle_sort(&name),
            Some(true) => self.view.set_sort(Some(SortState::ascending(name))),
            Some(false) => self.view.set_sort(Some(SortState::descending(name))),
        }
        self.select_row(0);
        if let Some(sort) = self.view.sort() {
            self.set_status_message(format!("Sorted by {} {}", sort.key, sort.direction));
        }
    }

    // The visible rows changed: back to the top and report the count.
    fn after_view_change(&mut self) {
        self.offset_row = 0;
        self.curser_row = 0;
        let summary = self.view.filter().summary();
        let message = if summary.is_empty() {
            format!("{} rows", self.view.len())
        } else {
            format!("{} of {} rows  [{}]", self.view.len(), self.view.rows().len(), summary)
        };
        self.set_status_message(message);
    }

    fn select_row(&mut self, row: usize) {
        let row = std::cmp::min(row, self.view.len().saturating_sub(1));
        let height = self.uilayout.table_height.max(1);
        if row < self.offset_row {
            self.offset_row = row;
        } else if row >= self.offset_row + height {
            self.offset_row = row + 1 - height;
        }
        self.curser_row = row - self.offset_row;
    }

    fn move_selection_up(&mut self, size: usize) {
        self.select_row(self.selected_row().saturating_sub(size));
    }

    fn move_selection_down(&mut self, size: usize) {
        self.select_row(self.selected_row() + size);
    }

    fn move_selection_left(&mut self) {
        self.curser_column = self.curser_column.saturating_sub(1);
        self.ensure_column_visible();
    }

    fn move_selection_right(&mut self) {
        if self.curser_column + 1 < self.column_widths.len() {
            self.curser_column += 1;
        }
        self.ensure_column_visible();
    }

    fn ensure_column_visible(&mut self) {
        if self.curser_column < self.offset_column {
            self.offset_column = self.curser_column;
        }
        while self.offset_column < self.curser_column
            && !self.visible_columns().contains(&self.curser_column)
        {
            self.offset_column += 1;
        }
    }

    // ------------------------------ Clipboard ------------------------------- //

    fn wrap_cell_content(c: &str) -> String {
        let needs_escaping = c.contains('"');
        let needs_wrapping = c.chars().any(|c| c == ' ' || c == '\t' || c == ',');
        let mut out = String::from(c);

        if needs_escaping {
            out = out.replace('"', "\"\"");
        }
        if needs_escaping || needs_wrapping {
            out = format!("\"{out}\"");
        }
        out
    }

    fn copy_table_cell(&mut self) {
        let Some(row) = self.view.visible_row(self.selected_row()) else {
            self.set_status_message("Nothing to copy");
            return;
        };
        let cell = row.text(self.curser_column).into_owned();
        trace!("Cell content: {}", cell);
        self.set_clipboard(cell);
    }

    fn copy_table_row(&mut self) {
        let Some(row) = self.view.visible_row(self.selected_row()) else {
            self.set_status_message("Nothing to copy");
            return;
        };
        let row_content = (0..self.view.schema().len())
            .map(|idx| Self::wrap_cell_content(&row.text(idx)))
            .collect::<Vec<String>>()
            .join(",");
        self.set_clipboard(row_content);
    }

    fn set_clipboard(&mut self, content: String) {
        if self.clipboard.is_none() {
            match Clipboard::new() {
                Ok(clipboard) => self.clipboard = Some(clipboard),
                Err(e) => {
                    warn!("Clipboard unavailable: {:?}", e);
                    self.set_status_message("Clipboard unavailable");
                    return;
                }
            }
        }
        if let Some(clipboard) = self.clipboard.as_mut() {
            match clipboard.set_text(content) {
                Ok(_) => self.set_status_message("Copied to clipboard"),
                Err(e) => {
                    warn!("Error copying to clipboard: {:?}", e);
                    self.set_status_message("Copy failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{Field, FieldKind, Row, Schema, Value};
    use chrono::NaiveDate;
    use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    fn dataset() -> Dataset {
        let day = |m, d| {
            Some(Value::Timestamp(
                NaiveDate::from_ymd_opt(2025, m, d)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap(),
            ))
        };
        let text = |s: &str| Some(Value::Text(s.to_string()));
        let rows = vec![
            Row::new(vec![text("Alpha"), text("Li Si"), text("active"), day(1, 10)]),
            Row::new(vec![text("Beta"), text("Zhang San"), text("deleted"), day(2, 1)]),
            Row::new(vec![text("Gamma"), text("Wang Wu"), text("active"), day(3, 15)]),
            Row::new(vec![text("Delta"), text("li lei"), text("frozen"), None]),
        ];
        Dataset {
            name: "spaces.csv".into(),
            schema: Schema::new(vec![
                Field::new("name", FieldKind::Text),
                Field::new("owner", FieldKind::Text),
                Field::new("status", FieldKind::Category),
                Field::new("created_at", FieldKind::Timestamp),
            ]),
            rows,
        }
    }

    fn model() -> Model {
        Model::init(&TVConfig::default(), dataset(), 80, 10)
    }

    fn send(model: &mut Model, msg: Message) {
        model.update(Some(msg)).unwrap();
    }

    fn type_command(model: &mut Model, start: Message, text: &str) {
        send(model, start);
        for c in text.chars() {
            send(model, Message::RawKey(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)));
        }
        send(model, Message::RawKey(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)));
    }

    fn visible_names(model: &Model) -> Vec<String> {
        model
            .view()
            .visible_rows()
            .map(|r| r.text(0).into_owned())
            .collect()
    }

    #[test]
    fn keyword_command_narrows_rows_and_resets_cursor() {
        let mut m = model();
        send(&mut m, Message::MoveEnd);
        assert_eq!(m.selected_row(), 3);
        type_command(&mut m, Message::Keyword, "li");
        assert_eq!(visible_names(&m), vec!["Alpha", "Delta"]);
        assert_eq!(m.selected_row(), 0);
        assert!(!m.raw_keyevents());
        assert!(m.status_message().starts_with("2 of 4 rows"));
    }

    #[test]
    fn filter_command_uses_the_current_column() {
        let mut m = model();
        send(&mut m, Message::MoveRight);
        send(&mut m, Message::MoveRight);
        type_command(&mut m, Message::FilterColumn, "active");
        assert_eq!(visible_names(&m), vec!["Alpha", "Gamma"]);
        assert_eq!(m.view().filter().field_filter("status"), Some("active"));

        // empty input clears the filter again
        send(&mut m, Message::FilterColumn);
        for _ in 0.."active".len() {
            send(&mut m, Message::RawKey(KeyEvent::new(KeyCode::Backspace, KeyModifiers::NONE)));
        }
        send(&mut m, Message::RawKey(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)));
        assert_eq!(m.view().len(), 4);
    }

    #[test]
    fn date_range_command_and_invalid_input() {
        let mut m = model();
        type_command(&mut m, Message::DateRange, "2025-01-10..2025-02-01");
        assert_eq!(visible_names(&m), vec!["Alpha", "Beta"]);

        let generation = m.view().generation();
        send(&mut m, Message::DateRange);
        send(&mut m, Message::RawKey(KeyEvent::new(KeyCode::Char('x'), KeyModifiers::NONE)));
        send(&mut m, Message::RawKey(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)));
        assert_eq!(m.view().generation(), generation);
        assert!(m.status_message().starts_with("Invalid date range"));
    }

    #[test]
    fn escape_cancels_without_recompute() {
        let mut m = model();
        let generation = m.view().generation();
        send(&mut m, Message::Keyword);
        send(&mut m, Message::RawKey(KeyEvent::new(KeyCode::Char('b'), KeyModifiers::NONE)));
        send(&mut m, Message::RawKey(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)));
        assert_eq!(m.view().generation(), generation);
        assert_eq!(m.view().filter().keyword(), "");
        assert!(!m.raw_keyevents());
    }

    #[test]
    fn sort_keys_sort_the_current_column() {
        let mut m = model();
        send(&mut m, Message::SortDescending);
        assert_eq!(visible_names(&m), vec!["Gamma", "Delta", "Beta", "Alpha"]);
        send(&mut m, Message::ToggleSort);
        assert_eq!(visible_names(&m), vec!["Alpha", "Beta", "Delta", "Gamma"]);

        for _ in 0..3 {
            send(&mut m, Message::MoveRight);
        }
        send(&mut m, Message::SortAscending);
        // missing date first
        assert_eq!(visible_names(&m), vec!["Delta", "Alpha", "Beta", "Gamma"]);
    }

    #[test]
    fn reset_restores_all_rows() {
        let mut m = model();
        type_command(&mut m, Message::Keyword, "zzz");
        assert!(m.view().is_empty());
        assert_eq!(m.page(), 0..0);
        send(&mut m, Message::ResetFilters);
        assert_eq!(m.view().len(), 4);
    }

    #[test]
    fn paging_keeps_the_cursor_on_screen() {
        let mut m = Model::init(&TVConfig::default(), dataset(), 80, 6);
        let height = m.layout().table_height;
        assert_eq!(height, 2);
        send(&mut m, Message::MovePageDown);
        assert_eq!(m.selected_row(), 2);
        assert_eq!(m.page(), 1..3);
        send(&mut m, Message::MoveEnd);
        assert_eq!(m.page(), 2..4);
        send(&mut m, Message::MoveBeginning);
        assert_eq!(m.page(), 0..2);
    }

    #[test]
    fn help_popup_opens_and_closes() {
        let mut m = model();
        send(&mut m, Message::Help);
        assert!(m.popup().is_some());
        send(&mut m, Message::Exit);
        assert!(m.popup().is_none());
        send(&mut m, Message::Quit);
        assert_eq!(m.status, Status::QUITTING);
    }

    #[test]
    fn row_copy_quotes_like_csv() {
        assert_eq!(Model::wrap_cell_content("Alpha"), "Alpha");
        assert_eq!(Model::wrap_cell_content("Li Si"), "\"Li Si\"");
        assert_eq!(Model::wrap_cell_content("a\"b"), "\"a\"\"b\"");
    }
}
