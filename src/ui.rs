use std::time::Duration;

use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols::border,
    text::{Line, Span},
    widgets::{Block, Cell, Clear, Paragraph, Row, Table},
};

use crate::model::Model;
use crate::search::{Row as DataRow, highlight};

pub const CMDLINE_HEIGHT: usize = 1;
pub const TABLE_HEADER_HEIGHT: usize = 1;
pub const TABLE_BORDER: usize = 1;
pub const COLUMN_WIDTH_MARGIN: usize = 1;

const STATUS_MESSAGE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Default)]
pub struct TableUI {}

impl TableUI {
    pub fn new() -> Self {
        Self {}
    }

    pub fn draw(&mut self, model: &Model, frame: &mut Frame) {
        let [table_area, cmdline_area] = Layout::vertical([
            Constraint::Min(1),
            Constraint::Length(CMDLINE_HEIGHT as u16),
        ])
        .areas(frame.area());

        self.render_table(model, frame, table_area);
        self.render_cmdline(model, frame, cmdline_area);

        if let Some(text) = model.popup() {
            Self::render_popup(text, frame);
        }
    }

    fn render_table(&self, model: &Model, frame: &mut Frame, area: Rect) {
        let view = model.view();
        let columns = model.visible_columns();
        let selected_row = model.selected_row();
        let selected_column = model.selected_column();

        let header = Row::new(columns.iter().map(|&idx| {
            let name = view
                .schema()
                .field(idx)
                .map(|f| f.name.as_str())
                .unwrap_or("");
            let label = match view.sort() {
                Some(sort) if sort.key == name => format!("{name} {}", sort.direction),
                _ => name.to_string(),
            };
            let mut style = Style::default().add_modifier(Modifier::BOLD);
            if idx == selected_column {
                style = style.fg(Color::Yellow);
            }
            Cell::from(label).style(style)
        }));

        let visible = view.visible();
        let rows: Vec<Row> = model
            .page()
            .filter_map(|pos| visible.get(pos).map(|&ridx| (pos, ridx)))
            .filter_map(|(pos, ridx)| view.rows().get(ridx).map(|row| (pos, row)))
            .map(|(pos, row)| {
                let cells = columns.iter().map(|&idx| {
                    let mut style = Style::default();
                    if pos == selected_row && idx == selected_column {
                        style = style.bg(Color::Yellow).fg(Color::Black);
                    } else if pos == selected_row {
                        style = style.bg(Color::DarkGray);
                    }
                    Cell::from(Self::cell_line(model, row, idx)).style(style)
                });
                Row::new(cells)
            })
            .collect();

        let widths: Vec<Constraint> = columns
            .iter()
            .map(|&idx| Constraint::Length(model.column_width(idx) as u16))
            .collect();

        let mut title = format!(" {} ", model.name());
        let summary = view.filter().summary();
        if !summary.is_empty() {
            title.push_str(&format!("[{summary}] "));
        }
        let block = Block::bordered()
            .title(Line::from(title.bold()).centered())
            .border_set(border::PLAIN);

        let table = Table::new(rows, widths).header(header).block(block);
        frame.render_widget(table, area);
    }

    // Keyword matches are highlighted only in the fields the keyword searches.
    fn cell_line(model: &Model, row: &DataRow, idx: usize) -> Line<'static> {
        let text = row.text(idx).replace("\r\n", " ↵ ").replace('\n', " ↵ ");
        let term = model.view().highlight_term(idx).unwrap_or("");
        let spans: Vec<Span<'static>> = highlight(&text, term)
            .into_iter()
            .map(|segment| {
                if segment.marked {
                    Span::styled(
                        segment.text.to_string(),
                        Style::default().fg(Color::Black).bg(Color::LightGreen),
                    )
                } else {
                    Span::raw(segment.text.to_string())
                }
            })
            .collect();
        Line::from(spans)
    }

    fn render_cmdline(&self, model: &Model, frame: &mut Frame, area: Rect) {
        if let Some((mode, input)) = model.cmd_input() {
            let prompt = mode.prompt();
            let line = Line::from(vec![prompt.yellow().bold(), Span::raw(input.input.clone())]);
            frame.render_widget(Paragraph::new(line), area);
            let x = area.x + (prompt.chars().count() + input.curser_pos) as u16;
            frame.set_cursor_position((x.min(area.right().saturating_sub(1)), area.y));
            return;
        }

        let view = model.view();
        let position = if view.is_empty() {
            "0/0".to_string()
        } else {
            format!("{}/{}", model.selected_row() + 1, view.len())
        };
        let message = if model.status_age() < STATUS_MESSAGE_TIMEOUT {
            model.status_message().to_string()
        } else {
            String::new()
        };

        let [left, right] = Layout::horizontal([
            Constraint::Min(1),
            Constraint::Length(position.chars().count() as u16 + 1),
        ])
        .areas(area);
        frame.render_widget(Paragraph::new(message), left);
        frame.render_widget(Paragraph::new(position.blue()).right_aligned(), right);
    }

    fn render_popup(text: &str, frame: &mut Frame) {
        let area = frame.area();
        let height = (text.lines().count() as u16 + 2).min(area.height);
        let width = (text.lines().map(|l| l.chars().count()).max().unwrap_or(0) as u16 + 4)
            .min(area.width);
        let popup = Rect {
            x: area.x + (area.width - width) / 2,
            y: area.y + (area.height - height) / 2,
            width,
            height,
        };
        let block = Block::bordered()
            .title(Line::from(" Help ".bold()).centered())
            .border_set(border::THICK);
        frame.render_widget(Clear, popup);
        frame.render_widget(Paragraph::new(text).block(block), popup);
    }
}
