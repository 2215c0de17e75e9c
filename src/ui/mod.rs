use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;
use regex::Regex;
use time::{macros::format_description, OffsetDateTime};

use crate::app::{FocusPane, Overlay, TextField};
use crate::config::Palette;
use crate::highlight::build_highlight_regex;
use crate::search::NoteFilter;

pub mod view;

use self::view::{View, ViewFlags};

/// Everything a frame needs, borrowed from the running app.
pub struct Screen<'a> {
    pub view: &'a View,
    pub flags: ViewFlags,
    pub focus: FocusPane,
    pub title: &'a TextField,
    pub content: &'a TextField,
    pub search: &'a TextField,
    pub filter: NoteFilter,
    pub overlay: Option<&'a Overlay>,
    pub status: Option<&'a str>,
    pub palette: Palette,
}

pub fn draw_app(frame: &mut Frame, screen: &Screen) {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(2)])
        .split(frame.size());

    let constraints: &[Constraint] = if screen.flags.menu_open {
        &[
            Constraint::Percentage(25),
            Constraint::Percentage(30),
            Constraint::Percentage(45),
        ]
    } else {
        &[Constraint::Percentage(35), Constraint::Percentage(65)]
    };
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints.to_vec())
        .split(vertical[0]);

    let (notes_area, editor_area) = if screen.flags.menu_open {
        draw_folders(frame, screen, columns[0]);
        (columns[1], columns[2])
    } else {
        (columns[0], columns[1])
    };

    let notes_column = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(1)])
        .split(notes_area);
    draw_field(
        frame,
        screen,
        notes_column[0],
        "Search",
        screen.search,
        true,
        FocusPane::Search,
    );
    draw_notes(frame, screen, notes_column[1]);

    let editor_column = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(1)])
        .split(editor_area);
    draw_field(
        frame,
        screen,
        editor_column[0],
        "Title",
        screen.title,
        screen.view.editor.title.enabled,
        FocusPane::Title,
    );
    draw_field(
        frame,
        screen,
        editor_column[1],
        "Content",
        screen.content,
        screen.view.editor.content.enabled,
        FocusPane::Content,
    );

    let status = Paragraph::new(build_status_line(screen));
    frame.render_widget(status, vertical[1]);

    render_overlay(frame, screen);
}

fn border_style(screen: &Screen, pane: FocusPane) -> Style {
    if screen.focus == pane && screen.overlay.is_none() {
        Style::default().fg(screen.palette.border_focus)
    } else {
        Style::default()
    }
}

fn active_style(palette: &Palette) -> Style {
    Style::default()
        .bg(palette.active_bg)
        .fg(palette.active_fg)
        .add_modifier(Modifier::BOLD)
}

fn draw_folders(frame: &mut Frame, screen: &Screen, area: Rect) {
    let rows = &screen.view.folders;
    let mut items: Vec<ListItem> = rows
        .iter()
        .map(|row| ListItem::new(Line::from(row.label.clone())))
        .collect();
    if items.is_empty() {
        items.push(ListItem::new("No folders. Press `N` to add one."));
    }
    let list = List::new(items)
        .block(
            Block::default()
                .title("Folders")
                .borders(Borders::ALL)
                .border_style(border_style(screen, FocusPane::Folders)),
        )
        .highlight_style(active_style(&screen.palette))
        .highlight_symbol("▸ ");
    let mut state = ListState::default();
    state.select(rows.iter().position(|row| row.active));
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_notes(frame: &mut Frame, screen: &Screen, area: Rect) {
    let palette = &screen.palette;
    let highlight_regex = build_highlight_regex(&screen.filter);
    let match_style = Style::default()
        .fg(palette.match_fg)
        .add_modifier(Modifier::BOLD);
    let rows = &screen.view.notes.rows;
    let mut items = Vec::with_capacity(rows.len());
    for row in rows {
        let title = Line::from(highlight_line(
            &row.label,
            highlight_regex.as_ref(),
            match_style,
            Style::default().add_modifier(Modifier::BOLD),
        ));
        let meta = Line::from(Span::styled(
            format!("Updated {}", format_updated(row.updated_at)),
            Style::default().fg(palette.muted),
        ));
        items.push(ListItem::new(vec![title, meta]));
    }
    if items.is_empty() {
        let hint = if screen.filter.is_active() {
            "No notes match the search."
        } else {
            "No notes yet. Press `n` to create one."
        };
        items.push(ListItem::new(hint));
    }
    let list = List::new(items)
        .block(
            Block::default()
                .title("Notes")
                .borders(Borders::ALL)
                .border_style(border_style(screen, FocusPane::Notes)),
        )
        .highlight_style(active_style(palette))
        .highlight_symbol("▸ ");
    let mut state = ListState::default();
    state.select(rows.iter().position(|row| row.active));
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_field(
    frame: &mut Frame,
    screen: &Screen,
    area: Rect,
    label: &str,
    field: &TextField,
    enabled: bool,
    pane: FocusPane,
) {
    let (title, text_style) = if enabled {
        (label.to_string(), Style::default())
    } else {
        (
            format!("{label} (disabled)"),
            Style::default().fg(screen.palette.muted),
        )
    };
    let paragraph = Paragraph::new(Text::from(field.buffer().to_string()))
        .style(text_style)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(border_style(screen, pane)),
        );
    frame.render_widget(paragraph, area);

    if enabled && screen.focus == pane && screen.overlay.is_none() {
        if let Some((x, y)) = cursor_position(field, area) {
            frame.set_cursor(x, y);
        }
    }
}

fn cursor_position(field: &TextField, area: Rect) -> Option<(u16, u16)> {
    let inner_width = area.width.saturating_sub(2);
    let inner_height = area.height.saturating_sub(2);
    if inner_width == 0 || inner_height == 0 {
        return None;
    }
    let (row, col) = field.cursor_cell();
    let row = row.min(inner_height - 1);
    let col = col.min(inner_width - 1);
    Some((area.x + 1 + col, area.y + 1 + row))
}

fn build_status_line(screen: &Screen) -> Text<'static> {
    let palette = &screen.palette;
    let mut spans = vec![
        Span::raw("Focus: "),
        Span::styled(
            screen.focus.to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(
            " | Folders: {} | Notes: {}",
            screen.view.folders.len(),
            screen.view.notes.rows.len()
        )),
    ];
    if let Some(needle) = screen.filter.needle() {
        spans.push(Span::raw(" | Search: "));
        spans.push(Span::styled(
            needle.to_string(),
            Style::default().fg(palette.match_fg),
        ));
    }
    if let Some(message) = screen.status {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(
            message.to_string(),
            Style::default()
                .fg(palette.error)
                .add_modifier(Modifier::BOLD),
        ));
    }
    let hints = Line::from(Span::styled(
        "Tab focus • j/k move • n note • N folder • d delete • / search • m menu • q quit",
        Style::default().fg(palette.muted),
    ));
    Text::from(vec![Line::from(spans), hints])
}

fn format_updated(updated_at: i64) -> String {
    OffsetDateTime::from_unix_timestamp_nanos(updated_at as i128 * 1_000_000)
        .ok()
        .and_then(|dt| {
            dt.format(&format_description!("[year]-[month]-[day] [hour]:[minute]"))
                .ok()
        })
        .unwrap_or_else(|| "unknown".to_string())
}

fn highlight_line(
    text: &str,
    regex: Option<&Regex>,
    highlight_style: Style,
    base_style: Style,
) -> Vec<Span<'static>> {
    let Some(re) = regex else {
        return vec![Span::styled(text.to_string(), base_style)];
    };
    let mut spans = Vec::new();
    let mut last = 0;
    for mat in re.find_iter(text) {
        if mat.start() > last {
            spans.push(Span::styled(
                text[last..mat.start()].to_string(),
                base_style,
            ));
        }
        spans.push(Span::styled(mat.as_str().to_string(), highlight_style));
        last = mat.end();
    }
    if last < text.len() {
        spans.push(Span::styled(text[last..].to_string(), base_style));
    }
    if spans.is_empty() {
        spans.push(Span::styled(text.to_string(), base_style));
    }
    spans
}

fn render_overlay(frame: &mut Frame, screen: &Screen) {
    let palette = &screen.palette;
    let Some(overlay) = screen.overlay else {
        return;
    };
    let (title, lines) = match overlay {
        Overlay::Confirm { message, .. } => (
            "Confirm",
            vec![
                Line::from(Span::styled(
                    message.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
                Line::from(Span::styled(
                    "y / Enter to delete • n / Esc to cancel",
                    Style::default().fg(palette.muted),
                )),
            ],
        ),
        Overlay::Prompt { label, input, .. } => {
            let mut display = input.buffer().to_string();
            display.push('▌');
            (
                *label,
                vec![
                    Line::from(Span::styled(
                        label.to_string(),
                        Style::default().add_modifier(Modifier::BOLD),
                    )),
                    Line::from(""),
                    Line::from(display),
                    Line::from(""),
                    Line::from(Span::styled(
                        "Enter to save • Esc to cancel",
                        Style::default().fg(palette.muted),
                    )),
                ],
            )
        }
    };
    let area = centered_rect(60, 30, frame.size());
    frame.render_widget(Clear, area);
    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(Style::default().fg(palette.border_focus)),
        )
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
