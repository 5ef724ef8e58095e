//! UI rendering for the autocomplete demo.

use crate::app::App;
use crate::form::NAME;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use tui_autocomplete::CandidatePopup;

pub fn draw(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(f.area());

    draw_header(f, chunks[0]);
    draw_form(f, app, chunks[1]);
    draw_status(f, app, chunks[2]);

    // Candidate list floats over everything else
    if let Some(&(_, name_area)) = app.field_areas.iter().find(|(i, _)| *i == NAME) {
        let popup = CandidatePopup::new(name_area).max_rows(app.max_rows);
        f.render_stateful_widget(popup, f.area(), app.controller.view_mut());
    }
}

fn draw_header(f: &mut Frame, area: Rect) {
    let header = Paragraph::new("Type at least two letters of a name")
        .block(Block::default().borders(Borders::ALL).title(" Contact "));
    f.render_widget(header, area);
}

fn draw_form(f: &mut Frame, app: &mut App, area: Rect) {
    let form = app.form.borrow();
    app.field_areas.clear();

    let mut y = area.y;
    for (index, field) in form.fields.iter().enumerate() {
        if field.hidden {
            if y < area.bottom() {
                let line = format!(" {}: {}", field.label, field.value);
                let hint = Paragraph::new(line).style(Style::default().fg(Color::DarkGray));
                f.render_widget(hint, Rect::new(area.x, y, area.width, 1));
            }
            y += 1;
            continue;
        }
        if y + 3 > area.bottom() {
            break;
        }

        let field_area = Rect::new(area.x, y, area.width.min(50), 3);
        let focused = form.focus == index;
        let border = if focused {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        let text = if field.all_selected {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default()
        };

        let widget = Paragraph::new(field.value.as_str()).style(text).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border)
                .title(format!(" {} ", field.label)),
        );
        f.render_widget(widget, field_area);

        if focused {
            let cursor_x = field_area.x + 1 + field.value.chars().count() as u16;
            if cursor_x < field_area.right() - 1 {
                f.set_cursor_position((cursor_x, field_area.y + 1));
            }
        }

        app.field_areas.push((index, field_area));
        y += 3;
    }
}

fn draw_status(f: &mut Frame, app: &App, area: Rect) {
    let text = app
        .status
        .clone()
        .unwrap_or_else(|| "↑↓ select  Enter accept  Esc dismiss  Ctrl+Q quit".to_string());
    f.render_widget(
        Paragraph::new(text).style(Style::default().fg(Color::DarkGray)),
        area,
    );
}
