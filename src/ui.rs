use std::time::Instant;

use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use crate::app::{App, FocusPane, InputMode};
use crate::model::Model;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let compare_height = if app.compare_visible { 1 } else { 0 };
    let comparison_constraint = if app.comparison_visible && app.comparison_view.is_some() {
        Constraint::Percentage(45)
    } else {
        Constraint::Length(0)
    };

    // Main layout: header, question, answers, compare control, comparison, footer
    let [header_area, question_area, responses_area, compare_area, comparison_area, footer_area] =
        Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Min(6),
            Constraint::Length(compare_height),
            comparison_constraint,
            Constraint::Length(1),
        ])
        .areas(area);

    render_header(app, frame, header_area);
    render_question(app, frame, question_area);
    render_responses(app, frame, responses_area);

    if app.compare_visible {
        render_compare_control(app, frame, compare_area);
    }

    if app.comparison_visible && comparison_area.height > 0 {
        render_comparison(app, frame, comparison_area);
        app.comparison_area = Some(comparison_area);
    } else {
        app.comparison_area = None;
    }

    render_footer(app, frame, footer_area);

    if let Some(message) = app.alert.clone() {
        render_alert(&message, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" Ask AI ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(format!(" {} ", app.server_url), Style::default().fg(Color::Gray)),
        Span::styled(
            format!("[{}] ", app.render_mode.as_str()),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::Black));
    frame.render_widget(header, area);
}

fn render_question(app: &mut App, frame: &mut Frame, area: Rect) {
    app.question_area = Some(area);

    let focused = app.focus == FocusPane::Question;
    let editing = focused && app.input_mode == InputMode::Editing;
    let border_color = if editing {
        Color::Yellow
    } else if focused {
        Color::Cyan
    } else {
        Color::DarkGray
    };

    // The submit "button" lives in the top-right corner of the box
    let button_style = if app.is_busy() {
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC)
    } else {
        Style::default().fg(Color::Black).bg(Color::Green).add_modifier(Modifier::BOLD)
    };
    let button = Line::from(Span::styled(format!(" {} ", app.submit_label()), button_style)).right_aligned();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Question ")
        .title_top(button);

    // Calculate visible portion of input with horizontal scrolling
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.question_cursor;
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let text = if app.question_input.is_empty() && !editing {
        Span::styled("Ask all three models something...", Style::default().fg(Color::DarkGray))
    } else {
        let visible: String = app
            .question_input
            .chars()
            .skip(scroll_offset)
            .take(inner_width)
            .collect();
        Span::styled(visible, Style::default().fg(Color::Cyan))
    };

    frame.render_widget(Paragraph::new(text).block(block), area);

    if editing && app.alert.is_none() {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_responses(app: &mut App, frame: &mut Frame, area: Rect) {
    let columns = Layout::horizontal([
        Constraint::Ratio(1, 3),
        Constraint::Ratio(1, 3),
        Constraint::Ratio(1, 3),
    ])
    .split(area);

    let now = Instant::now();
    for model in Model::all() {
        let column = columns[model.index()];
        app.response_areas[model.index()] = Some(column);
        render_response_pane(app, frame, column, model, now);
    }
}

/// Content rows of `text` once wrapped to `width` columns, saturating at `u16::MAX`
fn wrapped_rows<'a>(text: impl Into<Text<'a>>, width: u16) -> u16 {
    let rows = Paragraph::new(text).wrap(Wrap { trim: false }).line_count(width);
    u16::try_from(rows).unwrap_or(u16::MAX)
}

fn render_response_pane(app: &mut App, frame: &mut Frame, area: Rect, model: Model, now: Instant) {
    let rows = wrapped_rows(app.response(model).text.as_str(), area.width.saturating_sub(2));
    let slot = app.response_mut(model);
    slot.rows = rows;
    slot.viewport = area.height.saturating_sub(2);
    slot.scroll = slot.scroll.min(slot.max_scroll());

    let focused = app.focus == FocusPane::Response(model);
    let editing = focused && app.input_mode == InputMode::Editing;
    let border_color = if editing {
        Color::Yellow
    } else if focused {
        Color::Cyan
    } else {
        Color::DarkGray
    };

    let slot = app.response(model);

    let mut title = vec![Span::styled(
        format!(" {} ", model.display_name()),
        Style::default().add_modifier(Modifier::BOLD),
    )];
    if let Some(label) = &slot.time_label {
        title.push(Span::styled(format!("{} ", label), Style::default().fg(Color::DarkGray)));
    }

    let copy_button = if app.is_copied(model, now) {
        Span::styled(" ✓ ", Style::default().fg(Color::Black).bg(Color::Green))
    } else {
        Span::styled(
            format!(" {} copy ", model.index() + 1),
            Style::default().fg(Color::DarkGray),
        )
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(Line::from(title))
        .title_top(Line::from(copy_button).right_aligned());

    let body = if slot.text.is_empty() && !editing {
        Text::from(Span::styled("No response yet", Style::default().fg(Color::DarkGray)))
    } else {
        Text::from(slot.text.as_str())
    };

    let paragraph = Paragraph::new(body)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((slot.scroll, 0));

    frame.render_widget(paragraph, area);
}

fn render_compare_control(app: &App, frame: &mut Frame, area: Rect) {
    let style = if app.is_busy() {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::Black).bg(Color::Magenta).add_modifier(Modifier::BOLD)
    };
    let control = Paragraph::new(Line::from(vec![
        Span::styled(" Compare responses ", style),
        Span::styled(" C ", Style::default().bg(Color::DarkGray).fg(Color::White)),
    ]))
    .centered();
    frame.render_widget(control, area);
}

fn render_comparison(app: &mut App, frame: &mut Frame, area: Rect) {
    let Some(view) = &app.comparison_view else {
        return;
    };

    let focused = app.focus == FocusPane::Comparison;
    let border_color = if focused { Color::Cyan } else { Color::Magenta };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(format!(" {} ", view.heading));

    // Cards are stacked: title line, analysis, spacer
    let mut lines: Vec<Line<'static>> = Vec::new();
    for card in &view.cards {
        lines.push(Line::from(Span::styled(
            card.title.clone(),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        lines.extend(card.body.iter().cloned());
        lines.push(Line::default());
    }

    app.comparison_rows = wrapped_rows(lines.clone(), area.width.saturating_sub(2));
    app.comparison_height = area.height.saturating_sub(2);
    app.comparison_scroll = app.comparison_scroll.min(app.comparison_max_scroll());

    let paragraph = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.comparison_scroll, 0));

    frame.render_widget(paragraph, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };
    let mode_text = match app.input_mode {
        InputMode::Normal => " NORMAL ",
        InputMode::Editing => " EDIT ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let mut spans = vec![Span::styled(mode_text, mode_style), Span::raw(" ")];

    let hints: Vec<(&str, &str)> = match app.input_mode {
        InputMode::Editing => match app.focus {
            FocusPane::Question => vec![("Enter", "ask"), ("Esc", "done"), ("Tab", "next")],
            _ => vec![("Esc", "done")],
        },
        InputMode::Normal => {
            let mut hints = vec![("Tab", "focus"), ("i", "edit"), ("1-3", "copy")];
            if app.compare_visible {
                hints.push(("C", "compare"));
            }
            if app.comparison_visible {
                hints.push(("e", "export"));
            }
            hints.extend([("m", "render"), ("q", "quit")]);
            hints
        }
    };

    for (key, label) in hints {
        spans.push(Span::styled(format!(" {} ", key), key_style));
        spans.push(Span::styled(format!(" {} ", label), label_style));
    }

    if let Some(status) = &app.status {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(status.clone(), Style::default().fg(Color::Green)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_alert(message: &str, frame: &mut Frame, area: Rect) {
    // Calculate popup size and position (centered)
    let popup_width = (message.chars().count() as u16 + 6).max(30).min(area.width.saturating_sub(4));
    let popup_height = 5.min(area.height);

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(" Error ");

    let text = Text::from(vec![
        Line::from(message.to_string()),
        Line::default(),
        Line::from(Span::styled("Press Enter to dismiss", Style::default().fg(Color::DarkGray))),
    ]);

    frame.render_widget(Paragraph::new(text).block(block).centered(), popup_area);
}
