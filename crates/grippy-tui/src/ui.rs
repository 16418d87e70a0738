// UI rendering logic
use crate::app::{App, FormField, InputMode};
use grippy_core::Screen;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};

pub fn render(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(5),    // Screen body
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    render_header(frame, app, chunks[0]);

    match app.screen() {
        Screen::Login | Screen::Signup => render_auth_form(frame, app, chunks[1]),
        Screen::Search => render_search(frame, app, chunks[1]),
        Screen::Favorites => render_favorites(frame, app, chunks[1]),
    }

    render_status_bar(frame, app, chunks[2]);
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![
        Span::styled(
            "Grippy",
            Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(app.screen().title(), Style::default().fg(Color::Cyan)),
    ];

    if let Some(email) = &app.user_email {
        spans.push(Span::raw("  |  "));
        spans.push(Span::styled(email.as_str(), Style::default().fg(Color::Gray)));
    }

    if app.loading {
        spans.push(Span::styled("  loading...", Style::default().fg(Color::Yellow)));
    }

    let header = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    frame.render_widget(header, area);
}

/// Centered box of `width` x `height` inside `area`
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn render_auth_form(frame: &mut Frame, app: &App, area: Rect) {
    let signup = app.screen() == Screen::Signup;
    let mut fields = vec![
        (FormField::Email, "Email", app.form.email.clone()),
        (FormField::Password, "Password", mask(&app.form.password)),
    ];
    if signup {
        fields.push((FormField::Confirm, "Confirm password", mask(&app.form.confirm)));
    }

    let height = fields.len() as u16 * 3 + 4;
    let form_area = centered(area, 50, height);

    let outer = Block::default()
        .borders(Borders::ALL)
        .title(if signup { " Create an account " } else { " Log in " })
        .border_style(Style::default().fg(Color::Magenta));
    let inner = outer.inner(form_area);
    frame.render_widget(outer, form_area);

    let mut constraints: Vec<Constraint> = fields.iter().map(|_| Constraint::Length(3)).collect();
    constraints.push(Constraint::Min(1));
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(inner);

    for (i, (field, label, value)) in fields.iter().enumerate() {
        let focused = app.form.focus == *field;
        let style = if focused {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };

        let input = Paragraph::new(value.as_str()).style(style).block(
            Block::default()
                .borders(Borders::ALL)
                .title(*label)
                .border_style(style),
        );
        frame.render_widget(input, rows[i]);

        if focused {
            frame.set_cursor_position((cursor_x(rows[i], value.chars().count()), rows[i].y + 1));
        }
    }

    let hint = if signup {
        "ENTER: sign up | ESC: back to login"
    } else {
        "ENTER: log in | Ctrl+N: create account"
    };
    let hint = Paragraph::new(hint)
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    frame.render_widget(hint, rows[fields.len()]);
}

/// Column just past `len` chars inside a bordered box, kept on the last
/// inner column once the text is wider than the box
fn cursor_x(area: Rect, len: usize) -> u16 {
    let len = u16::try_from(len).unwrap_or(u16::MAX);
    let max_offset = area.width.saturating_sub(3);
    area.x.saturating_add(1).saturating_add(len.min(max_offset))
}

fn mask(secret: &str) -> String {
    "*".repeat(secret.chars().count())
}

fn render_search(frame: &mut Frame, app: &mut App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Search input
            Constraint::Min(3),    // Results and preview
            Constraint::Length(1), // Page indicator
        ])
        .split(area);

    render_search_input(frame, app, chunks[0]);

    let content = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[1]);

    render_results_list(frame, app, content[0]);
    render_preview(frame, app, content[1]);
    render_page_indicator(frame, app, chunks[2]);
}

fn render_search_input(frame: &mut Frame, app: &App, area: Rect) {
    let input_style = match app.input_mode {
        InputMode::Editing => Style::default().fg(Color::Yellow),
        InputMode::Normal | InputMode::PageJump => Style::default(),
    };

    let input = Paragraph::new(app.search_input.as_str())
        .style(input_style)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Search GIFs (ESC to navigate, / to search)")
                .border_style(input_style),
        );

    frame.render_widget(input, area);

    if app.input_mode == InputMode::Editing {
        frame.set_cursor_position((cursor_x(area, app.search_input.chars().count()), area.y + 1));
    }
}

fn render_results_list(frame: &mut Frame, app: &mut App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Results ({})", app.cursor.total_count));

    if app.results.is_empty() {
        let text = if app.loading {
            "Searching..."
        } else if app.results_term.is_empty() {
            "Type to search Giphy"
        } else {
            "No GIFs found"
        };
        let empty = Paragraph::new(text)
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem> = app
        .results
        .iter()
        .map(|gif| {
            let title = if gif.title.trim().is_empty() {
                gif.id.as_str()
            } else {
                gif.title.as_str()
            };
            ListItem::new(Line::from(title.to_string()))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut app.list_state);
}

fn render_preview(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title("Preview");

    let Some(gif) = app.selected_result() else {
        frame.render_widget(block, area);
        return;
    };

    let label = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let lines = vec![
        Line::from(vec![Span::styled("Title: ", label), Span::raw(gif.title.as_str())]),
        Line::from(vec![Span::styled("Id: ", label), Span::raw(gif.id.as_str())]),
        Line::from(""),
        Line::from(Span::styled("Preview URL", label)),
        Line::from(Span::styled(
            gif.preview_url.as_str(),
            Style::default().fg(Color::Blue).add_modifier(Modifier::UNDERLINED),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "s: save | y: copy link | o: open",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let preview = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
    frame.render_widget(preview, area);
}

fn render_page_indicator(frame: &mut Frame, app: &App, area: Rect) {
    let pages = app.cursor.page_count();
    if pages == 0 {
        return;
    }

    if app.input_mode == InputMode::PageJump {
        let prompt = format!("Go to page (1-{}): {}", pages, app.page_input);
        let indicator = Paragraph::new(prompt.as_str())
            .style(Style::default().fg(Color::Yellow))
            .alignment(Alignment::Center);
        frame.render_widget(indicator, area);

        let width = u16::try_from(prompt.chars().count()).unwrap_or(u16::MAX);
        let start = area.x.saturating_add(area.width.saturating_sub(width) / 2);
        let x = start.saturating_add(width).min(area.right().saturating_sub(1));
        frame.set_cursor_position((x, area.y));
        return;
    }

    let prev = if app.cursor.has_previous() { "< p" } else { "   " };
    let next = if app.cursor.has_next() { "n >" } else { "   " };
    let text = format!("{}  Page {}/{}  {}", prev, app.cursor.current_page(), pages, next);

    let indicator = Paragraph::new(text).alignment(Alignment::Center);
    frame.render_widget(indicator, area);
}

fn render_favorites(frame: &mut Frame, app: &mut App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Favorites ({})", app.favorites.len()));

    if app.favorites.is_empty() {
        let text = if app.loading { "Loading..." } else { "Nothing saved yet" };
        let empty = Paragraph::new(text)
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem> = app
        .favorites
        .items()
        .iter()
        .enumerate()
        .map(|(i, item)| {
            ListItem::new(Line::from(vec![
                Span::styled(format!("{:>3}. ", i + 1), Style::default().fg(Color::DarkGray)),
                Span::raw(item.url.as_str()),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut app.favorites_state);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let status = if let Some(error) = &app.error_message {
        Span::styled(error.as_str(), Style::default().fg(Color::Red))
    } else if let Some(message) = &app.status_message {
        Span::styled(message.as_str(), Style::default().fg(Color::Green))
    } else {
        match (app.screen(), app.input_mode) {
            (Screen::Login, _) | (Screen::Signup, _) => Span::styled(
                "TAB: next field | ENTER: submit | ESC: back/quit",
                Style::default().fg(Color::Yellow),
            ),
            (Screen::Search, InputMode::Editing) => Span::styled(
                "SEARCH MODE | type to search | ENTER: search now | ESC: navigate",
                Style::default().fg(Color::Yellow),
            ),
            (Screen::Search, InputMode::PageJump) => Span::styled(
                "PAGE JUMP | type a page number | ENTER: go | ESC: cancel",
                Style::default().fg(Color::Yellow),
            ),
            (Screen::Search, InputMode::Normal) => Span::raw(
                "j/k: navigate | n/p: page | g: go to page | /: search | s: save | y: copy | o: open | f: favorites | L: logout | q: quit",
            ),
            (Screen::Favorites, _) => Span::raw(
                "j/k: navigate | d: remove | y: copy | o: open | r: refresh | ESC: back | L: logout | q: quit",
            ),
        }
    };

    frame.render_widget(Paragraph::new(Line::from(status)), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_follows_short_input() {
        let area = Rect::new(4, 0, 20, 3);
        assert_eq!(cursor_x(area, 0), 5);
        assert_eq!(cursor_x(area, 5), 10);
        assert_eq!(cursor_x(area, 17), 22);
    }

    #[test]
    fn test_cursor_stays_inside_box_for_long_input() {
        let area = Rect::new(4, 0, 20, 3);
        // Last inner column is x + width - 2
        assert_eq!(cursor_x(area, 500), 22);
        assert_eq!(cursor_x(area, usize::MAX), 22);
    }

    #[test]
    fn test_cursor_does_not_overflow_at_screen_edge() {
        let area = Rect::new(u16::MAX - 3, 0, 3, 3);
        assert_eq!(cursor_x(area, 70_000), u16::MAX - 2);

        let collapsed = Rect::new(u16::MAX, 0, 0, 0);
        assert_eq!(cursor_x(collapsed, 10), u16::MAX);
    }
}
