use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
    Frame,
};

use super::widgets::{library, overview, study};
use super::{App, View};

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Tab bar
            Constraint::Min(0),    // Content
            Constraint::Length(1), // Help bar
        ])
        .split(f.area());

    draw_tabs(f, app, chunks[0]);
    draw_content(f, app, chunks[1]);
    draw_help_bar(f, app, chunks[2]);
}

fn draw_tabs(f: &mut Frame, app: &App, area: Rect) {
    let tab_titles = vec!["Library", "Study", "Overview"];
    let selected = match app.view {
        View::Library => 0,
        View::Study => 1,
        View::Overview => 2,
    };

    let title = match app.session.active_subtopic() {
        Some(subtopic) => format!(" CardHub: {} / {} ", app.session.active_topic(), subtopic),
        None => " CardHub ".to_string(),
    };

    let tabs = Tabs::new(tab_titles)
        .block(Block::default().borders(Borders::ALL).title(title))
        .select(selected)
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

    f.render_widget(tabs, area);
}

fn draw_content(f: &mut Frame, app: &App, area: Rect) {
    match app.view {
        View::Library => library::draw(f, app, area),
        View::Study => study::draw(f, app, area),
        View::Overview => overview::draw(f, app, area),
    }
}

fn key(label: &str) -> Span<'_> {
    Span::styled(label, Style::default().fg(Color::Cyan))
}

fn draw_help_bar(f: &mut Frame, app: &App, area: Rect) {
    let line = if let Some(status) = &app.status {
        Line::from(vec![
            Span::styled("! ", Style::default().fg(Color::Yellow)),
            Span::raw(status.as_str()),
        ])
    } else {
        let mut spans = vec![key("Tab"), Span::raw(" Views  ")];

        match app.view {
            View::Library => {
                spans.extend(vec![
                    key("j/k"),
                    Span::raw(" Nav  "),
                    key("g/G"),
                    Span::raw(" Top/Bot  "),
                    key("l/<CR>"),
                    Span::raw(" Study  "),
                ]);
            }
            View::Study => {
                spans.extend(vec![
                    key("<Space>"),
                    Span::raw(" Reveal  "),
                    key("y/n"),
                    Span::raw(" Right/Wrong  "),
                    key("s"),
                    Span::raw(" Skip  "),
                    key("b"),
                    Span::raw(" Bookmark  "),
                    key("f"),
                    Span::raw(" Filter  "),
                    key("R"),
                    Span::raw(" Reset  "),
                ]);
            }
            View::Overview => {
                spans.extend(vec![
                    key("j/k"),
                    Span::raw(" Nav  "),
                    key("b"),
                    Span::raw(" Bookmark  "),
                    key("R"),
                    Span::raw(" Reset  "),
                ]);
            }
        }

        if app.view != View::Library {
            spans.extend(vec![key("h/<Esc>"), Span::raw(" Back  ")]);
        }
        spans.extend(vec![key("q"), Span::raw(" Quit")]);

        Line::from(spans)
    };

    let help = Paragraph::new(line).style(Style::default().bg(Color::DarkGray));

    f.render_widget(help, area);
}
