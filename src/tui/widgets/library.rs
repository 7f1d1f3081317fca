use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use super::{accuracy_bar, accuracy_color, truncate};
use crate::scoring;
use crate::tui::App;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)])
        .split(area);

    draw_subtopics(f, app, chunks[0]);
    draw_totals(f, app, chunks[1]);
}

fn draw_subtopics(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Library ")
        .title_style(Style::default().fg(Color::Cyan));

    if app.library.items.is_empty() {
        let paragraph = Paragraph::new("No subtopics yet. Add one with `cardhub subtopic add`.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(paragraph, area);
        return;
    }

    let items: Vec<ListItem> = app
        .library
        .items
        .iter()
        .map(|entry| {
            let accuracy = entry.accuracy();
            let attempts = entry.total_success as u64 + entry.total_failure as u64;
            let color = accuracy_color(accuracy, attempts);

            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<14}", entry.topic.as_str()),
                    Style::default().fg(Color::Cyan),
                ),
                Span::styled(
                    format!("{:<30}", truncate(&entry.subtopic, 28)),
                    Style::default().fg(Color::White),
                ),
                Span::styled(
                    format!("{:>5} cards ", entry.card_count),
                    Style::default().fg(Color::Gray),
                ),
                Span::styled(accuracy_bar(accuracy), Style::default().fg(color)),
                Span::styled(format!(" {:>3.0}%", accuracy), Style::default().fg(color)),
                Span::styled(
                    if entry.bookmarked_count > 0 {
                        format!("  * {}", entry.bookmarked_count)
                    } else {
                        String::new()
                    },
                    Style::default().fg(Color::Yellow),
                ),
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

    let mut state = ListState::default();
    state.select(app.library.selected);

    f.render_stateful_widget(list, area, &mut state);
}

fn draw_totals(f: &mut Frame, app: &App, area: Rect) {
    let stats = &app.stats;
    let accuracy =
        scoring::accuracy_percent(stats.total_success as u64, stats.total_failure as u64);

    let line = Line::from(vec![
        Span::styled("Cards: ", Style::default().fg(Color::Gray)),
        Span::styled(
            format!("{}", stats.total_cards),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled("Subtopics: ", Style::default().fg(Color::Gray)),
        Span::styled(
            format!("{}", stats.total_subtopics),
            Style::default().fg(Color::White),
        ),
        Span::raw("  "),
        Span::styled("Accuracy: ", Style::default().fg(Color::Gray)),
        Span::styled(
            format!("{:.0}%", accuracy),
            Style::default().fg(accuracy_color(
                accuracy,
                stats.total_success as u64 + stats.total_failure as u64,
            )),
        ),
        Span::raw("  "),
        Span::styled("Bookmarked: ", Style::default().fg(Color::Gray)),
        Span::styled(
            format!("{}", stats.bookmarked),
            Style::default().fg(Color::Yellow),
        ),
    ]);

    let block = Block::default().borders(Borders::ALL).title(" Totals ");
    f.render_widget(Paragraph::new(line).block(block), area);
}
