use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use super::{accuracy_color, card_attempts, truncate};
use crate::tui::App;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let title = match app.session.active_subtopic() {
        Some(subtopic) => format!(" Overview: {} ", subtopic),
        None => " Overview ".to_string(),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .title_style(Style::default().fg(Color::Cyan));

    if app.overview.items.is_empty() {
        let paragraph = Paragraph::new("No cards to show")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(paragraph, area);
        return;
    }

    let items: Vec<ListItem> = app
        .overview
        .items
        .iter()
        .map(|card| {
            let accuracy = card.accuracy();
            let attempts = card_attempts(card);
            let marker = if card.bookmarked { "* " } else { "  " };

            ListItem::new(Line::from(vec![
                Span::styled(marker, Style::default().fg(Color::Yellow)),
                Span::styled(
                    format!("{:<40}", truncate(&card.question, 38)),
                    Style::default().fg(Color::White),
                ),
                Span::styled(
                    format!("{:>4}", card.success_count),
                    Style::default().fg(Color::Green),
                ),
                Span::styled(
                    format!("{:>4}", card.failure_count),
                    Style::default().fg(Color::Red),
                ),
                Span::styled(
                    format!("{:>6.0}%", accuracy),
                    Style::default().fg(accuracy_color(accuracy, attempts)),
                ),
            ]))
        })
        .collect();

    let header = Line::from(vec![Span::styled(
        format!("  {:<40}{:>4}{:>4}{:>7}", "Question", "OK", "MISS", "ACC"),
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )]);

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(app.overview.selected);

    let header_area = Rect {
        x: area.x + 1,
        y: area.y + 1,
        width: area.width.saturating_sub(2),
        height: 1,
    };
    f.render_widget(Paragraph::new(header), header_area);

    let list_area = Rect {
        x: area.x,
        y: area.y + 1,
        width: area.width,
        height: area.height.saturating_sub(1),
    };

    f.render_stateful_widget(list, list_area, &mut state);
}
