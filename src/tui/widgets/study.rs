use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use super::{accuracy_bar, accuracy_color, card_attempts};
use crate::models::{Card, FilterMode};
use crate::session::TurnPhase;
use crate::tui::App;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let Some(subtopic) = app.session.active_subtopic() else {
        let block = Block::default().borders(Borders::ALL).title(" Study ");
        let paragraph = Paragraph::new("Pick a subtopic in the Library to start studying")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(paragraph, area);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),      // Filter bar
            Constraint::Percentage(40), // Question
            Constraint::Min(0),         // Answer
        ])
        .split(area);

    draw_filter_bar(f, app, chunks[0]);

    let Some(card) = &app.current else {
        let message = match app.session.filter_mode() {
            FilterMode::All => format!("No cards in {} yet", subtopic),
            FilterMode::Wrong => "No wrong answers yet. Nice!".to_string(),
            FilterMode::Right => "No right answers yet".to_string(),
            FilterMode::Bookmarked => "No bookmarked cards".to_string(),
        };
        let paragraph = Paragraph::new(message)
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(paragraph, chunks[1].union(chunks[2]));
        return;
    };

    draw_question(f, card, chunks[1]);
    draw_answer(f, app, card, chunks[2]);
}

fn draw_filter_bar(f: &mut Frame, app: &App, area: Rect) {
    let active = app.session.filter_mode();
    let mut spans = vec![Span::styled("Filter: ", Style::default().fg(Color::Gray))];
    for mode in FilterMode::ALL {
        let style = if mode == active {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(format!(" {} ", mode.label()), style));
    }
    if let Some(order) = app.session.shuffle_order() {
        spans.push(Span::styled(
            format!(
                "   card {} of {}",
                app.session.card_cursor() % order.len().max(1) + 1,
                order.len()
            ),
            Style::default().fg(Color::Gray),
        ));
    }

    let block = Block::default().borders(Borders::ALL);
    f.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn draw_question(f: &mut Frame, card: &Card, area: Rect) {
    let accuracy = card.accuracy();
    let attempts = card_attempts(card);
    let color = accuracy_color(accuracy, attempts);

    let mut title = vec![
        Span::raw(" Question "),
        Span::styled(accuracy_bar(accuracy), Style::default().fg(color)),
        Span::styled(
            format!(" {}/{} ", card.success_count, card.failure_count),
            Style::default().fg(Color::Gray),
        ),
    ];
    if card.bookmarked {
        title.push(Span::styled("* ", Style::default().fg(Color::Yellow)));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .title(Line::from(title))
        .title_style(Style::default().fg(Color::Cyan));

    let paragraph = Paragraph::new(card.question.as_str())
        .style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(block);
    f.render_widget(paragraph, area);
}

fn draw_answer(f: &mut Frame, app: &App, card: &Card, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Answer ")
        .title_style(Style::default().fg(Color::Green));

    let paragraph = match app.session.phase() {
        TurnPhase::AnswerShown => Paragraph::new(card.answer.as_str())
            .style(Style::default().fg(Color::Green))
            .wrap(Wrap { trim: true }),
        TurnPhase::QuestionShown => Paragraph::new("Press <Space> to reveal")
            .style(Style::default().fg(Color::DarkGray)),
    };

    f.render_widget(paragraph.alignment(Alignment::Center).block(block), area);
}
