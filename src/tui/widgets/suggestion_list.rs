use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use ratatui::Frame;

use crate::models::Suggestion;
use crate::tui::widgets::color::{get_contrast_text_color, parse_color};
use crate::tui::widgets::truncate;
use crate::Config;

/// Two lines per suggestion: the proposed move, then the model's reason
pub fn suggestion_lines(s: &Suggestion, max_width: usize) -> [String; 2] {
    [
        truncate(
            &format!(
                "{}: {} - {} -> {} - {}  ({})",
                s.activity_title,
                s.current_start,
                s.current_end,
                s.suggested_start,
                s.suggested_end,
                s.requested_at
            ),
            max_width,
        ),
        truncate(&format!("  {}", s.reason), max_width),
    ]
}

pub fn render_suggestion_list(
    f: &mut Frame,
    area: Rect,
    suggestions: &[Suggestion],
    selected: usize,
    config: &Config,
) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Suggestions ({})", suggestions.len()));
    if suggestions.is_empty() {
        f.render_widget(
            Paragraph::new("No pending suggestions. Press r to analyze recent logs.").block(block),
            area,
        );
        return;
    }

    let max_width = area.width.saturating_sub(4) as usize;
    let rows: Vec<ListItem> = suggestions
        .iter()
        .map(|s| {
            let [head, reason] = suggestion_lines(s, max_width);
            ListItem::new(vec![
                Line::from(head),
                Line::styled(reason, Style::default().add_modifier(Modifier::ITALIC)),
            ])
        })
        .collect();

    let highlight_bg = parse_color(&config.get_active_theme().highlight_bg);
    let list = List::new(rows).block(block).highlight_style(
        Style::default()
            .bg(highlight_bg)
            .fg(get_contrast_text_color(highlight_bg)),
    );
    let mut state = ListState::default().with_selected(Some(selected));
    f.render_stateful_widget(list, area, &mut state);
}
