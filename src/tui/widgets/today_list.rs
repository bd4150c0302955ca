use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState};
use ratatui::Frame;

use crate::models::ActivityWithStatus;
use crate::tui::widgets::color::{get_contrast_text_color, parse_color};
use crate::tui::widgets::truncate;
use crate::Config;

pub fn render_today_list(
    f: &mut Frame,
    area: Rect,
    title: &str,
    items: &[ActivityWithStatus],
    selected: usize,
    config: &Config,
) {
    let theme = config.get_active_theme();
    let done_style = Style::default().fg(parse_color(&theme.done_fg));
    let max_width = area.width.saturating_sub(4) as usize;

    let rows: Vec<ListItem> = items
        .iter()
        .map(|item| {
            let a = &item.activity;
            let (marker, style) = if item.completed {
                ("✓", done_style)
            } else {
                ("○", Style::default())
            };
            let text = truncate(
                &format!("{}  {}  ({})", a.window_label(), a.title, a.category),
                max_width.saturating_sub(2),
            );
            ListItem::new(Line::from(vec![
                Span::styled(format!("{} ", marker), style),
                Span::styled(text, style),
            ]))
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("{} ({})", title, items.len()));
    if rows.is_empty() {
        f.render_widget(
            ratatui::widgets::Paragraph::new("Nothing planned today").block(block),
            area,
        );
        return;
    }

    let highlight_bg = parse_color(&theme.highlight_bg);
    let list = List::new(rows).block(block).highlight_style(
        Style::default()
            .bg(highlight_bg)
            .fg(get_contrast_text_color(highlight_bg))
            .add_modifier(Modifier::BOLD),
    );
    let mut state = ListState::default().with_selected(Some(selected));
    f.render_stateful_widget(list, area, &mut state);
}
