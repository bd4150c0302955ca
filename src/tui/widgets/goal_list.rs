use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use ratatui::Frame;

use crate::goals::progress_percent;
use crate::models::GoalWithDetail;
use crate::tui::widgets::color::{get_contrast_text_color, parse_color};
use crate::tui::widgets::truncate;
use crate::utils::format_duration;
use crate::Config;

/// Text bar like `[#####-----]` for a 0-100 percentage
pub fn progress_bar(percent: f64, width: usize) -> String {
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * width as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

pub fn render_goal_list(
    f: &mut Frame,
    area: Rect,
    goals: &[GoalWithDetail],
    selected: usize,
    config: &Config,
) {
    let theme = config.get_active_theme();
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Goals ({})", goals.len()));
    if goals.is_empty() {
        f.render_widget(
            Paragraph::new("No goals yet. Add one with `tmk goal add`.").block(block),
            area,
        );
        return;
    }

    let max_width = area.width.saturating_sub(4) as usize;
    let done_style = Style::default().fg(parse_color(&theme.done_fg));
    let rows: Vec<ListItem> = goals
        .iter()
        .map(|goal| {
            let d = &goal.detail;
            let percent = progress_percent(d.target_secs, d.current_secs);
            let line = format!(
                "{} {:<7} {} {:>3.0}%  {} / {}",
                progress_bar(percent, 10),
                goal.header.kind.as_str(),
                goal.header.title,
                percent,
                format_duration(d.current_secs),
                format_duration(d.target_secs),
            );
            let style = if d.completed { done_style } else { Style::default() };
            ListItem::new(truncate(&line, max_width)).style(style)
        })
        .collect();

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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_fills_proportionally() {
        assert_eq!(progress_bar(0.0, 4), "[----]");
        assert_eq!(progress_bar(50.0, 4), "[##--]");
        assert_eq!(progress_bar(100.0, 4), "[####]");
        assert_eq!(progress_bar(250.0, 4), "[####]");
    }
}
