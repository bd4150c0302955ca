use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::widgets::{Block, Borders, Paragraph, Row, Table, TableState};
use ratatui::Frame;

use crate::logs::DaySummary;
use crate::period::Period;
use crate::stats::StatsRow;
use crate::tui::widgets::color::{get_contrast_text_color, parse_color};
use crate::utils::format_duration;
use crate::Config;

pub fn render_stats_table(
    f: &mut Frame,
    area: Rect,
    period: &Period,
    rows: &[StatsRow],
    selected: usize,
    config: &Config,
) {
    let theme = config.get_active_theme();
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("{}  ([ / ] to change, m for week/month)", period.label()));

    let header = Row::new(vec!["Activity", "Time", "Done", "Missed", "Pending"])
        .style(Style::default().add_modifier(Modifier::BOLD));
    let body: Vec<Row> = rows
        .iter()
        .map(|row| {
            let s = &row.stats;
            Row::new(vec![
                row.title.clone(),
                format_duration(s.total_secs),
                s.completed_count.to_string(),
                s.missed_count.to_string(),
                s.pending_count.to_string(),
            ])
        })
        .collect();

    let highlight_bg = parse_color(&theme.highlight_bg);
    let table = Table::new(
        body,
        [
            Constraint::Min(12),
            Constraint::Length(9),
            Constraint::Length(6),
            Constraint::Length(7),
            Constraint::Length(8),
        ],
    )
    .header(header)
    .block(block)
    .row_highlight_style(
        Style::default()
            .bg(highlight_bg)
            .fg(get_contrast_text_color(highlight_bg)),
    );

    let mut state = TableState::default().with_selected(if rows.is_empty() {
        None
    } else {
        Some(selected)
    });
    f.render_stateful_widget(table, area, &mut state);
}

pub fn summary_lines(summary: &DaySummary) -> Vec<String> {
    let mut lines = vec![
        format!("Sessions: {}", summary.total_activities),
        format!("Total: {}", format_duration(summary.total_secs)),
    ];
    if let Some(hour) = summary.peak_hour {
        lines.push(format!("Peak hour: {:02}:00", hour));
    }
    if !summary.secs_by_category.is_empty() {
        lines.push(String::new());
        for (category, secs) in &summary.secs_by_category {
            lines.push(format!("{}: {}", category, format_duration(*secs)));
        }
    }
    lines
}

pub fn render_day_summary(f: &mut Frame, area: Rect, summary: &DaySummary) {
    if area.width == 0 {
        return;
    }
    let paragraph = Paragraph::new(summary_lines(summary).join("\n"))
        .block(Block::default().borders(Borders::ALL).title("Today"));
    f.render_widget(paragraph, area);
}
