use ratatui::layout::Alignment;
use ratatui::style::Style;
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::tui::app::{App, Mode, Tab};
use crate::tui::widgets::color::parse_color;
use crate::tui::widgets::confirm::render_confirm;
use crate::tui::widgets::goal_list::render_goal_list;
use crate::tui::widgets::help::render_help;
use crate::tui::widgets::stats_table::{render_day_summary, render_stats_table};
use crate::tui::widgets::status_bar::render_status_bar;
use crate::tui::widgets::suggestion_list::render_suggestion_list;
use crate::tui::widgets::tabs::render_tabs;
use crate::tui::widgets::today_list::render_today_list;
use crate::tui::Layout;

pub fn render(f: &mut Frame, app: &App, layout: &Layout) {
    let theme = app.config.get_active_theme();
    let outer = Block::default()
        .borders(Borders::ALL)
        .title("TMK")
        .title_alignment(Alignment::Center)
        .style(
            Style::default()
                .fg(parse_color(&theme.fg))
                .bg(parse_color(&theme.bg)),
        );
    f.render_widget(outer, f.area());

    render_tabs(f, layout.tabs_area, app.current_tab, &app.config);

    let state = app.store.state();
    if let Some(ref error) = state.error {
        f.render_widget(
            Paragraph::new(error.as_str()).block(Block::default().borders(Borders::ALL).title("Error")),
            layout.main_area,
        );
    } else if state.loading {
        f.render_widget(
            Paragraph::new("Loading...").block(Block::default().borders(Borders::ALL)),
            layout.main_area,
        );
    } else {
        match app.current_tab {
            Tab::Today => {
                let title = format!("{}", state.date.format("%A %d/%m"));
                render_today_list(f, layout.main_area, &title, &state.today, app.selected_index, &app.config);
            }
            Tab::Goals => {
                render_goal_list(f, layout.main_area, &state.goals, app.selected_index, &app.config);
            }
            Tab::Stats => {
                render_stats_table(
                    f,
                    layout.main_area,
                    &state.stats_period,
                    &state.stats,
                    app.selected_index,
                    &app.config,
                );
                render_day_summary(f, layout.side_area, &state.day_summary);
            }
            Tab::Suggestions => {
                render_suggestion_list(f, layout.main_area, &state.suggestions, app.selected_index, &app.config);
            }
        }
    }

    match app.mode {
        Mode::Help => render_help(f, f.area(), &app.config),
        Mode::Confirm => {
            if let Some(ref action) = app.pending {
                render_confirm(f, f.area(), action, app.confirm_selection, &app.config);
            }
        }
        Mode::View => {}
    }

    render_status_bar(
        f,
        layout.status_area,
        app.status.message.as_ref(),
        &key_hints(app),
        &app.config,
    );
}

pub fn key_hints(app: &App) -> Vec<String> {
    match app.mode {
        Mode::Help => vec!["Esc or ?: Close help".to_string()],
        Mode::Confirm => vec!["y/Enter: Confirm".to_string(), "n/Esc: Cancel".to_string()],
        Mode::View => {
            let mut hints = vec!["q: Quit".to_string(), "Tab: Next tab".to_string()];
            match app.current_tab {
                Tab::Today => hints.push("a: Log".to_string()),
                Tab::Goals => hints.push("x: Delete".to_string()),
                Tab::Stats => {
                    hints.push("[/]: Period".to_string());
                    hints.push("m: Week/Month".to_string());
                }
                Tab::Suggestions => {
                    hints.push("a: Apply".to_string());
                    hints.push("x: Discard".to_string());
                }
            }
            hints.push("r: Refresh".to_string());
            hints.push("?: Help".to_string());
            hints
        }
    }
}
