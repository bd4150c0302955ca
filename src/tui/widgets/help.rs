use ratatui::layout::{Alignment, Rect};
use ratatui::style::Style;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

use crate::tui::widgets::color::parse_color;
use crate::tui::widgets::popup_area;
use crate::Config;

const HELP_TEXT: &str = "\
Navigation:
  Tab / Shift+Tab: Next / previous tab
  1-4: Jump to tab
  j / k (or arrows): Move selection

Today:
  a: Log the selected activity over its planned window

Goals:
  x: Delete the selected goal

Stats:
  [ / ]: Previous / next period
  m: Switch between weekly and monthly stats

Suggestions:
  a: Apply the selected suggestion
  x: Discard the selected suggestion

General:
  r: Refresh goals and stats, then ask for a new suggestion
  ?: Toggle this help
  q / Esc: Quit";

pub fn render_help(f: &mut Frame, area: Rect, config: &Config) {
    let theme = config.get_active_theme();
    let style = Style::default()
        .fg(parse_color(&theme.fg))
        .bg(parse_color(&theme.bg));
    let popup = popup_area(area, 60, 80);

    f.render_widget(Clear, popup);
    let paragraph = Paragraph::new(HELP_TEXT)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Help - Key Bindings")
                .title_alignment(Alignment::Center)
                .style(style),
        )
        .style(style)
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, popup);
}
