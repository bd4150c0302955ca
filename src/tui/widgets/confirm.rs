use ratatui::layout::{Alignment, Rect};
use ratatui::style::Style;
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

use crate::tui::app::PendingAction;
use crate::tui::widgets::color::{get_contrast_text_color, parse_color};
use crate::tui::widgets::popup_area;
use crate::Config;

pub fn render_confirm(
    f: &mut Frame,
    area: Rect,
    action: &PendingAction,
    selection: usize,
    config: &Config,
) {
    let theme = config.get_active_theme();
    let normal = Style::default()
        .fg(parse_color(&theme.fg))
        .bg(parse_color(&theme.bg));
    let highlight_bg = parse_color(&theme.highlight_bg);
    let selected = Style::default()
        .fg(get_contrast_text_color(highlight_bg))
        .bg(highlight_bg);

    let popup = popup_area(area, 50, 35);
    f.render_widget(Clear, popup);

    let mut lines = vec![Line::styled(action.prompt(), normal), Line::default()];
    for (i, option) in ["Yes", "Cancel"].iter().enumerate() {
        let (prefix, style) = if i == selection {
            ("> ", selected)
        } else {
            ("  ", normal)
        };
        lines.push(Line::styled(format!("{}{}", prefix, option), style));
    }
    lines.push(Line::default());
    lines.push(Line::styled("y / Enter to confirm, n / Esc to cancel", normal));

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Confirm")
                .title_alignment(Alignment::Center)
                .style(normal),
        )
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, popup);
}
