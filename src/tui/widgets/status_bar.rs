use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::tui::widgets::color::{get_contrast_text_color, parse_color};
use crate::tui::widgets::truncate;
use crate::Config;

const SEPARATOR: &str = " • ";

/// Join as many hints as fit in `width`, ending in "..." if some were dropped
pub fn fit_hints(hints: &[String], width: usize) -> String {
    let mut text = String::new();
    for hint in hints {
        let extra = if text.is_empty() {
            hint.chars().count()
        } else {
            SEPARATOR.chars().count() + hint.chars().count()
        };
        if text.chars().count() + extra > width {
            if text.is_empty() {
                return truncate(hint, width);
            }
            if text.chars().count() + 3 <= width {
                text.push_str("...");
            } else {
                text = truncate(&text, width);
            }
            return text;
        }
        if !text.is_empty() {
            text.push_str(SEPARATOR);
        }
        text.push_str(hint);
    }
    text
}

pub fn render_status_bar(
    f: &mut Frame,
    area: Rect,
    message: Option<&String>,
    key_hints: &[String],
    config: &Config,
) {
    let theme = config.get_active_theme();
    let width = area.width as usize;

    let (content, style) = match message {
        Some(msg) => {
            let highlight_bg = parse_color(&theme.highlight_bg);
            (
                truncate(msg, width),
                Style::default()
                    .fg(get_contrast_text_color(highlight_bg))
                    .bg(highlight_bg)
                    .add_modifier(Modifier::BOLD),
            )
        }
        None => (
            fit_hints(key_hints, width),
            Style::default()
                .fg(parse_color(&theme.fg))
                .bg(parse_color(&theme.bg)),
        ),
    };

    f.render_widget(Paragraph::new(content).style(style), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hints() -> Vec<String> {
        vec!["q: Quit".to_string(), "?: Help".to_string(), "r: Refresh".to_string()]
    }

    #[test]
    fn all_hints_fit() {
        assert_eq!(fit_hints(&hints(), 80), "q: Quit • ?: Help • r: Refresh");
    }

    #[test]
    fn overflow_is_marked() {
        assert_eq!(fit_hints(&hints(), 20), "q: Quit • ?: Help...");
        assert_eq!(fit_hints(&hints(), 5), "q:...");
    }
}
