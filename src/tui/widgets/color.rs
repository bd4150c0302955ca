use ratatui::style::Color;

/// Parse a theme color: a name, `#RRGGBB`, `#RGB` or `rgb(r,g,b)`.
/// Anything unrecognized renders white.
pub fn parse_color(color_str: &str) -> Color {
    let s = color_str.trim().to_lowercase();
    match s.as_str() {
        "black" => Color::Black,
        "red" => Color::Red,
        "green" => Color::Green,
        "yellow" => Color::Yellow,
        "blue" => Color::Blue,
        "magenta" => Color::Magenta,
        "cyan" => Color::Cyan,
        "white" => Color::White,
        "gray" | "grey" | "lightgray" | "lightgrey" => Color::Gray,
        "darkgray" | "darkgrey" => Color::DarkGray,
        "lightred" => Color::LightRed,
        "lightgreen" => Color::LightGreen,
        "lightyellow" => Color::LightYellow,
        "lightblue" => Color::LightBlue,
        "lightmagenta" => Color::LightMagenta,
        "lightcyan" => Color::LightCyan,
        "reset" => Color::Reset,
        _ => s
            .strip_prefix('#')
            .and_then(parse_hex)
            .or_else(|| parse_rgb(&s))
            .unwrap_or(Color::White),
    }
}

fn parse_hex(hex: &str) -> Option<Color> {
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(hex.get(range)?, 16).ok();
    match hex.len() {
        6 => Some(Color::Rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
        3 => {
            let (r, g, b) = (channel(0..1)?, channel(1..2)?, channel(2..3)?);
            Some(Color::Rgb(r << 4 | r, g << 4 | g, b << 4 | b))
        }
        _ => None,
    }
}

fn parse_rgb(s: &str) -> Option<Color> {
    let inner = s.strip_prefix("rgb(")?.strip_suffix(')')?;
    let parts: Vec<u8> = inner
        .split(',')
        .map(|p| p.trim().parse::<u8>().ok())
        .collect::<Option<_>>()?;
    match parts.as_slice() {
        [r, g, b] => Some(Color::Rgb(*r, *g, *b)),
        _ => None,
    }
}

/// Black or white, whichever reads better on `background`
pub fn get_contrast_text_color(background: Color) -> Color {
    let dark = match background {
        Color::Rgb(r, g, b) => {
            // perceived brightness, ITU-R BT.601
            let luma = 0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64;
            luma < 128.0
        }
        Color::Black | Color::Blue | Color::Magenta | Color::Red | Color::DarkGray => true,
        _ => false,
    };
    if dark { Color::White } else { Color::Black }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_and_numeric_colors() {
        assert_eq!(parse_color("Green"), Color::Green);
        assert_eq!(parse_color("grey"), Color::Gray);
        assert_eq!(parse_color("#008000"), Color::Rgb(0, 128, 0));
        assert_eq!(parse_color("#fff"), Color::Rgb(255, 255, 255));
        assert_eq!(parse_color("rgb(10, 20, 30)"), Color::Rgb(10, 20, 30));
    }

    #[test]
    fn bad_colors_fall_back_to_white() {
        assert_eq!(parse_color("chartreuse-ish"), Color::White);
        assert_eq!(parse_color("#12345"), Color::White);
        assert_eq!(parse_color("rgb(1,2)"), Color::White);
        assert_eq!(parse_color("rgb(300,0,0)"), Color::White);
    }

    #[test]
    fn contrast_text() {
        assert_eq!(get_contrast_text_color(Color::Blue), Color::White);
        assert_eq!(get_contrast_text_color(Color::Cyan), Color::Black);
        assert_eq!(get_contrast_text_color(Color::Rgb(250, 250, 240)), Color::Black);
        assert_eq!(get_contrast_text_color(Color::Rgb(20, 20, 60)), Color::White);
    }
}
