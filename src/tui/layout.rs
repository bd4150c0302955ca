use ratatui::layout::{Constraint, Direction, Layout as RatLayout, Rect};

pub struct Layout {
    pub inner_area: Rect, // inside the outer border
    pub tabs_area: Rect,
    pub main_area: Rect,
    pub side_area: Rect,
    pub status_area: Rect,
}

impl Layout {
    /// Smallest terminal (without the outer border) the dashboard renders in
    pub const MIN_WIDTH: u16 = 48;
    pub const MIN_HEIGHT: u16 = 10;

    /// Width of the summary pane on the Stats tab
    const SIDE_WIDTH: u16 = 30;

    pub fn calculate(size: Rect, with_side_pane: bool) -> Self {
        let width = size.width.max(Self::MIN_WIDTH + 2);
        let height = size.height.max(Self::MIN_HEIGHT + 2);
        let size = Rect::new(size.x, size.y, width, height);

        let inner_area = Rect::new(
            size.x + 1,
            size.y + 1,
            size.width.saturating_sub(2),
            size.height.saturating_sub(2),
        );

        let vertical = RatLayout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // Tabs
                Constraint::Min(1),    // Content
                Constraint::Length(1), // Status
            ])
            .split(inner_area);

        // the side pane only appears when the main list keeps 20+ columns
        let side_width = if with_side_pane && inner_area.width >= Self::SIDE_WIDTH + 20 {
            Self::SIDE_WIDTH
        } else {
            0
        };
        let horizontal = RatLayout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(1), Constraint::Length(side_width)])
            .split(vertical[1]);

        Self {
            inner_area,
            tabs_area: vertical[0],
            main_area: horizontal[0],
            side_area: horizontal[1],
            status_area: vertical[2],
        }
    }
}
