use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, size as terminal_size, EnterAlternateScreen,
    LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use ratatui::Terminal;
use std::io;
use std::time::Duration;

use crate::tui::app::{App, Mode, Tab};
use crate::tui::error::TuiError;
use crate::tui::layout::Layout;

/// Restores the terminal on drop, including when unwinding from a panic
struct TerminalGuard {
    raw_mode_enabled: bool,
    alternate_screen_enabled: bool,
}

impl TerminalGuard {
    fn new() -> Result<Self, TuiError> {
        enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen)?;
        Ok(Self {
            raw_mode_enabled: true,
            alternate_screen_enabled: true,
        })
    }

    fn restore(&mut self) -> Result<(), TuiError> {
        if self.raw_mode_enabled {
            disable_raw_mode()?;
            self.raw_mode_enabled = false;
        }
        if self.alternate_screen_enabled {
            execute!(io::stdout(), LeaveAlternateScreen)?;
            self.alternate_screen_enabled = false;
        }
        Ok(())
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if self.raw_mode_enabled {
            let _ = disable_raw_mode();
        }
        if self.alternate_screen_enabled {
            let _ = execute!(io::stdout(), LeaveAlternateScreen);
        }
    }
}

pub fn run_event_loop(mut app: App) -> Result<(), TuiError> {
    let (width, height) = terminal_size()?;
    let min_width = Layout::MIN_WIDTH + 2;
    let min_height = Layout::MIN_HEIGHT + 2;
    if width < min_width || height < min_height {
        return Err(TuiError::RenderError(format!(
            "Terminal size too small. Current: {}x{}, Minimum required: {}x{}. Please resize your terminal window.",
            width, height, min_width, min_height
        )));
    }

    let mut guard = TerminalGuard::new()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;

    loop {
        app.check_status_message_timeout();

        // redraw only after the store or the UI changed
        if app.take_dirty() {
            let size = terminal.size()?;
            let rect = Rect::new(0, 0, size.width, size.height);
            terminal.draw(|f| {
                let layout = Layout::calculate(rect, app.current_tab == Tab::Stats);
                crate::tui::render::render(f, &app, &layout);
            })?;
        }

        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                // only Press, so Windows does not see every key twice
                Event::Key(key_event) if key_event.kind == KeyEventKind::Press => {
                    if handle_key_event(&mut app, key_event) {
                        break;
                    }
                }
                Event::Resize(_, _) => app.mark_dirty(),
                _ => {}
            }
        }
    }

    guard.restore()?;
    Ok(())
}

/// Returns true when the user asked to quit
pub fn handle_key_event(app: &mut App, key: KeyEvent) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return true;
    }
    match app.mode {
        Mode::Help => {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
                app.mode = Mode::View;
                app.mark_dirty();
            }
            false
        }
        Mode::Confirm => {
            handle_confirm_key(app, key);
            false
        }
        Mode::View => handle_view_key(app, key),
    }
}

fn handle_confirm_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Up | KeyCode::Down | KeyCode::Char('j') | KeyCode::Char('k') | KeyCode::Tab => {
            app.confirm_selection = 1 - app.confirm_selection.min(1);
            app.mark_dirty();
        }
        KeyCode::Char('y') => app.confirm_pending(),
        KeyCode::Enter => {
            if app.confirm_selection == 0 {
                app.confirm_pending();
            } else {
                app.cancel_pending();
            }
        }
        KeyCode::Esc | KeyCode::Char('n') => app.cancel_pending(),
        _ => {}
    }
}

fn handle_view_key(app: &mut App, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return true,
        KeyCode::Tab | KeyCode::Right => app.switch_tab(app.current_tab.next()),
        KeyCode::BackTab | KeyCode::Left => app.switch_tab(app.current_tab.previous()),
        KeyCode::Char(c @ '1'..='4') => {
            let index = c as usize - '1' as usize;
            app.switch_tab(Tab::ALL[index]);
        }
        KeyCode::Char('j') | KeyCode::Down => app.move_selection(1),
        KeyCode::Char('k') | KeyCode::Up => app.move_selection(-1),
        KeyCode::Char('[') if app.current_tab == Tab::Stats => app.shift_stats_period(-1),
        KeyCode::Char(']') if app.current_tab == Tab::Stats => app.shift_stats_period(1),
        KeyCode::Char('m') if app.current_tab == Tab::Stats => app.toggle_stats_kind(),
        KeyCode::Char('a') => match app.current_tab {
            Tab::Today => app.log_selected(),
            Tab::Suggestions => app.apply_selected_suggestion(),
            _ => {}
        },
        KeyCode::Char('x') | KeyCode::Delete => app.request_delete(),
        KeyCode::Char('r') => app.refresh(),
        KeyCode::Char('?') => {
            app.mode = Mode::Help;
            app.mark_dirty();
        }
        _ => {}
    }
    false
}
