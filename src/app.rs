//! App: terminal init, main loop, cursor, removal animation and restart.

use crate::GameConfig;
use crate::board::{BoardEngine, MoveResult, Phase};
use crate::input::{Action, key_to_action};
use crate::theme::Theme;
use crate::ui;
use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind, MouseButton, MouseEvent,
    MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use ratatui::layout::Rect;
use ratatui::{DefaultTerminal, Frame};
use std::io::{self, Write};
use std::panic;
use std::time::{Duration, Instant};
use tachyonfx::Effect;
use tracing::{debug, info};

/// Target frame time (~60 FPS).
const FRAME_MS: u64 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Playing,
    GameOver,
}

/// A successful move whose tiles are still fading out. Selections wait until it is done.
#[derive(Debug)]
struct Removal {
    /// Engine as it was before the move.
    snapshot: BoardEngine,
    group: Vec<(usize, usize)>,
}

pub struct App {
    config: GameConfig,
    theme: Theme,
    rng: StdRng,
    engine: BoardEngine,
    screen: Screen,
    cursor: (usize, usize),
    last_move: Option<MoveResult>,
    removal: Option<Removal>,
    /// TachyonFX fade for the removal (created on first draw of it).
    removal_effect: Option<Effect>,
    /// Last time the removal effect was processed (for delta).
    removal_effect_process_time: Option<Instant>,
    /// Board grid rect of the last frame, for mouse hit-testing.
    board_inner: Rect,
}

impl App {
    pub fn new(config: GameConfig, theme: Theme) -> Result<Self> {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let engine = BoardEngine::new(config.board, &mut rng).context("cannot deal the board")?;
        let mut app = Self {
            config,
            theme,
            rng,
            engine,
            screen: Screen::Playing,
            cursor: (0, 0),
            last_move: None,
            removal: None,
            removal_effect: None,
            removal_effect_process_time: None,
            board_inner: Rect::default(),
        };
        app.sync_screen();
        Ok(app)
    }

    fn sync_screen(&mut self) {
        self.screen = match self.engine.phase() {
            Phase::Playing => Screen::Playing,
            Phase::GameOver => Screen::GameOver,
        };
    }

    fn restart(&mut self) -> Result<()> {
        self.engine
            .reset(self.config.board, &mut self.rng)
            .context("cannot deal a new board")?;
        self.cursor = (0, 0);
        self.last_move = None;
        self.clear_removal();
        self.sync_screen();
        info!("game restarted");
        Ok(())
    }

    fn clear_removal(&mut self) {
        self.removal = None;
        self.removal_effect = None;
        self.removal_effect_process_time = None;
    }

    fn move_cursor(&mut self, d_row: isize, d_col: isize) {
        let (row, col) = self.cursor;
        let max_row = self.engine.rows() - 1;
        let max_col = self.engine.cols() - 1;
        self.cursor = (
            row.saturating_add_signed(d_row).min(max_row),
            col.saturating_add_signed(d_col).min(max_col),
        );
    }

    /// Select (row, col) unless a removal is still fading or the game is over.
    fn select_at(&mut self, row: usize, col: usize) {
        if self.removal.is_some() || self.screen != Screen::Playing {
            return;
        }
        let snapshot = (!self.config.no_animation).then(|| self.engine.clone());
        let Ok(result) = self.engine.select(row, col) else {
            return;
        };
        debug!(
            points = result.points,
            score = result.score,
            game_over = result.game_over,
            "move applied"
        );
        if let Some(snapshot) = snapshot {
            self.clear_removal();
            self.removal = Some(Removal {
                snapshot,
                group: result.group.clone(),
            });
        } else {
            self.sync_screen();
        }
        self.last_move = Some(result);
    }

    fn finish_removal(&mut self) {
        self.clear_removal();
        self.sync_screen();
    }

    /// Returns false when the player asked to quit.
    fn apply_action(&mut self, action: Action) -> Result<bool> {
        match action {
            Action::Quit => return Ok(false),
            Action::Restart => self.restart()?,
            Action::CursorUp => self.move_cursor(-1, 0),
            Action::CursorDown => self.move_cursor(1, 0),
            Action::CursorLeft => self.move_cursor(0, -1),
            Action::CursorRight => self.move_cursor(0, 1),
            Action::Select => {
                let (row, col) = self.cursor;
                self.select_at(row, col);
            }
            Action::None => {}
        }
        Ok(true)
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        let Some((row, col)) = ui::cell_under(self.board_inner, mouse.column, mouse.row) else {
            return;
        };
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                self.cursor = (row, col);
                self.select_at(row, col);
            }
            MouseEventKind::Moved => self.cursor = (row, col),
            _ => {}
        }
    }

    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode().context("cannot enable raw mode")?;
        let _restore = TerminalGuard;
        install_panic_hook();
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;
        self.run_loop(&mut terminal)
    }

    /// Draw one frame; once the removal fade is done the move's result takes over.
    fn render(&mut self, frame: &mut Frame, now: Instant) {
        let (board, removing): (&BoardEngine, &[(usize, usize)]) = match &self.removal {
            Some(removal) => (&removal.snapshot, removal.group.as_slice()),
            None => (&self.engine, [].as_slice()),
        };
        let view = ui::View {
            board,
            engine: &self.engine,
            theme: &self.theme,
            screen: self.screen,
            cursor: self.cursor,
            removing,
            last_move: self.last_move.as_ref(),
            seed: self.config.seed,
            removal_ms: self.config.removal_ms,
        };
        let board_inner = ui::board_inner_rect(frame.area(), board.rows(), board.cols());
        ui::draw(
            frame,
            &view,
            &mut self.removal_effect,
            &mut self.removal_effect_process_time,
            now,
        );
        self.board_inner = board_inner;

        if self.removal.is_some() && self.removal_effect.as_ref().is_some_and(Effect::done) {
            self.finish_removal();
        }
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        loop {
            let now = Instant::now();
            terminal.draw(|f| self.render(f, now))?;

            let timeout = Duration::from_millis(FRAME_MS).saturating_sub(now.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    match event::read()? {
                        Event::Key(key) if key.kind == KeyEventKind::Press => {
                            if !self.apply_action(key_to_action(key))? {
                                return Ok(());
                            }
                        }
                        Event::Mouse(mouse) => self.handle_mouse(mouse),
                        _ => {}
                    }
                }
            }
        }
    }
}

/// Undo `EnterAlternateScreen` and `EnableMouseCapture` on `out`.
fn write_restore<W: Write>(mut out: W) -> io::Result<()> {
    execute!(out, DisableMouseCapture, LeaveAlternateScreen)
}

/// Best effort: also runs while unwinding or from the panic hook, so errors are dropped.
fn restore_terminal() {
    let _ = write_restore(io::stdout());
    let _ = disable_raw_mode();
}

/// Restores the terminal when `run` returns, whether through `?` or a panic.
struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        restore_terminal();
    }
}

/// Release builds abort on panic and skip `Drop`, so the hook restores first.
fn install_panic_hook() {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        restore_terminal();
        previous(info);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::BoardConfig;

    fn config(no_animation: bool) -> GameConfig {
        GameConfig {
            board: BoardConfig {
                rows: 4,
                cols: 5,
                colors: 1,
            },
            seed: Some(11),
            no_animation,
            removal_ms: 220,
        }
    }

    #[test]
    fn test_cursor_stays_on_board() {
        let mut app = App::new(config(true), Theme::default()).unwrap();
        app.apply_action(Action::CursorUp).unwrap();
        app.apply_action(Action::CursorLeft).unwrap();
        assert_eq!(app.cursor, (0, 0));
        for _ in 0..10 {
            app.apply_action(Action::CursorDown).unwrap();
            app.apply_action(Action::CursorRight).unwrap();
        }
        assert_eq!(app.cursor, (3, 4));
    }

    #[test]
    fn test_select_without_animation_ends_single_colour_game() {
        let mut app = App::new(config(true), Theme::default()).unwrap();
        assert_eq!(app.screen, Screen::Playing);
        app.apply_action(Action::Select).unwrap();
        assert!(app.removal.is_none());
        assert_eq!(app.screen, Screen::GameOver);
        assert_eq!(app.last_move.as_ref().map(|m| m.group.len()), Some(20));
    }

    #[test]
    fn test_removal_blocks_selection_until_finished() {
        let mut app = App::new(config(false), Theme::default()).unwrap();
        app.apply_action(Action::Select).unwrap();
        let removal = app.removal.as_ref().unwrap();
        assert_eq!(removal.group.len(), 20);
        assert_eq!(removal.snapshot.tiles_remaining(), 20);
        // Game over is only shown once the fade is done.
        assert_eq!(app.screen, Screen::Playing);
        app.finish_removal();
        assert!(app.removal.is_none());
        assert_eq!(app.screen, Screen::GameOver);
    }

    #[test]
    fn test_removal_fade_unlocks_selection_when_drawn_to_the_end() {
        use ratatui::Terminal;
        use ratatui::backend::TestBackend;

        let mut cfg = config(false);
        cfg.removal_ms = 50;
        let mut app = App::new(cfg, Theme::default()).unwrap();
        app.apply_action(Action::Select).unwrap();
        assert!(app.removal.is_some());

        let mut terminal = Terminal::new(TestBackend::new(80, 30)).unwrap();
        let start = Instant::now();
        terminal.draw(|f| app.render(f, start)).unwrap();
        assert!(app.removal.is_some());
        assert_eq!(app.board_inner, ui::board_inner_rect(Rect::new(0, 0, 80, 30), 4, 5));
        for frame in 1..=5 {
            let now = start + Duration::from_millis(FRAME_MS * frame);
            terminal.draw(|f| app.render(f, now)).unwrap();
        }
        assert!(app.removal.is_none());
        assert!(app.removal_effect.is_none());
        assert_eq!(app.screen, Screen::GameOver);
    }

    #[test]
    fn test_restore_leaves_alternate_screen_and_mouse_capture() {
        let mut out = Vec::new();
        write_restore(&mut out).unwrap();
        let written = String::from_utf8(out).unwrap();
        assert!(written.contains("\x1b[?1049l"));
        assert!(written.contains("\x1b[?1000l"));
    }

    #[test]
    fn test_restart_deals_fresh_board() {
        let mut app = App::new(config(true), Theme::default()).unwrap();
        app.apply_action(Action::Select).unwrap();
        app.apply_action(Action::Restart).unwrap();
        assert_eq!(app.screen, Screen::Playing);
        assert_eq!(app.engine.score(), 0);
        assert_eq!(app.engine.tiles_remaining(), 20);
        assert!(app.last_move.is_none());
    }

    #[test]
    fn test_quit_stops_loop() {
        let mut app = App::new(config(true), Theme::default()).unwrap();
        assert!(!app.apply_action(Action::Quit).unwrap());
        assert!(app.apply_action(Action::None).unwrap());
    }

    #[test]
    fn test_invalid_board_is_reported() {
        let mut bad = config(true);
        bad.board.rows = 0;
        let err = App::new(bad, Theme::default()).err().unwrap();
        assert!(format!("{err:#}").contains("at least one row"));
    }
}
