//! Layout and drawing: board, sidebar, removal fade, game over, screen → cell mapping.

use crate::app::Screen;
use crate::board::{BoardEngine, Cell, MoveResult};
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::layout::{Alignment, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Widget};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

/// Each tile is a glyph plus a spacer column.
const CELL_WIDTH: u16 = 2;
const CELL_HEIGHT: u16 = 1;
const SIDEBAR_WIDTH: u16 = 24;
/// Sidebar needs this many rows for stats and key help, even beside a short board.
const SIDEBAR_MIN_HEIGHT: u16 = 17;
/// Largest board side the CLI accepts; a full row of it still fits a u16 width.
pub const MAX_BOARD_SIDE: usize = 1024;

/// Everything a frame needs to know about the game.
pub struct View<'a> {
    /// Grid to draw; the pre-move snapshot while a removal is fading.
    pub board: &'a BoardEngine,
    /// Live engine, for score and status.
    pub engine: &'a BoardEngine,
    pub theme: &'a Theme,
    pub screen: Screen,
    pub cursor: (usize, usize),
    /// Cells currently fading out, in `board` coordinates.
    pub removing: &'a [(usize, usize)],
    pub last_move: Option<&'a MoveResult>,
    pub seed: Option<u64>,
    pub removal_ms: u32,
}

/// Terminal cells spanned by `n` grid cells of `step` each, saturating at `u16::MAX`.
fn grid_span(n: usize, step: u16) -> u16 {
    u16::try_from(n).unwrap_or(u16::MAX).saturating_mul(step)
}

/// Board size in terminal cells (border + grid).
fn board_pixel_size(rows: usize, cols: usize) -> (u16, u16) {
    (
        grid_span(cols, CELL_WIDTH).saturating_add(2),
        grid_span(rows, CELL_HEIGHT).saturating_add(2),
    )
}

/// Outer board rect and sidebar rect, centred together in `area`.
fn game_layout(area: Rect, rows: usize, cols: usize) -> (Rect, Rect) {
    let (bw, bh) = board_pixel_size(rows, cols);
    let total_w = bw.saturating_add(SIDEBAR_WIDTH);
    let total_h = bh.max(SIDEBAR_MIN_HEIGHT);
    let x = area.x + area.width.saturating_sub(total_w) / 2;
    let y = area.y + area.height.saturating_sub(total_h) / 2;
    let board = Rect {
        x,
        y,
        width: bw.min(area.width),
        height: bh.min(area.height),
    };
    let sidebar = Rect {
        x: x + board.width,
        y,
        width: SIDEBAR_WIDTH.min(area.width.saturating_sub(board.width)),
        height: total_h.min(area.height),
    };
    (board, sidebar)
}

/// Board grid rect (no border) for a board of `rows` x `cols` drawn in `area`.
pub fn board_inner_rect(area: Rect, rows: usize, cols: usize) -> Rect {
    let (outer, _) = game_layout(area, rows, cols);
    Rect {
        x: outer.x + 1,
        y: outer.y + 1,
        width: grid_span(cols, CELL_WIDTH).min(outer.width.saturating_sub(2)),
        height: grid_span(rows, CELL_HEIGHT).min(outer.height.saturating_sub(2)),
    }
}

/// Grid cell under a terminal position, if the position is on the board.
pub fn cell_under(inner: Rect, x: u16, y: u16) -> Option<(usize, usize)> {
    if !inner.contains(Position { x, y }) {
        return None;
    }
    let row = (y - inner.y) / CELL_HEIGHT;
    let col = (x - inner.x) / CELL_WIDTH;
    Some((row as usize, col as usize))
}

/// Terminal positions covered by the given grid cells. Cells outside `inner` are skipped.
fn buffer_positions(inner: Rect, cells: &[(usize, usize)]) -> HashSet<(u16, u16)> {
    let mut set = HashSet::new();
    for &(row, col) in cells {
        let dx = grid_span(col, CELL_WIDTH);
        let dy = grid_span(row, CELL_HEIGHT);
        if dx >= inner.width || dy >= inner.height {
            continue;
        }
        let x0 = inner.x + dx;
        let y0 = inner.y + dy;
        for bx in x0..(x0 + CELL_WIDTH).min(inner.right()) {
            for by in y0..(y0 + CELL_HEIGHT).min(inner.bottom()) {
                set.insert((bx, by));
            }
        }
    }
    set
}

/// Draw the current screen. While `view.removing` is non-empty, fades those cells to the
/// background with TachyonFX, creating the effect on first use and advancing it by the
/// time since `removal_process_time`.
pub fn draw(
    frame: &mut Frame,
    view: &View,
    removal_effect: &mut Option<Effect>,
    removal_process_time: &mut Option<Instant>,
    now: Instant,
) {
    let area = frame.area();
    frame
        .buffer_mut()
        .set_style(area, Style::default().bg(view.theme.bg));
    draw_game(frame, view, area);
    if !view.removing.is_empty() {
        apply_removal_effect(frame, view, area, removal_effect, removal_process_time, now);
    }
    if view.screen == Screen::GameOver {
        draw_game_over(frame, view, area);
    }
}

fn apply_removal_effect(
    frame: &mut Frame,
    view: &View,
    area: Rect,
    removal_effect: &mut Option<Effect>,
    removal_process_time: &mut Option<Instant>,
    now: Instant,
) {
    let inner = board_inner_rect(area, view.board.rows(), view.board.cols());
    let delta = removal_process_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
    *removal_process_time = Some(now);

    if removal_effect.is_none() {
        let fading = buffer_positions(inner, view.removing);
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
            fading.contains(&(pos.x, pos.y))
        }));
        let bg = view.theme.bg;
        let effect = fx::fade_to(bg, bg, (view.removal_ms, Interpolation::Linear))
            .with_filter(filter)
            .with_area(inner);
        *removal_effect = Some(effect);
    }

    if let Some(effect) = removal_effect {
        frame.render_effect(effect, inner, TfxDuration::from_millis(delta_ms));
    }
}

fn draw_game(frame: &mut Frame, view: &View, area: Rect) {
    let (board_area, sidebar_area) = game_layout(area, view.board.rows(), view.board.cols());
    draw_board(frame, view, board_area);
    draw_sidebar(frame, view, sidebar_area);
}

/// Cells to tint: the group being removed, or the group under the cursor when it can go.
fn highlighted_cells(view: &View) -> HashSet<(usize, usize)> {
    if !view.removing.is_empty() {
        return view.removing.iter().copied().collect();
    }
    if view.screen != Screen::Playing {
        return HashSet::new();
    }
    let (row, col) = view.cursor;
    view.engine
        .removable_group(row, col)
        .map(|group| group.into_iter().collect())
        .unwrap_or_default()
}

fn draw_board(frame: &mut Frame, view: &View, area: Rect) {
    let theme = view.theme;
    let title = format!(" starpop  {} ", view.engine.score());
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(title, theme.title));
    let inner = block.inner(area);
    block.render(area, frame.buffer_mut());

    let highlight = highlighted_cells(view);
    let show_cursor = view.screen == Screen::Playing && view.removing.is_empty();
    let board = view.board;
    let buf = frame.buffer_mut();

    // Only the cells that fit; a board larger than the terminal is cut at the right and bottom.
    let visible_rows = (inner.height / CELL_HEIGHT).min(grid_span(board.rows(), 1));
    let visible_cols = (inner.width / CELL_WIDTH).min(grid_span(board.cols(), 1));
    for gy in 0..visible_rows {
        for gx in 0..visible_cols {
            let (row, col) = (usize::from(gy), usize::from(gx));
            let x = inner.x + gx * CELL_WIDTH;
            let y = inner.y + gy * CELL_HEIGHT;
            let bg = if highlight.contains(&(row, col)) {
                theme.selected_bg
            } else {
                theme.bg
            };
            let (symbol, mut style) = match board.cell_at(row, col) {
                Cell::Tile(c) => (
                    Theme::tile_glyph(c),
                    Style::default().fg(theme.tile_color(c)).bg(bg),
                ),
                Cell::Empty => (' ', Style::default().fg(theme.inactive_fg).bg(bg)),
            };
            if show_cursor && view.cursor == (row, col) {
                style = style.add_modifier(Modifier::REVERSED);
                if symbol == ' ' {
                    buf.set_string(x, y, "··", style);
                    continue;
                }
            }
            buf.set_string(x, y, format!("{symbol} "), style);
        }
    }
}

fn draw_sidebar(frame: &mut Frame, view: &View, area: Rect) {
    let theme = view.theme;
    let engine = view.engine;
    let label = Style::default().fg(theme.inactive_fg);
    let value = Style::default().fg(theme.main_fg).add_modifier(Modifier::BOLD);
    let stat = |name: &'static str, v: String| {
        Line::from(vec![Span::styled(name, label), Span::styled(v, value)])
    };

    let last = match view.last_move {
        Some(m) => format!("+{} ({} tiles)", m.points, m.group.len()),
        None => "-".to_string(),
    };
    let mut lines = vec![
        Line::from(""),
        stat(" Score   ", engine.score().to_string()),
        stat(" Combo   ", engine.combo().to_string()),
        stat(" Last    ", last),
        stat(" Left    ", engine.tiles_remaining().to_string()),
        Line::from(""),
        stat(
            " Board   ",
            format!("{}x{}, {} colours", engine.rows(), engine.cols(), engine.color_count()),
        ),
    ];
    if let Some(seed) = view.seed {
        lines.push(stat(" Seed    ", seed.to_string()));
    }
    lines.push(Line::from(""));
    for help in [
        " Arrows/hjkl Move",
        " Enter/Space Pop",
        " Click       Pop",
        " R           Restart",
        " Q/Esc       Quit",
    ] {
        lines.push(Line::from(Span::styled(help, label)));
    }
    let p = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
            .title(Span::styled(" Stats ", theme.title)),
    );
    p.render(area, frame.buffer_mut());
}

fn draw_game_over(frame: &mut Frame, view: &View, area: Rect) {
    let theme = view.theme;
    let (board_area, _) = game_layout(area, view.board.rows(), view.board.cols());
    let popup_w = 28u16;
    let popup_h = 9u16;
    let popup = Rect {
        x: board_area.x + board_area.width.saturating_sub(popup_w) / 2,
        y: board_area.y + board_area.height.saturating_sub(popup_h) / 2,
        width: popup_w,
        height: popup_h,
    }
    .intersection(area);
    let text = Style::default().fg(theme.main_fg);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Game Over ",
            Style::default().fg(Color::White).bg(Color::Red),
        )),
        Line::from(""),
        Line::from(Span::styled(
            format!(" Final score: {} ", view.engine.score()),
            text.add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            format!(" Tiles left: {} ", view.engine.tiles_remaining()),
            text,
        )),
        Line::from(""),
        Line::from(Span::styled(" R — Restart    Q — Quit ", text)),
    ];
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .style(Style::default().bg(theme.bg));
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(block)
        .render(popup, frame.buffer_mut());
}
