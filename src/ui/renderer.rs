/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// The terminal stands in for the projector. Layout, top to bottom:
///
///   HUD row        area, position, speed, gesture progress
///   letterbox bar  (hidden for letterboxed areas)
///   exit up        ▲ indicator
///   strip          the whole area scaled to the terminal, exits marked,
///                  the visible window bracketed
///   image order    display order of a looping strip
///   exit down      ▼ indicator
///   letterbox bar
///   message        HUD text
///   help row
///
/// 2D areas get a vertical gauge on the right-hand side.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::area::VerticalDir;
use crate::ui::stage::{Celebration, Stage};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit dark background for all "empty" terminal cells, so row gaps
    /// match cell colour on VTE terminals.
    const BASE_BG: Color = Color::Rgb { r: 12, g: 12, b: 18 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Sentinel cell used to invalidate the back buffer.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn fill(&mut self, bg: Color) {
        self.cells.fill(Cell { bg, ..Cell::BLANK });
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width {
                break;
            }
            self.set(x + i, y, Cell { ch, fg, bg });
        }
    }

    fn put_centered(&mut self, y: usize, s: &str, fg: Color, bg: Color) {
        let len = s.chars().count();
        let x = self.width.saturating_sub(len) / 2;
        self.put_str(x, y, s, fg, bg);
    }
}

// ── Colour helpers ──

/// Scale an RGB colour towards black.
fn dim(c: Color, brightness: f32) -> Color {
    match c {
        Color::Rgb { r, g, b } => {
            let k = brightness.clamp(0.0, 1.0);
            Color::Rgb {
                r: (r as f32 * k) as u8,
                g: (g as f32 * k) as u8,
                b: (b as f32 * k) as u8,
            }
        }
        other => other,
    }
}

fn hue(deg: u16, value: f32) -> Color {
    let h = (deg % 360) as f32 / 60.0;
    let x = 1.0 - (h % 2.0 - 1.0).abs();
    let (r, g, b) = match h as u32 {
        0 => (1.0, x, 0.0),
        1 => (x, 1.0, 0.0),
        2 => (0.0, 1.0, x),
        3 => (0.0, x, 1.0),
        4 => (x, 0.0, 1.0),
        _ => (1.0, 0.0, x),
    };
    let v = value * 255.0;
    Color::Rgb { r: (r * v) as u8, g: (g * v) as u8, b: (b * v) as u8 }
}

const SHADOW: Color = Color::Rgb { r: 230, g: 200, b: 140 };
const MARKER: Color = Color::Rgb { r: 255, g: 170, b: 60 };
const WINDOW: Color = Color::Rgb { r: 255, g: 255, b: 255 };
const BAR: Color = Color::Rgb { r: 0, g: 0, b: 0 };
const MUTED: Color = Color::Rgb { r: 110, g: 110, b: 130 };
const MATRIX: Color = Color::Rgb { r: 40, g: 220, b: 90 };

// ── Renderer ──

const HUD_ROW: usize = 0;
const TOP_BAR_ROW: usize = 1;
const EXIT_UP_ROW: usize = 3;
const STRIP_ROW: usize = 5;
const ORDER_ROW: usize = 7;
const EXIT_DOWN_ROW: usize = 9;
const BOTTOM_BAR_ROW: usize = 11;
const MESSAGE_ROW: usize = 13;

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    enhanced: bool,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            enhanced: false,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        // Force full repaint on first frame: back ≠ front for every cell.
        self.back.cells.fill(Cell::INVALID);

        Ok(())
    }

    /// Ask the terminal for key Release events. Returns true if granted.
    pub fn enable_key_release(&mut self) -> io::Result<bool> {
        if !terminal::supports_keyboard_enhancement()? {
            return Ok(false);
        }
        execute!(
            self.writer,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        )?;
        self.enhanced = true;
        Ok(true)
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        if self.enhanced {
            execute!(self.writer, PopKeyboardEnhancementFlags)?;
        }
        execute!(self.writer, ResetColor, cursor::Show, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }

    pub fn render(&mut self, stage: &Stage, now: u64) -> io::Result<()> {
        // Detect terminal resize
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        self.compose(stage, now);
        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Composition ──

    fn compose(&mut self, stage: &Stage, now: u64) {
        let celebration = stage.celebration_at(now);
        let bg = match (celebration, stage.disco_hue) {
            (Celebration::Party { start, .. }, _) => hue((now.saturating_sub(start) / 20 % 360) as u16, 0.35),
            (_, Some(h)) if stage.animation => hue(h, 0.2),
            _ => Cell::BASE_BG,
        };
        self.front.fill(bg);

        if let Celebration::Matrix { start, .. } = celebration {
            self.compose_matrix(now.saturating_sub(start));
        }

        self.compose_hud(stage, bg);

        let brightness = stage.brightness(now);
        if stage.bars {
            self.compose_bar(TOP_BAR_ROW);
            self.compose_bar(BOTTOM_BAR_ROW);
        }
        self.compose_strip(stage, bg, brightness);
        self.compose_exits(stage, bg, brightness);
        self.compose_gauge(stage, bg, brightness);

        if let Some(p) = stage.zoom_progress(now) {
            let w = ((p * self.front.width as f32) as usize).max(1);
            let s: String = std::iter::repeat('░').take(w).collect();
            self.front.put_centered(ORDER_ROW + 1, &s, dim(SHADOW, brightness), bg);
        }

        if let Some(text) = stage.hud_text(now) {
            self.front.put_centered(MESSAGE_ROW, text, WINDOW, bg);
        }

        let help = "←/→ scroll  ↑/↓ exit  s/f speed  x reverse  e party  g gravity  a anim  q quit";
        let help_row = self.front.height.saturating_sub(1);
        self.front.put_str(1, help_row, help, MUTED, bg);
    }

    fn compose_hud(&mut self, stage: &Stage, bg: Color) {
        let Some(area) = &stage.area else {
            return;
        };
        let mut line = format!(" {}  x:{:>6}", area.name.to_uppercase(), stage.x);
        if area.height.is_some() {
            line.push_str(&format!("  y:{:>5}", stage.y));
        }
        line.push_str(&format!("  speed:{}", stage.scroll_speed));
        if stage.gesture > 0 {
            line.push_str(&format!("  {}", "•".repeat(stage.gesture)));
        }
        if stage.input_blocked {
            line.push_str("  ⏸");
        }
        self.front.put_str(0, HUD_ROW, &line, SHADOW, bg);
    }

    fn compose_bar(&mut self, row: usize) {
        for x in 0..self.front.width {
            self.front.set(x, row, Cell { ch: '▀', fg: BAR, bg: BAR });
        }
    }

    /// Area x → terminal column.
    fn column(&self, width: i32, x: i32) -> usize {
        let cols = self.front.width.saturating_sub(2).max(1) as i64;
        let x = (x as i64).clamp(0, width.max(1) as i64);
        1 + (x * (cols - 1) / width.max(1) as i64) as usize
    }

    fn compose_strip(&mut self, stage: &Stage, bg: Color, brightness: f32) {
        let Some(area) = &stage.area else {
            return;
        };
        let fg = dim(SHADOW, brightness);
        let cols = self.front.width.saturating_sub(2);
        for i in 0..cols {
            self.front.set(1 + i, STRIP_ROW, Cell { ch: '─', fg, bg });
        }
        for m in &area.markers {
            let ch = match m.direction {
                VerticalDir::Up => '▲',
                VerticalDir::Down => '▼',
            };
            let col = self.column(area.width, m.position);
            self.front.set(col, STRIP_ROW, Cell { ch, fg: dim(MARKER, brightness), bg });
        }

        let half = stage.viewport.half_width();
        let left = self.column(area.width, stage.x - half);
        let right = self.column(area.width, stage.x + half);
        let win = dim(WINDOW, brightness);
        self.front.set(left, STRIP_ROW, Cell { ch: '[', fg: win, bg });
        self.front.set(right, STRIP_ROW, Cell { ch: ']', fg: win, bg });
        let centre = self.column(area.width, stage.x);
        self.front.set(centre, STRIP_ROW, Cell { ch: '◆', fg: win, bg });

        if area.loops && !stage.strip.is_empty() {
            let order: Vec<String> = stage.strip.iter().map(|n| format!("{n:02}")).collect();
            self.front.put_centered(ORDER_ROW, &order.join(" "), dim(MUTED, brightness), bg);
        }
    }

    fn compose_exits(&mut self, stage: &Stage, bg: Color, brightness: f32) {
        let fg = dim(MARKER, brightness);
        // the disco arrow drifts sideways
        let shift = stage.arrow_shift as usize * 4;
        if stage.indicator_up {
            let x = (self.front.width / 2).saturating_sub(3);
            self.front.put_str(x, EXIT_UP_ROW, "▲ UP ▲", fg, bg);
        }
        if stage.indicator_down {
            let x = (self.front.width / 2).saturating_sub(4) + shift;
            self.front.put_str(x, EXIT_DOWN_ROW, "▼ DOWN ▼", fg, bg);
        }
    }

    fn compose_gauge(&mut self, stage: &Stage, bg: Color, brightness: f32) {
        let Some(area) = &stage.area else {
            return;
        };
        let Some(height) = area.height else {
            return;
        };
        let x = self.front.width.saturating_sub(2);
        let rows = (BOTTOM_BAR_ROW - TOP_BAR_ROW - 1) as i64;
        let top = TOP_BAR_ROW + 1;
        let fg = dim(SHADOW, brightness);
        for r in 0..rows as usize {
            self.front.set(x, top + r, Cell { ch: '│', fg, bg });
        }
        let y = (stage.y as i64).clamp(0, height as i64);
        let r = (y * (rows - 1) / height.max(1) as i64) as usize;
        self.front.set(x, top + r, Cell { ch: '█', fg: dim(WINDOW, brightness), bg });
    }

    /// Falling glyph columns, advanced from elapsed time.
    fn compose_matrix(&mut self, elapsed: u64) {
        const GLYPHS: &[char] = &['ｱ', 'ｶ', 'ｻ', 'ﾀ', 'ﾅ', 'ﾊ', 'ﾏ', '0', '1', 'Z'];
        let h = self.front.height.max(1);
        for x in (0..self.front.width).step_by(3) {
            let speed = 40 + (x * 7919 % 60) as u64;
            let head = ((elapsed / speed) as usize + x * 31) % (h + 8);
            for trail in 0..6usize {
                if head < trail || head - trail >= h {
                    continue;
                }
                let y = head - trail;
                let ch = GLYPHS[(x + y + (elapsed / 200) as usize) % GLYPHS.len()];
                let fg = dim(MATRIX, 1.0 - trail as f32 / 6.0);
                self.front.set(x, y, Cell { ch, fg, bg: Cell::BASE_BG });
            }
        }
    }

    // ── Output ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // Set explicit base colors at start of frame (not ResetColor).
        queue!(self.writer, SetForegroundColor(Color::White), SetBackgroundColor(Cell::BASE_BG))?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    need_move = true;
                    continue;
                }

                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
                last_x = x;
                last_y = y;
            }
        }

        self.writer.flush()
    }
}
