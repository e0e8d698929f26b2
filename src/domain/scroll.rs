/// Scroll/position engine.
///
/// ## Coordinates
///
/// `Position` is the centre of the screen in area coordinates. For bounded
/// areas x stays within `[half_w, width - half_w]`; for looping areas x is
/// wrapped into `[0, width)`. 2D areas also move y within
/// `[half_h, height - half_h]`.
///
/// ## Looping strips
///
/// A looping area built from images never scrolls off its ends: the images
/// are kept in a rotated display order with at least two images either side
/// of the centre one. `LoopStrip` tracks that order and the centre in display
/// coordinates, independently of the canonical x in `Position`.
use std::collections::VecDeque;

use super::area::{Area, Entry, GravityWell};
use super::input::{InputState, LogicalInput};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Viewport {
    pub width: i32,
    pub height: i32,
}

impl Viewport {
    #[inline]
    pub fn half_width(&self) -> i32 {
        self.width / 2
    }

    #[inline]
    pub fn half_height(&self) -> i32 {
        self.height / 2
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

// ══════════════════════════════════════════════════════════════
// Looping strip
// ══════════════════════════════════════════════════════════════

/// Images kept either side of the centre one.
const STRIP_MARGIN: usize = 2;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoopStrip {
    /// `order[slot]` = canonical image number shown in display slot `slot`.
    order: VecDeque<usize>,
    image_width: i32,
    /// Screen centre in display coordinates (slot 0 starts at 0).
    render_x: i32,
}

impl LoopStrip {
    /// Canonical order, centred on `canonical_x`.
    pub fn new(count: usize, image_width: i32, canonical_x: i32) -> Self {
        let mut strip = LoopStrip {
            order: (0..count.max(1)).collect(),
            image_width,
            render_x: canonical_x,
        };
        strip.rebalance();
        strip
    }

    pub fn order(&self) -> impl Iterator<Item = usize> + '_ {
        self.order.iter().copied()
    }

    fn total(&self) -> i32 {
        self.image_width * self.order.len() as i32
    }

    pub fn center_slot(&self) -> usize {
        (self.render_x.div_euclid(self.image_width)).clamp(0, self.order.len() as i32 - 1) as usize
    }

    /// Translate the image nearest the screen centre plus its on-screen
    /// offset back to the area's canonical x.
    pub fn canonical_x(&self, offset: i32) -> i32 {
        let slot = self.center_slot();
        let image = self.order[slot] as i32;
        let within = self.render_x - slot as i32 * self.image_width;
        (image * self.image_width + within + offset).rem_euclid(self.total())
    }

    /// Move the centre by `dx`, rotating images as needed.
    /// Returns the number of rotations performed.
    pub fn shift(&mut self, dx: i32) -> usize {
        self.render_x += dx;
        self.rebalance()
    }

    /// Restore canonical order (image 0 first) by rotating the exact number
    /// of steps, then centre on `canonical_x`. Returns the steps rotated.
    pub fn reset(&mut self, canonical_x: i32) -> usize {
        let steps = self.order.iter().position(|&n| n == 0).unwrap_or(0);
        self.order.rotate_left(steps);
        self.render_x = canonical_x.rem_euclid(self.total());
        self.rebalance();
        steps
    }

    fn rebalance(&mut self) -> usize {
        let len = self.order.len();
        if len < STRIP_MARGIN * 2 + 1 {
            self.render_x = self.render_x.rem_euclid(self.total());
            return 0;
        }
        let mut rotations = 0;
        while self.render_x < STRIP_MARGIN as i32 * self.image_width {
            // rightmost image moves to the front
            self.order.rotate_right(1);
            self.render_x += self.image_width;
            rotations += 1;
        }
        while self.render_x >= (len - STRIP_MARGIN) as i32 * self.image_width {
            // leftmost image moves to the end
            self.order.rotate_left(1);
            self.render_x -= self.image_width;
            rotations += 1;
        }
        rotations
    }
}

// ══════════════════════════════════════════════════════════════
// Input → deltas
// ══════════════════════════════════════════════════════════════

/// Left and right add independently: both held cancel out.
pub fn horizontal_delta(input: &InputState, speed: i32) -> i32 {
    let mut dx = 0;
    if input.is_on(LogicalInput::Left) {
        dx -= speed;
    }
    if input.is_on(LogicalInput::Right) {
        dx += speed;
    }
    dx
}

/// Screen y grows downwards.
pub fn vertical_delta(input: &InputState, speed: i32) -> i32 {
    let mut dy = 0;
    if input.is_on(LogicalInput::Up) {
        dy -= speed;
    }
    if input.is_on(LogicalInput::Down) {
        dy += speed;
    }
    dy
}

// ══════════════════════════════════════════════════════════════
// Bounds
// ══════════════════════════════════════════════════════════════

fn clamp_centered(v: i32, extent: i32, half: i32) -> i32 {
    if extent <= half * 2 {
        extent / 2
    } else {
        v.clamp(half, extent - half)
    }
}

pub fn bound_x(area: &Area, viewport: Viewport, x: i32) -> i32 {
    if area.loops {
        x.rem_euclid(area.width)
    } else {
        clamp_centered(x, area.width, viewport.half_width())
    }
}

pub fn bound_y(area: &Area, viewport: Viewport, y: i32) -> i32 {
    match area.height {
        Some(h) => clamp_centered(y, h, viewport.half_height()),
        None => viewport.half_height(),
    }
}

/// Vertical start position when arriving in `area`.
pub fn entry_y(area: &Area, viewport: Viewport) -> i32 {
    match (area.height, area.entry) {
        (Some(_), Entry::Top) => bound_y(area, viewport, i32::MIN),
        (Some(_), Entry::Bottom) => bound_y(area, viewport, i32::MAX),
        (Some(h), Entry::Middle) => bound_y(area, viewport, h / 2),
        (None, _) => viewport.half_height(),
    }
}

// ══════════════════════════════════════════════════════════════
// Movement
// ══════════════════════════════════════════════════════════════

/// Apply a horizontal step. Returns true if the position changed.
pub fn move_horizontal(
    area: &Area,
    viewport: Viewport,
    pos: &mut Position,
    strip: Option<&mut LoopStrip>,
    dx: i32,
) -> bool {
    if dx == 0 {
        return false;
    }
    let old = pos.x;
    pos.x = bound_x(area, viewport, pos.x + dx);
    if let Some(s) = strip {
        if area.loops {
            s.shift(dx);
        }
    }
    pos.x != old
}

/// Free vertical movement; only 2D areas accept it.
pub fn move_vertical(area: &Area, viewport: Viewport, pos: &mut Position, dy: i32) -> bool {
    if dy == 0 || !area.is_2d() {
        return false;
    }
    let old = pos.y;
    pos.y = bound_y(area, viewport, pos.y + dy);
    pos.y != old
}

// ══════════════════════════════════════════════════════════════
// Gravity well
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GravityOutcome {
    /// Sub-pixel pull only; nothing moved this tick.
    Accumulating,
    Moved,
    Captured,
}

/// Pull `pos` toward the well. Force falls off linearly with distance.
/// Fractions of a pixel accumulate in `carry` until they make a whole step.
pub fn apply_gravity(well: &GravityWell, pos: &mut Position, carry: &mut (f32, f32)) -> GravityOutcome {
    let exact_x = pos.x as f32 + carry.0;
    let exact_y = pos.y as f32 + carry.1;
    let dx = well.x - exact_x;
    let dy = well.y - exact_y;

    if captured(well, dx, dy) {
        snap_to_well(well, pos, carry);
        return GravityOutcome::Captured;
    }

    let dist = (dx * dx + dy * dy).sqrt();
    if dist <= f32::EPSILON {
        snap_to_well(well, pos, carry);
        return GravityOutcome::Captured;
    }
    let force = (well.strength / dist).min(dist);
    carry.0 += force * dx / dist;
    carry.1 += force * dy / dist;

    let step_x = carry.0.trunc();
    let step_y = carry.1.trunc();
    carry.0 -= step_x;
    carry.1 -= step_y;
    pos.x += step_x as i32;
    pos.y += step_y as i32;

    let rdx = well.x - (pos.x as f32 + carry.0);
    let rdy = well.y - (pos.y as f32 + carry.1);
    if captured(well, rdx, rdy) {
        snap_to_well(well, pos, carry);
        GravityOutcome::Captured
    } else if step_x != 0.0 || step_y != 0.0 {
        GravityOutcome::Moved
    } else {
        GravityOutcome::Accumulating
    }
}

fn captured(well: &GravityWell, dx: f32, dy: f32) -> bool {
    dx.abs() < well.capture_epsilon && dy.abs() < well.capture_epsilon
}

fn snap_to_well(well: &GravityWell, pos: &mut Position, carry: &mut (f32, f32)) {
    pos.x = well.x.round() as i32;
    pos.y = well.y.round() as i32;
    *carry = (0.0, 0.0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::area::{AreaId, ExitPolicy, StripLayout};
    use crate::domain::input::LogicalInput::*;

    const VP: Viewport = Viewport { width: 200, height: 100 };

    fn area(width: i32, loops: bool, height: Option<i32>) -> Area {
        Area {
            name: "t".into(),
            width,
            height,
            loops,
            strip: None,
            transition_range: 400,
            canonical_offset: 0,
            hold_through: false,
            exit: ExitPolicy::Range,
            entry: Entry::Middle,
            zoom_ms: 0,
            letterbox: false,
            decorations: false,
            gravity: None,
            transitions: vec![],
        }
    }

    fn well() -> GravityWell {
        GravityWell {
            x: 960.0,
            y: 600.0,
            strength: 1000.0,
            capture_epsilon: 2.0,
            swallow_ms: 5000,
            destination: AreaId(0),
        }
    }

    #[test]
    fn left_and_right_cancel() {
        let s = InputState::with(&[Left, Right]);
        assert_eq!(horizontal_delta(&s, 7), 0);
        assert_eq!(horizontal_delta(&InputState::with(&[Left]), 7), -7);
        assert_eq!(vertical_delta(&InputState::with(&[Up, Down]), 3), 0);
        assert_eq!(vertical_delta(&InputState::with(&[Down]), 3), 3);
    }

    #[test]
    fn bounded_area_clamps_to_half_viewport() {
        let a = area(5000, false, None);
        let mut p = Position { x: 150, y: 50 };
        for _ in 0..100 {
            move_horizontal(&a, VP, &mut p, None, -2);
        }
        assert_eq!(p.x, 100);
        for _ in 0..5000 {
            move_horizontal(&a, VP, &mut p, None, 2);
        }
        assert_eq!(p.x, 4900);
    }

    #[test]
    fn narrow_area_pins_to_centre() {
        let a = area(150, false, None);
        assert_eq!(bound_x(&a, VP, 0), 75);
        assert_eq!(bound_x(&a, VP, 9999), 75);
    }

    #[test]
    fn looping_area_wraps_both_ways() {
        let a = area(1000, true, None);
        let mut p = Position { x: 10, y: 50 };
        move_horizontal(&a, VP, &mut p, None, -20);
        assert_eq!(p.x, 990);
        move_horizontal(&a, VP, &mut p, None, 30);
        assert_eq!(p.x, 20);
    }

    #[test]
    fn looping_returns_after_whole_laps() {
        let a = area(1000, true, None);
        let mut p = Position { x: 321, y: 50 };
        for _ in 0..(3 * 1000 / 4) {
            move_horizontal(&a, VP, &mut p, None, 4);
        }
        assert_eq!(p.x, 321);
    }

    #[test]
    fn vertical_only_in_2d_areas() {
        let flat = area(1000, false, None);
        let mut p = Position { x: 500, y: 50 };
        assert!(!move_vertical(&flat, VP, &mut p, 10));
        let tall = area(1000, false, Some(400));
        assert!(move_vertical(&tall, VP, &mut p, 10));
        assert_eq!(p.y, 60);
        for _ in 0..100 {
            move_vertical(&tall, VP, &mut p, 10);
        }
        assert_eq!(p.y, 350);
    }

    #[test]
    fn entry_positions() {
        let mut a = area(1000, false, Some(400));
        a.entry = Entry::Top;
        assert_eq!(entry_y(&a, VP), 50);
        a.entry = Entry::Bottom;
        assert_eq!(entry_y(&a, VP), 350);
        a.entry = Entry::Middle;
        assert_eq!(entry_y(&a, VP), 200);
        assert_eq!(entry_y(&area(1000, false, None), VP), 50);
    }

    #[test]
    fn strip_tracks_canonical_position() {
        let mut a = area(21 * 100, true, None);
        a.strip = Some(StripLayout { image_width: 100 });
        let mut strip = LoopStrip::new(21, 100, 1000);
        let mut p = Position { x: 1000, y: 50 };
        for step in [-37, 250, -999, 3000, 7, -4444, 1] {
            move_horizontal(&a, VP, &mut p, Some(&mut strip), step);
            assert_eq!(strip.canonical_x(0), p.x, "after step {step}");
            let slot = strip.center_slot();
            assert!(slot >= 2 && slot <= 18, "slot {slot} lacks margin");
        }
    }

    #[test]
    fn strip_reset_restores_canonical_order() {
        let mut strip = LoopStrip::new(8, 100, 50);
        // centring on x=50 had to rotate image 7 and 6 to the front
        assert_ne!(strip.order().next(), Some(0));
        strip.shift(333);
        strip.reset(420);
        assert_eq!(strip.canonical_x(0), 420);
        let order: Vec<usize> = strip.order().collect();
        assert_eq!(order, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn canonical_offset_is_applied() {
        let strip = LoopStrip::new(8, 100, 420);
        assert_eq!(strip.canonical_x(-250), 170);
        assert_eq!(strip.canonical_x(-500), 720);
    }

    #[test]
    fn gravity_accumulates_sub_pixel_pull() {
        // far away: 1000 / 4000 = 0.25 px per tick
        let w = well();
        let mut p = Position { x: 4960, y: 600 };
        let mut carry = (0.0, 0.0);
        let outcomes: Vec<_> = (0..4).map(|_| apply_gravity(&w, &mut p, &mut carry)).collect();
        assert_eq!(&outcomes[..3], &[GravityOutcome::Accumulating; 3]);
        assert_eq!(outcomes[3], GravityOutcome::Moved);
        assert_eq!(p.x, 4959);
        assert_eq!(p.y, 600);
    }

    #[test]
    fn gravity_pulls_harder_when_close() {
        let w = well();
        let mut far = Position { x: 1960, y: 600 };
        let mut near = Position { x: 1060, y: 600 };
        let (mut cf, mut cn) = ((0.0, 0.0), (0.0, 0.0));
        apply_gravity(&w, &mut far, &mut cf);
        apply_gravity(&w, &mut near, &mut cn);
        assert_eq!(1960 - far.x, 1);
        assert_eq!(1060 - near.x, 10);
    }

    #[test]
    fn gravity_captures_near_well() {
        let w = well();
        let mut p = Position { x: 965, y: 603 };
        let mut carry = (0.3, 0.0);
        let mut outcome = GravityOutcome::Moved;
        for _ in 0..10 {
            outcome = apply_gravity(&w, &mut p, &mut carry);
            if outcome == GravityOutcome::Captured {
                break;
            }
        }
        assert_eq!(outcome, GravityOutcome::Captured);
        assert_eq!(p, Position { x: 960, y: 600 });
        assert_eq!(carry, (0.0, 0.0));
    }

    #[test]
    fn gravity_on_the_well_captures_without_epsilon() {
        let w = GravityWell { capture_epsilon: 0.0, ..well() };
        let mut p = Position { x: 960, y: 600 };
        let mut carry = (0.0, 0.0);
        assert_eq!(apply_gravity(&w, &mut p, &mut carry), GravityOutcome::Captured);
        assert_eq!(carry, (0.0, 0.0));
        assert_eq!(p, Position { x: 960, y: 600 });
    }
}
