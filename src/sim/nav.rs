/// NavigationState: the mutable run-time record of where the audience is.
///
/// Owned by the theatre. The scroll engine and transition controller are the
/// only writers; presentation reads it through intents.
///
/// ## Input blocking
///
/// Input is blocked for two independent reasons: an area transition is in
/// flight, or the celebration party is playing. `inputs_blocked()` is true
/// while either holds.
use crate::domain::area::{Area, AreaId};
use crate::domain::detector::Permissions;
use crate::domain::scroll::{self, LoopStrip, Position, Viewport};

pub const SCROLLSPEED_MIN: i32 = 1;
pub const SCROLLSPEED_MAX: i32 = 100;

#[derive(Clone, Debug)]
pub struct NavigationState {
    // ── Location ──
    pub current_area: AreaId,
    pub position: Position,
    /// Display order of the current area, if it is a looping strip.
    pub strip: Option<LoopStrip>,
    /// Sub-pixel gravity remainder.
    pub gravity_carry: (f32, f32),

    // ── Movement ──
    pub scroll_speed: i32,
    pub permitted: Permissions,
    /// No input was held on the previous processed tick.
    pub was_idle: bool,

    // ── Blocking ──
    pub transition_block: bool,
    pub party_block: bool,

    // ── Toggles ──
    pub gravity_enabled: bool,
    pub animation_enabled: bool,
}

impl NavigationState {
    pub fn new(area_id: AreaId, area: &Area, viewport: Viewport, x: i32, speed: i32) -> Self {
        let mut nav = NavigationState {
            current_area: area_id,
            position: Position::default(),
            strip: None,
            gravity_carry: (0.0, 0.0),
            scroll_speed: speed.clamp(SCROLLSPEED_MIN, SCROLLSPEED_MAX),
            permitted: Permissions::default(),
            was_idle: true,
            transition_block: false,
            party_block: false,
            gravity_enabled: true,
            animation_enabled: true,
        };
        nav.enter(area_id, area, viewport, x);
        nav
    }

    pub fn inputs_blocked(&self) -> bool {
        self.transition_block || self.party_block
    }

    /// Reset location for a new area: bounded x, entry y, canonical strip.
    pub fn enter(&mut self, area_id: AreaId, area: &Area, viewport: Viewport, x: i32) {
        self.current_area = area_id;
        self.position = Position {
            x: scroll::bound_x(area, viewport, x),
            y: scroll::entry_y(area, viewport),
        };
        self.gravity_carry = (0.0, 0.0);
        self.strip = match (area.loops, area.strip) {
            (true, Some(layout)) => {
                let count = area.image_count();
                // reuse the existing strip when re-entering the same area
                match self.strip.take() {
                    Some(mut s) if s.order().count() == count => {
                        let steps = s.reset(self.position.x);
                        if steps > 0 {
                            log::debug!("{}: rotated strip {steps} steps back to canonical order", area.name);
                        }
                        Some(s)
                    }
                    _ => Some(LoopStrip::new(count, layout.image_width, self.position.x)),
                }
            }
            _ => None,
        };
        self.permitted = Permissions::default();
    }

    /// Change scroll speed by `delta`, clamped. Returns the new speed.
    pub fn adjust_speed(&mut self, delta: i32) -> i32 {
        self.scroll_speed = (self.scroll_speed + delta).clamp(SCROLLSPEED_MIN, SCROLLSPEED_MAX);
        self.scroll_speed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::area::AreaTable;

    const VP: Viewport = Viewport { width: 1920, height: 760 };

    #[test]
    fn speed_is_clamped() {
        let t = AreaTable::builtin().unwrap();
        let id = t.id_of("hug").unwrap();
        let mut nav = NavigationState::new(id, t.get(id), VP, 1200, 2);
        for _ in 0..10 {
            nav.adjust_speed(-1);
        }
        assert_eq!(nav.scroll_speed, SCROLLSPEED_MIN);
        for _ in 0..500 {
            nav.adjust_speed(1);
        }
        assert_eq!(nav.scroll_speed, SCROLLSPEED_MAX);
    }

    #[test]
    fn entering_2d_area_uses_entry_edge() {
        let t = AreaTable::builtin().unwrap();
        let space = t.id_of("space").unwrap();
        let nav = NavigationState::new(space, t.get(space), VP, 6695, 2);
        assert_eq!(nav.position, Position { x: 6695, y: 2000 - 380 });

        let sea = t.id_of("undersea").unwrap();
        let nav = NavigationState::new(sea, t.get(sea), VP, 2880, 2);
        assert_eq!(nav.position.y, 380);
        assert!(nav.strip.is_none());
    }

    #[test]
    fn entering_strip_area_builds_canonical_strip() {
        let t = AreaTable::builtin().unwrap();
        let main = t.id_of("main").unwrap();
        let nav = NavigationState::new(main, t.get(main), VP, 23800, 2);
        let strip = nav.strip.as_ref().unwrap();
        assert_eq!(strip.canonical_x(0), 23800);
    }

    #[test]
    fn destination_is_bounded() {
        let t = AreaTable::builtin().unwrap();
        let hell = t.id_of("hell").unwrap();
        let nav = NavigationState::new(hell, t.get(hell), VP, 675, 2);
        assert_eq!(nav.position.x, 960);
        assert!(!nav.inputs_blocked());
    }
}
