/// Transition detector: which vertical exits are open at a position.
///
/// Permissions are rebuilt from scratch on every call, so a direction with
/// no exit in range is always `None`. If two exits of the same direction are
/// in range at once, the later one in table order wins.
use super::area::{Area, Destination, ExitPolicy, VerticalDir};
use super::scroll::{LoopStrip, Position, Viewport};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Permissions {
    pub up: Option<Destination>,
    pub down: Option<Destination>,
    /// Exit indicators. An edge exit shows its indicator before it permits.
    pub up_indicator: bool,
    pub down_indicator: bool,
}

impl Permissions {
    pub fn get(&self, dir: VerticalDir) -> Option<Destination> {
        match dir {
            VerticalDir::Up => self.up,
            VerticalDir::Down => self.down,
        }
    }

    pub fn indicator(&self, dir: VerticalDir) -> bool {
        match dir {
            VerticalDir::Up => self.up_indicator,
            VerticalDir::Down => self.down_indicator,
        }
    }

    fn permit(&mut self, dir: VerticalDir, dest: Destination) {
        match dir {
            VerticalDir::Up => self.up = Some(dest),
            VerticalDir::Down => self.down = Some(dest),
        }
        self.show(dir);
    }

    fn show(&mut self, dir: VerticalDir) {
        match dir {
            VerticalDir::Up => self.up_indicator = true,
            VerticalDir::Down => self.down_indicator = true,
        }
    }
}

/// The x used for comparison against exit positions. Looping strips are
/// rotated, so their canonical x comes from the centre image and offset.
pub fn comparison_x(area: &Area, pos: Position, strip: Option<&LoopStrip>) -> i32 {
    match strip {
        Some(s) if area.loops => s.canonical_x(area.canonical_offset),
        _ => pos.x,
    }
}

/// Distance from the screen edge to the area edge an exit leaves through.
/// Areas without height are always at their edge.
fn edge_proximity(area: &Area, viewport: Viewport, pos: Position, dir: VerticalDir) -> i32 {
    match (area.height, dir) {
        (Some(h), VerticalDir::Down) => h - viewport.half_height() - pos.y,
        (Some(_), VerticalDir::Up) => pos.y - viewport.half_height(),
        (None, _) => 0,
    }
}

pub fn detect(area: &Area, viewport: Viewport, pos: Position, strip: Option<&LoopStrip>) -> Permissions {
    let x = comparison_x(area, pos, strip);
    let mut p = Permissions::default();

    for point in &area.transitions {
        if (x - point.position).abs() >= area.transition_range {
            continue;
        }
        match area.exit {
            ExitPolicy::Range => p.permit(point.direction, point.destination),
            ExitPolicy::Edge { arrow_proximity, exit_proximity } => {
                let proximity = edge_proximity(area, viewport, pos, point.direction);
                if proximity <= arrow_proximity {
                    p.show(point.direction);
                }
                if proximity <= exit_proximity {
                    p.permit(point.direction, point.destination);
                }
            }
        }
    }

    p
}
