/// Areas: the static level-design table.
///
/// ## Table format (`areas.toml`)
///   ```toml
///   [[area]]
///   name = "main"
///   width = 28371
///   loops = true
///   strip_image_width = 1351
///   transitions = [
///       [2500, -1, "pirate", 3400],   # position, direction, destination, entry
///   ]
///   ```
///
/// Direction is `1` for up and `-1` for down. Points with any other
/// direction, or naming an area that does not exist, are logged and dropped.
/// A copy of the installation's table is embedded in the binary.
use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use super::input::LogicalInput;

const BUILTIN_AREAS: &str = include_str!("../../areas.toml");

/// Index into an `AreaTable`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct AreaId(pub usize);

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum VerticalDir {
    Up,
    Down,
}

impl VerticalDir {
    pub fn from_sign(sign: i64) -> Option<VerticalDir> {
        match sign {
            1 => Some(VerticalDir::Up),
            -1 => Some(VerticalDir::Down),
            _ => None,
        }
    }

    /// The directional input that takes an exit in this direction.
    pub fn input(self) -> LogicalInput {
        match self {
            VerticalDir::Up => LogicalInput::Up,
            VerticalDir::Down => LogicalInput::Down,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Destination {
    pub area: AreaId,
    pub position: i32,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TransitionPoint {
    pub position: i32,
    pub direction: VerticalDir,
    pub destination: Destination,
}

/// How an exit "grabs".
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ExitPolicy {
    /// Horizontal range alone permits the exit.
    Range,
    /// A 2D area must also reach the top/bottom edge. The indicator shows
    /// within `arrow_proximity`, the exit permits within `exit_proximity`.
    Edge { arrow_proximity: i32, exit_proximity: i32 },
}

/// Where the vertical position starts when arriving in a 2D area.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Entry {
    Top,
    #[default]
    Middle,
    Bottom,
}

/// Looping content made of equal-width images shown in rotated order.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct StripLayout {
    pub image_width: i32,
}

/// Radial attractor inside a 2D area.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct GravityWell {
    pub x: f32,
    pub y: f32,
    pub strength: f32,
    pub capture_epsilon: f32,
    pub swallow_ms: u64,
    pub destination: AreaId,
}

#[derive(Clone, Debug)]
pub struct Area {
    pub name: String,
    pub width: i32,
    /// Present for areas with free vertical movement.
    pub height: Option<i32>,
    pub loops: bool,
    pub strip: Option<StripLayout>,
    pub transition_range: i32,
    /// Correction added when mapping a rotated strip back to canonical x.
    pub canonical_offset: i32,
    /// Vertical exits fire while held, not only on the leading edge.
    pub hold_through: bool,
    pub exit: ExitPolicy,
    pub entry: Entry,
    /// Extra zoom lead-in before the fade when arriving here.
    pub zoom_ms: u64,
    pub letterbox: bool,
    pub decorations: bool,
    pub gravity: Option<GravityWell>,
    pub transitions: Vec<TransitionPoint>,
}

impl Area {
    pub fn is_2d(&self) -> bool {
        self.height.is_some()
    }

    pub fn image_count(&self) -> usize {
        match self.strip {
            Some(s) if s.image_width > 0 => (self.width / s.image_width).max(1) as usize,
            _ => 1,
        }
    }
}

#[derive(Debug, Error)]
pub enum AreaError {
    #[error("could not read {path}: {source}")]
    Io { path: String, source: std::io::Error },
    #[error("area table parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("area table is empty")]
    Empty,
    #[error("area {0:?} is defined twice")]
    Duplicate(String),
    #[error("area {name:?} has invalid size {width}x{height}")]
    InvalidSize { name: String, width: i32, height: i32 },
    #[error("unknown area {0:?}")]
    UnknownArea(String),
}

// ── TOML schema ──

#[derive(Deserialize, Debug)]
struct RawTable {
    #[serde(rename = "area", default)]
    areas: Vec<RawArea>,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
enum RawExit {
    #[default]
    Range,
    Edge,
}

#[derive(Deserialize, Debug)]
struct RawGravity {
    x: f32,
    y: f32,
    #[serde(default = "default_strength")]
    strength: f32,
    #[serde(default = "default_capture")]
    capture_epsilon: f32,
    #[serde(default = "default_swallow")]
    swallow_ms: u64,
    destination: String,
}

#[derive(Deserialize, Debug)]
struct RawArea {
    name: String,
    width: i32,
    #[serde(default)]
    height: Option<i32>,
    #[serde(default)]
    loops: bool,
    #[serde(default)]
    strip_image_width: Option<i32>,
    #[serde(default = "default_range")]
    transition_range: i32,
    #[serde(default)]
    canonical_offset: i32,
    #[serde(default)]
    hold_through: bool,
    #[serde(default)]
    exit: RawExit,
    #[serde(default = "default_arrow_proximity")]
    arrow_proximity: i32,
    #[serde(default = "default_exit_proximity")]
    exit_proximity: i32,
    #[serde(default)]
    entry: Entry,
    #[serde(default)]
    zoom_ms: u64,
    #[serde(default)]
    letterbox: bool,
    #[serde(default)]
    decorations: bool,
    #[serde(default)]
    gravity: Option<RawGravity>,
    #[serde(default)]
    transitions: Vec<(i32, i64, String, i32)>,
}

fn default_range() -> i32 { 400 }
fn default_arrow_proximity() -> i32 { 150 }
fn default_exit_proximity() -> i32 { 2 }
fn default_strength() -> f32 { 1000.0 }
fn default_capture() -> f32 { 2.0 }
fn default_swallow() -> u64 { 5000 }

fn positive_or_default(area: &str, key: &str, value: f32, default: f32) -> f32 {
    if value > 0.0 && value.is_finite() {
        value
    } else {
        log::warn!("{area}: gravity {key} {value} must be positive; using {default}");
        default
    }
}

// ── Table ──

#[derive(Clone, Debug)]
pub struct AreaTable {
    areas: Vec<Area>,
    index: HashMap<String, AreaId>,
}

impl AreaTable {
    /// The table compiled into the binary.
    pub fn builtin() -> Result<Self, AreaError> {
        Self::from_toml_str(BUILTIN_AREAS)
    }

    /// Load `path` if given and readable, else the built-in table.
    /// A broken override is reported and the built-in table used instead.
    pub fn load(path: Option<&Path>) -> Result<Self, AreaError> {
        if let Some(p) = path {
            if p.exists() {
                match Self::from_file(p) {
                    Ok(table) => {
                        log::info!("Loaded {} areas from {}", table.len(), p.display());
                        return Ok(table);
                    }
                    Err(e) => log::warn!("{e}; using built-in areas"),
                }
            }
        }
        Self::builtin()
    }

    pub fn from_file(path: &Path) -> Result<Self, AreaError> {
        let text = std::fs::read_to_string(path).map_err(|source| AreaError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, AreaError> {
        let raw: RawTable = toml::from_str(text)?;
        if raw.areas.is_empty() {
            return Err(AreaError::Empty);
        }

        // Pass 1: names → ids
        let mut index = HashMap::with_capacity(raw.areas.len());
        for (i, a) in raw.areas.iter().enumerate() {
            if a.width <= 0 || a.height.is_some_and(|h| h <= 0) {
                return Err(AreaError::InvalidSize {
                    name: a.name.clone(),
                    width: a.width,
                    height: a.height.unwrap_or(0),
                });
            }
            if index.insert(a.name.clone(), AreaId(i)).is_some() {
                return Err(AreaError::Duplicate(a.name.clone()));
            }
        }

        // Pass 2: resolve references
        let areas = raw
            .areas
            .into_iter()
            .map(|a| resolve_area(a, &index))
            .collect();

        Ok(AreaTable { areas, index })
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn get(&self, id: AreaId) -> &Area {
        &self.areas[id.0]
    }

    pub fn id_of(&self, name: &str) -> Option<AreaId> {
        self.index.get(name).copied()
    }

    /// First area (in table order) matching `pred`.
    pub fn find(&self, pred: impl Fn(&Area) -> bool) -> Option<AreaId> {
        self.areas.iter().position(pred).map(AreaId)
    }
}

fn resolve_area(a: RawArea, index: &HashMap<String, AreaId>) -> Area {
    let mut transitions = Vec::with_capacity(a.transitions.len());
    for (position, sign, dest_name, dest_position) in a.transitions {
        let Some(direction) = VerticalDir::from_sign(sign) else {
            log::warn!("{}: exit at {position} has invalid direction {sign}; ignored", a.name);
            continue;
        };
        let Some(&area) = index.get(&dest_name) else {
            log::warn!("{}: exit at {position} leads to unknown area {dest_name:?}; ignored", a.name);
            continue;
        };
        transitions.push(TransitionPoint {
            position,
            direction,
            destination: Destination { area, position: dest_position },
        });
    }

    let strip = match a.strip_image_width {
        Some(w) if w > 0 && a.loops && a.width % w != 0 => {
            log::warn!("{}: width {} is not a whole number of {w}-wide images; strip ignored", a.name, a.width);
            None
        }
        Some(w) if w > 0 && a.loops => Some(StripLayout { image_width: w }),
        Some(w) => {
            log::warn!("{}: strip image width {w} needs a looping area with width > 0; ignored", a.name);
            None
        }
        None => None,
    };

    let gravity = a.gravity.and_then(|g| match index.get(&g.destination) {
        Some(&destination) if a.height.is_some() => Some(GravityWell {
            x: g.x,
            y: g.y,
            strength: positive_or_default(&a.name, "strength", g.strength, default_strength()),
            capture_epsilon: positive_or_default(&a.name, "capture_epsilon", g.capture_epsilon, default_capture()),
            swallow_ms: g.swallow_ms,
            destination,
        }),
        Some(_) => {
            log::warn!("{}: gravity needs a 2D area; ignored", a.name);
            None
        }
        None => {
            log::warn!("{}: gravity destination {:?} unknown; ignored", a.name, g.destination);
            None
        }
    });

    let exit = match a.exit {
        RawExit::Range => ExitPolicy::Range,
        RawExit::Edge => ExitPolicy::Edge {
            arrow_proximity: a.arrow_proximity,
            exit_proximity: a.exit_proximity,
        },
    };

    Area {
        name: a.name,
        width: a.width,
        height: a.height,
        loops: a.loops,
        strip,
        transition_range: a.transition_range,
        canonical_offset: a.canonical_offset,
        hold_through: a.hold_through,
        exit,
        entry: a.entry,
        zoom_ms: a.zoom_ms,
        letterbox: a.letterbox,
        decorations: a.decorations,
        gravity,
        transitions,
    }
}
