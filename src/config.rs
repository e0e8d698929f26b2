/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.
///
/// The logger is not installed until the log file path is known, so problems
/// found while loading are collected in `warnings` for `main` to report.

use serde::Deserialize;
use std::path::PathBuf;

use crate::domain::input::{
    default_aliases, default_axes, AxisBinding, ButtonAlias, LogicalInput, NormalizerConfig,
};
use crate::domain::scroll::Viewport;

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub timing: TimingConfig,
    pub viewport: Viewport,
    pub initial_speed: i32,
    pub input: NormalizerConfig,
    pub areas_file: PathBuf,
    pub log_file: PathBuf,
    pub start_area: String,
    pub start_position: i32,
    pub warnings: Vec<String>,
}

/// All durations in milliseconds.
#[derive(Clone, Copy, Debug)]
pub struct TimingConfig {
    pub tick_rate_ms: u64,
    pub transition_ms: u64,
    pub matrix_ms: u64,
    pub party_ms: u64,
    pub speed_cooldown_ms: u64,
    pub hud_ms: u64,
    pub disco_evolve_ms: u64,
    pub arrow_move_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        let t = TomlTiming::default();
        TimingConfig {
            tick_rate_ms: t.tick_rate_ms,
            transition_ms: t.transition_ms,
            matrix_ms: t.matrix_ms,
            party_ms: t.party_ms,
            speed_cooldown_ms: t.speed_cooldown_ms,
            hud_ms: t.hud_ms,
            disco_evolve_ms: t.disco_evolve_ms,
            arrow_move_ms: t.arrow_move_ms,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        build(TomlConfig::default(), &[], vec![])
    }
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    timing: TomlTiming,
    #[serde(default)]
    viewport: TomlViewport,
    #[serde(default)]
    scroll: TomlScroll,
    #[serde(default)]
    input: TomlInput,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlTiming {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
    #[serde(default = "default_transition")]
    transition_ms: u64,
    #[serde(default = "default_matrix")]
    matrix_ms: u64,
    #[serde(default = "default_party")]
    party_ms: u64,
    #[serde(default = "default_speed_cooldown")]
    speed_cooldown_ms: u64,
    #[serde(default = "default_hud")]
    hud_ms: u64,
    #[serde(default = "default_disco_evolve")]
    disco_evolve_ms: u64,
    #[serde(default = "default_arrow_move")]
    arrow_move_ms: u64,
}

#[derive(Deserialize, Debug)]
struct TomlViewport {
    #[serde(default = "default_width")]
    width: i32,
    #[serde(default = "default_height")]
    height: i32,
}

#[derive(Deserialize, Debug)]
struct TomlScroll {
    #[serde(default = "default_initial_speed")]
    initial_speed: i32,
}

#[derive(Deserialize, Debug)]
struct TomlInput {
    #[serde(default = "default_reverse")]
    reverse_left_right: bool,
    #[serde(default = "default_axis_threshold")]
    axis_threshold: f32,
}

#[derive(Deserialize, Debug, Clone)]
struct TomlAxis {
    axis: usize,
    negative: String,
    positive: String,
}

#[derive(Deserialize, Debug, Clone)]
struct TomlAlias {
    button: usize,
    input: String,
}

#[derive(Deserialize, Debug, Default)]
struct TomlGamepad {
    /// `None` keeps the controller wiring defaults.
    #[serde(default)]
    axes: Option<Vec<TomlAxis>>,
    #[serde(default)]
    aliases: Option<Vec<TomlAlias>>,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_areas_file")]
    areas_file: String,
    #[serde(default = "default_log_file")]
    log_file: String,
    #[serde(default = "default_start_area")]
    start_area: String,
    #[serde(default = "default_start_position")]
    start_position: i32,
}

// ── Defaults ──

fn default_tick_rate() -> u64 { 16 }
fn default_transition() -> u64 { 1000 }
fn default_matrix() -> u64 { 12000 }
fn default_party() -> u64 { 12000 }
fn default_speed_cooldown() -> u64 { 150 }
fn default_hud() -> u64 { 500 }
fn default_disco_evolve() -> u64 { 6000 }
fn default_arrow_move() -> u64 { 30000 }

fn default_width() -> i32 { 1920 }
fn default_height() -> i32 { 760 }
fn default_initial_speed() -> i32 { 2 }
fn default_reverse() -> bool { true }  // back-projected screen
fn default_axis_threshold() -> f32 { 0.5 }

fn default_areas_file() -> String { "areas.toml".into() }
fn default_log_file() -> String { "shadowtheatre.log".into() }
fn default_start_area() -> String { "main".into() }
fn default_start_position() -> i32 { 1000 }

impl Default for TomlTiming {
    fn default() -> Self {
        TomlTiming {
            tick_rate_ms: default_tick_rate(),
            transition_ms: default_transition(),
            matrix_ms: default_matrix(),
            party_ms: default_party(),
            speed_cooldown_ms: default_speed_cooldown(),
            hud_ms: default_hud(),
            disco_evolve_ms: default_disco_evolve(),
            arrow_move_ms: default_arrow_move(),
        }
    }
}

impl Default for TomlViewport {
    fn default() -> Self {
        TomlViewport { width: default_width(), height: default_height() }
    }
}

impl Default for TomlScroll {
    fn default() -> Self {
        TomlScroll { initial_speed: default_initial_speed() }
    }
}

impl Default for TomlInput {
    fn default() -> Self {
        TomlInput {
            reverse_left_right: default_reverse(),
            axis_threshold: default_axis_threshold(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            areas_file: default_areas_file(),
            log_file: default_log_file(),
            start_area: default_start_area(),
            start_position: default_start_position(),
        }
    }
}

// ── Loading ──

impl AppConfig {
    /// Load config from `config.toml`.
    /// Search order: exe directory, CWD, then the XDG and system data dirs.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let mut warnings = vec![];
        let toml_cfg = load_toml(&search_dirs, &mut warnings);
        build(toml_cfg, &search_dirs, warnings)
    }

    #[cfg(test)]
    pub fn from_toml_str(text: &str) -> Self {
        let mut warnings = vec![];
        let cfg = match toml::from_str::<TomlConfig>(text) {
            Ok(cfg) => cfg,
            Err(e) => {
                warnings.push(format!("config.toml parse error: {e}; using default settings"));
                TomlConfig::default()
            }
        };
        build(cfg, &[], warnings)
    }
}

fn build(toml_cfg: TomlConfig, search_dirs: &[PathBuf], mut warnings: Vec<String>) -> AppConfig {
    let t = toml_cfg.timing;

    let mut viewport = Viewport { width: toml_cfg.viewport.width, height: toml_cfg.viewport.height };
    if viewport.width <= 0 || viewport.height <= 0 {
        warnings.push(format!(
            "viewport {}x{} is invalid; using {}x{}",
            viewport.width, viewport.height, default_width(), default_height()
        ));
        viewport = Viewport { width: default_width(), height: default_height() };
    }

    let axes = match toml_cfg.gamepad.axes {
        Some(list) => list
            .into_iter()
            .filter_map(|a| {
                match (LogicalInput::from_name(&a.negative), LogicalInput::from_name(&a.positive)) {
                    (Some(negative), Some(positive)) => Some(AxisBinding { axis: a.axis, negative, positive }),
                    _ => {
                        warnings.push(format!(
                            "gamepad axis {}: unknown input {:?}/{:?}; ignored",
                            a.axis, a.negative, a.positive
                        ));
                        None
                    }
                }
            })
            .collect(),
        None => default_axes(),
    };

    let aliases = match toml_cfg.gamepad.aliases {
        Some(list) => list
            .into_iter()
            .filter_map(|a| match LogicalInput::from_name(&a.input) {
                Some(input) => Some(ButtonAlias { button: a.button, input }),
                None => {
                    warnings.push(format!("gamepad button {}: unknown input {:?}; ignored", a.button, a.input));
                    None
                }
            })
            .collect(),
        None => default_aliases(),
    };

    AppConfig {
        timing: TimingConfig {
            tick_rate_ms: t.tick_rate_ms.max(1),
            transition_ms: t.transition_ms,
            matrix_ms: t.matrix_ms,
            party_ms: t.party_ms,
            speed_cooldown_ms: t.speed_cooldown_ms,
            hud_ms: t.hud_ms,
            disco_evolve_ms: t.disco_evolve_ms.max(1),
            arrow_move_ms: t.arrow_move_ms.max(1),
        },
        viewport,
        initial_speed: toml_cfg.scroll.initial_speed,
        input: NormalizerConfig {
            axes,
            aliases,
            threshold: toml_cfg.input.axis_threshold,
            reverse_left_right: toml_cfg.input.reverse_left_right,
        },
        areas_file: resolve_file(&toml_cfg.general.areas_file, search_dirs),
        log_file: PathBuf::from(toml_cfg.general.log_file),
        start_area: toml_cfg.general.start_area,
        start_position: toml_cfg.general.start_position,
        warnings,
    }
}

/// Absolute paths are kept; relative ones are looked up in the search dirs.
fn resolve_file(name: &str, search_dirs: &[PathBuf]) -> PathBuf {
    let path = PathBuf::from(name);
    if path.is_absolute() {
        return path;
    }
    search_dirs
        .iter()
        .map(|d| d.join(name))
        .find(|p| p.is_file())
        .unwrap_or(path)
}

/// Candidate directories to search: exe dir + CWD + system paths (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // 1. Directory of the running executable
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    // 3. XDG data home
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/shadowtheatre");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    // 4. System data directory
    let sys = PathBuf::from("/usr/share/shadowtheatre");
    if sys.is_dir() && !dirs.iter().any(|d| d == &sys) {
        dirs.push(sys);
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// First readable config.toml in the search dirs wins.
fn load_toml(search_dirs: &[PathBuf], warnings: &mut Vec<String>) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                    Ok(cfg) => return cfg,
                    Err(e) => {
                        warnings.push(format!("{}: parse error: {e}; using default settings", path.display()));
                        return TomlConfig::default();
                    }
                },
                Err(e) => {
                    warnings.push(format!("could not read {}: {e}", path.display()));
                }
            }
        }
    }
    TomlConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let cfg = AppConfig::from_toml_str("");
        assert_eq!(cfg.timing.transition_ms, 1000);
        assert_eq!(cfg.timing.party_ms, 12000);
        assert_eq!(cfg.viewport, Viewport { width: 1920, height: 760 });
        assert_eq!(cfg.initial_speed, 2);
        assert!(cfg.input.reverse_left_right);
        assert_eq!(cfg.input.axes.len(), 2);
        assert_eq!(cfg.input.aliases.len(), 8);
        assert_eq!(cfg.start_area, "main");
        assert!(cfg.warnings.is_empty());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = AppConfig::from_toml_str(
            "[timing]\ntransition_ms = 400\n[input]\nreverse_left_right = false\n",
        );
        assert_eq!(cfg.timing.transition_ms, 400);
        assert_eq!(cfg.timing.matrix_ms, 12000);
        assert!(!cfg.input.reverse_left_right);
        assert_eq!(cfg.input.threshold, 0.5);
    }

    #[test]
    fn gamepad_tables_override_wiring() {
        let cfg = AppConfig::from_toml_str(
            r#"
            [gamepad]
            axes = [{ axis = 1, negative = "left", positive = "right" }]
            aliases = [{ button = 3, input = "up" }, { button = 4, input = "sideways" }]
            "#,
        );
        assert_eq!(cfg.input.axes.len(), 1);
        assert_eq!(cfg.input.axes[0].negative, LogicalInput::Left);
        assert_eq!(cfg.input.aliases.len(), 1);
        assert_eq!(cfg.warnings.len(), 1);
    }

    #[test]
    fn parse_error_falls_back() {
        let cfg = AppConfig::from_toml_str("[timing\n");
        assert_eq!(cfg.timing.transition_ms, 1000);
        assert_eq!(cfg.warnings.len(), 1);
    }

    #[test]
    fn invalid_viewport_is_replaced() {
        let cfg = AppConfig::from_toml_str("[viewport]\nwidth = 0\n");
        assert_eq!(cfg.viewport.width, 1920);
        assert_eq!(cfg.warnings.len(), 1);
    }
}
