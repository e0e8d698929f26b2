/// Stage: what the projector would currently show, rebuilt from intents.
///
/// The theatre never draws. It queues intents; the main loop applies them here
/// with the wall-clock millisecond they arrived, and the renderer reads the
/// result each frame. Fades, HUD lifetimes and celebration phases are all
/// evaluated against that same clock.
use crate::domain::area::VerticalDir;
use crate::domain::scroll::Viewport;
use crate::sim::intent::{Decoration, Intent, Marker};

/// Milliseconds per on/off half of a flashing HUD message.
const HUD_FLASH_MS: u64 = 450;

#[derive(Clone, Debug, PartialEq)]
pub struct AreaView {
    pub name: String,
    pub width: i32,
    pub height: Option<i32>,
    pub loops: bool,
    pub markers: Vec<Marker>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Fade {
    Visible,
    Out { start: u64, duration: u64 },
    In { start: u64, duration: u64 },
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct HudLine {
    text: String,
    shown: u64,
    until: u64,
    flashing: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Celebration {
    None,
    Matrix { start: u64, until: u64 },
    Party { start: u64, until: u64 },
}

pub struct Stage {
    pub viewport: Viewport,
    pub area: Option<AreaView>,
    pub x: i32,
    pub y: i32,
    pub strip: Vec<usize>,
    pub indicator_up: bool,
    pub indicator_down: bool,
    pub input_blocked: bool,
    pub bars: bool,
    pub gesture: usize,
    pub scroll_speed: i32,
    pub animation: bool,
    pub celebration: Celebration,
    /// Colour-cycle hue in degrees; advanced by the disco decoration.
    pub disco_hue: Option<u16>,
    pub arrow_shift: i32,
    fade: Fade,
    zoom: Option<(u64, u64)>,
    swallowed: Option<(u64, u64)>,
    hud: Option<HudLine>,
}

impl Stage {
    pub fn new(viewport: Viewport) -> Self {
        Stage {
            viewport,
            area: None,
            x: 0,
            y: 0,
            strip: vec![],
            indicator_up: false,
            indicator_down: false,
            input_blocked: false,
            bars: true,
            gesture: 0,
            scroll_speed: 0,
            animation: true,
            celebration: Celebration::None,
            disco_hue: None,
            arrow_shift: 0,
            fade: Fade::Visible,
            zoom: None,
            swallowed: None,
            hud: None,
        }
    }

    pub fn apply(&mut self, now: u64, intent: &Intent) {
        match intent {
            Intent::ShowArea { name, width, height, loops, markers } => {
                self.area = Some(AreaView {
                    name: name.clone(),
                    width: *width,
                    height: *height,
                    loops: *loops,
                    markers: markers.clone(),
                });
                self.strip.clear();
                self.zoom = None;
                self.swallowed = None;
            }
            Intent::ScrollTo { x, y } => {
                self.x = *x;
                self.y = *y;
            }
            Intent::StripOrder(order) => self.strip = order.clone(),
            Intent::Indicator { direction, visible } => match direction {
                VerticalDir::Up => self.indicator_up = *visible,
                VerticalDir::Down => self.indicator_down = *visible,
            },
            Intent::InputBlocked(b) => self.input_blocked = *b,
            Intent::PlayTransition { .. } => {}
            Intent::Zoom { duration_ms } => self.zoom = Some((now, *duration_ms)),
            Intent::FadeOut { duration_ms } => {
                self.fade = Fade::Out { start: now, duration: *duration_ms };
            }
            Intent::FadeIn { duration_ms } => {
                self.fade = Fade::In { start: now, duration: *duration_ms };
            }
            Intent::Bars(visible) => self.bars = *visible,
            Intent::Hud { text, duration_ms, flashing } => {
                self.hud = Some(HudLine {
                    text: text.clone(),
                    shown: now,
                    until: now + duration_ms,
                    flashing: *flashing,
                });
            }
            Intent::GestureProgress(n) => self.gesture = *n,
            Intent::CelebrationStarted { duration_ms } => {
                self.celebration = Celebration::Matrix { start: now, until: now + duration_ms };
            }
            Intent::PartyStarted { duration_ms } => {
                self.celebration = Celebration::Party { start: now, until: now + duration_ms };
            }
            Intent::CelebrationEnded => self.celebration = Celebration::None,
            Intent::Swallowed { duration_ms } => self.swallowed = Some((now, *duration_ms)),
            Intent::Decoration(Decoration::ColorEvolve) => {
                self.disco_hue = Some(self.disco_hue.map_or(180, |h| (h + 67) % 360));
            }
            Intent::Decoration(Decoration::ArrowMove) => self.arrow_shift = (self.arrow_shift + 1) % 3,
            Intent::DecorationsStopped => {
                self.disco_hue = None;
                self.arrow_shift = 0;
            }
            Intent::ScrollSpeed(s) => self.scroll_speed = *s,
            Intent::AnimationEnabled(b) => self.animation = *b,
        }
    }

    /// 1.0 fully visible, 0.0 black.
    pub fn brightness(&self, now: u64) -> f32 {
        match self.fade {
            Fade::Visible => 1.0,
            Fade::Out { start, duration } => 1.0 - progress(now, start, duration),
            Fade::In { start, duration } => progress(now, start, duration),
        }
    }

    /// Zoom factor progress 0..1 while a zoom lead-in or swallow runs.
    pub fn zoom_progress(&self, now: u64) -> Option<f32> {
        self.swallowed
            .or(self.zoom)
            .map(|(start, duration)| progress(now, start, duration))
            .filter(|p| *p < 1.0)
    }

    pub fn hud_text(&self, now: u64) -> Option<&str> {
        let hud = self.hud.as_ref()?;
        if now >= hud.until {
            return None;
        }
        if hud.flashing && ((now - hud.shown) / HUD_FLASH_MS) % 2 == 1 {
            return None;
        }
        Some(&hud.text)
    }

    /// Current celebration phase, taking expiry into account.
    pub fn celebration_at(&self, now: u64) -> Celebration {
        match self.celebration {
            Celebration::Matrix { until, .. } | Celebration::Party { until, .. } if now >= until => {
                Celebration::None
            }
            other => other,
        }
    }
}

fn progress(now: u64, start: u64, duration: u64) -> f32 {
    if duration == 0 {
        return 1.0;
    }
    (now.saturating_sub(start) as f32 / duration as f32).min(1.0)
}
