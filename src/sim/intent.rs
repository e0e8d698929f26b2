/// Intents flow out of the theatre to the presentation layer; deferred
/// actions flow back in through the scheduler.
use crate::domain::area::{Destination, VerticalDir};

/// A transition marker as the presentation layer draws it.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Marker {
    pub position: i32,
    pub direction: VerticalDir,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Decoration {
    ColorEvolve,
    ArrowMove,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Intent {
    ShowArea {
        name: String,
        width: i32,
        height: Option<i32>,
        loops: bool,
        markers: Vec<Marker>,
    },
    ScrollTo { x: i32, y: i32 },
    StripOrder(Vec<usize>),
    Indicator { direction: VerticalDir, visible: bool },
    InputBlocked(bool),
    PlayTransition { duration_ms: u64 },
    Zoom { duration_ms: u64 },
    FadeOut { duration_ms: u64 },
    FadeIn { duration_ms: u64 },
    Bars(bool),
    Hud { text: String, duration_ms: u64, flashing: bool },
    GestureProgress(usize),
    CelebrationStarted { duration_ms: u64 },
    PartyStarted { duration_ms: u64 },
    CelebrationEnded,
    Swallowed { duration_ms: u64 },
    Decoration(Decoration),
    DecorationsStopped,
    ScrollSpeed(i32),
    AnimationEnabled(bool),
}

/// Work the theatre schedules for itself.
#[derive(Clone, Debug, PartialEq)]
pub enum Deferred {
    FadeOut,
    Swap(Destination),
    EndTransition,
    Party,
    PartyEnd,
    CelebrationRelease,
    Hud { text: String, duration_ms: u64 },
    SwallowComplete,
    TeleportRelease,
    Decoration(Decoration),
}
