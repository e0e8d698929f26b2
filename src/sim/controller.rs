/// Area transition controller: the timed changeover between two areas.
///
/// ```text
///   Idle ──begin──▶ Zooming ──FadeOut──▶ FadingOut ──Swap──▶ FadingIn ──End──▶ Idle
///                   (zoom_ms > 0 only)
/// ```
///
/// `begin` blocks input immediately and schedules the rest on the logical
/// clock: the fade-out after the zoom lead-in, the swap at its midpoint and the
/// end after the full duration. The swap itself touches the area table and
/// presentation, so the theatre performs it and reports back with
/// `mark_swapped`.
use crate::domain::area::{Area, Destination};

use super::clock::Scheduler;
use super::intent::{Deferred, Intent};
use super::nav::NavigationState;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TransitionPhase {
    Idle,
    Zooming,
    FadingOut,
    FadingIn,
}

#[derive(Clone, Debug)]
pub struct TransitionController {
    phase: TransitionPhase,
    duration_ms: u64,
}

impl TransitionController {
    pub fn new(duration_ms: u64) -> Self {
        TransitionController { phase: TransitionPhase::Idle, duration_ms }
    }

    pub fn phase(&self) -> TransitionPhase {
        self.phase
    }

    pub fn in_flight(&self) -> bool {
        self.phase != TransitionPhase::Idle
    }

    fn half(&self) -> u64 {
        self.duration_ms / 2
    }

    /// Start a transition to `dest`. Ignored (returns false) while another
    /// transition is in flight or input is already blocked by one.
    pub fn begin(
        &mut self,
        nav: &mut NavigationState,
        dest: Destination,
        dest_area: &Area,
        sched: &mut Scheduler<Deferred>,
        out: &mut Vec<Intent>,
    ) -> bool {
        if self.in_flight() || nav.transition_block {
            log::debug!("transition to {} ignored: one is already running", dest_area.name);
            return false;
        }

        nav.transition_block = true;
        out.push(Intent::InputBlocked(true));

        let zoom = dest_area.zoom_ms;
        let half = self.half();
        out.push(Intent::PlayTransition { duration_ms: zoom + self.duration_ms });

        if zoom > 0 {
            self.phase = TransitionPhase::Zooming;
            out.push(Intent::Zoom { duration_ms: zoom });
            sched.schedule_in(zoom, Deferred::FadeOut);
        } else {
            self.start_fade_out(out);
        }
        sched.schedule_in(zoom + half, Deferred::Swap(dest));
        sched.schedule_in(zoom + self.duration_ms, Deferred::EndTransition);

        log::info!("transition to {} @ {} started", dest_area.name, dest.position);
        true
    }

    pub fn start_fade_out(&mut self, out: &mut Vec<Intent>) {
        self.phase = TransitionPhase::FadingOut;
        out.push(Intent::FadeOut { duration_ms: self.half() });
    }

    /// The new area is in place; fade it in.
    pub fn mark_swapped(&mut self, out: &mut Vec<Intent>) {
        self.phase = TransitionPhase::FadingIn;
        out.push(Intent::FadeIn { duration_ms: self.duration_ms - self.half() });
    }

    /// Lift the transition block. Input stays blocked if a party is running.
    pub fn finish(&mut self, nav: &mut NavigationState, out: &mut Vec<Intent>) {
        self.phase = TransitionPhase::Idle;
        nav.transition_block = false;
        out.push(Intent::InputBlocked(nav.inputs_blocked()));
    }
}
