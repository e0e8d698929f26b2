/// Theatre: the single owner of navigation state and the one tick entry point.
///
/// ## Per-tick order (`process`)
///   1. Gravity well pull (skipped while a transition runs)
///   2. Stop here if input is blocked
///   3. Gesture recognizer observes the input
///   4. Horizontal movement, then exit permissions
///   5. Vertical: take a permitted exit, else move freely in 2D areas
///
/// Timed work (fades, swaps, celebration phases, decorative timers) lives on
/// the logical clock and is run by `advance`. Everything the presentation
/// layer needs is queued as an `Intent` and collected with `drain_intents`.
///
/// ## Processing gate
///
/// While a gravity well swallows the audience, the gate is held and every
/// `process` call is dropped until the teleport starts.
use rand::Rng;

use crate::config::{AppConfig, TimingConfig};
use crate::domain::area::{Area, AreaError, AreaId, AreaTable, Destination, Entry, VerticalDir};
use crate::domain::detector;
use crate::domain::gesture::{GestureRecognizer, GestureStep};
use crate::domain::input::{GamepadReport, InputNormalizer, InputState};
use crate::domain::scroll::{self, GravityOutcome, Viewport};

use super::clock::{Scheduler, TimerId};
use super::controller::{TransitionController, TransitionPhase};
use super::intent::{Decoration, Deferred, Intent, Marker};
use super::nav::NavigationState;

/// Operator commands that bypass the logical input vector.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Command {
    ToggleReverse,
    SpeedDown,
    SpeedUp,
    Celebrate,
    ToggleGravity,
    ToggleAnimation,
    /// Teleport from a gravity area, or jump to the first one.
    DebugGravityJump,
    /// Jump to the first 2D area entered from the top.
    DebugTopEntryJump,
}

enum Motivation {
    One(&'static str),
    Two(&'static str, &'static str),
}

const MOTIVATIONAL_MESSAGES: &[Motivation] = &[
    Motivation::One("REMAIN CALM"),
    Motivation::Two("PLEASE RELAX WHILE WE PROBE YOUR BRAIN...", "ERROR: BRAIN NOT FOUND"),
    Motivation::One("DON'T PANIC!!!"),
    Motivation::Two("NORMALITY WILL RESUME SHORTLY...", "...MAYBE"),
    Motivation::One("EVERYTHING IS FINE."),
    Motivation::Two("IT'S SUPPOSED TO DO THAT...", "...I THINK..."),
    Motivation::One("OH NO, WHAT HAVE YOU DONE?!?!"),
    Motivation::One("I FEEL STRANGE..."),
    Motivation::One("FNORD"),
];

/// Extra delay after the swap before another teleport may start.
const TELEPORT_RELEASE_SLACK_MS: u64 = 100;

pub struct Theatre {
    areas: AreaTable,
    viewport: Viewport,
    timing: TimingConfig,
    normalizer: InputNormalizer,
    nav: NavigationState,
    controller: TransitionController,
    konami: GestureRecognizer,
    sched: Scheduler<Deferred>,
    intents: Vec<Intent>,

    // ── Guards ──
    gate_held: bool,
    celebrating: bool,
    teleporting: bool,

    next_message: usize,
    last_speed_change: Option<u64>,
    decoration_timers: Vec<(Decoration, TimerId)>,
    last_input: InputState,
    forced_pass: bool,
}

impl Theatre {
    pub fn new(areas: AreaTable, config: &AppConfig) -> Result<Self, AreaError> {
        let start = areas
            .id_of(&config.start_area)
            .ok_or_else(|| AreaError::UnknownArea(config.start_area.clone()))?;
        let nav = NavigationState::new(
            start,
            areas.get(start),
            config.viewport,
            config.start_position,
            config.initial_speed,
        );
        Ok(Theatre {
            viewport: config.viewport,
            timing: config.timing,
            normalizer: InputNormalizer::new(config.input.clone()),
            nav,
            controller: TransitionController::new(config.timing.transition_ms),
            konami: GestureRecognizer::konami(),
            sched: Scheduler::new(),
            intents: vec![],
            gate_held: false,
            celebrating: false,
            teleporting: false,
            next_message: 0,
            last_speed_change: None,
            decoration_timers: vec![],
            last_input: InputState::new(),
            forced_pass: false,
            areas,
        })
    }

    // ── Accessors ──

    pub fn nav(&self) -> &NavigationState {
        &self.nav
    }

    pub fn current_area(&self) -> &Area {
        self.areas.get(self.nav.current_area)
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn phase(&self) -> TransitionPhase {
        self.controller.phase()
    }

    #[cfg(test)]
    pub fn konami_position(&self) -> usize {
        self.konami.position()
    }

    #[cfg(test)]
    pub fn is_celebrating(&self) -> bool {
        self.celebrating
    }

    pub fn drain_intents(&mut self) -> Vec<Intent> {
        std::mem::take(&mut self.intents)
    }

    // ── Entry points ──

    /// Show the start area without a fade.
    pub fn start(&mut self) {
        let dest = Destination { area: self.nav.current_area, position: self.nav.position.x };
        self.show_area(dest);
        self.intents.push(Intent::ScrollSpeed(self.nav.scroll_speed));
        self.intents.push(Intent::InputBlocked(self.nav.inputs_blocked()));
    }

    /// One gamepad poll: normalize, run due timers, process.
    pub fn poll(&mut self, now: u64, pad: Option<&GamepadReport>, keyboard: &InputState) {
        let input = self.normalizer.normalize(pad, keyboard);
        self.tick(now, input);
    }

    /// When this tick ends a transition, the forced pass in `advance` is
    /// this tick's processing pass.
    pub fn tick(&mut self, now: u64, input: InputState) {
        self.last_input = input;
        self.forced_pass = false;
        self.advance(now);
        if !self.forced_pass {
            self.process(input, false);
        }
    }

    /// Run every deferred action due at or before `now`, in due order.
    pub fn advance(&mut self, now: u64) {
        while let Some(action) = self.sched.pop_due(now) {
            self.run_deferred(action);
        }
        self.sched.settle(now);
    }

    pub fn command(&mut self, now: u64, cmd: Command) {
        self.advance(now);
        match cmd {
            Command::ToggleReverse => {
                let reversed = self.normalizer.toggle_reverse();
                log::info!("left/right reversed: {reversed}");
                let text = if reversed { "L/R reversed" } else { "L/R normal" };
                self.hud(text, self.timing.hud_ms, false);
            }
            Command::SpeedDown => self.change_speed(now, -1),
            Command::SpeedUp => self.change_speed(now, 1),
            Command::Celebrate => {
                self.celebrate();
            }
            Command::ToggleGravity => {
                if self.current_area().gravity.is_some() {
                    self.nav.gravity_enabled = !self.nav.gravity_enabled;
                    log::info!("gravity {}", if self.nav.gravity_enabled { "on" } else { "off" });
                    let text = if self.nav.gravity_enabled { "Gravity on" } else { "Gravity off" };
                    self.hud(text, self.timing.hud_ms, false);
                }
            }
            Command::ToggleAnimation => {
                self.nav.animation_enabled = !self.nav.animation_enabled;
                self.intents.push(Intent::AnimationEnabled(self.nav.animation_enabled));
            }
            Command::DebugGravityJump => match self.current_area().gravity.map(|w| w.destination) {
                Some(target) => {
                    self.teleport(target);
                }
                None => {
                    if let Some(id) = self.areas.find(|a| a.gravity.is_some()) {
                        self.jump_to(id);
                    }
                }
            },
            Command::DebugTopEntryJump => {
                if let Some(id) = self.areas.find(|a| a.is_2d() && a.entry == Entry::Top) {
                    self.jump_to(id);
                }
            }
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Input processing
    // ══════════════════════════════════════════════════════════════

    /// `force` runs movement and exit checks even with nothing held.
    pub fn process(&mut self, input: InputState, force: bool) {
        if self.gate_held {
            return;
        }
        self.last_input = input;

        if self.nav.gravity_enabled && !self.nav.transition_block && self.pull_gravity() {
            return;
        }

        if self.nav.inputs_blocked() {
            return;
        }

        let was_idle = self.nav.was_idle;
        self.observe_gesture(&input, was_idle);

        if input.any_on() || force {
            let area_id = self.nav.current_area;
            let speed = self.nav.scroll_speed;

            let dx = scroll::horizontal_delta(&input, speed);
            let first_image = self.nav.strip.as_ref().and_then(|s| s.order().next());
            let area = self.areas.get(area_id);
            if scroll::move_horizontal(area, self.viewport, &mut self.nav.position, self.nav.strip.as_mut(), dx) {
                let rotated = self.nav.strip.as_ref().and_then(|s| s.order().next()) != first_image;
                self.emit_scroll(rotated);
            }
            self.refresh_permissions(false);

            if let Some(dest) = self.requested_exit(&input, was_idle) {
                self.transition(dest);
            } else {
                let dy = scroll::vertical_delta(&input, speed);
                let area = self.areas.get(area_id);
                if scroll::move_vertical(area, self.viewport, &mut self.nav.position, dy) {
                    self.emit_scroll(false);
                    self.refresh_permissions(false);
                }
            }
        }

        self.nav.was_idle = !input.any_on();
    }

    /// A permitted exit whose direction is held. Up and down together cancel.
    fn requested_exit(&self, input: &InputState, was_idle: bool) -> Option<Destination> {
        let edge_ok = was_idle || self.current_area().hold_through;
        let mut direction = 0;
        let mut dest = None;
        for (dir, sign) in [(VerticalDir::Down, -1), (VerticalDir::Up, 1)] {
            if let Some(d) = self.nav.permitted.get(dir) {
                if input.is_on(dir.input()) && edge_ok {
                    dest = Some(d);
                    direction += sign;
                }
            }
        }
        if direction == 0 {
            None
        } else {
            dest
        }
    }

    fn observe_gesture(&mut self, input: &InputState, was_idle: bool) {
        match self.konami.observe(input, was_idle) {
            GestureStep::Waiting => {}
            GestureStep::Advanced(n) => {
                log::debug!("konami position {n}");
                self.intents.push(Intent::GestureProgress(n));
            }
            GestureStep::Reset => {
                log::debug!("konami reset after wrong input");
                self.intents.push(Intent::GestureProgress(0));
            }
            GestureStep::Completed => {
                log::info!("konami code entered");
                self.intents.push(Intent::GestureProgress(0));
                self.celebrate();
            }
        }
    }

    /// Returns true if the well captured the audience.
    fn pull_gravity(&mut self) -> bool {
        let Some(well) = self.current_area().gravity else {
            return false;
        };
        let outcome = scroll::apply_gravity(&well, &mut self.nav.position, &mut self.nav.gravity_carry);
        self.keep_in_bounds();
        match outcome {
            GravityOutcome::Accumulating => false,
            GravityOutcome::Moved => {
                self.emit_scroll(false);
                self.refresh_permissions(false);
                false
            }
            GravityOutcome::Captured => {
                self.emit_scroll(false);
                self.gate_held = true;
                log::info!("swallowed by the well in {}", self.current_area().name);
                self.intents.push(Intent::Swallowed { duration_ms: well.swallow_ms });
                self.sched.schedule_in(well.swallow_ms, Deferred::SwallowComplete);
                true
            }
        }
    }

    /// A well placed near the border must not pull the view past it.
    fn keep_in_bounds(&mut self) {
        let area = self.areas.get(self.nav.current_area);
        let pos = &mut self.nav.position;
        let x = scroll::bound_x(area, self.viewport, pos.x);
        let y = scroll::bound_y(area, self.viewport, pos.y);
        if x != pos.x {
            pos.x = x;
            self.nav.gravity_carry.0 = 0.0;
        }
        if y != pos.y {
            pos.y = y;
            self.nav.gravity_carry.1 = 0.0;
        }
    }

    fn refresh_permissions(&mut self, announce: bool) {
        let area = self.areas.get(self.nav.current_area);
        let p = detector::detect(area, self.viewport, self.nav.position, self.nav.strip.as_ref());
        for dir in [VerticalDir::Up, VerticalDir::Down] {
            if announce || p.indicator(dir) != self.nav.permitted.indicator(dir) {
                self.intents.push(Intent::Indicator { direction: dir, visible: p.indicator(dir) });
            }
        }
        self.nav.permitted = p;
    }

    fn emit_scroll(&mut self, strip_changed: bool) {
        self.intents.push(Intent::ScrollTo { x: self.nav.position.x, y: self.nav.position.y });
        if strip_changed {
            if let Some(strip) = &self.nav.strip {
                self.intents.push(Intent::StripOrder(strip.order().collect()));
            }
        }
    }

    fn hud(&mut self, text: &str, duration_ms: u64, flashing: bool) {
        self.intents.push(Intent::Hud { text: text.to_string(), duration_ms, flashing });
    }

    fn change_speed(&mut self, now: u64, delta: i32) {
        if let Some(last) = self.last_speed_change {
            if now.saturating_sub(last) < self.timing.speed_cooldown_ms {
                return;
            }
        }
        self.last_speed_change = Some(now);
        let speed = self.nav.adjust_speed(delta);
        self.intents.push(Intent::ScrollSpeed(speed));
        self.hud(&format!("Scroll speed: {speed}"), self.timing.hud_ms, false);
    }

    // ══════════════════════════════════════════════════════════════
    // Transitions
    // ══════════════════════════════════════════════════════════════

    fn transition(&mut self, dest: Destination) -> bool {
        let area = self.areas.get(dest.area);
        self.controller.begin(&mut self.nav, dest, area, &mut self.sched, &mut self.intents)
    }

    /// Debug jump to an area's first exit position.
    fn jump_to(&mut self, id: AreaId) {
        let area = self.areas.get(id);
        let position = area.transitions.first().map_or(area.width / 2, |t| t.position);
        self.transition(Destination { area: id, position });
    }

    fn teleport(&mut self, target: AreaId) -> bool {
        if self.teleporting {
            log::debug!("teleport already running");
            return false;
        }
        self.teleporting = true;
        let area = self.areas.get(target);
        let lo = self.viewport.half_width();
        let hi = area.width - lo;
        let x = if hi > lo { rand::thread_rng().gen_range(lo..hi) } else { area.width / 2 };
        log::info!("teleporting to {} @ {x}", area.name);
        self.transition(Destination { area: target, position: x });
        self.sched.schedule_in(
            self.timing.transition_ms / 2 + TELEPORT_RELEASE_SLACK_MS,
            Deferred::TeleportRelease,
        );
        true
    }

    /// Place the audience in `dest` and announce the new area.
    fn show_area(&mut self, dest: Destination) {
        self.stop_decorations();

        let area = self.areas.get(dest.area);
        self.nav.enter(dest.area, area, self.viewport, dest.position);
        self.intents.push(Intent::ShowArea {
            name: area.name.clone(),
            width: area.width,
            height: area.height,
            loops: area.loops,
            markers: area
                .transitions
                .iter()
                .map(|t| Marker { position: t.position, direction: t.direction })
                .collect(),
        });
        self.intents.push(Intent::Bars(!area.letterbox));
        let decorated = area.decorations;
        log::info!("now in {} @ {}", area.name, self.nav.position.x);

        self.emit_scroll(true);
        self.refresh_permissions(true);
        if decorated {
            self.start_decorations();
        }
    }

    fn start_decorations(&mut self) {
        for (kind, period) in [
            (Decoration::ColorEvolve, self.timing.disco_evolve_ms),
            (Decoration::ArrowMove, self.timing.arrow_move_ms),
        ] {
            self.intents.push(Intent::Decoration(kind));
            let id = self.sched.schedule_in(period, Deferred::Decoration(kind));
            self.decoration_timers.push((kind, id));
        }
    }

    fn stop_decorations(&mut self) {
        if self.decoration_timers.is_empty() {
            return;
        }
        for (_, id) in self.decoration_timers.drain(..) {
            self.sched.cancel(id);
        }
        self.intents.push(Intent::DecorationsStopped);
    }

    // ══════════════════════════════════════════════════════════════
    // Celebration
    // ══════════════════════════════════════════════════════════════

    fn celebrate(&mut self) -> bool {
        if self.celebrating {
            log::info!("celebration already running");
            return false;
        }
        self.celebrating = true;
        log::info!("celebration started");
        self.intents.push(Intent::CelebrationStarted { duration_ms: self.timing.matrix_ms });
        self.sched.schedule_in(self.timing.matrix_ms, Deferred::Party);
        self.sched.schedule_in(self.timing.matrix_ms + self.timing.party_ms, Deferred::CelebrationRelease);
        true
    }

    fn party(&mut self) {
        self.nav.party_block = true;
        self.intents.push(Intent::InputBlocked(true));
        self.intents.push(Intent::PartyStarted { duration_ms: self.timing.party_ms });
        self.sched.schedule_in(self.timing.party_ms, Deferred::PartyEnd);

        match MOTIVATIONAL_MESSAGES[self.next_message] {
            Motivation::One(text) => {
                self.sched.schedule_in(3000, Deferred::Hud { text: text.into(), duration_ms: 6000 });
            }
            Motivation::Two(first, second) => {
                self.sched.schedule_in(500, Deferred::Hud { text: first.into(), duration_ms: 5000 });
                self.sched.schedule_in(6500, Deferred::Hud { text: second.into(), duration_ms: 4000 });
            }
        }
        self.next_message = (self.next_message + 1) % MOTIVATIONAL_MESSAGES.len();
    }

    // ══════════════════════════════════════════════════════════════
    // Deferred actions
    // ══════════════════════════════════════════════════════════════

    fn run_deferred(&mut self, action: Deferred) {
        match action {
            Deferred::FadeOut => self.controller.start_fade_out(&mut self.intents),
            Deferred::Swap(dest) => {
                self.show_area(dest);
                self.controller.mark_swapped(&mut self.intents);
            }
            Deferred::EndTransition => {
                self.controller.finish(&mut self.nav, &mut self.intents);
                // a key still held continues straight away
                let input = self.last_input;
                self.forced_pass = true;
                self.process(input, true);
            }
            Deferred::Party => self.party(),
            Deferred::PartyEnd => {
                self.nav.party_block = false;
                self.intents.push(Intent::InputBlocked(self.nav.inputs_blocked()));
            }
            Deferred::CelebrationRelease => {
                self.celebrating = false;
                log::info!("celebration finished");
                self.intents.push(Intent::CelebrationEnded);
            }
            Deferred::Hud { text, duration_ms } => self.hud(&text, duration_ms, true),
            Deferred::SwallowComplete => {
                let target = self.current_area().gravity.map(|w| w.destination);
                if let Some(target) = target {
                    self.teleport(target);
                }
                self.gate_held = false;
            }
            Deferred::TeleportRelease => self.teleporting = false,
            Deferred::Decoration(kind) => {
                if self.nav.animation_enabled {
                    self.intents.push(Intent::Decoration(kind));
                }
                let period = match kind {
                    Decoration::ColorEvolve => self.timing.disco_evolve_ms,
                    Decoration::ArrowMove => self.timing.arrow_move_ms,
                };
                let id = self.sched.schedule_in(period, Deferred::Decoration(kind));
                if let Some(slot) = self.decoration_timers.iter_mut().find(|(k, _)| *k == kind) {
                    slot.1 = id;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::input::LogicalInput::{self, *};
    use crate::domain::scroll::Position;

    const TICK: u64 = 16;

    const FIXTURE: &str = r#"
        [[area]]
        name = "main"
        width = 5000
        transitions = [[2500, -1, "b", 100]]

        [[area]]
        name = "b"
        width = 1000
        transitions = [[500, 1, "main", 2500]]
    "#;

    /// Drives a theatre on a fixed tick, like the main loop does.
    struct Rig {
        t: Theatre,
        now: u64,
    }

    impl Rig {
        fn new(table: AreaTable, vp: Viewport, start: &str, x: i32) -> Rig {
            let mut cfg = AppConfig::default();
            cfg.viewport = vp;
            cfg.start_area = start.into();
            cfg.start_position = x;
            cfg.input.reverse_left_right = false;
            let mut t = Theatre::new(table, &cfg).unwrap();
            t.start();
            t.drain_intents();
            Rig { t, now: 0 }
        }

        fn fixture(x: i32) -> Rig {
            let table = AreaTable::from_toml_str(FIXTURE).unwrap();
            Rig::new(table, Viewport { width: 200, height: 100 }, "main", x)
        }

        fn builtin(start: &str, x: i32) -> Rig {
            Rig::new(AreaTable::builtin().unwrap(), Viewport { width: 1920, height: 760 }, start, x)
        }

        fn step(&mut self, inputs: &[LogicalInput]) {
            self.now += TICK;
            self.t.tick(self.now, InputState::with(inputs));
        }

        fn hold(&mut self, inputs: &[LogicalInput], ticks: usize) {
            for _ in 0..ticks {
                self.step(inputs);
            }
        }

        fn wait(&mut self, ms: u64) {
            let until = self.now + ms;
            while self.now < until {
                self.step(&[]);
            }
        }

        fn x(&self) -> i32 {
            self.t.nav().position.x
        }

        fn area(&self) -> &str {
            &self.t.current_area().name
        }
    }

    #[test]
    fn unknown_start_area_is_an_error() {
        let mut cfg = AppConfig::default();
        cfg.start_area = "nowhere".into();
        let err = Theatre::new(AreaTable::builtin().unwrap(), &cfg).err();
        assert!(matches!(err, Some(AreaError::UnknownArea(_))));
    }

    #[test]
    fn walk_to_exit_and_go_down() {
        let mut r = Rig::fixture(2000);
        r.hold(&[Right], 150);
        assert_eq!(r.x(), 2300);
        assert_eq!(r.area(), "main");
        assert!(!r.t.nav().inputs_blocked());

        r.hold(&[Right], 100);
        assert_eq!(r.x(), 2500);
        assert!(r.t.nav().permitted.down.is_some());

        r.step(&[]);
        r.step(&[Down]);
        assert!(r.t.nav().inputs_blocked());
        assert_eq!(r.t.phase(), TransitionPhase::FadingOut);

        r.wait(1100);
        assert_eq!(r.area(), "b");
        assert_eq!(r.x(), 100);
        assert!(!r.t.nav().inputs_blocked());
        assert_eq!(r.t.phase(), TransitionPhase::Idle);
    }

    #[test]
    fn down_outside_range_does_nothing() {
        let mut r = Rig::fixture(2000);
        r.hold(&[Right], 50);
        assert_eq!(r.x(), 2100);
        r.step(&[]);
        r.step(&[Down]);
        assert!(!r.t.nav().inputs_blocked());
        r.wait(2000);
        assert_eq!(r.area(), "main");
    }

    #[test]
    fn wrong_direction_does_nothing() {
        let mut r = Rig::fixture(2500);
        r.step(&[]);
        r.step(&[Up]);
        r.wait(2000);
        assert_eq!(r.area(), "main");
    }

    #[test]
    fn holding_into_range_needs_idle_edge() {
        let mut r = Rig::fixture(2000);
        r.hold(&[Right, Down], 200);
        assert_eq!(r.area(), "main");
        assert!(!r.t.nav().inputs_blocked());
    }

    #[test]
    fn input_is_ignored_during_transition() {
        let mut r = Rig::fixture(2500);
        r.step(&[]);
        r.step(&[Down]);
        let before = r.t.nav().position;
        // still fading out: nothing moves
        r.hold(&[Left], 20);
        assert_eq!(r.t.nav().position, before);
        assert_eq!(r.area(), "main");
        // past the swap: position is the destination, still frozen
        r.hold(&[Right, Up], 20);
        assert_eq!(r.area(), "b");
        assert_eq!(r.x(), 100);
    }

    #[test]
    fn held_key_continues_after_transition() {
        let mut r = Rig::fixture(2500);
        r.step(&[]);
        r.step(&[Down]);
        r.hold(&[Right], 1000 / TICK as usize + 2);
        assert_eq!(r.area(), "b");
        assert!(r.x() > 100);
    }

    #[test]
    fn unblock_tick_moves_once() {
        let mut r = Rig::fixture(2500);
        r.step(&[]);
        r.step(&[Down]);
        let mut xs = vec![];
        for _ in 0..80 {
            r.step(&[Right]);
            if !r.t.nav().inputs_blocked() {
                xs.push(r.x());
            }
        }
        assert_eq!(r.area(), "b");
        assert_eq!(xs[0], 102);
        assert!(xs.windows(2).all(|w| w[1] - w[0] == 2));
    }

    #[test]
    fn left_and_right_together_stay_put() {
        let mut r = Rig::fixture(3000);
        r.hold(&[Left, Right], 300);
        assert_eq!(r.x(), 3000);
    }

    #[test]
    fn bounded_area_stays_in_bounds() {
        let mut r = Rig::fixture(2000);
        r.t.command(0, Command::SpeedUp);
        for _ in 0..40 {
            r.t.command(r.now, Command::SpeedUp);
            r.wait(200);
        }
        r.hold(&[Left], 500);
        assert_eq!(r.x(), 100);
        r.hold(&[Right], 500);
        assert_eq!(r.x(), 4900);
    }

    #[test]
    fn looping_area_comes_back_around() {
        let mut r = Rig::builtin("main", 5000);
        let width = r.t.current_area().width;
        // 28371 is odd: use speed 1 for an exact lap
        for _ in 0..10 {
            r.t.command(r.now, Command::SpeedDown);
            r.wait(200);
        }
        assert_eq!(r.t.nav().scroll_speed, 1);
        r.hold(&[Right], width as usize);
        assert_eq!(r.x(), 5000);
        let strip = r.t.nav().strip.as_ref().unwrap();
        assert_eq!(strip.canonical_x(0), 5000);
    }

    #[test]
    fn looping_exit_found_after_rotations() {
        let mut r = Rig::builtin("main", 20000);
        // walk right to the undersea exit at 23800
        r.t.command(0, Command::SpeedUp);
        r.hold(&[Right], 1267);
        assert_eq!(r.x(), 23801);
        assert!(r.t.nav().permitted.down.is_some());
        r.step(&[]);
        r.step(&[Down]);
        r.wait(1100);
        assert_eq!(r.area(), "undersea");
        assert_eq!(r.t.nav().position, Position { x: 2880, y: 380 });
    }

    #[test]
    fn swap_reports_new_area() {
        let mut r = Rig::fixture(2500);
        r.step(&[]);
        r.step(&[Down]);
        r.t.drain_intents();
        r.wait(600);
        let out = r.t.drain_intents();
        assert!(out.iter().any(|i| matches!(i, Intent::ShowArea { name, .. } if name == "b")));
        assert!(out.contains(&Intent::ScrollTo { x: 100, y: 50 }));
        assert!(out.contains(&Intent::FadeIn { duration_ms: 500 }));
        assert!(out.contains(&Intent::Indicator { direction: VerticalDir::Up, visible: false }));
        r.wait(600);
        assert!(r.t.drain_intents().contains(&Intent::InputBlocked(false)));
    }

    #[test]
    fn speed_changes_respect_cooldown() {
        let mut r = Rig::fixture(2000);
        r.t.command(1000, Command::SpeedUp);
        r.t.command(1100, Command::SpeedUp);
        assert_eq!(r.t.nav().scroll_speed, 3);
        r.t.command(1150, Command::SpeedUp);
        assert_eq!(r.t.nav().scroll_speed, 4);
        let out = r.t.drain_intents();
        assert!(out.contains(&Intent::ScrollSpeed(4)));
        assert!(out.iter().any(|i| matches!(i, Intent::Hud { text, .. } if text == "Scroll speed: 4")));
    }

    fn enter_konami(r: &mut Rig) {
        for &input in &crate::domain::gesture::KONAMI_CODE {
            r.step(&[input]);
            r.step(&[]);
        }
    }

    #[test]
    fn konami_runs_celebration_once() {
        let mut r = Rig::fixture(3000);
        enter_konami(&mut r);
        assert!(r.t.is_celebrating());
        assert_eq!(r.t.konami_position(), 0);
        let out = r.t.drain_intents();
        let started = out.iter().filter(|i| matches!(i, Intent::CelebrationStarted { .. })).count();
        assert_eq!(started, 1);

        // a second code during the matrix phase is ignored
        enter_konami(&mut r);
        let out = r.t.drain_intents();
        assert!(!out.iter().any(|i| matches!(i, Intent::CelebrationStarted { .. })));

        // party phase blocks input
        r.wait(12000);
        assert!(r.t.nav().inputs_blocked());
        let x = r.x();
        r.hold(&[Left], 50);
        assert_eq!(r.x(), x);

        r.wait(12000);
        assert!(!r.t.nav().inputs_blocked());
        assert!(!r.t.is_celebrating());
        let out = r.t.drain_intents();
        assert!(out.contains(&Intent::CelebrationEnded));
        assert!(out.iter().any(|i| matches!(i, Intent::Hud { text, flashing: true, .. } if text == "REMAIN CALM")));
    }

    #[test]
    fn celebrations_cycle_messages() {
        let mut r = Rig::fixture(3000);
        r.t.command(r.now, Command::Celebrate);
        r.wait(25000);
        r.t.drain_intents();
        r.t.command(r.now, Command::Celebrate);
        r.wait(25000);
        let huds: Vec<String> = r
            .t
            .drain_intents()
            .into_iter()
            .filter_map(|i| match i {
                Intent::Hud { text, .. } => Some(text),
                _ => None,
            })
            .collect();
        assert_eq!(huds, vec!["PLEASE RELAX WHILE WE PROBE YOUR BRAIN...", "ERROR: BRAIN NOT FOUND"]);
    }

    const WELL: &str = r#"
        [[area]]
        name = "main"
        width = 10000

        [[area]]
        name = "space"
        width = 4000
        height = 2000
        transitions = [[3000, -1, "main", 5000]]

        [area.gravity]
        x = 960
        y = 600
        destination = "main"
    "#;

    #[test]
    fn gravity_swallows_and_teleports() {
        let table = AreaTable::from_toml_str(WELL).unwrap();
        let mut r = Rig::new(table, Viewport { width: 1920, height: 760 }, "space", 1000);
        r.hold(&[], 200);
        assert_eq!(r.t.nav().position, Position { x: 960, y: 600 });
        let out = r.t.drain_intents();
        assert!(out.contains(&Intent::Swallowed { duration_ms: 5000 }));

        // input is dropped while swallowing
        r.hold(&[Right], 100);
        assert_eq!(r.t.nav().position, Position { x: 960, y: 600 });
        assert_eq!(r.area(), "space");

        r.wait(5000);
        r.wait(1100);
        assert_eq!(r.area(), "main");
        assert!((960..10000 - 960).contains(&r.x()));
        assert!(!r.t.nav().inputs_blocked());
    }

    #[test]
    fn gravity_never_pulls_past_the_border() {
        let table = AreaTable::from_toml_str(
            r#"
            [[area]]
            name = "space"
            width = 4000
            height = 2000

            [area.gravity]
            x = 100
            y = 1000
            destination = "space"
            "#,
        )
        .unwrap();
        let mut r = Rig::new(table, Viewport { width: 1920, height: 760 }, "space", 1000);
        r.hold(&[], 200);
        assert_eq!(r.t.nav().position, Position { x: 960, y: 1000 });
        let out = r.t.drain_intents();
        assert!(!out.iter().any(|i| matches!(i, Intent::Swallowed { .. })));
    }

    #[test]
    fn gravity_can_be_switched_off() {
        let table = AreaTable::from_toml_str(WELL).unwrap();
        let mut r = Rig::new(table, Viewport { width: 1920, height: 760 }, "space", 1000);
        r.t.command(0, Command::ToggleGravity);
        r.hold(&[], 400);
        assert_eq!(r.t.nav().position, Position { x: 1000, y: 1000 });
    }

    #[test]
    fn two_d_area_moves_vertically() {
        let table = AreaTable::from_toml_str(WELL).unwrap();
        let mut r = Rig::new(table, Viewport { width: 1920, height: 760 }, "space", 1500);
        r.t.command(0, Command::ToggleGravity);
        r.hold(&[Down], 100);
        assert_eq!(r.t.nav().position.y, 1200);
        r.hold(&[Up, Down], 50);
        assert_eq!(r.t.nav().position.y, 1200);
        r.hold(&[Down], 300);
        assert_eq!(r.t.nav().position.y, 2000 - 380);
        assert!(!r.t.nav().inputs_blocked());
    }

    #[test]
    fn space_exit_needs_bottom_edge() {
        let mut r = Rig::builtin("space", 6695);
        r.t.command(0, Command::ToggleGravity);
        // entered at the bottom edge: the exit is already open
        assert!(r.t.nav().permitted.down.is_some());
        r.hold(&[Up], 50);
        r.hold(&[Down], 49);
        assert!(!r.t.nav().inputs_blocked());
        r.hold(&[Down], 2);
        assert!(r.t.nav().inputs_blocked());
        r.wait(1100);
        assert_eq!(r.area(), "skyworld");
    }

    #[test]
    fn decorations_stop_when_leaving() {
        let mut r = Rig::builtin("main", 7420);
        r.step(&[]);
        r.step(&[Up]);
        r.wait(2600);
        assert_eq!(r.area(), "disco");
        r.t.drain_intents();
        r.wait(6000);
        let out = r.t.drain_intents();
        assert!(out.contains(&Intent::Decoration(Decoration::ColorEvolve)));

        r.step(&[Down]);
        r.wait(1100);
        assert_eq!(r.area(), "main");
        assert!(r.t.drain_intents().contains(&Intent::DecorationsStopped));
        r.wait(60000);
        let out = r.t.drain_intents();
        assert!(!out.iter().any(|i| matches!(i, Intent::Decoration(_))));
    }

    #[test]
    fn debug_jumps() {
        let mut r = Rig::builtin("main", 1000);
        r.t.command(0, Command::DebugTopEntryJump);
        r.wait(1100);
        assert_eq!(r.area(), "undersea");
        r.t.command(r.now, Command::DebugGravityJump);
        r.wait(600);
        assert_eq!(r.area(), "space");
        assert_eq!(r.x(), 6695);
    }
}
