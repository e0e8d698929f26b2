/// Gamepad reader using gilrs.
///
/// Produces the raw report the input normalizer expects: axes and buttons in
/// the browser "standard gamepad" order, so the controller wiring in
/// config.toml reads the same whichever host drives it.
///
///   Buttons  0..3   South, East, West, North
///            4..7   L1, R1, L2, R2
///            8..11  Select, Start, LeftThumb, RightThumb
///           12..15  D-pad up, down, left, right
///   Axes     0..3   LeftStickX, LeftStickY, RightStickX, RightStickY (down is +)
///
/// A disconnected pad reports nothing, so input degrades to keyboard only.

#[cfg(feature = "gamepad")]
use gilrs::{Axis, Button, EventType, Gilrs};

use crate::domain::input::{ButtonValue, GamepadReport};

const NUM_BUTTONS: usize = 16;
const NUM_AXES: usize = 4;

#[cfg(feature = "gamepad")]
fn button_index(btn: Button) -> Option<usize> {
    let i = match btn {
        Button::South => 0,
        Button::East => 1,
        Button::West => 2,
        Button::North => 3,
        Button::LeftTrigger => 4,
        Button::RightTrigger => 5,
        Button::LeftTrigger2 => 6,
        Button::RightTrigger2 => 7,
        Button::Select => 8,
        Button::Start => 9,
        Button::LeftThumb => 10,
        Button::RightThumb => 11,
        Button::DPadUp => 12,
        Button::DPadDown => 13,
        Button::DPadLeft => 14,
        Button::DPadRight => 15,
        _ => return None,
    };
    Some(i)
}

/// Axis index and sign flip to the standard layout.
#[cfg(feature = "gamepad")]
fn axis_index(axis: Axis) -> Option<(usize, f32)> {
    match axis {
        Axis::LeftStickX => Some((0, 1.0)),
        Axis::LeftStickY => Some((1, -1.0)),
        Axis::RightStickX => Some((2, 1.0)),
        Axis::RightStickY => Some((3, -1.0)),
        _ => None,
    }
}

pub struct GamepadState {
    #[cfg(feature = "gamepad")]
    gilrs: Option<Gilrs>,

    buttons: [ButtonValue; NUM_BUTTONS],
    axes: [f32; NUM_AXES],

    pub connected: bool,
}

impl GamepadState {
    pub fn new() -> Self {
        #[cfg(feature = "gamepad")]
        let (gilrs_opt, connected) = {
            match Gilrs::new() {
                Ok(g) => {
                    let has_pad = g.gamepads().next().is_some();
                    (Some(g), has_pad)
                }
                Err(e) => {
                    log::warn!("gamepad support unavailable: {e}");
                    (None, false)
                }
            }
        };
        #[cfg(not(feature = "gamepad"))]
        let connected = false;

        if connected {
            log::info!("gamepad connected");
        }

        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs: gilrs_opt,
            buttons: [ButtonValue::default(); NUM_BUTTONS],
            axes: [0.0; NUM_AXES],
            connected,
        }
    }

    pub fn update(&mut self) {
        #[cfg(feature = "gamepad")]
        self.poll_gilrs();
    }

    /// The current report, or `None` with no pad connected.
    pub fn report(&self) -> Option<GamepadReport> {
        if !self.connected {
            return None;
        }
        Some(GamepadReport { axes: self.axes.to_vec(), buttons: self.buttons.to_vec() })
    }

    #[cfg(feature = "gamepad")]
    fn poll_gilrs(&mut self) {
        let gilrs = match &mut self.gilrs {
            Some(g) => g,
            None => return,
        };

        let events: Vec<_> = std::iter::from_fn(|| gilrs.next_event()).collect();

        for event in events {
            match event.event {
                EventType::ButtonPressed(btn, _) => {
                    self.mark_connected();
                    self.set_button(btn, ButtonValue::Digital { pressed: true, touched: false });
                }
                EventType::ButtonReleased(btn, _) => {
                    self.mark_connected();
                    self.set_button(btn, ButtonValue::Digital { pressed: false, touched: false });
                }
                EventType::ButtonChanged(btn, value, _) => {
                    self.mark_connected();
                    self.set_button(btn, ButtonValue::Analog(value));
                }
                EventType::AxisChanged(axis, value, _) => {
                    self.mark_connected();
                    if let Some((i, sign)) = axis_index(axis) {
                        self.axes[i] = value * sign;
                    }
                }
                EventType::Connected => self.mark_connected(),
                EventType::Disconnected => {
                    log::info!("gamepad disconnected");
                    self.connected = false;
                    self.release_all();
                }
                _ => {}
            }
        }
    }

    #[cfg(feature = "gamepad")]
    fn set_button(&mut self, btn: Button, value: ButtonValue) {
        if let Some(i) = button_index(btn) {
            self.buttons[i] = value;
        }
    }

    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    fn mark_connected(&mut self) {
        if !self.connected {
            log::info!("gamepad connected");
            self.connected = true;
        }
    }

    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    fn release_all(&mut self) {
        self.buttons = [ButtonValue::default(); NUM_BUTTONS];
        self.axes = [0.0; NUM_AXES];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idle() -> GamepadState {
        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs: None,
            buttons: [ButtonValue::default(); NUM_BUTTONS],
            axes: [0.0; NUM_AXES],
            connected: false,
        }
    }

    #[test]
    fn disconnected_pad_reports_nothing() {
        let mut pad = idle();
        pad.axes[0] = 1.0;
        assert!(pad.report().is_none());
        pad.mark_connected();
        let r = pad.report().unwrap();
        assert_eq!(r.axes.len(), NUM_AXES);
        assert_eq!(r.buttons.len(), NUM_BUTTONS);
        assert_eq!(r.axes[0], 1.0);
    }

    #[test]
    fn release_all_clears_state() {
        let mut pad = idle();
        pad.mark_connected();
        pad.buttons[3] = ButtonValue::Analog(1.0);
        pad.axes[1] = -0.8;
        pad.release_all();
        let r = pad.report().unwrap();
        assert!(r.buttons.iter().all(|b| !b.is_pressed()));
        assert!(r.axes.iter().all(|&a| a == 0.0));
    }

    #[cfg(feature = "gamepad")]
    #[test]
    fn standard_layout() {
        assert_eq!(button_index(Button::South), Some(0));
        assert_eq!(button_index(Button::RightTrigger2), Some(7));
        assert_eq!(button_index(Button::DPadRight), Some(15));
        assert_eq!(button_index(Button::Mode), None);
        assert_eq!(axis_index(Axis::LeftStickY), Some((1, -1.0)));
    }
}
