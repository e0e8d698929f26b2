/// Logical input state and the normalizer that produces it.
///
/// The installation controller is a joystick plus eight buttons wired to a
/// gamepad PCB. Every button is a redundant copy of one of the four joystick
/// directions, so the normalizer ORs each button into the direction it
/// aliases as well as into its own slot. Keyboard keys map straight onto
/// logical inputs without aliasing.
///
/// ```text
///   slot:  0     1      2   3     4   5   6  7  8   9   10 11
///          Left  Right  Up  Down  L1  R1  A  B  L2  R2  X  Y
/// ```

pub const NUM_INPUTS: usize = 12;

/// One logical input. Discriminants are the slot indices above.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum LogicalInput {
    Left,
    Right,
    Up,
    Down,
    L1,
    R1,
    A,
    B,
    L2,
    R2,
    X,
    Y,
}

use LogicalInput::*;

impl LogicalInput {
    pub const ALL: [LogicalInput; NUM_INPUTS] = [Left, Right, Up, Down, L1, R1, A, B, L2, R2, X, Y];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(i: usize) -> Option<LogicalInput> {
        Self::ALL.get(i).copied()
    }

    /// The slot a physical gamepad button stores its own state in.
    /// Buttons 0..7 occupy slots 4..11; anything beyond has no slot.
    pub fn button_slot(button: usize) -> Option<LogicalInput> {
        if button < NUM_INPUTS - 4 {
            Self::from_index(button + 4)
        } else {
            None
        }
    }

    pub fn from_name(s: &str) -> Option<LogicalInput> {
        match s.to_lowercase().as_str() {
            "left" => Some(Left),
            "right" => Some(Right),
            "up" => Some(Up),
            "down" => Some(Down),
            "l1" => Some(L1),
            "r1" => Some(R1),
            "a" | "button1" => Some(A),
            "b" | "button2" => Some(B),
            "l2" => Some(L2),
            "r2" => Some(R2),
            "x" => Some(X),
            "y" => Some(Y),
            _ => None,
        }
    }
}

/// Which logical inputs are held right now.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct InputState {
    held: [bool; NUM_INPUTS],
}

impl InputState {
    pub fn new() -> Self {
        InputState::default()
    }

    /// Build a state with exactly these inputs held.
    #[cfg(test)]
    pub fn with(inputs: &[LogicalInput]) -> Self {
        let mut s = InputState::new();
        for &i in inputs {
            s.set(i, true);
        }
        s
    }

    #[inline]
    pub fn is_on(&self, input: LogicalInput) -> bool {
        self.held[input.index()]
    }

    #[inline]
    pub fn set(&mut self, input: LogicalInput, on: bool) {
        self.held[input.index()] = on;
    }

    /// The `anyInputOn` aggregate: OR of every tracked input.
    pub fn any_on(&self) -> bool {
        self.held.iter().any(|&h| h)
    }

    /// Per-slot OR of two states.
    pub fn merge(&self, other: &InputState) -> InputState {
        let mut out = *self;
        for (a, b) in out.held.iter_mut().zip(other.held.iter()) {
            *a |= *b;
        }
        out
    }

    fn swap_left_right(&mut self) {
        self.held.swap(Left.index(), Right.index());
    }
}

// ── Gamepad boundary ──

/// A gamepad button as the device reports it. Some drivers give a bare
/// analog value, others a pressed/touched pair.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum ButtonValue {
    Analog(f32),
    Digital { pressed: bool, touched: bool },
}

impl Default for ButtonValue {
    fn default() -> Self {
        ButtonValue::Digital { pressed: false, touched: false }
    }
}

impl ButtonValue {
    pub fn is_pressed(self) -> bool {
        match self {
            ButtonValue::Analog(v) => v >= 1.0,
            ButtonValue::Digital { pressed, touched } => pressed || touched,
        }
    }
}

/// One poll of a connected gamepad.
#[derive(Clone, Debug, Default)]
pub struct GamepadReport {
    pub axes: Vec<f32>,
    pub buttons: Vec<ButtonValue>,
}

/// Axis index → the logical inputs set past -threshold / +threshold.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct AxisBinding {
    pub axis: usize,
    pub negative: LogicalInput,
    pub positive: LogicalInput,
}

/// Physical button index → the logical input it also sets.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ButtonAlias {
    pub button: usize,
    pub input: LogicalInput,
}

#[derive(Clone, Debug)]
pub struct NormalizerConfig {
    pub axes: Vec<AxisBinding>,
    pub aliases: Vec<ButtonAlias>,
    pub threshold: f32,
    pub reverse_left_right: bool,
}

/// The joystick is mounted rotated: axis 0 is vertical, axis 1 horizontal
/// with positive pointing left.
pub fn default_axes() -> Vec<AxisBinding> {
    vec![
        AxisBinding { axis: 0, negative: Up, positive: Down },
        AxisBinding { axis: 1, negative: Right, positive: Left },
    ]
}

/// Buttons are wired in blocks of four matching the joystick direction order.
pub fn default_aliases() -> Vec<ButtonAlias> {
    (0..NUM_INPUTS - 4)
        .filter_map(|button| {
            LogicalInput::from_index(button % 4).map(|input| ButtonAlias { button, input })
        })
        .collect()
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        NormalizerConfig {
            axes: default_axes(),
            aliases: default_aliases(),
            threshold: 0.5,
            reverse_left_right: true,
        }
    }
}

/// Merges gamepad and keyboard into one `InputState`.
#[derive(Clone, Debug)]
pub struct InputNormalizer {
    config: NormalizerConfig,
}

impl InputNormalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        InputNormalizer { config }
    }

    /// Flip the left/right reversal. Returns the new setting.
    pub fn toggle_reverse(&mut self) -> bool {
        self.config.reverse_left_right = !self.config.reverse_left_right;
        self.config.reverse_left_right
    }

    /// A missing pad contributes nothing.
    pub fn normalize(&self, pad: Option<&GamepadReport>, keyboard: &InputState) -> InputState {
        let mut state = match pad {
            Some(report) => self.gamepad_state(report),
            None => InputState::new(),
        };
        state = state.merge(keyboard);
        if self.config.reverse_left_right {
            state.swap_left_right();
        }
        state
    }

    fn gamepad_state(&self, report: &GamepadReport) -> InputState {
        let mut state = InputState::new();
        let t = self.config.threshold;

        for binding in &self.config.axes {
            let value = report.axes.get(binding.axis).copied().unwrap_or(0.0);
            if value > t {
                state.set(binding.positive, true);
            } else if value < -t {
                state.set(binding.negative, true);
            }
        }

        for (i, button) in report.buttons.iter().enumerate() {
            if !button.is_pressed() {
                continue;
            }
            if let Some(slot) = LogicalInput::button_slot(i) {
                state.set(slot, true);
            }
            for alias in self.config.aliases.iter().filter(|a| a.button == i) {
                state.set(alias.input, true);
            }
        }

        state
    }
}
