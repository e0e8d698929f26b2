/// Gesture recognizer: a fixed input sequence entered as discrete presses.
///
/// Only the leading edge out of an idle tick counts as a step, so holding a
/// direction never advances more than once.
use super::input::{InputState, LogicalInput};
use super::input::LogicalInput::*;

pub const KONAMI_CODE: [LogicalInput; 10] = [Up, Up, Down, Down, Left, Right, Left, Right, B, A];

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GestureStep {
    /// Nothing evaluated or nothing held.
    Waiting,
    /// Matched; now at this position.
    Advanced(usize),
    /// Wrong input mid-sequence.
    Reset,
    Completed,
}

#[derive(Clone, Debug)]
pub struct GestureRecognizer {
    sequence: Vec<LogicalInput>,
    position: usize,
}

impl GestureRecognizer {
    pub fn new(sequence: &[LogicalInput]) -> Self {
        GestureRecognizer { sequence: sequence.to_vec(), position: 0 }
    }

    pub fn konami() -> Self {
        Self::new(&KONAMI_CODE)
    }

    #[cfg(test)]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Evaluate one tick. `was_idle` is true when the previous tick had no
    /// input held.
    pub fn observe(&mut self, input: &InputState, was_idle: bool) -> GestureStep {
        if !was_idle || self.sequence.is_empty() {
            return GestureStep::Waiting;
        }
        if input.is_on(self.sequence[self.position]) {
            if self.position + 1 == self.sequence.len() {
                self.position = 0;
                GestureStep::Completed
            } else {
                self.position += 1;
                GestureStep::Advanced(self.position)
            }
        } else if self.position > 0 && input.any_on() {
            self.position = 0;
            GestureStep::Reset
        } else {
            GestureStep::Waiting
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Feed presses with an idle tick between each, like a player would.
    fn press_all(g: &mut GestureRecognizer, presses: &[LogicalInput]) -> Vec<GestureStep> {
        let mut was_idle = true;
        let mut out = vec![];
        for &p in presses {
            let s = InputState::with(&[p]);
            out.push(g.observe(&s, was_idle));
            was_idle = false;
            // held for a few ticks
            for _ in 0..3 {
                assert_eq!(g.observe(&s, was_idle), GestureStep::Waiting);
            }
            // release
            g.observe(&InputState::new(), was_idle);
            was_idle = true;
        }
        out
    }

    #[test]
    fn full_code_completes_once() {
        let mut g = GestureRecognizer::konami();
        let steps = press_all(&mut g, &KONAMI_CODE);
        let completions = steps.iter().filter(|s| **s == GestureStep::Completed).count();
        assert_eq!(completions, 1);
        assert_eq!(*steps.last().unwrap(), GestureStep::Completed);
        assert_eq!(g.position(), 0);
    }

    #[test]
    fn wrong_element_resets() {
        let mut g = GestureRecognizer::konami();
        press_all(&mut g, &[Up, Up, Down]);
        assert_eq!(g.position(), 3);
        let steps = press_all(&mut g, &[Left]);
        assert_eq!(steps, vec![GestureStep::Reset]);
        assert_eq!(g.position(), 0);
        // and the sequence can start over
        press_all(&mut g, &KONAMI_CODE[..4]);
        assert_eq!(g.position(), 4);
    }

    #[test]
    fn idle_ticks_keep_position() {
        let mut g = GestureRecognizer::konami();
        press_all(&mut g, &[Up, Up]);
        for _ in 0..50 {
            assert_eq!(g.observe(&InputState::new(), true), GestureStep::Waiting);
        }
        assert_eq!(g.position(), 2);
    }

    #[test]
    fn holding_does_not_advance() {
        let mut g = GestureRecognizer::konami();
        let up = InputState::with(&[Up]);
        assert_eq!(g.observe(&up, true), GestureStep::Advanced(1));
        for _ in 0..10 {
            g.observe(&up, false);
        }
        assert_eq!(g.position(), 1);
    }

    #[test]
    fn wrong_input_at_start_is_ignored() {
        let mut g = GestureRecognizer::konami();
        assert_eq!(g.observe(&InputState::with(&[Left]), true), GestureStep::Waiting);
        assert_eq!(g.position(), 0);
    }
}
