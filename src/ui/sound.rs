/// Sound engine: procedural sound cues for the theatre via rodio.
///
/// All fixed cues are generated as in-memory WAV buffers at init time.
/// Playback is fire-and-forget (non-blocking) via rodio's Sink.
///
/// Compile with `--no-default-features` or without "sound" feature
/// to disable audio entirely (the stub SoundEngine does nothing).

use crate::sim::intent::Intent;

/// What the speakers should do in response to an intent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Cue {
    /// Area change; duration of the whole transition.
    Whoosh { duration_ms: u64 },
    Fanfare,
    Party,
    /// Pitch rises with the scroll speed.
    Speed(i32),
    Swallow,
    /// One more step of the secret gesture.
    GestureStep { step: usize, total: usize },
}

/// Map an intent to its cue. `gesture_len` is the secret gesture length.
pub fn cue_for(intent: &Intent, gesture_len: usize) -> Option<Cue> {
    match intent {
        Intent::PlayTransition { duration_ms } => Some(Cue::Whoosh { duration_ms: *duration_ms }),
        Intent::CelebrationStarted { .. } => Some(Cue::Fanfare),
        Intent::PartyStarted { .. } => Some(Cue::Party),
        Intent::Swallowed { .. } => Some(Cue::Swallow),
        Intent::ScrollSpeed(s) => Some(Cue::Speed(*s)),
        Intent::GestureProgress(n) if *n > 0 => Some(Cue::GestureStep { step: *n, total: gesture_len }),
        _ => None,
    }
}

#[cfg(feature = "sound")]
mod inner {
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};

    use super::Cue;

    const SAMPLE_RATE: u32 = 22050;
    const TAU: f32 = 2.0 * std::f32::consts::PI;

    /// Pre-generated WAV buffers for each fixed cue.
    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        sfx_fanfare: Arc<Vec<u8>>,
        sfx_party: Arc<Vec<u8>>,
        sfx_swallow: Arc<Vec<u8>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    log::warn!("no audio output: {e}");
                    return None;
                }
            };

            Some(SoundEngine {
                _stream: stream,
                handle,
                sfx_fanfare: Arc::new(make_wav(&gen_fanfare())),
                sfx_party: Arc::new(make_wav(&gen_party())),
                sfx_swallow: Arc::new(make_wav(&gen_swallow())),
            })
        }

        pub fn play(&self, cue: Cue) {
            match cue {
                Cue::Whoosh { duration_ms } => self.play_buf(make_wav(&gen_whoosh(duration_ms))),
                Cue::Fanfare => self.play_shared(&self.sfx_fanfare),
                Cue::Party => self.play_shared(&self.sfx_party),
                Cue::Swallow => self.play_shared(&self.sfx_swallow),
                Cue::Speed(speed) => {
                    let freq = 220.0 + speed as f32 * 8.0;
                    self.play_buf(make_wav(&gen_blip(freq, 0.04, 0.2)));
                }
                Cue::GestureStep { step, total } => {
                    let ratio = step as f32 / total.max(1) as f32;
                    self.play_buf(make_wav(&gen_blip(300.0 + ratio * 800.0, 0.035, 0.25)));
                }
            }
        }

        fn play_shared(&self, buf: &Arc<Vec<u8>>) {
            self.play_buf(buf.as_ref().clone());
        }

        fn play_buf(&self, buf: Vec<u8>) {
            if let Ok(sink) = Sink::try_new(&self.handle) {
                if let Ok(src) = rodio::Decoder::new(Cursor::new(buf)) {
                    sink.append(src);
                    sink.detach(); // fire-and-forget
                }
            }
        }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators, all produce Vec<f32> mono samples
    // ════════════════════════════════════════════════════════════

    fn gen_blip(freq: f32, duration: f32, volume: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        (0..n)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32);
                (t * freq * TAU).sin() * env * volume
            })
            .collect()
    }

    /// Filtered noise swelling to the midpoint (the swap) and back down.
    fn gen_whoosh(duration_ms: u64) -> Vec<f32> {
        let n = (SAMPLE_RATE as u64 * duration_ms.max(50) / 1000) as usize;
        let mut rng: u32 = 0x5eed;
        let mut low = 0.0_f32;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                rng = rng.wrapping_mul(1103515245).wrapping_add(12345);
                let noise = (rng as f32 / u32::MAX as f32) * 2.0 - 1.0;
                // one-pole low-pass, opening towards the swap
                let k = 0.02 + 0.2 * (1.0 - (2.0 * t - 1.0).abs());
                low += (noise - low) * k;
                let env = (t * std::f32::consts::PI).sin();
                low * env * 0.5
            })
            .collect()
    }

    /// Ascending C-major run with a held top note.
    fn gen_fanfare() -> Vec<f32> {
        let notes = [523.0_f32, 659.0, 784.0, 1047.0];
        let note_dur = 0.1;
        let mut samples = Vec::new();
        for &freq in &notes {
            let n = (SAMPLE_RATE as f32 * note_dur) as usize;
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32) * 0.3;
                let wave = (t * freq * TAU).sin() * 0.6
                    + (t * freq * 2.0 * TAU).sin() * 0.3
                    + (t * freq * 3.0 * TAU).sin() * 0.1;
                samples.push(wave * env * 0.3);
            }
        }
        let last_freq = 1047.0_f32;
        let n = (SAMPLE_RATE as f32 * 0.25) as usize;
        for i in 0..n {
            let t = i as f32 / SAMPLE_RATE as f32;
            let env = 1.0 - (i as f32 / n as f32);
            samples.push((t * last_freq * TAU).sin() * env * 0.3);
        }
        samples
    }

    /// Bouncing octave pattern.
    fn gen_party() -> Vec<f32> {
        let notes = [392.0_f32, 784.0, 440.0, 880.0, 494.0, 988.0, 523.0, 1047.0];
        let note_dur = 0.07;
        let mut samples = Vec::new();
        for &freq in &notes {
            let n = (SAMPLE_RATE as f32 * note_dur) as usize;
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32).powf(0.5);
                // square-ish
                let wave = (t * freq * TAU).sin() * 0.7 + (t * freq * 3.0 * TAU).sin() * 0.3;
                samples.push(wave * env * 0.25);
            }
        }
        samples
    }

    /// Falling whistle into a low rumble.
    fn gen_swallow() -> Vec<f32> {
        let duration = 0.6;
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        let mut phase = 0.0_f32;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let freq = 900.0 * (1.0 - t).powf(2.0) + 60.0;
                phase += freq / SAMPLE_RATE as f32;
                let env = (1.0 - t).powf(0.5);
                (phase * TAU).sin() * env * 0.3
            })
            .collect()
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder, wraps f32 samples into a valid WAV buffer
    // ════════════════════════════════════════════════════════════

    fn make_wav(samples: &[f32]) -> Vec<u8> {
        let num_channels: u16 = 1;
        let bits_per_sample: u16 = 16;
        let byte_rate = SAMPLE_RATE * (num_channels as u32) * (bits_per_sample as u32) / 8;
        let block_align = num_channels * bits_per_sample / 8;
        let data_size = samples.len() as u32 * 2;
        let file_size = 36 + data_size;

        let mut buf = Vec::with_capacity(44 + data_size as usize);

        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&file_size.to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
        buf.extend_from_slice(&num_channels.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits_per_sample.to_le_bytes());

        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());

        for &s in samples {
            let val = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
            buf.extend_from_slice(&val.to_le_bytes());
        }

        buf
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn wav_header_sizes() {
            let wav = make_wav(&[0.0, 0.5, -0.5, 1.5]);
            assert_eq!(&wav[0..4], b"RIFF");
            assert_eq!(wav.len(), 44 + 8);
            assert_eq!(u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]), 8);
            // clamped
            assert_eq!(i16::from_le_bytes([wav[50], wav[51]]), 32767);
        }

        #[test]
        fn whoosh_length_follows_duration() {
            assert_eq!(gen_whoosh(1000).len(), SAMPLE_RATE as usize);
            assert!(gen_whoosh(1000).iter().all(|s| s.abs() <= 1.0));
        }
    }
}

// ════════════════════════════════════════════════════════════
//  Public API, compiles to no-ops when sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play(&self, _cue: Cue) {}
}
