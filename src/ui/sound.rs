/// Sound engine: procedural 8-bit style sound effects via rodio.
///
/// Every cue is generated once at init as an in-memory WAV buffer and
/// stored under its logical name ("bomb_place", "explosion", ...).
/// The simulation never touches audio; it emits events, and the game
/// loop turns them into `play(name, volume)` calls.
///
/// Compile with `--no-default-features` or without the "sound" feature
/// to disable audio entirely (the stub SoundEngine does nothing).

/// Every cue the engine knows how to play.
pub const CUE_NAMES: [&str; 7] = [
    "bomb_place",
    "explosion",
    "block_break",
    "powerup_collect",
    "player_hit",
    "player_die",
    "player_move",
];

#[cfg(feature = "sound")]
mod inner {
    use std::collections::HashMap;
    use std::f32::consts::TAU;
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};

    use super::CUE_NAMES;

    const SAMPLE_RATE: u32 = 22050;

    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        cues: HashMap<&'static str, Arc<Vec<u8>>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::warn!("audio output unavailable: {e}");
                    return None;
                }
            };
            let cues = CUE_NAMES
                .iter()
                .map(|&name| (name, Arc::new(make_wav(&generate(name)))))
                .collect();
            Some(SoundEngine { _stream: stream, handle, cues })
        }

        /// Fire-and-forget playback. Unknown names are ignored.
        pub fn play(&self, name: &str, volume: Option<f32>) {
            let Some(buf) = self.cues.get(name) else {
                tracing::debug!(name, "no such sound cue");
                return;
            };
            if let Ok(sink) = Sink::try_new(&self.handle) {
                let cursor = Cursor::new(buf.as_ref().clone());
                if let Ok(src) = rodio::Decoder::new(cursor) {
                    sink.set_volume(volume.unwrap_or(1.0));
                    sink.append(src);
                    sink.detach();
                }
            }
        }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators: all produce Vec<f32> mono samples
    // ════════════════════════════════════════════════════════════

    pub(super) fn generate(name: &str) -> Vec<f32> {
        match name {
            // Low soft thud
            "bomb_place" => sweep(0.09, 220.0, 110.0, 0.1, 0.35),
            // Long rumbling noise burst
            "explosion" => sweep(0.45, 160.0, 40.0, 0.75, 0.45),
            // Short bright crunch
            "block_break" => sweep(0.12, 900.0, 300.0, 0.6, 0.3),
            // Ascending arpeggio C6, E6, G6, C7
            "powerup_collect" => notes(&[1047.0, 1319.0, 1568.0, 2093.0], 0.05, 0.25),
            // Two falling notes
            "player_hit" => notes(&[660.0, 440.0], 0.08, 0.3),
            // Sad descent A4, F#4, Eb4, C4 with a tail fade
            "player_die" => fade_tail(notes(&[440.0, 370.0, 311.0, 261.0], 0.12, 0.3)),
            // Tiny tick
            "player_move" => sweep(0.025, 1200.0, 900.0, 0.2, 0.2),
            _ => Vec::new(),
        }
    }

    /// Pitch sweep from `f0` to `f1` mixed with `noise` parts of white noise.
    fn sweep(duration: f32, f0: f32, f1: f32, noise: f32, volume: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        let mut lcg: u32 = 0x2545_f491;
        let mut phase = 0.0_f32;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                phase += (f0 + (f1 - f0) * t) / SAMPLE_RATE as f32;
                let tone = (phase * TAU).sin();
                lcg = lcg.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                let white = (lcg >> 8) as f32 / (1u32 << 24) as f32 * 2.0 - 1.0;
                let env = (1.0 - t).powf(1.5);
                (tone * (1.0 - noise) + white * noise) * env * volume
            })
            .collect()
    }

    /// Square-ish notes (fundamental plus third harmonic), each decaying.
    fn notes(freqs: &[f32], note_dur: f32, volume: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * note_dur) as usize;
        freqs
            .iter()
            .flat_map(|&freq| {
                (0..n).map(move |i| {
                    let t = i as f32 / SAMPLE_RATE as f32;
                    let env = 1.0 - (i as f32 / n as f32).sqrt() * 0.7;
                    let wave = (t * freq * TAU).sin() * 0.7 + (t * freq * 3.0 * TAU).sin() * 0.3;
                    wave * env * volume
                })
            })
            .collect()
    }

    fn fade_tail(mut samples: Vec<f32>) -> Vec<f32> {
        let len = samples.len();
        let fade = len / 4;
        for (k, s) in samples[len - fade..].iter_mut().enumerate() {
            *s *= 1.0 - k as f32 / fade.max(1) as f32;
        }
        samples
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder: 16-bit mono PCM
    // ════════════════════════════════════════════════════════════

    pub(super) fn make_wav(samples: &[f32]) -> Vec<u8> {
        const CHANNELS: u16 = 1;
        const BITS: u16 = 16;
        let block_align = CHANNELS * BITS / 8;
        let data_size = samples.len() as u32 * block_align as u32;

        let mut buf = Vec::with_capacity(44 + data_size as usize);
        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&(36 + data_size).to_le_bytes());
        buf.extend_from_slice(b"WAVEfmt ");
        for field in [16u32, 1 | (CHANNELS as u32) << 16, SAMPLE_RATE, SAMPLE_RATE * block_align as u32] {
            buf.extend_from_slice(&field.to_le_bytes());
        }
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&BITS.to_le_bytes());
        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());
        for &s in samples {
            buf.extend_from_slice(&((s.clamp(-1.0, 1.0) * 32767.0) as i16).to_le_bytes());
        }
        buf
    }

}

// ════════════════════════════════════════════════════════════
//  Public API: compiles to no-ops when sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play(&self, _name: &str, _volume: Option<f32>) {}
}
