/// Scalar prosody multipliers handed to the synthesizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProsodyControls {
    /// Duration multiplier. Higher values give slower speech.
    pub pace: f32,
    /// Fundamental frequency multiplier.
    pub pitch_rate: f32,
    /// Loudness / emphasis multiplier.
    pub energy_rate: f32,
}

impl Default for ProsodyControls {
    fn default() -> Self {
        Self {
            pace: 1.15,
            pitch_rate: 1.0,
            energy_rate: 1.1,
        }
    }
}

/// Mel-spectrogram stored row-major as `n_mels` rows of `frames` values.
#[derive(Debug, Clone, PartialEq)]
pub struct MelSpectrogram {
    n_mels: usize,
    frames: usize,
    data: Vec<f32>,
}

impl MelSpectrogram {
    /// Returns `None` when `data.len() != n_mels * frames`.
    pub fn new(n_mels: usize, frames: usize, data: Vec<f32>) -> Option<Self> {
        (n_mels.checked_mul(frames)? == data.len()).then_some(Self {
            n_mels,
            frames,
            data,
        })
    }

    /// A spectrogram with no frames.
    pub fn empty(n_mels: usize) -> Self {
        Self {
            n_mels,
            frames: 0,
            data: Vec::new(),
        }
    }

    pub fn n_mels(&self) -> usize {
        self.n_mels
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn is_empty(&self) -> bool {
        self.frames == 0
    }

    /// `[n_mels, frames]`
    pub fn shape(&self) -> [usize; 2] {
        [self.n_mels, self.frames]
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    /// Values of one mel bin across all frames.
    pub fn row(&self, mel: usize) -> Option<&[f32]> {
        let start = mel.checked_mul(self.frames)?;
        self.data.get(start..start.checked_add(self.frames)?)
    }
}

/// Everything the synthesizer produces for one request.
///
/// `durations` is per input token; `pitch` and `energy` follow whatever
/// resolution the model predicts them at.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrogramBundle {
    pub mel: MelSpectrogram,
    pub durations: Vec<f32>,
    pub pitch: Vec<f32>,
    pub energy: Vec<f32>,
}

impl SpectrogramBundle {
    /// Bundle carrying only a spectrogram.
    pub fn from_mel(mel: MelSpectrogram) -> Self {
        Self {
            mel,
            durations: Vec::new(),
            pitch: Vec::new(),
            energy: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_controls_match_demo_settings() {
        let controls = ProsodyControls::default();
        assert_eq!(controls.pace, 1.15);
        assert_eq!(controls.pitch_rate, 1.0);
        assert_eq!(controls.energy_rate, 1.1);
    }

    #[test]
    fn mel_rejects_mismatched_shape() {
        assert!(MelSpectrogram::new(80, 3, vec![0.0; 240]).is_some());
        assert!(MelSpectrogram::new(80, 3, vec![0.0; 239]).is_none());
    }

    #[test]
    fn mel_rows_are_contiguous() {
        let mel = MelSpectrogram::new(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        assert_eq!(mel.shape(), [2, 3]);
        assert_eq!(mel.row(1), Some(&[4.0, 5.0, 6.0][..]));
        assert_eq!(mel.row(2), None);
        assert_eq!(mel.row(usize::MAX / 3), None);
    }

    #[test]
    fn empty_mel_has_no_frames() {
        let mel = MelSpectrogram::empty(80);
        assert!(mel.is_empty());
        assert_eq!(mel.shape(), [80, 0]);
        assert_eq!(mel.row(0), Some(&[][..]));
    }
}
