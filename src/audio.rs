//! Waveform post-processing.
//!
//! The vocoder's float samples go through a fixed chain before playback:
//!
//! ```text
//! Waveform (f32) ──× 32767──▶ PcmBuffer (i16) ──▶ WAV ──▶ AudioClip ──+10 dB──▶ WAV (AudioArtifact)
//! ```
//!
//! All containers are mono, 16-bit, [`SAMPLE_RATE`] Hz.

use std::io::Cursor;
use std::path::Path;

use crate::error::SpeechError;

/// Sample rate for every stage of the pipeline.
pub const SAMPLE_RATE: u32 = 22050;

/// Float to 16-bit scaling factor.
pub const PCM_SCALE: f32 = 32767.0;

/// Gain applied to the decoded clip before the final encode.
pub const GAIN_DB: f64 = 10.0;

fn wav_spec(sample_rate: u32) -> hound::WavSpec {
    hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    }
}

/// Mono float samples produced by a vocoder.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Waveform {
    /// Waveform at [`SAMPLE_RATE`].
    pub fn new(samples: Vec<f32>) -> Self {
        Self {
            samples,
            sample_rate: SAMPLE_RATE,
        }
    }

    /// `n` zero samples.
    pub fn silence(n: usize) -> Self {
        Self::new(vec![0.0; n])
    }

    /// Drop unit dimensions from a model output tensor.
    ///
    /// `[1, 1, N]`, `[1, N]` and `[N]` all become `N` samples. Returns `None`
    /// if more than one dimension is larger than one (a real batch) or the
    /// shape does not account for `data`.
    pub fn squeeze(shape: &[usize], data: Vec<f32>) -> Option<Self> {
        let wide = shape.iter().filter(|&&d| d > 1).count();
        let total: usize = shape.iter().product();
        if wide > 1 || total != data.len() {
            return None;
        }
        Some(Self::new(data))
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Scale to 16-bit PCM.
    ///
    /// Each sample is multiplied by [`PCM_SCALE`] and truncated toward zero.
    /// Values outside [-1.0, 1.0] saturate at `i16::MIN` / `i16::MAX` and
    /// NaN becomes 0 (Rust's float-to-int `as` semantics).
    pub fn to_pcm(&self) -> PcmBuffer {
        PcmBuffer {
            samples: self
                .samples
                .iter()
                .map(|&s| (s * PCM_SCALE) as i16)
                .collect(),
            sample_rate: self.sample_rate,
        }
    }
}

/// 16-bit mono PCM samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcmBuffer {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

impl PcmBuffer {
    /// Encode as a WAV container held in memory.
    pub fn to_wav(&self) -> Result<Vec<u8>, SpeechError> {
        if self.sample_rate != SAMPLE_RATE {
            return Err(SpeechError::SampleRateMismatch {
                expected: SAMPLE_RATE,
                actual: self.sample_rate,
            });
        }

        let mut bytes = Vec::with_capacity(44 + self.samples.len() * 2);
        let mut writer = hound::WavWriter::new(Cursor::new(&mut bytes), wav_spec(self.sample_rate))?;
        for &sample in &self.samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
        Ok(bytes)
    }
}

/// Decoded audio that can be edited and re-encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    spec: hound::WavSpec,
    samples: Vec<i16>,
}

impl AudioClip {
    /// Decode a 16-bit integer WAV container.
    pub fn from_wav(bytes: &[u8]) -> Result<Self, SpeechError> {
        let reader = hound::WavReader::new(Cursor::new(bytes))?;
        let spec = reader.spec();
        if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
            return Err(SpeechError::Encoding(hound::Error::Unsupported));
        }
        let samples = reader.into_samples::<i16>().collect::<Result<Vec<_>, _>>()?;
        Ok(Self { spec, samples })
    }

    pub fn sample_rate(&self) -> u32 {
        self.spec.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.spec.channels
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn duration_secs(&self) -> f64 {
        let frames = self.samples.len() / self.spec.channels.max(1) as usize;
        frames as f64 / self.spec.sample_rate as f64
    }

    /// Root mean square amplitude in sample units. Zero for an empty clip.
    pub fn rms(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.samples.iter().map(|&s| (s as f64).powi(2)).sum();
        (sum / self.samples.len() as f64).sqrt()
    }

    /// Scale every sample by `10^(db / 20)`.
    ///
    /// Products are clamped to the i16 range and then floored, so loud
    /// input clips instead of wrapping around and negative samples round
    /// toward minus infinity.
    pub fn apply_gain_db(&mut self, db: f64) {
        let factor = 10f64.powf(db / 20.0);
        for sample in &mut self.samples {
            let scaled = (*sample as f64 * factor).clamp(i16::MIN as f64, i16::MAX as f64);
            *sample = scaled.floor() as i16;
        }
    }

    /// Encode back into the container format it was decoded from.
    pub fn to_wav(&self) -> Result<Vec<u8>, SpeechError> {
        let mut bytes = Vec::with_capacity(44 + self.samples.len() * 2);
        let mut writer = hound::WavWriter::new(Cursor::new(&mut bytes), self.spec)?;
        for &sample in &self.samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
        Ok(bytes)
    }
}

/// Final playable WAV buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioArtifact {
    bytes: Vec<u8>,
}

impl AudioArtifact {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Reader positioned at the first byte of the container.
    pub fn reader(&self) -> Cursor<&[u8]> {
        Cursor::new(self.bytes.as_slice())
    }

    pub fn into_reader(self) -> Cursor<Vec<u8>> {
        Cursor::new(self.bytes)
    }

    pub fn decode(&self) -> Result<AudioClip, SpeechError> {
        AudioClip::from_wav(&self.bytes)
    }

    pub fn write_wav(&self, path: &Path) -> Result<(), SpeechError> {
        std::fs::write(path, &self.bytes)?;
        Ok(())
    }
}

/// Run the post-processing chain with the standard [`GAIN_DB`] boost.
pub fn postprocess(waveform: Waveform) -> Result<AudioArtifact, SpeechError> {
    postprocess_with_gain(waveform, GAIN_DB)
}

/// Run the post-processing chain with an explicit gain in decibels.
pub fn postprocess_with_gain(waveform: Waveform, gain_db: f64) -> Result<AudioArtifact, SpeechError> {
    let pcm = waveform.to_pcm();
    let wav = pcm.to_wav()?;
    let mut clip = AudioClip::from_wav(&wav)?;
    clip.apply_gain_db(gain_db);

    Ok(AudioArtifact {
        bytes: clip.to_wav()?,
    })
}
