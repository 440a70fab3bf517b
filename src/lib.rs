//! # speech-demo
//!
//! A small text-to-speech pipeline: a synthesizer turns text into a
//! mel-spectrogram, a vocoder turns the spectrogram into a waveform, and the
//! waveform is packed into a 16-bit WAV buffer with a +10 dB boost.
//!
//! ## Features
//!
//! - **Pluggable models**: anything implementing [`Synthesizer`] and
//!   [`Vocoder`] can drive the pipeline
//! - **ONNX backend**: FastSpeech2 + HiFi-GAN graphs via ONNX Runtime
//!   (`onnx` feature)
//! - **Progress reporting**: fixed 10/20/40/70/80/100 checkpoints through
//!   [`ProgressReporter`]
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! speech-demo = { version = "2026.10", features = ["onnx"] }
//! ```
//!
//! ```ignore
//! use std::path::PathBuf;
//! use speech_demo::{engines::onnx::OnnxModelLoader, LogProgress, Pipeline};
//!
//! let pipeline = Pipeline::new(OnnxModelLoader::new(PathBuf::from("pretrained_models")));
//! let artifact = pipeline.run("Hello, this is a test.", &mut LogProgress)?;
//! artifact.write_wav(&PathBuf::from("output.wav"))?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod audio;
pub mod engines;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod provider;
pub mod spectrogram;
pub mod text;

pub use audio::{AudioArtifact, AudioClip, PcmBuffer, Waveform, SAMPLE_RATE};
pub use error::{SpeechError, Stage, ValidationError};
pub use pipeline::Pipeline;
pub use progress::{LogProgress, NoProgress, ProgressReporter};
pub use provider::{ModelLoader, ModelPair, ModelProvider};
pub use spectrogram::{MelSpectrogram, ProsodyControls, SpectrogramBundle};
pub use text::InputText;

/// Text-to-spectrogram model.
///
/// Implementations are shared read-only between requests, hence `&self`.
/// Any interior locking a backend needs stays inside it.
pub trait Synthesizer: Send + Sync {
    /// Produce a mel-spectrogram and the prosody tensors for `text`.
    ///
    /// The number of frames comes from the model's own duration prediction.
    fn synthesize(
        &self,
        text: &InputText,
        controls: &ProsodyControls,
    ) -> Result<SpectrogramBundle, SpeechError>;
}

/// Spectrogram-to-waveform model.
pub trait Vocoder: Send + Sync {
    /// Decode one spectrogram into one waveform at [`SAMPLE_RATE`].
    fn vocode(&self, mel: &MelSpectrogram, hop_len: usize) -> Result<Waveform, SpeechError>;
}
