//! ONNX Runtime backend: FastSpeech2 synthesizer + HiFi-GAN vocoder.
//!
//! Both networks are exported LJSpeech models (22050 Hz, 80 mel channels)
//! run on the CPU execution provider.
//!
//! # Model Directory Layout
//!
//! ```text
//! pretrained_models/
//! ├── fastspeech2.onnx   # text → mel (+ durations, pitch, energy)
//! ├── hifigan.onnx       # mel → waveform
//! └── config.json        # optional {"symbols": [...]}; LJSpeech characters otherwise
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use speech_demo::engines::onnx::{OnnxModelLoader, OnnxModelParamsBuilder};
//! use speech_demo::{NoProgress, Pipeline};
//! use std::path::PathBuf;
//!
//! let params = OnnxModelParamsBuilder::default()
//!     .num_threads(4usize)
//!     .optimized_model_cache_dir(PathBuf::from("/tmp/speech-cache"))
//!     .build()?;
//! let pipeline = Pipeline::new(OnnxModelLoader::with_params(
//!     PathBuf::from("pretrained_models"),
//!     params,
//! ));
//!
//! pipeline.load_models()?;
//! let artifact = pipeline.run("Hello, this is a test.", &mut NoProgress)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod session;
pub mod synthesizer;
pub mod vocab;
pub mod vocoder;

use std::path::PathBuf;

use derive_builder::Builder;

use crate::error::SpeechError;
use crate::provider::{ModelLoader, ModelPair};

pub use session::OnnxError;
pub use synthesizer::OnnxSynthesizer;
pub use vocab::SymbolTable;
pub use vocoder::OnnxVocoder;

/// Parameters for locating and opening the two graphs.
#[derive(Debug, Clone, PartialEq, Builder)]
#[builder(default)]
pub struct OnnxModelParams {
    /// Synthesizer graph, relative to the model directory.
    #[builder(setter(into))]
    pub synthesizer_file: String,
    /// Vocoder graph, relative to the model directory.
    #[builder(setter(into))]
    pub vocoder_file: String,
    /// Symbol table, relative to the model directory. Missing file falls
    /// back to [`SymbolTable::ljspeech`].
    #[builder(setter(into))]
    pub symbols_file: String,
    /// Intra/inter-op thread count. `None` leaves the ORT default.
    #[builder(setter(strip_option))]
    pub num_threads: Option<usize>,
    /// Writable directory for Level3-optimized graphs.
    #[builder(setter(into, strip_option))]
    pub optimized_model_cache_dir: Option<PathBuf>,
}

impl Default for OnnxModelParams {
    fn default() -> Self {
        Self {
            synthesizer_file: "fastspeech2.onnx".to_string(),
            vocoder_file: "hifigan.onnx".to_string(),
            symbols_file: "config.json".to_string(),
            num_threads: None,
            optimized_model_cache_dir: None,
        }
    }
}

/// [`ModelLoader`] reading both graphs from one directory.
#[derive(Debug, Clone)]
pub struct OnnxModelLoader {
    model_dir: PathBuf,
    params: OnnxModelParams,
}

impl OnnxModelLoader {
    pub fn new(model_dir: PathBuf) -> Self {
        Self::with_params(model_dir, OnnxModelParams::default())
    }

    pub fn with_params(model_dir: PathBuf, params: OnnxModelParams) -> Self {
        Self { model_dir, params }
    }

    fn symbols(&self) -> Result<SymbolTable, OnnxError> {
        let path = self.model_dir.join(&self.params.symbols_file);
        if path.exists() {
            log::info!("Loading symbols from {}", path.display());
            SymbolTable::load(&path)
        } else {
            log::warn!("{} not found, using LJSpeech symbols", path.display());
            Ok(SymbolTable::ljspeech())
        }
    }
}

impl ModelLoader for OnnxModelLoader {
    fn load(&self) -> Result<ModelPair, SpeechError> {
        let threads = self.params.num_threads;
        let cache_dir = self.params.optimized_model_cache_dir.as_deref();

        let symbols = self
            .symbols()
            .map_err(|e| SpeechError::model_load("synthesizer", e))?;
        let synthesizer = OnnxSynthesizer::load(
            &self.model_dir.join(&self.params.synthesizer_file),
            symbols,
            threads,
            cache_dir,
        )
        .map_err(|e| SpeechError::model_load("synthesizer", e))?;

        let vocoder = OnnxVocoder::load(
            &self.model_dir.join(&self.params.vocoder_file),
            threads,
            cache_dir,
        )
        .map_err(|e| SpeechError::model_load("vocoder", e))?;

        Ok(ModelPair::new(synthesizer, vocoder))
    }
}
