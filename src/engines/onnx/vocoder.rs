use std::borrow::Cow;
use std::path::Path;
use std::sync::Mutex;

use ndarray::{arr1, Array3};
use ort::inputs;
use ort::session::{Session, SessionInputValue};
use ort::value::TensorRef;

use super::session::{detect_input, init_session, input_names, OnnxError};
use crate::audio::Waveform;
use crate::error::{SpeechError, Stage};
use crate::spectrogram::MelSpectrogram;
use crate::Vocoder;

const MEL_INPUTS: &[&str] = &["mel", "mels", "spectrogram", "x"];
const HOP_INPUTS: &[&str] = &["hop_len", "hop_length"];

/// HiFi-GAN-style mel-to-waveform graph.
///
/// Takes the mel as `[1, n_mels, frames]` (f32) and returns one waveform in
/// any of the shapes [`Waveform::squeeze`] accepts.
pub struct OnnxVocoder {
    session: Mutex<Session>,
    mel_input_name: String,
    hop_input_name: Option<String>,
}

impl OnnxVocoder {
    pub fn load(
        onnx_path: &Path,
        num_threads: Option<usize>,
        cache_dir: Option<&Path>,
    ) -> Result<Self, OnnxError> {
        log::info!("Loading vocoder from {}", onnx_path.display());
        let session = init_session(onnx_path, num_threads, cache_dir)?;

        let names = input_names(&session);
        let mel_input_name = detect_input(&names, MEL_INPUTS)
            .ok_or_else(|| OnnxError::Config("vocoder graph has no inputs".to_string()))?;
        let hop_input_name = HOP_INPUTS
            .iter()
            .find(|h| names.iter().any(|n| n == *h))
            .map(|h| h.to_string());

        log::info!(
            "Detected: mel_input='{}', hop_input={:?}",
            mel_input_name,
            hop_input_name
        );

        Ok(Self {
            session: Mutex::new(session),
            mel_input_name,
            hop_input_name,
        })
    }

    fn decode(&self, mel: &MelSpectrogram, hop_len: usize) -> Result<Waveform, OnnxError> {
        let Some(mel_arr) = mel_batch(mel)? else {
            log::warn!("Empty spectrogram, returning an empty waveform");
            return Ok(Waveform::new(Vec::new()));
        };
        let hop_arr = arr1(&[hop_len as i64]);

        let mut feed = inputs![
            self.mel_input_name.as_str() => TensorRef::from_array_view(mel_arr.view())?,
        ];
        if let Some(name) = &self.hop_input_name {
            feed.push((
                Cow::Borrowed(name.as_str()),
                SessionInputValue::from(TensorRef::from_array_view(hop_arr.view())?),
            ));
        }

        let mut session = self.session.lock().map_err(|_| OnnxError::Poisoned)?;
        let outputs = session.run(feed)?;

        let first_output = outputs
            .iter()
            .next()
            .ok_or_else(|| OnnxError::Output("vocoder returned no outputs".to_string()))?;
        let audio = first_output.1.try_extract_array::<f32>()?;
        let shape = audio.shape().to_vec();

        Waveform::squeeze(&shape, audio.iter().copied().collect()).ok_or_else(|| {
            OnnxError::Output(format!(
                "expected a single waveform, got output shape {shape:?}"
            ))
        })
    }
}

/// `[1, n_mels, frames]` input batch, or `None` for a zero-frame mel.
fn mel_batch(mel: &MelSpectrogram) -> Result<Option<Array3<f32>>, OnnxError> {
    if mel.is_empty() {
        return Ok(None);
    }
    let [n_mels, frames] = mel.shape();
    Ok(Some(Array3::from_shape_vec(
        (1, n_mels, frames),
        mel.data().to_vec(),
    )?))
}

impl Vocoder for OnnxVocoder {
    fn vocode(&self, mel: &MelSpectrogram, hop_len: usize) -> Result<Waveform, SpeechError> {
        self.decode(mel, hop_len)
            .map_err(|e| SpeechError::inference(Stage::Vocoding, e))
    }
}
