use std::borrow::Cow;
use std::path::Path;
use std::sync::Mutex;

use ndarray::{arr1, Array2};
use ort::inputs;
use ort::session::{Session, SessionInputValue};
use ort::value::TensorRef;

use super::session::{
    detect_input, init_session, input_names, pick_output, OnnxError, OutputTensor,
};
use super::vocab::SymbolTable;
use crate::error::{SpeechError, Stage};
use crate::spectrogram::{MelSpectrogram, ProsodyControls, SpectrogramBundle};
use crate::text::InputText;
use crate::Synthesizer;

/// Mel channels assumed when no frames come back from the model.
pub const N_MELS: usize = 80;

const TOKEN_INPUTS: &[&str] = &["tokens", "input_ids", "phonemes", "text"];
const MEL_OUTPUTS: &[&str] = &["mel", "mel_out", "mel_outputs", "mel_post"];

/// FastSpeech2-style text-to-mel graph.
///
/// Expects a token input `[1, T]` (i64) plus optional `pace`, `pitch_rate`
/// and `energy_rate` scalars `[1]` (f32). Outputs are the mel
/// `[1, n_mels, frames]` followed by durations, pitch and energy, matched by
/// name when possible and by position otherwise.
pub struct OnnxSynthesizer {
    session: Mutex<Session>,
    symbols: SymbolTable,
    tokens_input_name: String,
    prosody_inputs: [bool; 3],
}

impl OnnxSynthesizer {
    pub fn load(
        onnx_path: &Path,
        symbols: SymbolTable,
        num_threads: Option<usize>,
        cache_dir: Option<&Path>,
    ) -> Result<Self, OnnxError> {
        log::info!("Loading synthesizer from {}", onnx_path.display());
        let session = init_session(onnx_path, num_threads, cache_dir)?;

        let names = input_names(&session);
        let tokens_input_name = detect_input(&names, TOKEN_INPUTS)
            .ok_or_else(|| OnnxError::Config("synthesizer graph has no inputs".to_string()))?;
        let declares = |name: &str| names.iter().any(|n| n == name);
        let prosody_inputs = [declares("pace"), declares("pitch_rate"), declares("energy_rate")];

        log::info!(
            "Detected: tokens_input='{}', prosody inputs (pace, pitch, energy)={:?}",
            tokens_input_name,
            prosody_inputs
        );

        Ok(Self {
            session: Mutex::new(session),
            symbols,
            tokens_input_name,
            prosody_inputs,
        })
    }

    fn encode_text(
        &self,
        text: &str,
        controls: &ProsodyControls,
    ) -> Result<SpectrogramBundle, OnnxError> {
        let Some(tokens) = token_batch(&self.symbols, text)? else {
            log::warn!("No tokens produced for text: {text:?}");
            return Ok(empty_bundle());
        };

        let pace = arr1(&[controls.pace]);
        let pitch_rate = arr1(&[controls.pitch_rate]);
        let energy_rate = arr1(&[controls.energy_rate]);

        let mut feed = inputs![
            self.tokens_input_name.as_str() => TensorRef::from_array_view(tokens.view())?,
        ];
        let scalars = [
            ("pace", &pace),
            ("pitch_rate", &pitch_rate),
            ("energy_rate", &energy_rate),
        ];
        for ((name, scalar), declared) in scalars.into_iter().zip(self.prosody_inputs) {
            if declared {
                feed.push((
                    Cow::Borrowed(name),
                    SessionInputValue::from(TensorRef::from_array_view(scalar.view())?),
                ));
            }
        }

        let mut session = self.session.lock().map_err(|_| OnnxError::Poisoned)?;
        let outputs = session.run(feed)?;

        let mut tensors = Vec::new();
        for (name, value) in outputs.iter() {
            let (shape, data) = match value.try_extract_array::<f32>() {
                Ok(array) => (array.shape().to_vec(), array.iter().copied().collect()),
                Err(_) => {
                    let array = value.try_extract_array::<i64>()?;
                    (array.shape().to_vec(), array.iter().map(|&v| v as f32).collect())
                }
            };
            tensors.push(OutputTensor {
                name: name.to_string(),
                shape,
                data,
            });
        }

        bundle_from_outputs(tensors)
    }
}

/// `[1, T]` token batch for `text`, or `None` when no character maps to a
/// symbol.
fn token_batch(symbols: &SymbolTable, text: &str) -> Result<Option<Array2<i64>>, OnnxError> {
    let ids = symbols.encode(text);
    if ids.is_empty() {
        return Ok(None);
    }
    Ok(Some(Array2::from_shape_vec((1, ids.len()), ids)?))
}

/// Zero-frame bundle; vocodes to an empty waveform.
fn empty_bundle() -> SpectrogramBundle {
    SpectrogramBundle::from_mel(MelSpectrogram::empty(N_MELS))
}

/// Split the synthesizer outputs into mel, durations, pitch and energy.
///
/// The mel is matched by name, else taken from position 0. The other
/// outputs are matched by name, else by their position once the mel is
/// removed.
fn bundle_from_outputs(mut tensors: Vec<OutputTensor>) -> Result<SpectrogramBundle, OnnxError> {
    if tensors.is_empty() {
        return Err(OnnxError::Output("synthesizer returned no outputs".to_string()));
    }
    let mel_index = tensors
        .iter()
        .position(|t| MEL_OUTPUTS.contains(&t.name.as_str()))
        .unwrap_or(0);
    let mel = mel_from_output(&tensors.remove(mel_index))?;

    let aux = |names: &[&str], position: usize| {
        pick_output(&tensors, names, position)
            .map(|t| t.data.clone())
            .unwrap_or_default()
    };

    Ok(SpectrogramBundle {
        mel,
        durations: aux(&["durations", "duration", "log_durations"], 0),
        pitch: aux(&["pitch", "f0"], 1),
        energy: aux(&["energy"], 2),
    })
}

/// Squeeze leading unit dimensions and read `[n_mels, frames]`.
fn mel_from_output(tensor: &OutputTensor) -> Result<MelSpectrogram, OnnxError> {
    let dims: Vec<usize> = {
        let lead = tensor.shape.len().saturating_sub(2);
        if tensor.shape[..lead].iter().any(|&d| d != 1) {
            return Err(OnnxError::Output(format!(
                "mel output '{}' has batch shape {:?}, expected a single spectrogram",
                tensor.name, tensor.shape
            )));
        }
        tensor.shape[lead..].to_vec()
    };

    match dims.as_slice() {
        &[n_mels, frames] => MelSpectrogram::new(n_mels, frames, tensor.data.clone()).ok_or_else(|| {
            OnnxError::Output(format!(
                "mel output '{}' holds {} values for shape {:?}",
                tensor.name,
                tensor.data.len(),
                tensor.shape
            ))
        }),
        _ => Err(OnnxError::Output(format!(
            "mel output '{}' has shape {:?}, expected [1, n_mels, frames]",
            tensor.name, tensor.shape
        ))),
    }
}

impl Synthesizer for OnnxSynthesizer {
    fn synthesize(
        &self,
        text: &InputText,
        controls: &ProsodyControls,
    ) -> Result<SpectrogramBundle, SpeechError> {
        self.encode_text(text.as_str(), controls)
            .map_err(|e| SpeechError::inference(Stage::Synthesis, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(shape: Vec<usize>, data: Vec<f32>) -> OutputTensor {
        named("mel", shape, data)
    }

    fn named(name: &str, shape: Vec<usize>, data: Vec<f32>) -> OutputTensor {
        OutputTensor {
            name: name.to_string(),
            shape,
            data,
        }
    }

    #[test]
    fn reads_batched_mel() {
        let mel = mel_from_output(&output(vec![1, 2, 3], vec![0.0; 6])).unwrap();
        assert_eq!(mel.shape(), [2, 3]);
    }

    #[test]
    fn reads_unbatched_mel() {
        let mel = mel_from_output(&output(vec![4, 5], vec![0.0; 20])).unwrap();
        assert_eq!(mel.shape(), [4, 5]);
    }

    #[test]
    fn rejects_real_batches_and_vectors() {
        assert!(mel_from_output(&output(vec![2, 2, 3], vec![0.0; 12])).is_err());
        assert!(mel_from_output(&output(vec![6], vec![0.0; 6])).is_err());
        assert!(mel_from_output(&output(vec![1, 2, 3], vec![0.0; 5])).is_err());
    }

    #[test]
    fn text_without_known_symbols_yields_no_tokens() {
        let table = SymbolTable::ljspeech();
        assert!(token_batch(&table, "123 456").unwrap().is_some());
        assert!(token_batch(&table, "12345").unwrap().is_none());
        assert!(token_batch(&table, "\u{4f60}\u{597d}").unwrap().is_none());

        let bundle = empty_bundle();
        assert!(bundle.mel.is_empty());
        assert_eq!(bundle.mel.n_mels(), N_MELS);
    }

    #[test]
    fn token_batch_is_a_single_row() {
        let tokens = token_batch(&SymbolTable::ljspeech(), "Hi!").unwrap().unwrap();
        assert_eq!(tokens.shape(), &[1, 3]);
        assert_eq!(tokens.row(0).to_vec(), vec![19, 20, 2]);
    }

    #[test]
    fn named_mel_is_excluded_from_positional_fallback() {
        let tensors = vec![
            named("output_0", vec![1, 2], vec![3.0, 4.0]),
            named("output_1", vec![1, 2], vec![120.0, 130.0]),
            named("mel_out", vec![1, 2, 3], vec![0.5; 6]),
            named("output_3", vec![1, 2], vec![0.1, 0.2]),
        ];
        let bundle = bundle_from_outputs(tensors).unwrap();
        assert_eq!(bundle.mel.shape(), [2, 3]);
        assert_eq!(bundle.durations, vec![3.0, 4.0]);
        assert_eq!(bundle.pitch, vec![120.0, 130.0]);
        assert_eq!(bundle.energy, vec![0.1, 0.2]);
    }

    #[test]
    fn outputs_match_by_name_before_position() {
        let tensors = vec![
            named("energy", vec![2], vec![0.1, 0.2]),
            named("mel", vec![1, 1, 2], vec![0.0, 1.0]),
            named("durations", vec![2], vec![1.0, 1.0]),
        ];
        let bundle = bundle_from_outputs(tensors).unwrap();
        assert_eq!(bundle.mel.shape(), [1, 2]);
        assert_eq!(bundle.durations, vec![1.0, 1.0]);
        assert_eq!(bundle.energy, vec![0.1, 0.2]);
    }

    #[test]
    fn unnamed_first_output_is_the_mel() {
        let tensors = vec![
            named("y", vec![1, 2, 2], vec![0.0; 4]),
            named("d", vec![3], vec![2.0, 2.0, 1.0]),
        ];
        let bundle = bundle_from_outputs(tensors).unwrap();
        assert_eq!(bundle.mel.shape(), [2, 2]);
        assert_eq!(bundle.durations, vec![2.0, 2.0, 1.0]);
        assert!(bundle.pitch.is_empty());
        assert!(bundle.energy.is_empty());
    }

    #[test]
    fn no_outputs_is_an_error() {
        assert!(matches!(bundle_from_outputs(Vec::new()), Err(OnnxError::Output(_))));
    }
}
