use std::time::Instant;

use crate::audio::{self, AudioArtifact, Waveform};
use crate::error::SpeechError;
use crate::progress::{Checkpoint, ProgressReporter};
use crate::provider::{ModelLoader, ModelPair, ModelProvider};
use crate::spectrogram::{ProsodyControls, SpectrogramBundle};
use crate::text::InputText;

/// Vocoder hop length: one output step per spectrogram frame, no trimming.
pub const HOP_LENGTH: usize = 1;

/// Text-to-audio request driver.
///
/// Owns the model provider, so everything a request depends on is reachable
/// from one value. Requests run synchronously: synthesis, vocoding and
/// post-processing each finish before the next starts, and the first error
/// aborts the whole request.
#[derive(Debug)]
pub struct Pipeline {
    provider: ModelProvider,
    controls: ProsodyControls,
}

impl Pipeline {
    pub fn new(loader: impl ModelLoader + 'static) -> Self {
        Self::with_provider(ModelProvider::new(loader))
    }

    pub fn with_provider(provider: ModelProvider) -> Self {
        Self {
            provider,
            controls: ProsodyControls::default(),
        }
    }

    pub fn controls(&self) -> &ProsodyControls {
        &self.controls
    }

    /// Load the models now rather than on the first request.
    pub fn load_models(&self) -> Result<&ModelPair, SpeechError> {
        self.provider.load_models()
    }

    /// Turn `text` into a playable WAV buffer.
    ///
    /// Text whose trimmed length is five characters or fewer is rejected
    /// with [`SpeechError::Validation`] before models are touched or any
    /// progress is reported.
    pub fn run(
        &self,
        text: &str,
        reporter: &mut dyn ProgressReporter,
    ) -> Result<AudioArtifact, SpeechError> {
        let text = InputText::new(text)?;
        let models = self.provider.load_models()?;

        let start = Instant::now();
        Checkpoint::ParsingText.emit(reporter);
        log::info!("Generating speech for: {}", text.preview(10));

        let bundle = self.synthesize(models, &text, reporter)?;
        let waveform = self.vocode(models, bundle, reporter)?;
        let artifact = self.postprocess(waveform, reporter)?;

        log::info!("Time taken: {:.6} seconds", start.elapsed().as_secs_f64());
        Ok(artifact)
    }

    fn synthesize(
        &self,
        models: &ModelPair,
        text: &InputText,
        reporter: &mut dyn ProgressReporter,
    ) -> Result<SpectrogramBundle, SpeechError> {
        Checkpoint::ExtractingMel.emit(reporter);
        let bundle = models.synthesizer.synthesize(text, &self.controls)?;
        log::debug!(
            "Mel output shape: {:?} ({} durations)",
            bundle.mel.shape(),
            bundle.durations.len()
        );
        Ok(bundle)
    }

    fn vocode(
        &self,
        models: &ModelPair,
        bundle: SpectrogramBundle,
        reporter: &mut dyn ProgressReporter,
    ) -> Result<Waveform, SpeechError> {
        Checkpoint::ExtractingWaveforms.emit(reporter);
        let waveform = models.vocoder.vocode(&bundle.mel, HOP_LENGTH)?;
        Checkpoint::WaveformsReady.emit(reporter);
        log::debug!(
            "Waveform: {} samples ({:.2}s)",
            waveform.len(),
            waveform.duration_secs()
        );
        Ok(waveform)
    }

    fn postprocess(
        &self,
        waveform: Waveform,
        reporter: &mut dyn ProgressReporter,
    ) -> Result<AudioArtifact, SpeechError> {
        Checkpoint::PostProcessing.emit(reporter);
        let artifact = audio::postprocess(waveform)?;
        Checkpoint::Done.emit(reporter);
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SAMPLE_RATE;
    use crate::error::{Stage, ValidationError};
    use crate::spectrogram::MelSpectrogram;
    use crate::{Synthesizer, Vocoder};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    type CallLog = Arc<Mutex<Vec<&'static str>>>;

    struct MockSynthesizer {
        calls: CallLog,
        fail: bool,
    }

    impl Synthesizer for MockSynthesizer {
        fn synthesize(
            &self,
            text: &InputText,
            controls: &ProsodyControls,
        ) -> Result<SpectrogramBundle, SpeechError> {
            self.calls.lock().unwrap().push("synthesize");
            assert_eq!(*controls, ProsodyControls::default());
            assert!(!text.as_str().is_empty());
            if self.fail {
                return Err(SpeechError::inference(Stage::Synthesis, "resource exhausted"));
            }
            let mel = MelSpectrogram::new(80, 86, vec![-4.0; 80 * 86]).unwrap();
            Ok(SpectrogramBundle {
                mel,
                durations: vec![4.0; 22],
                pitch: vec![0.0; 22],
                energy: vec![0.0; 22],
            })
        }
    }

    struct MockVocoder {
        calls: CallLog,
    }

    impl Vocoder for MockVocoder {
        fn vocode(&self, mel: &MelSpectrogram, hop_len: usize) -> Result<Waveform, SpeechError> {
            self.calls.lock().unwrap().push("vocode");
            assert_eq!(mel.shape(), [80, 86]);
            assert_eq!(hop_len, HOP_LENGTH);
            Ok(Waveform::silence(SAMPLE_RATE as usize))
        }
    }

    struct Harness {
        pipeline: Pipeline,
        calls: CallLog,
        loads: Arc<AtomicUsize>,
    }

    fn harness(fail_synthesis: bool) -> Harness {
        let calls: CallLog = Arc::default();
        let loads = Arc::new(AtomicUsize::new(0));
        let (call_log, counter) = (Arc::clone(&calls), Arc::clone(&loads));
        let pipeline = Pipeline::new(move || -> Result<ModelPair, SpeechError> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(ModelPair::new(
                MockSynthesizer {
                    calls: Arc::clone(&call_log),
                    fail: fail_synthesis,
                },
                MockVocoder {
                    calls: Arc::clone(&call_log),
                },
            ))
        });
        Harness {
            pipeline,
            calls,
            loads,
        }
    }

    #[derive(Default)]
    struct Recorder {
        events: Vec<(u8, Option<String>)>,
    }

    impl ProgressReporter for Recorder {
        fn report(&mut self, percent: u8, status: Option<&str>) {
            self.events.push((percent, status.map(str::to_string)));
        }
    }

    impl Recorder {
        fn percents(&self) -> Vec<u8> {
            self.events.iter().map(|(p, _)| *p).collect()
        }

        fn statuses(&self) -> Vec<&str> {
            self.events.iter().filter_map(|(_, s)| s.as_deref()).collect()
        }
    }

    #[test]
    fn short_text_is_rejected_without_running_stages() {
        let h = harness(false);
        for text in ["", "     ", "abcde", "  abcd  ", "hi"] {
            let mut recorder = Recorder::default();
            let err = h.pipeline.run(text, &mut recorder).unwrap_err();
            assert!(matches!(
                err,
                SpeechError::Validation(ValidationError::TooShort { .. })
            ));
            assert_eq!(err.user_message(), "text needs to be over 5 characters");
            assert!(recorder.events.is_empty());
        }
        assert!(h.calls.lock().unwrap().is_empty());
        assert_eq!(h.loads.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn six_character_text_runs_the_pipeline() {
        let h = harness(false);
        assert!(h.pipeline.run("abcdef", &mut Recorder::default()).is_ok());
        assert_eq!(*h.calls.lock().unwrap(), vec!["synthesize", "vocode"]);
    }

    #[test]
    fn stages_run_once_in_order() {
        let h = harness(false);
        let mut recorder = Recorder::default();
        h.pipeline
            .run("Hello, this is a test.", &mut recorder)
            .unwrap();

        assert_eq!(*h.calls.lock().unwrap(), vec!["synthesize", "vocode"]);
        assert_eq!(recorder.percents(), vec![10, 20, 40, 70, 80, 100]);
    }

    #[test]
    fn progress_sequence_and_statuses() {
        let h = harness(false);
        let mut recorder = Recorder::default();
        h.pipeline
            .run("Hello, this is a test.", &mut recorder)
            .unwrap();

        assert_eq!(recorder.percents(), vec![10, 20, 40, 70, 80, 100]);
        assert_eq!(
            recorder.statuses(),
            vec![
                "parsing text",
                "extracting mel spectrogram",
                "extracting waveforms",
                "done"
            ]
        );
    }

    #[test]
    fn silent_second_becomes_one_second_wav() {
        let h = harness(false);
        let artifact = h
            .pipeline
            .run("Hello, this is a test.", &mut Recorder::default())
            .unwrap();

        let clip = artifact.decode().unwrap();
        assert_eq!(clip.sample_rate(), SAMPLE_RATE);
        assert_eq!(clip.channels(), 1);
        assert!((clip.duration_secs() - 1.0).abs() < 1e-3);
        assert!(clip.rms() < 1.0);
    }

    #[test]
    fn models_load_once_across_requests() {
        let h = harness(false);
        assert_eq!(h.loads.load(Ordering::SeqCst), 0);
        for _ in 0..3 {
            h.pipeline
                .run("Hello, this is a test.", &mut Recorder::default())
                .unwrap();
        }
        assert_eq!(h.loads.load(Ordering::SeqCst), 1);
        assert_eq!(h.calls.lock().unwrap().len(), 6);
    }

    #[test]
    fn synthesis_failure_aborts_request() {
        let h = harness(true);
        let mut recorder = Recorder::default();
        let err = h
            .pipeline
            .run("Hello, this is a test.", &mut recorder)
            .unwrap_err();

        assert!(matches!(
            err,
            SpeechError::Inference {
                stage: Stage::Synthesis,
                ..
            }
        ));
        assert_eq!(*h.calls.lock().unwrap(), vec!["synthesize"]);
        assert_eq!(recorder.percents(), vec![10, 20]);
    }

    #[test]
    fn model_load_failure_surfaces_before_progress() {
        let pipeline = Pipeline::new(|| -> Result<ModelPair, SpeechError> {
            Err(SpeechError::model_load("synthesizer", "fastspeech2.onnx missing"))
        });
        let mut recorder = Recorder::default();
        let err = pipeline
            .run("Hello, this is a test.", &mut recorder)
            .unwrap_err();
        assert!(matches!(err, SpeechError::ModelLoad { model: "synthesizer", .. }));
        assert!(recorder.events.is_empty());
    }
}
