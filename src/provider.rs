use once_cell::sync::OnceCell;

use crate::error::SpeechError;
use crate::{Synthesizer, Vocoder};

/// The two models a request needs.
pub struct ModelPair {
    pub synthesizer: Box<dyn Synthesizer>,
    pub vocoder: Box<dyn Vocoder>,
}

impl ModelPair {
    pub fn new(synthesizer: impl Synthesizer + 'static, vocoder: impl Vocoder + 'static) -> Self {
        Self {
            synthesizer: Box::new(synthesizer),
            vocoder: Box::new(vocoder),
        }
    }
}

impl std::fmt::Debug for ModelPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelPair")
            .field("synthesizer", &"<Synthesizer>")
            .field("vocoder", &"<Vocoder>")
            .finish()
    }
}

/// Expensive one-time construction of a [`ModelPair`].
pub trait ModelLoader: Send + Sync {
    fn load(&self) -> Result<ModelPair, SpeechError>;
}

impl<F> ModelLoader for F
where
    F: Fn() -> Result<ModelPair, SpeechError> + Send + Sync,
{
    fn load(&self) -> Result<ModelPair, SpeechError> {
        self()
    }
}

/// Loads the model pair on first use and hands out the same instances after.
///
/// A failed load is not cached: the error goes back to the caller and the
/// provider stays empty.
pub struct ModelProvider {
    loader: Box<dyn ModelLoader>,
    models: OnceCell<ModelPair>,
}

impl ModelProvider {
    pub fn new(loader: impl ModelLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            models: OnceCell::new(),
        }
    }

    pub fn load_models(&self) -> Result<&ModelPair, SpeechError> {
        self.models.get_or_try_init(|| {
            log::info!("Loading models...");
            let models = self.loader.load()?;
            log::info!("Models loaded");
            Ok(models)
        })
    }

    pub fn is_loaded(&self) -> bool {
        self.models.get().is_some()
    }
}

impl std::fmt::Debug for ModelProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelProvider")
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
