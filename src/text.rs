use crate::error::ValidationError;

/// Trimmed text must be strictly longer than this many characters.
pub const MIN_TEXT_CHARS: usize = 5;

/// Input beyond this many characters is cut off, like the text box does.
pub const MAX_TEXT_CHARS: usize = 400;

/// Sample inputs offered by the demo front-end.
pub const SAMPLE_PARAGRAPHS: [&str; 2] = [
    "This is a sample paragraph for testing the text to speech functionality. \
     You can copy and paste this text to see how the system works. \
     The model should generate speech based on this input text.",
    "The rapid advancement of technology has led to significant changes in our daily lives. \
     Innovations in communication, transportation, and entertainment have made the world \
     more connected and accessible than ever before.",
];

/// Text accepted for synthesis.
///
/// Construction truncates to [`MAX_TEXT_CHARS`] characters and then requires
/// the trimmed text to be longer than [`MIN_TEXT_CHARS`] characters. Lengths
/// count `char`s, not bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputText(String);

impl InputText {
    pub fn new(text: &str) -> Result<Self, ValidationError> {
        let text = match text.char_indices().nth(MAX_TEXT_CHARS) {
            Some((cut, _)) => {
                log::warn!(
                    "Input exceeds {MAX_TEXT_CHARS} characters, truncating {} trailing bytes",
                    text.len() - cut
                );
                &text[..cut]
            }
            None => text,
        };

        let chars = text.trim().chars().count();
        if chars <= MIN_TEXT_CHARS {
            return Err(ValidationError::TooShort { chars });
        }

        Ok(Self(text.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First `n` characters, for log lines.
    pub fn preview(&self, n: usize) -> &str {
        match self.0.char_indices().nth(n) {
            Some((cut, _)) => &self.0[..cut],
            None => &self.0,
        }
    }
}

impl AsRef<str> for InputText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
