use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use super::session::OnnxError;

/// LJSpeech character set: pad, punctuation, space, lowercase letters.
pub const LJSPEECH_SYMBOLS: &str = "_-!'(),.:;? abcdefghijklmnopqrstuvwxyz";

const PAD: char = '_';

#[derive(Debug, Deserialize)]
struct SymbolConfig {
    symbols: Vec<String>,
    #[serde(default = "default_lowercase")]
    lowercase: bool,
}

fn default_lowercase() -> bool {
    true
}

/// Character to token id mapping for the synthesizer.
///
/// Token ids are positions in the symbol list.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    ids: HashMap<char, i64>,
    lowercase: bool,
}

impl SymbolTable {
    /// Load the table from the `symbols` array of a `config.json`.
    ///
    /// Every symbol must be exactly one character.
    pub fn load(config_path: &Path) -> Result<Self, OnnxError> {
        let content = std::fs::read_to_string(config_path)?;
        let config: SymbolConfig = serde_json::from_str(&content)
            .map_err(|e| OnnxError::Config(format!("Failed to parse JSON: {e}")))?;

        if config.symbols.is_empty() {
            return Err(OnnxError::Config("'symbols' is empty".to_string()));
        }

        let mut ids = HashMap::with_capacity(config.symbols.len());
        for (id, symbol) in config.symbols.iter().enumerate() {
            let mut chars = symbol.chars();
            match (chars.next(), chars.next()) {
                (Some(ch), None) => {
                    ids.insert(ch, id as i64);
                }
                _ => {
                    return Err(OnnxError::Config(format!(
                        "Symbol {symbol:?} at position {id} is not a single character"
                    )))
                }
            }
        }

        Ok(Self {
            ids,
            lowercase: config.lowercase,
        })
    }

    /// Built-in LJSpeech table, used when no `config.json` is present.
    pub fn ljspeech() -> Self {
        Self {
            ids: LJSPEECH_SYMBOLS
                .chars()
                .enumerate()
                .map(|(id, ch)| (ch, id as i64))
                .collect(),
            lowercase: true,
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Normalize `text` and map it to token ids.
    ///
    /// Characters outside the table (and the pad symbol) are dropped.
    pub fn encode(&self, text: &str) -> Vec<i64> {
        let normalized = normalize(text, self.lowercase);
        normalized
            .chars()
            .filter(|&ch| ch != PAD)
            .filter_map(|ch| self.ids.get(&ch).copied())
            .collect()
    }
}

/// Collapse whitespace runs to one space, trim, fold typographic quotes and
/// dashes to ASCII, and optionally lowercase.
pub fn normalize(text: &str, lowercase: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for word in text.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        for ch in word.chars() {
            let ch = match ch {
                '\u{2018}' | '\u{2019}' => '\'',
                '\u{201c}' | '\u{201d}' => '"',
                '\u{2013}' | '\u{2014}' => '-',
                '\u{2026}' => '.',
                other => other,
            };
            if lowercase {
                out.extend(ch.to_lowercase());
            } else {
                out.push(ch);
            }
        }
    }
    out
}
