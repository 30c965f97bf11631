//! Segmenter adapters.
//!
//! Every adapter turns UTF-8 text into [`Morpheme`] tuples. The analyzer only
//! sees the [`Tokenizer`] trait; which adapter runs is decided from
//! [`TokenizerConfig`] at startup.

mod jieba;
mod mecab;
mod simple;

pub use jieba::JiebaTokenizer;
pub use mecab::{parse_mecab_output, MecabTokenizer};
pub use simple::SimpleTokenizer;

use crate::config::TokenizerConfig;
use crate::error::Result;
use crate::filter::PosRule;
use std::sync::Arc;

/// One unit of segmenter output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Morpheme {
    pub surface: String,
    pub pos: String,
    pub subcategory: String,
    /// Dictionary form for inflected words, if the segmenter reports one.
    pub base_form: Option<String>,
    pub reading: Option<String>,
}

impl Morpheme {
    pub fn new(surface: impl Into<String>, pos: impl Into<String>, subcategory: impl Into<String>) -> Self {
        Self {
            surface: surface.into(),
            pos: pos.into(),
            subcategory: subcategory.into(),
            base_form: None,
            reading: None,
        }
    }

    /// The index key for this morpheme: base form when present, else surface.
    pub fn term(&self) -> &str {
        self.base_form.as_deref().unwrap_or(&self.surface)
    }
}

/// Capability contract for segmenters.
///
/// Empty input must yield an empty sequence, never an error.
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Result<Vec<Morpheme>>;

    /// Part-of-speech rules kept when no whitelist is configured.
    fn default_whitelist(&self) -> Vec<PosRule>;

    fn name(&self) -> &'static str;
}

/// Build the configured adapter. `None` means no tokenizer is available and
/// only unweighted field search can run.
pub fn from_config(config: &TokenizerConfig) -> Option<Arc<dyn Tokenizer>> {
    match config {
        TokenizerConfig::Simple { stem } => Some(Arc::new(SimpleTokenizer::new(*stem))),
        TokenizerConfig::Jieba { hmm } => Some(Arc::new(JiebaTokenizer::new(*hmm))),
        TokenizerConfig::Mecab { command, dicdir, userdic } => Some(Arc::new(MecabTokenizer::new(
            command.clone(),
            dicdir.clone(),
            userdic.clone(),
        ))),
        TokenizerConfig::None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn term_prefers_base_form() {
        let mut m = Morpheme::new("作成し", "動詞", "自立");
        assert_eq!(m.term(), "作成し");
        m.base_form = Some("作成する".into());
        assert_eq!(m.term(), "作成する");
    }

    #[test]
    fn none_config_builds_nothing() {
        assert!(from_config(&TokenizerConfig::None).is_none());
        let simple = from_config(&TokenizerConfig::Simple { stem: false }).unwrap();
        assert_eq!(simple.name(), "simple");
    }
}
