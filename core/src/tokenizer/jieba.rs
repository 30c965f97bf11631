use super::{Morpheme, Tokenizer};
use crate::error::Result;
use crate::filter::PosRule;
use jieba_rs::Jieba;

/// Chinese segmenter backed by jieba's bundled dictionary.
///
/// Jieba tags are ICTCLAS-style (`n`, `nr`, `ns`, `v`, `vn`, `a`, `eng`, ...).
/// The leading class letter becomes the morpheme's pos and the full tag its
/// subcategory, so whitelists can select a whole class or one tag.
pub struct JiebaTokenizer {
    jieba: Jieba,
    hmm: bool,
}

impl JiebaTokenizer {
    pub fn new(hmm: bool) -> Self {
        Self { jieba: Jieba::new(), hmm }
    }
}

fn tag_class(tag: &str) -> &str {
    match tag {
        "eng" => "eng",
        _ => tag.get(..1).unwrap_or(tag),
    }
}

impl Tokenizer for JiebaTokenizer {
    fn tokenize(&self, text: &str) -> Result<Vec<Morpheme>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let morphemes = self
            .jieba
            .tag(text, self.hmm)
            .into_iter()
            .filter(|t| !t.word.trim().is_empty())
            .map(|t| Morpheme::new(t.word, tag_class(t.tag), t.tag))
            .collect();
        Ok(morphemes)
    }

    fn default_whitelist(&self) -> Vec<PosRule> {
        ["n", "v", "a", "eng"].into_iter().map(PosRule::any).collect()
    }

    fn name(&self) -> &'static str {
        "jieba"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_is_leading_letter() {
        assert_eq!(tag_class("nr"), "n");
        assert_eq!(tag_class("vn"), "v");
        assert_eq!(tag_class("eng"), "eng");
        assert_eq!(tag_class(""), "");
    }

    #[test]
    fn segments_chinese_text() {
        let t = JiebaTokenizer::new(true);
        let out = t.tokenize("我们支持中国的复兴").unwrap();
        assert!(!out.is_empty());
        assert!(out.iter().all(|m| !m.surface.trim().is_empty()));
        assert!(out.iter().any(|m| m.pos == "n" || m.pos == "v"));
    }

    #[test]
    fn blank_input_is_empty() {
        assert!(JiebaTokenizer::new(false).tokenize("  ").unwrap().is_empty());
    }
}
