use super::{Morpheme, Tokenizer};
use crate::error::Result;
use crate::filter::PosRule;
use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

/// Part of speech reported for every token; this segmenter does no tagging.
pub const WORD_POS: &str = "word";

lazy_static! {
    static ref RE: Regex = Regex::new(r"(?u)\p{L}[\p{L}\p{N}_']*|\p{N}+").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","aren't","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","can't","cannot","could","couldn't",
            "did","didn't","do","does","doesn't","doing","don't","down","during",
            "each","few","for","from","further",
            "had","hadn't","has","hasn't","have","haven't","having","he","he'd","he'll","he's","her","here","here's","hers","herself","him","himself","his","how","how's",
            "i","i'd","i'll","i'm","i've","if","in","into","is","isn't","it","it's","its","itself",
            "let's","me","more","most","mustn't","my","myself",
            "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
            "same","she","she'd","she'll","she's","should","shouldn't","so","some","such",
            "than","that","that's","the","their","theirs","them","themselves","then","there","there's","these","they","they'd","they'll","they're","they've","this","those","through","to","too",
            "under","until","up","very",
            "was","wasn't","we","we'd","we'll","we're","we've","were","weren't","what","what's","when","when's","where","where's","which","while","who","who's","whom","why","why's","with","won't","would","wouldn't",
            "you","you'd","you'll","you're","you've","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
}

fn is_stopword(token: &str) -> bool { STOPWORDS.contains(token) }

/// Whitespace-script segmenter: NFKC, lowercase, stop-word removal and,
/// optionally, English stemming as the base form.
#[derive(Debug, Clone)]
pub struct SimpleTokenizer {
    stem: bool,
}

impl SimpleTokenizer {
    pub fn new(stem: bool) -> Self {
        Self { stem }
    }
}

impl Default for SimpleTokenizer {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Tokenizer for SimpleTokenizer {
    fn tokenize(&self, text: &str) -> Result<Vec<Morpheme>> {
        let normalized = text.nfkc().collect::<String>().to_lowercase();
        let mut out = Vec::new();
        for mat in RE.find_iter(&normalized) {
            let token = mat.as_str();
            if is_stopword(token) { continue; }
            let mut m = Morpheme::new(token, WORD_POS, "*");
            if self.stem {
                let stem = STEMMER.stem(token);
                if stem != token {
                    m.base_form = Some(stem.into_owned());
                }
            }
            out.push(m);
        }
        Ok(out)
    }

    fn default_whitelist(&self) -> Vec<PosRule> {
        vec![PosRule::any(WORD_POS)]
    }

    fn name(&self) -> &'static str {
        "simple"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(t: &SimpleTokenizer, text: &str) -> Vec<String> {
        t.tokenize(text).unwrap().iter().map(|m| m.term().to_string()).collect()
    }

    #[test]
    fn stems_to_base_form() {
        let t = SimpleTokenizer::new(true);
        let toks = t.tokenize("Running, runner's run!").unwrap();
        let running = toks.iter().find(|m| m.surface == "running").unwrap();
        assert_eq!(running.term(), "run");
    }

    #[test]
    fn without_stemming_surface_is_the_term() {
        let t = SimpleTokenizer::new(false);
        assert_eq!(terms(&t, "apple apple banana"), vec!["apple", "apple", "banana"]);
    }

    #[test]
    fn keeps_numbers() {
        let t = SimpleTokenizer::new(false);
        assert_eq!(terms(&t, "windows 10"), vec!["windows", "10"]);
    }

    #[test]
    fn empty_input_is_not_an_error() {
        assert!(SimpleTokenizer::default().tokenize("").unwrap().is_empty());
    }
}
