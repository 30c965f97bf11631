use searchcore::normalize::normalize;
use searchcore::tokenizer::{SimpleTokenizer, Tokenizer};

fn terms(t: &SimpleTokenizer, text: &str) -> Vec<String> {
    t.tokenize(&normalize(text)).unwrap().iter().map(|m| m.term().to_string()).collect()
}

#[test]
fn it_normalizes_and_stems() {
    let words = terms(&SimpleTokenizer::new(true), "Running Runners RUN! The café's menu.");
    // Stemming to "run" should appear
    assert!(words.contains(&"run".to_string()));
    // Unicode normalization keeps accented letters intact
    assert!(words.iter().any(|w| w.starts_with("caf")));
}

#[test]
fn it_filters_stopwords() {
    let words = terms(&SimpleTokenizer::new(false), "The quick brown fox and the lazy dog");
    assert!(!words.contains(&"the".to_string()));
    assert!(!words.contains(&"and".to_string()));
    assert!(words.contains(&"fox".to_string()));
}

#[test]
fn fullwidth_letters_reach_the_tokenizer_as_ascii() {
    let words = terms(&SimpleTokenizer::new(false), "ＲＵＳＴ　ｉｓ　ＦＡＳＴ");
    assert_eq!(words, vec!["rust", "fast"]);
}
