use super::{Morpheme, Tokenizer};
use crate::error::{Error, Result};
use crate::filter::PosRule;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

// IPADIC feature columns
const POS: usize = 0;
const SUBCATEGORY: usize = 1;
const BASE_FORM: usize = 6;
const READING: usize = 7;

/// Japanese morphological analysis through an external `mecab` binary.
///
/// One process is spawned per call; supervising a long-lived segmenter is
/// left to the deployment.
#[derive(Debug, Clone)]
pub struct MecabTokenizer {
    command: String,
    dicdir: Option<PathBuf>,
    userdic: Option<PathBuf>,
}

impl MecabTokenizer {
    pub fn new(command: impl Into<String>, dicdir: Option<PathBuf>, userdic: Option<PathBuf>) -> Self {
        Self { command: command.into(), dicdir, userdic }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.command);
        if let Some(dicdir) = &self.dicdir {
            cmd.arg("-d").arg(dicdir);
        }
        // a user dictionary is optional and may not have been compiled yet
        if let Some(userdic) = self.userdic.as_ref().filter(|p| p.exists()) {
            cmd.arg("-u").arg(userdic);
        }
        cmd.stdin(Stdio::piped()).stdout(Stdio::piped()).stderr(Stdio::piped());
        cmd
    }
}

fn feature(features: &[&str], i: usize) -> Option<String> {
    features.get(i).filter(|f| !f.is_empty() && **f != "*").map(|f| f.to_string())
}

/// Parse mecab's default output format: `surface\tpos,sub1,sub2,sub3,ctype,cform,base,reading,pron`
/// per line, sentences terminated by `EOS`.
pub fn parse_mecab_output(output: &str) -> Result<Vec<Morpheme>> {
    let mut out = Vec::new();
    for line in output.lines() {
        if line.is_empty() || line == "EOS" {
            continue;
        }
        let (surface, features) = line
            .split_once('\t')
            .ok_or_else(|| Error::Tokenize(format!("unexpected mecab line: {line}")))?;
        let features: Vec<&str> = features.split(',').collect();
        let mut m = Morpheme::new(
            surface,
            feature(&features, POS).unwrap_or_default(),
            feature(&features, SUBCATEGORY).unwrap_or_else(|| "*".into()),
        );
        m.base_form = feature(&features, BASE_FORM);
        m.reading = feature(&features, READING);
        out.push(m);
    }
    Ok(out)
}

impl Tokenizer for MecabTokenizer {
    fn tokenize(&self, text: &str) -> Result<Vec<Morpheme>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let unavailable = |e: std::io::Error| Error::TokenizerUnavailable(format!("{}: {e}", self.command));

        let mut child = self.command().spawn().map_err(unavailable)?;
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::TokenizerUnavailable(format!("{}: stdin not captured", self.command)))?;
        let input = format!("{text}\n");
        // feed from another thread so a full stdout pipe cannot stall us
        let writer = std::thread::spawn(move || stdin.write_all(input.as_bytes()));

        let output = child.wait_with_output().map_err(unavailable)?;
        match writer.join() {
            Ok(res) => res.map_err(unavailable)?,
            Err(_) => return Err(Error::TokenizerUnavailable(format!("{}: input writer panicked", self.command))),
        }
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Tokenize(format!("{} exited with {}: {}", self.command, output.status, stderr.trim())));
        }
        let stdout = String::from_utf8(output.stdout)
            .map_err(|e| Error::Tokenize(format!("mecab output is not utf-8: {e}")))?;
        parse_mecab_output(&stdout)
    }

    fn default_whitelist(&self) -> Vec<PosRule> {
        let mut rules: Vec<PosRule> = ["一般", "固有名詞", "数", "サ変接続", "形容動詞語幹", "副詞可能"]
            .into_iter()
            .map(|sub| PosRule::new("名詞", sub))
            .collect();
        rules.push(PosRule::new("動詞", "自立"));
        rules.push(PosRule::new("形容詞", "自立"));
        rules
    }

    fn name(&self) -> &'static str {
        "mecab"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "インデックス\t名詞,一般,*,*,*,*,インデックス,インデックス,インデックス\n\
作成\t名詞,サ変接続,*,*,*,*,作成,サクセイ,サクセイ\n\
し\t動詞,自立,*,*,サ変・スル,連用形,する,シ,シ\n\
ＡｄＡ\t名詞,固有名詞,組織,*,*,*,*\n\
EOS\n";

    #[test]
    fn parses_ipadic_features() {
        let ms = parse_mecab_output(SAMPLE).unwrap();
        assert_eq!(ms.len(), 4);
        assert_eq!(ms[1].pos, "名詞");
        assert_eq!(ms[1].subcategory, "サ変接続");
        assert_eq!(ms[1].reading.as_deref(), Some("サクセイ"));
        assert_eq!(ms[2].term(), "する");
    }

    #[test]
    fn unknown_words_fall_back_to_surface() {
        let ms = parse_mecab_output(SAMPLE).unwrap();
        assert_eq!(ms[3].base_form, None);
        assert_eq!(ms[3].reading, None);
        assert_eq!(ms[3].term(), "ＡｄＡ");
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(matches!(parse_mecab_output("garbage\n"), Err(Error::Tokenize(_))));
    }

    #[test]
    fn missing_binary_is_unavailable() {
        let t = MecabTokenizer::new("definitely-not-a-mecab-binary", None, None);
        assert!(matches!(t.tokenize("テスト"), Err(Error::TokenizerUnavailable(_))));
        assert!(t.tokenize("").unwrap().is_empty());
    }
}
