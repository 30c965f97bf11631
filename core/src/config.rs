use crate::error::{Error, Result};
use crate::filter::PosRule;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_SIMILARITY_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TokenizerConfig {
    Simple {
        #[serde(default = "yes")]
        stem: bool,
    },
    Jieba {
        #[serde(default = "yes")]
        hmm: bool,
    },
    Mecab {
        #[serde(default = "mecab_command")]
        command: String,
        #[serde(default)]
        dicdir: Option<PathBuf>,
        #[serde(default)]
        userdic: Option<PathBuf>,
    },
    None,
}

fn yes() -> bool { true }
fn mecab_command() -> String { "mecab".into() }

impl Default for TokenizerConfig {
    fn default() -> Self {
        TokenizerConfig::Simple { stem: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    pub tokenizer: TokenizerConfig,
    /// Overrides the tokenizer's own part-of-speech whitelist.
    pub pos_whitelist: Option<Vec<PosRule>>,
    /// Cap on candidates scored by a similarity search.
    pub similarity_limit: usize,
    /// Worker threads for batch indexing; 0 picks the number of CPUs.
    pub workers: usize,
    /// Field weights used when a request does not carry its own.
    pub default_weights: BTreeMap<String, f64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            tokenizer: TokenizerConfig::default(),
            pos_whitelist: None,
            similarity_limit: DEFAULT_SIMILARITY_LIMIT,
            workers: 0,
            default_weights: BTreeMap::new(),
        }
    }
}

impl Config {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.similarity_limit == 0 {
            return Err(Error::InvalidInput("similarity_limit must be positive".into()));
        }
        for (field, weight) in &self.default_weights {
            if !weight.is_finite() || *weight < 0.0 {
                return Err(Error::InvalidInput(format!("weight for {field} must be a non-negative number")));
            }
        }
        Ok(())
    }
}
