//! Structured MATCH_ALL / MATCH_ANY expressions over resolved key/value pairs.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::context::RuleContext;
use crate::error::{Result, SignError};
use crate::placeholder::PlaceholderResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatcherType {
    MatchAll,
    MatchAny,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatcherOperation {
    #[default]
    Equals,
    EqualsIgnoreCase,
    NotEquals,
    Contains,
    StartsWith,
    EndsWith,
    /// `value` is a regex that must match somewhere in `key`.
    Regex,
    /// `value` is a regex that must match the whole `key`.
    #[serde(alias = "MATCHES_PATTERN")]
    Pattern,
}

impl MatcherOperation {
    fn is_regex(self) -> bool {
        matches!(self, MatcherOperation::Regex | MatcherOperation::Pattern)
    }

    fn compile(self, value: &str) -> Result<Regex> {
        let source = match self {
            MatcherOperation::Pattern => format!("^(?:{value})$"),
            _ => value.to_string(),
        };
        Regex::new(&source).map_err(|source| SignError::InvalidPattern {
            pattern: value.to_string(),
            source,
        })
    }

    /// Compare `key` against `value`, before negation.
    /// An invalid regex never matches.
    pub fn compare(self, key: &str, value: &str) -> bool {
        match self {
            MatcherOperation::Equals => key == value,
            MatcherOperation::EqualsIgnoreCase => key.to_lowercase() == value.to_lowercase(),
            MatcherOperation::NotEquals => key != value,
            MatcherOperation::Contains => key.contains(value),
            MatcherOperation::StartsWith => key.starts_with(value),
            MatcherOperation::EndsWith => key.ends_with(value),
            MatcherOperation::Regex | MatcherOperation::Pattern => match self.compile(value) {
                Ok(re) => re.is_match(key),
                Err(err) => {
                    warn!(error = %err, "invalid resolved pattern");
                    false
                }
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatcherConfigEntry {
    pub key: String,
    #[serde(default)]
    pub operation: MatcherOperation,
    pub value: String,
    #[serde(default)]
    pub negate: bool,
}

/// Every present section must pass. An absent section is skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct MatcherConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_all: Option<Vec<MatcherConfigEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_any: Option<Vec<MatcherConfigEntry>>,
}

#[derive(Debug, Clone)]
struct CompiledEntry {
    key: String,
    operation: MatcherOperation,
    value: String,
    negate: bool,
    /// Pre-built regex when `value` holds no placeholder.
    pattern: Option<Regex>,
}

impl CompiledEntry {
    fn compile(entry: &MatcherConfigEntry) -> Result<Self> {
        let pattern = if entry.operation.is_regex()
            && !PlaceholderResolver::contains_placeholder(&entry.value)
        {
            Some(entry.operation.compile(&entry.value)?)
        } else {
            None
        };
        Ok(Self {
            key: entry.key.clone(),
            operation: entry.operation,
            value: entry.value.clone(),
            negate: entry.negate,
            pattern,
        })
    }

    async fn evaluate(&self, ctx: &RuleContext, resolver: &PlaceholderResolver) -> bool {
        let key = resolver.resolve(&self.key, ctx).await;
        let matched = match &self.pattern {
            Some(re) => re.is_match(&key),
            None => {
                let value = resolver.resolve(&self.value, ctx).await;
                self.operation.compare(&key, &value)
            }
        };
        matched != self.negate
    }
}

/// A validated [`MatcherConfig`], ready for evaluation.
#[derive(Debug, Clone, Default)]
pub struct Matcher {
    sections: Vec<(MatcherType, Vec<CompiledEntry>)>,
}

impl Matcher {
    /// Fails on a regex that can never compile.
    pub fn compile(config: &MatcherConfig) -> Result<Self> {
        let mut sections = Vec::new();
        if let Some(entries) = &config.match_all {
            sections.push((MatcherType::MatchAll, compile_entries(entries)?));
        }
        if let Some(entries) = &config.match_any {
            sections.push((MatcherType::MatchAny, compile_entries(entries)?));
        }
        Ok(Self { sections })
    }

    /// No sections: matches everything.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// MATCH_ALL over an empty list is true, MATCH_ANY over an empty list is false.
    pub async fn matches(&self, ctx: &RuleContext, resolver: &PlaceholderResolver) -> bool {
        for (kind, entries) in &self.sections {
            let passed = match kind {
                MatcherType::MatchAll => {
                    let mut all = true;
                    for entry in entries {
                        if !entry.evaluate(ctx, resolver).await {
                            all = false;
                            break;
                        }
                    }
                    all
                }
                MatcherType::MatchAny => {
                    let mut any = false;
                    for entry in entries {
                        if entry.evaluate(ctx, resolver).await {
                            any = true;
                            break;
                        }
                    }
                    any
                }
            };
            if !passed {
                return false;
            }
        }
        true
    }
}

fn compile_entries(entries: &[MatcherConfigEntry]) -> Result<Vec<CompiledEntry>> {
    entries.iter().map(CompiledEntry::compile).collect()
}
