//! Display layouts, their frames, and picking one for a context.

use std::sync::Arc;
use std::time::Duration;

use arrayvec::ArrayVec;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::context::RuleContext;
use crate::error::{Result, SignError};
use crate::matcher::{Matcher, MatcherConfig};
use crate::models::BackendServer;
use crate::placeholder::PlaceholderResolver;
use crate::rule::{RuleRegistry, SignRule};

/// Lines a physical sign can show.
pub const MAX_LINES: usize = 4;

pub type FrameLines = ArrayVec<String, MAX_LINES>;

/// One rotation state of a layout. Holds at most [`MAX_LINES`] lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct FrameConfig {
    lines: FrameLines,
}

impl FrameConfig {
    pub fn new<I, S>(lines: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::try_from(lines.into_iter().map(Into::into).collect::<Vec<String>>())
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl TryFrom<Vec<String>> for FrameConfig {
    type Error = SignError;

    fn try_from(lines: Vec<String>) -> Result<Self> {
        let count = lines.len();
        let lines = FrameLines::try_from(lines.as_slice())
            .map_err(|_| SignError::TooManyLines(count))?;
        Ok(Self { lines })
    }
}

impl From<FrameConfig> for Vec<String> {
    fn from(frame: FrameConfig) -> Self {
        frame.lines.into_iter().collect()
    }
}

fn default_server_name() -> String {
    "%group%-%numerical-id%".to_string()
}

fn default_frame_update_interval() -> u64 {
    500
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub name: String,
    /// Higher wins.
    #[serde(default)]
    pub priority: i32,
    /// Name of a registered rule that must pass.
    #[serde(default)]
    pub rule: Option<String>,
    #[serde(default)]
    pub matcher: MatcherConfig,
    /// Connect target template, `%group%` and `%numerical-id%` are replaced.
    #[serde(default = "default_server_name")]
    pub server_name: String,
    /// Milliseconds between frame advances.
    #[serde(default = "default_frame_update_interval")]
    pub frame_update_interval: u64,
    #[serde(default)]
    pub frames: Vec<FrameConfig>,
}

/// A [`LayoutConfig`] whose rule reference and matcher have been checked.
pub struct Layout {
    pub name: String,
    pub priority: i32,
    rule: Option<Arc<dyn SignRule>>,
    matcher: Matcher,
    server_name: String,
    pub frame_update_interval: Duration,
    pub frames: Vec<FrameConfig>,
}

impl Layout {
    /// An unknown rule name is an error, never a silent default.
    pub fn compile(config: &LayoutConfig, rules: &RuleRegistry) -> Result<Self> {
        if config.name.is_empty() {
            return Err(SignError::InvalidLayout {
                layout: config.name.clone(),
                reason: "name must not be empty".to_string(),
            });
        }
        let rule = match &config.rule {
            Some(name) => Some(rules.get(name)?),
            None => None,
        };
        Ok(Self {
            name: config.name.clone(),
            priority: config.priority,
            rule,
            matcher: Matcher::compile(&config.matcher)?,
            server_name: config.server_name.clone(),
            frame_update_interval: Duration::from_millis(config.frame_update_interval),
            frames: config.frames.clone(),
        })
    }

    /// Nameless layout with no frames; nothing gets rendered for it.
    pub fn empty() -> Self {
        Self {
            name: String::new(),
            priority: 0,
            rule: None,
            matcher: Matcher::default(),
            server_name: default_server_name(),
            frame_update_interval: Duration::from_millis(default_frame_update_interval()),
            frames: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn rule_name(&self) -> Option<&str> {
        self.rule.as_ref().map(|r| r.name())
    }

    /// Frame at `index`, wrapped into range. `None` only for an empty layout.
    pub fn frame(&self, index: usize) -> Option<&FrameConfig> {
        if self.frames.is_empty() {
            return None;
        }
        self.frames.get(index % self.frames.len())
    }

    pub fn construct_name(&self, server: &BackendServer) -> String {
        self.server_name
            .replace("%group%", &server.group)
            .replace("%numerical-id%", &server.numerical_id.to_string())
    }

    pub async fn accepts(&self, ctx: &RuleContext, resolver: &PlaceholderResolver) -> bool {
        if let Some(rule) = &self.rule {
            if !rule.check(ctx).await {
                return false;
            }
        }
        self.matcher.matches(ctx, resolver).await
    }
}

/// Current set of layouts, sorted by descending priority.
///
/// Reloads swap the whole list; a tick keeps using the snapshot it started with.
pub struct LayoutRepository {
    layouts: RwLock<Arc<Vec<Arc<Layout>>>>,
    empty: Arc<Layout>,
}

impl LayoutRepository {
    pub fn new() -> Self {
        Self {
            layouts: RwLock::new(Arc::new(Vec::new())),
            empty: Arc::new(Layout::empty()),
        }
    }

    /// Compile and install `configs`. On any error the previous list stays.
    pub fn reload(&self, configs: &[LayoutConfig], rules: &RuleRegistry) -> Result<usize> {
        let mut layouts = configs
            .iter()
            .map(|config| Layout::compile(config, rules).map(Arc::new))
            .collect::<Result<Vec<_>>>()?;
        // stable: equal priorities keep configuration order
        layouts.sort_by(|a, b| b.priority.cmp(&a.priority));

        let count = layouts.len();
        *self.layouts.write() = Arc::new(layouts);
        info!(count, "loaded sign layouts");
        Ok(count)
    }

    pub fn snapshot(&self) -> Arc<Vec<Arc<Layout>>> {
        Arc::clone(&self.layouts.read())
    }

    pub fn len(&self) -> usize {
        self.layouts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.read().is_empty()
    }

    /// Highest-priority layout that accepts `ctx`, or the empty layout.
    pub async fn select(&self, ctx: &RuleContext, resolver: &PlaceholderResolver) -> Arc<Layout> {
        let layouts = self.snapshot();
        for layout in layouts.iter() {
            if layout.accepts(ctx, resolver).await {
                return Arc::clone(layout);
            }
        }
        Arc::clone(&self.empty)
    }
}

impl Default for LayoutRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::{MatcherConfigEntry, MatcherOperation};
    use crate::models::fixtures::server;

    fn layout(name: &str, rule: Option<&str>, priority: i32) -> LayoutConfig {
        LayoutConfig {
            name: name.to_string(),
            priority,
            rule: rule.map(str::to_string),
            matcher: MatcherConfig::default(),
            server_name: default_server_name(),
            frame_update_interval: 500,
            frames: vec![FrameConfig::new([name]).unwrap()],
        }
    }

    #[test]
    fn test_frame_rejects_more_than_four_lines() {
        assert!(FrameConfig::new(["a", "b", "c", "d"]).is_ok());
        assert!(matches!(
            FrameConfig::new(["a", "b", "c", "d", "e"]),
            Err(SignError::TooManyLines(5))
        ));
    }

    #[test]
    fn test_frame_deserialization_enforces_line_cap() {
        let ok: FrameConfig = serde_json::from_str(r#"["<server_name>", "", "online"]"#).unwrap();
        assert_eq!(ok.lines().len(), 3);
        let too_long = serde_json::from_str::<FrameConfig>(r#"["1","2","3","4","5"]"#);
        assert!(too_long.is_err());
    }

    #[test]
    fn test_layout_config_defaults() {
        let config: LayoutConfig = serde_json::from_str(r#"{ "name": "online" }"#).unwrap();
        assert_eq!(config.frame_update_interval, 500);
        assert_eq!(config.server_name, "%group%-%numerical-id%");
        assert!(config.rule.is_none());
        assert!(config.frames.is_empty());
    }

    #[test]
    fn test_unknown_rule_fails_compile() {
        let rules = RuleRegistry::with_defaults();
        let result = Layout::compile(&layout("x", Some("NOT_A_RULE"), 0), &rules);
        assert!(matches!(result, Err(SignError::RuleNotFound(_))));
    }

    #[test]
    fn test_failed_reload_keeps_previous_layouts() {
        let rules = RuleRegistry::with_defaults();
        let repo = LayoutRepository::new();
        repo.reload(&[layout("online", Some("ONLINE"), 0)], &rules).unwrap();

        let result = repo.reload(
            &[layout("a", Some("ONLINE"), 0), layout("b", Some("MISSING"), 0)],
            &rules,
        );

        assert!(result.is_err());
        assert_eq!(repo.len(), 1);
        assert_eq!(repo.snapshot()[0].name, "online");
    }

    #[test]
    fn test_frame_index_wraps() {
        let rules = RuleRegistry::with_defaults();
        let mut config = layout("x", None, 0);
        config.frames = vec![
            FrameConfig::new(["1"]).unwrap(),
            FrameConfig::new(["2"]).unwrap(),
        ];
        let layout = Layout::compile(&config, &rules).unwrap();

        assert_eq!(layout.frame(3).unwrap().lines()[0], "2");
        assert!(Layout::empty().frame(0).is_none());
    }

    #[test]
    fn test_construct_name() {
        let rules = RuleRegistry::with_defaults();
        let mut config = layout("x", None, 0);
        config.server_name = "%group%_%numerical-id%".to_string();
        let layout = Layout::compile(&config, &rules).unwrap();

        assert_eq!(layout.construct_name(&server("lobby", 4, 0)), "lobby_4");
    }

    #[tokio::test]
    async fn test_select_prefers_higher_priority() {
        let rules = RuleRegistry::with_defaults();
        let repo = LayoutRepository::new();
        repo.reload(
            &[
                layout("online", Some("ONLINE"), 0),
                layout("full", Some("FULL"), 10),
                layout("offline", Some("OFFLINE"), 0),
            ],
            &rules,
        )
        .unwrap();
        let resolver = PlaceholderResolver::offline();

        let mut full = server("lobby", 1, 20);
        full.max_players = 20;
        let picked = repo.select(&RuleContext::server(Some(full)), &resolver).await;
        assert_eq!(picked.name, "full");

        let picked = repo.select(&RuleContext::server(Some(server("lobby", 1, 3))), &resolver).await;
        assert_eq!(picked.name, "online");

        let picked = repo.select(&RuleContext::server(None), &resolver).await;
        assert_eq!(picked.name, "offline");
    }

    #[tokio::test]
    async fn test_select_applies_matcher_and_falls_back_to_empty() {
        let rules = RuleRegistry::with_defaults();
        let repo = LayoutRepository::new();
        let mut bedwars = layout("bedwars-online", Some("ONLINE"), 5);
        bedwars.matcher = MatcherConfig {
            match_all: Some(vec![MatcherConfigEntry {
                key: "<server_group>".to_string(),
                operation: MatcherOperation::Equals,
                value: "bedwars".to_string(),
                negate: false,
            }]),
            match_any: None,
        };
        repo.reload(&[bedwars], &rules).unwrap();
        let resolver = PlaceholderResolver::offline();

        let picked = repo.select(&RuleContext::server(Some(server("bedwars", 1, 0))), &resolver).await;
        assert_eq!(picked.name, "bedwars-online");

        let picked = repo.select(&RuleContext::server(Some(server("lobby", 1, 0))), &resolver).await;
        assert!(picked.is_empty());
        assert_eq!(picked.name, "");
    }
}
