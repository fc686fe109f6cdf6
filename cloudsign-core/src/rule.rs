//! Named predicates that classify a server (or its absence).

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::RuleContext;
use crate::error::{Result, SignError};
use crate::matcher::{Matcher, MatcherConfig};
use crate::models::{BackendServer, ServerState};
use crate::placeholder::PlaceholderResolver;

#[async_trait]
pub trait SignRule: Send + Sync {
    fn name(&self) -> &str;

    async fn check(&self, ctx: &RuleContext) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinRule {
    Starting,
    Offline,
    Maintenance,
    Full,
    Empty,
    Online,
    /// Only meaningful for a player context.
    CurrentServer,
}

impl BuiltinRule {
    pub const DEFAULTS: [BuiltinRule; 6] = [
        BuiltinRule::Starting,
        BuiltinRule::Offline,
        BuiltinRule::Maintenance,
        BuiltinRule::Full,
        BuiltinRule::Empty,
        BuiltinRule::Online,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BuiltinRule::Starting => "STARTING",
            BuiltinRule::Offline => "OFFLINE",
            BuiltinRule::Maintenance => "MAINTENANCE",
            BuiltinRule::Full => "FULL",
            BuiltinRule::Empty => "EMPTY",
            BuiltinRule::Online => "ONLINE",
            BuiltinRule::CurrentServer => "CURRENT_SERVER",
        }
    }

    /// The server state this rule is about. `None` for OFFLINE.
    pub fn state(self) -> Option<ServerState> {
        match self {
            BuiltinRule::Starting => Some(ServerState::Starting),
            BuiltinRule::Offline => None,
            _ => Some(ServerState::Available),
        }
    }

    /// Whether some default rule is about `state`.
    pub fn has_rule(state: Option<ServerState>) -> bool {
        Self::DEFAULTS.iter().any(|rule| rule.state() == state)
    }

    pub fn evaluate(self, ctx: &RuleContext) -> bool {
        let server = ctx.candidate();
        match self {
            BuiltinRule::Starting => server.is_some_and(|s| s.state == ServerState::Starting),
            BuiltinRule::Offline => server.is_none(),
            BuiltinRule::Maintenance => available(server).is_some_and(|s| {
                s.properties
                    .get("maintenance")
                    .is_some_and(|v| v.eq_ignore_ascii_case("true"))
            }),
            BuiltinRule::Full => available(server).is_some_and(|s| s.player_count == s.max_players),
            BuiltinRule::Empty => available(server).is_some_and(|s| s.player_count == 0),
            BuiltinRule::Online => available(server).is_some(),
            BuiltinRule::CurrentServer => match (server, ctx.player_context()) {
                (Some(s), Some(player)) => {
                    s.state == ServerState::Available && s.display_name() == player.current_server
                }
                _ => false,
            },
        }
    }
}

/// Only an available server is full, empty, online or under maintenance.
fn available(server: Option<&BackendServer>) -> Option<&BackendServer> {
    server.filter(|s| s.state == ServerState::Available)
}

#[async_trait]
impl SignRule for BuiltinRule {
    fn name(&self) -> &str {
        BuiltinRule::name(*self)
    }

    async fn check(&self, ctx: &RuleContext) -> bool {
        self.evaluate(ctx)
    }
}

/// A rule defined in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConfig {
    pub name: String,
    /// Name of a rule that must also pass.
    #[serde(default)]
    pub inherit: Option<String>,
    #[serde(default)]
    pub matcher: MatcherConfig,
}

pub struct ConfigRule {
    name: String,
    parent: Option<Arc<dyn SignRule>>,
    matcher: Matcher,
    resolver: PlaceholderResolver,
}

impl ConfigRule {
    pub fn compile(
        config: &RuleConfig,
        parent: Option<Arc<dyn SignRule>>,
        resolver: PlaceholderResolver,
    ) -> Result<Self> {
        Ok(Self {
            name: config.name.clone(),
            parent,
            matcher: Matcher::compile(&config.matcher)?,
            resolver,
        })
    }
}

#[async_trait]
impl SignRule for ConfigRule {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self, ctx: &RuleContext) -> bool {
        if let Some(parent) = &self.parent {
            if !parent.check(ctx).await {
                return false;
            }
        }
        self.matcher.matches(ctx, &self.resolver).await
    }
}

#[derive(Clone)]
struct Registered {
    rule: Arc<dyn SignRule>,
    from_config: bool,
}

/// Registry of every rule a layout may reference, in registration order.
///
/// Registration is idempotent by name: the first rule with a name wins.
pub struct RuleRegistry {
    rules: RwLock<Vec<Registered>>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self {
            rules: RwLock::new(Vec::new()),
        }
    }

    /// Registry holding the six default rules.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        for rule in BuiltinRule::DEFAULTS {
            registry.register(Arc::new(rule));
        }
        registry
    }

    /// Adds the rules that need a player context.
    pub fn register_player_rules(&self) {
        self.register(Arc::new(BuiltinRule::CurrentServer));
    }

    /// Returns `false` when a rule with that name already exists.
    pub fn register(&self, rule: Arc<dyn SignRule>) -> bool {
        self.insert(rule, false)
    }

    fn insert(&self, rule: Arc<dyn SignRule>, from_config: bool) -> bool {
        let mut rules = self.rules.write();
        if rules.iter().any(|r| r.rule.name() == rule.name()) {
            return false;
        }
        rules.push(Registered { rule, from_config });
        true
    }

    /// Fails with [`SignError::RuleNotFound`] for an unknown name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn SignRule>> {
        self.rules
            .read()
            .iter()
            .find(|r| r.rule.name() == name)
            .map(|r| Arc::clone(&r.rule))
            .ok_or_else(|| SignError::RuleNotFound(name.to_string()))
    }

    pub fn has_rule(&self, name: &str) -> bool {
        self.rules.read().iter().any(|r| r.rule.name() == name)
    }

    pub fn rules(&self) -> Vec<Arc<dyn SignRule>> {
        self.rules.read().iter().map(|r| Arc::clone(&r.rule)).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.rules.read().iter().map(|r| r.rule.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.read().is_empty()
    }

    pub fn clear(&self) {
        self.rules.write().clear();
    }

    /// True when at least one registered rule classifies `ctx`.
    pub async fn any_matches(&self, ctx: &RuleContext) -> bool {
        for rule in self.rules() {
            if rule.check(ctx).await {
                return true;
            }
        }
        false
    }

    /// Replace every config-defined rule with `configs`.
    ///
    /// `inherit` may point at a code rule or another config in the same
    /// batch, in any order. Nothing changes unless every config compiles.
    /// A config named like a code rule or another config is a
    /// [`SignError::RuleConflict`].
    pub fn reload_config_rules(
        &self,
        configs: &[RuleConfig],
        resolver: &PlaceholderResolver,
    ) -> Result<usize> {
        let code_rules: Vec<Arc<dyn SignRule>> = self
            .rules
            .read()
            .iter()
            .filter(|r| !r.from_config)
            .map(|r| Arc::clone(&r.rule))
            .collect();

        let mut names = HashSet::with_capacity(configs.len());
        for config in configs {
            if !names.insert(config.name.as_str())
                || code_rules.iter().any(|r| r.name() == config.name)
            {
                return Err(SignError::RuleConflict(config.name.clone()));
            }
        }

        let mut compiled: Vec<Arc<dyn SignRule>> = Vec::with_capacity(configs.len());
        let mut pending: Vec<&RuleConfig> = configs.iter().collect();

        while !pending.is_empty() {
            let before = pending.len();
            let mut still_pending = Vec::new();
            for config in pending {
                let parent = match &config.inherit {
                    None => None,
                    Some(name) => {
                        match code_rules.iter().chain(compiled.iter()).find(|r| r.name() == name) {
                            Some(parent) => Some(Arc::clone(parent)),
                            None => {
                                still_pending.push(config);
                                continue;
                            }
                        }
                    }
                };
                compiled.push(Arc::new(ConfigRule::compile(config, parent, resolver.clone())?));
            }
            if still_pending.len() == before {
                let missing = still_pending[0].inherit.clone().unwrap_or_default();
                return Err(SignError::RuleNotFound(missing));
            }
            pending = still_pending;
        }

        let mut rules = self.rules.write();
        // a code rule registered since the read above
        if let Some(rule) = compiled
            .iter()
            .find(|c| rules.iter().any(|r| !r.from_config && r.rule.name() == c.name()))
        {
            return Err(SignError::RuleConflict(rule.name().to_string()));
        }
        rules.retain(|r| !r.from_config);
        let added = compiled.len();
        rules.extend(compiled.into_iter().map(|rule| Registered {
            rule,
            from_config: true,
        }));
        debug!(added, "reloaded config rules");
        Ok(added)
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
