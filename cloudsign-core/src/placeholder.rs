//! `<server_X>`, `<group_X>` and `<env_X>` substitution.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use regex::Regex;
use scc::HashMap;
use scc::hash_map::Entry;
use tokio::time::Instant;
use tracing::debug;

use crate::context::RuleContext;
use crate::controller::ControllerApi;
use crate::models::{BackendServer, GroupInfo};

/// How long a fetched group answers `<group_X>` before it is asked for again.
const GROUP_TTL: Duration = Duration::from_secs(1);

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(server|group|env)_([^>]+)>").expect("static regex"));

static WHOLE_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<(server|group|env)_([^>]+)>$").expect("static regex"));

/// Resolves placeholders against a candidate server.
///
/// Anything that cannot be resolved is returned unchanged. `<group_X>` is the
/// only kind that reaches the controller, and fetched groups are shared by
/// every clone for [`GROUP_TTL`].
#[derive(Clone)]
pub struct PlaceholderResolver {
    controller: Option<Arc<dyn ControllerApi>>,
    groups: Arc<HashMap<String, (Instant, GroupInfo)>>,
}

impl PlaceholderResolver {
    pub fn new(controller: Arc<dyn ControllerApi>) -> Self {
        Self {
            controller: Some(controller),
            groups: Arc::new(HashMap::new()),
        }
    }

    /// Resolver without a controller; `<group_X>` always passes through.
    pub fn offline() -> Self {
        Self {
            controller: None,
            groups: Arc::new(HashMap::new()),
        }
    }

    pub fn contains_placeholder(raw: &str) -> bool {
        PLACEHOLDER.is_match(raw)
    }

    /// Resolves `raw` when the whole string is a single placeholder.
    pub async fn resolve(&self, raw: &str, ctx: &RuleContext) -> String {
        let Some(caps) = WHOLE_PLACEHOLDER.captures(raw) else {
            return raw.to_string();
        };
        let server = ctx.candidate();
        if raw == "<server_state>" && server.is_none() {
            return "null".to_string();
        }
        self.lookup(&caps[1], &caps[2], server)
            .await
            .unwrap_or_else(|| raw.to_string())
    }

    /// Substitutes every placeholder inside a line of text.
    pub async fn resolve_line(&self, line: &str, server: Option<&BackendServer>) -> String {
        // (start, end, kind, key), collected before any lookup awaits
        let found: Vec<(usize, usize, &str, &str)> = PLACEHOLDER
            .captures_iter(line)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                Some((whole.start(), whole.end(), caps.get(1)?.as_str(), caps.get(2)?.as_str()))
            })
            .collect();

        let mut out = String::with_capacity(line.len());
        let mut last = 0;
        for (start, end, kind, key) in found {
            out.push_str(&line[last..start]);
            match self.lookup(kind, key, server).await {
                Some(value) => out.push_str(&value),
                None => out.push_str(&line[start..end]),
            }
            last = end;
        }
        out.push_str(&line[last..]);
        out
    }

    async fn lookup(&self, kind: &str, key: &str, server: Option<&BackendServer>) -> Option<String> {
        match kind {
            "env" => std::env::var(key).ok(),
            "server" => server?.attribute(key),
            "group" => self.group(&server?.group).await?.attribute(key),
            _ => None,
        }
    }

    async fn group(&self, name: &str) -> Option<GroupInfo> {
        let controller = self.controller.as_ref()?;
        let now = Instant::now();
        let cached = self
            .groups
            .read_async(name, |_, (fetched, group)| {
                (now.duration_since(*fetched) < GROUP_TTL).then(|| group.clone())
            })
            .await
            .flatten();
        if cached.is_some() {
            return cached;
        }

        let group = match controller.group_by_name(name).await {
            Ok(group) => group,
            Err(err) => {
                debug!(group = %name, error = %err, "group placeholder lookup failed");
                return None;
            }
        };
        match self.groups.entry_async(name.to_string()).await {
            Entry::Occupied(mut entry) => {
                *entry.get_mut() = (now, group.clone());
            }
            Entry::Vacant(entry) => {
                entry.insert_entry((now, group.clone()));
            }
        }
        Some(group)
    }
}
