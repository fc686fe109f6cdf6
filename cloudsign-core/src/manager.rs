//! Sign assignment, the periodic tick, and the manager lifecycle.
//!
//! Each tick runs two phases in order:
//! 1. advance every layout whose rotation interval elapsed
//! 2. for every registered location, recompute its assignment against the
//!    cached server pool and hand `(sign, frame)` to the renderer
//!
//! Assignments are sticky. A sign keeps its server for as long as that server
//! is still in the group snapshot; only signs without a live server draw from
//! the pool of unassigned servers, in registration order.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::cache::ServerCache;
use crate::context::{PlayerContext, RuleContext};
use crate::controller::ControllerApi;
use crate::error::{Result, SignError};
use crate::layout::{Layout, LayoutRepository};
use crate::models::{BackendServer, CloudSign, SignLocation};
use crate::placeholder::PlaceholderResolver;
use crate::registry::{LocationKey, LocationMapper, LocationRegistry};
use crate::render::SignRenderer;
use crate::rotation::advance_frames;
use crate::rule::RuleRegistry;
use crate::state::SignState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagerSettings {
    /// Time between reconciliation ticks.
    pub tick_interval: Duration,
    /// Time between server cache refreshes.
    pub cache_refresh_interval: Duration,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(50),
            cache_refresh_interval: Duration::from_secs(1),
        }
    }
}

/// What happened during one tick.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub frames_advanced: usize,
    pub groups: usize,
    pub locations: usize,
    pub rendered: usize,
    pub failed: usize,
    pub pruned: usize,
}

/// Result of a player clicking a sign.
#[derive(Debug, Clone, PartialEq)]
pub enum ClickOutcome {
    /// Send the player to `target`.
    Connect { server: BackendServer, target: String },
    /// The sign is registered but shows no server.
    NoServer,
    NotRegistered,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ManagerStats {
    pub running: bool,
    pub signs: usize,
    pub assigned: usize,
    pub layouts: usize,
    pub rules: usize,
    pub cached_groups: usize,
}

struct Shared<T> {
    controller: Arc<dyn ControllerApi>,
    registry: Arc<dyn LocationRegistry>,
    mapper: Arc<dyn LocationMapper<T>>,
    renderer: Arc<dyn SignRenderer<T>>,
    rules: Arc<RuleRegistry>,
    layouts: Arc<LayoutRepository>,
    cache: Arc<ServerCache>,
    state: SignState<T>,
    resolver: PlaceholderResolver,
}

struct Running {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

pub struct SignManager<T: LocationKey> {
    shared: Arc<Shared<T>>,
    settings: ManagerSettings,
    running: Mutex<Option<Running>>,
}

impl<T: LocationKey> SignManager<T> {
    pub fn new(
        controller: Arc<dyn ControllerApi>,
        registry: Arc<dyn LocationRegistry>,
        mapper: Arc<dyn LocationMapper<T>>,
        renderer: Arc<dyn SignRenderer<T>>,
        rules: Arc<RuleRegistry>,
        layouts: Arc<LayoutRepository>,
        settings: ManagerSettings,
    ) -> Self {
        let cache = Arc::new(ServerCache::new(Arc::clone(&controller), Arc::clone(&registry)));
        let resolver = PlaceholderResolver::new(Arc::clone(&controller));
        Self {
            shared: Arc::new(Shared {
                controller,
                registry,
                mapper,
                renderer,
                rules,
                layouts,
                cache,
                state: SignState::new(),
                resolver,
            }),
            settings,
            running: Mutex::new(None),
        }
    }

    /// Spawn the cache refresher and the tick loop.
    ///
    /// Fails with [`SignError::AlreadyStarted`] if they are already running.
    pub async fn start(&self) -> Result<()> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return Err(SignError::AlreadyStarted);
        }

        info!(
            tick_ms = self.settings.tick_interval.as_millis() as u64,
            refresh_ms = self.settings.cache_refresh_interval.as_millis() as u64,
            "starting sign manager"
        );
        let cancel = CancellationToken::new();
        let cache_task = tokio::spawn(
            Arc::clone(&self.shared.cache)
                .run(self.settings.cache_refresh_interval, cancel.child_token()),
        );
        let tick_task = tokio::spawn(run_ticks(
            Arc::clone(&self.shared),
            self.settings.tick_interval,
            cancel.child_token(),
        ));

        *running = Some(Running {
            cancel,
            tasks: vec![cache_task, tick_task],
        });
        Ok(())
    }

    /// Cancel and await both loops, then clear the cache and the state.
    /// Safe to call any number of times.
    pub async fn stop(&self) {
        let running = self.running.lock().await.take();
        match running {
            Some(running) => {
                info!("stopping sign manager");
                running.cancel.cancel();
                for task in running.tasks {
                    if let Err(err) = task.await {
                        error!(error = %err, "sign manager task ended abnormally");
                    }
                }
            }
            None => debug!("sign manager was not running"),
        }
        self.shared.cache.clear().await;
        for sign in self.shared.state.signs().await {
            self.shared.renderer.forget(&sign.location);
        }
        self.shared.state.clear().await;
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    pub async fn tick(&self) -> TickReport {
        self.shared.tick(Instant::now()).await
    }

    /// Run a tick as if the clock read `now`.
    pub async fn tick_at(&self, now: Instant) -> TickReport {
        self.shared.tick(now).await
    }

    /// Refresh the server cache once, outside the background loop.
    pub async fn refresh_servers(&self) -> Result<()> {
        let summary = self.shared.cache.refresh().await?;
        debug!(refreshed = summary.refreshed, failed = summary.failed, "manual server refresh");
        Ok(())
    }

    /// Register a sign for `group`.
    ///
    /// Fails with [`SignError::GroupNotFound`] when the controller does not
    /// know the group and [`SignError::AlreadyRegistered`] for a known location.
    pub async fn register(&self, group: &str, location: &T) -> Result<()> {
        if self.shared.state.get(location).await.is_some() {
            return Err(SignError::AlreadyRegistered);
        }
        self.shared.controller.group_by_name(group).await?;
        let stored = self.shared.mapper.unmap(location);
        self.shared.registry.save_location(group, stored.clone()).await?;
        info!(group, location = %stored, "registered sign");
        Ok(())
    }

    /// Remove a sign from the registry and the state.
    pub async fn unregister(&self, location: &T) -> Result<Option<CloudSign<T>>> {
        let stored = self.shared.mapper.unmap(location);
        let removed = self.shared.registry.remove_location(&stored).await?;
        let sign = self.shared.state.remove(location).await;
        if !removed && sign.is_none() {
            return Err(SignError::NotRegistered);
        }
        self.shared.renderer.forget(location);
        info!(location = %stored, "unregistered sign");
        Ok(sign)
    }

    /// Remove every sign of `group`. Returns the removed locations.
    pub async fn unregister_group(&self, group: &str) -> Result<Vec<SignLocation>> {
        let locations = self.shared.registry.locations_by_group(group).await?;
        if locations.is_empty() {
            return Err(SignError::GroupNotRegistered(group.to_string()));
        }
        for location in &locations {
            self.shared.registry.remove_location(location).await?;
            match self.shared.mapper.map(location) {
                Ok(key) => {
                    self.shared.state.remove(&key).await;
                    self.shared.renderer.forget(&key);
                }
                Err(err) => {
                    debug!(location = %location, error = %err, "unmappable location, state is pruned on next tick")
                }
            }
        }
        info!(group, count = locations.len(), "unregistered group signs");
        Ok(locations)
    }

    pub async fn cloud_sign(&self, location: &T) -> Option<CloudSign<T>> {
        self.shared.state.get(location).await
    }

    pub async fn cloud_signs(&self) -> Vec<CloudSign<T>> {
        self.shared.state.signs().await
    }

    pub async fn groups(&self) -> Result<Vec<String>> {
        self.shared.registry.groups().await
    }

    pub async fn locations(&self, group: &str) -> Result<Vec<SignLocation>> {
        self.shared.registry.locations_by_group(group).await
    }

    pub async fn exists(&self, group: &str) -> Result<bool> {
        self.shared.registry.exists(group).await
    }

    pub async fn select_layout(&self, ctx: &RuleContext) -> Arc<Layout> {
        self.shared.layouts.select(ctx, &self.shared.resolver).await
    }

    /// Work out where a player clicking the sign at `location` should go.
    pub async fn resolve_click(&self, location: &T, player: PlayerContext) -> ClickOutcome {
        let Some(sign) = self.shared.state.get(location).await else {
            return ClickOutcome::NotRegistered;
        };
        let Some(server) = sign.server else {
            return ClickOutcome::NoServer;
        };
        let ctx = RuleContext::player(Some(server.clone()), player);
        let layout = self.select_layout(&ctx).await;
        let target = layout.construct_name(&server);
        ClickOutcome::Connect { server, target }
    }

    pub async fn stats(&self) -> ManagerStats {
        let state = self.shared.state.stats().await;
        ManagerStats {
            running: self.is_running().await,
            signs: state.signs,
            assigned: state.assigned,
            layouts: self.shared.layouts.len(),
            rules: self.shared.rules.len(),
            cached_groups: self.shared.cache.len(),
        }
    }

    pub fn rules(&self) -> &Arc<RuleRegistry> {
        &self.shared.rules
    }

    pub fn layouts(&self) -> &Arc<LayoutRepository> {
        &self.shared.layouts
    }

    pub fn resolver(&self) -> &PlaceholderResolver {
        &self.shared.resolver
    }

    pub fn cache(&self) -> &Arc<ServerCache> {
        &self.shared.cache
    }

    pub fn settings(&self) -> ManagerSettings {
        self.settings
    }
}

impl<T: LocationKey> Drop for SignManager<T> {
    fn drop(&mut self) {
        if let Some(running) = self.running.get_mut().as_ref() {
            running.cancel.cancel();
        }
    }
}

async fn run_ticks<T: LocationKey>(
    shared: Arc<Shared<T>>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!("sign update loop started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }
        // a panicking tick is logged and the loop goes on
        let tick = tokio::spawn(Arc::clone(&shared).tick_owned(Instant::now()));
        if let Err(err) = tick.await {
            error!(error = %err, "sign update tick aborted");
        }
    }

    info!("sign update loop stopped");
}

impl<T: LocationKey> Shared<T> {
    async fn tick_owned(self: Arc<Self>, now: Instant) {
        let report = self.tick(now).await;
        if report.failed > 0 {
            warn!(failed = report.failed, locations = report.locations, "tick finished with failures");
        }
    }

    async fn tick(&self, now: Instant) -> TickReport {
        let mut report = TickReport {
            frames_advanced: advance_frames(&self.state, &self.layouts.snapshot(), now).await,
            ..TickReport::default()
        };

        let groups = match self.registry.groups().await {
            Ok(groups) => groups,
            Err(err) => {
                warn!(error = %err, "failed to read registered groups");
                return report;
            }
        };

        // An unreadable group keeps its signs; an unmappable location never
        // enters the state, so it does not hold back the prune.
        let mut live = HashSet::new();
        let mut complete = true;
        for group in &groups {
            match self.registry.locations_by_group(group).await {
                Ok(locations) => {
                    self.reconcile_group(group, &locations, &mut live, &mut report).await;
                    report.groups += 1;
                }
                Err(err) => {
                    complete = false;
                    warn!(group = %group, error = %err, "failed to read sign locations");
                }
            }
        }

        if complete {
            let dropped = self.state.retain_locations(&live).await;
            for location in &dropped {
                self.renderer.forget(location);
            }
            report.pruned = dropped.len();
            if report.pruned > 0 {
                debug!(pruned = report.pruned, "dropped signs of unregistered locations");
            }
        }
        report
    }

    async fn reconcile_group(
        &self,
        group: &str,
        locations: &[SignLocation],
        live: &mut HashSet<T>,
        report: &mut TickReport,
    ) {
        let servers = self.cache.servers_by_group(group).await;
        let mut unused = self.unused_servers(&servers).await.into_iter();

        for location in locations {
            report.locations += 1;
            let key = match self.mapper.map(location) {
                Ok(key) => key,
                Err(err) => {
                    report.failed += 1;
                    warn!(group, location = %location, error = %err, "failed to update sign");
                    continue;
                }
            };
            live.insert(key.clone());
            if self.process_location(key, &servers, &mut unused).await {
                report.rendered += 1;
            }
        }
    }

    /// Servers nobody shows yet that some rule can classify, by numerical id.
    async fn unused_servers(&self, servers: &[BackendServer]) -> Vec<BackendServer> {
        let assigned = self.state.assigned_server_ids().await;
        let mut unused = Vec::new();
        for server in servers.iter().filter(|s| !assigned.contains(&s.unique_id)) {
            let ctx = RuleContext::server(Some(server.clone()));
            if self.rules.any_matches(&ctx).await {
                unused.push(server.clone());
            }
        }
        unused.sort_by_key(|s| s.numerical_id);
        unused
    }

    async fn process_location(
        &self,
        key: T,
        servers: &[BackendServer],
        unused: &mut impl Iterator<Item = BackendServer>,
    ) -> bool {
        let existing = self.state.get(&key).await;
        let current = existing
            .as_ref()
            .and_then(|sign| sign.server.as_ref())
            .and_then(|assigned| servers.iter().find(|s| s.unique_id == assigned.unique_id))
            .cloned();

        let server = match current {
            Some(server) => Some(server),
            None => unused.next(),
        };
        let sign = CloudSign::new(key, server);
        self.state.put(sign.clone()).await;
        self.render(&sign).await
    }

    async fn render(&self, sign: &CloudSign<T>) -> bool {
        let ctx = RuleContext::server(sign.server.clone());
        let layout = self.layouts.select(&ctx, &self.resolver).await;
        let index = self.state.frame_index(&layout.name).await;
        let Some(frame) = layout.frame(index) else {
            return false;
        };
        self.renderer.render(sign, frame);
        true
    }
}
