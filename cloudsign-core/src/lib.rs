//! Assigns live backend servers to in-world signs and rotates their frames.
//!
//! The host platform provides the [`ControllerApi`], the [`LocationRegistry`],
//! a [`LocationMapper`] and a [`SignRenderer`]; [`SignManager`] does the rest.

pub mod cache;
pub mod context;
pub mod controller;
pub mod error;
pub mod layout;
pub mod manager;
pub mod matcher;
pub mod models;
pub mod placeholder;
pub mod registry;
pub mod render;
pub mod rotation;
pub mod rule;
pub mod state;

pub use cache::{RefreshSummary, ServerCache};
pub use context::{PlayerContext, RuleContext, ServerContext};
pub use controller::ControllerApi;
pub use error::{Result, SignError};
pub use layout::{FrameConfig, Layout, LayoutConfig, LayoutRepository, MAX_LINES};
pub use manager::{ClickOutcome, ManagerSettings, ManagerStats, SignManager, TickReport};
pub use matcher::{Matcher, MatcherConfig, MatcherConfigEntry, MatcherOperation, MatcherType};
pub use models::{BackendServer, CloudSign, GroupInfo, ServerState, SignLocation};
pub use placeholder::PlaceholderResolver;
pub use registry::{IdentityMapper, LocationKey, LocationMapper, LocationRegistry, MemoryRegistry};
pub use render::SignRenderer;
pub use rule::{BuiltinRule, RuleConfig, RuleRegistry, SignRule};
pub use state::{SignState, StateStats};
