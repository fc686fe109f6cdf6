//! What a rule or matcher is evaluated against.

use crate::models::{BackendServer, ServerState};

/// The candidate server, or `None` for an unassigned sign.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerContext {
    pub server: Option<BackendServer>,
}

/// The player interacting with a sign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerContext {
    pub player_id: String,
    pub player_name: String,
    /// Name of the server the player is currently connected to.
    pub current_server: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RuleContext {
    Server(ServerContext),
    Player {
        server: ServerContext,
        player: PlayerContext,
    },
}

impl RuleContext {
    pub fn server(server: Option<BackendServer>) -> Self {
        RuleContext::Server(ServerContext { server })
    }

    pub fn player(server: Option<BackendServer>, player: PlayerContext) -> Self {
        RuleContext::Player {
            server: ServerContext { server },
            player,
        }
    }

    pub fn candidate(&self) -> Option<&BackendServer> {
        match self {
            RuleContext::Server(ctx) | RuleContext::Player { server: ctx, .. } => ctx.server.as_ref(),
        }
    }

    pub fn state(&self) -> Option<ServerState> {
        self.candidate().map(|s| s.state)
    }

    pub fn player_context(&self) -> Option<&PlayerContext> {
        match self {
            RuleContext::Player { player, .. } => Some(player),
            RuleContext::Server(_) => None,
        }
    }
}
