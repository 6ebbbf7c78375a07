// Error types for navigation and configuration.
//
// Navigation failures are ordinary outcomes (the player tapped a rock, or a
// spot outside the generated world). Callers drop the command and carry on.

use thiserror::Error;

/// Which end of a path request failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Start,
    Goal,
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endpoint::Start => f.write_str("start"),
            Endpoint::Goal => f.write_str("goal"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NavError {
    #[error("{which} position does not resolve to a tile")]
    TileNotFound { which: Endpoint },

    #[error("goal tile is not walkable")]
    InvalidGoal,

    #[error("no walkable route connects start and goal")]
    Unreachable,

    #[error("search gave up after expanding {expanded} tiles")]
    SearchLimit { expanded: usize },

    #[error("start and goal resolve to the same tile")]
    AlreadyAtGoal,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse config: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("invalid config: {0}")]
    Invalid(String),
}

pub type Result<T, E = NavError> = std::result::Result<T, E>;
