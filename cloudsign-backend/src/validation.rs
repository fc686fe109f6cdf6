/// Input validation functions for all backend routes
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Player name cannot be empty")]
    PlayerNameEmpty,

    #[error("Player name too long (max 16 characters, got {0})")]
    PlayerNameTooLong(usize),

    #[error("Player name contains invalid characters (only alphanumeric and underscore allowed)")]
    PlayerNameInvalidChars,

    #[error("{field} cannot be empty")]
    NameEmpty { field: &'static str },

    #[error("{field} too long (max {max} characters, got {actual})")]
    NameTooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },

    #[error("{field} contains invalid characters (only alphanumeric, '_', '-' and '.' allowed)")]
    NameInvalidChars { field: &'static str },

    #[error("Coordinate {axis} out of range (got {value})")]
    CoordinateOutOfRange { axis: char, value: i32 },
}

const MAX_NAME_LEN: usize = 64;

/// Block coordinates a world can hold.
const MAX_HORIZONTAL: i32 = 30_000_000;
const MIN_Y: i32 = -2048;
const MAX_Y: i32 = 2048;

/// Validates a Minecraft player name
///
/// Rules:
/// - Cannot be empty
/// - Max 16 characters (Minecraft username limit)
/// - Only ASCII alphanumeric characters and underscores
pub fn validate_player_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::PlayerNameEmpty);
    }

    if name.len() > 16 {
        return Err(ValidationError::PlayerNameTooLong(name.len()));
    }

    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ValidationError::PlayerNameInvalidChars);
    }

    Ok(())
}

/// Validates a server group name
pub fn validate_group_name(name: &str) -> Result<(), ValidationError> {
    validate_name("Group name", name)
}

/// Validates a world name
pub fn validate_world_name(name: &str) -> Result<(), ValidationError> {
    validate_name("World name", name)
}

/// Validates the name of the server a player is connected to
pub fn validate_server_name(name: &str) -> Result<(), ValidationError> {
    validate_name("Server name", name)
}

/// Validates block coordinates
pub fn validate_coordinates(x: i32, y: i32, z: i32) -> Result<(), ValidationError> {
    for (axis, value) in [('x', x), ('z', z)] {
        if !(-MAX_HORIZONTAL..=MAX_HORIZONTAL).contains(&value) {
            return Err(ValidationError::CoordinateOutOfRange { axis, value });
        }
    }
    if !(MIN_Y..=MAX_Y).contains(&y) {
        return Err(ValidationError::CoordinateOutOfRange { axis: 'y', value: y });
    }
    Ok(())
}

fn validate_name(field: &'static str, name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::NameEmpty { field });
    }

    if name.len() > MAX_NAME_LEN {
        return Err(ValidationError::NameTooLong {
            field,
            max: MAX_NAME_LEN,
            actual: name.len(),
        });
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(ValidationError::NameInvalidChars { field });
    }

    Ok(())
}
