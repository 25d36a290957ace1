//! Error types for bakebot.

/// Top-level error type for the bot.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Cake builder error: {0}")]
    Builder(#[from] BuilderError),

    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
}

impl Error {
    /// True when this is a missing-entity lookup (stale or unknown id).
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Database(DatabaseError::NotFound { .. }))
    }
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Migration failed: {0}")]
    Migration(String),
}

impl DatabaseError {
    /// Shorthand for the NotFound variant.
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }
}

/// Channel-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("Failed to send response on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("Invalid message format: {0}")]
    InvalidMessage(String),

    #[error("HTTP error: {0}")]
    Http(String),
}

/// Cake composition errors.
#[derive(Debug, thiserror::Error)]
pub enum BuilderError {
    #[error("Category \"{category}\" is already answered for this cake")]
    CategoryAlreadyFilled { category: String },

    #[error("Category \"{category}\" is mandatory and cannot be skipped")]
    MandatoryCategory { category: String },

    #[error("Cannot finish the cake: mandatory category \"{category}\" is unanswered")]
    MandatoryUnanswered { category: String },

    #[error("Cake {id} is already committed and cannot be changed")]
    AlreadyCommitted { id: i64 },
}

/// Order lifecycle errors.
#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Order {id} cannot move forward from status \"{status}\"")]
    InvalidTransition { id: i64, status: String },

    #[error("An order must contain at least one cake")]
    Empty,

    #[error("Cake {id} is not committed and cannot be ordered")]
    UncommittedCake { id: i64 },
}

/// User-correctable input validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Not a valid phone number: {input}")]
    InvalidPhone { input: String },
}

/// Errors classifying button/selection text.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("No '{marker}' marker in input")]
    MissingMarker { marker: char },

    #[error("Not a numeric id: {token}")]
    InvalidNumber { token: String },
}

/// Result type alias for the bot.
pub type Result<T> = std::result::Result<T, Error>;
