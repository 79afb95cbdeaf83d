//! Error handling types
//!
//! One error enum covers the whole container: configuration-time failures
//! (duplicate, missing, ambiguous and cyclic wiring), lifecycle failures,
//! aggregated listener failures and transactional call failures.

use std::fmt;
use thiserror::Error;

/// Result type alias for operations that can fail
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error used as an opaque source
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for beanbox
#[derive(Error, Debug)]
pub enum Error {
    /// A bean name was registered twice without an override flag
    #[error("Bean definition '{name}' is already registered and overriding is disabled")]
    DuplicateDefinition {
        /// The colliding bean name
        name: String,
    },

    /// No definition satisfies the requested capability
    #[error(
        "No bean satisfies capability {capability}{}{}",
        describe_qualifier(.qualifier),
        describe_requester(.required_by)
    )]
    MissingDependency {
        /// Capability that could not be satisfied
        capability: String,
        /// Qualifier that was requested, if any
        qualifier: Option<String>,
        /// Bean whose construction required the capability
        required_by: Option<String>,
    },

    /// More than one definition satisfies the requested capability
    #[error(
        "Capability {capability}{} is ambiguous: candidates [{}]",
        describe_qualifier(.qualifier),
        .candidates.join(", ")
    )]
    AmbiguousDependency {
        /// Capability being resolved
        capability: String,
        /// Qualifier that was requested, if any
        qualifier: Option<String>,
        /// Names of every matching definition
        candidates: Vec<String>,
    },

    /// The dependency graph contains a cycle
    #[error("Circular dependency detected: {}", describe_cycle(.cycle))]
    CyclicDependency {
        /// Every bean on the cycle, in traversal order
        cycle: Vec<String>,
    },

    /// An after-construct hook (or a capability decorator) failed
    #[error("Failed to initialize bean '{bean}': {source}")]
    Initialization {
        /// The offending bean
        bean: String,
        /// The hook's error
        #[source]
        source: Box<Error>,
    },

    /// One or more event listeners failed during delivery
    #[error(transparent)]
    Listener(#[from] ListenerError),

    /// A proxied call failed inside its transaction boundary
    #[error("Transactional call {method}({}) failed: {source}", .arguments.join(", "))]
    Transaction {
        /// Invoked method
        method: String,
        /// Debug-rendered call arguments
        arguments: Vec<String>,
        /// The original error raised by the call
        #[source]
        source: Box<Error>,
    },

    /// Operation not permitted in the current state
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Description of the violated state
        message: String,
    },

    /// Configuration-related error
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error
        message: String,
        /// Optional source error
        #[source]
        source: Option<BoxError>,
    },

    /// I/O operation error
    #[error("I/O error: {message}")]
    Io {
        /// Description of the I/O error
        message: String,
        /// Optional source error
        #[source]
        source: Option<BoxError>,
    },

    /// Invalid argument provided to a function
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument
        message: String,
    },

    /// Internal error
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error
        message: String,
    },
}

fn describe_qualifier(qualifier: &Option<String>) -> String {
    qualifier
        .as_ref()
        .map(|q| format!(" qualified '{q}'"))
        .unwrap_or_default()
}

fn describe_requester(required_by: &Option<String>) -> String {
    required_by
        .as_ref()
        .map(|bean| format!(" (required by '{bean}')"))
        .unwrap_or_default()
}

fn describe_cycle(cycle: &[String]) -> String {
    match cycle.first() {
        Some(first) => format!("{} -> {first}", cycle.join(" -> ")),
        None => String::new(),
    }
}

// Wiring error creation methods
impl Error {
    /// Create a duplicate definition error
    pub fn duplicate_definition<S: Into<String>>(name: S) -> Self {
        Self::DuplicateDefinition { name: name.into() }
    }

    /// Create a missing dependency error
    pub fn missing_dependency<S: Into<String>>(capability: S, qualifier: Option<&str>) -> Self {
        Self::MissingDependency {
            capability: capability.into(),
            qualifier: qualifier.map(str::to_string),
            required_by: None,
        }
    }

    /// Create an ambiguous dependency error
    pub fn ambiguous_dependency<S: Into<String>>(
        capability: S,
        qualifier: Option<&str>,
        candidates: Vec<String>,
    ) -> Self {
        Self::AmbiguousDependency {
            capability: capability.into(),
            qualifier: qualifier.map(str::to_string),
            candidates,
        }
    }

    /// Create a cyclic dependency error
    pub fn cyclic_dependency(cycle: Vec<String>) -> Self {
        Self::CyclicDependency { cycle }
    }

    /// Attach the requesting bean to a missing dependency error
    ///
    /// Other variants, and errors that already name a requester, are returned unchanged.
    pub fn required_by<S: Into<String>>(self, bean: S) -> Self {
        match self {
            Self::MissingDependency {
                capability,
                qualifier,
                required_by: None,
            } => Self::MissingDependency {
                capability,
                qualifier,
                required_by: Some(bean.into()),
            },
            other => other,
        }
    }
}

// Lifecycle and runtime error creation methods
impl Error {
    /// Create an initialization error for a bean
    pub fn initialization<S: Into<String>>(bean: S, source: Error) -> Self {
        Self::Initialization {
            bean: bean.into(),
            source: Box::new(source),
        }
    }

    /// Create a transactional call error wrapping the original cause
    pub fn transaction<S: Into<String>>(method: S, arguments: Vec<String>, source: Error) -> Self {
        Self::Transaction {
            method: method.into(),
            arguments,
            source: Box::new(source),
        }
    }

    /// Create an invalid state error
    pub fn invalid_state<S: Into<String>>(message: S) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// The original error raised inside a transactional call, if this is one
    pub fn transaction_cause(&self) -> Option<&Error> {
        match self {
            Self::Transaction { source, .. } => Some(source),
            _ => None,
        }
    }
}

// Basic error creation methods
impl Error {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
            source: None,
        }
    }

    /// Create a configuration error with source
    pub fn configuration_with_source<
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    >(
        message: S,
        source: E,
    ) -> Self {
        Self::Configuration {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an I/O error with source
    pub fn io_with_source<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
        message: S,
        source: E,
    ) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// A single listener failure collected during event delivery
#[derive(Debug)]
pub struct ListenerFailure {
    /// Label of the failing subscription
    pub listener: String,
    /// The error the listener returned (panics are reported as `Internal`)
    pub error: Error,
}

/// Aggregate of every listener failure for one published event
///
/// Delivery continues past failing listeners; this error is surfaced to the
/// publisher only after all listeners have run.
#[derive(Debug, Error)]
pub struct ListenerError {
    /// Type name of the published event
    pub event_type: String,
    /// Number of listeners that completed successfully
    pub delivered: usize,
    /// Every failure, in delivery order
    pub failures: Vec<ListenerFailure>,
}

impl ListenerError {
    /// Total number of listeners the event was delivered to
    pub fn attempted(&self) -> usize {
        self.delivered + self.failures.len()
    }
}

impl fmt::Display for ListenerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} listeners failed for event {}",
            self.failures.len(),
            self.attempted(),
            self.event_type
        )?;
        for failure in &self.failures {
            write!(f, "; {}: {}", failure.listener, failure.error)?;
        }
        Ok(())
    }
}
