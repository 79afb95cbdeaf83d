//! Infrastructure layer constants

// ============================================================================
// CONFIGURATION CONSTANTS
// ============================================================================

/// Default configuration file name
pub const DEFAULT_CONFIG_FILENAME: &str = "beanbox.toml";

/// Default configuration directory name
pub const DEFAULT_CONFIG_DIR: &str = "beanbox";

/// Environment variable prefix for configuration (nested keys split on `__`)
pub const CONFIG_ENV_PREFIX: &str = "BEANBOX__";

/// Separator for nested keys in environment variables
pub const CONFIG_ENV_SEPARATOR: &str = "__";

// ============================================================================
// LOGGING CONSTANTS
// ============================================================================

/// Default log level
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Environment variable overriding the log filter
pub const LOG_FILTER_ENV_VAR: &str = "BEANBOX_LOG";

/// Log rotation size in bytes (10MB)
pub const LOG_ROTATION_SIZE: u64 = 10 * 1024 * 1024;

/// Maximum number of rotated log files to keep
pub const LOG_MAX_FILES: usize = 5;

// ============================================================================
// CONTAINER CONSTANTS
// ============================================================================

/// Name of the built-in environment bean
pub const ENVIRONMENT_BEAN_NAME: &str = "environment";

/// Name of the built-in event bus bean
pub const EVENT_BUS_BEAN_NAME: &str = "eventBus";

/// Name of the auto-configured transaction manager bean
pub const TRANSACTION_MANAGER_BEAN_NAME: &str = "transactionManager";
