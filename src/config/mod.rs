//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → command-line overrides (main.rs)
//!     → validation.rs (semantic checks)
//!     → MirrorConfig (validated, immutable)
//!     → shared with all subsystems at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, read_config, ConfigError};
pub use schema::MirrorConfig;
pub use schema::ListenerConfig;
pub use schema::SiteConfig;
pub use validation::{validate_config, ValidationError};
