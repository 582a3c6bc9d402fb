pub use self::parser::{ArchiveConfig, AuthConfig, Config};
pub use self::validator::ConfigError;

mod parser;
mod validator;
