mod environment;
mod helpers;
mod secret;

pub use environment::{Environment, EnvironmentParseError};
pub use helpers::parse_boolean_flag;
pub use secret::Secret;
