pub mod config;
pub mod report;
pub mod validator;

pub use config::ValidatorConfig;
pub use report::{ShardReport, ValidationReport};
pub use validator::GrantValidator;
