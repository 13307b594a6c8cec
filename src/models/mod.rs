pub mod call_log;
pub mod model;
pub mod prompt;
pub mod provider;
