/// App context
pub mod app_context;
/// Constants
pub mod constants;
/// Logger
pub mod logger;
/// Alloy backed chain and router clients
pub mod providers;
