// Calma - Mental-health support assistant launcher
// Library exports

pub mod config;
pub mod errors;
pub mod launcher; // FastChat component startup
pub mod prompts;
pub mod provision; // Model download and validation
pub mod safety;
pub mod server; // Chat gateway
