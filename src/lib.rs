pub mod analyzers;
pub mod config;
pub mod fetch;
pub mod loader;
pub mod output;
pub mod pipeline;
pub mod publish;
pub mod record;
pub mod render;
pub mod transform;
