// Adapters layer: concrete implementations for external systems (browser, object storage).
// Local file storage lives with the CLI config in src/config/cli.rs.

pub mod chromium;
pub mod object_store;
