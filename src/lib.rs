pub mod config;
pub mod error;
pub mod mcp;
pub mod observability;

mod util;
