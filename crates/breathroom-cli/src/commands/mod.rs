pub mod config;
pub mod patterns;
pub mod presets;
pub mod session;
