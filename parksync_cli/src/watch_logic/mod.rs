pub mod config;
pub mod inbox;
pub mod logger;
pub mod render;
pub mod watch;
