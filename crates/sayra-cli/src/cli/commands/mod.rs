pub mod config;
pub mod orb;
