pub mod config;
pub mod domain;
pub mod inbound;
pub mod maintenance;
pub mod outbound;

pub use domain::user;
