pub mod codec;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod registry;
pub mod session;
pub mod startup;
pub mod tally;
