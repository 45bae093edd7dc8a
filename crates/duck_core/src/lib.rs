pub mod clock;
pub mod config;
pub mod error;
pub mod extract;
pub mod intake;
pub mod model;
pub mod notify;
pub mod scheduler;
pub mod storage;
