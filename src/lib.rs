pub mod audit;
pub mod bootstrap;
pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod identity;
pub mod model;
pub mod services;
pub mod storage;
