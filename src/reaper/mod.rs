pub mod activity;
pub mod audit;
pub mod catalog;
pub mod config;
pub mod exemption;
pub mod fixtures;
pub mod sweep;
pub mod util;
