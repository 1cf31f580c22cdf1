#![allow(non_snake_case)]
pub mod config;
pub mod consistency;
pub mod error;
pub mod evaluation;
pub mod plotting;
pub mod simulator;
pub mod state_estimator;
pub mod tracking;
