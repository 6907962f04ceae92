//! Onoma renames batches of image files using labels inferred by an external
//! naming service, guaranteeing collision-free results.

pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod naming;
pub mod services;
pub mod text;
