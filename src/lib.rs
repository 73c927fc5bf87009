// src/lib.rs

//! pubwatch library
//!
//! Polls a publications listing for its newest entry and sends a
//! notification once per distinct new item.

pub mod detect;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod models;
pub mod notify;
pub mod poll;
pub mod state;
pub mod utils;
