#![doc = include_str!("../README.md")]

pub use crate::config::*;
pub use crate::error::Error;
pub use crate::filter::{Deduplicator, EtiFrameDecoder, Filter};
pub use crate::types::*;

pub mod config;
pub mod error;
pub mod filter;
pub mod types;
