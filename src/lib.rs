//! Caption extraction for video pages.
//!
//! A transcript request goes through the [`cache`], waits on the
//! [`network`] gate, then tries each [`extract`] strategy in priority order
//! under the [`retry`] policy. The result is a [`transcript::TranscriptData`]
//! that renders to plain text, SRT or WebVTT.

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod extract;
pub mod http;
pub mod network;
pub mod retry;
pub mod server;
pub mod service;
pub mod transcript;
pub mod video;
