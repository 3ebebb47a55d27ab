//! # live-playlist
//!
//! This crate scans a list of YouTube channels for broadcasts that are live
//! or scheduled, resolves a playable URL for each of them and publishes the
//! result as an extended M3U playlist to a GitHub repository (or a local
//! directory).
//!
//! ## Usage
//!
//! The binary wires everything from command line flags and the environment.
//! As a library, hand [`pipeline::run`] an [`extractor::Extractor`] and a
//! [`store::RemoteStore`]:
//!
//! ```rust,no_run
//! use live_playlist::{
//!     config::RunConfig,
//!     pipeline,
//!     store::local::LocalStore,
//!     ytdlp::{YtDlpExtractor, YtDlpOptions},
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let extractor = YtDlpExtractor::new(YtDlpOptions::default());
//!
//!     // Reads ./nkyt.txt and writes ./playlist.m3u
//!     let store = LocalStore::new(".");
//!
//!     let report = pipeline::run(&RunConfig::default(), &extractor, &store)
//!         .await
//!         .unwrap();
//!     println!("{:?}", report.outcome);
//! }
//! ```
//!
//! A run reads the channel list, probes each channel's home page, `/live`
//! and `/streams` for candidate videos, classifies every candidate and
//! renders one `#EXTINF` entry per live or upcoming video. Nothing is
//! written when no stream was found.

#![forbid(unsafe_code)]
#[macro_use]
extern crate log;

pub mod config;
pub mod extractor;
pub mod lister;
pub mod pipeline;
pub mod player_response;
pub mod playlist;
pub mod publisher;
pub mod resolver;
pub mod stats;
pub mod store;
pub mod util;
pub mod watch_page;
pub mod ytdlp;

#[cfg(test)]
mod fakes;
