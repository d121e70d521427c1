//! Erudite: structured research notes from academic papers.
//!
//! Streams note text from one of several LLM providers behind a single
//! [`generation::GenerationTransport`] seam, and drives the note, synthesis,
//! chat and search workflows on top of it.
//!
//! # Quick Start
//!
//! ```no_run
//! use erudite::prelude::*;
//! use futures::StreamExt;
//!
//! # async fn example() -> erudite::error::Result<()> {
//! let generator = Generator::new(EruditeConfig::from_env());
//! let request = GenerationRequest::builder()
//!     .model("gemini/gemini-2.5-flash".parse()?)
//!     .prompt("Summarise the attention paper in three bullet points.")
//!     .build();
//! let mut stream = generator.generate_stream(request).await?;
//! while let Some(fragment) = stream.next().await {
//!     print!("{}", fragment?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod generation;
pub mod models;
pub mod prelude;
pub mod prompts;
pub mod provider;
pub mod search;
pub mod sources;
pub mod store;
pub mod types;
pub mod workflow;

#[cfg(feature = "relay")]
pub mod relay;

#[cfg(feature = "cli")]
pub mod cli;
