//! # ai-image-queries
//!
//! Orchestrate AI suggestions for an image: titles, captions, tags, and
//! semantic descriptions from vision models (OpenAI, Google Gemini,
//! Cloudflare Workers AI).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ai_image_queries::ai::build_service_chain;
//! use ai_image_queries::config::Config;
//! use ai_image_queries::image_data::ImageData;
//! use ai_image_queries::query::QueryOrchestrator;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(Some("config.json".as_ref()))?;
//!     let services = Arc::new(build_service_chain(&config));
//!
//!     let image = ImageData::from_path("photo.jpg".as_ref(), config.queries.max_dimension)?;
//!     let orchestrator = QueryOrchestrator::new(
//!         services,
//!         config.queries.auto_generate.clone(),
//!         Some(image),
//!     )?;
//!
//!     // The auto-generate fields are already in flight
//!     orchestrator.wait_until_idle().await;
//!     let content = orchestrator.content();
//!     println!("Title: {:?}", content.title);
//!     println!("Tags: {:?}", content.tags);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Requesting Fields
//!
//! [`QueryOrchestrator::request`](query::QueryOrchestrator::request) accepts
//! any subset of [`AiAutoGeneratedField`](query::AiAutoGeneratedField):
//!
//! | Fields requested | Queries sent |
//! |------------------|--------------|
//! | `title` + `caption` | one combined title/caption query |
//! | `title` only | solo title query |
//! | `caption` only | solo caption query |
//! | `tags` | tags query |
//! | `semantic` | short description query |
//!
//! ## Modules
//!
//! - [`ai`] — AI service trait, provider implementations, failover chain, and response parsing
//! - [`config`] — Configuration types and loading/saving
//! - [`image_data`] — Image payload preparation and file collection
//! - [`query`] — Fetch slots and the query orchestrator

pub mod ai;
pub mod config;
pub mod image_data;
pub mod query;
