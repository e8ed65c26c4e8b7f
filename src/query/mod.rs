//! AI queries over a single image.
//!
//! - [`field`] — the field and query registry, with prompts
//! - [`slot`] — per-query fetch state (value, loading flag, version)
//! - [`orchestrator`] — composes the slots behind one `request` action

pub mod field;
pub mod orchestrator;
pub mod slot;

pub use field::{AiAutoGeneratedField, AiImageQuery};
pub use orchestrator::{AiContent, QueryOrchestrator};
pub use slot::{QueryContext, QuerySlot, SlotState, TitleCaptionSlot, TitleCaptionState};
