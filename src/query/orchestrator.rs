use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::field::{AiAutoGeneratedField, AiImageQuery};
use super::slot::{QueryContext, QuerySlot, TitleCaptionSlot};
use crate::ai::{self, AiService};
use crate::image_data::ImageData;

/// A point-in-time view of every AI field and its loading flag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AiContent {
    pub title: Option<String>,
    pub caption: Option<String>,
    pub tags: Option<Vec<String>>,
    pub semantic_description: Option<String>,
    pub is_loading: bool,
    pub is_loading_title: bool,
    pub is_loading_caption: bool,
    pub is_loading_tags: bool,
    pub is_loading_semantic: bool,
}

/// Coordinates the AI queries for one image.
///
/// Title and caption can come from either the combined title+caption query
/// or their own solo queries; a non-empty combined value always wins. Once an
/// image is available and `fields_to_auto_generate` is non-empty, the
/// listed fields are requested automatically, at most once per orchestrator.
///
/// Must be created inside a tokio runtime; fetches run as tasks on it.
///
/// # Example
///
/// ```rust,no_run
/// use ai_image_queries::ai::OpenAiService;
/// use ai_image_queries::image_data::{ImageData, DEFAULT_MAX_DIMENSION};
/// use ai_image_queries::query::{AiAutoGeneratedField, QueryOrchestrator};
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let service = Arc::new(OpenAiService::new("sk-...".into(), "gpt-4o-mini".into()));
/// let image = ImageData::from_path("photo.jpg".as_ref(), DEFAULT_MAX_DIMENSION)?;
///
/// let orchestrator = QueryOrchestrator::new(
///     service,
///     AiAutoGeneratedField::ALL.to_vec(),
///     Some(image),
/// )?;
/// orchestrator.wait_until_idle().await;
/// println!("Title: {:?}", orchestrator.title());
/// # Ok(())
/// # }
/// ```
pub struct QueryOrchestrator {
    fields_to_auto_generate: Vec<AiAutoGeneratedField>,
    image_data: Option<Arc<ImageData>>,
    has_run_once: AtomicBool,
    title_caption: TitleCaptionSlot,
    title: QuerySlot<String>,
    caption: QuerySlot<String>,
    tags: QuerySlot<Vec<String>>,
    semantic: QuerySlot<String>,
}

impl QueryOrchestrator {
    pub fn new(
        service: Arc<dyn AiService>,
        fields_to_auto_generate: Vec<AiAutoGeneratedField>,
        image_data: Option<ImageData>,
    ) -> Result<Self> {
        let context = QueryContext::new(service)?;

        let orchestrator = Self {
            fields_to_auto_generate,
            image_data: image_data.map(Arc::new),
            has_run_once: AtomicBool::new(false),
            title_caption: TitleCaptionSlot::new(context.clone()),
            title: QuerySlot::new(context.clone(), AiImageQuery::Title, ai::parse_title),
            caption: QuerySlot::new(context.clone(), AiImageQuery::Caption, ai::parse_text),
            tags: QuerySlot::new(context.clone(), AiImageQuery::Tags, ai::parse_tags),
            semantic: QuerySlot::new(context, AiImageQuery::DescriptionSmall, ai::parse_text),
        };
        orchestrator.auto_generate();
        Ok(orchestrator)
    }

    /// Replace the image. May fire the one-time automatic request.
    pub fn set_image_data(&mut self, image_data: Option<ImageData>) {
        self.image_data = image_data.map(Arc::new);
        self.auto_generate();
    }

    /// Replace the auto-generate list. May fire the one-time automatic request.
    pub fn set_fields_to_auto_generate(&mut self, fields: Vec<AiAutoGeneratedField>) {
        self.fields_to_auto_generate = fields;
        self.auto_generate();
    }

    pub fn has_run_once(&self) -> bool {
        self.has_run_once.load(Ordering::SeqCst)
    }

    fn auto_generate(&self) {
        if self.image_data.is_none() || self.fields_to_auto_generate.is_empty() {
            return;
        }
        if self.has_run_once.swap(true, Ordering::SeqCst) {
            return;
        }
        log::debug!("Auto-generating {:?}", self.fields_to_auto_generate);
        self.request(&self.fields_to_auto_generate);
    }

    /// Request every field.
    pub fn request_all(&self) {
        self.request(&AiAutoGeneratedField::ALL);
    }

    /// Request `fields`.
    ///
    /// Title and caption together go through the combined query, clearing
    /// any solo values first. Either one alone clears its combined and solo
    /// values and goes through its solo query. Tags and semantic are always
    /// fetched on their own.
    pub fn request(&self, fields: &[AiAutoGeneratedField]) {
        if cfg!(debug_assertions) {
            log::debug!("Running AI queries: {fields:?}");
        }
        self.has_run_once.store(true, Ordering::SeqCst);

        let image = self.image_data.as_ref();
        let wants = |field: AiAutoGeneratedField| fields.contains(&field);

        if wants(AiAutoGeneratedField::Title) && wants(AiAutoGeneratedField::Caption) {
            self.title.reset();
            self.caption.reset();
            self.title_caption.trigger(image);
        } else {
            if wants(AiAutoGeneratedField::Title) {
                self.title_caption.reset_title();
                self.title.reset();
                self.title.trigger(image);
            }
            if wants(AiAutoGeneratedField::Caption) {
                self.title_caption.reset_caption();
                self.caption.reset();
                self.caption.trigger(image);
            }
        }
        if wants(AiAutoGeneratedField::Tags) {
            self.tags.trigger(image);
        }
        if wants(AiAutoGeneratedField::Semantic) {
            self.semantic.trigger(image);
        }
    }

    pub fn title(&self) -> Option<String> {
        prefer_combined(self.title_caption.title(), self.title.value())
    }

    pub fn caption(&self) -> Option<String> {
        prefer_combined(self.title_caption.caption(), self.caption.value())
    }

    pub fn tags(&self) -> Option<Vec<String>> {
        self.tags.value()
    }

    pub fn semantic_description(&self) -> Option<String> {
        self.semantic.value()
    }

    pub fn is_loading_title(&self) -> bool {
        self.title_caption.is_loading_title() || self.title.is_loading()
    }

    pub fn is_loading_caption(&self) -> bool {
        self.title_caption.is_loading_caption() || self.caption.is_loading()
    }

    pub fn is_loading_tags(&self) -> bool {
        self.tags.is_loading()
    }

    pub fn is_loading_semantic(&self) -> bool {
        self.semantic.is_loading()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading_title()
            || self.is_loading_caption()
            || self.is_loading_tags()
            || self.is_loading_semantic()
    }

    pub fn content(&self) -> AiContent {
        AiContent {
            title: self.title(),
            caption: self.caption(),
            tags: self.tags(),
            semantic_description: self.semantic_description(),
            is_loading: self.is_loading(),
            is_loading_title: self.is_loading_title(),
            is_loading_caption: self.is_loading_caption(),
            is_loading_tags: self.is_loading_tags(),
            is_loading_semantic: self.is_loading_semantic(),
        }
    }

    /// Resolve once no query is loading.
    pub async fn wait_until_idle(&self) {
        tokio::join!(
            self.title_caption.wait_idle(),
            self.title.wait_idle(),
            self.caption.wait_idle(),
            self.tags.wait_idle(),
            self.semantic.wait_idle(),
        );
    }
}

/// The combined value if it is non-empty, otherwise the solo value.
fn prefer_combined(combined: Option<String>, solo: Option<String>) -> Option<String> {
    combined.filter(|v| !v.is_empty()).or(solo)
}
