//! Fetch slots: one AI query's last value and loading flag.
//!
//! Slot state lives in a [`watch`] channel so callers can both read it and
//! subscribe to changes. Every trigger and reset bumps the slot's `version`;
//! a fetch only publishes its result if the version it started with is still
//! current, so a reset or a newer trigger supersedes anything in flight.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::field::AiImageQuery;
use crate::ai::{self, AiService, TitleCaption};
use crate::image_data::ImageData;

/// The AI service and runtime shared by every slot of an orchestrator.
#[derive(Clone)]
pub struct QueryContext {
    service: Arc<dyn AiService>,
    runtime: Handle,
}

impl QueryContext {
    /// Bind to the tokio runtime the caller is running on.
    pub fn new(service: Arc<dyn AiService>) -> Result<Self> {
        let runtime = Handle::try_current()
            .context("AI queries must be created inside a tokio runtime")?;
        Ok(Self { service, runtime })
    }

    /// Run the service call in its own task so a panic in it surfaces as a
    /// `JoinError` instead of taking the slot's bookkeeping down with it.
    fn fetch(&self, image: Arc<ImageData>, prompt: &'static str) -> JoinHandle<Result<String>> {
        let service = Arc::clone(&self.service);
        self.runtime
            .spawn(async move { service.complete(&image, prompt).await })
    }
}

async fn join_fetch(fetch: JoinHandle<Result<String>>) -> Result<String> {
    match fetch.await {
        Ok(result) => result,
        Err(e) if e.is_panic() => anyhow::bail!("AI service panicked"),
        Err(e) => anyhow::bail!("AI fetch task ended early: {e}"),
    }
}

/// Last fetched value and loading flag of a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotState<T> {
    pub value: Option<T>,
    pub loading: bool,
    pub version: u64,
}

impl<T> Default for SlotState<T> {
    fn default() -> Self {
        Self {
            value: None,
            loading: false,
            version: 0,
        }
    }
}

impl<T> SlotState<T> {
    /// Start a fetch; returns the version the result must match.
    fn begin(&mut self) -> u64 {
        self.version += 1;
        self.loading = true;
        self.version
    }

    fn clear(&mut self) {
        self.version += 1;
        self.value = None;
        self.loading = false;
    }

    /// Publish a result if `version` is still current.
    fn finish(&mut self, version: u64, value: Option<T>) -> bool {
        if self.version != version {
            return false;
        }
        self.value = value;
        self.loading = false;
        true
    }
}

/// A single-field AI query over an image.
pub struct QuerySlot<T> {
    query: AiImageQuery,
    parse: fn(&str) -> Result<T>,
    context: QueryContext,
    state: Arc<watch::Sender<SlotState<T>>>,
}

impl<T> QuerySlot<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(context: QueryContext, query: AiImageQuery, parse: fn(&str) -> Result<T>) -> Self {
        let (state, _) = watch::channel(SlotState::default());
        Self {
            query,
            parse,
            context,
            state: Arc::new(state),
        }
    }

    /// Start fetching for `image`. A no-op when there is no image.
    pub fn trigger(&self, image: Option<&Arc<ImageData>>) {
        let Some(image) = image.cloned() else {
            log::debug!("No image data, skipping `{}` query", self.query);
            return;
        };

        let mut version = 0;
        self.state.send_modify(|s| version = s.begin());

        let state = Arc::clone(&self.state);
        let query = self.query;
        let parse = self.parse;
        let fetch = self.context.fetch(image, query.prompt());

        self.context.runtime.spawn(async move {
            let result = join_fetch(fetch).await.and_then(|text| parse(&text));

            let value = match result {
                Ok(value) => Some(value),
                Err(e) => {
                    log::warn!("AI `{query}` query failed: {e:#}");
                    None
                }
            };

            if !state.send_if_modified(|s| s.finish(version, value)) {
                log::debug!("Discarding superseded `{query}` result");
            }
        });
    }

    /// Clear the value and stop loading. Any fetch in flight is discarded.
    pub fn reset(&self) {
        self.state.send_modify(SlotState::clear);
    }

    pub fn value(&self) -> Option<T> {
        self.state.borrow().value.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    #[cfg(test)]
    pub(crate) fn snapshot(&self) -> SlotState<T> {
        self.state.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<SlotState<T>> {
        self.state.subscribe()
    }

    /// Resolve once the slot is not loading.
    pub async fn wait_idle(&self) {
        let mut rx = self.subscribe();
        let _ = rx.wait_for(|s| !s.loading).await;
    }

    #[cfg(test)]
    pub(crate) fn set_value(&self, value: Option<T>) {
        self.state.send_modify(|s| s.value = value);
    }
}

/// Combined title and caption state, fetched in one round trip but reset
/// independently.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleCaptionState {
    pub title: SlotState<String>,
    pub caption: SlotState<String>,
}

/// The combined title + caption query.
pub struct TitleCaptionSlot {
    context: QueryContext,
    state: Arc<watch::Sender<TitleCaptionState>>,
}

impl TitleCaptionSlot {
    pub fn new(context: QueryContext) -> Self {
        let (state, _) = watch::channel(TitleCaptionState::default());
        Self {
            context,
            state: Arc::new(state),
        }
    }

    /// Start fetching both fields for `image`. A no-op when there is no image.
    pub fn trigger(&self, image: Option<&Arc<ImageData>>) {
        let Some(image) = image.cloned() else {
            log::debug!("No image data, skipping title+caption query");
            return;
        };

        let mut versions = (0, 0);
        self.state
            .send_modify(|s| versions = (s.title.begin(), s.caption.begin()));

        let state = Arc::clone(&self.state);
        let fetch = self.context.fetch(image, ai::TITLE_CAPTION_PROMPT);

        self.context.runtime.spawn(async move {
            let result = join_fetch(fetch)
                .await
                .and_then(|text| ai::parse_title_caption(&text));

            let TitleCaption { title, caption } = result.unwrap_or_else(|e| {
                log::warn!("AI title+caption query failed: {e:#}");
                TitleCaption::default()
            });

            let published = state.send_if_modified(|s| {
                let title_published = s.title.finish(versions.0, title);
                let caption_published = s.caption.finish(versions.1, caption);
                title_published || caption_published
            });
            if !published {
                log::debug!("Discarding superseded title+caption result");
            }
        });
    }

    pub fn reset_title(&self) {
        self.state.send_modify(|s| s.title.clear());
    }

    pub fn reset_caption(&self) {
        self.state.send_modify(|s| s.caption.clear());
    }

    pub fn title(&self) -> Option<String> {
        self.state.borrow().title.value.clone()
    }

    pub fn caption(&self) -> Option<String> {
        self.state.borrow().caption.value.clone()
    }

    pub fn is_loading_title(&self) -> bool {
        self.state.borrow().title.loading
    }

    pub fn is_loading_caption(&self) -> bool {
        self.state.borrow().caption.loading
    }

    #[cfg(test)]
    pub(crate) fn snapshot(&self) -> TitleCaptionState {
        self.state.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<TitleCaptionState> {
        self.state.subscribe()
    }

    /// Resolve once neither side is loading.
    pub async fn wait_idle(&self) {
        let mut rx = self.subscribe();
        let _ = rx
            .wait_for(|s| !s.title.loading && !s.caption.loading)
            .await;
    }

    #[cfg(test)]
    pub(crate) fn set_values(&self, title: Option<String>, caption: Option<String>) {
        self.state.send_modify(|s| {
            s.title.value = title;
            s.caption.value = caption;
        });
    }
}
