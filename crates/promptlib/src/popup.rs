//! Popup controller.
//!
//! Drives the prompt store on behalf of a shell the way the browser popup
//! did: every action reports a [`Notice`], failed backend calls leave the
//! visible list untouched, and deletes go through a pending confirmation.

use std::sync::Arc;

use promptlib_clipboard::Clipboard;
use promptlib_logging::{Logger, Notice};
use promptlib_store::{Prompt, PromptFilter, PromptStore, RemoveOutcome};
use tracing::warn;

pub struct Popup {
    store: PromptStore,
    clipboard: Arc<dyn Clipboard>,
    logger: Arc<Logger>,
    filter: PromptFilter,
    results: Vec<Prompt>,
    pending_delete: Option<String>,
    last_notice: Option<Notice>,
    stale: bool,
}

impl Popup {
    pub fn new(store: PromptStore, clipboard: Arc<dyn Clipboard>, logger: Arc<Logger>) -> Self {
        Self {
            store,
            clipboard,
            logger,
            filter: PromptFilter::default(),
            results: Vec::new(),
            pending_delete: None,
            last_notice: None,
            stale: false,
        }
    }

    pub fn store(&self) -> &PromptStore {
        &self.store
    }

    /// Prompts from the last successful refresh, newest first.
    pub fn results(&self) -> &[Prompt] {
        &self.results
    }

    /// True if the last refresh failed, so `results` come from an earlier one.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn last_notice(&self) -> Option<&Notice> {
        self.last_notice.as_ref()
    }

    pub fn pending_delete(&self) -> Option<&str> {
        self.pending_delete.as_deref()
    }

    fn notify(&mut self, notice: Notice) {
        self.logger.log(&notice);
        self.last_notice = Some(notice);
    }

    /// Re-run the search with a new filter.
    pub async fn search(&mut self, filter: PromptFilter) -> &[Prompt] {
        self.filter = filter;
        self.refresh().await
    }

    /// Re-run the current search. On failure the previous results stay.
    pub async fn refresh(&mut self) -> &[Prompt] {
        match self.store.search(&self.filter).await {
            Ok(results) => {
                self.results = results;
                self.stale = false;
            }
            Err(e) => {
                warn!(error = %e, "Failed to load prompts");
                self.stale = true;
                self.notify(Notice::StorageFailed {
                    action: "load prompts".to_string(),
                    error: e.to_string(),
                });
            }
        }
        &self.results
    }

    /// Save a new prompt, then show the full list again.
    pub async fn save(&mut self, text: &str, modality: &str, raw_tags: &str) -> Option<Prompt> {
        match self.store.add(text, modality, raw_tags).await {
            Ok(prompt) => {
                self.notify(Notice::PromptSaved {
                    id: prompt.id.clone(),
                });
                self.filter = PromptFilter::default();
                self.refresh().await;
                Some(prompt)
            }
            Err(e) if e.is_validation() => {
                self.notify(Notice::EmptyPrompt);
                None
            }
            Err(e) => {
                self.notify(Notice::StorageFailed {
                    action: "save prompt".to_string(),
                    error: e.to_string(),
                });
                None
            }
        }
    }

    /// Copy a prompt's text. Failures are reported, never retried.
    pub async fn copy(&mut self, prompt: &Prompt) -> bool {
        match self.clipboard.write_text(&prompt.text).await {
            Ok(()) => {
                self.notify(Notice::PromptCopied {
                    id: prompt.id.clone(),
                    chars: prompt.text.chars().count(),
                });
                true
            }
            Err(e) => {
                warn!(clipboard = self.clipboard.name(), error = %e, "Copy failed");
                self.notify(Notice::CopyFailed {
                    id: prompt.id.clone(),
                    error: e.to_string(),
                });
                false
            }
        }
    }

    /// Ask for confirmation before deleting `id`. Replaces any earlier request.
    pub fn request_delete(&mut self, id: impl Into<String>) {
        self.pending_delete = Some(id.into());
    }

    pub fn cancel_delete(&mut self) {
        if let Some(id) = self.pending_delete.take() {
            self.notify(Notice::DeleteCancelled { id });
        }
    }

    /// Delete the pending prompt, if any, and refresh the list.
    pub async fn confirm_delete(&mut self) -> Option<RemoveOutcome> {
        let id = self.pending_delete.take()?;

        match self.store.remove(&id).await {
            Ok(outcome) => {
                let notice = match outcome {
                    RemoveOutcome::Removed(_) => Notice::PromptDeleted { id },
                    RemoveOutcome::NotFound => Notice::NothingToDelete { id },
                };
                self.notify(notice);
                self.refresh().await;
                Some(outcome)
            }
            Err(e) => {
                self.notify(Notice::StorageFailed {
                    action: "delete prompt".to_string(),
                    error: e.to_string(),
                });
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use promptlib_clipboard::ClipboardError;
    use promptlib_logging::LogFormat;
    use promptlib_store::{Backend, BackendError, MemoryBackend};
    use serde_json::Value;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingClipboard {
        copied: Mutex<Vec<String>>,
        broken: bool,
    }

    #[async_trait]
    impl Clipboard for RecordingClipboard {
        fn name(&self) -> &str {
            "recording"
        }

        async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
            if self.broken {
                return Err(ClipboardError::Unavailable("no display".to_string()));
            }
            self.copied.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    /// Memory backend whose reads can be switched off.
    #[derive(Default)]
    struct SwitchableBackend {
        inner: MemoryBackend,
        down: AtomicBool,
    }

    #[async_trait]
    impl Backend for SwitchableBackend {
        fn name(&self) -> &str {
            "switchable"
        }

        async fn get(&self, key: &str) -> Result<Option<Value>, BackendError> {
            if self.down.load(Ordering::SeqCst) {
                return Err(BackendError::Unavailable("offline".to_string()));
            }
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: Value) -> Result<(), BackendError> {
            if self.down.load(Ordering::SeqCst) {
                return Err(BackendError::Unavailable("offline".to_string()));
            }
            self.inner.set(key, value).await
        }
    }

    fn popup_with(clipboard: Arc<RecordingClipboard>) -> Popup {
        let store = PromptStore::new(Arc::new(MemoryBackend::new()));
        Popup::new(store, clipboard, Arc::new(Logger::new(LogFormat::Compact)))
    }

    #[tokio::test]
    async fn test_save_refreshes_full_list() {
        let mut popup = popup_with(Arc::new(RecordingClipboard::default()));
        popup.search(PromptFilter::new("nothing")).await;

        let saved = popup.save("Describe a sunset", "image", "art").await.unwrap();

        assert_eq!(
            popup.last_notice(),
            Some(&Notice::PromptSaved {
                id: saved.id.clone()
            })
        );
        assert_eq!(popup.results(), &[saved]);
    }

    #[tokio::test]
    async fn test_save_blank_prompt() {
        let mut popup = popup_with(Arc::new(RecordingClipboard::default()));

        assert!(popup.save("  ", "text", "").await.is_none());
        assert_eq!(popup.last_notice(), Some(&Notice::EmptyPrompt));
        assert!(popup.store().list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_copy_success_and_failure() {
        let clipboard = Arc::new(RecordingClipboard::default());
        let mut popup = popup_with(clipboard.clone());
        let prompt = popup.save("copy me", "text", "").await.unwrap();

        assert!(popup.copy(&prompt).await);
        assert_eq!(*clipboard.copied.lock().unwrap(), vec!["copy me"]);

        let broken = Arc::new(RecordingClipboard {
            broken: true,
            ..Default::default()
        });
        let mut popup = popup_with(broken);
        assert!(!popup.copy(&prompt).await);
        assert!(matches!(
            popup.last_notice(),
            Some(Notice::CopyFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_delete_needs_confirmation() {
        let mut popup = popup_with(Arc::new(RecordingClipboard::default()));
        let prompt = popup.save("to delete", "text", "").await.unwrap();

        // Nothing pending: confirming does nothing.
        assert!(popup.confirm_delete().await.is_none());

        popup.request_delete(&prompt.id);
        popup.cancel_delete();
        assert!(popup.pending_delete().is_none());
        assert_eq!(popup.results().len(), 1);

        popup.request_delete(&prompt.id);
        assert_eq!(popup.pending_delete(), Some(prompt.id.as_str()));
        assert_eq!(
            popup.confirm_delete().await,
            Some(RemoveOutcome::Removed(1))
        );
        assert!(popup.results().is_empty());
        assert!(popup.pending_delete().is_none());
    }

    #[tokio::test]
    async fn test_delete_unknown_id_is_not_an_error() {
        let mut popup = popup_with(Arc::new(RecordingClipboard::default()));

        popup.request_delete("ghost");
        assert_eq!(popup.confirm_delete().await, Some(RemoveOutcome::NotFound));
        assert_eq!(
            popup.last_notice(),
            Some(&Notice::NothingToDelete {
                id: "ghost".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_results() {
        let backend = Arc::new(SwitchableBackend::default());
        let store = PromptStore::new(backend.clone());
        let mut popup = Popup::new(
            store,
            Arc::new(RecordingClipboard::default()),
            Arc::new(Logger::new(LogFormat::Compact)),
        );

        popup.save("still visible", "text", "").await.unwrap();
        backend.down.store(true, Ordering::SeqCst);

        assert_eq!(popup.search(PromptFilter::new("zzz")).await.len(), 1);
        assert!(popup.is_stale());
        assert!(matches!(
            popup.last_notice(),
            Some(Notice::StorageFailed { .. })
        ));

        assert!(popup.save("lost", "text", "").await.is_none());
        assert_eq!(popup.results().len(), 1);
    }
}
