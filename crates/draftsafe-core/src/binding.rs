//! Element binding layer.
//!
//! Glue between an editable element (input, textarea, content-editable
//! region, or a whole form) and the auto-save manager. The binding forwards
//! every observed change to `track_change` -- debouncing is the manager's
//! job -- and writes restored content back into the element.
//!
//! UI frameworks implement `EditableElement` for their own element handles;
//! `TextElement` and `FormElement` are plain in-memory implementations.

use std::collections::BTreeMap;
use std::sync::Arc;

use draftsafe_types::entry::{AutoSaveEntry, EntryMetadata, FieldKind};
use draftsafe_types::error::RecoveryError;
use draftsafe_types::storage::SaveOutcome;

use crate::manager::AutoSaveManager;
use crate::recovery::RecoveryCoordinator;
use crate::storage::AutoSaveStorage;

#[derive(Debug, thiserror::Error)]
pub enum BindingError {
    #[error("no element attached")]
    NoElement,

    #[error("cannot apply content to {kind}: {reason}")]
    Apply { kind: FieldKind, reason: String },
}

/// An element whose value can be read and replaced.
pub trait EditableElement: Send {
    fn kind(&self) -> FieldKind;

    fn read_value(&self) -> String;

    fn write_value(&mut self, value: &str) -> Result<(), BindingError>;
}

/// A single text-bearing element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextElement {
    kind: FieldKind,
    value: String,
}

impl TextElement {
    pub fn input(value: impl Into<String>) -> Self {
        Self {
            kind: FieldKind::Input,
            value: value.into(),
        }
    }

    pub fn textarea(value: impl Into<String>) -> Self {
        Self {
            kind: FieldKind::Textarea,
            value: value.into(),
        }
    }

    /// A content-editable region; the value is its HTML.
    pub fn content_editable(html: impl Into<String>) -> Self {
        Self {
            kind: FieldKind::ContentEditable,
            value: html.into(),
        }
    }

    pub fn set(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl EditableElement for TextElement {
    fn kind(&self) -> FieldKind {
        self.kind
    }

    fn read_value(&self) -> String {
        self.value.clone()
    }

    fn write_value(&mut self, value: &str) -> Result<(), BindingError> {
        self.value = value.to_string();
        Ok(())
    }
}

/// A form whose named fields are saved together as one JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormElement {
    fields: BTreeMap<String, String>,
}

impl FormElement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

impl EditableElement for FormElement {
    fn kind(&self) -> FieldKind {
        FieldKind::Form
    }

    fn read_value(&self) -> String {
        serde_json::to_string(&self.fields).unwrap_or_default()
    }

    fn write_value(&mut self, value: &str) -> Result<(), BindingError> {
        let fields: BTreeMap<String, String> =
            serde_json::from_str(value).map_err(|e| BindingError::Apply {
                kind: FieldKind::Form,
                reason: e.to_string(),
            })?;
        self.fields = fields;
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct BindingOptions {
    /// Apply recovered content on mount without asking.
    pub auto_restore: bool,
    pub form_name: Option<String>,
    pub label: Option<String>,
}

/// Binds one element to one tracked id.
pub struct AutoSaveBinding<S, E> {
    id: String,
    path: String,
    options: BindingOptions,
    manager: AutoSaveManager<S>,
    recovery: Arc<RecoveryCoordinator<S>>,
    element: Option<E>,
}

impl<S, E> AutoSaveBinding<S, E>
where
    S: AutoSaveStorage + 'static,
    E: EditableElement,
{
    pub fn new(
        recovery: Arc<RecoveryCoordinator<S>>,
        id: impl Into<String>,
        path: impl Into<String>,
        options: BindingOptions,
    ) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            options,
            manager: recovery.manager().clone(),
            recovery,
            element: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Attach (or detach, with `None`) the element. Returns the previous one.
    pub fn set_element_ref(&mut self, element: Option<E>) -> Option<E> {
        std::mem::replace(&mut self.element, element)
    }

    pub fn element(&self) -> Option<&E> {
        self.element.as_ref()
    }

    pub fn element_mut(&mut self) -> Option<&mut E> {
        self.element.as_mut()
    }

    fn metadata(&self, kind: FieldKind) -> EntryMetadata {
        EntryMetadata {
            field_kind: Some(kind),
            form_name: self.options.form_name.clone(),
            label: self.options.label.clone(),
        }
    }

    /// Forward the element's current value to the manager.
    ///
    /// Call on every input/change event.
    pub fn handle_input(&self) -> Result<(), BindingError> {
        let element = self.element.as_ref().ok_or(BindingError::NoElement)?;
        self.manager.track_change(
            &self.id,
            &element.read_value(),
            &self.path,
            self.metadata(element.kind()),
        );
        Ok(())
    }

    /// Look for recoverable content and, with `auto_restore`, apply it.
    ///
    /// Returns the restored entry, if any.
    pub async fn mount(&mut self) -> Option<AutoSaveEntry> {
        let candidates = self.recovery.scan(&self.path, &[self.id.as_str()]).await;
        if candidates.is_empty() || !self.options.auto_restore {
            return None;
        }
        self.restore_content().await
    }

    /// Save the element's current value immediately.
    pub async fn save_content(&self) -> SaveOutcome {
        if self.handle_input().is_err() {
            return SaveOutcome::NothingPending;
        }
        self.manager.force_save(&self.id).await
    }

    /// Apply recovered content to the element.
    ///
    /// Accepts the pending recovery candidate when there is one. With no
    /// candidate for the id the stored entry is read directly; a candidate
    /// that was already resolved (dismissed or restored) is not applied.
    pub async fn restore_content(&mut self) -> Option<AutoSaveEntry> {
        if self.element.is_none() {
            tracing::debug!(id = %self.id, "restore requested with no element attached");
            return None;
        }

        let entry = match self.recovery.accept(&self.id) {
            Ok(entry) => entry,
            Err(RecoveryError::UnknownCandidate(_)) => {
                let entry = self.manager.get_entry(&self.id).await?;
                self.manager.adopt_recovered(&entry);
                entry
            }
            Err(e) => {
                tracing::debug!(id = %self.id, error = %e, "restore skipped");
                return None;
            }
        };

        let element = self.element.as_mut()?;
        match element.write_value(&entry.content) {
            Ok(()) => Some(entry),
            Err(e) => {
                tracing::warn!(id = %self.id, error = %e, "failed to apply restored content");
                None
            }
        }
    }

    /// Delete the saved entry, typically after a successful submit.
    pub async fn clear_auto_save(&self) {
        self.manager.clear_entry(&self.id).await;
    }

    /// Detach from the element, dropping any write still waiting.
    pub fn unmount(&mut self) -> Option<E> {
        self.manager.cancel_pending(&self.id);
        self.element.take()
    }
}
