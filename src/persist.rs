//! The persistence orchestrator: tiered save and load of annotation
//! documents.
//!
//! Remote transport and local fallback storage are external collaborators
//! behind the [`RemoteStore`] and [`FallbackStore`] seams. The orchestrator
//! drives one save/load cycle at a time across them:
//!
//! - **Load**: resolve manifest, fetch the annotation document, parse. A
//!   missing or unreadable remote document is not an error; it means "no
//!   annotations yet" and yields a fresh empty document.
//! - **Save**: serialize the live session first, then POST to the save
//!   endpoint. On transport failure the serialized document goes to the
//!   local fallback slot and the outcome is reported as a downgraded
//!   success. Only a failure of the fallback tier itself escalates.

use std::time::Duration;

use serde_json::{Value, json};
use tokio::time;

use crate::error::{SaveError, StorageError, TransportError};
use crate::extract::{self, DrawingSurface};
use crate::model::{AnnotationDocument, EditorState, ImageEntry};
use crate::resolve::{self, ResolvedProject};

/// Local-storage slot for annotations that could not reach the server.
pub const FALLBACK_KEY: &str = "annotation";

/// Default deadline for a single remote call.
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(10);

/// Remote save/load endpoint, e.g. an HTTP client bound to the configured
/// server.
///
/// Futures need not be `Send`: there is a single editing session per process
/// and all persistence runs on one cooperative scheduler.
#[allow(async_fn_in_trait)]
pub trait RemoteStore {
    /// Fetch a JSON document. Non-success responses are errors.
    async fn get_json(&self, path: &str) -> Result<Value, TransportError>;

    /// POST a JSON body. Non-success responses are errors.
    async fn post_json(&self, path: &str, body: &Value) -> Result<(), TransportError>;
}

/// Local fallback storage, e.g. browser localStorage or a scratch file.
pub trait FallbackStore {
    /// Store a value under a key, replacing any previous value.
    fn put(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Read a value back, if present.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
}

/// Which save body to send. Callers select the mode; the core never infers
/// it from context.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveMode {
    /// Path plus document only.
    AnnotationOnly,
    /// Editor state plus document plus image manifest.
    FullProject {
        /// Editor state to persist alongside the annotation.
        editor: EditorState,
        /// Image manifest entries to persist.
        images: Vec<ImageEntry>,
    },
}

/// How a save settled. `FallbackSaved` is a downgraded success, not a plain
/// one: the data is safe locally but the server never saw it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The remote endpoint acknowledged the write.
    Acknowledged,
    /// Server unreachable; document stored in the local fallback slot.
    FallbackSaved,
}

/// How a load settled. Both variants carry a usable document.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// The remote document was fetched and parsed.
    Loaded(AnnotationDocument),
    /// No usable remote document; a fresh empty one takes its place.
    FallbackEmpty(AnnotationDocument),
}

impl LoadOutcome {
    /// Unwrap into the document either way.
    pub fn into_document(self) -> AnnotationDocument {
        match self {
            LoadOutcome::Loaded(doc) | LoadOutcome::FallbackEmpty(doc) => doc,
        }
    }
}

/// Identifies one load so a superseded load's late result can be discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

/// A completed load: where the annotation lives, what the manifest declared,
/// and the document itself.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedProject {
    /// Ticket of the load that produced this result.
    pub ticket: LoadTicket,
    /// Resolved annotation document location.
    pub annotation_path: String,
    /// Images declared by the manifest (empty in direct-image mode).
    pub images: Vec<ImageEntry>,
    /// Opaque editor configuration, if the manifest carried one.
    pub editor: Option<Value>,
    /// The document, loaded or defaulted.
    pub outcome: LoadOutcome,
}

/// Tracks whether the session has unsaved changes and when it last saved.
#[derive(Debug, Default)]
pub struct SaveState {
    dirty: bool,
    last_save_ms: Option<u64>,
}

impl SaveState {
    /// Mark that the session changed since the last save.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Whether there are unsaved changes.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Record a settled save (remote or fallback tier).
    pub fn mark_saved(&mut self) {
        self.dirty = false;
        self.last_save_ms = Some(crate::model::now_ms());
    }

    /// Record a save that failed outright. The dirty flag stays set so the
    /// user never loses data silently.
    pub fn mark_save_failed(&mut self) {
        log::trace!("save failed, keeping unsaved-changes flag");
    }

    /// Epoch milliseconds of the last settled save.
    pub fn last_save_ms(&self) -> Option<u64> {
        self.last_save_ms
    }
}

/// Admission control for saves: at most one in flight, later requests
/// coalesce into a single follow-up run.
///
/// Overlapping saves to the same document must never race on the remote
/// endpoint; the document carries no version token to detect lost updates.
#[derive(Debug, Default)]
pub struct SaveGate {
    in_flight: bool,
    queued: bool,
}

impl SaveGate {
    /// Try to start a save. When one is already in flight the request is
    /// queued instead and `false` is returned.
    pub fn try_begin(&mut self) -> bool {
        if self.in_flight {
            self.queued = true;
            log::debug!("save already in flight, request coalesced");
            false
        } else {
            self.in_flight = true;
            true
        }
    }

    /// Finish the in-flight save. Returns `true` when a coalesced request is
    /// waiting and the caller should save again.
    pub fn finish(&mut self) -> bool {
        self.in_flight = false;
        std::mem::take(&mut self.queued)
    }

    /// Whether a save is currently in flight.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }
}

/// Drives save and load sequences across the remote endpoint and the local
/// fallback tier.
pub struct Orchestrator<R, F> {
    remote: R,
    fallback: F,
    save_endpoint: String,
    timeout: Duration,
    save_state: SaveState,
    gate: SaveGate,
    load_generation: u64,
}

impl<R: RemoteStore, F: FallbackStore> Orchestrator<R, F> {
    /// Create an orchestrator bound to a save endpoint base URL.
    pub fn new(remote: R, fallback: F, save_endpoint: impl Into<String>) -> Self {
        Self {
            remote,
            fallback,
            save_endpoint: save_endpoint.into(),
            timeout: DEFAULT_REMOTE_TIMEOUT,
            save_state: SaveState::default(),
            gate: SaveGate::default(),
            load_generation: 0,
        }
    }

    /// Override the remote-call deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Mark the session as having unsaved changes.
    pub fn mark_dirty(&mut self) {
        self.save_state.mark_dirty();
    }

    /// Whether the session has unsaved changes.
    pub fn has_unsaved_changes(&self) -> bool {
        self.save_state.is_dirty()
    }

    /// Epoch milliseconds of the last settled save, if any.
    pub fn last_save_ms(&self) -> Option<u64> {
        self.save_state.last_save_ms()
    }

    /// Try to admit a save; see [`SaveGate::try_begin`].
    pub fn try_begin_save(&mut self) -> bool {
        self.gate.try_begin()
    }

    /// Settle the admitted save; see [`SaveGate::finish`].
    pub fn finish_save(&mut self) -> bool {
        self.gate.finish()
    }

    /// Start a new load, superseding any earlier one.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.load_generation += 1;
        LoadTicket(self.load_generation)
    }

    /// Whether a load result is still the current one. Late results of
    /// superseded loads must be discarded by the caller.
    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        ticket.0 == self.load_generation
    }

    /// Load the annotation document for an image or project path.
    ///
    /// Never fails: transport errors, timeouts and schema rejections all
    /// degrade to a fresh empty document.
    pub async fn load(&self, ticket: LoadTicket, path: &str) -> LoadedProject {
        let ResolvedProject { annotation_path, images, editor } =
            resolve::resolve(&self.remote, path).await;

        let outcome = match time::timeout(self.timeout, self.remote.get_json(&annotation_path))
            .await
        {
            Ok(Ok(raw)) => match AnnotationDocument::parse(raw) {
                Ok(doc) => {
                    log::info!(
                        "loaded annotation from {} ({} features)",
                        annotation_path,
                        doc.feature_count()
                    );
                    LoadOutcome::Loaded(doc)
                }
                Err(e) => {
                    log::warn!(
                        "annotation at {} was rejected, starting empty: {}",
                        annotation_path,
                        e
                    );
                    LoadOutcome::FallbackEmpty(AnnotationDocument::empty())
                }
            },
            Ok(Err(e)) => {
                log::info!("no annotation at {}, starting empty: {}", annotation_path, e);
                LoadOutcome::FallbackEmpty(AnnotationDocument::empty())
            }
            Err(_) => {
                log::warn!(
                    "annotation fetch from {} timed out after {:?}, starting empty",
                    annotation_path,
                    self.timeout
                );
                LoadOutcome::FallbackEmpty(AnnotationDocument::empty())
            }
        };

        LoadedProject { ticket, annotation_path, images, editor, outcome }
    }

    /// Save the current session state.
    ///
    /// The session is serialized before any network I/O so the payload is a
    /// single consistent snapshot and is ready for the fallback tier no
    /// matter how the transport fares.
    pub async fn save(
        &mut self,
        surface: &impl DrawingSurface,
        annotation_path: &str,
        mode: SaveMode,
    ) -> Result<SaveOutcome, SaveError> {
        let mut document = extract::snapshot(surface);
        document.touch();

        let (fallback_text, body) = match encode_save(&document, annotation_path, &mode) {
            Ok(encoded) => encoded,
            Err(e) => {
                self.save_state.mark_save_failed();
                return Err(SaveError::Encode(e));
            }
        };

        let url = format!("{}/save", self.save_endpoint);
        let sent = match time::timeout(self.timeout, self.remote.post_json(&url, &body)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(self.timeout)),
        };

        match sent {
            Ok(()) => {
                log::info!("annotation saved to {}", url);
                self.save_state.mark_saved();
                Ok(SaveOutcome::Acknowledged)
            }
            Err(e) => {
                log::warn!("remote save to {} failed, using local fallback: {}", url, e);
                match self.fallback.put(FALLBACK_KEY, &fallback_text) {
                    Ok(()) => {
                        self.save_state.mark_saved();
                        Ok(SaveOutcome::FallbackSaved)
                    }
                    Err(storage) => {
                        log::error!("local fallback write failed: {}", storage);
                        self.save_state.mark_save_failed();
                        Err(storage.into())
                    }
                }
            }
        }
    }
}

/// Encode the fallback text and the mode-specific save body.
fn encode_save(
    document: &AnnotationDocument,
    annotation_path: &str,
    mode: &SaveMode,
) -> Result<(String, Value), serde_json::Error> {
    let annotation = serde_json::to_value(document)?;
    let fallback_text = annotation.to_string();

    let body = match mode {
        SaveMode::AnnotationOnly => json!({
            "annotationPath": annotation_path,
            "annotationData": annotation,
        }),
        SaveMode::FullProject { editor, images } => json!({
            "editor": serde_json::to_value(editor)?,
            "annotation": annotation,
            "images": serde_json::to_value(images)?,
        }),
    };

    Ok((fallback_text, body))
}
