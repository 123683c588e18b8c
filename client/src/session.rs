//! The session object a front end drives.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use docchain_backend::{HealthReply, HttpBackend, RegistryBackend};
use docchain_crypto::DocumentFile;
use docchain_ledger::{JsonRpcProvider, LedgerAdapter};
use docchain_registration::{
    ConfirmedRegistration, Coordinator, CoordinatorOptions, MinedCheckpoint, RegistrationOutcome,
    RegistrationState,
};
use docchain_types::validate::{check_extension, check_size, validate_owner};
use docchain_types::{DocumentId, DocumentRecord, FileHash, HistoryEntry, RegistryStats};
use docchain_verification::{Reconciler, VerificationOutcome};
use tokio::sync::watch;

use crate::config::ClientConfig;
use crate::error::{InputError, SessionError};

/// Listing, history and stats fetched together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dashboard {
    pub documents: Vec<DocumentRecord>,
    pub history: Vec<HistoryEntry>,
    pub stats: RegistryStats,
}

/// Holds the selected file and runs one operation at a time on it.
pub struct Session {
    config: ClientConfig,
    backend: Arc<dyn RegistryBackend>,
    coordinator: Coordinator,
    reconciler: Reconciler,
    selected: Mutex<Option<DocumentFile>>,
    busy: AtomicBool,
    progress: watch::Sender<RegistrationState>,
}

/// Clears the busy flag when an operation ends.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Session {
    pub fn new(
        config: ClientConfig,
        backend: Arc<dyn RegistryBackend>,
        ledger: Option<Arc<dyn LedgerAdapter>>,
    ) -> Self {
        let options = match &config.ledger {
            Some(l) => CoordinatorOptions {
                method: l.method.clone(),
                from: l.from.clone(),
            },
            None => CoordinatorOptions::default(),
        };
        let (progress, _) = watch::channel(RegistrationState::Idle);
        Self {
            coordinator: Coordinator::new(backend.clone(), ledger, options),
            reconciler: Reconciler::new(backend.clone()),
            backend,
            config,
            selected: Mutex::new(None),
            busy: AtomicBool::new(false),
            progress,
        }
    }

    /// Connect to the configured registry and, if configured, ledger node.
    pub fn from_config(config: ClientConfig) -> Result<Self, SessionError> {
        let backend = HttpBackend::with_timeouts(
            config.backend_url.clone(),
            config.request_timeout(),
            config.connect_timeout(),
        )?;
        let ledger = match &config.ledger {
            Some(l) => {
                let provider = JsonRpcProvider::new(l.rpc_url.clone(), l.receipt_poll_interval())
                    .map_err(|e| SessionError::Config(e.to_string()))?;
                Some(Arc::new(provider) as Arc<dyn LedgerAdapter>)
            }
            None => None,
        };
        tracing::debug!(
            backend = %config.backend_url,
            ledger = config.ledger.is_some(),
            "session configured"
        );
        Ok(Self::new(config, Arc::new(backend), ledger))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    fn begin(&self) -> Result<BusyGuard<'_>, SessionError> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SessionError::Busy)?;
        Ok(BusyGuard(&self.busy))
    }

    fn selection(&self) -> MutexGuard<'_, Option<DocumentFile>> {
        self.selected
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Registration progress. The latest state is always readable; no
    /// observer ever blocks the session.
    pub fn subscribe(&self) -> watch::Receiver<RegistrationState> {
        self.progress.subscribe()
    }

    /// Load, check and fingerprint a file from disk.
    pub fn select_file(&self, path: impl AsRef<Path>) -> Result<FileHash, SessionError> {
        let path = path.as_ref();
        let file = DocumentFile::load(path).map_err(|source| SessionError::Io {
            path: path.display().to_string(),
            source,
        })?;
        self.select(file)
    }

    /// Select in-memory contents under `file_name`.
    pub fn select_bytes(
        &self,
        file_name: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<FileHash, SessionError> {
        self.select(DocumentFile::from_bytes(file_name, bytes))
    }

    fn select(&self, file: DocumentFile) -> Result<FileHash, SessionError> {
        if self.is_busy() {
            return Err(SessionError::Busy);
        }
        check_extension(file.file_name())?;
        check_size(file.len())?;
        let fingerprint = file.fingerprint();
        tracing::info!(file = file.file_name(), %fingerprint, "file selected");
        *self.selection() = Some(file);
        Ok(fingerprint)
    }

    /// Fingerprint of the selected file.
    pub fn fingerprint(&self) -> Option<FileHash> {
        self.selection().as_ref().map(DocumentFile::fingerprint)
    }

    pub fn selected_file_name(&self) -> Option<String> {
        self.selection()
            .as_ref()
            .map(|f| f.file_name().to_string())
    }

    pub fn clear_selection(&self) {
        *self.selection() = None;
    }

    fn selected_file(&self) -> Result<DocumentFile, SessionError> {
        self.selection()
            .clone()
            .ok_or(SessionError::Input(InputError::NoFileSelected))
    }

    /// Register the selected file. `owner` falls back to the configured one.
    pub async fn register(&self, owner: Option<&str>) -> Result<RegistrationOutcome, SessionError> {
        let _busy = self.begin()?;
        let file = self.selected_file()?;
        let owner = validate_owner(Some(owner.unwrap_or(&self.config.owner)))?;

        self.progress.send_replace(RegistrationState::Idle);
        Ok(self.coordinator.register(&file, &owner, &self.progress).await?)
    }

    /// Verify the selected file, optionally against a claimed document id.
    pub async fn verify(&self, claimed: Option<&str>) -> Result<VerificationOutcome, SessionError> {
        let _busy = self.begin()?;
        let file = self.selected_file()?;
        let claimed = claimed
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(DocumentId::parse)
            .transpose()?;

        let outcome = self.reconciler.verify(&file, claimed.as_ref()).await?;
        tracing::info!(file = file.file_name(), outcome = outcome.label(), "verification finished");
        Ok(outcome)
    }

    /// Re-drive confirmation of an already mined registration.
    pub async fn confirm(
        &self,
        checkpoint: &MinedCheckpoint,
    ) -> Result<ConfirmedRegistration, SessionError> {
        let _busy = self.begin()?;
        let confirmed = self.coordinator.confirm(checkpoint).await?;
        self.progress
            .send_replace(RegistrationState::Confirmed(confirmed.clone()));
        Ok(confirmed)
    }

    pub async fn documents(&self) -> Result<Vec<DocumentRecord>, SessionError> {
        Ok(self.backend.documents().await?)
    }

    pub async fn history(&self) -> Result<Vec<HistoryEntry>, SessionError> {
        Ok(self.backend.history().await?)
    }

    pub async fn stats(&self) -> Result<RegistryStats, SessionError> {
        Ok(self.backend.stats().await?)
    }

    pub async fn health(&self) -> Result<HealthReply, SessionError> {
        Ok(self.backend.health().await?)
    }

    /// Fetch listing, history and stats concurrently.
    ///
    /// Read-only, so it does not take the busy flag.
    pub async fn dashboard(&self) -> Result<Dashboard, SessionError> {
        let (documents, history, stats) = tokio::join!(
            self.backend.documents(),
            self.backend.history(),
            self.backend.stats()
        );
        Ok(Dashboard {
            documents: documents?,
            history: history?,
            stats: stats?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docchain_nullables::NullBackend;
    use docchain_types::TypesError;

    fn session() -> Session {
        Session::new(ClientConfig::default(), Arc::new(NullBackend::new()), None)
    }

    #[test]
    fn selection_is_fingerprinted() {
        let s = session();
        let hash = s.select_bytes("a.txt", b"abc".to_vec()).unwrap();
        assert_eq!(
            hash.to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(s.fingerprint(), Some(hash));
        assert_eq!(s.selected_file_name().as_deref(), Some("a.txt"));

        let replaced = s.select_bytes("a.txt", b"abd".to_vec()).unwrap();
        assert_ne!(replaced, hash);
        assert_eq!(s.fingerprint(), Some(replaced));
    }

    #[test]
    fn disallowed_extension_is_input_error() {
        let err = session().select_bytes("a.exe", b"MZ".to_vec()).unwrap_err();
        assert!(matches!(
            err,
            SessionError::Input(InputError::Invalid(TypesError::DisallowedExtension(_)))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = session().select_file("/nonexistent/a.pdf").unwrap_err();
        assert!(matches!(err, SessionError::Io { .. }));
    }

    #[tokio::test]
    async fn operations_need_a_selection() {
        let s = session();
        assert!(matches!(
            s.verify(None).await,
            Err(SessionError::Input(InputError::NoFileSelected))
        ));
        assert!(matches!(
            s.register(None).await,
            Err(SessionError::Input(InputError::NoFileSelected))
        ));
        assert!(!s.is_busy());
    }

    #[tokio::test]
    async fn malformed_hint_and_owner_are_rejected_locally() {
        let s = session();
        s.select_bytes("a.pdf", b"abc".to_vec()).unwrap();
        assert!(matches!(
            s.verify(Some("d1")).await,
            Err(SessionError::Input(InputError::Invalid(TypesError::InvalidDocumentId(_))))
        ));
        assert!(matches!(
            s.register(Some("<script>")).await,
            Err(SessionError::Input(InputError::Invalid(TypesError::InvalidOwner { .. })))
        ));
    }

    #[tokio::test]
    async fn dashboard_collects_all_three() {
        let backend = Arc::new(NullBackend::new());
        let s = Session::new(ClientConfig::default(), backend.clone(), None);
        s.select_bytes("a.pdf", b"abc".to_vec()).unwrap();
        s.register(Some("alice")).await.unwrap();

        let dash = s.dashboard().await.unwrap();
        assert_eq!(dash.documents.len(), 1);
        assert_eq!(dash.stats.pending_documents, 1);
        assert_eq!(dash.history.len(), 1);
    }
}
