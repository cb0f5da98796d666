//! Backend gateway module
//!
//! The dialog core talks to persistence only through [`BackendGateway`]:
//! - `http`: REST implementation over reqwest
//! - `memory`: in-process implementation used for demos and tests

pub mod http;
pub mod memory;

use std::future::Future;

use crate::errors::GatewayError;
use crate::word_model::{HintType, Language, ProgressRecord, QueueFilters, Settings, SettingsPatch, StudyItem};

pub use http::HttpBackend;
pub use memory::InMemoryBackend;

/// Identifier of a user inside the backend, distinct from the Telegram id
pub type BackendUserId = i64;

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Operations the dialog core needs from the persistence backend
///
/// Implementations must classify failures: no response at all is
/// [`GatewayError::Unavailable`], an explicit refusal is
/// [`GatewayError::Rejected`]. Implementations never retry.
pub trait BackendGateway: Send + Sync + 'static {
    /// Lightweight liveness probe
    fn health_check(&self) -> impl Future<Output = GatewayResult<()>> + Send;

    /// Map a Telegram user to a backend user, creating it when absent
    fn resolve_user(&self, telegram_id: i64) -> impl Future<Output = GatewayResult<BackendUserId>> + Send;

    fn list_languages(&self) -> impl Future<Output = GatewayResult<Vec<Language>>> + Send;

    /// Fetch at most `page_size` study items matching `filters`, ordered by word number
    fn fetch_study_items(
        &self,
        user_id: BackendUserId,
        language_id: &str,
        filters: QueueFilters,
        page_size: usize,
    ) -> impl Future<Output = GatewayResult<Vec<StudyItem>>> + Send;

    /// Settings for the pair, defaults when none were stored yet
    fn get_settings(
        &self,
        user_id: BackendUserId,
        language_id: &str,
    ) -> impl Future<Output = GatewayResult<Settings>> + Send;

    /// Merge `patch` into the stored settings and return the result
    fn put_settings(
        &self,
        user_id: BackendUserId,
        language_id: &str,
        patch: &SettingsPatch,
    ) -> impl Future<Output = GatewayResult<Settings>> + Send;

    fn get_progress(
        &self,
        user_id: BackendUserId,
        word_id: i64,
    ) -> impl Future<Output = GatewayResult<Option<ProgressRecord>>> + Send;

    fn put_progress(
        &self,
        user_id: BackendUserId,
        word_id: i64,
        record: &ProgressRecord,
    ) -> impl Future<Output = GatewayResult<ProgressRecord>> + Send;

    fn put_hint(
        &self,
        user_id: BackendUserId,
        word_id: i64,
        hint_type: HintType,
        text: &str,
    ) -> impl Future<Output = GatewayResult<()>> + Send;
}
