use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

/// Boxed error returned by consumer-implemented stores.
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// Stable identity key.
///
/// For provider-backed identities this is the provider's own stable user id,
/// unchanged — upsert convergence depends on it being deterministic. For
/// local identities the consumer picks the format.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into,
)]
#[serde(transparent)]
pub struct IdentityId(pub String);

impl From<&str> for IdentityId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl IdentityId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// How a [`LocalIdentity`] authenticates.
///
/// `Provider` identities carry a provider access token in their session and
/// are re-validated against the provider on every gated request; `Local`
/// identities skip that check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityKind {
    Local,
    Provider,
}

/// User profile as resolved from the provider. Transient: input to
/// [`IdentityStore::upsert`], never persisted directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteIdentity {
    /// Provider's stable user id.
    pub id: IdentityId,
    /// Display name, mutable on the provider side.
    pub name: String,
    /// Short handle, mutable on the provider side.
    pub username: String,
}

/// The durable principal owned by the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalIdentity {
    pub id: IdentityId,
    pub display_name: String,
    pub handle: String,
    #[serde(rename = "identityType")]
    pub kind: IdentityKind,
}

/// Consumer-provided identity persistence.
///
/// Called during the OAuth callback to reconcile the resolved remote profile,
/// and on every gated request to re-load the principal.
///
/// # Contract
///
/// `upsert` is idempotent on id: the first call for a remote id creates a
/// `Provider`-kind identity with `id == remote.id`; later calls refresh
/// `display_name`/`handle` but never change the id. Upsert-by-key must be
/// atomic — concurrent logins for the same remote id converge on one record
/// (last-write-wins on attributes is fine).
///
/// # Example
///
/// ```rust,ignore
/// impl IdentityStore for MyAppState {
///     async fn upsert(&self, remote: &RemoteIdentity) -> Result<LocalIdentity, StoreError> {
///         self.db.upsert_identity(remote).await
///     }
///
///     async fn find_by_id(&self, id: &IdentityId) -> Result<Option<LocalIdentity>, StoreError> {
///         self.db.find_identity(id).await
///     }
/// }
/// ```
pub trait IdentityStore: Send + Sync + 'static {
    /// Create or refresh the local identity for a resolved remote profile.
    fn upsert(
        &self,
        remote: &RemoteIdentity,
    ) -> impl Future<Output = Result<LocalIdentity, StoreError>> + Send;

    /// Look up a local identity by id. `None` covers deleted accounts.
    fn find_by_id(
        &self,
        id: &IdentityId,
    ) -> impl Future<Output = Result<Option<LocalIdentity>, StoreError>> + Send;
}

// Lets a store be shared between the auth router and the rest of the app.
impl<T: IdentityStore> IdentityStore for std::sync::Arc<T> {
    async fn upsert(&self, remote: &RemoteIdentity) -> Result<LocalIdentity, StoreError> {
        (**self).upsert(remote).await
    }

    async fn find_by_id(&self, id: &IdentityId) -> Result<Option<LocalIdentity>, StoreError> {
        (**self).find_by_id(id).await
    }
}

/// In-memory [`IdentityStore`] backed by a mutex-guarded map.
///
/// Reference implementation: gives the atomic upsert-by-key semantics the
/// trait requires. Suitable for tests and single-process deployments.
#[derive(Debug, Default)]
pub struct MemoryIdentityStore {
    inner: Mutex<HashMap<IdentityId, LocalIdentity>>,
}

impl MemoryIdentityStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an identity directly, e.g. a `Local`-kind account.
    pub fn insert(&self, identity: LocalIdentity) {
        let mut map = self.inner.lock().expect("identity map poisoned");
        map.insert(identity.id.clone(), identity);
    }

    /// Remove an identity. Sessions referencing it fail at the gate.
    pub fn remove(&self, id: &IdentityId) {
        let mut map = self.inner.lock().expect("identity map poisoned");
        map.remove(id);
    }
}

impl IdentityStore for MemoryIdentityStore {
    async fn upsert(&self, remote: &RemoteIdentity) -> Result<LocalIdentity, StoreError> {
        let mut map = self.inner.lock().expect("identity map poisoned");
        let identity = map
            .entry(remote.id.clone())
            .and_modify(|existing| {
                existing.display_name = remote.name.clone();
                existing.handle = remote.username.clone();
            })
            .or_insert_with(|| LocalIdentity {
                id: remote.id.clone(),
                display_name: remote.name.clone(),
                handle: remote.username.clone(),
                kind: IdentityKind::Provider,
            });
        Ok(identity.clone())
    }

    async fn find_by_id(&self, id: &IdentityId) -> Result<Option<LocalIdentity>, StoreError> {
        let map = self.inner.lock().expect("identity map poisoned");
        Ok(map.get(id).cloned())
    }
}
