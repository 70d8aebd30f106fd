use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;

use super::config::AuthSettings;
use crate::identity::IdentityStore;
use crate::oauth::ProviderClient;
use crate::session::SessionSigner;

/// Shared state for auth route handlers.
pub struct AuthState<S> {
    pub(super) client: Arc<ProviderClient>,
    pub(super) store: Arc<S>,
    pub(super) signer: Arc<SessionSigner>,
    pub(super) settings: AuthSettings,
}

// Manual Clone: avoid derive adding an `S: Clone` bound.
impl<S> Clone for AuthState<S> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            store: self.store.clone(),
            signer: self.signer.clone(),
            settings: self.settings.clone(),
        }
    }
}

// PrivateCookieJar requires Key to be extractable from state
impl<S: IdentityStore> FromRef<AuthState<S>> for Key {
    fn from_ref(state: &AuthState<S>) -> Self {
        state.settings.cookie_key.clone()
    }
}
