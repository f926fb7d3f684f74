// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::signing::SigningCredential;

/// Installation record issued by the backend when the device registers.
///
/// Carries the short-lived credential triple analytics batches are signed with.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installation {
    pub profile_installation_meta_id: String,
    pub iam_secret_key: String,
    pub iam_access_key_id: String,
    pub iam_session_token: String,
}

impl Installation {
    #[must_use]
    pub fn credential(&self) -> SigningCredential {
        SigningCredential::new(
            self.iam_access_key_id.clone(),
            self.iam_secret_key.clone(),
            self.iam_session_token.clone(),
        )
    }
}

impl std::fmt::Debug for Installation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Installation")
            .field("profile_installation_meta_id", &self.profile_installation_meta_id)
            .field("iam_access_key_id", &self.iam_access_key_id)
            .finish_non_exhaustive()
    }
}

/// Device and profile facts the analytics pipeline needs from the host.
///
/// Platform bindings implement this; nothing in the crate talks to the OS.
pub trait IdentityProvider: Send + Sync {
    /// `None` until the device has registered an installation.
    fn installation(&self) -> Option<Installation>;
    fn profile_id(&self) -> String;
    /// Analytics explicitly turned off by the app.
    fn analytics_disabled(&self) -> bool;
    /// e.g. `iOS`, `macOS`
    fn platform(&self) -> String;
    fn locale(&self) -> Option<String>;
}

#[derive(Debug, Default)]
struct IdentityState {
    installation: Option<Installation>,
    profile_id: String,
    analytics_disabled: bool,
    platform: String,
    locale: Option<String>,
}

/// Settable [`IdentityProvider`] for hosts without a platform binding.
#[derive(Debug, Default)]
pub struct StaticIdentity {
    state: RwLock<IdentityState>,
}

impl StaticIdentity {
    pub fn new(profile_id: impl Into<String>, platform: impl Into<String>) -> Self {
        Self {
            state: RwLock::new(IdentityState {
                profile_id: profile_id.into(),
                platform: platform.into(),
                ..Default::default()
            }),
        }
    }

    #[must_use]
    pub fn with_installation(self, installation: Installation) -> Self {
        self.set_installation(Some(installation));
        self
    }

    pub fn set_installation(&self, installation: Option<Installation>) {
        self.state.write().installation = installation;
    }

    pub fn set_profile_id(&self, profile_id: impl Into<String>) {
        self.state.write().profile_id = profile_id.into();
    }

    pub fn set_analytics_disabled(&self, disabled: bool) {
        self.state.write().analytics_disabled = disabled;
    }

    pub fn set_locale(&self, locale: Option<String>) {
        self.state.write().locale = locale;
    }
}

impl IdentityProvider for StaticIdentity {
    fn installation(&self) -> Option<Installation> {
        self.state.read().installation.clone()
    }

    fn profile_id(&self) -> String {
        self.state.read().profile_id.clone()
    }

    fn analytics_disabled(&self) -> bool {
        self.state.read().analytics_disabled
    }

    fn platform(&self) -> String {
        self.state.read().platform.clone()
    }

    fn locale(&self) -> Option<String> {
        self.state.read().locale.clone()
    }
}
