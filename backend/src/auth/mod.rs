//! # Auth Session Manager
//!
//! Wraps the managed identity provider plus the configurable local
//! override credential. A matching override pair grants an
//! `AuthenticatedLocal` session persisted to disk, never touching the
//! provider; the record survives restarts until explicit logout. Managed
//! sessions clear the local record and request push-notification
//! permission on success.

use log::{info, warn};
use std::sync::Mutex;
use thiserror::Error;

use shared::{User, UserRole};

use crate::config::OverrideCredential;
use crate::storage::LocalSessionStore;

/// Identity as reported by the managed provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagedIdentity {
    pub uid: String,
    pub email: Option<String>,
}

impl ManagedIdentity {
    /// The session user derived from a managed identity. The runtime
    /// always assigns the Admin role.
    pub fn to_user(&self) -> User {
        let email = self.email.clone().unwrap_or_default();
        let name = email
            .split('@')
            .next()
            .filter(|part| !part.is_empty())
            .unwrap_or("Usuário")
            .to_string();
        User {
            id: self.uid.clone(),
            username: email,
            role: UserRole::Admin,
            name,
        }
    }
}

/// Error codes consumed from the managed identity provider.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    #[error("invalid credential")]
    InvalidCredential,
    #[error("invalid email")]
    InvalidEmail,
    #[error("email already in use")]
    EmailAlreadyInUse,
    #[error("weak password")]
    WeakPassword,
    #[error("provider failure: {0}")]
    Other(String),
}

/// Categorized user-facing auth failures. The display strings are the
/// messages shown verbatim in the login form.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AuthError {
    #[error("Email ou senha incorretos.")]
    InvalidCredential,
    #[error("Email inválido.")]
    InvalidEmail,
    #[error("Este email já está em uso.")]
    EmailAlreadyInUse,
    #[error("A senha deve ter pelo menos 6 caracteres.")]
    WeakPassword,
    #[error("Erro ao fazer login. Tente novamente.")]
    LoginFailed,
    #[error("Erro ao criar conta.")]
    RegistrationFailed,
}

/// The surface of the managed identity provider consumed by this system.
pub trait IdentityProvider: Send + Sync {
    fn sign_in(&self, email: &str, password: &str) -> Result<ManagedIdentity, ProviderError>;
    fn create_account(&self, email: &str, password: &str)
        -> Result<ManagedIdentity, ProviderError>;
    fn sign_out(&self) -> Result<(), ProviderError>;
    /// The provider's currently detected session, if any.
    fn current_identity(&self) -> Option<ManagedIdentity>;
}

/// Push notification service: permission request yielding an optional
/// device token.
pub trait PushNotifier: Send + Sync {
    fn request_permission(&self) -> Result<Option<String>, String>;
}

/// A notifier for embedders without push support.
pub struct NoopNotifier;

impl PushNotifier for NoopNotifier {
    fn request_permission(&self) -> Result<Option<String>, String> {
        Ok(None)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Unauthenticated,
    Authenticating,
    AuthenticatedManaged(User),
    AuthenticatedLocal(User),
}

impl SessionState {
    pub fn user(&self) -> Option<&User> {
        match self {
            SessionState::AuthenticatedManaged(user) | SessionState::AuthenticatedLocal(user) => {
                Some(user)
            }
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user().is_some()
    }
}

pub struct AuthService {
    provider: Box<dyn IdentityProvider>,
    notifier: Box<dyn PushNotifier>,
    session_store: LocalSessionStore,
    override_credential: OverrideCredential,
    state: Mutex<SessionState>,
}

impl AuthService {
    pub fn new(
        provider: Box<dyn IdentityProvider>,
        notifier: Box<dyn PushNotifier>,
        session_store: LocalSessionStore,
        override_credential: OverrideCredential,
    ) -> Self {
        Self {
            provider,
            notifier,
            session_store,
            override_credential,
            state: Mutex::new(SessionState::Unauthenticated),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.lock().unwrap().clone()
    }

    pub fn current_user(&self) -> Option<User> {
        self.state().user().cloned()
    }

    /// Restore a session at process start: a detected managed session
    /// wins; otherwise a persisted local record restores the local
    /// session.
    pub fn restore_session(&self) {
        if let Some(identity) = self.provider.current_identity() {
            let user = identity.to_user();
            info!("Restored managed session for {}", user.username);
            self.request_notification_permission();
            *self.state.lock().unwrap() = SessionState::AuthenticatedManaged(user);
            return;
        }
        if let Some(user) = self.session_store.load() {
            info!("Restored local session for {}", user.username);
            *self.state.lock().unwrap() = SessionState::AuthenticatedLocal(user);
            return;
        }
        *self.state.lock().unwrap() = SessionState::Unauthenticated;
    }

    pub fn login(&self, identifier: &str, secret: &str) -> Result<User, AuthError> {
        *self.state.lock().unwrap() = SessionState::Authenticating;

        if self.override_credential.matches(identifier, secret) {
            let user = self.local_override_user();
            if let Err(e) = self.session_store.save(&user) {
                warn!("Failed to persist local session record: {:#}", e);
            }
            info!("Local override login for '{}'", identifier);
            *self.state.lock().unwrap() = SessionState::AuthenticatedLocal(user.clone());
            return Ok(user);
        }

        match self.provider.sign_in(identifier, secret) {
            Ok(identity) => {
                self.session_store.clear();
                let user = identity.to_user();
                info!("Managed login for {}", user.username);
                self.request_notification_permission();
                *self.state.lock().unwrap() = SessionState::AuthenticatedManaged(user.clone());
                Ok(user)
            }
            Err(e) => {
                *self.state.lock().unwrap() = SessionState::Unauthenticated;
                Err(match e {
                    ProviderError::InvalidCredential => AuthError::InvalidCredential,
                    ProviderError::InvalidEmail => AuthError::InvalidEmail,
                    _ => AuthError::LoginFailed,
                })
            }
        }
    }

    pub fn register(&self, identifier: &str, secret: &str) -> Result<User, AuthError> {
        *self.state.lock().unwrap() = SessionState::Authenticating;

        match self.provider.create_account(identifier, secret) {
            Ok(identity) => {
                self.session_store.clear();
                let user = identity.to_user();
                info!("Registered account for {}", user.username);
                self.request_notification_permission();
                *self.state.lock().unwrap() = SessionState::AuthenticatedManaged(user.clone());
                Ok(user)
            }
            Err(e) => {
                *self.state.lock().unwrap() = SessionState::Unauthenticated;
                Err(match e {
                    ProviderError::EmailAlreadyInUse => AuthError::EmailAlreadyInUse,
                    ProviderError::WeakPassword => AuthError::WeakPassword,
                    _ => AuthError::RegistrationFailed,
                })
            }
        }
    }

    pub fn logout(&self) {
        if let Err(e) = self.provider.sign_out() {
            warn!("Provider sign-out failed: {}", e);
        }
        self.session_store.clear();
        *self.state.lock().unwrap() = SessionState::Unauthenticated;
        info!("Session ended");
    }

    fn local_override_user(&self) -> User {
        User {
            id: "local-admin".to_string(),
            username: self.override_credential.username.clone(),
            role: UserRole::Admin,
            name: "Administrador (Local)".to_string(),
        }
    }

    fn request_notification_permission(&self) {
        match self.notifier.request_permission() {
            Ok(Some(_token)) => {
                // TODO: persist the token on the user's profile so targeted
                // push becomes possible; today it is requested and dropped.
            }
            Ok(None) => {}
            Err(e) => warn!("Notification permission request failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    /// Provider double that counts every call and answers from a fixed
    /// script.
    struct ScriptedProvider {
        calls: Arc<AtomicUsize>,
        sign_in: Result<ManagedIdentity, ProviderError>,
        create_account: Result<ManagedIdentity, ProviderError>,
        current: Option<ManagedIdentity>,
    }

    impl ScriptedProvider {
        fn rejecting(error: ProviderError) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    calls: calls.clone(),
                    sign_in: Err(error.clone()),
                    create_account: Err(error),
                    current: None,
                },
                calls,
            )
        }

        fn accepting(uid: &str, email: &str) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let identity = ManagedIdentity {
                uid: uid.to_string(),
                email: Some(email.to_string()),
            };
            (
                Self {
                    calls: calls.clone(),
                    sign_in: Ok(identity.clone()),
                    create_account: Ok(identity),
                    current: None,
                },
                calls,
            )
        }
    }

    impl IdentityProvider for ScriptedProvider {
        fn sign_in(&self, _: &str, _: &str) -> Result<ManagedIdentity, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.sign_in.clone()
        }

        fn create_account(&self, _: &str, _: &str) -> Result<ManagedIdentity, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.create_account.clone()
        }

        fn sign_out(&self) -> Result<(), ProviderError> {
            Ok(())
        }

        fn current_identity(&self) -> Option<ManagedIdentity> {
            self.current.clone()
        }
    }

    struct CountingNotifier {
        requests: Arc<AtomicUsize>,
    }

    impl PushNotifier for CountingNotifier {
        fn request_permission(&self) -> Result<Option<String>, String> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            Ok(Some("device-token".to_string()))
        }
    }

    fn service_in(
        dir: &TempDir,
        provider: ScriptedProvider,
    ) -> (AuthService, Arc<AtomicUsize>) {
        let requests = Arc::new(AtomicUsize::new(0));
        let notifier = CountingNotifier {
            requests: requests.clone(),
        };
        let service = AuthService::new(
            Box::new(provider),
            Box::new(notifier),
            LocalSessionStore::new(dir.path()),
            OverrideCredential::default(),
        );
        (service, requests)
    }

    #[test]
    fn override_login_never_contacts_provider() {
        let dir = TempDir::new().unwrap();
        let (provider, calls) = ScriptedProvider::rejecting(ProviderError::InvalidCredential);
        let (service, _) = service_in(&dir, provider);

        let user = service.login("admin", "7777777").unwrap();
        assert_eq!(user.id, "local-admin");
        assert_eq!(user.role, UserRole::Admin);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(matches!(
            service.state(),
            SessionState::AuthenticatedLocal(_)
        ));
    }

    #[test]
    fn override_session_survives_restart() {
        let dir = TempDir::new().unwrap();
        let (provider, _) = ScriptedProvider::rejecting(ProviderError::InvalidCredential);
        let (service, _) = service_in(&dir, provider);
        service.login("admin", "7777777").unwrap();

        // Simulated restart: a fresh service over the same data directory.
        let (provider, _) = ScriptedProvider::rejecting(ProviderError::InvalidCredential);
        let (restarted, _) = service_in(&dir, provider);
        restarted.restore_session();
        assert!(matches!(
            restarted.state(),
            SessionState::AuthenticatedLocal(_)
        ));

        // Explicit logout clears the record for good.
        restarted.logout();
        let (provider, _) = ScriptedProvider::rejecting(ProviderError::InvalidCredential);
        let (after_logout, _) = service_in(&dir, provider);
        after_logout.restore_session();
        assert_eq!(after_logout.state(), SessionState::Unauthenticated);
    }

    #[test]
    fn disabled_override_falls_through_to_provider() {
        let dir = TempDir::new().unwrap();
        let (provider, calls) = ScriptedProvider::rejecting(ProviderError::InvalidCredential);
        let requests = Arc::new(AtomicUsize::new(0));
        let service = AuthService::new(
            Box::new(provider),
            Box::new(CountingNotifier {
                requests: requests.clone(),
            }),
            LocalSessionStore::new(dir.path()),
            OverrideCredential {
                enabled: false,
                ..OverrideCredential::default()
            },
        );

        let err = service.login("admin", "7777777").unwrap_err();
        assert_eq!(err, AuthError::InvalidCredential);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn managed_login_clears_local_record_and_requests_permission() {
        let dir = TempDir::new().unwrap();

        // Leave a local record behind first.
        let (provider, _) = ScriptedProvider::rejecting(ProviderError::InvalidCredential);
        let (bypass, _) = service_in(&dir, provider);
        bypass.login("admin", "7777777").unwrap();

        let (provider, _) = ScriptedProvider::accepting("uid-1", "maria@escola.com");
        let (service, requests) = service_in(&dir, provider);
        let user = service.login("maria@escola.com", "s3nh4!").unwrap();
        assert_eq!(user.name, "maria");
        assert!(matches!(
            service.state(),
            SessionState::AuthenticatedManaged(_)
        ));
        // Token requested (and deliberately dropped).
        assert_eq!(requests.load(Ordering::SeqCst), 1);

        // The local record is gone: a restart with no managed session
        // lands unauthenticated.
        let (provider, _) = ScriptedProvider::rejecting(ProviderError::InvalidCredential);
        let (restarted, _) = service_in(&dir, provider);
        restarted.restore_session();
        assert_eq!(restarted.state(), SessionState::Unauthenticated);
    }

    #[test]
    fn login_errors_map_to_user_messages() {
        let dir = TempDir::new().unwrap();
        let (provider, _) = ScriptedProvider::rejecting(ProviderError::InvalidEmail);
        let (service, _) = service_in(&dir, provider);
        let err = service.login("não-é-email", "x").unwrap_err();
        assert_eq!(err.to_string(), "Email inválido.");

        let (provider, _) = ScriptedProvider::rejecting(ProviderError::Other("offline".into()));
        let (service, _) = service_in(&dir, provider);
        let err = service.login("maria@escola.com", "x").unwrap_err();
        assert_eq!(err.to_string(), "Erro ao fazer login. Tente novamente.");
        assert_eq!(service.state(), SessionState::Unauthenticated);
    }

    #[test]
    fn register_errors_map_to_user_messages() {
        let dir = TempDir::new().unwrap();
        let (provider, _) = ScriptedProvider::rejecting(ProviderError::EmailAlreadyInUse);
        let (service, _) = service_in(&dir, provider);
        let err = service.register("maria@escola.com", "x").unwrap_err();
        assert_eq!(err.to_string(), "Este email já está em uso.");

        let (provider, _) = ScriptedProvider::rejecting(ProviderError::WeakPassword);
        let (service, _) = service_in(&dir, provider);
        let err = service.register("maria@escola.com", "123").unwrap_err();
        assert_eq!(err.to_string(), "A senha deve ter pelo menos 6 caracteres.");
    }

    #[test]
    fn managed_identity_without_email_gets_placeholder_name() {
        let identity = ManagedIdentity {
            uid: "uid-2".to_string(),
            email: None,
        };
        assert_eq!(identity.to_user().name, "Usuário");
    }
}
