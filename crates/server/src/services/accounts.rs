//! Account use-cases: registration, login, profile, password, removal.

use std::sync::Arc;

use serde_json::{Map, Value as Json};
use storehouse_core::{AccountId, AuthLevel, Email, ResourceKind};
use tracing::{info, instrument, warn};

use super::audit::{AuditResource, AuditService};
use super::auth::Hasher;
use super::orders::OrderService;
use super::session::{SessionService, UserSession};
use super::{ServiceError, authorize_owner};
use crate::db::{AccountRepository, RepositoryError};
use crate::models::account::password_is_strong;
use crate::models::{Account, AccountCreate, AccountLogin, Base, Order, Session};
use crate::patch::patch;

#[derive(Clone)]
pub struct AccountService {
    repo: AccountRepository,
    sessions: SessionService,
    orders: OrderService,
    hasher: Arc<dyn Hasher>,
    audit: AuditResource,
    audit_password: AuditResource,
}

impl std::fmt::Debug for AccountService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountService")
            .field("repo", &self.repo)
            .finish_non_exhaustive()
    }
}

fn parse_email(email: &str) -> Result<Email, ServiceError> {
    Email::parse(email).map_err(|e| ServiceError::bad_request(format!("invalid email: {e}")))
}

fn check_password(password: &str) -> Result<(), ServiceError> {
    if password_is_strong(password) {
        Ok(())
    } else {
        Err(ServiceError::bad_request(
            "password needs 8 characters with upper and lower case letters, a digit, and a symbol",
        ))
    }
}

impl AccountService {
    #[must_use]
    pub fn new(
        repo: AccountRepository,
        sessions: SessionService,
        orders: OrderService,
        hasher: Arc<dyn Hasher>,
        audit: &AuditService,
    ) -> Self {
        Self {
            repo,
            sessions,
            orders,
            hasher,
            audit: audit.resource(ResourceKind::Account),
            audit_password: audit.resource(ResourceKind::AccountPassword),
        }
    }

    async fn insert(
        &self,
        level: AuthLevel,
        email: &str,
        password: &str,
        name: String,
        surname: String,
        executor: Option<AccountId>,
    ) -> Result<Account, ServiceError> {
        let email = parse_email(email)?;
        check_password(password)?;
        let account = Account {
            base: Base::default(),
            level,
            email: email.into_inner(),
            password_digest: self.hasher.hash(password)?,
            name,
            surname,
        };
        let account = self.repo.insert(&account).await?;
        self.audit
            .creation(executor.unwrap_or_else(|| account.id()), account.id())
            .await?;
        info!(account_id = %account.id(), level = %level, "account created");
        Ok(account)
    }

    /// Create a user account and log it in.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::BadRequest` for an invalid email or weak
    /// password and `RepositoryError::Duplicate` (wrapped) for a taken email.
    #[instrument(skip_all)]
    pub async fn register(
        &self,
        create: AccountCreate,
    ) -> Result<(Account, Session), ServiceError> {
        let account = self
            .insert(
                AuthLevel::User,
                &create.login.email,
                &create.login.password,
                create.name,
                create.surname,
                None,
            )
            .await?;
        let session = self.sessions.create(account.id()).await?;
        Ok((account, session))
    }

    /// Provision a staff account; recorded with the system executor.
    ///
    /// # Errors
    ///
    /// Same as [`register`](Self::register).
    #[instrument(skip_all)]
    pub async fn create_staff(
        &self,
        email: &str,
        password: &str,
        name: String,
        surname: String,
    ) -> Result<Account, ServiceError> {
        self.insert(
            AuthLevel::Staff,
            email,
            password,
            name,
            surname,
            Some(AccountId::SYSTEM),
        )
        .await
    }

    /// Check credentials and open a session.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Unauthorized` for an unknown email or a wrong
    /// password, without saying which.
    #[instrument(skip_all)]
    pub async fn login(&self, login: AccountLogin) -> Result<(Account, Session), ServiceError> {
        let email = Email::parse(&login.email).map_err(|_| ServiceError::Unauthorized)?;
        let account = self
            .repo
            .select_by_email(&email)
            .await?
            .ok_or(ServiceError::Unauthorized)?;
        if !self.hasher.verify(&login.password, &account.password_digest) {
            warn!(account_id = %account.id(), "login with wrong password");
            return Err(ServiceError::Unauthorized);
        }
        let session = self.sessions.create(account.id()).await?;
        Ok((account, session))
    }

    /// The account a live session belongs to.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Unauthorized` when the account has been removed.
    pub async fn fetch_by_session(&self, session: &Session) -> Result<Account, ServiceError> {
        match self.repo.select_by_id(session.account_id).await {
            Ok(account) => Ok(account),
            Err(RepositoryError::NotFound) => Err(ServiceError::Unauthorized),
            Err(e) => Err(e.into()),
        }
    }

    /// Resolve a bearer token to its session and account.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Unauthorized` for unknown, expired, or orphaned
    /// tokens.
    pub async fn authenticate(&self, token: &str) -> Result<UserSession, ServiceError> {
        let session = self.sessions.fetch(token).await?;
        let account = self.fetch_by_session(&session).await?;
        Ok(UserSession { session, account })
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Unauthorized` unless `id` is the caller or the
    /// caller is staff.
    pub async fn fetch_by_id(
        &self,
        user: &UserSession,
        id: AccountId,
    ) -> Result<Account, ServiceError> {
        authorize_owner(user, id)?;
        Ok(self.repo.select_by_id(id).await?)
    }

    /// Patch the profile (email, name, surname).
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Patch` for a malformed document,
    /// `ServiceError::BadRequest` for an invalid email, and
    /// `RepositoryError::Duplicate` (wrapped) when the email is taken.
    #[instrument(skip_all, fields(executor = %user.account_id(), account_id = %id))]
    pub async fn modify(
        &self,
        user: &UserSession,
        id: AccountId,
        changes: &Map<String, Json>,
    ) -> Result<Account, ServiceError> {
        authorize_owner(user, id)?;
        let mut account = self.repo.select_by_id(id).await?;
        patch(&mut account, changes)?;
        account.email = parse_email(&account.email)?.into_inner();
        self.repo.update(&account).await?;
        self.audit.modification(user.account_id(), id).await?;
        info!("account modified");
        Ok(account)
    }

    /// Orders placed by `id`.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Unauthorized` unless `id` is the caller or the
    /// caller is staff.
    pub async fn fetch_orders(
        &self,
        user: &UserSession,
        id: AccountId,
        limit: i64,
        page: i64,
    ) -> Result<Vec<Order>, ServiceError> {
        authorize_owner(user, id)?;
        self.orders.fetch_by_account(id, limit, page).await
    }

    /// # Errors
    ///
    /// Returns `ServiceError::BadRequest` for a weak password.
    #[instrument(skip_all, fields(executor = %user.account_id(), account_id = %id))]
    pub async fn modify_password(
        &self,
        user: &UserSession,
        id: AccountId,
        password: &str,
    ) -> Result<(), ServiceError> {
        authorize_owner(user, id)?;
        check_password(password)?;
        let digest = self.hasher.hash(password)?;
        self.repo.update_digest(id, &digest).await?;
        self.audit_password.modification(user.account_id(), id).await?;
        info!("password changed");
        Ok(())
    }

    /// End the caller's current session.
    ///
    /// # Errors
    ///
    /// Returns the storage error.
    pub async fn logout(&self, user: &UserSession) -> Result<(), ServiceError> {
        self.sessions.invalidate(&user.session).await
    }

    /// Remove an account and every session it holds.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Unauthorized` unless `id` is the caller or the
    /// caller is staff.
    #[instrument(skip_all, fields(executor = %user.account_id(), account_id = %id))]
    pub async fn remove(&self, user: &UserSession, id: AccountId) -> Result<(), ServiceError> {
        authorize_owner(user, id)?;
        self.repo.delete(id).await?;
        self.audit.deletion(user.account_id(), id).await?;
        self.sessions.invalidate_account(user.account_id(), id).await?;
        info!("account removed");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use storehouse_core::EntryKind;

    use super::*;
    use crate::services::Services;
    use crate::services::testing::services;

    const PASSWORD: &str = "Str0ng!pass";

    fn create(email: &str) -> AccountCreate {
        AccountCreate {
            login: AccountLogin {
                email: email.to_owned(),
                password: PASSWORD.to_owned(),
            },
            name: "Ann".to_owned(),
            surname: "Lee".to_owned(),
        }
    }

    async fn registered(services: &Services, email: &str) -> UserSession {
        let (_, session) = services.accounts.register(create(email)).await.unwrap();
        services.accounts.authenticate(&session.token).await.unwrap()
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let services = services().await;
        let (account, session) = services
            .accounts
            .register(create("ann@example.com"))
            .await
            .unwrap();
        assert_eq!(account.level, AuthLevel::User);
        assert_eq!(account.password_digest, format!("plain:{PASSWORD}"));
        assert_eq!(session.account_id, account.id());

        let (again, _) = services
            .accounts
            .login(AccountLogin {
                email: "ann@example.com".to_owned(),
                password: PASSWORD.to_owned(),
            })
            .await
            .unwrap();
        assert_eq!(again.id(), account.id());

        let wrong = services
            .accounts
            .login(AccountLogin {
                email: "ann@example.com".to_owned(),
                password: "Wr0ng!pass".to_owned(),
            })
            .await;
        assert!(matches!(wrong, Err(ServiceError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_duplicate_registration_is_duplicate() {
        let services = services().await;
        services.accounts.register(create("ann@example.com")).await.unwrap();
        let err = services.accounts.register(create("ann@example.com")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Repository(RepositoryError::Duplicate)), "{err:?}");
    }

    #[tokio::test]
    async fn test_weak_password_and_bad_email() {
        let services = services().await;
        let mut weak = create("ann@example.com");
        weak.login.password = "password".to_owned();
        assert!(matches!(
            services.accounts.register(weak).await,
            Err(ServiceError::BadRequest(_))
        ));
        assert!(matches!(
            services.accounts.register(create("not-an-email")).await,
            Err(ServiceError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_modify_respects_ownership_and_read_only_fields() {
        let services = services().await;
        let ann = registered(&services, "ann@example.com").await;
        let bob = registered(&services, "bob@example.com").await;

        let changes = json!({"name": "Anna", "type": 2}).as_object().unwrap().clone();
        assert!(matches!(
            services.accounts.modify(&bob, ann.account_id(), &changes).await,
            Err(ServiceError::Unauthorized)
        ));
        let updated = services
            .accounts
            .modify(&ann, ann.account_id(), &changes)
            .await
            .unwrap();
        assert_eq!(updated.name, "Anna");
        assert_eq!(updated.level, AuthLevel::User);

        let bad_email = json!({"email": "nope"}).as_object().unwrap().clone();
        assert!(matches!(
            services.accounts.modify(&ann, ann.account_id(), &bad_email).await,
            Err(ServiceError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_password_change_is_audited_separately() {
        let services = services().await;
        let ann = registered(&services, "ann@example.com").await;
        services
            .accounts
            .modify_password(&ann, ann.account_id(), "N3w!password")
            .await
            .unwrap();
        let entries = services
            .audit
            .entries_for(ResourceKind::AccountPassword, ann.account_id().as_i64())
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, EntryKind::Modification);
    }

    #[tokio::test]
    async fn test_remove_cascades_sessions_and_audits_once() {
        let services = services().await;
        let ann = registered(&services, "ann@example.com").await;
        let (_, second) = services
            .accounts
            .login(AccountLogin {
                email: "ann@example.com".to_owned(),
                password: PASSWORD.to_owned(),
            })
            .await
            .unwrap();

        services.accounts.remove(&ann, ann.account_id()).await.unwrap();

        for token in [&ann.session.token, &second.token] {
            assert!(matches!(
                services.accounts.authenticate(token).await,
                Err(ServiceError::Unauthorized)
            ));
        }
        let deletions: Vec<_> = services
            .audit
            .entries_for(ResourceKind::Account, ann.account_id().as_i64())
            .await
            .unwrap()
            .into_iter()
            .filter(|e| e.kind == EntryKind::Deletion)
            .collect();
        assert_eq!(deletions.len(), 1);

        // the address is free again
        services.accounts.register(create("ann@example.com")).await.unwrap();
    }

    #[tokio::test]
    async fn test_staff_is_created_by_system() {
        let services = services().await;
        let staff = services
            .accounts
            .create_staff("ops@example.com", PASSWORD, "Ops".to_owned(), String::new())
            .await
            .unwrap();
        assert_eq!(staff.level, AuthLevel::Staff);
        let entries = services
            .audit
            .entries_for(ResourceKind::Account, staff.id().as_i64())
            .await
            .unwrap();
        assert_eq!(entries[0].executor, AccountId::SYSTEM);
    }
}
