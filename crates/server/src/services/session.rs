//! Sessions and the authenticated caller.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use rand::RngCore;
use storehouse_core::{AccountId, AuthLevel, ResourceKind};
use tracing::{debug, info, instrument};

use super::ServiceError;
use super::audit::{AuditResource, AuditService};
use crate::db::{RepositoryError, SessionRepository};
use crate::models::{Account, Session};

/// Length of every issued token.
pub const TOKEN_LENGTH: usize = 128;

/// Zig-zag varint of a signed integer.
fn varint(value: i64) -> Vec<u8> {
    #[allow(clippy::cast_sign_loss)]
    let mut zigzag = ((value << 1) ^ (value >> 63)) as u64;
    let mut out = Vec::with_capacity(10);
    while zigzag >= 0x80 {
        #[allow(clippy::cast_possible_truncation)]
        out.push((zigzag as u8) | 0x80);
        zigzag >>= 7;
    }
    #[allow(clippy::cast_possible_truncation)]
    out.push(zigzag as u8);
    out
}

/// New opaque token: the issue time in milliseconds, a dot, then random
/// URL-safe filler up to [`TOKEN_LENGTH`].
#[must_use]
pub fn generate_token() -> String {
    let mut token = URL_SAFE_NO_PAD.encode(varint(Utc::now().timestamp_millis()));
    token.push('.');
    let mut filler = [0_u8; TOKEN_LENGTH];
    rand::rng().fill_bytes(&mut filler);
    let filler = URL_SAFE_NO_PAD.encode(filler);
    let missing = TOKEN_LENGTH.saturating_sub(token.len());
    token.push_str(filler.get(..missing).unwrap_or(filler.as_str()));
    token
}

/// A resolved session and the account behind it.
#[derive(Debug, Clone)]
pub struct UserSession {
    pub session: Session,
    pub account: Account,
}

impl UserSession {
    #[must_use]
    pub const fn account_id(&self) -> AccountId {
        self.account.id()
    }

    #[must_use]
    pub const fn level(&self) -> AuthLevel {
        self.account.level
    }

    #[must_use]
    pub fn is_staff(&self) -> bool {
        self.level().satisfies(AuthLevel::Staff)
    }
}

#[derive(Debug, Clone)]
pub struct SessionService {
    repo: SessionRepository,
    audit: AuditResource,
}

impl SessionService {
    #[must_use]
    pub fn new(repo: SessionRepository, audit: &AuditService) -> Self {
        Self {
            repo,
            audit: audit.resource(ResourceKind::Session),
        }
    }

    /// Issue a session for `account_id`.
    ///
    /// # Errors
    ///
    /// Returns the storage error from the insert or the audit write.
    #[instrument(skip_all, fields(account_id = %account_id))]
    pub async fn create(&self, account_id: AccountId) -> Result<Session, ServiceError> {
        let session = self
            .repo
            .insert(&Session::new(account_id, generate_token()))
            .await?;
        self.audit.creation(account_id, session.id()).await?;
        info!(session_id = %session.id(), "session created");
        Ok(session)
    }

    /// Resolve a token and slide its expiry forward.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Unauthorized` for unknown, invalidated, or
    /// expired tokens.
    pub async fn fetch(&self, token: &str) -> Result<Session, ServiceError> {
        let session = match self.repo.select_by_token(token).await {
            Ok(session) => session,
            Err(RepositoryError::NotFound) => return Err(ServiceError::Unauthorized),
            Err(e) => return Err(e.into()),
        };
        self.repo.extend(session.id()).await?;
        self.audit.modification(session.account_id, session.id()).await?;
        debug!(session_id = %session.id(), "session extended");
        Ok(session)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the session is already gone.
    #[instrument(skip_all, fields(session_id = %session.id()))]
    pub async fn invalidate(&self, session: &Session) -> Result<(), ServiceError> {
        self.repo.delete(session.id()).await?;
        self.audit.deletion(session.account_id, session.id()).await?;
        info!("session invalidated");
        Ok(())
    }

    /// Invalidate every session of `account_id`, recording one deletion
    /// entry keyed by the account id.
    ///
    /// # Errors
    ///
    /// Returns the storage error from the update or the audit write.
    #[instrument(skip_all, fields(executor = %executor, account_id = %account_id))]
    pub async fn invalidate_account(
        &self,
        executor: AccountId,
        account_id: AccountId,
    ) -> Result<(), ServiceError> {
        let count = self.repo.delete_by_account(account_id).await?;
        self.audit.deletion(executor, account_id).await?;
        info!(count, "account sessions invalidated");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use storehouse_core::EntryKind;

    use super::*;
    use crate::services::testing::services;

    #[test]
    fn test_varint_matches_zigzag_encoding() {
        assert_eq!(varint(0), vec![0]);
        assert_eq!(varint(-1), vec![1]);
        assert_eq!(varint(1), vec![2]);
        assert_eq!(varint(64), vec![0x80, 0x01]);
    }

    #[test]
    fn test_tokens_are_fixed_length_and_distinct() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), TOKEN_LENGTH);
        assert_eq!(b.len(), TOKEN_LENGTH);
        assert_ne!(a, b);
        assert!(a.contains('.'));
        assert!(
            a.chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        );
    }

    #[tokio::test]
    async fn test_create_fetch_invalidate() {
        let services = services().await;
        let sessions = &services.sessions;
        let session = sessions.create(AccountId::new(4)).await.unwrap();
        assert_eq!(session.token.len(), TOKEN_LENGTH);

        let fetched = sessions.fetch(&session.token).await.unwrap();
        assert_eq!(fetched.id(), session.id());

        sessions.invalidate(&fetched).await.unwrap();
        assert!(matches!(
            sessions.fetch(&session.token).await,
            Err(ServiceError::Unauthorized)
        ));

        let kinds: Vec<EntryKind> = services
            .audit
            .entries_for(ResourceKind::Session, session.id().as_i64())
            .await
            .unwrap()
            .iter()
            .map(|e| e.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![EntryKind::Creation, EntryKind::Modification, EntryKind::Deletion]
        );
    }

    #[tokio::test]
    async fn test_invalidate_account_records_single_entry() {
        let services = services().await;
        let owner = AccountId::new(77);
        let first = services.sessions.create(owner).await.unwrap();
        let second = services.sessions.create(owner).await.unwrap();

        services
            .sessions
            .invalidate_account(AccountId::new(1), owner)
            .await
            .unwrap();
        for token in [&first.token, &second.token] {
            assert!(services.sessions.fetch(token).await.is_err());
        }
        let entries = services
            .audit
            .entries_for(ResourceKind::Session, 77)
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, EntryKind::Deletion);
        assert_eq!(entries[0].executor, AccountId::new(1));
    }
}
