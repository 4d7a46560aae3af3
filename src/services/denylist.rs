use crate::error::ModerationError;
use crate::messaging::{parse_user_id, Messenger};
use crate::store::{Denylist, Document};
use serenity::all::UserId;
use std::sync::Arc;
use tracing::{error, info, warn};

pub const BAN_REASON: &str = "Red List";
const MIN_ID_DIGITS: usize = 17;
const MAX_ID_DIGITS: usize = 20;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddOutcome {
    /// Whether the immediate ban went through; false when the user is not in the guild
    pub enforced: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinOutcome {
    NotListed,
    Banned,
    BanFailed,
}

pub struct DenylistService {
    entries: Arc<Document<Denylist>>,
    messenger: Arc<dyn Messenger>,
}

impl DenylistService {
    pub fn new(entries: Arc<Document<Denylist>>, messenger: Arc<dyn Messenger>) -> Self {
        Self { entries, messenger }
    }

    /// Red-list `identity` and ban it right away if it is in the guild.
    pub async fn add(
        &self,
        identity: &str,
        requester_is_privileged: bool,
    ) -> Result<AddOutcome, ModerationError> {
        if !requester_is_privileged {
            return Err(ModerationError::Unauthorized);
        }
        let identity = identity.trim();
        let user = validate_identity(identity)?;

        let entry = identity.to_string();
        let inserted = self
            .entries
            .update(|list| {
                if list.contains(&entry) {
                    return false;
                }
                list.push(entry);
                true
            })
            .await?;
        if !inserted {
            return Err(ModerationError::AlreadyListed(identity.to_string()));
        }
        info!("Added user {} to the red list", identity);

        let enforced = match self.messenger.ban(user, BAN_REASON).await {
            Ok(()) => {
                info!("Banned red-listed user {}", identity);
                true
            }
            Err(e) => {
                // Usually the user simply has not joined yet; the join hook covers that.
                warn!("Immediate ban of {} failed: {}", identity, e);
                false
            }
        };
        Ok(AddOutcome { enforced })
    }

    pub async fn list(&self, requester_is_privileged: bool) -> Result<Denylist, ModerationError> {
        if !requester_is_privileged {
            return Err(ModerationError::Unauthorized);
        }
        Ok(self.entries.read().await?)
    }

    pub async fn contains(&self, user: UserId) -> bool {
        let id = user.to_string();
        self.entries.read_or_default().await.contains(&id)
    }

    /// Ban a joining member if they are red-listed. Never fails.
    pub async fn on_member_join(&self, user: UserId) -> JoinOutcome {
        if !self.contains(user).await {
            return JoinOutcome::NotListed;
        }
        match self.messenger.ban(user, BAN_REASON).await {
            Ok(()) => {
                info!("🚫 Auto-banned {}", user);
                JoinOutcome::Banned
            }
            Err(e) => {
                error!("❌ Auto-ban of {} failed: {}", user, e);
                JoinOutcome::BanFailed
            }
        }
    }
}

/// A Discord user ID: 17 to 20 ASCII digits that fit a non-zero u64.
pub fn validate_identity(identity: &str) -> Result<UserId, ModerationError> {
    let well_formed = (MIN_ID_DIGITS..=MAX_ID_DIGITS).contains(&identity.len())
        && identity.bytes().all(|b| b.is_ascii_digit());
    well_formed
        .then(|| parse_user_id(identity))
        .flatten()
        .ok_or_else(|| ModerationError::InvalidIdentity(identity.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::fake::RecordingMessenger;
    use crate::store::MemoryStore;

    const LISTED: &str = "140631350327876417";

    fn service(messenger: Arc<RecordingMessenger>) -> DenylistService {
        let entries = Arc::new(Document::new(
            "redlist",
            Arc::new(MemoryStore::<Denylist>::default()),
        ));
        DenylistService::new(entries, messenger)
    }

    #[test]
    fn test_validate_identity() {
        assert!(validate_identity("12345678901234567").is_ok());
        assert!(validate_identity("12345678901234567890").is_ok());
        assert!(validate_identity("99999999999999999999").is_err()); // exceeds u64
        assert!(validate_identity("1406313503278764174").is_ok());
        assert!(validate_identity("123").is_err());
        assert!(validate_identity("123456789012345678901").is_err());
        assert!(validate_identity("14063135032787641a").is_err());
        assert!(validate_identity("+406313503278764174").is_err());
        assert!(validate_identity("00000000000000000").is_err());
    }

    #[tokio::test]
    async fn test_unauthorized_does_not_touch_store() {
        let messenger = Arc::new(RecordingMessenger::default());
        let service = service(messenger.clone());

        let result = service.add("12345", false).await;
        assert!(matches!(result, Err(ModerationError::Unauthorized)));
        assert!(service.entries.read().await.unwrap().is_empty());
        assert!(messenger.bans().is_empty());
        assert!(matches!(service.list(false).await, Err(ModerationError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_invalid_identity() {
        let service = service(Arc::new(RecordingMessenger::default()));
        let result = service.add("123", true).await;
        assert!(matches!(result, Err(ModerationError::InvalidIdentity(id)) if id == "123"));
        assert!(service.list(true).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_idempotent_insert() {
        let messenger = Arc::new(RecordingMessenger::default());
        let service = service(messenger.clone());

        let first = service.add(LISTED, true).await.unwrap();
        assert_eq!(first, AddOutcome { enforced: true });

        let second = service.add(LISTED, true).await;
        assert!(matches!(second, Err(ModerationError::AlreadyListed(_))));
        assert!(second.unwrap_err().is_user_facing());

        assert_eq!(service.list(true).await.unwrap(), vec![LISTED.to_string()]);
        assert_eq!(messenger.bans(), vec![UserId::new(140631350327876417)]);
    }

    #[tokio::test]
    async fn test_surrounding_whitespace_is_trimmed() {
        let service = service(Arc::new(RecordingMessenger::default()));

        service.add(&format!("  {}\n", LISTED), true).await.unwrap();
        assert_eq!(service.list(true).await.unwrap(), vec![LISTED.to_string()]);

        let inner = service.add("1406313503 27876417", true).await;
        assert!(matches!(inner, Err(ModerationError::InvalidIdentity(_))));
    }

    #[tokio::test]
    async fn test_ban_failure_is_swallowed() {
        let messenger = Arc::new(RecordingMessenger::default());
        *messenger.fail_bans.lock().unwrap() = true;
        let service = service(messenger.clone());

        let outcome = service.add(LISTED, true).await.unwrap();
        assert_eq!(outcome, AddOutcome { enforced: false });
        assert!(service.contains(UserId::new(140631350327876417)).await);
    }

    #[tokio::test]
    async fn test_member_join() {
        let messenger = Arc::new(RecordingMessenger::default());
        let service = service(messenger.clone());
        service.add(LISTED, true).await.unwrap();

        let stranger = UserId::new(140631350327876418);
        assert_eq!(service.on_member_join(stranger).await, JoinOutcome::NotListed);

        let listed = UserId::new(140631350327876417);
        assert_eq!(service.on_member_join(listed).await, JoinOutcome::Banned);
        assert_eq!(messenger.bans(), vec![listed, listed]);

        *messenger.fail_bans.lock().unwrap() = true;
        assert_eq!(service.on_member_join(listed).await, JoinOutcome::BanFailed);
    }
}
