use crate::clock::Clock;
use crate::error::StoreError;
use crate::store::{Document, SubmissionRecords};
use serenity::all::UserId;
use std::sync::Arc;
use tracing::debug;

pub struct SubmissionService {
    records: Arc<Document<SubmissionRecords>>,
    clock: Arc<dyn Clock>,
}

impl SubmissionService {
    pub fn new(records: Arc<Document<SubmissionRecords>>, clock: Arc<dyn Clock>) -> Self {
        Self { records, clock }
    }

    /// Mark `user` as having submitted now. Returns the stored timestamp.
    pub async fn record_submission(&self, user: UserId) -> Result<i64, StoreError> {
        let now = self.clock.now();
        let key = user.to_string();
        self.records
            .update(|records| {
                records.insert(key, now);
                true
            })
            .await?;
        debug!("Recorded submission for user {} at {}", user, now);
        Ok(now)
    }

    #[cfg(test)]
    pub(crate) async fn last_submission(&self, user: UserId) -> Result<Option<i64>, StoreError> {
        Ok(self.records.read().await?.get(&user.to_string()).copied())
    }
}
