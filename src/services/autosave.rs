use crate::models::profile::{Profile, ProfileChanges};
use crate::models::types::AccountId;
use crate::services::{ProfileService, ServiceError, ServiceResult};
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct Pending {
    changes: ProfileChanges,
    generation: u64,
}

/// Debounced profile saving. Every edit is merged into the pending change set
/// and restarts the timer; the save happens once the account stops typing for
/// `delay`, or right away on [`Autosave::flush`].
///
/// A timed save that fails is kept and handed back by the next `flush`, since
/// the client got its `202` long before.
pub struct Autosave {
    profiles: Arc<ProfileService>,
    delay: Duration,
    pending: DashMap<AccountId, Pending>,
    failures: DashMap<AccountId, ServiceError>,
    generations: AtomicU64,
}

impl Autosave {
    pub fn new(profiles: Arc<ProfileService>, delay: Duration) -> Self {
        Self {
            profiles,
            delay,
            pending: DashMap::new(),
            failures: DashMap::new(),
            generations: AtomicU64::new(0),
        }
    }

    /// Queues `changes` for the account. Username edits are checked against the
    /// rules right away so obvious mistakes do not wait for the timer.
    pub fn schedule(self: &Arc<Self>, account_id: AccountId, changes: ProfileChanges) -> ServiceResult<()> {
        if let Some(raw) = &changes.username {
            let validation = self.profiles.usernames().validate(raw);
            if let Some(issue) = validation.first_error() {
                return Err(ServiceError::from(issue.clone()));
            }
        }

        // generations are unique across accounts, so a stale timer never matches a newer entry
        let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
        {
            let mut entry = self.pending.entry(account_id).or_default();
            entry.changes.merge(changes);
            entry.generation = generation;
        }

        let this = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(this.delay).await;
            this.fire(account_id, generation).await;
        });
        Ok(())
    }

    pub fn has_pending(&self, account_id: AccountId) -> bool {
        self.pending.contains_key(&account_id)
    }

    /// Saves whatever is pending now. Returns `None` if nothing was queued.
    ///
    /// If the last timed save failed, that error is returned once instead and
    /// anything queued since stays on its timer.
    pub async fn flush(&self, account_id: AccountId) -> ServiceResult<Option<Profile>> {
        if let Some((_, failure)) = self.failures.remove(&account_id) {
            return Err(failure);
        }
        self.save_pending(account_id).await
    }

    /// Writes the pending edits of every account, used on shutdown. All accounts
    /// are tried; the first error is returned after that.
    pub async fn flush_all(&self) -> ServiceResult<usize> {
        let accounts: Vec<AccountId> = self.pending.iter().map(|p| *p.key()).collect();
        let mut saved = 0;
        let mut first_error = None;

        for account_id in accounts {
            match self.save_pending(account_id).await {
                Ok(Some(_)) => saved += 1,
                Ok(None) => {}
                Err(e) => {
                    warn!(account = %account_id, error = %e, "[Autosave] final save failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(saved),
        }
    }

    async fn save_pending(&self, account_id: AccountId) -> ServiceResult<Option<Profile>> {
        let Some((_, pending)) = self.pending.remove(&account_id) else {
            return Ok(None);
        };
        self.profiles.update(account_id, pending.changes).await.map(Some)
    }

    async fn fire(&self, account_id: AccountId, generation: u64) {
        let Some((_, pending)) = self.pending.remove_if(&account_id, |_, p| p.generation == generation) else {
            return;
        };

        match self.profiles.update(account_id, pending.changes).await {
            Ok(profile) => {
                self.failures.remove(&account_id);
                debug!(account = %account_id, username = %profile.username, "[Autosave] saved");
            }
            Err(e) => {
                warn!(account = %account_id, error = %e, "[Autosave] save failed");
                self.failures.insert(account_id, e);
            }
        }
    }
}
