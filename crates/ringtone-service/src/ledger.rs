//! Ledger engine.
//!
//! Every balance change goes through [`Ledger::update_guarded`]: read the
//! account, decide on a patch, and write it back only if the stored version
//! is still the one that was read. On a lost race the account is re-read and
//! the decision is made again against the fresh state, so two concurrent
//! withdrawals can never both spend the same points.
//!
//! Side effects that follow a successful debit (the withdrawal log entry,
//! the payout notification) are ordered after the guarded write. A failed
//! log insert is reported as `PartialFailure` and left for an operator; a
//! failed notification is only logged.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use ringtone_core::{
    level_for, points_for_contributions, Account, AccountId, AccountPatch, Badge, BadgeCondition,
    Result, RewardsError, WithdrawalId, WithdrawalRequest, WithdrawalStatus,
    FIRST_CONTRIBUTION_BONUS, MAX_UPDATE_ATTEMPTS, POINTS_PER_CONTRIBUTION,
};
use ringtone_store::{
    AccountStore, AwardStore, BadgeStore, CatalogRepository, StoreError, WithdrawalLog,
};

use crate::notify::{dispatch_best_effort, Notifier, WithdrawalNotice};

/// Default bound on a payout notification.
pub const DEFAULT_NOTIFY_TIMEOUT: Duration = Duration::from_secs(3);

/// Message shown when the debit went through but the request was not logged.
const WITHDRAWAL_LOG_FAILED: &str = "Your points were deducted but the withdrawal request \
     could not be recorded. Please contact support with your account id.";

/// The storage ports the ledger depends on.
#[derive(Clone)]
pub struct LedgerStores {
    /// Account records.
    pub accounts: Arc<dyn AccountStore>,
    /// Withdrawal request log.
    pub withdrawals: Arc<dyn WithdrawalLog>,
    /// Badge definitions.
    pub badges: Arc<dyn BadgeStore>,
    /// Awarded badges.
    pub awards: Arc<dyn AwardStore>,
    /// Catalog (approved contribution counts).
    pub catalog: Arc<dyn CatalogRepository>,
}

impl LedgerStores {
    /// Use one backend for every port.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: AccountStore + WithdrawalLog + BadgeStore + AwardStore + CatalogRepository + 'static,
    {
        Self {
            accounts: backend.clone(),
            withdrawals: backend.clone(),
            badges: backend.clone(),
            awards: backend.clone(),
            catalog: backend,
        }
    }
}

/// Result of a first-contribution bonus grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BonusOutcome {
    /// Whether this call paid the bonus.
    pub bonus_given: bool,
    /// Balance after the call.
    pub points: i64,
}

/// Result of an accepted withdrawal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WithdrawalOutcome {
    /// The recorded request (amount is the effective amount).
    pub withdrawal: WithdrawalRequest,
    /// Balance after the debit.
    pub remaining_points: i64,
}

/// Result of a reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncOutcome {
    /// The account after reconciliation.
    pub account: Account,
    /// Whether stored points or level were corrected.
    pub corrected: bool,
    /// Badges awarded by this pass.
    pub new_badges: Vec<Badge>,
}

/// Result of crediting an approved contribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContributionOutcome {
    /// The account after the credit.
    pub account: Account,
    /// Badges awarded by the follow-up badge sync.
    pub new_badges: Vec<Badge>,
}

/// The rewards ledger.
#[derive(Clone)]
pub struct Ledger {
    stores: LedgerStores,
    notifier: Option<Arc<dyn Notifier>>,
    notify_timeout: Duration,
}

impl Ledger {
    /// Create a ledger without payout notifications.
    #[must_use]
    pub fn new(stores: LedgerStores) -> Self {
        Self {
            stores,
            notifier: None,
            notify_timeout: DEFAULT_NOTIFY_TIMEOUT,
        }
    }

    /// Send payout notifications through `notifier`, waiting at most `timeout`.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>, timeout: Duration) -> Self {
        self.notifier = Some(notifier);
        self.notify_timeout = timeout;
        self
    }

    /// The underlying stores.
    #[must_use]
    pub fn stores(&self) -> &LedgerStores {
        &self.stores
    }

    // ========================================================================
    // Accounts
    // ========================================================================

    /// Create the account on first sign-in; existing accounts are returned
    /// unchanged.
    pub async fn ensure_account(&self, account_id: &AccountId, email: Option<&str>) -> Result<Account> {
        let account = self.stores.accounts.upsert_account(account_id, email).await?;
        tracing::debug!(account_id = %account_id, "Account ensured");
        Ok(account)
    }

    /// Read an account.
    pub async fn account(&self, account_id: &AccountId) -> Result<Account> {
        self.stores
            .accounts
            .get_account(account_id)
            .await?
            .ok_or_else(|| RewardsError::account_not_found(account_id))
    }

    /// Badges held by an account, in award order.
    pub async fn badges_for(&self, account_id: &AccountId) -> Result<Vec<Badge>> {
        Ok(self.stores.awards.list_awarded(account_id).await?)
    }

    /// Most recent withdrawal requests for an account, newest first.
    pub async fn withdrawal_history(
        &self,
        account_id: &AccountId,
        limit: usize,
    ) -> Result<Vec<WithdrawalRequest>> {
        Ok(self
            .stores
            .withdrawals
            .list_withdrawals_by_account(account_id, limit)
            .await?)
    }

    // ========================================================================
    // Rewards
    // ========================================================================

    /// Pay the one-time first-contribution bonus.
    ///
    /// Idempotent: once paid, further calls change nothing and report
    /// `bonus_given: false`.
    ///
    /// # Errors
    ///
    /// `Unauthorized` if `actor` is not the account owner (checked before any
    /// read), `NotFound` if the account does not exist.
    pub async fn grant_first_contribution_bonus(
        &self,
        actor: &AccountId,
        account_id: &AccountId,
    ) -> Result<BonusOutcome> {
        ensure_owner(actor, account_id)?;

        let (account, written) = self
            .update_guarded(account_id, |account| {
                if account.first_contribution_rewarded {
                    return Ok(None);
                }
                Ok(Some(AccountPatch {
                    points: Some(account.points + FIRST_CONTRIBUTION_BONUS),
                    mark_first_contribution_rewarded: true,
                    ..AccountPatch::default()
                }))
            })
            .await?;

        if written {
            tracing::info!(
                account_id = %account_id,
                bonus = FIRST_CONTRIBUTION_BONUS,
                points = account.points,
                "First contribution bonus granted"
            );
        }

        Ok(BonusOutcome {
            bonus_given: written,
            points: account.points,
        })
    }

    /// Credit one approved contribution, then award any badges it unlocks.
    pub async fn credit_approved_contribution(
        &self,
        account_id: &AccountId,
    ) -> Result<ContributionOutcome> {
        let (account, _) = self
            .update_guarded(account_id, |account| {
                Ok(Some(AccountPatch::points(
                    account.points + POINTS_PER_CONTRIBUTION,
                )))
            })
            .await?;

        tracing::info!(
            account_id = %account_id,
            points = account.points,
            level = account.level,
            "Approved contribution credited"
        );

        let new_badges = self.sync_badges(account_id).await?;
        Ok(ContributionOutcome {
            account,
            new_badges,
        })
    }

    /// Recompute points and level from the approved contribution count,
    /// correcting drift, then sync badges.
    ///
    /// Writes only when the stored values differ, so a second call with no
    /// new approvals is a no-op. This treats the approved count as the whole
    /// truth and would undo withdrawal debits; callers use it for explicit
    /// profile refreshes only.
    pub async fn sync_gamification_state(&self, account_id: &AccountId) -> Result<SyncOutcome> {
        let approved = self.stores.catalog.approved_count(account_id).await?;
        let points = points_for_contributions(approved);
        let level = level_for(points);

        let (account, corrected) = self
            .update_guarded(account_id, |account| {
                if account.points == points && account.level == level {
                    return Ok(None);
                }
                Ok(Some(AccountPatch::points(points)))
            })
            .await?;

        if corrected {
            tracing::info!(
                account_id = %account_id,
                approved,
                points,
                level,
                "Gamification state reconciled"
            );
        }

        let new_badges = self.sync_badges(account_id).await?;
        Ok(SyncOutcome {
            account,
            corrected,
            new_badges,
        })
    }

    /// Insert or update badge definitions by name.
    pub async fn install_badges(&self, badges: &[Badge]) -> Result<()> {
        for badge in badges {
            self.stores.badges.put_badge(badge).await?;
        }
        tracing::debug!(count = badges.len(), "Badge definitions installed");
        Ok(())
    }

    /// Award every upload-count badge the account qualifies for.
    ///
    /// Never removes awards. Returns only the badges new to this call.
    pub async fn sync_badges(&self, account_id: &AccountId) -> Result<Vec<Badge>> {
        let approved = self.stores.catalog.approved_count(account_id).await?;
        let eligible = self
            .stores
            .badges
            .list_badges(BadgeCondition::UploadCount, approved)
            .await?;

        let mut awarded = Vec::new();
        for badge in eligible.into_iter().filter(|b| b.is_earned_by(approved)) {
            if self
                .stores
                .awards
                .award_ignoring_conflict(account_id, &badge.id)
                .await?
            {
                tracing::info!(
                    account_id = %account_id,
                    badge = %badge.name,
                    "Badge awarded"
                );
                awarded.push(badge);
            }
        }

        Ok(awarded)
    }

    // ========================================================================
    // Withdrawals
    // ========================================================================

    /// Debit a withdrawal and record it for payout.
    ///
    /// A first withdrawal must ask for at least 15 points and is always paid
    /// out as exactly 15. Later withdrawals must ask for at least 200 and are
    /// paid as asked.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` if `actor` is not the account owner.
    /// - `ValidationFailed` for bad input, an amount below the minimum, or a
    ///   balance that does not cover the effective amount.
    /// - `Contention` if the guarded update kept losing.
    /// - `PartialFailure` if the points were debited but the request could not
    ///   be recorded.
    pub async fn request_withdrawal(
        &self,
        actor: &AccountId,
        account_id: &AccountId,
        amount: i64,
        payout_destination: &str,
    ) -> Result<WithdrawalOutcome> {
        ensure_owner(actor, account_id)?;

        if amount <= 0 {
            return Err(RewardsError::ValidationFailed(
                "Withdrawal amount must be positive".into(),
            ));
        }
        let destination = payout_destination.trim();
        if destination.is_empty() {
            return Err(RewardsError::ValidationFailed(
                "A payout destination is required".into(),
            ));
        }

        let mut effective = 0;
        let (account, _) = self
            .update_guarded(account_id, |account| {
                effective = account
                    .withdrawal_policy()
                    .effective_amount(amount, account.points)?;
                Ok(Some(AccountPatch {
                    points: Some(account.points - effective),
                    withdrawal_count: Some(account.withdrawal_count + 1),
                    payout_destination: Some(destination.to_string()),
                    mark_first_contribution_rewarded: false,
                }))
            })
            .await?;

        let request = WithdrawalRequest::pending(*account_id, effective, destination.to_string());
        if let Err(e) = self.stores.withdrawals.insert_withdrawal(&request).await {
            tracing::error!(
                account_id = %account_id,
                amount = effective,
                payout_destination = %destination,
                error = %e,
                "Withdrawal debited but request not recorded; manual follow-up required"
            );
            return Err(RewardsError::PartialFailure {
                step: "record_withdrawal",
                message: WITHDRAWAL_LOG_FAILED.into(),
            });
        }

        tracing::info!(
            account_id = %account_id,
            withdrawal_id = %request.id,
            requested = amount,
            amount = effective,
            remaining = account.points,
            "Withdrawal requested"
        );

        if let Some(notifier) = &self.notifier {
            let notice = WithdrawalNotice {
                account_id: *account_id,
                withdrawal_id: request.id,
                amount: effective,
                payout_destination: request.payout_destination.clone(),
                requested_at: request.created_at,
            };
            dispatch_best_effort(notifier.clone(), notice, self.notify_timeout);
        }

        Ok(WithdrawalOutcome {
            withdrawal: request,
            remaining_points: account.points,
        })
    }

    /// Pending withdrawal requests, oldest first.
    pub async fn pending_withdrawals(&self, limit: usize) -> Result<Vec<WithdrawalRequest>> {
        Ok(self.stores.withdrawals.list_pending(limit).await?)
    }

    /// Move a pending request to `fulfilled` or `rejected`.
    ///
    /// Rejection does not refund the debited points.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id, `InvalidTransition` if the request is
    /// not pending (including when another moderator resolved it first).
    pub async fn resolve_withdrawal(
        &self,
        withdrawal_id: &WithdrawalId,
        status: WithdrawalStatus,
    ) -> Result<WithdrawalRequest> {
        let current = self.withdrawal(withdrawal_id).await?;
        current.status.transition_to(status)?;

        match self
            .stores
            .withdrawals
            .set_withdrawal_status(withdrawal_id, current.status, status)
            .await
        {
            Ok(resolved) => {
                tracing::info!(
                    withdrawal_id = %withdrawal_id,
                    account_id = %resolved.account_id,
                    status = %status,
                    "Withdrawal resolved"
                );
                Ok(resolved)
            }
            Err(StoreError::VersionConflict { .. }) => {
                let latest = self.withdrawal(withdrawal_id).await?;
                Err(RewardsError::InvalidTransition {
                    from: latest.status.to_string(),
                    to: status.to_string(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn withdrawal(&self, withdrawal_id: &WithdrawalId) -> Result<WithdrawalRequest> {
        self.stores
            .withdrawals
            .get_withdrawal(withdrawal_id)
            .await?
            .ok_or_else(|| RewardsError::NotFound {
                entity: "withdrawal",
                id: withdrawal_id.to_string(),
            })
    }

    /// Read-decide-write loop over one account.
    ///
    /// `plan` sees the freshly read account and returns the patch to apply,
    /// or `None` to leave it untouched. An empty patch is treated as `None`.
    /// Returns the resulting account and whether a write happened.
    async fn update_guarded<F>(&self, account_id: &AccountId, mut plan: F) -> Result<(Account, bool)>
    where
        F: FnMut(&Account) -> Result<Option<AccountPatch>> + Send,
    {
        for attempt in 1..=MAX_UPDATE_ATTEMPTS {
            let account = self.account(account_id).await?;
            let Some(patch) = plan(&account)?.filter(|p| !p.is_empty()) else {
                return Ok((account, false));
            };

            match self
                .stores
                .accounts
                .update_account(account_id, account.version, &patch)
                .await
            {
                Ok(updated) => return Ok((updated, true)),
                Err(StoreError::VersionConflict { .. }) => {
                    tracing::debug!(
                        account_id = %account_id,
                        attempt,
                        "Account changed concurrently, retrying"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::warn!(
            account_id = %account_id,
            attempts = MAX_UPDATE_ATTEMPTS,
            "Gave up on contended account update"
        );
        Err(RewardsError::Contention)
    }
}

fn ensure_owner(actor: &AccountId, account_id: &AccountId) -> Result<()> {
    if actor == account_id {
        Ok(())
    } else {
        tracing::warn!(actor = %actor, account_id = %account_id, "Actor does not own account");
        Err(RewardsError::Unauthorized)
    }
}
