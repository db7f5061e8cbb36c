use tracing::info;

use crate::model::{
    leave_type::LeaveType,
    profile::{Gender, Profile},
};
use crate::store::{AccountStore, BalanceStore, StoreError, StoreResult};

/// Active catalog entries offered to staff of the given gender.
pub fn applicable(types: &[LeaveType], gender: Gender) -> impl Iterator<Item = &LeaveType> {
    types
        .iter()
        .filter(move |t| t.is_active && t.applies_to(gender))
}

/// A duplicate key while creating a row means another request got there
/// first.
fn absorb_race(result: StoreResult<bool>) -> StoreResult<bool> {
    match result {
        Err(StoreError::Conflict(_)) => Ok(false),
        other => other,
    }
}

/// Creates the missing allowance and tracker rows for one user and returns
/// how many rows were created.
pub async fn reconcile_user<S: BalanceStore>(
    store: &S,
    types: &[LeaveType],
    profile: &Profile,
) -> StoreResult<u32> {
    let mut created = 0;

    for leave_type in applicable(types, profile.gender) {
        if absorb_race(store.ensure_allowance(profile.user_id, leave_type).await)? {
            created += 1;
        }
        if absorb_race(store.ensure_tracker(profile.user_id, leave_type.id).await)? {
            created += 1;
        }
    }

    if created > 0 {
        info!(user_id = profile.user_id, created, "Reconciled leave allowances");
    }
    Ok(created)
}

/// Repairs every account that has a profile.
pub async fn reconcile_all<S: AccountStore + BalanceStore>(
    store: &S,
    types: &[LeaveType],
) -> StoreResult<u32> {
    let mut fixed = 0;
    for account in store.list_accounts().await? {
        fixed += reconcile_user(store, types, &account.profile).await?;
    }
    Ok(fixed)
}
