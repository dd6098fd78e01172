//! Crate-private validation helpers shared by the operation modules.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;

use crate::MoneyCents;

/// Days a settled row stays editable after its last update.
pub const EDIT_LOCK_DAYS: i64 = 30;

pub(crate) const MSG_BLANK: &str = "This field may not be blank.";
pub(crate) const MSG_REQUIRED: &str = "This field is required.";
pub(crate) const MSG_NOT_PERMITTED: &str = "You do not have permission to perform this action.";
pub(crate) const MSG_NON_NEGATIVE: &str = "Ensure this value is greater than or equal to 0.";

/// Standard message for a reference to a row that does not exist (or is not
/// visible to the requester, which must read the same).
pub(crate) fn invalid_pk(id: i64) -> String {
    format!("Invalid pk \"{id}\" - object does not exist.")
}

/// Whether an update on a settled row is frozen.
///
/// `now` is the current time in the owning account's time zone. The check is
/// on elapsed time, so the zone changes nothing beyond being resolvable;
/// exactly [`EDIT_LOCK_DAYS`] days is still editable.
pub(crate) fn edit_locked(
    pending: MoneyCents,
    updated_at: DateTime<Utc>,
    now: DateTime<Tz>,
) -> bool {
    pending.is_zero() && now.signed_duration_since(updated_at) > Duration::days(EDIT_LOCK_DAYS)
}
