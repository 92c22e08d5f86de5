mod conflict;
mod error;
mod mutations;
mod queries;

pub use error::SchedulerError;

use std::collections::HashMap;

use tokio::sync::OwnedRwLockWriteGuard;
use ulid::Ulid;

use crate::model::Calendar;
use crate::store::Store;

/// Guards on every calendar a mutation touches, plus an index from
/// person id to guard position.
pub(super) type LockedCalendars = (
    Vec<OwnedRwLockWriteGuard<Calendar>>,
    HashMap<Ulid, usize>,
);

/// The scheduler: conflict detection and roster mutation over the
/// record store. No state of its own between calls — every request is
/// validated against the then-current store contents.
pub struct Scheduler {
    pub store: Store,
}

impl Scheduler {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Write-lock every participant's calendar before the check-then-write
    /// sequence, in sorted id order to prevent deadlocks between requests
    /// sharing participants. Requests with disjoint participants never
    /// contend.
    pub(super) async fn lock_calendars(
        &self,
        participants: &[Ulid],
    ) -> Result<LockedCalendars, SchedulerError> {
        let mut ids = participants.to_vec();
        ids.sort();
        ids.dedup();

        let mut guards = Vec::with_capacity(ids.len());
        let mut index = HashMap::new();
        for id in ids {
            let cal = self
                .store
                .calendar(&id)
                .ok_or(SchedulerError::NotFound(id))?;
            index.insert(id, guards.len());
            guards.push(cal.write_owned().await);
        }
        Ok((guards, index))
    }
}
