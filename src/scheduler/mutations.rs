use std::collections::{HashMap, HashSet};

use tokio::sync::OwnedRwLockWriteGuard;
use ulid::Ulid;

use crate::model::*;

use super::conflict::check_overlap;
use super::{Scheduler, SchedulerError};

/// Drop repeated student ids, keeping first-occurrence order. The same
/// name twice in a request resolves to the same id twice; one enrollment
/// row per student is enough.
fn dedup_roster(ids: &[Ulid]) -> Vec<Ulid> {
    let mut seen = HashSet::new();
    ids.iter().filter(|id| seen.insert(**id)).copied().collect()
}

fn insert_slots(
    guards: &mut [OwnedRwLockWriteGuard<Calendar>],
    index: &HashMap<Ulid, usize>,
    class_id: Ulid,
    teacher_id: Ulid,
    roster: &[Ulid],
    day: Weekday,
    span: Span,
) {
    let slot = Slot {
        class_id,
        day,
        span,
    };
    guards[index[&teacher_id]].insert_slot(slot);
    for sid in roster {
        guards[index[sid]].insert_slot(slot);
    }
}

impl Scheduler {
    /// Resolve student names to ids, creating rows for unknown names.
    /// Preserves input order and duplicates. Runs BEFORE the overlap
    /// check, so a request that later fails with a clash may still have
    /// created student rows — an accepted inconsistency: create-by-name
    /// is idempotent and the stray row carries no enrollment.
    pub fn resolve_students(&self, names: &[String]) -> Vec<Ulid> {
        names
            .iter()
            .map(|n| self.store.find_or_create_student(n.trim()))
            .collect()
    }

    /// Create a class if neither the teacher nor any listed student is
    /// already booked on an intersecting interval that day.
    pub async fn schedule_class(
        &self,
        teacher_id: Ulid,
        student_names: &[String],
        subject: &str,
        day: Weekday,
        span: Span,
    ) -> Result<Ulid, SchedulerError> {
        if !self.store.contains_teacher(&teacher_id) {
            return Err(SchedulerError::NotFound(teacher_id));
        }
        let student_ids = self.resolve_students(student_names);

        let mut participants = vec![teacher_id];
        participants.extend_from_slice(&student_ids);
        let (mut guards, index) = self.lock_calendars(&participants).await?;

        {
            let teacher_cal: &Calendar = &guards[index[&teacher_id]];
            let student_cals: Vec<&Calendar> =
                student_ids.iter().map(|sid| &*guards[index[sid]]).collect();
            check_overlap(teacher_cal, &student_cals, day, &span, None)?;
        }

        let class_id = Ulid::new();
        let roster = dedup_roster(&student_ids);
        insert_slots(&mut guards, &index, class_id, teacher_id, &roster, day, span);
        self.store.put_class(ClassRow {
            id: class_id,
            teacher_id,
            subject: subject.to_string(),
            day,
            span,
            roster,
        });
        Ok(class_id)
    }

    /// Rewrite a class in place. The class's own prior occupancy is
    /// excluded from the overlap check; on success the row is replaced
    /// whole and the enrollment set is deleted and reinserted, not
    /// diffed.
    pub async fn reschedule_class(
        &self,
        class_id: Ulid,
        teacher_id: Ulid,
        student_names: &[String],
        subject: &str,
        day: Weekday,
        span: Span,
    ) -> Result<(), SchedulerError> {
        if !self.store.contains_teacher(&teacher_id) {
            return Err(SchedulerError::NotFound(teacher_id));
        }
        let student_ids = self.resolve_students(student_names);

        loop {
            let snapshot = self
                .store
                .get_class(&class_id)
                .ok_or(SchedulerError::NotFound(class_id))?;

            // Lock the union of old and new participants: the check reads
            // the new ones, the slot removal writes the old ones.
            let mut participants = vec![teacher_id, snapshot.teacher_id];
            participants.extend_from_slice(&student_ids);
            participants.extend_from_slice(&snapshot.roster);
            let (mut guards, index) = self.lock_calendars(&participants).await?;

            // A concurrent edit may have rewritten the row while we
            // waited for locks; its participants would not all be locked
            // here, so start over from the fresh row.
            match self.store.get_class(&class_id) {
                Some(current) if current == snapshot => {}
                Some(_) => continue,
                None => return Err(SchedulerError::NotFound(class_id)),
            }

            {
                let teacher_cal: &Calendar = &guards[index[&teacher_id]];
                let student_cals: Vec<&Calendar> =
                    student_ids.iter().map(|sid| &*guards[index[sid]]).collect();
                check_overlap(teacher_cal, &student_cals, day, &span, Some(class_id))?;
            }

            for guard in guards.iter_mut() {
                guard.remove_class(class_id);
            }
            let roster = dedup_roster(&student_ids);
            insert_slots(&mut guards, &index, class_id, teacher_id, &roster, day, span);
            self.store.put_class(ClassRow {
                id: class_id,
                teacher_id,
                subject: subject.to_string(),
                day,
                span,
                roster,
            });
            return Ok(());
        }
    }

    /// Remove a class and all its enrollment slots. Idempotent: an
    /// unknown id is a successful no-op.
    pub async fn delete_class(&self, class_id: Ulid) -> Result<(), SchedulerError> {
        loop {
            let Some(snapshot) = self.store.get_class(&class_id) else {
                return Ok(());
            };

            let mut participants = vec![snapshot.teacher_id];
            participants.extend_from_slice(&snapshot.roster);
            let (mut guards, _index) = self.lock_calendars(&participants).await?;

            match self.store.get_class(&class_id) {
                Some(current) if current == snapshot => {}
                Some(_) => continue,
                None => return Ok(()),
            }

            for guard in guards.iter_mut() {
                guard.remove_class(class_id);
            }
            self.store.remove_class(&class_id);
            return Ok(());
        }
    }
}
