use ulid::Ulid;

use crate::model::{Calendar, Span, Weekday};

use super::SchedulerError;

/// First slot on `day` clashing with `span`, in `(day, start)` order.
/// Slots of `exclude` are skipped so an edit never collides with the
/// class's own prior occupancy.
pub(super) fn first_clash(
    cal: &Calendar,
    day: Weekday,
    span: &Span,
    exclude: Option<Ulid>,
) -> Option<Ulid> {
    cal.overlapping(day, span)
        .find(|s| exclude != Some(s.class_id))
        .map(|s| s.class_id)
}

/// The overlap test guarding every create and update: the teacher's
/// calendar first, then each student's in request order, short-circuiting
/// on the first clash found.
pub(super) fn check_overlap(
    teacher: &Calendar,
    students: &[&Calendar],
    day: Weekday,
    span: &Span,
    exclude: Option<Ulid>,
) -> Result<(), SchedulerError> {
    if let Some(class_id) = first_clash(teacher, day, span, exclude) {
        return Err(SchedulerError::Conflict(class_id));
    }
    for cal in students {
        if let Some(class_id) = first_clash(cal, day, span, exclude) {
            return Err(SchedulerError::Conflict(class_id));
        }
    }
    Ok(())
}
