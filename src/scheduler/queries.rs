use ulid::Ulid;

use crate::model::*;

use super::Scheduler;

impl Scheduler {
    /// A teacher's week, sorted Monday..Friday then start time, with the
    /// roster names joined into one display column. An unknown id yields
    /// an empty timetable.
    pub async fn teacher_timetable(&self, teacher_id: Ulid) -> Vec<TimetableRow> {
        let Some(cal) = self.store.calendar(&teacher_id) else {
            return Vec::new();
        };
        let guard = cal.read().await;
        guard
            .slots
            .iter()
            .filter_map(|slot| {
                let row = self.store.get_class(&slot.class_id)?;
                let teacher = self.store.get_teacher(&row.teacher_id)?;
                let students = row
                    .roster
                    .iter()
                    .filter_map(|sid| self.store.get_student(sid).map(|p| p.name))
                    .collect::<Vec<_>>()
                    .join(", ");
                Some(TimetableRow {
                    id: row.id,
                    teacher: teacher.name,
                    subject: row.subject,
                    day: slot.day,
                    start_time: fmt_hhmm(slot.span.start),
                    end_time: fmt_hhmm(slot.span.end),
                    students: Some(students),
                })
            })
            .collect()
    }

    /// A student's week, same order and shape without the roster column.
    pub async fn student_timetable(&self, student_id: Ulid) -> Vec<TimetableRow> {
        let Some(cal) = self.store.calendar(&student_id) else {
            return Vec::new();
        };
        let guard = cal.read().await;
        guard
            .slots
            .iter()
            .filter_map(|slot| {
                let row = self.store.get_class(&slot.class_id)?;
                let teacher = self.store.get_teacher(&row.teacher_id)?;
                Some(TimetableRow {
                    id: row.id,
                    teacher: teacher.name,
                    subject: row.subject,
                    day: slot.day,
                    start_time: fmt_hhmm(slot.span.start),
                    end_time: fmt_hhmm(slot.span.end),
                    students: None,
                })
            })
            .collect()
    }

    pub fn list_teachers(&self) -> Vec<Person> {
        self.store.list_teachers()
    }

    pub fn list_students(&self) -> Vec<Person> {
        self.store.list_students()
    }
}
