use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::RwLock;
use ulid::Ulid;

use crate::model::*;

pub type SharedCalendar = Arc<RwLock<Calendar>>;

/// The record store: teacher/student rows, per-person calendars, and
/// class rows. Person rows are immutable after creation; calendars are
/// mutated under their own write locks; class rows are rewritten whole.
pub struct Store {
    teachers: DashMap<Ulid, Person>,
    students: DashMap<Ulid, Person>,
    /// Name → id of the FIRST person created with that name. Names are
    /// not unique — the index is a lookup key, not an identity.
    teacher_names: DashMap<String, Ulid>,
    student_names: DashMap<String, Ulid>,
    calendars: DashMap<Ulid, SharedCalendar>,
    classes: DashMap<Ulid, ClassRow>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self {
            teachers: DashMap::new(),
            students: DashMap::new(),
            teacher_names: DashMap::new(),
            student_names: DashMap::new(),
            calendars: DashMap::new(),
            classes: DashMap::new(),
        }
    }

    // ── Person rows ──────────────────────────────────────────

    fn insert_person(
        table: &DashMap<Ulid, Person>,
        index: &DashMap<String, Ulid>,
        calendars: &DashMap<Ulid, SharedCalendar>,
        name: &str,
    ) -> Person {
        let person = Person {
            id: Ulid::new(),
            name: name.to_string(),
        };
        table.insert(person.id, person.clone());
        index.entry(name.to_string()).or_insert(person.id);
        calendars.insert(person.id, Arc::new(RwLock::new(Calendar::new(person.id))));
        person
    }

    /// Insert a teacher row. Duplicate names are allowed and stay
    /// distinct entities.
    pub fn create_teacher(&self, name: &str) -> Person {
        Self::insert_person(&self.teachers, &self.teacher_names, &self.calendars, name)
    }

    /// Insert a student row. Same policy as teachers.
    pub fn create_student(&self, name: &str) -> Person {
        Self::insert_person(&self.students, &self.student_names, &self.calendars, name)
    }

    /// Exact-name lookup, creating the row if absent. Returns the first
    /// student ever created with this name when duplicates exist.
    pub fn find_or_create_student(&self, name: &str) -> Ulid {
        if let Some(id) = self.student_names.get(name) {
            return *id.value();
        }
        self.create_student(name).id
    }

    pub fn get_teacher(&self, id: &Ulid) -> Option<Person> {
        self.teachers.get(id).map(|e| e.value().clone())
    }

    pub fn get_student(&self, id: &Ulid) -> Option<Person> {
        self.students.get(id).map(|e| e.value().clone())
    }

    pub fn contains_teacher(&self, id: &Ulid) -> bool {
        self.teachers.contains_key(id)
    }

    fn list_sorted(table: &DashMap<Ulid, Person>) -> Vec<Person> {
        let mut rows: Vec<Person> = table.iter().map(|e| e.value().clone()).collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        rows
    }

    pub fn list_teachers(&self) -> Vec<Person> {
        Self::list_sorted(&self.teachers)
    }

    pub fn list_students(&self) -> Vec<Person> {
        Self::list_sorted(&self.students)
    }

    // ── Calendars ────────────────────────────────────────────

    pub fn calendar(&self, person_id: &Ulid) -> Option<SharedCalendar> {
        self.calendars.get(person_id).map(|e| e.value().clone())
    }

    // ── Class rows ───────────────────────────────────────────

    pub fn get_class(&self, id: &Ulid) -> Option<ClassRow> {
        self.classes.get(id).map(|e| e.value().clone())
    }

    /// Insert or fully rewrite a class row.
    pub fn put_class(&self, row: ClassRow) {
        self.classes.insert(row.id, row);
    }

    pub fn remove_class(&self, id: &Ulid) -> Option<ClassRow> {
        self.classes.remove(id).map(|(_, row)| row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_names_stay_distinct() {
        let store = Store::new();
        let a = store.create_teacher("Ada");
        let b = store.create_teacher("Ada");
        assert_ne!(a.id, b.id);
        assert_eq!(store.list_teachers().len(), 2);
    }

    #[test]
    fn find_or_create_reuses_first_row() {
        let store = Store::new();
        let first = store.create_student("Ben");
        let _second = store.create_student("Ben");
        assert_eq!(store.find_or_create_student("Ben"), first.id);
        assert_eq!(store.list_students().len(), 2);
    }

    #[test]
    fn find_or_create_inserts_exactly_one() {
        let store = Store::new();
        let id = store.find_or_create_student("Cleo");
        assert_eq!(store.find_or_create_student("Cleo"), id);
        assert_eq!(store.list_students().len(), 1);
        assert!(store.calendar(&id).is_some());
    }

    #[test]
    fn listing_is_name_sorted() {
        let store = Store::new();
        store.create_teacher("Zoe");
        store.create_teacher("Ada");
        store.create_teacher("Mia");
        let names: Vec<String> = store.list_teachers().into_iter().map(|p| p.name).collect();
        assert_eq!(names, ["Ada", "Mia", "Zoe"]);
    }

    #[test]
    fn class_rows_rewrite_whole() {
        let store = Store::new();
        let t = store.create_teacher("Ada");
        let id = Ulid::new();
        store.put_class(ClassRow {
            id,
            teacher_id: t.id,
            subject: "Maths".into(),
            day: Weekday::Monday,
            span: Span::new(540, 600),
            roster: vec![],
        });
        let mut row = store.get_class(&id).unwrap();
        row.subject = "Physics".into();
        store.put_class(row);
        assert_eq!(store.get_class(&id).unwrap().subject, "Physics");
        assert!(store.remove_class(&id).is_some());
        assert!(store.remove_class(&id).is_none());
    }
}
