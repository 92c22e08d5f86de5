use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Minutes since midnight — the only time-of-day type.
pub type Minutes = i32;

/// Parse a 24-hour `"HH:MM"` string into minutes since midnight.
pub fn parse_hhmm(s: &str) -> Option<Minutes> {
    let (h, m) = s.split_once(':')?;
    if h.len() != 2 || m.len() != 2 {
        return None;
    }
    let h: i32 = h.parse().ok()?;
    let m: i32 = m.parse().ok()?;
    if !(0..24).contains(&h) || !(0..60).contains(&m) {
        return None;
    }
    Some(h * 60 + m)
}

/// Render minutes since midnight as `"HH:MM"`.
pub fn fmt_hhmm(t: Minutes) -> String {
    format!("{:02}:{:02}", t / 60, t % 60)
}

/// Teaching days. `Ord` follows the timetable display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl Weekday {
    pub const ALL: [Weekday; 5] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Weekday {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Weekday::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or(())
    }
}

/// Half-open interval `[start, end)` within one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Minutes,
    pub end: Minutes,
}

impl Span {
    pub fn new(start: Minutes, end: Minutes) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// A teacher or student row. Names are not unique; identity is the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Person {
    pub id: Ulid,
    pub name: String,
}

/// One calendar entry: the occupancy a class puts on one person's week.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub class_id: Ulid,
    pub day: Weekday,
    pub span: Span,
}

/// One person's weekly occupancy, sorted by `(day, span.start)`.
#[derive(Debug, Clone)]
pub struct Calendar {
    pub person_id: Ulid,
    pub slots: Vec<Slot>,
}

impl Calendar {
    pub fn new(person_id: Ulid) -> Self {
        Self {
            person_id,
            slots: Vec::new(),
        }
    }

    /// Insert a slot maintaining the `(day, start)` sort order.
    pub fn insert_slot(&mut self, slot: Slot) {
        let pos = self
            .slots
            .binary_search_by_key(&(slot.day, slot.span.start), |s| (s.day, s.span.start))
            .unwrap_or_else(|e| e);
        self.slots.insert(pos, slot);
    }

    /// Remove every slot belonging to the given class.
    pub fn remove_class(&mut self, class_id: Ulid) {
        self.slots.retain(|s| s.class_id != class_id);
    }

    /// Slots on `day` whose span overlaps the query window.
    /// Uses the sort order to skip slots starting at or after `query.end`.
    pub fn overlapping(&self, day: Weekday, query: &Span) -> impl Iterator<Item = &Slot> {
        let right_bound = self
            .slots
            .partition_point(|s| (s.day, s.span.start) < (day, query.end));
        self.slots[..right_bound]
            .iter()
            .filter(move |s| s.day == day && s.span.end > query.start)
    }
}

/// One scheduled class session plus its enrollment set.
/// Rewritten whole on update — the roster is replaced, never diffed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassRow {
    pub id: Ulid,
    pub teacher_id: Ulid,
    pub subject: String,
    pub day: Weekday,
    pub span: Span,
    pub roster: Vec<Ulid>,
}

// ── Query result types ───────────────────────────────────────────

/// One display row of a timetable. `students` is present on teacher
/// timetables only, as a `", "`-joined name list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimetableRow {
    pub id: Ulid,
    pub teacher: String,
    pub subject: String,
    pub day: Weekday,
    pub start_time: String,
    pub end_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub students: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hhmm_roundtrip() {
        assert_eq!(parse_hhmm("09:00"), Some(540));
        assert_eq!(parse_hhmm("00:00"), Some(0));
        assert_eq!(parse_hhmm("23:59"), Some(23 * 60 + 59));
        assert_eq!(fmt_hhmm(540), "09:00");
        assert_eq!(fmt_hhmm(23 * 60 + 59), "23:59");
    }

    #[test]
    fn hhmm_rejects_malformed() {
        assert_eq!(parse_hhmm("24:00"), None);
        assert_eq!(parse_hhmm("09:60"), None);
        assert_eq!(parse_hhmm("9:00"), None);
        assert_eq!(parse_hhmm("0900"), None);
        assert_eq!(parse_hhmm("aa:bb"), None);
    }

    #[test]
    fn weekday_parse_and_order() {
        assert_eq!("Monday".parse(), Ok(Weekday::Monday));
        assert_eq!("Friday".parse(), Ok(Weekday::Friday));
        assert!("Saturday".parse::<Weekday>().is_err());
        assert!("monday".parse::<Weekday>().is_err());
        assert!(Weekday::Monday < Weekday::Tuesday);
        assert!(Weekday::Thursday < Weekday::Friday);
    }

    #[test]
    fn span_overlap() {
        let a = Span::new(540, 600);
        let b = Span::new(570, 630);
        let c = Span::new(600, 660);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c)); // touching, not overlapping
        assert!(!c.overlaps(&a));
    }

    #[test]
    fn slot_ordering() {
        let mut cal = Calendar::new(Ulid::new());
        cal.insert_slot(Slot {
            class_id: Ulid::new(),
            day: Weekday::Wednesday,
            span: Span::new(540, 600),
        });
        cal.insert_slot(Slot {
            class_id: Ulid::new(),
            day: Weekday::Monday,
            span: Span::new(840, 900),
        });
        cal.insert_slot(Slot {
            class_id: Ulid::new(),
            day: Weekday::Monday,
            span: Span::new(540, 600),
        });
        assert_eq!(cal.slots[0].day, Weekday::Monday);
        assert_eq!(cal.slots[0].span.start, 540);
        assert_eq!(cal.slots[1].day, Weekday::Monday);
        assert_eq!(cal.slots[1].span.start, 840);
        assert_eq!(cal.slots[2].day, Weekday::Wednesday);
    }

    #[test]
    fn overlapping_same_day_only() {
        let mut cal = Calendar::new(Ulid::new());
        cal.insert_slot(Slot {
            class_id: Ulid::new(),
            day: Weekday::Monday,
            span: Span::new(540, 600),
        });
        cal.insert_slot(Slot {
            class_id: Ulid::new(),
            day: Weekday::Tuesday,
            span: Span::new(540, 600),
        });

        let query = Span::new(570, 630);
        let hits: Vec<_> = cal.overlapping(Weekday::Monday, &query).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].day, Weekday::Monday);
    }

    #[test]
    fn overlapping_adjacent_not_included() {
        // A slot ending exactly at query.start is NOT overlapping (half-open)
        let mut cal = Calendar::new(Ulid::new());
        cal.insert_slot(Slot {
            class_id: Ulid::new(),
            day: Weekday::Monday,
            span: Span::new(540, 600),
        });
        let query = Span::new(600, 660);
        assert!(cal.overlapping(Weekday::Monday, &query).next().is_none());
        let query = Span::new(480, 540);
        assert!(cal.overlapping(Weekday::Monday, &query).next().is_none());
    }

    #[test]
    fn remove_class_clears_all_its_slots() {
        let mut cal = Calendar::new(Ulid::new());
        let class = Ulid::new();
        cal.insert_slot(Slot {
            class_id: class,
            day: Weekday::Monday,
            span: Span::new(540, 600),
        });
        cal.insert_slot(Slot {
            class_id: Ulid::new(),
            day: Weekday::Monday,
            span: Span::new(660, 720),
        });
        cal.remove_class(class);
        assert_eq!(cal.slots.len(), 1);
        assert_eq!(cal.slots[0].span.start, 660);
    }

    #[test]
    fn overlapping_empty_calendar() {
        let cal = Calendar::new(Ulid::new());
        let query = Span::new(0, 24 * 60);
        assert!(cal.overlapping(Weekday::Monday, &query).next().is_none());
    }
}
