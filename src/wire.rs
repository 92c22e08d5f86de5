use std::sync::Arc;
use std::time::Instant;

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};
use ulid::Ulid;

use crate::model::{parse_hhmm, Span, Weekday};
use crate::observability;
use crate::scheduler::{Scheduler, SchedulerError};

const MAX_LINE_LEN: usize = 64 * 1024;

/// One parsed request. The wire format is newline-delimited JSON,
/// one object per line, tagged by `"op"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    CreateTeacher {
        name: String,
    },
    CreateStudent {
        name: String,
    },
    ListTeachers,
    ListStudents,
    TeacherTimetable {
        id: Ulid,
    },
    StudentTimetable {
        id: Ulid,
    },
    CreateClass {
        teacher_id: Ulid,
        subject: String,
        day: Weekday,
        span: Span,
        students: Vec<String>,
    },
    UpdateClass {
        id: Ulid,
        teacher_id: Ulid,
        subject: String,
        day: Weekday,
        span: Span,
        students: Vec<String>,
    },
    DeleteClass {
        id: Ulid,
    },
}

// ── Request parsing ──────────────────────────────────────────────

fn str_field(v: &Value, key: &'static str) -> Result<String, SchedulerError> {
    v.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(SchedulerError::Validation("missing_string_field"))
}

fn id_field(v: &Value, key: &'static str) -> Result<Ulid, SchedulerError> {
    let raw = str_field(v, key)?;
    Ulid::from_string(&raw).map_err(|_| SchedulerError::Validation("bad_id"))
}

fn day_field(v: &Value) -> Result<Weekday, SchedulerError> {
    str_field(v, "day")?
        .parse()
        .map_err(|_| SchedulerError::Validation("unknown_day"))
}

/// Parse `start_time`/`end_time` as `"HH:MM"` and require a non-empty
/// half-open interval. Interval sanity lives here at the boundary; the
/// core takes any `Span` it is given.
fn span_fields(v: &Value) -> Result<Span, SchedulerError> {
    let start = parse_hhmm(&str_field(v, "start_time")?)
        .ok_or(SchedulerError::Validation("bad_time"))?;
    let end =
        parse_hhmm(&str_field(v, "end_time")?).ok_or(SchedulerError::Validation("bad_time"))?;
    if start >= end {
        return Err(SchedulerError::Validation("invalid_time_range"));
    }
    Ok(Span::new(start, end))
}

/// `students` must be a JSON array of strings — a single string where a
/// list was expected is the classic malformed request.
fn students_field(v: &Value) -> Result<Vec<String>, SchedulerError> {
    let arr = v
        .get("students")
        .and_then(Value::as_array)
        .ok_or(SchedulerError::Validation("students_must_be_a_list"))?;
    arr.iter()
        .map(|s| {
            s.as_str()
                .map(str::to_string)
                .ok_or(SchedulerError::Validation("student_name_must_be_a_string"))
        })
        .collect()
}

pub fn parse_request(line: &str) -> Result<Request, SchedulerError> {
    let v: Value =
        serde_json::from_str(line).map_err(|_| SchedulerError::Validation("bad_json"))?;
    let op = str_field(&v, "op").map_err(|_| SchedulerError::Validation("missing_op"))?;

    match op.as_str() {
        "create_teacher" => Ok(Request::CreateTeacher {
            name: str_field(&v, "name")?,
        }),
        "create_student" => Ok(Request::CreateStudent {
            name: str_field(&v, "name")?,
        }),
        "list_teachers" => Ok(Request::ListTeachers),
        "list_students" => Ok(Request::ListStudents),
        "teacher_timetable" => Ok(Request::TeacherTimetable {
            id: id_field(&v, "id")?,
        }),
        "student_timetable" => Ok(Request::StudentTimetable {
            id: id_field(&v, "id")?,
        }),
        "create_class" => Ok(Request::CreateClass {
            teacher_id: id_field(&v, "teacher_id")?,
            subject: str_field(&v, "subject")?,
            day: day_field(&v)?,
            span: span_fields(&v)?,
            students: students_field(&v)?,
        }),
        "update_class" => Ok(Request::UpdateClass {
            id: id_field(&v, "id")?,
            teacher_id: id_field(&v, "teacher_id")?,
            subject: str_field(&v, "subject")?,
            day: day_field(&v)?,
            span: span_fields(&v)?,
            students: students_field(&v)?,
        }),
        "delete_class" => Ok(Request::DeleteClass {
            id: id_field(&v, "id")?,
        }),
        _ => Err(SchedulerError::Validation("unknown_op")),
    }
}

// ── Dispatch and response encoding ───────────────────────────────

async fn dispatch(scheduler: &Scheduler, req: Request) -> Result<Value, SchedulerError> {
    match req {
        Request::CreateTeacher { name } => {
            let person = scheduler.store.create_teacher(&name);
            Ok(serde_json::to_value(person).unwrap_or(Value::Null))
        }
        Request::CreateStudent { name } => {
            let person = scheduler.store.create_student(&name);
            Ok(serde_json::to_value(person).unwrap_or(Value::Null))
        }
        Request::ListTeachers => {
            Ok(serde_json::to_value(scheduler.list_teachers()).unwrap_or(Value::Null))
        }
        Request::ListStudents => {
            Ok(serde_json::to_value(scheduler.list_students()).unwrap_or(Value::Null))
        }
        Request::TeacherTimetable { id } => {
            Ok(serde_json::to_value(scheduler.teacher_timetable(id).await).unwrap_or(Value::Null))
        }
        Request::StudentTimetable { id } => {
            Ok(serde_json::to_value(scheduler.student_timetable(id).await).unwrap_or(Value::Null))
        }
        Request::CreateClass {
            teacher_id,
            subject,
            day,
            span,
            students,
        } => {
            let id = scheduler
                .schedule_class(teacher_id, &students, &subject, day, span)
                .await?;
            Ok(json!({ "id": id.to_string() }))
        }
        Request::UpdateClass {
            id,
            teacher_id,
            subject,
            day,
            span,
            students,
        } => {
            scheduler
                .reschedule_class(id, teacher_id, &students, &subject, day, span)
                .await?;
            Ok(json!({ "success": true }))
        }
        Request::DeleteClass { id } => {
            scheduler.delete_class(id).await?;
            Ok(json!({ "success": true }))
        }
    }
}

/// Status codes follow the HTTP reference mapping: 400 validation,
/// 404 unknown id, 409 clash.
fn status_of(err: &SchedulerError) -> u16 {
    match err {
        SchedulerError::Validation(_) => 400,
        SchedulerError::NotFound(_) => 404,
        SchedulerError::Conflict(_) => 409,
    }
}

fn error_token(err: &SchedulerError) -> &'static str {
    match err {
        SchedulerError::Validation(msg) => msg,
        SchedulerError::NotFound(_) => "not_found",
        SchedulerError::Conflict(_) => "clash_detected",
    }
}

fn encode(result: Result<Value, SchedulerError>) -> (u16, Value) {
    match result {
        Ok(data) => (200, json!({ "code": 200, "data": data })),
        Err(err) => {
            let code = status_of(&err);
            (code, json!({ "code": code, "error": error_token(&err) }))
        }
    }
}

// ── Connection loop ──────────────────────────────────────────────

pub async fn process_connection(
    socket: TcpStream,
    scheduler: Arc<Scheduler>,
) -> Result<(), LinesCodecError> {
    let mut framed = Framed::new(socket, LinesCodec::new_with_max_length(MAX_LINE_LEN));

    while let Some(line) = framed.next().await {
        let line = line?;
        let started = Instant::now();

        let (label, result) = match parse_request(&line) {
            Ok(req) => {
                let label = observability::op_label(&req);
                (label, dispatch(&scheduler, req).await)
            }
            Err(e) => ("invalid", Err(e)),
        };

        let (code, body) = encode(result);
        if code == 409 {
            metrics::counter!(observability::CONFLICTS_TOTAL).increment(1);
        }
        if code >= 400 {
            tracing::debug!(op = label, code, "request rejected");
        }
        metrics::counter!(
            observability::REQUESTS_TOTAL,
            "op" => label,
            "status" => code.to_string()
        )
        .increment(1);
        metrics::histogram!(observability::REQUEST_DURATION_SECONDS, "op" => label)
            .record(started.elapsed().as_secs_f64());

        framed.send(body.to_string()).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_create_class() {
        let req = parse_request(
            &json!({
                "op": "create_class",
                "teacher_id": Ulid::new().to_string(),
                "subject": "Maths",
                "day": "Monday",
                "start_time": "09:00",
                "end_time": "10:00",
                "students": ["Ann", "Ben"],
            })
            .to_string(),
        )
        .unwrap();
        match req {
            Request::CreateClass { day, span, students, .. } => {
                assert_eq!(day, Weekday::Monday);
                assert_eq!(span, Span::new(540, 600));
                assert_eq!(students, vec!["Ann", "Ben"]);
            }
            other => panic!("unexpected request: {other:?}"),
        }
    }

    #[test]
    fn students_must_be_a_list() {
        let line = json!({
            "op": "create_class",
            "teacher_id": Ulid::new().to_string(),
            "subject": "Maths",
            "day": "Monday",
            "start_time": "09:00",
            "end_time": "10:00",
            "students": "Ann",
        })
        .to_string();
        assert_eq!(
            parse_request(&line),
            Err(SchedulerError::Validation("students_must_be_a_list"))
        );
    }

    #[test]
    fn rejects_unknown_day_and_bad_times() {
        let base = |day: &str, start: &str, end: &str| {
            json!({
                "op": "create_class",
                "teacher_id": Ulid::new().to_string(),
                "subject": "Maths",
                "day": day,
                "start_time": start,
                "end_time": end,
                "students": [],
            })
            .to_string()
        };
        assert_eq!(
            parse_request(&base("Sunday", "09:00", "10:00")),
            Err(SchedulerError::Validation("unknown_day"))
        );
        assert_eq!(
            parse_request(&base("Monday", "9am", "10:00")),
            Err(SchedulerError::Validation("bad_time"))
        );
        assert_eq!(
            parse_request(&base("Monday", "10:00", "09:00")),
            Err(SchedulerError::Validation("invalid_time_range"))
        );
        assert_eq!(
            parse_request(&base("Monday", "09:00", "09:00")),
            Err(SchedulerError::Validation("invalid_time_range"))
        );
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(
            parse_request("not json"),
            Err(SchedulerError::Validation("bad_json"))
        );
        assert_eq!(
            parse_request("{}"),
            Err(SchedulerError::Validation("missing_op"))
        );
        assert_eq!(
            parse_request(r#"{"op":"mystery"}"#),
            Err(SchedulerError::Validation("unknown_op"))
        );
        assert_eq!(
            parse_request(r#"{"op":"delete_class","id":"nope"}"#),
            Err(SchedulerError::Validation("bad_id"))
        );
    }

    #[test]
    fn status_mapping() {
        assert_eq!(status_of(&SchedulerError::Validation("x")), 400);
        assert_eq!(status_of(&SchedulerError::NotFound(Ulid::new())), 404);
        assert_eq!(status_of(&SchedulerError::Conflict(Ulid::new())), 409);
        assert_eq!(error_token(&SchedulerError::Conflict(Ulid::new())), "clash_detected");
    }
}
