//! Lateness report
//!
//! Turns completed tasks into how many days after their due date they
//! were finished.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use super::tasks::UpstreamTask;

const SECONDS_PER_DAY: i64 = 86_400;

/// One row of the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LateTask {
    pub id: u64,
    pub title: String,
    pub due_date: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    /// Whole days between due and completion; negative if finished early
    pub days: i64,
}

/// Build the report, skipping tasks without a usable due date or
/// completion time
pub fn lateness_report(tasks: &[UpstreamTask]) -> Vec<LateTask> {
    tasks
        .iter()
        .filter_map(|task| {
            let raw_due = task.due_date.as_deref().filter(|d| !d.is_empty())?;
            let completed_at = task.completed_at?;

            let Some(due_date) = parse_due_date(raw_due) else {
                tracing::warn!(task_id = task.id, due_date = raw_due, "Unparseable due date");
                return None;
            };

            Some(LateTask {
                id: task.id,
                title: task.title.clone(),
                due_date,
                completed_at,
                days: days_late(due_date, completed_at),
            })
        })
        .collect()
}

/// Accepts "YYYY-MM-DD" (midnight UTC) or RFC 3339
pub fn parse_due_date(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }

    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Truncates toward zero
pub fn days_late(due_date: DateTime<Utc>, completed_at: DateTime<Utc>) -> i64 {
    (completed_at - due_date).num_seconds() / SECONDS_PER_DAY
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn task(id: u64, due_date: Option<&str>, completed_at: Option<DateTime<Utc>>) -> UpstreamTask {
        UpstreamTask {
            id,
            title: format!("task {id}"),
            due_date: due_date.map(ToString::to_string),
            completed: completed_at.is_some(),
            completed_at,
        }
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn late_task_counts_whole_days() {
        let report = lateness_report(&[task(1, Some("2015-05-10"), Some(at(2015, 5, 12, 23)))]);
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].days, 2);
        assert_eq!(report[0].due_date, at(2015, 5, 10, 0));
    }

    #[test]
    fn early_task_is_negative_and_truncated_toward_zero() {
        // 1 day 23 hours early
        assert_eq!(days_late(at(2015, 5, 10, 0), at(2015, 5, 8, 1)), -1);
        assert_eq!(days_late(at(2015, 5, 10, 0), at(2015, 5, 10, 12)), 0);
    }

    #[test]
    fn tasks_without_due_date_or_completion_are_skipped() {
        let report = lateness_report(&[
            task(1, None, Some(at(2015, 5, 12, 0))),
            task(2, Some(""), Some(at(2015, 5, 12, 0))),
            task(3, Some("2015-05-10"), None),
            task(4, Some("next tuesday"), Some(at(2015, 5, 12, 0))),
            task(5, Some("2015-05-10T00:00:00Z"), Some(at(2015, 5, 11, 0))),
        ]);

        assert_eq!(report.len(), 1);
        assert_eq!(report[0].id, 5);
        assert_eq!(report[0].days, 1);
    }

    #[test]
    fn report_serializes_expected_fields() {
        let report = lateness_report(&[task(7, Some("2015-05-10"), Some(at(2015, 5, 11, 0)))]);
        let value = serde_json::to_value(&report[0]).unwrap();

        assert_eq!(value["id"], 7);
        assert_eq!(value["days"], 1);
        assert_eq!(value["due_date"], "2015-05-10T00:00:00Z");
        assert!(value.get("completed_at").is_some());
    }
}
