//! Completion history: per-day grouping, totals and the streak.
//!
//! Days are local calendar days, not UTC days and not rolling 24-hour
//! windows. [`summarize`] uses the system timezone; [`summarize_in`] takes
//! any timezone.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Local, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};

use crate::task::Task;

/// Totals and day groups over the completed tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistorySummary {
    pub total_count: usize,
    /// Sum of estimates, not measured time.
    pub total_minutes: u64,
    /// Consecutive days ending today or yesterday.
    pub streak: u32,
    /// Most recent day first.
    pub days: Vec<DayGroup>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayGroup {
    pub date: NaiveDate,
    pub label: String,
    /// Latest completion first.
    pub tasks: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub task: Task,
    /// Local time of completion, e.g. `9:05 AM`.
    pub time: String,
}

/// Summarize in the system timezone.
pub fn summarize(tasks: &[Task], today: NaiveDate) -> HistorySummary {
    summarize_in(tasks, &Local, today)
}

/// Summarize with days bucketed in `tz`.
///
/// Tasks without a completion timestamp count toward the totals but belong
/// to no day.
pub fn summarize_in<Tz: TimeZone>(tasks: &[Task], tz: &Tz, today: NaiveDate) -> HistorySummary
where
    Tz::Offset: std::fmt::Display,
{
    let mut by_day: BTreeMap<NaiveDate, Vec<(DateTime<Tz>, &Task)>> = BTreeMap::new();
    for task in tasks {
        if let Some(at) = task.completed_at {
            let local = at.with_timezone(tz);
            by_day.entry(local.date_naive()).or_default().push((local, task));
        }
    }

    let dates: BTreeSet<NaiveDate> = by_day.keys().copied().collect();
    let streak = streak_from_dates(&dates, today);

    let days = by_day
        .into_iter()
        .rev()
        .map(|(date, mut entries)| {
            entries.sort_by(|a, b| b.0.cmp(&a.0));
            DayGroup {
                date,
                label: day_label(date, today),
                tasks: entries
                    .into_iter()
                    .map(|(local, task)| HistoryEntry {
                        task: task.clone(),
                        time: local.format("%-I:%M %p").to_string(),
                    })
                    .collect(),
            }
        })
        .collect();

    HistorySummary {
        total_count: tasks.len(),
        total_minutes: tasks.iter().map(|t| u64::from(t.estimated_minutes)).sum(),
        streak,
        days,
    }
}

/// Count consecutive days ending at the latest date.
///
/// Zero when `dates` is empty or the latest date is neither `today` nor the
/// day before; a lapsed streak is not carried forward.
pub fn streak_from_dates(dates: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let mut newest_first = dates.iter().rev().copied();
    let Some(latest) = newest_first.next() else {
        return 0;
    };
    if latest != today && Some(latest) != today.pred_opt() {
        return 0;
    }

    let mut streak = 1;
    let mut cursor = latest;
    for date in newest_first {
        if Some(date) != cursor.pred_opt() {
            break;
        }
        streak += 1;
        cursor = date;
    }
    streak
}

/// `Today`, `Yesterday`, or e.g. `Monday, Jan 5`.
pub fn day_label(date: NaiveDate, today: NaiveDate) -> String {
    if date == today {
        "Today".to_string()
    } else if Some(date) == today.pred_opt() {
        "Yesterday".to_string()
    } else {
        date.format("%A, %b %-d").to_string()
    }
}
