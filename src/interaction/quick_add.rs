//! Local, keyword-driven parsing of a single quick-add line.
//!
//! No LLM is involved: a date phrase is pulled out of the text and the lane is
//! picked from keywords, so this is fast and deterministic.

use std::sync::OnceLock;

use axum::{Json, extract::rejection::JsonRejection};
use chrono::{Datelike, Days, Local, NaiveDate, Weekday};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::{base::types::Lane, service::http::ApiError};

const RED_KEYWORDS: &[&str] = &["urgent", "asap", "deadline", "important", "due", "immediately"];
const GREEN_KEYWORDS: &[&str] = &["relax", "gym", "read", "walk", "meditate", "break", "lunch"];
const GRAY_KEYWORDS: &[&str] = &["later", "maybe"];

/// Body of `POST /api/parse-task`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuickAddRequest {
    /// One line of free text, e.g. `Call mom tomorrow`.
    pub input: String,
}

/// A task parsed from a quick-add line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickTask {
    /// The input with the date phrase removed.
    pub title: String,
    /// Lane picked from keywords.
    pub lane: Lane,
    /// Resolved date phrase, or today for urgent work.
    pub due_date: Option<NaiveDate>,
}

/// `POST /api/parse-task`.
#[instrument(skip_all)]
pub async fn parse_task(payload: Result<Json<QuickAddRequest>, JsonRejection>) -> Result<Json<QuickTask>, ApiError> {
    let Json(request) = payload?;

    let task = parse_input_to_task(&request.input, Local::now().date_naive());
    debug!("Parsed quick-add line into {task:?}");

    Ok(Json(task))
}

/// Parse a quick-add line relative to `today`.
pub fn parse_input_to_task(input: &str, today: NaiveDate) -> QuickTask {
    let found = find_date(input, today);

    let title = match &found {
        Some(found) => collapse_whitespace(&format!("{} {}", &input[..found.start], &input[found.end..])),
        None => collapse_whitespace(input),
    };

    let lane = classify_lane(input);

    // Urgent work with no date is due today.
    let due_date = found.map(|found| found.date).or_else(|| (lane == Lane::Red).then_some(today));

    QuickTask { title, lane, due_date }
}

/// Pick a lane from keywords in the text.
pub fn classify_lane(input: &str) -> Lane {
    let lower = input.to_lowercase();
    let contains_any = |keywords: &[&str]| keywords.iter().any(|keyword| lower.contains(keyword));

    if contains_any(RED_KEYWORDS) {
        Lane::Red
    } else if contains_any(GREEN_KEYWORDS) {
        Lane::Green
    } else if contains_any(GRAY_KEYWORDS) {
        Lane::Gray
    } else {
        Lane::Yellow
    }
}

// Date extraction.

/// A resolved date phrase and its byte span in the input.
struct DateMatch {
    start: usize,
    end: usize,
    date: NaiveDate,
}

static DATE_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();

fn get_date_pattern() -> Option<&'static Regex> {
    let pattern = DATE_PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:(?P<iso>\d{4}-\d{2}-\d{2})|in\s+(?P<days>\d{1,3})\s+days?|(?P<next_week>next\s+week)|(?:on\s+)?(?P<weekday>monday|tuesday|wednesday|thursday|friday|saturday|sunday)|(?P<tomorrow>tomorrow)|(?P<today>today|tonight))\b",
        )
        .inspect_err(|err| warn!("Date pattern failed to compile: {err}"))
        .ok()
    });

    pattern.as_ref()
}

/// Find the first date phrase that resolves to a real date.
fn find_date(input: &str, today: NaiveDate) -> Option<DateMatch> {
    get_date_pattern()?.captures_iter(input).find_map(|captures| {
        let whole = captures.get(0)?;
        let date = resolve_date(&captures, today)?;

        Some(DateMatch { start: whole.start(), end: whole.end(), date })
    })
}

fn resolve_date(captures: &Captures, today: NaiveDate) -> Option<NaiveDate> {
    if let Some(iso) = captures.name("iso") {
        return NaiveDate::parse_from_str(iso.as_str(), "%Y-%m-%d").ok();
    }

    if let Some(days) = captures.name("days") {
        return today.checked_add_days(Days::new(days.as_str().parse().ok()?));
    }

    if captures.name("next_week").is_some() {
        return today.checked_add_days(Days::new(7));
    }

    if let Some(weekday) = captures.name("weekday") {
        let target: Weekday = weekday.as_str().to_lowercase().parse().ok()?;
        return today.checked_add_days(Days::new(days_until(today.weekday(), target)));
    }

    if captures.name("tomorrow").is_some() {
        return today.succ_opt();
    }

    captures.name("today").map(|_| today)
}

/// Days until the next `target`, counting a same-day match as a week away.
fn days_until(from: Weekday, target: Weekday) -> u64 {
    let ahead = (7 + target.num_days_from_monday() - from.num_days_from_monday()) % 7;

    if ahead == 0 { 7 } else { u64::from(ahead) }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// Tests.
