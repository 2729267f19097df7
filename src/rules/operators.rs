use super::{FieldValue, Operator};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use std::cmp::Ordering;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"];
const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M"];

/// Truth of a condition whose target value is missing from the data.
///
/// Negative operators hold on missing data; everything else, unknown operators
/// included, does not.
pub fn missing_value_policy(operator: &Operator) -> bool {
    matches!(
        operator,
        Operator::IsEmpty
            | Operator::NotEquals
            | Operator::NotContains
            | Operator::NotIn
            | Operator::Unchecked
    )
}

/// Applies `operator` to an actual value and the condition's expected value.
pub fn apply(operator: &Operator, actual: &FieldValue, expected: &FieldValue) -> bool {
    match operator {
        Operator::Equals => equals(actual, expected),
        Operator::NotEquals => !equals(actual, expected),
        Operator::Contains => contains(actual, expected),
        Operator::NotContains => !contains(actual, expected),
        Operator::GreaterThan | Operator::After => {
            compare(actual, expected).is_some_and(|o| o == Ordering::Greater)
        }
        Operator::LessThan | Operator::Before => {
            compare(actual, expected).is_some_and(|o| o == Ordering::Less)
        }
        Operator::GreaterThanOrEqual | Operator::AfterOrEqual => {
            compare(actual, expected).is_some_and(|o| o != Ordering::Less)
        }
        Operator::LessThanOrEqual | Operator::BeforeOrEqual => {
            compare(actual, expected).is_some_and(|o| o != Ordering::Greater)
        }
        Operator::IsEmpty => actual.is_empty(),
        Operator::IsNotEmpty => !actual.is_empty(),
        Operator::In => is_in(actual, expected),
        Operator::NotIn => !is_in(actual, expected),
        Operator::Checked => actual.is_checked(),
        Operator::Unchecked => !actual.is_checked(),
        Operator::Unknown(_) => false,
    }
}

/// Numeric equality when both sides parse as numbers, string equality otherwise.
fn loosely_equal(a: &FieldValue, b: &FieldValue) -> bool {
    match (a.as_number(), b.as_number()) {
        (Some(x), Some(y)) => x == y,
        _ => a.as_text() == b.as_text(),
    }
}

fn equals(actual: &FieldValue, expected: &FieldValue) -> bool {
    match actual {
        FieldValue::List(items) => items.iter().any(|item| loosely_equal(item, expected)),
        _ => loosely_equal(actual, expected),
    }
}

fn contains(actual: &FieldValue, expected: &FieldValue) -> bool {
    actual.as_text().contains(expected.as_text().as_ref())
}

fn is_in(actual: &FieldValue, expected: &FieldValue) -> bool {
    let allowed: Vec<String> = match expected {
        FieldValue::Text(s) => s.split(',').map(|part| part.trim().to_string()).collect(),
        FieldValue::List(items) => items.iter().map(|v| v.as_text().into_owned()).collect(),
        other => vec![other.as_text().into_owned()],
    };
    let member = |value: &FieldValue| allowed.iter().any(|a| *a == value.as_text());
    match actual {
        FieldValue::List(items) => items.iter().any(member),
        _ => member(actual),
    }
}

/// Orders two values numerically if both parse as numbers, chronologically if both
/// parse as dates or times, and not at all otherwise.
fn compare(actual: &FieldValue, expected: &FieldValue) -> Option<Ordering> {
    if let (Some(a), Some(b)) = (actual.as_number(), expected.as_number()) {
        return a.partial_cmp(&b);
    }
    let a = parse_datetime(&actual.as_text())?;
    let b = parse_datetime(&expected.as_text())?;
    Some(a.cmp(&b))
}

/// Generic date/time parsing over the formats form builders emit.
///
/// Bare times are anchored on 1970-01-01 so two times compare by clock.
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    if let Some(dt) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    {
        return Some(dt);
    }
    if let Some(date) = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
    {
        return date.and_hms_opt(0, 0, 0);
    }
    let time = TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(raw, fmt).ok())?;
    NaiveDate::from_ymd_opt(1970, 1, 1).map(|epoch| epoch.and_time(time))
}
