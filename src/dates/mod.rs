//! Publish-time parsing and date filtering
//!
//! Upstream timestamps are display strings, not machine-sortable values.
//! Supported forms:
//! - `今天 HH:MM`, `昨天 HH:MM`, `前天 HH:MM`
//! - `N分钟前`, `N小时前`, `N天前`, `N周前`, `N月前` (a month is 30 days)
//! - `YYYY-MM-DD`, `YYYY-MM-DD HH:MM`, `YYYY-MM-DD HH:MM:SS`
//! - `YY-MM-DD HH:MM`
//! - `MM-DD HH:MM`, in the reference year unless that month is still ahead

use crate::model::Post;
use crate::{HarvestError, Result};
use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};

/// Current local wall-clock time, the usual reference for relative timestamps
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Parses a display timestamp relative to `reference`
///
/// Returns `None` for anything unrecognised; callers treat that as
/// "unknown", never as "old".
pub fn parse_publish_time(text: &str, reference: NaiveDateTime) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(amount) = text.strip_suffix('前') {
        return parse_relative(amount.trim(), reference);
    }

    for (prefix, days_back) in [("今天", 0), ("昨天", 1), ("前天", 2)] {
        if let Some(clock) = text.strip_prefix(prefix) {
            let time = parse_clock(clock.trim())?;
            let date = reference.date() - Duration::days(days_back);
            return Some(date.and_time(time));
        }
    }

    parse_absolute(text, reference)
}

/// Whether a post was published within `[start, end]`
///
/// A missing `end` leaves the range open. Unparseable times are never within range.
pub fn published_between(
    post: &Post,
    start: NaiveDateTime,
    end: Option<NaiveDateTime>,
    reference: NaiveDateTime,
) -> bool {
    parse_publish_time(&post.publish_time, reference)
        .is_some_and(|time| start <= time && end.map_or(true, |end| time <= end))
}

/// Keeps posts whose publish time falls within `[start, end]`
///
/// `end` defaults to now. Posts with an unparseable time are dropped.
pub fn filter_posts_by_date(
    posts: Vec<Post>,
    start: NaiveDateTime,
    end: Option<NaiveDateTime>,
) -> Vec<Post> {
    let reference = local_now();
    let end = end.unwrap_or(reference);
    let before = posts.len();

    let kept: Vec<Post> = posts
        .into_iter()
        .filter(|post| published_between(post, start, Some(end), reference))
        .collect();

    tracing::info!(
        "Date filter {} .. {} kept {} of {} posts",
        start,
        end,
        kept.len(),
        before
    );
    kept
}

/// Parses a `YYYY-MM-DD` command-line date as the start of that day
pub fn parse_date_arg(value: &str) -> Result<NaiveDateTime> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map(|date| date.and_time(NaiveTime::MIN))
        .map_err(|_| HarvestError::InvalidDate {
            value: value.to_string(),
        })
}

fn parse_relative(amount: &str, reference: NaiveDateTime) -> Option<NaiveDateTime> {
    let digits_end = amount.find(|c: char| !c.is_ascii_digit())?;
    let count: i64 = amount[..digits_end].parse().ok()?;

    let offset = match amount[digits_end..].trim() {
        "秒" => Duration::try_seconds(count)?,
        "分钟" => Duration::try_minutes(count)?,
        "小时" => Duration::try_hours(count)?,
        "天" => Duration::try_days(count)?,
        "周" => Duration::try_weeks(count)?,
        "月" | "个月" => Duration::try_days(count.checked_mul(30)?)?,
        _ => return None,
    };

    reference.checked_sub_signed(offset)
}

fn parse_clock(text: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(text, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"))
        .ok()
}

fn parse_absolute(text: &str, reference: NaiveDateTime) -> Option<NaiveDateTime> {
    let mut parts = text.split_whitespace();
    let date_part = parts.next()?;
    let time = match parts.next() {
        Some(clock) => parse_clock(clock)?,
        None => NaiveTime::MIN,
    };
    if parts.next().is_some() {
        return None;
    }

    let fields: Vec<&str> = date_part.split('-').collect();
    let date = match fields.as_slice() {
        [year, month, day] => {
            let year: i32 = match year.len() {
                4 => year.parse().ok()?,
                2 => 2000 + year.parse::<i32>().ok()?,
                _ => return None,
            };
            NaiveDate::from_ymd_opt(year, month.parse().ok()?, day.parse().ok()?)?
        }
        [month, day] => {
            let month: u32 = month.parse().ok()?;
            let year = if month > reference.month() {
                reference.year() - 1
            } else {
                reference.year()
            };
            NaiveDate::from_ymd_opt(year, month, day.parse().ok()?)?
        }
        _ => return None,
    };

    Some(date.and_time(time))
}
