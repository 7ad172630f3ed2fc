use chrono::{DateTime, Days, Local, NaiveDate, NaiveTime, TimeZone};

/// Local midnight at the start of `date`. On days where midnight does not exist
/// locally (DST gap) the first representable instant after it is used.
pub fn local_midnight(date: NaiveDate) -> DateTime<Local> {
    let naive = date.and_time(NaiveTime::MIN);
    Local
        .from_local_datetime(&naive)
        .earliest()
        .or_else(|| Local.from_local_datetime(&(naive + chrono::Duration::hours(1))).earliest())
        .unwrap_or_else(|| Local.from_utc_datetime(&naive))
}

/// Storage key of a calendar day: its local midnight in epoch millis.
pub fn day_start_millis(date: NaiveDate) -> i64 {
    local_midnight(date).timestamp_millis()
}

/// `[start, end)` of a calendar day in epoch millis.
pub fn day_window(date: NaiveDate) -> (i64, i64) {
    let start = day_start_millis(date);
    let end = date
        .checked_add_days(Days::new(1))
        .map(day_start_millis)
        .unwrap_or(start + 86_400_000);
    (start, end)
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn date_of_millis(millis: i64) -> NaiveDate {
    Local
        .timestamp_millis_opt(millis)
        .earliest()
        .map(|dt| dt.date_naive())
        .unwrap_or_else(today)
}

/// The `days` calendar days ending at `last`, oldest first.
pub fn trailing_days(last: NaiveDate, days: u32) -> Vec<NaiveDate> {
    (0..days)
        .rev()
        .filter_map(|offset| last.checked_sub_days(Days::new(offset as u64)))
        .collect()
}
