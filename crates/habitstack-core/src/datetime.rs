use chrono::{
  DateTime,
  Local,
  NaiveDate,
  Utc
};

/// Calendar day of `ts` in the host's local timezone. "Today" everywhere
/// in the app means this day for the current instant.
pub fn to_local_date(
  ts: DateTime<Utc>
) -> NaiveDate {
  ts.with_timezone(&Local).date_naive()
}

/// Key of the per-day reflection record, `YYYY-MM-DD`.
pub fn day_key(
  ts: DateTime<Utc>
) -> String {
  to_local_date(ts)
    .format("%Y-%m-%d")
    .to_string()
}

pub fn format_local(
  ts: DateTime<Utc>
) -> String {
  ts.with_timezone(&Local)
    .format("%Y-%m-%d %H:%M")
    .to_string()
}

/// `MM:SS`; minutes keep growing past 99.
pub fn format_clock(
  seconds: u32
) -> String {
  format!(
    "{:02}:{:02}",
    seconds / 60,
    seconds % 60
  )
}

#[cfg(test)]
mod tests {
  use chrono::{
    TimeZone,
    Utc
  };

  use super::{
    day_key,
    format_clock,
    to_local_date
  };

  #[test]
  fn formats_clock() {
    assert_eq!(
      format_clock(1500),
      "25:00"
    );
    assert_eq!(
      format_clock(61),
      "01:01"
    );
    assert_eq!(
      format_clock(0),
      "00:00"
    );
  }

  #[test]
  fn day_key_matches_local_date() {
    let ts = Utc
      .with_ymd_and_hms(
        2026, 2, 17, 12, 0, 0
      )
      .single()
      .expect("valid ts");
    assert_eq!(
      day_key(ts),
      to_local_date(ts)
        .format("%Y-%m-%d")
        .to_string()
    );
  }
}
