use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Datelike,
  Duration,
  NaiveDate,
  Utc,
  Weekday
};
use chrono_tz::Tz;

pub const TIMEZONE_ENV_VAR: &str =
  "TASKLANE_TIMEZONE";

/// Environment wins over the configured
/// value; anything unparseable falls
/// back to UTC.
pub fn resolve_timezone(
  configured: Option<&str>
) -> Tz {
  if let Ok(raw) =
    std::env::var(TIMEZONE_ENV_VAR)
    && let Some(tz) =
      parse_timezone(&raw, TIMEZONE_ENV_VAR)
  {
    return tz;
  }

  if let Some(raw) = configured
    && let Some(tz) =
      parse_timezone(raw, "rc.timezone")
  {
    return tz;
  }

  chrono_tz::UTC
}

fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::warn!(
      source,
      "timezone source was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::debug!(
        source,
        timezone = %trimmed,
        "configured timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::error!(
        source,
        timezone = %trimmed,
        error = %err,
        "failed to parse timezone id"
      );
      None
    }
  }
}

#[must_use]
pub fn local_date(
  now: DateTime<Utc>,
  tz: &Tz
) -> NaiveDate {
  now.with_timezone(tz).date_naive()
}

/// Monday of the week containing
/// `anchor`.
#[must_use]
pub fn week_start(
  anchor: NaiveDate
) -> NaiveDate {
  anchor
    - Duration::days(i64::from(
      anchor
        .weekday()
        .num_days_from_monday()
    ))
}

/// Monday through Sunday of the week
/// containing `anchor`.
#[must_use]
pub fn week_days(
  anchor: NaiveDate
) -> [NaiveDate; 7] {
  let monday = week_start(anchor);
  std::array::from_fn(|offset| {
    monday + Duration::days(offset as i64)
  })
}

#[must_use]
pub fn is_weekend(date: NaiveDate) -> bool {
  matches!(
    date.weekday(),
    Weekday::Sat | Weekday::Sun
  )
}

/// `Mon 12`
#[must_use]
pub fn format_day_title(
  date: NaiveDate
) -> String {
  date.format("%a %-d").to_string()
}

/// `Oct 12 - Oct 18`, with the year
/// appended when the range leaves the
/// year of `today`.
#[must_use]
pub fn format_week_label(
  days: &[NaiveDate; 7],
  today: NaiveDate
) -> String {
  let first = days[0];
  let last = days[6];
  let label = format!(
    "{} - {}",
    first.format("%b %-d"),
    last.format("%b %-d")
  );
  if first.year() != today.year()
    || last.year() != today.year()
  {
    format!("{label}, {}", last.year())
  } else {
    label
  }
}

/// Parses a calendar date relative to
/// `today`: `today`, `tomorrow`,
/// `yesterday`, weekday names (next
/// occurrence), `+Nd`/`-Nd`/`+Nw`, or
/// `YYYY-MM-DD`.
#[tracing::instrument(skip(today), fields(input = input))]
pub fn parse_date_arg(
  input: &str,
  today: NaiveDate
) -> anyhow::Result<NaiveDate> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  match lower.as_str() {
    | "today" => return Ok(today),
    | "tomorrow" => {
      return Ok(today + Duration::days(1));
    }
    | "yesterday" => {
      return Ok(today - Duration::days(1));
    }
    | _ => {}
  }

  if let Some(weekday) =
    parse_weekday_name(&lower)
  {
    return Ok(next_weekday_date(
      today, weekday
    ));
  }

  if let Some(days) =
    parse_relative_days(&lower)?
  {
    return today
      .checked_add_signed(Duration::days(
        days
      ))
      .ok_or_else(|| {
        anyhow!(
          "date offset out of range: \
           {token}"
        )
      });
  }

  NaiveDate::parse_from_str(
    token, "%Y-%m-%d"
  )
  .with_context(|| {
    format!(
      "unrecognized date '{token}'; \
       expected today, tomorrow, \
       yesterday, a weekday name, \
       +Nd, +Nw or YYYY-MM-DD"
    )
  })
}

/// Like [`parse_date_arg`], with `none`
/// or `unscheduled` clearing the date.
pub fn parse_optional_date(
  input: &str,
  today: NaiveDate
) -> anyhow::Result<Option<NaiveDate>> {
  match input
    .trim()
    .to_ascii_lowercase()
    .as_str()
  {
    | "none" | "unscheduled" | "" => {
      Ok(None)
    }
    | _ => {
      parse_date_arg(input, today).map(Some)
    }
  }
}

fn parse_relative_days(
  lower: &str
) -> anyhow::Result<Option<i64>> {
  let (sign, rest) =
    match lower.as_bytes().first() {
      | Some(b'+') => (1, &lower[1..]),
      | Some(b'-') => (-1, &lower[1..]),
      | _ => return Ok(None)
    };
  let (digits, scale) =
    if let Some(n) = rest.strip_suffix('d')
    {
      (n, 1)
    } else if let Some(n) =
      rest.strip_suffix('w')
    {
      (n, 7)
    } else {
      return Ok(None);
    };
  let amount: i64 =
    digits.parse().with_context(|| {
      format!(
        "invalid relative date \
         '{lower}'"
      )
    })?;
  Ok(Some(sign * amount * scale))
}

fn parse_weekday_name(
  token: &str
) -> Option<Weekday> {
  match token {
    | "monday" | "mon" => {
      Some(Weekday::Mon)
    }
    | "tuesday" | "tue" | "tues" => {
      Some(Weekday::Tue)
    }
    | "wednesday" | "wed" => {
      Some(Weekday::Wed)
    }
    | "thursday" | "thu" | "thur"
    | "thurs" => Some(Weekday::Thu),
    | "friday" | "fri" => {
      Some(Weekday::Fri)
    }
    | "saturday" | "sat" => {
      Some(Weekday::Sat)
    }
    | "sunday" | "sun" => {
      Some(Weekday::Sun)
    }
    | _ => None
  }
}

fn next_weekday_date(
  from: NaiveDate,
  target: Weekday
) -> NaiveDate {
  let from_idx = i64::from(
    from.weekday().num_days_from_monday()
  );
  let target_idx = i64::from(
    target.num_days_from_monday()
  );
  let mut delta =
    (7 + target_idx - from_idx) % 7;
  if delta == 0 {
    delta = 7;
  }
  from
    .checked_add_signed(Duration::days(
      delta
    ))
    .unwrap_or(from)
}
