//! The current-date provider.
//!
//! "Today" is an explicit [`Clock`] value threaded through the scheduler, not
//! a hidden module-level singleton. Resolution order: explicit override →
//! `LAPSE_CURRENT_DATE` environment variable → hard default.

use chrono::NaiveDate;

/// Environment variable consulted when no override is set (`YYYY-MM-DD`).
pub const CURRENT_DATE_ENV: &str = "LAPSE_CURRENT_DATE";

fn default_today() -> NaiveDate {
  // The fixed simulation baseline; keeps the resolution order total and
  // deterministic. Callers wanting wall-clock behavior set the env var or
  // an override.
  NaiveDate::from_ymd_opt(2025, 4, 30).expect("valid baseline date")
}

/// Source of the process's notion of "today".
///
/// An override, once set, persists on the value until explicitly cleared.
#[derive(Debug, Clone, Default)]
pub struct Clock {
  override_date: Option<NaiveDate>,
}

impl Clock {
  /// A clock with no override: env var, then the hard default.
  pub fn new() -> Self { Self::default() }

  /// A clock pinned to `date` — for testing and simulation.
  pub fn fixed(date: NaiveDate) -> Self { Self { override_date: Some(date) } }

  pub fn set_override(&mut self, date: NaiveDate) {
    self.override_date = Some(date);
  }

  pub fn clear_override(&mut self) { self.override_date = None; }

  /// Resolve the current date: override → environment → default.
  pub fn today(&self) -> NaiveDate {
    if let Some(date) = self.override_date {
      return date;
    }
    if let Ok(raw) = std::env::var(CURRENT_DATE_ENV) {
      if let Ok(date) = NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
        return date;
      }
    }
    default_today()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
  }

  #[test]
  fn override_takes_precedence() {
    let mut clock = Clock::fixed(d(1999, 12, 31));
    assert_eq!(clock.today(), d(1999, 12, 31));

    clock.set_override(d(2030, 1, 1));
    assert_eq!(clock.today(), d(2030, 1, 1));
  }

  #[test]
  fn cleared_override_falls_back() {
    // Env access is racy across parallel tests, so only assert the result
    // parses as some valid date after clearing.
    let mut clock = Clock::fixed(d(2020, 2, 2));
    clock.clear_override();
    assert_ne!(clock.today(), d(2020, 2, 2));
  }
}
