use chrono::{DateTime, Duration, NaiveDate, Utc};
use shared_models::booking::{DaySchedule, TimeSlot};

/// Candidate slots start on a fixed 30-minute grid regardless of service
/// duration, so a 45-minute service yields 09:00, 09:30, 10:00 candidates.
pub const GRANULARITY_MINUTES: i64 = 30;

/// Generates bookable slots for one provider-day.
///
/// A candidate `[cursor, cursor + duration)` is emitted iff it ends no later
/// than closing time, overlaps no busy interval, and starts strictly after
/// `now`. A closed day yields nothing.
pub fn generate(
    day: &DaySchedule,
    date: NaiveDate,
    duration_minutes: i64,
    busy: &[TimeSlot],
    now: DateTime<Utc>,
) -> Vec<TimeSlot> {
    if !day.is_open || duration_minutes <= 0 {
        return Vec::new();
    }

    let duration = Duration::minutes(duration_minutes);
    let step = Duration::minutes(GRANULARITY_MINUTES);
    let close = date.and_time(day.end).and_utc();

    let mut slots = Vec::new();
    let mut cursor = date.and_time(day.start).and_utc();

    while cursor + duration <= close {
        let candidate = TimeSlot::new(cursor, cursor + duration);
        if cursor > now && !busy.iter().any(|b| candidate.overlaps(b)) {
            slots.push(candidate);
        }
        cursor += step;
    }

    slots
}
