use std::sync::Arc;

use chrono::NaiveTime;
use shared_database::BookingStore;
use shared_models::booking::{DaySchedule, WeekSchedule};
use uuid::Uuid;

use crate::models::BookingError;

/// Resolves a provider's weekly working hours, falling back to the default
/// schedule when the provider never configured one.
pub struct WorkingHoursResolver {
    store: Arc<dyn BookingStore>,
}

impl WorkingHoursResolver {
    pub fn new(store: Arc<dyn BookingStore>) -> Self {
        Self { store }
    }

    /// Monday through Friday 09:00-17:00, weekend closed.
    pub fn default_week() -> WeekSchedule {
        let open = DaySchedule::open(
            NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN),
        );
        WeekSchedule {
            monday: open.clone(),
            tuesday: open.clone(),
            wednesday: open.clone(),
            thursday: open.clone(),
            friday: open,
            saturday: DaySchedule::closed(),
            sunday: DaySchedule::closed(),
        }
    }

    pub async fn resolve(&self, provider_id: Uuid) -> Result<WeekSchedule, BookingError> {
        match self.store.find_week_schedule(provider_id).await? {
            Some(schedule) => Ok(schedule),
            None => {
                tracing::debug!(%provider_id, "no working hours configured, using defaults");
                Ok(Self::default_week())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    #[test]
    fn default_week_is_weekdays_nine_to_five() {
        let week = WorkingHoursResolver::default_week();

        for weekday in [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
        ] {
            let day = week.day(weekday);
            assert!(day.is_open);
            assert_eq!(day.start, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
            assert_eq!(day.end, NaiveTime::from_hms_opt(17, 0, 0).unwrap());
        }
        assert!(!week.day(Weekday::Sat).is_open);
        assert!(!week.day(Weekday::Sun).is_open);
    }
}
