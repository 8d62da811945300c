//! World clock counting hours, days and months.

use sim_core::{ClockEvent, SimConfig};

/// Hour-driven calendar. Every tick is one hour.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Clock {
    hours_per_day: u32,
    days_per_month: u32,
    hours: u64,
    hour_of_day: u32,
    day_of_month: u32,
    months: u32,
}

impl Clock {
    pub fn new(hours_per_day: u32, days_per_month: u32) -> Self {
        Self {
            hours_per_day: hours_per_day.max(1),
            days_per_month: days_per_month.max(1),
            hours: 0,
            hour_of_day: 0,
            day_of_month: 0,
            months: 0,
        }
    }

    pub fn from_config(config: &SimConfig) -> Self {
        Self::new(config.hours_per_day, config.days_per_month)
    }

    /// Advance one hour. Returns the events to deliver, in order: always
    /// `Hour`, then `Day` when the hour wraps, then `Month` when the day wraps.
    pub fn tick(&mut self) -> Vec<ClockEvent> {
        let mut events = vec![ClockEvent::Hour];
        self.hours += 1;
        self.hour_of_day += 1;
        if self.hour_of_day == self.hours_per_day {
            self.hour_of_day = 0;
            self.day_of_month += 1;
            events.push(ClockEvent::Day);
            if self.day_of_month == self.days_per_month {
                self.day_of_month = 0;
                self.months += 1;
                events.push(ClockEvent::Month);
            }
        }
        events
    }

    /// Hours elapsed since start.
    pub fn hours(&self) -> u64 {
        self.hours
    }

    pub fn months(&self) -> u32 {
        self.months
    }

    pub fn hours_per_month(&self) -> u64 {
        u64::from(self.hours_per_day) * u64::from(self.days_per_month)
    }
}
