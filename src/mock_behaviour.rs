//! This module provides ways to tweak mocked providers, so that they can return errors on some tests

use crate::error::ProviderError;

/// This stores some behaviour tweaks, that describe how a mocked instance will behave during a given test
///
/// So that a functions fails _n_ times after _m_ initial successes, set `(m, n)` for the suited parameter
#[derive(Default, Clone, Debug)]
pub struct MockBehaviour {
    /// If this is true, every action will be allowed
    pub is_suspended: bool,

    // From the CalendarProvider trait
    pub list_calendars_behaviour: (u32, u32),
    pub list_all_events_behaviour: (u32, u32),
    pub list_events_since_behaviour: (u32, u32),

    // From the TaskProvider trait
    pub list_tasks_behaviour: (u32, u32),
}

impl MockBehaviour {
    pub fn new() -> Self {
        Self::default()
    }

    /// All requests will fail at once, for `n_fails` times
    pub fn fail_now(n_fails: u32) -> Self {
        Self {
            is_suspended: false,
            list_calendars_behaviour: (0, n_fails),
            list_all_events_behaviour: (0, n_fails),
            list_events_since_behaviour: (0, n_fails),
            list_tasks_behaviour: (0, n_fails),
        }
    }

    /// Suspend this mock behaviour until you call `resume`
    pub fn suspend(&mut self) {
        self.is_suspended = true;
    }
    /// Make this behaviour active again
    pub fn resume(&mut self) {
        self.is_suspended = false;
    }

    pub fn can_list_calendars(&mut self) -> Result<(), ProviderError> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.list_calendars_behaviour, "list_calendars")
    }
    pub fn can_list_all_events(&mut self) -> Result<(), ProviderError> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.list_all_events_behaviour, "list_all_events")
    }
    pub fn can_list_events_since(&mut self) -> Result<(), ProviderError> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.list_events_since_behaviour, "list_events_since")
    }
    pub fn can_list_tasks(&mut self) -> Result<(), ProviderError> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.list_tasks_behaviour, "list_tasks")
    }
}


/// Return Ok(()) in case the value is `(1+, _)` or `(_, 0)`, or return Err and decrement otherwise
fn decrement(value: &mut (u32, u32), descr: &str) -> Result<(), ProviderError> {
    let remaining_successes = value.0;
    let remaining_failures = value.1;

    if remaining_successes > 0 {
        value.0 = value.0 - 1;
        log::debug!("Mock behaviour: allowing a {} ({:?})", descr, value);
        Ok(())
    } else {
        if remaining_failures > 0 {
            value.1 = value.1 - 1;
            log::debug!("Mock behaviour: failing a {} ({:?})", descr, value);
            Err(ProviderError::Request(format!("Mocked behaviour requires this {} to fail this time. ({:?})", descr, value)))
        } else {
            log::debug!("Mock behaviour: allowing a {} ({:?})", descr, value);
            Ok(())
        }
    }
}
