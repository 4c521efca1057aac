//! Fault injection for [`crate::remote::Client`], used to exercise the retry/backoff paths of
//! §7 without a live remote server.
#![cfg(any(test, feature = "mock_remote"))]

/// Describes how a mocked remote call should behave during a test.
///
/// So that a call fails `n` times after `m` initial successes, set `(m, n)` for the suited field.
#[derive(Default, Clone, Debug)]
pub struct MockBehaviour {
    pub is_suspended: bool,

    pub list_tasks_behaviour: (u32, u32),
    pub get_task_behaviour: (u32, u32),
    pub list_projects_behaviour: (u32, u32),
    pub list_sections_behaviour: (u32, u32),
    pub list_labels_behaviour: (u32, u32),
    pub activity_page_behaviour: (u32, u32),
}

impl MockBehaviour {
    pub fn new() -> Self {
        Self::default()
    }

    /// All calls will fail at once, for `n_fails` times.
    pub fn fail_now(n_fails: u32) -> Self {
        Self {
            is_suspended: false,
            list_tasks_behaviour: (0, n_fails),
            get_task_behaviour: (0, n_fails),
            list_projects_behaviour: (0, n_fails),
            list_sections_behaviour: (0, n_fails),
            list_labels_behaviour: (0, n_fails),
            activity_page_behaviour: (0, n_fails),
        }
    }

    pub fn suspend(&mut self) {
        self.is_suspended = true;
    }
    pub fn resume(&mut self) {
        self.is_suspended = false;
    }

    pub fn can_list_tasks(&mut self) -> Result<(), String> {
        if self.is_suspended {
            return Ok(());
        }
        decrement(&mut self.list_tasks_behaviour, "list_tasks")
    }
    pub fn can_get_task(&mut self) -> Result<(), String> {
        if self.is_suspended {
            return Ok(());
        }
        decrement(&mut self.get_task_behaviour, "get_task")
    }
    pub fn can_list_projects(&mut self) -> Result<(), String> {
        if self.is_suspended {
            return Ok(());
        }
        decrement(&mut self.list_projects_behaviour, "list_projects")
    }
    pub fn can_list_sections(&mut self) -> Result<(), String> {
        if self.is_suspended {
            return Ok(());
        }
        decrement(&mut self.list_sections_behaviour, "list_sections")
    }
    pub fn can_list_labels(&mut self) -> Result<(), String> {
        if self.is_suspended {
            return Ok(());
        }
        decrement(&mut self.list_labels_behaviour, "list_labels")
    }
    pub fn can_fetch_activity_page(&mut self) -> Result<(), String> {
        if self.is_suspended {
            return Ok(());
        }
        decrement(&mut self.activity_page_behaviour, "activity_page")
    }
}

/// Returns `Ok(())` for a `(1+, _)` or `(_, 0)` value, else `Err` and decrements the relevant
/// counter.
fn decrement(value: &mut (u32, u32), descr: &str) -> Result<(), String> {
    let remaining_successes = value.0;
    let remaining_failures = value.1;

    if remaining_successes > 0 {
        value.0 -= 1;
        log::debug!("Mock behaviour: allowing a {} ({:?})", descr, value);
        Ok(())
    } else if remaining_failures > 0 {
        value.1 -= 1;
        log::debug!("Mock behaviour: failing a {} ({:?})", descr, value);
        Err(format!(
            "mocked behaviour requires this {} to fail this time ({:?})",
            descr, value
        ))
    } else {
        log::debug!("Mock behaviour: allowing a {} ({:?})", descr, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fails_then_recovers() {
        let mut behaviour = MockBehaviour::fail_now(2);
        assert!(behaviour.can_list_tasks().is_err());
        assert!(behaviour.can_get_task().is_err());
        assert!(behaviour.can_list_tasks().is_ok());
    }

    #[test]
    fn custom_success_then_failure_counts() {
        let mut behaviour = MockBehaviour {
            list_tasks_behaviour: (2, 1),
            ..MockBehaviour::default()
        };
        assert!(behaviour.can_list_tasks().is_ok());
        assert!(behaviour.can_list_tasks().is_ok());
        assert!(behaviour.can_list_tasks().is_err());
        assert!(behaviour.can_list_tasks().is_ok());
    }
}
