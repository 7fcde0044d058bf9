//! Decides when a requester gives up after failed requests.

/// Counts failed requests against a configured maximum.
///
/// With a negative maximum, a requester never aborts. Otherwise it aborts as soon as the number
/// of failures exceeds the maximum. Aborting is final.
#[derive(Clone, Debug)]
pub struct FailureBudget {
    max_failed_requests: i64,
    errors: u64,
    successes: u64,
    exhausted: bool,
}

impl FailureBudget {
    /// Creates a budget tolerating `max_failed_requests` failures, or any number if negative.
    pub fn new(max_failed_requests: i64) -> Self {
        Self {
            max_failed_requests,
            errors: 0,
            successes: 0,
            exhausted: false,
        }
    }

    /// Records a failed request and returns `true` if the requester must abort.
    pub fn on_failure(&mut self) -> bool {
        self.errors += 1;
        if self.max_failed_requests >= 0 && self.errors > self.max_failed_requests as u64 {
            self.exhausted = true;
        }
        self.exhausted
    }

    /// Records a successful request.
    pub fn on_success(&mut self) {
        self.successes += 1;
    }

    /// Returns `true` once the budget has been exceeded.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// The number of failed requests so far.
    pub fn errors(&self) -> u64 {
        self.errors
    }

    /// The number of successful requests so far.
    pub fn successes(&self) -> u64 {
        self.successes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aborts_once_failures_exceed_budget() {
        for budget in [0, 1, 5] {
            let mut failures = FailureBudget::new(budget);
            for _ in 0..budget {
                assert!(!failures.on_failure());
            }
            assert!(failures.on_failure(), "budget {budget}");
            assert_eq!(failures.errors(), budget as u64 + 1);
        }
    }

    #[test]
    fn successes_do_not_restore_budget() {
        let mut failures = FailureBudget::new(1);
        assert!(!failures.on_failure());
        failures.on_success();
        failures.on_success();
        assert!(failures.on_failure());
        assert_eq!(failures.successes(), 2);
    }

    #[test]
    fn negative_budget_never_aborts() {
        let mut failures = FailureBudget::new(-1);
        for _ in 0..10_000 {
            assert!(!failures.on_failure());
        }
        assert!(!failures.is_exhausted());
    }

    #[test]
    fn abort_is_final() {
        let mut failures = FailureBudget::new(0);
        assert!(failures.on_failure());
        failures.on_success();
        assert!(failures.is_exhausted());
    }
}
