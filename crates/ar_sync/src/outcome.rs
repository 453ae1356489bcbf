use ar_core::{Error, Result, StoreError, StoreOrigin, StoreResult};

/// Result of one store write during an update.
#[derive(Debug)]
pub struct WriteOutcome {
    pub origin: StoreOrigin,
    pub result: StoreResult<()>,
}

impl WriteOutcome {
    pub fn new(origin: StoreOrigin, result: StoreResult<()>) -> Self {
        Self { origin, result }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn error(&self) -> Option<&StoreError> {
        self.result.as_ref().err()
    }
}

// Reporting order when several writes fail
fn precedence(origin: StoreOrigin) -> u8 {
    match origin {
        StoreOrigin::Relational => 0,
        StoreOrigin::Index => 1,
        StoreOrigin::Lock => 2,
    }
}

/// Every write outcome of one update, one slot per store, relational first.
#[derive(Debug)]
pub struct UpdateOutcome {
    outcomes: Vec<WriteOutcome>,
}

impl UpdateOutcome {
    pub fn new(mut outcomes: Vec<WriteOutcome>) -> Self {
        outcomes.sort_by_key(|outcome| precedence(outcome.origin));
        Self { outcomes }
    }

    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(WriteOutcome::is_success)
    }

    pub fn outcomes(&self) -> &[WriteOutcome] {
        &self.outcomes
    }

    pub fn outcome(&self, origin: StoreOrigin) -> Option<&WriteOutcome> {
        self.outcomes.iter().find(|outcome| outcome.origin == origin)
    }

    pub fn failures(&self) -> impl Iterator<Item = &WriteOutcome> {
        self.outcomes.iter().filter(|outcome| !outcome.is_success())
    }

    /// Collapse into the caller-facing result: the highest-precedence failure, if any.
    pub fn into_result(self) -> Result<()> {
        for outcome in self.outcomes {
            if let Err(source) = outcome.result {
                return Err(Error::store(outcome.origin, source));
            }
        }
        Ok(())
    }
}
