use course_core::model::LearnerId;

/// Supplies the identity of the active session's learner.
///
/// The progress tracker is the only consumer; it falls back to a
/// device-local pseudo-id when no learner is signed in, so progress taken
/// anonymously is still keyed consistently within a session.
pub trait SessionIdentity: Send + Sync {
    /// The signed-in learner, or `None` for an anonymous session.
    fn current_learner_id(&self) -> Option<LearnerId>;
}

/// Identity provider for a known, signed-in learner.
#[derive(Debug, Clone)]
pub struct FixedIdentity {
    learner_id: LearnerId,
}

impl FixedIdentity {
    #[must_use]
    pub fn new(learner_id: LearnerId) -> Self {
        Self { learner_id }
    }
}

impl SessionIdentity for FixedIdentity {
    fn current_learner_id(&self) -> Option<LearnerId> {
        Some(self.learner_id.clone())
    }
}

/// Identity provider for a session with nobody signed in.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousIdentity;

impl SessionIdentity for AnonymousIdentity {
    fn current_learner_id(&self) -> Option<LearnerId> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_identity_returns_its_learner() {
        let identity = FixedIdentity::new(LearnerId::new("learner-7"));
        assert_eq!(
            identity.current_learner_id(),
            Some(LearnerId::new("learner-7"))
        );
    }

    #[test]
    fn anonymous_identity_returns_none() {
        assert_eq!(AnonymousIdentity.current_learner_id(), None);
    }
}
