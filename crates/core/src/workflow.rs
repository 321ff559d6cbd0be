use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Submission state of a certification report, derived on every evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    NotSubmitted,
    Submittable,
    Submitted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowEvent {
    RequiredSlotsSatisfied,
    RequiredSlotRemoved,
    ReportSubmitted,
    /// The backend cleared the report's actual date.
    ReportReopened,
}

impl WorkflowState {
    pub fn derive(report_dated: bool, all_satisfied: bool) -> Self {
        match (report_dated, all_satisfied) {
            (true, _) => Self::Submitted,
            (false, true) => Self::Submittable,
            (false, false) => Self::NotSubmitted,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Self::Submitted
    }

    pub fn can_transition_to(self, next: WorkflowState) -> bool {
        matches!(
            (self, next),
            (Self::NotSubmitted, Self::Submittable)
                | (Self::Submittable, Self::NotSubmitted)
                | (Self::Submittable, Self::Submitted)
                | (Self::Submitted, Self::NotSubmitted)
        )
    }

    pub fn apply(self, event: WorkflowEvent) -> Result<WorkflowState, DomainError> {
        let next = match event {
            WorkflowEvent::RequiredSlotsSatisfied => Self::Submittable,
            WorkflowEvent::RequiredSlotRemoved | WorkflowEvent::ReportReopened => {
                Self::NotSubmitted
            }
            WorkflowEvent::ReportSubmitted => Self::Submitted,
        };

        let allowed = match (self, event) {
            (Self::Submitted, WorkflowEvent::RequiredSlotRemoved) => false,
            (Self::Submittable, WorkflowEvent::ReportReopened) => false,
            _ => self.can_transition_to(next),
        };

        if allowed {
            Ok(next)
        } else {
            Err(DomainError::InvalidWorkflowTransition { from: self, to: next })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{WorkflowEvent, WorkflowState};
    use crate::errors::DomainError;

    #[test]
    fn derives_state_from_report_date_and_satisfaction() {
        assert_eq!(WorkflowState::derive(false, false), WorkflowState::NotSubmitted);
        assert_eq!(WorkflowState::derive(false, true), WorkflowState::Submittable);
        assert_eq!(WorkflowState::derive(true, false), WorkflowState::Submitted);
    }

    #[test]
    fn allows_full_submission_cycle() {
        let state = WorkflowState::NotSubmitted
            .apply(WorkflowEvent::RequiredSlotsSatisfied)
            .expect("not submitted -> submittable");
        let state = state.apply(WorkflowEvent::ReportSubmitted).expect("submittable -> submitted");
        assert!(state.is_terminal());

        let reopened = state.apply(WorkflowEvent::ReportReopened).expect("submitted -> reopened");
        assert_eq!(reopened, WorkflowState::NotSubmitted);
    }

    #[test]
    fn blocks_submission_before_requirements_are_met() {
        let error = WorkflowState::NotSubmitted
            .apply(WorkflowEvent::ReportSubmitted)
            .expect_err("not submitted -> submitted should fail");
        assert!(matches!(error, DomainError::InvalidWorkflowTransition { .. }));
    }

    #[test]
    fn removing_files_from_submitted_report_needs_reopen_first() {
        assert!(WorkflowState::Submitted.apply(WorkflowEvent::RequiredSlotRemoved).is_err());
        assert_eq!(
            WorkflowState::Submittable.apply(WorkflowEvent::RequiredSlotRemoved),
            Ok(WorkflowState::NotSubmitted)
        );
    }

    #[test]
    fn reopen_is_only_meaningful_for_submitted_reports() {
        assert!(WorkflowState::Submittable.apply(WorkflowEvent::ReportReopened).is_err());
        assert!(WorkflowState::NotSubmitted.apply(WorkflowEvent::ReportReopened).is_err());
    }
}
