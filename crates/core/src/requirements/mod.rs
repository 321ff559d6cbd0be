//! Document requirement resolution for certification records.
//!
//! Everything here is a pure function of the record's classification fields,
//! the per-slot upload counts and (for resubmission) the change history.
//! Missing inputs never fail: they resolve to "nothing required" and leave
//! enforcement to the backend.

pub mod rules;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::domain::certification::CertificationRecord;
use crate::domain::history::HistoryEntry;
use crate::domain::material::{MaterialClassId, MaterialGroup, PriceRequest, UlCertStatus};
use crate::domain::slot::{DocumentSlot, SlotCounts, SlotSet};
use crate::workflow::WorkflowState;

pub use rules::{lookup_rule, slot_visible, RequirementRule, UlCondition, REQUIREMENT_RULES};

/// Classification fields that drive requirement resolution.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RequirementInput {
    pub material_class_id: Option<MaterialClassId>,
    pub price_request: Option<PriceRequest>,
    pub ul_cert_status: Option<UlCertStatus>,
    pub report_actual_date: Option<NaiveDate>,
}

impl RequirementInput {
    pub fn from_record(record: &CertificationRecord) -> Self {
        Self {
            material_class_id: record.material_class_id,
            price_request: record.price_request,
            ul_cert_status: record.ul_cert_status,
            report_actual_date: record.report_actual_date,
        }
    }

    /// Uses `fallback` when the record carries no UL tier of its own.
    pub fn with_ul_fallback(mut self, fallback: Option<UlCertStatus>) -> Self {
        if self.ul_cert_status.is_none() {
            self.ul_cert_status = fallback;
        }
        self
    }

    pub fn material_group(&self) -> MaterialGroup {
        MaterialGroup::of(self.material_class_id)
    }

    pub fn ul_waived(&self) -> bool {
        self.ul_cert_status.is_some_and(UlCertStatus::is_waiver_tier)
    }

    pub fn is_closed(&self) -> bool {
        self.report_actual_date.is_some()
    }
}

/// Outcome of the required-slot lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "slots", rename_all = "snake_case")]
pub enum RequiredSlots {
    /// The report already carries an actual date; every check is satisfied.
    Closed,
    Open(SlotSet),
}

impl RequiredSlots {
    pub fn slots(&self) -> SlotSet {
        match self {
            Self::Closed => SlotSet::EMPTY,
            Self::Open(slots) => *slots,
        }
    }
}

pub fn should_show(input: &RequirementInput, slot: DocumentSlot) -> bool {
    slot_visible(slot, input.material_group(), input.price_request, input.ul_waived())
}

pub fn visible_slots(input: &RequirementInput) -> SlotSet {
    DocumentSlot::ALL.into_iter().filter(|slot| should_show(input, *slot)).collect()
}

pub fn required_slots(input: &RequirementInput) -> RequiredSlots {
    if input.is_closed() {
        return RequiredSlots::Closed;
    }

    let group = input.material_group();
    let required = lookup_rule(group, input.price_request, input.ul_waived())
        .map(RequirementRule::required)
        .unwrap_or_default();
    RequiredSlots::Open(required)
}

pub fn missing_slots(input: &RequirementInput, counts: &SlotCounts) -> SlotSet {
    required_slots(input).slots().difference(&counts.uploaded())
}

pub fn all_satisfied(input: &RequirementInput, counts: &SlotCounts) -> bool {
    match required_slots(input) {
        RequiredSlots::Closed => true,
        RequiredSlots::Open(required) => required.iter().all(|slot| counts.count(slot) >= 1),
    }
}

/// Resubmission needs an undated report, a prior submission cycle in the
/// history feed and every required slot filled.
pub fn can_resubmit(
    input: &RequirementInput,
    counts: &SlotCounts,
    history: &[HistoryEntry],
) -> bool {
    if input.is_closed() {
        return false;
    }

    let has_prior_cycle = history.iter().any(|entry| entry.action.counts_toward_resubmission());
    has_prior_cycle && all_satisfied(input, counts)
}

/// Snapshot of every requirement query for one record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RequirementEvaluation {
    pub material_group: MaterialGroup,
    pub price_request: Option<PriceRequest>,
    pub ul_waived: bool,
    pub visible: SlotSet,
    pub required: RequiredSlots,
    pub uploaded: SlotSet,
    pub missing: SlotSet,
    pub all_satisfied: bool,
    pub can_submit: bool,
    pub can_resubmit: bool,
    pub state: WorkflowState,
}

/// Requirement queries bound to one record's inputs and upload counts.
#[derive(Clone, Debug, Default)]
pub struct RequirementResolver {
    input: RequirementInput,
    counts: SlotCounts,
}

impl RequirementResolver {
    pub fn new(input: RequirementInput, counts: SlotCounts) -> Self {
        Self { input, counts }
    }

    pub fn input(&self) -> &RequirementInput {
        &self.input
    }

    /// Visibility by raw slot number; numbers outside 1..=8 are never shown.
    pub fn should_show_pdf(&self, slot_number: u8) -> bool {
        DocumentSlot::from_number(slot_number)
            .map(|slot| should_show(&self.input, slot))
            .unwrap_or(false)
    }

    pub fn visible_slots(&self) -> SlotSet {
        visible_slots(&self.input)
    }

    pub fn required_slots(&self) -> RequiredSlots {
        required_slots(&self.input)
    }

    pub fn missing_slots(&self) -> SlotSet {
        missing_slots(&self.input, &self.counts)
    }

    pub fn all_satisfied(&self) -> bool {
        all_satisfied(&self.input, &self.counts)
    }

    pub fn can_submit(&self) -> bool {
        !self.input.is_closed() && self.all_satisfied()
    }

    pub fn can_resubmit(&self, history: &[HistoryEntry]) -> bool {
        can_resubmit(&self.input, &self.counts, history)
    }

    pub fn evaluate(&self, history: &[HistoryEntry]) -> RequirementEvaluation {
        let all_satisfied = self.all_satisfied();
        let evaluation = RequirementEvaluation {
            material_group: self.input.material_group(),
            price_request: self.input.price_request,
            ul_waived: self.input.ul_waived(),
            visible: self.visible_slots(),
            required: self.required_slots(),
            uploaded: self.counts.uploaded(),
            missing: self.missing_slots(),
            all_satisfied,
            can_submit: self.can_submit(),
            can_resubmit: self.can_resubmit(history),
            state: WorkflowState::derive(self.input.is_closed(), all_satisfied),
        };

        debug!(
            event_name = "requirements.evaluated",
            material_group = evaluation.material_group.as_str(),
            required = ?evaluation.required,
            missing = ?evaluation.missing,
            all_satisfied = evaluation.all_satisfied,
            can_resubmit = evaluation.can_resubmit,
            "requirement evaluation computed"
        );

        evaluation
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{
        all_satisfied, can_resubmit, required_slots, visible_slots, RequiredSlots,
        RequirementInput, RequirementResolver,
    };
    use crate::domain::history::{HistoryAction, HistoryEntry};
    use crate::domain::material::{MaterialClassId, PriceRequest, UlCertStatus};
    use crate::domain::slot::{DocumentSlot, SlotCounts, SlotSet};
    use crate::workflow::WorkflowState;

    fn input(class: u32, price: PriceRequest, ul: Option<u32>) -> RequirementInput {
        RequirementInput {
            material_class_id: Some(MaterialClassId(class)),
            price_request: Some(price),
            ul_cert_status: ul.map(UlCertStatus),
            report_actual_date: None,
        }
    }

    fn counts_for(numbers: &[u8]) -> SlotCounts {
        numbers.iter().fold(SlotCounts::default(), |counts, number| {
            counts.with(DocumentSlot::from_number(*number).expect("slot"), 1)
        })
    }

    fn required_numbers(input: &RequirementInput) -> Vec<u8> {
        required_slots(input).slots().numbers()
    }

    #[test]
    fn required_slots_follow_rule_table() {
        use PriceRequest::*;

        let cases: &[(u32, PriceRequest, Option<u32>, &[u8])] = &[
            (4, Processing, None, &[8]),
            (5, Reliability, None, &[1]),
            (7, ProcessingAndReliability, Some(2), &[1, 8]),
            (1, Reliability, Some(9), &[1]),
            (1, Processing, Some(1), &[2, 3, 4, 5]),
            (1, Processing, Some(5), &[2, 3, 4, 5, 6]),
            (1, Processing, None, &[2, 3, 4, 5, 6]),
            (1, ProcessingAndReliability, Some(3), &[1, 2, 3, 4, 5]),
            (1, ProcessingAndReliability, Some(4), &[1, 2, 3, 4, 5, 6]),
            (2, ProcessingAndReliability, None, &[]),
            (9, Processing, Some(1), &[]),
        ];

        for (class, price, ul, expected) in cases {
            assert_eq!(
                required_numbers(&input(*class, *price, *ul)),
                expected.to_vec(),
                "class {class} / {price:?} / ul {ul:?}"
            );
        }
    }

    #[test]
    fn absent_classification_requires_nothing() {
        let empty = RequirementInput::default();
        assert_eq!(required_slots(&empty), RequiredSlots::Open(SlotSet::EMPTY));
        assert!(all_satisfied(&empty, &SlotCounts::default()));

        let no_price =
            RequirementInput { price_request: None, ..input(1, PriceRequest::Processing, None) };
        assert!(required_slots(&no_price).slots().is_empty());
    }

    #[test]
    fn dated_report_is_always_satisfied() {
        let mut dated = input(1, PriceRequest::ProcessingAndReliability, None);
        dated.report_actual_date = NaiveDate::from_ymd_opt(2026, 5, 4);

        assert_eq!(required_slots(&dated), RequiredSlots::Closed);
        assert!(all_satisfied(&dated, &SlotCounts::default()));

        let resolver = RequirementResolver::new(dated, SlotCounts::default());
        assert!(!resolver.can_submit());
        assert_eq!(resolver.evaluate(&[]).state, WorkflowState::Submitted);
    }

    #[test]
    fn rigid_processing_without_waiver_needs_ul_report() {
        let rigid = input(1, PriceRequest::Processing, Some(5));
        assert_eq!(required_numbers(&rigid), vec![2, 3, 4, 5, 6]);

        let partial = RequirementResolver::new(rigid.clone(), counts_for(&[2, 3, 4, 5]));
        assert!(!partial.all_satisfied());
        assert_eq!(partial.missing_slots().numbers(), vec![6]);

        let complete = RequirementResolver::new(rigid, counts_for(&[2, 3, 4, 5, 6]));
        assert!(complete.all_satisfied());
        assert!(complete.can_submit());
    }

    #[test]
    fn unrelated_uploads_never_satisfy_required_slots() {
        let paint = input(4, PriceRequest::Processing, None);
        let resolver = RequirementResolver::new(paint, counts_for(&[1, 2, 3, 4, 5, 6, 7]));
        assert!(!resolver.all_satisfied());
        assert_eq!(resolver.missing_slots().numbers(), vec![8]);
    }

    #[test]
    fn paint_related_both_shows_reliability_other_and_ink_only() {
        let paint = input(4, PriceRequest::ProcessingAndReliability, None);
        let resolver = RequirementResolver::new(paint.clone(), SlotCounts::default());

        assert_eq!(required_numbers(&paint), vec![1, 8]);
        for number in 2..=6 {
            assert!(!resolver.should_show_pdf(number), "slot {number} should be hidden");
        }
        assert!(resolver.should_show_pdf(1));
        assert!(resolver.should_show_pdf(7));
        assert!(resolver.should_show_pdf(8));
        assert_eq!(visible_slots(&paint).numbers(), vec![1, 7, 8]);
    }

    #[test]
    fn out_of_range_slot_numbers_are_hidden() {
        let resolver = RequirementResolver::default();
        assert!(!resolver.should_show_pdf(0));
        assert!(!resolver.should_show_pdf(9));
        assert!(resolver.should_show_pdf(7));
    }

    #[test]
    fn ul_fallback_applies_only_when_record_has_no_tier() {
        let unset =
            input(1, PriceRequest::Processing, None).with_ul_fallback(Some(UlCertStatus(2)));
        assert_eq!(required_numbers(&unset), vec![2, 3, 4, 5]);

        let explicit =
            input(1, PriceRequest::Processing, Some(7)).with_ul_fallback(Some(UlCertStatus(2)));
        assert_eq!(required_numbers(&explicit), vec![2, 3, 4, 5, 6]);
    }

    #[test]
    fn resubmission_requires_prior_submission_cycle() {
        let rigid = input(1, PriceRequest::Reliability, None);
        let counts = counts_for(&[1]);

        assert!(!can_resubmit(&rigid, &counts, &[]));
        let unrelated = [HistoryEntry::new(HistoryAction::Other("UPDATE".to_string()))];
        assert!(!can_resubmit(&rigid, &counts, &unrelated));

        let submitted = [HistoryEntry::new(HistoryAction::SubmitReport)];
        assert!(can_resubmit(&rigid, &counts, &submitted));
        assert!(!can_resubmit(&rigid, &SlotCounts::default(), &submitted));
    }

    #[test]
    fn resubmission_is_closed_once_report_is_dated() {
        let mut rigid = input(1, PriceRequest::Reliability, None);
        rigid.report_actual_date = NaiveDate::from_ymd_opt(2026, 1, 10);
        let history = [HistoryEntry::new(HistoryAction::UploadPdf)];
        assert!(!can_resubmit(&rigid, &counts_for(&[1]), &history));
    }

    #[test]
    fn repeated_evaluation_is_identical() {
        let resolver = RequirementResolver::new(
            input(7, PriceRequest::ProcessingAndReliability, Some(1)),
            counts_for(&[1]),
        );
        let history = [HistoryEntry::new(HistoryAction::ReuploadPdf)];

        let first = resolver.evaluate(&history);
        let second = resolver.evaluate(&history);
        assert_eq!(first, second);
        assert_eq!(first.state, WorkflowState::NotSubmitted);
        assert_eq!(first.missing.numbers(), vec![8]);
    }

    #[test]
    fn evaluation_serializes_slots_as_numbers() {
        let resolver =
            RequirementResolver::new(input(4, PriceRequest::Processing, None), counts_for(&[8]));
        let json = serde_json::to_value(resolver.evaluate(&[])).expect("json");

        assert_eq!(json["required"]["status"], "open");
        assert_eq!(json["required"]["slots"], serde_json::json!([8]));
        assert_eq!(json["state"], "submittable");
        assert_eq!(json["can_submit"], true);
    }
}
