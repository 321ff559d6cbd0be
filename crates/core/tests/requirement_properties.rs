use chrono::NaiveDate;

use certtrack_core::domain::{
    DocumentSlot, HistoryAction, HistoryEntry, MaterialClassId, MaterialGroup, PriceRequest,
    SlotCounts, SlotSet, UlCertStatus,
};
use certtrack_core::requirements::{RequiredSlots, RequirementInput, RequirementResolver};

fn input(class: Option<u32>, price: Option<PriceRequest>, ul: Option<u32>) -> RequirementInput {
    RequirementInput {
        material_class_id: class.map(MaterialClassId),
        price_request: price,
        ul_cert_status: ul.map(UlCertStatus),
        report_actual_date: None,
    }
}

fn counts(numbers: &[u8]) -> SlotCounts {
    let mut counts = SlotCounts::default();
    for number in numbers {
        counts.set(DocumentSlot::from_number(*number).expect("slot"), 1);
    }
    counts
}

fn every_input() -> Vec<RequirementInput> {
    let classes =
        [None, Some(0), Some(1), Some(2), Some(3), Some(4), Some(5), Some(6), Some(7), Some(99)];
    let prices = [
        None,
        Some(PriceRequest::Processing),
        Some(PriceRequest::Reliability),
        Some(PriceRequest::ProcessingAndReliability),
    ];
    let tiers = [None, Some(0), Some(1), Some(2), Some(3), Some(4), Some(5)];

    let mut inputs = Vec::new();
    for class in classes {
        for price in prices {
            for tier in tiers {
                inputs.push(input(class, price, tier));
            }
        }
    }
    inputs
}

#[test]
fn unmatched_combinations_require_nothing() {
    let paint_sets = [
        SlotSet::from_slots(&[DocumentSlot::InkProcessingReport]),
        SlotSet::from_slots(&[DocumentSlot::ReliabilityReport]),
        SlotSet::from_slots(&[DocumentSlot::ReliabilityReport, DocumentSlot::InkProcessingReport]),
    ];

    for input in every_input() {
        let resolver = RequirementResolver::new(input.clone(), SlotCounts::default());
        let required = resolver.required_slots().slots();
        let group = input.material_group();

        if group == MaterialGroup::Other || input.price_request.is_none() {
            assert!(required.is_empty(), "{input:?} should require nothing, got {required:?}");
            assert!(resolver.all_satisfied());
        } else if group == MaterialGroup::PaintRelated {
            assert!(paint_sets.contains(&required), "{input:?} produced {required:?}");
        } else {
            let rigid_slots = SlotSet::from_slots(&DocumentSlot::ALL[..6]);
            assert!(
                required.difference(&rigid_slots).is_empty(),
                "{input:?} produced {required:?}"
            );
            assert!(!required.is_empty());
        }
    }
}

#[test]
fn dated_report_is_always_satisfied() {
    let date = NaiveDate::from_ymd_opt(2024, 3, 18).expect("date");
    for mut input in every_input() {
        input.report_actual_date = Some(date);
        let resolver = RequirementResolver::new(input, SlotCounts::default());

        assert_eq!(resolver.required_slots(), RequiredSlots::Closed);
        assert!(resolver.all_satisfied());
        assert!(resolver.missing_slots().is_empty());
        assert!(!resolver.can_submit());
    }
}

#[test]
fn rigid_processing_without_ul_waiver_needs_ul_test_report() {
    let rigid = input(Some(1), Some(PriceRequest::Processing), Some(5));

    let resolver = RequirementResolver::new(rigid.clone(), SlotCounts::default());
    assert_eq!(resolver.required_slots().slots().numbers(), vec![2, 3, 4, 5, 6]);

    let partial = RequirementResolver::new(rigid.clone(), counts(&[2, 3, 4, 5]));
    assert!(!partial.all_satisfied());
    assert_eq!(partial.missing_slots().numbers(), vec![6]);

    let complete = RequirementResolver::new(rigid, counts(&[2, 3, 4, 5, 6]));
    assert!(complete.all_satisfied());
    assert!(complete.can_submit());
}

#[test]
fn paint_related_processing_and_reliability_visibility() {
    let paint = input(Some(4), Some(PriceRequest::ProcessingAndReliability), None);
    let resolver = RequirementResolver::new(paint, SlotCounts::default());

    assert_eq!(resolver.required_slots().slots().numbers(), vec![1, 8]);
    for number in 2..=6 {
        assert!(!resolver.should_show_pdf(number), "slot {number} should be hidden");
    }
    for number in [1, 7, 8] {
        assert!(resolver.should_show_pdf(number), "slot {number} should be shown");
    }
    assert!(!resolver.should_show_pdf(0));
    assert!(!resolver.should_show_pdf(9));
}

#[test]
fn resubmission_requires_a_matching_history_action() {
    let paint = input(Some(5), Some(PriceRequest::Reliability), None);
    let resolver = RequirementResolver::new(paint, counts(&[1]));
    assert!(resolver.all_satisfied());

    let unrelated = vec![
        HistoryEntry::new(HistoryAction::Other("APPROVE_MATERIAL".to_string())),
        HistoryEntry::new(HistoryAction::from("delete_pdf".to_string())),
    ];
    assert!(!resolver.can_resubmit(&[]));
    assert!(!resolver.can_resubmit(&unrelated));

    for action in [
        HistoryAction::UploadPdf,
        HistoryAction::ReuploadPdf,
        HistoryAction::SubmitReport,
        HistoryAction::ResubmitReport,
    ] {
        let mut history = unrelated.clone();
        history.push(HistoryEntry::new(action));
        assert!(resolver.can_resubmit(&history));
    }
}

#[test]
fn queries_are_pure() {
    let history = vec![HistoryEntry::new(HistoryAction::SubmitReport)];
    for input in every_input() {
        let resolver = RequirementResolver::new(input, counts(&[1, 2, 8]));
        let first = resolver.evaluate(&history);
        let second = resolver.evaluate(&history);
        assert_eq!(first, second);

        for number in 0..=9 {
            assert_eq!(resolver.should_show_pdf(number), resolver.should_show_pdf(number));
        }
        assert_eq!(resolver.required_slots(), resolver.required_slots());
    }
}
