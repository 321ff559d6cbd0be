use serde::Serialize;

use crate::domain::material::{MaterialGroup, PriceRequest};
use crate::domain::slot::{DocumentSlot, SlotSet};

use DocumentSlot::{
    DrillingReport, InkProcessingReport, LaminationReport, PlatingReport, ReliabilityReport,
    SolderMaskReport, UlTestReport,
};

/// How a rule constrains the record's UL certification tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UlCondition {
    Any,
    /// UL tier is one of 1, 2 or 3.
    Waived,
    /// UL tier is unset or outside 1..=3.
    NotWaived,
}

impl UlCondition {
    pub fn matches(self, waived: bool) -> bool {
        match self {
            Self::Any => true,
            Self::Waived => waived,
            Self::NotWaived => !waived,
        }
    }
}

/// One row of the required-document table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct RequirementRule {
    pub group: MaterialGroup,
    pub price_request: PriceRequest,
    pub ul: UlCondition,
    pub slots: &'static [DocumentSlot],
}

impl RequirementRule {
    pub fn required(&self) -> SlotSet {
        SlotSet::from_slots(self.slots)
    }

    fn matches(&self, group: MaterialGroup, price_request: PriceRequest, waived: bool) -> bool {
        self.group == group && self.price_request == price_request && self.ul.matches(waived)
    }
}

const fn rule(
    group: MaterialGroup,
    price_request: PriceRequest,
    ul: UlCondition,
    slots: &'static [DocumentSlot],
) -> RequirementRule {
    RequirementRule { group, price_request, ul, slots }
}

/// Required slots keyed by material group, price request and UL waiver.
///
/// Combinations without a row (including every `MaterialGroup::Other` record)
/// require nothing.
pub const REQUIREMENT_RULES: &[RequirementRule] = &[
    rule(MaterialGroup::PaintRelated, PriceRequest::Processing, UlCondition::Any, &[
        InkProcessingReport,
    ]),
    rule(MaterialGroup::PaintRelated, PriceRequest::Reliability, UlCondition::Any, &[
        ReliabilityReport,
    ]),
    rule(MaterialGroup::PaintRelated, PriceRequest::ProcessingAndReliability, UlCondition::Any, &[
        ReliabilityReport,
        InkProcessingReport,
    ]),
    rule(MaterialGroup::Rigid, PriceRequest::Reliability, UlCondition::Any, &[ReliabilityReport]),
    rule(MaterialGroup::Rigid, PriceRequest::Processing, UlCondition::Waived, &[
        PlatingReport,
        LaminationReport,
        DrillingReport,
        SolderMaskReport,
    ]),
    rule(MaterialGroup::Rigid, PriceRequest::Processing, UlCondition::NotWaived, &[
        PlatingReport,
        LaminationReport,
        DrillingReport,
        SolderMaskReport,
        UlTestReport,
    ]),
    rule(MaterialGroup::Rigid, PriceRequest::ProcessingAndReliability, UlCondition::Waived, &[
        ReliabilityReport,
        PlatingReport,
        LaminationReport,
        DrillingReport,
        SolderMaskReport,
    ]),
    rule(MaterialGroup::Rigid, PriceRequest::ProcessingAndReliability, UlCondition::NotWaived, &[
        ReliabilityReport,
        PlatingReport,
        LaminationReport,
        DrillingReport,
        SolderMaskReport,
        UlTestReport,
    ]),
];

pub fn lookup_rule(
    group: MaterialGroup,
    price_request: Option<PriceRequest>,
    waived: bool,
) -> Option<&'static RequirementRule> {
    let price_request = price_request?;
    REQUIREMENT_RULES.iter().find(|rule| rule.matches(group, price_request, waived))
}

/// Whether a slot's upload control is displayed at all.
pub fn slot_visible(
    slot: DocumentSlot,
    group: MaterialGroup,
    price_request: Option<PriceRequest>,
    waived: bool,
) -> bool {
    let processing = price_request.is_some_and(PriceRequest::includes_processing);
    let processing_only = price_request == Some(PriceRequest::Processing);

    match slot {
        ReliabilityReport => {
            !(group == MaterialGroup::PaintRelated && processing_only)
                && !(group == MaterialGroup::Rigid && processing_only)
        }
        PlatingReport | LaminationReport | DrillingReport | SolderMaskReport => {
            group == MaterialGroup::Rigid && processing
        }
        UlTestReport => group == MaterialGroup::Rigid && !waived && processing,
        DocumentSlot::OtherDocuments => true,
        InkProcessingReport => group == MaterialGroup::PaintRelated && processing,
    }
}
