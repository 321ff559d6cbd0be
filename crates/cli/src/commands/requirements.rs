//! Offline requirement evaluation from classification flags.

use chrono::NaiveDate;
use serde::Serialize;

use certtrack_core::config::{AppConfig, LoadOptions};
use certtrack_core::domain::{
    DocumentSlot, HistoryAction, HistoryEntry, MaterialClassId, PriceRequest, SlotCounts,
    UlCertStatus,
};
use certtrack_core::requirements::{RequirementEvaluation, RequirementInput, RequirementResolver};

use crate::commands::CommandResult;

const COMMAND: &str = "requirements";

#[derive(Clone, Debug, Default)]
pub struct RequirementsArgs {
    pub material_class: Option<u32>,
    pub price_request: Option<String>,
    pub ul_cert_status: Option<u32>,
    pub report_date: Option<String>,
    pub uploaded: Vec<u8>,
    pub history: Vec<String>,
}

#[derive(Debug, Serialize)]
struct SlotView {
    slot: u8,
    title: &'static str,
    visible: bool,
    required: bool,
    uploaded: bool,
}

#[derive(Debug, Serialize)]
struct RequirementsReport {
    input: RequirementInput,
    evaluation: RequirementEvaluation,
    slots: Vec<SlotView>,
}

pub fn run(options: LoadOptions, args: RequirementsArgs) -> CommandResult {
    match AppConfig::load(options) {
        Ok(config) => execute(args, config.requirements.ul_cert_fallback),
        Err(error) => CommandResult::config_failure(COMMAND, &error),
    }
}

/// Evaluates `args`, using `ul_fallback` when no UL tier was given.
pub fn execute(args: RequirementsArgs, ul_fallback: Option<UlCertStatus>) -> CommandResult {
    let (input, counts, history) = match parse(args) {
        Ok(parsed) => parsed,
        Err(message) => return CommandResult::invalid_input(COMMAND, message),
    };
    let input = input.with_ul_fallback(ul_fallback);

    let resolver = RequirementResolver::new(input, counts);
    let evaluation = resolver.evaluate(&history);
    let required = evaluation.required.slots();
    let slots = DocumentSlot::ALL
        .into_iter()
        .map(|slot| SlotView {
            slot: slot.number(),
            title: slot.title(),
            visible: evaluation.visible.contains(slot),
            required: required.contains(slot),
            uploaded: evaluation.uploaded.contains(slot),
        })
        .collect();

    let message = if evaluation.missing.is_empty() {
        format!("{:?}: all required slots satisfied", evaluation.state)
    } else {
        format!("{:?}: missing slots {:?}", evaluation.state, evaluation.missing.numbers())
    };
    let report = RequirementsReport { input: resolver.input().clone(), evaluation, slots };
    CommandResult::success_with(COMMAND, message, report)
}

fn parse(
    args: RequirementsArgs,
) -> Result<(RequirementInput, SlotCounts, Vec<HistoryEntry>), String> {
    let price_request = args
        .price_request
        .as_deref()
        .map(str::parse::<PriceRequest>)
        .transpose()
        .map_err(|error| error.to_string())?;
    let report_actual_date = args
        .report_date
        .as_deref()
        .map(|raw| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|error| format!("invalid report date `{raw}`: {error}"))
        })
        .transpose()?;

    let mut counts = SlotCounts::default();
    for number in args.uploaded {
        let slot = DocumentSlot::from_number(number).map_err(|error| error.to_string())?;
        counts.set(slot, counts.count(slot) + 1);
    }

    let history = args
        .history
        .into_iter()
        .map(|tag| HistoryEntry::new(HistoryAction::from(tag)))
        .collect();

    let input = RequirementInput {
        material_class_id: args.material_class.map(MaterialClassId),
        price_request,
        ul_cert_status: args.ul_cert_status.map(UlCertStatus),
        report_actual_date,
    };
    Ok((input, counts, history))
}
