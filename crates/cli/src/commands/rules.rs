use serde::Serialize;

use certtrack_core::domain::{DocumentSlot, MaterialGroup, PriceRequest};
use certtrack_core::requirements::{RequirementRule, UlCondition, REQUIREMENT_RULES};

use crate::commands::CommandResult;

#[derive(Debug, Serialize)]
struct RuleRow {
    material_group: MaterialGroup,
    price_request: PriceRequest,
    ul: UlCondition,
    slots: Vec<u8>,
    titles: Vec<&'static str>,
}

impl From<&RequirementRule> for RuleRow {
    fn from(rule: &RequirementRule) -> Self {
        Self {
            material_group: rule.group,
            price_request: rule.price_request,
            ul: rule.ul,
            slots: rule.slots.iter().map(|slot| slot.number()).collect(),
            titles: rule.slots.iter().map(|slot| DocumentSlot::title(*slot)).collect(),
        }
    }
}

pub fn run() -> CommandResult {
    let rows: Vec<RuleRow> = REQUIREMENT_RULES.iter().map(RuleRow::from).collect();
    CommandResult::success_with(
        "rules",
        format!("{} requirement rules; unmatched combinations require nothing", rows.len()),
        rows,
    )
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::run;

    #[test]
    fn dumps_every_rule_with_wire_labels() {
        let result = run();
        assert_eq!(result.exit_code, 0);

        let value: Value = serde_json::from_str(&result.output).expect("payload json");
        let rows = value["data"].as_array().expect("rule rows");
        assert_eq!(rows.len(), 8);
        assert_eq!(rows[0]["material_group"], "paint_related");
        assert_eq!(rows[0]["price_request"], "Gia công");
        assert_eq!(rows[0]["slots"], serde_json::json!([8]));
        assert!(rows.iter().any(|row| row["ul"] == "not_waived"
            && row["slots"] == serde_json::json!([1, 2, 3, 4, 5, 6])));
    }
}
