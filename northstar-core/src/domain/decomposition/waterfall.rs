// northstar-core/src/domain/decomposition/waterfall.rs

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::decomposition::attribution::DecompositionResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Start,
    Driver,
    Interaction,
    End,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterfallStep {
    pub label: String,
    pub kind: StepKind,
    pub delta: f64,
    pub cumulative: f64,
}

impl fmt::Display for WaterfallStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:+.2} -> {:.2}", self.label, self.delta, self.cumulative)
    }
}

/// Start, one bar per driver, interaction, end. Each step carries the running total,
/// so the interaction bar always lands on the period-2 value.
pub fn attribution_view(result: &DecompositionResult) -> Vec<WaterfallStep> {
    let mut cumulative = result.north_star_start;
    let mut steps = vec![WaterfallStep {
        label: "start".to_string(),
        kind: StepKind::Start,
        delta: result.north_star_start,
        cumulative,
    }];

    let bars = [
        (result.driver_a.as_str(), StepKind::Driver, result.driver_a_contribution),
        (result.driver_b.as_str(), StepKind::Driver, result.driver_b_contribution),
        ("interaction", StepKind::Interaction, result.interaction),
    ];
    for (label, kind, delta) in bars {
        cumulative += delta;
        steps.push(WaterfallStep {
            label: label.to_string(),
            kind,
            delta,
            cumulative,
        });
    }

    steps.push(WaterfallStep {
        label: "end".to_string(),
        kind: StepKind::End,
        delta: result.north_star_end,
        cumulative: result.north_star_end,
    });
    steps
}
