//! Keyword safety-rule tables.
//!
//! Hard stops cover procedures that can injure someone (probing airbag
//! circuits, opening a hot cooling system, blind relay jumping, touching
//! hybrid high-voltage cabling). Warnings are non-blocking advisories.
//! Both are ordered tables scanned over the lowercased message.

use async_trait::async_trait;
use shopflow_core::error::Result;
use shopflow_core::safety::{SafetyLookup, SafetyVerdict};

/// One hard-stop rule: every `all` term must appear, plus at least one
/// `any` term when that list is non-empty.
struct HardStopRule {
    all: &'static [&'static str],
    any: &'static [&'static str],
    message: &'static str,
}

const HARD_STOPS: &[HardStopRule] = &[
    HardStopRule {
        all: &["airbag"],
        any: &["probe", "test with a multimeter", "multimeter", "resistance", "jump", "pierce"],
        message: "I can't walk you through probing an airbag circuit. Live SRS circuits can deploy \
the airbag and cause serious injury; that system needs the battery disconnected, the reserve \
capacitor discharged, and manufacturer service procedures. Please take this one to a qualified shop.",
    },
    HardStopRule {
        all: &["radiator cap"],
        any: &["hot", "while it's running", "while running", "overheating"],
        message: "Don't open the radiator cap while the engine is hot. The system is under pressure \
and will flash to steam, which causes severe burns. Let it cool completely (an hour or more) \
before opening anything in the cooling system.",
    },
    HardStopRule {
        all: &["jump", "relay"],
        any: &[],
        message: "I can't recommend jumping a relay blind. Bridging the wrong terminals can run a fuel \
pump dry, weld contacts, or energize a circuit with you in its path. Let's identify the circuit \
properly from the wiring diagram first.",
    },
    HardStopRule {
        all: &["fuel pump relay", "bypass"],
        any: &[],
        message: "Bypassing the fuel pump relay is not safe to do ad hoc; a fed pump with an open \
fuel line is a fire hazard. We can test the pump circuit properly with a test light at the connector.",
    },
    HardStopRule {
        all: &["orange cable"],
        any: &["cut", "touch", "disconnect", "unplug", "remove", "splice"],
        message: "Stop: orange cabling is the hybrid high-voltage system. It carries enough voltage \
to be lethal and must only be serviced with the HV service plug removed and class-0 insulated \
gloves. This is strictly a job for a trained hybrid technician.",
    },
    HardStopRule {
        all: &["high voltage"],
        any: &["touch", "disconnect", "probe", "cut"],
        message: "Stop: the high-voltage system on a hybrid or EV can be lethal. Do not touch or \
disconnect any part of it. A trained technician with HV safety equipment needs to handle that.",
    },
];

/// Advisory warning table: any listed term attaches the warning.
const WARNINGS: &[(&'static [&'static str], &'static str)] = &[
    (
        &["fuel line", "fuel rail", "injector"],
        "The fuel system holds pressure after shutdown; relieve it before opening any fuel connection.",
    ),
    (
        &["under the car", "jack", "crawl under"],
        "Never work under a vehicle supported only by a jack; use jack stands on solid ground.",
    ),
    (
        &["battery terminal", "battery acid", "swollen battery"],
        "Wear eye protection around the battery and disconnect negative first.",
    ),
    (
        &["spark test", "check for spark", "spark tester"],
        "Keep hands and the tester clear of moving parts and secondary ignition voltage while cranking.",
    ),
];

/// Table-driven implementation of the safety capability.
#[derive(Default)]
pub struct KeywordSafetyRules;

impl KeywordSafetyRules {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SafetyLookup for KeywordSafetyRules {
    async fn check(&self, text: &str) -> Result<SafetyVerdict> {
        let lower = text.to_lowercase();

        for rule in HARD_STOPS {
            let all_hit = rule.all.iter().all(|t| lower.contains(t));
            let any_hit = rule.any.is_empty() || rule.any.iter().any(|t| lower.contains(t));
            if all_hit && any_hit {
                return Ok(SafetyVerdict {
                    hard_stop: Some(rule.message.to_string()),
                    warnings: Vec::new(),
                });
            }
        }

        let warnings = WARNINGS
            .iter()
            .filter(|(terms, _)| terms.iter().any(|t| lower.contains(t)))
            .map(|(_, warning)| (*warning).to_string())
            .collect();

        Ok(SafetyVerdict {
            hard_stop: None,
            warnings,
        })
    }
}
