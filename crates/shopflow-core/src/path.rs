//! Deterministic path engine.
//!
//! A deterministic path is a hand-authored finite state machine that owns
//! the conversation for a fault class, independent of any generative
//! phrasing. While a path is active the generic ladder and the overlay
//! resolver are bypassed; every transition consumes exactly one parsed
//! answer and an unparseable answer never advances the phase.
//!
//! The canonical (and currently only) instance is the cylinder-misfire
//! path.

use crate::answer::{ExpectedKind, ParsedAnswer};
use crate::facts::{MisfireFacts, MisfireType};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Which deterministic path owns the session, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PathKind {
    Misfire,
}

/// States of the misfire decision tree.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MisfirePhase {
    /// Misfire type not yet known (keyword entry without a code).
    #[default]
    Start,
    /// Asking when the misfire occurs.
    ClassifyMisfire,
    /// Asking idle vs. load vs. both.
    ClassifyLoad,
    /// Asking about recent ignition-component work.
    ComponentHistory,
    /// Asking whether swapping the component moved the misfire.
    ComponentSwapCheck,
    /// Asking whether spark is present on the affected cylinder.
    CheckSpark,
    /// Terminal: the swapped component is at fault.
    ConfirmedComponentFault,
    /// Terminal: ignition ruled out; next stop injectors/mechanical.
    ComponentRuledOut,
}

impl MisfirePhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::ConfirmedComponentFault | Self::ComponentRuledOut)
    }
}

/// The question a path phase wants asked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathQuestion {
    pub key: &'static str,
    pub kind: ExpectedKind,
    pub prompt: String,
}

fn cylinder_phrase(facts: &MisfireFacts) -> String {
    match facts.cylinder {
        Some(n) => format!("cylinder {}", n),
        None => "the affected cylinders".to_string(),
    }
}

/// Entry phase for a new misfire path.
///
/// With the type already locked (e.g. pre-filled from a P030X code) the
/// type question is skipped and the path starts at `ClassifyMisfire`.
pub fn entry_phase(facts: &MisfireFacts) -> MisfirePhase {
    if facts.misfire_type.is_some() {
        MisfirePhase::ClassifyMisfire
    } else {
        MisfirePhase::Start
    }
}

/// Advances past phases whose fact is already locked.
///
/// Facts can arrive out of band (extracted from the opening message), so a
/// phase never re-asks for an established fact.
pub fn skip_locked(mut phase: MisfirePhase, facts: &MisfireFacts) -> MisfirePhase {
    loop {
        let next = match phase {
            MisfirePhase::Start if facts.misfire_type.is_some() => MisfirePhase::ClassifyMisfire,
            MisfirePhase::ClassifyMisfire if facts.occurs_when.is_some() => {
                MisfirePhase::ClassifyLoad
            }
            MisfirePhase::ClassifyLoad if facts.load.is_some() => MisfirePhase::ComponentHistory,
            MisfirePhase::ComponentHistory if facts.recent_ignition_work == Some(true) => {
                MisfirePhase::ComponentSwapCheck
            }
            MisfirePhase::ComponentHistory if facts.recent_ignition_work == Some(false) => {
                MisfirePhase::CheckSpark
            }
            _ => return phase,
        };
        phase = next;
    }
}

/// The question the current phase asks, or `None` on a terminal phase.
pub fn question(phase: MisfirePhase, facts: &MisfireFacts) -> Option<PathQuestion> {
    let cyl = cylinder_phrase(facts);
    match phase {
        MisfirePhase::Start => Some(PathQuestion {
            key: "misfire.classify_type",
            kind: ExpectedKind::YesNo,
            prompt: "Is the misfire on more than one cylinder?".to_string(),
        }),
        MisfirePhase::ClassifyMisfire => Some(PathQuestion {
            key: "misfire.classify_misfire",
            kind: ExpectedKind::Occurrence,
            prompt: format!(
                "When does the misfire on {} happen: all the time, intermittently, on cold start, at idle, or under load?",
                cyl
            ),
        }),
        MisfirePhase::ClassifyLoad => Some(PathQuestion {
            key: "misfire.classify_load",
            kind: ExpectedKind::Load,
            prompt: "Is it worse at idle, under load, or both?".to_string(),
        }),
        MisfirePhase::ComponentHistory => Some(PathQuestion {
            key: "misfire.component_history",
            kind: ExpectedKind::YesNo,
            prompt: format!(
                "Has an ignition component (coil, plug, or wire) on {} been replaced recently?",
                cyl
            ),
        }),
        MisfirePhase::ComponentSwapCheck => Some(PathQuestion {
            key: "misfire.component_swap",
            kind: ExpectedKind::YesNo,
            prompt: "Swap that component with another cylinder and re-scan. Did the misfire move with it?"
                .to_string(),
        }),
        MisfirePhase::CheckSpark => Some(PathQuestion {
            key: "misfire.check_spark",
            kind: ExpectedKind::YesNo,
            prompt: format!(
                "Check for spark on {} with a spark tester. Do you have spark?",
                cyl
            ),
        }),
        MisfirePhase::ConfirmedComponentFault | MisfirePhase::ComponentRuledOut => None,
    }
}

/// Applies one consumed answer: locks the derived fact and returns the new
/// phase. An answer of the wrong kind leaves the phase unchanged.
pub fn advance(
    phase: MisfirePhase,
    answer: ParsedAnswer,
    facts: &mut MisfireFacts,
) -> MisfirePhase {
    match (phase, answer) {
        (MisfirePhase::Start, ParsedAnswer::YesNo(multi)) => {
            facts.misfire_type.get_or_insert(if multi {
                MisfireType::Multiple
            } else {
                MisfireType::SingleCylinder
            });
            MisfirePhase::ClassifyMisfire
        }
        (MisfirePhase::ClassifyMisfire, ParsedAnswer::Occurrence(band)) => {
            facts.occurs_when.get_or_insert(band);
            MisfirePhase::ClassifyLoad
        }
        (MisfirePhase::ClassifyLoad, ParsedAnswer::Load(load)) => {
            facts.load.get_or_insert(load);
            MisfirePhase::ComponentHistory
        }
        (MisfirePhase::ComponentHistory, ParsedAnswer::YesNo(replaced)) => {
            facts.recent_ignition_work.get_or_insert(replaced);
            if replaced {
                MisfirePhase::ComponentSwapCheck
            } else {
                MisfirePhase::CheckSpark
            }
        }
        (MisfirePhase::ComponentSwapCheck, ParsedAnswer::YesNo(moved)) => {
            facts.swap_moved_misfire.get_or_insert(moved);
            if moved {
                MisfirePhase::ConfirmedComponentFault
            } else {
                MisfirePhase::ComponentRuledOut
            }
        }
        (MisfirePhase::CheckSpark, ParsedAnswer::YesNo(spark)) => {
            facts.spark_present.get_or_insert(spark);
            if spark {
                // Spark is good: the ignition side is ruled out.
                MisfirePhase::ComponentRuledOut
            } else {
                MisfirePhase::ConfirmedComponentFault
            }
        }
        _ => phase,
    }
}

/// Terminal summary for a finished path.
pub fn conclusion(phase: MisfirePhase, facts: &MisfireFacts) -> Option<(&'static str, String)> {
    let cyl = cylinder_phrase(facts);
    match phase {
        MisfirePhase::ConfirmedComponentFault => {
            let summary = if facts.spark_present == Some(false) {
                format!(
                    "No spark on {} confirms an ignition-side fault. Replace the coil for that cylinder and inspect its connector and wiring before retesting.",
                    cyl
                )
            } else {
                format!(
                    "The misfire followed the swapped component, so that part is confirmed faulty. Replace it on {} and clear the codes.",
                    cyl
                )
            };
            Some(("misfire.confirmed_component_fault", summary))
        }
        MisfirePhase::ComponentRuledOut => Some((
            "misfire.component_ruled_out",
            format!(
                "Ignition is ruled out on {}. Next verify the injector (listen for clicking, check resistance) and then run a compression test to rule out a mechanical cause.",
                cyl
            ),
        )),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::{LoadCondition, OccurrenceBand};

    fn prefilled_facts() -> MisfireFacts {
        MisfireFacts {
            misfire_type: Some(MisfireType::SingleCylinder),
            cylinder: Some(2),
            ..Default::default()
        }
    }

    #[test]
    fn test_entry_skips_type_question_when_prefilled() {
        assert_eq!(entry_phase(&prefilled_facts()), MisfirePhase::ClassifyMisfire);
        assert_eq!(entry_phase(&MisfireFacts::default()), MisfirePhase::Start);
    }

    #[test]
    fn test_canonical_walk_reaches_terminal_in_four_answers() {
        let mut facts = prefilled_facts();
        let mut phase = entry_phase(&facts);

        phase = advance(phase, ParsedAnswer::Occurrence(OccurrenceBand::Idle), &mut facts);
        assert_eq!(phase, MisfirePhase::ClassifyLoad);

        phase = advance(phase, ParsedAnswer::Load(LoadCondition::Both), &mut facts);
        assert_eq!(phase, MisfirePhase::ComponentHistory);

        phase = advance(phase, ParsedAnswer::YesNo(false), &mut facts);
        assert_eq!(phase, MisfirePhase::CheckSpark);

        phase = advance(phase, ParsedAnswer::YesNo(true), &mut facts);
        assert!(phase.is_terminal());
        assert_eq!(phase, MisfirePhase::ComponentRuledOut);
        assert_eq!(facts.load, Some(LoadCondition::Both));
        assert_eq!(facts.spark_present, Some(true));
    }

    #[test]
    fn test_swap_branch_terminals() {
        let mut facts = prefilled_facts();
        let mut phase = MisfirePhase::ComponentHistory;

        phase = advance(phase, ParsedAnswer::YesNo(true), &mut facts);
        assert_eq!(phase, MisfirePhase::ComponentSwapCheck);

        let moved = advance(phase, ParsedAnswer::YesNo(true), &mut facts.clone());
        assert_eq!(moved, MisfirePhase::ConfirmedComponentFault);

        let stayed = advance(phase, ParsedAnswer::YesNo(false), &mut facts);
        assert_eq!(stayed, MisfirePhase::ComponentRuledOut);
    }

    #[test]
    fn test_wrong_answer_kind_does_not_advance() {
        let mut facts = prefilled_facts();
        let phase = advance(
            MisfirePhase::ClassifyLoad,
            ParsedAnswer::YesNo(true),
            &mut facts,
        );
        assert_eq!(phase, MisfirePhase::ClassifyLoad);
        assert_eq!(facts.load, None);
    }

    #[test]
    fn test_skip_locked_jumps_established_facts() {
        let mut facts = prefilled_facts();
        facts.occurs_when = Some(OccurrenceBand::Idle);
        assert_eq!(
            skip_locked(MisfirePhase::Start, &facts),
            MisfirePhase::ClassifyLoad
        );
    }

    #[test]
    fn test_every_phase_has_question_or_conclusion() {
        let facts = prefilled_facts();
        for phase in [
            MisfirePhase::Start,
            MisfirePhase::ClassifyMisfire,
            MisfirePhase::ClassifyLoad,
            MisfirePhase::ComponentHistory,
            MisfirePhase::ComponentSwapCheck,
            MisfirePhase::CheckSpark,
            MisfirePhase::ConfirmedComponentFault,
            MisfirePhase::ComponentRuledOut,
        ] {
            let has_question = question(phase, &facts).is_some();
            let has_conclusion = conclusion(phase, &facts).is_some();
            assert!(has_question ^ has_conclusion, "phase {:?}", phase);
        }
    }
}
