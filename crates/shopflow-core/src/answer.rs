//! Fixed-vocabulary answer parsers.
//!
//! Every pending question declares an [`ExpectedKind`]; the matching parser
//! here is the only thing allowed to turn a user reply into a locked fact.
//! Parsers are keyword ladders over lowercased text and return `None` for
//! anything outside the vocabulary, which leaves the question outstanding.

use crate::facts::{CrankType, LoadCondition, NetworkScope, OccurrenceBand, TemperatureBand};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// The kind of answer a pending question is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ExpectedKind {
    YesNo,
    Occurrence,
    Load,
    NetworkScope,
    Temperature,
    Crank,
}

/// A successfully parsed answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedAnswer {
    YesNo(bool),
    Occurrence(OccurrenceBand),
    Load(LoadCondition),
    NetworkScope(NetworkScope),
    Temperature(TemperatureBand),
    Crank(CrankType),
}

/// Parses a reply against the expected vocabulary.
///
/// Returns `None` on anything unparseable; the caller must re-prompt, never
/// guess.
pub fn parse_answer(kind: ExpectedKind, text: &str) -> Option<ParsedAnswer> {
    let lower = text.trim().to_lowercase();
    match kind {
        ExpectedKind::YesNo => parse_yes_no(&lower).map(ParsedAnswer::YesNo),
        ExpectedKind::Occurrence => parse_occurrence(&lower).map(ParsedAnswer::Occurrence),
        ExpectedKind::Load => parse_load(&lower).map(ParsedAnswer::Load),
        ExpectedKind::NetworkScope => parse_scope(&lower).map(ParsedAnswer::NetworkScope),
        ExpectedKind::Temperature => parse_temperature(&lower).map(ParsedAnswer::Temperature),
        ExpectedKind::Crank => parse_crank(&lower).map(ParsedAnswer::Crank),
    }
}

/// Short description of the vocabulary a kind accepts, used when
/// re-prompting after an unparseable reply.
pub fn vocabulary_hint(kind: ExpectedKind) -> &'static str {
    match kind {
        ExpectedKind::YesNo => "yes or no",
        ExpectedKind::Occurrence => {
            "all the time, intermittent, cold start, at idle, or under load"
        }
        ExpectedKind::Load => "at idle, under load, or both",
        ExpectedKind::NetworkScope => "one module or multiple modules",
        ExpectedKind::Temperature => "cold, normal, or hot",
        ExpectedKind::Crank => "no crank, cranks but won't start, or starts then stalls",
    }
}

fn parse_yes_no(lower: &str) -> Option<bool> {
    const YES: &[&str] = &["yes", "yeah", "yep", "yup", "correct", "it did", "i did", "sure"];
    const NO: &[&str] = &["no", "nope", "nah", "it didn't", "i didn't", "negative", "not really"];

    // Whole-word match first so "nozzle" or "yesterday" don't count.
    let first = lower.split_whitespace().next().unwrap_or("");
    let first = first.trim_matches(|c: char| !c.is_ascii_alphanumeric() && c != '\'');
    if YES.contains(&first) {
        return Some(true);
    }
    if NO.contains(&first) {
        return Some(false);
    }
    if YES.iter().any(|y| lower == *y) || lower.starts_with("yes,") {
        return Some(true);
    }
    if NO.iter().any(|n| lower == *n) || lower.starts_with("no,") {
        return Some(false);
    }
    None
}

fn parse_occurrence(lower: &str) -> Option<OccurrenceBand> {
    if lower.contains("all the time") || lower.contains("always") || lower.contains("constant") {
        Some(OccurrenceBand::Constant)
    } else if lower.contains("intermittent")
        || lower.contains("sometimes")
        || lower.contains("comes and goes")
        || lower.contains("off and on")
    {
        Some(OccurrenceBand::Intermittent)
    } else if lower.contains("cold") || lower.contains("first start") || lower.contains("morning") {
        Some(OccurrenceBand::ColdStart)
    } else if lower.contains("idle") || lower.contains("stopped") || lower.contains("at a light") {
        Some(OccurrenceBand::Idle)
    } else if lower.contains("load")
        || lower.contains("accel")
        || lower.contains("highway")
        || lower.contains("uphill")
        || lower.contains("towing")
    {
        Some(OccurrenceBand::UnderLoad)
    } else {
        None
    }
}

fn parse_load(lower: &str) -> Option<LoadCondition> {
    // "both" must win over the individual bands it names.
    if lower.contains("both") || lower.contains("either") || lower.contains("all the time") {
        Some(LoadCondition::Both)
    } else if lower.contains("idle") || lower.contains("stopped") || lower.contains("in park") {
        Some(LoadCondition::Idle)
    } else if lower.contains("load")
        || lower.contains("accel")
        || lower.contains("driving")
        || lower.contains("highway")
    {
        Some(LoadCondition::UnderLoad)
    } else {
        None
    }
}

fn parse_scope(lower: &str) -> Option<NetworkScope> {
    if lower.contains("multiple")
        || lower.contains("all of them")
        || lower.contains("all modules")
        || lower.contains("several")
        || lower.contains("every module")
    {
        Some(NetworkScope::MultipleModules)
    } else if lower.contains("one") || lower.contains("single") || lower.contains("just the") {
        Some(NetworkScope::SingleModule)
    } else {
        None
    }
}

fn parse_temperature(lower: &str) -> Option<TemperatureBand> {
    if lower.contains("hot") || lower.contains("overheat") || lower.contains("red") {
        Some(TemperatureBand::Hot)
    } else if lower.contains("cold") || lower.contains("low") || lower.contains("never warms") {
        Some(TemperatureBand::Cold)
    } else if lower.contains("normal") || lower.contains("middle") || lower.contains("fine") {
        Some(TemperatureBand::Normal)
    } else {
        None
    }
}

fn parse_crank(lower: &str) -> Option<CrankType> {
    if lower.contains("no crank")
        || lower.contains("doesn't crank")
        || lower.contains("doesn't turn over")
        || lower.contains("nothing happens")
        || lower.contains("just clicks")
    {
        Some(CrankType::NoCrank)
    } else if lower.contains("stall") || lower.contains("dies right away") {
        Some(CrankType::StartsThenStalls)
    } else if lower.contains("cranks") || lower.contains("turns over") {
        Some(CrankType::CranksNoStart)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yes_no_whole_word() {
        assert_eq!(
            parse_answer(ExpectedKind::YesNo, "Yes, last month"),
            Some(ParsedAnswer::YesNo(true))
        );
        assert_eq!(
            parse_answer(ExpectedKind::YesNo, "nope"),
            Some(ParsedAnswer::YesNo(false))
        );
        // "nozzle" must not parse as "no".
        assert_eq!(parse_answer(ExpectedKind::YesNo, "nozzle is clogged"), None);
        assert_eq!(parse_answer(ExpectedKind::YesNo, "maybe"), None);
    }

    #[test]
    fn test_occurrence_bands() {
        assert_eq!(
            parse_answer(ExpectedKind::Occurrence, "mostly at idle"),
            Some(ParsedAnswer::Occurrence(OccurrenceBand::Idle))
        );
        assert_eq!(
            parse_answer(ExpectedKind::Occurrence, "it comes and goes"),
            Some(ParsedAnswer::Occurrence(OccurrenceBand::Intermittent))
        );
        assert_eq!(parse_answer(ExpectedKind::Occurrence, "dunno"), None);
    }

    #[test]
    fn test_load_both_wins() {
        assert_eq!(
            parse_answer(ExpectedKind::Load, "both idle and under load"),
            Some(ParsedAnswer::Load(LoadCondition::Both))
        );
        assert_eq!(
            parse_answer(ExpectedKind::Load, "worse when accelerating"),
            Some(ParsedAnswer::Load(LoadCondition::UnderLoad))
        );
    }

    #[test]
    fn test_network_scope_vocabulary() {
        assert_eq!(
            parse_answer(ExpectedKind::NetworkScope, "several of them are dead"),
            Some(ParsedAnswer::NetworkScope(NetworkScope::MultipleModules))
        );
        assert_eq!(
            parse_answer(ExpectedKind::NetworkScope, "just the body module"),
            Some(ParsedAnswer::NetworkScope(NetworkScope::SingleModule))
        );
        assert_eq!(parse_answer(ExpectedKind::NetworkScope, "not sure"), None);
    }

    #[test]
    fn test_temperature_vocabulary() {
        assert_eq!(
            parse_answer(ExpectedKind::Temperature, "pegged in the red, overheating"),
            Some(ParsedAnswer::Temperature(TemperatureBand::Hot))
        );
        assert_eq!(
            parse_answer(ExpectedKind::Temperature, "it never warms up"),
            Some(ParsedAnswer::Temperature(TemperatureBand::Cold))
        );
        assert_eq!(
            parse_answer(ExpectedKind::Temperature, "sits right in the middle"),
            Some(ParsedAnswer::Temperature(TemperatureBand::Normal))
        );
        assert_eq!(parse_answer(ExpectedKind::Temperature, "dunno"), None);
    }

    #[test]
    fn test_crank_vocabulary() {
        assert_eq!(
            parse_answer(ExpectedKind::Crank, "it just clicks"),
            Some(ParsedAnswer::Crank(CrankType::NoCrank))
        );
        assert_eq!(
            parse_answer(ExpectedKind::Crank, "cranks fine but won't fire"),
            Some(ParsedAnswer::Crank(CrankType::CranksNoStart))
        );
    }

    #[test]
    fn test_vocabulary_hint_is_stable() {
        assert_eq!(vocabulary_hint(ExpectedKind::YesNo), "yes or no");
    }
}
