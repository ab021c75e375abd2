//! Locked classification facts and the fact extractor.
//!
//! Facts are fixed-vocabulary values established from trouble codes,
//! keyword clusters, or consumed answers. A fact, once locked, is never
//! overwritten and never asked for again; every merge here is therefore
//! set-if-unset, which also makes extraction idempotent.

use crate::code::{CodeFamily, TroubleCode};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Single-cylinder vs. random/multiple misfire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MisfireType {
    SingleCylinder,
    Multiple,
}

/// When a symptom occurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OccurrenceBand {
    Constant,
    Intermittent,
    ColdStart,
    Idle,
    UnderLoad,
}

/// Whether a symptom is worse at idle, under load, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LoadCondition {
    Idle,
    UnderLoad,
    Both,
}

/// Which bank(s) report a lean condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LeanBanks {
    Bank1,
    Bank2,
    Both,
}

/// EVAP leak size class, mostly derivable from the code itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EvapLeakClass {
    VerySmall,
    Small,
    Large,
    General,
}

/// Single-module vs. multiple-module communication loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NetworkScope {
    SingleModule,
    MultipleModules,
}

/// Coolant temperature band for cooling-system questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TemperatureBand {
    Cold,
    Normal,
    Hot,
}

/// How the engine behaves when starting is attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CrankType {
    NoCrank,
    CranksNoStart,
    StartsThenStalls,
}

/// Locked misfire facts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MisfireFacts {
    pub misfire_type: Option<MisfireType>,
    pub cylinder: Option<u8>,
    /// When the misfire occurs (answer to the classify question).
    pub occurs_when: Option<OccurrenceBand>,
    /// Worse at idle, under load, or both.
    pub load: Option<LoadCondition>,
    /// Whether an ignition component was recently replaced on the cylinder.
    pub recent_ignition_work: Option<bool>,
    /// Whether swapping the component moved the misfire.
    pub swap_moved_misfire: Option<bool>,
    /// Whether spark is present on the affected cylinder.
    pub spark_present: Option<bool>,
}

/// Locked lean-condition facts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeanFacts {
    pub banks: Option<LeanBanks>,
    pub band: Option<OccurrenceBand>,
}

/// Locked EVAP facts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvapFacts {
    pub leak_class: Option<EvapLeakClass>,
    /// Gas cap seated and in good condition, per the user.
    pub basics_verified: Option<bool>,
}

/// Locked network facts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkFacts {
    pub scope: Option<NetworkScope>,
}

/// Locked starting/charging facts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartingFacts {
    pub crank: Option<CrankType>,
}

/// Locked cooling facts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoolingFacts {
    /// Temperature gauge reading when the symptom shows up.
    pub temperature: Option<TemperatureBand>,
}

/// Per-domain bag of locked facts carried by the session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    #[serde(default)]
    pub misfire: MisfireFacts,
    #[serde(default)]
    pub lean: LeanFacts,
    #[serde(default)]
    pub evap: EvapFacts,
    #[serde(default)]
    pub network: NetworkFacts,
    #[serde(default)]
    pub starting: StartingFacts,
    #[serde(default)]
    pub cooling: CoolingFacts,
}

/// Sets `$field` only when it is currently `None`.
macro_rules! lock {
    ($field:expr, $value:expr) => {
        if $field.is_none() {
            $field = Some($value);
        }
    };
}

static CYLINDER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bcyl(?:inder)?\s*#?\s*([1-9]|1[0-2])\b").expect("cylinder pattern is valid")
});

/// Extracts and locks classification facts from one message.
///
/// Running this twice over the same message yields identical state: every
/// write goes through the lock-once merge, so established facts survive
/// any later phrasing that would contradict them.
pub fn extract_facts(text: &str, codes: &[TroubleCode], facts: &mut Classification) {
    let lower = text.to_lowercase();

    extract_misfire(&lower, codes, &mut facts.misfire);
    extract_lean(&lower, codes, &mut facts.lean);
    extract_evap(&lower, codes, &mut facts.evap);
    extract_network(&lower, codes, &mut facts.network);
}

fn extract_misfire(lower: &str, codes: &[TroubleCode], facts: &mut MisfireFacts) {
    let misfire_codes: Vec<&TroubleCode> = codes.iter().filter(|c| c.is_misfire()).collect();

    // Code-range mapping first: P0300 (or several P030X codes) is a
    // multiple misfire, a lone P0301..P0312 names the cylinder.
    if misfire_codes.len() > 1 || misfire_codes.iter().any(|c| c.number() == 300) {
        lock!(facts.misfire_type, MisfireType::Multiple);
    } else if let Some(code) = misfire_codes.first() {
        lock!(facts.misfire_type, MisfireType::SingleCylinder);
        if let Some(cyl) = code.misfire_cylinder() {
            lock!(facts.cylinder, cyl);
        }
    }

    if lower.contains("multiple cylinder")
        || lower.contains("all cylinders")
        || lower.contains("random misfire")
    {
        lock!(facts.misfire_type, MisfireType::Multiple);
    }
    if let Some(caps) = CYLINDER_PATTERN.captures(lower) {
        if let Ok(cyl) = caps[1].parse::<u8>() {
            lock!(facts.misfire_type, MisfireType::SingleCylinder);
            lock!(facts.cylinder, cyl);
        }
    }
}

fn extract_lean(lower: &str, codes: &[TroubleCode], facts: &mut LeanFacts) {
    let bank1 = codes.iter().any(|c| c.number() == 171 && c.is_lean());
    let bank2 = codes.iter().any(|c| c.number() == 174 && c.is_lean());
    match (bank1, bank2) {
        (true, true) => lock!(facts.banks, LeanBanks::Both),
        (true, false) => lock!(facts.banks, LeanBanks::Bank1),
        (false, true) => lock!(facts.banks, LeanBanks::Bank2),
        (false, false) => {}
    }

    if lower.contains("both banks") {
        lock!(facts.banks, LeanBanks::Both);
    } else if lower.contains("bank 1") {
        lock!(facts.banks, LeanBanks::Bank1);
    } else if lower.contains("bank 2") {
        lock!(facts.banks, LeanBanks::Bank2);
    }
}

fn extract_evap(lower: &str, codes: &[TroubleCode], facts: &mut EvapFacts) {
    for code in codes.iter().filter(|c| c.is_evap()) {
        let class = match code.number() {
            456 => EvapLeakClass::VerySmall,
            442 => EvapLeakClass::Small,
            455 | 457 => EvapLeakClass::Large,
            _ => EvapLeakClass::General,
        };
        lock!(facts.leak_class, class);
    }

    if lower.contains("large leak") || lower.contains("gross leak") {
        lock!(facts.leak_class, EvapLeakClass::Large);
    } else if lower.contains("small leak") {
        lock!(facts.leak_class, EvapLeakClass::Small);
    }

    if lower.contains("gas cap is tight")
        || lower.contains("cap is new")
        || lower.contains("already checked the cap")
    {
        lock!(facts.basics_verified, true);
    }
}

fn extract_network(lower: &str, codes: &[TroubleCode], facts: &mut NetworkFacts) {
    let u_codes = codes
        .iter()
        .filter(|c| c.family() == CodeFamily::Network)
        .count();
    if u_codes > 1 {
        lock!(facts.scope, NetworkScope::MultipleModules);
    }

    if lower.contains("all modules")
        || lower.contains("multiple modules")
        || lower.contains("every module")
    {
        lock!(facts.scope, NetworkScope::MultipleModules);
    } else if lower.contains("one module") || lower.contains("single module") {
        lock!(facts.scope, NetworkScope::SingleModule);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::extract_codes;

    #[test]
    fn test_single_cylinder_from_code() {
        let msg = "P0302 misfire";
        let codes = extract_codes(msg);
        let mut facts = Classification::default();
        extract_facts(msg, &codes, &mut facts);

        assert_eq!(facts.misfire.misfire_type, Some(MisfireType::SingleCylinder));
        assert_eq!(facts.misfire.cylinder, Some(2));
    }

    #[test]
    fn test_multiple_misfire_from_p0300() {
        let msg = "got a P0300";
        let codes = extract_codes(msg);
        let mut facts = Classification::default();
        extract_facts(msg, &codes, &mut facts);

        assert_eq!(facts.misfire.misfire_type, Some(MisfireType::Multiple));
        assert_eq!(facts.misfire.cylinder, None);
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let msg = "P0302 and P0171, misfire on cylinder 2";
        let codes = extract_codes(msg);
        let mut facts = Classification::default();
        extract_facts(msg, &codes, &mut facts);
        let first = facts.clone();
        extract_facts(msg, &codes, &mut facts);

        assert_eq!(facts, first);
    }

    #[test]
    fn test_locked_fact_not_overwritten() {
        let mut facts = Classification::default();
        let codes = extract_codes("P0302");
        extract_facts("P0302", &codes, &mut facts);
        assert_eq!(facts.misfire.cylinder, Some(2));

        // A later message naming another cylinder must not unlock it.
        extract_facts("actually cylinder 5", &[], &mut facts);
        assert_eq!(facts.misfire.cylinder, Some(2));
    }

    #[test]
    fn test_lean_both_banks_from_codes() {
        let msg = "P0171 P0174 lean";
        let codes = extract_codes(msg);
        let mut facts = Classification::default();
        extract_facts(msg, &codes, &mut facts);

        assert_eq!(facts.lean.banks, Some(LeanBanks::Both));
    }

    #[test]
    fn test_evap_leak_class_from_code() {
        let msg = "P0456 code on a Camry";
        let codes = extract_codes(msg);
        let mut facts = Classification::default();
        extract_facts(msg, &codes, &mut facts);

        assert_eq!(facts.evap.leak_class, Some(EvapLeakClass::VerySmall));
    }

    #[test]
    fn test_network_scope_from_multiple_u_codes() {
        let msg = "U0100 U0121 no communication";
        let codes = extract_codes(msg);
        let mut facts = Classification::default();
        extract_facts(msg, &codes, &mut facts);

        assert_eq!(facts.network.scope, Some(NetworkScope::MultipleModules));
    }
}
