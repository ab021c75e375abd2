//! Domain classification.
//!
//! A domain is one of a closed set of vehicle subsystems used to route the
//! conversation. Classification runs once per session through a
//! set-if-unset guard; an active session is never reclassified, so a stray
//! keyword for another subsystem cannot cause mid-conversation drift.

use crate::code::{CodeFamily, TroubleCode};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Closed enumeration of conversation domains.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Domain {
    EngineDrivability,
    StartingCharging,
    Cooling,
    Evap,
    Network,
    BrakesAbs,
    Transmission,
    Hvac,
    DieselEmissions,
    SteeringSuspension,
    HybridEv,
    BodyElectrical,
    SrsAirbag,
    Tpms,
    Adas,
    Unknown,
}

/// One keyword cluster in the classifier's priority ladder.
struct KeywordRule {
    domain: Domain,
    keywords: &'static [&'static str],
}

/// Keyword clusters checked in priority order. Specific subsystems come
/// before generic drivability so that e.g. an EVAP phrase is not shadowed
/// by "check engine".
const KEYWORD_RULES: &[KeywordRule] = &[
    KeywordRule {
        domain: Domain::SrsAirbag,
        keywords: &["airbag", "srs", "seat belt pretensioner"],
    },
    KeywordRule {
        domain: Domain::Evap,
        keywords: &["evap", "gas cap", "fuel cap", "purge valve", "vent valve", "charcoal canister"],
    },
    KeywordRule {
        domain: Domain::StartingCharging,
        keywords: &[
            "won't start",
            "wont start",
            "no start",
            "no crank",
            "battery light",
            "alternator",
            "clicking when i turn the key",
            "dead battery",
        ],
    },
    KeywordRule {
        domain: Domain::Cooling,
        keywords: &["overheat", "coolant", "radiator", "thermostat", "running hot"],
    },
    KeywordRule {
        domain: Domain::HybridEv,
        keywords: &["hybrid battery", "high voltage", "orange cable", "ev battery", "traction battery"],
    },
    KeywordRule {
        domain: Domain::DieselEmissions,
        keywords: &["dpf", "def ", "regen", "diesel particulate", "adblue", "scr "],
    },
    KeywordRule {
        domain: Domain::Network,
        keywords: &["no communication", "lost communication", "can bus", "all warning lights", "scanner won't connect"],
    },
    KeywordRule {
        domain: Domain::BrakesAbs,
        keywords: &["abs light", "brake pedal", "brakes grinding", "wheel speed sensor", "traction control light"],
    },
    KeywordRule {
        domain: Domain::Transmission,
        keywords: &["shifting", "slipping", "won't shift", "torque converter", "transmission"],
    },
    KeywordRule {
        domain: Domain::Tpms,
        keywords: &["tpms", "tire pressure light", "tire pressure sensor"],
    },
    KeywordRule {
        domain: Domain::Adas,
        keywords: &["lane keep", "adaptive cruise", "forward collision", "blind spot", "radar sensor", "camera calibration"],
    },
    KeywordRule {
        domain: Domain::SteeringSuspension,
        keywords: &["power steering", "steering wheel shake", "clunk over bumps", "ball joint", "strut"],
    },
    KeywordRule {
        domain: Domain::Hvac,
        keywords: &["a/c not cold", "ac not cold", "blower motor", "no heat", "compressor not engaging"],
    },
    KeywordRule {
        domain: Domain::BodyElectrical,
        keywords: &["power window", "door lock", "interior lights", "key fob", "wiper motor"],
    },
];

/// Generic drivability fallback signals. Any of these (or any P-code)
/// classifies as `EngineDrivability` when nothing more specific matched.
const DRIVABILITY_KEYWORDS: &[&str] = &[
    "misfire",
    "check engine",
    "rough idle",
    "hesitation",
    "stalling",
    "stall",
    "runs rough",
    "lean",
    "lack of power",
    "shaking",
];

/// Maps a message plus the session's known codes to one domain tag.
///
/// Resolution order: code-family signals, then the keyword ladder, then
/// the drivability fallback, else [`Domain::Unknown`]. Callers apply the
/// result through the session's set-if-unset guard.
pub fn classify(text: &str, codes: &[TroubleCode]) -> Domain {
    for code in codes {
        match code.family() {
            CodeFamily::Network => return Domain::Network,
            CodeFamily::Chassis => return Domain::BrakesAbs,
            CodeFamily::Body => return Domain::BodyElectrical,
            CodeFamily::Powertrain => {}
        }
    }

    let lower = text.to_lowercase();
    for rule in KEYWORD_RULES {
        if rule.keywords.iter().any(|k| lower.contains(k)) {
            return rule.domain;
        }
    }

    let has_p_code = codes
        .iter()
        .any(|c| c.family() == CodeFamily::Powertrain);
    if has_p_code || DRIVABILITY_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return Domain::EngineDrivability;
    }

    Domain::Unknown
}
