//! Generic per-domain test ladders.
//!
//! For domains without a deterministic path, the conversation walks an
//! ordered list of "next obvious test" steps. Each step is a yes/no
//! question keyed for the anti-repeat gate and annotated with the access
//! tier it requires, which is what the tier escalator jumps on.

use crate::answer::ExpectedKind;
use crate::domain::Domain;
use crate::tier::AccessTier;

/// One step in a domain's generic test ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateStep {
    /// Stable question key, e.g. `"evap.check_gas_cap"`.
    pub key: &'static str,
    /// The question to put to the user.
    pub prompt: &'static str,
    /// Vocabulary the answer is parsed against.
    pub kind: ExpectedKind,
    /// Physical access required to perform this step.
    pub tier: AccessTier,
}

const ENGINE_LADDER: &[TemplateStep] = &[
    TemplateStep {
        key: "engine.freeze_frame",
        prompt: "Pull the freeze-frame data for the code. Does it show the fault happening at low RPM?",
        kind: ExpectedKind::YesNo,
        tier: AccessTier::Scan,
    },
    TemplateStep {
        key: "engine.visual_vacuum",
        prompt: "With the engine idling, listen and look for cracked or disconnected vacuum lines. Did you find any?",
        kind: ExpectedKind::YesNo,
        tier: AccessTier::EngineBay,
    },
    TemplateStep {
        key: "engine.plugs_inspect",
        prompt: "Pull the spark plugs you can reach and inspect them. Do any look fouled or worn?",
        kind: ExpectedKind::YesNo,
        tier: AccessTier::EngineBay,
    },
    TemplateStep {
        key: "engine.smoke_test",
        prompt: "Run a smoke test on the intake with the air box removed. Does smoke escape anywhere?",
        kind: ExpectedKind::YesNo,
        tier: AccessTier::ModerateTeardown,
    },
    TemplateStep {
        key: "engine.compression_test",
        prompt: "Run a compression test on the suspect cylinders. Is any cylinder more than 10% low?",
        kind: ExpectedKind::YesNo,
        tier: AccessTier::MajorLabor,
    },
];

const EVAP_LADDER: &[TemplateStep] = &[
    TemplateStep {
        key: "evap.check_gas_cap",
        prompt: "Check the gas cap: is it clicking tight with an undamaged seal?",
        kind: ExpectedKind::YesNo,
        tier: AccessTier::Scan,
    },
    TemplateStep {
        key: "evap.purge_valve",
        prompt: "With the engine off, pull the purge valve and try to blow through it. Does it hold vacuum?",
        kind: ExpectedKind::YesNo,
        tier: AccessTier::EngineBay,
    },
    TemplateStep {
        key: "evap.smoke_test",
        prompt: "Smoke-test the EVAP system at the service port. Do you see smoke escaping from any line?",
        kind: ExpectedKind::YesNo,
        tier: AccessTier::ModerateTeardown,
    },
    TemplateStep {
        key: "evap.tank_inspect",
        prompt: "Inspect the tank-top vent valve and filler neck for leaks. Is anything cracked or rusted through?",
        kind: ExpectedKind::YesNo,
        tier: AccessTier::MajorLabor,
    },
];

const STARTING_LADDER: &[TemplateStep] = &[
    TemplateStep {
        key: "starting.crank_behavior",
        prompt: "When you try to start it, does the engine not crank at all, crank but not start, or start and then stall?",
        kind: ExpectedKind::Crank,
        tier: AccessTier::Scan,
    },
    TemplateStep {
        key: "starting.battery_voltage",
        prompt: "Measure battery voltage with everything off. Is it above 12.4 volts?",
        kind: ExpectedKind::YesNo,
        tier: AccessTier::Scan,
    },
    TemplateStep {
        key: "starting.terminal_check",
        prompt: "Check the battery terminals and ground strap for corrosion or looseness. Are they clean and tight?",
        kind: ExpectedKind::YesNo,
        tier: AccessTier::EngineBay,
    },
    TemplateStep {
        key: "starting.charging_output",
        prompt: "With the engine running, is charging voltage between 13.5 and 14.8 volts?",
        kind: ExpectedKind::YesNo,
        tier: AccessTier::EngineBay,
    },
    TemplateStep {
        key: "starting.starter_signal",
        prompt: "Back-probe the starter solenoid signal wire while a helper cranks. Do you see battery voltage?",
        kind: ExpectedKind::YesNo,
        tier: AccessTier::ModerateTeardown,
    },
];

const COOLING_LADDER: &[TemplateStep] = &[
    TemplateStep {
        key: "cooling.gauge_reading",
        prompt: "Where does the temperature gauge sit when the problem shows up: cold, normal, or hot?",
        kind: ExpectedKind::Temperature,
        tier: AccessTier::Scan,
    },
    TemplateStep {
        key: "cooling.level_cold",
        prompt: "With the engine fully cold, is the coolant level between the marks?",
        kind: ExpectedKind::YesNo,
        tier: AccessTier::EngineBay,
    },
    TemplateStep {
        key: "cooling.fan_operation",
        prompt: "Let it idle to operating temperature. Does the cooling fan come on?",
        kind: ExpectedKind::YesNo,
        tier: AccessTier::EngineBay,
    },
    TemplateStep {
        key: "cooling.thermostat_flow",
        prompt: "Feel the upper radiator hose once warm. Does it get hot, showing the thermostat opened?",
        kind: ExpectedKind::YesNo,
        tier: AccessTier::EngineBay,
    },
    TemplateStep {
        key: "cooling.pressure_test",
        prompt: "Pressure-test the cooling system to cap pressure. Does it hold for ten minutes?",
        kind: ExpectedKind::YesNo,
        tier: AccessTier::ModerateTeardown,
    },
];

const NETWORK_LADDER: &[TemplateStep] = &[
    TemplateStep {
        key: "network.scan_all_modules",
        prompt: "Run a full-system scan. Is just one module failing to respond, or multiple modules?",
        kind: ExpectedKind::NetworkScope,
        tier: AccessTier::Scan,
    },
    TemplateStep {
        key: "network.battery_supply",
        prompt: "Check battery voltage and the main fuses feeding the affected module. Are they good?",
        kind: ExpectedKind::YesNo,
        tier: AccessTier::EngineBay,
    },
    TemplateStep {
        key: "network.can_resistance",
        prompt: "Key off, measure resistance across CAN high and low at the DLC. Do you read about 60 ohms?",
        kind: ExpectedKind::YesNo,
        tier: AccessTier::Scan,
    },
    TemplateStep {
        key: "network.connector_inspect",
        prompt: "Unplug and inspect the affected module's connector for corrosion or bent pins. Does it look clean?",
        kind: ExpectedKind::YesNo,
        tier: AccessTier::ModerateTeardown,
    },
];

const BRAKES_LADDER: &[TemplateStep] = &[
    TemplateStep {
        key: "brakes.scan_wheel_speeds",
        prompt: "Watch live wheel-speed data while rolling slowly. Do all four sensors read the same?",
        kind: ExpectedKind::YesNo,
        tier: AccessTier::Scan,
    },
    TemplateStep {
        key: "brakes.fluid_level",
        prompt: "Is the brake fluid at the full mark with no leaks around the master cylinder?",
        kind: ExpectedKind::YesNo,
        tier: AccessTier::EngineBay,
    },
    TemplateStep {
        key: "brakes.sensor_inspect",
        prompt: "Pull the wheel on the suspect corner and inspect the sensor and tone ring. Any damage or debris?",
        kind: ExpectedKind::YesNo,
        tier: AccessTier::ModerateTeardown,
    },
];

/// Fallback for domains without a dedicated ladder.
const GENERIC_LADDER: &[TemplateStep] = &[
    TemplateStep {
        key: "generic.full_scan",
        prompt: "Run a full-system scan and note every stored code. Are there codes in more than one module?",
        kind: ExpectedKind::YesNo,
        tier: AccessTier::Scan,
    },
    TemplateStep {
        key: "generic.visual_inspect",
        prompt: "Do a visual inspection around the affected area for damage, leaks, or disconnected wiring. Did you find anything?",
        kind: ExpectedKind::YesNo,
        tier: AccessTier::EngineBay,
    },
];

/// Returns the ordered test ladder for a domain.
pub fn ladder(domain: Domain) -> &'static [TemplateStep] {
    match domain {
        Domain::EngineDrivability => ENGINE_LADDER,
        Domain::Evap => EVAP_LADDER,
        Domain::StartingCharging => STARTING_LADDER,
        Domain::Cooling => COOLING_LADDER,
        Domain::Network => NETWORK_LADDER,
        Domain::BrakesAbs => BRAKES_LADDER,
        _ => GENERIC_LADDER,
    }
}

/// Index of the first step at or above `tier`, if the ladder has one.
///
/// This is where the tier escalator lands after an inaccessible reply.
pub fn first_step_at_tier(domain: Domain, tier: AccessTier) -> Option<usize> {
    ladder(domain).iter().position(|s| s.tier >= tier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_ladder_has_unique_keys() {
        use std::collections::HashSet;
        let mut keys = HashSet::new();
        for domain in [
            Domain::EngineDrivability,
            Domain::Evap,
            Domain::StartingCharging,
            Domain::Cooling,
            Domain::Network,
            Domain::BrakesAbs,
            Domain::Unknown,
        ] {
            for step in ladder(domain) {
                assert!(keys.insert(step.key), "duplicate step key: {}", step.key);
            }
        }
    }

    #[test]
    fn test_step_kinds_match_their_vocabulary() {
        assert_eq!(ladder(Domain::Network)[0].kind, ExpectedKind::NetworkScope);
        assert_eq!(ladder(Domain::StartingCharging)[0].kind, ExpectedKind::Crank);
        assert_eq!(ladder(Domain::Cooling)[0].kind, ExpectedKind::Temperature);
        assert!(
            ladder(Domain::Evap)
                .iter()
                .all(|s| s.kind == ExpectedKind::YesNo)
        );
    }

    #[test]
    fn test_unlisted_domain_gets_generic_ladder() {
        assert_eq!(ladder(Domain::Hvac)[0].key, "generic.full_scan");
    }

    #[test]
    fn test_first_step_at_tier() {
        let idx = first_step_at_tier(Domain::Evap, AccessTier::ModerateTeardown).unwrap();
        assert_eq!(ladder(Domain::Evap)[idx].key, "evap.smoke_test");
        // Brakes ladder tops out at moderate teardown.
        assert_eq!(
            first_step_at_tier(Domain::BrakesAbs, AccessTier::MajorLabor),
            None
        );
    }
}
