//! Make/model-conditioned overlay prompts.
//!
//! An overlay injects a vendor-specific bias question ahead of a generic
//! ladder step: "this platform is known for X, have you ruled it out?".
//! Each overlay fires at most once per session, tracked by its id, and the
//! ladder step it shadows is withheld until the overlay is answered.
//! Overlays never interrupt a deterministic path.

use crate::domain::Domain;
use crate::facts::{Classification, EvapLeakClass, MisfireType};
use crate::vehicle::Vehicle;
use std::collections::HashSet;

/// Fact precondition an overlay can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayCondition {
    Always,
    SingleCylinderMisfire,
    MultipleMisfire,
    SmallEvapLeak,
}

impl OverlayCondition {
    pub fn matches(&self, facts: &Classification) -> bool {
        match self {
            Self::Always => true,
            Self::SingleCylinderMisfire => {
                facts.misfire.misfire_type == Some(MisfireType::SingleCylinder)
            }
            Self::MultipleMisfire => facts.misfire.misfire_type == Some(MisfireType::Multiple),
            Self::SmallEvapLeak => matches!(
                facts.evap.leak_class,
                Some(EvapLeakClass::Small | EvapLeakClass::VerySmall)
            ),
        }
    }
}

/// One registered overlay rule.
#[derive(Debug, Clone)]
pub struct OverlayRule {
    /// Unique id; doubles as the fired-once key and the question key.
    pub id: &'static str,
    /// Make families this rule applies to, lowercased.
    pub makes: &'static [&'static str],
    pub domain: Domain,
    /// Ladder step key this overlay is asked ahead of.
    pub insert_before_step: &'static str,
    pub condition: OverlayCondition,
    /// Yes/no acknowledgment prompt.
    pub prompt: &'static str,
}

impl OverlayRule {
    /// Make-family match against the vehicle record.
    pub fn applies_to(&self, vehicle: &Vehicle) -> bool {
        let Some(make) = &vehicle.make else {
            return false;
        };
        let make = make.to_lowercase();
        self.makes.iter().any(|m| make.contains(m))
    }
}

/// Built-in overlay rules. Ordered; the first match wins.
pub fn default_overlays() -> &'static [OverlayRule] {
    const RULES: &[OverlayRule] = &[
        OverlayRule {
            id: "overlay.gm_afm_lifter",
            makes: &["chevrolet", "chevy", "gmc", "cadillac"],
            domain: Domain::EngineDrivability,
            insert_before_step: "engine.compression_test",
            condition: OverlayCondition::SingleCylinderMisfire,
            prompt: "GM V8s with Active Fuel Management are known for collapsed lifters causing a steady single-cylinder misfire. Before the compression test, have you listened for lifter tick on that bank?",
        },
        OverlayRule {
            id: "overlay.ford_phaser_rattle",
            makes: &["ford", "lincoln"],
            domain: Domain::EngineDrivability,
            insert_before_step: "engine.compression_test",
            condition: OverlayCondition::MultipleMisfire,
            prompt: "Ford modular V8s commonly rattle worn cam phasers, which shows up as a rough multi-cylinder misfire. Do you hear a rattle on cold start?",
        },
        OverlayRule {
            id: "overlay.vw_pcv_vacuum",
            makes: &["volkswagen", "vw", "audi"],
            domain: Domain::EngineDrivability,
            insert_before_step: "engine.smoke_test",
            condition: OverlayCondition::Always,
            prompt: "VW/Audi TSI engines very often tear the PCV valve diaphragm, which whistles and leans the engine out. Have you checked the PCV valve for a hissing sound?",
        },
        OverlayRule {
            id: "overlay.toyota_canister_pump",
            makes: &["toyota", "lexus"],
            domain: Domain::Evap,
            insert_before_step: "evap.smoke_test",
            condition: OverlayCondition::SmallEvapLeak,
            prompt: "Toyota small-leak EVAP codes are very commonly the canister pump module rather than a hose. Has the leak-detection pump been tested or replaced?",
        },
        OverlayRule {
            id: "overlay.chrysler_tipm",
            makes: &["chrysler", "dodge", "jeep", "ram"],
            domain: Domain::StartingCharging,
            insert_before_step: "starting.starter_signal",
            condition: OverlayCondition::Always,
            prompt: "Chrysler-family trucks of this era have well-documented TIPM (fuse box) failures that mimic starter and fuel pump faults. Has the TIPM been ruled out?",
        },
    ];
    RULES
}

/// Finds the first applicable, not-yet-fired overlay for a ladder step.
pub fn resolve(
    domain: Domain,
    step_key: &str,
    vehicle: &Vehicle,
    facts: &Classification,
    fired: &HashSet<String>,
) -> Option<&'static OverlayRule> {
    default_overlays().iter().find(|rule| {
        rule.domain == domain
            && rule.insert_before_step == step_key
            && !fired.contains(rule.id)
            && rule.applies_to(vehicle)
            && rule.condition.matches(facts)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::MisfireFacts;

    fn gm_truck() -> Vehicle {
        Vehicle {
            year: Some(2016),
            make: Some("Chevrolet".to_string()),
            model: Some("Silverado".to_string()),
            engine: Some("5.3L".to_string()),
        }
    }

    fn single_cylinder_facts() -> Classification {
        Classification {
            misfire: MisfireFacts {
                misfire_type: Some(MisfireType::SingleCylinder),
                cylinder: Some(4),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_overlay_ids_are_unique() {
        let mut seen = HashSet::new();
        for rule in default_overlays() {
            assert!(seen.insert(rule.id), "duplicate overlay id: {}", rule.id);
        }
    }

    #[test]
    fn test_resolve_matches_make_step_and_condition() {
        let fired = HashSet::new();
        let rule = resolve(
            Domain::EngineDrivability,
            "engine.compression_test",
            &gm_truck(),
            &single_cylinder_facts(),
            &fired,
        )
        .unwrap();
        assert_eq!(rule.id, "overlay.gm_afm_lifter");
    }

    #[test]
    fn test_resolve_skips_fired_rules() {
        let mut fired = HashSet::new();
        fired.insert("overlay.gm_afm_lifter".to_string());
        assert!(
            resolve(
                Domain::EngineDrivability,
                "engine.compression_test",
                &gm_truck(),
                &single_cylinder_facts(),
                &fired,
            )
            .is_none()
        );
    }

    #[test]
    fn test_resolve_requires_matching_make() {
        let fired = HashSet::new();
        let honda = Vehicle {
            make: Some("Honda".to_string()),
            ..Default::default()
        };
        assert!(
            resolve(
                Domain::EngineDrivability,
                "engine.compression_test",
                &honda,
                &single_cylinder_facts(),
                &fired,
            )
            .is_none()
        );
    }

    #[test]
    fn test_condition_gates_rule() {
        let fired = HashSet::new();
        // GM truck but no misfire type locked yet.
        assert!(
            resolve(
                Domain::EngineDrivability,
                "engine.compression_test",
                &gm_truck(),
                &Classification::default(),
                &fired,
            )
            .is_none()
        );
    }
}
