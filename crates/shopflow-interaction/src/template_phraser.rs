//! Deterministic template phraser.
//!
//! Renders every [`ReplyDirective`] through minijinja templates. This is
//! both the default phrasing agent and the fallback used when a generative
//! phraser fails or times out; it must therefore never fail on any
//! well-formed directive.

use async_trait::async_trait;
use minijinja::{Environment, context};
use shopflow_core::code::TroubleCode;
use shopflow_core::directive::ReplyDirective;
use shopflow_core::error::{Result, ShopflowError};
use shopflow_core::phrasing::{ConversationTurn, PhrasingAgent};

const REQUEST_VEHICLE: &str = "Before we dig into diagnostics I need to know exactly what we're working on. \
What is the year, make, model, and engine?{% if known %} So far I have: {{ known }}.{% endif %}";

const EXPLAIN_CODE: &str = "Code {{ code }} on your {{ vehicle }}: {{ meaning }}\
{% for warning in warnings %}\nNote: {{ warning }}{% endfor %}";

const ASK_QUESTION: &str = "{{ prompt }}";

const CLARIFY: &str = "Sorry, I need that in a form I can track: please answer with {{ hint }}. {{ original_prompt }}";

const CONCLUSION: &str = "{{ summary }}";

const FREE_FORM: &str = "Happy to help with {{ topic }}. Tell me any trouble codes you have, \
or describe the symptom and when it happens, and we'll work through it step by step.\
{% for warning in warnings %}\nNote: {{ warning }}{% endfor %}";

/// Phrasing agent backed entirely by static templates.
pub struct TemplatePhraser {
    env: Environment<'static>,
}

impl TemplatePhraser {
    pub fn new() -> Self {
        let mut env = Environment::new();
        // Static templates; add_template only fails on syntax errors.
        for (name, source) in [
            ("request_vehicle", REQUEST_VEHICLE),
            ("explain_code", EXPLAIN_CODE),
            ("ask_question", ASK_QUESTION),
            ("clarify", CLARIFY),
            ("conclusion", CONCLUSION),
            ("free_form", FREE_FORM),
        ] {
            env.add_template(name, source)
                .expect("built-in phrasing template is valid");
        }
        Self { env }
    }

    fn render(&self, name: &str, ctx: minijinja::Value) -> Result<String> {
        let template = self
            .env
            .get_template(name)
            .map_err(|e| ShopflowError::capability("phrasing", e.to_string()))?;
        template
            .render(ctx)
            .map_err(|e| ShopflowError::capability("phrasing", e.to_string()))
    }
}

impl Default for TemplatePhraser {
    fn default() -> Self {
        Self::new()
    }
}

/// Plain-language meaning for a trouble code.
///
/// Display-only domain data; control decisions never read this.
pub fn code_meaning(code: &TroubleCode) -> String {
    if code.is_misfire() {
        return match code.misfire_cylinder() {
            Some(cyl) => format!(
                "the engine computer has detected a misfire on cylinder {}. That cylinder is not \
contributing power, usually from a weak spark, a dead injector, or low compression.",
                cyl
            ),
            None => "the engine computer has detected random or multiple-cylinder misfires. \
Something common to the whole engine (fuel delivery, vacuum leak, ignition supply) is the usual cause."
                .to_string(),
        };
    }
    if code.is_lean() {
        let bank = if code.number() == 174 { "bank 2" } else { "bank 1" };
        return format!(
            "the fuel system on {} is running lean; the engine is getting more air (or less fuel) \
than expected. Vacuum leaks and weak fuel delivery are the usual suspects.",
            bank
        );
    }
    if code.is_evap() {
        return "the evaporative emissions system has detected a leak; fuel vapor is escaping \
somewhere between the gas cap and the charcoal canister."
            .to_string();
    }
    match code.family() {
        shopflow_core::code::CodeFamily::Powertrain => format!(
            "{} is a powertrain code covering the engine, fuel, or emissions systems.",
            code
        ),
        shopflow_core::code::CodeFamily::Body => format!(
            "{} is a body code: interior electronics, lighting, airbags, or climate control.",
            code
        ),
        shopflow_core::code::CodeFamily::Network => format!(
            "{} is a network code: a control module is not communicating on the vehicle's data bus.",
            code
        ),
        shopflow_core::code::CodeFamily::Chassis => format!(
            "{} is a chassis code: brakes, ABS, steering, or suspension.",
            code
        ),
    }
}

#[async_trait]
impl PhrasingAgent for TemplatePhraser {
    async fn phrase(
        &self,
        directive: &ReplyDirective,
        _history: &[ConversationTurn],
    ) -> Result<String> {
        match directive {
            ReplyDirective::HardStop { message } => Ok(message.clone()),
            ReplyDirective::RequestVehicle { known } => {
                let described = known.describe();
                self.render(
                    "request_vehicle",
                    context! { known => if described.is_empty() { None } else { Some(described) } },
                )
            }
            ReplyDirective::ExplainCode {
                code,
                vehicle,
                warnings,
            } => self.render(
                "explain_code",
                context! {
                    code => code.as_str(),
                    vehicle => vehicle.describe(),
                    meaning => code_meaning(code),
                    warnings => warnings,
                },
            ),
            ReplyDirective::AskQuestion { prompt, .. } => {
                self.render("ask_question", context! { prompt => prompt })
            }
            ReplyDirective::Clarify {
                hint,
                original_prompt,
                ..
            } => self.render(
                "clarify",
                context! { hint => hint, original_prompt => original_prompt },
            ),
            ReplyDirective::Conclusion { summary, .. } => {
                self.render("conclusion", context! { summary => summary })
            }
            ReplyDirective::FreeForm { topic, warnings } => self.render(
                "free_form",
                context! { topic => topic, warnings => warnings },
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopflow_core::answer::ExpectedKind;
    use shopflow_core::domain::Domain;
    use shopflow_core::vehicle::Vehicle;

    fn truck() -> Vehicle {
        Vehicle {
            year: Some(2018),
            make: Some("Ford".to_string()),
            model: Some("F-150".to_string()),
            engine: Some("5.0L".to_string()),
        }
    }

    #[tokio::test]
    async fn test_explain_code_includes_cylinder_and_warnings() {
        let phraser = TemplatePhraser::new();
        let directive = ReplyDirective::ExplainCode {
            code: TroubleCode::parse("P0302").unwrap(),
            vehicle: truck(),
            warnings: vec!["Relieve fuel pressure before opening fuel lines.".to_string()],
        };
        let text = phraser.phrase(&directive, &[]).await.unwrap();

        assert!(text.contains("P0302"));
        assert!(text.contains("cylinder 2"));
        assert!(text.contains("2018 Ford F-150 5.0L"));
        assert!(text.contains("Relieve fuel pressure"));
    }

    #[tokio::test]
    async fn test_request_vehicle_lists_known_fields() {
        let phraser = TemplatePhraser::new();
        let directive = ReplyDirective::RequestVehicle {
            known: Vehicle {
                make: Some("Ford".to_string()),
                ..Default::default()
            },
        };
        let text = phraser.phrase(&directive, &[]).await.unwrap();
        assert!(text.contains("year, make, model, and engine"));
        assert!(text.contains("Ford"));
    }

    #[tokio::test]
    async fn test_ask_question_passes_prompt_through() {
        let phraser = TemplatePhraser::new();
        let directive = ReplyDirective::AskQuestion {
            key: "misfire.classify_load".to_string(),
            kind: ExpectedKind::Load,
            domain: Domain::EngineDrivability,
            prompt: "Is it worse at idle, under load, or both?".to_string(),
        };
        let text = phraser.phrase(&directive, &[]).await.unwrap();
        assert_eq!(text, "Is it worse at idle, under load, or both?");
    }

    #[tokio::test]
    async fn test_clarify_restates_vocabulary() {
        let phraser = TemplatePhraser::new();
        let directive = ReplyDirective::Clarify {
            key: "clarify:misfire.component_history".to_string(),
            hint: "yes or no".to_string(),
            original_prompt: "Has an ignition component been replaced recently?".to_string(),
        };
        let text = phraser.phrase(&directive, &[]).await.unwrap();
        assert!(text.contains("yes or no"));
        assert!(text.contains("replaced recently?"));
    }

    #[test]
    fn test_code_meaning_for_network_code() {
        let meaning = code_meaning(&TroubleCode::parse("U0100").unwrap());
        assert!(meaning.contains("not communicating"));
    }
}
