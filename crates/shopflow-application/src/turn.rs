//! The per-turn use case.
//!
//! `TurnUseCase` owns the fixed priority stack that decides each reply:
//! safety hard stop, then vehicle completeness, then consuming the pending
//! answer, then the code-explanation queue, then the active deterministic
//! path, then overlay/ladder selection, and finally free-form phrasing.
//! Sessions are locked for the whole turn, so turns within one
//! conversation are strictly sequential.

use crate::config::ControllerConfig;
use shopflow_core::answer::{self, ExpectedKind, ParsedAnswer};
use shopflow_core::code::extract_codes;
use shopflow_core::directive::ReplyDirective;
use shopflow_core::domain::{self, Domain};
use shopflow_core::error::Result;
use shopflow_core::facts;
use shopflow_core::gate::ExpectedInput;
use shopflow_core::overlay;
use shopflow_core::path::{self, MisfirePhase, PathKind};
use shopflow_core::phrasing::{ConversationTurn, PhrasingAgent};
use shopflow_core::safety::{SafetyLookup, SafetyVerdict};
use shopflow_core::session::{DiagnosticSession, SessionManager, SessionMode};
use shopflow_core::template;
use shopflow_core::tier;
use shopflow_core::vehicle::{Vehicle, VehicleExtractor};
use shopflow_interaction::TemplatePhraser;
use std::sync::Arc;
use std::time::Duration;

/// One turn of input from the caller.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub conversation_id: String,
    pub message: String,
    /// Vehicle attributes the caller already holds (e.g. from a profile).
    pub vehicle_context: Vehicle,
    /// Prior turns, read-only, for phrasing context.
    pub history: Vec<ConversationTurn>,
}

impl TurnRequest {
    pub fn new(conversation_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            message: message.into(),
            vehicle_context: Vehicle::default(),
            history: Vec::new(),
        }
    }
}

/// The controller's reply for one turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnResponse {
    pub reply: String,
    pub vehicle: Vehicle,
}

/// Orchestrates one conversation turn over the session manager and the
/// capability boundaries.
pub struct TurnUseCase {
    sessions: Arc<SessionManager>,
    phraser: Arc<dyn PhrasingAgent>,
    /// Deterministic fallback used when the phraser errors or times out.
    fallback: TemplatePhraser,
    vehicle_extractor: Arc<dyn VehicleExtractor>,
    safety: Arc<dyn SafetyLookup>,
    config: ControllerConfig,
}

impl TurnUseCase {
    pub fn new(
        sessions: Arc<SessionManager>,
        phraser: Arc<dyn PhrasingAgent>,
        vehicle_extractor: Arc<dyn VehicleExtractor>,
        safety: Arc<dyn SafetyLookup>,
        config: ControllerConfig,
    ) -> Self {
        Self {
            sessions,
            phraser,
            fallback: TemplatePhraser::new(),
            vehicle_extractor,
            safety,
            config,
        }
    }

    /// Processes one turn and returns the reply.
    pub async fn handle_turn(&self, request: TurnRequest) -> Result<TurnResponse> {
        let handle = self.sessions.get_or_create(&request.conversation_id).await?;
        let mut session = handle.lock().await;

        // Safety gate runs before everything else.
        let mut verdict = match self.safety.check(&request.message).await {
            Ok(verdict) => verdict,
            Err(e) => {
                tracing::warn!(error = %e, "safety lookup failed; continuing without findings");
                SafetyVerdict::default()
            }
        };
        if let Some(stop) = verdict.hard_stop.take() {
            tracing::info!(conversation = %session.id, "safety hard stop");
            return Ok(TurnResponse {
                reply: stop,
                vehicle: session.vehicle.clone(),
            });
        }

        // Merge/refresh vehicle context. Caller-supplied attributes win,
        // then whatever the extractor finds in this message.
        session.vehicle.merge(&request.vehicle_context);
        match self.vehicle_extractor.extract(&request.message).await {
            Ok(extracted) => session.vehicle.merge(&extracted),
            Err(e) => tracing::warn!(error = %e, "vehicle extraction failed"),
        }

        // Extract and lock facts.
        session.add_codes(&extract_codes(&request.message));
        let active_codes = session.active_codes.clone();
        facts::extract_facts(&request.message, &active_codes, &mut session.classification);

        // Classify and lock the domain.
        let guess = domain::classify(&request.message, &session.active_codes);
        session.set_domain_if_unset(guess);
        if session.domain.is_some() {
            session.mode = SessionMode::Active;
        }

        // Hard precondition: with a code active, diagnostics are withheld
        // until the vehicle record is complete.
        if session.primary_code().is_some() && !session.vehicle.is_complete() {
            let directive = ReplyDirective::RequestVehicle {
                known: session.vehicle.clone(),
            };
            let reply = self.phrase(&directive, &request.history).await;
            return self.finish(&mut session, reply).await;
        }

        let mut directives: Vec<ReplyDirective> = Vec::new();

        // Consume the pending answer, if any.
        if let Some(pending) = session.gate.expected_input.clone() {
            if is_ladder_key(&pending.key)
                && pending.kind == ExpectedKind::YesNo
                && tier::is_inaccessible(&request.message)
            {
                session.gate.expected_input = None;
                session.gate.clarify_retries = 0;
                self.escalate_tier(&mut session, pending.domain, &mut directives);
            } else {
                match session.gate.consume(&request.message) {
                    Some((expected, parsed)) => {
                        self.apply_answer(&mut session, &expected, parsed, &mut directives);
                    }
                    None => {
                        // Unparseable: the question stays outstanding and
                        // we re-prompt under a derived key.
                        let reply = self.clarify(&mut session, &pending, &request.history).await;
                        return self.finish(&mut session, reply).await;
                    }
                }
            }
        }

        // Every code gets exactly one explanation, in order, before its
        // diagnostic questioning. The first question may ride along in the
        // same reply.
        if let Some(code) = session.next_unexplained_code().cloned() {
            directives.push(ReplyDirective::ExplainCode {
                code,
                vehicle: session.vehicle.clone(),
                warnings: verdict.warnings.clone(),
            });
            session.mark_code_explained();
        }

        // Pick the next question unless one is already outstanding or this
        // turn produced a terminal conclusion.
        let concluded = directives
            .iter()
            .any(|d| matches!(d, ReplyDirective::Conclusion { .. }));
        if !session.gate.awaiting() && !concluded {
            self.select_question(&mut session, &request, &verdict, &mut directives);
        }

        // Phrase and join.
        let mut parts = Vec::with_capacity(directives.len());
        for directive in &directives {
            parts.push(self.phrase(directive, &request.history).await);
        }
        let reply = parts.join("\n\n");
        self.finish(&mut session, reply).await
    }

    /// Reset operation: clears the session back to initial defaults.
    pub async fn reset(&self, conversation_id: &str) -> Result<()> {
        let handle = self.sessions.get_or_create(conversation_id).await?;
        let mut session = handle.lock().await;
        tracing::info!(conversation = %conversation_id, "session reset");
        session.reset();
        self.sessions.persist(&session).await
    }

    async fn finish(
        &self,
        session: &mut DiagnosticSession,
        reply: String,
    ) -> Result<TurnResponse> {
        session.touch();
        self.sessions.persist(session).await?;
        Ok(TurnResponse {
            reply,
            vehicle: session.vehicle.clone(),
        })
    }

    /// Locks the fact derived from a consumed answer and advances whatever
    /// flow asked the question.
    fn apply_answer(
        &self,
        session: &mut DiagnosticSession,
        expected: &ExpectedInput,
        parsed: ParsedAnswer,
        directives: &mut Vec<ReplyDirective>,
    ) {
        if expected.key.starts_with("misfire.") {
            let phase = path::advance(
                session.misfire_phase,
                parsed,
                &mut session.classification.misfire,
            );
            tracing::debug!(
                conversation = %session.id,
                from = %session.misfire_phase,
                to = %phase,
                "misfire path transition"
            );
            session.misfire_phase = phase;
            if phase.is_terminal() {
                session.active_path = None;
                if let Some((key, summary)) =
                    path::conclusion(phase, &session.classification.misfire)
                {
                    directives.push(ReplyDirective::Conclusion {
                        key: key.to_string(),
                        summary,
                    });
                }
            }
            return;
        }

        if expected.key.starts_with("overlay.") {
            // Acknowledgment only; the rule was recorded as fired when it
            // was asked, and the withheld ladder step is next.
            return;
        }

        // Ladder answers: some steps lock classification facts.
        match (expected.key.as_str(), parsed) {
            ("evap.check_gas_cap", ParsedAnswer::YesNo(verified)) => {
                session.classification.evap.basics_verified.get_or_insert(verified);
            }
            ("network.scan_all_modules", ParsedAnswer::NetworkScope(scope)) => {
                session.classification.network.scope.get_or_insert(scope);
            }
            ("starting.crank_behavior", ParsedAnswer::Crank(crank)) => {
                session.classification.starting.crank.get_or_insert(crank);
            }
            ("cooling.gauge_reading", ParsedAnswer::Temperature(band)) => {
                session.classification.cooling.temperature.get_or_insert(band);
            }
            _ => {}
        }

        let steps = template::ladder(expected.domain);
        if steps
            .get(session.template_step)
            .is_some_and(|s| s.key == expected.key)
        {
            session.template_step += 1;
        }
    }

    /// Advances the access tier after an inaccessible reply and lands on
    /// the next tier's first step, or concludes that labor is required.
    fn escalate_tier(
        &self,
        session: &mut DiagnosticSession,
        domain: Domain,
        directives: &mut Vec<ReplyDirective>,
    ) {
        let steps = template::ladder(domain);
        let current_tier = steps
            .get(session.template_step)
            .map(|s| s.tier)
            .unwrap_or(session.access_tier);

        let landed = current_tier.escalate().and_then(|next| {
            session.access_tier = next;
            template::first_step_at_tier(domain, next)
        });

        match landed {
            Some(idx) => {
                tracing::debug!(conversation = %session.id, tier = %session.access_tier, "tier escalated");
                session.template_step = idx;
                let step = steps[idx];
                self.ask(session, domain, step.key, step.kind, step.prompt, directives);
            }
            None => {
                directives.push(ReplyDirective::Conclusion {
                    key: format!("{}.labor_required", domain),
                    summary: "Everything left to check is out of reach without major teardown. \
At this point the honest answer is that diagnosis requires shop labor; take the vehicle in \
with the notes we've collected so far."
                        .to_string(),
                });
            }
        }
    }

    /// The question-selection ladder: active path, then path entry, then
    /// overlay/template steps, else free-form.
    fn select_question(
        &self,
        session: &mut DiagnosticSession,
        request: &TurnRequest,
        verdict: &SafetyVerdict,
        directives: &mut Vec<ReplyDirective>,
    ) {
        if session.active_path == Some(PathKind::Misfire) {
            self.push_path_question(session, directives);
            return;
        }

        // Deterministic path entry, once per session.
        let misfire_signal = session.classification.misfire.misfire_type.is_some()
            || session.active_codes.iter().any(|c| c.is_misfire())
            || request.message.to_lowercase().contains("misfire");
        if session.domain == Some(Domain::EngineDrivability)
            && misfire_signal
            && session.active_path.is_none()
            && session.misfire_phase == MisfirePhase::Start
        {
            session.active_path = Some(PathKind::Misfire);
            session.misfire_phase = path::entry_phase(&session.classification.misfire);
            tracing::info!(conversation = %session.id, "entering misfire path");
            self.push_path_question(session, directives);
            return;
        }

        match session.domain {
            Some(domain) if domain != Domain::Unknown => {
                self.push_ladder_question(session, domain, directives);
            }
            _ => {
                let mut topic = request.message.trim().to_string();
                if topic.len() > 80 {
                    topic.truncate(80);
                }
                if topic.is_empty() {
                    topic = "your vehicle".to_string();
                }
                directives.push(ReplyDirective::FreeForm {
                    topic,
                    warnings: verdict.warnings.clone(),
                });
            }
        }
    }

    fn push_path_question(
        &self,
        session: &mut DiagnosticSession,
        directives: &mut Vec<ReplyDirective>,
    ) {
        let phase = path::skip_locked(session.misfire_phase, &session.classification.misfire);
        session.misfire_phase = phase;
        if let Some(question) = path::question(phase, &session.classification.misfire) {
            self.ask(
                session,
                Domain::EngineDrivability,
                question.key,
                question.kind,
                &question.prompt,
                directives,
            );
        } else if let Some((key, summary)) =
            path::conclusion(phase, &session.classification.misfire)
        {
            session.active_path = None;
            directives.push(ReplyDirective::Conclusion {
                key: key.to_string(),
                summary,
            });
        }
    }

    fn push_ladder_question(
        &self,
        session: &mut DiagnosticSession,
        domain: Domain,
        directives: &mut Vec<ReplyDirective>,
    ) {
        let steps = template::ladder(domain);

        // Anti-repeat: never re-ask the key we asked last turn.
        let mut idx = session.template_step;
        while steps.get(idx).is_some_and(|s| !session.gate.should_ask(s.key)) {
            idx += 1;
        }
        session.template_step = idx;

        let Some(step) = steps.get(idx) else {
            directives.push(ReplyDirective::Conclusion {
                key: format!("{}.ladder_exhausted", domain),
                summary: "We've worked through every test I can direct from here without \
findings. The next step is hands-on shop diagnosis; bring the notes from this conversation."
                    .to_string(),
            });
            return;
        };

        // Make-specific overlay ahead of this step; the step is withheld
        // until the overlay is answered.
        if let Some(rule) = overlay::resolve(
            domain,
            step.key,
            &session.vehicle,
            &session.classification,
            &session.fired_overlays,
        ) {
            tracing::debug!(conversation = %session.id, overlay = rule.id, "overlay fired");
            session.fired_overlays.insert(rule.id.to_string());
            self.ask(session, domain, rule.id, ExpectedKind::YesNo, rule.prompt, directives);
            return;
        }

        self.ask(session, domain, step.key, step.kind, step.prompt, directives);
    }

    /// Registers a question with the gate and emits its directive.
    fn ask(
        &self,
        session: &mut DiagnosticSession,
        domain: Domain,
        key: &str,
        kind: ExpectedKind,
        prompt: &str,
        directives: &mut Vec<ReplyDirective>,
    ) {
        session.gate.expect(kind, domain, key, prompt);
        session.gate.mark_asked(key);
        directives.push(ReplyDirective::AskQuestion {
            key: key.to_string(),
            kind,
            domain,
            prompt: prompt.to_string(),
        });
    }

    /// Builds the re-prompt for an unparseable answer. The first retry is
    /// deterministic; past the configured limit it goes through the
    /// generative phraser instead.
    async fn clarify(
        &self,
        session: &mut DiagnosticSession,
        pending: &ExpectedInput,
        history: &[ConversationTurn],
    ) -> String {
        let key = format!("clarify:{}", pending.key);
        let directive = ReplyDirective::Clarify {
            key: key.clone(),
            hint: answer::vocabulary_hint(pending.kind).to_string(),
            original_prompt: pending.prompt.clone(),
        };
        session.gate.mark_asked(&key);

        if session.gate.clarify_retries > self.config.clarify_retry_limit {
            self.phrase(&directive, history).await
        } else {
            self.phrase_fallback(&directive, history).await
        }
    }

    /// Phrases through the configured agent with a timeout, recovering to
    /// the deterministic templates on failure. Never surfaces an error.
    async fn phrase(&self, directive: &ReplyDirective, history: &[ConversationTurn]) -> String {
        let timeout = Duration::from_secs(self.config.phrasing_timeout_secs);
        match tokio::time::timeout(timeout, self.phraser.phrase(directive, history)).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "phrasing failed; using template fallback");
                self.phrase_fallback(directive, history).await
            }
            Err(_) => {
                tracing::warn!("phrasing timed out; using template fallback");
                self.phrase_fallback(directive, history).await
            }
        }
    }

    async fn phrase_fallback(
        &self,
        directive: &ReplyDirective,
        history: &[ConversationTurn],
    ) -> String {
        self.fallback
            .phrase(directive, history)
            .await
            .unwrap_or_else(|e| {
                tracing::error!(error = %e, "template fallback failed");
                minimal_text(directive)
            })
    }
}

fn is_ladder_key(key: &str) -> bool {
    !key.starts_with("misfire.") && !key.starts_with("overlay.")
}

/// Last-resort deterministic text if even the template phraser fails.
fn minimal_text(directive: &ReplyDirective) -> String {
    match directive {
        ReplyDirective::HardStop { message } => message.clone(),
        ReplyDirective::RequestVehicle { .. } => {
            "What is the year, make, model, and engine of the vehicle?".to_string()
        }
        ReplyDirective::ExplainCode { code, .. } => {
            format!("Let's work through code {} step by step.", code)
        }
        ReplyDirective::AskQuestion { prompt, .. } => prompt.clone(),
        ReplyDirective::Clarify {
            hint,
            original_prompt,
            ..
        } => format!("Please answer with {}. {}", hint, original_prompt),
        ReplyDirective::Conclusion { summary, .. } => summary.clone(),
        ReplyDirective::FreeForm { .. } => {
            "Tell me any trouble codes or symptoms and we'll work through it.".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ladder_key_detection() {
        assert!(is_ladder_key("evap.check_gas_cap"));
        assert!(!is_ladder_key("misfire.check_spark"));
        assert!(!is_ladder_key("overlay.gm_afm_lifter"));
    }

    #[test]
    fn test_minimal_text_covers_questions() {
        let directive = ReplyDirective::AskQuestion {
            key: "evap.check_gas_cap".to_string(),
            kind: ExpectedKind::YesNo,
            domain: Domain::Evap,
            prompt: "Is the cap tight?".to_string(),
        };
        assert_eq!(minimal_text(&directive), "Is the cap tight?");
    }
}
