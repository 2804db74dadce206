// src/services/intake_service.rs

use chrono::{DateTime, Duration, Timelike, Utc};
use serde::Serialize;
use sqlx::PgPool;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{ActivityRepository, AgentRepository, LeadRepository, SettingsRepository},
    models::{
        activities::ActivityType,
        agents::Agent,
        leads::{Lead, LeadPriority, LeadSegment, NewLead, RegisterLeadPayload},
        settings::{NightHoldSettings, RoutingRule},
    },
    services::notification_service::NotificationService,
};

// Resultado do intake devolvido ao formulário/chatbot
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IntakeResult {
    pub success: bool,
    pub lead_id: Uuid,
    pub score: i32,
    pub segment: LeadSegment,
    pub assignment_method: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<Uuid>,
    pub broadcast_to: usize,
    pub night_held: bool,
}

// Intake de leads: pontua, persiste e roteia em dois níveis — regra de
// atribuição instantânea primeiro, broadcast por idioma depois.
#[derive(Clone)]
pub struct IntakeService {
    pool: PgPool,
    lead_repo: LeadRepository,
    agent_repo: AgentRepository,
    activity_repo: ActivityRepository,
    settings_repo: SettingsRepository,
    notifier: NotificationService,
}

impl IntakeService {
    pub fn new(
        pool: PgPool,
        lead_repo: LeadRepository,
        agent_repo: AgentRepository,
        activity_repo: ActivityRepository,
        settings_repo: SettingsRepository,
        notifier: NotificationService,
    ) -> Self {
        Self {
            pool,
            lead_repo,
            agent_repo,
            activity_repo,
            settings_repo,
            notifier,
        }
    }

    pub async fn register_lead(&self, payload: RegisterLeadPayload) -> Result<IntakeResult, AppError> {
        let language = payload
            .language
            .as_deref()
            .unwrap_or("en")
            .to_lowercase();

        let score = calculate_lead_score(&payload);
        let segment = segment_for_score(score);
        let priority = priority_for(score, payload.timeframe.as_deref());

        let escalation = self.settings_repo.escalation_settings().await?;
        let night = self.settings_repo.night_hold_settings().await?;

        let now = Utc::now();
        let scheduled_release_at = night_hold_release(&night, now);
        let is_night_held = scheduled_release_at.is_some();

        let new_lead = NewLead {
            first_name: payload.first_name.trim().to_string(),
            last_name: payload.last_name.trim().to_string(),
            phone_number: payload.phone.trim().to_string(),
            email: payload.email.clone(),
            language: language.clone(),
            lead_source: payload.lead_source.clone().unwrap_or_else(|| "website".to_string()),
            lead_source_detail: payload.lead_source_detail.clone(),
            page_type: payload.page_type.clone(),
            page_slug: payload.page_slug.clone(),
            referrer: payload.referrer.clone(),
            budget_range: payload.budget_range.clone(),
            location_preference: payload.location_preference.clone(),
            property_type: payload.property_type.clone(),
            property_purpose: payload.property_purpose.clone(),
            bedrooms_desired: payload.bedrooms_desired.clone(),
            sea_view_importance: payload.sea_view_importance.clone(),
            timeframe: payload.timeframe.clone(),
            message: payload.message.clone(),
            questions_answered: payload.questions_answered,
            intake_complete: payload.intake_complete,
            score,
            segment,
            priority,
            // Lead retido à noite só ganha janela de claim na liberação
            claim_window_expires_at: if is_night_held {
                None
            } else {
                Some(now + Duration::minutes(escalation.default_claim_window_minutes))
            },
            is_night_held,
            scheduled_release_at,
        };

        let lead = self.lead_repo.insert(&self.pool, &new_lead).await?;
        tracing::info!("📥 Lead {} registrado ({} / score {})", lead.id, segment.as_str(), score);

        if is_night_held {
            return Ok(IntakeResult {
                success: true,
                lead_id: lead.id,
                score,
                segment,
                assignment_method: "night_hold",
                rule_name: None,
                assigned_to: None,
                broadcast_to: 0,
                night_held: true,
            });
        }

        // Tier 1: regra de atribuição instantânea
        let rules = self.settings_repo.active_routing_rules().await?;
        if let Some(rule) = rules.iter().find(|r| rule_matches(r, &lead)) {
            tracing::info!("Regra de roteamento casou: {}", rule.rule_name);
            self.settings_repo.record_rule_match(rule.id).await?;

            if let Some(agent) = self.try_rule_assignment(&lead, rule).await? {
                return Ok(IntakeResult {
                    success: true,
                    lead_id: lead.id,
                    score,
                    segment,
                    assignment_method: "rule_based",
                    rule_name: Some(rule.rule_name.clone()),
                    assigned_to: Some(agent.id),
                    broadcast_to: 0,
                    night_held: false,
                });
            }
            // Agente da regra indisponível: cai no broadcast normal
        }

        // Tier 2: broadcast para os agentes elegíveis do idioma
        let eligible = self.agent_repo.find_eligible_by_language(&self.pool, &language).await?;
        let notified = self
            .notifier
            .notify_broadcast(&lead, &eligible, escalation.default_claim_window_minutes)
            .await?;

        Ok(IntakeResult {
            success: true,
            lead_id: lead.id,
            score,
            segment,
            assignment_method: "broadcast",
            rule_name: None,
            assigned_to: None,
            broadcast_to: notified,
            night_held: false,
        })
    }

    // Atribuição instantânea: lead e contador do agente mudam na mesma
    // transação, com guarda de capacidade. Qualquer indisponibilidade
    // devolve None e o intake segue para o broadcast.
    async fn try_rule_assignment(
        &self,
        lead: &Lead,
        rule: &RoutingRule,
    ) -> Result<Option<Agent>, AppError> {
        let mut tx = self.pool.begin().await?;

        let Some(agent) = self.agent_repo.find_by_id(&mut *tx, rule.assign_to_agent_id).await? else {
            tracing::warn!("Regra '{}' aponta para agente inexistente", rule.rule_name);
            return Ok(None);
        };

        if !agent.is_active || !agent.accepts_new_leads || !agent.has_capacity() {
            tracing::info!("Agente da regra '{}' indisponível, caindo para broadcast", rule.rule_name);
            return Ok(None);
        }

        let updated = self
            .lead_repo
            .assign_via_rule(&mut *tx, lead.id, agent.id, rule.id, &rule.rule_name)
            .await?;
        if updated == 0 {
            return Ok(None);
        }

        let incremented = self.agent_repo.increment_lead_count_guarded(&mut *tx, agent.id).await?;
        if incremented == 0 {
            // Outro fluxo encheu o agente entre a leitura e o update
            return Ok(None);
        }

        tx.commit().await?;

        self.notifier.notify_rule_assigned(lead, &agent, &rule.rule_name).await?;
        self.activity_repo
            .insert(
                &self.pool,
                lead.id,
                Some(agent.id),
                ActivityType::Note,
                &format!("Lead automatically assigned via routing rule: \"{}\"", rule.rule_name),
            )
            .await?;

        Ok(Some(agent))
    }
}

// --- MOTOR DE PONTUAÇÃO ---
// Pesos: orçamento 0-30, prazo 0-25, completude do chatbot 0-20,
// especificidade de localização 0-15, critérios preenchidos 0-10.

pub(crate) fn calculate_lead_score(payload: &RegisterLeadPayload) -> i32 {
    let mut score = 0.0f64;

    let budget = payload.budget_range.as_deref().unwrap_or("").to_lowercase();
    score += if budget.contains("2m") || budget.contains("2,000,000") || budget.contains("€2") {
        30.0
    } else if budget.contains("1m") || budget.contains("1,000,000") || budget.contains("€1") {
        25.0
    } else if budget.contains("500k") || budget.contains("500,000") {
        20.0
    } else if budget.contains("300k") || budget.contains("300,000") {
        15.0
    } else {
        10.0
    };

    let timeframe = payload.timeframe.as_deref().unwrap_or("").to_lowercase();
    score += if timeframe.contains("6_month") || timeframe.contains("immediate") {
        25.0
    } else if timeframe.contains("1_year") || timeframe.contains("12_month") {
        20.0
    } else if timeframe.contains("2_year") {
        15.0
    } else {
        5.0
    };

    score += if payload.intake_complete {
        20.0
    } else if payload.questions_answered >= 3 {
        15.0
    } else if payload.questions_answered >= 1 {
        10.0
    } else {
        0.0
    };

    let locations = payload.location_preference.as_deref().map_or(0, |l| l.len());
    score += if locations >= 2 {
        15.0
    } else if locations == 1 {
        10.0
    } else {
        5.0
    };

    let mut criteria = 0;
    if payload.property_type.as_deref().is_some_and(|t| !t.is_empty()) {
        criteria += 1;
    }
    if payload.property_purpose.is_some() {
        criteria += 1;
    }
    if payload.bedrooms_desired.is_some() {
        criteria += 1;
    }
    if payload.sea_view_importance.is_some() {
        criteria += 1;
    }
    score += criteria as f64 * 2.5;

    (score.round() as i32).min(100)
}

pub(crate) fn segment_for_score(score: i32) -> LeadSegment {
    if score >= 80 {
        LeadSegment::Hot
    } else if score >= 60 {
        LeadSegment::Warm
    } else if score >= 40 {
        LeadSegment::Cool
    } else {
        LeadSegment::Cold
    }
}

pub(crate) fn priority_for(score: i32, timeframe: Option<&str>) -> LeadPriority {
    let tf = timeframe.unwrap_or("").to_lowercase();
    if score >= 80 || tf.contains("6_month") || tf.contains("immediate") {
        LeadPriority::Urgent
    } else if score >= 60 || tf.contains("1_year") {
        LeadPriority::High
    } else if score >= 40 {
        LeadPriority::Medium
    } else {
        LeadPriority::Low
    }
}

// Um array de match nulo ou vazio não restringe nada; todos os arrays
// preenchidos precisam aceitar o lead.
pub(crate) fn rule_matches(rule: &RoutingRule, lead: &Lead) -> bool {
    fn restricted(list: &Option<Vec<String>>) -> bool {
        list.as_deref().is_some_and(|l| !l.is_empty())
    }

    if restricted(&rule.match_language) {
        let langs = rule.match_language.as_deref().unwrap_or(&[]);
        if !langs.iter().any(|l| l == &lead.language) {
            return false;
        }
    }

    if restricted(&rule.match_page_type) {
        match &lead.page_type {
            Some(page_type) => {
                let types = rule.match_page_type.as_deref().unwrap_or(&[]);
                if !types.iter().any(|t| t == page_type) {
                    return false;
                }
            }
            None => return false,
        }
    }

    if restricted(&rule.match_page_slug) {
        match &lead.page_slug {
            Some(page_slug) => {
                let slugs = rule.match_page_slug.as_deref().unwrap_or(&[]);
                if !slugs.iter().any(|s| s == page_slug) {
                    return false;
                }
            }
            None => return false,
        }
    }

    if restricted(&rule.match_lead_source) {
        let sources = rule.match_lead_source.as_deref().unwrap_or(&[]);
        if !sources.iter().any(|s| s == &lead.lead_source) {
            return false;
        }
    }

    if restricted(&rule.match_lead_segment) {
        let segments = rule.match_lead_segment.as_deref().unwrap_or(&[]);
        if !segments.iter().any(|s| s == lead.lead_segment.as_str()) {
            return false;
        }
    }

    if restricted(&rule.match_budget_range) {
        match &lead.budget_range {
            Some(budget) => {
                let ranges = rule.match_budget_range.as_deref().unwrap_or(&[]);
                if !ranges.iter().any(|r| budget.contains(r.as_str())) {
                    return false;
                }
            }
            None => return false,
        }
    }

    if restricted(&rule.match_property_type) {
        let wanted = rule.match_property_type.as_deref().unwrap_or(&[]);
        let lead_types = lead.property_type.as_deref().unwrap_or(&[]);
        if !lead_types.iter().any(|t| wanted.contains(t)) {
            return false;
        }
    }

    if restricted(&rule.match_timeframe) {
        match &lead.timeframe {
            Some(timeframe) => {
                let frames = rule.match_timeframe.as_deref().unwrap_or(&[]);
                if !frames.iter().any(|f| f == timeframe) {
                    return false;
                }
            }
            None => return false,
        }
    }

    true
}

// Se `now` cai dentro da janela noturna, retorna o instante da próxima
// liberação (a hora de abertura, hoje ou amanhã). A janela pode cruzar
// a meia-noite (start 22h, end 8h).
pub(crate) fn night_hold_release(
    settings: &NightHoldSettings,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    if !settings.enabled {
        return None;
    }

    let hour = now.hour();
    let in_window = if settings.start_hour <= settings.end_hour {
        hour >= settings.start_hour && hour < settings.end_hour
    } else {
        hour >= settings.start_hour || hour < settings.end_hour
    };
    if !in_window {
        return None;
    }

    // Horas fora de 0..24 na configuração desativam a retenção
    let release_naive = now.date_naive().and_hms_opt(settings.end_hour, 0, 0)?;
    let mut release = release_naive.and_utc();
    if release <= now {
        release += Duration::days(1);
    }
    Some(release)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::leads::{AssignmentMethod, LeadStatus};
    use chrono::TimeZone;

    fn payload() -> RegisterLeadPayload {
        RegisterLeadPayload {
            first_name: "Maria".into(),
            last_name: "Jansen".into(),
            phone: "+31612345678".into(),
            email: None,
            language: Some("nl".into()),
            lead_source: None,
            lead_source_detail: None,
            page_type: None,
            page_slug: None,
            referrer: None,
            budget_range: None,
            location_preference: None,
            property_type: None,
            property_purpose: None,
            bedrooms_desired: None,
            sea_view_importance: None,
            timeframe: None,
            message: None,
            questions_answered: 0,
            intake_complete: false,
        }
    }

    fn lead() -> Lead {
        Lead {
            id: Uuid::new_v4(),
            first_name: "Maria".into(),
            last_name: "Jansen".into(),
            phone_number: "+31612345678".into(),
            email: None,
            language: "nl".into(),
            lead_source: "website".into(),
            lead_source_detail: None,
            page_type: Some("villas".into()),
            page_slug: None,
            referrer: None,
            budget_range: Some("500k-1m".into()),
            location_preference: None,
            property_type: Some(vec!["villa".into()]),
            property_purpose: None,
            bedrooms_desired: None,
            sea_view_importance: None,
            timeframe: Some("6_months".into()),
            message: None,
            questions_answered: 0,
            intake_complete: false,
            initial_lead_score: 50,
            current_lead_score: 50,
            lead_segment: LeadSegment::Warm,
            lead_priority: LeadPriority::High,
            lead_status: LeadStatus::New,
            lead_claimed: false,
            claimed_by: None,
            claim_window_expires_at: None,
            current_round: 1,
            round_broadcast_at: None,
            assigned_agent_id: None,
            assigned_at: None,
            assignment_method: None::<AssignmentMethod>,
            routing_rule_id: None,
            previous_agent_id: None,
            reassignment_count: 0,
            reassignment_reason: None,
            reassigned_at: None,
            first_action_completed: false,
            sla_breached: false,
            breach_timestamp: None,
            is_night_held: false,
            scheduled_release_at: None,
            archived: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn rule() -> RoutingRule {
        RoutingRule {
            id: Uuid::new_v4(),
            rule_name: "NL villas".into(),
            priority: 10,
            is_active: true,
            match_language: None,
            match_page_type: None,
            match_page_slug: None,
            match_lead_source: None,
            match_lead_segment: None,
            match_budget_range: None,
            match_property_type: None,
            match_timeframe: None,
            assign_to_agent_id: Uuid::new_v4(),
            fallback_to_broadcast: true,
            total_matches: 0,
            last_matched_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn minimal_payload_scores_the_floor() {
        // 10 (orçamento) + 5 (prazo) + 0 (chatbot) + 5 (localização) + 0
        assert_eq!(calculate_lead_score(&payload()), 20);
        assert_eq!(segment_for_score(20), LeadSegment::Cold);
    }

    #[test]
    fn rich_payload_caps_at_100() {
        let mut p = payload();
        p.budget_range = Some("€2M+".into());
        p.timeframe = Some("immediate".into());
        p.intake_complete = true;
        p.location_preference = Some(vec!["Marbella".into(), "Estepona".into()]);
        p.property_type = Some(vec!["villa".into()]);
        p.property_purpose = Some("investment".into());
        p.bedrooms_desired = Some("4".into());
        p.sea_view_importance = Some("must".into());
        assert_eq!(calculate_lead_score(&p), 100);
        assert_eq!(segment_for_score(100), LeadSegment::Hot);
    }

    #[test]
    fn segment_thresholds() {
        assert_eq!(segment_for_score(80), LeadSegment::Hot);
        assert_eq!(segment_for_score(79), LeadSegment::Warm);
        assert_eq!(segment_for_score(60), LeadSegment::Warm);
        assert_eq!(segment_for_score(59), LeadSegment::Cool);
        assert_eq!(segment_for_score(40), LeadSegment::Cool);
        assert_eq!(segment_for_score(39), LeadSegment::Cold);
    }

    #[test]
    fn urgent_timeframe_beats_low_score() {
        assert_eq!(priority_for(30, Some("immediate")), LeadPriority::Urgent);
        assert_eq!(priority_for(30, Some("1_year")), LeadPriority::High);
        assert_eq!(priority_for(45, None), LeadPriority::Medium);
        assert_eq!(priority_for(10, None), LeadPriority::Low);
    }

    #[test]
    fn empty_rule_matches_anything() {
        assert!(rule_matches(&rule(), &lead()));
    }

    #[test]
    fn rule_filters_on_language_and_page_type() {
        let mut r = rule();
        r.match_language = Some(vec!["nl".into(), "de".into()]);
        r.match_page_type = Some(vec!["villas".into()]);
        assert!(rule_matches(&r, &lead()));

        r.match_language = Some(vec!["fr".into()]);
        assert!(!rule_matches(&r, &lead()));
    }

    #[test]
    fn rule_requires_field_presence_when_restricted() {
        let mut r = rule();
        r.match_timeframe = Some(vec!["6_months".into()]);
        assert!(rule_matches(&r, &lead()));

        let mut l = lead();
        l.timeframe = None;
        assert!(!rule_matches(&r, &l));
    }

    #[test]
    fn rule_budget_uses_substring_match() {
        let mut r = rule();
        r.match_budget_range = Some(vec!["500k".into()]);
        assert!(rule_matches(&r, &lead()));

        r.match_budget_range = Some(vec!["2m".into()]);
        assert!(!rule_matches(&r, &lead()));
    }

    #[test]
    fn night_hold_disabled_never_holds() {
        let settings = NightHoldSettings { enabled: false, start_hour: 22, end_hour: 8 };
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 23, 0, 0).unwrap();
        assert!(night_hold_release(&settings, now).is_none());
    }

    #[test]
    fn night_hold_wraps_midnight() {
        let settings = NightHoldSettings { enabled: true, start_hour: 22, end_hour: 8 };

        // 23h: dentro da janela, libera às 8h do dia seguinte
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 23, 0, 0).unwrap();
        let release = night_hold_release(&settings, now).unwrap();
        assert_eq!(release, Utc.with_ymd_and_hms(2026, 3, 11, 8, 0, 0).unwrap());

        // 3h: dentro da janela, libera às 8h do mesmo dia
        let now = Utc.with_ymd_and_hms(2026, 3, 11, 3, 0, 0).unwrap();
        let release = night_hold_release(&settings, now).unwrap();
        assert_eq!(release, Utc.with_ymd_and_hms(2026, 3, 11, 8, 0, 0).unwrap());

        // 12h: fora da janela
        let now = Utc.with_ymd_and_hms(2026, 3, 11, 12, 0, 0).unwrap();
        assert!(night_hold_release(&settings, now).is_none());
    }
}
