//! Sequence generation: one `OutreachSequence` per (prospect, type), steps
//! from the type's step set, variants from the segment's template family.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use leadscout_common::types::{
    DiscoveredProspect, OutreachSequence, Segment, SequenceStep, SequenceType, StepStatus,
};

use super::templates::{render, templates_for, StepKind, TemplateBindings};

/// Days between consecutive steps, by sequence type. Soft nudge waits
/// longest; direct CTA moves fast.
fn step_gap_days(sequence_type: SequenceType) -> i64 {
    match sequence_type {
        SequenceType::ThreeStep => 4,
        SequenceType::FiveStep => 3,
        SequenceType::SevenStep => 3,
        SequenceType::SoftNudge => 7,
        SequenceType::DirectCta => 2,
    }
}

fn bindings_for(prospect: &DiscoveredProspect, segment: Segment) -> TemplateBindings {
    let outreach_angle = match segment {
        Segment::ReferralNetwork => "matching families with the right academic and clinical fit",
        Segment::ThoughtLeadership => "how AI is changing student support",
        Segment::StealthFounder => "a new approach to education placement",
    };

    TemplateBindings {
        name: first_name(&prospect.name),
        role: prospect
            .job_title
            .clone()
            .unwrap_or_else(|| "your field".to_string()),
        company: prospect
            .organization
            .clone()
            .unwrap_or_else(|| "your organization".to_string()),
        outreach_angle: outreach_angle.to_string(),
    }
}

fn first_name(full: &str) -> String {
    full.split_whitespace().next().unwrap_or(full).to_string()
}

/// Build the sequence. Deterministic given (prospect, type, now): step
/// names and order come from the type, variants from the segment templates
/// with the prospect's fields bound in, send times spaced by the type's gap.
pub fn generate_sequence(
    prospect: &DiscoveredProspect,
    sequence_type: SequenceType,
    segment: Segment,
    now: DateTime<Utc>,
) -> OutreachSequence {
    let bindings = bindings_for(prospect, segment);
    let gap = step_gap_days(sequence_type);

    let steps: Vec<SequenceStep> = sequence_type
        .step_names()
        .into_iter()
        .enumerate()
        .map(|(index, name)| {
            let kind = StepKind::from_step_name(&name);
            let variants: Vec<String> = templates_for(segment, kind)
                .iter()
                .map(|t| render(t, &bindings))
                .collect();
            SequenceStep {
                name,
                variants,
                send_at: now + Duration::days(gap * index as i64),
                status: StepStatus::NotSent,
            }
        })
        .collect();

    OutreachSequence {
        sequence_id: Uuid::new_v4().to_string(),
        user_id: prospect.user_id.clone(),
        prospect_id: prospect.prospect_id.clone(),
        sequence_type,
        segment,
        steps,
        current_step: 0,
        created_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadscout_common::types::{ApprovalStatus, ContactInfo, ProspectScores};

    fn prospect() -> DiscoveredProspect {
        DiscoveredProspect {
            prospect_id: "p1".to_string(),
            user_id: "u1".to_string(),
            name: "Jane Smith".to_string(),
            organization: Some("Acme Counseling Group".to_string()),
            job_title: Some("Clinical Director".to_string()),
            source_url: String::new(),
            source: "serper".to_string(),
            category: "psychologists".to_string(),
            contact: ContactInfo::default(),
            influence_score: 70.0,
            segment: Some(Segment::ReferralNetwork),
            approval_status: ApprovalStatus::Approved,
            scores: ProspectScores::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn five_step_sequence_has_five_steps_in_order() {
        let now = Utc::now();
        let seq = generate_sequence(&prospect(), SequenceType::FiveStep, Segment::ReferralNetwork, now);
        assert_eq!(seq.steps.len(), 5);
        assert_eq!(seq.steps[0].name, "connection_request");
        assert_eq!(seq.steps[1].name, "initial_dm");
        assert_eq!(seq.steps[4].name, "followup_3");
        assert_eq!(seq.current_step, 0);
    }

    #[test]
    fn steps_carry_multiple_bound_variants() {
        let seq = generate_sequence(
            &prospect(),
            SequenceType::ThreeStep,
            Segment::ReferralNetwork,
            Utc::now(),
        );
        for step in &seq.steps {
            assert!((2..=3).contains(&step.variants.len()));
            for variant in &step.variants {
                assert!(variant.contains("Jane"));
                assert!(!variant.contains('{'));
            }
        }
    }

    #[test]
    fn send_times_follow_the_type_gap() {
        let now = Utc::now();
        let seq = generate_sequence(&prospect(), SequenceType::SoftNudge, Segment::ReferralNetwork, now);
        assert_eq!(seq.steps[0].send_at, now);
        assert_eq!(seq.steps[1].send_at, now + Duration::days(7));
    }

    #[test]
    fn all_steps_start_not_sent() {
        let seq = generate_sequence(
            &prospect(),
            SequenceType::DirectCta,
            Segment::StealthFounder,
            Utc::now(),
        );
        assert!(seq.steps.iter().all(|s| s.status == StepStatus::NotSent));
    }
}
