//! Per-segment message template families. Placeholders `{name}`, `{role}`,
//! `{company}`, `{outreach_angle}` are bound at sequence-generation time.

use leadscout_common::types::Segment;

/// Kind of step a template family serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    ConnectionRequest,
    InitialDm,
    Followup,
}

impl StepKind {
    pub fn from_step_name(name: &str) -> Self {
        match name {
            "connection_request" => StepKind::ConnectionRequest,
            "initial_dm" => StepKind::InitialDm,
            _ => StepKind::Followup,
        }
    }
}

/// Template variants for a `(segment, step kind)` pair.
pub fn templates_for(segment: Segment, kind: StepKind) -> &'static [&'static str] {
    match (segment, kind) {
        (Segment::ReferralNetwork, StepKind::ConnectionRequest) => &[
            "Hi {name} — I work with families navigating school and treatment decisions, and your work as {role} at {company} keeps coming up. Would love to connect.",
            "Hi {name}, I often collaborate with {role}s and your practice at {company} stood out. Connecting in case our work ever overlaps.",
        ],
        (Segment::ReferralNetwork, StepKind::InitialDm) => &[
            "Thanks for connecting, {name}. {outreach_angle} — if a family you work with ever needs that kind of support, I'm glad to be a resource.",
            "Appreciate the connection, {name}. I focus on {outreach_angle}, which seems adjacent to what you do at {company}. Open to comparing notes sometime?",
            "Hi {name} — curious how you approach referrals at {company}. On my side, {outreach_angle}. Happy to share how we handle the handoff.",
        ],
        (Segment::ReferralNetwork, StepKind::Followup) => &[
            "Hi {name}, circling back — would a quick call about referral fit make sense in the next few weeks?",
            "No rush, {name} — just keeping this warm. If a case ever calls for {outreach_angle}, I'm easy to reach.",
        ],
        (Segment::ThoughtLeadership, StepKind::ConnectionRequest) => &[
            "Hi {name} — I write about where AI meets education, and your perspective as {role} at {company} is exactly the kind I learn from. Connecting.",
            "Hi {name}, your work at {company} overlaps with what I've been publishing on {outreach_angle}. Would be glad to connect.",
        ],
        (Segment::ThoughtLeadership, StepKind::InitialDm) => &[
            "Thanks for connecting, {name}. I recently dug into {outreach_angle} — curious whether that matches what you're seeing at {company}?",
            "Appreciate it, {name}. I'm comparing notes with a few {role}s on {outreach_angle}. What's been your read?",
            "Hi {name} — one question I keep asking leaders like you: how is {company} thinking about {outreach_angle}?",
        ],
        (Segment::ThoughtLeadership, StepKind::Followup) => &[
            "Hi {name} — published a short piece related to our thread on {outreach_angle}. Happy to send it over.",
            "Circling back, {name}. Still interested in your take on {outreach_angle} whenever timing works.",
        ],
        (Segment::StealthFounder, StepKind::ConnectionRequest) => &[
            "Hi {name} — building something quietly in this space and your background as {role} caught my eye. Connecting.",
            "Hi {name}, fellow builder here. Would value being connected given your work at {company}.",
        ],
        (Segment::StealthFounder, StepKind::InitialDm) => &[
            "Thanks for connecting, {name}. I'm heads-down on {outreach_angle} — early, unlaunched. Would genuinely value your take.",
            "Appreciate it, {name}. Working on {outreach_angle} under the radar; your experience at {company} is exactly the lens I'm missing.",
        ],
        (Segment::StealthFounder, StepKind::Followup) => &[
            "Hi {name} — made some progress on what I mentioned. Open to a quick look when you have a minute?",
            "No pressure, {name} — still building. Will share more when there's something worth your time.",
        ],
    }
}

/// Field values bound into a template.
#[derive(Debug, Clone, Default)]
pub struct TemplateBindings {
    pub name: String,
    pub role: String,
    pub company: String,
    pub outreach_angle: String,
}

pub fn render(template: &str, bindings: &TemplateBindings) -> String {
    template
        .replace("{name}", &bindings.name)
        .replace("{role}", &bindings.role)
        .replace("{company}", &bindings.company)
        .replace("{outreach_angle}", &bindings.outreach_angle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_segment_step_pair_has_variants() {
        for segment in [
            Segment::ReferralNetwork,
            Segment::ThoughtLeadership,
            Segment::StealthFounder,
        ] {
            for kind in [StepKind::ConnectionRequest, StepKind::InitialDm, StepKind::Followup] {
                let family = templates_for(segment, kind);
                assert!(
                    (2..=3).contains(&family.len()),
                    "{segment:?}/{kind:?} has {} variants",
                    family.len()
                );
            }
        }
    }

    #[test]
    fn rendering_binds_all_placeholders() {
        let bindings = TemplateBindings {
            name: "Jane".to_string(),
            role: "Clinical Director".to_string(),
            company: "Acme Counseling".to_string(),
            outreach_angle: "school placement support".to_string(),
        };
        for template in templates_for(Segment::ReferralNetwork, StepKind::InitialDm) {
            let rendered = render(template, &bindings);
            assert!(!rendered.contains('{'), "unbound placeholder in {rendered}");
        }
    }

    #[test]
    fn step_kinds_map_from_names() {
        assert_eq!(
            StepKind::from_step_name("connection_request"),
            StepKind::ConnectionRequest
        );
        assert_eq!(StepKind::from_step_name("initial_dm"), StepKind::InitialDm);
        assert_eq!(StepKind::from_step_name("followup_3"), StepKind::Followup);
    }
}
