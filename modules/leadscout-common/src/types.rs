use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// --- Pillars and audiences ---

/// Strategic content axis. Everything downstream - audiences, templates,
/// cadence weights - keys off this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Pillar {
    Referral,
    ThoughtLeadership,
    StealthFounder,
}

impl std::fmt::Display for Pillar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Pillar::Referral => write!(f, "referral"),
            Pillar::ThoughtLeadership => write!(f, "thought_leadership"),
            Pillar::StealthFounder => write!(f, "stealth_founder"),
        }
    }
}

impl std::str::FromStr for Pillar {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "referral" => Ok(Self::Referral),
            "thought_leadership" => Ok(Self::ThoughtLeadership),
            "stealth_founder" => Ok(Self::StealthFounder),
            other => Err(format!("unknown Pillar: {other}")),
        }
    }
}

impl Pillar {
    pub const ALL: [Pillar; 3] = [
        Pillar::Referral,
        Pillar::ThoughtLeadership,
        Pillar::StealthFounder,
    ];

    /// Deterministic audience tags for a pillar. Insights MUST carry exactly
    /// this set - it is derived, never stored independently by callers.
    pub fn audiences(&self) -> Vec<String> {
        let tags: &[&str] = match self {
            Pillar::Referral => &[
                "private_school_admins",
                "mental_health_professionals",
                "treatment_centers",
                "school_counselors",
            ],
            Pillar::ThoughtLeadership => &[
                "edtech_business_leaders",
                "ai_savvy_executives",
                "educators",
            ],
            Pillar::StealthFounder => &["early_adopters", "investors", "stealth_founders"],
        };
        tags.iter().map(|s| s.to_string()).collect()
    }

    /// Vocabulary used to match roles/titles against a pillar's audience.
    pub fn audience_vocabulary(&self) -> &'static [&'static str] {
        match self {
            Pillar::Referral => &[
                "therapist",
                "psychologist",
                "counselor",
                "psychiatrist",
                "clinician",
                "social worker",
                "admissions",
                "headmaster",
                "head of school",
                "principal",
                "dean",
                "clinical director",
                "treatment",
                "residential",
            ],
            Pillar::ThoughtLeadership => &[
                "ceo",
                "founder",
                "executive",
                "director",
                "vp",
                "president",
                "superintendent",
                "educator",
                "teacher",
                "professor",
                "product",
                "edtech",
            ],
            Pillar::StealthFounder => &[
                "founder",
                "investor",
                "partner",
                "angel",
                "venture",
                "builder",
                "stealth",
                "operator",
            ],
        }
    }
}

// --- Insights ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightStatus {
    Collecting,
    Processing,
    ReadyForContentGeneration,
    Failed,
}

impl InsightStatus {
    /// Ordering for the monotonic status guard: `ready` never reverts to
    /// `collecting`/`processing`. `failed` is terminal for the run but may be
    /// retried by a fresh workflow.
    pub fn rank(&self) -> u8 {
        match self {
            InsightStatus::Collecting => 0,
            InsightStatus::Processing => 1,
            InsightStatus::Failed => 2,
            InsightStatus::ReadyForContentGeneration => 3,
        }
    }
}

impl std::fmt::Display for InsightStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InsightStatus::Collecting => write!(f, "collecting"),
            InsightStatus::Processing => write!(f, "processing"),
            InsightStatus::ReadyForContentGeneration => write!(f, "ready_for_content_generation"),
            InsightStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Which external provider a research source came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchProvider {
    Perplexity,
    Firecrawl,
    Google,
}

impl std::fmt::Display for ResearchProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResearchProvider::Perplexity => write!(f, "perplexity"),
            ResearchProvider::Firecrawl => write!(f, "firecrawl"),
            ResearchProvider::Google => write!(f, "google"),
        }
    }
}

/// One normalized research source hanging off an insight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchSource {
    pub source_type: ResearchProvider,
    pub url: String,
    pub summary: String,
    pub key_points: Vec<String>,
    pub collected_at: DateTime<Utc>,
}

/// A candidate person/org surfaced during research, before discovery
/// ever runs. Not a prospect yet - no contact info, no validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProspectTarget {
    pub name: String,
    pub role: String,
    pub organization: String,
    pub url: Option<String>,
    pub pillar_relevance: Vec<Pillar>,
    /// [0, 1]
    pub relevance_score: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct EngagementSignals {
    pub relevance_score: f64,
    pub trend_score: f64,
    pub urgency_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    pub insight_id: String,
    pub user_id: String,
    pub topic: String,
    pub pillar: Pillar,
    /// Always `pillar.audiences()` - derived at creation, never caller-set.
    pub audiences: Vec<String>,
    pub tags: Vec<String>,
    pub status: InsightStatus,
    /// Stable over normalized topic + pillar. Unique per user among insights
    /// in `ready_for_content_generation`.
    pub dedup_hash: String,
    pub sources: Vec<ResearchSource>,
    pub prospect_targets: Vec<ProspectTarget>,
    pub engagement_signals: EngagementSignals,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Insight {
    pub fn new(user_id: &str, topic: &str, pillar: Pillar, dedup_hash: &str, now: DateTime<Utc>) -> Self {
        Self {
            insight_id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            topic: topic.to_string(),
            pillar,
            audiences: pillar.audiences(),
            tags: Vec::new(),
            status: InsightStatus::Collecting,
            dedup_hash: dedup_hash.to_string(),
            sources: Vec::new(),
            prospect_targets: Vec::new(),
            engagement_signals: EngagementSignals::default(),
            created_at: now,
            updated_at: now,
        }
    }
}

// --- Prospects ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

/// Outreach audience class. Assigned by the Outreach Engine, never at
/// discovery time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Segment {
    ReferralNetwork,
    ThoughtLeadership,
    StealthFounder,
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Segment::ReferralNetwork => write!(f, "referral_network"),
            Segment::ThoughtLeadership => write!(f, "thought_leadership"),
            Segment::StealthFounder => write!(f, "stealth_founder"),
        }
    }
}

impl std::str::FromStr for Segment {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "referral_network" => Ok(Self::ReferralNetwork),
            "thought_leadership" => Ok(Self::ThoughtLeadership),
            "stealth_founder" => Ok(Self::StealthFounder),
            other => Err(format!("unknown Segment: {other}")),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactInfo {
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl ContactInfo {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.phone.is_none()
    }
}

/// Component scores used for outreach prioritization, each in [0, 1].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ProspectScores {
    pub fit: f64,
    pub referral_capacity: f64,
    pub signal_strength: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredProspect {
    pub prospect_id: String,
    pub user_id: String,
    pub name: String,
    pub organization: Option<String>,
    pub job_title: Option<String>,
    pub source_url: String,
    /// Provider label, e.g. "serper", "firecrawl".
    pub source: String,
    /// The category whose search fan-out discovered this prospect. Set by
    /// the extractor from the invoking category, never inferred from content.
    pub category: String,
    pub contact: ContactInfo,
    /// [0, 100], deterministic given inputs.
    pub influence_score: f64,
    pub segment: Option<Segment>,
    pub approval_status: ApprovalStatus,
    pub scores: ProspectScores,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- Outreach sequences ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SequenceType {
    #[serde(rename = "3-step")]
    ThreeStep,
    #[serde(rename = "5-step")]
    FiveStep,
    #[serde(rename = "7-step")]
    SevenStep,
    #[serde(rename = "soft_nudge")]
    SoftNudge,
    #[serde(rename = "direct_cta")]
    DirectCta,
}

impl SequenceType {
    /// Named steps of this sequence type, in send order.
    pub fn step_names(&self) -> Vec<String> {
        let followups = match self {
            SequenceType::ThreeStep => 1,
            SequenceType::FiveStep => 3,
            SequenceType::SevenStep => 5,
            SequenceType::SoftNudge => 1,
            SequenceType::DirectCta => 0,
        };
        let mut names = vec!["connection_request".to_string(), "initial_dm".to_string()];
        for i in 1..=followups {
            names.push(format!("followup_{i}"));
        }
        names
    }
}

impl std::fmt::Display for SequenceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SequenceType::ThreeStep => write!(f, "3-step"),
            SequenceType::FiveStep => write!(f, "5-step"),
            SequenceType::SevenStep => write!(f, "7-step"),
            SequenceType::SoftNudge => write!(f, "soft_nudge"),
            SequenceType::DirectCta => write!(f, "direct_cta"),
        }
    }
}

impl std::str::FromStr for SequenceType {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "3-step" => Ok(Self::ThreeStep),
            "5-step" => Ok(Self::FiveStep),
            "7-step" => Ok(Self::SevenStep),
            "soft_nudge" => Ok(Self::SoftNudge),
            "direct_cta" => Ok(Self::DirectCta),
            other => Err(format!("unknown SequenceType: {other}")),
        }
    }
}

/// Per-step delivery state machine:
/// `not_sent → sent → delivered → (opened)? → (replied | no_response)
///  → (meeting_booked | not_interested)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    NotSent,
    Sent,
    Delivered,
    Opened,
    Replied,
    NoResponse,
    MeetingBooked,
    NotInterested,
}

impl StepStatus {
    /// Legal transitions only - anything else is a caller bug and is
    /// rejected as a validation error upstream.
    pub fn can_transition_to(&self, next: StepStatus) -> bool {
        use StepStatus::*;
        matches!(
            (self, next),
            (NotSent, Sent)
                | (Sent, Delivered)
                | (Delivered, Opened)
                | (Delivered, Replied)
                | (Delivered, NoResponse)
                | (Opened, Replied)
                | (Opened, NoResponse)
                | (Replied, MeetingBooked)
                | (Replied, NotInterested)
                | (NoResponse, NotInterested)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceStep {
    /// `connection_request`, `initial_dm`, `followup_1`…
    pub name: String,
    pub variants: Vec<String>,
    pub send_at: DateTime<Utc>,
    pub status: StepStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutreachSequence {
    pub sequence_id: String,
    pub user_id: String,
    pub prospect_id: String,
    pub sequence_type: SequenceType,
    pub segment: Segment,
    pub steps: Vec<SequenceStep>,
    /// Index into `steps`; advances only when a step is marked `sent`.
    pub current_step: usize,
    pub created_at: DateTime<Utc>,
}

// --- Content drafts ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftStatus {
    Draft,
    Approved,
    Scheduled,
    Published,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentDraft {
    pub draft_id: String,
    pub user_id: String,
    pub pillar: Pillar,
    pub topic: String,
    pub template_id: String,
    pub content: String,
    pub suggested_hashtags: Vec<String>,
    pub engagement_hook: String,
    pub status: DraftStatus,
    /// Must reference insights with `status = ready_for_content_generation`.
    pub linked_research_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
}

// --- Metrics ---

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricCounts {
    pub likes: u64,
    pub comments: u64,
    pub shares: u64,
    pub reactions: BTreeMap<String, u64>,
    pub impressions: u64,
    pub profile_views: u64,
    pub clicks: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentMetric {
    pub content_id: String,
    pub user_id: String,
    pub pillar: Pillar,
    pub platform: String,
    pub post_type: String,
    pub metrics: MetricCounts,
    /// Recomputed server-side on every update; client-provided values are
    /// ignored. `round((likes+comments+shares)/max(impressions,1)·100, 2)`,
    /// 0 when impressions = 0.
    pub engagement_rate: f64,
    pub top_hashtags: Vec<String>,
    pub audience_segment: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    Positive,
    Neutral,
    Negative,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DmRecord {
    pub message_id: String,
    pub sent_at: DateTime<Utc>,
    pub response_received_at: Option<DateTime<Utc>>,
    pub response_type: Option<ResponseType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingRecord {
    pub booked_at: DateTime<Utc>,
    pub source_message_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProspectMetric {
    pub prospect_id: String,
    pub user_id: String,
    pub sequence_id: String,
    pub connection_request_sent: Option<DateTime<Utc>>,
    pub connection_accepted: Option<DateTime<Utc>>,
    pub dm_sent: Vec<DmRecord>,
    pub meetings_booked: Vec<MeetingRecord>,
    /// positive replies / dms sent · 100, clamped [0, 100], 0 when no DMs.
    pub reply_rate: f64,
    /// meetings / dms sent · 100, clamped [0, 100], 0 when no DMs.
    pub meeting_rate: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- Learning patterns ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    ContentPillar,
    Hashtag,
    Topic,
    OutreachSequence,
    AudienceSegment,
}

impl std::fmt::Display for PatternType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PatternType::ContentPillar => write!(f, "content_pillar"),
            PatternType::Hashtag => write!(f, "hashtag"),
            PatternType::Topic => write!(f, "topic"),
            PatternType::OutreachSequence => write!(f, "outreach_sequence"),
            PatternType::AudienceSegment => write!(f, "audience_segment"),
        }
    }
}

impl std::str::FromStr for PatternType {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "content_pillar" => Ok(Self::ContentPillar),
            "hashtag" => Ok(Self::Hashtag),
            "topic" => Ok(Self::Topic),
            "outreach_sequence" => Ok(Self::OutreachSequence),
            "audience_segment" => Ok(Self::AudienceSegment),
            other => Err(format!("unknown PatternType: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuccessMetric {
    EngagementRate,
    ReplyRate,
    MeetingRate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningPattern {
    pub pattern_id: String,
    pub user_id: String,
    pub pattern_type: PatternType,
    pub pattern_key: String,
    pub success_metric: SuccessMetric,
    pub average_performance: f64,
    pub best_performance_variant: String,
    /// Always ≥ 1 - a pattern with no samples is never written.
    pub sample_size: u64,
    /// Bounded, recent-last.
    pub performance_history: Vec<f64>,
    pub last_updated: DateTime<Utc>,
}

// --- Activity ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Prospect,
    Outreach,
    Research,
    Insight,
    Content,
    Automation,
    Error,
}

impl std::fmt::Display for ActivityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActivityType::Prospect => write!(f, "prospect"),
            ActivityType::Outreach => write!(f, "outreach"),
            ActivityType::Research => write!(f, "research"),
            ActivityType::Insight => write!(f, "insight"),
            ActivityType::Content => write!(f, "content"),
            ActivityType::Automation => write!(f, "automation"),
            ActivityType::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for ActivityType {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "prospect" => Ok(Self::Prospect),
            "outreach" => Ok(Self::Outreach),
            "research" => Ok(Self::Research),
            "insight" => Ok(Self::Insight),
            "content" => Ok(Self::Content),
            "automation" => Ok(Self::Automation),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown ActivityType: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub id: String,
    pub user_id: String,
    pub activity_type: ActivityType,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub link: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
}

impl ActivityEvent {
    pub fn new(
        user_id: &str,
        activity_type: ActivityType,
        title: &str,
        message: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            activity_type,
            title: title.to_string(),
            message: message.to_string(),
            metadata: serde_json::Map::new(),
            link: None,
            timestamp: now,
            read: false,
        }
    }

    pub fn with_metadata(mut self, key: &str, value: serde_json::Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }

    pub fn with_link(mut self, link: &str) -> Self {
        self.link = Some(link.to_string());
        self
    }
}

// --- Webhooks ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Webhook {
    pub id: String,
    pub user_id: String,
    pub url: String,
    pub event_types: Vec<ActivityType>,
    pub secret: Option<String>,
    pub active: bool,
    pub consecutive_failures: u32,
    /// Auto-disable threshold. Default 5.
    pub disabled_after_failures: u32,
    pub created_at: DateTime<Utc>,
}

impl Webhook {
    pub fn new(user_id: &str, url: &str, event_types: Vec<ActivityType>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            url: url.to_string(),
            event_types,
            secret: None,
            active: true,
            consecutive_failures: 0,
            disabled_after_failures: 5,
            created_at: now,
        }
    }
}

// --- Scheduled topics ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

impl Frequency {
    pub fn interval_hours(&self) -> i64 {
        match self {
            Frequency::Daily => 24,
            Frequency::Weekly => 24 * 7,
            Frequency::Monthly => 24 * 30,
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Frequency::Daily => write!(f, "daily"),
            Frequency::Weekly => write!(f, "weekly"),
            Frequency::Monthly => write!(f, "monthly"),
        }
    }
}

impl std::str::FromStr for Frequency {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            other => Err(format!("unknown Frequency: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledTopicPlan {
    pub plan_id: String,
    pub user_id: String,
    pub topics: Vec<String>,
    pub frequency: Frequency,
    pub pillar: Pillar,
    pub created_at: DateTime<Utc>,
    pub last_run_at: Option<DateTime<Utc>>,
    pub next_due_at: DateTime<Utc>,
}

// --- Wire envelope ---

/// Uniform JSON response body for the HTTP layer sitting above the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(code: &str, message: &str) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code: code.to_string(),
                message: message.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audiences_are_deterministic_per_pillar() {
        assert_eq!(
            Pillar::ThoughtLeadership.audiences(),
            vec!["edtech_business_leaders", "ai_savvy_executives", "educators"]
        );
        assert_eq!(Pillar::Referral.audiences().len(), 4);
        assert_eq!(Pillar::StealthFounder.audiences().len(), 3);
    }

    #[test]
    fn insight_status_guard_ordering() {
        assert!(
            InsightStatus::ReadyForContentGeneration.rank() > InsightStatus::Collecting.rank()
        );
        assert!(InsightStatus::Processing.rank() > InsightStatus::Collecting.rank());
    }

    #[test]
    fn sequence_type_step_sets() {
        assert_eq!(
            SequenceType::ThreeStep.step_names(),
            vec!["connection_request", "initial_dm", "followup_1"]
        );
        assert_eq!(SequenceType::SevenStep.step_names().len(), 7);
        assert_eq!(SequenceType::DirectCta.step_names().len(), 2);
    }

    #[test]
    fn step_status_transitions() {
        assert!(StepStatus::NotSent.can_transition_to(StepStatus::Sent));
        assert!(StepStatus::Delivered.can_transition_to(StepStatus::Replied));
        assert!(!StepStatus::NotSent.can_transition_to(StepStatus::Replied));
        assert!(!StepStatus::Replied.can_transition_to(StepStatus::Sent));
    }

    #[test]
    fn sequence_type_serde_uses_wire_names() {
        let json = serde_json::to_string(&SequenceType::ThreeStep).unwrap();
        assert_eq!(json, "\"3-step\"");
        let parsed: SequenceType = serde_json::from_str("\"soft_nudge\"").unwrap();
        assert_eq!(parsed, SequenceType::SoftNudge);
    }

    #[test]
    fn pillar_roundtrips_via_fromstr() {
        for p in Pillar::ALL {
            let s = p.to_string();
            assert_eq!(s.parse::<Pillar>().unwrap(), p);
        }
    }
}
