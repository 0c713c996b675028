pub mod cadence;
pub mod engagement;
pub mod prioritize;
pub mod segment;
pub mod sequence;
pub mod templates;

pub use cadence::{weekly_cadence, CadenceEntry, CadenceTargets, OutreachKind};
pub use engagement::{EngagementEvent, EngagementTracker, TouchKind};
pub use prioritize::{prioritize, priority_score, PriorityConfig};
pub use segment::{segment_prospects, SegmentationConfig, SegmentationResult};
pub use sequence::generate_sequence;

use chrono::NaiveDate;
use tracing::info;

use leadscout_common::error::LeadScoutError;
use leadscout_common::types::{
    ApprovalStatus, DiscoveredProspect, OutreachSequence, ProspectMetric, Segment, SequenceType,
};

use crate::deps::Services;

/// The outreach engine: a prospect moves
/// `discovered → segmented → prioritized → sequence_built →
/// cadence_scheduled → tracked`, and every stage here is deterministic.
pub struct OutreachEngine {
    services: Services,
    segmentation: SegmentationConfig,
    priority: PriorityConfig,
}

impl OutreachEngine {
    pub fn new(services: Services) -> Self {
        Self {
            services,
            segmentation: SegmentationConfig::default(),
            priority: PriorityConfig::default(),
        }
    }

    pub fn with_segmentation(mut self, config: SegmentationConfig) -> Self {
        self.segmentation = config;
        self
    }

    pub fn with_priority(mut self, config: PriorityConfig) -> Self {
        self.priority = config;
        self
    }

    /// Segment the user's approved prospects and persist the assignments.
    pub async fn segment(&self, user_id: &str) -> Result<SegmentationResult, LeadScoutError> {
        let user = self.services.user_store(user_id);
        let prospects = user
            .list_prospects(Some(ApprovalStatus::Approved), 10_000)
            .await?;

        let result = segment_prospects(&prospects, &self.segmentation);

        let by_id: std::collections::HashMap<&str, Segment> = result
            .assignments
            .iter()
            .map(|(id, s)| (id.as_str(), *s))
            .collect();
        for mut prospect in prospects {
            if let Some(segment) = by_id.get(prospect.prospect_id.as_str()) {
                prospect.segment = Some(*segment);
                prospect.updated_at = self.services.clock.now();
                user.save_prospect(&prospect).await?;
            }
        }

        Ok(result)
    }

    /// Rank the user's segmented prospects by priority.
    pub async fn prioritize(
        &self,
        user_id: &str,
    ) -> Result<Vec<(f64, DiscoveredProspect)>, LeadScoutError> {
        let user = self.services.user_store(user_id);
        let prospects = user
            .list_prospects(Some(ApprovalStatus::Approved), 10_000)
            .await?;
        Ok(prioritize(prospects, &self.priority))
    }

    /// Build and persist an outreach sequence for one prospect. The segment
    /// must already be assigned - sequences don't guess.
    pub async fn generate_sequence(
        &self,
        user_id: &str,
        prospect_id: &str,
        sequence_type: SequenceType,
    ) -> Result<OutreachSequence, LeadScoutError> {
        let user = self.services.user_store(user_id);
        let prospect = user.get_prospect(prospect_id).await?.ok_or_else(|| {
            LeadScoutError::Validation(format!("unknown prospect {prospect_id}"))
        })?;
        let segment = prospect.segment.ok_or_else(|| {
            LeadScoutError::Validation(format!("prospect {prospect_id} is not segmented yet"))
        })?;

        let sequence = generate_sequence(
            &prospect,
            sequence_type,
            segment,
            self.services.clock.now(),
        );
        user.save_sequence(&sequence).await?;

        info!(
            prospect_id,
            sequence_id = %sequence.sequence_id,
            sequence_type = %sequence_type,
            "Outreach sequence generated"
        );
        Ok(sequence)
    }

    /// Deterministic weekly cadence over the segmented prospect pool.
    pub async fn weekly_cadence(
        &self,
        user_id: &str,
        week_start: NaiveDate,
        targets: CadenceTargets,
    ) -> Result<Vec<CadenceEntry>, LeadScoutError> {
        let user = self.services.user_store(user_id);
        let prospects = user
            .list_prospects(Some(ApprovalStatus::Approved), 10_000)
            .await?;

        let segmented: Vec<(DiscoveredProspect, Segment)> = prospects
            .into_iter()
            .filter_map(|p| p.segment.map(|s| (p, s)))
            .collect();

        Ok(weekly_cadence(user_id, week_start, &segmented, targets))
    }

    /// Track one engagement event (see `EngagementTracker`).
    pub async fn track_engagement(
        &self,
        user_id: &str,
        event: EngagementEvent,
    ) -> Result<ProspectMetric, LeadScoutError> {
        EngagementTracker::new(self.services.clone())
            .track(user_id, event)
            .await
    }
}
