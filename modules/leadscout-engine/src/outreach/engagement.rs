//! Engagement tracking: idempotent prospect-metric mutation, sequence step
//! advancement, and the feed into the learning core.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use leadscout_common::error::LeadScoutError;
use leadscout_common::types::{
    ActivityEvent, ActivityType, DmRecord, MeetingRecord, ProspectMetric, ResponseType,
    StepStatus,
};
use leadscout_store::UserStore;

use crate::deps::Services;
use crate::learning::{recompute_prospect_rates, LearningCore};

/// Which touch the engagement event is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TouchKind {
    ConnectionRequest,
    Dm,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngagementEvent {
    pub prospect_id: String,
    pub outreach_type: TouchKind,
    pub status: StepStatus,
    pub message_id: Option<String>,
    /// Reply classification, taken as provided.
    pub response_type: Option<ResponseType>,
}

pub struct EngagementTracker {
    services: Services,
}

/// Store-write retry: small, bounded.
const WRITE_ATTEMPTS: u32 = 3;
const WRITE_BACKOFF: Duration = Duration::from_millis(50);

impl EngagementTracker {
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    /// Track one engagement event. Idempotent per `(message_id, status)`:
    /// replaying an event changes nothing, including the sequence cursor.
    /// A learning-core failure is logged, never propagated - the engagement
    /// write has already committed.
    pub async fn track(
        &self,
        user_id: &str,
        event: EngagementEvent,
    ) -> Result<ProspectMetric, LeadScoutError> {
        let user = self.services.user_store(user_id);

        let sequence = user
            .latest_sequence_for_prospect(&event.prospect_id)
            .await?
            .ok_or_else(|| {
                LeadScoutError::Validation(format!(
                    "no outreach sequence for prospect {}",
                    event.prospect_id
                ))
            })?;

        let now = self.services.clock.now();
        let mut metric = user
            .get_prospect_metric(&event.prospect_id, &sequence.sequence_id)
            .await?
            .unwrap_or_else(|| ProspectMetric {
                prospect_id: event.prospect_id.clone(),
                user_id: user_id.to_string(),
                sequence_id: sequence.sequence_id.clone(),
                connection_request_sent: None,
                connection_accepted: None,
                dm_sent: Vec::new(),
                meetings_booked: Vec::new(),
                reply_rate: 0.0,
                meeting_rate: 0.0,
                created_at: now,
                updated_at: now,
            });

        let changed = apply_event(&mut metric, &event, now);

        if changed {
            recompute_prospect_rates(&mut metric);
            metric.updated_at = now;
            self.save_metric_with_retry(&user, &metric).await?;

            // Step advancement rides the same change gate, so a replayed
            // `sent` can't double-advance the cursor.
            if event.status == StepStatus::Sent {
                self.advance_sequence(&user, sequence, now).await?;
            }

            let learning = LearningCore::new(self.services.clone());
            if let Err(e) = learning.update_sequence_pattern(&user, &metric).await {
                warn!(
                    sequence_id = %metric.sequence_id,
                    error = %e,
                    "Learning update failed after engagement write"
                );
            }

            let activity = ActivityEvent::new(
                user_id,
                ActivityType::Outreach,
                "Engagement tracked",
                &format!(
                    "{:?} {:?} for prospect {}",
                    event.outreach_type, event.status, event.prospect_id
                ),
                now,
            )
            .with_metadata("prospect_id", serde_json::json!(event.prospect_id))
            .with_metadata("sequence_id", serde_json::json!(metric.sequence_id));
            if let Err(e) = self.services.realtime.publish(activity).await {
                warn!(error = %e, "Failed to publish engagement activity");
            }
        } else {
            info!(
                prospect_id = %event.prospect_id,
                status = ?event.status,
                "Engagement event replay ignored"
            );
        }

        Ok(metric)
    }

    async fn save_metric_with_retry(
        &self,
        user: &UserStore,
        metric: &ProspectMetric,
    ) -> Result<(), LeadScoutError> {
        for attempt in 1..=WRITE_ATTEMPTS {
            match user.save_prospect_metric(metric).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < WRITE_ATTEMPTS => {
                    warn!(attempt, error = %e, "Prospect metric write failed, retrying");
                    tokio::time::sleep(WRITE_BACKOFF * attempt).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
        unreachable!("retry loop returns")
    }

    /// Mark the current step sent and advance the cursor.
    async fn advance_sequence(
        &self,
        user: &UserStore,
        mut sequence: leadscout_common::types::OutreachSequence,
        _now: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), LeadScoutError> {
        let index = sequence.current_step;
        if let Some(step) = sequence.steps.get_mut(index) {
            if step.status.can_transition_to(StepStatus::Sent) {
                step.status = StepStatus::Sent;
            }
            sequence.current_step = (index + 1).min(sequence.steps.len());
            for attempt in 1..=WRITE_ATTEMPTS {
                match user.save_sequence(&sequence).await {
                    Ok(()) => return Ok(()),
                    Err(e) if attempt < WRITE_ATTEMPTS => {
                        warn!(attempt, error = %e, "Sequence write failed, retrying");
                        tokio::time::sleep(WRITE_BACKOFF * attempt).await;
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }
        Ok(())
    }
}

/// Apply the event to the metric. Returns false when the event is a replay
/// and nothing changed.
fn apply_event(
    metric: &mut ProspectMetric,
    event: &EngagementEvent,
    now: chrono::DateTime<chrono::Utc>,
) -> bool {
    match (event.outreach_type, event.status) {
        (TouchKind::ConnectionRequest, StepStatus::Sent) => {
            if metric.connection_request_sent.is_some() {
                return false;
            }
            metric.connection_request_sent = Some(now);
            true
        }
        // A reply to a connection request is the acceptance.
        (TouchKind::ConnectionRequest, StepStatus::Replied) => {
            if metric.connection_accepted.is_some() {
                return false;
            }
            metric.connection_accepted = Some(now);
            true
        }
        (TouchKind::Dm, StepStatus::Sent) => {
            let Some(message_id) = &event.message_id else {
                return false;
            };
            if metric.dm_sent.iter().any(|dm| &dm.message_id == message_id) {
                return false;
            }
            metric.dm_sent.push(DmRecord {
                message_id: message_id.clone(),
                sent_at: now,
                response_received_at: None,
                response_type: None,
            });
            true
        }
        (TouchKind::Dm, StepStatus::Replied) => {
            let Some(message_id) = &event.message_id else {
                return false;
            };
            let Some(dm) = metric
                .dm_sent
                .iter_mut()
                .find(|dm| &dm.message_id == message_id)
            else {
                return false;
            };
            if dm.response_received_at.is_some() {
                return false;
            }
            dm.response_received_at = Some(now);
            dm.response_type = event.response_type.or(Some(ResponseType::Neutral));
            true
        }
        (_, StepStatus::MeetingBooked) => {
            if metric
                .meetings_booked
                .iter()
                .any(|m| m.source_message_id == event.message_id)
            {
                return false;
            }
            metric.meetings_booked.push(MeetingRecord {
                booked_at: now,
                source_message_id: event.message_id.clone(),
            });
            true
        }
        // Delivery/open/no-response markers carry no metric fields today.
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn empty_metric() -> ProspectMetric {
        ProspectMetric {
            prospect_id: "p1".to_string(),
            user_id: "u1".to_string(),
            sequence_id: "s1".to_string(),
            connection_request_sent: None,
            connection_accepted: None,
            dm_sent: Vec::new(),
            meetings_booked: Vec::new(),
            reply_rate: 0.0,
            meeting_rate: 0.0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn dm_sent(message_id: &str) -> EngagementEvent {
        EngagementEvent {
            prospect_id: "p1".to_string(),
            outreach_type: TouchKind::Dm,
            status: StepStatus::Sent,
            message_id: Some(message_id.to_string()),
            response_type: None,
        }
    }

    #[test]
    fn dm_sent_is_idempotent_per_message() {
        let mut metric = empty_metric();
        let now = Utc::now();
        assert!(apply_event(&mut metric, &dm_sent("m1"), now));
        assert!(!apply_event(&mut metric, &dm_sent("m1"), now));
        assert!(apply_event(&mut metric, &dm_sent("m2"), now));
        assert_eq!(metric.dm_sent.len(), 2);
    }

    #[test]
    fn reply_attaches_once_with_classification() {
        let mut metric = empty_metric();
        let now = Utc::now();
        apply_event(&mut metric, &dm_sent("m1"), now);

        let reply = EngagementEvent {
            prospect_id: "p1".to_string(),
            outreach_type: TouchKind::Dm,
            status: StepStatus::Replied,
            message_id: Some("m1".to_string()),
            response_type: Some(ResponseType::Positive),
        };
        assert!(apply_event(&mut metric, &reply, now));
        assert!(!apply_event(&mut metric, &reply, now));
        assert_eq!(metric.dm_sent[0].response_type, Some(ResponseType::Positive));
    }

    #[test]
    fn reply_to_unknown_message_is_ignored() {
        let mut metric = empty_metric();
        let reply = EngagementEvent {
            prospect_id: "p1".to_string(),
            outreach_type: TouchKind::Dm,
            status: StepStatus::Replied,
            message_id: Some("ghost".to_string()),
            response_type: Some(ResponseType::Positive),
        };
        assert!(!apply_event(&mut metric, &reply, Utc::now()));
    }

    #[test]
    fn connection_lifecycle_is_idempotent() {
        let mut metric = empty_metric();
        let now = Utc::now();
        let sent = EngagementEvent {
            prospect_id: "p1".to_string(),
            outreach_type: TouchKind::ConnectionRequest,
            status: StepStatus::Sent,
            message_id: None,
            response_type: None,
        };
        assert!(apply_event(&mut metric, &sent, now));
        assert!(!apply_event(&mut metric, &sent, now));

        let accepted = EngagementEvent {
            status: StepStatus::Replied,
            ..sent
        };
        assert!(apply_event(&mut metric, &accepted, now));
        assert!(metric.connection_accepted.is_some());
    }

    #[test]
    fn meetings_dedup_by_source_message() {
        let mut metric = empty_metric();
        let now = Utc::now();
        let booked = EngagementEvent {
            prospect_id: "p1".to_string(),
            outreach_type: TouchKind::Dm,
            status: StepStatus::MeetingBooked,
            message_id: Some("m1".to_string()),
            response_type: None,
        };
        assert!(apply_event(&mut metric, &booked, now));
        assert!(!apply_event(&mut metric, &booked, now));
        assert_eq!(metric.meetings_booked.len(), 1);
    }
}
