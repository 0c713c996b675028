pub mod config;
pub mod error;
pub mod types;
pub mod util;

pub use config::Config;
pub use error::LeadScoutError;
pub use types::*;
pub use util::{content_hash, extract_domain, normalize_tag, normalize_topic, trigram_similarity};

/// Dedup hash for the research cache: stable over normalized topic + pillar.
pub fn insight_dedup_hash(topic: &str, pillar: types::Pillar) -> String {
    content_hash(&format!("{}|{}", normalize_topic(topic), pillar))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_hash_is_stable_over_formatting() {
        let a = insight_dedup_hash("AI in K-12 Education", Pillar::ThoughtLeadership);
        let b = insight_dedup_hash("ai in k12  education!", Pillar::ThoughtLeadership);
        assert_eq!(a, b);
    }

    #[test]
    fn dedup_hash_differs_per_pillar() {
        let a = insight_dedup_hash("AI in K-12 Education", Pillar::ThoughtLeadership);
        let b = insight_dedup_hash("AI in K-12 Education", Pillar::Referral);
        assert_ne!(a, b);
    }
}
