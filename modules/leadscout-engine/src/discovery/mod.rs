pub mod engine;
pub mod extract;
pub mod queries;
pub mod score;
pub mod validate;

pub use engine::{DiscoveryEngine, DiscoveryEnvelope, DiscoveryRequest};
pub use extract::{ExtractorRegistry, ProspectDraft, SiteExtractor};
