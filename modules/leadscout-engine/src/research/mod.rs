pub mod autolink;
pub mod normalize;
pub mod pipeline;
pub mod targets;
pub mod topic_intel;

pub use autolink::ContentLinker;
pub use pipeline::ResearchPipeline;
