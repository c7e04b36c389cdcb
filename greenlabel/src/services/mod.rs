mod branches;
mod pipeline;
mod resolver;
mod verification;
mod writes;

pub use branches::{
    detect_keywords, logo_score, CatalogBranch, LogoBranch, RegistryRecordBranch,
    VerificationBranch, VerificationInput, ORGANIC_KEYWORDS,
};
pub use pipeline::DiscoveryPipeline;
pub use resolver::{SearchCache, SearchResolver};
pub use verification::{merge_outcomes, VerificationService};
