// Core exports
pub mod catalog;
pub mod error;
pub mod mutation;
pub mod scorer;
pub mod session;

pub use catalog::JobCatalog;
pub use error::SyncError;
pub use mutation::{
    AvatarUpload, MutationController, MutationOp, MutationReport, MutationState, MutationTarget,
};
pub use scorer::{MatchInput, MatchModel, MatchVerdict, ModelError, RelevanceScorer};
pub use session::{summarize, Session, SessionRegistry};
