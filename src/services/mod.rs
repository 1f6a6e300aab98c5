pub mod interactions;
pub mod loader;
pub mod recommender;
pub mod scoring;
pub mod store;

pub use interactions::{build_rating_table, BuildError};
pub use loader::{ArtifactKeys, ArtifactLoader, DecodeError, LoadError, StartupError};
pub use recommender::{recommend, RecommendationError, Recommender};
pub use scoring::{LatentVector, ScoreError, Scorer, SvdModel};
pub use store::{ArtifactStore, FsBlobStore, HttpBlobStore, StoreError};
