//! Repository traits, one per aggregate.

pub mod apps;
pub mod builds;
pub mod chunks;
pub mod manifests;
pub mod purchases;
pub mod sessions;
pub mod submissions;
pub mod users;

pub use apps::AppRepo;
pub use builds::BuildRepo;
pub use chunks::ChunkRepo;
pub use manifests::ManifestRepo;
pub use purchases::PurchaseRepo;
pub use sessions::SessionRepo;
pub use submissions::SubmissionRepo;
pub use users::UserRepo;
