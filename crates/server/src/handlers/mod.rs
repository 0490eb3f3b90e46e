//! HTTP request handlers.

pub mod admin;
pub mod apps;
pub mod auth;
pub mod builds;
pub mod chunks;
pub mod common;
pub mod manifests;
pub mod purchases;

pub use admin::*;
pub use apps::*;
pub use auth::*;
pub use builds::*;
pub use chunks::*;
pub use common::*;
pub use manifests::*;
pub use purchases::*;
