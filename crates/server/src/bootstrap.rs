//! Bootstrap admin provisioning.

use depot_core::config::AuthConfig;
use depot_core::token::Role;
use depot_metadata::MetadataStore;
use depot_metadata::models::NewUser;
use depot_metadata::repos::UserRepo;
use time::OffsetDateTime;

/// Ensure the configured bootstrap admin account exists.
///
/// Without at least one admin the review gate can never approve anything,
/// so a fresh deployment provisions one from config. An existing account
/// under the same email is promoted to admin rather than duplicated; its
/// password is left alone.
pub async fn ensure_bootstrap_admin(
    metadata: &dyn MetadataStore,
    config: &AuthConfig,
) -> anyhow::Result<()> {
    let Some(admin) = &config.bootstrap_admin else {
        tracing::warn!("no bootstrap admin configured; approvals require an existing admin");
        return Ok(());
    };

    let email = admin.email.trim().to_lowercase();
    if let Some(existing) = metadata.get_user_by_email(&email).await? {
        if existing.role != Role::Admin.as_str() {
            metadata
                .set_role(existing.user_id, Role::Admin.as_str())
                .await?;
            tracing::info!(user_id = existing.user_id, "promoted bootstrap admin");
        }
        return Ok(());
    }

    let password = admin.password.clone();
    let password_hash =
        tokio::task::spawn_blocking(move || depot_auth::hash_password(&password)).await?;

    let user_id = metadata
        .create_user(&NewUser {
            email,
            username: admin.username.clone(),
            password_hash,
            role: Role::Admin.as_str().to_string(),
            created_at: OffsetDateTime::now_utc(),
        })
        .await?;

    tracing::info!(user_id, "bootstrap admin created");
    Ok(())
}
