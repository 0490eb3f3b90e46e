//! Depot client binary: publisher upload and user install flows.

mod api_client;
mod chunker;
mod download;
mod error;
mod upload;

use anyhow::{Context, Result};
use api_client::{ApiClient, LoginRequest, RegisterRequest};
use clap::{Parser, Subcommand};
use depot_core::coords::BuildCoords;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Depot - publish and install content-addressed builds
#[derive(Parser, Debug)]
#[command(name = "depot")]
#[command(version, about, long_about = None)]
struct Args {
    /// Server base URL
    #[arg(long, env = "DEPOT_SERVER", default_value = "http://127.0.0.1:8080")]
    server: String,

    /// Access token (from `depot login`)
    #[arg(long, env = "DEPOT_TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a new account and print its tokens
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        device_id: Option<String>,
    },
    /// Log in and print tokens
    Login {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        password: String,
        #[arg(long)]
        device_id: Option<String>,
    },
    /// Exchange a refresh token for fresh tokens
    Refresh {
        #[arg(long)]
        refresh_token: String,
        #[arg(long)]
        device_id: Option<String>,
    },
    /// Create an app
    CreateApp {
        #[arg(long)]
        slug: String,
        #[arg(long)]
        title: String,
    },
    /// Chunk a build tree, upload missing chunks and finalize (publisher)
    Publish {
        #[arg(long)]
        app_id: i64,
        #[arg(long)]
        slug: String,
        #[arg(long)]
        version: String,
        #[arg(long)]
        platform: String,
        #[arg(long, default_value = "stable")]
        channel: String,
        #[arg(long, default_value_t = depot_core::DEFAULT_CHUNK_SIZE)]
        chunk_size: u64,
        /// Build tree to publish
        folder: PathBuf,
    },
    /// Download and install a build
    Install {
        #[arg(long)]
        slug: String,
        #[arg(long)]
        platform: String,
        #[arg(long, default_value = "stable")]
        channel: String,
        #[arg(long)]
        version: Option<String>,
        #[arg(long, default_value_t = download::DEFAULT_WORKERS)]
        workers: usize,
        /// Installation directory
        dest: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    let args = Args::parse();
    let client = ApiClient::new(&args.server, args.token.as_deref())?;

    match args.command {
        Command::Register {
            email,
            password,
            username,
            device_id,
        } => {
            let response = client
                .register(&RegisterRequest {
                    email,
                    password,
                    username,
                    device_id,
                })
                .await?;
            println!("access_token: {}", response.access_token);
            println!("refresh_token: {}", response.refresh_token);
            println!(
                "user {}: {} <{}> ({})",
                response.user.id, response.user.username, response.user.email, response.user.role
            );
        }
        Command::Login {
            email,
            username,
            password,
            device_id,
        } => {
            let response = client
                .login(&LoginRequest {
                    email,
                    username,
                    password,
                    device_id,
                })
                .await?;
            println!("access_token: {}", response.access_token);
            println!("refresh_token: {}", response.refresh_token);
            println!(
                "user {}: {} <{}> ({})",
                response.user.id, response.user.username, response.user.email, response.user.role
            );
        }
        Command::Refresh {
            refresh_token,
            device_id,
        } => {
            let response = client
                .refresh(&refresh_token, device_id.as_deref())
                .await?;
            println!("access_token: {}", response.access_token);
            println!("refresh_token: {}", response.refresh_token);
        }
        Command::CreateApp { slug, title } => {
            let response = client.create_app(&slug, &title).await?;
            println!("app id: {}", response.id);
        }
        Command::Publish {
            app_id,
            slug,
            version,
            platform,
            channel,
            chunk_size,
            folder,
        } => {
            let coords = BuildCoords::parse(&slug, &version, &platform, &channel)
                .context("invalid build coordinates")?;
            let folder = folder
                .canonicalize()
                .context("build folder does not exist")?;

            let manifest = chunker::build_manifest(&folder, &coords, chunk_size)?;
            manifest.validate()?;
            println!(
                "manifest: {} files, {} bytes, {} distinct chunks",
                manifest.files.len(),
                manifest.total_size,
                manifest.distinct_chunk_hashes().len()
            );

            let build = client
                .create_build(app_id, &version, &platform, &channel)
                .await?;
            let finalized = upload::publish_build(&client, build.id, &manifest, &folder).await?;
            println!("manifest url: {}", finalized.manifest_url);
            println!("submission: {} (pending review)", finalized.submission_id);
        }
        Command::Install {
            slug,
            platform,
            channel,
            version,
            workers,
            dest,
        } => {
            let manifest = download::install(
                &client,
                &slug,
                &platform,
                &channel,
                version.as_deref(),
                &dest,
                workers,
            )
            .await
            .map_err(|e| {
                if e.is_corruption() {
                    anyhow::anyhow!("build is corrupt, do not retry blindly: {e}")
                } else {
                    anyhow::anyhow!(e)
                }
            })?;
            println!(
                "installed {} {} ({} files) to {}",
                manifest.app,
                manifest.version,
                manifest.files.len(),
                dest.display()
            );
        }
    }

    Ok(())
}
