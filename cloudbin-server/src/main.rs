// Copyright 2025 Cloudbin (https://github.com/cloudbin)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use cloudbin_core::SecretCipher;
use cloudbin_drivers::DriverRegistry;
use cloudbin_server::api;
use cloudbin_server::config::{SecurityConfig, ServerConfig};
use cloudbin_server::{AppState, AuthService};
use cloudbin_storage::{run_migrations, Database, SqliteDatabase};

#[derive(Parser, Debug)]
#[command(name = "cloudbin-server", about = "Multi-tenant file and text sharing backend")]
struct Args {
    /// Path to a TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address override
    #[arg(long)]
    listen: Option<String>,

    /// Encryption secret (falls back to CLOUDBIN_ENCRYPTION_SECRET)
    #[arg(long, env = "CLOUDBIN_ENCRYPTION_SECRET", hide_env_values = true)]
    encryption_secret: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cloudbin_server=info,cloudbin_storage=info".into()),
        )
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => {
            let secret = args
                .encryption_secret
                .clone()
                .context("CLOUDBIN_ENCRYPTION_SECRET is required when no config file is given")?;
            ServerConfig {
                server: Default::default(),
                storage: Default::default(),
                security: SecurityConfig {
                    encryption_secret: secret,
                    admin_token_ttl_hours: 24,
                },
            }
        }
    };
    if let Some(listen) = args.listen {
        config.server.listen_addr = listen;
    }
    config.validate()?;

    let db: Arc<dyn Database> = Arc::new(SqliteDatabase::open(&config.storage.db_path)?);
    run_migrations(db.as_ref())?;
    info!(db = %config.storage.db_path.display(), "database ready");

    bootstrap_admin(db.clone(), config.security.admin_token_ttl_hours)?;

    let state = AppState::new(
        db,
        Arc::new(DriverRegistry::new()),
        SecretCipher::new(&config.security.encryption_secret),
        config.security.admin_token_ttl_hours,
    );
    let app = api::router(state, config.server.enable_cors);

    let listener = tokio::net::TcpListener::bind(&config.server.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.server.listen_addr))?;
    info!(addr = %config.server.listen_addr, "cloudbin server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    info!("server stopped");
    Ok(())
}

/// Seed a first admin when the table is empty, printing the one-time
/// credentials to the log
fn bootstrap_admin(db: Arc<dyn Database>, token_ttl_hours: i64) -> Result<()> {
    let admins = db.query("SELECT id FROM admins LIMIT 1", &[])?;
    if !admins.is_empty() {
        return Ok(());
    }
    let password = bootstrap_password();
    let auth = AuthService::new(db, token_ttl_hours);
    auth.create_admin("admin", "admin", &password)?;
    warn!(
        username = "admin",
        password, "created initial admin; change this password immediately"
    );
    Ok(())
}

fn bootstrap_password() -> String {
    use rand::Rng;
    const ALPHABET: &[u8] = b"abcdefghijkmnpqrstuvwxyzABCDEFGHJKLMNPQRSTUVWXYZ23456789";
    let mut rng = rand::thread_rng();
    (0..16)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };
    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install sigterm handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
