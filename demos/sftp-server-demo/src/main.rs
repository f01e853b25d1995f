//! Wires up [`sftp_server::SftpServer`] with an in-memory user directory and
//! an ephemeral host key, for local testing. A real deployment would replace
//! [`StaticUserStore`] with a lookup against its own account system and load
//! a persisted host key instead of generating one at startup.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use sftp_server::{AuditSink, ServerConfig, SftpServer, UserAccount, UserStore};

struct StaticUserStore {
    accounts: HashMap<String, UserAccount>,
}

#[async_trait]
impl UserStore for StaticUserStore {
    async fn lookup(&self, username: &str) -> Option<UserAccount> {
        self.accounts.get(username).cloned()
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig {
        max_connections: env_u64("SFTP_MAX_CONNECTIONS", 16) as usize,
        idle_timeout_seconds: env_u64("SFTP_IDLE_TIMEOUT_SECONDS", 300),
        max_upload_bytes: env_u64("SFTP_MAX_UPLOAD_BYTES", 0),
        enable_logging: env_or("SFTP_ENABLE_LOGGING", "true") == "true",
    };

    if config.enable_logging {
        tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();
    }

    let root = PathBuf::from(env_or("SFTP_ROOT", "./sftp-root"));
    let mut accounts = HashMap::new();
    accounts.insert(
        "demo".to_string(),
        UserAccount {
            username: "demo".to_string(),
            home_directory: root,
            enabled: true,
            can_upload: true,
            can_download: true,
            can_delete: true,
            can_create_directory: true,
            max_upload_bytes: env_u64("SFTP_USER_MAX_UPLOAD_BYTES", 0),
        },
    );
    let user_store = Arc::new(StaticUserStore { accounts });

    let audit_log = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(env_or("SFTP_AUDIT_LOG", "audit.log"))
        .await?;
    let (audit, _audit_join) = AuditSink::spawn(audit_log);

    let server = SftpServer::new(user_store, Arc::new(audit), config);

    let russh_config = Arc::new(russh::server::Config {
        keys: vec![russh_keys::key::KeyPair::generate_ed25519().expect("ed25519 keygen")],
        ..Default::default()
    });

    let addr: std::net::SocketAddr = env_or("SFTP_LISTEN_ADDR", "127.0.0.1:2222").parse()?;
    sftp_server::run(server, russh_config, addr).await
}
