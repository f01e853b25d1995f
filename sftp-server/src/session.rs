use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use russh::server::{Auth, Handler, Msg, Server, Session};
use russh::{Channel, ChannelId, CryptoVec};
use russh_keys::key::PublicKey;
use tracing::{debug, info, warn};

use crate::audit::AuditSink;
use crate::subsystem::{IdleProbe, Subsystem};
use crate::user::{UserAccount, UserStore};

/// How often the idle-timeout watcher re-checks a channel's [`IdleProbe`].
/// Fixed rather than derived from the configured timeout: a short, constant
/// poll interval keeps the worst-case overshoot bounded and small regardless
/// of how long the configured window is.
const IDLE_WATCH_INTERVAL: Duration = Duration::from_secs(1);

/// Poll `probe` until it reports the channel expired, then close it. Runs as
/// its own task for the lifetime of one `sftp` channel; exits on its own once
/// the channel closes, since `handle.close` on an already-gone channel is a
/// harmless no-op and the task is dropped along with nothing else keeping it
/// alive (§4.4).
async fn watch_for_idle_timeout(handle: russh::server::Handle, channel: ChannelId, probe: IdleProbe) {
    loop {
        tokio::time::sleep(IDLE_WATCH_INTERVAL).await;
        if probe.is_expired() {
            let _ = handle.close(channel).await;
            return;
        }
    }
}

/// §6 "Configurable options" plus the session orchestrator's own
/// max-connections cap (§4.5).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// 0 means unlimited.
    pub max_connections: usize,
    /// 0 means no timeout (§6 `idleTimeoutSeconds`).
    pub idle_timeout_seconds: u64,
    /// Subsystem-wide default; combined with the per-user ceiling via
    /// `UserAccount::effective_upload_ceiling` (§6 `maxUploadBytes`).
    pub max_upload_bytes: u64,
    /// Whether the embedding binary installs a `tracing` subscriber; the
    /// library always emits through `tracing` regardless (§10.2).
    pub enable_logging: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            max_connections: 0,
            idle_timeout_seconds: 0,
            max_upload_bytes: 0,
            enable_logging: true,
        }
    }
}

impl ServerConfig {
    fn idle_timeout(&self) -> Option<Duration> {
        if self.idle_timeout_seconds == 0 {
            None
        } else {
            Some(Duration::from_secs(self.idle_timeout_seconds))
        }
    }
}

/// Accept one slot against `max` (0 = unlimited), atomically. Split out as a
/// free function so the cap arithmetic is unit-testable without a live
/// connection.
fn try_admit(active: &AtomicUsize, max: usize) -> bool {
    loop {
        let current = active.load(Ordering::SeqCst);
        if max != 0 && current >= max {
            return false;
        }
        if active
            .compare_exchange(current, current + 1, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            return true;
        }
    }
}

static NEXT_SESSION_ID: AtomicUsize = AtomicUsize::new(1);

/// §4.5 session orchestrator: the `russh::server::Server` factory. One
/// `SftpSession` is produced per accepted TCP connection.
#[derive(Clone)]
pub struct SftpServer {
    user_store: Arc<dyn UserStore>,
    audit: Arc<AuditSink>,
    config: Arc<ServerConfig>,
    active_connections: Arc<AtomicUsize>,
}

impl SftpServer {
    pub fn new(user_store: Arc<dyn UserStore>, audit: Arc<AuditSink>, config: ServerConfig) -> Self {
        SftpServer {
            user_store,
            audit,
            config: Arc::new(config),
            active_connections: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl Server for SftpServer {
    type Handler = SftpSession;

    fn new_client(&mut self, addr: Option<std::net::SocketAddr>) -> SftpSession {
        let session_id = format!("s{}", NEXT_SESSION_ID.fetch_add(1, Ordering::SeqCst));
        let admitted = try_admit(&self.active_connections, self.config.max_connections);
        debug!(session_id, ?addr, admitted, "new ssh connection");
        if !admitted {
            self.audit.connection_failed(&session_id, "max connections reached");
        }

        SftpSession {
            user_store: self.user_store.clone(),
            audit: self.audit.clone(),
            config: self.config.clone(),
            active_connections: self.active_connections.clone(),
            session_id,
            username: None,
            user: None,
            admitted,
            counted: admitted,
            subsystems: HashMap::new(),
        }
    }
}

/// Per-connection state: the authenticated user (once known) and the one
/// [`Subsystem`] bound to the `sftp` channel (if/when requested). §4.4's
/// idle window is enforced by a background watcher task spawned in
/// `subsystem_request`, which polls the channel's [`IdleProbe`] and closes
/// the channel once it reports expiry; see that function for details.
pub struct SftpSession {
    user_store: Arc<dyn UserStore>,
    audit: Arc<AuditSink>,
    config: Arc<ServerConfig>,
    active_connections: Arc<AtomicUsize>,
    session_id: String,
    username: Option<String>,
    user: Option<UserAccount>,
    admitted: bool,
    counted: bool,
    subsystems: HashMap<ChannelId, Subsystem>,
}

impl SftpSession {
    fn disconnect(&mut self) {
        if self.counted {
            self.counted = false;
            self.active_connections.fetch_sub(1, Ordering::SeqCst);
        }
        if let Some(username) = self.username.take() {
            self.audit.disconnected(&self.session_id, &username);
        }
        self.subsystems.clear();
    }

    async fn authenticate(&mut self, username: &str) -> Auth {
        if !self.admitted {
            return Auth::Reject {
                proceed_with_methods: None,
            };
        }
        match self.user_store.lookup(username).await {
            Some(account) if account.enabled => {
                self.audit.auth_success(&self.session_id, username);
                self.username = Some(username.to_string());
                self.user = Some(account);
                Auth::Accept
            }
            _ => {
                self.audit.auth_failed(&self.session_id, username);
                Auth::Reject {
                    proceed_with_methods: None,
                }
            }
        }
    }

}

#[async_trait::async_trait]
impl Handler for SftpSession {
    type Error = anyhow::Error;

    async fn auth_publickey(&mut self, user: &str, _key: &PublicKey) -> Result<Auth, Self::Error> {
        Ok(self.authenticate(user).await)
    }

    async fn auth_password(&mut self, user: &str, _password: &str) -> Result<Auth, Self::Error> {
        Ok(self.authenticate(user).await)
    }

    async fn channel_open_session(
        &mut self,
        _channel: Channel<Msg>,
        _session: &mut Session,
    ) -> Result<bool, Self::Error> {
        Ok(self.admitted)
    }

    /// Refuse `shell`/`exec`; this server only speaks the `sftp` subsystem
    /// (§4.5).
    async fn shell_request(&mut self, channel: ChannelId, session: &mut Session) -> Result<(), Self::Error> {
        session.data(channel, CryptoVec::from_slice(b"This server only supports the sftp subsystem.\n"));
        session.close(channel);
        Ok(())
    }

    async fn exec_request(
        &mut self,
        channel: ChannelId,
        _data: &[u8],
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        session.data(channel, CryptoVec::from_slice(b"This server only supports the sftp subsystem.\n"));
        session.close(channel);
        Ok(())
    }

    async fn subsystem_request(
        &mut self,
        channel: ChannelId,
        name: &str,
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        if name != "sftp" {
            session.channel_failure(channel);
            return Ok(());
        }

        let Some(user) = self.user.clone() else {
            warn!(session_id = %self.session_id, "subsystem request before authentication");
            session.channel_failure(channel);
            return Ok(());
        };

        match Subsystem::new(
            user.home_directory.clone(),
            user.clone(),
            self.session_id.clone(),
            self.config.max_upload_bytes,
            self.config.idle_timeout(),
            self.audit.clone(),
        )
        .await
        {
            Ok(subsystem) => {
                if self.config.idle_timeout().is_some() {
                    tokio::spawn(watch_for_idle_timeout(session.handle(), channel, subsystem.idle_probe()));
                }
                self.subsystems.insert(channel, subsystem);
                self.audit.connected(&self.session_id, &user.username);
                session.channel_success(channel);
            }
            Err(err) => {
                warn!(session_id = %self.session_id, error = %err, "failed to start sftp subsystem");
                self.audit.connection_failed(&self.session_id, &err.to_string());
                session.channel_failure(channel);
            }
        }
        Ok(())
    }

    async fn data(&mut self, channel: ChannelId, data: &[u8], session: &mut Session) -> Result<(), Self::Error> {
        let Some(subsystem) = self.subsystems.get_mut(&channel) else {
            return Ok(());
        };

        let responses = subsystem.on_data(data).await;
        for response in responses {
            session.data(channel, CryptoVec::from_slice(&response));
        }
        Ok(())
    }

    async fn channel_close(&mut self, channel: ChannelId, _session: &mut Session) -> Result<(), Self::Error> {
        if let Some(mut subsystem) = self.subsystems.remove(&channel) {
            subsystem.teardown();
        }
        self.disconnect();
        Ok(())
    }

    async fn channel_eof(&mut self, channel: ChannelId, session: &mut Session) -> Result<(), Self::Error> {
        session.close(channel);
        Ok(())
    }
}

impl Drop for SftpSession {
    fn drop(&mut self) {
        if self.counted {
            self.counted = false;
            self.active_connections.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

/// Bind a configured [`SftpServer`] to a listening address and run the
/// accept loop until it errors or is cancelled (§4.5, §5 "cancellation").
pub async fn run(
    mut server: SftpServer,
    russh_config: Arc<russh::server::Config>,
    addr: impl Into<std::net::SocketAddr>,
) -> anyhow::Result<()> {
    let addr = addr.into();
    info!(%addr, "starting sftp server");
    russh::server::run(russh_config, addr, &mut server).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admission_is_capped() {
        let active = AtomicUsize::new(0);
        assert!(try_admit(&active, 2));
        assert!(try_admit(&active, 2));
        assert!(!try_admit(&active, 2));
        assert_eq!(active.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn zero_cap_is_unlimited() {
        let active = AtomicUsize::new(0);
        for _ in 0..100 {
            assert!(try_admit(&active, 0));
        }
    }

    #[test]
    fn idle_timeout_zero_means_none() {
        let config = ServerConfig { idle_timeout_seconds: 0, ..Default::default() };
        assert_eq!(config.idle_timeout(), None);
        let config = ServerConfig { idle_timeout_seconds: 30, ..Default::default() };
        assert_eq!(config.idle_timeout(), Some(Duration::from_secs(30)));
    }
}
