//! Abertura da conexão TCP e despacho para o protocolo selecionado.
//!
//! A resolução e a conexão são apenas IPv4, como no daemon original;
//! registros AAAA são descartados.

use crate::belkin::BelkinSession;
use crate::cancel::CancellationToken;
use crate::config::Mode;
use crate::error::ClientError;
use crate::nut::NutSession;
use crate::status::StatusStore;
use crate::transport::POLL_TICK;
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Uma tentativa de conexão completa, do resolve até o fim da sessão.
///
/// `Ok(())` significa parada limpa por cancelamento.
pub trait Connector: Send {
    fn connect(
        &mut self,
        host: &str,
        port: u16,
        mode: Mode,
        token: &CancellationToken,
    ) -> Result<(), ClientError>;
}

enum Protocol {
    Belkin(BelkinSession),
    Nut(NutSession),
}

/// Conector TCP real que publica o resultado no [`StatusStore`].
#[derive(Debug, Clone)]
pub struct ConnectionManager {
    store: StatusStore,
    connect_timeout: Duration,
}

impl ConnectionManager {
    pub fn new(store: StatusStore) -> Self {
        Self {
            store,
            connect_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    fn session(
        &self,
        host: &str,
        port: u16,
        mode: Mode,
        token: &CancellationToken,
    ) -> Result<(), ClientError> {
        let addrs = resolve_ipv4(host, port)?;

        let mut protocol = if mode.is_belkin() {
            Protocol::Belkin(BelkinSession::try_new()?)
        } else {
            Protocol::Nut(NutSession::try_new()?)
        };

        let mut stream = None;
        for addr in &addrs {
            if token.is_cancelled() {
                return Ok(());
            }
            match TcpStream::connect_timeout(addr, self.connect_timeout) {
                Ok(s) => {
                    stream = Some(s);
                    break;
                }
                Err(e) => debug!("Falha ao conectar em {addr}: {e}"),
            }
        }
        let Some(mut stream) = stream else {
            return Err(ClientError::ConnectionRefused {
                host: host.to_string(),
                port,
            });
        };

        if let Err(e) = stream.set_read_timeout(Some(POLL_TICK)) {
            warn!("Não foi possível definir read timeout: {e}");
        }
        let peer = stream.peer_addr().ok();
        self.store.update(|s| s.peer = peer);
        info!("Conectado a {host}:{port} ({mode:?})");

        let result = match &mut protocol {
            Protocol::Belkin(session) => session.run(&mut stream, &self.store, token),
            Protocol::Nut(session) => session.run(&mut stream, &self.store, token),
        };
        let _ = stream.shutdown(Shutdown::Both);
        result
    }
}

impl Connector for ConnectionManager {
    fn connect(
        &mut self,
        host: &str,
        port: u16,
        mode: Mode,
        token: &CancellationToken,
    ) -> Result<(), ClientError> {
        info!("Conectando a {host}:{port}");
        // Leitores veem "desconectado" antes mesmo do socket existir.
        self.store.update(|s| {
            s.reset();
            s.peer = None;
        });

        let result = self.session(host, port, mode, token);

        match &result {
            Ok(()) => info!("Desconectando de {host}:{port}"),
            Err(ClientError::LostConnection) => {
                warn!("Conexão com {host}:{port} perdida");
                self.store.reset_with_log(&ClientError::LostConnection.to_string());
            }
            Err(e) => {
                warn!("Falha ao conectar em {host}:{port}: {e}");
                self.store.set_log(&e.to_string());
            }
        }
        self.store.update(|s| s.peer = None);
        result
    }
}

/// Resolve `host` apenas para endereços IPv4.
pub fn resolve_ipv4(host: &str, port: u16) -> Result<Vec<SocketAddr>, ClientError> {
    let unresolved = || ClientError::HostResolution {
        host: host.to_string(),
    };
    let addrs: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(|e| {
            debug!("Resolução de {host} falhou: {e}");
            unresolved()
        })?
        .filter(SocketAddr::is_ipv4)
        .collect();

    if addrs.is_empty() {
        return Err(unresolved());
    }
    Ok(addrs)
}
