//! Ciclo de vida do worker: thread de fundo, loop de reconexão e parada.
//!
//! Um único worker por [`ClientHandle`]. Para trocar a configuração, o
//! chamador para o cliente atual (`stop` bloqueia até a thread sair) e só
//! então inicia outro; o ciclo não protege contra `start`/`stop` concorrentes.

use crate::cancel::{CancellationSource, CancellationToken};
use crate::config::{ClientConfig, Mode};
use crate::connection::{ConnectionManager, Connector};
use crate::control_file;
use crate::status::StatusStore;
use std::io;
use std::thread::JoinHandle;
use tracing::{error, info, warn};

/// Handle do worker em execução. Descartá-lo cancela o worker sem esperar.
#[derive(Debug)]
pub struct ClientHandle {
    worker: Option<JoinHandle<()>>,
    cancel: CancellationSource,
}

impl ClientHandle {
    /// Sinaliza a parada e bloqueia até o worker terminar.
    ///
    /// Uma leitura de socket em andamento não é interrompida; a parada é
    /// observada no próximo timeout de leitura ou retorno do `read`.
    pub fn stop(mut self) {
        self.cancel.cancel();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("Thread do cliente UPS terminou em pânico");
            }
        }
        info!("Cliente UPS parado");
    }

    /// `true` quando o worker já saiu (parada ou erro fatal).
    pub fn is_finished(&self) -> bool {
        self.worker.as_ref().is_none_or(JoinHandle::is_finished)
    }
}

/// Inicia o cliente TCP real publicando em `store`.
pub fn start(config: ClientConfig, store: StatusStore) -> io::Result<ClientHandle> {
    let connector = ConnectionManager::new(store).with_connect_timeout(config.connect_timeout());
    start_with(config, connector)
}

/// Inicia o worker com um [`Connector`] arbitrário.
pub fn start_with<C>(config: ClientConfig, connector: C) -> io::Result<ClientHandle>
where
    C: Connector + 'static,
{
    let cancel = CancellationSource::new();
    let token = cancel.token();

    let worker = std::thread::Builder::new()
        .name("ups-client".into())
        .spawn(move || retry_loop(&config, connector, &token))?;

    Ok(ClientHandle {
        worker: Some(worker),
        cancel,
    })
}

/// Corpo do worker: conecta, e em falha transitória dorme e tenta de novo.
fn retry_loop<C: Connector>(config: &ClientConfig, mut connector: C, token: &CancellationToken) {
    let (host, mut port) = config.target();

    while !token.is_cancelled() {
        // A porta do daemon local pode mudar entre execuções dele.
        if config.mode == Mode::LocalBelkin {
            if let Some(found) = control_file::read_port(&config.control_file) {
                if found != port {
                    info!("Porta do upsd local: {found}");
                    port = found;
                }
            }
        }

        match connector.connect(&host, port, config.mode, token) {
            Ok(()) => break,
            Err(e) if e.is_fatal() => {
                error!("Erro fatal no cliente UPS: {e}. Sem novas tentativas.");
                break;
            }
            Err(e) => {
                warn!(
                    "{e}. Tentando novamente em {}s...",
                    config.retry_interval().as_secs()
                );
                if token.sleep(config.retry_interval()) {
                    break;
                }
            }
        }
    }

    info!("Worker do cliente UPS encerrado");
}
