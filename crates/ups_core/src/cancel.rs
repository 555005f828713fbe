//! Cancelamento cooperativo.
//!
//! O sinal é um canal `crossbeam` que nunca transporta mensagens: cancelar
//! significa descartar o `Sender`. Todos os tokens clonados passam a ver o
//! canal desconectado, inclusive os que estão bloqueados em `sleep`.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, bounded};
use std::time::Duration;

/// Lado que dispara o cancelamento. Descartá-lo também cancela.
#[derive(Debug)]
pub struct CancellationSource {
    trigger: Option<Sender<()>>,
    token: CancellationToken,
}

/// Lado observado pelo worker em cada fronteira bloqueante.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    signal: Receiver<()>,
}

impl CancellationSource {
    pub fn new() -> Self {
        let (tx, rx) = bounded::<()>(0);
        Self {
            trigger: Some(tx),
            token: CancellationToken { signal: rx },
        }
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn cancel(&mut self) {
        self.trigger.take();
    }

    pub fn is_cancelled(&self) -> bool {
        self.trigger.is_none()
    }
}

impl Default for CancellationSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationToken {
    pub fn is_cancelled(&self) -> bool {
        matches!(self.signal.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Dorme por `duration` ou até o cancelamento. Retorna `true` se cancelado.
    pub fn sleep(&self, duration: Duration) -> bool {
        match self.signal.recv_timeout(duration) {
            Err(RecvTimeoutError::Disconnected) => true,
            Err(RecvTimeoutError::Timeout) | Ok(()) => self.is_cancelled(),
        }
    }
}
