//! Leitura do socket com verificação de cancelamento.
//!
//! O socket recebe um read timeout de [`POLL_TICK`]; um timeout não é erro,
//! apenas devolve o controle para checar o token e tentar de novo.

use crate::cancel::CancellationToken;
use crate::error::ClientError;
use std::io::{ErrorKind, Read};
use std::time::Duration;
use tracing::debug;

/// Intervalo de timeout de leitura usado para observar o cancelamento.
pub const POLL_TICK: Duration = Duration::from_secs(1);

/// Resultado de uma leitura que pode ter sido interrompida por cancelamento.
#[derive(Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    Data(usize),
    Halted,
}

/// Faz uma leitura. Zero bytes ou erro de I/O viram `LostConnection`.
pub fn read_chunk<R: Read>(
    reader: &mut R,
    buf: &mut [u8],
    token: &CancellationToken,
) -> Result<ReadOutcome, ClientError> {
    loop {
        if token.is_cancelled() {
            return Ok(ReadOutcome::Halted);
        }
        match reader.read(buf) {
            Ok(0) => return Err(ClientError::LostConnection),
            Ok(n) => {
                // Saída de emergência: o halt pode ter chegado durante a leitura.
                if token.is_cancelled() {
                    return Ok(ReadOutcome::Halted);
                }
                return Ok(ReadOutcome::Data(n));
            }
            Err(ref e)
                if e.kind() == ErrorKind::WouldBlock
                    || e.kind() == ErrorKind::TimedOut
                    || e.kind() == ErrorKind::Interrupted =>
            {
                // Timeout normal, continua
            }
            Err(e) => {
                debug!("Erro de leitura no socket: {e}");
                return Err(ClientError::LostConnection);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancellationSource;
    use std::io::{self, Cursor};

    /// Leitor que devolve `WouldBlock` algumas vezes antes dos dados.
    struct Sleepy {
        stalls: usize,
        inner: Cursor<Vec<u8>>,
    }

    impl Read for Sleepy {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.stalls > 0 {
                self.stalls -= 1;
                return Err(io::Error::from(ErrorKind::WouldBlock));
            }
            self.inner.read(buf)
        }
    }

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::from(ErrorKind::ConnectionReset))
        }
    }

    #[test]
    fn retries_after_timeouts() {
        let source = CancellationSource::new();
        let mut reader = Sleepy {
            stalls: 3,
            inner: Cursor::new(b"abc".to_vec()),
        };
        let mut buf = [0u8; 8];
        let outcome = read_chunk(&mut reader, &mut buf, &source.token()).unwrap();
        assert_eq!(outcome, ReadOutcome::Data(3));
        assert_eq!(&buf[..3], b"abc");
    }

    #[test]
    fn eof_is_lost_connection() {
        let source = CancellationSource::new();
        let mut reader = Cursor::new(Vec::new());
        let mut buf = [0u8; 8];
        assert!(matches!(
            read_chunk(&mut reader, &mut buf, &source.token()),
            Err(ClientError::LostConnection)
        ));
    }

    #[test]
    fn io_error_is_lost_connection() {
        let source = CancellationSource::new();
        let mut buf = [0u8; 8];
        assert!(matches!(
            read_chunk(&mut Broken, &mut buf, &source.token()),
            Err(ClientError::LostConnection)
        ));
    }

    #[test]
    fn cancelled_token_halts_before_reading() {
        let mut source = CancellationSource::new();
        let token = source.token();
        source.cancel();
        let mut reader = Cursor::new(b"abc".to_vec());
        let mut buf = [0u8; 8];
        assert_eq!(
            read_chunk(&mut reader, &mut buf, &token).unwrap(),
            ReadOutcome::Halted
        );
        assert_eq!(reader.position(), 0);
    }
}
