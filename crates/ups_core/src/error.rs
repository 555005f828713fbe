//! Taxonomia de falhas do cliente.
//!
//! As mensagens de `Display` são exatamente as que aparecem no campo de log
//! do [`UpsStatus`](crate::status::UpsStatus), único canal de erro visível
//! para a camada de apresentação.

use std::path::PathBuf;

/// Falhas reportadas por [`connect`](crate::connection::Connector::connect).
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Nenhum endereço IPv4 resolvido para o host.
    #[error("Unable to find host")]
    HostResolution { host: String },

    /// Todos os endereços resolvidos recusaram a conexão.
    #[error("Connection refused")]
    ConnectionRefused { host: String, port: u16 },

    /// O peer fechou o socket ou a leitura falhou.
    #[error("Connection to UPS lost")]
    LostConnection,

    /// Buffers da conexão não puderam ser alocados.
    #[error("Out of memory")]
    OutOfMemory,
}

impl ClientError {
    /// Apenas `OutOfMemory` encerra o loop de reconexão.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ClientError::OutOfMemory)
    }
}

/// Falhas ao ler ou gravar o `ups_monitor.toml`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Erro ao ler {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Erro ao parsear {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Erro ao serializar config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Erro ao gravar {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}
