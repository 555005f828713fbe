//! # UPS Core
//!
//! Cliente de monitoramento de UPS: conecta ao daemon (upsd Belkin ou NUT)
//! por TCP, decodifica o protocolo obtido por engenharia reversa e publica
//! os valores num registro compartilhado protegido por mutex.
//!
//! ## Módulos
//! - [`status`] – Registro de status e o handle compartilhado [`StatusStore`]
//! - [`frame`] – Remontagem de registros `DeltaUPS:` a partir do stream
//! - [`belkin`] – Decodificação dos registros Belkin e loop de streaming
//! - [`nut`] – Cliente requisição/resposta NUT
//! - [`connection`] – Resolução, conexão e despacho por protocolo
//! - [`client`] – Worker de fundo com reconexão e parada cooperativa
//! - [`cancel`] – Token de cancelamento
//! - [`control_file`] – Porta do daemon local via `PRO_NET.DAT`
//! - [`config`] – Configuração unificada via TOML
//!
//! ## Uso
//! ```no_run
//! use ups_core::{AppConfig, StatusStore, client};
//!
//! let config = AppConfig::default();
//! let store = StatusStore::new();
//! let handle = client::start(config.client, store.clone()).unwrap();
//! let snapshot = store.snapshot();
//! println!("{} – {}", snapshot.present, snapshot.last_log);
//! handle.stop();
//! ```

pub mod belkin;
pub mod cancel;
pub mod client;
pub mod config;
pub mod connection;
pub mod control_file;
pub mod error;
pub mod frame;
pub mod nut;
pub mod status;
pub mod transport;

// Re-exports convenientes
pub use client::{ClientHandle, start, start_with};
pub use config::{AppConfig, ClientConfig, Mode, MonitorConfig};
pub use error::{ClientError, ConfigError};
pub use status::{Readings, StatusStore, UpsStatus};
