//! Configuração unificada via TOML.
//!
//! Um único `ups_monitor.toml` ao lado do executável guarda o modo de operação,
//! os endereços dos daemons e os intervalos do monitor.

use crate::control_file::DEFAULT_CONTROL_FILE;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Nome do arquivo de configuração procurado ao lado do executável.
pub const CONFIG_FILE_NAME: &str = "ups_monitor.toml";

/// Porta padrão do upsd Belkin.
pub const DEFAULT_BELKIN_PORT: u16 = 2710;
/// Porta IANA do NUT.
pub const DEFAULT_NUT_PORT: u16 = 3493;

/// Protocolo/daemon monitorado.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// upsd Belkin na máquina local; porta lida do arquivo de controle
    #[default]
    LocalBelkin,
    /// upsd Belkin em outra máquina
    RemoteBelkin,
    /// Servidor NUT
    Nut,
}

impl Mode {
    pub fn is_belkin(self) -> bool {
        matches!(self, Mode::LocalBelkin | Mode::RemoteBelkin)
    }
}

/// Configuração do cliente (worker de conexão).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub mode: Mode,
    /// Local do `PRO_NET.DAT` (apenas `local_belkin`)
    pub control_file: PathBuf,
    pub belkin_host: String,
    pub belkin_port: u16,
    pub nut_host: String,
    pub nut_port: u16,
    /// Espera entre tentativas de reconexão (segundos)
    pub retry_interval_secs: u64,
    /// Timeout de cada `connect()` (segundos)
    pub connect_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            mode: Mode::LocalBelkin,
            control_file: PathBuf::from(DEFAULT_CONTROL_FILE),
            belkin_host: "localhost".into(),
            belkin_port: DEFAULT_BELKIN_PORT,
            nut_host: "localhost".into(),
            nut_port: DEFAULT_NUT_PORT,
            retry_interval_secs: 5,
            connect_timeout_secs: 10,
        }
    }
}

impl ClientConfig {
    /// Host e porta iniciais do modo selecionado.
    ///
    /// No modo local o host é sempre `localhost`; a porta configurada é só o
    /// ponto de partida até o arquivo de controle informar outra.
    pub fn target(&self) -> (String, u16) {
        match self.mode {
            Mode::LocalBelkin => ("localhost".into(), self.belkin_port),
            Mode::RemoteBelkin => (self.belkin_host.clone(), self.belkin_port),
            Mode::Nut => (self.nut_host.clone(), self.nut_port),
        }
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs.max(1))
    }
}

/// Configuração do monitor (camada de apresentação).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Intervalo de leitura do snapshot (segundos)
    pub refresh_interval_secs: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 1.0,
        }
    }
}

/// Configuração raiz do aplicativo.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub client: ClientConfig,
    pub monitor: MonitorConfig,
}

impl AppConfig {
    /// Lê e interpreta `path`, sem fallback.
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Carrega `path`; arquivo ausente ou inválido resulta nos padrões.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            info!("{} não existe; usando configuração padrão", path.display());
            return AppConfig::default();
        }
        match Self::read(path) {
            Ok(config) => {
                info!("Configuração carregada de {}", path.display());
                config
            }
            Err(e) => {
                warn!("{e}; usando configuração padrão");
                AppConfig::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Configuração salva em {}", path.display());
        Ok(())
    }

    /// `ups_monitor.toml` no diretório do executável (ou no atual).
    pub fn default_path() -> PathBuf {
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_FILE_NAME)
    }

    /// Valida a configuração e retorna lista de erros.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let client = &self.client;

        match client.mode {
            Mode::LocalBelkin | Mode::RemoteBelkin => {
                if client.mode == Mode::RemoteBelkin && client.belkin_host.trim().is_empty() {
                    errors.push("Host Belkin não pode ser vazio".into());
                }
                if client.belkin_port == 0 {
                    errors.push("Porta Belkin não pode ser 0".into());
                }
            }
            Mode::Nut => {
                if client.nut_host.trim().is_empty() {
                    errors.push("Host NUT não pode ser vazio".into());
                }
                if client.nut_port == 0 {
                    errors.push("Porta NUT não pode ser 0".into());
                }
            }
        }
        if client.retry_interval_secs == 0 {
            errors.push("Intervalo de reconexão não pode ser 0".into());
        }
        let refresh = self.monitor.refresh_interval_secs;
        if !(0.1..=60.0).contains(&refresh) {
            errors.push(format!(
                "Intervalo de atualização inválido: {refresh} (0.1–60.0)"
            ));
        }

        errors
    }
}
