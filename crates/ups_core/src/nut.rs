//! Cliente NUT (Network UPS Tools), protocolo requisição/resposta.
//!
//! Cada troca envia uma linha e faz exatamente uma leitura, tratando o que
//! vier como a resposta completa:
//!
//! ```text
//! → LISTVARS\r\n          ← VARS UTILITY BATTPCT STATUS ...
//! → REQ UTILITY\r\n       ← ANS UTILITY 230.0
//! → REQ STATUS\r\n        ← ANS STATUS OL      (ou ERR ...)
//! ```
//!
//! Nada garante que uma leitura traga a resposta inteira; é uma limitação
//! conhecida do protocolo sem framing.

use crate::cancel::CancellationToken;
use crate::error::ClientError;
use crate::frame::MAX_LINESIZE;
use crate::status::{Field, MSG_NOT_CONNECTED, StatusStore, UpsStatus};
use crate::transport::{ReadOutcome, read_chunk};
use std::io::{Read, Write};
use std::time::Duration;
use tracing::{debug, info};

/// Intervalo entre ciclos de poll.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Variável de status, tratada fora do poll numérico.
pub const STATUS_VAR: &str = "STATUS";

/// Variáveis numéricas conhecidas e o campo de destino, em ordem de poll.
pub const NUT_VARIABLES: &[(&str, Field)] = &[
    ("UTILITY", Field::InputVoltage),
    ("BATTPCT", Field::BatteryLevel),
    ("ACFREQ", Field::InputFrequency),
    ("UPSTEMP", Field::Temperature),
    ("LOADPCT", Field::Load),
    ("BATTVOLT", Field::BatteryVoltage),
    ("OUTVOLT", Field::OutputVoltage),
];

/// Código de status → mensagem legível. Casamento por prefixo, o primeiro vence.
pub const NUT_STATUS_TABLE: &[(&str, &str)] = &[
    ("OFF", "UPS is offline"),
    ("OL", "UPS online, utility up"),
    ("OB", "UPS on battery backup"),
    ("LB", "Low battery warning!"),
    ("RB", "Replace the UPS battery"),
    ("OVER", "UPS is overloaded"),
    ("TRIM", "Trimming voltage"),
    ("BOOST", "Boosting voltage"),
    ("CAL", "Calibrating"),
];

// ──────────────────────────────────────────────
// Capacidades e resultados
// ──────────────────────────────────────────────

/// Variáveis que o servidor anunciou em `LISTVARS`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub numeric: Vec<(&'static str, Field)>,
    pub status: bool,
}

impl Capabilities {
    /// Uma variável é suportada se o nome aparece como substring da resposta.
    pub fn from_listvars(response: &str) -> Self {
        Self {
            numeric: NUT_VARIABLES
                .iter()
                .copied()
                .filter(|(name, _)| response.contains(name))
                .collect(),
            status: response.contains(STATUS_VAR),
        }
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.numeric.iter().map(|(n, _)| *n).collect();
        if self.status {
            names.push(STATUS_VAR);
        }
        names
    }
}

/// Status interpretado de `REQ STATUS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusReport {
    Known(&'static str),
    Lost,
}

/// Tudo que um ciclo de poll coletou, aplicado numa única seção crítica.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PollResult {
    pub values: Vec<(Field, f32)>,
    pub status: Option<StatusReport>,
}

impl PollResult {
    pub fn apply(&self, status: &mut UpsStatus) {
        for &(field, value) in &self.values {
            status.readings.set(field, value);
        }
        match self.status {
            Some(StatusReport::Known(message)) => {
                status.present = true;
                status.set_log(message);
            }
            Some(StatusReport::Lost) => {
                status.present = false;
                status.set_log(MSG_NOT_CONNECTED);
            }
            None => {}
        }
    }
}

/// Valor numérico de `ANS <name> <valor>`; `None` para `ERR`.
pub fn parse_numeric(name: &str, response: &str) -> Option<f32> {
    if response.starts_with("ERR") {
        return None;
    }
    let value = response.get("ANS ".len() + name.len() + 1..).unwrap_or("");
    Some(leading_float(value))
}

/// Mensagem para `ANS STATUS <código>`.
pub fn parse_status(response: &str) -> StatusReport {
    if response.starts_with("ERR") {
        return StatusReport::Lost;
    }
    let code = response.get("ANS STATUS ".len()..).unwrap_or("");
    NUT_STATUS_TABLE
        .iter()
        .find(|(prefix, _)| code.starts_with(prefix))
        .map_or(StatusReport::Lost, |&(_, message)| StatusReport::Known(message))
}

/// Float no início de `s`, à la `strtod`; sem número vale 0.
fn leading_float(s: &str) -> f32 {
    let s = s.trim_start();
    let candidate: &str = {
        let len = s
            .char_indices()
            .take_while(|&(_, c)| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
            .count();
        &s[..len]
    };
    (1..=candidate.len())
        .rev()
        .find_map(|end| candidate[..end].parse::<f32>().ok())
        .unwrap_or(0.0)
}

// ──────────────────────────────────────────────
// Sessão
// ──────────────────────────────────────────────

/// Estado de uma conexão NUT.
#[derive(Debug)]
pub struct NutSession {
    buf: Vec<u8>,
    interval: Duration,
}

impl NutSession {
    pub fn try_new() -> Result<Self, ClientError> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(MAX_LINESIZE)
            .map_err(|_| ClientError::OutOfMemory)?;
        buf.resize(MAX_LINESIZE, 0);
        Ok(Self {
            buf,
            interval: POLL_INTERVAL,
        })
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Envia `COMMAND [ARG]\r\n` e devolve uma única leitura como resposta.
    /// `None` se o cancelamento foi observado.
    fn exchange<S: Read + Write>(
        &mut self,
        stream: &mut S,
        token: &CancellationToken,
        command: &str,
        arg: Option<&str>,
    ) -> Result<Option<String>, ClientError> {
        let line = match arg {
            Some(arg) => format!("{command} {arg}\r\n"),
            None => format!("{command}\r\n"),
        };
        stream.write_all(line.as_bytes()).map_err(|e| {
            debug!("NUT: falha ao enviar {command}: {e}");
            ClientError::LostConnection
        })?;

        match read_chunk(stream, &mut self.buf, token)? {
            ReadOutcome::Data(n) => Ok(Some(String::from_utf8_lossy(&self.buf[..n]).into_owned())),
            ReadOutcome::Halted => Ok(None),
        }
    }

    /// `LISTVARS` e detecção das variáveis suportadas.
    pub fn discover<S: Read + Write>(
        &mut self,
        stream: &mut S,
        token: &CancellationToken,
    ) -> Result<Option<Capabilities>, ClientError> {
        Ok(self
            .exchange(stream, token, "LISTVARS", None)?
            .map(|response| Capabilities::from_listvars(&response)))
    }

    /// Um ciclo completo: cada variável numérica suportada e depois o status.
    pub fn poll_cycle<S: Read + Write>(
        &mut self,
        stream: &mut S,
        token: &CancellationToken,
        caps: &Capabilities,
    ) -> Result<Option<PollResult>, ClientError> {
        let mut result = PollResult::default();

        for &(name, field) in &caps.numeric {
            let Some(response) = self.exchange(stream, token, "REQ", Some(name))? else {
                return Ok(None);
            };
            if let Some(value) = parse_numeric(name, &response) {
                result.values.push((field, value));
            }
        }

        if caps.status {
            let Some(response) = self.exchange(stream, token, "REQ", Some(STATUS_VAR))? else {
                return Ok(None);
            };
            result.status = Some(parse_status(&response));
        }

        Ok(Some(result))
    }

    /// Descobre as variáveis e faz poll até o cancelamento ou perda da conexão.
    pub fn run<S: Read + Write>(
        &mut self,
        stream: &mut S,
        store: &StatusStore,
        token: &CancellationToken,
    ) -> Result<(), ClientError> {
        let Some(caps) = self.discover(stream, token)? else {
            return Ok(());
        };
        let names = caps.names();
        if names.is_empty() {
            debug!("NUT: nenhuma variável conhecida anunciada; ciclos sem requisições");
        } else {
            info!("NUT: variáveis suportadas {names:?}");
        }

        loop {
            if token.sleep(self.interval) {
                return Ok(());
            }
            let Some(result) = self.poll_cycle(stream, token, &caps)? else {
                return Ok(());
            };
            store.update(|status| result.apply(status));
        }
    }
}
