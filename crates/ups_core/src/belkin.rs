//! Protocolo do daemon Belkin (Sentry Bulldog).
//!
//! Não há documentação pública deste protocolo; o layout abaixo foi obtido
//! por engenharia reversa e não é confirmado pelo fabricante. Registros têm
//! a forma genérica `DeltaUPS:<código>,00,<flags> <campos separados por TAB>`.
//!
//! ```text
//! DeltaUPS:VAL00,00,xxxx P\t f1\t f2\t ... f34\t ...   P = '1' se UPS presente
//! DeltaUPS:LOG00,00,xxxx 0 <data> <hora> <mensagem>
//! ```
//!
//! Qualquer conteúdo que não se encaixe é ignorado sem erro.

use crate::cancel::CancellationToken;
use crate::error::ClientError;
use crate::frame::{FrameAssembler, MAX_ENTRYSIZE, MAX_LINESIZE, SENTINEL};
use crate::status::{
    Field, LogMessage, MSG_MONITORING_ACTIVE, MSG_NOT_CONNECTED, Readings, StatusStore, UpsStatus,
};
use crate::transport::{ReadOutcome, read_chunk};
use std::io::Read;
use tracing::{debug, trace};

// ──────────────────────────────────────────────
// Layout do registro VAL00
// ──────────────────────────────────────────────

/// Versão da tabela de offsets abaixo.
pub const VALUE_LAYOUT_VERSION: u32 = 1;

/// Posição do dígito de presença, contada após `DeltaUPS:` (`VAL00,00,xxxx P`).
pub const PRESENCE_OFFSET: usize = 14;

/// Quantas tabulações pular antes de cada campo, a partir do dígito de presença.
///
/// Corresponde aos campos 5, 7, 8, 9, 17, 18, 20 e 34 do registro; o
/// significado dos demais é desconhecido.
pub const VALUE_LAYOUT: [(usize, Field); 8] = [
    (5, Field::BatteryVoltage),
    (2, Field::BatteryLevel),
    (1, Field::InputFrequency),
    (1, Field::InputVoltage),
    (8, Field::OutputFrequency),
    (1, Field::OutputVoltage),
    (2, Field::Load),
    (14, Field::Temperature),
];

const VALUE_PREFIX: &[u8] = b"VAL00";
const LOG_PREFIX: &[u8] = b"LOG00";

// ──────────────────────────────────────────────
// Decodificação
// ──────────────────────────────────────────────

/// Conteúdo útil de um registro.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    /// VAL00 com UPS presente.
    Values(Readings),
    /// VAL00 com UPS ausente.
    Absent,
    /// LOG00 com texto entre `<` e `>`.
    Log(String),
    /// Qualquer outra coisa: ignorado.
    Ignored,
}

/// Decodifica um registro remontado (com a sentinela no início).
pub fn decode(record: &[u8]) -> Record {
    let Some(body) = record.strip_prefix(SENTINEL) else {
        return Record::Ignored;
    };

    if body.starts_with(VALUE_PREFIX) {
        match body.get(PRESENCE_OFFSET) {
            Some(b'1') => Record::Values(parse_values(&body[PRESENCE_OFFSET..])),
            _ => Record::Absent,
        }
    } else if body.starts_with(LOG_PREFIX) {
        parse_log(body).map_or(Record::Ignored, Record::Log)
    } else {
        Record::Ignored
    }
}

/// Aplica um registro decodificado. Retorna `true` se algo mudou.
pub fn apply(record: &Record, status: &mut UpsStatus) -> bool {
    match record {
        Record::Values(readings) => {
            status.readings = *readings;
            if status.last_log.is_empty() {
                status.set_log(MSG_MONITORING_ACTIVE);
            }
            status.present = true;
        }
        Record::Absent => {
            let was_active = status.last_log == MSG_MONITORING_ACTIVE;
            status.reset_readings();
            // Mensagens de erro/customizadas são preservadas.
            if was_active {
                status.set_log(MSG_NOT_CONNECTED);
            }
        }
        Record::Log(text) => status.set_log(text),
        Record::Ignored => return false,
    }
    true
}

fn parse_values(mut fields: &[u8]) -> Readings {
    let mut readings = Readings::default();
    for (skip, field) in VALUE_LAYOUT {
        fields = skip_tabs(fields, skip);
        readings.set(field, (leading_int(fields) as f64 / 10.0) as f32);
    }
    readings
}

fn parse_log(body: &[u8]) -> Option<String> {
    let start = body.iter().position(|&b| b == b'<')? + 1;
    let text = &body[start..];
    let end = text
        .iter()
        .position(|&b| b == b'>')
        .unwrap_or(text.len())
        .min(LogMessage::CAPACITY);
    Some(String::from_utf8_lossy(&text[..end]).into_owned())
}

/// Avança além de `count` tabulações (ou até o fim).
fn skip_tabs(mut s: &[u8], count: usize) -> &[u8] {
    for _ in 0..count {
        match s.iter().position(|&b| b == b'\t') {
            Some(i) => s = &s[i + 1..],
            None => return &[],
        }
    }
    s
}

/// Inteiro no início de `s`, à la `strtol`: espaços, sinal opcional, dígitos.
/// Sem dígitos vale 0.
fn leading_int(s: &[u8]) -> i64 {
    let mut rest = s;
    while let [b' ', tail @ ..] = rest {
        rest = tail;
    }
    let negative = match rest {
        [b'-', tail @ ..] => {
            rest = tail;
            true
        }
        [b'+', tail @ ..] => {
            rest = tail;
            false
        }
        _ => false,
    };
    let magnitude = rest
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .fold(0i64, |acc, b| {
            acc.saturating_mul(10).saturating_add(i64::from(b - b'0'))
        });
    if negative { -magnitude } else { magnitude }
}

// ──────────────────────────────────────────────
// Loop de streaming
// ──────────────────────────────────────────────

/// Estado de uma conexão Belkin: acumulador e buffer de leitura.
#[derive(Debug)]
pub struct BelkinSession {
    assembler: FrameAssembler,
    chunk: Vec<u8>,
}

impl BelkinSession {
    /// Aloca os buffers da conexão; falha de alocação é fatal.
    pub fn try_new() -> Result<Self, ClientError> {
        let assembler =
            FrameAssembler::try_with_capacity(MAX_LINESIZE).map_err(|_| ClientError::OutOfMemory)?;
        let mut chunk = Vec::new();
        chunk
            .try_reserve_exact(MAX_ENTRYSIZE)
            .map_err(|_| ClientError::OutOfMemory)?;
        chunk.resize(MAX_ENTRYSIZE, 0);
        Ok(Self { assembler, chunk })
    }

    /// Lê o stream até o cancelamento (`Ok`) ou a perda da conexão.
    pub fn run<R: Read>(
        &mut self,
        stream: &mut R,
        store: &StatusStore,
        token: &CancellationToken,
    ) -> Result<(), ClientError> {
        loop {
            let n = match read_chunk(stream, &mut self.chunk, token)? {
                ReadOutcome::Data(n) => n,
                ReadOutcome::Halted => return Ok(()),
            };
            trace!("Belkin: {n} bytes recebidos");

            self.assembler.push(&self.chunk[..n], |raw| {
                let record = decode(raw);
                if record == Record::Ignored {
                    debug!("Registro ignorado ({} bytes)", raw.len());
                    return;
                }
                store.update(|status| apply(&record, status));
            });
        }
    }
}
