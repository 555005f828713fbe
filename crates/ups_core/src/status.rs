//! Registro de status compartilhado entre a thread do cliente e o leitor.
//!
//! O [`StatusStore`] é um handle explícito (`Arc<Mutex<UpsStatus>>`) passado
//! tanto ao worker quanto à camada de apresentação. Toda leitura ou escrita
//! acontece com o lock adquirido; escritores seguram o lock apenas durante a
//! decodificação de um registro ou a aplicação de um ciclo de poll, nunca
//! durante I/O de rede.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

/// Capacidade do campo de log, incluindo o terminador.
pub const MAX_LOGSIZE: usize = 256;

// ──────────────────────────────────────────────
// Mensagens fixas
// ──────────────────────────────────────────────

pub const MSG_NOT_CONNECTED: &str = "UPS not connected";
pub const MSG_MONITORING_ACTIVE: &str = "UPS monitoring active";

// ──────────────────────────────────────────────
// Leituras
// ──────────────────────────────────────────────

/// As oito grandezas numéricas reportadas pelo UPS.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Readings {
    /// Tensão da bateria (V)
    pub battery_voltage: f32,
    /// Carga da bateria (0–100%)
    pub battery_level: f32,
    /// Frequência da rede elétrica (Hz)
    pub input_frequency: f32,
    /// Tensão da rede elétrica (V)
    pub input_voltage: f32,
    /// Frequência de saída (Hz)
    pub output_frequency: f32,
    /// Tensão de saída (V)
    pub output_voltage: f32,
    /// Carga conectada (%)
    pub load: f32,
    /// Temperatura interna (°C)
    pub temperature: f32,
}

/// Identifica um campo de [`Readings`] sem expor ponteiros.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    BatteryVoltage,
    BatteryLevel,
    InputFrequency,
    InputVoltage,
    OutputFrequency,
    OutputVoltage,
    Load,
    Temperature,
}

impl Readings {
    pub fn get(&self, field: Field) -> f32 {
        match field {
            Field::BatteryVoltage => self.battery_voltage,
            Field::BatteryLevel => self.battery_level,
            Field::InputFrequency => self.input_frequency,
            Field::InputVoltage => self.input_voltage,
            Field::OutputFrequency => self.output_frequency,
            Field::OutputVoltage => self.output_voltage,
            Field::Load => self.load,
            Field::Temperature => self.temperature,
        }
    }

    pub fn set(&mut self, field: Field, value: f32) {
        let slot = match field {
            Field::BatteryVoltage => &mut self.battery_voltage,
            Field::BatteryLevel => &mut self.battery_level,
            Field::InputFrequency => &mut self.input_frequency,
            Field::InputVoltage => &mut self.input_voltage,
            Field::OutputFrequency => &mut self.output_frequency,
            Field::OutputVoltage => &mut self.output_voltage,
            Field::Load => &mut self.load,
            Field::Temperature => &mut self.temperature,
        };
        *slot = value;
    }
}

// ──────────────────────────────────────────────
// Mensagem de log limitada
// ──────────────────────────────────────────────

/// Texto com no máximo `MAX_LOGSIZE - 1` bytes, truncado silenciosamente.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogMessage(String);

impl LogMessage {
    /// Maior comprimento armazenável (espaço do terminador descontado).
    pub const CAPACITY: usize = MAX_LOGSIZE - 1;

    pub fn set(&mut self, text: &str) {
        self.0.clear();
        self.0.push_str(truncate_to_boundary(text, Self::CAPACITY));
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl PartialEq<&str> for LogMessage {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl std::fmt::Display for LogMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn truncate_to_boundary(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

// ──────────────────────────────────────────────
// Registro completo
// ──────────────────────────────────────────────

/// Estado do UPS visto pela camada de apresentação.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpsStatus {
    pub readings: Readings,
    /// Última mensagem de log do UPS (ou erro do cliente)
    pub last_log: LogMessage,
    /// `true` enquanto um UPS é detectado
    pub present: bool,
    /// Endereço do daemon enquanto conectado
    pub peer: Option<SocketAddr>,
}

impl UpsStatus {
    /// Zera as leituras e marca o UPS como ausente. O log também é limpo.
    pub fn reset(&mut self) {
        self.readings = Readings::default();
        self.last_log.clear();
        self.present = false;
    }

    /// Como [`reset`](Self::reset), mas preserva a mensagem de log.
    pub fn reset_readings(&mut self) {
        self.readings = Readings::default();
        self.present = false;
    }

    pub fn set_log(&mut self, text: &str) {
        self.last_log.set(text);
    }
}

// ──────────────────────────────────────────────
// Store compartilhado
// ──────────────────────────────────────────────

/// Handle clonável para o registro de status protegido por mutex.
#[derive(Debug, Clone, Default)]
pub struct StatusStore {
    inner: Arc<Mutex<UpsStatus>>,
}

impl StatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adquire o lock. Um mutex envenenado é recuperado: toda mutação deixa
    /// o registro válido.
    pub fn lock(&self) -> MutexGuard<'_, UpsStatus> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Cópia de todos os campos, tirada sob o lock.
    pub fn snapshot(&self) -> UpsStatus {
        self.lock().clone()
    }

    /// Executa `f` numa única seção crítica.
    pub fn update<T>(&self, f: impl FnOnce(&mut UpsStatus) -> T) -> T {
        let mut guard = self.lock();
        f(&mut guard)
    }

    pub fn reset(&self) {
        self.lock().reset();
    }

    /// Reseta o registro e grava `text` no log, atomicamente.
    pub fn reset_with_log(&self, text: &str) {
        self.update(|status| {
            status.reset();
            status.set_log(text);
        });
    }

    pub fn set_log(&self, text: &str) {
        self.lock().set_log(text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn populated() -> UpsStatus {
        let mut status = UpsStatus::default();
        for (i, field) in [
            Field::BatteryVoltage,
            Field::BatteryLevel,
            Field::InputFrequency,
            Field::InputVoltage,
            Field::OutputFrequency,
            Field::OutputVoltage,
            Field::Load,
            Field::Temperature,
        ]
        .into_iter()
        .enumerate()
        {
            status.readings.set(field, i as f32 + 1.0);
        }
        status.present = true;
        status.set_log("custom");
        status
    }

    #[test]
    fn default_status_is_zeroed() {
        let s = UpsStatus::default();
        assert_eq!(s.readings, Readings::default());
        assert!(!s.present);
        assert!(s.last_log.is_empty());
        assert!(s.peer.is_none());
    }

    #[test]
    fn field_accessors_cover_every_reading() {
        let s = populated();
        assert_eq!(s.readings.get(Field::BatteryVoltage), 1.0);
        assert_eq!(s.readings.get(Field::Temperature), 8.0);
        assert_eq!(s.readings.temperature, 8.0);
        assert_eq!(s.readings.input_voltage, 4.0);
    }

    #[test]
    fn reset_clears_everything_but_peer() {
        let mut s = populated();
        s.peer = Some("127.0.0.1:2710".parse().unwrap());
        s.reset();
        assert_eq!(s.readings, Readings::default());
        assert!(!s.present);
        assert!(s.last_log.is_empty());
        assert!(s.peer.is_some());
    }

    #[test]
    fn reset_readings_keeps_log() {
        let mut s = populated();
        s.reset_readings();
        assert_eq!(s.readings, Readings::default());
        assert!(!s.present);
        assert_eq!(s.last_log, "custom");
    }

    #[test]
    fn log_message_truncates_to_capacity() {
        let mut log = LogMessage::default();
        let long = "x".repeat(1000);
        log.set(&long);
        assert_eq!(log.len(), MAX_LOGSIZE - 1);
        log.set("short");
        assert_eq!(log, "short");
    }

    #[test]
    fn log_message_truncates_on_char_boundary() {
        let mut log = LogMessage::default();
        let text = format!("{}é", "a".repeat(LogMessage::CAPACITY - 1));
        log.set(&text);
        assert_eq!(log.len(), LogMessage::CAPACITY - 1);
    }

    #[test]
    fn snapshot_is_detached_from_store() {
        let store = StatusStore::new();
        store.update(|s| s.present = true);
        let snap = store.snapshot();
        store.reset();
        assert!(snap.present);
        assert!(!store.snapshot().present);
    }

    #[test]
    fn clones_share_the_same_record() {
        let store = StatusStore::new();
        let writer = store.clone();
        let handle = std::thread::spawn(move || {
            for _ in 0..100 {
                writer.update(|s| {
                    s.readings.load += 1.0;
                    s.present = true;
                });
            }
        });
        handle.join().unwrap();
        let snap = store.snapshot();
        assert_eq!(snap.readings.load, 100.0);
        assert!(snap.present);
    }

    #[test]
    fn reset_with_log_sets_message() {
        let store = StatusStore::new();
        store.update(|s| *s = populated());
        store.reset_with_log("Connection to UPS lost");
        let snap = store.snapshot();
        assert!(!snap.present);
        assert_eq!(snap.readings, Readings::default());
        assert_eq!(snap.last_log, "Connection to UPS lost");
    }
}
