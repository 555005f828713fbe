//! # UPS Monitor
//!
//! Inicia o cliente UPS em segundo plano e, a cada tick, lê um snapshot do
//! registro compartilhado e o registra no log.
//!
//! ## Uso
//! ```bash
//! ups_monitor                          # ups_monitor.toml ao lado do executável
//! ups_monitor --config /etc/ups.toml   # arquivo de configuração explícito
//! ups_monitor --duration 60            # para o cliente após 60s
//! ```

use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use ups_core::config::AppConfig;
use ups_core::status::{StatusStore, UpsStatus};

/// Argumentos de linha de comando.
#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    duration: Option<Duration>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args, String> {
    let mut parsed = Args::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().ok_or("--config exige um caminho")?;
                parsed.config = Some(PathBuf::from(path));
            }
            "--duration" => {
                let secs = args.next().ok_or("--duration exige segundos")?;
                let secs: u64 = secs
                    .parse()
                    .map_err(|e| format!("--duration inválido '{secs}': {e}"))?;
                parsed.duration = Some(Duration::from_secs(secs));
            }
            other => return Err(format!("Argumento desconhecido: {other}")),
        }
    }
    Ok(parsed)
}

fn main() {
    // ── Logging ──
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            error!("{e}");
            std::process::exit(2);
        }
    };

    // ── Config ──
    let config_path = args.config.clone().unwrap_or_else(AppConfig::default_path);
    let config = AppConfig::load(&config_path);

    // Salva config padrão se não existir
    if !config_path.exists() {
        if let Err(e) = config.save(&config_path) {
            warn!("Não foi possível salvar config padrão: {e}");
        }
    }

    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            error!("Config inválida: {e}");
        }
        std::process::exit(2);
    }

    let (host, port) = config.client.target();
    let tick = Duration::from_secs_f64(config.monitor.refresh_interval_secs);

    // ── Banner ──
    println!();
    println!("══════════════════════════════════════════════");
    println!("   ⚡ UPS MONITOR – ATIVO");
    println!("══════════════════════════════════════════════");
    println!("  Modo:      {:?}", config.client.mode);
    println!("  Destino:   {host}:{port}");
    println!("  Intervalo: {:.1}s", config.monitor.refresh_interval_secs);
    println!("══════════════════════════════════════════════");
    println!();

    // ── Cliente ──
    let store = StatusStore::new();
    let handle = match ups_core::start(config.client.clone(), store.clone()) {
        Ok(handle) => handle,
        Err(e) => {
            error!("Falha ao criar thread do cliente: {e}");
            std::process::exit(1);
        }
    };

    // ── Loop principal ──
    let started = Instant::now();
    loop {
        let cycle_start = Instant::now();

        report(&store.snapshot());

        if handle.is_finished() {
            error!("Cliente UPS encerrou; saindo");
            break;
        }
        if args.duration.is_some_and(|d| started.elapsed() >= d) {
            break;
        }

        // Dormir pelo tempo restante do intervalo
        let elapsed = cycle_start.elapsed();
        if elapsed < tick {
            std::thread::sleep(tick - elapsed);
        }
    }

    handle.stop();
}

fn report(status: &UpsStatus) {
    if !status.present {
        info!("✗ UPS ausente | {}", status.last_log);
        return;
    }
    let r = &status.readings;
    info!(
        "✓ In {:.1}V {:.1}Hz | Out {:.1}V {:.1}Hz | Bat {:.1}V {:.0}% | Carga {:.0}% | {:.1}°C | {}",
        r.input_voltage,
        r.input_frequency,
        r.output_voltage,
        r.output_frequency,
        r.battery_voltage,
        r.battery_level,
        r.load,
        r.temperature,
        status.last_log
    );
}
