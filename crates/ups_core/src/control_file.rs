//! Descoberta da porta do daemon local via `PRO_NET.DAT`.
//!
//! O daemon Belkin grava um pequeno arquivo texto: a linha 1 (master/slave)
//! é ignorada e a linha 2 começa com a porta decimal em que ele escuta. A
//! porta pode mudar entre execuções do daemon, por isso o arquivo é relido
//! antes de cada tentativa de conexão.

use std::path::Path;
use tracing::warn;

/// Caminho padrão do arquivo de controle.
pub const DEFAULT_CONTROL_FILE: &str = "/usr/local/bulldog/PRO_NET.DAT";

/// Extrai a porta do conteúdo do arquivo. `None` se não houver porta.
pub fn parse_port(contents: &str) -> Option<u16> {
    let line = contents.lines().nth(1)?;
    let digits: &str = {
        let trimmed = line.trim_start();
        let len = trimmed.bytes().take_while(u8::is_ascii_digit).count();
        &trimmed[..len]
    };
    match digits.parse::<u16>() {
        Ok(0) | Err(_) => None,
        Ok(port) => Some(port),
    }
}

/// Lê o arquivo e extrai a porta. Falhas de leitura viram `None`.
pub fn read_port(path: &Path) -> Option<u16> {
    match std::fs::read_to_string(path) {
        Ok(contents) => parse_port(&contents),
        Err(e) => {
            warn!("Erro ao ler {}: {}", path.display(), e);
            None
        }
    }
}
