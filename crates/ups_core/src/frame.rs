//! Remontagem de registros do stream Belkin.
//!
//! O daemon envia registros ASCII colados uns nos outros, sem tamanho nem
//! terminador de linha. Um registro novo só é reconhecido pelo token
//! `DeltaUPS:` no seu início:
//!
//! ```text
//! ...DeltaUPS:VAL00,00,0000 1\t...\tDeltaUPS:LOG00,00,0000 0 <msg>...
//!    └──────── registro n ────────┘└──────── registro n+1 ───────...
//! ```
//!
//! O acumulador tem capacidade limitada; ao atingir `capacity - 1` bytes sem
//! sentinela o conteúdo é despachado mesmo truncado. Bytes que podem ser o
//! começo da próxima sentinela não entram nessa conta.

use std::collections::TryReserveError;

/// Token que inicia todo registro.
pub const SENTINEL: &[u8] = b"DeltaUPS:";

/// Capacidade do acumulador (o maior registro observado tem ~350 chars).
pub const MAX_LINESIZE: usize = 1024;

/// Tamanho máximo de cada leitura do socket.
///
/// Em alguns kernels um `read()` grande só retorna com o buffer cheio, o que
/// atrasaria a próxima atualização em vários segundos; o daemon envia ~214
/// bytes por segundo.
pub const MAX_ENTRYSIZE: usize = 213;

/// Acumulador de bytes que despacha registros completos.
#[derive(Debug)]
pub struct FrameAssembler {
    acc: Vec<u8>,
    capacity: usize,
}

impl FrameAssembler {
    /// Cria o acumulador reservando `capacity` bytes de uma vez.
    pub fn try_with_capacity(capacity: usize) -> Result<Self, TryReserveError> {
        let capacity = capacity.max(SENTINEL.len() + 2);
        let mut acc = Vec::new();
        acc.try_reserve_exact(capacity + SENTINEL.len())?;
        Ok(Self { acc, capacity })
    }

    /// Bytes acumulados que ainda não formaram um registro.
    pub fn pending(&self) -> &[u8] {
        &self.acc
    }

    /// Consome um pedaço do stream, chamando `emit` para cada registro fechado.
    ///
    /// O registro emitido inclui a sentinela que o iniciou (se houver) e
    /// exclui a sentinela que disparou o flush, que pertence ao próximo.
    /// Um começo de sentinela no fim do acumulador não conta para o limite:
    /// no flush forçado ele fica retido até se confirmar ou não.
    pub fn push(&mut self, chunk: &[u8], mut emit: impl FnMut(&[u8])) {
        for &byte in chunk {
            self.acc.push(byte);

            if self.acc.len() > SENTINEL.len() && self.acc.ends_with(SENTINEL) {
                let end = self.acc.len() - SENTINEL.len();
                emit(&self.acc[..end]);
                self.acc.drain(..end);
                continue;
            }

            let body = self.acc.len() - partial_sentinel(&self.acc);
            if body >= self.capacity - 1 {
                emit(&self.acc[..body]);
                self.acc.drain(..body);
            }
        }
    }
}

/// Tamanho do maior prefixo próprio da sentinela que termina `acc`.
fn partial_sentinel(acc: &[u8]) -> usize {
    (1..SENTINEL.len())
        .rev()
        .find(|&n| acc.ends_with(&SENTINEL[..n]))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assembler() -> FrameAssembler {
        FrameAssembler::try_with_capacity(MAX_LINESIZE).unwrap()
    }

    fn collect(chunks: &[&[u8]]) -> Vec<Vec<u8>> {
        collect_with(assembler(), chunks)
    }

    fn collect_with(mut fa: FrameAssembler, chunks: &[&[u8]]) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        for chunk in chunks {
            fa.push(chunk, |rec| out.push(rec.to_vec()));
        }
        out
    }

    fn stream() -> Vec<u8> {
        let mut s = Vec::new();
        s.extend_from_slice(b"banner junk from PRO_NET\r\n");
        s.extend_from_slice(b"DeltaUPS:VAL00,00,0000 1\t1\t2\t3\t4\t2345\t0\t1000\t500\t2300\t");
        s.extend_from_slice(b"DeltaUPS:LOG00,00,0000 0 01/02/2003 10:00 <Power restored>\r\n");
        s.extend_from_slice(b"DeltaUPS:VAL00,00,0000 0\t");
        s.extend_from_slice(b"DeltaUPS:");
        s
    }

    #[test]
    fn splits_on_sentinel() {
        let records = collect(&[&stream()]);
        assert_eq!(records.len(), 4);
        assert_eq!(records[0], b"banner junk from PRO_NET\r\n");
        assert!(records[1].starts_with(b"DeltaUPS:VAL00"));
        assert!(records[2].starts_with(b"DeltaUPS:LOG00"));
        assert_eq!(records[3], b"DeltaUPS:VAL00,00,0000 0\t");
    }

    #[test]
    fn last_record_waits_for_next_sentinel() {
        let records = collect(&[b"DeltaUPS:LOG00,00,0000 0 <a>"]);
        assert!(records.is_empty());
    }

    #[test]
    fn every_two_way_split_matches_unsplit() {
        let data = stream();
        let expected = collect(&[&data]);
        for cut in 0..=data.len() {
            let (a, b) = data.split_at(cut);
            assert_eq!(collect(&[a, b]), expected, "corte em {cut}");
        }
    }

    #[test]
    fn every_fixed_chunk_size_matches_unsplit() {
        let data = stream();
        let expected = collect(&[&data]);
        for size in 1..=MAX_ENTRYSIZE {
            let chunks: Vec<&[u8]> = data.chunks(size).collect();
            assert_eq!(collect(&chunks), expected, "chunk de {size}");
        }
    }

    #[test]
    fn forces_flush_at_capacity() {
        let mut fa = FrameAssembler::try_with_capacity(32).unwrap();
        let mut out = Vec::new();
        fa.push(&[b'x'; 40], |rec| out.push(rec.to_vec()));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].len(), 31);
        assert_eq!(fa.pending().len(), 9);
    }

    #[test]
    fn record_longer_than_capacity_is_truncated() {
        let mut fa = FrameAssembler::try_with_capacity(32).unwrap();
        let mut data = b"DeltaUPS:".to_vec();
        data.extend_from_slice(&[b'a'; 40]);
        data.extend_from_slice(b"DeltaUPS:");
        let mut out = Vec::new();
        fa.push(&data, |rec| out.push(rec.to_vec()));
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].len(), 31);
        assert!(out[0].starts_with(SENTINEL));
        assert_eq!(fa.pending(), SENTINEL);
    }

    #[test]
    fn tiny_capacity_is_raised() {
        let fa = FrameAssembler::try_with_capacity(1).unwrap();
        assert_eq!(fa.capacity, SENTINEL.len() + 2);
    }

    #[test]
    fn sentinel_straddling_capacity_limit_is_kept() {
        let capacity = 64;
        let next = b"DeltaUPS:VAL00,00,0000 1\t2710\t".to_vec();

        for k in 1..SENTINEL.len() {
            let mut first = b"DeltaUPS:INF00".to_vec();
            first.resize(capacity - 1 - k, b'z');
            let mut data = first.clone();
            data.extend_from_slice(&next);
            data.extend_from_slice(SENTINEL);

            for cut in 0..=data.len() {
                let (a, b) = data.split_at(cut);
                let fa = FrameAssembler::try_with_capacity(capacity).unwrap();
                let records = collect_with(fa, &[a, b]);
                assert_eq!(records, vec![first.clone(), next.clone()], "k={k} corte em {cut}");
            }
        }
    }

    #[test]
    fn flush_keeps_possible_sentinel_start() {
        let mut fa = FrameAssembler::try_with_capacity(32).unwrap();
        let mut data = vec![b'x'; 29];
        data.extend_from_slice(b"DeDelta");
        let mut out = Vec::new();
        fa.push(&data, |rec| out.push(rec.to_vec()));

        let mut flushed = vec![b'x'; 29];
        flushed.extend_from_slice(b"De");
        assert_eq!(out, vec![flushed]);
        assert_eq!(fa.pending(), b"Delta");

        // Falso começo: vira conteúdo comum do próximo registro.
        fa.push(b"Xyz", |rec| out.push(rec.to_vec()));
        assert_eq!(out.len(), 1);
        assert_eq!(fa.pending(), b"DeltaXyz");
    }
}
