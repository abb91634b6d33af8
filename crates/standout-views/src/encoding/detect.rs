//! Best-effort charset sniffing of template resources.

use std::io::{self, Read};

use chardetng::EncodingDetector as Sniffer;
use encoding_rs::{Encoding, EUC_JP, ISO_2022_JP, SHIFT_JIS, UTF_8};

use crate::source::TemplateSource;

/// Size of each read fed to the sniffer.
pub const CHUNK_SIZE: usize = 4096;

/// Default upper bound on the bytes sampled from one resource.
pub const DEFAULT_SAMPLE_LIMIT: usize = 64 * 1024;

/// Sniffs the character encoding of template resources.
///
/// Detection reads the resource in [`CHUNK_SIZE`] chunks and feeds them to an
/// incremental detector until the sample limit is reached or the resource
/// ends. A leading byte-order mark settles the question immediately.
///
/// Short Japanese templates written mostly in kana carry too few kanji for
/// the statistical guess, which tends to call them Cyrillic or Greek. When
/// the guess is not already Japanese, a sample that decodes cleanly as
/// Shift_JIS or EUC-JP and reads as kana-bearing text is taken as Japanese.
///
/// The result is `None` whenever nothing conclusive can be said: the
/// resource is missing, unreadable, empty, or plain ASCII. Errors are never
/// reported to the caller; they only show up in debug logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodingDetector {
    sample_limit: usize,
}

impl Default for EncodingDetector {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_LIMIT)
    }
}

impl EncodingDetector {
    /// Creates a detector sampling at most `sample_limit` bytes per resource.
    pub fn new(sample_limit: usize) -> Self {
        Self {
            sample_limit: sample_limit.max(1),
        }
    }

    /// Maximum number of bytes sampled per resource.
    pub fn sample_limit(&self) -> usize {
        self.sample_limit
    }

    /// Detects the encoding of the resource `name` in `source`.
    pub fn detect(&self, source: &dyn TemplateSource, name: &str) -> Option<&'static Encoding> {
        let reader = match source.open(name) {
            Ok(reader) => reader,
            Err(err) => {
                tracing::debug!(template = name, error = %err, "cannot open template for encoding detection");
                return None;
            }
        };
        match self.sniff(reader) {
            Ok(detected) => detected,
            Err(err) => {
                tracing::debug!(template = name, error = %err, "encoding detection aborted");
                None
            }
        }
    }

    fn sniff(&self, mut reader: impl Read) -> io::Result<Option<&'static Encoding>> {
        let mut buf = [0u8; CHUNK_SIZE];
        let mut sniffer = Sniffer::new();
        let mut sample = Vec::new();
        let mut non_ascii = false;
        let mut exhausted = false;

        while sample.len() < self.sample_limit {
            let want = CHUNK_SIZE.min(self.sample_limit - sample.len());
            let read = match reader.read(&mut buf[..want]) {
                Ok(0) => {
                    exhausted = true;
                    break;
                }
                Ok(read) => read,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            };
            let chunk = &buf[..read];
            if sample.is_empty() {
                if let Some((encoding, _)) = Encoding::for_bom(chunk) {
                    return Ok(Some(encoding));
                }
            }
            non_ascii |= sniffer.feed(chunk, false);
            sample.extend_from_slice(chunk);
        }

        if sample.is_empty() {
            return Ok(None);
        }
        sniffer.feed(&[], true);
        if !non_ascii {
            return Ok(None);
        }

        let guess = sniffer.guess(None, true);
        if [UTF_8, SHIFT_JIS, EUC_JP, ISO_2022_JP].contains(&guess) {
            return Ok(Some(guess));
        }
        let japanese = [SHIFT_JIS, EUC_JP]
            .into_iter()
            .find(|&candidate| reads_as_japanese(candidate, &sample, exhausted));
        if let Some(encoding) = japanese {
            tracing::debug!(
                guess = guess.name(),
                encoding = encoding.name(),
                "sample reads as Japanese, overriding guess"
            );
        }
        Ok(Some(japanese.unwrap_or(guess)))
    }
}

// Clean decode, with kana making up at least a quarter of the non-ASCII text.
// A sample cut at the limit may end inside a character, so up to two trailing
// bytes are dropped before giving up.
fn reads_as_japanese(encoding: &'static Encoding, sample: &[u8], complete: bool) -> bool {
    let cut = if complete { 0 } else { 2.min(sample.len()) };
    let decoded = (0..=cut).find_map(|trim| {
        encoding.decode_without_bom_handling_and_without_replacement(&sample[..sample.len() - trim])
    });
    let Some(text) = decoded else {
        return false;
    };

    let (kana, non_ascii) = text
        .chars()
        .filter(|c| !c.is_ascii())
        .fold((0usize, 0usize), |(kana, total), c| {
            let is_kana = matches!(c, '\u{3040}'..='\u{30FF}');
            (kana + usize::from(is_kana), total + 1)
        });
    kana > 0 && kana * 4 >= non_ascii
}
