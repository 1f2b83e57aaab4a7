//! Field delimiter detection for delimited text tables

use tracing::debug;

/// Number of leading bytes inspected when sniffing
pub const SNIFF_BYTES: usize = 4096;

/// Candidate delimiters, in preference order
pub const CANDIDATES: [u8; 5] = [b',', b';', b'\t', b'|', b':'];

/// Infer the field delimiter of a delimited text file from its content.
///
/// A candidate qualifies when it appears the same non-zero number of times
/// on every complete line of the sample, ignoring quoted sections. The
/// qualifying candidate with the most fields per line wins, ties going to
/// the earlier entry of [`CANDIDATES`]. When no candidate is consistent,
/// the one occurring most often in the header line is used.
///
/// Returns `None` when no candidate occurs at all (single-column table).
///
/// # Examples
///
/// ```rust
/// use condition_balancer::storage::sniff_delimiter;
///
/// assert_eq!(sniff_delimiter(b"a;b\n1;2\n"), Some(b';'));
/// assert_eq!(sniff_delimiter(b"stimulus\nfoo.png\n"), None);
/// ```
#[must_use]
pub fn sniff_delimiter(content: &[u8]) -> Option<u8> {
    let lines = sample_lines(content);
    let header = lines.first()?;

    let mut best: Option<(u8, usize)> = None;
    for &candidate in &CANDIDATES {
        let per_line = count_unquoted(header, candidate);
        if per_line == 0 {
            continue;
        }
        let consistent = lines
            .iter()
            .all(|line| count_unquoted(line, candidate) == per_line);
        if consistent && best.map_or(true, |(_, n)| per_line > n) {
            best = Some((candidate, per_line));
        }
    }

    if best.is_none() {
        // Ragged sample: fall back to the header alone
        for &candidate in &CANDIDATES {
            let per_line = count_unquoted(header, candidate);
            if per_line > 0 && best.map_or(true, |(_, n)| per_line > n) {
                best = Some((candidate, per_line));
            }
        }
    }

    if let Some((delimiter, fields)) = best {
        debug!(
            delimiter = %char::from(delimiter).escape_default(),
            fields = fields + 1,
            "sniffed delimiter"
        );
    }
    best.map(|(delimiter, _)| delimiter)
}

/// Non-empty lines of the first [`SNIFF_BYTES`] bytes.
///
/// When the content is longer than the sample, the trailing partial line
/// is dropped unless it is the only one.
fn sample_lines(content: &[u8]) -> Vec<&[u8]> {
    let truncated = content.len() > SNIFF_BYTES;
    let sample = &content[..content.len().min(SNIFF_BYTES)];

    let mut lines: Vec<&[u8]> = sample
        .split(|&b| b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .filter(|line| !line.is_empty())
        .collect();

    if truncated && lines.len() > 1 && !sample.ends_with(b"\n") {
        lines.pop();
    }
    lines
}

/// Occurrences of `delimiter` outside double-quoted sections
fn count_unquoted(line: &[u8], delimiter: u8) -> usize {
    let mut in_quotes = false;
    let mut count = 0;
    for &byte in line {
        if byte == b'"' {
            in_quotes = !in_quotes;
        } else if byte == delimiter && !in_quotes {
            count += 1;
        }
    }
    count
}
