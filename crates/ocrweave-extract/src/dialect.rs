//! CSV dialect inference.
//!
//! Sniffing is heuristic, so it sits behind [`DialectSniffer`] and every
//! caller goes through [`sniff_or_default`], which pins the outcome to the
//! comma / double-quote dialect whenever the sniffer gives up.

/// Delimiter and quote convention of a CSV file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    pub delimiter: u8,
    pub quote: u8,
}

impl Default for Dialect {
    /// Comma-delimited, double-quoted (the spreadsheet export convention).
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
        }
    }
}

/// Infers a [`Dialect`] from the leading sample of a file.
pub trait DialectSniffer: Send + Sync {
    /// `None` means the sample gave no usable signal.
    fn sniff(&self, sample: &str) -> Option<Dialect>;
}

/// Use `sniffer` on `sample`, falling back to [`Dialect::default`].
pub fn sniff_or_default(sniffer: &dyn DialectSniffer, sample: &str) -> Dialect {
    match sniffer.sniff(sample) {
        Some(dialect) => {
            tracing::debug!(
                delimiter = %char::from(dialect.delimiter).escape_default(),
                quote = %char::from(dialect.quote),
                "sniffed CSV dialect"
            );
            dialect
        }
        None => {
            tracing::debug!("CSV dialect sniffing failed, using comma-delimited default");
            Dialect::default()
        }
    }
}

/// Separators considered by [`StructuralSniffer`], in tie-break order.
const CANDIDATE_DELIMITERS: &[u8] = b",\t;|:";

/// Share of sample lines that must agree on a delimiter count.
const MIN_CONSISTENCY: f64 = 0.9;

/// Picks the delimiter whose per-line occurrence count is most consistent
/// across the sample.
///
/// For each candidate the modal count over all non-blank lines is taken
/// (occurrences inside double quotes are ignored); the candidate wins if
/// its modal count is non-zero and at least 90% of lines share it. Ties go
/// to the earlier entry in `, \t ; | :`. A trailing partial line (sample
/// cut mid-record) is excluded.
#[derive(Debug, Clone, Default)]
pub struct StructuralSniffer;

impl DialectSniffer for StructuralSniffer {
    fn sniff(&self, sample: &str) -> Option<Dialect> {
        let lines = complete_lines(sample);
        if lines.is_empty() {
            return None;
        }

        let mut best: Option<(u8, f64)> = None;
        for &delimiter in CANDIDATE_DELIMITERS {
            let counts: Vec<usize> = lines
                .iter()
                .map(|line| count_unquoted(line, delimiter))
                .collect();
            let Some((mode, frequency)) = modal_count(&counts) else {
                continue;
            };
            if mode == 0 {
                continue;
            }
            let consistency = frequency as f64 / counts.len() as f64;
            if consistency < MIN_CONSISTENCY {
                continue;
            }
            if best.is_none_or(|(_, c)| consistency > c) {
                best = Some((delimiter, consistency));
            }
        }

        let (delimiter, _) = best?;
        Some(Dialect {
            delimiter,
            quote: guess_quote(&lines, delimiter),
        })
    }
}

/// Non-blank lines of the sample, minus a trailing line that was not
/// terminated by a newline when more than one line is present.
fn complete_lines(sample: &str) -> Vec<&str> {
    let mut lines: Vec<&str> = sample.lines().collect();
    if lines.len() > 1 && !sample.ends_with('\n') {
        lines.pop();
    }
    lines.retain(|l| !l.trim().is_empty());
    lines
}

fn count_unquoted(line: &str, delimiter: u8) -> usize {
    let mut in_quotes = false;
    let mut count = 0;
    for &b in line.as_bytes() {
        if b == b'"' {
            in_quotes = !in_quotes;
        } else if b == delimiter && !in_quotes {
            count += 1;
        }
    }
    count
}

/// Most frequent value and how often it occurs. Ties resolve to the larger
/// value so a header with fewer columns does not mask the body.
fn modal_count(counts: &[usize]) -> Option<(usize, usize)> {
    let mut tally: Vec<(usize, usize)> = Vec::new();
    for &c in counts {
        match tally.iter_mut().find(|(value, _)| *value == c) {
            Some((_, n)) => *n += 1,
            None => tally.push((c, 1)),
        }
    }
    tally
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)))
}

/// Single quotes are only chosen when the sample has no double quotes and
/// some field is wrapped in single quotes.
fn guess_quote(lines: &[&str], delimiter: u8) -> u8 {
    if lines.iter().any(|l| l.contains('"')) {
        return b'"';
    }
    let delimiter = char::from(delimiter);
    let single_quoted = lines.iter().any(|line| {
        line.split(delimiter).any(|field| {
            let field = field.trim();
            field.len() >= 2 && field.starts_with('\'') && field.ends_with('\'')
        })
    });
    if single_quoted { b'\'' } else { b'"' }
}
