/// Comment link scanner. Finds `[description](path[:line])` markup in raw
/// document text.
///
/// Offsets are char (Unicode scalar) indices into the text, the same unit
/// `ropey` uses, so callers can map them straight to LSP positions.
use std::ops::Range;

/// Half-open char offset range into the scanned text.
pub(crate) type Span = Range<usize>;

/// One matched link markup instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Occurrence {
    /// The whole markup, `[` through the closing `)`.
    pub raw_span: Span,
    /// Only the text between `[` and `]`.
    pub description_span: Span,
    pub description: String,
    /// The path as written, without the `:line` suffix.
    pub path_text: String,
    /// The `:N` suffix, if present.
    pub line_hint: Option<u32>,
}

impl Occurrence {
    pub fn contains(&self, offset: usize) -> bool {
        self.raw_span.contains(&offset)
    }
}

enum Attempt {
    Matched(Occurrence),
    /// No link starts here; later positions may still match.
    Miss,
    /// Ran off the end of the text, so nothing at or after this start can match.
    Exhausted,
}

/// For every index, the first index at or after it whose char satisfies
/// `pred`. One extra trailing slot keeps lookups one past the end in bounds.
fn next_where(chars: &[char], pred: impl Fn(char) -> bool) -> Vec<Option<usize>> {
    let mut table = vec![None; chars.len() + 1];
    for i in (0..chars.len()).rev() {
        table[i] = if pred(chars[i]) { Some(i) } else { table[i + 1] };
    }
    table
}

/// Lookup tables shared by every match attempt in one scan.
///
/// Each attempt jumps straight to its delimiters instead of walking the
/// chars between them, so a scan costs O(n) however many `[` fail to match.
struct Delimiters {
    close_bracket: Vec<Option<usize>>,
    path_end: Vec<Option<usize>>,
    non_digit: Vec<Option<usize>>,
}

impl Delimiters {
    fn new(chars: &[char]) -> Self {
        Self {
            close_bracket: next_where(chars, |c| c == ']'),
            path_end: next_where(chars, |c| c == ')' || c == ':'),
            non_digit: next_where(chars, |c| !c.is_ascii_digit()),
        }
    }

    fn lookup(table: &[Option<usize>], i: usize) -> Option<usize> {
        table.get(i).copied().flatten()
    }
}

/// Scan the full document text and return every link occurrence in order.
///
/// Matching is leftmost-first and non-overlapping: after a match the scan
/// resumes past its closing `)`. Text that almost matches is skipped silently.
pub(crate) fn scan(text: &str) -> Vec<Occurrence> {
    let chars: Vec<char> = text.chars().collect();
    let delimiters = Delimiters::new(&chars);
    let mut out = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        if chars[i] != '[' {
            i += 1;
            continue;
        }
        match match_at(&chars, &delimiters, i) {
            Attempt::Matched(occurrence) => {
                i = occurrence.raw_span.end;
                out.push(occurrence);
            }
            Attempt::Miss => i += 1,
            Attempt::Exhausted => break,
        }
    }

    out
}

/// Match `[desc](path[:digits])` from the `[` at `start` in constant time,
/// plus the cost of copying out a successful match.
fn match_at(chars: &[char], delimiters: &Delimiters, start: usize) -> Attempt {
    let desc_start = start + 1;
    let Some(desc_end) = Delimiters::lookup(&delimiters.close_bracket, desc_start) else {
        return Attempt::Exhausted;
    };
    if desc_end == desc_start {
        return Attempt::Miss;
    }

    match chars.get(desc_end + 1).copied() {
        Some('(') => {}
        Some(_) => return Attempt::Miss,
        None => return Attempt::Exhausted,
    }

    let path_start = desc_end + 2;
    let Some(path_end) = Delimiters::lookup(&delimiters.path_end, path_start) else {
        return Attempt::Exhausted;
    };
    if path_end == path_start {
        return Attempt::Miss;
    }
    if chars[path_end] == ')' {
        return Attempt::Matched(build(
            chars,
            start,
            desc_start..desc_end,
            path_start..path_end,
            None,
            path_end + 1,
        ));
    }

    let digits_start = path_end + 1;
    let Some(close) = Delimiters::lookup(&delimiters.non_digit, digits_start) else {
        return Attempt::Exhausted;
    };
    if close == digits_start || chars[close] != ')' {
        return Attempt::Miss;
    }
    let hint = parse_hint(&chars[digits_start..close]);
    Attempt::Matched(build(
        chars,
        start,
        desc_start..desc_end,
        path_start..path_end,
        Some(hint),
        close + 1,
    ))
}

fn build(
    chars: &[char],
    start: usize,
    description_span: Span,
    path_span: Span,
    line_hint: Option<u32>,
    end: usize,
) -> Occurrence {
    Occurrence {
        raw_span: start..end,
        description: chars[description_span.clone()].iter().collect(),
        description_span,
        path_text: chars[path_span].iter().collect(),
        line_hint,
    }
}

/// Parse an ASCII digit run, saturating at `u32::MAX`.
fn parse_hint(digits: &[char]) -> u32 {
    digits.iter().fold(0u32, |acc, c| {
        let digit = c.to_digit(10).unwrap_or(0);
        acc.saturating_mul(10).saturating_add(digit)
    })
}
