use crate::Logger;

/// Separator between the start and end timestamps of a cue timing line.
const TIMING_SEPARATOR: &str = " --> ";

/// A timed text fragment, ready to be displayed between `start` and `end`.
#[derive(Clone, Debug, PartialEq)]
pub struct Cue {
    /// Start time, in seconds.
    pub start: f64,
    /// End time, in seconds.
    pub end: f64,
    /// Text to display. Multiple lines are joined with `\n`.
    pub text: String,
}

/// Parse a WebVTT-like cue document into its list of cues, in document order.
///
/// Parsing is lenient: a cue whose timing line cannot be parsed is skipped alongside its text
/// and a cue without text is dropped, the rest of the document is still parsed.
pub fn parse_cues(content: &str) -> Vec<Cue> {
    let mut cues = Vec::new();
    let mut lines = content.lines().map(|l| l.trim_end_matches('\r'));

    while let Some(line) = lines.next() {
        let Some(separator_idx) = line.find(TIMING_SEPARATOR) else {
            continue;
        };

        let timing = parse_timing_line(line, separator_idx);

        let mut text_lines: Vec<&str> = Vec::new();
        for text_line in lines.by_ref() {
            if text_line.trim().is_empty() {
                break;
            }
            text_lines.push(text_line);
        }

        match timing {
            None => Logger::lazy_warn(&|| format!("Cue: skipping malformed timing line \"{line}\"")),
            Some(_) if text_lines.is_empty() => {}
            Some((start, end)) => cues.push(Cue {
                start,
                end,
                text: text_lines.join("\n"),
            }),
        }
    }
    cues
}

/// Parse `<start> --> <end> [settings...]` into start and end times, in seconds.
fn parse_timing_line(line: &str, separator_idx: usize) -> Option<(f64, f64)> {
    let start = parse_timestamp(line[..separator_idx].trim())?;
    let end_part = line[separator_idx + TIMING_SEPARATOR.len()..].trim_start();
    let end_str = end_part.split_whitespace().next()?;
    let end = parse_timestamp(end_str)?;
    Some((start, end))
}

/// Parse a `[HH:]MM:SS.mmm` timestamp into seconds.
fn parse_timestamp(ts: &str) -> Option<f64> {
    let mut parts = ts.split(':').rev();
    let seconds = parse_component(parts.next()?)?;
    let minutes = parse_component(parts.next()?)?;
    let hours = match parts.next() {
        Some(h) => parse_component(h)?,
        None => 0.,
    };
    if parts.next().is_some() {
        return None;
    }
    Some(hours * 3600. + minutes * 60. + seconds)
}

fn parse_component(value: &str) -> Option<f64> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
        return None;
    }
    value.parse::<f64>().ok()
}
