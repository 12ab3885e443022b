//! Transcript body extraction.
//!
//! A transcript page mixes the spoken call with navigation chrome, headline
//! blocks, speaker attribution lines and a closing legal notice. The body is
//! bracketed by a start marker heading and a stop line, so extraction is a
//! small state machine over the page's fragments in document order:
//!
//! ```text
//! Seeking --(text == start marker)--> Collecting --(stop condition)--> Terminated
//! ```
//!
//! Start markers match on exact text; stop conditions match on substring or
//! prefix.

use crate::models::Fragment;
use crate::utils::truncate_for_log;
use tracing::{debug, warn};

/// Headings that open the transcript body.
pub const START_MARKERS: [&str; 2] = ["Prepared Remarks:", "Full Conference Call Transcript"];

/// The call length line that follows the last spoken paragraph.
pub const DURATION_MARKER: &str = "Duration:";

/// Opening of the legal notice that closes the page.
pub const STOPPING_PHRASE: &str = "This article is a transcript of this conference call";

/// Separator used in speaker attribution lines ("Tim Cook -- Chief Executive Officer").
pub const SPEAKER_SEPARATOR: &str = "--";

/// Attribution line for the call operator.
pub const OPERATOR: &str = "Operator";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Seeking,
    Collecting,
    Terminated,
}

fn is_start_marker(text: &str) -> bool {
    START_MARKERS.contains(&text)
}

fn is_stop(text: &str) -> bool {
    text.contains(DURATION_MARKER) || text.starts_with(STOPPING_PHRASE)
}

fn is_spoken_line(text: &str) -> bool {
    !text.is_empty() && !text.contains(SPEAKER_SEPARATOR) && text != OPERATOR
}

/// Extract the transcript lines from a page's fragments.
///
/// Returns an empty vector when no start marker is present. Without a stop
/// condition, collection runs to the end of the input. Fragments without
/// extractable text are skipped and leave the current state untouched.
///
/// # Arguments
///
/// * `fragments` - A page's text-bearing nodes in document order
///
/// # Returns
///
/// The spoken transcript lines, without the start marker, the stop line,
/// speaker attributions, `Operator` lines or empty lines.
pub fn extract<'a, I>(fragments: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a Fragment>,
{
    let mut state = State::Seeking;
    let mut content = Vec::new();

    for (index, fragment) in fragments.into_iter().enumerate() {
        let Some(text) = fragment.text() else {
            warn!(index, tag = fragment.tag(), "Fragment has no extractable text; skipping");
            continue;
        };

        state = match state {
            State::Seeking if is_start_marker(text) => {
                debug!(index, marker = text, "Transcript start marker found");
                State::Collecting
            }
            State::Seeking => State::Seeking,
            State::Collecting if is_stop(text) => {
                debug!(index, line = %truncate_for_log(text, 80), "Transcript stop condition found");
                State::Terminated
            }
            State::Collecting => {
                if is_spoken_line(text) {
                    content.push(text.to_string());
                }
                State::Collecting
            }
            State::Terminated => State::Terminated,
        };

        if state == State::Terminated {
            break;
        }
    }

    content
}
