//! Data models for discovered calls, page fragments, and results.
//!
//! - [`CallStub`]: a discovered transcript (date + link) before extraction
//! - [`Fragment`]: one text-bearing node from a rendered page
//! - [`TranscriptCall`]: a call with its extracted transcript lines
//! - [`TickerResults`]: ordered mapping of ticker to its calls
//! - [`TickerFailure`]: a ticker whose discovery failed

use crate::utils::date_from_link;
use scraper::ElementRef;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// A transcript found by link discovery, before its page is fetched.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CallStub {
    /// Call date in `YYYY-MM-DD` format, taken from the link path.
    pub date: String,
    /// Absolute URL of the transcript page.
    pub link: String,
}

/// An opaque text-bearing node from a rendered page.
///
/// Produced by the page-fetch and listing collaborators, consumed by the
/// extractor and link discovery, never retained afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    tag: String,
    text: Option<String>,
    href: Option<String>,
}

impl Fragment {
    pub fn new(tag: impl Into<String>, text: Option<String>) -> Self {
        Self {
            tag: tag.into(),
            text,
            href: None,
        }
    }

    /// Shorthand for a fragment whose text is known.
    #[cfg(test)]
    pub fn with_text(tag: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(tag, Some(text.into()))
    }

    pub fn with_href(mut self, href: impl Into<String>) -> Self {
        self.href = Some(href.into());
        self
    }

    /// Build a fragment from a parsed HTML element.
    ///
    /// Each text node is trimmed and the non-empty pieces are concatenated with
    /// no separator. An element with no text nodes at all has no text.
    pub fn from_element(element: ElementRef<'_>) -> Self {
        let mut pieces = element.text().peekable();
        let text = pieces.peek().is_some().then(|| {
            pieces
                .map(str::trim)
                .filter(|piece| !piece.is_empty())
                .collect::<String>()
        });
        let fragment = Self::new(element.value().name(), text);
        match element.value().attr("href") {
            Some(href) => fragment.with_href(href),
            None => fragment,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn href(&self) -> Option<&str> {
        self.href.as_deref()
    }

    pub fn has_link(&self) -> bool {
        self.href.as_deref().is_some_and(|h| !h.trim().is_empty())
    }

    /// The ISO call date encoded in the link path, if any.
    pub fn date_path_segment(&self) -> Option<String> {
        self.href.as_deref().and_then(date_from_link)
    }
}

/// A discovered call together with its extracted transcript lines.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TranscriptCall {
    pub date: String,
    pub link: String,
    /// Transcript lines in page order; empty when the page could not be fetched.
    pub content: Vec<String>,
}

impl TranscriptCall {
    pub fn from_stub(stub: CallStub, content: Vec<String>) -> Self {
        Self {
            date: stub.date,
            link: stub.link,
            content,
        }
    }
}

/// Calls per ticker, in the order tickers were processed.
///
/// Serializes as a JSON object whose keys keep insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickerResults {
    entries: Vec<(String, Vec<TranscriptCall>)>,
}

impl TickerResults {
    #[cfg(test)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the calls for `ticker`, keeping its original position.
    pub fn insert(&mut self, ticker: impl Into<String>, calls: Vec<TranscriptCall>) {
        let ticker = ticker.into();
        match self.entries.iter().position(|(t, _)| *t == ticker) {
            Some(index) => self.entries[index].1 = calls,
            None => self.entries.push((ticker, calls)),
        }
    }

    #[cfg(test)]
    pub fn get(&self, ticker: &str) -> Option<&[TranscriptCall]> {
        self.entries
            .iter()
            .find(|(t, _)| t == ticker)
            .map(|(_, calls)| calls.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[TranscriptCall])> {
        self.entries.iter().map(|(t, c)| (t.as_str(), c.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_calls(&self) -> usize {
        self.entries.iter().map(|(_, calls)| calls.len()).sum()
    }
}

impl Serialize for TickerResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (ticker, calls) in &self.entries {
            map.serialize_entry(ticker, calls)?;
        }
        map.end()
    }
}

/// A ticker that produced no result because discovery failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TickerFailure {
    pub ticker: String,
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    fn first_fragment(html: &str, selector: &str) -> Fragment {
        let doc = Html::parse_fragment(html);
        let sel = Selector::parse(selector).unwrap();
        Fragment::from_element(doc.select(&sel).next().unwrap())
    }

    #[test]
    fn test_fragment_text_is_stripped_and_joined() {
        let frag = first_fragment("<p>  Hello <b> everyone </b>\n and welcome </p>", "p");
        assert_eq!(frag.tag(), "p");
        assert_eq!(frag.text(), Some("Helloeveryoneand welcome"));
        assert!(!frag.has_link());
    }

    #[test]
    fn test_fragment_without_text_nodes() {
        let frag = first_fragment(r#"<p><img src="x.png"></p>"#, "p");
        assert_eq!(frag.text(), None);
    }

    #[test]
    fn test_fragment_whitespace_only_is_empty_text() {
        let frag = first_fragment("<p>   \n  </p>", "p");
        assert_eq!(frag.text(), Some(""));
    }

    #[test]
    fn test_fragment_link_capabilities() {
        let frag = first_fragment(
            r#"<a href="/earnings/call-transcripts/2025/04/25/msft-q3/">Q3 2025</a>"#,
            "a",
        );
        assert!(frag.has_link());
        assert_eq!(frag.date_path_segment(), Some("2025-04-25".to_string()));

        let bare = first_fragment("<a>no link</a>", "a");
        assert!(!bare.has_link());
        assert_eq!(bare.date_path_segment(), None);
    }

    #[test]
    fn test_transcript_call_from_stub() {
        let stub = CallStub {
            date: "2025-07-31".into(),
            link: "https://www.fool.com/earnings/call-transcripts/2025/07/31/a/".into(),
        };
        let call = TranscriptCall::from_stub(stub.clone(), vec!["Good afternoon.".into()]);
        assert_eq!(call.date, stub.date);
        assert_eq!(call.link, stub.link);
        assert_eq!(call.content, vec!["Good afternoon."]);
    }

    #[test]
    fn test_ticker_results_serialize_in_insertion_order() {
        let mut results = TickerResults::new();
        results.insert("MSFT", vec![]);
        results.insert(
            "AAPL",
            vec![TranscriptCall {
                date: "2025-07-31".into(),
                link: "https://example.com/t".into(),
                content: vec!["Hi".into()],
            }],
        );
        let json = serde_json::to_string(&results).unwrap();
        assert_eq!(
            json,
            r#"{"MSFT":[],"AAPL":[{"date":"2025-07-31","link":"https://example.com/t","content":["Hi"]}]}"#
        );
        assert_eq!(results.total_calls(), 1);
        assert_eq!(
            results.iter().map(|(t, _)| t).collect::<Vec<_>>(),
            vec!["MSFT", "AAPL"]
        );
    }

    #[test]
    fn test_ticker_results_insert_replaces_in_place() {
        let mut results = TickerResults::new();
        results.insert("A", vec![]);
        results.insert("B", vec![]);
        let call = TranscriptCall {
            date: "2024-01-01".into(),
            link: "l".into(),
            content: vec![],
        };
        results.insert("A", vec![call.clone()]);
        assert_eq!(results.len(), 2);
        assert_eq!(results.get("A"), Some(&[call][..]));
        assert_eq!(results.iter().next().map(|(t, _)| t), Some("A"));
        assert!(results.get("C").is_none());
    }
}
