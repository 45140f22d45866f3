//! Linear tokenizer for inline signal markers
//!
//! Recognizes two marker forms, matching tag and attribute names
//! ASCII-case-insensitively:
//!
//! - typed: `<signal type=NAME>content</signal>` where `NAME` is one or
//!   more ASCII letters or underscores and the content runs to the first
//!   closing tag
//! - simple: `<signal>NAME</signal>` where `NAME` is non-empty and has no `<`
//!
//! Markers are yielded in document order by starting offset. Typed markers
//! never overlap one another; a simple marker sitting inside a typed
//! marker's content is still yielded at its own offset.

const OPEN: &[u8] = b"<signal";
const CLOSE: &[u8] = b"</signal>";
const TYPE_ATTR: &[u8] = b"type=";

/// Which surface syntax a marker used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerForm {
    /// `<signal type=NAME>content</signal>`
    Typed,
    /// `<signal>NAME</signal>`
    Simple,
}

/// A single marker occurrence, borrowing from the scanned text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker<'a> {
    pub form: MarkerForm,
    /// Byte offset of the opening `<`
    pub offset: usize,
    /// Byte offset just past the closing tag
    pub end: usize,
    /// Raw, untrimmed marker name
    pub name: &'a str,
    /// Raw, untrimmed content (typed form only)
    pub content: Option<&'a str>,
}

/// Iterator over the markers in a text
pub struct Scanner<'a> {
    text: &'a str,
    pos: usize,
    typed_resume: usize,
    /// Last closing-tag search: where it started and what it found
    close_hint: Option<(usize, Option<usize>)>,
}

impl<'a> Scanner<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            pos: 0,
            typed_resume: 0,
            close_hint: None,
        }
    }

    /// Next closing tag at or after `from`.
    ///
    /// Callers ask with non-decreasing `from`, so a previous answer is reused
    /// until the scan moves past it and the text is walked once overall.
    fn close_from(&mut self, from: usize) -> Option<usize> {
        if let Some((searched, found)) = self.close_hint {
            if searched <= from && found.map_or(true, |close| close >= from) {
                return found;
            }
        }
        let found = find_ignore_case(self.text, from, CLOSE);
        self.close_hint = Some((from, found));
        found
    }

    fn simple_at(&self, start: usize) -> Option<Marker<'a>> {
        let inner = start + OPEN.len() + 1;
        let close = inner + self.text.get(inner..)?.find('<')?;
        if close == inner || !starts_with_ignore_case(&self.text.as_bytes()[close..], CLOSE) {
            return None;
        }

        Some(Marker {
            form: MarkerForm::Simple,
            offset: start,
            end: close + CLOSE.len(),
            name: &self.text[inner..close],
            content: None,
        })
    }

    fn typed_at(&mut self, start: usize) -> Option<Marker<'a>> {
        let bytes = self.text.as_bytes();
        let after_open = start + OPEN.len();

        let rest = &self.text[after_open..];
        let attr = rest.trim_start();
        if attr.len() == rest.len() {
            return None;
        }
        let attr_start = after_open + (rest.len() - attr.len());
        if !starts_with_ignore_case(&bytes[attr_start..], TYPE_ATTR) {
            return None;
        }

        let name_start = attr_start + TYPE_ATTR.len();
        let name_len = bytes[name_start..]
            .iter()
            .take_while(|b| b.is_ascii_alphabetic() || **b == b'_')
            .count();
        let name_end = name_start + name_len;
        if name_len == 0 || bytes.get(name_end) != Some(&b'>') {
            return None;
        }

        let content_start = name_end + 1;
        let close = self.close_from(content_start)?;

        Some(Marker {
            form: MarkerForm::Typed,
            offset: start,
            end: close + CLOSE.len(),
            name: &self.text[name_start..name_end],
            content: Some(&self.text[content_start..close]),
        })
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Marker<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(start) = find_ignore_case(self.text, self.pos, OPEN) {
            self.pos = start + 1;

            match self.text.as_bytes().get(start + OPEN.len()) {
                Some(b'>') => {
                    if let Some(marker) = self.simple_at(start) {
                        return Some(marker);
                    }
                }
                Some(_) if start >= self.typed_resume => {
                    if let Some(marker) = self.typed_at(start) {
                        self.typed_resume = marker.end;
                        return Some(marker);
                    }
                }
                _ => {}
            }
        }

        self.pos = self.text.len();
        None
    }
}

/// Scan a text for markers
pub fn scan(text: &str) -> Scanner<'_> {
    Scanner::new(text)
}

fn starts_with_ignore_case(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.len() >= needle.len() && haystack[..needle.len()].eq_ignore_ascii_case(needle)
}

/// Byte offset of the next `needle` (which must start with `<`) at or after `from`
fn find_ignore_case(text: &str, from: usize, needle: &[u8]) -> Option<usize> {
    let bytes = text.as_bytes();
    let tail = text.get(from..)?;
    tail.match_indices('<')
        .map(|(i, _)| from + i)
        .find(|&i| starts_with_ignore_case(&bytes[i..], needle))
}
