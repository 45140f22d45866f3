//! Signal extraction from agent output

use serde::{Deserialize, Serialize};

use super::scanner::{scan, Marker, MarkerForm};

/// The signal that governs a transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedSignal {
    /// Marker name, trimmed
    #[serde(rename = "type")]
    pub kind: String,
    /// Trimmed content of a typed marker; `None` when absent or blank
    pub content: Option<String>,
}

impl<'a> From<Marker<'a>> for ExtractedSignal {
    fn from(marker: Marker<'a>) -> Self {
        Self {
            kind: marker.name.trim().to_string(),
            content: marker
                .content
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string),
        }
    }
}

/// Extract the governing signal from agent output.
///
/// Both marker forms are considered together and the one starting last in
/// the text wins: agents revise themselves mid-output, and the final marker
/// is their concluded decision. A blank simple marker still governs, with
/// an empty `kind` that no phase declares.
pub fn extract_signal(output: &str) -> Option<ExtractedSignal> {
    scan(output)
        .fold(None::<Marker<'_>>, |governing, marker| match governing {
            Some(g) if g.offset > marker.offset => Some(g),
            _ => Some(marker),
        })
        .map(ExtractedSignal::from)
}

/// Every marker name in the output.
///
/// Typed-form names come first, then simple-form names; order is document
/// order within each form only.
pub fn extract_all_signals(output: &str) -> Vec<String> {
    let (typed, simple): (Vec<_>, Vec<_>) =
        scan(output).partition(|m| m.form == MarkerForm::Typed);

    typed
        .into_iter()
        .chain(simple)
        .map(|m| m.name.trim().to_string())
        .collect()
}

/// Whether the output carries at least one simple-form marker.
///
/// Typed markers alone don't count; this answers "has the agent concluded".
pub fn has_signal(output: &str) -> bool {
    scan(output).any(|m| m.form == MarkerForm::Simple)
}

/// Remove every simple-form marker and trim the result.
///
/// Typed markers are left in place. Removal repeats until nothing is left
/// to remove, since cutting one marker out can splice its neighbours into
/// a new one.
pub fn strip_signals(output: &str) -> String {
    let mut text = output.to_string();

    loop {
        let mut stripped = String::with_capacity(text.len());
        let mut last = 0;
        for marker in scan(&text).filter(|m| m.form == MarkerForm::Simple) {
            stripped.push_str(&text[last..marker.offset]);
            last = marker.end;
        }
        if last == 0 {
            break;
        }
        stripped.push_str(&text[last..]);
        text = stripped;
    }

    text.trim().to_string()
}

/// Render a simple-form marker
pub fn format_signal(name: &str) -> String {
    format!("<signal>{}</signal>", name)
}

/// Render a typed marker carrying content
pub fn format_typed_signal(name: &str, content: &str) -> String {
    format!("<signal type={}>{}</signal>", name, content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_markers() {
        assert_eq!(extract_signal("just some prose, no markers"), None);
        assert_eq!(extract_signal(""), None);
        assert!(extract_all_signals("plain").is_empty());
        assert!(!has_signal("plain"));
    }

    #[test]
    fn test_simple_marker() {
        let signal = extract_signal("work done <signal>COMPLETE</signal>").unwrap();
        assert_eq!(signal.kind, "COMPLETE");
        assert_eq!(signal.content, None);
    }

    #[test]
    fn test_typed_marker_with_content() {
        let signal = extract_signal("<signal type=BLOCKED>waiting on API keys</signal>").unwrap();
        assert_eq!(signal.kind, "BLOCKED");
        assert_eq!(signal.content.as_deref(), Some("waiting on API keys"));
    }

    #[test]
    fn test_typed_marker_blank_content_is_none() {
        let signal = extract_signal("<signal type=DONE>  \n </signal>").unwrap();
        assert_eq!(signal.kind, "DONE");
        assert_eq!(signal.content, None);
    }

    #[test]
    fn test_last_simple_wins() {
        let text = "<signal>FOO</signal> then <signal>BAR</signal>";
        assert_eq!(extract_signal(text).unwrap().kind, "BAR");
        assert_eq!(extract_all_signals(text), vec!["FOO", "BAR"]);
    }

    #[test]
    fn test_later_typed_beats_earlier_simple() {
        let text = "<signal>PLAN_DRAFTED</signal>\nactually:\n<signal type=AWAITING_INPUT>Which DB?</signal>";
        let signal = extract_signal(text).unwrap();
        assert_eq!(signal.kind, "AWAITING_INPUT");
        assert_eq!(signal.content.as_deref(), Some("Which DB?"));
    }

    #[test]
    fn test_later_simple_beats_earlier_typed() {
        let text = "<signal type=BLOCKED>hmm</signal> resolved it <signal>PLAN_READY</signal>";
        let signal = extract_signal(text).unwrap();
        assert_eq!(signal.kind, "PLAN_READY");
        assert_eq!(signal.content, None);
    }

    #[test]
    fn test_repeated_identical_markers() {
        let text = "<signal>A</signal> <signal>B</signal> <signal>A</signal>";
        assert_eq!(extract_signal(text).unwrap().kind, "A");
        assert_eq!(extract_all_signals(text), vec!["A", "B", "A"]);
    }

    #[test]
    fn test_names_are_trimmed() {
        let signal = extract_signal("<signal>  SPEC_READY \n</signal>").unwrap();
        assert_eq!(signal.kind, "SPEC_READY");
    }

    #[test]
    fn test_blank_simple_marker_governs_as_empty() {
        let blank = extract_signal("<signal>   </signal>").unwrap();
        assert_eq!(blank.kind, "");
        assert_eq!(blank.content, None);

        let text = "<signal>GO</signal> then <signal> </signal>";
        assert_eq!(extract_signal(text).unwrap().kind, "");
        assert_eq!(extract_all_signals(text), vec!["GO", ""]);
        assert!(has_signal(text));
    }

    #[test]
    fn test_all_signals_lists_typed_first() {
        let text = "<signal>ONE</signal> <signal type=TWO>x</signal> <signal>THREE</signal>";
        assert_eq!(extract_all_signals(text), vec!["TWO", "ONE", "THREE"]);
        assert_eq!(extract_signal(text).unwrap().kind, "THREE");
    }

    #[test]
    fn test_has_signal_ignores_typed_only() {
        assert!(has_signal("x <signal>DONE</signal>"));
        assert!(!has_signal("<signal type=BLOCKED>reason</signal>"));
    }

    #[test]
    fn test_strip_signals() {
        let text = "  Summary here.\n<signal>COMPLETE</signal>\n";
        assert_eq!(strip_signals(text), "Summary here.");

        let typed = "keep <signal type=BLOCKED>why</signal> drop <signal>X</signal>";
        assert_eq!(
            strip_signals(typed),
            "keep <signal type=BLOCKED>why</signal> drop"
        );
    }

    #[test]
    fn test_strip_signals_is_idempotent_when_markers_splice() {
        let text = "a <signal><signal>X</signal>Y</signal> b";
        let once = strip_signals(text);
        assert_eq!(once, "a  b");
        assert_eq!(strip_signals(&once), once);
        assert!(!has_signal(&once));
    }

    #[test]
    fn test_format_round_trip() {
        assert_eq!(format_signal("FOO"), "<signal>FOO</signal>");
        assert_eq!(extract_signal(&format_signal("FOO")).unwrap().kind, "FOO");

        let typed = format_typed_signal("AWAITING_INPUT", "Which port?");
        let signal = extract_signal(&typed).unwrap();
        assert_eq!(signal.kind, "AWAITING_INPUT");
        assert_eq!(signal.content.as_deref(), Some("Which port?"));
    }

    #[test]
    fn test_serializes_kind_as_type() {
        let signal = ExtractedSignal {
            kind: "BLOCKED".to_string(),
            content: None,
        };
        let json = serde_json::to_value(&signal).unwrap();
        assert_eq!(json["type"], "BLOCKED");
    }
}
