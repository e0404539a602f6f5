use regex::Regex;
use std::sync::OnceLock;

/// Progress information extracted from one line of extractor output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Completion percentage, when the line carried one
    pub percent: Option<u8>,
}

/// Capability to turn extractor output lines into progress events
pub trait ProgressParser: Send + Sync {
    fn parse_progress(&self, line: &str) -> ProgressEvent;
}

fn gui_report_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"###PROGRESS#(\d{1,3})#").expect("valid regex"))
}

fn percent_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(\d{1,3})%").expect("valid regex"))
}

/// Parses ccextractor progress output.
///
/// Understands both the plain console form (`  45%  |  00:12`) and the
/// machine readable `-gui_mode_reports` form (`###PROGRESS#45#00#12`).
#[derive(Debug, Clone, Copy, Default)]
pub struct CcextractorProgressParser;

impl CcextractorProgressParser {
    pub fn new() -> Self {
        Self
    }
}

impl ProgressParser for CcextractorProgressParser {
    fn parse_progress(&self, line: &str) -> ProgressEvent {
        let captures = gui_report_regex()
            .captures(line)
            .or_else(|| percent_regex().captures(line));

        let percent = captures
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<u16>().ok())
            .map(|value| value.min(100) as u8);

        ProgressEvent { percent }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_progress() {
        let parser = CcextractorProgressParser::new();
        assert_eq!(parser.parse_progress("  45%  |  00:12").percent, Some(45));
        assert_eq!(parser.parse_progress("100%  |  01:30").percent, Some(100));
    }

    #[test]
    fn test_gui_report_progress() {
        let parser = CcextractorProgressParser::new();
        assert_eq!(parser.parse_progress("###PROGRESS#7#00#03").percent, Some(7));
    }

    #[test]
    fn test_unrelated_lines() {
        let parser = CcextractorProgressParser::new();
        let event = parser.parse_progress("Input: /media/show/ep1.ts");
        assert_eq!(event, ProgressEvent::default());
        assert_eq!(parser.parse_progress("Found 2% of garbage").percent, None);
    }
}
