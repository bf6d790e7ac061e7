use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

use crate::error::PipelineError;
use crate::models::Channel;

const HEADER_MARKER: &str = "#EXTM3U";
const EXTINF_MARKER: &str = "#EXTINF:";

/// Group assigned when a directive carries no `group-title`
pub const DEFAULT_GROUP: &str = "Unknown";
/// Name used when neither `tvg-name` nor trailing text is present
pub const NAME_PLACEHOLDER: &str = "No name";

lazy_static! {
    /// Regex to normalize multiple whitespaces into single space
    static ref MULTI_SPACE_REGEX: Regex = Regex::new(r"\s{2,}").unwrap();
    /// Regex to parse EXTINF attributes (tvg-id="...", group-title="...", etc)
    static ref ATTR_REGEX: Regex = Regex::new(r#"(\w+(?:-\w+)*)="([^"]*)""#).unwrap();
}

/// Parsed EXTINF line data
#[derive(Debug, Default)]
struct ExtinfData {
    /// Attribute keys are lower-cased
    attributes: HashMap<String, String>,
    title: String,
}

impl ExtinfData {
    fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(|s| s.as_str())
    }
}

/// Entry opened by a directive line, waiting for its resource line
#[derive(Debug, Clone, PartialEq)]
struct PendingEntry {
    name: String,
    group: String,
    logo: Option<String>,
}

impl PendingEntry {
    fn from_extinf(extinf: ExtinfData) -> Self {
        let name = extinf
            .attr("tvg-name")
            .map(normalize_text)
            .filter(|n| !n.is_empty())
            .or_else(|| Some(normalize_text(&extinf.title)).filter(|t| !t.is_empty()))
            .unwrap_or_else(|| NAME_PLACEHOLDER.to_string());

        let group = extinf
            .attr("group-title")
            .map(normalize_text)
            .filter(|g| !g.is_empty())
            .unwrap_or_else(|| DEFAULT_GROUP.to_string());

        let logo = extinf
            .attr("tvg-logo")
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string);

        Self { name, group, logo }
    }

    /// Entry for a resource line that had no directive before it
    fn orphan(url: &str) -> Self {
        Self {
            name: url.to_string(),
            group: DEFAULT_GROUP.to_string(),
            logo: None,
        }
    }

    fn finish(self, url: &str) -> Channel {
        Channel {
            name: self.name,
            group: self.group,
            logo: self.logo,
            url: url.to_string(),
        }
    }
}

/// Scanner state between lines
#[derive(Debug)]
enum ScanState {
    AwaitingDirective,
    AwaitingResource(PendingEntry),
}

/// Parse output plus counters for malformed-but-tolerated input
#[derive(Debug, Default)]
pub struct ParseReport {
    pub channels: Vec<Channel>,
    /// Directives replaced by another directive before any resource line
    pub discarded_directives: usize,
    /// Resource lines with no directive before them
    pub orphan_resources: usize,
}

/// Normalize text: trim and collapse multiple spaces into single space
fn normalize_text(text: &str) -> String {
    let trimmed = text.trim();
    MULTI_SPACE_REGEX.replace_all(trimmed, " ").to_string()
}

/// Byte offset of the first comma outside a quoted attribute value
fn title_separator(header: &str) -> Option<usize> {
    let mut in_quotes = false;
    for (idx, c) in header.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => return Some(idx),
            _ => {}
        }
    }
    None
}

/// Parse an EXTINF line
/// Format: #EXTINF:duration tvg-id="..." tvg-name="..." tvg-logo="..." group-title="...",Title
fn parse_extinf(line: &str) -> ExtinfData {
    let content = line.strip_prefix(EXTINF_MARKER).unwrap_or(line);

    let (header, title) = match title_separator(content) {
        Some(comma) => (&content[..comma], content[comma + 1..].trim()),
        None => (content, ""),
    };

    let mut attributes = HashMap::new();
    for caps in ATTR_REGEX.captures_iter(header) {
        let key = caps.get(1).map(|m| m.as_str().to_lowercase()).unwrap_or_default();
        let value = caps.get(2).map(|m| m.as_str().to_string()).unwrap_or_default();
        attributes.entry(key).or_insert(value);
    }

    ExtinfData {
        attributes,
        title: title.to_string(),
    }
}

fn is_resource_line(line: &str) -> bool {
    line.starts_with("http")
}

/// Reject text that is not a playlist before attempting to parse it
pub fn validate_document(text: &str) -> Result<(), PipelineError> {
    if text.contains(HEADER_MARKER) || text.contains(EXTINF_MARKER) {
        Ok(())
    } else {
        Err(PipelineError::MalformedDocument)
    }
}

/// Parse playlist text into channels in input order
pub fn parse(text: &str) -> Vec<Channel> {
    parse_with_report(text).channels
}

/// Parse playlist text, also counting tolerated anomalies.
///
/// A directive only opens a pending entry; the entry is emitted when the next
/// `http` line arrives. A second directive before that replaces the pending
/// one. Comment lines and non-http lines leave the state untouched.
pub fn parse_with_report(text: &str) -> ParseReport {
    let mut report = ParseReport::default();
    let mut state = ScanState::AwaitingDirective;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if line.starts_with(EXTINF_MARKER) {
            if let ScanState::AwaitingResource(previous) = &state {
                tracing::debug!(name = %previous.name, "Directive without resource line discarded");
                report.discarded_directives += 1;
            }
            state = ScanState::AwaitingResource(PendingEntry::from_extinf(parse_extinf(line)));
            continue;
        }

        if !is_resource_line(line) {
            continue;
        }

        let pending = match std::mem::replace(&mut state, ScanState::AwaitingDirective) {
            ScanState::AwaitingResource(pending) => pending,
            ScanState::AwaitingDirective => {
                report.orphan_resources += 1;
                PendingEntry::orphan(line)
            }
        };
        report.channels.push(pending.finish(line));
    }

    if let ScanState::AwaitingResource(pending) = state {
        tracing::debug!(name = %pending.name, "Trailing directive without resource line discarded");
        report.discarded_directives += 1;
    }

    report
}

/// Sort by group, then name.
///
/// Plain byte-wise `String` ordering: case-sensitive and independent of
/// locale, so the same input always sorts the same way.
pub fn sort_channels(channels: &mut [Channel]) {
    channels.sort_by(|a, b| a.group.cmp(&b.group).then_with(|| a.name.cmp(&b.name)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_extinf() {
        let line = r#"#EXTINF:-1 tvg-id="globo" tvg-name="Globo HD" tvg-logo="http://logo.com/globo.png" group-title="TV",Globo HD"#;
        let extinf = parse_extinf(line);

        assert_eq!(extinf.title, "Globo HD");
        assert_eq!(extinf.attr("tvg-id"), Some("globo"));
        assert_eq!(extinf.attr("group-title"), Some("TV"));
        assert_eq!(extinf.attr("tvg-logo"), Some("http://logo.com/globo.png"));
    }

    #[test]
    fn test_parse_extinf_minimal() {
        let extinf = parse_extinf("#EXTINF:-1,Canal Teste");
        assert_eq!(extinf.title, "Canal Teste");
        assert!(extinf.attributes.is_empty());
    }

    #[test]
    fn test_parse_extinf_comma_inside_attribute() {
        let extinf = parse_extinf(r#"#EXTINF:-1 group-title="Movies, Action",Die Hard"#);
        assert_eq!(extinf.attr("group-title"), Some("Movies, Action"));
        assert_eq!(extinf.title, "Die Hard");
    }

    #[test]
    fn test_attribute_keys_case_insensitive() {
        let channels = parse("#EXTINF:-1 TVG-NAME=\"Upper\" Group-Title=\"News\",x\nhttp://a/1\n");
        assert_eq!(channels[0].name, "Upper");
        assert_eq!(channels[0].group, "News");
    }

    #[test]
    fn test_scenario_document() {
        let doc = "#EXTM3U\n#EXTINF:-1 tvg-name=\"Ch1\" group-title=\"News\",Ch1\nhttp://x/1\n#EXTINF:-1,Ch2\nhttp://x/1\n";
        let channels = parse(doc);

        assert_eq!(channels.len(), 2);
        assert_eq!(
            channels[0],
            Channel {
                name: "Ch1".to_string(),
                group: "News".to_string(),
                logo: None,
                url: "http://x/1".to_string(),
            }
        );
        assert_eq!(channels[1].name, "Ch2");
        assert_eq!(channels[1].group, DEFAULT_GROUP);
    }

    #[test]
    fn test_crlf_and_blank_lines() {
        let doc = "#EXTM3U\r\n\r\n#EXTINF:-1,Canal\r\n\r\nhttp://x/1\r\n";
        let channels = parse(doc);
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].name, "Canal");
        assert_eq!(channels[0].url, "http://x/1");
    }

    #[test]
    fn test_double_directive_discards_first() {
        let doc = "#EXTINF:-1,First\n#EXTINF:-1,Second\nhttp://x/2\n";
        let report = parse_with_report(doc);

        assert_eq!(report.channels.len(), 1);
        assert_eq!(report.channels[0].name, "Second");
        assert_eq!(report.discarded_directives, 1);
    }

    #[test]
    fn test_trailing_directive_never_emitted() {
        let report = parse_with_report("#EXTINF:-1,Ch\nhttp://x/1\n#EXTINF:-1,Dangling\n");
        assert_eq!(report.channels.len(), 1);
        assert_eq!(report.discarded_directives, 1);
    }

    #[test]
    fn test_orphan_resource_line() {
        let report = parse_with_report("#EXTM3U\nhttp://x/orphan\n");
        assert_eq!(report.orphan_resources, 1);
        assert_eq!(report.channels[0].name, "http://x/orphan");
        assert_eq!(report.channels[0].group, DEFAULT_GROUP);
        assert_eq!(report.channels[0].logo, None);
    }

    #[test]
    fn test_comment_lines_keep_pending_entry() {
        let doc = "#EXTINF:-1,Canal\n#EXTVLCOPT:http-user-agent=VLC\nrtmp://ignored\nhttp://x/1\n";
        let channels = parse(doc);
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].name, "Canal");
        assert_eq!(channels[0].url, "http://x/1");
    }

    #[test]
    fn test_name_fallbacks() {
        let doc = "#EXTINF:-1 tvg-name=\"\",  Trailing   Name \nhttp://x/1\n#EXTINF:-1 group-title=\"G\"\nhttp://x/2\n";
        let channels = parse(doc);
        assert_eq!(channels[0].name, "Trailing Name");
        assert_eq!(channels[1].name, NAME_PLACEHOLDER);
        assert_eq!(channels[1].group, "G");
    }

    #[test]
    fn test_empty_logo_is_absent() {
        let doc = "#EXTINF:-1 tvg-logo=\"\",A\nhttp://x/1\n#EXTINF:-1 tvg-logo=\"http://l/b.png\",B\nhttp://x/2\n";
        let channels = parse(doc);
        assert_eq!(channels[0].logo, None);
        assert_eq!(channels[1].logo.as_deref(), Some("http://l/b.png"));
    }

    #[test]
    fn test_every_channel_has_url() {
        let doc = "#EXTM3U\n#EXTINF:-1,A\n\n#EXTINF:-1,B\nhttps://x/b\nhttp://x/c\n#EXTINF:-1,D\n";
        for channel in parse(doc) {
            assert!(!channel.url.is_empty());
        }
    }

    #[test]
    fn test_validate_document() {
        assert!(validate_document("#EXTM3U\n").is_ok());
        assert!(validate_document("junk\n#EXTINF:-1,A\nhttp://x\n").is_ok());
        assert_eq!(
            validate_document("<html>not a playlist</html>"),
            Err(PipelineError::MalformedDocument)
        );
    }

    #[test]
    fn test_sort_channels_bytewise() {
        let mut channels = parse(
            "#EXTINF:-1 group-title=\"b\",z\nhttp://1\n#EXTINF:-1 group-title=\"B\",y\nhttp://2\n#EXTINF:-1 group-title=\"b\",a\nhttp://3\n",
        );
        sort_channels(&mut channels);
        let order: Vec<_> = channels.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(order, vec!["http://2", "http://3", "http://1"]);
    }
}
