//! Post-processing of assistant replies.
//!
//! The prompt contract asks the model for `**Header**`-marked sections;
//! this module splits a reply on those markers and classifies the known
//! headings for display. Output that does not match the grammar is kept
//! whole as a single unstructured section; content is never dropped.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Problem,
    Analysis,
    Solution,
    Safety,
    General,
}

impl SectionKind {
    /// Map a heading to its section kind by keyword, mirroring the display
    /// classification the prompt contract implies. Unrecognized headings
    /// fall back to `General`.
    pub fn classify(heading: &str) -> Self {
        let lower = heading.to_lowercase();
        if lower.contains("problem") {
            SectionKind::Problem
        } else if lower.contains("solution") || lower.contains("recommendation") {
            SectionKind::Solution
        } else if lower.contains("safety") || lower.contains("best practice") {
            SectionKind::Safety
        } else if lower.contains("analysis") {
            SectionKind::Analysis
        } else {
            SectionKind::General
        }
    }

    /// Display marker shown next to the heading.
    pub fn marker(self) -> &'static str {
        match self {
            SectionKind::Problem => "⚠️",
            SectionKind::Analysis => "🔎",
            SectionKind::Solution => "✅",
            SectionKind::Safety => "⚠️",
            SectionKind::General => "ℹ️",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub kind: SectionKind,
    pub heading: Option<String>,
    pub body: String,
}

/// Split a reply into sections on `**...**` marker pairs.
///
/// A marker pair counts as a heading only when the enclosed text is
/// non-empty and stays on one line; anything else is kept as literal body
/// text. Text before the first heading becomes a heading-less `General`
/// section.
pub fn split_sections(content: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut heading: Option<String> = None;
    let mut body = String::new();
    let mut rest = content;

    loop {
        let Some(start) = rest.find("**") else {
            body.push_str(rest);
            break;
        };
        let after = &rest[start + 2..];
        match after.find("**") {
            Some(end) if is_heading(&after[..end]) => {
                body.push_str(&rest[..start]);
                flush(&mut sections, heading.take(), &mut body);
                heading = Some(after[..end].trim().to_string());
                rest = &after[end + 2..];
            }
            _ => {
                // Literal "**" that opens no heading.
                body.push_str(&rest[..start + 2]);
                rest = after;
            }
        }
    }
    flush(&mut sections, heading.take(), &mut body);

    if sections.is_empty() {
        sections.push(Section {
            kind: SectionKind::General,
            heading: None,
            body: content.to_string(),
        });
    }
    sections
}

/// Whether a reply contains at least one recognized section heading.
pub fn matches_contract(content: &str) -> bool {
    split_sections(content)
        .iter()
        .any(|section| section.heading.is_some() && section.kind != SectionKind::General)
}

/// Remove `**` emphasis delimiters for plain-text contexts.
pub fn strip_emphasis(content: &str) -> String {
    content.replace("**", "")
}

fn is_heading(candidate: &str) -> bool {
    !candidate.trim().is_empty() && !candidate.contains('\n')
}

fn flush(sections: &mut Vec<Section>, heading: Option<String>, body: &mut String) {
    let trimmed = body.trim();
    if heading.is_none() && trimmed.is_empty() {
        body.clear();
        return;
    }
    let kind = heading
        .as_deref()
        .map(SectionKind::classify)
        .unwrap_or(SectionKind::General);
    sections.push(Section {
        kind,
        heading,
        body: trimmed.to_string(),
    });
    body.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    const STRUCTURED_REPLY: &str = "**Problem Statement**
Kiln shell temperature is trending up near the burning zone.
**Analysis**
Likely refractory wear; check shell scanner history.
**Solution / Recommendation**
Schedule a controlled shutdown and replace bricks in zone 4.
**Best Practices / Safety Notes**
Never inspect the shell without lockout/tagout in place.";

    #[test]
    fn structured_reply_splits_into_classified_sections() {
        let sections = split_sections(STRUCTURED_REPLY);
        let kinds: Vec<SectionKind> = sections.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SectionKind::Problem,
                SectionKind::Analysis,
                SectionKind::Solution,
                SectionKind::Safety,
            ]
        );
        assert_eq!(sections[0].heading.as_deref(), Some("Problem Statement"));
        assert!(sections[2].body.contains("controlled shutdown"));
    }

    #[test]
    fn preamble_before_first_heading_is_kept() {
        let reply = "Quick note first.\n**Analysis**\nDetails here.";
        let sections = split_sections(reply);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].heading, None);
        assert_eq!(sections[0].kind, SectionKind::General);
        assert_eq!(sections[0].body, "Quick note first.");
    }

    #[test]
    fn unknown_headings_classify_as_general() {
        let sections = split_sections("**Cost Impact**\nAbout 2 USD/t clinker.");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].heading.as_deref(), Some("Cost Impact"));
        assert_eq!(sections[0].kind, SectionKind::General);
    }

    #[test]
    fn unstructured_reply_is_returned_whole() {
        let reply = "Just keep the kiln feed steady and watch the O2 level.";
        let sections = split_sections(reply);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].heading, None);
        assert_eq!(sections[0].body, reply);
        assert!(!matches_contract(reply));
    }

    #[test]
    fn marker_pairs_spanning_lines_are_not_headings() {
        let reply = "a **broken\nmarker** b";
        let sections = split_sections(reply);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].heading, None);
        assert_eq!(sections[0].body, reply);
    }

    #[test]
    fn contract_validator_recognizes_known_headings() {
        assert!(matches_contract(STRUCTURED_REPLY));
        assert!(matches_contract("**Analysis**\nshort"));
        assert!(!matches_contract("**Cost Impact**\nunknown heading only"));
    }

    #[test]
    fn strip_emphasis_removes_delimiters() {
        assert_eq!(
            strip_emphasis("check the **raw mill** feed"),
            "check the raw mill feed"
        );
    }

    #[test]
    fn empty_reply_still_yields_one_section() {
        let sections = split_sections("");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].body, "");
    }
}
