//! Report text helpers.
//!
//! The report is a flat UTF-8 blob split by `=== Title ===` lines. It is
//! meant for transmission and logging, but host-side tooling does split it
//! back into sections, so the parser lives next to the header helper.

/// `=== title ===\n`
pub fn section_header(title: &str) -> String {
    format!("=== {} ===\n", title)
}

/// A parsed report section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub title: String,
    pub body: String,
}

fn header_title(line: &str) -> Option<&str> {
    let line = line.trim();
    if line.len() >= 6 && line.starts_with("===") && line.ends_with("===") {
        Some(line[3..line.len() - 3].trim())
    } else {
        None
    }
}

/// Split a report into sections.
///
/// Text before the first header is ignored. Sections with an empty title or
/// a blank body are dropped.
pub fn parse_sections(report: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current: Option<(String, Vec<&str>)> = None;

    for line in report.lines() {
        if let Some(title) = header_title(line) {
            if let Some((title, body)) = current.take() {
                push_section(&mut sections, title, &body);
            }
            current = Some((title.to_string(), Vec::new()));
        } else if let Some((_, body)) = current.as_mut() {
            body.push(line);
        }
    }
    if let Some((title, body)) = current {
        push_section(&mut sections, title, &body);
    }
    sections
}

fn push_section(sections: &mut Vec<Section>, title: String, body: &[&str]) {
    let body = body.join("\n");
    if title.is_empty() || body.trim().is_empty() {
        return;
    }
    sections.push(Section { title, body });
}

/// Find a section by exact title.
pub fn find_section<'a>(sections: &'a [Section], title: &str) -> Option<&'a Section> {
    sections.iter().find(|s| s.title == title)
}
