//! Output file naming.
//!
//! All names are computed up front from the input list, so concurrent items
//! never race for the same file and names never depend on completion order.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use url::Url;

static PRID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)[?&]PRID=(\d+)").unwrap());

static UNSAFE_CHARS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]+").unwrap());

/// Press-release id carried in the URL's `PRID` query parameter.
pub fn prid(url: &str) -> Option<&str> {
    PRID_RE
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Name for a rendered trigger link: `pib_<PRID>.pdf`, else `page_<index>.pdf`.
pub fn page_file_name(url: &str, index: usize) -> String {
    match prid(url) {
        Some(id) => format!("pib_{id}.pdf"),
        None => format!("page_{index}.pdf"),
    }
}

/// Name for the n-th batch report. Titles never influence it.
pub fn report_file_name(index: usize) -> String {
    format!("report_{index}.pdf")
}

/// Name for a discovered link: its last path segment, made filesystem-safe.
pub fn link_file_name(url: &str, index: usize) -> String {
    let segment = Url::parse(url).ok().and_then(|u| {
        u.path_segments()
            .and_then(|mut s| s.next_back().map(str::to_string))
            .filter(|s| !s.is_empty())
    });

    let Some(segment) = segment else {
        return format!("link_{index}.pdf");
    };

    let decoded = percent_decode(&segment);
    let cleaned = UNSAFE_CHARS_RE.replace_all(&decoded, "_");
    let cleaned = cleaned.trim_matches(|c: char| c == '.' || c == '_');
    if cleaned.is_empty() {
        return format!("link_{index}.pdf");
    }
    if cleaned.to_ascii_lowercase().ends_with(".pdf") {
        cleaned.to_string()
    } else {
        format!("{cleaned}.pdf")
    }
}

/// Make every name unique by suffixing later duplicates with `_<index>`.
///
/// `names[i]` belongs to the item with 1-based index `i + 1`.
pub fn dedupe(names: Vec<String>) -> Vec<String> {
    dedupe_against(names, HashSet::new())
}

/// Like [`dedupe`], but names in `taken` (files already on disk) are never
/// handed out either.
pub fn dedupe_against(names: Vec<String>, mut taken: HashSet<String>) -> Vec<String> {
    names
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            if taken.insert(name.clone()) {
                return name;
            }
            let stem = name.strip_suffix(".pdf").unwrap_or(&name).to_string();
            let mut n = i + 1;
            loop {
                let candidate = format!("{stem}_{n}.pdf");
                if taken.insert(candidate.clone()) {
                    break candidate;
                }
                n += 1;
            }
        })
        .collect()
}

fn percent_decode(s: &str) -> String {
    url::form_urlencoded::parse(format!("x={s}").as_bytes())
        .next()
        .map(|(_, v)| v.into_owned())
        .unwrap_or_else(|| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prid_extraction() {
        assert_eq!(
            prid("https://pib.gov.in/PressReleaseIframePage.aspx?PRID=2138823"),
            Some("2138823")
        );
        assert_eq!(prid("https://pib.gov.in/x.aspx?lang=1&PRID=77"), Some("77"));
        assert_eq!(prid("https://pib.gov.in/x.aspx?NOPRID=1"), None);
        assert_eq!(prid("https://example.org/"), None);
    }

    #[test]
    fn page_names() {
        assert_eq!(
            page_file_name("https://pib.gov.in/PressReleasePage.aspx?PRID=5", 1),
            "pib_5.pdf"
        );
        assert_eq!(page_file_name("https://example.org/news", 3), "page_3.pdf");
    }

    #[test]
    fn report_names_ignore_titles() {
        assert_eq!(report_file_name(1), "report_1.pdf");
        assert_eq!(report_file_name(12), "report_12.pdf");
    }

    #[test]
    fn link_names() {
        assert_eq!(
            link_file_name("https://mospi.gov.in/documents/PLFS%20Report.pdf", 1),
            "PLFS_Report.pdf"
        );
        assert_eq!(link_file_name("https://x.org/a/b/annual", 2), "annual.pdf");
        assert_eq!(link_file_name("https://x.org/", 4), "link_4.pdf");
        assert_eq!(link_file_name("https://x.org/../..", 5), "link_5.pdf");
    }

    #[test]
    fn dedupe_suffixes_later_duplicates() {
        let names = dedupe(vec![
            "pib_1.pdf".into(),
            "pib_2.pdf".into(),
            "pib_1.pdf".into(),
        ]);
        assert_eq!(names, vec!["pib_1.pdf", "pib_2.pdf", "pib_1_3.pdf"]);
    }

    #[test]
    fn dedupe_skips_names_already_on_disk() {
        let taken: HashSet<String> = ["report.pdf", "report_1.pdf"]
            .into_iter()
            .map(String::from)
            .collect();
        let names = dedupe_against(vec!["report.pdf".into(), "other.pdf".into()], taken);
        assert_eq!(names, vec!["report_2.pdf", "other.pdf"]);
    }
}
