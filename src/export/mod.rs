//! Markdown, ZIP, and CSV export of notes and search results.

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{EruditeError, Result};
use crate::types::{Note, PaperMetadata};

/// Archive name used when more than one note is exported.
pub const NOTES_ZIP_NAME: &str = "erudite-notes.zip";
/// File name for exported search results.
pub const SEARCH_CSV_NAME: &str = "erudite-search-results.csv";
/// Shown when there is nothing to export.
pub const NO_NOTES_TO_DOWNLOAD: &str = "There are no notes to download.";

const MAX_SLUG_LEN: usize = 150;

static FRONT_MATTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\A---\s*\n((?s:.+?))\n---\s*").expect("front matter regex must compile")
});

static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)^title:\s*"(.*)""#).expect("title regex must compile"));

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^date:\s*".*?(\d{4}-\d{2}-\d{2})"#).expect("date regex must compile")
});

/// Strip a wrapping code fence (```` ```markdown ```` or ```` ``` ````) that
/// models sometimes put around the whole note.
pub fn clean_markdown(text: &str) -> String {
    let mut cleaned = text.trim();
    if let Some(rest) = cleaned.strip_prefix("```markdown") {
        cleaned = rest.trim_start();
    } else if let Some(rest) = cleaned.strip_prefix("```") {
        cleaned = rest.trim_start();
    }
    if let Some(rest) = cleaned.strip_suffix("```") {
        cleaned = rest.trim_end();
    }
    cleaned.to_string()
}

/// A note split into its optional `---` front-matter block and the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteParts {
    pub front_matter: Option<String>,
    pub body: String,
}

/// Split leading `---` front matter from the body. Both parts are trimmed;
/// without front matter the body is returned untouched.
pub fn split_front_matter(raw: &str) -> NoteParts {
    match FRONT_MATTER_RE.captures(raw) {
        Some(caps) => {
            let whole = caps.get(0).map_or(0, |m| m.end());
            NoteParts {
                front_matter: caps.get(1).map(|m| m.as_str().trim().to_string()),
                body: raw[whole..].trim().to_string(),
            }
        }
        None => NoteParts {
            front_matter: None,
            body: raw.to_string(),
        },
    }
}

/// Lowercase, keep `[a-z0-9]`, collapse whitespace and dashes into one `-`.
pub fn slugify(title: &str) -> String {
    let lowered = title.trim().to_lowercase();
    let kept: String = lowered
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace() || *c == '-')
        .collect();
    let mut slug = String::with_capacity(kept.len());
    let mut in_run = false;
    for c in kept.chars() {
        if c.is_whitespace() || c == '-' {
            if !in_run {
                slug.push('-');
            }
            in_run = true;
        } else {
            slug.push(c);
            in_run = false;
        }
    }
    slug.chars().take(MAX_SLUG_LEN).collect()
}

/// Download file name for a note, derived from its front matter.
pub fn note_file_name(note: &Note) -> String {
    let content = clean_markdown(&note.content);
    let title = TITLE_RE
        .captures(&content)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(|t| !t.is_empty());
    let date = DATE_RE
        .captures(&content)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim());

    let mut name = if note.is_synthesis() {
        "synthesis-review.md".to_string()
    } else {
        format!("erudite-note-{}.md", note.id)
    };

    match (title, date) {
        (Some(title), Some(date)) => {
            let slug = slugify(title);
            if !date.is_empty() && !slug.is_empty() {
                name = format!("{date}-{slug}.md");
            }
        }
        (Some(title), None) => name = format!("synthesis-{}.md", slugify(title)),
        _ => {}
    }
    name
}

/// Result of exporting notes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Export {
    /// A single note as markdown text.
    Markdown { name: String, body: String },
    /// Several notes bundled into one archive.
    Zip { name: String, bytes: Vec<u8> },
}

impl Export {
    pub fn file_name(&self) -> &str {
        match self {
            Self::Markdown { name, .. } | Self::Zip { name, .. } => name,
        }
    }

    /// Write into `dir`, returning the created path.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(self.file_name());
        match self {
            Self::Markdown { body, .. } => std::fs::write(&path, body)?,
            Self::Zip { bytes, .. } => std::fs::write(&path, bytes)?,
        }
        Ok(path)
    }
}

/// Export every note that has content or is still generating.
///
/// One note becomes a markdown file; more become a ZIP archive. Duplicate
/// file names inside the archive get a numeric suffix.
pub fn export_notes(notes: &[Note]) -> Result<Export> {
    let visible: Vec<&Note> = notes
        .iter()
        .filter(|n| !n.content.trim().is_empty() || n.is_generating)
        .collect();

    match visible.as_slice() {
        [] => Err(EruditeError::Workflow(NO_NOTES_TO_DOWNLOAD.into())),
        [note] => Ok(Export::Markdown {
            name: note_file_name(note),
            body: clean_markdown(&note.content),
        }),
        many => Ok(Export::Zip {
            name: NOTES_ZIP_NAME.to_string(),
            bytes: zip_notes(many)?,
        }),
    }
}

fn zip_notes(notes: &[&Note]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut used = HashSet::new();

    for note in notes {
        let name = unique_name(note_file_name(note), &mut used);
        zip.start_file(name, options).map_err(zip_error)?;
        zip.write_all(clean_markdown(&note.content).as_bytes())?;
    }

    let cursor = zip.finish().map_err(zip_error)?;
    Ok(cursor.into_inner())
}

fn unique_name(name: String, used: &mut HashSet<String>) -> String {
    if used.insert(name.clone()) {
        return name;
    }
    let stem = name.strip_suffix(".md").unwrap_or(&name).to_string();
    let mut n = 2;
    loop {
        let candidate = format!("{stem}-{n}.md");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

fn zip_error(err: zip::result::ZipError) -> EruditeError {
    EruditeError::Io(std::io::Error::other(err))
}

fn csv_field(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// CSV of search results: every field quoted, rows joined by `\n`.
pub fn search_results_csv(papers: &[PaperMetadata]) -> String {
    let mut rows = vec!["Title,Authors,Journal,Year,Abstract,URL".to_string()];
    rows.extend(papers.iter().map(|paper| {
        [
            csv_field(&paper.title),
            csv_field(&paper.authors.join("; ")),
            csv_field(&paper.journal),
            csv_field(&paper.year.to_string()),
            csv_field(&paper.abstract_text),
            csv_field(paper.url.as_deref().unwrap_or_default()),
        ]
        .join(",")
    }));
    rows.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SYNTHESIS_REVIEW_KEY;
    use pretty_assertions::assert_eq;

    const NOTE: &str = "```markdown\n---\ntitle: \"Attention Is All You Need!\"\ndate: \"published 2017-06-12\"\n---\n\n# Body\n```";

    #[test]
    fn clean_strips_fences() {
        assert_eq!(clean_markdown("```markdown\n# Hi\n```"), "# Hi");
        assert_eq!(clean_markdown("  ```\n# Hi\n```  "), "# Hi");
        assert_eq!(clean_markdown("# Hi"), "# Hi");
    }

    #[test]
    fn front_matter_split() {
        let parts = split_front_matter(&clean_markdown(NOTE));
        assert_eq!(
            parts.front_matter.as_deref(),
            Some("title: \"Attention Is All You Need!\"\ndate: \"published 2017-06-12\"")
        );
        assert_eq!(parts.body, "# Body");

        let plain = split_front_matter("no front matter\n");
        assert_eq!(plain.front_matter, None);
        assert_eq!(plain.body, "no front matter\n");
    }

    #[test]
    fn slug_rules() {
        assert_eq!(slugify("  Hello, World -- Again! "), "hello-world-again");
        assert_eq!(slugify(&"a".repeat(200)).len(), 150);
    }

    #[test]
    fn file_names() {
        let note = Note::finished("paper", NOTE);
        assert_eq!(note_file_name(&note), "2017-06-12-attention-is-all-you-need.md");

        let untitled = Note::finished("paper", "# nothing");
        assert_eq!(note_file_name(&untitled), format!("erudite-note-{}.md", untitled.id));

        let synthesis = Note::finished(SYNTHESIS_REVIEW_KEY, "# review");
        assert_eq!(note_file_name(&synthesis), "synthesis-review.md");

        let titled = Note::finished(SYNTHESIS_REVIEW_KEY, "---\ntitle: \"Field Review\"\n---\n");
        assert_eq!(note_file_name(&titled), "synthesis-field-review.md");
    }

    #[test]
    fn export_none_is_error() {
        let err = export_notes(&[Note::finished("k", "   ")]).unwrap_err();
        assert_eq!(err.to_string(), NO_NOTES_TO_DOWNLOAD);
    }

    #[test]
    fn export_single_markdown() {
        let export = export_notes(&[Note::finished("k", NOTE), Note::finished("e", "")]).unwrap();
        match export {
            Export::Markdown { name, body } => {
                assert_eq!(name, "2017-06-12-attention-is-all-you-need.md");
                assert!(body.starts_with("---\ntitle:"));
                assert!(body.ends_with("# Body"));
            }
            other => panic!("expected markdown, got {other:?}"),
        }
    }

    #[test]
    fn export_many_is_zip_with_unique_names() {
        let notes = vec![Note::finished("a", NOTE), Note::finished("b", NOTE)];
        let export = export_notes(&notes).unwrap();
        let Export::Zip { name, bytes } = export else {
            panic!("expected zip");
        };
        assert_eq!(name, NOTES_ZIP_NAME);
        let archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
        let mut names: Vec<&str> = archive.file_names().collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "2017-06-12-attention-is-all-you-need-2.md",
                "2017-06-12-attention-is-all-you-need.md"
            ]
        );
    }

    #[test]
    fn csv_escapes_quotes() {
        let papers = vec![PaperMetadata {
            title: "He said \"hi\"".into(),
            authors: vec!["A".into(), "B".into()],
            journal: "J".into(),
            year: 2020,
            abstract_text: "x, y".into(),
            url: None,
        }];
        assert_eq!(
            search_results_csv(&papers),
            "Title,Authors,Journal,Year,Abstract,URL\n\"He said \"\"hi\"\"\",\"A; B\",\"J\",\"2020\",\"x, y\",\"\""
        );
    }
}
