//! Local object store for manuscript payloads.
//!
//! Payloads live under a directory keyed by submission id:
//! `<root>/<submission-id>/<sanitized-author>_<sanitized-email>.<ext>`.
//! Consumers rebuild paths deterministically from the submission record;
//! nothing is looked up separately.

use regex::Regex;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use uuid::Uuid;

static AUTHOR_CHARS: OnceLock<Regex> = OnceLock::new();

fn author_chars() -> &'static Regex {
    // ASCII alphanumerics and CJK survive; everything else becomes '_'.
    AUTHOR_CHARS.get_or_init(|| Regex::new(r"[^A-Za-z0-9\u{4e00}-\u{9fff}]").unwrap())
}

pub fn ensure_root(root: &Path) -> io::Result<()> {
    fs::create_dir_all(root)
}

pub fn sanitize_author(name: &str) -> String {
    author_chars().replace_all(name, "_").into_owned()
}

pub fn sanitize_email(email: &str) -> String {
    email.replace(['@', '.'], "_")
}

/// Filename derived from the submitting author's name and contact email.
pub fn payload_filename(author_name: &str, email: &str, ext: &str) -> String {
    format!(
        "{}_{}.{}",
        sanitize_author(author_name),
        sanitize_email(email),
        ext
    )
}

/// Extension of the uploaded file, defaulting to docx.
pub fn extension_of(original_name: &str) -> &str {
    Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("docx")
}

/// Store path of a payload, relative to the storage root.
pub fn payload_path(submission_id: Uuid, filename: &str) -> String {
    format!("{submission_id}/{filename}")
}

pub fn write_payload(root: &Path, rel_path: &str, bytes: &[u8]) -> io::Result<()> {
    let full = root.join(rel_path);
    if let Some(parent) = full.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(full, bytes)
}

pub fn read_payload(root: &Path, rel_path: &str) -> io::Result<Vec<u8>> {
    fs::read(root.join(rel_path))
}

/// Two-phase payload replacement for resubmission. Every file is written to
/// a staging path first; `commit` renames them over the live paths only once
/// all writes succeeded, so a failed write never leaves the record half
/// replaced. Dropping an uncommitted stage removes the staged files and
/// leaves the live payloads untouched.
pub struct StagedPayloads<'a> {
    root: &'a Path,
    staged: Vec<(PathBuf, PathBuf)>,
}

impl<'a> StagedPayloads<'a> {
    pub fn new(root: &'a Path) -> Self {
        Self {
            root,
            staged: Vec::new(),
        }
    }

    pub fn stage(&mut self, rel_path: &str, bytes: &[u8]) -> io::Result<()> {
        let live = self.root.join(rel_path);
        if let Some(parent) = live.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut staged_name = live.clone().into_os_string();
        staged_name.push(".staged");
        let staged = PathBuf::from(staged_name);
        fs::write(&staged, bytes)?;
        self.staged.push((staged, live));
        Ok(())
    }

    pub fn commit(mut self) -> io::Result<()> {
        for (staged, live) in std::mem::take(&mut self.staged) {
            fs::rename(staged, live)?;
        }
        Ok(())
    }
}

impl Drop for StagedPayloads<'_> {
    fn drop(&mut self) {
        for (staged, _) in &self.staged {
            let _ = fs::remove_file(staged);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn author_sanitization_keeps_cjk() {
        assert_eq!(sanitize_author("Dr. Shit"), "Dr__Shit");
        assert_eq!(sanitize_author("构石"), "构石");
        assert_eq!(sanitize_author("S. Flush (PhD)"), "S__Flush__PhD_");
    }

    #[test]
    fn email_sanitization_flattens_separators() {
        assert_eq!(sanitize_email("dr.shit@example.org"), "dr_shit_example_org");
    }

    #[test]
    fn payload_naming_is_deterministic() {
        let id = Uuid::parse_str("2a1f9df2-3c3e-4a41-9f20-0d7a1f4f9c11").unwrap();
        let filename = payload_filename("Dr. Shit", "dr@shit.org", "docx");
        assert_eq!(filename, "Dr__Shit_dr_shit_org.docx");
        assert_eq!(
            payload_path(id, &filename),
            "2a1f9df2-3c3e-4a41-9f20-0d7a1f4f9c11/Dr__Shit_dr_shit_org.docx"
        );
    }

    #[test]
    fn extension_defaults_to_docx() {
        assert_eq!(extension_of("paper.pdf"), "pdf");
        assert_eq!(extension_of("paper.v2.docx"), "docx");
        assert_eq!(extension_of("paper"), "docx");
    }

    #[test]
    fn staged_commit_replaces_both_payloads() {
        let dir = tempfile::tempdir().unwrap();
        let id = Uuid::new_v4();
        let word = payload_path(id, "a.docx");
        let pdf = payload_path(id, "a.pdf");
        write_payload(dir.path(), &word, b"old word").unwrap();
        write_payload(dir.path(), &pdf, b"old pdf").unwrap();

        let mut staged = StagedPayloads::new(dir.path());
        staged.stage(&word, b"new word").unwrap();
        staged.stage(&pdf, b"new pdf").unwrap();
        staged.commit().unwrap();

        assert_eq!(read_payload(dir.path(), &word).unwrap(), b"new word");
        assert_eq!(read_payload(dir.path(), &pdf).unwrap(), b"new pdf");
    }

    #[test]
    fn dropping_an_uncommitted_stage_leaves_live_files_alone() {
        let dir = tempfile::tempdir().unwrap();
        let id = Uuid::new_v4();
        let word = payload_path(id, "a.docx");
        write_payload(dir.path(), &word, b"old word").unwrap();

        {
            let mut staged = StagedPayloads::new(dir.path());
            staged.stage(&word, b"new word").unwrap();
            // Simulates the second write failing: the stage is dropped
            // before commit.
        }

        assert_eq!(read_payload(dir.path(), &word).unwrap(), b"old word");
        let leftovers: Vec<_> = fs::read_dir(dir.path().join(id.to_string()))
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".staged"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
