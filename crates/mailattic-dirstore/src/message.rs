//! Message file access.
//!
//! A message is one RFC 822-style file. Only the header block is ever
//! read: the send date comes from the `Date:` header and the subject from
//! `Subject:`, with folded continuation lines ignored. Bodies are never
//! parsed.

use std::borrow::Cow;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write as _};
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime};
use tracing::debug;

pub(crate) struct Headers {
    pub(crate) sent: Option<NaiveDateTime>,
    pub(crate) subject: Option<String>,
}

/// Reads the send date and subject out of a message file's header block.
pub(crate) fn read_headers(path: &Path) -> io::Result<Headers> {
    let reader = BufReader::new(File::open(path)?);
    let mut sent = None;
    let mut subject = None;
    for line in reader.lines() {
        let line = line?;
        if line.is_empty() {
            break;
        }
        if sent.is_none()
            && let Some(value) = header_value(&line, "Date:")
        {
            sent = parse_send_date(value);
            if sent.is_none() {
                debug!(file = %path.display(), "unparsable Date header");
            }
        } else if subject.is_none()
            && let Some(value) = header_value(&line, "Subject:")
        {
            subject = Some(value.trim().to_string());
        }
        if sent.is_some() && subject.is_some() {
            break;
        }
    }
    Ok(Headers { sent, subject })
}

/// Seeds a message file named `<stem>.eml` in `folder`.
///
/// The `Date:` header is written in RFC 2822 form so the file reads back
/// with the same wall-clock send time.
///
/// # Errors
///
/// Returns an error when the file already exists or cannot be written.
pub fn write_message(
    folder: &Path,
    stem: &str,
    subject: &str,
    sent: Option<NaiveDateTime>,
) -> io::Result<PathBuf> {
    let path = folder.join(format!("{stem}.eml"));
    let mut file = File::create_new(&path)?;
    if let Some(sent) = sent {
        writeln!(file, "Date: {}", sent.format("%a, %d %b %Y %H:%M:%S +0000"))?;
    }
    writeln!(file, "Subject: {subject}")?;
    writeln!(file)?;
    writeln!(file, "(body omitted)")?;
    Ok(path)
}

/// Matches `line` against a header name, ASCII case-insensitively.
fn header_value<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let prefix = line.get(..name.len())?;
    if prefix.eq_ignore_ascii_case(name) { Some(&line[name.len()..]) } else { None }
}

fn parse_send_date(raw: &str) -> Option<NaiveDateTime> {
    let normalized = normalize_datetime(raw);
    DateTime::parse_from_rfc2822(&normalized).ok().map(|dt| dt.naive_local())
}

/// Smooths over the common deviations from RFC 2822 seen in real `Date:`
/// headers before handing the value to the parser.
fn normalize_datetime(raw: &str) -> Cow<'_, str> {
    let mut value = raw;
    // Trailing commentary like `(UTC)` is not part of the grammar.
    if value.ends_with(')')
        && let Some(pos) = value.rfind('(')
    {
        value = &value[..pos];
    }
    let value = value.trim();
    // `-0000` cannot be parsed; it denotes the same instant as `+0000`.
    if let Some(stripped) = value.strip_suffix("-0000") {
        Cow::Owned(format!("{stripped}+0000"))
    } else {
        Cow::Borrowed(value)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn normalizes_real_world_date_values() {
        assert_eq!(
            normalize_datetime("Thu, 29 Sep 2016 23:18:26 +0000"),
            "Thu, 29 Sep 2016 23:18:26 +0000"
        );
        assert_eq!(
            normalize_datetime("Tue, 11 Jul 2017 18:30:33 +0000 (UTC)"),
            "Tue, 11 Jul 2017 18:30:33 +0000"
        );
        assert_eq!(
            normalize_datetime("Sat, 01 Oct 2016 14:47:20 -0000"),
            "Sat, 01 Oct 2016 14:47:20 +0000"
        );
    }

    #[test]
    fn written_messages_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let sent = NaiveDate::from_ymd_opt(2023, 9, 29)
            .and_then(|d| d.and_hms_opt(23, 18, 26))
            .unwrap();
        let path = write_message(dir.path(), "0001", "quarterly numbers", Some(sent)).unwrap();

        let headers = read_headers(&path).unwrap();
        assert_eq!(headers.sent, Some(sent));
        assert_eq!(headers.subject.as_deref(), Some("quarterly numbers"));
    }

    #[test]
    fn header_names_match_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("odd.eml");
        std::fs::write(
            &path,
            "DATE: Thu, 29 Sep 2016 23:18:26 +0000\nSUBJECT: shouting\n\nbody\n",
        )
        .unwrap();

        let headers = read_headers(&path).unwrap();
        assert!(headers.sent.is_some());
        assert_eq!(headers.subject.as_deref(), Some("shouting"));
    }

    #[test]
    fn body_lines_are_never_scanned() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tricky.eml");
        std::fs::write(
            &path,
            "Subject: real\n\nSubject: from the body\nDate: Thu, 29 Sep 2016 23:18:26 +0000\n",
        )
        .unwrap();

        let headers = read_headers(&path).unwrap();
        assert_eq!(headers.subject.as_deref(), Some("real"));
        assert_eq!(headers.sent, None);
    }

    #[test]
    fn unparsable_date_is_just_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.eml");
        std::fs::write(&path, "Date: sometime last week\nSubject: vague\n\n").unwrap();

        let headers = read_headers(&path).unwrap();
        assert_eq!(headers.sent, None);
        assert_eq!(headers.subject.as_deref(), Some("vague"));
    }
}
