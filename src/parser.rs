//! Parses one line of an FTP `LIST` response into an [`Entry`].
//!
//! Two dialects are supported: Unix long format and Windows/IIS format.
//! The dispatch and field layout mirror a curlftpfs-style listing parser
//! line for line; only the implementation language changed.

use chrono::{Datelike, Local, NaiveDate, TimeZone};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub kind: EntryKind,
    pub size: u64,
    pub mtime: i64,
    pub mode: u32,
}

/// Parses one `LIST` line, dispatching on the first non-whitespace byte.
/// Returns `None` for anything that does not match either dialect; a
/// reject never fails the enclosing `list_dir` call.
pub fn parse_line(line: &str) -> Option<Entry> {
    let trimmed = line.trim_start();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.as_bytes()[0] {
        b'd' | b'-' | b'l' => parse_unix(trimmed),
        b'0'..=b'9' => parse_windows(trimmed),
        _ => None,
    }
}

fn parse_unix(line: &str) -> Option<Entry> {
    if line.len() < 10 {
        return None;
    }
    let (kind, mode) = match line.as_bytes()[0] {
        b'd' => (EntryKind::Directory, 0o040755u32),
        b'-' => (EntryKind::File, 0o100644u32),
        b'l' => (EntryKind::Symlink, 0o120777u32),
        _ => return None,
    };

    // perms, link-count, owner, group: four whitespace-delimited tokens
    // skipped between the type byte and the size field.
    let mut fields = line[1..].split_whitespace();
    let _perms_rest = fields.next()?; // remaining chars of the perm block
    let _links = fields.next()?;
    let _owner = fields.next()?;
    let _group = fields.next()?;
    let size_str = fields.next()?;
    let size: u64 = if kind == EntryKind::Directory { 0 } else { size_str.parse().ok()? };

    let month_str = fields.next()?;
    let month = parse_month(month_str)?;
    let day_str = fields.next()?;
    let day: u32 = day_str.parse().ok()?;
    let time_or_year = fields.next()?;

    let (year, hour, minute) = if time_or_year.contains(':') {
        let mut parts = time_or_year.splitn(2, ':');
        let hour: u32 = parts.next()?.parse().ok()?;
        let minute: u32 = parts.next()?.parse().ok()?;
        (Local::now().year(), hour, minute)
    } else {
        let year: i32 = time_or_year.parse().ok()?;
        (year, 0, 0)
    };

    // The rest of the line (after the date token) is the name; it may
    // contain embedded spaces, so re-find it by byte offset rather than
    // continuing the whitespace split.
    let rest = remainder_after_nth_field(line, 8)?;
    let name_field = rest.trim_start();
    if name_field.is_empty() {
        return None;
    }
    let name = match name_field.find(" -> ") {
        Some(idx) => &name_field[..idx],
        None => name_field,
    };

    let mtime = NaiveDate::from_ymd_opt(year, month, day)?
        .and_hms_opt(hour, minute, 0)?;
    let mtime = Local.from_local_datetime(&mtime).single()?.timestamp();

    Some(Entry {
        name: name.to_string(),
        kind,
        size,
        mtime,
        mode,
    })
}

/// Returns the substring of `line` after skipping `n` whitespace-delimited
/// fields (the type+perm byte counts as occupying the first field), so the
/// name can be recovered with embedded whitespace intact.
fn remainder_after_nth_field(line: &str, n: usize) -> Option<&str> {
    let mut rest = line;
    for _ in 0..n {
        let trimmed = rest.trim_start();
        let end = trimmed.find(char::is_whitespace).unwrap_or(trimmed.len());
        if end == 0 {
            return None;
        }
        rest = &trimmed[end..];
    }
    Some(rest)
}

fn parse_month(s: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];
    if s.len() < 3 {
        return None;
    }
    let lower = s[..3].to_ascii_lowercase();
    MONTHS
        .iter()
        .position(|m| *m == lower)
        .map(|idx| idx as u32 + 1)
}

fn parse_windows(line: &str) -> Option<Entry> {
    if line.len() < 20 {
        return None;
    }
    let bytes = line.as_bytes();
    let two_digits = |s: &[u8]| -> Option<u32> {
        if s.len() != 2 || !s.iter().all(u8::is_ascii_digit) {
            return None;
        }
        std::str::from_utf8(s).ok()?.parse().ok()
    };

    if bytes.len() < 8 || bytes[2] != b'-' || bytes[5] != b'-' {
        return None;
    }
    let month = two_digits(&bytes[0..2])?;
    let day = two_digits(&bytes[3..5])?;
    let mut year: i32 = line[6..8].parse().ok()?;
    if year < 50 {
        year += 2000;
    } else if year < 100 {
        year += 1900;
    }

    let rest = line[8..].trim_start();
    let mut tokens = rest.splitn(2, char::is_whitespace);
    let time_tok = tokens.next()?;
    let after_time = tokens.next().unwrap_or("").trim_start();

    let (hour, minute) = parse_windows_time(time_tok)?;

    let (kind, size, name_field) = if after_time.len() >= 5
        && after_time[..5].eq_ignore_ascii_case("<DIR>")
    {
        (EntryKind::Directory, 0u64, after_time[5..].trim_start())
    } else {
        let mut it = after_time.splitn(2, char::is_whitespace);
        let size_tok = it.next()?;
        let size: u64 = size_tok.parse().ok()?;
        (EntryKind::File, size, it.next().unwrap_or("").trim_start())
    };

    let name = name_field.trim_end();
    if name.is_empty() {
        return None;
    }

    let mode = match kind {
        EntryKind::Directory => 0o040755,
        _ => 0o100644,
    };

    let mtime = NaiveDate::from_ymd_opt(year, month, day)?
        .and_hms_opt(hour, minute, 0)?;
    let mtime = Local.from_local_datetime(&mtime).single()?.timestamp();

    Some(Entry {
        name: name.to_string(),
        kind,
        size,
        mtime,
        mode,
    })
}

/// Parses an `HH:MM{AM|PM}` token, case-insensitive on the suffix.
fn parse_windows_time(tok: &str) -> Option<(u32, u32)> {
    let (digits, suffix) = if tok.len() >= 2 {
        tok.split_at(tok.len() - 2)
    } else {
        return None;
    };
    let mut parts = digits.splitn(2, ':');
    let mut hour: u32 = parts.next()?.parse().ok()?;
    let minute: u32 = parts.next()?.parse().ok()?;

    if suffix.eq_ignore_ascii_case("PM") {
        if hour != 12 {
            hour += 12;
        }
    } else if suffix.eq_ignore_ascii_case("AM") {
        if hour == 12 {
            hour = 0;
        }
    }
    Some((hour, minute))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_unix() {
        let e = parse_line("drwxr-xr-x 2 u g 4096 Jan  1 12:00 docs").unwrap();
        assert_eq!(e.kind, EntryKind::Directory);
        assert_eq!(e.name, "docs");
    }

    #[test]
    fn dispatch_windows() {
        let e = parse_line("01-01-24  12:00PM              <DIR>          mydir").unwrap();
        assert_eq!(e.kind, EntryKind::Directory);
        assert_eq!(e.name, "mydir");
    }

    #[test]
    fn dispatch_rejects_unknown_lead_byte() {
        assert!(parse_line("total 4").is_none());
        assert!(parse_line("").is_none());
        assert!(parse_line("   ").is_none());
    }

    #[test]
    fn symlink_name_stripped() {
        let e = parse_line("lrwxrwxrwx 1 u g 7 Jan 1 12:00 foo -> bar/baz").unwrap();
        assert_eq!(e.kind, EntryKind::Symlink);
        assert_eq!(e.name, "foo");
    }

    #[test]
    fn unix_year_shape_no_time() {
        let e = parse_line("-rw-r--r-- 1 u g   42 Feb 15  2023 README").unwrap();
        assert_eq!(e.kind, EntryKind::File);
        assert_eq!(e.size, 42);
        assert_eq!(e.name, "README");
        let dt = chrono::DateTime::from_timestamp(e.mtime, 0).unwrap();
        assert_eq!(dt.to_utc().date_naive().year(), 2023);
    }

    #[test]
    fn s6_fixture_both_entries() {
        let block = "drwxr-xr-x 2 u g 4096 Jan  1 12:00 docs\n-rw-r--r-- 1 u g   42 Feb 15  2023 README";
        let entries: Vec<Entry> = block.lines().filter_map(parse_line).collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "docs");
        assert_eq!(entries[0].kind, EntryKind::Directory);
        assert_eq!(entries[0].size, 0);
        assert_eq!(entries[1].name, "README");
        assert_eq!(entries[1].kind, EntryKind::File);
        assert_eq!(entries[1].size, 42);
    }

    #[test]
    fn windows_two_digit_year_pivot() {
        let e = parse_line("01-01-49  12:00AM              <DIR>          a").unwrap();
        let dt = chrono::DateTime::from_timestamp(e.mtime, 0).unwrap();
        assert_eq!(dt.to_utc().date_naive().year(), 2049);

        let e = parse_line("01-01-50  12:00AM              <DIR>          b").unwrap();
        let dt = chrono::DateTime::from_timestamp(e.mtime, 0).unwrap();
        assert_eq!(dt.to_utc().date_naive().year(), 1950);
    }

    #[test]
    fn windows_file_size_parsed() {
        let e = parse_line("03-15-24  02:30PM              1234         file.txt").unwrap();
        assert_eq!(e.kind, EntryKind::File);
        assert_eq!(e.size, 1234);
        assert_eq!(e.name, "file.txt");
    }
}
