use chrono::{DateTime, SecondsFormat, Utc};

/// Prefixes a console line with its capture time.
pub fn stamp_line(line: &str, at: DateTime<Utc>) -> String {
    format!("[{}] {}", at.to_rfc3339_opts(SecondsFormat::Secs, true), line)
}

/// Converts `\r\n` and lone `\r` to `\n`, then yields the non-empty lines.
pub fn split_lines(chunk: &str) -> impl Iterator<Item = &str> {
    chunk
        .split(['\n', '\r'])
        .filter(|line| !line.is_empty())
}

/// The last `n` non-empty lines of `text`, oldest first.
pub fn tail_lines(text: &str, n: usize) -> Vec<String> {
    let lines: Vec<&str> = split_lines(text).collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].iter().map(|l| l.to_string()).collect()
}

/// Quotes `arg` for a POSIX shell; plain words are returned unchanged.
pub fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./=:+,@%".contains(c));

    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}
