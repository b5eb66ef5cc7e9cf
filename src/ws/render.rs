//! Console rendering of received frames.
//!
//! A rendered line looks like
//! `2024-05-01 12:00:00.123456789 +0000 UTC [127.0.0.1:50412] hello`.

use super::message::FrameKind;
use colored::Colorize;
use std::fmt::Write as _;
use std::net::SocketAddr;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::OffsetDateTime;

const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:9] +0000 UTC"
);

/// Render a frame payload, or `None` for kinds that are not displayed.
pub fn render_payload(kind: FrameKind, payload: &[u8]) -> Option<String> {
    match kind {
        FrameKind::Text => Some(String::from_utf8_lossy(payload).into_owned()),
        FrameKind::Binary => Some(format_hex(payload)),
        FrameKind::Other(_) => None,
    }
}

/// Lowercase hex, one space after every byte (including the last).
pub fn format_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for b in bytes {
        let _ = write!(out, "{:02x} ", b);
    }
    out
}

/// Format an instant as a UTC timestamp with nanosecond precision.
pub fn format_timestamp(at: OffsetDateTime) -> String {
    let utc = at.to_offset(time::UtcOffset::UTC);
    utc.format(TIMESTAMP_FORMAT)
        .unwrap_or_else(|_| utc.unix_timestamp().to_string())
}

/// Build the full console line, newline included.
pub fn format_line(at: OffsetDateTime, local_addr: SocketAddr, payload: &str) -> String {
    format!("{} [{}] {}\n", format_timestamp(at), local_addr, payload)
}

/// Highlight a rendered line in green when `color` is set.
pub fn highlight(line: &str, color: bool) -> String {
    if !color {
        return line.to_string();
    }
    match line.strip_suffix('\n') {
        Some(body) => format!("{}\n", body.green()),
        None => line.green().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_hex_trailing_space() {
        assert_eq!(format_hex(&[0xab, 0xcd]), "ab cd ");
        assert_eq!(format_hex(&[0x00, 0x0f, 0xff]), "00 0f ff ");
        assert_eq!(format_hex(&[]), "");
    }

    #[test]
    fn test_hex_length_and_digits() {
        let bytes: Vec<u8> = (0..=255).collect();
        let rendered = format_hex(&bytes);
        assert_eq!(rendered.len(), bytes.len() * 3);

        for (chunk, byte) in rendered.as_bytes().chunks(3).zip(&bytes) {
            let pair = std::str::from_utf8(&chunk[..2]).unwrap();
            assert_eq!(u8::from_str_radix(pair, 16).unwrap(), *byte);
            assert_eq!(pair, pair.to_lowercase());
            assert_eq!(chunk[2], b' ');
        }
    }

    #[test]
    fn test_text_identity() {
        let text = "ping \"quoted\" \t tab \u{1F600}";
        assert_eq!(
            render_payload(FrameKind::Text, text.as_bytes()).as_deref(),
            Some(text)
        );
    }

    #[test]
    fn test_other_kind_not_rendered() {
        assert_eq!(render_payload(FrameKind::Other("ping"), b"x"), None);
    }

    #[test]
    fn test_line_format() {
        let at = datetime!(2024-05-01 12:30:45.000000123 UTC);
        let addr: SocketAddr = "127.0.0.1:50412".parse().unwrap();
        assert_eq!(
            format_line(at, addr, "hello"),
            "2024-05-01 12:30:45.000000123 +0000 UTC [127.0.0.1:50412] hello\n"
        );
    }

    #[test]
    fn test_timestamp_converted_to_utc() {
        let at = datetime!(2024-05-01 14:00:00 +02:00);
        assert_eq!(
            format_timestamp(at),
            "2024-05-01 12:00:00.000000000 +0000 UTC"
        );
    }

    #[test]
    fn test_highlight_plain_when_disabled() {
        assert_eq!(highlight("line\n", false), "line\n");
    }

    #[test]
    fn test_highlight_keeps_text() {
        let out = highlight("line\n", true);
        assert!(out.contains("line"));
        assert!(out.ends_with('\n'));
    }
}
