//! Shared input/output primitives: little-endian binary cursors, the line
//! cursor used by the text codecs, and Windows-1252 transcoding.
//!
//! All cursors are IO-free and operate on in-memory buffers; the per-format
//! `read_file`/`write_file` helpers do a single `fs::read`/`fs::write`.

use crate::Error;
use byteorder::{ByteOrder, LittleEndian};
use std::fmt::Display;
use std::fmt::Write as _;
use std::str::FromStr;

pub(crate) struct BinaryInput<'a> {
    bytes: &'a [u8],
    cursor: usize,
}

impl<'a> BinaryInput<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, cursor: 0 }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.bytes.len() - self.cursor
    }

    fn take(&mut self, len: usize, expected: &'static str) -> Result<&'a [u8], Error> {
        if self.remaining() < len {
            return Err(Error::Truncated { expected });
        }
        let slice = &self.bytes[self.cursor..self.cursor + len];
        self.cursor += len;
        Ok(slice)
    }

    pub(crate) fn skip(&mut self, len: usize, expected: &'static str) -> Result<(), Error> {
        self.take(len, expected).map(|_| ())
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, Error> {
        Ok(self.take(1, "byte")?[0])
    }

    pub(crate) fn read_i8(&mut self) -> Result<i8, Error> {
        Ok(self.read_u8()? as i8)
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16, Error> {
        Ok(LittleEndian::read_u16(self.take(2, "u16")?))
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32, Error> {
        Ok(LittleEndian::read_u32(self.take(4, "u32")?))
    }

    pub(crate) fn read_i32(&mut self) -> Result<i32, Error> {
        Ok(LittleEndian::read_i32(self.take(4, "i32")?))
    }

    pub(crate) fn read_f32(&mut self) -> Result<f32, Error> {
        Ok(LittleEndian::read_f32(self.take(4, "f32")?))
    }

    /// Reads a length-prefixed string: one length byte, then that many
    /// Windows-1252 bytes.
    pub(crate) fn read_string(&mut self) -> Result<String, Error> {
        let length = self.read_u8()? as usize;
        Ok(decode_windows_1252(self.take(length, "string")?))
    }
}

pub(crate) struct BinaryOutput {
    bytes: Vec<u8>,
}

impl BinaryOutput {
    pub(crate) fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub(crate) fn write_u8(&mut self, value: u8) {
        self.bytes.push(value);
    }

    pub(crate) fn write_u16(&mut self, value: u16) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    pub(crate) fn write_u32(&mut self, value: u32) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    pub(crate) fn write_i32(&mut self, value: i32) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    pub(crate) fn write_f32(&mut self, value: f32) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    /// Writes a length-prefixed Windows-1252 string. The length prefix is a
    /// single byte, so strings over 255 encoded bytes are rejected.
    pub(crate) fn write_string(&mut self, text: &str) -> Result<(), Error> {
        let encoded = encode_windows_1252(text)?;
        if encoded.len() > u8::MAX as usize {
            return Err(Error::StringTooLong {
                length: encoded.len(),
            });
        }
        self.write_u8(encoded.len() as u8);
        self.bytes.extend_from_slice(&encoded);
        Ok(())
    }
}

/// Decodes Windows-1252 bytes. Total: every byte maps to a code point.
/// BOM sniffing is disabled so the mapping stays byte-exact.
pub(crate) fn decode_windows_1252(bytes: &[u8]) -> String {
    let (text, _) = encoding_rs::WINDOWS_1252.decode_without_bom_handling(bytes);
    text.into_owned()
}

pub(crate) fn encode_windows_1252(text: &str) -> Result<Vec<u8>, Error> {
    let (encoded, _, had_errors) = encoding_rs::WINDOWS_1252.encode(text);
    if had_errors {
        return Err(Error::Unencodable {
            text: text.to_string(),
        });
    }
    Ok(encoded.into_owned())
}

/// Sequential line cursor over a text payload. Lines are trimmed of
/// surrounding whitespace; line numbers are 1-based for error reporting.
pub(crate) struct TextInput<'a> {
    lines: std::str::Lines<'a>,
    line_number: usize,
}

impl<'a> TextInput<'a> {
    pub(crate) fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines(),
            line_number: 0,
        }
    }

    pub(crate) fn line_number(&self) -> usize {
        self.line_number
    }

    pub(crate) fn has_more(&self) -> bool {
        self.lines.clone().next().is_some()
    }

    pub(crate) fn next_line(&mut self) -> Result<&'a str, Error> {
        let line = self
            .lines
            .next()
            .ok_or(Error::Truncated { expected: "line" })?;
        self.line_number += 1;
        Ok(line.trim())
    }

    fn parse_next<T: FromStr>(&mut self, what: &'static str) -> Result<T, Error> {
        let line = self.next_line()?;
        line.parse().map_err(|_| Error::Format {
            line: self.line_number,
            message: format!("expected {what}, found {line:?}"),
        })
    }

    pub(crate) fn parse_u32(&mut self) -> Result<u32, Error> {
        self.parse_next("an unsigned integer")
    }

    pub(crate) fn parse_i32(&mut self) -> Result<i32, Error> {
        self.parse_next("an integer")
    }

    pub(crate) fn parse_f32(&mut self) -> Result<f32, Error> {
        self.parse_next("a number")
    }
}

pub(crate) fn parse_field<T: FromStr>(field: &str, line: usize) -> Result<T, Error> {
    field.parse().map_err(|_| Error::Format {
        line,
        message: format!("invalid numeric field {field:?}"),
    })
}

pub(crate) struct TextOutput {
    text: String,
}

impl TextOutput {
    pub(crate) fn new() -> Self {
        Self {
            text: String::new(),
        }
    }

    pub(crate) fn into_text(self) -> String {
        self.text
    }

    pub(crate) fn line(&mut self, line: &str) {
        self.text.push_str(line);
        self.text.push('\n');
    }

    pub(crate) fn value(&mut self, value: impl Display) {
        let _ = writeln!(self.text, "{value}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pascal_string_round_trips_windows_1252_high_bytes() {
        // é and ™ both live above the ASCII range in Windows-1252.
        let name = "b\u{e9}b\u{e9}\u{2122}";
        let mut output = BinaryOutput::new();
        output.write_string(name).unwrap();
        let bytes = output.into_bytes();
        assert_eq!(bytes[0] as usize, bytes.len() - 1);

        let mut input = BinaryInput::new(&bytes);
        assert_eq!(input.read_string().unwrap(), name);
        assert_eq!(input.remaining(), 0);
    }

    #[test]
    fn pascal_string_accepts_255_bytes_and_rejects_256() {
        let longest = "a".repeat(255);
        let mut output = BinaryOutput::new();
        output.write_string(&longest).unwrap();
        let bytes = output.into_bytes();
        let mut input = BinaryInput::new(&bytes);
        assert_eq!(input.read_string().unwrap(), longest);

        let too_long = "a".repeat(256);
        let mut output = BinaryOutput::new();
        assert!(matches!(
            output.write_string(&too_long),
            Err(Error::StringTooLong { length: 256 })
        ));
    }

    #[test]
    fn pascal_string_rejects_unencodable_text() {
        let mut output = BinaryOutput::new();
        assert!(matches!(
            output.write_string("\u{4e16}\u{754c}"),
            Err(Error::Unencodable { .. })
        ));
    }

    #[test]
    fn truncated_reads_report_what_was_expected() {
        let mut input = BinaryInput::new(&[0x01, 0x02]);
        assert!(matches!(
            input.read_u32(),
            Err(Error::Truncated { expected: "u32" })
        ));

        let mut input = BinaryInput::new(&[0x05, b'a', b'b']);
        assert!(matches!(
            input.read_string(),
            Err(Error::Truncated { expected: "string" })
        ));
    }

    #[test]
    fn text_input_tracks_line_numbers_in_errors() {
        let mut input = TextInput::new("3\nnot a number\n");
        assert_eq!(input.parse_u32().unwrap(), 3);
        match input.parse_u32() {
            Err(Error::Format { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected a format error, got {other:?}"),
        }
    }

    #[test]
    fn text_input_reports_truncation_at_end_of_input() {
        let mut input = TextInput::new("only line");
        input.next_line().unwrap();
        assert!(matches!(
            input.next_line(),
            Err(Error::Truncated { expected: "line" })
        ));
        assert!(!input.has_more());
    }
}
