use std::fmt::Write as _;
use std::io::{self, Write};

use rand::Rng;

use crate::csv::EncodedTable;
use crate::error::{ReportError, ReportResult};

/// Delimiter token shared by the top-level Content-Type header and every part.
#[derive(Clone, Debug, PartialEq)]
pub struct Boundary(String);

impl Boundary {
    pub fn random() -> Boundary {
        let mut bytes = [0u8; 30];
        rand::rng().fill(&mut bytes[..]);

        let mut token = String::with_capacity(bytes.len() * 2);
        for byte in bytes {
            let _ = write!(token, "{byte:02x}");
        }

        Boundary(token)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

struct Header {
    name: &'static str,
    value: String,
}

impl Header {
    fn new(name: &'static str, value: impl Into<String>) -> Header {
        Header {name, value: value.into()}
    }
}

/// Top-level header block of the message.
pub struct MessageHeader<'a> {
    pub from: &'a str,
    pub to: &'a str,
    pub subject: &'a str,
}

impl MessageHeader<'_> {
    fn headers(&self, boundary: &Boundary) -> [Header; 7] {
        [
            Header::new("From", self.from),
            Header::new("To", self.to),
            Header::new("Return-Path", self.from),
            Header::new("Subject", self.subject),
            Header::new("Content-Language", "en-US"),
            Header::new("MIME-Version", "1.0"),
            Header::new("Content-Type", format!(r#"multipart/mixed; boundary="{}""#, boundary.as_str())),
        ]
    }
}

pub struct TextPart<'a> {
    pub body: &'a str,
}

impl TextPart<'_> {
    fn headers(&self) -> [Header; 2] {
        [
            Header::new("Content-Transfer-Encoding", "7bit"),
            Header::new("Content-Type", "text/plain; charset=us-ascii"),
        ]
    }
}

pub struct Attachment<'a> {
    pub filename: &'a str,
    pub table: &'a EncodedTable,
}

impl Attachment<'_> {
    fn headers(&self) -> [Header; 3] {
        [
            Header::new("Content-Disposition", format!("attachment; filename={}", self.filename)),
            Header::new("Content-Type", format!(r#"text/csv; x-unix-mode=0644; name="{}""#, self.filename)),
            Header::new("Content-Transfer-Encoding", "7bit"),
        ]
    }
}

pub struct Message<'a> {
    pub header: MessageHeader<'a>,
    pub text: TextPart<'a>,
    pub attachment: Attachment<'a>,
}

/// Fully rendered message ready to be passed to a raw send interface.
#[derive(Debug)]
pub struct Envelope(Vec<u8>);

impl Envelope {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

pub fn build_envelope(message: &Message) -> ReportResult<Envelope> {
    build_envelope_with(message, &Boundary::random())
}

pub fn build_envelope_with(message: &Message, boundary: &Boundary) -> ReportResult<Envelope> {
    let rendered = render(Vec::new(), message, boundary).map_err(|e| ReportError::MalformedEnvelope(format!(
        "Unable to render the message: {e}")))?;
    strip_preamble(rendered)
}

/// The header block is written as the first part, so the rendered message starts with a delimiter line.
pub fn render<W: Write>(writer: W, message: &Message, boundary: &Boundary) -> io::Result<W> {
    let mut writer = MultipartWriter::new(writer, boundary);

    writer.create_part(&message.header.headers(boundary))?;

    write_7bit(writer.create_part(&message.text.headers())?, message.text.body.as_bytes())?;
    write_7bit(writer.create_part(&message.attachment.headers())?, message.attachment.table.as_bytes())?;

    writer.close()
}

/// Copies a 7bit part body, turning bare LF line endings into CRLF.
fn write_7bit<W: Write>(writer: &mut W, body: &[u8]) -> io::Result<()> {
    if !body.is_ascii() {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "7bit part contains non-ASCII characters"));
    }

    let mut start = 0;

    for (index, &byte) in body.iter().enumerate() {
        if byte == b'\n' && (index == 0 || body[index - 1] != b'\r') {
            writer.write_all(&body[start..index])?;
            writer.write_all(b"\r\n")?;
            start = index + 1;
        }
    }

    writer.write_all(&body[start..])
}

/// Drops the leading delimiter line, so the message starts directly with the header block.
pub fn strip_preamble(mut rendered: Vec<u8>) -> ReportResult<Envelope> {
    if rendered.iter().filter(|&&byte| byte == b'\n').count() < 2 {
        return Err(ReportError::MalformedEnvelope(format!(
            "Got an invalid message content ({} bytes)", rendered.len())));
    }

    let first_line_end = rendered.iter().position(|&byte| byte == b'\n').unwrap_or_default();
    rendered.drain(..=first_line_end);

    Ok(Envelope(rendered))
}

struct MultipartWriter<'a, W: Write> {
    writer: W,
    boundary: &'a Boundary,
    parts: usize,
}

impl<'a, W: Write> MultipartWriter<'a, W> {
    fn new(writer: W, boundary: &'a Boundary) -> MultipartWriter<'a, W> {
        MultipartWriter {writer, boundary, parts: 0}
    }

    fn create_part(&mut self, headers: &[Header]) -> io::Result<&mut W> {
        if self.parts == 0 {
            write!(self.writer, "--{}\r\n", self.boundary.as_str())?;
        } else {
            write!(self.writer, "\r\n--{}\r\n", self.boundary.as_str())?;
        }
        self.parts += 1;

        for header in headers {
            if header.value.contains(['\r', '\n']) {
                return Err(io::Error::new(io::ErrorKind::InvalidInput, format!(
                    "{} header contains a line break", header.name)));
            }
            if !header.value.is_ascii() {
                return Err(io::Error::new(io::ErrorKind::InvalidInput, format!(
                    "{} header contains non-ASCII characters", header.name)));
            }
            write!(self.writer, "{}: {}\r\n", header.name, header.value)?;
        }
        self.writer.write_all(b"\r\n")?;

        Ok(&mut self.writer)
    }

    fn close(mut self) -> io::Result<W> {
        if self.parts > 0 {
            self.writer.write_all(b"\r\n")?;
        }
        write!(self.writer, "--{}--\r\n", self.boundary.as_str())?;
        self.writer.flush()?;
        Ok(self.writer)
    }
}
