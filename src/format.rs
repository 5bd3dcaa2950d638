//! Record formatter.
//!
//! A pattern mixes literal bytes with `%` directives:
//!
//! | directive | expands to                    |
//! |-----------|-------------------------------|
//! | `%x` `%y` `%z` | sign block coordinates   |
//! | `%1`..`%4`     | sign text lines          |
//! | `%%`           | a literal `%`            |
//!
//! Output is staged in a fixed-size buffer whose last byte is reserved, so at
//! most `capacity - 1` bytes are ever staged. When the next literal byte or
//! rendered field would reach the reserved byte (an exact fit included), the
//! staged bytes are flushed to the sink and the same directive is rendered
//! again into the empty buffer. A field that cannot fit even an empty buffer
//! is an error.

use std::io::Write;

use crate::error::FormatError;

/// Staging buffer size used by the CLI.
pub const STAGING_CAPACITY: usize = 1024;

/// Pattern reproducing the historical one-JSON-object-per-line output.
pub const DEFAULT_PATTERN: &str =
    "{ \"x\": \"%x\",  \"y\": \"%y\",  \"z\": \"%z\", \"msg\": \"%2 %3 %4 (%x, %y, %z)\" }\n";

const FIELD_COUNT: usize = 7;

/// A value a directive can refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    X,
    Y,
    Z,
    /// Sign text line, 1-based.
    Line(u8),
}

impl Field {
    pub fn from_directive(code: u8) -> Option<Field> {
        match code {
            b'x' => Some(Field::X),
            b'y' => Some(Field::Y),
            b'z' => Some(Field::Z),
            b'1'..=b'4' => Some(Field::Line(code - b'0')),
            _ => None,
        }
    }

    fn index(self) -> usize {
        match self {
            Field::X => 0,
            Field::Y => 1,
            Field::Z => 2,
            Field::Line(n) => 2 + usize::from(n),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue<'a> {
    Int(i32),
    Text(&'a str),
}

/// Lookup capability handed to the formatter for one record.
pub trait FieldSource {
    fn lookup(&self, field: Field) -> Result<FieldValue<'_>, FormatError>;
}

/// Checks that every directive in `pattern` is known.
pub fn validate(pattern: &[u8]) -> Result<(), FormatError> {
    let mut bytes = pattern.iter().copied();
    while let Some(b) = bytes.next() {
        if b != b'%' {
            continue;
        }
        match bytes.next() {
            None => return Err(FormatError::DanglingPercent),
            Some(b'%') => {}
            Some(code) if Field::from_directive(code).is_some() => {}
            Some(code) => return Err(FormatError::UnknownDirective(code)),
        }
    }
    Ok(())
}

/// Formats a single record into a fresh buffer.
pub fn render<S>(pattern: &[u8], fields: &S) -> Result<Vec<u8>, FormatError>
where
    S: FieldSource + ?Sized,
{
    let mut out = Vec::new();
    RecordFormatter::new().format_record(pattern, fields, &mut out)?;
    Ok(out)
}

/// Pattern interpreter with a reusable staging buffer.
#[derive(Debug)]
pub struct RecordFormatter {
    staging: Vec<u8>,
    capacity: usize,
}

impl Default for RecordFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordFormatter {
    pub fn new() -> Self {
        Self::with_capacity(STAGING_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        // One byte is reserved; anything smaller could never stage a byte.
        let capacity = capacity.max(2);
        RecordFormatter {
            staging: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Longest field that fits an empty buffer.
    pub fn max_field_len(&self) -> usize {
        self.capacity - 1
    }

    /// Expands `pattern` for one record and writes it to `sink`.
    ///
    /// Each field is looked up at most once, however often its directive
    /// repeats. The staging buffer is always flushed before returning `Ok`.
    pub fn format_record<S, W>(&mut self, pattern: &[u8], fields: &S, sink: &mut W) -> Result<(), FormatError>
    where
        S: FieldSource + ?Sized,
        W: Write + ?Sized,
    {
        // Leftovers of a record that failed halfway must not leak into this one.
        self.staging.clear();
        let mut cache: [Option<FieldValue<'_>>; FIELD_COUNT] = [None; FIELD_COUNT];
        let mut bytes = pattern.iter().copied();

        while let Some(b) = bytes.next() {
            if b != b'%' {
                self.append(&[b], sink)?;
                continue;
            }
            let code = bytes.next().ok_or(FormatError::DanglingPercent)?;
            if code == b'%' {
                self.append(b"%", sink)?;
                continue;
            }
            let field = Field::from_directive(code).ok_or(FormatError::UnknownDirective(code))?;
            let value = match cache[field.index()] {
                Some(value) => value,
                None => {
                    let value = fields.lookup(field)?;
                    cache[field.index()] = Some(value);
                    value
                }
            };
            match value {
                FieldValue::Int(n) => {
                    let mut digits = [0u8; 11];
                    self.append(render_int(n, &mut digits), sink)?;
                }
                FieldValue::Text(text) => self.append(text.as_bytes(), sink)?,
            }
        }

        self.flush(sink)
    }

    fn append<W: Write + ?Sized>(&mut self, bytes: &[u8], sink: &mut W) -> Result<(), FormatError> {
        if bytes.len() > self.max_field_len() {
            return Err(FormatError::FieldTooWide {
                len: bytes.len(),
                capacity: self.capacity,
            });
        }
        if !self.staging.is_empty() && self.staging.len() + bytes.len() >= self.capacity {
            self.flush(sink)?;
        }
        self.staging.extend_from_slice(bytes);
        Ok(())
    }

    fn flush<W: Write + ?Sized>(&mut self, sink: &mut W) -> Result<(), FormatError> {
        if self.staging.is_empty() {
            return Ok(());
        }
        let result = sink.write_all(&self.staging).map_err(FormatError::Sink);
        self.staging.clear();
        result
    }
}

fn render_int(value: i32, buf: &mut [u8; 11]) -> &[u8] {
    let mut n = value.unsigned_abs();
    let mut pos = buf.len();
    loop {
        pos -= 1;
        buf[pos] = b'0' + (n % 10) as u8;
        n /= 10;
        if n == 0 {
            break;
        }
    }
    if value < 0 {
        pos -= 1;
        buf[pos] = b'-';
    }
    &buf[pos..]
}
