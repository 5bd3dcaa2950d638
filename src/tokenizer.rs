//! Streaming tokenizer for standard input.
//!
//! Tokens are separated by whitespace (tab, LF, CR, space) or by NUL bytes.
//! Input is pulled lazily from the reader into a growable buffer that doubles
//! when a token does not fit. Only delimiter-terminated spans are returned:
//! bytes after the last delimiter at end of stream are dropped.

use std::io::{self, Read};

const INITIAL_CAPACITY: usize = 4096;

/// Which bytes separate tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Delimiter {
    #[default]
    Whitespace,
    Nul,
}

impl Delimiter {
    #[inline]
    pub fn is_delimiter(self, byte: u8) -> bool {
        match self {
            Delimiter::Whitespace => matches!(byte, b'\t' | b'\n' | b'\r' | b' '),
            Delimiter::Nul => byte == 0,
        }
    }
}

pub struct Tokenizer<R> {
    reader: R,
    mode: Delimiter,
    buf: Vec<u8>,
    /// Bytes of `buf` holding unconsumed input.
    filled: usize,
    eof: bool,
}

impl<R: Read> Tokenizer<R> {
    pub fn new(reader: R, mode: Delimiter) -> Self {
        Self::with_capacity(reader, mode, INITIAL_CAPACITY)
    }

    pub fn with_capacity(reader: R, mode: Delimiter, capacity: usize) -> Self {
        Tokenizer {
            reader,
            mode,
            buf: vec![0; capacity.max(1)],
            filled: 0,
            eof: false,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Returns the next delimiter-terminated token, or `None` at end of input.
    pub fn next_token(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mode = self.mode;
        loop {
            let pending = &self.buf[..self.filled];
            match pending.iter().position(|&b| !mode.is_delimiter(b)) {
                None => self.filled = 0,
                Some(start) => {
                    let rest = &pending[start..];
                    if let Some(len) = rest.iter().position(|&b| mode.is_delimiter(b)) {
                        let token = rest[..len].to_vec();
                        self.consume(start + len + 1);
                        return Ok(Some(token));
                    }
                    self.consume(start);
                }
            }

            if self.eof || self.fill()? == 0 {
                self.eof = true;
                return Ok(None);
            }
        }
    }

    fn consume(&mut self, n: usize) {
        self.buf.copy_within(n..self.filled, 0);
        self.filled -= n;
    }

    /// Appends whatever the reader has, doubling the buffer if it is full.
    fn fill(&mut self) -> io::Result<usize> {
        if self.filled == self.buf.len() {
            let grown = self.buf.len() * 2;
            self.buf.resize(grown, 0);
        }
        loop {
            match self.reader.read(&mut self.buf[self.filled..]) {
                Ok(n) => {
                    self.filled += n;
                    return Ok(n);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

impl<R: Read> Iterator for Tokenizer<R> {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token().transpose()
    }
}
