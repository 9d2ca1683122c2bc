//! Line iterator that reads a seekable source from its end toward its start.

use std::io::{self, Read, Seek, SeekFrom};

/// Bytes read per backward step.
const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

/// Yields the lines of a reader last-to-first without loading the whole
/// source into memory.
///
/// Lines are split on `\n` only; the separator is not included. A trailing
/// newline at the end of the source produces one leading empty line, and
/// blank lines in the middle are yielded as empty strings; callers decide
/// whether to skip them. Splitting on the raw `\n` byte is safe for UTF-8
/// because that byte never occurs inside a multi-byte sequence.
pub struct ReverseLines<R> {
    reader: R,
    /// Offset of the first byte not yet pulled into `buf`.
    pos: u64,
    /// Bytes between `pos` and the end of the last yielded line.
    buf: Vec<u8>,
    chunk_size: usize,
    done: bool,
}

impl<R: Read + Seek> ReverseLines<R> {
    pub fn new(reader: R) -> io::Result<Self> {
        Self::with_chunk_size(reader, DEFAULT_CHUNK_SIZE)
    }

    pub fn with_chunk_size(mut reader: R, chunk_size: usize) -> io::Result<Self> {
        let pos = reader.seek(SeekFrom::End(0))?;
        Ok(Self {
            reader,
            pos,
            buf: Vec::new(),
            chunk_size: chunk_size.max(1),
            done: false,
        })
    }

    /// Pull the previous chunk in front of the buffered bytes.
    fn fill(&mut self) -> io::Result<()> {
        let step = (self.chunk_size as u64).min(self.pos);
        self.pos -= step;
        self.reader.seek(SeekFrom::Start(self.pos))?;
        let mut chunk = vec![0u8; step as usize];
        self.reader.read_exact(&mut chunk)?;
        chunk.append(&mut self.buf);
        self.buf = chunk;
        Ok(())
    }

    fn decode(bytes: Vec<u8>) -> io::Result<String> {
        String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

impl<R: Read + Seek> Iterator for ReverseLines<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            if let Some(idx) = self.buf.iter().rposition(|&b| b == b'\n') {
                let line = self.buf.split_off(idx + 1);
                self.buf.truncate(idx);
                return Some(Self::decode(line));
            }
            if self.pos == 0 {
                self.done = true;
                let line = std::mem::take(&mut self.buf);
                return Some(Self::decode(line));
            }
            if let Err(e) = self.fill() {
                self.done = true;
                return Some(Err(e));
            }
        }
    }
}
