use std::io::{self, BufRead, BufReader, Read, Write};

use crate::{Result, BLOCK_HEADER_LEN, MAX_TRANSFER_SAMPLES};
use super::Transport;

const TERMINATOR: u8 = b'\n';

/// Largest definite length block accepted; one full waveform window with its framing.
const MAX_BLOCK_LEN: usize = MAX_TRANSFER_SAMPLES + BLOCK_HEADER_LEN + 1;

fn corrupt(message: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message)
}

/// SCPI framing over any byte stream.
///
/// Commands are terminated with a newline. Binary responses in IEEE 488.2 definite length
/// block format (`#<width><length><payload>`) are read by length, so that payload bytes which
/// happen to equal the terminator do not end the read early.
#[derive(Debug)]
pub struct StreamTransport<S: Read + Write> {
    stream: BufReader<S>,
}

impl<S: Read + Write> StreamTransport<S> {
    pub fn new(stream: S) -> StreamTransport<S> {
        StreamTransport { stream: BufReader::new(stream) }
    }

    pub fn into_inner(self) -> S {
        self.stream.into_inner()
    }

    fn read_terminated(&mut self, data: &mut Vec<u8>) -> Result<()> {
        self.stream.read_until(TERMINATOR, data)?;
        if data.last() != Some(&TERMINATOR) {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof,
                "response ended without a terminator").into())
        }
        Ok(())
    }
}

impl<S: Read + Write> Transport for StreamTransport<S> {
    fn write_line(&mut self, line: &str) -> Result<()> {
        let stream = self.stream.get_mut();
        stream.write_all(line.as_bytes())?;
        stream.write_all(&[TERMINATOR])?;
        stream.flush()?;
        Ok(())
    }

    fn read_line(&mut self) -> Result<String> {
        let mut line = Vec::new();
        self.read_terminated(&mut line)?;
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        String::from_utf8(line)
            .map_err(|error| corrupt(format!("response is not UTF-8: {}", error)).into())
    }

    fn read_block(&mut self) -> Result<Vec<u8>> {
        let mut block = vec![0u8; 2];
        self.stream.read_exact(&mut block[..1])?;
        if block[0] == b'#' {
            self.stream.read_exact(&mut block[1..2])?;
            let width = (block[1] as char).to_digit(10)
                .ok_or_else(|| corrupt(format!("invalid block header width {:?}", block[1] as char)))?
                as usize;
            if width > 0 {
                // definite length; `#0` (indefinite) ends at the terminator like a text response
                block.resize(2 + width, 0);
                self.stream.read_exact(&mut block[2..])?;
                let length = std::str::from_utf8(&block[2..]).ok()
                    .and_then(|digits| digits.parse::<usize>().ok())
                    .ok_or_else(|| corrupt(format!("invalid block header {:?}",
                        String::from_utf8_lossy(&block))))?;
                if length > MAX_BLOCK_LEN {
                    return Err(corrupt(format!("block length {} exceeds {} bytes", length, MAX_BLOCK_LEN)).into())
                }
                let start = block.len();
                block.resize(start + length, 0);
                self.stream.read_exact(&mut block[start..])?;
            }
        } else {
            block.truncate(1);
            if block[0] == TERMINATOR {
                return Ok(block)
            }
        }
        self.read_terminated(&mut block)?;
        log::trace!("read_block() = {} bytes", block.len());
        Ok(block)
    }

    fn close(&mut self) -> Result<()> {
        self.stream.get_mut().flush()?;
        Ok(())
    }
}
