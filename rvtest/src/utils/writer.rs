use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Stderr, Stdout, Write};

use crate::errors::{Error, Result};

/// Destination for everything a command prints. Commands never touch
/// stdout/stderr directly so tests can capture both streams.
pub struct Writer {
    buffer: WriteBuffer,
    err: WriteBuffer,
}

impl Default for Writer {
    fn default() -> Self {
        Self {
            buffer: WriteBuffer::Stdout(std::io::stdout()),
            err: WriteBuffer::Stderr(std::io::stderr()),
        }
    }
}

impl Writer {
    pub fn new(buffer: WriteBuffer, err: WriteBuffer) -> Self {
        Self { buffer, err }
    }

    pub fn new_with_err(buffer: WriteBuffer, err: WriteBuffer) -> Result<Self> {
        if let WriteBuffer::Stdout(..) = err {
            return Err(Error::IllegalArguments(String::from(
                "unable to use stdout as the error stream",
            )));
        }
        if let WriteBuffer::Stderr(..) = buffer {
            return Err(Error::IllegalArguments(String::from(
                "unable to use stderr as the output stream",
            )));
        }

        Ok(Self { buffer, err })
    }

    pub fn write_err(&mut self, s: String) -> std::io::Result<()> {
        writeln!(self.err, "{s}")
    }

    /// True when the output stream is an interactive terminal.
    pub fn is_terminal(&self) -> bool {
        use std::io::IsTerminal;

        match &self.buffer {
            WriteBuffer::Stdout(stdout) => stdout.is_terminal(),
            _ => false,
        }
    }

    pub fn into_string(self) -> Result<String> {
        self.buffer.into_string()
    }

    pub fn err_to_stripped(self) -> Result<String> {
        strip(self.err.into_string()?)
    }

    pub fn stripped(self) -> Result<String> {
        strip(self.buffer.into_string()?)
    }
}

fn strip(content: String) -> Result<String> {
    let stripped = strip_ansi_escapes::strip(content)?;
    Ok(String::from_utf8_lossy(&stripped).into_owned())
}

impl Write for Writer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.buffer.flush()
    }
}

pub enum WriteBuffer {
    Stdout(Stdout),
    Stderr(Stderr),
    Vec(Vec<u8>),
    File(File),
}

impl WriteBuffer {
    fn into_string(self) -> Result<String> {
        match self {
            WriteBuffer::Stdout(..) | WriteBuffer::Stderr(..) => Err(Error::IllegalArguments(
                String::from("unable to read back a standard stream"),
            )),
            WriteBuffer::Vec(vec) => Ok(String::from_utf8_lossy(&vec).into_owned()),
            WriteBuffer::File(mut file) => {
                let mut data = String::new();
                file.seek(SeekFrom::Start(0))?;
                file.read_to_string(&mut data)?;
                Ok(data)
            }
        }
    }
}

impl Write for WriteBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            WriteBuffer::Stdout(stdout) => stdout.write(buf),
            WriteBuffer::Stderr(stderr) => stderr.write(buf),
            WriteBuffer::Vec(vec) => vec.write(buf),
            WriteBuffer::File(file) => file.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            WriteBuffer::Stdout(stdout) => stdout.flush(),
            WriteBuffer::Stderr(stderr) => stderr.flush(),
            WriteBuffer::Vec(vec) => vec.flush(),
            WriteBuffer::File(file) => file.flush(),
        }
    }
}
