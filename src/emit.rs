//! Record emission boundary.
//!
//! Monitors hand finished records to a [`SampleEmitter`] as ordered, typed
//! fields. [`CsvEmitter`] renders them as comma separated lines.

use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

const SEPARATOR: &str = ", ";

#[derive(Clone, Debug, PartialEq)]
pub enum Field {
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Int(v) => write!(f, "{v}"),
            Field::UInt(v) => write!(f, "{v}"),
            Field::Float(v) => f.write_str(&crate::format::format_float(*v)),
            Field::Text(v) => f.write_str(v),
        }
    }
}

pub trait SampleEmitter: Send {
    /// Writes the column names once, before the first record.
    fn write_header(&mut self, columns: &[String]) -> io::Result<()>;

    /// Writes one record. Called once per monitor stream per tick.
    fn emit(&mut self, fields: &[Field]) -> io::Result<()>;

    /// Flushes and releases the destination. Calling it again is a no-op.
    fn close(&mut self) -> io::Result<()>;
}

/// Where a stream is written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Destination {
    Stdout,
    File(PathBuf),
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Stdout => f.write_str("<stdout>"),
            Destination::File(path) => write!(f, "{}", path.display()),
        }
    }
}

pub struct CsvEmitter {
    out: Option<BufWriter<Box<dyn Write + Send>>>,
    flush: bool,
}

impl CsvEmitter {
    /// With `flush` set every record is pushed to the destination as soon as
    /// it is written; otherwise output is buffered until close.
    pub fn new(writer: Box<dyn Write + Send>, flush: bool) -> Self {
        CsvEmitter {
            out: Some(BufWriter::new(writer)),
            flush,
        }
    }

    pub fn create(path: &Path, flush: bool) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(Box::new(file), flush))
    }

    pub fn open(destination: &Destination, flush: bool) -> io::Result<Self> {
        match destination {
            Destination::Stdout => Ok(Self::new(Box::new(io::stdout()), flush)),
            Destination::File(path) => Self::create(path, flush),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.out.is_none()
    }

    fn write_line<T: fmt::Display>(&mut self, values: &[T]) -> io::Result<()> {
        let Some(out) = self.out.as_mut() else {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "emitter already closed",
            ));
        };
        let mut first = true;
        for value in values {
            if !first {
                out.write_all(SEPARATOR.as_bytes())?;
            }
            write!(out, "{value}")?;
            first = false;
        }
        out.write_all(b"\n")?;
        if self.flush {
            out.flush()?;
        }
        Ok(())
    }
}

impl SampleEmitter for CsvEmitter {
    fn write_header(&mut self, columns: &[String]) -> io::Result<()> {
        self.write_line(columns)
    }

    fn emit(&mut self, fields: &[Field]) -> io::Result<()> {
        self.write_line(fields)
    }

    fn close(&mut self) -> io::Result<()> {
        match self.out.take() {
            Some(mut out) => out.flush(),
            None => Ok(()),
        }
    }
}

impl Drop for CsvEmitter {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Everything a [`MemoryEmitter`] has received.
#[derive(Debug, Default)]
pub struct Recorded {
    pub header: Option<Vec<String>>,
    pub records: Vec<Vec<Field>>,
    pub close_calls: usize,
}

/// Keeps records in memory behind a shared handle, for embedding the
/// monitors in another program or inspecting their output in tests.
#[derive(Clone, Debug, Default)]
pub struct MemoryEmitter {
    recorded: Arc<Mutex<Recorded>>,
}

impl MemoryEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> Arc<Mutex<Recorded>> {
        Arc::clone(&self.recorded)
    }

    fn with<R>(&self, f: impl FnOnce(&mut Recorded) -> R) -> io::Result<R> {
        let mut guard = self
            .recorded
            .lock()
            .map_err(|_| io::Error::other("memory emitter lock poisoned"))?;
        Ok(f(&mut guard))
    }
}

impl SampleEmitter for MemoryEmitter {
    fn write_header(&mut self, columns: &[String]) -> io::Result<()> {
        self.with(|r| r.header = Some(columns.to_vec()))
    }

    fn emit(&mut self, fields: &[Field]) -> io::Result<()> {
        self.with(|r| r.records.push(fields.to_vec()))
    }

    fn close(&mut self) -> io::Result<()> {
        self.with(|r| r.close_calls += 1)
    }
}
