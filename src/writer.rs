//! Writing records in any built-in format
use crate::driver::{Registry, SonarDriver};
use crate::error::{Error, Result};
use crate::model::SwathRecord;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Encodes generic records through a format driver
///
/// ```
/// # use swathio::driver::Registry;
/// # use swathio::writer::PingWriter;
/// # use swathio::model::SwathRecord;
/// # fn main() -> Result<(),Box<dyn std::error::Error>> {
/// let mut writer = PingWriter::new(Vec::new(), Registry::with_builtin_formats().open(42)?);
/// writer.write(&SwathRecord::Comment("hello".to_string()))?;
/// assert_eq!(writer.records_written(), 1);
/// assert!(!writer.into_inner()?.is_empty());
/// # Ok(())
/// # }
/// ```
pub struct PingWriter<W: Write> {
    writer: W,
    driver: Box<dyn SonarDriver>,
    written: u64,
}

impl PingWriter<BufWriter<File>> {
    /// Create (or truncate) a file in a built-in format
    pub fn create<P: AsRef<Path>>(path: P, format: i32) -> Result<Self> {
        let driver = Registry::with_builtin_formats().open(format)?;
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| Error::OpenFail {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!("writing {} as format {}", path.display(), format);
        Ok(PingWriter::new(BufWriter::new(file), driver))
    }
}

impl<W: Write> PingWriter<W> {
    /// Write to any byte sink with the given driver
    pub fn new(writer: W, driver: Box<dyn SonarDriver>) -> Self {
        PingWriter {
            writer,
            driver,
            written: 0,
        }
    }

    /// Load a record into the driver's store and encode it
    pub fn write(&mut self, record: &SwathRecord) -> Result<()> {
        self.driver.insert(record)?;
        self.driver.encode_ping(&mut self.writer)?;
        self.written += 1;
        Ok(())
    }

    /// The driver, for format-specific setup before writing
    pub fn driver_mut(&mut self) -> &mut dyn SonarDriver {
        self.driver.as_mut()
    }

    /// Records written so far
    pub fn records_written(&self) -> u64 {
        self.written
    }

    /// Flush buffered output
    pub fn flush(&mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| Error::WriteFail(e.to_string()))
    }

    /// Flush and hand back the underlying sink
    pub fn into_inner(mut self) -> Result<W> {
        self.flush()?;
        Ok(self.writer)
    }
}
