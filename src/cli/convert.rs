//! Re-encode a file in another format
use crate::driver::Registry;
use crate::error::{Error, Result};
use crate::model::SwathRecord;
use crate::writer::PingWriter;
use std::io::BufReader;
use std::path::Path;

/// Copy pings and comments from `input` to `output`
///
/// Other record kinds have no generic representation and are skipped.
pub fn convert(input: &Path, from: i32, output: &Path, to: i32) -> Result<()> {
    let mut driver = Registry::with_builtin_formats().open(from)?;
    let f = std::fs::File::open(input).map_err(|source| Error::OpenFail {
        path: input.to_path_buf(),
        source,
    })?;
    let mut reader = BufReader::new(f);
    let mut writer = PingWriter::create(output, to)?;

    let mut skipped = 0u64;
    loop {
        match driver.decode_ping(&mut reader) {
            Ok(kind) => match driver.extract()? {
                SwathRecord::Other(_) => {
                    tracing::debug!("not converting {} record", kind);
                    skipped += 1;
                }
                record => writer.write(&record)?,
            },
            Err(e) if e.is_eof() => break,
            Err(e) if !e.is_fatal() => {
                tracing::warn!("skipping record: {}", e);
                skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }
    writer.flush()?;
    println!(
        "{} records written to {}, {} skipped",
        writer.records_written(),
        output.display(),
        skipped
    );
    Ok(())
}
