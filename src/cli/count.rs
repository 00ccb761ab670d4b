//! Count records by kind in a given file
use crate::driver::{Registry, SonarDriver};
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::io::{BufReader, Read, Write};
use std::path::Path;

fn count_records<R: Read>(
    mut reader: R,
    driver: &mut dyn SonarDriver,
) -> Result<BTreeMap<String, u64>> {
    let mut counts = BTreeMap::new();
    loop {
        let key = match driver.decode_ping(&mut reader) {
            Ok(kind) => kind.to_string(),
            Err(e) if e.is_eof() => break,
            Err(Error::Unintelligible(_)) => "Unintelligible".to_string(),
            Err(e) if !e.is_fatal() => e.to_string(),
            Err(e) => return Err(e),
        };
        *counts.entry(key).or_insert(0) += 1;
    }
    Ok(counts)
}

pub fn count(path: &Path, format: i32, output: Option<&Path>) -> Result<()> {
    let mut driver = Registry::with_builtin_formats().open(format)?;
    let f = std::fs::File::open(path).map_err(|source| Error::OpenFail {
        path: path.to_path_buf(),
        source,
    })?;
    let counts = count_records(BufReader::new(f), driver.as_mut())?;

    let mut writer = super::output_writer(output)?;
    for (key, value) in &counts {
        writeln!(writer, "{}\t{}", value, key)?;
    }
    writer.flush()?;
    Ok(())
}
