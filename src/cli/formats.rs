//! List the registered formats
use crate::driver::Registry;
use crate::error::Result;
use std::io::Write;
use std::path::Path;

/// Print id, name and description of each format
pub fn formats(output: Option<&Path>) -> Result<()> {
    let mut writer = super::output_writer(output)?;
    for info in Registry::with_builtin_formats().formats() {
        writeln!(writer, "{}\t{}\t{}", info.id, info.name, info.description)?;
    }
    writer.flush()?;
    Ok(())
}
