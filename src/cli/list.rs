//! List averaged pings in a given file
use crate::error::Result;
use crate::reader::{PingReader, ReadParams, Reading};
use std::io::Write;
use std::path::Path;

fn write_reading(writer: &mut dyn Write, reading: &Reading) -> std::io::Result<()> {
    let notice = reading
        .notice
        .as_ref()
        .map(|n| n.to_string())
        .unwrap_or_else(|| "-".to_string());
    if let Some(comment) = &reading.comment {
        return writeln!(writer, "# {}", comment);
    }
    match &reading.ping {
        Some(ping) => writeln!(
            writer,
            "{}\t{:.7}\t{:.7}\t{:.2}\t{:.2}\t{}\t{}\t{}\t{}",
            ping.timestamp,
            ping.longitude,
            ping.latitude,
            ping.heading,
            ping.speed,
            ping.beams.len(),
            ping.pixels.len(),
            reading.pings_binned,
            notice
        ),
        None => writeln!(writer, "-\t{}", notice),
    }
}

pub fn list(path: &Path, format: i32, params: ReadParams, output: Option<&Path>) -> Result<()> {
    let reader = PingReader::open(path, format, params)?;
    let mut writer = super::output_writer(output)?;
    for reading in reader {
        write_reading(&mut writer, &reading?)?;
    }
    writer.flush()?;
    Ok(())
}
