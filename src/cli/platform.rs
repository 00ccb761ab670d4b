//! Check a platform file
use crate::error::Result;
use crate::platform::math::Attitude;
use crate::platform::Platform;
use std::io::Write;
use std::path::Path;

/// A lever arm to compute after loading the platform
#[derive(Debug, Clone, Copy)]
pub struct LeverRequest {
    /// Target sensor
    pub sensor: usize,
    /// Offset of the target sensor
    pub offset: usize,
    /// Heading in degrees
    pub heading: f64,
    /// Roll in degrees
    pub roll: f64,
    /// Pitch in degrees
    pub pitch: f64,
}

/// Parse and validate a platform file, then write it back out in normal form
pub fn platform(path: &Path, lever: Option<LeverRequest>, output: Option<&Path>) -> Result<()> {
    let platform = Platform::from_file(path)?;
    platform.validate()?;

    let mut writer = super::output_writer(output)?;
    write!(writer, "{}", platform.to_config())?;
    if let Some(req) = lever {
        let measured = Attitude::new(req.heading, req.roll, req.pitch);
        let lever = platform.lever(req.sensor, req.offset, measured)?;
        let attitude = platform.orientation_target(req.sensor, req.offset, measured)?;
        writeln!(writer, "## lever {} {}", req.sensor, req.offset)?;
        writeln!(writer, "##\tx\t{:.4}", lever.x)?;
        writeln!(writer, "##\ty\t{:.4}", lever.y)?;
        writeln!(writer, "##\tz\t{:.4}", lever.z)?;
        writeln!(
            writer,
            "##\tattitude\t{:.4}\t{:.4}\t{:.4}",
            attitude.heading, attitude.roll, attitude.pitch
        )?;
    }
    writer.flush()?;
    Ok(())
}
