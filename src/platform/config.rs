//! Reading and writing platform definition files
//!
//! The file is plain ASCII, one `KEY value...` entry per line. Lines
//! starting with `#` are comments and so is anything after `##` on a line.
//! Sensors and offsets are addressed by index, so `PLATFORM_NUM_SENSORS`
//! and `SENSOR_NUM_OFFSETS` must come before the entries that use them.
use super::math::Attitude;
use super::{
    Capability1, Capability2, Platform, PlatformType, PositionOffset, Sensor, SensorOffset,
    SensorType, TimeLatency, MAX_LATENCY_SAMPLES, MAX_OFFSETS, MAX_SENSORS,
};
use crate::error::{Error, Result};
use crate::model::epoch;
use std::fmt::Write as _;
use std::path::Path;
use std::str::FromStr;
use time::macros::format_description;

struct Line<'a> {
    number: usize,
    key: &'a str,
    fields: Vec<&'a str>,
    rest: &'a str,
}

impl<'a> Line<'a> {
    fn error(&self, what: &str) -> Error {
        Error::BadParameter(format!("line {} ({}): {}", self.number, self.key, what))
    }

    fn field<T: FromStr>(&self, i: usize) -> Result<T> {
        self.fields
            .get(i)
            .ok_or_else(|| self.error("missing value"))?
            .parse()
            .map_err(|_| self.error(&format!("bad value {:?}", self.fields[i])))
    }

    /// Text after the sensor index, for names containing spaces
    fn text_after_index(&self) -> String {
        let rest = self.rest.trim_start();
        rest.split_once(char::is_whitespace)
            .map(|(_, s)| s.trim().to_string())
            .unwrap_or_default()
    }
}

fn strip_comment(line: &str) -> &str {
    match line.find("##") {
        Some(i) => &line[..i],
        None => line,
    }
}

fn source_index(value: i64) -> Option<usize> {
    usize::try_from(value).ok()
}

impl Platform {
    /// Parse a platform definition
    ///
    /// ```
    /// # use swathio::platform::Platform;
    /// # fn main() -> Result<(),Box<dyn std::error::Error>> {
    /// let text = "PLATFORM_NAME Ship\nPLATFORM_NUM_SENSORS 1\nSENSOR_TYPE 0 44\n\
    ///             SOURCE_POSITION 0\nSOURCE_DEPTH 0\n";
    /// let platform: Platform = text.parse()?;
    /// assert_eq!(platform.name, "Ship");
    /// assert_eq!(platform.sensors.len(), 1);
    /// # Ok(())
    /// # }
    /// ```
    pub fn parse_config(text: &str) -> Result<Platform> {
        let mut platform = Platform::default();
        let mut lines = text.lines().enumerate();
        while let Some((i, raw)) = lines.next() {
            if raw.starts_with('#') {
                continue;
            }
            let content = strip_comment(raw).trim();
            if content.is_empty() {
                continue;
            }
            let (key, rest) = content
                .split_once(char::is_whitespace)
                .unwrap_or((content, ""));
            let line = Line {
                number: i + 1,
                key,
                fields: rest.split_whitespace().collect(),
                rest,
            };
            match key {
                "PLATFORM_TYPE" => platform.kind = PlatformType::from_code(line.field(0)?),
                "PLATFORM_NAME" => platform.name = rest.trim().to_string(),
                "PLATFORM_ORGANIZATION" => platform.organization = rest.trim().to_string(),
                "DOCUMENTATION_URL" => platform.documentation_url = rest.trim().to_string(),
                "START_TIME_D" => platform.start_time_d = line.field(0)?,
                "END_TIME_D" => platform.end_time_d = line.field(0)?,
                "PLATFORM_NUM_SENSORS" => {
                    let n: usize = line.field(0)?;
                    if n > MAX_SENSORS {
                        return Err(line.error(&format!(
                            "{} sensors exceed the maximum of {}",
                            n, MAX_SENSORS
                        )));
                    }
                    platform.sensors.resize_with(n, Sensor::default);
                }
                "SENSOR_TYPE" => {
                    sensor_mut(&mut platform, &line)?.kind = SensorType::from_code(line.field(1)?)
                }
                "SENSOR_MODEL" => {
                    let text = line.text_after_index();
                    sensor_mut(&mut platform, &line)?.model = text;
                }
                "SENSOR_MANUFACTURER" => {
                    let text = line.text_after_index();
                    sensor_mut(&mut platform, &line)?.manufacturer = text;
                }
                "SENSOR_SERIALNUMBER" => {
                    let text = line.text_after_index();
                    sensor_mut(&mut platform, &line)?.serial_number = text;
                }
                "SENSOR_CAPABILITY1" => {
                    let bits: u32 = line.field(1)?;
                    sensor_mut(&mut platform, &line)?.capability1 =
                        Capability1::from_bits_retain(bits);
                }
                "SENSOR_CAPABILITY2" => {
                    let bits: u32 = line.field(1)?;
                    sensor_mut(&mut platform, &line)?.capability2 =
                        Capability2::from_bits_retain(bits);
                }
                "SENSOR_NUM_OFFSETS" => {
                    let n: usize = line.field(1)?;
                    if n > MAX_OFFSETS {
                        return Err(line.error(&format!(
                            "{} offsets exceed the maximum of {}",
                            n, MAX_OFFSETS
                        )));
                    }
                    sensor_mut(&mut platform, &line)?
                        .offsets
                        .resize_with(n, SensorOffset::default);
                }
                "OFFSET_POSITION" => {
                    let position = PositionOffset {
                        x: line.field(2)?,
                        y: line.field(3)?,
                        z: line.field(4)?,
                    };
                    offset_mut(&mut platform, &line)?.position = Some(position);
                }
                "OFFSET_ATTITUDE" => {
                    let attitude = Attitude::new(line.field(2)?, line.field(3)?, line.field(4)?);
                    offset_mut(&mut platform, &line)?.attitude = Some(attitude);
                }
                "OFFSET_TIME_LATENCY_STATIC" => {
                    let value = TimeLatency::Static(line.field(2)?);
                    offset_mut(&mut platform, &line)?.time_latency = value;
                }
                "OFFSET_TIME_LATENCY_MODEL" => {
                    let n: usize = line.field(2)?;
                    let table = read_latency_table(&mut lines, n, &line)?;
                    offset_mut(&mut platform, &line)?.time_latency = TimeLatency::Model(table);
                }
                "SENSOR_TIME_LATENCY_STATIC" => {
                    let value = TimeLatency::Static(line.field(1)?);
                    first_offset_mut(&mut platform, &line)?.time_latency = value;
                }
                "SENSOR_TIME_LATENCY_MODEL" => {
                    let n: usize = line.field(1)?;
                    let table = read_latency_table(&mut lines, n, &line)?;
                    first_offset_mut(&mut platform, &line)?.time_latency =
                        TimeLatency::Model(table);
                }
                key if key.starts_with("SOURCE_") => {
                    let name = &key["SOURCE_".len()..];
                    let (name, slot) = match name.strip_suffix(['1', '2', '3']) {
                        Some(base) => (base, name[base.len()..].parse::<usize>().ok()),
                        None => (name, None),
                    };
                    // older files call the camera source SUBCAMERA
                    let name = if name == "SUBCAMERA" { "CAMERA" } else { name };
                    let index = source_index(line.field(0)?);
                    let source = platform
                        .sources
                        .by_name_mut(name)
                        .ok_or_else(|| line.error("unknown source"))?;
                    match slot {
                        Some(n) => source.alternates[n - 1] = index,
                        None => source.primary = index,
                    }
                }
                _ => tracing::debug!("ignoring platform line {}: {}", line.number, key),
            }
        }
        platform.validate()?;
        Ok(platform)
    }

    /// Read a platform definition file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Platform> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| Error::OpenFail {
            path: path.to_path_buf(),
            source,
        })?;
        Platform::parse_config(&text)
    }

    /// Render the platform in the definition file format
    pub fn to_config(&self) -> String {
        let mut s = String::new();
        // writing to a String cannot fail
        let _ = self.write_config(&mut s);
        s
    }

    /// Write a platform definition file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_config()).map_err(|e| Error::WriteFail(e.to_string()))
    }

    fn write_config(&self, s: &mut String) -> std::fmt::Result {
        writeln!(s, "## Platform definition file")?;
        writeln!(s, "FILE_VERSION             1.00")?;
        writeln!(s, "##")?;
        writeln!(s, "PLATFORM_TYPE            {}  ## {}", self.kind.code(), self.kind)?;
        writeln!(s, "PLATFORM_NAME            {}", self.name)?;
        writeln!(s, "PLATFORM_ORGANIZATION    {}", self.organization)?;
        writeln!(s, "DOCUMENTATION_URL        {}", self.documentation_url)?;
        writeln!(s, "##")?;
        writeln!(s, "START_TIME_D             {:.6}{}", self.start_time_d, date_note(self.start_time_d))?;
        writeln!(s, "END_TIME_D               {:.6}{}", self.end_time_d, date_note(self.end_time_d))?;
        writeln!(s, "##")?;
        writeln!(s, "PLATFORM_NUM_SENSORS     {}", self.sensors.len())?;
        writeln!(s, "##")?;
        writeln!(s, "## Defined data source sensors:")?;
        for (name, source) in self.sources.named() {
            if let Some(i) = source.primary {
                writeln!(s, "{:<25}{}", format!("SOURCE_{}", name), i)?;
            }
            for (n, alt) in source.alternates.iter().enumerate() {
                if let Some(i) = alt {
                    writeln!(s, "{:<25}{}", format!("SOURCE_{}{}", name, n + 1), i)?;
                }
            }
        }
        for (i, sensor) in self.sensors.iter().enumerate() {
            writeln!(s, "##")?;
            writeln!(s, "## Sensor {}:", i)?;
            writeln!(s, "SENSOR_TYPE              {} {}", i, sensor.kind.code())?;
            writeln!(s, "SENSOR_MODEL             {} {}", i, sensor.model)?;
            writeln!(s, "SENSOR_MANUFACTURER      {} {}", i, sensor.manufacturer)?;
            writeln!(s, "SENSOR_SERIALNUMBER      {} {}", i, sensor.serial_number)?;
            writeln!(s, "SENSOR_CAPABILITY1       {} {}", i, sensor.capability1.bits())?;
            writeln!(s, "SENSOR_CAPABILITY2       {} {}", i, sensor.capability2.bits())?;
            writeln!(s, "SENSOR_NUM_OFFSETS       {} {}", i, sensor.offsets.len())?;
            for (j, offset) in sensor.offsets.iter().enumerate() {
                if let Some(p) = offset.position {
                    writeln!(
                        s,
                        "OFFSET_POSITION          {} {} {:.6} {:.6} {:.6}",
                        i, j, p.x, p.y, p.z
                    )?;
                }
                if let Some(a) = offset.attitude {
                    writeln!(
                        s,
                        "OFFSET_ATTITUDE          {} {} {:.6} {:.6} {:.6}",
                        i, j, a.heading, a.roll, a.pitch
                    )?;
                }
                match &offset.time_latency {
                    TimeLatency::None => {}
                    TimeLatency::Static(v) => {
                        writeln!(s, "OFFSET_TIME_LATENCY_STATIC {} {} {:.6}", i, j, v)?
                    }
                    TimeLatency::Model(table) => {
                        writeln!(s, "OFFSET_TIME_LATENCY_MODEL {} {} {}", i, j, table.len())?;
                        for (t, v) in table {
                            writeln!(s, "{:.6} {:.6}", t, v)?;
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Platform> {
        Platform::parse_config(s)
    }
}

fn date_note(time_d: f64) -> String {
    if time_d <= 100.0 {
        return String::new();
    }
    let format = format_description!(
        "[year]/[month]/[day] [hour]:[minute]:[second].[subsecond digits:6]"
    );
    epoch::from_seconds(time_d)
        .ok()
        .and_then(|t| t.format(format).ok())
        .map(|d| format!("  ## {}", d))
        .unwrap_or_default()
}

fn sensor_mut<'p>(platform: &'p mut Platform, line: &Line) -> Result<&'p mut Sensor> {
    let i: usize = line.field(0)?;
    let n = platform.sensors.len();
    platform
        .sensors
        .get_mut(i)
        .ok_or_else(|| line.error(&format!("sensor {} of {}", i, n)))
}

fn offset_mut<'p>(platform: &'p mut Platform, line: &Line) -> Result<&'p mut SensorOffset> {
    let j: usize = line.field(1)?;
    let sensor = sensor_mut(platform, line)?;
    let n = sensor.offsets.len();
    sensor
        .offsets
        .get_mut(j)
        .ok_or_else(|| line.error(&format!("offset {} of {}", j, n)))
}

fn first_offset_mut<'p>(platform: &'p mut Platform, line: &Line) -> Result<&'p mut SensorOffset> {
    let sensor = sensor_mut(platform, line)?;
    if sensor.offsets.is_empty() {
        sensor.offsets.push(SensorOffset::default());
    }
    Ok(&mut sensor.offsets[0])
}

fn read_latency_table<'a>(
    lines: &mut impl Iterator<Item = (usize, &'a str)>,
    n: usize,
    header: &Line,
) -> Result<Vec<(f64, f64)>> {
    if n > MAX_LATENCY_SAMPLES {
        return Err(header.error(&format!(
            "{} latency samples exceed the maximum of {}",
            n, MAX_LATENCY_SAMPLES
        )));
    }
    let mut table = Vec::with_capacity(n);
    for _ in 0..n {
        let (i, raw) = lines
            .next()
            .ok_or_else(|| header.error("latency model ends early"))?;
        let mut fields = strip_comment(raw).split_whitespace().map(f64::from_str);
        match (fields.next(), fields.next()) {
            (Some(Ok(t)), Some(Ok(v))) => table.push((t, v)),
            _ => {
                return Err(Error::BadParameter(format!(
                    "line {}: expected a time and a latency",
                    i + 1
                )))
            }
        }
    }
    Ok(table)
}

#[cfg(test)]
mod test {
    use super::*;

    const TEXT: &str = "\
## A test vessel
PLATFORM_TYPE 1
PLATFORM_NAME R/V Example
PLATFORM_ORGANIZATION Somewhere Oceanographic
PLATFORM_NUM_SENSORS 2
SOURCE_BATHYMETRY 1
SOURCE_POSITION 0
SOURCE_POSITION1 1
SOURCE_DEPTH 0
SOURCE_HEADING 0
SOURCE_ROLLPITCH 0
SOURCE_HEAVE 0
SENSOR_TYPE 0 44   ## INS
SENSOR_MODEL 0 Model 7
SENSOR_CAPABILITY1 0 451
SENSOR_NUM_OFFSETS 0 1
OFFSET_POSITION 0 0 0.1 0.2 -0.3
OFFSET_ATTITUDE 0 0 0.5 -0.25 0.125
SENSOR_TYPE 1 5
SENSOR_NUM_OFFSETS 1 2
OFFSET_POSITION 1 1 1.0 2.0 -3.0
OFFSET_TIME_LATENCY_MODEL 1 1 2
0.0 0.010
100.0 0.020
SENSOR_TIME_LATENCY_STATIC 1 0.05
";

    #[test]
    fn test_parse() {
        let p: Platform = TEXT.parse().unwrap();
        assert_eq!(p.kind, PlatformType::SurfaceVessel);
        assert_eq!(p.name, "R/V Example");
        assert_eq!(p.sensors.len(), 2);
        assert_eq!(p.sensors[0].kind, SensorType::Ins);
        assert_eq!(p.sensors[0].model, "Model 7");
        assert!(p.sensors[0].capability1.contains(Capability1::HEADING));
        assert_eq!(p.sources.position.primary, Some(0));
        assert_eq!(p.sources.position.alternates, [Some(1), None, None]);
        assert_eq!(p.sources.bathymetry.primary, Some(1));
        assert_eq!(
            p.sensors[0].offsets[0].attitude,
            Some(Attitude::new(0.5, -0.25, 0.125))
        );
        assert_eq!(p.sensors[1].offsets[0].time_latency, TimeLatency::Static(0.05));
        assert_eq!(
            p.sensors[1].offsets[1].time_latency,
            TimeLatency::Model(vec![(0.0, 0.01), (100.0, 0.02)])
        );
    }

    #[test]
    fn test_write_then_parse() {
        let p: Platform = TEXT.parse().unwrap();
        let again: Platform = p.to_config().parse().unwrap();
        assert_eq!(p, again);
    }

    #[test]
    fn test_index_out_of_range() {
        let text = "PLATFORM_NUM_SENSORS 1\nSENSOR_TYPE 3 5\n";
        assert!(matches!(
            text.parse::<Platform>(),
            Err(Error::BadParameter(_))
        ));
        let text = "PLATFORM_NUM_SENSORS 1\nOFFSET_POSITION 0 0 1 2 3\n";
        assert!(matches!(
            text.parse::<Platform>(),
            Err(Error::BadParameter(_))
        ));
        let text = "PLATFORM_NUM_SENSORS 1\nSOURCE_DEPTH 4\n";
        assert!(matches!(
            text.parse::<Platform>(),
            Err(Error::BadParameter(_))
        ));
    }

    #[test]
    fn test_counts_are_capped() {
        for text in [
            "PLATFORM_NUM_SENSORS 18446744073709551615\n",
            "PLATFORM_NUM_SENSORS 1001\n",
            "PLATFORM_NUM_SENSORS 1\nSENSOR_NUM_OFFSETS 0 99999999\n",
            "PLATFORM_NUM_SENSORS 1\nSENSOR_NUM_OFFSETS 0 1\n\
             OFFSET_TIME_LATENCY_MODEL 0 0 4000000000\n0.0 0.01\n",
        ] {
            assert!(
                matches!(text.parse::<Platform>(), Err(Error::BadParameter(_))),
                "{:?}",
                text
            );
        }
        let p: Platform = "PLATFORM_NUM_SENSORS 1000\nSOURCE_POSITION 0\n".parse().unwrap();
        assert_eq!(p.sensors.len(), MAX_SENSORS);
    }

    #[test]
    fn test_no_sensors() {
        assert!(matches!(
            "PLATFORM_NAME Empty\n".parse::<Platform>(),
            Err(Error::BadParameter(_))
        ));
    }

    #[test]
    fn test_negative_source_is_unset() {
        let p: Platform = "PLATFORM_NUM_SENSORS 1\nSOURCE_HEAVE -1\n".parse().unwrap();
        assert_eq!(p.sources.heave.primary, None);
    }

    #[test]
    fn test_date_note() {
        assert_eq!(date_note(0.0), "");
        assert_eq!(date_note(86400.5), "  ## 1970/01/02 00:00:00.500000");
    }
}
