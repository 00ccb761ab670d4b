use approx::{assert_abs_diff_eq, assert_relative_eq};
use std::io::Write;
use swathio::driver::Registry;
use swathio::model::{Beam, BeamFlag, DataKind, Ping, Pixel, SwathRecord, SIDESCAN_NULL};
use swathio::reader::{PingReader, ReadParams, Reading};
use swathio::writer::PingWriter;
use swathio::Error;
use time::macros::datetime;
use time::Duration;

fn ping_at(seconds: i64, depths: &[Option<f64>]) -> Ping {
    let beams = depths
        .iter()
        .enumerate()
        .map(|(i, d)| match d {
            Some(depth) => Beam {
                flag: BeamFlag::NONE,
                depth: *depth,
                acrosstrack: 5.0 * i as f64,
                ..Beam::default()
            },
            None => Beam::null(),
        })
        .collect();
    Ping::new(
        datetime!(2010-03-01 00:00 UTC) + Duration::seconds(seconds),
        12.0,
        54.0,
        8.0,
        90.0,
        beams,
        vec![],
    )
}

fn stream(records: &[SwathRecord]) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let mut writer = PingWriter::new(Vec::new(), Registry::with_builtin_formats().open(42)?);
    for record in records {
        writer.write(record)?;
    }
    Ok(writer.into_inner()?)
}

fn read_all(bytes: &[u8], params: ReadParams) -> Result<Vec<Reading>, Box<dyn std::error::Error>> {
    let reader = PingReader::new(bytes, Registry::with_builtin_formats().open(42)?, params)?;
    Ok(reader.collect::<Result<Vec<_>, _>>()?)
}

fn params(pings: usize) -> ReadParams {
    ReadParams {
        pings,
        ..ReadParams::default()
    }
}

#[test]
fn average_over_valid_beams() -> Result<(), Box<dyn std::error::Error>> {
    let bytes = stream(&[
        SwathRecord::Ping(ping_at(0, &[Some(10.0), None])),
        SwathRecord::Ping(ping_at(1, &[Some(12.0), Some(8.0)])),
    ])?;
    let readings = read_all(&bytes, params(2))?;
    assert_eq!(readings.len(), 1);

    let reading = &readings[0];
    assert_eq!(reading.pings_binned, 2);
    assert_eq!(reading.bath_counts, vec![2, 1]);
    let ping = reading.ping.as_ref().ok_or("no ping")?;
    assert_eq!(ping.beams[0].depth, 11.0);
    assert_eq!(ping.beams[1].depth, 8.0);
    assert!(ping.beams[1].flag.is_ok());
    let mid = datetime!(2010-03-01 00:00:00.5 UTC);
    assert!((ping.timestamp - mid).abs() < Duration::milliseconds(1));
    Ok(())
}

#[test]
fn empty_slots_stay_null() -> Result<(), Box<dyn std::error::Error>> {
    let mut first = ping_at(0, &[Some(10.0), None]);
    first.pixels = vec![
        Pixel {
            amplitude: 10000.0,
            acrosstrack: 0.0,
            alongtrack: 0.0,
        },
        Pixel::null(),
    ];
    let mut second = ping_at(1, &[Some(20.0), None]);
    second.pixels = vec![
        Pixel {
            amplitude: 30000.0,
            acrosstrack: 0.0,
            alongtrack: 0.0,
        },
        Pixel::null(),
    ];
    let bytes = stream(&[SwathRecord::Ping(first), SwathRecord::Ping(second)])?;
    let readings = read_all(&bytes, params(2))?;

    let reading = &readings[0];
    let ping = reading.ping.as_ref().ok_or("no ping")?;
    assert_eq!(reading.bath_counts, vec![2, 0]);
    assert!(ping.beams[1].flag.is_null());
    assert_eq!(reading.ss_counts, vec![2, 0]);
    assert_relative_eq!(ping.pixels[0].amplitude, 20000.0, max_relative = 0.01);
    assert_eq!(ping.pixels[1].amplitude, SIDESCAN_NULL);
    Ok(())
}

#[test]
fn short_first_ping_keeps_later_beams() -> Result<(), Box<dyn std::error::Error>> {
    let bytes = stream(&[
        SwathRecord::Ping(ping_at(0, &[Some(10.0)])),
        SwathRecord::Ping(ping_at(1, &[Some(12.0), Some(8.0), Some(6.0)])),
    ])?;
    let readings = read_all(&bytes, params(2))?;
    assert_eq!(readings.len(), 1);

    let reading = &readings[0];
    assert_eq!(reading.bath_counts, vec![2, 1, 1]);
    let ping = reading.ping.as_ref().ok_or("no ping")?;
    assert_eq!(ping.beams.len(), 3);
    assert_eq!(ping.beams[0].depth, 11.0);
    assert_eq!(ping.beams[2].depth, 6.0);
    assert!(ping.beams[2].flag.is_ok());
    Ok(())
}

#[test]
fn single_ping_passes_through() -> Result<(), Box<dyn std::error::Error>> {
    let mut ping = ping_at(0, &[Some(10.0), None, Some(30.0)]);
    ping.beams[2].flag = BeamFlag::flagged(BeamFlag::FILTER);
    let bytes = stream(&[SwathRecord::Ping(ping)])?;

    let mut driver = Registry::with_builtin_formats().open(42)?;
    driver.decode_ping(&mut bytes.as_slice())?;
    let SwathRecord::Ping(decoded) = driver.extract()? else {
        panic!("expected a ping")
    };

    let readings = read_all(&bytes, params(1))?;
    assert_eq!(readings.len(), 1);
    assert_eq!(readings[0].ping.as_ref(), Some(&decoded));
    assert_eq!(readings[0].bath_counts, vec![1, 0, 0]);
    assert!(readings[0].notice.is_none());
    Ok(())
}

#[test]
fn time_gap_is_reported_once() -> Result<(), Box<dyn std::error::Error>> {
    let bytes = stream(&[
        SwathRecord::Ping(ping_at(0, &[Some(10.0)])),
        SwathRecord::Ping(ping_at(10_000, &[Some(20.0)])),
    ])?;
    let readings = read_all(&bytes, params(2))?;
    assert_eq!(readings.len(), 2);

    assert_eq!(readings[0].pings_binned, 1);
    assert!(matches!(readings[0].notice, Some(Error::TimeGap)));
    let first = readings[0].ping.as_ref().ok_or("no ping")?;
    assert_eq!(first.beams[0].depth, 10.0);

    assert_eq!(readings[1].pings_binned, 1);
    assert!(readings[1].notice.is_none());
    let second = readings[1].ping.as_ref().ok_or("no ping")?;
    assert_eq!(second.beams[0].depth, 20.0);
    Ok(())
}

#[test]
fn time_gap_with_single_pings_keeps_data() -> Result<(), Box<dyn std::error::Error>> {
    let bytes = stream(&[
        SwathRecord::Ping(ping_at(0, &[Some(10.0)])),
        SwathRecord::Ping(ping_at(500, &[Some(20.0)])),
    ])?;
    let readings = read_all(&bytes, params(1))?;
    assert_eq!(readings.len(), 3);
    assert!(readings[0].ping.is_some());
    assert!(readings[1].ping.is_none());
    assert!(matches!(readings[1].notice, Some(Error::TimeGap)));
    assert!(readings[2].ping.is_some());
    assert!(readings[2].notice.is_none());
    Ok(())
}

#[test]
fn out_of_bounds_pings_are_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let mut far = ping_at(1, &[Some(10.0)]);
    far.longitude = -120.0;
    let bytes = stream(&[
        SwathRecord::Ping(ping_at(0, &[Some(10.0)])),
        SwathRecord::Ping(far),
        SwathRecord::Ping(ping_at(2, &[Some(10.0)])),
    ])?;
    let p = ReadParams {
        bounds: [0.0, 20.0, 50.0, 60.0],
        ..ReadParams::default()
    };
    let readings = read_all(&bytes, p)?;
    assert_eq!(readings.len(), 3);
    assert!(readings[0].ping.is_some());
    assert!(matches!(readings[1].notice, Some(Error::OutOfBounds)));
    assert!(readings[1].ping.is_none());
    assert!(readings[2].ping.is_some());
    Ok(())
}

#[test]
fn rejected_ping_closes_a_bin() -> Result<(), Box<dyn std::error::Error>> {
    let bytes = stream(&[
        SwathRecord::Ping(ping_at(0, &[Some(10.0)])),
        SwathRecord::Ping(ping_at(1, &[Some(10.0)])),
        SwathRecord::Ping(ping_at(2, &[Some(10.0)])),
    ])?;
    let p = ReadParams {
        pings: 3,
        end: Some(datetime!(2010-03-01 00:00:01 UTC)),
        ..ReadParams::default()
    };
    let readings = read_all(&bytes, p)?;
    assert_eq!(readings.len(), 2);
    assert_eq!(readings[0].pings_binned, 2);
    assert!(matches!(readings[1].notice, Some(Error::OutOfTime)));
    Ok(())
}

#[test]
fn comment_closes_a_bin() -> Result<(), Box<dyn std::error::Error>> {
    let bytes = stream(&[
        SwathRecord::Ping(ping_at(0, &[Some(10.0)])),
        SwathRecord::Comment("heading change".to_string()),
        SwathRecord::Ping(ping_at(1, &[Some(12.0)])),
    ])?;
    let readings = read_all(&bytes, params(2))?;
    let kinds: Vec<DataKind> = readings.iter().map(|r| r.kind).collect();
    assert_eq!(kinds, vec![DataKind::Data, DataKind::Comment, DataKind::Data]);
    assert_eq!(readings[1].comment.as_deref(), Some("heading change"));
    assert_eq!(readings[0].pings_binned, 1);
    assert_eq!(readings[2].pings_binned, 1);
    Ok(())
}

#[test]
fn heading_average_wraps_north() -> Result<(), Box<dyn std::error::Error>> {
    let mut a = ping_at(0, &[Some(10.0)]);
    a.heading = 350.0;
    let mut b = ping_at(1, &[Some(10.0)]);
    b.heading = 10.0;
    let bytes = stream(&[SwathRecord::Ping(a), SwathRecord::Ping(b)])?;
    let readings = read_all(&bytes, params(2))?;
    let heading = readings[0].ping.as_ref().ok_or("no ping")?.heading;
    assert!(heading < 1e-3 || heading > 360.0 - 1e-3, "heading {}", heading);
    Ok(())
}

#[test]
fn slow_pings_are_flagged() -> Result<(), Box<dyn std::error::Error>> {
    let bytes = stream(&[
        SwathRecord::Ping(ping_at(0, &[Some(10.0)])),
        SwathRecord::Ping(ping_at(1, &[Some(10.0)])),
    ])?;
    let p = ReadParams {
        pings: 2,
        speedmin: 20.0,
        ..ReadParams::default()
    };
    let readings = read_all(&bytes, p)?;
    assert!(matches!(readings[0].notice, Some(Error::SpeedTooSmall)));
    assert!(readings[0].ping.is_some());
    Ok(())
}

#[test]
fn beam_positions_follow_heading() -> Result<(), Box<dyn std::error::Error>> {
    let bytes = stream(&[SwathRecord::Ping(ping_at(0, &[Some(10.0), Some(10.0)]))])?;
    let readings = read_all(&bytes, params(1))?;
    let reading = &readings[0];
    // heading east puts starboard to the south
    let (lon0, lat0) = reading.bath_lonlat[0];
    let (lon1, lat1) = reading.bath_lonlat[1];
    assert_abs_diff_eq!(lon0, 12.0, epsilon = 1e-9);
    assert_abs_diff_eq!(lat0, 54.0, epsilon = 1e-9);
    assert_abs_diff_eq!(lon1, 12.0, epsilon = 1e-9);
    assert!(lat1 < lat0);
    Ok(())
}

#[test]
fn params_from_toml() -> Result<(), Box<dyn std::error::Error>> {
    let mut file = tempfile::NamedTempFile::new()?;
    writeln!(file, "pings = 4")?;
    writeln!(file, "lonflip = 1")?;
    writeln!(file, "bounds = [0.0, 360.0, -90.0, 90.0]")?;
    writeln!(file, "begin = \"2010-03-01T00:00:00Z\"")?;
    let params = ReadParams::from_toml_file(file.path())?;
    assert_eq!(params.pings, 4);
    assert_eq!(params.lonflip, 1);
    assert_eq!(params.begin, Some(datetime!(2010-03-01 00:00 UTC)));
    assert_eq!(params.timegap, 60.0);

    let mut bad = tempfile::NamedTempFile::new()?;
    writeln!(bad, "pings = 0")?;
    assert!(matches!(
        ReadParams::from_toml_file(bad.path()),
        Err(Error::BadParameter(_))
    ));
    Ok(())
}
