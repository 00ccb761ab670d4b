use approx::assert_abs_diff_eq;
use swathio::driver::{Registry, SonarDriver};
use swathio::format::lidar::record::{
    self, HeadingRecord, PositionRecord, RawPulse, RawScanHeader, RecordId, ScanTime,
    SensorDepthRecord, FILE_MAGIC,
};
use swathio::format::lidar::{LidarDriver, SensorMount};
use swathio::geodesy::coor_scale;
use swathio::model::{Beam, BeamFlag, DataKind, Ping, SwathRecord};
use swathio::platform::{Platform, PositionOffset, Sensor, SensorOffset, SensorType};
use swathio::reader::{PingReader, ReadParams};
use swathio::writer::PingWriter;
use time::macros::datetime;

const T0: f64 = 1577836800.0;

fn navigation() -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let mut out = FILE_MAGIC.to_be_bytes().to_vec();
    for (i, t) in [T0, T0 + 60.0].into_iter().enumerate() {
        out.extend_from_slice(&RecordId::Position.value().to_be_bytes());
        record::write_block(
            &mut out,
            &PositionRecord {
                time_d: t,
                longitude: -122.0,
                latitude: 36.0 + 0.001 * i as f64,
            },
        )?;
        out.extend_from_slice(&RecordId::Heading.value().to_be_bytes());
        record::write_block(&mut out, &HeadingRecord { time_d: t, heading: 0.0 })?;
        out.extend_from_slice(&RecordId::SensorDepth.value().to_be_bytes());
        record::write_block(&mut out, &SensorDepthRecord { time_d: t, depth: 50.0 })?;
    }
    Ok(out)
}

fn raw_scan(out: &mut Vec<u8>, seconds: u8, ranges: &[f32]) -> Result<(), Box<dyn std::error::Error>> {
    out.extend_from_slice(&RecordId::RawScan.value().to_be_bytes());
    let header = RawScanHeader {
        time: ScanTime {
            year: 2020,
            month: 1,
            day: 1,
            seconds,
            ..ScanTime::default()
        },
        num_pulses: ranges.len() as u32,
    };
    record::write_block(out, &header)?;
    for range in ranges {
        record::write_block(
            out,
            &RawPulse {
                range: *range,
                amplitude: 200,
                ..RawPulse::default()
            },
        )?;
    }
    Ok(())
}

#[test]
fn average_raw_scans() -> Result<(), Box<dyn std::error::Error>> {
    let mut bytes = navigation()?;
    raw_scan(&mut bytes, 10, &[2.0, 0.0])?;
    raw_scan(&mut bytes, 12, &[4.0, 3.0])?;

    let params = ReadParams {
        pings: 2,
        ..ReadParams::default()
    };
    let reader = PingReader::new(bytes.as_slice(), Registry::with_builtin_formats().open(231)?, params)?;
    let readings = reader.collect::<Result<Vec<_>, _>>()?;
    assert_eq!(readings.len(), 1);

    let reading = &readings[0];
    assert_eq!(reading.kind, DataKind::Data);
    assert_eq!(reading.pings_binned, 2);
    assert_eq!(reading.bath_counts, vec![2, 1]);
    let ping = reading.ping.as_ref().ok_or("no ping")?;
    // vertical pulses below a 50 m sensor
    assert_abs_diff_eq!(ping.beams[0].depth, 53.0, epsilon = 1e-6);
    assert_abs_diff_eq!(ping.beams[1].depth, 53.0, epsilon = 1e-6);
    assert_eq!(ping.timestamp, datetime!(2020-01-01 00:00:11 UTC));
    assert!(reading.distance > 0.0);
    Ok(())
}

#[test]
fn mounted_lidar_is_offset_from_navigation() -> Result<(), Box<dyn std::error::Error>> {
    let mut platform = Platform::default();
    platform.sensors.push(Sensor::new(SensorType::Ins));
    let mut lidar = Sensor::new(SensorType::LidarScan);
    lidar.offsets.push(SensorOffset {
        position: Some(PositionOffset {
            x: 0.0,
            y: 10.0,
            z: -2.0,
        }),
        ..SensorOffset::default()
    });
    platform.sensors.push(lidar);
    platform.sources.set_all_navigation(0);

    let mount = SensorMount {
        platform,
        sensor: 1,
        offset: 0,
    };
    let mut driver = LidarDriver::new(LidarDriver::format_info()).with_mount(mount);
    let mut plain = LidarDriver::new(LidarDriver::format_info());

    let mut bytes = navigation()?;
    raw_scan(&mut bytes, 30, &[1.0])?;
    for d in [&mut driver, &mut plain] {
        let mut input = bytes.as_slice();
        while d.decode_ping(&mut input)? != DataKind::Data {}
    }

    let a = &plain.store().scan;
    let b = &driver.store().scan;
    let (_, mtodeglat) = coor_scale(a.navlat);
    // heading north moves a forward offset north
    assert_abs_diff_eq!(b.navlat - a.navlat, 10.0 * mtodeglat, epsilon = 1e-9);
    assert_abs_diff_eq!(b.navlon, a.navlon, epsilon = 1e-9);
    assert_abs_diff_eq!(b.sensordepth, a.sensordepth + 2.0, epsilon = 1e-9);
    Ok(())
}

#[test]
fn write_pings_as_processed_scans() -> Result<(), Box<dyn std::error::Error>> {
    let beams = vec![
        Beam {
            flag: BeamFlag::NONE,
            depth: 20.0,
            acrosstrack: -1.5,
            alongtrack: 0.25,
            ..Beam::default()
        },
        Beam::null(),
        Beam {
            flag: BeamFlag::flagged(BeamFlag::MANUAL),
            depth: 21.0,
            acrosstrack: 1.5,
            ..Beam::default()
        },
    ];
    let ping = Ping::new(
        datetime!(2021-05-04 12:30 UTC),
        -122.5,
        36.6,
        3.0,
        180.0,
        beams,
        vec![],
    );
    let mut writer = PingWriter::new(Vec::new(), Registry::with_builtin_formats().open(231)?);
    writer.write(&SwathRecord::Comment("dive 3".to_string()))?;
    writer.write(&SwathRecord::Ping(ping.clone()))?;
    let bytes = writer.into_inner()?;

    let mut driver = Registry::with_builtin_formats().open(231)?;
    let mut input = bytes.as_slice();
    assert_eq!(driver.decode_ping(&mut input)?, DataKind::Comment);
    assert_eq!(driver.extract()?, SwathRecord::Comment("dive 3".to_string()));
    assert_eq!(driver.decode_ping(&mut input)?, DataKind::Data);
    let SwathRecord::Ping(back) = driver.extract()? else {
        panic!("expected a ping")
    };
    assert_eq!(back.timestamp, ping.timestamp);
    assert_abs_diff_eq!(back.latitude, 36.6, epsilon = 1e-9);
    assert_eq!(back.beams.len(), 3);
    assert_eq!(back.beams[0].depth, 20.0);
    assert_eq!(back.beams[0].acrosstrack, -1.5);
    assert!(back.beams[1].flag.is_null());
    assert!(back.beams[2].flag.is_manual());
    assert!(driver.decode_ping(&mut input).unwrap_err().is_eof());
    Ok(())
}
