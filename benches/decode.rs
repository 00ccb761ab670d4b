use criterion::{criterion_group, criterion_main, Criterion};
use swathio::driver::Registry;
use swathio::model::{Beam, DataKind, Ping, Pixel, SwathRecord};
use swathio::reader::{PingReader, ReadParams};
use swathio::writer::PingWriter;
use time::{Duration, OffsetDateTime};

fn survey(pings: i64) -> Vec<u8> {
    let registry = Registry::with_builtin_formats();
    let mut writer = PingWriter::new(Vec::new(), registry.open(42).unwrap());
    for i in 0..pings {
        let beams = (0..151)
            .map(|j| Beam {
                depth: 1000.0 + j as f64,
                acrosstrack: 20.0 * (j as f64 - 75.0),
                amplitude: 30.0,
                ..Beam::default()
            })
            .collect();
        let pixels = (0..2000)
            .map(|j| Pixel {
                amplitude: 5000.0,
                acrosstrack: j as f64 - 1000.0,
                alongtrack: 0.0,
            })
            .collect();
        let ping = Ping::new(
            OffsetDateTime::UNIX_EPOCH + Duration::seconds(i),
            150.0,
            -30.0,
            12.0,
            270.0,
            beams,
            pixels,
        );
        writer.write(&SwathRecord::Ping(ping)).unwrap();
    }
    writer.into_inner().unwrap()
}

pub fn decode_pings(c: &mut Criterion) {
    let bytes = survey(200);
    let registry = Registry::with_builtin_formats();

    c.bench_function("decode_pings", |b| {
        b.iter(|| {
            let mut driver = registry.open(42).unwrap();
            let mut input = bytes.as_slice();
            let mut n = 0;
            while let Ok(kind) = driver.decode_ping(&mut input) {
                if kind == DataKind::Data {
                    n += 1;
                }
            }
            n
        })
    });
}

pub fn average_pings(c: &mut Criterion) {
    let bytes = survey(200);
    let registry = Registry::with_builtin_formats();

    c.bench_function("average_pings", |b| {
        b.iter(|| {
            let params = ReadParams {
                pings: 5,
                ..ReadParams::default()
            };
            let reader =
                PingReader::new(bytes.as_slice(), registry.open(42).unwrap(), params).unwrap();
            reader.count()
        })
    });
}

criterion_group!(benches, decode_pings, average_pings);
criterion_main!(benches);
