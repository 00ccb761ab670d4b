//! Print info about a swath data file
use crate::driver::Registry;
use crate::error::Result;
use crate::model::Ping;
use crate::reader::{PingReader, ReadParams};
use std::collections::BTreeMap;
use std::path::Path;
use time::OffsetDateTime;

#[derive(Debug, Default)]
struct Summary {
    pings: u64,
    comments: u64,
    notices: BTreeMap<String, u64>,
    start: Option<OffsetDateTime>,
    end: Option<OffsetDateTime>,
    bounds: Option<[f64; 4]>,
    depth: Option<(f64, f64)>,
    max_beams: usize,
    max_pixels: usize,
    good_beams: u64,
    flagged_beams: u64,
    null_beams: u64,
    distance: f64,
}

impl Summary {
    fn add_ping(&mut self, ping: &Ping) {
        self.pings += 1;
        let t = ping.timestamp;
        self.start = Some(self.start.map_or(t, |s| s.min(t)));
        self.end = Some(self.end.map_or(t, |e| e.max(t)));
        let [w, e, s, n] = self.bounds.unwrap_or([
            ping.longitude,
            ping.longitude,
            ping.latitude,
            ping.latitude,
        ]);
        self.bounds = Some([
            w.min(ping.longitude),
            e.max(ping.longitude),
            s.min(ping.latitude),
            n.max(ping.latitude),
        ]);
        self.max_beams = self.max_beams.max(ping.beams.len());
        self.max_pixels = self.max_pixels.max(ping.pixels.len());
        for beam in &ping.beams {
            if beam.flag.is_null() {
                self.null_beams += 1;
            } else if beam.flag.is_flagged() {
                self.flagged_beams += 1;
            } else {
                self.good_beams += 1;
                let (lo, hi) = self.depth.unwrap_or((beam.depth, beam.depth));
                self.depth = Some((lo.min(beam.depth), hi.max(beam.depth)));
            }
        }
    }
}

/// Print info about a swath data file
pub fn info<P: AsRef<Path>>(path: P, format: i32, params: ReadParams) -> Result<()> {
    let name = Registry::with_builtin_formats().info(format)?.name;
    let reader = PingReader::open(path.as_ref(), format, params)?;

    let mut summary = Summary::default();
    for reading in reader {
        let reading = reading?;
        if let Some(notice) = &reading.notice {
            *summary.notices.entry(notice.to_string()).or_insert(0) += 1;
        }
        if reading.comment.is_some() {
            summary.comments += 1;
        }
        if let Some(ping) = &reading.ping {
            summary.add_ping(ping);
            summary.distance += reading.distance;
        }
    }

    println!("File: {}", path.as_ref().display());
    println!("Format: {} ({})", format, name);
    println!("Number of pings: {}", summary.pings);
    println!("Number of comments: {}", summary.comments);
    if let (Some(start), Some(end)) = (summary.start, summary.end) {
        println!("Start date: {}", start);
        println!("End date: {}", end);
    }
    if let Some([w, e, s, n]) = summary.bounds {
        println!("Longitude: {:.7} to {:.7}", w, e);
        println!("Latitude: {:.7} to {:.7}", s, n);
    }
    println!("Track length: {:.3} km", summary.distance);
    println!("Maximum beams: {}", summary.max_beams);
    println!("Maximum pixels: {}", summary.max_pixels);
    println!(
        "Beams: {} good, {} flagged, {} null",
        summary.good_beams, summary.flagged_beams, summary.null_beams
    );
    if let Some((lo, hi)) = summary.depth {
        println!("Depth: {:.2} to {:.2} m", lo, hi);
    }
    if !summary.notices.is_empty() {
        println!("Notices:");
        for (notice, n) in &summary.notices {
            println!("\t{}\t{}", n, notice);
        }
    }

    Ok(())
}
