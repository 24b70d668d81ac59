//! Track file readers.
//!
//! Every supported format yields the same thing: the recorded positions in
//! file order. The format comes from the file content when it can be
//! recognised (gzip magic, FIT signature, XML) and from the extension
//! otherwise.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use log::{debug, info, warn};

use crate::error::TrackError;
use crate::fit;
use crate::geo_utils;
use crate::{Bounds, GpsPoint};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Recorded track encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackFormat {
    /// GPX XML, positions from track points.
    Gpx,
    /// Garmin FIT, positions from `record` messages.
    Fit,
    /// Gzip around one of the others; the inner format is recognised
    /// after decompression.
    Gzip,
}

impl TrackFormat {
    /// Format implied by the file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "gpx" => Some(TrackFormat::Gpx),
            "fit" => Some(TrackFormat::Fit),
            "gz" => Some(TrackFormat::Gzip),
            _ => None,
        }
    }

    /// Format recognised from the leading bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&GZIP_MAGIC) {
            return Some(TrackFormat::Gzip);
        }
        if fit::is_fit(bytes) {
            return Some(TrackFormat::Fit);
        }
        let text = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
        match text.iter().copied().find(|b| !b.is_ascii_whitespace()) {
            Some(b'<') => Some(TrackFormat::Gpx),
            _ => None,
        }
    }

    /// Content wins over the extension.
    pub fn detect(path: &Path, bytes: &[u8]) -> Option<Self> {
        Self::sniff(bytes).or_else(|| Self::from_path(path))
    }
}

/// Positions of every track point in a GPX document, in track and
/// segment order.
///
/// Parsing is done by the `gpx` crate; only latitude and longitude are
/// kept. Waypoints and routes are not activity data and are ignored.
pub fn parse_gpx(bytes: &[u8]) -> Result<Vec<GpsPoint>, TrackError> {
    let gpx = gpx::read(bytes).map_err(|e| TrackError::Gpx(e.to_string()))?;

    let mut points = Vec::new();
    for track in gpx.tracks {
        for segment in track.segments {
            points.extend(segment.points.iter().map(|waypoint| {
                let point = waypoint.point();
                GpsPoint::new(point.y(), point.x())
            }));
        }
    }

    Ok(points)
}

/// Decode a track held in memory.
pub fn read_track_bytes(bytes: &[u8], format: TrackFormat) -> Result<Vec<GpsPoint>, TrackError> {
    match format {
        TrackFormat::Gpx => parse_gpx(bytes),
        TrackFormat::Fit => fit::read_fit(bytes),
        TrackFormat::Gzip => {
            let mut inflated = Vec::new();
            GzDecoder::new(bytes).read_to_end(&mut inflated)?;
            match TrackFormat::sniff(&inflated) {
                Some(TrackFormat::Gzip) | None => Err(TrackError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "gzip content is neither GPX nor FIT",
                ))),
                Some(inner) => read_track_bytes(&inflated, inner),
            }
        }
    }
}

/// Read and decode one track file.
pub fn read_track(path: &Path) -> Result<Vec<GpsPoint>, TrackError> {
    let bytes = fs::read(path)?;
    let format =
        TrackFormat::detect(path, &bytes).ok_or_else(|| TrackError::UnsupportedFormat(path.to_path_buf()))?;
    let points = read_track_bytes(&bytes, format)?;
    debug!("[Tracks] {}: {:?}, {} points", path.display(), format, points.len());
    Ok(points)
}

/// Track files (by extension) directly inside `dir`, sorted by name.
pub fn track_files(dir: &Path) -> Result<Vec<PathBuf>, TrackError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && TrackFormat::from_path(&path).is_some() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Points of many activities, the render input.
#[derive(Debug, Clone, Default)]
pub struct TrackCollection {
    pub points: Vec<GpsPoint>,
    /// Files that decoded successfully.
    pub activity_count: u32,
}

impl TrackCollection {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The points strictly inside `bounds`, same activity count. An empty
    /// result means the period has nothing to render.
    pub fn within(&self, bounds: &Bounds) -> TrackCollection {
        TrackCollection {
            points: geo_utils::filter_to_bounds(&self.points, bounds),
            activity_count: self.activity_count,
        }
    }

    fn push(&mut self, points: Vec<GpsPoint>) {
        self.points.extend(points);
        self.activity_count += 1;
    }
}

/// Read many track files. Files that fail to decode are skipped with a
/// warning; the rest keep their input order.
pub fn read_tracks<P: AsRef<Path> + Sync>(paths: &[P]) -> TrackCollection {
    let start = std::time::Instant::now();

    let load = |path: &P| {
        let path = path.as_ref();
        match read_track(path) {
            Ok(points) => Some(points),
            Err(e) => {
                warn!("[Tracks] Skipping {}: {}", path.display(), e);
                None
            }
        }
    };

    #[cfg(feature = "parallel")]
    let decoded: Vec<Option<Vec<GpsPoint>>> = {
        use rayon::prelude::*;
        paths.par_iter().map(load).collect()
    };

    #[cfg(not(feature = "parallel"))]
    let decoded: Vec<Option<Vec<GpsPoint>>> = paths.iter().map(load).collect();

    let mut collection = TrackCollection::default();
    for points in decoded.into_iter().flatten() {
        collection.push(points);
    }

    info!(
        "[Tracks] {} of {} files decoded, {} points in {:?}",
        collection.activity_count,
        paths.len(),
        collection.points.len(),
        start.elapsed()
    );

    collection
}
