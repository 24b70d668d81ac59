//! Offline heatmap of generated loops, no tile server needed.
//!
//! Run with: cargo run --example synthetic_heatmap -- [output.png]

use std::f64::consts::PI;
use std::path::PathBuf;

use activity_heatmap::{render_heatmap, ColorRamp, GpsPoint, HeatmapConfig, PlaceholderTiles};

/// A lap around an ellipse with a slight per-lap wobble, one point every
/// few meters.
fn lap(center: GpsPoint, radius_deg: f64, wobble: f64, samples: usize) -> Vec<GpsPoint> {
    (0..samples)
        .map(|i| {
            let t = 2.0 * PI * i as f64 / samples as f64;
            let r = radius_deg * (1.0 + wobble * (5.0 * t).sin());
            GpsPoint::new(
                center.latitude + r * t.sin(),
                center.longitude + 1.6 * r * t.cos(),
            )
        })
        .collect()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let output = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("synthetic_heatmap.png"));

    let aachen = GpsPoint::new(50.7753, 6.0839);
    let laps = 12;
    let mut points = Vec::new();
    for i in 0..laps {
        let wobble = 0.02 * (i % 4) as f64;
        points.extend(lap(aachen, 0.02 + 0.001 * i as f64, wobble, 3000));
    }
    // One out-and-back commute
    points.extend(lap(GpsPoint::new(50.80, 6.05), 0.005, 0.0, 800));

    println!("Generated {} points from {} activities", points.len(), laps + 1);

    for ramp in [ColorRamp::Hot, ColorRamp::Jet] {
        let config = HeatmapConfig::default()
            .with_zoom(12)
            .with_sigma(2)
            .with_color_ramp(ramp);

        let heatmap = render_heatmap(&points, laps + 1, &config, &PlaceholderTiles)?;

        let path = match ramp {
            ColorRamp::Hot => output.clone(),
            _ => output.with_file_name(format!(
                "{}_{}.png",
                output.file_stem().and_then(|s| s.to_str()).unwrap_or("synthetic_heatmap"),
                ramp
            )),
        };
        heatmap.save_png(&path)?;

        println!(
            "{}: {}x{} px over tiles {}..={} x {}..={} -> {}",
            ramp,
            heatmap.width(),
            heatmap.height(),
            heatmap.range().x_min,
            heatmap.range().x_max,
            heatmap.range().y_min,
            heatmap.range().y_max,
            path.display()
        );
    }

    Ok(())
}
