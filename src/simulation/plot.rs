//! SVG line chart of actual vs predicted values

use std::fs;
use std::path::Path;
use tracing::info;

use crate::error::Result;

const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 60.0;
const Y_TICKS: usize = 5;
const X_TICKS: usize = 6;

/// Smallest width that leaves a plot area between the margins
pub const MIN_CHART_WIDTH: u32 = (MARGIN_LEFT + MARGIN_RIGHT) as u32 + 1;
/// Smallest height that leaves a plot area between the margins
pub const MIN_CHART_HEIGHT: u32 = (MARGIN_TOP + MARGIN_BOTTOM) as u32 + 1;

const ACTUAL_COLOR: &str = "#1f77b4";
const PREDICTED_COLOR: &str = "#ff7f0e";

/// Chart labels and size
#[derive(Debug, Clone)]
pub struct ChartOptions {
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 600,
            title: "Actual vs Predicted Prices".to_string(),
            x_label: "Time Steps".to_string(),
            y_label: "Price (Standardized)".to_string(),
        }
    }
}

/// Maps data coordinates to pixels inside the plot area
struct Frame {
    left: f64,
    top: f64,
    width: f64,
    height: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
}

impl Frame {
    fn x(&self, step: f64) -> f64 {
        if self.x_max <= 0.0 {
            self.left
        } else {
            self.left + step / self.x_max * self.width
        }
    }

    fn y(&self, value: f64) -> f64 {
        self.top + (self.y_max - value) / (self.y_max - self.y_min) * self.height
    }
}

fn value_range(actual: &[f64], predicted: &[f64]) -> (f64, f64) {
    let (min, max) = actual
        .iter()
        .chain(predicted)
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));

    if !min.is_finite() {
        return (-1.0, 1.0);
    }
    if (max - min).abs() < 1e-12 {
        return (min - 1.0, max + 1.0);
    }
    let pad = (max - min) * 0.05;
    (min - pad, max + pad)
}

fn polyline(values: &[f64], frame: &Frame, color: &str, dashed: bool) -> String {
    let points: Vec<String> = values
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_finite())
        .map(|(i, v)| format!("{:.2},{:.2}", frame.x(i as f64), frame.y(*v)))
        .collect();

    let dash = if dashed { " stroke-dasharray=\"6,4\"" } else { "" };
    format!(
        "  <polyline fill=\"none\" stroke=\"{}\" stroke-width=\"1.5\"{} points=\"{}\"/>\n",
        color,
        dash,
        points.join(" ")
    )
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Renders both series as an SVG document.
pub fn render_svg(actual: &[f64], predicted: &[f64], options: &ChartOptions) -> String {
    let width = options.width as f64;
    let height = options.height as f64;
    let steps = actual.len().max(predicted.len());
    let (y_min, y_max) = value_range(actual, predicted);

    let frame = Frame {
        left: MARGIN_LEFT,
        top: MARGIN_TOP,
        width: width - MARGIN_LEFT - MARGIN_RIGHT,
        height: height - MARGIN_TOP - MARGIN_BOTTOM,
        x_max: steps.saturating_sub(1) as f64,
        y_min,
        y_max,
    };
    let bottom = frame.top + frame.height;
    let right = frame.left + frame.width;

    let mut svg = String::new();
    svg.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{}\" height=\"{}\" viewBox=\"0 0 {} {}\">\n",
        options.width, options.height, options.width, options.height
    ));
    svg.push_str("  <style>\n");
    svg.push_str("    .label { font-family: sans-serif; font-size: 12px; fill: #333; }\n");
    svg.push_str("    .title { font-family: sans-serif; font-size: 16px; font-weight: bold; fill: #222; }\n");
    svg.push_str("    .grid { stroke: #ddd; stroke-width: 1; }\n");
    svg.push_str("  </style>\n");
    svg.push_str("  <rect width=\"100%\" height=\"100%\" fill=\"#ffffff\"/>\n");

    svg.push_str(&format!(
        "  <text class=\"title\" x=\"{:.1}\" y=\"30\" text-anchor=\"middle\">{}</text>\n",
        width / 2.0,
        escape(&options.title)
    ));

    // Horizontal grid and y tick labels
    for i in 0..=Y_TICKS {
        let value = y_min + (y_max - y_min) * i as f64 / Y_TICKS as f64;
        let y = frame.y(value);
        svg.push_str(&format!(
            "  <line class=\"grid\" x1=\"{:.1}\" y1=\"{:.1}\" x2=\"{:.1}\" y2=\"{:.1}\"/>\n",
            frame.left, y, right, y
        ));
        svg.push_str(&format!(
            "  <text class=\"label\" x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"end\">{:.2}</text>\n",
            frame.left - 8.0,
            y + 4.0,
            value
        ));
    }

    // x tick labels
    if steps > 1 {
        for i in 0..=X_TICKS {
            let step = (frame.x_max * i as f64 / X_TICKS as f64).round();
            svg.push_str(&format!(
                "  <text class=\"label\" x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"middle\">{}</text>\n",
                frame.x(step),
                bottom + 18.0,
                step as usize
            ));
        }
    }

    // Axes
    svg.push_str(&format!(
        "  <line x1=\"{0:.1}\" y1=\"{1:.1}\" x2=\"{0:.1}\" y2=\"{2:.1}\" stroke=\"#333\"/>\n",
        frame.left, frame.top, bottom
    ));
    svg.push_str(&format!(
        "  <line x1=\"{:.1}\" y1=\"{2:.1}\" x2=\"{1:.1}\" y2=\"{2:.1}\" stroke=\"#333\"/>\n",
        frame.left, right, bottom
    ));

    svg.push_str(&format!(
        "  <text class=\"label\" x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"middle\">{}</text>\n",
        frame.left + frame.width / 2.0,
        height - 15.0,
        escape(&options.x_label)
    ));
    svg.push_str(&format!(
        "  <text class=\"label\" x=\"20\" y=\"{0:.1}\" text-anchor=\"middle\" transform=\"rotate(-90 20 {0:.1})\">{1}</text>\n",
        frame.top + frame.height / 2.0,
        escape(&options.y_label)
    ));

    svg.push_str(&polyline(actual, &frame, ACTUAL_COLOR, false));
    svg.push_str(&polyline(predicted, &frame, PREDICTED_COLOR, true));

    // Legend
    let lx = frame.left + 15.0;
    let ly = frame.top + 15.0;
    svg.push_str(&format!(
        "  <rect x=\"{:.1}\" y=\"{:.1}\" width=\"170\" height=\"48\" fill=\"#fff\" stroke=\"#ccc\"/>\n",
        lx - 8.0,
        ly - 12.0
    ));
    for (row, (label, color, dashed)) in [
        ("Actual Prices", ACTUAL_COLOR, false),
        ("Predicted Prices", PREDICTED_COLOR, true),
    ]
    .iter()
    .enumerate()
    {
        let y = ly + row as f64 * 20.0;
        let dash = if *dashed { " stroke-dasharray=\"6,4\"" } else { "" };
        svg.push_str(&format!(
            "  <line x1=\"{:.1}\" y1=\"{:.1}\" x2=\"{:.1}\" y2=\"{:.1}\" stroke=\"{}\" stroke-width=\"2\"{}/>\n",
            lx,
            y,
            lx + 30.0,
            y,
            color,
            dash
        ));
        svg.push_str(&format!(
            "  <text class=\"label\" x=\"{:.1}\" y=\"{:.1}\">{}</text>\n",
            lx + 38.0,
            y + 4.0,
            label
        ));
    }

    svg.push_str("</svg>\n");
    svg
}

/// Renders and writes the chart, creating the parent directory if needed.
pub fn write_svg<P: AsRef<Path>>(
    path: P,
    actual: &[f64],
    predicted: &[f64],
    options: &ChartOptions,
) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, render_svg(actual, predicted, options))?;
    info!("Chart saved to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_contains_series_and_labels() {
        let actual = [1.0, 2.0, 3.0, 2.5];
        let predicted = [1.1, 1.9, 2.8, 2.7];
        let svg = render_svg(&actual, &predicted, &ChartOptions::default());

        assert!(svg.starts_with("<?xml"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert_eq!(svg.matches("<polyline").count(), 2);
        assert!(svg.contains("stroke-dasharray"));
        assert!(svg.contains("Actual vs Predicted Prices"));
        assert!(svg.contains("Price (Standardized)"));
        assert!(svg.contains("Time Steps"));
    }

    #[test]
    fn test_points_stay_inside_plot_area() {
        let actual: Vec<f64> = (0..50).map(|i| (i as f64 * 0.3).sin() * 100.0).collect();
        let predicted: Vec<f64> = actual.iter().map(|v| v * 0.9).collect();
        let options = ChartOptions::default();
        let svg = render_svg(&actual, &predicted, &options);

        let line = svg.lines().find(|l| l.contains("<polyline")).unwrap();
        let points = line.split("points=\"").nth(1).unwrap().trim_end_matches("\"/>");
        for point in points.split(' ') {
            let (x, y) = point.split_once(',').unwrap();
            let x: f64 = x.parse().unwrap();
            let y: f64 = y.parse().unwrap();
            assert!(x >= MARGIN_LEFT - 1e-6 && x <= options.width as f64 - MARGIN_RIGHT + 1e-6);
            assert!(y >= MARGIN_TOP - 1e-6 && y <= options.height as f64 - MARGIN_BOTTOM + 1e-6);
        }
    }

    #[test]
    fn test_smallest_chart_keeps_points_in_frame() {
        let options = ChartOptions {
            width: MIN_CHART_WIDTH,
            height: MIN_CHART_HEIGHT,
            ..Default::default()
        };
        let svg = render_svg(&[1.0, 3.0, 2.0], &[1.5, 2.5, 2.0], &options);

        let line = svg.lines().find(|l| l.contains("<polyline")).unwrap();
        let points = line.split("points=\"").nth(1).unwrap().trim_end_matches("\"/>");
        let xs: Vec<f64> = points
            .split(' ')
            .map(|p| p.split_once(',').unwrap().0.parse().unwrap())
            .collect();
        assert!(xs.windows(2).all(|w| w[1] > w[0]));
        assert!(xs.iter().all(|&x| x >= MARGIN_LEFT && x <= options.width as f64 - MARGIN_RIGHT));
    }

    #[test]
    fn test_flat_and_empty_series() {
        let svg = render_svg(&[5.0, 5.0], &[5.0, 5.0], &ChartOptions::default());
        assert!(!svg.contains("NaN"));

        let svg = render_svg(&[], &[], &ChartOptions::default());
        assert!(!svg.contains("NaN"));
    }

    #[test]
    fn test_title_is_escaped() {
        let options = ChartOptions {
            title: "A < B & C".to_string(),
            ..Default::default()
        };
        let svg = render_svg(&[1.0], &[1.0], &options);
        assert!(svg.contains("A &lt; B &amp; C"));
    }

    #[test]
    fn test_write_svg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("charts").join("sim.svg");
        write_svg(&path, &[1.0, 2.0], &[1.5, 2.5], &ChartOptions::default()).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("<svg"));
    }
}
