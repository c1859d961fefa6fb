#![cfg(not(tarpaulin_include))]
#![cfg(feature = "web")]
use crate::config::ChartConfig;
use crate::error::DashboardError;
use crate::table::AggregateRow;
use crate::views::{Dimension, Measure, clicks_by_date, share_by, sum_by};
use plotters::element::Pie;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::io::Cursor;

/// Chart styles the dashboard draws
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GraphType {
    /// Line graph - clicks over time
    Line,

    /// Bar graph - one bar per category
    Bar,

    /// Donut pie - relative share of each category
    Pie,
}

/// Configuration options for graph generation
#[derive(Clone, Debug)]
pub struct GraphOptions {
    /// Title displayed at the top of the graph
    pub title: String,

    /// Label for the X-axis (unused by pies)
    pub x_label: String,

    /// Label for the Y-axis (unused by pies)
    pub y_label: String,

    /// Width of the graph in pixels
    pub width: u32,

    /// Height of the graph in pixels
    pub height: u32,

    /// Type of graph to generate
    pub graph_type: GraphType,
}

/// Every chart slot of the page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChartName {
    Clicks,
    CardBrand,
    PaymentMethod,
    RevenueByDate,
    ClicksByGender,
}

impl ChartName {
    pub const ALL: [ChartName; 5] = [
        ChartName::Clicks,
        ChartName::CardBrand,
        ChartName::PaymentMethod,
        ChartName::RevenueByDate,
        ChartName::ClicksByGender,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            ChartName::Clicks => "clicks",
            ChartName::CardBrand => "card_brand",
            ChartName::PaymentMethod => "payment_method",
            ChartName::RevenueByDate => "revenue_by_date",
            ChartName::ClicksByGender => "clicks_by_gender",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        ChartName::ALL.into_iter().find(|name| name.slug() == slug)
    }

    pub fn options(self, size: ChartConfig) -> GraphOptions {
        let (title, x_label, y_label, graph_type) = match self {
            ChartName::Clicks => (
                "Number of clicks in the given date range",
                "Date",
                "Clicks",
                GraphType::Line,
            ),
            ChartName::CardBrand => ("Paid Amount by Card Brand", "", "", GraphType::Pie),
            ChartName::PaymentMethod => ("Paid Amount by Payment Method", "", "", GraphType::Pie),
            ChartName::RevenueByDate => ("Revenue by date", "Date", "Revenue ($)", GraphType::Bar),
            ChartName::ClicksByGender => ("Traffic by gender", "Gender", "Clicks", GraphType::Bar),
        };
        GraphOptions {
            title: title.to_string(),
            x_label: x_label.to_string(),
            y_label: y_label.to_string(),
            width: size.width,
            height: size.height,
            graph_type,
        }
    }

    /// Labelled values this chart plots, taken from filtered rows.
    pub fn series(self, rows: &[&AggregateRow]) -> Vec<(String, f64)> {
        match self {
            ChartName::Clicks => clicks_by_date(rows)
                .map(|p| (p.date.format("%Y-%m-%d").to_string(), p.clicks as f64))
                .collect(),
            ChartName::CardBrand => share_by(rows, Dimension::CardBrand)
                .into_iter()
                .map(|s| (s.label, s.value))
                .collect(),
            ChartName::PaymentMethod => share_by(rows, Dimension::PaymentMethod)
                .into_iter()
                .map(|s| (s.label, s.value))
                .collect(),
            ChartName::RevenueByDate => sum_by(rows, Dimension::Date, Measure::Revenue)
                .into_iter()
                .map(|s| (s.label, s.value))
                .collect(),
            ChartName::ClicksByGender => sum_by(rows, Dimension::Gender, Measure::Clicks)
                .into_iter()
                .map(|s| (s.label, s.value))
                .collect(),
        }
    }
}

const LINE_COLOR: RGBColor = RGBColor(123, 199, 255);
const BAR_COLOR: RGBColor = RGBColor(158, 202, 225);
const BAR_BORDER: RGBColor = RGBColor(8, 48, 107);

const PALETTE: [RGBColor; 8] = [
    RGBColor(178, 24, 43),
    RGBColor(214, 96, 77),
    RGBColor(244, 165, 130),
    RGBColor(146, 197, 222),
    RGBColor(67, 147, 195),
    RGBColor(33, 102, 172),
    RGBColor(255, 215, 0),
    RGBColor(72, 209, 204),
];

/// Render one chart of the page as PNG bytes
///
/// # Arguments
/// * `name` - Which chart to draw
/// * `rows` - Already filtered aggregate rows
/// * `size` - Pixel dimensions from the configuration
///
/// # Returns
/// * A Result containing the PNG image data as bytes or an error
pub fn render_chart(
    name: ChartName,
    rows: &[&AggregateRow],
    size: ChartConfig,
) -> Result<Vec<u8>, DashboardError> {
    create_graph(&name.series(rows), &name.options(size))
}

/// Creates a graph from labelled values
///
/// Empty data draws a titled "No data" placeholder instead of failing.
pub fn create_graph(
    data: &[(String, f64)],
    options: &GraphOptions,
) -> Result<Vec<u8>, DashboardError> {
    let (width, height) = (options.width, options.height);
    let mut buffer = vec![0u8; width as usize * height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(chart_err)?;

        let positive = data.iter().any(|(_, v)| *v > 0.0);
        if data.is_empty() || (options.graph_type == GraphType::Pie && !positive) {
            draw_no_data(&root, options)?;
        } else {
            match options.graph_type {
                GraphType::Line => draw_line(&root, data, options)?,
                GraphType::Bar => draw_bars(&root, data, options)?,
                GraphType::Pie => draw_pie(&root, data, options)?,
            }
        }

        root.present().map_err(chart_err)?;
    }
    encode_png(buffer, width, height)
}

type Area<'a> = DrawingArea<BitMapBackend<'a>, plotters::coord::Shift>;

fn draw_line(
    root: &Area<'_>,
    data: &[(String, f64)],
    options: &GraphOptions,
) -> Result<(), DashboardError> {
    let (min_y, max_y) = y_bounds(data);
    let last = data.len().saturating_sub(1).max(1) as f64;
    let formatter = |x: &f64| label_at(data, *x);

    let mut chart = ChartBuilder::on(root)
        .caption(&options.title, ("sans-serif", 24).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0f64..last, min_y..max_y)
        .map_err(chart_err)?;

    chart
        .configure_mesh()
        .x_desc(&options.x_label)
        .y_desc(&options.y_label)
        .x_labels(data.len().clamp(2, 8))
        .x_label_formatter(&formatter)
        .draw()
        .map_err(chart_err)?;

    chart
        .draw_series(LineSeries::new(
            data.iter().enumerate().map(|(i, (_, y))| (i as f64, *y)),
            LINE_COLOR.stroke_width(2),
        ))
        .map_err(chart_err)?;

    chart
        .draw_series(
            data.iter()
                .enumerate()
                .map(|(i, (_, y))| Circle::new((i as f64, *y), 3, LINE_COLOR.filled())),
        )
        .map_err(chart_err)?;

    Ok(())
}

fn draw_bars(
    root: &Area<'_>,
    data: &[(String, f64)],
    options: &GraphOptions,
) -> Result<(), DashboardError> {
    let (min_y, max_y) = y_bounds(data);
    let formatter = |x: &f64| label_at(data, *x);

    let mut chart = ChartBuilder::on(root)
        .caption(&options.title, ("sans-serif", 24).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(-0.5f64..data.len() as f64 - 0.5, min_y..max_y)
        .map_err(chart_err)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc(&options.x_label)
        .y_desc(&options.y_label)
        .x_labels(data.len().min(12))
        .x_label_formatter(&formatter)
        .draw()
        .map_err(chart_err)?;

    chart
        .draw_series(data.iter().enumerate().map(|(i, (_, y))| {
            let x = i as f64;
            Rectangle::new([(x - 0.35, 0.0), (x + 0.35, *y)], BAR_COLOR.mix(0.6).filled())
        }))
        .map_err(chart_err)?;

    chart
        .draw_series(data.iter().enumerate().map(|(i, (_, y))| {
            let x = i as f64;
            Rectangle::new([(x - 0.35, 0.0), (x + 0.35, *y)], BAR_BORDER.stroke_width(1))
        }))
        .map_err(chart_err)?;

    Ok(())
}

fn draw_pie(
    root: &Area<'_>,
    data: &[(String, f64)],
    options: &GraphOptions,
) -> Result<(), DashboardError> {
    let area = root
        .titled(&options.title, ("sans-serif", 24).into_font())
        .map_err(chart_err)?;

    // Slices must be positive for the angles to make sense
    let slices: Vec<&(String, f64)> = data.iter().filter(|(_, v)| *v > 0.0).collect();
    let sizes: Vec<f64> = slices.iter().map(|(_, v)| *v).collect();
    let labels: Vec<String> = slices.iter().map(|(l, _)| l.clone()).collect();
    let colors: Vec<RGBColor> = (0..slices.len()).map(palette).collect();

    let (w, h) = area.dim_in_pixel();
    let center = (w as i32 / 2, h as i32 / 2);
    let radius = w.min(h) as f64 * 0.36;

    let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
    pie.label_style(("sans-serif", 14).into_font().color(&BLACK));
    pie.percentages(("sans-serif", 12).into_font().color(&BLACK));
    area.draw(&pie).map_err(chart_err)?;

    // Hole in the middle turns the pie into a donut
    area.draw(&Circle::new(center, (radius * 0.3) as i32, WHITE.filled()))
        .map_err(chart_err)?;

    Ok(())
}

fn draw_no_data(root: &Area<'_>, options: &GraphOptions) -> Result<(), DashboardError> {
    let area = root
        .titled(&options.title, ("sans-serif", 24).into_font())
        .map_err(chart_err)?;
    let (w, h) = area.dim_in_pixel();
    let style = ("sans-serif", 18)
        .into_font()
        .color(&RGBColor(120, 120, 120))
        .pos(Pos::new(HPos::Center, VPos::Center));
    area.draw(&Text::new("No data", (w as i32 / 2, h as i32 / 2), style))
        .map_err(chart_err)?;
    Ok(())
}

fn encode_png(buffer: Vec<u8>, width: u32, height: u32) -> Result<Vec<u8>, DashboardError> {
    let img = image::RgbImage::from_raw(width, height, buffer)
        .ok_or_else(|| DashboardError::Chart("bitmap buffer has the wrong size".to_string()))?;
    let mut png = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img).write_to(&mut png, image::ImageOutputFormat::Png)?;
    Ok(png.into_inner())
}

fn chart_err<E: std::fmt::Display>(err: E) -> DashboardError {
    DashboardError::Chart(err.to_string())
}

/// Label of the category at axis position `x`, empty between categories.
fn label_at(data: &[(String, f64)], x: f64) -> String {
    let nearest = x.round();
    if nearest < 0.0 || (x - nearest).abs() > 0.01 {
        return String::new();
    }
    data.get(nearest as usize)
        .map(|(label, _)| label.clone())
        .unwrap_or_default()
}

/// Y axis range: always includes zero, with 10% headroom above the peak.
fn y_bounds(data: &[(String, f64)]) -> (f64, f64) {
    let min = data.iter().map(|(_, v)| *v).fold(0.0, f64::min);
    let max = data.iter().map(|(_, v)| *v).fold(0.0, f64::max);
    let top = if max > 0.0 { max * 1.1 } else { 1.0 };
    let bottom = if min < 0.0 { min * 1.1 } else { 0.0 };
    (bottom, top)
}

fn palette(i: usize) -> RGBColor {
    PALETTE[i % PALETTE.len()]
}
