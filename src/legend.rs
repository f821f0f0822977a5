use crate::config::LegendConfig;
use crate::render::fmt_num;
use crate::scale::ColorScale;
use crate::tooltip::escape_html;
use std::fmt::Write;

const TICK_SIZE: f64 = 6.0;

/// Axis ticks for the bucket boundaries: x offset along the swatch row and
/// the integer label.
pub fn ticks(scale: &ColorScale, swatch_width: f64) -> Vec<(f64, String)> {
    let (min, max) = scale.domain();
    let length = swatch_width * scale.bucket_count() as f64;
    scale
        .bucket_boundaries()
        .iter()
        // Halves round away from zero; + 0.0 keeps "-0" out of the labels.
        .map(|&t| ((t - min) * length / (max - min), format!("{:.0}", t.round() + 0.0)))
        .collect()
}

pub fn render_legend(scale: &ColorScale, config: &LegendConfig) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        r#"<g id="legend" transform="translate({},{})">"#,
        fmt_num(config.x),
        fmt_num(config.y)
    );

    for (i, color) in scale.palette().iter().enumerate() {
        let _ = write!(
            out,
            r#"<rect x="{}" y="20" width="{}" height="{}" fill="{}"/>"#,
            fmt_num(20.0 + i as f64 * config.swatch_width),
            fmt_num(config.swatch_width),
            fmt_num(config.swatch_height),
            color
        );
    }

    // Axis sits just under the swatches, offset half a pixel for crisp lines.
    let length = config.swatch_width * scale.bucket_count() as f64;
    let _ = write!(
        out,
        r#"<g id="color-legend-axis" transform="translate(19.5,{})" fill="none" font-size="10" font-family="sans-serif" text-anchor="middle">"#,
        fmt_num(20.0 + config.swatch_height)
    );
    let _ = write!(
        out,
        r#"<path class="domain" stroke="currentColor" d="M0.5,{t}V0.5H{}V{t}"/>"#,
        fmt_num(length + 0.5),
        t = fmt_num(TICK_SIZE)
    );
    for (x, label) in ticks(scale, config.swatch_width) {
        let _ = write!(
            out,
            r#"<g class="tick" transform="translate({},0)"><line stroke="currentColor" y2="{}"/><text fill="currentColor" y="{}" dy="0.71em">{}</text></g>"#,
            fmt_num(x + 0.5),
            fmt_num(TICK_SIZE),
            fmt_num(TICK_SIZE + 3.0),
            label
        );
    }
    out.push_str("</g>");

    let _ = write!(
        out,
        r#"<text x="100" y="10" class="legend-text">{}</text>"#,
        escape_html(&config.caption)
    );
    out.push_str("</g>");
    out
}
