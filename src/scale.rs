use crate::color::Color;
use crate::types::StatRecord;
use thiserror::Error;
use tracing::warn;

/// Domain used when no record carries a numeric value.
pub const FALLBACK_DOMAIN: (f64, f64) = (0.0, 100.0);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScaleError {
    #[error("palette must contain at least one color")]
    EmptyPalette,
}

/// Quantized scale: the domain split into one equal-width bucket per color.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorScale {
    palette: Vec<Color>,
    min: f64,
    max: f64,
    thresholds: Vec<f64>,
}

impl ColorScale {
    /// A single-valued domain `[v, v]` is widened to `[v, v + 1]`, or further
    /// when `v` is too large for a unit step to give distinct thresholds.
    pub fn new(domain: (f64, f64), palette: Vec<Color>) -> Result<Self, ScaleError> {
        if palette.is_empty() {
            return Err(ScaleError::EmptyPalette);
        }
        let (mut min, mut max) = if domain.0 <= domain.1 {
            domain
        } else {
            (domain.1, domain.0)
        };
        if !(min.is_finite() && max.is_finite()) {
            (min, max) = FALLBACK_DOMAIN;
        }
        let k = palette.len();
        if min == max {
            // Each bucket must stay wider than the float spacing around v.
            max = min + 1.0_f64.max(min.abs() * f64::EPSILON * 2.0 * k as f64);
        }

        let width = (max - min) / k as f64;
        let thresholds = (0..=k)
            .map(|i| if i == k { max } else { min + width * i as f64 })
            .collect();

        Ok(ColorScale {
            palette,
            min,
            max,
            thresholds,
        })
    }

    pub fn from_records(records: &[StatRecord], palette: Vec<Color>) -> Result<Self, ScaleError> {
        let domain = extent(records.iter().filter_map(|r| r.attainment)).unwrap_or_else(|| {
            warn!("No numeric attainment values; using the default domain");
            FALLBACK_DOMAIN
        });
        if domain.0 == domain.1 {
            warn!(value = domain.0, "All attainment values are equal; widening the scale domain");
        }
        Self::new(domain, palette)
    }

    pub fn domain(&self) -> (f64, f64) {
        (self.min, self.max)
    }

    pub fn palette(&self) -> &[Color] {
        &self.palette
    }

    pub fn bucket_count(&self) -> usize {
        self.palette.len()
    }

    /// `bucket_count() + 1` ascending thresholds from min to max.
    pub fn bucket_boundaries(&self) -> &[f64] {
        &self.thresholds
    }

    /// Bucket holding `value`. Values on an inner threshold fall into the
    /// lower bucket; out-of-domain values clamp to the first or last bucket.
    pub fn bucket_of(&self, value: f64) -> usize {
        let upper = &self.thresholds[1..];
        upper
            .partition_point(|&t| t < value)
            .min(self.palette.len() - 1)
    }

    pub fn color_of(&self, value: f64) -> Color {
        self.palette[self.bucket_of(value)]
    }

    pub fn invert_extent(&self, bucket: usize) -> Option<(f64, f64)> {
        if bucket >= self.palette.len() {
            return None;
        }
        Some((self.thresholds[bucket], self.thresholds[bucket + 1]))
    }
}

/// Min and max of the finite values, or `None` when there are none.
pub fn extent(values: impl IntoIterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::PURPLE_GREEN;
    use crate::types::RegionId;
    use proptest::prelude::*;

    fn scale(min: f64, max: f64) -> ColorScale {
        ColorScale::new((min, max), PURPLE_GREEN.to_vec()).unwrap()
    }

    fn record(value: Option<f64>) -> StatRecord {
        StatRecord {
            id: RegionId::Code(1),
            name: "Somewhere County".to_string(),
            parent: "ZZ".to_string(),
            attainment: value,
        }
    }

    #[test]
    fn ten_to_ninety_has_width_eight() {
        let s = scale(10.0, 90.0);
        let expected: Vec<f64> = (0..=10).map(|i| 10.0 + 8.0 * i as f64).collect();
        assert_eq!(s.bucket_boundaries(), expected.as_slice());
    }

    #[test]
    fn boundary_values_fall_into_lower_bucket() {
        let s = scale(10.0, 90.0);
        assert_eq!(s.bucket_of(10.0), 0);
        assert_eq!(s.bucket_of(18.0), 0);
        assert_eq!(s.bucket_of(18.5), 1);
        assert_eq!(s.bucket_of(82.0), 8);
        assert_eq!(s.bucket_of(90.0), 9);
        assert_eq!(s.color_of(90.0), PURPLE_GREEN[9]);
    }

    #[test]
    fn out_of_domain_values_clamp() {
        let s = scale(10.0, 90.0);
        assert_eq!(s.bucket_of(-5.0), 0);
        assert_eq!(s.bucket_of(1000.0), 9);
    }

    #[test]
    fn degenerate_domain_is_widened() {
        let records = vec![record(Some(50.0)), record(Some(50.0))];
        let s = ColorScale::from_records(&records, PURPLE_GREEN.to_vec()).unwrap();
        assert_eq!(s.domain(), (50.0, 51.0));
        let bounds = s.bucket_boundaries();
        assert_eq!(bounds.len(), 11);
        assert!(bounds.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(s.color_of(50.0), PURPLE_GREEN[0]);
    }

    #[test]
    fn large_degenerate_domain_keeps_distinct_thresholds() {
        for v in [1e17, -1e17, 1e300] {
            let s = scale(v, v);
            let (min, max) = s.domain();
            assert!(min < max);
            let bounds = s.bucket_boundaries();
            assert_eq!(bounds.len(), 11);
            assert!(bounds.windows(2).all(|w| w[0] < w[1]), "{:?}", bounds);
            assert_eq!(s.color_of(v), PURPLE_GREEN[0]);
        }
    }

    #[test]
    fn missing_values_are_skipped_not_zeroed() {
        let records = vec![record(Some(20.0)), record(None), record(Some(40.0))];
        let s = ColorScale::from_records(&records, PURPLE_GREEN.to_vec()).unwrap();
        assert_eq!(s.domain(), (20.0, 40.0));
    }

    #[test]
    fn no_values_use_fallback_domain() {
        let s = ColorScale::from_records(&[record(None)], PURPLE_GREEN.to_vec()).unwrap();
        assert_eq!(s.domain(), FALLBACK_DOMAIN);
    }

    #[test]
    fn empty_palette_is_rejected() {
        assert_eq!(ColorScale::new((0.0, 1.0), Vec::new()), Err(ScaleError::EmptyPalette));
    }

    #[test]
    fn invert_extent_matches_boundaries() {
        let s = scale(10.0, 90.0);
        assert_eq!(s.invert_extent(0), Some((10.0, 18.0)));
        assert_eq!(s.invert_extent(9), Some((82.0, 90.0)));
        assert_eq!(s.invert_extent(10), None);
    }

    proptest! {
        #[test]
        fn color_matches_containing_bucket(
            values in prop::collection::vec(0.0f64..100.0, 2..50),
            probe in 0usize..50,
        ) {
            let (lo, hi) = extent(values.iter().copied()).unwrap();
            prop_assume!(lo < hi);
            let s = scale(lo, hi);
            let v = values[probe % values.len()];
            let b = s.bucket_of(v);
            let (start, end) = s.invert_extent(b).unwrap();
            prop_assert!(v <= end);
            prop_assert!(b == 0 || v > start);
            prop_assert_eq!(s.color_of(v), s.palette()[b]);
        }
    }
}
