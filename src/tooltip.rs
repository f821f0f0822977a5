//! Pointer interaction: which region is under the pointer, and what the
//! tooltip shows for it.

use crate::types::RegionFeature;
use geo::{BoundingRect, Contains, Point};
use rstar::{RTree, RTreeObject, AABB};

/// Tooltip offset from the pointer, in page pixels.
pub const OFFSET: (f64, f64) = (10.0, -28.0);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pointer {
    pub x: f64,
    pub y: f64,
}

/// Top-left corner of the tooltip panel for a pointer position.
pub fn placement(pointer: Pointer) -> (f64, f64) {
    (pointer.x + OFFSET.0, pointer.y + OFFSET.1)
}

#[derive(Debug, Clone, PartialEq)]
pub struct TooltipContent {
    pub name: String,
    pub parent: String,
    pub attainment: Option<f64>,
}

impl TooltipContent {
    /// `None` for regions without statistics.
    pub fn for_region(region: &RegionFeature) -> Option<Self> {
        region.stat.as_ref().map(|stat| TooltipContent {
            name: stat.name.clone(),
            parent: stat.parent.clone(),
            attainment: stat.attainment,
        })
    }

    pub fn heading(&self) -> String {
        format!("{}, {}", self.name, self.parent)
    }

    pub fn value_text(&self) -> String {
        match self.attainment {
            Some(v) => format!("{}%", v),
            None => "No data".to_string(),
        }
    }

    pub fn html(&self) -> String {
        format!(
            "<strong>{}</strong><br>{}",
            escape_html(&self.heading()),
            escape_html(&self.value_text())
        )
    }
}

/// Two-state tooltip. Every event overwrites the previous state.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Tooltip {
    #[default]
    Hidden,
    Shown {
        content: TooltipContent,
        left: f64,
        top: f64,
    },
}

impl Tooltip {
    /// Pointer entered `region`. Regions without statistics hide the tooltip.
    pub fn enter(&mut self, region: &RegionFeature, pointer: Pointer) {
        *self = match TooltipContent::for_region(region) {
            Some(content) => {
                let (left, top) = placement(pointer);
                Tooltip::Shown { content, left, top }
            }
            None => Tooltip::Hidden,
        };
    }

    pub fn leave(&mut self) {
        *self = Tooltip::Hidden;
    }

    pub fn is_visible(&self) -> bool {
        matches!(self, Tooltip::Shown { .. })
    }
}

struct RegionEnvelope {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for RegionEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

/// Spatial index over region bounding boxes for hit testing.
pub struct RegionIndex<'a> {
    regions: &'a [RegionFeature],
    tree: RTree<RegionEnvelope>,
}

impl<'a> RegionIndex<'a> {
    pub fn new(regions: &'a [RegionFeature]) -> Self {
        let items = regions
            .iter()
            .enumerate()
            .filter_map(|(index, region)| {
                let rect = region.geometry.bounding_rect()?;
                Some(RegionEnvelope {
                    index,
                    aabb: AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
                })
            })
            .collect();
        RegionIndex {
            regions,
            tree: RTree::bulk_load(items),
        }
    }

    /// Region under the pointer. Where regions overlap, the one drawn last
    /// (highest index) is on top.
    pub fn hit(&self, pointer: Pointer) -> Option<&'a RegionFeature> {
        let point = Point::new(pointer.x, pointer.y);
        let envelope = AABB::from_point([pointer.x, pointer.y]);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|candidate| candidate.index)
            .filter(|&i| self.regions[i].geometry.contains(&point))
            .max()
            .map(|i| &self.regions[i])
    }
}

pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
