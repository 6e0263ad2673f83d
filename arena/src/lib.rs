#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Polygonal playable-region queries for the Snowbound encounter.
//!
//! The [`AreaManager`] owns an ordered set of named [`Region`] values, each
//! a closed polygon in the horizontal plane with a vertical band. It answers
//! containment, nearest-region, and clamping queries for the agent
//! simulation and the spawner. Regions with fewer than three vertices are
//! treated as absent by every query; a misconfigured region degrades the
//! answer, never the simulation.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Distance a clamped point is nudged inward from the boundary so the
/// result lies strictly inside the region.
const INTERIOR_NUDGE: f32 = 0.1;

/// Named polygonal region with vertical bounds.
///
/// The boundary is a closed polygon on the XZ plane; insertion order of the
/// vertices is the winding order, and the last vertex connects back to the
/// first. Winding direction does not matter to any query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Region {
    name: String,
    boundary: Vec<Vec3>,
    min_height: f32,
    max_height: f32,
    active: bool,
}

impl Region {
    /// Creates an active region from a vertex loop and a vertical band.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        boundary: Vec<Vec3>,
        min_height: f32,
        max_height: f32,
    ) -> Self {
        Self {
            name: name.into(),
            boundary,
            min_height,
            max_height,
            active: true,
        }
    }

    /// Display name of the region. Names are not unique keys; regions that
    /// share a name are still independent.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ordered vertex loop that bounds the region.
    #[must_use]
    pub fn boundary(&self) -> &[Vec3] {
        &self.boundary
    }

    /// Lower edge of the vertical band.
    #[must_use]
    pub const fn min_height(&self) -> f32 {
        self.min_height
    }

    /// Upper edge of the vertical band.
    #[must_use]
    pub const fn max_height(&self) -> f32 {
        self.max_height
    }

    /// Whether queries consider this region at all.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Enables or disables the region for all queries.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Reports whether the region has too few vertices to form a polygon.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.boundary.len() < 3
    }

    /// Mean of the boundary vertices.
    ///
    /// Degenerate regions yield the origin.
    #[must_use]
    pub fn centroid(&self) -> Vec3 {
        if self.boundary.is_empty() {
            return Vec3::ZERO;
        }
        let sum: Vec3 = self.boundary.iter().copied().sum();
        sum / self.boundary.len() as f32
    }

    /// Horizontal axis-aligned bounding box of the boundary, as
    /// `(min, max)` corners on the XZ plane. `None` for degenerate regions.
    #[must_use]
    pub fn horizontal_bounds(&self) -> Option<(Vec2, Vec2)> {
        if self.is_degenerate() {
            return None;
        }
        let mut min = horizontal(self.boundary[0]);
        let mut max = min;
        for vertex in &self.boundary[1..] {
            let flat = horizontal(*vertex);
            min = min.min(flat);
            max = max.max(flat);
        }
        Some((min, max))
    }

    /// Tests whether `point` lies inside the region.
    ///
    /// The polygon test is even-odd ray casting on the XZ plane; the height
    /// band is checked separately. Degenerate regions match nothing.
    #[must_use]
    pub fn contains(&self, point: Vec3) -> bool {
        if self.is_degenerate() {
            return false;
        }
        if point.y < self.min_height || point.y > self.max_height {
            return false;
        }
        point_in_polygon(horizontal(point), &self.boundary)
    }
}

/// Owns the encounter's region set and answers spatial queries.
///
/// The region list is read-only during play; runtime edits go through
/// [`AreaManager::replace_regions`], which swaps the whole snapshot between
/// ticks so a containment query never observes a half-edited polygon.
#[derive(Clone, Debug, Default)]
pub struct AreaManager {
    regions: Vec<Region>,
}

impl AreaManager {
    /// Creates a manager over the provided regions, in insertion order.
    ///
    /// Degenerate regions are kept (so indices stay stable for activation
    /// toggling) but reported, since every query will skip them.
    #[must_use]
    pub fn new(regions: Vec<Region>) -> Self {
        for region in &regions {
            if region.is_degenerate() {
                log::warn!(
                    "region '{}' has {} boundary points and will never match",
                    region.name(),
                    region.boundary().len()
                );
            }
        }
        Self { regions }
    }

    /// Regions in insertion order.
    #[must_use]
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Atomically replaces the whole region snapshot.
    pub fn replace_regions(&mut self, regions: Vec<Region>) {
        self.regions = Self::new(regions).regions;
    }

    /// Toggles the region at `index`. Returns `false` when out of range.
    pub fn set_region_active(&mut self, index: usize, active: bool) -> bool {
        match self.regions.get_mut(index) {
            Some(region) => {
                region.set_active(active);
                true
            }
            None => false,
        }
    }

    /// Tests whether `point` lies inside any active region.
    #[must_use]
    pub fn contains(&self, point: Vec3) -> bool {
        self.regions
            .iter()
            .any(|region| region.is_active() && region.contains(point))
    }

    /// Returns the active region whose boundary is closest to `point`, or
    /// `None` when no active region has a usable polygon.
    #[must_use]
    pub fn nearest_region(&self, point: Vec3) -> Option<&Region> {
        let mut nearest: Option<(&Region, f32)> = None;
        for region in &self.regions {
            if !region.is_active() || region.is_degenerate() {
                continue;
            }
            let boundary_point = closest_point_on_boundary(point, region.boundary());
            let distance = point.distance(boundary_point);
            let closer = nearest.map_or(true, |(_, best)| distance < best);
            if closer {
                nearest = Some((region, distance));
            }
        }
        nearest.map(|(region, _)| region)
    }

    /// Clamps `point` into its nearest active region.
    ///
    /// Points already inside their nearest region are returned unchanged,
    /// which makes the operation idempotent. Points outside are projected
    /// onto the nearest boundary edge and nudged a small fixed distance
    /// toward the region centroid so the result lies strictly inside. With
    /// no usable region the point passes through untouched.
    #[must_use]
    pub fn clamp_to_nearest(&self, point: Vec3) -> Vec3 {
        let Some(region) = self.nearest_region(point) else {
            return point;
        };
        if region.contains(point) {
            return point;
        }
        let boundary_point = closest_point_on_boundary(point, region.boundary());
        let inward = region.centroid() - boundary_point;
        boundary_point + inward.normalize_or_zero() * INTERIOR_NUDGE
    }
}

/// Returns the closest point to `point` on the closed boundary loop.
///
/// Each edge is considered with wrap-around (the last vertex connects back
/// to the first); the result is the global minimum over all edges. An empty
/// loop returns `point` itself.
#[must_use]
pub fn closest_point_on_boundary(point: Vec3, boundary: &[Vec3]) -> Vec3 {
    let mut closest = point;
    let mut best = f32::MAX;
    for (index, start) in boundary.iter().enumerate() {
        let end = boundary[(index + 1) % boundary.len()];
        let candidate = closest_point_on_segment(*start, end, point);
        let distance = point.distance(candidate);
        if distance < best {
            best = distance;
            closest = candidate;
        }
    }
    closest
}

/// Projects `point` onto the segment `[a, b]`, clamped to the endpoints.
fn closest_point_on_segment(a: Vec3, b: Vec3, point: Vec3) -> Vec3 {
    let ab = b - a;
    let denominator = ab.dot(ab);
    if denominator <= f32::EPSILON {
        return a;
    }
    let t = (point - a).dot(ab) / denominator;
    a + ab * t.clamp(0.0, 1.0)
}

/// Even-odd ray-casting containment test on the XZ plane.
fn point_in_polygon(point: Vec2, boundary: &[Vec3]) -> bool {
    let mut inside = false;
    let mut j = boundary.len() - 1;
    for i in 0..boundary.len() {
        let a = horizontal(boundary[i]);
        let b = horizontal(boundary[j]);
        let crosses = (a.y <= point.y && point.y < b.y) || (b.y <= point.y && point.y < a.y);
        if crosses && point.x < (b.x - a.x) * (point.y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

fn horizontal(point: Vec3) -> Vec2 {
    Vec2::new(point.x, point.z)
}
