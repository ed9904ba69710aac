//! Axis-aligned bounding volume that contains the fluid.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::error::{FluidError, Result};

/// Contact against the inside of the bounding volume.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundaryContact {
    /// Closest point on the boundary.
    pub point: Vec3,
    /// Outward unit normal at the contact.
    pub normal: Vec3,
    /// Distance from the contact point to the offending position.
    pub depth: f32,
}

/// Box-shaped container given by its six axis planes.
///
/// Deserialization goes through [`BoundingVolume::from_planes`], so a config
/// file cannot produce inverted planes.
#[derive(Resource, Clone, Copy, Debug, PartialEq, Reflect, Serialize, Deserialize)]
#[reflect(Resource)]
#[serde(try_from = "Planes")]
pub struct BoundingVolume {
    left: f32,
    right: f32,
    bottom: f32,
    top: f32,
    back: f32,
    front: f32,
}

/// Unchecked wire form of [`BoundingVolume`].
#[derive(Deserialize)]
struct Planes {
    left: f32,
    right: f32,
    bottom: f32,
    top: f32,
    back: f32,
    front: f32,
}

impl TryFrom<Planes> for BoundingVolume {
    type Error = FluidError;

    fn try_from(p: Planes) -> Result<Self> {
        Self::from_planes(p.left, p.right, p.bottom, p.top, p.back, p.front)
    }
}

impl Default for BoundingVolume {
    fn default() -> Self {
        Self {
            left: -100.0,
            right: 100.0,
            bottom: -100.0,
            top: 100.0,
            back: -100.0,
            front: 100.0,
        }
    }
}

impl BoundingVolume {
    /// Create a volume from its minimum and maximum corners.
    pub fn new(min: Vec3, max: Vec3) -> Result<Self> {
        Self::from_planes(min.x, max.x, min.y, max.y, min.z, max.z)
    }

    /// Create a volume from its six planes.
    pub fn from_planes(
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        back: f32,
        front: f32,
    ) -> Result<Self> {
        let bounds = Self {
            left,
            right,
            bottom,
            top,
            back,
            front,
        };
        bounds.validate()?;
        Ok(bounds)
    }

    /// Checks that every axis has finite planes with `max > min`. Reflection
    /// can write the planes directly, so consumers re-check before use.
    pub fn validate(&self) -> Result<()> {
        let axes = [
            ("x", self.left, self.right),
            ("y", self.bottom, self.top),
            ("z", self.back, self.front),
        ];
        for (axis, min, max) in axes {
            if !(min.is_finite() && max.is_finite() && max > min) {
                return Err(FluidError::InvertedBounds { axis, min, max });
            }
        }
        Ok(())
    }

    /// Create a cube centered at `center` with edge length `size`.
    pub fn cube(center: Vec3, size: f32) -> Result<Self> {
        let half = Vec3::splat(size * 0.5);
        Self::new(center - half, center + half)
    }

    pub fn left(&self) -> f32 {
        self.left
    }

    pub fn right(&self) -> f32 {
        self.right
    }

    pub fn bottom(&self) -> f32 {
        self.bottom
    }

    pub fn top(&self) -> f32 {
        self.top
    }

    pub fn back(&self) -> f32 {
        self.back
    }

    pub fn front(&self) -> f32 {
        self.front
    }

    pub fn min(&self) -> Vec3 {
        Vec3::new(self.left, self.bottom, self.back)
    }

    pub fn max(&self) -> Vec3 {
        Vec3::new(self.right, self.top, self.front)
    }

    pub fn center(&self) -> Vec3 {
        (self.min() + self.max()) * 0.5
    }

    pub fn half_extents(&self) -> Vec3 {
        (self.max() - self.min()) * 0.5
    }

    /// Check if a point is inside the volume or on its surface.
    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min()).all() && point.cmple(self.max()).all()
    }

    /// Volume with every face moved inward by `margin`, collapsing to the
    /// center on axes where the margin exceeds the half extent.
    pub fn shrunk(&self, margin: Vec3) -> (Vec3, Vec3) {
        let center = self.center();
        let half = (self.half_extents() - margin).max(Vec3::ZERO);
        (center - half, center + half)
    }

    /// Returns the contact if `position` lies strictly outside the volume.
    pub fn outside(&self, position: Vec3) -> Option<BoundaryContact> {
        outside_box(self.center(), self.half_extents(), position)
    }
}

/// Containment test against the box `center ± extents`.
pub(crate) fn outside_box(center: Vec3, extents: Vec3, position: Vec3) -> Option<BoundaryContact> {
    let local = position - center;
    if (local.abs() - extents).max_element() <= 0.0 {
        return None;
    }

    let clamped = local.clamp(-extents, extents);
    let offset = local - clamped;
    let normal = sign(offset).normalize_or_zero();
    Some(BoundaryContact {
        point: center + clamped,
        normal,
        depth: offset.length(),
    })
}

fn sign(v: Vec3) -> Vec3 {
    let s = |x: f32| {
        if x > 0.0 {
            1.0
        } else if x < 0.0 {
            -1.0
        } else {
            0.0
        }
    };
    Vec3::new(s(v.x), s(v.y), s(v.z))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_volume_contains() {
        let bounds = BoundingVolume::new(Vec3::ZERO, Vec3::ONE).unwrap();

        assert!(bounds.contains(Vec3::splat(0.5)));
        assert!(bounds.contains(Vec3::ONE));
        assert!(!bounds.contains(Vec3::new(1.5, 0.5, 0.5)));
    }

    #[test]
    fn test_rejects_inverted_planes() {
        assert!(matches!(
            BoundingVolume::from_planes(1.0, -1.0, 0.0, 1.0, 0.0, 1.0),
            Err(FluidError::InvertedBounds { axis: "x", .. })
        ));
        assert!(matches!(
            BoundingVolume::new(Vec3::ZERO, Vec3::new(1.0, 0.0, 1.0)),
            Err(FluidError::InvertedBounds { axis: "y", .. })
        ));
        assert!(BoundingVolume::cube(Vec3::ZERO, -2.0).is_err());
    }

    #[test]
    fn test_ron_rejects_inverted_planes() {
        let inverted = "(left: 10.0, right: -10.0, bottom: -1.0, top: 1.0, back: -1.0, front: 1.0)";
        assert!(ron::from_str::<BoundingVolume>(inverted).is_err());

        let bounds = BoundingVolume::cube(Vec3::ZERO, 4.0).unwrap();
        let text = ron::to_string(&bounds).unwrap();
        assert_eq!(ron::from_str::<BoundingVolume>(&text).unwrap(), bounds);
    }

    #[test]
    fn test_validate_catches_reflected_edits() {
        use bevy::reflect::GetField;

        let mut bounds = BoundingVolume::default();
        *bounds.get_field_mut::<f32>("top").unwrap() = -150.0;
        assert!(matches!(
            bounds.validate(),
            Err(FluidError::InvertedBounds { axis: "y", .. })
        ));
    }

    #[test]
    fn test_default_matches_hundred_unit_box() {
        let bounds = BoundingVolume::default();
        assert_eq!(bounds.center(), Vec3::ZERO);
        assert_eq!(bounds.half_extents(), Vec3::splat(100.0));
        assert_eq!(bounds.right(), 100.0);
    }

    #[test]
    fn test_outside_right_face() {
        let bounds = BoundingVolume::default();
        let contact = bounds.outside(Vec3::new(110.0, 0.0, 0.0)).unwrap();

        assert_eq!(contact.point, Vec3::new(100.0, 0.0, 0.0));
        assert_eq!(contact.normal, Vec3::X);
        assert!((contact.depth - 10.0).abs() < 1e-5);
    }

    #[test]
    fn test_outside_corner_normal_is_diagonal() {
        let bounds = BoundingVolume::cube(Vec3::ZERO, 2.0).unwrap();
        let contact = bounds.outside(Vec3::new(2.0, -3.0, 0.5)).unwrap();

        assert_eq!(contact.point, Vec3::new(1.0, -1.0, 0.5));
        let expected = Vec3::new(1.0, -1.0, 0.0).normalize();
        assert!((contact.normal - expected).length() < 1e-6);
        assert!((contact.depth - 5.0_f32.sqrt()).abs() < 1e-5);
    }

    #[test]
    fn test_surface_point_is_not_outside() {
        let bounds = BoundingVolume::default();
        assert!(bounds.outside(Vec3::new(100.0, 0.0, 0.0)).is_none());
        assert!(bounds.outside(Vec3::ZERO).is_none());
    }

    #[test]
    fn test_shrunk_collapses_to_center() {
        let bounds = BoundingVolume::cube(Vec3::ZERO, 4.0).unwrap();
        let (min, max) = bounds.shrunk(Vec3::new(1.0, 5.0, 0.0));
        assert_eq!(min, Vec3::new(-1.0, 0.0, -2.0));
        assert_eq!(max, Vec3::new(1.0, 0.0, 2.0));
    }
}
