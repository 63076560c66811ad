//! Axis-aligned bounding boxes, used to frame loaded models.

use crate::Vec3;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    #[inline]
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Bounds of a point cloud; `None` when the iterator is empty.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Vec3>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        Some(iter.fold(Self::new(first, first), |acc, p| Self {
            min: acc.min.min(p),
            max: acc.max.max(p),
        }))
    }

    #[inline]
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb::new(self.min.min(other.min), self.max.max(other.max))
    }

    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    /// Radius of the bounding sphere around `center()`.
    #[inline]
    pub fn radius(&self) -> f32 {
        self.extent().length() * 0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vec3;

    #[test]
    fn empty_point_set_has_no_bounds() {
        assert_eq!(Aabb::from_points(std::iter::empty()), None);
    }

    #[test]
    fn bounds_cover_all_points() {
        let b = Aabb::from_points([
            vec3(1.0, -2.0, 0.0),
            vec3(-1.0, 4.0, 3.0),
            vec3(0.5, 0.0, -1.0),
        ])
        .unwrap();
        assert_eq!(b.min, vec3(-1.0, -2.0, -1.0));
        assert_eq!(b.max, vec3(1.0, 4.0, 3.0));
        assert_eq!(b.center(), vec3(0.0, 1.0, 1.0));
    }

    #[test]
    fn union_grows_both_corners() {
        let a = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let b = Aabb::new(vec3(-1.0, 0.5, 0.5), vec3(0.5, 2.0, 0.5));
        let u = a.union(&b);
        assert_eq!(u.min, vec3(-1.0, 0.0, 0.0));
        assert_eq!(u.max, vec3(1.0, 2.0, 1.0));
    }
}
