/// Plane projections used by the trackcenter queries
use std::fmt;
use std::str::FromStr;

use nalgebra::{Vector2, Vector3};

use crate::error::Error;

/// A named projection plane (or axis) for distance measurements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plane {
    X,
    Y,
    Z,
    Xy,
    Xz,
    Zy,
    /// Full 3D, unsigned
    Xyz,
}

impl Plane {
    /// Keep only the components spanned by the plane
    pub fn project(&self, v: &Vector3<f64>) -> Vector3<f64> {
        match self {
            Plane::X => Vector3::new(v.x, 0.0, 0.0),
            Plane::Y => Vector3::new(0.0, v.y, 0.0),
            Plane::Z => Vector3::new(0.0, 0.0, v.z),
            Plane::Xy => Vector3::new(v.x, v.y, 0.0),
            Plane::Xz => Vector3::new(v.x, 0.0, v.z),
            Plane::Zy => Vector3::new(0.0, v.y, v.z),
            Plane::Xyz => *v,
        }
    }

    /// 2D coordinates within the plane, only defined for `xz` and `xy`
    pub fn coordinates_2d(&self, v: &Vector3<f64>) -> Option<Vector2<f64>> {
        match self {
            Plane::Xz => Some(Vector2::new(v.x, v.z)),
            Plane::Xy => Some(Vector2::new(v.x, v.y)),
            _ => None,
        }
    }

    /// Reference axis crossed with the offset vector, and the axis the
    /// resulting sign is read from. `None` for the unsigned `xyz` plane.
    fn sign_convention(&self) -> Option<(Vector3<f64>, Vector3<f64>)> {
        match self {
            Plane::X | Plane::Xz => Some((Vector3::y(), Vector3::z())),
            Plane::Y | Plane::Xy => Some((Vector3::x(), Vector3::z())),
            Plane::Z => Some((Vector3::x(), Vector3::y())),
            Plane::Zy => Some((Vector3::y(), Vector3::x())),
            Plane::Xyz => None,
        }
    }

    /// Signed length of `offset` projected onto the plane
    ///
    /// The sign comes from `reference x offset`, which fixes a consistent
    /// left/right convention per plane. For `xz` a point on the -x side of a
    /// centerline heading +z is positive.
    pub fn signed_length(&self, offset: &Vector3<f64>) -> f64 {
        let projected = self.project(offset);
        let length = projected.norm();
        match self.sign_convention() {
            None => length,
            Some((reference, axis)) => length * sign(reference.cross(&projected).dot(&axis)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Plane::X => "x",
            Plane::Y => "y",
            Plane::Z => "z",
            Plane::Xy => "xy",
            Plane::Xz => "xz",
            Plane::Zy => "zy",
            Plane::Xyz => "xyz",
        }
    }
}

/// Sign that maps zero to zero, unlike `f64::signum`
fn sign(value: f64) -> f64 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}

impl FromStr for Plane {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "x" => Ok(Plane::X),
            "y" => Ok(Plane::Y),
            "z" => Ok(Plane::Z),
            "xy" => Ok(Plane::Xy),
            "xz" => Ok(Plane::Xz),
            "zy" => Ok(Plane::Zy),
            "xyz" => Ok(Plane::Xyz),
            _ => Err(Error::InvalidPlane(s.to_string())),
        }
    }
}

impl fmt::Display for Plane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
