//! Cylindrical-shell geometry of a repository component.
//!
//! Every component is a hollow cylinder between an inner and an outer radius,
//! extending `length` along its axis and positioned by its centroid. A solid
//! cylinder has an inner radius of zero; the far field is unbounded and has an
//! infinite outer radius.
//!
//! $$ V = \pi L (r_{out}^2 - r_{in}^2) $$

use crate::errors::{CyderError, CyderResult};
use crate::types::{FloatValue, Radius};
use log::error;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Position in the repository
/// unit: m
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: FloatValue,
    pub y: FloatValue,
    pub z: FloatValue,
}

impl Point {
    pub fn new(x: FloatValue, y: FloatValue, z: FloatValue) -> Self {
        Self { x, y, z }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    /// unit: m
    inner_radius: Radius,
    /// unit: m
    /// May be infinite for an unbounded far field
    outer_radius: Radius,
    centroid: Point,
    /// Axial length
    /// unit: m
    length: FloatValue,
}

impl Geometry {
    /// Create a geometry, validating the radii and length
    pub fn new(
        inner_radius: Radius,
        outer_radius: Radius,
        centroid: Point,
        length: FloatValue,
    ) -> CyderResult<Self> {
        if !inner_radius.is_finite() || inner_radius < 0.0 {
            return Err(range_error(format!(
                "The inner radius must be finite and non-negative. The value provided was {}.",
                inner_radius
            )));
        }
        if outer_radius.is_nan() || outer_radius < 0.0 {
            return Err(range_error(format!(
                "The outer radius must be non-negative. The value provided was {}.",
                outer_radius
            )));
        }
        if inner_radius > outer_radius {
            return Err(range_error(format!(
                "The inner radius ({}) exceeds the outer radius ({}).",
                inner_radius, outer_radius
            )));
        }
        if !length.is_finite() || length < 0.0 {
            return Err(range_error(format!(
                "The length must be finite and non-negative. The value provided was {}.",
                length
            )));
        }
        Ok(Self {
            inner_radius,
            outer_radius,
            centroid,
            length,
        })
    }

    /// Same shape, new centroid
    ///
    /// No two components share a position, so every copy is given its own.
    pub fn copy(&self, centroid: Point) -> Self {
        Self {
            centroid,
            ..self.clone()
        }
    }

    pub fn inner_radius(&self) -> Radius {
        self.inner_radius
    }

    pub fn outer_radius(&self) -> Radius {
        self.outer_radius
    }

    pub fn length(&self) -> FloatValue {
        self.length
    }

    pub fn centroid(&self) -> Point {
        self.centroid
    }

    pub fn set_centroid(&mut self, centroid: Point) {
        self.centroid = centroid;
    }

    pub fn x(&self) -> FloatValue {
        self.centroid.x
    }

    pub fn y(&self) -> FloatValue {
        self.centroid.y
    }

    pub fn z(&self) -> FloatValue {
        self.centroid.z
    }

    /// False for an unbounded (infinite outer radius) geometry
    pub fn is_bounded(&self) -> bool {
        self.outer_radius.is_finite()
    }

    /// Volume of the shell
    /// unit: m^3
    pub fn volume(&self) -> CyderResult<FloatValue> {
        if !self.is_bounded() {
            return Err(range_error(
                "The volume of a geometry with an unbounded outer radius is infinite.".to_string(),
            ));
        }
        Ok(Self::solid_volume(self.outer_radius, self.length)?
            - Self::solid_volume(self.inner_radius, self.length)?)
    }

    /// Volume of a solid cylinder
    /// unit: m^3
    pub fn solid_volume(radius: Radius, length: FloatValue) -> CyderResult<FloatValue> {
        if !radius.is_finite() || radius < 0.0 || !length.is_finite() || length < 0.0 {
            return Err(range_error(format!(
                "A solid cylinder needs a finite, non-negative radius and length. Got r={}, L={}.",
                radius, length
            )));
        }
        Ok(PI * radius * radius * length)
    }

    /// Lateral area of the outer boundary
    /// unit: m^2
    pub fn surface_area(&self) -> CyderResult<FloatValue> {
        if !self.is_bounded() {
            return Err(range_error(
                "The surface area of a geometry with an unbounded outer radius is infinite."
                    .to_string(),
            ));
        }
        Ok(2.0 * PI * self.outer_radius * self.length)
    }

    /// Radius halfway between the inner and outer boundaries
    ///
    /// Infinite for an unbounded geometry.
    pub fn radial_midpoint(&self) -> Radius {
        if !self.is_bounded() {
            return FloatValue::INFINITY;
        }
        self.outer_radius - (self.outer_radius - self.inner_radius) / 2.0
    }
}

fn range_error(msg: String) -> CyderError {
    error!("{}", msg);
    CyderError::Range(msg)
}
