//! Aircraft data model.
//!
//! Everything here is plain serializable data: a `Plane` is three lifting
//! surfaces (wing, elevator, fin) made of spanwise sections, plus point
//! masses for inertia. Section attributes form a *closed* set so that tool
//! schemas can enumerate them and validation can reject anything else by
//! name before a handler runs.
//!
//! Units: lengths in meters, angles in degrees, masses in kilograms.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum PlaneError {
    #[error("unknown surface {0:?} (expected wing|elevator|fin)")]
    UnknownSurface(String),
    #[error("unknown section attribute {0:?}")]
    UnknownAttribute(String),
    #[error("unknown foil side {0:?} (expected left|right|both)")]
    UnknownFoilSide(String),
    #[error("{surface} has {len} section(s); index {index} is out of range")]
    SectionOutOfRange {
        surface: SurfaceKind,
        index: usize,
        len: usize,
    },
    #[error("invalid value {value} for {attribute}: {reason}")]
    InvalidValue {
        attribute: SectionAttr,
        value: f64,
        reason: &'static str,
    },
    #[error("foil name must not be empty")]
    EmptyFoilName,
}

/// The three lifting surfaces an aircraft model carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceKind {
    Wing,
    Elevator,
    Fin,
}

impl SurfaceKind {
    pub const ALL: [SurfaceKind; 3] = [SurfaceKind::Wing, SurfaceKind::Elevator, SurfaceKind::Fin];

    pub fn as_str(&self) -> &'static str {
        match self {
            SurfaceKind::Wing => "wing",
            SurfaceKind::Elevator => "elevator",
            SurfaceKind::Fin => "fin",
        }
    }
}

impl fmt::Display for SurfaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SurfaceKind {
    type Err = PlaneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wing" => Ok(SurfaceKind::Wing),
            "elevator" => Ok(SurfaceKind::Elevator),
            "fin" => Ok(SurfaceKind::Fin),
            other => Err(PlaneError::UnknownSurface(other.to_string())),
        }
    }
}

/// Numeric per-section attributes reachable from tools.
///
/// Foil names are deliberately not in this set: they are strings, and tools
/// mutate them through `set_foil` so every tool parameter stays
/// single-typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionAttr {
    Chord,
    YPosition,
    Offset,
    Twist,
    Dihedral,
}

impl SectionAttr {
    pub const ALL: [SectionAttr; 5] = [
        SectionAttr::Chord,
        SectionAttr::YPosition,
        SectionAttr::Offset,
        SectionAttr::Twist,
        SectionAttr::Dihedral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionAttr::Chord => "chord",
            SectionAttr::YPosition => "y_position",
            SectionAttr::Offset => "offset",
            SectionAttr::Twist => "twist",
            SectionAttr::Dihedral => "dihedral",
        }
    }

    /// Unit label used in tool schemas and reports.
    pub fn unit(&self) -> &'static str {
        match self {
            SectionAttr::Chord | SectionAttr::YPosition | SectionAttr::Offset => "m",
            SectionAttr::Twist | SectionAttr::Dihedral => "deg",
        }
    }
}

impl fmt::Display for SectionAttr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionAttr {
    type Err = PlaneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chord" => Ok(SectionAttr::Chord),
            "y_position" => Ok(SectionAttr::YPosition),
            "offset" => Ok(SectionAttr::Offset),
            "twist" => Ok(SectionAttr::Twist),
            "dihedral" => Ok(SectionAttr::Dihedral),
            other => Err(PlaneError::UnknownAttribute(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FoilSide {
    Left,
    Right,
    Both,
}

impl FromStr for FoilSide {
    type Err = PlaneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(FoilSide::Left),
            "right" => Ok(FoilSide::Right),
            "both" => Ok(FoilSide::Both),
            other => Err(PlaneError::UnknownFoilSide(other.to_string())),
        }
    }
}

/// One spanwise station of a lifting surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WingSection {
    /// Spanwise position of the section, meters from the root.
    pub y_position: f64,
    /// Local chord, meters.
    pub chord: f64,
    /// Leading-edge sweep offset, meters.
    pub offset: f64,
    /// Geometric twist, degrees (positive leading edge up).
    pub twist: f64,
    /// Dihedral of the panel outboard of this section, degrees.
    pub dihedral: f64,
    pub right_foil: String,
    pub left_foil: String,
}

impl WingSection {
    pub fn new(y_position: f64, chord: f64, foil: &str) -> Self {
        Self {
            y_position,
            chord,
            offset: 0.0,
            twist: 0.0,
            dihedral: 0.0,
            right_foil: foil.to_string(),
            left_foil: foil.to_string(),
        }
    }

    pub fn attr(&self, attr: SectionAttr) -> f64 {
        match attr {
            SectionAttr::Chord => self.chord,
            SectionAttr::YPosition => self.y_position,
            SectionAttr::Offset => self.offset,
            SectionAttr::Twist => self.twist,
            SectionAttr::Dihedral => self.dihedral,
        }
    }

    pub fn set_attr(&mut self, attr: SectionAttr, value: f64) -> Result<(), PlaneError> {
        if !value.is_finite() {
            return Err(PlaneError::InvalidValue {
                attribute: attr,
                value,
                reason: "must be finite",
            });
        }
        match attr {
            SectionAttr::Chord => {
                if value <= 0.0 {
                    return Err(PlaneError::InvalidValue {
                        attribute: attr,
                        value,
                        reason: "chord must be positive",
                    });
                }
                self.chord = value;
            }
            SectionAttr::YPosition => {
                if value < 0.0 {
                    return Err(PlaneError::InvalidValue {
                        attribute: attr,
                        value,
                        reason: "spanwise position must be non-negative",
                    });
                }
                self.y_position = value;
            }
            SectionAttr::Offset => self.offset = value,
            SectionAttr::Twist => self.twist = value,
            SectionAttr::Dihedral => self.dihedral = value,
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Surface {
    pub kind: SurfaceKind,
    pub sections: Vec<WingSection>,
}

impl Surface {
    pub fn new(kind: SurfaceKind) -> Self {
        Self {
            kind,
            sections: Vec::new(),
        }
    }

    pub fn section(&self, index: usize) -> Result<&WingSection, PlaneError> {
        self.sections.get(index).ok_or(PlaneError::SectionOutOfRange {
            surface: self.kind,
            index,
            len: self.sections.len(),
        })
    }

    pub fn section_mut(&mut self, index: usize) -> Result<&mut WingSection, PlaneError> {
        let len = self.sections.len();
        let kind = self.kind;
        self.sections
            .get_mut(index)
            .ok_or(PlaneError::SectionOutOfRange {
                surface: kind,
                index,
                len,
            })
    }
}

/// A concentrated mass used for inertia bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointMass {
    pub mass_kg: f64,
    /// Position in body axes, meters: [x aft, y starboard, z up].
    pub position: [f64; 3],
    #[serde(default)]
    pub tag: String,
}

/// The full aircraft model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    pub name: String,
    pub wing: Surface,
    pub elevator: Surface,
    pub fin: Surface,
    #[serde(default)]
    pub point_masses: Vec<PointMass>,
}

impl Plane {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            wing: Surface::new(SurfaceKind::Wing),
            elevator: Surface::new(SurfaceKind::Elevator),
            fin: Surface::new(SurfaceKind::Fin),
            point_masses: Vec::new(),
        }
    }

    /// The default two-section trainer used when a session starts without an
    /// existing project: an E387 main wing with a NACA 0012 tail.
    pub fn default_trainer(name: &str) -> Self {
        let mut plane = Plane::new(name);

        plane.wing.sections.push(WingSection::new(0.0, 0.2, "E387"));
        plane.wing.sections.push(WingSection {
            y_position: 1.0,
            chord: 0.1,
            offset: 0.2,
            twist: 5.0,
            dihedral: 5.0,
            right_foil: "E387".to_string(),
            left_foil: "E387".to_string(),
        });

        plane
            .elevator
            .sections
            .push(WingSection::new(0.0, 0.05, "NACA 0012"));
        plane.elevator.sections.push(WingSection {
            offset: 0.02,
            ..WingSection::new(0.1, 0.02, "NACA 0012")
        });

        plane.fin.sections.push(WingSection::new(0.0, 0.1, "NACA 0012"));
        plane.fin.sections.push(WingSection {
            offset: 0.04,
            ..WingSection::new(0.12, 0.06, "NACA 0012")
        });

        plane
    }

    pub fn surface(&self, kind: SurfaceKind) -> &Surface {
        match kind {
            SurfaceKind::Wing => &self.wing,
            SurfaceKind::Elevator => &self.elevator,
            SurfaceKind::Fin => &self.fin,
        }
    }

    pub fn surface_mut(&mut self, kind: SurfaceKind) -> &mut Surface {
        match kind {
            SurfaceKind::Wing => &mut self.wing,
            SurfaceKind::Elevator => &mut self.elevator,
            SurfaceKind::Fin => &mut self.fin,
        }
    }

    pub fn section_attr(
        &self,
        surface: SurfaceKind,
        section: usize,
        attr: SectionAttr,
    ) -> Result<f64, PlaneError> {
        Ok(self.surface(surface).section(section)?.attr(attr))
    }

    pub fn set_section_attr(
        &mut self,
        surface: SurfaceKind,
        section: usize,
        attr: SectionAttr,
        value: f64,
    ) -> Result<(), PlaneError> {
        self.surface_mut(surface).section_mut(section)?.set_attr(attr, value)
    }

    pub fn set_foil(
        &mut self,
        surface: SurfaceKind,
        section: usize,
        side: FoilSide,
        foil: &str,
    ) -> Result<(), PlaneError> {
        let foil = foil.trim();
        if foil.is_empty() {
            return Err(PlaneError::EmptyFoilName);
        }
        let sec = self.surface_mut(surface).section_mut(section)?;
        match side {
            FoilSide::Left => sec.left_foil = foil.to_string(),
            FoilSide::Right => sec.right_foil = foil.to_string(),
            FoilSide::Both => {
                sec.left_foil = foil.to_string();
                sec.right_foil = foil.to_string();
            }
        }
        Ok(())
    }

    pub fn total_point_mass_kg(&self) -> f64 {
        self.point_masses.iter().map(|m| m.mass_kg).sum()
    }
}
