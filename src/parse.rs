//! Calibration output parser (Step 3 in the pipeline).
//! Scans the viewer's captured stdout line by line with two typed matchers:
//! a plane-equation matcher and a corner matcher. Lines matching neither are
//! ignored, so the viewer is free to print progress chatter around the report.
//! Corners are classified into the four box slots by the sign pattern of their
//! coordinates. Only the four fixed patterns are recognized; a corner from any
//! other sign octant is dropped, which is what the renderer expects.
//! Offsets use exact decimal math so the digits the viewer printed survive the
//! sand-offset subtraction unchanged.

use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Marker prefix of the plane-equation line printed by the viewer.
const PLANE_MARKER: &str = "Camera-space plane equation:";

// *************** Data Model ***************

/// Calibrated base plane: normal vector plus scalar offset, the offset already
/// adjusted by the sand depth.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlaneEquation {
    pub normal: [Decimal; 3],
    pub offset: Decimal,
}

impl fmt::Display for PlaneEquation {
    /// First line of the BoxLayout file: `(nx, ny, nz), offset`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}), {}",
            self.normal[0], self.normal[1], self.normal[2], self.offset
        )
    }
}

/// The four box corner slots, declared in BoxLayout write order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Corner {
    LowerLeft,
    LowerRight,
    UpperLeft,
    UpperRight,
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::LowerLeft,
        Corner::LowerRight,
        Corner::UpperLeft,
        Corner::UpperRight,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Corner::LowerLeft => "lower left corner",
            Corner::LowerRight => "lower right corner",
            Corner::UpperLeft => "upper left corner",
            Corner::UpperRight => "upper right corner",
        }
    }

    /// Maps a coordinate sign signature to its slot. `'-'` marks a field with
    /// a leading minus, `' '` anything else, left to right.
    fn from_signature(signature: [char; 3]) -> Option<Corner> {
        match signature {
            ['-', '-', '-'] => Some(Corner::LowerLeft),
            [' ', '-', '-'] => Some(Corner::LowerRight),
            ['-', ' ', '-'] => Some(Corner::UpperLeft),
            [' ', ' ', '-'] => Some(Corner::UpperRight),
            _ => None,
        }
    }
}

/// Five-slot accumulator filled during one linear scan of the viewer output.
/// Slots stay empty until a matching line is seen; the last match for a slot
/// wins, so re-picking a corner in the viewer simply replaces it.
#[derive(Debug, Default)]
pub struct Calibration {
    plane: Option<PlaneEquation>,
    corners: [Option<String>; 4],
}

impl Calibration {
    /// Scans the full captured viewer output and fills whatever slots match.
    pub fn scan(output: &str, sand_offset: Decimal) -> Self {
        let mut calibration = Calibration::default();
        for line in output.lines() {
            match match_line(line) {
                LineMatch::Plane { normal, base_offset } => {
                    debug!("matched plane equation: {}", line.trim());
                    calibration.plane = Some(PlaneEquation {
                        normal,
                        offset: base_offset - sand_offset,
                    });
                }
                LineMatch::Corner { slot, text } => {
                    debug!("matched {}: {}", slot.label(), text);
                    calibration.corners[slot as usize] = Some(text);
                }
                LineMatch::NoMatch => {}
            }
        }
        calibration
    }

    pub fn corner(&self, slot: Corner) -> Option<&str> {
        self.corners[slot as usize].as_deref()
    }

    /// Labels of every slot still unfilled, in report order.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.plane.is_none() {
            missing.push("plane equation");
        }
        for slot in Corner::ALL {
            if self.corners[slot as usize].is_none() {
                missing.push(slot.label());
            }
        }
        missing
    }

    /// The five BoxLayout lines in write order, or the labels of the slots the
    /// viewer output never filled. Corners are passed through verbatim.
    pub fn into_lines(self) -> Result<[String; 5], Vec<&'static str>> {
        match (self.plane, self.corners) {
            (Some(plane), [Some(ll), Some(lr), Some(ul), Some(ur)]) => {
                Ok([plane.to_string(), ll, lr, ul, ur])
            }
            (plane, corners) => Err(Calibration { plane, corners }.missing()),
        }
    }
}

// *************** Line Matchers ***************

/// Result of matching one output line.
#[derive(Debug, PartialEq, Eq)]
enum LineMatch {
    Plane {
        normal: [Decimal; 3],
        base_offset: Decimal,
    },
    Corner {
        slot: Corner,
        text: String,
    },
    NoMatch,
}

fn match_line(line: &str) -> LineMatch {
    if let Some((normal, base_offset)) = match_plane(line) {
        return LineMatch::Plane { normal, base_offset };
    }
    if let Some((slot, text)) = match_corner(line) {
        return LineMatch::Corner { slot, text };
    }
    LineMatch::NoMatch
}

/// Matches the fixed viewer template
/// `Camera-space plane equation: x * (nx, ny, nz) = offset`.
fn match_plane(line: &str) -> Option<([Decimal; 3], Decimal)> {
    let rest = line.trim().strip_prefix(PLANE_MARKER)?;
    let rest = rest.trim_start().strip_prefix('x')?;
    let rest = rest.trim_start().strip_prefix('*')?;
    let (fields, rest) = split_triple(rest.trim_start())?;
    let rest = rest.trim_start().strip_prefix('=')?;
    let base_offset = parse_field(rest.trim())?;
    let normal = [
        parse_field(fields[0])?,
        parse_field(fields[1])?,
        parse_field(fields[2])?,
    ];
    Some((normal, base_offset))
}

/// Matches a line that is exactly one parenthesized coordinate triple and
/// nothing else. Returns the slot and the trimmed line verbatim.
fn match_corner(line: &str) -> Option<(Corner, String)> {
    let text = line.trim();
    let (fields, rest) = split_triple(text)?;
    if !rest.trim().is_empty() {
        return None;
    }
    for field in fields {
        parse_field(field)?;
    }
    let signature = [
        sign_char(fields[0]),
        sign_char(fields[1]),
        sign_char(fields[2]),
    ];
    let slot = Corner::from_signature(signature)?;
    Some((slot, text.to_string()))
}

/// Splits a leading `(a, b, c)` group off `s`, returning the three trimmed
/// fields and the remainder after the closing parenthesis.
fn split_triple(s: &str) -> Option<([&str; 3], &str)> {
    let inner = s.strip_prefix('(')?;
    let (inner, rest) = inner.split_once(')')?;
    let mut parts = inner.split(',');
    let a = parts.next()?.trim();
    let b = parts.next()?.trim();
    let c = parts.next()?.trim();
    if parts.next().is_some() {
        return None;
    }
    Some(([a, b, c], rest))
}

/// Plain decimal field: optional sign, digits, optional fraction. The viewer
/// never prints scientific notation, so the matchers must not accept it.
fn parse_field(s: &str) -> Option<Decimal> {
    if s.is_empty() || s.contains(['e', 'E']) {
        return None;
    }
    Decimal::from_str(s).ok()
}

/// Sign classification is textual: only a leading minus counts as negative.
fn sign_char(field: &str) -> char {
    if field.starts_with('-') { '-' } else { ' ' }
}

// *************** Tests ***************
