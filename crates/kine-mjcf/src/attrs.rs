//! Attribute maps and typed attribute parsing.

use crate::{MjcfError, Result};
use kine_math::{Quat, Vec3};
use quick_xml::events::BytesStart;
use std::collections::HashMap;

/// Raw attributes of one element, keyed by attribute name.
pub type AttrMap = HashMap<String, String>;

/// Collect the attributes of an XML element.
pub fn collect(e: &BytesStart) -> Result<AttrMap> {
    let mut map = AttrMap::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|e| MjcfError::InvalidMjcf(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = String::from_utf8_lossy(&attr.value).to_string();
        map.insert(key, value);
    }
    Ok(map)
}

/// Typed view over an element's attributes, for error messages that name the element.
pub struct Attrs<'a> {
    tag: &'a str,
    map: &'a AttrMap,
}

impl<'a> Attrs<'a> {
    pub fn new(tag: &'a str, map: &'a AttrMap) -> Self {
        Self { tag, map }
    }

    pub fn str(&self, key: &str) -> Option<&'a str> {
        self.map.get(key).map(String::as_str)
    }

    fn invalid(&self, key: &str, what: &str) -> MjcfError {
        MjcfError::InvalidMjcf(format!(
            "attribute '{key}' of <{}> {what}: '{}'",
            self.tag,
            self.str(key).unwrap_or_default()
        ))
    }

    /// All numbers of an attribute, whatever their count.
    pub fn numbers(&self, key: &str) -> Result<Option<Vec<f64>>> {
        let Some(value) = self.str(key) else {
            return Ok(None);
        };
        value
            .split_whitespace()
            .map(|s| s.parse::<f64>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(Some)
            .map_err(|_| self.invalid(key, "is not a list of numbers"))
    }

    /// Exactly `n` numbers.
    pub fn array(&self, key: &str, n: usize) -> Result<Option<Vec<f64>>> {
        match self.numbers(key)? {
            Some(v) if v.len() != n => Err(self.invalid(key, &format!("needs {n} numbers"))),
            other => Ok(other),
        }
    }

    /// Between `min` and `max` numbers; only the first is returned.
    pub fn leading(&self, key: &str, min: usize, max: usize) -> Result<Option<f64>> {
        match self.numbers(key)? {
            Some(v) if v.len() < min || v.len() > max => Err(self.invalid(
                key,
                &format!("needs between {min} and {max} numbers"),
            )),
            Some(v) => Ok(v.first().copied()),
            None => Ok(None),
        }
    }

    pub fn f64(&self, key: &str) -> Result<Option<f64>> {
        Ok(self.array(key, 1)?.map(|v| v[0]))
    }

    pub fn vec3(&self, key: &str) -> Result<Option<Vec3>> {
        Ok(self.array(key, 3)?.map(|v| Vec3::new(v[0], v[1], v[2])))
    }

    pub fn pair(&self, key: &str) -> Result<Option<[f64; 2]>> {
        Ok(self.array(key, 2)?.map(|v| [v[0], v[1]]))
    }

    /// `true`, `false` or `auto` (returned as `None`).
    pub fn tristate(&self, key: &str) -> Result<Option<bool>> {
        match self.str(key) {
            None | Some("auto") => Ok(None),
            Some("true") => Ok(Some(true)),
            Some("false") => Ok(Some(false)),
            Some(_) => Err(self.invalid(key, "must be true, false or auto")),
        }
    }

    /// Orientation from `quat`, `euler`, `axisangle` or `zaxis`; identity when absent.
    pub fn orientation(&self, degrees: bool) -> Result<Quat> {
        let angle = |a: f64| if degrees { a.to_radians() } else { a };

        if let Some(q) = self.array("quat", 4)? {
            let quat = Quat::from_wxyz(&q);
            if (quat.w * quat.w + quat.v.norm_squared()) < 1e-20 {
                return Err(self.invalid("quat", "has zero length"));
            }
            return Ok(quat.normalize());
        }
        if let Some(e) = self.vec3("euler")? {
            return Ok(Quat::from_euler_xyz(&Vec3::new(angle(e.x), angle(e.y), angle(e.z))));
        }
        if let Some(aa) = self.array("axisangle", 4)? {
            let axis = Vec3::new(aa[0], aa[1], aa[2]);
            if axis.norm() < 1e-12 {
                return Err(self.invalid("axisangle", "has a zero axis"));
            }
            return Ok(Quat::from_axis_angle(&axis.normalize(), angle(aa[3])));
        }
        if let Some(z) = self.vec3("zaxis")? {
            if z.norm() < 1e-12 {
                return Err(self.invalid("zaxis", "has zero length"));
            }
            return Ok(Quat::from_two_vectors(&Vec3::z(), &z));
        }
        Ok(Quat::identity())
    }
}
