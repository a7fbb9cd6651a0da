use glam::DVec3;

use std::collections::BTreeMap;

/// A grid metadata value: either the raw string as stored, or its decoded
/// literal form.
///
/// Grid metadata is a string-typed key/value store. Values are decoded
/// opportunistically when read; a value that does not parse as a numeric
/// literal is not an error, it is simply kept as a raw string. Readers must
/// therefore tolerate both forms for the same key.
#[derive(Clone, Debug, PartialEq)]
pub enum MetaValue {
    Raw(String),
    Number(f64),
    Vector(DVec3),
    List(Vec<f64>),
}

impl MetaValue {
    /// Decodes `raw` once, at read time.
    ///
    /// Accepted literals are a single number, or a `(..)`/`[..]`-delimited
    /// comma-separated sequence of numbers. Three-element sequences decode
    /// to [`MetaValue::Vector`]. Anything else stays [`MetaValue::Raw`].
    pub fn decode(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Ok(number) = trimmed.parse::<f64>() {
            return Self::Number(number);
        }

        let inner = if trimmed.starts_with('(') && trimmed.ends_with(')') {
            &trimmed[1..trimmed.len() - 1]
        } else if trimmed.starts_with('[') && trimmed.ends_with(']') {
            &trimmed[1..trimmed.len() - 1]
        } else {
            return Self::Raw(raw.to_owned());
        };

        let mut elements = Vec::new();
        // A trailing comma, as in the single-element tuple "(1.0,)", is allowed.
        for field in inner.split(',').filter(|field| !field.trim().is_empty()) {
            match field.trim().parse::<f64>() {
                Ok(number) => elements.push(number),
                Err(_) => return Self::Raw(raw.to_owned()),
            }
        }

        if elements.len() == 3 {
            Self::Vector(DVec3::from_slice(&elements))
        } else {
            Self::List(elements)
        }
    }

    /// The value as a 3-vector, when it decoded as one.
    pub fn as_dvec3(&self) -> Option<DVec3> {
        match self {
            Self::Vector(v) => Some(*v),
            Self::List(elements) if elements.len() == 3 => Some(DVec3::from_slice(elements)),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }
}

/// Encodes a 3-vector in the tuple form written into grid metadata.
pub fn encode_dvec3(v: DVec3) -> String {
    format!("({}, {}, {})", v.x, v.y, v.z)
}

/// Decodes every value of a raw metadata map.
pub fn decode_metadata(raw: &BTreeMap<String, String>) -> BTreeMap<String, MetaValue> {
    raw.iter()
        .map(|(key, value)| (key.clone(), MetaValue::decode(value)))
        .collect()
}
