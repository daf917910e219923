//! Source Feature Extraction
//!
//! Reads the fields of one OGR GML export record. Extraction is
//! all-or-nothing: the first missing path or unusable boundary ring aborts
//! with `MalformedInput`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::{Document, ATTRIBUTE_KEY, TEXT_KEY};
use crate::geometry::reorder_ring;
use crate::mapper::ConvertError;

pub const FEATURE_COLLECTION: &str = "ogr:FeatureCollection";
pub const FEATURE_MEMBER: &str = "gml:featureMember";
const BOUNDARY_PATH: &[&str] = &[
    "ogr:geometryProperty",
    "gml:Polygon",
    "gml:outerBoundaryIs",
    "gml:LinearRing",
    "gml:coordinates",
];
const BBOX_PATH: &[&str] = &["gml:boundedBy", "gml:Box"];

/// Bounding box as exported: two `gml:coord` entries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceBbox {
    pub east: String,
    pub south: String,
    pub west: String,
    pub north: String,
}

/// The fields read from the source record, kept as opaque strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFeature {
    pub record_type: String,
    pub name: String,
    pub nummer: String,
    pub ags: String,
    pub gemeinde_name: String,
    pub ortsteil_name: String,
    pub plangeber: String,
    pub plan_art: String,
    pub rechtsstand: String,
    pub aufstellungsbeschluss_datum: String,
    pub boundary: String,
    /// The boundary ring reversed and flattened for `gml:posList`
    pub pos_list: String,
    pub bbox: SourceBbox,
}

impl SourceFeature {
    pub fn extract(document: &Document) -> Result<Self, ConvertError> {
        let collection = Cursor::root(document).first(FEATURE_COLLECTION)?;

        let members = collection.all(FEATURE_MEMBER)?;
        if members.len() > 1 {
            tracing::warn!(
                ignored = members.len() - 1,
                "multiple feature members found, only the first is converted"
            );
        }
        let member = &members[0];

        let record_type = member.sole_key()?;
        let record = member.first(record_type)?;
        tracing::debug!(record = record_type, "discovered source record");

        let mut ring = record.clone();
        for key in BOUNDARY_PATH {
            ring = ring.first(key)?;
        }
        let boundary = ring.own_text()?;
        let pos_list = reorder_ring(&boundary, &ring.path)?;

        Ok(Self {
            record_type: record_type.to_string(),
            name: record.text("ogr:name")?,
            nummer: record.text("ogr:nummer")?,
            ags: record.text("ogr:ags")?,
            gemeinde_name: record.text("ogr:gemeindeName")?,
            ortsteil_name: record.text("ogr:ortsteilName")?,
            plangeber: record.text("ogr:plangeber")?,
            plan_art: record.text("ogr:planArt")?,
            rechtsstand: record.text("ogr:rechtsstand")?,
            aufstellungsbeschluss_datum: record.text("ogr:aufstellungsbeschlussDatum")?,
            boundary,
            pos_list,
            bbox: extract_bbox(&collection)?,
        })
    }
}

fn extract_bbox(collection: &Cursor<'_>) -> Result<SourceBbox, ConvertError> {
    let mut cursor = collection.clone();
    for key in BBOX_PATH {
        cursor = cursor.first(key)?;
    }

    let coords = cursor.all("gml:coord")?;
    if coords.len() != 2 {
        return Err(ConvertError::MalformedInput {
            path: format!("{}/gml:coord (expected 2 corners, found {})", cursor.path, coords.len()),
        });
    }

    Ok(SourceBbox {
        east: coords[0].text("gml:X")?,
        south: coords[0].text("gml:Y")?,
        west: coords[1].text("gml:X")?,
        north: coords[1].text("gml:Y")?,
    })
}

/// A position in the document plus the path that led there
#[derive(Debug, Clone)]
struct Cursor<'a> {
    value: &'a Value,
    path: String,
}

impl<'a> Cursor<'a> {
    fn root(value: &'a Value) -> Self {
        Self { value, path: String::new() }
    }

    fn join(&self, key: &str) -> String {
        if self.path.is_empty() {
            key.to_string()
        } else {
            format!("{}/{}", self.path, key)
        }
    }

    fn missing(&self, key: &str) -> ConvertError {
        ConvertError::MalformedInput { path: self.join(key) }
    }

    /// Every occurrence of the child element `key`.
    fn all(&self, key: &str) -> Result<Vec<Cursor<'a>>, ConvertError> {
        let path = self.join(key);
        let entries: Vec<&'a Value> = match self.value.get(key) {
            Some(Value::Array(items)) => items.iter().collect(),
            Some(item @ Value::Object(_)) => vec![item],
            _ => return Err(self.missing(key)),
        };
        if entries.is_empty() {
            return Err(self.missing(key));
        }
        Ok(entries
            .into_iter()
            .enumerate()
            .map(|(i, value)| Cursor {
                value,
                path: if i == 0 { path.clone() } else { format!("{}[{}]", path, i) },
            })
            .collect())
    }

    /// First occurrence of the child element `key`; later ones are ignored.
    fn first(&self, key: &str) -> Result<Cursor<'a>, ConvertError> {
        let mut entries = self.all(key)?;
        Ok(entries.swap_remove(0))
    }

    /// The single element key of a mapping whose key is not known upfront.
    fn sole_key(&self) -> Result<&'a str, ConvertError> {
        let map = self.value.as_object().ok_or_else(|| ConvertError::MalformedInput {
            path: format!("{} (expected a mapping)", self.path),
        })?;
        let mut keys = map
            .keys()
            .filter(|k| k.as_str() != ATTRIBUTE_KEY && k.as_str() != TEXT_KEY);
        match (keys.next(), keys.next()) {
            (Some(key), None) => Ok(key.as_str()),
            (None, _) => Err(ConvertError::MalformedInput {
                path: format!("{}/<record> (no record found)", self.path),
            }),
            (Some(_), Some(_)) => Err(ConvertError::MalformedInput {
                path: format!("{}/<record> (more than one record key)", self.path),
            }),
        }
    }

    fn text(&self, key: &str) -> Result<String, ConvertError> {
        let path = self.join(key);
        let value = self.value.get(key).ok_or_else(|| self.missing(key))?;
        leaf_text(value).ok_or(ConvertError::MalformedInput { path })
    }

    fn own_text(&self) -> Result<String, ConvertError> {
        leaf_text(self.value).ok_or_else(|| ConvertError::MalformedInput { path: self.path.clone() })
    }
}

/// Text of a leaf element in any of the shapes a parser may produce.
fn leaf_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) if items.len() == 1 => leaf_text(&items[0]),
        Value::Object(map) => {
            let has_children = map.keys().any(|k| k != ATTRIBUTE_KEY && k != TEXT_KEY);
            if has_children {
                return None;
            }
            match map.get(TEXT_KEY) {
                Some(text) => leaf_text(text),
                None => Some(String::new()),
            }
        }
        _ => None,
    }
}
