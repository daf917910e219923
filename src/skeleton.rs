//! Output Skeleton - The XPlanAuszug Contract
//!
//! A fresh skeleton is built for every conversion. Slots are addressed by
//! JSON pointers into the tree-of-mappings document.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::document::Document;
use crate::mapper::ConvertError;

pub const DEFAULT_SRS_NAME: &str = "EPSG:25832";

/// Coordinate reference systems accepted by XPlanung tooling
pub const SUPPORTED_SRS: &[&str] = &[
    "EPSG:25831",
    "EPSG:25832",
    "EPSG:25833",
    "EPSG:5649",
    "EPSG:4647",
    "EPSG:5650",
    "EPSG:5651",
    "EPSG:5652",
    "EPSG:5653",
    "EPSG:31466",
    "EPSG:31467",
    "EPSG:31468",
    "EPSG:31469",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SkeletonConfig {
    #[serde(default = "default_srs_name")]
    pub srs_name: String,
}

fn default_srs_name() -> String { DEFAULT_SRS_NAME.to_string() }

impl Default for SkeletonConfig {
    fn default() -> Self {
        Self { srs_name: default_srs_name() }
    }
}

const ROOT: &str = "/xplan:XPlanAuszug/0";
const BEREICH: &str = "/xplan:XPlanAuszug/0/gml:featureMember/0/xplan:BP_Bereich/0";
const PLAN: &str = "/xplan:XPlanAuszug/0/gml:featureMember/1/xplan:BP_Plan/0";

/// A write target in the skeleton
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    base: &'static str,
    rest: &'static str,
}

impl Slot {
    const fn new(base: &'static str, rest: &'static str) -> Self {
        Self { base, rest }
    }

    pub fn pointer(&self) -> String {
        format!("{}{}", self.base, self.rest)
    }
}

pub const DOCUMENT_ID: Slot = Slot::new(ROOT, "/@/gml:id");
pub const ROOT_LOWER_CORNER: Slot = Slot::new(ROOT, "/gml:boundedBy/0/gml:Envelope/0/gml:lowerCorner");
pub const ROOT_UPPER_CORNER: Slot = Slot::new(ROOT, "/gml:boundedBy/0/gml:Envelope/0/gml:upperCorner");

pub const BEREICH_ID: Slot = Slot::new(BEREICH, "/@/gml:id");
pub const BEREICH_PLAN_HREF: Slot = Slot::new(BEREICH, "/xplan:gehoertZuPlan/0/@/xlink:href");

pub const PLAN_ID: Slot = Slot::new(PLAN, "/@/gml:id");
pub const PLAN_LOWER_CORNER: Slot = Slot::new(PLAN, "/gml:boundedBy/0/gml:Envelope/0/gml:lowerCorner");
pub const PLAN_UPPER_CORNER: Slot = Slot::new(PLAN, "/gml:boundedBy/0/gml:Envelope/0/gml:upperCorner");
pub const PLAN_NAME: Slot = Slot::new(PLAN, "/xplan:name");
pub const PLAN_NUMBER: Slot = Slot::new(PLAN, "/xplan:nummer");
pub const PLAN_GEOMETRY_ID: Slot = Slot::new(PLAN, "/xplan:raeumlicherGeltungsbereich/0/gml:Polygon/0/@/gml:id");
pub const PLAN_POS_LIST: Slot = Slot::new(
    PLAN,
    "/xplan:raeumlicherGeltungsbereich/0/gml:Polygon/0/gml:exterior/0/gml:LinearRing/0/gml:posList/0/#text",
);
pub const GEMEINDE_AGS: Slot = Slot::new(PLAN, "/xplan:gemeinde/0/xplan:XP_Gemeinde/0/xplan:ags");
pub const GEMEINDE_NAME: Slot = Slot::new(PLAN, "/xplan:gemeinde/0/xplan:XP_Gemeinde/0/xplan:gemeindeName");
pub const GEMEINDE_ORTSTEIL: Slot = Slot::new(PLAN, "/xplan:gemeinde/0/xplan:XP_Gemeinde/0/xplan:ortsteilName");
pub const PLANGEBER_NAME: Slot = Slot::new(PLAN, "/xplan:plangeber/0/xplan:XP_Plangeber/0/xplan:name");
pub const PLAN_ART: Slot = Slot::new(PLAN, "/xplan:planArt");
pub const RECHTSSTAND: Slot = Slot::new(PLAN, "/xplan:rechtsstand");
pub const AUFSTELLUNGSBESCHLUSS_DATUM: Slot = Slot::new(PLAN, "/xplan:aufstellungsbeschlussDatum");
pub const PLAN_BEREICH_HREF: Slot = Slot::new(PLAN, "/xplan:bereich/0/@/xlink:href");

/// Write a string into an existing skeleton slot.
///
/// Slots are never created on the fly: a missing slot means the skeleton
/// and the slot table disagree.
pub fn write_slot(document: &mut Document, slot: Slot, value: &str) -> Result<(), ConvertError> {
    let pointer = slot.pointer();
    let target = document
        .pointer_mut(&pointer)
        .ok_or_else(|| ConvertError::Skeleton(pointer.clone()))?;
    *target = Value::String(value.to_string());
    Ok(())
}

fn envelope(srs_name: &str) -> Value {
    json!([{
        "gml:Envelope": [{
            "@": { "srsName": srs_name },
            "gml:lowerCorner": "",
            "gml:upperCorner": ""
        }]
    }])
}

/// Build a fresh, unpopulated XPlanAuszug document.
pub fn build_skeleton(config: &SkeletonConfig) -> Document {
    let srs = config.srs_name.as_str();

    json!({
        "xplan:XPlanAuszug": [{
            "@": {
                "xmlns:adv": "http://www.adv-online.de/nas",
                "xmlns:gml": "http://www.opengis.net/gml/3.2",
                "xmlns:xlink": "http://www.w3.org/1999/xlink",
                "xmlns:xplan": "http://www.xplanung.de/xplangml/5/2",
                "xmlns:xs": "http://www.w3.org/2001/XMLSchema",
                "xmlns:xsi": "http://www.w3.org/2001/XMLSchema-instance",
                "xmlns:wfs": "http://www.opengis.net/wfs/2.0",
                "gml:id": ""
            },
            "gml:boundedBy": envelope(srs),
            "gml:featureMember": [{
                "xplan:BP_Bereich": [{
                    "@": { "gml:id": "" },
                    "xplan:nummer": 0,
                    "xplan:name": "Basisplan",
                    "xplan:gehoertZuPlan": [{
                        "@": { "xlink:href": "" }
                    }]
                }]
            }, {
                "xplan:BP_Plan": [{
                    "@": { "gml:id": "" },
                    "gml:boundedBy": envelope(srs),
                    "xplan:name": "",
                    "xplan:nummer": "",
                    "xplan:raeumlicherGeltungsbereich": [{
                        "gml:Polygon": [{
                            "@": { "srsName": srs, "gml:id": "" },
                            "gml:exterior": [{
                                "gml:LinearRing": [{
                                    "gml:posList": [{
                                        "#text": "",
                                        "@": { "srsDimension": "2" }
                                    }]
                                }]
                            }]
                        }]
                    }],
                    "xplan:gemeinde": [{
                        "xplan:XP_Gemeinde": [{
                            "xplan:ags": "",
                            "xplan:gemeindeName": "",
                            "xplan:ortsteilName": ""
                        }]
                    }],
                    "xplan:plangeber": [{
                        "xplan:XP_Plangeber": [{
                            "xplan:name": ""
                        }]
                    }],
                    "xplan:planArt": 10001,
                    "xplan:rechtsstand": 1000,
                    "xplan:aufstellungsbeschlussDatum": "",
                    "xplan:bereich": [{
                        "@": { "xlink:href": "" }
                    }]
                }]
            }]
        }]
    })
}
