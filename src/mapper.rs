//! Template Mapper - Single Conversion Entry Point
//!
//! Extraction and validation finish before the skeleton is built, so a
//! failure never leaves a half-populated document behind.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::document::{parse_xml, serialize_xml, Document, ParseOptions, SerializeOptions};
use crate::extract::SourceFeature;
use crate::geometry::remap_bbox;
use crate::ids::{href, IdGenerator, PlanIds, RandomIds};
use crate::skeleton::{self, build_skeleton, write_slot, SkeletonConfig, DEFAULT_SRS_NAME};
use crate::validation::{FailureMode, PlanInput, ValidationResult, Validator};

#[cfg(feature = "test-hooks")]
use std::sync::atomic::{AtomicU32, Ordering};

#[cfg(feature = "test-hooks")]
static VALIDATION_CALL_COUNT: AtomicU32 = AtomicU32::new(0);

#[cfg(feature = "test-hooks")]
pub fn get_validation_call_count() -> u32 {
    VALIDATION_CALL_COUNT.load(Ordering::SeqCst)
}

#[cfg(feature = "test-hooks")]
pub fn reset_validation_call_count() {
    VALIDATION_CALL_COUNT.store(0, Ordering::SeqCst);
}

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("Malformed input: missing or invalid {path}")]
    MalformedInput { path: String },

    #[error("XML parse error: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("Serialization error: {0}")]
    Serialize(String),

    #[error("Skeleton slot not found: {0}")]
    Skeleton(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapperConfig {
    #[serde(default = "default_srs_name")]
    pub srs_name: String,
    #[serde(default)]
    pub failure_mode: FailureMode,
    #[serde(default = "default_indent")]
    pub indent: String,
}

fn default_srs_name() -> String { DEFAULT_SRS_NAME.to_string() }
fn default_indent() -> String { "  ".to_string() }

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            srs_name: default_srs_name(),
            failure_mode: FailureMode::default(),
            indent: default_indent(),
        }
    }
}

impl MapperConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, ConvertError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Everything one conversion produced, before rendering
#[derive(Debug, Clone)]
pub struct Conversion {
    pub feature: SourceFeature,
    pub ids: PlanIds,
    pub validation: ValidationResult,
    pub document: Document,
}

/// Maps an OGR GML export onto a fresh XPlanAuszug skeleton
pub struct TemplateMapper {
    config: MapperConfig,
    validator: Validator,
    ids: Box<dyn IdGenerator>,
}

impl TemplateMapper {
    pub fn new(config: MapperConfig) -> Self {
        Self {
            config,
            validator: Validator::new(),
            ids: Box::new(RandomIds),
        }
    }

    /// Replace the id source, e.g. with fixed values for reproducible output
    pub fn with_id_generator(mut self, ids: Box<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    /// Parse XML text, then convert it
    pub fn convert_text(&mut self, xml: &str) -> Result<String, ConvertError> {
        let input = parse_xml(xml, &ParseOptions::default())?;
        self.convert(&input)
    }

    /// Convert a parsed input document to XPlanGML text
    pub fn convert(&mut self, input: &Document) -> Result<String, ConvertError> {
        let conversion = self.convert_document(input)?;
        self.render(&conversion.document)
    }

    pub fn render(&self, document: &Document) -> Result<String, ConvertError> {
        let options = SerializeOptions {
            indent: self.config.indent.clone(),
            ..SerializeOptions::default()
        };
        serialize_xml(document, &options)
    }

    /// Validate the extracted data against the configured policy.
    ///
    /// This is the ONLY validation entry point; `convert_document` always
    /// goes through it.
    pub fn validate(&self, feature: &SourceFeature) -> Result<ValidationResult, ConvertError> {
        #[cfg(feature = "test-hooks")]
        VALIDATION_CALL_COUNT.fetch_add(1, Ordering::SeqCst);

        let input = PlanInput { feature, srs_name: &self.config.srs_name };
        let result = self.validator.validate(&input, self.config.failure_mode);

        if !result.valid {
            let messages: Vec<_> = result
                .violations
                .iter()
                .map(|v| format!("{}: {}", v.rule, v.message))
                .collect();
            return Err(ConvertError::ValidationFailed(messages.join("; ")));
        }

        Ok(result)
    }

    pub fn convert_document(&mut self, input: &Document) -> Result<Conversion, ConvertError> {
        let feature = SourceFeature::extract(input)?;
        let validation = self.validate(&feature)?;

        let bbox = &feature.bbox;
        let envelope = remap_bbox(&bbox.east, &bbox.south, &bbox.west, &bbox.north);
        let ids = PlanIds::generate(self.ids.as_mut());
        tracing::debug!(document_id = %ids.document, plan = %feature.name, "derived values ready");

        let mut document = build_skeleton(&SkeletonConfig { srs_name: self.config.srs_name.clone() });

        let writes = [
            (skeleton::PLAN_NAME, feature.name.as_str()),
            (skeleton::PLAN_NUMBER, feature.nummer.as_str()),
            (skeleton::GEMEINDE_AGS, feature.ags.as_str()),
            (skeleton::GEMEINDE_NAME, feature.gemeinde_name.as_str()),
            (skeleton::GEMEINDE_ORTSTEIL, feature.ortsteil_name.as_str()),
            (skeleton::PLANGEBER_NAME, feature.plangeber.as_str()),
            (skeleton::PLAN_ART, feature.plan_art.as_str()),
            (skeleton::RECHTSSTAND, feature.rechtsstand.as_str()),
            (skeleton::AUFSTELLUNGSBESCHLUSS_DATUM, feature.aufstellungsbeschluss_datum.as_str()),
            (skeleton::ROOT_LOWER_CORNER, envelope.lower_corner.as_str()),
            (skeleton::ROOT_UPPER_CORNER, envelope.upper_corner.as_str()),
            (skeleton::PLAN_LOWER_CORNER, envelope.lower_corner.as_str()),
            (skeleton::PLAN_UPPER_CORNER, envelope.upper_corner.as_str()),
            (skeleton::PLAN_POS_LIST, feature.pos_list.as_str()),
        ];
        for (slot, value) in writes {
            write_slot(&mut document, slot, value)?;
        }

        let bereich_href = href(&ids.bereich);
        let plan_href = href(&ids.plan);
        let links = [
            (skeleton::DOCUMENT_ID, ids.document.as_str()),
            (skeleton::BEREICH_ID, ids.bereich.as_str()),
            (skeleton::PLAN_BEREICH_HREF, bereich_href.as_str()),
            (skeleton::PLAN_ID, ids.plan.as_str()),
            (skeleton::BEREICH_PLAN_HREF, plan_href.as_str()),
            (skeleton::PLAN_GEOMETRY_ID, ids.geometry.as_str()),
        ];
        for (slot, value) in links {
            write_slot(&mut document, slot, value)?;
        }

        tracing::info!(record = %feature.record_type, plan = %feature.name, "converted plan boundary");

        Ok(Conversion { feature, ids, validation, document })
    }
}

impl Default for TemplateMapper {
    fn default() -> Self {
        Self::new(MapperConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequenceIds;
    use serde_json::json;

    fn input(name: &str, ring: &str) -> Document {
        json!({
            "ogr:FeatureCollection": [{
                "gml:boundedBy": [{
                    "gml:Box": [{
                        "gml:coord": [
                            { "gml:X": ["403000.5"], "gml:Y": ["5700000.0"] },
                            { "gml:X": ["403500.5"], "gml:Y": ["5700500.0"] }
                        ]
                    }]
                }],
                "gml:featureMember": [{
                    "ogr:umring": [{
                        "ogr:geometryProperty": [{
                            "gml:Polygon": [{
                                "gml:outerBoundaryIs": [{
                                    "gml:LinearRing": [{ "gml:coordinates": [ring] }]
                                }]
                            }]
                        }],
                        "ogr:name": [name],
                        "ogr:nummer": ["5"],
                        "ogr:ags": ["12345678"],
                        "ogr:gemeindeName": ["Viersen"],
                        "ogr:ortsteilName": ["Dülken"],
                        "ogr:plangeber": ["Stadt Viersen"],
                        "ogr:planArt": [10001],
                        "ogr:rechtsstand": [1000],
                        "ogr:aufstellungsbeschlussDatum": ["2022-09-01"]
                    }]
                }]
            }]
        })
    }

    fn fixed_mapper() -> TemplateMapper {
        TemplateMapper::default().with_id_generator(Box::new(SequenceIds::new(["r", "b", "p", "g"])))
    }

    #[test]
    fn test_convert_document_populates_slots() {
        let conversion = fixed_mapper().convert_document(&input("Testplan", "0,0 10,0 10,10")).unwrap();
        let doc = &conversion.document;
        let ptr = |slot: skeleton::Slot| doc.pointer(&slot.pointer()).cloned().unwrap();

        assert_eq!(ptr(skeleton::PLAN_NAME), "Testplan");
        assert_eq!(ptr(skeleton::PLAN_POS_LIST), "10 10 10 0 0 0");
        assert_eq!(ptr(skeleton::ROOT_LOWER_CORNER), "403000.5 5700000.0");
        assert_eq!(ptr(skeleton::PLAN_UPPER_CORNER), "403500.5 5700500.0");
        assert_eq!(ptr(skeleton::PLAN_ART), "10001");
        assert_eq!(ptr(skeleton::GEMEINDE_ORTSTEIL), "Dülken");
    }

    #[test]
    fn test_cross_references_wired() {
        let conversion = fixed_mapper().convert_document(&input("Testplan", "0,0 1,1")).unwrap();
        let doc = &conversion.document;
        let ptr = |slot: skeleton::Slot| doc.pointer(&slot.pointer()).cloned().unwrap();

        assert_eq!(ptr(skeleton::DOCUMENT_ID), "GML_r");
        assert_eq!(ptr(skeleton::BEREICH_ID), "ID_b");
        assert_eq!(ptr(skeleton::PLAN_ID), "ID_p");
        assert_eq!(ptr(skeleton::PLAN_GEOMETRY_ID), "ID_g");
        assert_eq!(ptr(skeleton::BEREICH_PLAN_HREF), "#ID_p");
        assert_eq!(ptr(skeleton::PLAN_BEREICH_HREF), "#ID_b");
    }

    #[test]
    fn test_empty_ring_fails_before_output() {
        let mut mapper = fixed_mapper();
        let err = mapper.convert(&input("Testplan", "")).unwrap_err();
        assert!(matches!(err, ConvertError::MalformedInput { .. }));
    }

    #[test]
    fn test_block_mode_rejects_unknown_srs() {
        let config = MapperConfig {
            srs_name: "EPSG:4326".into(),
            failure_mode: FailureMode::Block,
            ..MapperConfig::default()
        };
        let err = TemplateMapper::new(config).convert(&input("Testplan", "0,0 1,1")).unwrap_err();
        assert!(err.to_string().contains("srs_name"));
    }

    #[test]
    fn test_warn_mode_keeps_violations() {
        let conversion = fixed_mapper().convert_document(&input("Plan #1", "0,0 1,1")).unwrap();
        assert!(conversion.validation.valid);
        assert_eq!(conversion.validation.violations[0].rule, "plan_name_charset");
    }

    #[test]
    fn test_config_defaults_from_empty_json() {
        let config: MapperConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.srs_name, "EPSG:25832");
        assert_eq!(config.failure_mode, FailureMode::Warn);
        assert_eq!(config.indent, "  ");
    }

    #[test]
    fn test_config_reads_camel_case() {
        let config: MapperConfig =
            serde_json::from_str(r#"{"srsName": "EPSG:25833", "failureMode": "block"}"#).unwrap();
        assert_eq!(config.srs_name, "EPSG:25833");
        assert_eq!(config.failure_mode, FailureMode::Block);
    }
}
