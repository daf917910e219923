//! XPlan-Umring Core - GML plan boundary to XPlanGML
//!
//! Reads a single-feature OGR GML export of a plan boundary and writes a
//! minimal XPlanGML 5.2 `XPlanAuszug` (one BP_Bereich, one BP_Plan).
//!
//! Pipeline: parse -> extract -> validate -> derive -> populate a fresh
//! skeleton -> serialize -> archive.

pub mod document;
pub mod extract;
pub mod geometry;
pub mod ids;
pub mod skeleton;
pub mod validation;
pub mod hashing;
pub mod archive;
pub mod mapper;

pub use document::{parse_xml, serialize_xml, Document, ParseOptions, SerializeOptions};
pub use extract::{SourceBbox, SourceFeature};
pub use geometry::{remap_bbox, reorder_ring, Envelope};
pub use ids::{IdGenerator, PlanIds, RandomIds, SequenceIds};
pub use skeleton::{build_skeleton, SkeletonConfig};
pub use validation::{FailureMode, ValidationResult, ValidationViolation, ViolationSeverity};
pub use archive::{archive_and_offer, archive_bytes, slugify_safe, ConversionReport, ENTRY_NAME};
pub use mapper::{Conversion, ConvertError, MapperConfig, TemplateMapper};
