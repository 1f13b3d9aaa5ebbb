//! Layout 4.00 XML generation and structural validation.

pub mod document;
pub mod validate;
pub mod xml_utils;

pub use document::{LAYOUT_VERSION, NFE_NAMESPACE, build_nfe_xml};
pub use validate::{StructuralValidator, ValidationReport};
pub use xml_utils::{XmlWriter, format_fixed};
