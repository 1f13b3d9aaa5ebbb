//! Structural validation of generated documents before transmission.
//!
//! Validation is advisory between generation and transmission: a failing
//! report stops the pipeline before any network traffic, but the checks
//! here are a structural checklist, not the full fiscal schema. When the
//! official schema set is not installed the validator degrades to
//! checklist-only mode and says so through a non-fatal warning.

use std::collections::HashSet;

use quick_xml::Reader;
use quick_xml::events::Event;

use super::document::{LAYOUT_VERSION, NFE_NAMESPACE};

/// Outcome of a validation pass. `valid` reflects errors only; warnings
/// never block transmission.
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Elements every NFe document must carry, as paths under `NFe/infNFe`.
const REQUIRED_ELEMENTS: &[&str] = &[
    "ide",
    "ide/cUF",
    "ide/cNF",
    "ide/natOp",
    "ide/mod",
    "ide/serie",
    "ide/nNF",
    "ide/dhEmi",
    "ide/tpEmis",
    "ide/cDV",
    "ide/tpAmb",
    "emit",
    "emit/CNPJ",
    "emit/xNome",
    "emit/enderEmit",
    "emit/IE",
    "emit/CRT",
    "dest",
    "dest/xNome",
    "dest/enderDest",
    "det",
    "det/prod",
    "det/prod/cProd",
    "det/prod/xProd",
    "det/prod/NCM",
    "det/prod/CFOP",
    "det/imposto",
    "total",
    "total/ICMSTot",
    "total/ICMSTot/vNF",
    "transp",
    "transp/modFrete",
    "pag",
    "pag/detPag",
];

/// Checklist validator for layout 4.00 documents.
pub struct StructuralValidator {
    schemas_available: bool,
}

impl Default for StructuralValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl StructuralValidator {
    /// Checklist-only validator; reports schema absence as a warning.
    pub fn new() -> Self {
        Self {
            schemas_available: false,
        }
    }

    /// Mark the official schema set as installed, silencing the
    /// degraded-mode warning. Schema resolution itself is the embedding
    /// application's concern.
    pub fn with_schemas(mut self, available: bool) -> Self {
        self.schemas_available = available;
        self
    }

    pub fn validate(&self, xml: &str) -> ValidationReport {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if xml.trim().is_empty() {
            errors.push("document is empty".into());
            return ValidationReport {
                valid: false,
                errors,
                warnings,
            };
        }
        if !xml.starts_with("<?xml") || !xml[..xml.len().min(120)].contains("UTF-8") {
            errors.push("missing UTF-8 XML declaration".into());
        }

        match collect_paths(xml) {
            Ok(scan) => {
                check_structure(&scan, &mut errors);
            }
            Err(e) => errors.push(format!("malformed XML: {e}")),
        }

        if !self.schemas_available {
            warnings.push(
                "official schema set not installed; structural checklist applied only".into(),
            );
        }

        ValidationReport {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }
}

struct DocumentScan {
    paths: HashSet<String>,
    root_namespace: Option<String>,
    inf_nfe_id: Option<String>,
    inf_nfe_version: Option<String>,
}

fn collect_paths(xml: &str) -> Result<DocumentScan, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut scan = DocumentScan {
        paths: HashSet::new(),
        root_namespace: None,
        inf_nfe_id: None,
        inf_nfe_version: None,
    };
    let mut stack: Vec<String> = Vec::new();

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                record_attrs(&mut scan, stack.is_empty(), &name, &e);
                stack.push(name);
                scan.paths.insert(stack.join("/"));
            }
            Event::Empty(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                record_attrs(&mut scan, stack.is_empty(), &name, &e);
                if stack.is_empty() {
                    scan.paths.insert(name);
                } else {
                    scan.paths.insert(format!("{}/{name}", stack.join("/")));
                }
            }
            Event::End(_) => {
                stack.pop();
            }
            Event::Eof => break,
            _ => {}
        }
    }
    if !stack.is_empty() {
        return Err(format!("unclosed element {}", stack.join("/")));
    }
    Ok(scan)
}

fn record_attrs(
    scan: &mut DocumentScan,
    is_root: bool,
    name: &str,
    e: &quick_xml::events::BytesStart<'_>,
) {
    if is_root && name == "NFe" {
        for attr in e.attributes().flatten() {
            if attr.key.as_ref() == b"xmlns" {
                scan.root_namespace = Some(String::from_utf8_lossy(&attr.value).into_owned());
            }
        }
    }
    if name == "infNFe" {
        for attr in e.attributes().flatten() {
            match attr.key.as_ref() {
                b"Id" => {
                    scan.inf_nfe_id = Some(String::from_utf8_lossy(&attr.value).into_owned());
                }
                b"versao" => {
                    scan.inf_nfe_version = Some(String::from_utf8_lossy(&attr.value).into_owned());
                }
                _ => {}
            }
        }
    }
}

fn check_structure(scan: &DocumentScan, errors: &mut Vec<String>) {
    if !scan.paths.contains("NFe") {
        errors.push("root element must be NFe".into());
        return;
    }
    match &scan.root_namespace {
        Some(ns) if ns == NFE_NAMESPACE => {}
        Some(ns) => errors.push(format!("unexpected namespace {ns}")),
        None => errors.push(format!("missing namespace {NFE_NAMESPACE}")),
    }
    if !scan.paths.contains("NFe/infNFe") {
        errors.push("missing infNFe element".into());
        return;
    }
    match &scan.inf_nfe_version {
        Some(v) if v == LAYOUT_VERSION => {}
        Some(v) => errors.push(format!("unsupported layout version {v}, expected 4.00")),
        None => errors.push("infNFe missing versao attribute".into()),
    }
    match &scan.inf_nfe_id {
        Some(id)
            if id.len() == 47
                && id.starts_with("NFe")
                && id[3..].bytes().all(|b| b.is_ascii_digit()) => {}
        Some(id) => errors.push(format!(
            "infNFe Id must be \"NFe\" + 44 digits, got {id:?}"
        )),
        None => errors.push("infNFe missing Id attribute".into()),
    }
    for required in REQUIRED_ELEMENTS {
        let full = format!("NFe/infNFe/{required}");
        if !scan.paths.contains(&full) {
            errors.push(format!("missing required element {required}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_invalid() {
        let report = StructuralValidator::new().validate("");
        assert!(!report.valid);
        assert!(report.errors.iter().any(|e| e.contains("empty")));
    }

    #[test]
    fn malformed_xml_is_invalid() {
        let report =
            StructuralValidator::new().validate("<?xml version=\"1.0\" encoding=\"UTF-8\"?><NFe><ide>");
        assert!(!report.valid);
        assert!(report.errors.iter().any(|e| e.contains("malformed")));
    }

    #[test]
    fn degraded_mode_warns_without_blocking() {
        let report = StructuralValidator::new().validate("");
        assert!(
            report
                .warnings
                .iter()
                .any(|w| w.contains("schema set not installed"))
        );
        let strict = StructuralValidator::new().with_schemas(true).validate("");
        assert!(strict.warnings.is_empty());
    }

    #[test]
    fn wrong_root_is_reported() {
        let report = StructuralValidator::new()
            .validate("<?xml version=\"1.0\" encoding=\"UTF-8\"?><nota></nota>");
        assert!(!report.valid);
        assert!(report.errors.iter().any(|e| e.contains("root element")));
    }
}
