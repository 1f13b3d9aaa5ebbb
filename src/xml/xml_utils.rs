use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use rust_decimal::{Decimal, RoundingStrategy};
use std::io::Cursor;

use crate::core::NfeError;

fn xml_io(e: std::io::Error) -> NfeError {
    NfeError::Xml(format!("XML write error: {e}"))
}

/// Thin wrapper over the quick-xml writer with the element helpers the
/// fiscal layout needs.
pub struct XmlWriter {
    writer: Writer<Cursor<Vec<u8>>>,
}

impl XmlWriter {
    pub fn new() -> Result<Self, NfeError> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(xml_io)?;
        Ok(Self { writer })
    }

    pub fn into_string(self) -> Result<String, NfeError> {
        let buf = self.writer.into_inner().into_inner();
        String::from_utf8(buf).map_err(|e| NfeError::Xml(format!("XML UTF-8 error: {e}")))
    }

    pub fn start_element(&mut self, name: &str) -> Result<&mut Self, NfeError> {
        self.writer
            .write_event(Event::Start(BytesStart::new(name)))
            .map_err(xml_io)?;
        Ok(self)
    }

    pub fn start_element_with_attrs(
        &mut self,
        name: &str,
        attrs: &[(&str, &str)],
    ) -> Result<&mut Self, NfeError> {
        let mut elem = BytesStart::new(name);
        for (k, v) in attrs {
            elem.push_attribute((*k, *v));
        }
        self.writer
            .write_event(Event::Start(elem))
            .map_err(xml_io)?;
        Ok(self)
    }

    pub fn end_element(&mut self, name: &str) -> Result<&mut Self, NfeError> {
        self.writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(xml_io)?;
        Ok(self)
    }

    pub fn text_element(&mut self, name: &str, text: &str) -> Result<&mut Self, NfeError> {
        self.start_element(name)?;
        self.writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(xml_io)?;
        self.end_element(name)
    }

    /// Write the element only when a value is present.
    pub fn opt_text_element(
        &mut self,
        name: &str,
        text: Option<&str>,
    ) -> Result<&mut Self, NfeError> {
        match text {
            Some(t) => self.text_element(name, t),
            None => Ok(self),
        }
    }

    /// Splice an already-serialized fragment as-is, without escaping.
    ///
    /// Used for signed documents inside batch envelopes: re-escaping would
    /// break the signature.
    pub fn raw_fragment(&mut self, xml: &str) -> Result<&mut Self, NfeError> {
        self.writer
            .write_event(Event::Text(BytesText::from_escaped(xml)))
            .map_err(xml_io)?;
        Ok(self)
    }

    /// Monetary value — exactly 2 decimal places.
    pub fn money_element(&mut self, name: &str, value: Decimal) -> Result<&mut Self, NfeError> {
        self.text_element(name, &format_fixed(value, 2))
    }
}

/// Format a decimal with exactly `places` decimal places, rounding half
/// away from zero. The fiscal layout mandates fixed widths per field
/// family: quantities 4, unit prices 10, monetary values 2, weights 3.
pub fn format_fixed(value: Decimal, places: u32) -> String {
    let rounded = value.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero);
    let s = rounded.to_string();
    if places == 0 {
        return s;
    }
    match s.find('.') {
        Some(dot) => {
            let decimals = s.len() - dot - 1;
            if decimals < places as usize {
                format!("{s}{}", "0".repeat(places as usize - decimals))
            } else {
                s
            }
        }
        None => format!("{s}.{}", "0".repeat(places as usize)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn fixed_decimal_widths() {
        assert_eq!(format_fixed(dec!(100), 2), "100.00");
        assert_eq!(format_fixed(dec!(25.5), 2), "25.50");
        assert_eq!(format_fixed(dec!(10), 4), "10.0000");
        assert_eq!(format_fixed(dec!(25.5), 10), "25.5000000000");
        assert_eq!(format_fixed(dec!(1.005), 2), "1.01");
        assert_eq!(format_fixed(dec!(2.1234567), 4), "2.1235");
        assert_eq!(format_fixed(dec!(7), 0), "7");
    }

    #[test]
    fn writer_escapes_text() {
        let mut w = XmlWriter::new().unwrap();
        w.start_element("natOp")
            .unwrap()
            .end_element("natOp")
            .unwrap();
        w.text_element("xNome", "Compra & Venda <SA>").unwrap();
        let xml = w.into_string().unwrap();
        assert!(xml.contains("Compra &amp; Venda &lt;SA&gt;"));
    }
}
