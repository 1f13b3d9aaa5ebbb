//! QR code rendering for the consumer document (NFC-e).
//!
//! The lookup URL is encoded and drawn as filled rectangles directly in
//! the page content stream, one per dark module.

use qrcode::QrCode;

use crate::core::NfeError;

/// PDF operators drawing the QR for `url` with its bottom-left corner at
/// `(x, y)`, scaled to fit a `size`-point square.
pub fn qr_ops(url: &str, x: f32, y: f32, size: f32) -> Result<String, NfeError> {
    let code = QrCode::new(url.as_bytes())
        .map_err(|e| NfeError::Validation(format!("QR encoding failed: {e}")))?;
    let width = code.width();
    let module = size / width as f32;

    let mut ops = String::new();
    let colors = code.to_colors();
    for (i, color) in colors.iter().enumerate() {
        if *color == qrcode::Color::Dark {
            let col = (i % width) as f32;
            // Row 0 is the top of the symbol; PDF y grows upward.
            let row = (i / width) as f32;
            let mx = x + col * module;
            let my = y + size - (row + 1.0) * module;
            ops.push_str(&format!("{mx:.2} {my:.2} {module:.2} {module:.2} re f\n"));
        }
    }
    Ok(ops)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produces_fill_operators() {
        let ops = qr_ops("https://www.nfce.fazenda.sp.gov.br/consulta?p=35", 50.0, 50.0, 80.0)
            .unwrap();
        assert!(ops.contains(" re f"));
        assert!(ops.lines().count() > 100);
    }

    #[test]
    fn modules_stay_inside_the_square() {
        let ops = qr_ops("https://example.gov.br/consulta", 100.0, 200.0, 80.0).unwrap();
        for line in ops.lines() {
            let mut parts = line.split_whitespace();
            let mx: f32 = parts.next().unwrap().parse().unwrap();
            let my: f32 = parts.next().unwrap().parse().unwrap();
            assert!((100.0..180.0).contains(&mx));
            assert!((199.0..280.0).contains(&my));
        }
    }
}
