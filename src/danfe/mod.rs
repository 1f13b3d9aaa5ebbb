//! DANFE rendering: the printable companion of an emitted document.

pub mod layout;
pub mod pdf;
pub mod qr;

pub use layout::render_danfe;
pub use pdf::{Font, PageCanvas, PdfBuilder};
