//! Symbology classes and decoder formats.

use serde::{Deserialize, Serialize};

/// Class label the object detector assigns to a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbologyClass {
    /// Square 2D code.
    Qr,
    /// Elongated 1D barcode.
    Linear,
}

impl SymbologyClass {
    /// Map a detector label to a class. Anything that is not "QR" is a barcode.
    pub fn from_label(label: &str) -> Self {
        if label.trim().eq_ignore_ascii_case("qr") {
            SymbologyClass::Qr
        } else {
            SymbologyClass::Linear
        }
    }

    /// Label shown in overlays and reported for QR-path decodes.
    pub fn label(self) -> &'static str {
        match self {
            SymbologyClass::Qr => "QR",
            SymbologyClass::Linear => "BAR",
        }
    }
}

/// Formats understood by the permissive multi-format decoder.
///
/// Declaration order matches the numeric format ids reported by the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BarcodeFormat {
    Aztec,
    Codabar,
    Code39,
    Code93,
    Code128,
    DataMatrix,
    Ean8,
    Ean13,
    Itf,
    MaxiCode,
    Pdf417,
    QrCode,
    Rss14,
    RssExpanded,
    UpcA,
    UpcE,
    UpcEanExtension,
}

impl BarcodeFormat {
    /// All formats, in id order.
    pub const ALL: [BarcodeFormat; 17] = [
        BarcodeFormat::Aztec,
        BarcodeFormat::Codabar,
        BarcodeFormat::Code39,
        BarcodeFormat::Code93,
        BarcodeFormat::Code128,
        BarcodeFormat::DataMatrix,
        BarcodeFormat::Ean8,
        BarcodeFormat::Ean13,
        BarcodeFormat::Itf,
        BarcodeFormat::MaxiCode,
        BarcodeFormat::Pdf417,
        BarcodeFormat::QrCode,
        BarcodeFormat::Rss14,
        BarcodeFormat::RssExpanded,
        BarcodeFormat::UpcA,
        BarcodeFormat::UpcE,
        BarcodeFormat::UpcEanExtension,
    ];

    /// Map a reader's numeric format id. Unknown ids fall back to QR.
    pub fn from_index(index: u32) -> Self {
        Self::ALL
            .get(index as usize)
            .copied()
            .unwrap_or(BarcodeFormat::QrCode)
    }

    /// Human-readable symbology label.
    pub fn label(self) -> &'static str {
        match self {
            BarcodeFormat::Aztec => "Aztec",
            BarcodeFormat::Codabar => "CODABAR",
            BarcodeFormat::Code39 => "Code 39",
            BarcodeFormat::Code93 => "Code 93",
            BarcodeFormat::Code128 => "Code 128",
            BarcodeFormat::DataMatrix => "Data Matrix",
            BarcodeFormat::Ean8 => "EAN-8",
            BarcodeFormat::Ean13 => "EAN-13",
            BarcodeFormat::Itf => "ITF",
            BarcodeFormat::MaxiCode => "MaxiCode",
            BarcodeFormat::Pdf417 => "PDF417",
            BarcodeFormat::QrCode => "QR Code",
            BarcodeFormat::Rss14 => "RSS 14",
            BarcodeFormat::RssExpanded => "RSS EXPANDED",
            BarcodeFormat::UpcA => "UPC-A",
            BarcodeFormat::UpcE => "UPC-E",
            BarcodeFormat::UpcEanExtension => "UPC/EAN",
        }
    }

    pub fn is_matrix(self) -> bool {
        matches!(
            self,
            BarcodeFormat::Aztec
                | BarcodeFormat::DataMatrix
                | BarcodeFormat::MaxiCode
                | BarcodeFormat::QrCode
        )
    }

    pub fn is_stacked(self) -> bool {
        matches!(
            self,
            BarcodeFormat::Pdf417 | BarcodeFormat::Rss14 | BarcodeFormat::RssExpanded
        )
    }

    pub fn is_linear(self) -> bool {
        !self.is_matrix() && !self.is_stacked()
    }
}

/// Format hints handed to the permissive decoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeHints {
    pub possible_formats: Vec<BarcodeFormat>,
}

impl DecodeHints {
    /// Every supported format: matrix, linear and stacked.
    pub fn all_formats() -> Self {
        Self {
            possible_formats: BarcodeFormat::ALL.to_vec(),
        }
    }

    pub fn contains(&self, format: BarcodeFormat) -> bool {
        self.possible_formats.contains(&format)
    }
}

impl Default for DecodeHints {
    fn default() -> Self {
        Self::all_formats()
    }
}

/// A code text plus the format it was read as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedCode {
    pub text: String,
    pub format: BarcodeFormat,
}

impl DecodedCode {
    pub fn new(text: impl Into<String>, format: BarcodeFormat) -> Self {
        Self {
            text: text.into(),
            format,
        }
    }
}
