//! QR code generation.

use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{imageops, DynamicImage, ImageBuffer, ImageFormat, Luma};
use qrcode::{EcLevel, QrCode};
use serde::Serialize;

use crate::utilities::error::UtilityError;

#[derive(Debug, Clone, Serialize)]
pub struct QrOutput {
    pub qr_code_base64: String,
}

fn ec_level(code: &str) -> EcLevel {
    match code {
        "M" => EcLevel::M,
        "Q" => EcLevel::Q,
        "H" => EcLevel::H,
        _ => EcLevel::L,
    }
}

/// Encode `data` as a PNG data URI. `box_size` is pixels per module, `border` is in modules.
pub fn generate(data: &str, box_size: u32, border: u32, error_correction: &str) -> Result<QrOutput, UtilityError> {
    let code = QrCode::with_error_correction_level(data.as_bytes(), ec_level(error_correction))
        .map_err(|e| UtilityError::Unprocessable(format!("Data cannot be encoded as a QR code: {e}")))?;

    let symbol = code
        .render::<Luma<u8>>()
        .quiet_zone(false)
        .module_dimensions(box_size, box_size)
        .build();

    let pad = border * box_size;
    let mut canvas = ImageBuffer::from_pixel(symbol.width() + 2 * pad, symbol.height() + 2 * pad, Luma([255u8]));
    imageops::replace(&mut canvas, &symbol, i64::from(pad), i64::from(pad));

    let mut png = Vec::new();
    DynamicImage::ImageLuma8(canvas)
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| UtilityError::Internal(format!("PNG encoding failed: {e}")))?;

    Ok(QrOutput {
        qr_code_base64: format!("data:image/png;base64,{}", STANDARD.encode(&png)),
    })
}
