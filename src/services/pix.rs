// src/services/pix.rs

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, ImageOutputFormat, Luma};
use qrcode::QrCode;

use crate::common::error::AppError;

const QR_MIN_SIZE: u32 = 256;

/// Renderiza o PIX copia-e-cola como PNG e devolve em base64.
/// Usado quando o gateway não manda a imagem pronta.
pub fn render_qr_png_base64(payload: &str) -> Result<String, AppError> {
    let code = QrCode::new(payload.as_bytes())
        .map_err(|e| AppError::InternalServerError(anyhow::Error::msg(e.to_string())))?;

    let image_buffer = code
        .render::<Luma<u8>>()
        .min_dimensions(QR_MIN_SIZE, QR_MIN_SIZE)
        .build();

    let mut png = Vec::new();
    DynamicImage::ImageLuma8(image_buffer)
        .write_to(&mut png, ImageOutputFormat::Png)
        .map_err(|e| AppError::InternalServerError(anyhow::Error::msg(e.to_string())))?;

    Ok(STANDARD.encode(png))
}
