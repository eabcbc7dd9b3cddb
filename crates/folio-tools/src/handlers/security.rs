// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Password protection, envelopes, watermarks and sanitising.
//
// "Protect" is two layers: the PDF is saved with native password protection,
// then the whole file is sealed in an AES-256-GCM envelope. "Decrypt" opens
// the envelope and hands back the natively protected PDF untouched.

use folio_core::error::{FolioError, Result};
use folio_core::{InputFile, MIME_OCTET_STREAM, ResultDescriptor};
use folio_document::pdf::{Rgb, SaveOptions, StandardFont, TextRun};
use folio_security::{ENVELOPE_EXTENSION, open, seal};
use tracing::{info, instrument};

use super::{Outputs, first, load, load_with_password, prefixed, save, single_pdf};
use crate::dispatcher::Dispatcher;
use crate::request::{ChangePasswordOptions, PasswordOptions, WatermarkOptions};

#[instrument(skip_all)]
pub(crate) fn protect(dispatcher: &Dispatcher, files: &[InputFile], options: &PasswordOptions) -> Outputs {
    let file = first(files)?;
    check_strength(dispatcher, &options.password)?;

    let doc = load(file)?;
    let protected = doc.save(&SaveOptions::protected(options.password.clone(), None))?;
    let sealed = seal(&protected, &options.password, dispatcher.nonces.as_ref())?;
    info!(pdf_bytes = protected.len(), sealed_bytes = sealed.len(), "Protected");
    Ok(vec![ResultDescriptor::new(
        format!("{}.{ENVELOPE_EXTENSION}", file.name()),
        sealed,
        MIME_OCTET_STREAM,
    )])
}

/// Open an `.aes256` envelope, or remove native protection from a PDF.
#[instrument(skip_all)]
pub(crate) fn decrypt(files: &[InputFile], options: &PasswordOptions) -> Outputs {
    let file = first(files)?;
    if options.password.is_empty() {
        return Err(FolioError::Validation(
            "Enter the password used to protect this file.".into(),
        ));
    }

    if file.has_extension(ENVELOPE_EXTENSION) {
        let inner = open(file.data(), &options.password)?;
        info!(bytes = inner.len(), "Envelope opened");
        return Ok(vec![ResultDescriptor::pdf(envelope_inner_name(file.name()), inner)]);
    }

    let doc = load_with_password(file, &options.password)?;
    single_pdf("decrypted", file, doc)
}

/// `report.pdf.aes256` -> `report.pdf`; a bare stem gets `.pdf` back.
fn envelope_inner_name(name: &str) -> String {
    let suffix = format!(".{ENVELOPE_EXTENSION}");
    let stem = if name.to_ascii_lowercase().ends_with(&suffix) {
        &name[..name.len() - suffix.len()]
    } else {
        name
    };
    if stem.to_ascii_lowercase().ends_with(".pdf") {
        stem.to_owned()
    } else {
        format!("{stem}.pdf")
    }
}

pub(crate) fn unlock(files: &[InputFile], options: &PasswordOptions) -> Outputs {
    let file = first(files)?;
    let doc = load_with_password(file, &options.password)?;
    single_pdf("unlocked", file, doc)
}

pub(crate) fn change_password(
    dispatcher: &Dispatcher,
    files: &[InputFile],
    options: &ChangePasswordOptions,
) -> Outputs {
    let file = first(files)?;
    check_strength(dispatcher, &options.new_password)?;
    let doc = load_with_password(file, &options.old_password)?;
    let data = doc.save(&SaveOptions::protected(options.new_password.clone(), None))?;
    Ok(vec![ResultDescriptor::pdf(prefixed("password_changed", file), data)])
}

fn check_strength(dispatcher: &Dispatcher, password: &str) -> Result<()> {
    let min = dispatcher.config.min_password_length;
    if password.chars().count() < min {
        return Err(FolioError::Validation(format!(
            "Password must be at least {min} characters long."
        )));
    }
    Ok(())
}

/// Translucent text across the centre of every page.
pub(crate) fn watermark(files: &[InputFile], options: &WatermarkOptions) -> Outputs {
    let file = first(files)?;
    let mut doc = load(file)?;
    let font = doc.embed_font(StandardFont::HelveticaBold)?;
    let size = options.watermark_size;
    let opacity = (options.watermark_opacity / 100.0).clamp(0.0, 1.0);
    let text_width = font.text_width(&options.watermark_text, size);
    let (sin, cos) = options.watermark_rotation.to_radians().sin_cos();

    for index in 0..doc.page_count() {
        let crop = doc.page_info(index)?.crop_box;
        let (cx, cy) = (crop.x + crop.width / 2.0, crop.y + crop.height / 2.0);
        // Baseline origin that puts the middle of the run on the page centre.
        let half_w = text_width / 2.0;
        let half_h = size / 3.0;
        let x = cx - half_w * cos + half_h * sin;
        let y = cy - half_w * sin - half_h * cos;
        let run = TextRun::new(options.watermark_text.clone(), x, y, size, font)
            .with_color(Rgb::GRAY)
            .with_opacity(opacity)
            .with_rotation(options.watermark_rotation);
        doc.draw_text(index, &run)?;
    }
    single_pdf("watermarked", file, doc)
}

/// Remove scripts, launch actions, embedded files and document metadata.
pub(crate) fn sanitize(files: &[InputFile]) -> Outputs {
    let file = first(files)?;
    let mut doc = load(file)?;
    let removed = doc.strip_active_content()?;
    doc.clear_metadata()?;
    info!(removed, "Sanitized");
    Ok(vec![ResultDescriptor::pdf(prefixed("sanitized", file), save(doc)?)])
}
