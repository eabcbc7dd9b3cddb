// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// End-to-end runs through the dispatcher on documents built in memory.

use std::io::{Cursor, Read};
use std::sync::Arc;

use folio_core::{FolioConfig, FolioError, InputFile, MIME_OCTET_STREAM, MIME_PDF, OptionsBag};
use folio_document::ooxml::{MIME_PPTX, MIME_XLSX};
use folio_document::pdf::{Rect, Rgb, ShapeStyle, StandardFont, TextRun};
use folio_document::{ContentRenderer, PdfDocumentHandle, SaveOptions, parse_ranges};
use folio_security::SeededNonceSource;
use folio_tools::{Dispatcher, ToolId};
use image::{ImageFormat, Rgb as Pixel, RgbImage};
use lopdf::{Dictionary, Document, Object, Stream, dictionary};
use serde_json::json;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A PDF whose page widths are `widths`, so page identity survives copying.
fn pdf_with_widths(widths: &[f32]) -> Vec<u8> {
    let mut doc = PdfDocumentHandle::create();
    for &width in widths {
        let index = doc.add_page((width, 400.0)).unwrap();
        doc.draw_rectangle(
            index,
            Rect::new(10.0, 10.0, 50.0, 50.0),
            &ShapeStyle::filled(Rgb::RED),
        )
        .unwrap();
    }
    doc.save(&SaveOptions::default()).unwrap()
}

fn input(name: &str, widths: &[f32]) -> InputFile {
    InputFile::pdf(name, pdf_with_widths(widths))
}

fn widths(data: &[u8]) -> Vec<f32> {
    let doc = PdfDocumentHandle::load(data, None).unwrap();
    (0..doc.page_count())
        .map(|index| doc.page_info(index).unwrap().width)
        .collect()
}

fn rotations(data: &[u8]) -> Vec<i32> {
    let doc = PdfDocumentHandle::load(data, None).unwrap();
    (0..doc.page_count())
        .map(|index| doc.page_info(index).unwrap().rotation)
        .collect()
}

fn options(value: serde_json::Value) -> OptionsBag {
    OptionsBag::from_json(value).unwrap()
}

/// Rasterises shapes and images without a PDFium library.
fn headless() -> Dispatcher {
    Dispatcher::default().with_renderer(Arc::new(ContentRenderer))
}

/// One line of text per page.
fn text_pdf(lines: &[&str]) -> Vec<u8> {
    let mut doc = PdfDocumentHandle::create();
    let font = doc.embed_font(StandardFont::Helvetica).unwrap();
    for line in lines {
        let index = doc.add_page((300.0, 200.0)).unwrap();
        doc.draw_text(index, &TextRun::new(*line, 20.0, 100.0, 14.0, font))
            .unwrap();
    }
    doc.save(&SaveOptions::default()).unwrap()
}

fn encoded_image(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let image = RgbImage::from_fn(width, height, |x, y| Pixel([(x * 4) as u8, (y * 4) as u8, 90]));
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, format).unwrap();
    out.into_inner()
}

fn zip_entry(package: &[u8], name: &str) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(package)).unwrap();
    let mut text = String::new();
    archive.by_name(name).unwrap().read_to_string(&mut text).unwrap();
    text
}

fn slide_count(package: &[u8]) -> usize {
    let archive = zip::ZipArchive::new(Cursor::new(package)).unwrap();
    archive
        .file_names()
        .filter(|name| name.starts_with("ppt/slides/slide") && name.ends_with(".xml"))
        .count()
}

fn seeded() -> Dispatcher {
    Dispatcher::new(FolioConfig::default()).with_nonce_source(Arc::new(SeededNonceSource::new(7)))
}

// ---------------------------------------------------------------------------
// Organize
// ---------------------------------------------------------------------------

#[test]
fn merge_two_and_three_pages_gives_five() {
    let files = [
        input("a.pdf", &[100.0, 110.0]),
        input("b.pdf", &[200.0, 210.0, 220.0]),
    ];
    let out = Dispatcher::default()
        .dispatch("merge", &files, &OptionsBag::new())
        .unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].name, "merged_ultra.pdf");
    assert_eq!(out[0].mime_type, MIME_PDF);
    assert_eq!(widths(&out[0].data), vec![100.0, 110.0, 200.0, 210.0, 220.0]);
}

#[test]
fn split_then_merge_round_trips() {
    let source = input("doc.pdf", &[100.0, 200.0, 300.0]);
    let dispatcher = Dispatcher::default();
    let parts = dispatcher
        .dispatch("split", std::slice::from_ref(&source), &OptionsBag::new())
        .unwrap();
    let names: Vec<_> = parts.iter().map(|part| part.name.as_str()).collect();
    assert_eq!(names, ["doc_page_1.pdf", "doc_page_2.pdf", "doc_page_3.pdf"]);

    let inputs: Vec<_> = parts
        .into_iter()
        .map(|part| InputFile::pdf(part.name, part.data))
        .collect();
    let merged = dispatcher
        .dispatch("merge", &inputs, &OptionsBag::new())
        .unwrap();
    assert_eq!(widths(&merged[0].data), widths(source.data()));
}

#[test]
fn split_by_range_tokens() {
    let out = Dispatcher::default()
        .dispatch(
            "split",
            &[input("doc.pdf", &[100.0, 200.0, 300.0, 400.0])],
            &options(json!({ "pages": "1-2,4" })),
        )
        .unwrap();
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].name, "doc_part_1.pdf");
    assert_eq!(widths(&out[0].data), vec![100.0, 200.0]);
    assert_eq!(widths(&out[1].data), vec![400.0]);
}

#[test]
fn rotate_specific_pages_only() {
    let out = Dispatcher::default()
        .dispatch(
            "rotate-pdf",
            &[input("doc.pdf", &[100.0, 200.0, 300.0, 400.0, 500.0])],
            &options(json!({ "rotation": 90, "rotateMode": "specific", "pages": "2,4" })),
        )
        .unwrap();
    assert_eq!(out[0].name, "rotated_doc.pdf");
    assert_eq!(rotations(&out[0].data), vec![0, 90, 0, 90, 0]);
}

#[test]
fn rotation_accumulates_modulo_360() {
    let dispatcher = Dispatcher::default();
    let opts = options(json!({ "rotation": 270 }));
    let once = dispatcher
        .dispatch("rotate-pdf", &[input("doc.pdf", &[100.0])], &opts)
        .unwrap();
    let twice = dispatcher
        .dispatch("rotate-pdf", &[InputFile::pdf("doc.pdf", once[0].data.clone())], &opts)
        .unwrap();
    assert_eq!(rotations(&twice[0].data), vec![180]);
}

#[test]
fn rotation_must_be_a_right_angle() {
    let err = Dispatcher::default()
        .dispatch("rotate-pdf", &[input("doc.pdf", &[100.0])], &options(json!({ "rotation": 45 })))
        .unwrap_err();
    assert!(matches!(err, FolioError::Validation(_)));
}

#[test]
fn reorder_follows_the_given_order() {
    let out = Dispatcher::default()
        .dispatch(
            "reorder-pages",
            &[input("doc.pdf", &[100.0, 200.0, 300.0])],
            &options(json!({ "pageOrder": [3, 1, 2] })),
        )
        .unwrap();
    assert_eq!(out[0].name, "reordered_doc.pdf");
    assert_eq!(widths(&out[0].data), vec![300.0, 100.0, 200.0]);
}

#[test]
fn reorder_rejects_non_permutations() {
    let dispatcher = Dispatcher::default();
    let file = input("doc.pdf", &[100.0, 200.0, 300.0]);
    for order in [json!([1, 1, 2]), json!([1, 2]), json!([1, 2, 4])] {
        let err = dispatcher
            .dispatch(
                "reorder-pages",
                std::slice::from_ref(&file),
                &options(json!({ "pageOrder": order })),
            )
            .unwrap_err();
        assert!(matches!(err, FolioError::Validation(_)), "{order}");
    }
}

#[test]
fn mix_alternates_pages() {
    let out = Dispatcher::default()
        .dispatch(
            "mix-pdf",
            &[input("a.pdf", &[100.0, 110.0, 120.0]), input("b.pdf", &[200.0])],
            &OptionsBag::new(),
        )
        .unwrap();
    assert_eq!(out[0].name, "mixed_result.pdf");
    assert_eq!(widths(&out[0].data), vec![100.0, 200.0, 110.0, 120.0]);
}

#[test]
fn mix_needs_two_files() {
    let err = Dispatcher::default()
        .dispatch("mix-pdf", &[input("a.pdf", &[100.0])], &OptionsBag::new())
        .unwrap_err();
    assert!(matches!(err, FolioError::Validation(msg) if msg.contains("at least 2")));
}

#[test]
fn remove_and_extract_are_complements() {
    let dispatcher = Dispatcher::default();
    let file = input("doc.pdf", &[100.0, 200.0, 300.0, 400.0]);
    let selection = options(json!({ "pages": "2-3" }));
    let removed = dispatcher
        .dispatch("remove-pages", std::slice::from_ref(&file), &selection)
        .unwrap();
    let extracted = dispatcher
        .dispatch("extract-pages", std::slice::from_ref(&file), &selection)
        .unwrap();
    assert_eq!(widths(&removed[0].data), vec![100.0, 400.0]);
    assert_eq!(widths(&extracted[0].data), vec![200.0, 300.0]);
}

#[test]
fn reverse_and_duplicate() {
    let dispatcher = Dispatcher::default();
    let file = input("doc.pdf", &[100.0, 200.0]);
    let reversed = dispatcher
        .dispatch("reverse-pdf", std::slice::from_ref(&file), &OptionsBag::new())
        .unwrap();
    assert_eq!(widths(&reversed[0].data), vec![200.0, 100.0]);

    let duplicated = dispatcher
        .dispatch(
            "duplicate-pages",
            std::slice::from_ref(&file),
            &options(json!({ "duplicatePages": "1" })),
        )
        .unwrap();
    assert_eq!(duplicated[0].name, "duplicated_doc.pdf");
    assert_eq!(widths(&duplicated[0].data).len(), 3);
}

#[test]
fn page_ranges_ignore_noise() {
    assert_eq!(parse_ranges("0,3-2,2,abc,10", 5), vec![1]);
}

// ---------------------------------------------------------------------------
// Security
// ---------------------------------------------------------------------------

#[test]
fn protect_then_decrypt_with_the_right_password() {
    let dispatcher = seeded();
    let protected = dispatcher
        .dispatch(
            "protect-pdf",
            &[input("doc.pdf", &[100.0, 200.0])],
            &options(json!({ "password": "secret1" })),
        )
        .unwrap();
    assert_eq!(protected[0].name, "doc.pdf.aes256");
    assert_eq!(protected[0].mime_type, MIME_OCTET_STREAM);
    assert!(!protected[0].data.starts_with(b"%PDF"));

    let envelope = InputFile::new(protected[0].name.clone(), "", protected[0].data.clone());
    let opened = dispatcher
        .dispatch("decrypt-pdf", &[envelope], &options(json!({ "password": "secret1" })))
        .unwrap();
    assert_eq!(opened[0].name, "doc.pdf");

    // The envelope holds a natively protected PDF.
    assert!(PdfDocumentHandle::load(&opened[0].data, None).is_err());
    let doc = PdfDocumentHandle::load(&opened[0].data, Some("secret1")).unwrap();
    assert_eq!(doc.page_count(), 2);
}

#[test]
fn decrypt_with_the_wrong_password_fails_authentication() {
    let dispatcher = seeded();
    let protected = dispatcher
        .dispatch(
            "protect-pdf",
            &[input("doc.pdf", &[100.0])],
            &options(json!({ "password": "secret1" })),
        )
        .unwrap();
    let envelope = InputFile::new(protected[0].name.clone(), "", protected[0].data.clone());
    let err = dispatcher
        .dispatch("decrypt-pdf", &[envelope], &options(json!({ "password": "wrong-one" })))
        .unwrap_err();
    assert!(matches!(err, FolioError::Authentication));
}

#[test]
fn protect_on_an_envelope_decrypts_it() {
    let dispatcher = seeded();
    let password = options(json!({ "password": "secret1" }));
    let protected = dispatcher
        .dispatch("protect-pdf", &[input("doc.pdf", &[100.0])], &password)
        .unwrap();
    let envelope = InputFile::new(protected[0].name.clone(), "", protected[0].data.clone());
    let out = dispatcher.dispatch("protect-pdf", &[envelope], &password).unwrap();
    assert_eq!(out[0].name, "doc.pdf");
    assert_eq!(out[0].mime_type, MIME_PDF);
}

#[test]
fn short_passwords_are_rejected() {
    let err = seeded()
        .dispatch(
            "protect-pdf",
            &[input("doc.pdf", &[100.0])],
            &options(json!({ "password": "abc" })),
        )
        .unwrap_err();
    assert!(matches!(err, FolioError::Validation(msg) if msg.contains("at least 6")));
}

#[test]
fn seeded_envelopes_are_reproducible() {
    let file = input("doc.pdf", &[100.0]);
    let password = options(json!({ "password": "secret1" }));
    let first = seeded().dispatch("protect-pdf", std::slice::from_ref(&file), &password).unwrap();
    let second = seeded().dispatch("protect-pdf", std::slice::from_ref(&file), &password).unwrap();
    assert_eq!(first[0].data[..12], second[0].data[..12]);
}

#[test]
fn unlock_removes_the_open_password() {
    let locked = PdfDocumentHandle::load(&pdf_with_widths(&[100.0, 200.0]), None)
        .unwrap()
        .save(&SaveOptions::protected("secret1", None))
        .unwrap();
    let out = Dispatcher::default()
        .dispatch(
            "unlock-pdf",
            &[InputFile::pdf("doc.pdf", locked)],
            &options(json!({ "password": "secret1" })),
        )
        .unwrap();
    assert_eq!(out[0].name, "unlocked_doc.pdf");
    assert_eq!(out[0].mime_type, MIME_PDF);
    assert_eq!(widths(&out[0].data), vec![100.0, 200.0]);
}

#[test]
fn unlock_with_the_wrong_password_fails() {
    let locked = PdfDocumentHandle::load(&pdf_with_widths(&[100.0]), None)
        .unwrap()
        .save(&SaveOptions::protected("secret1", None))
        .unwrap();
    let err = Dispatcher::default()
        .dispatch(
            "unlock-pdf",
            &[InputFile::pdf("doc.pdf", locked)],
            &options(json!({ "password": "wrong-one" })),
        )
        .unwrap_err();
    assert!(matches!(err, FolioError::Password(_)));
}

#[test]
fn change_password_swaps_the_open_password() {
    let locked = PdfDocumentHandle::load(&pdf_with_widths(&[100.0, 200.0, 300.0]), None)
        .unwrap()
        .save(&SaveOptions::protected("secret1", None))
        .unwrap();
    let out = Dispatcher::default()
        .dispatch(
            "change-password",
            &[InputFile::pdf("doc.pdf", locked)],
            &options(json!({ "oldPassword": "secret1", "newPassword": "fresh-pass" })),
        )
        .unwrap();
    assert_eq!(out[0].name, "password_changed_doc.pdf");
    assert_eq!(out[0].mime_type, MIME_PDF);

    let data = &out[0].data;
    assert!(PdfDocumentHandle::load(data, None).is_err());
    assert!(PdfDocumentHandle::load(data, Some("secret1")).is_err());
    let reopened = PdfDocumentHandle::load(data, Some("fresh-pass")).unwrap();
    assert_eq!(reopened.page_count(), 3);
}

#[test]
fn watermark_and_sanitize_keep_pages() {
    let dispatcher = Dispatcher::default();
    let file = input("doc.pdf", &[300.0, 300.0]);
    let marked = dispatcher
        .dispatch("watermark-pdf", std::slice::from_ref(&file), &OptionsBag::new())
        .unwrap();
    assert_eq!(marked[0].name, "watermarked_doc.pdf");
    assert_eq!(widths(&marked[0].data).len(), 2);

    let clean = dispatcher
        .dispatch("sanitize-pdf", std::slice::from_ref(&file), &OptionsBag::new())
        .unwrap();
    assert_eq!(clean[0].name, "sanitized_doc.pdf");
}

// ---------------------------------------------------------------------------
// Edit and advanced
// ---------------------------------------------------------------------------

#[test]
fn crop_shrinks_the_crop_box() {
    let out = Dispatcher::default()
        .dispatch(
            "crop-pdf",
            &[input("doc.pdf", &[300.0])],
            &options(json!({ "cropMargin": 20 })),
        )
        .unwrap();
    let doc = PdfDocumentHandle::load(&out[0].data, None).unwrap();
    let info = doc.page_info(0).unwrap();
    assert_eq!((info.width, info.height), (260.0, 360.0));
}

#[test]
fn resize_fits_pages_onto_target_paper() {
    let out = Dispatcher::default()
        .dispatch(
            "resize-pdf",
            &[input("doc.pdf", &[300.0, 600.0])],
            &options(json!({ "resizeTarget": "letter" })),
        )
        .unwrap();
    let doc = PdfDocumentHandle::load(&out[0].data, None).unwrap();
    // 300x400 is portrait, 600x400 is landscape.
    assert_eq!(doc.page_info(0).unwrap().display_size(), (612.0, 792.0));
    assert_eq!(doc.page_info(1).unwrap().display_size(), (792.0, 612.0));
}

#[test]
fn grayscale_rebuilds_every_page() {
    let out = headless()
        .dispatch(
            "grayscale-pdf",
            &[input("doc.pdf", &[100.0, 120.0])],
            &options(json!({ "grayscaleQuality": "low" })),
        )
        .unwrap();
    assert_eq!(out[0].name, "grayscale_doc.pdf");
    assert_eq!(widths(&out[0].data), vec![100.0, 120.0]);
}

/// Two pages; the second page's `/Contents` names an object that was never
/// written.
fn pdf_with_dangling_contents() -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let content = doc.add_object(Stream::new(Dictionary::new(), b"0 0 m 10 10 l S".to_vec()));
    let media_box: Vec<Object> = vec![0.into(), 0.into(), 200.into(), 200.into()];
    let good = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => media_box.clone(),
        "Contents" => content,
    });
    let missing = doc.new_object_id();
    let broken = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => media_box,
        "Contents" => missing,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(good), Object::Reference(broken)],
            "Count" => 2,
        }),
    );
    let catalog = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog);
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

#[test]
fn repair_keeps_a_placeholder_for_unreadable_pages() {
    let out = Dispatcher::default()
        .dispatch(
            "repair-pdf",
            &[InputFile::pdf("broken.pdf", pdf_with_dangling_contents())],
            &OptionsBag::new(),
        )
        .unwrap();
    assert_eq!(out[0].name, "repaired_broken.pdf");
    assert_eq!(out[0].mime_type, MIME_PDF);
    let doc = PdfDocumentHandle::load(&out[0].data, None).unwrap();
    assert_eq!(doc.page_count(), 2);
    assert!(doc.page_text(1).unwrap().contains("could not be recovered"));
}

#[test]
fn repair_can_drop_unreadable_pages() {
    let out = Dispatcher::default()
        .dispatch(
            "repair-pdf",
            &[InputFile::pdf("broken.pdf", pdf_with_dangling_contents())],
            &options(json!({ "removeCorrupted": true, "repairMode": "rebuild" })),
        )
        .unwrap();
    assert_eq!(widths(&out[0].data), vec![200.0]);
}

#[test]
fn annotations_outside_the_document_are_rejected() {
    let annotations = json!([{ "type": "rectangle", "page": 3, "x": 0, "y": 0, "width": 10, "height": 10 }]);
    let err = Dispatcher::default()
        .dispatch(
            "annotation-pdf",
            &[input("doc.pdf", &[100.0])],
            &options(json!({ "annotations": annotations })),
        )
        .unwrap_err();
    assert!(matches!(err, FolioError::Validation(_)));
}

#[test]
fn annotations_are_flattened() {
    let annotations = json!([
        { "type": "text", "page": 1, "x": 10, "y": 20, "text": "Note" },
        { "type": "highlight", "page": 1, "x": 0, "y": 0, "width": 50, "height": 10 },
        { "type": "circle", "page": 1, "x": 20, "y": 20, "width": 30, "height": 20, "color": "blue" }
    ]);
    let out = Dispatcher::default()
        .dispatch(
            "annotation-pdf",
            &[input("doc.pdf", &[200.0])],
            &options(json!({ "annotations": annotations })),
        )
        .unwrap();
    assert_eq!(out[0].name, "annotated_doc.pdf");
    assert!(PdfDocumentHandle::load(&out[0].data, None).is_ok());
}

#[test]
fn compare_needs_two_files() {
    let err = Dispatcher::default()
        .dispatch("compare-pdf", &[input("a.pdf", &[100.0])], &OptionsBag::new())
        .unwrap_err();
    assert!(matches!(err, FolioError::Validation(_)));
}

#[test]
fn text_comparison_reports_page_counts() {
    let out = Dispatcher::default()
        .dispatch(
            "compare-pdf",
            &[input("a.pdf", &[100.0]), input("b.pdf", &[100.0, 100.0])],
            &options(json!({ "compareMode": "text" })),
        )
        .unwrap();
    assert_eq!(out[0].name, "comparison.txt");
    let report = String::from_utf8(out[0].data.clone()).unwrap();
    assert!(report.contains("Pages: 1 vs 2"));
}

#[test]
fn analyze_reports_fingerprint() {
    let file = input("doc.pdf", &[100.0, 200.0]);
    let out = Dispatcher::default()
        .dispatch("analyze-pdf", std::slice::from_ref(&file), &OptionsBag::new())
        .unwrap();
    assert_eq!(out[0].name, "doc_analysis.json");
    let report: serde_json::Value = serde_json::from_slice(&out[0].data).unwrap();
    assert_eq!(report["pageCount"], 2);
    assert_eq!(report["sha256"], folio_security::hash_bytes(file.data()));
}

#[test]
fn batch_skips_files_that_fail() {
    let files = [
        input("good.pdf", &[100.0]),
        InputFile::pdf("broken.pdf", b"not a pdf".to_vec()),
    ];
    let out = Dispatcher::default()
        .dispatch("batch-process", &files, &options(json!({ "batchAction": "compress" })))
        .unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].name, "compressed_good.pdf");
}

#[test]
fn batch_fails_when_nothing_succeeds() {
    let files = [InputFile::pdf("broken.pdf", b"not a pdf".to_vec())];
    assert!(Dispatcher::default()
        .dispatch("batch-process", &files, &OptionsBag::new())
        .is_err());
}

// ---------------------------------------------------------------------------
// Catalog edges
// ---------------------------------------------------------------------------

#[test]
fn unknown_tool_ids_are_unsupported() {
    let err = Dispatcher::default()
        .dispatch("pdf-to-hologram", &[input("a.pdf", &[100.0])], &OptionsBag::new())
        .unwrap_err();
    assert!(matches!(err, FolioError::UnsupportedOperation(_)));
}

#[test]
fn conversions_without_a_reader_fall_back_to_text() {
    let file = InputFile::new("notes.pct", "", b"plain words".to_vec());
    let out = Dispatcher::default()
        .dispatch(ToolId::PctToPdf.id(), &[file], &OptionsBag::new())
        .unwrap();
    assert_eq!(out[0].name, "converted_fallback.pdf");
    assert_eq!(out[0].mime_type, MIME_PDF);
}

#[test]
fn tools_without_a_handler_echo_inputs() {
    let file = input("doc.pdf", &[100.0]);
    let out = Dispatcher::default()
        .dispatch(ToolId::SignPdf.id(), std::slice::from_ref(&file), &OptionsBag::new())
        .unwrap();
    assert_eq!(out[0].name, "processed_doc.pdf");
    assert_eq!(out[0].data, file.data());
}

#[test]
fn jpeg_and_png_images_become_pages() {
    let files = [
        InputFile::new("photo.jpg", "image/jpeg", encoded_image(40, 30, ImageFormat::Jpeg)),
        InputFile::new("chart.png", "image/png", encoded_image(20, 50, ImageFormat::Png)),
    ];
    let dispatcher = Dispatcher::default();
    for tool in ["jpg-to-pdf", "png-to-pdf"] {
        let out = dispatcher.dispatch(tool, &files, &OptionsBag::new()).unwrap();
        assert_eq!(out.len(), 1, "{tool}");
        assert_eq!(out[0].name, "images_converted.pdf");
        assert_eq!(out[0].mime_type, MIME_PDF);
        let doc = PdfDocumentHandle::load(&out[0].data, None).unwrap();
        assert_eq!(doc.page_count(), 2, "{tool}");
    }
}

#[test]
fn undecodable_images_name_the_file() {
    let file = InputFile::new("photo.jpg", "image/jpeg", b"not a jpeg".to_vec());
    let err = Dispatcher::default()
        .dispatch("jpg-to-pdf", &[file], &OptionsBag::new())
        .unwrap_err();
    assert!(err.to_string().contains("photo.jpg"), "{err}");
}

#[test]
fn powerpoint_has_one_slide_per_page() {
    let out = headless()
        .dispatch(
            "pdf-to-powerpoint",
            &[input("deck.pdf", &[300.0, 300.0, 300.0])],
            &OptionsBag::new(),
        )
        .unwrap();
    assert_eq!(out[0].name, "deck.pptx");
    assert_eq!(out[0].mime_type, MIME_PPTX);
    assert_eq!(slide_count(&out[0].data), 3);
}

#[test]
fn excel_has_a_header_and_one_row_per_page() {
    let file = InputFile::pdf("report.pdf", text_pdf(&["Alpha", "Beta"]));
    let out = Dispatcher::default()
        .dispatch("pdf-to-excel", &[file], &OptionsBag::new())
        .unwrap();
    assert_eq!(out[0].name, "report.xlsx");
    assert_eq!(out[0].mime_type, MIME_XLSX);
    let sheet = zip_entry(&out[0].data, "xl/worksheets/sheet1.xml");
    assert_eq!(sheet.matches("<row ").count(), 3);
    assert!(sheet.contains("Alpha") && sheet.contains("Beta"));
}

#[test]
fn qr_code_needs_no_input_files() {
    let out = Dispatcher::default()
        .dispatch("qr-to-pdf", &[], &options(json!({ "qrText": "https://example.org" })))
        .unwrap();
    assert_eq!(out[0].name, "qrcode.pdf");
    assert_eq!(out[0].mime_type, MIME_PDF);
    let doc = PdfDocumentHandle::load(&out[0].data, None).unwrap();
    assert_eq!(doc.page_count(), 1);
    assert!(doc.page_text(0).unwrap().contains("https://example.org"));
}

#[test]
fn qr_code_without_text_is_rejected() {
    let err = Dispatcher::default()
        .dispatch("qr-to-pdf", &[], &OptionsBag::new())
        .unwrap_err();
    assert!(matches!(err, FolioError::Validation(_)));
}

#[test]
fn text_becomes_a_pdf() {
    let file = InputFile::new("notes.txt", "", b"first line\nsecond line".to_vec());
    let out = Dispatcher::default()
        .dispatch("txt-to-pdf", &[file], &OptionsBag::new())
        .unwrap();
    assert_eq!(out[0].name, "notes_converted.pdf");
    assert!(PdfDocumentHandle::load(&out[0].data, None).unwrap().page_count() >= 1);
}
