// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Minimal OOXML packages.
//
// Just enough of the Open Packaging Conventions to produce a presentation
// with one picture per slide and a workbook with a single sheet of inline
// strings. The part skeleton is fixed; nothing here converts layout.

use std::io::{Cursor, Write};

use folio_core::error::{FolioError, Result};
use tracing::{debug, instrument};
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::raster::RasterFormat;

pub const MIME_PPTX: &str = "application/vnd.openxmlformats-officedocument.presentationml.presentation";
pub const MIME_XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// English Metric Units per PDF point.
const EMU_PER_POINT: i64 = 12_700;

const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;
const NS_PML: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
const NS_DML: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_SML: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const NS_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_PKG_REL: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const REL_OFFICE_DOC: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const REL_BASE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// One file inside a package.
#[derive(Debug, Clone)]
pub struct Part {
    pub path: String,
    pub data: Vec<u8>,
}

impl Part {
    pub fn new(path: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            data: data.into(),
        }
    }
}

/// A rendered page to place on a slide.
#[derive(Debug, Clone)]
pub struct SlideImage {
    pub data: Vec<u8>,
    pub format: RasterFormat,
}

/// Zip `parts` in order. `[Content_Types].xml` must be among them and is
/// always written first.
#[instrument(skip_all, fields(parts = parts.len()))]
pub fn build_package(parts: &[Part]) -> Result<Vec<u8>> {
    let content_types = parts
        .iter()
        .position(|part| part.path == "[Content_Types].xml")
        .ok_or_else(|| FolioError::Container("package has no [Content_Types].xml".into()))?;

    let mut buffer = Vec::new();
    {
        let mut zip = ZipWriter::new(Cursor::new(&mut buffer));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let ordered = std::iter::once(&parts[content_types]).chain(
            parts
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != content_types)
                .map(|(_, part)| part),
        );
        for part in ordered {
            zip.start_file(part.path.as_str(), options)
                .map_err(|err| FolioError::Container(format!("{}: {err}", part.path)))?;
            zip.write_all(&part.data)?;
        }
        zip.finish()
            .map_err(|err| FolioError::Container(format!("failed to finalize package: {err}")))?;
    }
    debug!(bytes = buffer.len(), "Package written");
    Ok(buffer)
}

/// Presentation with one full-bleed picture per slide. `size` is the slide
/// size in points, normally the first page's displayed size.
#[instrument(skip(images), fields(slides = images.len()))]
pub fn pptx_from_images(images: &[SlideImage], size: (f32, f32)) -> Result<Vec<u8>> {
    if images.is_empty() {
        return Err(FolioError::Validation("a presentation needs at least one slide".into()));
    }
    let cx = (size.0.max(1.0) as f64 * EMU_PER_POINT as f64).round() as i64;
    let cy = (size.1.max(1.0) as f64 * EMU_PER_POINT as f64).round() as i64;

    let mut parts = Vec::with_capacity(images.len() * 3 + 10);
    let mut overrides = vec![
        override_entry(
            "/ppt/presentation.xml",
            "application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml",
        ),
        override_entry(
            "/ppt/slideMasters/slideMaster1.xml",
            "application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml",
        ),
        override_entry(
            "/ppt/slideLayouts/slideLayout1.xml",
            "application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml",
        ),
        override_entry(
            "/ppt/theme/theme1.xml",
            "application/vnd.openxmlformats-officedocument.theme+xml",
        ),
    ];

    let mut slide_ids = String::new();
    let mut presentation_rels = vec![
        relationship("rId1", "slideMaster", "slideMasters/slideMaster1.xml"),
        relationship("rId2", "theme", "theme/theme1.xml"),
    ];
    for (i, image) in images.iter().enumerate() {
        let n = i + 1;
        let extension = image.format.extension();
        let media = format!("image{n}.{extension}");
        overrides.push(override_entry(
            &format!("/ppt/slides/slide{n}.xml"),
            "application/vnd.openxmlformats-officedocument.presentationml.slide+xml",
        ));
        slide_ids.push_str(&format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 255 + n, n + 2));
        presentation_rels.push(relationship(
            &format!("rId{}", n + 2),
            "slide",
            &format!("slides/slide{n}.xml"),
        ));

        parts.push(Part::new(format!("ppt/slides/slide{n}.xml"), slide_xml(cx, cy)));
        parts.push(Part::new(
            format!("ppt/slides/_rels/slide{n}.xml.rels"),
            relationships(&[
                relationship("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml"),
                relationship("rId2", "image", &format!("../media/{media}")),
            ]),
        ));
        parts.push(Part::new(format!("ppt/media/{media}"), image.data.clone()));
    }

    let defaults = [
        default_entry("rels", "application/vnd.openxmlformats-package.relationships+xml"),
        default_entry("xml", "application/xml"),
        default_entry("png", "image/png"),
        default_entry("jpg", "image/jpeg"),
        default_entry("bmp", "image/bmp"),
        default_entry("tiff", "image/tiff"),
    ];
    parts.push(Part::new("[Content_Types].xml", content_types(&defaults, &overrides)));
    parts.push(Part::new(
        "_rels/.rels",
        relationships(&[relationship_to(
            "rId1",
            REL_OFFICE_DOC,
            "ppt/presentation.xml",
        )]),
    ));
    parts.push(Part::new(
        "ppt/presentation.xml",
        format!(
            r#"{XML_DECL}<p:presentation xmlns:a="{NS_DML}" xmlns:r="{NS_REL}" xmlns:p="{NS_PML}"><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst><p:sldIdLst>{slide_ids}</p:sldIdLst><p:sldSz cx="{cx}" cy="{cy}"/><p:notesSz cx="{cy}" cy="{cx}"/></p:presentation>"#
        ),
    ));
    parts.push(Part::new(
        "ppt/_rels/presentation.xml.rels",
        relationships(&presentation_rels),
    ));
    parts.push(Part::new(
        "ppt/slideMasters/slideMaster1.xml",
        format!(
            r#"{XML_DECL}<p:sldMaster xmlns:a="{NS_DML}" xmlns:r="{NS_REL}" xmlns:p="{NS_PML}"><p:cSld>{EMPTY_TREE}</p:cSld><p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/><p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst></p:sldMaster>"#
        ),
    ));
    parts.push(Part::new(
        "ppt/slideMasters/_rels/slideMaster1.xml.rels",
        relationships(&[
            relationship("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml"),
            relationship("rId2", "theme", "../theme/theme1.xml"),
        ]),
    ));
    parts.push(Part::new(
        "ppt/slideLayouts/slideLayout1.xml",
        format!(
            r#"{XML_DECL}<p:sldLayout xmlns:a="{NS_DML}" xmlns:r="{NS_REL}" xmlns:p="{NS_PML}" type="blank"><p:cSld name="Blank">{EMPTY_TREE}</p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"#
        ),
    ));
    parts.push(Part::new(
        "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
        relationships(&[relationship(
            "rId1",
            "slideMaster",
            "../slideMasters/slideMaster1.xml",
        )]),
    ));
    parts.push(Part::new("ppt/theme/theme1.xml", theme_xml()));

    build_package(&parts)
}

/// Workbook with one sheet; every cell is an inline string.
#[instrument(skip(rows), fields(rows = rows.len()))]
pub fn xlsx_from_rows(rows: &[Vec<String>]) -> Result<Vec<u8>> {
    let mut sheet_rows = String::new();
    for (r, row) in rows.iter().enumerate() {
        sheet_rows.push_str(&format!(r#"<row r="{}">"#, r + 1));
        for (c, value) in row.iter().enumerate() {
            sheet_rows.push_str(&format!(
                r#"<c r="{}{}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
                column_name(c),
                r + 1,
                escape_xml(value)
            ));
        }
        sheet_rows.push_str("</row>");
    }

    let parts = [
        Part::new(
            "[Content_Types].xml",
            content_types(
                &[
                    default_entry("rels", "application/vnd.openxmlformats-package.relationships+xml"),
                    default_entry("xml", "application/xml"),
                ],
                &[
                    override_entry(
                        "/xl/workbook.xml",
                        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml",
                    ),
                    override_entry(
                        "/xl/worksheets/sheet1.xml",
                        "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml",
                    ),
                ],
            ),
        ),
        Part::new(
            "_rels/.rels",
            relationships(&[relationship_to("rId1", REL_OFFICE_DOC, "xl/workbook.xml")]),
        ),
        Part::new(
            "xl/workbook.xml",
            format!(
                r#"{XML_DECL}<workbook xmlns="{NS_SML}" xmlns:r="{NS_REL}"><sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets></workbook>"#
            ),
        ),
        Part::new(
            "xl/_rels/workbook.xml.rels",
            relationships(&[relationship("rId1", "worksheet", "worksheets/sheet1.xml")]),
        ),
        Part::new(
            "xl/worksheets/sheet1.xml",
            format!(r#"{XML_DECL}<worksheet xmlns="{NS_SML}"><sheetData>{sheet_rows}</sheetData></worksheet>"#),
        ),
    ];
    build_package(&parts)
}

/// Spreadsheet column letters for a zero-based index: 0 -> A, 26 -> AA.
pub fn column_name(mut index: usize) -> String {
    let mut name = Vec::new();
    loop {
        name.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    name.reverse();
    String::from_utf8_lossy(&name).into_owned()
}

/// Escape text for element content and attribute values. Control characters
/// XML 1.0 cannot carry are dropped.
pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(ch),
            c if (c as u32) < 0x20 => {}
            c => out.push(c),
        }
    }
    out
}

const EMPTY_TREE: &str = r#"<p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/></p:spTree>"#;

fn slide_xml(cx: i64, cy: i64) -> String {
    format!(
        r#"{XML_DECL}<p:sld xmlns:a="{NS_DML}" xmlns:r="{NS_REL}" xmlns:p="{NS_PML}"><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/><p:pic><p:nvPicPr><p:cNvPr id="2" name="Page"/><p:cNvPicPr/><p:nvPr/></p:nvPicPr><p:blipFill><a:blip r:embed="rId2"/><a:stretch><a:fillRect/></a:stretch></p:blipFill><p:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr></p:pic></p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#
    )
}

fn theme_xml() -> String {
    let colors = [
        ("dk1", "000000"),
        ("lt1", "FFFFFF"),
        ("dk2", "1F497D"),
        ("lt2", "EEECE1"),
        ("accent1", "4F81BD"),
        ("accent2", "C0504D"),
        ("accent3", "9BBB59"),
        ("accent4", "8064A2"),
        ("accent5", "4BACC6"),
        ("accent6", "F79646"),
        ("hlink", "0000FF"),
        ("folHlink", "800080"),
    ]
    .iter()
    .map(|(name, rgb)| format!(r#"<a:{name}><a:srgbClr val="{rgb}"/></a:{name}>"#))
    .collect::<String>();
    let fill = r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#;
    let line = r#"<a:ln w="9525"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>"#;
    let effect = "<a:effectStyle><a:effectLst/></a:effectStyle>";
    format!(
        r#"{XML_DECL}<a:theme xmlns:a="{NS_DML}" name="Folio"><a:themeElements><a:clrScheme name="Folio">{colors}</a:clrScheme><a:fontScheme name="Folio"><a:majorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont><a:minorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont></a:fontScheme><a:fmtScheme name="Folio"><a:fillStyleLst>{fill}{fill}{fill}</a:fillStyleLst><a:lnStyleLst>{line}{line}{line}</a:lnStyleLst><a:effectStyleLst>{effect}{effect}{effect}</a:effectStyleLst><a:bgFillStyleLst>{fill}{fill}{fill}</a:bgFillStyleLst></a:fmtScheme></a:themeElements></a:theme>"#
    )
}

fn content_types(defaults: &[String], overrides: &[String]) -> String {
    format!(
        r#"{XML_DECL}<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">{}{}</Types>"#,
        defaults.concat(),
        overrides.concat()
    )
}

fn default_entry(extension: &str, content_type: &str) -> String {
    format!(r#"<Default Extension="{extension}" ContentType="{content_type}"/>"#)
}

fn override_entry(part: &str, content_type: &str) -> String {
    format!(r#"<Override PartName="{part}" ContentType="{content_type}"/>"#)
}

fn relationship(id: &str, kind: &str, target: &str) -> String {
    relationship_to(id, &format!("{REL_BASE}/{kind}"), target)
}

fn relationship_to(id: &str, kind: &str, target: &str) -> String {
    format!(r#"<Relationship Id="{id}" Type="{kind}" Target="{target}"/>"#)
}

fn relationships(entries: &[String]) -> String {
    format!(
        r#"{XML_DECL}<Relationships xmlns="{NS_PKG_REL}">{}</Relationships>"#,
        entries.concat()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use zip::ZipArchive;

    fn read_part(package: &[u8], path: &str) -> String {
        let mut archive = ZipArchive::new(Cursor::new(package)).unwrap();
        let mut file = archive.by_name(path).unwrap();
        let mut content = String::new();
        file.read_to_string(&mut content).unwrap();
        content
    }

    fn names(package: &[u8]) -> Vec<String> {
        let archive = ZipArchive::new(Cursor::new(package)).unwrap();
        archive.file_names().map(str::to_owned).collect()
    }

    #[test]
    fn content_types_always_first() {
        let package = build_package(&[
            Part::new("a.xml", "<a/>"),
            Part::new("[Content_Types].xml", "<Types/>"),
        ])
        .unwrap();
        let mut archive = ZipArchive::new(Cursor::new(package.as_slice())).unwrap();
        assert_eq!(archive.by_index(0).unwrap().name(), "[Content_Types].xml");
    }

    #[test]
    fn package_without_content_types_is_rejected() {
        let result = build_package(&[Part::new("a.xml", "<a/>")]);
        assert!(matches!(result, Err(FolioError::Container(_))));
    }

    #[test]
    fn presentation_has_one_slide_per_image() {
        let images = vec![
            SlideImage { data: vec![1, 2, 3], format: RasterFormat::Png },
            SlideImage { data: vec![4, 5, 6], format: RasterFormat::Jpeg },
        ];
        let package = pptx_from_images(&images, (595.0, 842.0)).unwrap();
        let parts = names(&package);
        for expected in [
            "ppt/presentation.xml",
            "ppt/slides/slide1.xml",
            "ppt/slides/slide2.xml",
            "ppt/media/image1.png",
            "ppt/media/image2.jpg",
            "ppt/theme/theme1.xml",
        ] {
            assert!(parts.iter().any(|p| p == expected), "missing {expected}");
        }

        let presentation = read_part(&package, "ppt/presentation.xml");
        let doc = roxmltree::Document::parse(&presentation).unwrap();
        let size = doc
            .descendants()
            .find(|node| node.tag_name().name() == "sldSz")
            .unwrap();
        assert_eq!(size.attribute("cx"), Some("7556500"));
        assert_eq!(
            doc.descendants().filter(|n| n.tag_name().name() == "sldId").count(),
            2
        );
    }

    #[test]
    fn every_xml_part_is_well_formed() {
        let images = vec![SlideImage { data: vec![0], format: RasterFormat::Png }];
        let package = pptx_from_images(&images, (100.0, 100.0)).unwrap();
        for name in names(&package) {
            if name.ends_with(".xml") || name.ends_with(".rels") {
                let text = read_part(&package, &name);
                assert!(roxmltree::Document::parse(&text).is_ok(), "{name}");
            }
        }
    }

    #[test]
    fn workbook_escapes_cells() {
        let rows = vec![
            vec!["Page".to_owned(), "Text".to_owned()],
            vec!["1".to_owned(), "a < b & \"c\"".to_owned()],
        ];
        let package = xlsx_from_rows(&rows).unwrap();
        let sheet = read_part(&package, "xl/worksheets/sheet1.xml");
        let doc = roxmltree::Document::parse(&sheet).unwrap();
        let cell = doc
            .descendants()
            .find(|node| node.attribute("r") == Some("B2"))
            .unwrap();
        let text: String = cell
            .descendants()
            .filter(|n| n.is_text())
            .filter_map(|n| n.text())
            .collect();
        assert_eq!(text, "a < b & \"c\"");
    }

    #[test]
    fn column_names() {
        assert_eq!(column_name(0), "A");
        assert_eq!(column_name(25), "Z");
        assert_eq!(column_name(26), "AA");
        assert_eq!(column_name(701), "ZZ");
        assert_eq!(column_name(702), "AAA");
    }

    #[test]
    fn empty_presentation_rejected() {
        assert!(pptx_from_images(&[], (10.0, 10.0)).is_err());
    }
}
