//! End-to-end tests for pagexml2ds.
//!
//! These build a synthetic Transkribus-style export (ZIP and folder
//! variants) with real PNG images, then drive the full pipeline: source
//! enumeration → decoding → PAGE XML parsing → export record stream.

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use pagexml2ds::{DataSource, ExportConfig, ExportMode, Exporter, LayoutParser, Record};
use std::fs::File;
use std::io::{Cursor, Write};
use std::path::Path;
use zip::write::{SimpleFileOptions, ZipWriter};

/// Two regions listed out of reading order (r_b is index 1 but appears
/// first), lines listed out of reading order within r_a.
const PAGE_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<PcGts xmlns="http://schema.primaresearch.org/PAGE/gts/pagecontent/2013-07-15">
  <Metadata>
    <Creator>pagexml2ds tests</Creator>
  </Metadata>
  <Page imageFilename="0001.png" imageWidth="400" imageHeight="400">
    <ReadingOrder>
      <OrderedGroup id="ro1">
        <RegionRefIndexed index="1" regionRef="r_b"/>
        <RegionRefIndexed index="0" regionRef="r_a"/>
      </OrderedGroup>
    </ReadingOrder>
    <TextRegion id="r_b" type="paragraph">
      <Coords points="20,220 380,220 380,380 20,380"/>
      <TextLine id="l_b0" custom="readingOrder {index:0;}">
        <Coords points="20,220 380,220 380,260 20,260"/>
        <Baseline points="20,255 380,255"/>
        <TextEquiv><Unicode>vierte Zeile</Unicode></TextEquiv>
      </TextLine>
      <TextEquiv><Unicode>REGION B TEXT</Unicode></TextEquiv>
    </TextRegion>
    <TextRegion id="r_a" type="heading">
      <Coords points="20,20 380,20 380,200 20,200"/>
      <TextLine id="l_a2" custom="readingOrder {index:2;}">
        <Coords points="20,140 380,140 380,180 20,180"/>
        <TextEquiv><Unicode>dritte Zeile</Unicode></TextEquiv>
      </TextLine>
      <TextLine id="l_a0" custom="readingOrder {index:0;}">
        <Coords points="20,20 380,20 380,60 20,60"/>
        <TextEquiv><Unicode>erste Zeile</Unicode></TextEquiv>
      </TextLine>
      <TextLine id="l_a1" custom="readingOrder {index:1;}">
        <Coords points="20,80 380,80 380,120 20,120"/>
        <TextEquiv><Unicode>zweite Zeile</Unicode></TextEquiv>
      </TextLine>
      <TextEquiv><Unicode>REGION A TEXT</Unicode></TextEquiv>
    </TextRegion>
  </Page>
</PcGts>
"#;

fn png_bytes() -> Vec<u8> {
    let img = RgbImage::from_fn(400, 400, |x, y| Rgb([(x / 2) as u8, (y / 2) as u8, 9]));
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

/// A ZIP export with one valid page, one broken XML, platform metadata,
/// and a macOS resource fork — only the valid page should survive.
fn build_zip(path: &Path) {
    let file = File::create(path).unwrap();
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default();

    zip.start_file("demo/page/0001.xml", options).unwrap();
    zip.write_all(PAGE_XML.as_bytes()).unwrap();

    zip.start_file("demo/page/broken.xml", options).unwrap();
    zip.write_all(b"<PcGts").unwrap();

    zip.start_file("demo/mets.xml", options).unwrap();
    zip.write_all(b"<mets/>").unwrap();

    zip.start_file("__MACOSX/demo/page/._0001.xml", options)
        .unwrap();
    zip.write_all(&[0x00, 0x05, 0x16, 0x07]).unwrap();

    zip.start_file("demo/images/0001.png", options).unwrap();
    zip.write_all(&png_bytes()).unwrap();

    zip.finish().unwrap();
}

fn build_folder(root: &Path) {
    std::fs::create_dir_all(root.join("demo/page")).unwrap();
    std::fs::create_dir_all(root.join("demo/images")).unwrap();
    std::fs::write(root.join("demo/page/0001.xml"), PAGE_XML).unwrap();
    std::fs::write(root.join("demo/images/0001.png"), png_bytes()).unwrap();
}

fn zip_source(dir: &tempfile::TempDir) -> DataSource {
    let path = dir.path().join("export.zip");
    build_zip(&path);
    DataSource::open(path).unwrap()
}

fn parse(source: &DataSource) -> Vec<pagexml2ds::Page> {
    LayoutParser::default().parse_source(source).unwrap()
}

#[test]
fn zip_parsing_groups_filters_and_orders() {
    let dir = tempfile::tempdir().unwrap();
    let pages = parse(&zip_source(&dir));

    // broken.xml, mets.xml, and the resource fork are all skipped.
    assert_eq!(pages.len(), 1);
    let page = &pages[0];
    assert_eq!(page.project_name, "demo");
    assert_eq!(page.image_filename, "0001.png");
    assert_eq!((page.image_width, page.image_height), (400, 400));
    assert_eq!(page.xml_content, PAGE_XML);

    // Regions sorted by the page-level reading-order table.
    let region_ids: Vec<&str> = page.regions.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(region_ids, vec!["r_a", "r_b"]);
    assert_eq!(page.regions[0].region_type, "heading");

    // Lines sorted by the custom-attribute reading order.
    let line_ids: Vec<&str> = page.regions[0].lines.iter().map(|l| l.id.as_str()).collect();
    assert_eq!(line_ids, vec!["l_a0", "l_a1", "l_a2"]);
    assert_eq!(
        page.regions[0].lines[0].text.as_deref(),
        Some("erste Zeile")
    );
    assert_eq!(
        page.regions[1].lines[0].baseline.as_deref(),
        Some(&[(20, 255), (380, 255)][..])
    );
}

#[test]
fn folder_parsing_matches_zip_parsing() {
    let dir = tempfile::tempdir().unwrap();
    build_folder(dir.path());
    let source = DataSource::open(dir.path()).unwrap();
    let pages = parse(&source);

    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].project_name, "demo");
    assert_eq!(pages[0].regions.len(), 2);
}

#[test]
fn text_mode_joins_regions_in_reading_order() {
    let dir = tempfile::tempdir().unwrap();
    let source = zip_source(&dir);
    let pages = parse(&source);

    let exporter = Exporter::new(source, ExportConfig::default()).unwrap();
    let records: Vec<Record> = exporter.export(&pages).collect();

    assert_eq!(records.len(), 1);
    match &records[0] {
        Record::Text(r) => {
            // r_a carries index 0, r_b index 1 — despite document order.
            assert_eq!(r.text, "REGION A TEXT\nREGION B TEXT");
            assert_eq!(r.filename, "0001.png");
            assert_eq!(r.project, "demo");
            assert_eq!((r.image.width(), r.image.height()), (400, 400));
        }
        other => panic!("expected text record, got {other:?}"),
    }
    assert_eq!(exporter.stats().processed, 1);
}

#[test]
fn raw_mode_carries_verbatim_xml() {
    let dir = tempfile::tempdir().unwrap();
    let source = zip_source(&dir);
    let pages = parse(&source);

    let config = ExportConfig::builder().mode(ExportMode::Raw).build().unwrap();
    let exporter = Exporter::new(source, config).unwrap();
    let records: Vec<Record> = exporter.export(&pages).collect();

    assert_eq!(records.len(), 1);
    match &records[0] {
        Record::Raw(r) => assert_eq!(r.xml, PAGE_XML),
        other => panic!("expected raw record, got {other:?}"),
    }
}

#[test]
fn line_mode_crops_in_reading_order() {
    let dir = tempfile::tempdir().unwrap();
    let source = zip_source(&dir);
    let pages = parse(&source);

    let config = ExportConfig::builder().mode(ExportMode::Line).build().unwrap();
    let exporter = Exporter::new(source, config).unwrap();
    let records: Vec<Record> = exporter.export(&pages).collect();

    let line_ids: Vec<&str> = records
        .iter()
        .map(|r| match r {
            Record::Line(l) => l.line_id.as_str(),
            other => panic!("expected line record, got {other:?}"),
        })
        .collect();
    assert_eq!(line_ids, vec!["l_a0", "l_a1", "l_a2", "l_b0"]);

    match &records[0] {
        Record::Line(l) => {
            assert_eq!(l.text, "erste Zeile");
            assert_eq!(l.region_id, "r_a");
            assert_eq!(l.region_type, "heading");
            assert_eq!(l.region_reading_order, 0);
            // Coords 20,20 → 380,60 crop to 360 × 40.
            assert_eq!((l.image.width(), l.image.height()), (360, 40));
        }
        other => panic!("expected line record, got {other:?}"),
    }
    assert_eq!(exporter.stats().processed, 4);
}

#[test]
fn window_mode_slides_within_regions() {
    let dir = tempfile::tempdir().unwrap();
    let source = zip_source(&dir);
    let pages = parse(&source);

    let config = ExportConfig::builder()
        .mode(ExportMode::Window)
        .window_size(2)
        .overlap(1)
        .build()
        .unwrap();
    let exporter = Exporter::new(source, config).unwrap();
    let records: Vec<Record> = exporter.export(&pages).collect();

    // r_a (3 lines) → 2 windows; r_b (1 line) → 1 partial window.
    assert_eq!(records.len(), 3);
    match &records[0] {
        Record::Window(w) => {
            assert_eq!(w.line_ids, "l_a0, l_a1");
            assert_eq!(w.line_reading_orders, "0, 1");
            assert_eq!(w.text, "erste Zeile\nzweite Zeile");
            assert_eq!(w.window_size, 2);
            assert_eq!(w.window_index, 0);
            // Bounding box over both lines: y 20..120, x 20..380.
            assert_eq!((w.image.width(), w.image.height()), (360, 100));
        }
        other => panic!("expected window record, got {other:?}"),
    }
    match &records[2] {
        Record::Window(w) => {
            assert_eq!(w.line_ids, "l_b0");
            assert_eq!(w.region_id, "r_b");
            assert_eq!(w.window_size, 1);
            assert_eq!(w.window_index, 0);
        }
        other => panic!("expected window record, got {other:?}"),
    }
}

#[test]
fn masked_region_crop_paints_outside_white() {
    let dir = tempfile::tempdir().unwrap();
    build_folder(dir.path());
    // Replace the page with a single triangular region.
    let triangle_xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<PcGts xmlns="http://schema.primaresearch.org/PAGE/gts/pagecontent/2013-07-15">
  <Page imageFilename="0001.png" imageWidth="400" imageHeight="400">
    <TextRegion id="r_tri">
      <Coords points="0,0 0,399 399,399"/>
      <TextEquiv><Unicode>dreieck</Unicode></TextEquiv>
    </TextRegion>
  </Page>
</PcGts>
"#;
    std::fs::write(dir.path().join("demo/page/0001.xml"), triangle_xml).unwrap();

    let source = DataSource::open(dir.path()).unwrap();
    let pages = parse(&source);

    let config = ExportConfig::builder()
        .mode(ExportMode::Region)
        .mask(true)
        .build()
        .unwrap();
    let exporter = Exporter::new(source, config).unwrap();
    let records: Vec<Record> = exporter.export(&pages).collect();

    assert_eq!(records.len(), 1);
    let image = records[0].image();
    // Top-right corner is far outside the triangle: uniform white.
    assert_eq!(*image.get_pixel(395, 2), Rgb([255, 255, 255]));
    // Bottom-left corner is inside: original gradient pixel survives.
    assert_eq!(*image.get_pixel(2, 395), Rgb([1, 197, 9]));
}
