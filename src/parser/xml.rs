//! PAGE XML document parsing.
//!
//! One XML document yields at most one [`Page`]. Malformed XML is never
//! fatal: the parser logs and returns `None`, which batch parsing treats as
//! a skip. Element lookups are namespace-exact — a document in a different
//! namespace than the configured one simply has no recognizable page
//! element.

use crate::model::{Line, Page, Polygon, Region};
use once_cell::sync::Lazy;
use regex::Regex;
use roxmltree::{Document, Node};
use std::collections::HashMap;
use tracing::warn;

/// Default PAGE content namespace (the 2013-07-15 schema revision used by
/// Transkribus exports).
pub const DEFAULT_NAMESPACE: &str =
    "http://schema.primaresearch.org/PAGE/gts/pagecontent/2013-07-15";

/// Line-level reading order lives in a free-text `custom` attribute, e.g.
/// `custom="readingOrder {index:4;} structure {type:heading;}"`.
static RE_READING_ORDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"readingOrder\s*\{\s*index\s*:\s*(\d+)").unwrap());

/// Parser for PAGE XML documents.
#[derive(Debug, Clone)]
pub struct LayoutParser {
    namespace: String,
}

impl Default for LayoutParser {
    fn default() -> Self {
        Self::new(None)
    }
}

impl LayoutParser {
    /// Create a parser, optionally overriding the PAGE namespace URI.
    pub fn new(namespace: Option<&str>) -> Self {
        Self {
            namespace: namespace.unwrap_or(DEFAULT_NAMESPACE).to_owned(),
        }
    }

    /// Parse a single PAGE XML document into a [`Page`].
    ///
    /// Returns `None` when the XML is malformed or contains no `Page`
    /// element in the configured namespace. Both are logged skips, not
    /// errors.
    pub fn parse_page_xml(&self, xml: &str, project_name: &str) -> Option<Page> {
        let doc = match Document::parse(xml) {
            Ok(doc) => doc,
            Err(e) => {
                warn!("XML parsing error: {e}");
                return None;
            }
        };
        let root = doc.root_element();

        let page_elem = root.children().find(|n| self.is_element(n, "Page"))?;

        let image_filename = page_elem.attribute("imageFilename").unwrap_or("").to_owned();
        let image_width = parse_dimension(page_elem.attribute("imageWidth"));
        let image_height = parse_dimension(page_elem.attribute("imageHeight"));

        let image_url = self.parse_image_url(&root, &page_elem);
        let reading_order = self.parse_reading_order(&root);
        let regions = self.parse_text_regions(&root, &reading_order);

        Some(Page {
            image_filename,
            image_width,
            image_height,
            image_url,
            regions,
            xml_content: xml.to_owned(),
            project_name: project_name.to_owned(),
        })
    }

    /// Image URL priority chain: the platform metadata element's `imgUrl`
    /// attribute, else the page element's own `imageURL`. Empty attribute
    /// values count as absent.
    fn parse_image_url(&self, root: &Node, page_elem: &Node) -> Option<String> {
        root.descendants()
            .find(|n| self.is_element(n, "TranskribusMetadata"))
            .and_then(|n| n.attribute("imgUrl"))
            .filter(|url| !url.is_empty())
            .or_else(|| page_elem.attribute("imageURL").filter(|url| !url.is_empty()))
            .map(str::to_owned)
    }

    /// Region-id → index table from the page-level `ReadingOrder` listing.
    fn parse_reading_order(&self, root: &Node) -> HashMap<String, u32> {
        let mut table = HashMap::new();

        if let Some(order_elem) = root
            .descendants()
            .find(|n| self.is_element(n, "ReadingOrder"))
        {
            for region_ref in order_elem
                .descendants()
                .filter(|n| self.is_element(n, "RegionRefIndexed"))
            {
                let region_id = region_ref.attribute("regionRef").unwrap_or("");
                let index = region_ref
                    .attribute("index")
                    .and_then(|v| v.trim().parse().ok())
                    .unwrap_or(0);
                table.insert(region_id.to_owned(), index);
            }
        }

        table
    }

    /// All text regions, at any nesting depth, sorted by reading order.
    fn parse_text_regions(&self, root: &Node, reading_order: &HashMap<String, u32>) -> Vec<Region> {
        let mut regions: Vec<Region> = root
            .descendants()
            .filter(|n| self.is_element(n, "TextRegion"))
            .map(|region_elem| {
                let id = region_elem.attribute("id").unwrap_or("").to_owned();
                let region_type = region_elem
                    .attribute("type")
                    .unwrap_or("paragraph")
                    .to_owned();
                let coords = self.parse_coords(&region_elem);
                let lines = self.parse_text_lines(&region_elem, &id);
                let full_text = self.text_equiv(&region_elem);
                let order = reading_order.get(&id).copied().unwrap_or(0);

                Region {
                    id,
                    region_type,
                    coords,
                    lines,
                    reading_order: order,
                    full_text,
                }
            })
            .collect();

        // Stable: ties keep document order.
        regions.sort_by_key(|r| r.reading_order);
        regions
    }

    /// Direct child text lines of a region, sorted by reading order.
    fn parse_text_lines(&self, region_elem: &Node, region_id: &str) -> Vec<Line> {
        let mut lines: Vec<Line> = region_elem
            .children()
            .filter(|n| self.is_element(n, "TextLine"))
            .map(|line_elem| {
                let coords = self.parse_coords(&line_elem);
                let baseline = line_elem
                    .children()
                    .find(|n| self.is_element(n, "Baseline"))
                    .map(|n| parse_points(n.attribute("points").unwrap_or("")));

                Line {
                    id: line_elem.attribute("id").unwrap_or("").to_owned(),
                    text: self.text_equiv(&line_elem),
                    coords,
                    baseline,
                    reading_order: reading_order_from_custom(line_elem.attribute("custom")),
                    region_id: region_id.to_owned(),
                }
            })
            .collect();

        lines.sort_by_key(|l| l.reading_order);
        lines
    }

    /// Polygon from the element's direct `Coords` child.
    fn parse_coords(&self, elem: &Node) -> Polygon {
        elem.children()
            .find(|n| self.is_element(n, "Coords"))
            .map(|n| parse_points(n.attribute("points").unwrap_or("")))
            .unwrap_or_default()
    }

    /// Text content of the first `TextEquiv/Unicode` child.
    ///
    /// `None` when no `Unicode` element exists; `Some("")` when the element
    /// exists but is empty ("annotated as blank").
    fn text_equiv(&self, elem: &Node) -> Option<String> {
        elem.children()
            .filter(|n| self.is_element(n, "TextEquiv"))
            .find_map(|te| te.children().find(|n| self.is_element(n, "Unicode")))
            .map(|unicode| unicode.text().unwrap_or("").to_owned())
    }

    fn is_element(&self, node: &Node, name: &str) -> bool {
        node.is_element()
            && node.tag_name().name() == name
            && node.tag_name().namespace() == Some(self.namespace.as_str())
    }
}

/// Numeric page dimension with fallback to 0 on absence or invalid value.
fn parse_dimension(value: Option<&str>) -> u32 {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(0)
}

/// Parse a `points` attribute: space-separated `x,y` pairs.
///
/// Malformed pairs are skipped point-by-point; they never fail the parse.
fn parse_points(points: &str) -> Polygon {
    points
        .split_whitespace()
        .filter_map(|pair| {
            let (x, y) = pair.split_once(',')?;
            Some((x.trim().parse().ok()?, y.trim().parse().ok()?))
        })
        .collect()
}

/// Extract the line reading order from a `custom` attribute.
///
/// Any string matching `readingOrder {index:N}` yields `N`; absent or
/// non-matching strings yield 0.
fn reading_order_from_custom(custom: Option<&str>) -> u32 {
    custom
        .filter(|c| c.contains("readingOrder"))
        .and_then(|c| RE_READING_ORDER.captures(c))
        .and_then(|caps| caps[1].parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NS: &str = DEFAULT_NAMESPACE;

    fn page_xml(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<PcGts xmlns="{NS}">
  <Page imageFilename="0001.jpg" imageWidth="2000" imageHeight="1500">
{body}
  </Page>
</PcGts>"#
        )
    }

    #[test]
    fn reading_order_from_custom_attribute() {
        assert_eq!(reading_order_from_custom(Some("readingOrder {index:4;}")), 4);
        assert_eq!(
            reading_order_from_custom(Some("readingOrder { index : 12 ;}")),
            12
        );
        assert_eq!(
            reading_order_from_custom(Some("structure {type:heading;}")),
            0
        );
        assert_eq!(reading_order_from_custom(Some("readingOrder {index:x}")), 0);
        assert_eq!(reading_order_from_custom(None), 0);
    }

    #[test]
    fn points_parsing_skips_malformed_pairs() {
        assert_eq!(parse_points("1,2 3,4 5,6"), vec![(1, 2), (3, 4), (5, 6)]);
        assert_eq!(parse_points("1,2 oops 3 4,x 5,6"), vec![(1, 2), (5, 6)]);
        assert_eq!(parse_points(""), Vec::<(i32, i32)>::new());
    }

    #[test]
    fn no_page_element_yields_none() {
        let parser = LayoutParser::default();
        let xml = format!(r#"<PcGts xmlns="{NS}"><Metadata/></PcGts>"#);
        assert!(parser.parse_page_xml(&xml, "proj").is_none());
    }

    #[test]
    fn malformed_xml_yields_none() {
        let parser = LayoutParser::default();
        assert!(parser.parse_page_xml("<PcGts><oops", "proj").is_none());
    }

    #[test]
    fn namespace_mismatch_yields_none() {
        let parser = LayoutParser::new(Some("urn:example:other"));
        let xml = page_xml("");
        assert!(parser.parse_page_xml(&xml, "proj").is_none());
    }

    #[test]
    fn page_attributes_with_fallbacks() {
        let parser = LayoutParser::default();
        let xml = format!(
            r#"<PcGts xmlns="{NS}"><Page imageWidth="bogus"/></PcGts>"#
        );
        let page = parser.parse_page_xml(&xml, "proj").unwrap();
        assert_eq!(page.image_filename, "");
        assert_eq!(page.image_width, 0);
        assert_eq!(page.image_height, 0);
        assert!(page.image_url.is_none());
    }

    #[test]
    fn image_url_priority_chain() {
        let parser = LayoutParser::default();

        // TranskribusMetadata imgUrl wins over Page imageURL.
        let xml = format!(
            r#"<PcGts xmlns="{NS}">
  <Metadata><TranskribusMetadata imgUrl="https://files.example/img/1.jpg"/></Metadata>
  <Page imageFilename="1.jpg" imageURL="https://other.example/1.jpg"/>
</PcGts>"#
        );
        let page = parser.parse_page_xml(&xml, "proj").unwrap();
        assert_eq!(
            page.image_url.as_deref(),
            Some("https://files.example/img/1.jpg")
        );

        // Empty imgUrl falls through to the page attribute.
        let xml = format!(
            r#"<PcGts xmlns="{NS}">
  <Metadata><TranskribusMetadata imgUrl=""/></Metadata>
  <Page imageFilename="1.jpg" imageURL="https://other.example/1.jpg"/>
</PcGts>"#
        );
        let page = parser.parse_page_xml(&xml, "proj").unwrap();
        assert_eq!(page.image_url.as_deref(), Some("https://other.example/1.jpg"));
    }

    #[test]
    fn regions_sorted_by_reading_order_stably() {
        let parser = LayoutParser::default();
        let xml = page_xml(
            r#"
    <ReadingOrder>
      <OrderedGroup id="g0">
        <RegionRefIndexed index="1" regionRef="r_second"/>
        <RegionRefIndexed index="0" regionRef="r_first"/>
      </OrderedGroup>
    </ReadingOrder>
    <TextRegion id="r_second"><Coords points="0,0 10,0 10,10"/></TextRegion>
    <TextRegion id="r_tie_a"><Coords points="0,0 10,0 10,10"/></TextRegion>
    <TextRegion id="r_first"><Coords points="0,0 10,0 10,10"/></TextRegion>
    <TextRegion id="r_tie_b"><Coords points="0,0 10,0 10,10"/></TextRegion>
"#,
        );
        let page = parser.parse_page_xml(&xml, "proj").unwrap();
        let ids: Vec<&str> = page.regions.iter().map(|r| r.id.as_str()).collect();
        // r_tie_a/r_tie_b/r_first all have index 0 and must keep document
        // order among themselves; r_second (index 1) comes last.
        assert_eq!(ids, vec!["r_tie_a", "r_first", "r_tie_b", "r_second"]);
    }

    #[test]
    fn lines_sorted_by_custom_reading_order_stably() {
        let parser = LayoutParser::default();
        let xml = page_xml(
            r#"
    <TextRegion id="r1">
      <Coords points="0,0 100,0 100,100"/>
      <TextLine id="l_b" custom="readingOrder {index:1;}">
        <Coords points="0,0 10,0 10,10"/>
        <TextEquiv><Unicode>second</Unicode></TextEquiv>
      </TextLine>
      <TextLine id="l_tie_a">
        <Coords points="0,0 10,0 10,10"/>
      </TextLine>
      <TextLine id="l_a" custom="readingOrder {index:0;}">
        <Coords points="0,0 10,0 10,10"/>
        <TextEquiv><Unicode>first</Unicode></TextEquiv>
      </TextLine>
    </TextRegion>
"#,
        );
        let page = parser.parse_page_xml(&xml, "proj").unwrap();
        let ids: Vec<&str> = page.regions[0].lines.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["l_tie_a", "l_a", "l_b"]);
        assert!(page.regions[0]
            .lines
            .iter()
            .all(|l| l.region_id == "r1"));
    }

    #[test]
    fn region_full_text_and_line_text() {
        let parser = LayoutParser::default();
        let xml = page_xml(
            r#"
    <TextRegion id="r1" type="heading">
      <Coords points="0,0 100,0 100,100 0,100"/>
      <TextLine id="l1">
        <Coords points="0,0 100,0 100,20 0,20"/>
        <Baseline points="0,18 100,18"/>
        <TextEquiv><Unicode>Erste Zeile</Unicode></TextEquiv>
      </TextLine>
      <TextEquiv><Unicode>Erste Zeile</Unicode></TextEquiv>
    </TextRegion>
    <TextRegion id="r2">
      <Coords points="0,200 100,200 100,300 0,300"/>
      <TextLine id="l2"><Coords points="0,200 100,200 100,220"/></TextLine>
    </TextRegion>
    <TextRegion id="r3">
      <Coords points="0,400 100,400 100,500"/>
      <TextEquiv><Unicode></Unicode></TextEquiv>
    </TextRegion>
"#,
        );
        let page = parser.parse_page_xml(&xml, "proj").unwrap();
        assert_eq!(page.regions[0].region_type, "heading");
        assert_eq!(page.regions[0].full_text.as_deref(), Some("Erste Zeile"));
        assert_eq!(
            page.regions[0].lines[0].baseline,
            Some(vec![(0, 18), (100, 18)])
        );
        // No region-level annotation at all: None, even though a line exists.
        assert!(page.regions[1].full_text.is_none());
        assert!(page.regions[1].lines[0].text.is_none());
        // Empty Unicode element: annotated as blank, not absent.
        assert_eq!(page.regions[2].full_text.as_deref(), Some(""));
        // Default region type.
        assert_eq!(page.regions[1].region_type, "paragraph");
    }
}
