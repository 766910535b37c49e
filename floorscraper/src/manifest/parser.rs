//! Extraction of floor dimensions from the manifest script.
//!
//! The service publishes its floor table as a script that assigns to a
//! well-known `floorData` variable. Three assignment shapes are read and
//! applied in document order, the way running the script would: a
//! whole-table or per-floor assignment replaces what was there, a per-field
//! assignment sets one key. Text inside comments and string literals is
//! ignored.
//!
//! ```text
//! var floorData = { G: { mapWidth: 3000, mapHeight: 2000 }, ... };
//! floorData["G"] = { mapWidth: 3000, mapHeight: 2000 };
//! floorData["G"]["mapWidth"] = 3000;   // or floorData['G'].mapWidth = 3000;
//! ```

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde_json::{Map, Value};
use tracing::debug;

use super::literal::{blank_comments_and_strings, parse_literal};
use super::{FloorManifest, FloorMetadata};
use crate::error::{ScrapeError, ScrapeResult};

/// Name of the script variable holding the floor table.
pub const FLOOR_DATA_VARIABLE: &str = "floorData";

const WIDTH_FIELD: &str = "mapWidth";
const HEIGHT_FIELD: &str = "mapHeight";

type RawTable = BTreeMap<String, Map<String, Value>>;

fn whole_table_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\bfloorData\s*=").expect("valid floorData pattern")
    })
}

fn floor_entry_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"\bfloorData\s*\[\s*["']([^"']+)["']\s*\]\s*="#)
            .expect("valid floor entry pattern")
    })
}

fn floor_field_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r#"\bfloorData\s*\[\s*["']([^"']+)["']\s*\]\s*(?:\.\s*([A-Za-z_$][\w$]*)|\[\s*["']([^"']+)["']\s*\])\s*="#,
        )
        .expect("valid floor field pattern")
    })
}

/// What an assignment writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Table,
    Floor(String),
    Field(String, String),
}

/// One `floorData` assignment found in live code.
#[derive(Debug)]
struct Assignment {
    /// Byte offset of the assignment in the document
    start: usize,
    /// Byte offset just past its `=`
    value_at: usize,
    target: Target,
}

/// Parse the manifest script into a floor table.
///
/// # Errors
///
/// Returns `ScrapeError::Parse` if no `floorData` assignment is found, an
/// assigned value is not a readable literal, a dimension is negative or
/// non-numeric, or no floor ends up with both dimensions.
pub fn parse_manifest(document: &str) -> ScrapeResult<FloorManifest> {
    let mut raw = RawTable::new();
    let mut assignments = 0usize;

    for site in assignment_sites(document) {
        let Some(value) = assigned_value(document, site.value_at)? else {
            continue;
        };
        assignments += 1;
        match site.target {
            Target::Table => raw = floor_table(value),
            Target::Floor(floor_id) => {
                raw.insert(floor_id, fields_of(value));
            }
            Target::Field(floor_id, field) => {
                raw.entry(floor_id).or_default().insert(field, value);
            }
        }
    }

    if assignments == 0 {
        return Err(parse_error(format!(
            "no '{}' assignment found",
            FLOOR_DATA_VARIABLE
        )));
    }

    let mut floors = BTreeMap::new();
    for (floor_id, fields) in raw {
        let width = dimension(&floor_id, WIDTH_FIELD, fields.get(WIDTH_FIELD))?;
        let height = dimension(&floor_id, HEIGHT_FIELD, fields.get(HEIGHT_FIELD))?;
        match (width, height) {
            (Some(map_width), Some(map_height)) => {
                floors.insert(floor_id, FloorMetadata::new(map_width, map_height));
            }
            _ => debug!(floor = %floor_id, "Skipping floor without map dimensions"),
        }
    }

    if floors.is_empty() {
        return Err(parse_error(format!(
            "no floor in '{}' has both {} and {}",
            FLOOR_DATA_VARIABLE, WIDTH_FIELD, HEIGHT_FIELD
        )));
    }

    Ok(FloorManifest::from(floors))
}

/// Every assignment outside comments and strings, in document order.
fn assignment_sites(document: &str) -> Vec<Assignment> {
    let code = blank_comments_and_strings(document);
    // Captured names come from `document`; the blanked copy has `_` there
    let text = |caps: &Captures<'_>, group: usize| {
        caps.get(group).map(|m| document[m.range()].to_string())
    };
    let mut sites = Vec::new();

    for m in whole_table_pattern().find_iter(&code) {
        sites.push(Assignment {
            start: m.start(),
            value_at: m.end(),
            target: Target::Table,
        });
    }

    for caps in floor_entry_pattern().captures_iter(&code) {
        if let (Some(whole), Some(floor_id)) = (caps.get(0), text(&caps, 1)) {
            sites.push(Assignment {
                start: whole.start(),
                value_at: whole.end(),
                target: Target::Floor(floor_id),
            });
        }
    }

    for caps in floor_field_pattern().captures_iter(&code) {
        let field = text(&caps, 2).or_else(|| text(&caps, 3));
        if let (Some(whole), Some(floor_id), Some(field)) = (caps.get(0), text(&caps, 1), field) {
            sites.push(Assignment {
                start: whole.start(),
                value_at: whole.end(),
                target: Target::Field(floor_id, field),
            });
        }
    }

    sites.sort_by_key(|site| site.start);
    sites
}

/// Floor table assigned as a whole; anything but an object clears it.
fn floor_table(value: Value) -> RawTable {
    match value {
        Value::Object(floors) => floors
            .into_iter()
            .map(|(floor_id, fields)| (floor_id, fields_of(fields)))
            .collect(),
        _ => RawTable::new(),
    }
}

fn fields_of(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(fields) => fields,
        _ => Map::new(),
    }
}

/// Read the literal assigned after an `=` ending at `offset`.
///
/// Returns `None` when the `=` is really part of `==` or `===`.
fn assigned_value(document: &str, offset: usize) -> ScrapeResult<Option<Value>> {
    let rest = &document[offset..];
    if rest.starts_with('=') {
        return Ok(None);
    }
    parse_literal(rest)
        .map(|(value, _)| Some(value))
        .map_err(|reason| parse_error(format!("bad '{}' value: {}", FLOOR_DATA_VARIABLE, reason)))
}

/// Interpret one dimension field.
fn dimension(floor_id: &str, field: &str, value: Option<&Value>) -> ScrapeResult<Option<u32>> {
    let number = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };

    match number {
        Some(n) if n.is_finite() && n >= 0.0 && n <= u32::MAX as f64 => Ok(Some(n as u32)),
        _ => Err(parse_error(format!(
            "floor '{}' has invalid {}: {}",
            floor_id,
            field,
            value.map(Value::to_string).unwrap_or_default()
        ))),
    }
}

fn parse_error(reason: String) -> ScrapeError {
    ScrapeError::Parse {
        source_name: "floor manifest".to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_table_assignment() {
        let doc = r#"
            var mapVersion = "2.1";
            var floorData = {
                "G":   { mapWidth: 3000, mapHeight: 2000, name: 'Ground Floor' },
                "LG1": { mapWidth: 2800, mapHeight: 1800 },
            };
        "#;
        let manifest = parse_manifest(doc).unwrap();
        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest.get("G"), Some(&FloorMetadata::new(3000, 2000)));
        assert_eq!(manifest.get("LG1"), Some(&FloorMetadata::new(2800, 1800)));
    }

    #[test]
    fn test_per_floor_assignments() {
        let doc = r#"
            var floorData = new Array();
            floorData['G'] = { mapWidth: 400, mapHeight: 200 };
            floorData["1"] = {"mapWidth": "600", "mapHeight": "400"};
        "#;
        let manifest = parse_manifest(doc).unwrap();
        assert_eq!(manifest.get("G"), Some(&FloorMetadata::new(400, 200)));
        assert_eq!(manifest.get("1"), Some(&FloorMetadata::new(600, 400)));
    }

    #[test]
    fn test_property_assignments() {
        let doc = r#"
            floorData = new Object();
            floorData["G"] = new Object();
            floorData["G"]["mapWidth"] = 1200;
            floorData['G'].mapHeight = 800;
            floorData["G"]["mapName"] = "Ground";
        "#;
        let manifest = parse_manifest(doc).unwrap();
        assert_eq!(manifest.get("G"), Some(&FloorMetadata::new(1200, 800)));
    }

    #[test]
    fn test_later_assignment_wins() {
        let doc = r#"
            var floorData = { G: { mapWidth: 100, mapHeight: 100 } };
            floorData["G"].mapWidth = 250;
        "#;
        let manifest = parse_manifest(doc).unwrap();
        assert_eq!(manifest.get("G"), Some(&FloorMetadata::new(250, 100)));
    }

    #[test]
    fn test_reassignment_follows_document_order() {
        let doc = r#"
            var floorData = new Array();
            floorData["G"] = { mapWidth: 100, mapHeight: 100 };
            floorData["G"].mapWidth = 150;
            floorData = { G: { mapWidth: 300, mapHeight: 300 } };
        "#;
        let manifest = parse_manifest(doc).unwrap();
        assert_eq!(manifest.get("G"), Some(&FloorMetadata::new(300, 300)));
    }

    #[test]
    fn test_table_assignment_drops_earlier_floors() {
        let doc = r#"
            floorData = { OLD: { mapWidth: 10, mapHeight: 10 } };
            floorData = { G: { mapWidth: 20, mapHeight: 20 } };
        "#;
        let manifest = parse_manifest(doc).unwrap();
        assert_eq!(manifest.floor_ids().collect::<Vec<_>>(), vec!["G"]);
    }

    #[test]
    fn test_floor_assignment_replaces_its_fields() {
        let doc = r#"
            var floorData = {
                G: { mapWidth: 1, mapHeight: 2 },
                H: { mapWidth: 3, mapHeight: 4 },
            };
            floorData["G"] = { mapWidth: 5 };
        "#;
        let manifest = parse_manifest(doc).unwrap();
        assert!(!manifest.contains("G"));
        assert_eq!(manifest.get("H"), Some(&FloorMetadata::new(3, 4)));
    }

    #[test]
    fn test_commented_out_assignments_are_ignored() {
        let doc = r#"
            var floorData = { G: { mapWidth: 10, mapHeight: 10 } };
            /* floorData["OLD"] = { mapWidth: 10, mapHeight: 10 }; */
            // floorData = {};
            // floorData["G"].mapWidth = 99;
        "#;
        let manifest = parse_manifest(doc).unwrap();
        assert_eq!(manifest.floor_ids().collect::<Vec<_>>(), vec!["G"]);
        assert_eq!(manifest.get("G"), Some(&FloorMetadata::new(10, 10)));
    }

    #[test]
    fn test_assignment_text_inside_strings_is_ignored() {
        let doc = r#"
            var help = 'set floorData = {G: 1 to override';
            var note = "floorData["X"] = { mapWidth: 1, mapHeight: 1 }";
            var floorData = { G: { mapWidth: 40, mapHeight: 20, name: "floorData = x" } };
        "#;
        let manifest = parse_manifest(doc).unwrap();
        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest.get("G"), Some(&FloorMetadata::new(40, 20)));
    }

    #[test]
    fn test_only_commented_assignments_is_parse_error() {
        let err = parse_manifest("// var floorData = { G: { mapWidth: 1, mapHeight: 1 } };")
            .unwrap_err();
        assert!(err.to_string().contains("no 'floorData' assignment"));
    }

    #[test]
    fn test_deeply_nested_value_is_parse_error() {
        let doc = format!("var floorData = {};", "[".repeat(200_000));
        let err = parse_manifest(&doc).unwrap_err();
        assert!(matches!(err, ScrapeError::Parse { .. }));
        assert!(err.to_string().contains("nesting"));
    }

    #[test]
    fn test_floor_without_dimensions_is_skipped() {
        let doc = "var floorData = { G: { mapWidth: 10, mapHeight: 10 }, X: { mapWidth: 5 } };";
        let manifest = parse_manifest(doc).unwrap();
        assert_eq!(manifest.len(), 1);
        assert!(!manifest.contains("X"));
    }

    #[test]
    fn test_comparison_is_not_assignment() {
        let doc = "if (floorData == null) {} var floorData = { G: { mapWidth: 1, mapHeight: 2 } };";
        let manifest = parse_manifest(doc).unwrap();
        assert_eq!(manifest.get("G"), Some(&FloorMetadata::new(1, 2)));
    }

    #[test]
    fn test_missing_floor_data_is_parse_error() {
        let err = parse_manifest("var somethingElse = {};").unwrap_err();
        assert!(matches!(err, ScrapeError::Parse { .. }));
    }

    #[test]
    fn test_no_usable_floor_is_parse_error() {
        let err = parse_manifest("var floorData = {};").unwrap_err();
        assert!(err.to_string().contains("mapWidth"));
    }

    #[test]
    fn test_negative_dimension_is_parse_error() {
        let err =
            parse_manifest("var floorData = { G: { mapWidth: -1, mapHeight: 10 } };").unwrap_err();
        assert!(err.to_string().contains("invalid mapWidth"));
    }

    #[test]
    fn test_non_numeric_dimension_is_parse_error() {
        let err = parse_manifest("var floorData = { G: { mapWidth: 'wide', mapHeight: 10 } };")
            .unwrap_err();
        assert!(matches!(err, ScrapeError::Parse { .. }));
    }

    #[test]
    fn test_unreadable_literal_is_parse_error() {
        let err = parse_manifest("var floorData = { G: ").unwrap_err();
        assert!(matches!(err, ScrapeError::Parse { .. }));
    }
}
