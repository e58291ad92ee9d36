mod wkt;

pub use wkt::{WktNode, WktValue};

use crate::error::Error;
use crate::primitives::{CrsUnit, UnitKind};
use crate::util::Result;
use crate::util::crs_definitions;
use serde::de::Visitor;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::Formatter;
use std::str::FromStr;
use std::sync::Arc;

const GEOGRAPHIC_KEYWORDS: [&str; 5] = [
    "GEOGCS",
    "GEOGCRS",
    "GEOGRAPHICCRS",
    "GEODCRS",
    "GEODETICCRS",
];
const COMPOUND_KEYWORDS: [&str; 2] = ["COMPD_CS", "COMPOUNDCRS"];
const UNIT_KEYWORDS: [&str; 3] = ["UNIT", "LENGTHUNIT", "ANGLEUNIT"];

/// A coordinate reference system, exchanged as an OGC WKT string.
///
/// Equality and hashing are by value of the WKT string.
/// Construction with [`SpatialReference::new`] does not validate the string,
/// use [`SpatialReference::definition`] or `parse` for that.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpatialReference {
    wkt: Arc<str>,
}

impl SpatialReference {
    pub fn new(wkt: impl Into<Arc<str>>) -> Self {
        Self { wkt: wkt.into() }
    }

    /// Looks up one of the built-in definitions
    pub fn from_epsg(code: u32) -> Result<Self> {
        crs_definitions::wkt_from_epsg(code).map(Self::new)
    }

    /// the WGS 84 spatial reference system
    pub fn wgs84() -> Self {
        Self::new(crs_definitions::WGS_84)
    }

    pub fn wkt(&self) -> &str {
        &self.wkt
    }

    /// The WKT without whitespace outside of quoted strings and with upper case keywords
    pub fn normalized_wkt(&self) -> String {
        let mut normalized = String::with_capacity(self.wkt.len());
        let mut quoted = false;

        for c in self.wkt.chars() {
            if c == '"' {
                quoted = !quoted;
            }

            if quoted {
                normalized.push(c);
            } else if !c.is_whitespace() {
                normalized.push(c.to_ascii_uppercase());
            }
        }

        normalized
    }

    /// Reads name, authority and unit from the WKT
    pub fn definition(&self) -> Result<CrsDefinition> {
        CrsDefinition::from_wkt(&self.wkt)
    }

    /// Checks if both descriptors denote the same reference system,
    /// either by identical WKT or by the same authority identifier.
    pub fn is_same_reference_system(&self, other: &Self) -> bool {
        if self.wkt == other.wkt || self.normalized_wkt() == other.normalized_wkt() {
            return true;
        }

        match (self.definition(), other.definition()) {
            (Ok(a), Ok(b)) => a.authority.is_some() && a.authority == b.authority,
            _ => false,
        }
    }
}

impl std::fmt::Display for SpatialReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.wkt)
    }
}

impl FromStr for SpatialReference {
    type Err = Error;

    /// Parses either a WKT string or an `EPSG:<code>` reference to a built-in definition
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if let Some(code) = s
            .strip_prefix("EPSG:")
            .or_else(|| s.strip_prefix("epsg:"))
        {
            let code = code
                .parse::<u32>()
                .map_err(|_| Error::InvalidSpatialReferenceString {
                    spatial_reference_string: s.into(),
                })?;
            return Self::from_epsg(code);
        }

        WktNode::parse(s)?;

        Ok(Self::new(s))
    }
}

impl Serialize for SpatialReference {
    fn serialize<S>(&self, serializer: S) -> Result<<S as Serializer>::Ok, <S as Serializer>::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.wkt)
    }
}

/// Helper struct for deserializing a `SpatialReference`
struct SpatialReferenceDeserializeVisitor;

impl Visitor<'_> for SpatialReferenceDeserializeVisitor {
    type Value = SpatialReference;

    fn expecting(&self, formatter: &mut Formatter) -> std::fmt::Result {
        formatter.write_str("a spatial reference as WKT or in the form EPSG:code")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        v.parse().map_err(serde::de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for SpatialReference {
    fn deserialize<D>(deserializer: D) -> Result<Self, <D as Deserializer<'de>>::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_str(SpatialReferenceDeserializeVisitor)
    }
}

/// An authority identifier like `EPSG:4326`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Authority {
    pub name: String,
    pub code: String,
}

impl PartialEq<(&str, &str)> for Authority {
    fn eq(&self, (name, code): &(&str, &str)) -> bool {
        self.name.eq_ignore_ascii_case(name) && self.code == *code
    }
}

impl std::fmt::Display for Authority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.name, self.code)
    }
}

/// What the processing needs to know about a reference system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrsDefinition {
    pub name: String,
    pub authority: Option<Authority>,
    pub geographic: bool,
    pub unit: Option<CrsUnit>,
}

impl CrsDefinition {
    pub fn from_wkt(wkt: &str) -> Result<Self> {
        let root = WktNode::parse(wkt)?;
        Self::from_node(horizontal_node(&root))
    }

    fn from_node(node: &WktNode) -> Result<Self> {
        let geographic = GEOGRAPHIC_KEYWORDS.contains(&node.keyword.as_str());

        let authority = node.child(&["AUTHORITY", "ID"]).and_then(|id| {
            Some(Authority {
                name: id.scalar(0)?.to_ascii_uppercase(),
                code: id.scalar(1)?.to_string(),
            })
        });

        // WKT 2 may declare the unit per axis instead of once per system
        let unit_node = node.child(&UNIT_KEYWORDS).or_else(|| {
            node.children()
                .filter(|child| child.keyword == "AXIS")
                .find_map(|axis| axis.child(&UNIT_KEYWORDS))
        });

        let unit = unit_node
            .map(|unit| unit_from_node(unit, geographic))
            .transpose()?;

        Ok(Self {
            name: node.scalar(0).unwrap_or_default().to_string(),
            authority,
            geographic,
            unit,
        })
    }

    /// The unit if it is a length
    pub fn linear_unit(&self) -> Option<&CrsUnit> {
        self.unit.as_ref().filter(|unit| unit.is_linear())
    }
}

/// The horizontal part of a compound system
fn horizontal_node(node: &WktNode) -> &WktNode {
    if COMPOUND_KEYWORDS.contains(&node.keyword.as_str()) {
        node.children().next().map_or(node, horizontal_node)
    } else {
        node
    }
}

fn unit_from_node(node: &WktNode, geographic: bool) -> Result<CrsUnit> {
    let kind = match node.keyword.as_str() {
        "LENGTHUNIT" => UnitKind::Linear,
        "ANGLEUNIT" => UnitKind::Angular,
        _ if geographic => UnitKind::Angular,
        _ => UnitKind::Linear,
    };

    let name = node.scalar(0).unwrap_or_default();
    let to_base = node.number(1)?.ok_or_else(|| Error::InvalidWkt {
        position: 0,
        reason: format!("unit `{name}` has no conversion factor"),
    })?;

    Ok(CrsUnit::new(name, kind, to_base))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::crs_definitions::{
        CONUS_ALBERS, TEXAS_SOUTH_CENTRAL_FTUS, WEB_MERCATOR, WGS_84,
    };

    const WKT2_UTM: &str = r#"PROJCRS["WGS 84 / UTM zone 32N",
        BASEGEOGCRS["WGS 84",
            DATUM["World Geodetic System 1984",
                ELLIPSOID["WGS 84",6378137,298.257223563,LENGTHUNIT["metre",1]]],
            PRIMEM["Greenwich",0,ANGLEUNIT["degree",0.0174532925199433]]],
        CONVERSION["UTM zone 32N",
            METHOD["Transverse Mercator",ID["EPSG",9807]],
            PARAMETER["Longitude of natural origin",9,ANGLEUNIT["degree",0.0174532925199433]]],
        CS[Cartesian,2],
            AXIS["(E)",east,ORDER[1],LENGTHUNIT["metre",1]],
            AXIS["(N)",north,ORDER[2],LENGTHUNIT["metre",1]],
        ID["EPSG",32632]]"#;

    #[test]
    fn it_reads_geographic_definitions() {
        let definition = SpatialReference::wgs84().definition().unwrap();

        assert_eq!(definition.name, "WGS 84");
        assert!(definition.geographic);
        assert_eq!(definition.authority.unwrap(), ("EPSG", "4326"));
        assert_eq!(definition.unit.unwrap().kind, UnitKind::Angular);
    }

    #[test]
    fn it_reads_projected_definitions() {
        let definition = CrsDefinition::from_wkt(CONUS_ALBERS).unwrap();

        assert_eq!(definition.name, "NAD83 / Conus Albers");
        assert!(!definition.geographic);
        assert_eq!(definition.authority.as_ref().unwrap(), &("EPSG", "5070"));
        assert!(definition.linear_unit().unwrap().matches(&CrsUnit::metre()));
    }

    #[test]
    fn it_reads_foot_units() {
        let definition = CrsDefinition::from_wkt(TEXAS_SOUTH_CENTRAL_FTUS).unwrap();
        let unit = definition.linear_unit().unwrap();

        assert_eq!(unit.name, "US survey foot");
        assert!(float_cmp::approx_eq!(
            f64,
            unit.to_base,
            0.304_800_609_601_219
        ));
    }

    #[test]
    fn it_reads_wkt2_axis_units() {
        let definition = CrsDefinition::from_wkt(WKT2_UTM).unwrap();

        assert_eq!(definition.name, "WGS 84 / UTM zone 32N");
        assert_eq!(definition.authority.clone().unwrap(), ("EPSG", "32632"));
        assert!(definition.linear_unit().unwrap().matches(&CrsUnit::metre()));
    }

    #[test]
    fn it_reads_compound_systems() {
        let wkt = format!(
            r#"COMPD_CS["Albers + height",{CONUS_ALBERS},VERT_CS["NAVD88 height",VERT_DATUM["North American Vertical Datum 1988",2005],UNIT["metre",1]]]"#
        );

        let definition = CrsDefinition::from_wkt(&wkt).unwrap();

        assert_eq!(definition.name, "NAD83 / Conus Albers");
    }

    #[test]
    fn it_parses_strings() {
        let from_code: SpatialReference = "EPSG:3857".parse().unwrap();
        let from_wkt: SpatialReference = WEB_MERCATOR.parse().unwrap();

        assert_eq!(from_code, from_wkt);
        assert!("EPSG:abc".parse::<SpatialReference>().is_err());
        assert!("EPSG:1".parse::<SpatialReference>().is_err());
        assert!("not a crs".parse::<SpatialReference>().is_err());
    }

    #[test]
    fn it_compares_by_value() {
        let a = SpatialReference::new(String::from(WGS_84));
        let b = SpatialReference::new(WGS_84);

        assert_eq!(a, b);
        assert!(a.is_same_reference_system(&b));
    }

    #[test]
    fn it_detects_the_same_system_in_different_notation() {
        let pretty = SpatialReference::new(WGS_84.replace(',', ",\n    "));
        let renamed = SpatialReference::new(WGS_84.replace("\"WGS 84\"", "\"WGS84\""));

        assert_ne!(pretty, SpatialReference::wgs84());
        assert!(pretty.is_same_reference_system(&SpatialReference::wgs84()));
        assert!(renamed.is_same_reference_system(&SpatialReference::wgs84()));
        assert!(
            !SpatialReference::wgs84()
                .is_same_reference_system(&SpatialReference::new(CONUS_ALBERS))
        );
    }

    #[test]
    fn unparseable_descriptors_are_only_the_same_when_identical() {
        let broken = SpatialReference::new("garbage");

        assert!(broken.is_same_reference_system(&SpatialReference::new("garbage")));
        assert!(!broken.is_same_reference_system(&SpatialReference::new("other garbage")));
    }

    #[test]
    fn serialization() {
        let spatial_reference = SpatialReference::from_epsg(5070).unwrap();

        let json = serde_json::to_string(&spatial_reference).unwrap();
        let deserialized: SpatialReference = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized, spatial_reference);
        assert_eq!(
            serde_json::from_str::<SpatialReference>("\"EPSG:5070\"").unwrap(),
            spatial_reference
        );
    }
}
