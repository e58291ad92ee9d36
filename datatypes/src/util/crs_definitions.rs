//! Built-in WKT definitions for a few reference systems that are common in hydrologic work.
//! This is a boundary utility only, the processing code never looks at EPSG codes.

use crate::error::Error;
use crate::util::Result;

pub const WGS_84: &str = r#"GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563,AUTHORITY["EPSG","7030"]],AUTHORITY["EPSG","6326"]],PRIMEM["Greenwich",0,AUTHORITY["EPSG","8901"]],UNIT["degree",0.0174532925199433,AUTHORITY["EPSG","9122"]],AXIS["Latitude",NORTH],AXIS["Longitude",EAST],AUTHORITY["EPSG","4326"]]"#;

pub const NAD_83: &str = r#"GEOGCS["NAD83",DATUM["North_American_Datum_1983",SPHEROID["GRS 1980",6378137,298.257222101,AUTHORITY["EPSG","7019"]],AUTHORITY["EPSG","6269"]],PRIMEM["Greenwich",0,AUTHORITY["EPSG","8901"]],UNIT["degree",0.0174532925199433,AUTHORITY["EPSG","9122"]],AXIS["Latitude",NORTH],AXIS["Longitude",EAST],AUTHORITY["EPSG","4269"]]"#;

/// NAD83 / Conus Albers, the projection of the Standard Hydrologic Grid.
pub const CONUS_ALBERS: &str = r#"PROJCS["NAD83 / Conus Albers",GEOGCS["NAD83",DATUM["North_American_Datum_1983",SPHEROID["GRS 1980",6378137,298.257222101,AUTHORITY["EPSG","7019"]],AUTHORITY["EPSG","6269"]],PRIMEM["Greenwich",0,AUTHORITY["EPSG","8901"]],UNIT["degree",0.0174532925199433,AUTHORITY["EPSG","9122"]],AUTHORITY["EPSG","4269"]],PROJECTION["Albers_Conic_Equal_Area"],PARAMETER["latitude_of_center",23],PARAMETER["longitude_of_center",-96],PARAMETER["standard_parallel_1",29.5],PARAMETER["standard_parallel_2",45.5],PARAMETER["false_easting",0],PARAMETER["false_northing",0],UNIT["metre",1,AUTHORITY["EPSG","9001"]],AXIS["Easting",EAST],AXIS["Northing",NORTH],AUTHORITY["EPSG","5070"]]"#;

pub const WEB_MERCATOR: &str = r#"PROJCS["WGS 84 / Pseudo-Mercator",GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563,AUTHORITY["EPSG","7030"]],AUTHORITY["EPSG","6326"]],PRIMEM["Greenwich",0,AUTHORITY["EPSG","8901"]],UNIT["degree",0.0174532925199433,AUTHORITY["EPSG","9122"]],AUTHORITY["EPSG","4326"]],PROJECTION["Mercator_1SP"],PARAMETER["central_meridian",0],PARAMETER["scale_factor",1],PARAMETER["false_easting",0],PARAMETER["false_northing",0],UNIT["metre",1,AUTHORITY["EPSG","9001"]],AXIS["Easting",EAST],AXIS["Northing",NORTH],AUTHORITY["EPSG","3857"]]"#;

/// NAD83 / Texas South Central in US survey feet.
pub const TEXAS_SOUTH_CENTRAL_FTUS: &str = r#"PROJCS["NAD83 / Texas South Central (ftUS)",GEOGCS["NAD83",DATUM["North_American_Datum_1983",SPHEROID["GRS 1980",6378137,298.257222101,AUTHORITY["EPSG","7019"]],AUTHORITY["EPSG","6269"]],PRIMEM["Greenwich",0,AUTHORITY["EPSG","8901"]],UNIT["degree",0.0174532925199433,AUTHORITY["EPSG","9122"]],AUTHORITY["EPSG","4269"]],PROJECTION["Lambert_Conformal_Conic_2SP"],PARAMETER["latitude_of_origin",27.8333333333333],PARAMETER["central_meridian",-99],PARAMETER["standard_parallel_1",30.2833333333333],PARAMETER["standard_parallel_2",28.3833333333333],PARAMETER["false_easting",1968500],PARAMETER["false_northing",13123333.333],UNIT["US survey foot",0.304800609601219,AUTHORITY["EPSG","9003"]],AXIS["Easting",EAST],AXIS["Northing",NORTH],AUTHORITY["EPSG","2278"]]"#;

const DEFINITIONS: [(u32, &str); 5] = [
    (4326, WGS_84),
    (4269, NAD_83),
    (5070, CONUS_ALBERS),
    (3857, WEB_MERCATOR),
    (2278, TEXAS_SOUTH_CENTRAL_FTUS),
];

/// Looks up the WKT of an EPSG code.
pub fn wkt_from_epsg(code: u32) -> Result<&'static str> {
    DEFINITIONS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, wkt)| *wkt)
        .ok_or(Error::UnknownEpsgCode { code })
}

/// All EPSG codes with a built-in definition.
pub fn known_epsg_codes() -> impl Iterator<Item = u32> {
    DEFINITIONS.iter().map(|(code, _)| *code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_resolves_known_codes() {
        assert_eq!(wkt_from_epsg(4326).unwrap(), WGS_84);
        assert_eq!(wkt_from_epsg(5070).unwrap(), CONUS_ALBERS);
    }

    #[test]
    fn it_fails_for_unknown_codes() {
        assert!(matches!(
            wkt_from_epsg(31467),
            Err(Error::UnknownEpsgCode { code: 31467 })
        ));
    }

    #[test]
    fn every_known_code_is_its_own_authority() {
        for code in known_epsg_codes() {
            let wkt = wkt_from_epsg(code).unwrap();
            assert!(wkt.ends_with(&format!(r#"AUTHORITY["EPSG","{code}"]]"#)));
        }
    }
}
