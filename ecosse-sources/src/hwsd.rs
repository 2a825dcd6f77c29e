//! Harmonized World Soil Database raster
//!
//! The map unit raster is a band-interleaved file of 16-bit integers (`hwsd.bil`)
//! described by an ESRI header (`hwsd.hdr`). Soil properties per map unit component
//! come from the `HWSD_DATA.csv` export of the attribute database.

use ecosse_core::errors::{EcosseError, EcosseResult};
use ecosse_core::soil::{MuGlobal, MuGlobalCounts, SoilComponent, SoilGrid, SoilLayer, SoilRecord};
use ecosse_core::spatial::{BoundingBox, GridCell};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const HEADER_FILE: &str = "hwsd.hdr";
pub const RASTER_FILE: &str = "hwsd.bil";
pub const ATTRIBUTES_FILE: &str = "HWSD_DATA.csv";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    LittleEndian,
    BigEndian,
}

/// Geometry of the map unit raster.
#[derive(Debug, Clone, PartialEq)]
pub struct HwsdHeader {
    pub byte_order: ByteOrder,
    pub nrows: usize,
    pub ncols: usize,
    pub nodata: u16,
    /// Longitude of the centre of the upper-left cell.
    pub ulxmap: f64,
    /// Latitude of the centre of the upper-left cell.
    pub ulymap: f64,
    pub xdim: f64,
    pub ydim: f64,
}

impl HwsdHeader {
    pub fn parse(text: &str, source: &str) -> EcosseResult<Self> {
        let mut fields = BTreeMap::new();
        for line in text.lines() {
            let mut parts = line.split_whitespace();
            if let (Some(key), Some(value)) = (parts.next(), parts.next()) {
                fields.insert(key.to_ascii_uppercase(), value.to_string());
            }
        }

        let number = |key: &str| -> EcosseResult<f64> {
            fields
                .get(key)
                .ok_or_else(|| EcosseError::format(source, format!("header has no {key}")))?
                .parse::<f64>()
                .map_err(|e| EcosseError::format(source, format!("{key}: {e}")))
        };

        let byte_order = match fields.get("BYTEORDER").map(String::as_str) {
            Some("M") => ByteOrder::BigEndian,
            Some("I") | None => ByteOrder::LittleEndian,
            Some(other) => {
                return Err(EcosseError::format(
                    source,
                    format!("unsupported BYTEORDER {other}"),
                ))
            }
        };
        if let Some(nbits) = fields.get("NBITS") {
            if nbits != "16" {
                return Err(EcosseError::format(
                    source,
                    format!("expected 16 bit values, found NBITS {nbits}"),
                ));
            }
        }

        let header = Self {
            byte_order,
            nrows: number("NROWS")? as usize,
            ncols: number("NCOLS")? as usize,
            nodata: match fields.get("NODATA") {
                Some(_) => number("NODATA")? as u16,
                None => 0,
            },
            ulxmap: number("ULXMAP")?,
            ulymap: number("ULYMAP")?,
            xdim: number("XDIM")?,
            ydim: number("YDIM")?,
        };
        if header.nrows == 0 || header.ncols == 0 || header.xdim <= 0.0 || header.ydim <= 0.0 {
            return Err(EcosseError::format(source, "raster has no cells"));
        }
        Ok(header)
    }

    /// Row holding `lat`, or `None` outside the raster.
    pub fn row_of(&self, lat: f64) -> Option<usize> {
        let row = ((self.ulymap + self.ydim / 2.0 - lat) / self.ydim).floor();
        (row >= 0.0 && row < self.nrows as f64).then_some(row as usize)
    }

    /// Column holding `lon`, or `None` outside the raster.
    pub fn col_of(&self, lon: f64) -> Option<usize> {
        let col = ((lon - (self.ulxmap - self.xdim / 2.0)) / self.xdim).floor();
        (col >= 0.0 && col < self.ncols as f64).then_some(col as usize)
    }

    /// Inclusive cell range covering `bbox`, clipped to the raster.
    fn window(&self, bbox: &BoundingBox) -> Option<(GridCell, GridCell)> {
        let north = self.ulymap + self.ydim / 2.0;
        let south = north - self.ydim * self.nrows as f64;
        let west = self.ulxmap - self.xdim / 2.0;
        let east = west + self.xdim * self.ncols as f64;
        if bbox.lat_min > north || bbox.lat_max < south || bbox.lon_min > east || bbox.lon_max < west
        {
            return None;
        }

        let row = |lat: f64| {
            self.row_of(lat)
                .unwrap_or(if lat > north { 0 } else { self.nrows - 1 })
        };
        let col = |lon: f64| {
            self.col_of(lon)
                .unwrap_or(if lon < west { 0 } else { self.ncols - 1 })
        };
        Some((
            GridCell::new(row(bbox.lat_max), col(bbox.lon_min)),
            GridCell::new(row(bbox.lat_min), col(bbox.lon_max)),
        ))
    }
}

/// One row of `HWSD_DATA.csv`. Columns may be empty for map units without soil.
#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct AttributeRow {
    MU_GLOBAL: MuGlobal,
    #[serde(default)]
    SHARE: Option<f64>,
    #[serde(default)]
    T_OC: Option<f64>,
    #[serde(default)]
    T_BULK_DENSITY: Option<f64>,
    #[serde(default)]
    T_REF_BULK_DENSITY: Option<f64>,
    #[serde(default)]
    T_PH_H2O: Option<f64>,
    #[serde(default)]
    T_CLAY: Option<f64>,
    #[serde(default)]
    T_SILT: Option<f64>,
    #[serde(default)]
    T_SAND: Option<f64>,
    #[serde(default)]
    S_OC: Option<f64>,
    #[serde(default)]
    S_BULK_DENSITY: Option<f64>,
    #[serde(default)]
    S_REF_BULK_DENSITY: Option<f64>,
    #[serde(default)]
    S_PH_H2O: Option<f64>,
    #[serde(default)]
    S_CLAY: Option<f64>,
    #[serde(default)]
    S_SILT: Option<f64>,
    #[serde(default)]
    S_SAND: Option<f64>,
}

impl AttributeRow {
    /// Components without topsoil carbon (water, rock, glaciers) carry no soil.
    fn component(&self) -> Option<SoilComponent> {
        let topsoil = SoilLayer {
            organic_carbon: self.T_OC?,
            bulk_density: self.T_BULK_DENSITY.or(self.T_REF_BULK_DENSITY)?,
            ph: self.T_PH_H2O?,
            clay: self.T_CLAY?,
            silt: self.T_SILT?,
            sand: self.T_SAND?,
        };
        let subsoil = || -> Option<SoilLayer> {
            Some(SoilLayer {
                organic_carbon: self.S_OC?,
                bulk_density: self.S_BULK_DENSITY.or(self.S_REF_BULK_DENSITY)?,
                ph: self.S_PH_H2O?,
                clay: self.S_CLAY?,
                silt: self.S_SILT?,
                sand: self.S_SAND?,
            })
        };
        Some(SoilComponent {
            share: self.SHARE.unwrap_or(0.0),
            topsoil,
            subsoil: subsoil(),
        })
    }
}

/// Map unit raster and attribute table held for the length of a run.
#[derive(Debug)]
pub struct HwsdGrid {
    header: HwsdHeader,
    raster: PathBuf,
    components: BTreeMap<MuGlobal, Vec<SoilComponent>>,
}

impl HwsdGrid {
    /// Open the database in `dir`.
    ///
    /// The attribute table is read once; the raster is read on demand.
    pub fn open(dir: &Path) -> EcosseResult<Self> {
        let header_path = dir.join(HEADER_FILE);
        let raster = dir.join(RASTER_FILE);
        let attributes = dir.join(ATTRIBUTES_FILE);
        for path in [&header_path, &raster, &attributes] {
            if !path.is_file() {
                return Err(EcosseError::MissingFile(path.clone()));
            }
        }

        let header = HwsdHeader::parse(
            &std::fs::read_to_string(&header_path)?,
            &header_path.display().to_string(),
        )?;
        let expected = (header.nrows * header.ncols * 2) as u64;
        let actual = std::fs::metadata(&raster)?.len();
        if actual < expected {
            return Err(EcosseError::format(
                raster.display().to_string(),
                format!("expected {expected} bytes for {}x{} cells, found {actual}", header.nrows, header.ncols),
            ));
        }

        let components = read_attributes(&attributes)?;
        info!(
            dir = %dir.display(),
            nrows = header.nrows,
            ncols = header.ncols,
            mu_globals = components.len(),
            "Opened HWSD"
        );
        Ok(Self {
            header,
            raster,
            components,
        })
    }

    pub fn header(&self) -> &HwsdHeader {
        &self.header
    }
}

fn read_attributes(path: &Path) -> EcosseResult<BTreeMap<MuGlobal, Vec<SoilComponent>>> {
    let source = path.display().to_string();
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| EcosseError::format(&source, e.to_string()))?;

    let mut components: BTreeMap<MuGlobal, Vec<SoilComponent>> = BTreeMap::new();
    for row in reader.deserialize::<AttributeRow>() {
        let row = row.map_err(|e| EcosseError::format(&source, e.to_string()))?;
        if let Some(component) = row.component() {
            components.entry(row.MU_GLOBAL).or_default().push(component);
        }
    }
    Ok(components)
}

impl SoilGrid for HwsdGrid {
    fn read_bbox_mu_globals(&self, bbox: &BoundingBox) -> EcosseResult<MuGlobalCounts> {
        let Some((upper_left, lower_right)) = self.header.window(bbox) else {
            debug!(bbox = ?bbox.to_array(), "Bounding box outside HWSD raster");
            return Ok(MuGlobalCounts::default());
        };
        let nrows = lower_right.row - upper_left.row + 1;
        let ncols = lower_right.col - upper_left.col + 1;

        let mut reader = BufReader::new(File::open(&self.raster)?);
        let mut buffer = vec![0u8; ncols * 2];
        let mut counts = BTreeMap::new();
        for row in upper_left.row..=lower_right.row {
            let offset = (row * self.header.ncols + upper_left.col) * 2;
            reader.seek(SeekFrom::Start(offset as u64))?;
            reader.read_exact(&mut buffer)?;
            for bytes in buffer.chunks_exact(2) {
                let pair = [bytes[0], bytes[1]];
                let value = match self.header.byte_order {
                    ByteOrder::LittleEndian => u16::from_le_bytes(pair),
                    ByteOrder::BigEndian => u16::from_be_bytes(pair),
                };
                if value != self.header.nodata {
                    *counts.entry(MuGlobal::from(value)).or_insert(0) += 1;
                }
            }
        }

        Ok(MuGlobalCounts {
            counts,
            values_read: nrows * ncols,
            origin: upper_left,
            nrows,
            ncols,
        })
    }

    fn soil_records(&self, coverages: &BTreeMap<MuGlobal, f64>) -> EcosseResult<Vec<SoilRecord>> {
        Ok(coverages
            .iter()
            .filter_map(|(mu_global, coverage)| {
                let components = self.components.get(mu_global)?;
                Some(SoilRecord {
                    mu_global: *mu_global,
                    weight: *coverage,
                    components: components.clone(),
                })
            })
            .collect())
    }
}
