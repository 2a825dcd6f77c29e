//! File formats read and written when assembling ECOSSE inputs
//!
//! * coordinate and plant litter workbooks ([`coordinates`], [`excel_litter`])
//! * the HWSD soil raster and attribute table ([`hwsd`])
//! * NetCDF litter and climate grids ([`netcdf`], behind the `netcdf` feature)
//! * per-cell JSON outputs and the study definition file ([`json_writer`], [`study`])

pub mod coordinates;
mod excel;
pub mod excel_litter;
pub mod hwsd;
pub mod json_writer;
#[cfg(feature = "netcdf")]
pub mod netcdf;
pub mod study;
