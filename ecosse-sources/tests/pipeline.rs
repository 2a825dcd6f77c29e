use ecosse_core::assembler::{CellAssembler, SoilNoDataPolicy};
use ecosse_core::climate::{ClimateGrid, ClimateResolver, GriddedClimateDataset, ResourceFamily};
use ecosse_core::context::{ResolverContext, StudySettings};
use ecosse_core::litter::{LitterResolver, LitterSource};
use ecosse_core::record::SimulationCellRecord;
use ecosse_core::spatial::{Coordinate, GridAxis};
use ecosse_core::timeseries::{TimeSeries, YearRange};
use ecosse_sources::hwsd::{HwsdGrid, ATTRIBUTES_FILE, HEADER_FILE, RASTER_FILE};
use ecosse_sources::json_writer::{JsonCellWriter, CELL_FILE, CONTEXT_FILE};
use is_close::is_close;
use ndarray::Array3;
use std::path::Path;
use std::sync::Arc;

/// 10x10 one degree raster over 0-10N 0-10E; the two southern rows have no soil.
fn write_hwsd(dir: &Path) {
    std::fs::write(
        dir.join(HEADER_FILE),
        "BYTEORDER I\nNROWS 10\nNCOLS 10\nNBITS 16\nNODATA 0\nULXMAP 0.5\nULYMAP 9.5\nXDIM 1.0\nYDIM 1.0\n",
    )
    .unwrap();
    let raster: Vec<u8> = (0..100)
        .flat_map(|i| {
            let value: u16 = if i / 10 >= 8 { 0 } else { 7001 + (i % 2) as u16 };
            value.to_le_bytes()
        })
        .collect();
    std::fs::write(dir.join(RASTER_FILE), raster).unwrap();
    std::fs::write(
        dir.join(ATTRIBUTES_FILE),
        "MU_GLOBAL,SHARE,T_OC,T_BULK_DENSITY,T_PH_H2O,T_CLAY,T_SILT,T_SAND\n\
         7001,60,1.1,1.3,6.0,20,40,40\n\
         7001,40,0.9,1.4,6.5,25,35,40\n\
         7002,100,2.0,1.2,5.0,10,20,70\n",
    )
    .unwrap();
}

fn climate_grid(start_year: i32, nyears: usize) -> ClimateGrid {
    let axis = GridAxis::regular(0.5, 1.0, 10).unwrap();
    ClimateGrid::new(
        axis.clone(),
        axis,
        start_year,
        Array3::from_elem((nyears * 12, 10, 10), 50.0),
        Array3::from_elem((nyears * 12, 10, 10), 11.0),
    )
    .unwrap()
}

#[test]
fn batch_writes_cells_to_disk() {
    let hwsd_dir = tempfile::tempdir().unwrap();
    write_hwsd(hwsd_dir.path());
    let sims_dir = tempfile::tempdir().unwrap();
    let study_dir = sims_dir.path().join("wales");

    let dataset = GriddedClimateDataset::new(
        "CRU",
        climate_grid(2001, 10),
        Some(climate_grid(1971, 30)),
    );
    let climate = ClimateResolver::new(Arc::new(dataset), ResourceFamily::Cru);
    let (simulation, historic) = climate
        .windows(
            YearRange::new(2001, 2010).unwrap(),
            YearRange::new(1981, 2000).unwrap(),
        )
        .unwrap();
    let context = ResolverContext::new("CRU", ResourceFamily::Cru, simulation, historic);

    let litter = TimeSeries::new(vec![2001, 2002, 2003], vec![4.0, 5.0, 6.0]).unwrap();
    let assembler = CellAssembler::new(
        StudySettings::new("wales"),
        ecosse_core::soil::SoilResolver::new(Arc::new(HwsdGrid::open(hwsd_dir.path()).unwrap())),
        LitterResolver::new(LitterSource::Excel(litter)),
        climate,
        Arc::new(JsonCellWriter::new(&study_dir)),
    )
    .with_soil_no_data(SoilNoDataPolicy::Skip);

    let coords = vec![
        Coordinate::new(5.2, 3.3, "north"),
        Coordinate::new(1.5, 4.5, "no soil"),
        Coordinate::new(7.5, 6.5, "site/2"),
        // Same directory name as "site/2"
        Coordinate::new(7.5, 6.5, "site_2"),
    ];
    let result = assembler.run(&coords, &context).unwrap();
    assert_eq!(result.completed, 2);
    assert_eq!(result.soil_no_data, 1);
    assert_eq!(result.failed, 1);

    let context_json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(study_dir.join(CONTEXT_FILE)).unwrap())
            .unwrap();
    assert_eq!(context_json["study"], "wales");

    let record: SimulationCellRecord = serde_json::from_str(
        &std::fs::read_to_string(study_dir.join("north").join(CELL_FILE)).unwrap(),
    )
    .unwrap();
    assert_eq!(record.soil.records.records()[0].mu_global, 7002);
    assert_eq!(record.plant_inputs.series.len(), 10);
    assert_eq!(record.plant_inputs.series.values()[9], 6.0);
    assert!(is_close!(record.climate.future.temperature[0], 11.0));

    let record: SimulationCellRecord = serde_json::from_str(
        &std::fs::read_to_string(study_dir.join("site_2").join(CELL_FILE)).unwrap(),
    )
    .unwrap();
    assert_eq!(record.coordinate.id, "site/2");
    assert!(!study_dir.join("no soil").exists());
}
