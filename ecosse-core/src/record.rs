use crate::climate::{CellClimate, ClimateBundle};
use crate::litter::PlantInputs;
use crate::soil::ResolvedSoil;
use crate::spatial::{Coordinate, GridCell};
use serde::{Deserialize, Serialize};

/// Area assigned to every simulated cell.
pub const DEFAULT_AREA: f64 = 1.0;

/// Everything needed to write the simulation inputs of one coordinate.
///
/// Only built when soil, litter and climate all resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationCellRecord {
    pub coordinate: Coordinate,
    /// HWSD raster cell of the coordinate.
    pub grid_cell: GridCell,
    pub area: f64,
    pub soil: ResolvedSoil,
    /// Litter aligned to the simulation window.
    pub plant_inputs: PlantInputs,
    pub climate: CellClimate,
}

impl SimulationCellRecord {
    /// Merge resolver outputs.
    ///
    /// Returns `None` when the climate bundle has no usable grid cell for the coordinate.
    pub fn merge(
        coordinate: &Coordinate,
        soil: ResolvedSoil,
        plant_inputs: PlantInputs,
        climate: &ClimateBundle,
    ) -> Option<Self> {
        let climate = climate.associate(coordinate)?;
        Some(Self {
            coordinate: coordinate.clone(),
            grid_cell: soil.grid_cell,
            area: DEFAULT_AREA,
            soil,
            plant_inputs,
            climate,
        })
    }
}
