//! Historic weather and future climate for a coordinate
//!
//! The [`ClimateResolver`] wraps one configured weather resource. For each coordinate it
//!
//! 1. checks the coordinate's area of interest lies inside the resource's declared
//!    extent, skipping the coordinate before any data is read otherwise,
//! 2. finds the grid windows enclosing the area in the future and historic grids,
//! 3. reads and converts the future then the historic period according to the
//!    resource's [`ResourceFamily`].
//!
//! The simulation and historic year windows are computed once per batch by
//! [`ClimateResolver::windows`] and carried in the [`ResolverContext`].

mod dataset;
mod family;
mod series;

pub use dataset::{
    AoiIndices, ClimateDataset, ClimateGrid, GridWindow, GriddedClimateDataset, Period,
    RawCellSeries, RawClimate,
};
pub use family::{PrecipitationUnit, ResourceFamily};
pub use series::{CellClimate, CellSeries, ClimateBundle, PeriodSeries};

use crate::context::ResolverContext;
use crate::errors::{EcosseError, EcosseResult};
use crate::resolution::{Resolution, SkipReason};
use crate::spatial::Coordinate;
use crate::timeseries::YearRange;
use std::sync::Arc;
use tracing::{debug, warn};

/// Resolves the climate of a coordinate from one weather resource.
pub struct ClimateResolver {
    dataset: Arc<dyn ClimateDataset>,
    family: ResourceFamily,
}

impl ClimateResolver {
    pub fn new(dataset: Arc<dyn ClimateDataset>, family: ResourceFamily) -> Self {
        Self { dataset, family }
    }

    pub fn dataset(&self) -> &dyn ClimateDataset {
        self.dataset.as_ref()
    }

    pub fn family(&self) -> ResourceFamily {
        self.family
    }

    /// Simulation and historic windows for a batch.
    ///
    /// The simulation window is the requested future range limited to the years the
    /// resource provides, likewise the historic window. Either window being empty is an
    /// error since no coordinate could then be resolved.
    pub fn windows(
        &self,
        requested_future: YearRange,
        requested_historic: YearRange,
    ) -> EcosseResult<(YearRange, YearRange)> {
        let limit = |requested: YearRange, period: Period| {
            let available = self.dataset.period_years(self.family.source_period(period));
            requested.intersect(&available).ok_or_else(|| {
                EcosseError::InvalidConfig(format!(
                    "{period} years {requested} are outside the {available} provided by {}",
                    self.dataset.name()
                ))
            })
        };
        let simulation = limit(requested_future, Period::Future)?;
        let historic = limit(requested_historic, Period::Historic)?;
        if simulation != requested_future {
            warn!(
                resource = self.dataset.name(),
                requested = %requested_future,
                simulation = %simulation,
                "Simulation period limited to years available in weather resource"
            );
        }
        Ok((simulation, historic))
    }

    pub fn resolve(
        &self,
        coordinate: &Coordinate,
        context: &ResolverContext,
    ) -> EcosseResult<Resolution<ClimateBundle>> {
        let aoi = coordinate.area_of_interest();
        if !self.dataset.declared_extent().contains(&aoi) {
            warn!(
                id = %coordinate.id,
                lat = coordinate.lat,
                lon = coordinate.lon,
                resource = self.dataset.name(),
                "Coordinate lies outwith weather resource limits"
            );
            return Ok(Resolution::Skipped(SkipReason::OutOfExtent {
                resource: self.dataset.name().to_string(),
            }));
        }

        let indices = self.dataset.grid_indices(&aoi)?;
        debug!(id = %coordinate.id, ?indices, "Local grid windows");

        let future = self
            .fetch(Period::Future, &indices)?
            .trimmed(context.simulation_years);
        let historic = self
            .fetch(Period::Historic, &indices)?
            .trimmed(context.historic_years);

        Ok(Resolution::Resolved(ClimateBundle {
            resource: self.dataset.name().to_string(),
            historic,
            future,
        }))
    }

    fn fetch(&self, period: Period, indices: &AoiIndices) -> EcosseResult<PeriodSeries> {
        let source = self.family.source_period(period);
        let raw = self.dataset.read_period(source, &indices.window(source))?;
        Ok(PeriodSeries {
            period,
            cells: raw
                .cells
                .iter()
                .map(|(cell, series)| (*cell, self.family.convert(series, raw.start_year)))
                .collect(),
        })
    }
}
