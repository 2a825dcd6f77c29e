//! Batch assembly of simulation inputs
//!
//! [`CellAssembler`] runs the soil, climate and litter resolvers for each coordinate,
//! merges their results into a [`SimulationCellRecord`] and passes it to the
//! [`CellWriter`]. A coordinate that cannot be resolved is counted and skipped; the rest
//! of the batch carries on. The exception is a coordinate with no soil map unit at all,
//! which by default stops the batch (see [`SoilNoDataPolicy`]). Map units without soil
//! records, such as water bodies, only skip the coordinate.
//!
//! Resolvers log why they skip a coordinate, so the assembler only logs the outcomes it
//! decides itself.
//!
//! Coordinates are independent, so with more than one worker they are processed on a
//! rayon thread pool. Records are then written in no particular order.

use crate::climate::ClimateResolver;
use crate::context::{LimitedDataContext, ResolverContext, StudySettings};
use crate::errors::{EcosseError, EcosseResult};
use crate::litter::LitterResolver;
use crate::record::SimulationCellRecord;
use crate::resolution::{Resolution, SkipReason};
use crate::soil::SoilResolver;
use crate::spatial::Coordinate;
use crate::writer::CellWriter;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

/// What to do when a coordinate has no soil data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoilNoDataPolicy {
    /// Stop the batch; coordinates already started still finish.
    #[default]
    Abort,
    /// Count the coordinate in [`BatchResult::soil_no_data`] and carry on.
    Skip,
}

/// Counts of coordinate outcomes for a batch.
///
/// Coordinates with a missing latitude or longitude are not counted anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchResult {
    /// Records written.
    pub completed: usize,
    /// No usable climate grid cell was associated, or the soil map units found have no
    /// records.
    pub skipped: usize,
    /// Outside the weather resource's extent or the litter dataset.
    pub rejected: usize,
    /// Hard errors such as malformed data or a failed write.
    pub failed: usize,
    pub soil_no_data: usize,
    /// Stopped early because a coordinate had no soil data.
    pub aborted: bool,
    /// Stopped early through the cancellation token.
    pub cancelled: bool,
}

impl fmt::Display for BatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "completed: {}\tskipped: {}\trejected: {}\tfailed: {}\tno soil: {}",
            self.completed, self.skipped, self.rejected, self.failed, self.soil_no_data
        )?;
        if self.aborted {
            write!(f, "\t(aborted)")?;
        }
        if self.cancelled {
            write!(f, "\t(cancelled)")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellOutcome {
    Ignored,
    Completed,
    Skipped,
    Rejected,
    SoilNoData,
}

#[derive(Default)]
struct Tally {
    completed: AtomicUsize,
    skipped: AtomicUsize,
    rejected: AtomicUsize,
    failed: AtomicUsize,
    soil_no_data: AtomicUsize,
}

impl Tally {
    fn record(&self, outcome: &EcosseResult<CellOutcome>) {
        let counter = match outcome {
            Ok(CellOutcome::Ignored) => return,
            Ok(CellOutcome::Completed) => &self.completed,
            Ok(CellOutcome::Skipped) => &self.skipped,
            Ok(CellOutcome::Rejected) => &self.rejected,
            Ok(CellOutcome::SoilNoData) => &self.soil_no_data,
            Err(_) => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn result(&self, aborted: bool, cancelled: bool) -> BatchResult {
        BatchResult {
            completed: self.completed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            soil_no_data: self.soil_no_data.load(Ordering::Relaxed),
            aborted,
            cancelled,
        }
    }
}

/// Drives the per-coordinate pipeline for a batch.
pub struct CellAssembler {
    study: StudySettings,
    soil: SoilResolver,
    litter: LitterResolver,
    climate: ClimateResolver,
    writer: Arc<dyn CellWriter>,
    workers: usize,
    on_soil_no_data: SoilNoDataPolicy,
    cancellation: Arc<AtomicBool>,
}

impl CellAssembler {
    pub fn new(
        study: StudySettings,
        soil: SoilResolver,
        litter: LitterResolver,
        climate: ClimateResolver,
        writer: Arc<dyn CellWriter>,
    ) -> Self {
        Self {
            study,
            soil,
            litter,
            climate,
            writer,
            workers: 1,
            on_soil_no_data: SoilNoDataPolicy::default(),
            cancellation: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Number of coordinates processed at once. 1 processes them in input order.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_soil_no_data(mut self, policy: SoilNoDataPolicy) -> Self {
        self.on_soil_no_data = policy;
        self
    }

    /// Token checked before each coordinate is started.
    pub fn with_cancellation(mut self, token: Arc<AtomicBool>) -> Self {
        self.cancellation = token;
        self
    }

    pub fn climate(&self) -> &ClimateResolver {
        &self.climate
    }

    pub fn limited_data_context(&self, context: &ResolverContext) -> LimitedDataContext {
        LimitedDataContext::new(&self.study, context, self.litter.source().summary())
    }

    /// Process every coordinate and report the outcome counts.
    ///
    /// Only errors preparing the batch are returned; errors for a single coordinate are
    /// logged and counted in [`BatchResult::failed`].
    pub fn run(
        &self,
        coordinates: &[Coordinate],
        context: &ResolverContext,
    ) -> EcosseResult<BatchResult> {
        let limited_data = self.limited_data_context(context);
        self.writer.prepare(&limited_data)?;

        info!(
            study = %self.study.name,
            resource = %context.weather_resource,
            coordinates = coordinates.len(),
            workers = self.workers,
            "Gathering soil and climate data"
        );

        let tally = Tally::default();
        let stop = AtomicBool::new(false);
        let process = |coordinate: &Coordinate| {
            if self.cancellation.load(Ordering::Relaxed) || stop.load(Ordering::Relaxed) {
                return;
            }
            let outcome = self.process(coordinate, context, &limited_data);
            if let Err(e) = &outcome {
                error!(id = %coordinate.id, error = %e, "Failed to assemble cell");
            }
            if matches!(outcome, Ok(CellOutcome::SoilNoData))
                && self.on_soil_no_data == SoilNoDataPolicy::Abort
            {
                stop.store(true, Ordering::Relaxed);
            }
            tally.record(&outcome);
        };

        if self.workers == 1 {
            coordinates.iter().for_each(process);
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.workers)
                .build()
                .map_err(|e| EcosseError::Error(format!("could not start worker pool: {e}")))?;
            pool.install(|| coordinates.par_iter().for_each(process));
        }

        let result = tally.result(
            stop.load(Ordering::Relaxed),
            self.cancellation.load(Ordering::Relaxed),
        );
        info!(study = %self.study.name, %result, "Batch finished");
        Ok(result)
    }

    fn process(
        &self,
        coordinate: &Coordinate,
        context: &ResolverContext,
        limited_data: &LimitedDataContext,
    ) -> EcosseResult<CellOutcome> {
        if coordinate.is_nan() {
            return Ok(CellOutcome::Ignored);
        }

        let soil = match self.soil.resolve(coordinate, context)? {
            Resolution::Resolved(soil) => soil,
            Resolution::Skipped(reason @ SkipReason::NoRecords { .. }) => {
                warn!(id = %coordinate.id, %reason, "No usable soil for this area");
                return Ok(CellOutcome::Skipped);
            }
            Resolution::Skipped(reason) => {
                match self.on_soil_no_data {
                    SoilNoDataPolicy::Abort => {
                        error!(id = %coordinate.id, %reason, "No soil data for this area, stopping batch")
                    }
                    SoilNoDataPolicy::Skip => {
                        warn!(id = %coordinate.id, %reason, "No soil data for this area")
                    }
                }
                return Ok(CellOutcome::SoilNoData);
            }
        };

        let climate = match self.climate.resolve(coordinate, context)? {
            Resolution::Resolved(climate) => climate,
            Resolution::Skipped(_) => return Ok(CellOutcome::Rejected),
        };

        let mut plant_inputs = match self.litter.resolve(coordinate, context)? {
            Resolution::Resolved(inputs) => inputs,
            Resolution::Skipped(_) => return Ok(CellOutcome::Rejected),
        };
        plant_inputs.series = plant_inputs.series.align(context.simulation_years);

        let Some(record) = SimulationCellRecord::merge(coordinate, soil, plant_inputs, &climate)
        else {
            warn!(id = %coordinate.id, "No climate grid cell with data for coordinate");
            return Ok(CellOutcome::Skipped);
        };

        self.writer.write(limited_data, &record)?;
        Ok(CellOutcome::Completed)
    }
}
