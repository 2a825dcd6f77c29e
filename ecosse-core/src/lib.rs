//! Per-cell assembly of ECOSSE simulation inputs.
//!
//! For each requested coordinate the soil, plant litter and climate resolvers are
//! queried independently, their results are merged into a
//! [`record::SimulationCellRecord`] and handed to a [`writer::CellWriter`].
//! [`assembler::CellAssembler`] drives a whole batch and reports a
//! [`assembler::BatchResult`].
pub mod assembler;
pub mod cftime;
pub mod climate;
pub mod config;
pub mod context;
pub mod errors;
pub mod litter;
pub mod record;
pub mod resolution;
pub mod soil;
pub mod spatial;
pub mod timeseries;
pub mod writer;
