use crate::context::LimitedDataContext;
use crate::errors::EcosseResult;
use crate::record::SimulationCellRecord;

/// Destination for assembled simulation inputs.
///
/// Implementations may be called from several worker threads at once; each record
/// goes to its own location keyed by the coordinate identifier.
pub trait CellWriter: Send + Sync {
    /// Called once per batch before any record is written.
    fn prepare(&self, context: &LimitedDataContext) -> EcosseResult<()>;

    fn write(&self, context: &LimitedDataContext, record: &SimulationCellRecord)
        -> EcosseResult<()>;
}
