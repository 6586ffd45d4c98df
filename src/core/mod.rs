/// Balance engine - net position per contributor
pub mod balance;
/// Contributor operations
pub mod contributor;
/// Item storage and sheet snapshots
pub mod item;
/// Rounding and tolerance helpers
pub mod numeric;
/// Weight reconciler for the item entry form
pub mod reconciler;
/// Consumer-weight repair pass
pub mod repair;
/// Balance reports
pub mod report;
/// Sheet operations
pub mod sheet;
