pub mod operation;
pub mod position;
pub mod units;

pub use operation::{Field, Operation, OperationKind, OperationPhase, OperationStatus};
pub use position::{CollateralPosition, CollateralToken, HealthFactor, PositionSnapshot};
pub use units::{TokenAmount, Wad};
