pub mod config;
pub mod config_loader;
pub mod config_watcher;
pub mod decision;
pub mod decision_formatter;
pub mod engine;
pub mod error;
pub mod exposure;
pub mod gate;
pub mod snapshot;
pub mod traits;
pub mod valuation;
pub mod weights;

pub use config::{AppConfig, ChainConfig, ContractAddresses, HedgeConfig, WeightRange, WeightRanges};
pub use config_loader::ConfigLoader;
pub use config_watcher::ConfigWatcher;
pub use decision::{check_current_shorts, needs_rebalance, HedgeLeg};
pub use decision_formatter::DecisionFormatter;
pub use engine::{evaluate, evaluate_at, DecisionRecord};
pub use error::{Bound, Check, ConfigError, FailureKind, SanityFailure};
pub use exposure::{compose_exposure, BasketVariant, Bucket, ExposureTable, ExposureWeights, FoldRule};
pub use gate::{run_sanity_gate, GateInput};
pub use snapshot::{AssetClass, Constituent, CurrentShorts, HedgeAsset, InputSnapshot};
pub use traits::SnapshotSource;
pub use valuation::{check_position_inputs, value_position, PositionValuation};
pub use weights::{compute_weights, AssetWeights};
