pub mod gather;
pub mod ledger;
pub mod replay;
pub mod rpc;

pub use gather::{gather_snapshot, LedgerSnapshotSource};
pub use ledger::LedgerReader;
pub use replay::{replay_file_name, write_replay, ReplaySource};
pub use rpc::RpcLedger;
