// Offline Queue Infrastructure - System Adapters
// Implements: SnapshotStore (files), Submitter (HTTP), NetworkMonitor (TCP probe)

pub mod file_snapshot_store;
pub mod http_submitter;
pub mod tcp_probe_monitor;

pub use file_snapshot_store::FileSnapshotStore;
pub use http_submitter::HttpSubmitter;
pub use tcp_probe_monitor::TcpProbeMonitor;
