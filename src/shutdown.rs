use tokio::sync::{broadcast, watch};

pub type ShutdownSender = broadcast::Sender<()>;
pub type ShutdownReceiver = broadcast::Receiver<()>;

/// Raised once the cancel grace period is over; in-flight requests give up.
pub type AbandonSender = watch::Sender<bool>;
pub type AbandonReceiver = watch::Receiver<bool>;
