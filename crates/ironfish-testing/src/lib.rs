mod fixtures;
mod network;
mod provider;

pub use fixtures::TestFixture;
pub use network::QueuePeerNetwork;
pub use provider::TestCryptoProvider;
