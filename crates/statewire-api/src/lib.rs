// statewire-api: event channel, handler registries and live bus proxies
// for the management service.

pub mod bus;
pub mod error;
pub mod message;
pub mod registry;
pub mod transport;

pub use error::Error;
pub use registry::{HandlerRegistry, Subscription};
pub use transport::Transport;
