// ABOUTME: Trigger gateway: authenticated push notifications in, pipeline runs out.
// ABOUTME: Acknowledges immediately; outcomes are only logged and shown on /status.

mod dispatcher;
mod event;
mod server;
mod signature;

pub use dispatcher::{DispatchStatus, Deployer, Dispatcher, DispatcherStatus, RunSummary};
pub use event::{EventError, PushEvent};
pub use server::{GatewayState, gateway_router, serve};
pub use signature::{sign, verify_signature};
