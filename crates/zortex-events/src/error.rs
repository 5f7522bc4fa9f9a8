use thiserror::Error;

/// Error returned by an event handler. The bus logs these and continues
/// dispatching to the remaining subscribers (spec §4.5 / §7): a misbehaving
/// handler cannot wedge the bus.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct EventError(pub String);

impl EventError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
