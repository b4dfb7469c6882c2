//! The signing identity consumed by the event hub.

use crate::error::SigningError;

/// An identity able to sign outbound messages.
///
/// Supplied by the caller's credential subsystem; fabrichub never touches
/// key material itself.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` so the hub can sign from any task.
pub trait SigningIdentity: Send + Sync {
    /// Sign `message`, returning the raw signature bytes.
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, SigningError>;

    /// The serialized identity (MSP id + certificate) placed in `creator` fields.
    fn serialize(&self) -> Vec<u8>;
}
