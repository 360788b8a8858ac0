/// Controls how a message is written to the wire.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct MarshalOptions {
    /// Emit map entries in ascending key order so that equal messages
    /// always produce identical bytes.
    pub deterministic: bool,
}

/// Controls how a message is read from the wire.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct UnmarshalOptions {
    /// Skip fields that are not part of the schema instead of keeping
    /// their bytes on the message.
    pub discard_unknown: bool,
}

// === impl MarshalOptions ===

impl MarshalOptions {
    pub const fn deterministic() -> Self {
        Self {
            deterministic: true,
        }
    }
}

// === impl UnmarshalOptions ===

impl UnmarshalOptions {
    pub const fn discard_unknown() -> Self {
        Self {
            discard_unknown: true,
        }
    }
}
