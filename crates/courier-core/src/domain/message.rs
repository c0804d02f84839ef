//! Message kinds and the envelope that carries payloads through the core.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::errors::HandlerError;

/// Static type tag for a message category.
///
/// A kind is assignable to itself and to every capability type listed in
/// `ancestors`. The list is flat: a kind declares all of its supertypes,
/// not just the direct parent.
///
/// # Example
/// ```ignore
/// const COMMAND: MessageKind = MessageKind::new("bank.command");
/// const DEPOSIT: MessageKind = MessageKind::with_ancestors("bank.deposit", &["bank.command"]);
///
/// assert!(DEPOSIT.is_assignable_to(COMMAND.name()));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageKind {
    name: &'static str,
    ancestors: &'static [&'static str],
}

impl MessageKind {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            ancestors: &[],
        }
    }

    /// `ancestors` must name every supertype. Lookups never follow the
    /// ancestors of an ancestor, so a kind that lists only its direct parent
    /// will not reach handlers bound to the grandparent.
    pub const fn with_ancestors(name: &'static str, ancestors: &'static [&'static str]) -> Self {
        Self { name, ancestors }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn ancestors(&self) -> &'static [&'static str] {
        self.ancestors
    }

    /// True if a handler bound to `capability` can process this kind.
    pub fn is_assignable_to(&self, capability: &str) -> bool {
        self.name == capability || self.ancestors.contains(&capability)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A payload type with a fixed kind.
///
/// # Trait Bounds
/// - `Serialize`/`DeserializeOwned`: payloads travel as JSON inside
///   [`MessageEnvelope`], so a handler bound to an ancestor kind can decode
///   a subtype's payload into the ancestor's shape
/// - `Send + Sync + 'static`: handlers run on tokio worker tasks
pub trait Message: Serialize + DeserializeOwned + Send + Sync + 'static {
    const KIND: MessageKind;
}

/// A message as it sits in a queue: its kind plus the JSON payload.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageEnvelope {
    kind: MessageKind,
    payload: serde_json::Value,
}

impl MessageEnvelope {
    pub fn new<M: Message>(message: &M) -> Result<Self, HandlerError> {
        let payload = serde_json::to_value(message).map_err(|source| HandlerError::Encode {
            kind: M::KIND.name(),
            source,
        })?;
        Ok(Self {
            kind: M::KIND,
            payload,
        })
    }

    pub fn from_parts(kind: MessageKind, payload: serde_json::Value) -> Self {
        Self { kind, payload }
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    /// Decode the payload into `T`. Unknown fields are ignored, which is what
    /// lets an ancestor-shaped handler read a subtype's payload.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, HandlerError> {
        T::deserialize(&self.payload).map_err(|source| HandlerError::Decode {
            kind: self.kind.name(),
            target: std::any::type_name::<T>(),
            source,
        })
    }
}

impl fmt::Display for MessageEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Command {
        command_id: String,
    }

    impl Message for Command {
        const KIND: MessageKind = MessageKind::new("test.command");
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Deposit {
        #[serde(flatten)]
        command: Command,
        amount: i64,
    }

    impl Message for Deposit {
        const KIND: MessageKind = MessageKind::with_ancestors("test.deposit", &["test.command"]);
    }

    #[test]
    fn kind_is_assignable_to_itself_and_ancestors() {
        assert!(Deposit::KIND.is_assignable_to("test.deposit"));
        assert!(Deposit::KIND.is_assignable_to("test.command"));
        assert!(!Command::KIND.is_assignable_to("test.deposit"));
        assert!(!Deposit::KIND.is_assignable_to("test.withdraw"));
    }

    #[test]
    fn ancestors_are_not_followed_transitively() {
        const LARGE_DEPOSIT: MessageKind =
            MessageKind::with_ancestors("test.large_deposit", &["test.deposit"]);
        const LARGE_DEPOSIT_FULL: MessageKind =
            MessageKind::with_ancestors("test.large_deposit", &["test.deposit", "test.command"]);

        assert!(LARGE_DEPOSIT.is_assignable_to("test.deposit"));
        assert!(!LARGE_DEPOSIT.is_assignable_to("test.command"));
        assert!(LARGE_DEPOSIT_FULL.is_assignable_to("test.command"));
    }

    #[test]
    fn subtype_payload_decodes_as_ancestor() {
        let deposit = Deposit {
            command: Command {
                command_id: "c-1".to_string(),
            },
            amount: 40,
        };
        let envelope = MessageEnvelope::new(&deposit).unwrap();

        assert_eq!(envelope.kind(), Deposit::KIND);
        let as_command: Command = envelope.decode().unwrap();
        assert_eq!(as_command.command_id, "c-1");
    }

    #[test]
    fn decode_error_reports_kind() {
        let envelope = MessageEnvelope::from_parts(Deposit::KIND, serde_json::json!({ "amount": 1 }));
        let err = envelope.decode::<Deposit>().unwrap_err();
        assert!(matches!(err, HandlerError::Decode { kind: "test.deposit", .. }));
    }

    #[test]
    fn display_shows_kind_and_payload() {
        let envelope = MessageEnvelope::from_parts(Command::KIND, serde_json::json!({ "command_id": "x" }));
        assert_eq!(envelope.to_string(), r#"test.command {"command_id":"x"}"#);
    }
}
