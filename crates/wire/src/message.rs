use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

/// Wire envelope for every request and reply.
///
/// The payload is MessagePack. `correlation_id` pairs a reply with the
/// request that caused it, so many calls can share one DEALER socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Protocol topic, e.g. `fanout.space.request`.
    pub topic: String,

    /// MessagePack-encoded payload bytes.
    #[serde(with = "serde_bytes")]
    pub payload: Vec<u8>,

    pub timestamp: DateTime<Utc>,

    pub correlation_id: Uuid,

    /// Protocol version; peers reject payloads they do not understand.
    #[serde(default = "default_version")]
    pub version: u16,
}

pub const PROTOCOL_VERSION: u16 = 1;

fn default_version() -> u16 {
    PROTOCOL_VERSION
}

impl Message {
    /// Create a new message with a fresh correlation id.
    pub fn new<T: Serialize>(
        topic: impl Into<String>,
        payload: &T,
    ) -> Result<Self, rmp_serde::encode::Error> {
        Self::with_correlation(topic, payload, Uuid::new_v4())
    }

    /// Create a message with an explicit correlation ID.
    pub fn with_correlation<T: Serialize>(
        topic: impl Into<String>,
        payload: &T,
        correlation_id: Uuid,
    ) -> Result<Self, rmp_serde::encode::Error> {
        Ok(Self {
            topic: topic.into(),
            payload: rmp_serde::to_vec(payload)?,
            timestamp: Utc::now(),
            correlation_id,
            version: PROTOCOL_VERSION,
        })
    }

    /// Build the reply to this message under `topic`.
    pub fn reply<T: Serialize>(
        &self,
        topic: impl Into<String>,
        payload: &T,
    ) -> Result<Self, rmp_serde::encode::Error> {
        Self::with_correlation(topic, payload, self.correlation_id)
    }

    /// Deserialize the payload into the expected type.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, rmp_serde::decode::Error> {
        rmp_serde::from_slice(&self.payload)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, rmp_serde::encode::Error> {
        rmp_serde::to_vec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, rmp_serde::decode::Error> {
        rmp_serde::from_slice(bytes)
    }
}

/// `Vec<u8>` as a MessagePack bin rather than an array of integers.
mod serde_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_bytes(bytes)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let bytes: &[u8] = Deserialize::deserialize(d)?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use fanout_core::{Fibonacci, Task, Workload};

    use super::*;

    #[test]
    fn envelope_carries_a_task() {
        let task = Task::new(Workload::Fibonacci(Fibonacci::new(9)));
        let msg = Message::new("fanout.space.request", &task).unwrap();
        let decoded = Message::from_bytes(&msg.to_bytes().unwrap()).unwrap();

        assert_eq!(decoded.topic, "fanout.space.request");
        assert_eq!(decoded.version, PROTOCOL_VERSION);
        assert_eq!(decoded.decode::<Task>().unwrap(), task);
    }

    #[test]
    fn reply_keeps_correlation() {
        let request = Message::new("fanout.computer.request", &1u8).unwrap();
        let reply = request.reply("fanout.computer.reply", &true).unwrap();
        assert_eq!(reply.correlation_id, request.correlation_id);
        assert_ne!(reply.topic, request.topic);
    }
}
