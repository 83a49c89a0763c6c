use super::error::SerializationError;
use std::fmt;
use std::str::FromStr;

/// Rule for naming the registry subject of a key or value schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubjectNameStrategy {
    /// `{topic}-key` / `{topic}-value`
    #[default]
    TopicName,
    /// `{topic}-{namespace.name}`
    TopicRecordName,
    /// `{namespace.name}`
    RecordName,
}

impl SubjectNameStrategy {
    /// Resolve the subject for a payload. `record_name` is the schema's
    /// fully-qualified record name; only the record strategies need it.
    pub fn subject(
        &self,
        topic: &str,
        record_name: Option<&str>,
        is_key: bool,
    ) -> Result<String, SerializationError> {
        match self {
            SubjectNameStrategy::TopicName => {
                let suffix = if is_key { "key" } else { "value" };
                Ok(format!("{}-{}", topic, suffix))
            }
            SubjectNameStrategy::TopicRecordName => {
                Ok(format!("{}-{}", topic, required(record_name, topic)?))
            }
            SubjectNameStrategy::RecordName => Ok(required(record_name, topic)?.to_string()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectNameStrategy::TopicName => "TOPIC_NAME",
            SubjectNameStrategy::TopicRecordName => "TOPIC_RECORD_NAME",
            SubjectNameStrategy::RecordName => "RECORD_NAME",
        }
    }
}

fn required<'a>(record_name: Option<&'a str>, topic: &str) -> Result<&'a str, SerializationError> {
    record_name.ok_or_else(|| {
        SerializationError::MissingRecordName(format!("payload for topic '{}'", topic))
    })
}

impl fmt::Display for SubjectNameStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubjectNameStrategy {
    type Err = SerializationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('-', "_").as_str() {
            "TOPIC_NAME" | "TOPIC_NAME_STRATEGY" => Ok(SubjectNameStrategy::TopicName),
            "TOPIC_RECORD_NAME" | "TOPIC_RECORD_NAME_STRATEGY" => {
                Ok(SubjectNameStrategy::TopicRecordName)
            }
            "RECORD_NAME" | "RECORD_NAME_STRATEGY" => Ok(SubjectNameStrategy::RecordName),
            _ => Err(SerializationError::UnknownSubjectStrategy(s.to_string())),
        }
    }
}
