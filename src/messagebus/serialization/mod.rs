pub mod avro_codec;
pub mod error;
pub mod subject_strategy;
pub mod wire_codec;

pub use avro_codec::AvroCodec;
pub use error::{SerializationError, SerializationResult};
pub use subject_strategy::SubjectNameStrategy;
pub use wire_codec::{
    HEADER_LEN, MAGIC_BYTE, SerializedRecord, WireCodec, decode_frame, encode_frame,
};
