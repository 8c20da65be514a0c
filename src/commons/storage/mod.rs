//! Persistent storage of calculation records.

pub use self::codec::{
    Codec, CodecError, Document, Encoded, Fresh, JsonCodec, Shape,
};
pub use self::store::{BackendError, RecordStore, StoreNewError};
pub use self::types::{
    Collection, CollectionBuf, MAX_NAME_LEN, ParseNameError, RecordId,
    RecordName, RecordNameBuf,
};

mod backends;
mod codec;
mod finite;
mod store;
mod types;

mod test;
