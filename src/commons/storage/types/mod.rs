//! Types for addressing stored records.

pub use self::collection::{Collection, CollectionBuf};
pub use self::name::{MAX_NAME_LEN, ParseNameError, RecordName, RecordNameBuf};
pub use self::record::RecordId;

mod collection;
mod name;
mod record;
