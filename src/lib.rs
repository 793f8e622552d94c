pub mod bytes;
pub mod record;
pub mod container;
pub mod pixels;
pub mod encoder;
pub mod decoder;
pub mod walk;
pub mod notify;
pub mod batch;
pub mod error;

pub use record::FileRecord;
pub use container::{ContainerReader, ContainerWriter, RecordRef};
pub use pixels::{Layout, PixelGrid};
pub use encoder::{EncodeOptions, EncodeReport};
pub use decoder::{CollisionPolicy, DecodeOptions, DecodeReport};
pub use notify::Notifier;
pub use error::{Error, ErrorKind, FormatError, ItemFailure};
