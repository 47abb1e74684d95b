//! Binary wire format.
//!
//! Primitives are bincode (fixint, little endian): strings carry a `u64`
//! length, options a one-byte tag. Polymorphic records start with their
//! type name so the receiver can pick a decoder from the [`WireRegistry`].

pub mod codec;
pub mod registry;

pub use codec::{WireCodec, WireError, WireReader, WireWriter, put_list, take_list};
pub use registry::{FeatureDecoder, SkillDecoder, WireRegistry};
