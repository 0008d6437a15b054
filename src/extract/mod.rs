pub mod bills;
pub mod fields;
pub mod issuer;
pub mod noise;
pub mod normalize;

pub use bills::{detect_bill_due, BillReminder};
pub use fields::{AmountBounds, FieldExtractor};
pub use issuer::{IssuerMatch, IssuerParsers};
pub use noise::NoiseFilter;
pub use normalize::{normalized_text, message_timestamp, MessagePart, PartBody, RawMessage};
