//! Cross-context communication primitives.
//!
//! The two cores share no hardware lock. Everything they exchange goes
//! through the types in this module, which need only atomic loads/stores
//! and a memory fence.
//!
//! ## Components
//!
//! | Type | Semantics | Used for |
//! |------|-----------|----------|
//! | [`Mailbox`] | one pending value, spinning write, polling read | configuration, commands, acks |
//! | [`PublishedSlot`] | latest value, no flow control | ring positions, results |
//! | [`BinarySemaphore`] | one permit, cooperative wait | local wake-up of analysis readers |
//! | [`SharedRegion`] | fixed `#[repr(C)]` block of all of the above | the inter-core RAM window |

pub mod mailbox;
pub mod region;
pub mod semaphore;
pub mod slot;

pub use mailbox::Mailbox;
pub use region::{AnalysisCommand, CommandType, GeneratorParameters, OperationMode, SharedRegion};
pub use semaphore::BinarySemaphore;
pub use slot::{PublishedSlot, SlotValue};
