pub mod asset;
pub mod condition;
pub mod event;
pub mod question;

pub use asset::{Asset, Outcome};
pub use condition::Condition;
pub use event::{DecodedEvent, EventKey};
pub use question::{MarketType, Question, QuestionState};
