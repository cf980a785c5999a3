pub mod challenge;
pub mod domain;
pub mod error;
pub mod memory;
pub mod ports;
pub mod question_bank;
pub mod round;
pub mod solo;
pub mod sync;

pub use challenge::{ChallengeManager, ChallengeRun};
pub use domain::{
    Challenge, ChallengeOutcome, ChallengeStatus, DifficultyTier, PlayerScore, PlayerSide,
    Question, RoundOutcome, RoundPhase, RoundState, SoloProgress,
};
pub use error::{EngineError, EngineResult};
pub use memory::InMemoryStore;
pub use ports::{
    ChallengeStore, ChallengeStream, ChallengeUpdate, FriendsService, PortError, PortResult,
    ProgressStore, UpdateResult,
};
pub use question_bank::{CatalogError, QuestionBank};
pub use round::Round;
pub use solo::{SoloAnswer, SoloSession, SoloTracker};
pub use sync::{ChallengeSync, Subscription};
