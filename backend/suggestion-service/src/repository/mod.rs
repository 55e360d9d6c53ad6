mod memory_repository;
mod postgres_repository;
mod r#trait;

pub use memory_repository::InMemoryStore;
pub use postgres_repository::PostgresSuggestionStore;
pub use r#trait::{
    InteractionStore, InterestProfileStore, RelationshipStore, Stores, UserProfileStore,
};

#[cfg(test)]
pub use r#trait::{
    MockInteractionStore, MockInterestProfileStore, MockRelationshipStore, MockUserProfileStore,
};
