use std::sync::Arc;

use super::{NewPlayer, Player};
use crate::persistence::{Persistence, PersistenceError, PlayerRepository};

/// Concurrent inserts of the same name can race the lookup; after this many
/// rounds something else is wrong.
const MAX_RESOLVE_ATTEMPTS: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    #[error("Display name must not be empty")]
    EmptyName,
    #[error("Display name already taken: {0}")]
    NameTaken(String),
    #[error("Could not resolve player '{0}'")]
    Unresolved(String),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Creates players and resolves display names to persisted identities.
pub struct PlayerFactory<D: Persistence> {
    store: Arc<D>,
}

impl<D: Persistence> Clone for PlayerFactory<D> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<D: Persistence> PlayerFactory<D> {
    pub fn new(store: Arc<D>) -> Self {
        Self { store }
    }

    pub async fn register_human(&self, name: &str) -> Result<Player, PlayerError> {
        self.register(NewPlayer::human(normalize(name)?)).await
    }

    pub async fn register_robot(&self, name: &str, engine: &str) -> Result<Player, PlayerError> {
        self.register(NewPlayer::robot(normalize(name)?, engine)).await
    }

    async fn register(&self, new: NewPlayer) -> Result<Player, PlayerError> {
        match self.store.players().save_player(&new).await {
            Ok(player) => {
                tracing::info!(player_id = %player.id, name = %player.display_name, kind = player.kind.as_str(), "Registered player");
                Ok(player)
            }
            Err(PersistenceError::Conflict(_)) => Err(PlayerError::NameTaken(new.display_name)),
            Err(e) => Err(e.into()),
        }
    }

    /// Return the player with this display name, creating an external player
    /// when none exists. Safe to call concurrently for the same name: the
    /// unique constraint on names decides the winner and the loser re-reads.
    pub async fn find_or_create_external(&self, name: &str) -> Result<Player, PlayerError> {
        let name = normalize(name)?;
        let players = self.store.players();

        for attempt in 1..=MAX_RESOLVE_ATTEMPTS {
            if let Some(existing) = players.find_by_display_name(name).await? {
                return Ok(existing);
            }
            if let Some(created) = players.insert_external_if_absent(name).await? {
                tracing::info!(player_id = %created.id, name = %created.display_name, "Created external player");
                return Ok(created);
            }
            tracing::debug!(name, attempt, "Lost insert race, re-reading player");
        }

        Err(PlayerError::Unresolved(name.to_string()))
    }
}

fn normalize(name: &str) -> Result<&str, PlayerError> {
    let name = name.trim();
    if name.is_empty() {
        Err(PlayerError::EmptyName)
    } else {
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::sqlite::{Database, SqlitePersistence};
    use crate::player::PlayerKind;

    async fn factory() -> PlayerFactory<SqlitePersistence> {
        let db = Database::new_in_memory().await.unwrap();
        PlayerFactory::new(Arc::new(SqlitePersistence::new(&db)))
    }

    #[tokio::test]
    async fn test_find_or_create_is_idempotent() {
        let factory = factory().await;
        let first = factory.find_or_create_external("Carlsen, Magnus").await.unwrap();
        let again = factory.find_or_create_external("  Carlsen, Magnus ").await.unwrap();
        assert_eq!(first, again);
        assert_eq!(first.kind, PlayerKind::External);
        assert_eq!(factory.store.players().count_players().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_external_lookup_reuses_members() {
        let factory = factory().await;
        let member = factory.register_human("Anna").await.unwrap();
        let resolved = factory.find_or_create_external("Anna").await.unwrap();
        assert_eq!(member, resolved);
        assert_eq!(resolved.kind, PlayerKind::Human);
    }

    #[tokio::test]
    async fn test_rejects_empty_and_duplicate_names() {
        let factory = factory().await;
        assert!(matches!(
            factory.find_or_create_external("   ").await,
            Err(PlayerError::EmptyName)
        ));
        factory.register_robot("Robo", "stockfish").await.unwrap();
        assert!(matches!(
            factory.register_human("Robo").await,
            Err(PlayerError::NameTaken(name)) if name == "Robo"
        ));
    }

    #[tokio::test]
    async fn test_concurrent_resolution_creates_one_player() {
        let factory = factory().await;
        let mut tasks = Vec::new();
        for _ in 0..8 {
            let f = factory.clone();
            tasks.push(tokio::spawn(async move {
                f.find_or_create_external("Tal, Mikhail").await
            }));
        }
        let mut ids = Vec::new();
        for task in tasks {
            ids.push(task.await.unwrap().unwrap().id);
        }
        ids.dedup();
        assert_eq!(ids.len(), 1);
        assert_eq!(factory.store.players().count_players().await.unwrap(), 1);
    }
}
