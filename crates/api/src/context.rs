use stockyard_core::UserId;
use stockyard_infra::services::Actor;

/// Acting-user context for a request.
///
/// Attached by the actor middleware; present on every mutating route.
#[derive(Debug, Clone)]
pub struct ActorContext {
    actor: Actor,
}

impl ActorContext {
    pub fn new(actor: Actor) -> Self {
        Self { actor }
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn user_id(&self) -> UserId {
        self.actor.user_id
    }
}
