use std::collections::BTreeMap;

use log::debug;

use crate::auth::User;
use crate::error::StoreResult;
use crate::local::mutation_queue::{MemoryMutationQueue, MutationQueue};
use crate::local::remote_document_cache::{MemoryRemoteDocumentCache, RemoteDocumentCache};
use crate::local::target_cache::{MemoryTargetCache, TargetCache};

/// Exclusive handle on the three storage components for the duration of one
/// store operation. Holding the handle is holding the transaction: the
/// borrows are exclusive, so operations cannot interleave and transactions
/// cannot nest.
pub struct Transaction<'a> {
    pub remote_documents: &'a mut dyn RemoteDocumentCache,
    pub mutation_queue: &'a mut dyn MutationQueue,
    pub targets: &'a mut dyn TargetCache,
}

/// Storage back-end supplying the component caches and transaction scoping.
/// The mutation queue handed out by [`transaction`](Persistence::transaction)
/// is always the current user's.
pub trait Persistence {
    fn start(&mut self) -> StoreResult<()>;

    fn shutdown(&mut self);

    /// Rebinds the mutation queue to `user`'s persisted queue. Other
    /// components are unaffected.
    fn set_user(&mut self, user: User) -> StoreResult<()>;

    fn current_user(&self) -> &User;

    fn transaction(&mut self, label: &str) -> Transaction<'_>;
}

/// Fully in-memory back-end. Component writes apply directly; since they
/// cannot fail mid-operation there is nothing to roll back, which is what
/// makes each operation trivially atomic.
pub struct MemoryPersistence {
    remote_documents: MemoryRemoteDocumentCache,
    targets: MemoryTargetCache,
    queues: BTreeMap<User, MemoryMutationQueue>,
    current_user: User,
    started: bool,
}

impl MemoryPersistence {
    pub fn new(user: User) -> Self {
        Self {
            remote_documents: MemoryRemoteDocumentCache::new(),
            targets: MemoryTargetCache::new(),
            queues: BTreeMap::new(),
            current_user: user,
            started: false,
        }
    }
}

impl Persistence for MemoryPersistence {
    fn start(&mut self) -> StoreResult<()> {
        self.started = true;
        Ok(())
    }

    fn shutdown(&mut self) {
        self.started = false;
    }

    fn set_user(&mut self, user: User) -> StoreResult<()> {
        debug!("Switching mutation queue to user {user}");
        self.current_user = user;
        Ok(())
    }

    fn current_user(&self) -> &User {
        &self.current_user
    }

    fn transaction(&mut self, label: &str) -> Transaction<'_> {
        debug!("Begin transaction: {label}");
        let queue = self
            .queues
            .entry(self.current_user.clone())
            .or_insert_with(MemoryMutationQueue::new);
        Transaction {
            remote_documents: &mut self.remote_documents,
            mutation_queue: queue,
            targets: &mut self.targets,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queues_are_scoped_per_user() {
        let mut persistence = MemoryPersistence::new(User::unauthenticated());
        persistence.start().unwrap();
        {
            let txn = persistence.transaction("seed");
            txn.mutation_queue
                .set_last_stream_token(vec![1])
                .unwrap();
        }

        persistence.set_user(User::new("alice")).unwrap();
        {
            let txn = persistence.transaction("check alice");
            assert!(txn.mutation_queue.last_stream_token().unwrap().is_empty());
        }

        persistence.set_user(User::unauthenticated()).unwrap();
        let txn = persistence.transaction("check original");
        assert_eq!(txn.mutation_queue.last_stream_token().unwrap(), vec![1]);
    }
}
