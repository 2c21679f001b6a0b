//! Nested transactions over one store handle
//!
//! A store owns a [`TransactionDepth`] and implements the three physical
//! primitives of [`Transactional`]; nesting, the doom flag and outcome
//! reporting are provided on top of them. Only the outermost level touches
//! the engine. A rollback at any level dooms the whole transaction: the
//! outermost unwind then rolls back physically even if it was asked to
//! commit, and reports [`TxOutcome::RolledBack`] instead of failing.

use std::time::Instant;

use crate::errors::{DeckError, Result};
use crate::{log_op_end, log_op_error, log_op_start};

/// Per-store nesting counter and doom flag
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionDepth {
    level: u32,
    doomed: bool,
}

impl TransactionDepth {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current nesting level; 0 means no transaction is open
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Whether a rollback was requested somewhere inside the open transaction
    pub fn is_doomed(&self) -> bool {
        self.doomed
    }

    fn enter(&mut self) {
        if self.level == 0 {
            self.doomed = false;
        }
        self.level += 1;
    }

    fn leave(&mut self) -> u32 {
        self.level -= 1;
        self.level
    }
}

/// What a commit or rollback call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxOutcome {
    /// An enclosing level is still open; nothing reached the engine
    Pending,
    /// The outermost level committed physically
    Committed,
    /// The outermost level rolled back physically
    RolledBack,
}

impl TxOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxOutcome::Pending => "pending",
            TxOutcome::Committed => "committed",
            TxOutcome::RolledBack => "rolled_back",
        }
    }
}

/// A store handle with nestable transactions
///
/// Implementors supply the depth they own and the physical
/// begin/commit/rollback; callers use the provided methods.
pub trait Transactional {
    fn depth(&self) -> &TransactionDepth;
    fn depth_mut(&mut self) -> &mut TransactionDepth;

    fn begin_physical(&mut self) -> Result<()>;
    fn commit_physical(&mut self) -> Result<()>;
    fn rollback_physical(&mut self) -> Result<()>;

    /// Open a (possibly nested) transaction
    fn begin(&mut self) -> Result<()> {
        if self.depth().level() == 0 {
            self.begin_physical()?;
        }
        self.depth_mut().enter();
        tracing::debug!(tx_level = self.depth().level(), "transaction begin");
        Ok(())
    }

    /// Close one level
    ///
    /// # Errors
    ///
    /// - `Misuse` if no transaction is open
    /// - the engine's error if the physical commit fails; the transaction is
    ///   rolled back before returning
    fn commit(&mut self) -> Result<TxOutcome> {
        if self.depth().level() == 0 {
            return Err(DeckError::NoActiveTransaction {
                op: "commit".to_string(),
            }
            .into());
        }
        if self.depth_mut().leave() > 0 {
            return Ok(TxOutcome::Pending);
        }
        if self.depth().is_doomed() {
            self.rollback_physical()?;
            tracing::debug!(tx_outcome = TxOutcome::RolledBack.as_str(), "transaction end");
            return Ok(TxOutcome::RolledBack);
        }
        if let Err(err) = self.commit_physical() {
            if let Err(rb) = self.rollback_physical() {
                tracing::warn!(err_code = rb.code(), "rollback after failed commit also failed");
            }
            return Err(err);
        }
        tracing::debug!(tx_outcome = TxOutcome::Committed.as_str(), "transaction end");
        Ok(TxOutcome::Committed)
    }

    /// Doom the open transaction and close one level
    ///
    /// # Errors
    ///
    /// - `Misuse` if no transaction is open
    /// - the engine's error if the physical rollback fails
    fn rollback(&mut self) -> Result<TxOutcome> {
        if self.depth().level() == 0 {
            return Err(DeckError::NoActiveTransaction {
                op: "rollback".to_string(),
            }
            .into());
        }
        self.depth_mut().doomed = true;
        if self.depth_mut().leave() > 0 {
            return Ok(TxOutcome::Pending);
        }
        self.rollback_physical()?;
        tracing::debug!(tx_outcome = TxOutcome::RolledBack.as_str(), "transaction end");
        Ok(TxOutcome::RolledBack)
    }

    /// Nesting depth; 0 means no transaction
    fn current_level(&self) -> u32 {
        self.depth().level()
    }

    /// Gate for mutating calls
    ///
    /// # Errors
    ///
    /// Returns `Misuse` naming `op` when no transaction is open.
    fn require_transaction(&self, op: &str) -> Result<()> {
        if self.depth().level() == 0 {
            Err(DeckError::NoActiveTransaction { op: op.to_string() }.into())
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GuardState {
    Active,
    Committed,
    RolledBack,
}

/// Scoped transaction level
///
/// Begins on construction and rolls back on drop unless committed, which
/// includes unwinding from a panic. The guard dereferences to the store so
/// work can be done through it.
pub struct TransactionGuard<'a, S: Transactional + ?Sized> {
    store: &'a mut S,
    state: GuardState,
}

impl<'a, S: Transactional + ?Sized> TransactionGuard<'a, S> {
    pub fn begin(store: &'a mut S) -> Result<Self> {
        store.begin()?;
        Ok(Self {
            store,
            state: GuardState::Active,
        })
    }

    /// Commit this level
    ///
    /// # Errors
    ///
    /// `Misuse` if the guard already committed or rolled back; otherwise as
    /// [`Transactional::commit`].
    pub fn commit(&mut self) -> Result<TxOutcome> {
        self.finish(GuardState::Committed)?;
        self.store.commit()
    }

    /// Roll back this level, dooming the whole transaction
    pub fn rollback(&mut self) -> Result<TxOutcome> {
        self.finish(GuardState::RolledBack)?;
        self.store.rollback()
    }

    pub fn is_active(&self) -> bool {
        self.state == GuardState::Active
    }

    fn finish(&mut self, next: GuardState) -> Result<()> {
        if self.state != GuardState::Active {
            return Err(DeckError::GuardFinished.into());
        }
        self.state = next;
        Ok(())
    }
}

impl<S: Transactional + ?Sized> std::ops::Deref for TransactionGuard<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.store
    }
}

impl<S: Transactional + ?Sized> std::ops::DerefMut for TransactionGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.store
    }
}

impl<S: Transactional + ?Sized> Drop for TransactionGuard<'_, S> {
    fn drop(&mut self) {
        if self.state != GuardState::Active {
            return;
        }
        self.state = GuardState::RolledBack;
        if let Err(err) = self.store.rollback() {
            tracing::warn!(
                err_code = err.code(),
                error = %err,
                "rollback on guard drop failed"
            );
        }
    }
}

/// Run `f` inside a transaction level: commit when it returns `Ok`, roll
/// back when it returns `Err` or panics
///
/// A doomed transaction is not an error here: `f`'s value is returned even
/// if the outermost commit turned into a rollback.
pub fn with_transaction<S, T, F>(store: &mut S, f: F) -> Result<T>
where
    S: Transactional + ?Sized,
    F: FnOnce(&mut S) -> Result<T>,
{
    let start = Instant::now();
    log_op_start!("with_transaction", tx_level = store.current_level());

    let mut guard = match TransactionGuard::begin(store) {
        Ok(guard) => guard,
        Err(err) => {
            log_op_error!(
                "with_transaction",
                err.clone(),
                duration_ms = start.elapsed().as_millis() as u64
            );
            return Err(err);
        }
    };

    let value = match f(&mut *guard) {
        Ok(value) => value,
        Err(err) => {
            drop(guard);
            log_op_error!(
                "with_transaction",
                err.clone(),
                duration_ms = start.elapsed().as_millis() as u64
            );
            return Err(err);
        }
    };

    match guard.commit() {
        Ok(outcome) => {
            if outcome == TxOutcome::RolledBack {
                tracing::warn!("transaction was doomed by an inner rollback; changes discarded");
            }
            log_op_end!(
                "with_transaction",
                duration_ms = start.elapsed().as_millis() as u64,
                tx_outcome = outcome.as_str()
            );
            Ok(value)
        }
        Err(err) => {
            log_op_error!(
                "with_transaction",
                err.clone(),
                duration_ms = start.elapsed().as_millis() as u64
            );
            Err(err)
        }
    }
}
