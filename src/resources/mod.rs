//! Idempotent resource primitives (check + apply + remove pattern).
pub mod file;
pub mod helpers;
pub mod stanza;

/// Minimal interface for resources that can be described, applied, and removed.
pub trait Applicable {
    /// Error produced by apply and remove.
    type Error;

    /// Human-readable description of this resource.
    fn description(&self) -> String;

    /// Bring the resource to its desired state.
    ///
    /// This method should:
    /// - Create parent directories if needed
    /// - Leave the resource untouched when it is already correct
    /// - Return the appropriate `ResourceChange` result
    ///
    /// # Errors
    ///
    /// Returns an error if the resource cannot be applied due to I/O failures,
    /// permission issues, or content that cannot be edited safely.
    fn apply(&self) -> Result<ResourceChange, Self::Error>;

    /// Remove the resource, undoing a previous `apply()`.
    ///
    /// Removing a resource that is already absent is not an error and
    /// returns [`ResourceChange::AlreadyCorrect`].
    ///
    /// # Errors
    ///
    /// Returns an error if the resource exists but cannot be removed.
    fn remove(&self) -> Result<ResourceChange, Self::Error>;
}

/// State of a resource (file, config stanza).
///
/// # Examples
///
/// ```
/// use skill_deploy::resources::ResourceState;
///
/// let missing = ResourceState::Missing;
/// let correct = ResourceState::Correct;
/// let wrong = ResourceState::Incorrect { current: "sha256:ab12".into() };
/// let skip = ResourceState::Invalid { reason: "destination is a directory".into() };
///
/// assert_ne!(missing, correct);
/// assert_eq!(correct, ResourceState::Correct);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceState {
    /// Resource does not exist.
    Missing,
    /// Resource exists and matches the desired state.
    Correct,
    /// Resource exists but does not match the desired state.
    Incorrect {
        /// Short description of the current value.
        current: String,
    },
    /// Resource cannot be applied (e.g. a directory sits where a file should go).
    Invalid {
        /// Reason why the resource cannot be applied.
        reason: String,
    },
}

/// Result of applying or removing a resource.
///
/// # Examples
///
/// ```
/// use skill_deploy::resources::ResourceChange;
///
/// let applied = ResourceChange::Applied;
/// let noop = ResourceChange::AlreadyCorrect;
///
/// assert_eq!(applied, ResourceChange::Applied);
/// assert_ne!(applied, noop);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceChange {
    /// Resource was created, updated, or removed.
    Applied,
    /// Resource was already in the requested state (no change needed).
    AlreadyCorrect,
}

/// Resources that can determine their own state.
pub trait Resource: Applicable {
    /// Check the current state of the resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be determined.
    fn current_state(&self) -> Result<ResourceState, Self::Error>;

    /// Determine if the resource needs to be changed.
    ///
    /// # Errors
    ///
    /// Propagates errors from `current_state()`.
    fn needs_change(&self) -> Result<bool, Self::Error> {
        Ok(matches!(
            self.current_state()?,
            ResourceState::Missing | ResourceState::Incorrect { .. }
        ))
    }
}
