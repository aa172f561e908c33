/// Outcome of one call to one node.
///
/// Moves from `Pending` to either `Succeeded` or `Failed` exactly once. The
/// node worker never touches this value directly: its outcome is published
/// over a channel and applied by the checker, so readers only ever observe
/// a completed transition.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ResponseState<T> {
    #[default]
    Pending,
    Succeeded(T),
    Failed(TimelockError),
}

impl<T> ResponseState<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    pub fn is_successful(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Returns the successful value.
    ///
    /// Fails with `IllegalState` if the call is still pending or has failed.
    pub fn get(&self) -> Result<&T> {
        match self {
            Self::Succeeded(value) => Ok(value),
            Self::Pending => Err(TimelockError::IllegalState(
                "response is still pending".to_string(),
            )),
            Self::Failed(err) => Err(TimelockError::IllegalState(format!(
                "response failed: {}",
                err
            ))),
        }
    }

    pub fn error(&self) -> Option<&TimelockError> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Applies the terminal outcome. A completed state never changes again.
    pub(crate) fn complete(&mut self, outcome: Result<T>) -> Result<()> {
        if !self.is_pending() {
            return Err(TimelockError::IllegalState(
                "response already completed".to_string(),
            ));
        }
        *self = match outcome {
            Ok(value) => Self::Succeeded(value),
            Err(err) => Self::Failed(err),
        };
        Ok(())
    }
}
