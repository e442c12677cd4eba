use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("No simulated users available, the generator cannot start")]
    EmptyUserPool,
    #[error("Comment pool is empty, the generator cannot start")]
    EmptyCommentPool,
    #[error("Session already started")]
    AlreadyStarted,
    #[error("Session has been stopped")]
    Stopped,
}
