/// Convenience result type used across volcache.
pub type Result<T> = std::result::Result<T, Error>;

/// Environmental failures.
///
/// Unsupported input is not an error: strategies signal it with `None`.
/// Misuse of the API panics.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The operating system refused to spawn a computation thread.
    #[error("failed to spawn computation thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// A voxel buffer does not match the volume's dimensions.
    #[error("voxel buffer holds {actual} values, but dimensions {dimensions:?} need {expected}")]
    Dimensions { dimensions: [usize; 3], expected: usize, actual: usize },

    /// The voxel count of the dimensions does not fit into `usize`.
    #[error("volume dimensions {0:?} are too large")]
    Overflow([usize; 3]),
}
