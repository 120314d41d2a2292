/// Settings for the threads that compute derived data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskConfig {
    /// Prefix of the thread names. The result type key is appended.
    pub thread_name: String,
    /// Stack size of the threads. `None` uses the platform default.
    pub stack_size: Option<usize>,
}

impl TaskConfig {
    /// Override the thread name prefix.
    pub fn thread_name(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name = prefix.into();
        self
    }

    /// Override the stack size.
    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self { thread_name: "volcache".into(), stack_size: None }
    }
}
