/// Configuration options for the JSON parser.
///
/// # Examples
///
/// ```rust
/// use eventson::{JsonParser, ParserOptions};
///
/// let parser = JsonParser::new(ParserOptions {
///     max_nesting_depth: 64,
///     ..Default::default()
/// });
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ParserOptions {
    /// Maximum container nesting depth.
    ///
    /// The nesting counter is clamped at this value; the first opening
    /// bracket that would exceed it reports a recoverable
    /// `MaxDepthExceeded` and parsing continues.
    ///
    /// # Default
    ///
    /// `usize::MAX`
    pub max_nesting_depth: usize,

    /// Initial capacity reserved for the parser state stack.
    ///
    /// # Default
    ///
    /// `100`
    pub initial_stack_capacity: usize,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            max_nesting_depth: usize::MAX,
            initial_stack_capacity: 100,
        }
    }
}
