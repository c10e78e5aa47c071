/*!
 Options that control how a stream is decoded.
*/

use crate::util::nrbf::layouts::LayoutRegistry;

/// The deepest record nesting allowed by default
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Represents the options a caller can set on an [`NrbfReader`](crate::util::nrbf::parser::NrbfReader)
#[derive(Debug, Clone)]
pub struct ReaderOptions {
    /// How many records may be nested inside one another before decoding fails
    pub max_depth: usize,
    /// Layouts used for class records that do not describe their member types
    pub layouts: LayoutRegistry,
}

impl ReaderOptions {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_layouts(mut self, layouts: LayoutRegistry) -> Self {
        self.layouts = layouts;
        self
    }
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            layouts: LayoutRegistry::default(),
        }
    }
}
