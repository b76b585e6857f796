use crate::{charset::CharsetRegistry, metrics::Px};

pub const DEFAULT_CELL_PADDING: Px = 16;
pub const DEFAULT_MAX_TABLE_SIZE: usize = 4000;

/// How pipe tables pick their column alignment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PipeDialect {
    /// Org when a separator row uses `+` junctions, markdown otherwise.
    #[default]
    Auto,
    /// Alignment comes from `:` markers on the separator row.
    Markdown,
    /// Alignment is voted from the padding of each column's cells.
    Org,
}

/// Plain values the host hands to every layout call.
#[derive(Clone, Debug)]
pub struct AlignConfig {
    /// Fixed padding added to every column's widest content.
    pub cell_padding: Px,
    /// Draw pipe delimiters as full-height rules.
    pub full_height_bar: bool,
    pub pipe_dialect: PipeDialect,
    /// Tables spanning more bytes than this are left unaligned.
    pub max_table_size: usize,
    pub charsets: CharsetRegistry,
}

impl Default for AlignConfig {
    fn default() -> Self {
        Self {
            cell_padding: DEFAULT_CELL_PADDING,
            full_height_bar: false,
            pipe_dialect: PipeDialect::Auto,
            max_table_size: DEFAULT_MAX_TABLE_SIZE,
            charsets: CharsetRegistry::default(),
        }
    }
}
