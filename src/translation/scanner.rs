/// Where the cursor sits while walking a statement. Only `Code` is searched
/// for `?` markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Region {
    Code,
    /// `'...'`, with `''` as an escaped quote.
    Literal,
    /// `"..."` identifier, with `""` as an escaped quote.
    Identifier,
    LineComment,
    /// Nesting depth of `/* */` comments.
    BlockComment(u32),
    /// Body of a `$tag$ ... $tag$` string.
    DollarQuoted(String),
}

impl Region {
    /// Region after a `*/` at the given depth.
    pub(super) fn leave_block_comment(depth: u32) -> Region {
        if depth <= 1 {
            Region::Code
        } else {
            Region::BlockComment(depth - 1)
        }
    }
}
