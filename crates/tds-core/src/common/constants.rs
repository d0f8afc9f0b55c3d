//! File names and fixed markers shared by the XD file modules.

pub const MASTER_FILE: &str = "xd.mas";
pub const INSTRUCTION_FILE: &str = "xd.inp";
pub const REFLECTION_FILE: &str = "xd.hkl";
pub const CALCULATED_FILE: &str = "xd.fco";
pub const RESULT_FILE: &str = "xd.res";
pub const SCALED_REFLECTION_FILE: &str = "xd_scaled.hkl";
pub const CHAIN_MANIFEST_FILE: &str = "xd-tds-chain.json";

/// Stem shared by the working files and their numbered snapshots.
pub const XD_STEM: &str = "xd";

pub const ANNOTATION_PREFIX: &str = "!TDS CORRECTION FACTOR:";
pub const COMMENT_MARKER: char = '!';

/// Columns every reflection row must carry: h, k, l, batch, F^2, sigma.
pub const MIN_REFLECTION_COLUMNS: usize = 6;

/// Header lines XD writes ahead of the reflection table in `xd.fco`.
pub const DEFAULT_FCO_HEADER_LINES: usize = 26;
pub const DEFAULT_SCALE_COUNT: usize = 12;
pub const DEFAULT_CYCLES: usize = 2;
pub const DEFAULT_PROGRAM: &str = "xdlsm";
pub const DEFAULT_SAVED_EXTENSIONS: [&str; 6] = ["hkl", "fco", "res", "inp", "fou", "mas"];

/// Extensions the workflow reads back from snapshots and therefore must save.
pub const REQUIRED_SAVED_EXTENSIONS: [&str; 4] = ["hkl", "fco", "inp", "mas"];

/// Scale-factor starting values XD expects per line of `xd.inp`.
pub const SCALE_VALUES_PER_LINE: usize = 6;
/// Position of the scale-factor count among the numbers of the `USAGE` line.
pub const USAGE_SCALE_COUNT_INDEX: usize = 5;
