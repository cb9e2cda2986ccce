//! Translation table from option keys to RePKG command-line flags.
//!
//! This is the only place RePKG flag strings appear. When the tool's CLI
//! changes, update the entries here; the orchestrator never names a flag.

use crate::options::Mode;

const BOTH: &[Mode] = &[Mode::Extract, Mode::Info];
const EXTRACT: &[Mode] = &[Mode::Extract];
const INFO: &[Mode] = &[Mode::Info];

/// Value shape accepted for an option key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// On/off switch; emitted as the bare flag when true.
    Bool,
    /// Free text; emitted as `flag value` when non-empty.
    Text,
    /// Comma-separated list of file extensions.
    ExtensionList,
    /// One of a fixed set of words.
    Choice(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy)]
pub struct FlagSpec {
    pub key: &'static str,
    pub modes: &'static [Mode],
    pub kind: ValueKind,
    /// `None` for options consumed by the orchestrator itself.
    pub flag: Option<&'static str>,
    pub description: &'static str,
}

impl FlagSpec {
    pub fn applies_to(&self, mode: Mode) -> bool {
        self.modes.contains(&mode)
    }
}

pub const SORT_CHOICES: &[&str] = &["name", "extension", "size"];

pub const FLAG_TABLE: &[FlagSpec] = &[
    FlagSpec {
        key: "recursive",
        modes: BOTH,
        kind: ValueKind::Bool,
        flag: None,
        description: "Descend into sub-folders of folder inputs",
    },
    FlagSpec {
        key: "tex",
        modes: EXTRACT,
        kind: ValueKind::Bool,
        flag: Some("-t"),
        description: "Convert all TEX files into images",
    },
    FlagSpec {
        key: "singledir",
        modes: EXTRACT,
        kind: ValueKind::Bool,
        flag: Some("-s"),
        description: "Put all extracted files in one directory instead of their entry path",
    },
    FlagSpec {
        key: "usename",
        modes: EXTRACT,
        kind: ValueKind::Bool,
        flag: Some("-n"),
        description: "Use the name from project.json as project subfolder name instead of id",
    },
    FlagSpec {
        key: "no_tex_convert",
        modes: EXTRACT,
        kind: ValueKind::Bool,
        flag: Some("--no-tex-convert"),
        description: "Don't convert TEX files into images while extracting PKG",
    },
    FlagSpec {
        key: "overwrite",
        modes: EXTRACT,
        kind: ValueKind::Bool,
        flag: Some("--overwrite"),
        description: "Overwrite all existing files",
    },
    FlagSpec {
        key: "copyproject",
        modes: EXTRACT,
        kind: ValueKind::Bool,
        flag: Some("-c"),
        description: "Copy project.json and preview.jpg from beside PKG into output directory",
    },
    FlagSpec {
        key: "exts_only",
        modes: EXTRACT,
        kind: ValueKind::ExtensionList,
        flag: Some("-e"),
        description: "Only extract files with these extensions",
    },
    FlagSpec {
        key: "exts_ignore",
        modes: EXTRACT,
        kind: ValueKind::ExtensionList,
        flag: Some("-i"),
        description: "Don't extract files with these extensions",
    },
    FlagSpec {
        key: "sortby",
        modes: INFO,
        kind: ValueKind::Choice(SORT_CHOICES),
        flag: Some("-b"),
        description: "Sort entries by name, extension or size",
    },
    FlagSpec {
        key: "sort",
        modes: INFO,
        kind: ValueKind::Bool,
        flag: Some("-s"),
        description: "Sort entries ascending",
    },
    FlagSpec {
        key: "printentries",
        modes: INFO,
        kind: ValueKind::Bool,
        flag: Some("-e"),
        description: "Print entries in packages",
    },
    FlagSpec {
        key: "info_tex",
        modes: INFO,
        kind: ValueKind::Bool,
        flag: Some("-t"),
        description: "Dump info about all TEX files",
    },
    FlagSpec {
        key: "projectinfo",
        modes: INFO,
        kind: ValueKind::Text,
        flag: Some("-p"),
        description: "Project.json keys to print",
    },
    FlagSpec {
        key: "title_filter",
        modes: INFO,
        kind: ValueKind::Text,
        flag: Some("--title-filter"),
        description: "Only show projects whose title matches",
    },
];

/// Flag that carries the output directory in extract mode.
pub const OUTPUT_FLAG: &str = "-o";

pub fn lookup(key: &str) -> Option<&'static FlagSpec> {
    FLAG_TABLE.iter().find(|spec| spec.key == key)
}

pub fn keys_for(mode: Mode) -> Vec<&'static str> {
    FLAG_TABLE
        .iter()
        .filter(|spec| spec.applies_to(mode))
        .map(|spec| spec.key)
        .collect()
}
