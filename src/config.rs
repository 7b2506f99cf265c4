// Search configuration and the `.cads` configuration-file loader.
//
// A `.cads` file is INI-like with two sections:
//
//   [config]    key=value pairs (all optional, defaults below)
//   [packets]   one packet per line: <hex-packet> <hex-checksum> [description]
//
// Lines starting with `#` are comments. CLI flags override file values; that
// merge lives in the CLI layer, not here.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::dataset::{Dataset, DatasetError, Packet};
use crate::ops::{Complexity, Op, UnknownOperation};

// ---------------------------------------------------------------------------
// Limits and defaults
// ---------------------------------------------------------------------------

/// Most fields a search may combine.
pub const MAX_FIELDS_LIMIT: usize = 16;

/// Most constants a search may sweep (all byte values).
pub const MAX_CONSTANTS_LIMIT: u64 = 256;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error type for configuration validation and file loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("max_fields {0} out of range 1..={MAX_FIELDS_LIMIT}")]
    MaxFields(usize),
    #[error("max_constants {0} out of range 1..={MAX_CONSTANTS_LIMIT}")]
    MaxConstants(u64),
    #[error("checksum_size {0} out of range 1..=8")]
    ChecksumSize(usize),
    #[error("line {1}: {0}")]
    Line(String, usize),
    #[error(transparent)]
    UnknownOperation(#[from] UnknownOperation),
    #[error("config file has neither a [config] nor a [packets] section")]
    NoSections,
    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

// ---------------------------------------------------------------------------
// SearchConfig
// ---------------------------------------------------------------------------

/// Read-only inputs of one search run.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Operator tier to search at (ignored when `custom_operations` is set).
    pub complexity: Complexity,
    /// Explicit operator list; overrides the tier when present.
    pub custom_operations: Option<Vec<Op>>,
    /// Most fields a candidate expression may combine (1..=16).
    pub max_fields: usize,
    /// Constants swept per permutation: `0..max_constants` (1..=256).
    pub max_constants: u64,
    /// Checksum width in bytes (1..=8).
    pub checksum_size: usize,
    /// Stop the whole search at the first solution.
    pub early_exit: bool,
    /// Cap on returned solutions; 0 means unlimited.
    pub max_solutions: u32,
    /// Worker thread count; 0 means one per logical core.
    pub threads: usize,
    /// Progress update cadence in milliseconds.
    pub progress_interval_ms: u64,
    /// Chatty output in the CLI layer.
    pub verbose: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            complexity: Complexity::Intermediate,
            custom_operations: None,
            max_fields: 4,
            max_constants: 128,
            checksum_size: 1,
            early_exit: false,
            max_solutions: 0,
            threads: 1,
            progress_interval_ms: 250,
            verbose: false,
        }
    }
}

impl SearchConfig {
    /// Validate range constraints. `max_fields > min_packet_len` is not an
    /// error: the search clamps it silently.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_fields == 0 || self.max_fields > MAX_FIELDS_LIMIT {
            return Err(ConfigError::MaxFields(self.max_fields));
        }
        if self.max_constants == 0 || self.max_constants > MAX_CONSTANTS_LIMIT {
            return Err(ConfigError::MaxConstants(self.max_constants));
        }
        if self.checksum_size == 0 || self.checksum_size > 8 {
            return Err(ConfigError::ChecksumSize(self.checksum_size));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// .cads file
// ---------------------------------------------------------------------------

/// A parsed `.cads` configuration file: search settings plus, optionally,
/// an inline dataset from the `[packets]` section.
#[derive(Debug, Clone)]
pub struct CadsFile {
    pub name: Option<String>,
    pub description: Option<String>,
    pub config: SearchConfig,
    pub dataset: Option<Dataset>,
}

impl CadsFile {
    /// Load and parse a `.cads` file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<CadsFile, ConfigError> {
        let text = fs::read_to_string(path.as_ref())?;
        CadsFile::parse(&text)
    }

    /// Parse `.cads` file content.
    pub fn parse(text: &str) -> Result<CadsFile, ConfigError> {
        #[derive(PartialEq)]
        enum Section {
            None,
            Config,
            Packets,
        }

        let mut section = Section::None;
        let mut saw_section = false;
        let mut name = None;
        let mut description = None;
        let mut config = SearchConfig::default();
        let mut packet_lines: Vec<(usize, String)> = Vec::new();

        for (index, raw) in text.lines().enumerate() {
            let line_number = index + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match line {
                "[config]" => {
                    section = Section::Config;
                    saw_section = true;
                    continue;
                }
                "[packets]" => {
                    section = Section::Packets;
                    saw_section = true;
                    continue;
                }
                _ => {}
            }

            match section {
                Section::None => {
                    return Err(ConfigError::Line(
                        format!("content outside any section: '{line}'"),
                        line_number,
                    ));
                }
                Section::Config => {
                    let (key, value) = line.split_once('=').ok_or_else(|| {
                        ConfigError::Line(format!("expected key=value, got '{line}'"), line_number)
                    })?;
                    apply_config_key(
                        &mut config,
                        &mut name,
                        &mut description,
                        key.trim(),
                        value.trim(),
                        line_number,
                    )?;
                }
                Section::Packets => packet_lines.push((line_number, line.to_string())),
            }
        }

        if !saw_section {
            return Err(ConfigError::NoSections);
        }

        let dataset = if packet_lines.is_empty() {
            None
        } else {
            let mut packets = Vec::with_capacity(packet_lines.len());
            for (line_number, line) in &packet_lines {
                packets.push(parse_packet_line(line, config.checksum_size, packets.len())
                    .map_err(|e| ConfigError::Line(e.to_string(), *line_number))?);
            }
            Some(Dataset::new(packets)?)
        };

        Ok(CadsFile {
            name,
            description,
            config,
            dataset,
        })
    }
}

fn apply_config_key(
    config: &mut SearchConfig,
    name: &mut Option<String>,
    description: &mut Option<String>,
    key: &str,
    value: &str,
    line_number: usize,
) -> Result<(), ConfigError> {
    let bad_int =
        |k: &str, v: &str| ConfigError::Line(format!("invalid {k} value '{v}'"), line_number);
    match key {
        "name" => *name = Some(value.to_string()),
        "description" => *description = Some(value.to_string()),
        "complexity" => {
            config.complexity = Complexity::parse(value).ok_or_else(|| {
                ConfigError::Line(format!("unknown complexity '{value}'"), line_number)
            })?;
        }
        "max_fields" => {
            config.max_fields = value.parse().map_err(|_| bad_int("max_fields", value))?;
        }
        "max_constants" => {
            config.max_constants = value.parse().map_err(|_| bad_int("max_constants", value))?;
        }
        "checksum_size" => {
            config.checksum_size = value.parse().map_err(|_| bad_int("checksum_size", value))?;
        }
        "early_exit" => config.early_exit = parse_bool(value),
        "max_solutions" => {
            config.max_solutions = value.parse().map_err(|_| bad_int("max_solutions", value))?;
        }
        "progress_interval" => {
            config.progress_interval_ms = value
                .parse()
                .map_err(|_| bad_int("progress_interval", value))?;
        }
        "verbose" => config.verbose = parse_bool(value),
        "threads" => {
            config.threads = value.parse().map_err(|_| bad_int("threads", value))?;
        }
        "operations" => {
            let ops = value
                .split(',')
                .map(Op::parse_name)
                .collect::<Result<Vec<_>, _>>()?;
            if !ops.is_empty() {
                config.custom_operations = Some(ops);
            }
        }
        // Unknown keys are tolerated so configs stay forward-compatible.
        _ => {}
    }
    Ok(())
}

/// Parse a `[packets]` line: `<hex-packet> <hex-checksum> [description...]`.
fn parse_packet_line(
    line: &str,
    checksum_size: usize,
    index: usize,
) -> Result<Packet, DatasetError> {
    let mut parts = line.split_whitespace();
    let packet_hex = parts.next().unwrap_or_default();
    let checksum_hex = parts.next().unwrap_or_default();
    let rest = parts.collect::<Vec<_>>().join(" ");
    let description = if rest.is_empty() {
        format!("Packet {}", index + 1)
    } else {
        rest
    };
    Packet::from_hex(packet_hex, checksum_hex, checksum_size, description)
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.to_ascii_lowercase().as_str(),
        "true" | "yes" | "1" | "on"
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = SearchConfig::default();
        assert_eq!(config.complexity, Complexity::Intermediate);
        assert_eq!(config.max_fields, 4);
        assert_eq!(config.max_constants, 128);
        assert_eq!(config.checksum_size, 1);
        assert!(!config.early_exit);
        assert_eq!(config.max_solutions, 0);
        assert_eq!(config.threads, 1);
        assert_eq!(config.progress_interval_ms, 250);
        assert!(!config.verbose);
    }

    #[test]
    fn validation_rejects_out_of_range_values() {
        let mut config = SearchConfig::default();
        config.max_fields = 0;
        assert!(config.validate().is_err());
        config.max_fields = 17;
        assert!(config.validate().is_err());
        config.max_fields = 4;
        config.max_constants = 257;
        assert!(config.validate().is_err());
        config.max_constants = 128;
        config.checksum_size = 9;
        assert!(config.validate().is_err());
        config.checksum_size = 8;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_full_config_section() {
        let file = CadsFile::parse(
            "[config]\n\
             name=MXT275 discovery\n\
             description=UART checksum hunt\n\
             complexity=advanced\n\
             max_fields=5\n\
             max_constants=256\n\
             checksum_size=1\n\
             early_exit=true\n\
             max_solutions=3\n\
             progress_interval=100\n\
             verbose=yes\n\
             threads=8\n",
        )
        .unwrap();
        assert_eq!(file.name.as_deref(), Some("MXT275 discovery"));
        assert_eq!(file.config.complexity, Complexity::Advanced);
        assert_eq!(file.config.max_fields, 5);
        assert_eq!(file.config.max_constants, 256);
        assert!(file.config.early_exit);
        assert_eq!(file.config.max_solutions, 3);
        assert_eq!(file.config.progress_interval_ms, 100);
        assert!(file.config.verbose);
        assert_eq!(file.config.threads, 8);
        assert!(file.dataset.is_none());
    }

    #[test]
    fn parse_operations_list() {
        let file = CadsFile::parse("[config]\noperations=identity, ADD, const_xor\n").unwrap();
        assert_eq!(
            file.config.custom_operations,
            Some(vec![Op::Identity, Op::Add, Op::ConstXor])
        );
    }

    #[test]
    fn unknown_operation_aborts() {
        let err = CadsFile::parse("[config]\noperations=add,warp_drive\n").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownOperation(_)));
    }

    #[test]
    fn parse_packets_section() {
        let file = CadsFile::parse(
            "[config]\n\
             checksum_size=1\n\
             [packets]\n\
             # CH1 and CH3\n\
             9c30010000000000  31  CH1\n\
             9c30030000000000  33\n",
        )
        .unwrap();
        let dataset = file.dataset.unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.packets()[0].description(), "CH1");
        assert_eq!(dataset.packets()[0].expected_checksum(), 0x31);
        assert_eq!(dataset.packets()[1].description(), "Packet 2");
    }

    #[test]
    fn packets_only_file_is_accepted() {
        let file = CadsFile::parse("[packets]\naabb 11 only\n").unwrap();
        assert!(file.dataset.is_some());
    }

    #[test]
    fn sectionless_file_is_rejected() {
        assert!(matches!(
            CadsFile::parse("max_fields=4\n"),
            Err(ConfigError::Line(_, _))
        ));
        assert!(matches!(CadsFile::parse("\n# empty\n"), Err(ConfigError::NoSections)));
    }

    #[test]
    fn bool_spellings() {
        for s in ["true", "YES", "1", "on"] {
            assert!(parse_bool(s));
        }
        for s in ["false", "no", "0", "off", "maybe"] {
            assert!(!parse_bool(s));
        }
    }
}
