//! CloudWatch Logs shipping configuration

use super::{non_empty, non_zero};
use crate::attribute::{check_one_of, check_range};
use crate::error::{LayerError, Result};
use opsflow_cloud::{CloudWatchLogsConfiguration, CloudWatchLogsLogStream};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BATCH_COUNT: i64 = 1000;
pub const DEFAULT_BATCH_SIZE: i64 = 32768;
pub const DEFAULT_BUFFER_DURATION: i64 = 5000;
pub const DEFAULT_ENCODING: &str = "utf_8";
pub const DEFAULT_FILE_FINGERPRINT_LINES: &str = "1";
pub const DEFAULT_INITIAL_POSITION: &str = "start_of_file";

const MAX_BATCH_COUNT: i64 = 10_000;
const MAX_BATCH_SIZE: i64 = 1_048_576;

const INITIAL_POSITIONS: &[&str] = &["start_of_file", "end_of_file"];
const TIME_ZONES: &[&str] = &["LOCAL", "UTC"];

/// Python codec names accepted by the CloudWatch Logs agent
pub const ENCODINGS: &[&str] = &[
    "ascii", "big5", "big5hkscs", "cp037", "cp424", "cp437", "cp500", "cp720", "cp737", "cp775",
    "cp850", "cp852", "cp855", "cp856", "cp857", "cp858", "cp860", "cp861", "cp862", "cp863",
    "cp864", "cp865", "cp866", "cp869", "cp874", "cp875", "cp932", "cp949", "cp950", "cp1006",
    "cp1026", "cp1140", "cp1250", "cp1251", "cp1252", "cp1253", "cp1254", "cp1255", "cp1256",
    "cp1257", "cp1258", "euc_jp", "euc_jis_2004", "euc_jisx0213", "euc_kr", "gb2312", "gbk",
    "gb18030", "hz", "iso2022_jp", "iso2022_jp_1", "iso2022_jp_2", "iso2022_jp_2004",
    "iso2022_jp_3", "iso2022_jp_ext", "iso2022_kr", "latin_1", "iso8859_2", "iso8859_3",
    "iso8859_4", "iso8859_5", "iso8859_6", "iso8859_7", "iso8859_8", "iso8859_9", "iso8859_10",
    "iso8859_13", "iso8859_14", "iso8859_15", "iso8859_16", "johab", "koi8_r", "koi8_u",
    "mac_cyrillic", "mac_greek", "mac_iceland", "mac_latin2", "mac_roman", "mac_turkish",
    "ptcp154", "shift_jis", "shift_jis_2004", "shift_jisx0213", "utf_32", "utf_32_be",
    "utf_32_le", "utf_16", "utf_16_be", "utf_16_le", "utf_7", "utf_8", "utf_8_sig",
];

/// Log shipping for every instance in the layer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudWatchLogConfig {
    pub enabled: bool,
    pub log_streams: Vec<LogStreamConfig>,
}

/// One shipped log file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogStreamConfig {
    /// Path or glob of the file(s) to ship
    pub file: String,
    pub log_group_name: String,
    pub batch_count: i64,
    pub batch_size: i64,
    /// Milliseconds
    pub buffer_duration: i64,
    pub datetime_format: String,
    pub encoding: String,
    pub file_fingerprint_lines: String,
    pub initial_position: String,
    pub multiline_start_pattern: String,
    pub time_zone: String,
}

impl Default for LogStreamConfig {
    fn default() -> Self {
        Self {
            file: String::new(),
            log_group_name: String::new(),
            batch_count: DEFAULT_BATCH_COUNT,
            batch_size: DEFAULT_BATCH_SIZE,
            buffer_duration: DEFAULT_BUFFER_DURATION,
            datetime_format: String::new(),
            encoding: DEFAULT_ENCODING.to_string(),
            file_fingerprint_lines: DEFAULT_FILE_FINGERPRINT_LINES.to_string(),
            initial_position: DEFAULT_INITIAL_POSITION.to_string(),
            multiline_start_pattern: String::new(),
            time_zone: String::new(),
        }
    }
}

impl LogStreamConfig {
    pub fn new(file: impl Into<String>, log_group_name: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            log_group_name: log_group_name.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.file.is_empty() {
            return Err(LayerError::Validation(
                "cloudwatch_configuration.log_streams.file is required".to_string(),
            ));
        }
        if self.log_group_name.is_empty() {
            return Err(LayerError::Validation(
                "cloudwatch_configuration.log_streams.log_group_name is required".to_string(),
            ));
        }

        check_range("batch_count", self.batch_count, 0, MAX_BATCH_COUNT)?;
        check_range("batch_size", self.batch_size, 0, MAX_BATCH_SIZE)?;
        if self.buffer_duration != 0 {
            check_range(
                "buffer_duration",
                self.buffer_duration,
                DEFAULT_BUFFER_DURATION,
                i64::MAX,
            )?;
        }
        if !self.encoding.is_empty() {
            check_one_of("encoding", &self.encoding, ENCODINGS)?;
        }
        if !self.initial_position.is_empty() {
            check_one_of("initial_position", &self.initial_position, INITIAL_POSITIONS)?;
        }
        if !self.time_zone.is_empty() {
            check_one_of("time_zone", &self.time_zone, TIME_ZONES)?;
        }

        Ok(())
    }
}

impl CloudWatchLogConfig {
    pub fn validate(&self) -> Result<()> {
        self.log_streams.iter().try_for_each(LogStreamConfig::validate)
    }
}

pub fn expand(config: &CloudWatchLogConfig) -> CloudWatchLogsConfiguration {
    CloudWatchLogsConfiguration {
        enabled: Some(config.enabled),
        log_streams: if config.log_streams.is_empty() {
            None
        } else {
            Some(config.log_streams.iter().map(expand_stream).collect())
        },
    }
}

fn expand_stream(stream: &LogStreamConfig) -> CloudWatchLogsLogStream {
    CloudWatchLogsLogStream {
        batch_count: non_zero(stream.batch_count),
        batch_size: non_zero(stream.batch_size),
        buffer_duration: non_zero(stream.buffer_duration),
        datetime_format: non_empty(&stream.datetime_format),
        encoding: non_empty(&stream.encoding),
        file: non_empty(&stream.file),
        file_fingerprint_lines: non_empty(&stream.file_fingerprint_lines),
        initial_position: non_empty(&stream.initial_position),
        log_group_name: non_empty(&stream.log_group_name),
        multi_line_start_pattern: non_empty(&stream.multiline_start_pattern),
        time_zone: non_empty(&stream.time_zone),
    }
}

/// Remote-side defaults are substituted for absent fields so that a stream
/// read back compares equal to the one that was written.
pub fn flatten(remote: &CloudWatchLogsConfiguration) -> CloudWatchLogConfig {
    CloudWatchLogConfig {
        enabled: remote.enabled.unwrap_or(false),
        log_streams: remote
            .log_streams
            .iter()
            .flatten()
            .map(flatten_stream)
            .collect(),
    }
}

fn flatten_stream(remote: &CloudWatchLogsLogStream) -> LogStreamConfig {
    let defaults = LogStreamConfig::default();
    LogStreamConfig {
        file: remote.file.clone().unwrap_or_default(),
        log_group_name: remote.log_group_name.clone().unwrap_or_default(),
        batch_count: remote.batch_count.unwrap_or(defaults.batch_count),
        batch_size: remote.batch_size.unwrap_or(defaults.batch_size),
        buffer_duration: remote.buffer_duration.unwrap_or(defaults.buffer_duration),
        datetime_format: remote.datetime_format.clone().unwrap_or_default(),
        encoding: remote.encoding.clone().unwrap_or(defaults.encoding),
        file_fingerprint_lines: remote
            .file_fingerprint_lines
            .clone()
            .unwrap_or(defaults.file_fingerprint_lines),
        initial_position: remote
            .initial_position
            .clone()
            .unwrap_or(defaults.initial_position),
        multiline_start_pattern: remote.multi_line_start_pattern.clone().unwrap_or_default(),
        time_zone: remote.time_zone.clone().unwrap_or_default(),
    }
}
