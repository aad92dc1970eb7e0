//! Grouping of speedup measurements by problem size.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use tracing::{debug, warn};

use crate::record::{LogLine, ParseError};

/// An error aggregating a log.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The log could not be opened or read.
    #[error("unable to read log: {0}")]
    Io(#[from] io::Error),
    /// A marked line of the log could not be parsed.
    #[error("malformed log: {0}")]
    Parse(#[from] ParseError),
}

/// The summary of a group of consecutive measurements taken at the same problem size.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GroupStatistic {
    /// The problem size, i.e. the number of networks evaluated.
    pub size: u64,
    /// The number of measurements in the group.
    pub count: usize,
    /// The arithmetic mean of the measured speedups, or NaN if the group is empty.
    pub mean: f64,
    /// The population standard deviation of the measured speedups, or NaN if the group is empty.
    pub stddev: f64,
}

impl GroupStatistic {
    /// Summarize the speedups measured at the given problem size.
    pub fn from_samples(size: u64, samples: &[f64]) -> GroupStatistic {
        GroupStatistic {
            size,
            count: samples.len(),
            mean: mean(samples),
            stddev: population_stddev(samples),
        }
    }

    /// Whether or not the group had no measurements.
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// The arithmetic mean of the samples, or NaN if there are none.
pub fn mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return f64::NAN;
    }
    samples.iter().sum::<f64>() / samples.len() as f64
}

/// The population (ddof = 0) standard deviation of the samples, or NaN if there are none.
pub fn population_stddev(samples: &[f64]) -> f64 {
    let mean = mean(samples);
    let variance =
        samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / samples.len() as f64;
    variance.sqrt()
}

/// A streaming aggregator over the lines of a benchmark log.
///
/// A group starts whenever the log reports a problem size different from the active one, so
/// the same size appearing twice with another in between produces two groups.
#[derive(Debug, Default)]
pub struct Aggregator {
    current_size: Option<u64>,
    samples: Vec<f64>,
    stats: Vec<GroupStatistic>,
    line_number: usize,
    discarded: usize,
}

impl Aggregator {
    /// Create an aggregator with no active group.
    pub fn new() -> Aggregator {
        Aggregator::default()
    }

    /// Feed the next line of the log.
    pub fn push_line(&mut self, line: &str) -> Result<(), ParseError> {
        self.line_number += 1;
        match LogLine::parse(line).map_err(|e| e.at_line(self.line_number))? {
            LogLine::GroupStart(size) => self.start_group(size),
            LogLine::Measurement(speedup) => self.record(speedup),
            LogLine::GroupStartAndMeasurement(size, speedup) => {
                self.start_group(size);
                self.record(speedup);
            }
            LogLine::Other => {}
        }
        Ok(())
    }

    /// Close the final group, even if it is empty, and return the statistics of every group in
    /// the order they appeared.
    pub fn finish(mut self) -> Vec<GroupStatistic> {
        self.close_group();
        if self.discarded > 0 {
            warn!(count = self.discarded, "discarded measurements preceding the first group");
        }
        self.stats
    }

    fn start_group(&mut self, size: u64) {
        if self.current_size == Some(size) {
            return;
        }
        self.close_group();
        self.current_size = Some(size);
    }

    fn record(&mut self, speedup: f64) {
        if self.current_size.is_some() {
            self.samples.push(speedup);
        } else {
            self.discarded += 1;
        }
    }

    fn close_group(&mut self) {
        if let Some(size) = self.current_size {
            let stat = GroupStatistic::from_samples(size, &self.samples);
            debug!(size, count = stat.count, mean = stat.mean, stddev = stat.stddev, "group closed");
            self.stats.push(stat);
        }
        self.samples.clear();
    }
}

/// Aggregate the speedups of the log at the given path.
pub fn aggregate_file<P: AsRef<Path>>(path: P) -> Result<Vec<GroupStatistic>, Error> {
    let path = path.as_ref();
    debug!(path = %path.display(), "aggregating log");
    aggregate_reader(BufReader::new(File::open(path)?))
}

/// Aggregate the speedups of a log read line by line from the given reader.
pub fn aggregate_reader<R: BufRead>(reader: R) -> Result<Vec<GroupStatistic>, Error> {
    let mut aggregator = Aggregator::new();
    for line in reader.lines() {
        aggregator.push_line(&line?)?;
    }
    Ok(aggregator.finish())
}

/// Aggregate the speedups of an in-memory log.
pub fn aggregate_str(log: &str) -> Result<Vec<GroupStatistic>, ParseError> {
    let mut aggregator = Aggregator::new();
    for line in log.lines() {
        aggregator.push_line(line)?;
    }
    Ok(aggregator.finish())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use approx::assert_relative_eq;

    use super::*;
    use crate::record::Reason;

    fn group(size: u64) -> String {
        format!("/* Expanded genome set built (size: {}) */\n", size)
    }

    fn speedup(x: f64) -> String {
        format!("~*~*~*~* GPU speed up: {} *~*~*~*~\n", x)
    }

    #[test]
    fn statistics() {
        assert_relative_eq!(mean(&[2.0, 4.0]), 3.0);
        assert_relative_eq!(population_stddev(&[2.0, 4.0]), 1.0);
        assert_relative_eq!(mean(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), 5.0);
        assert_relative_eq!(population_stddev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), 2.0);
        assert_relative_eq!(population_stddev(&[7.5]), 0.0);
        assert!(mean(&[]).is_nan());
        assert!(population_stddev(&[]).is_nan());
    }

    #[test]
    fn single_group() {
        let log = "Expanded genome of 4, foo\nGPU speed up: 2.0 !\nGPU speed up: 4.0 !\n";
        let stats = aggregate_str(log).unwrap();

        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].size, 4);
        assert_eq!(stats[0].count, 2);
        assert_relative_eq!(stats[0].mean, 3.0);
        assert_relative_eq!(stats[0].stddev, 1.0);
    }

    #[test]
    fn two_groups() {
        let log = [group(4), speedup(5.0), group(8), speedup(10.0)].concat();
        let stats = aggregate_str(&log).unwrap();

        assert_eq!(
            stats,
            vec![
                GroupStatistic { size: 4, count: 1, mean: 5.0, stddev: 0.0 },
                GroupStatistic { size: 8, count: 1, mean: 10.0, stddev: 0.0 },
            ]
        );
    }

    #[test]
    fn repeated_sizes_share_a_group() {
        // the sweep prints one group start per run, so repeated runs at a size form one group
        let log = [
            group(1024),
            "12.1 ms for composite net evaluation. \n".to_owned(),
            speedup(3.0),
            group(1024),
            speedup(5.0),
            group(2048),
            speedup(8.0),
            group(1024),
            speedup(1.0),
        ]
        .concat();
        let stats = aggregate_str(&log).unwrap();

        let sizes: Vec<u64> = stats.iter().map(|s| s.size).collect();
        assert_eq!(sizes, vec![1024, 2048, 1024]);
        assert_eq!(stats[0].count, 2);
        assert_relative_eq!(stats[0].mean, 4.0);
        assert_relative_eq!(stats[0].stddev, 1.0);
        assert_relative_eq!(stats[1].mean, 8.0);
        assert_relative_eq!(stats[2].mean, 1.0);
    }

    #[test]
    fn group_start_and_measurement_on_one_line() {
        let stats = aggregate_str("Expanded genome GPU speed up 41 !\n").unwrap();
        assert_eq!(stats, vec![GroupStatistic { size: 4, count: 1, mean: 41.0, stddev: 0.0 }]);

        // the line continues the active group when the size is unchanged
        let both = "Expanded genome GPU speed up 41 !\n".to_owned();
        let log = [group(4), speedup(1.0), both].concat();
        let stats = aggregate_str(&log).unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].count, 2);
        assert_relative_eq!(stats[0].mean, 21.0);
        assert_relative_eq!(stats[0].stddev, 20.0);
    }

    #[test]
    fn empty_final_group() {
        let stats = aggregate_str(&group(16)).unwrap();

        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].size, 16);
        assert!(stats[0].is_empty());
        assert!(stats[0].mean.is_nan());
        assert!(stats[0].stddev.is_nan());
    }

    #[test]
    fn empty_inner_group() {
        let log = [group(16), group(32), speedup(2.0)].concat();
        let stats = aggregate_str(&log).unwrap();

        assert_eq!(stats.len(), 2);
        assert!(stats[0].is_empty());
        assert_relative_eq!(stats[1].mean, 2.0);
    }

    #[test]
    fn measurements_before_first_group() {
        let log = [speedup(100.0), group(4), speedup(2.0)].concat();
        let stats = aggregate_str(&log).unwrap();

        assert_eq!(stats, vec![GroupStatistic { size: 4, count: 1, mean: 2.0, stddev: 0.0 }]);
    }

    #[test]
    fn no_groups() {
        assert_eq!(aggregate_str("").unwrap(), vec![]);
        assert_eq!(aggregate_str(&speedup(2.0)).unwrap(), vec![]);
    }

    #[test]
    fn malformed_measurement() {
        let log = [group(4), speedup(2.0), "GPU speed up of abc\n".to_owned()].concat();
        let err = aggregate_str(&log).unwrap_err();

        assert_eq!(err.line_number, 3);
        assert_eq!(err.reason, Reason::InvalidSpeedup("of".to_owned()));
    }

    #[test]
    fn malformed_size() {
        let err = aggregate_str("Expanded genome of many, foo\n").unwrap_err();

        assert_eq!(err.line_number, 1);
        assert_eq!(err.reason, Reason::InvalidSize("many,".to_owned()));
    }

    #[test]
    fn file() {
        let mut log = tempfile::NamedTempFile::new().unwrap();
        for size in [1024, 2048] {
            write!(log, "{}{}{}", group(size), speedup(2.0), speedup(6.0)).unwrap();
        }
        log.flush().unwrap();

        let first = aggregate_file(log.path()).unwrap();
        let second = aggregate_file(log.path()).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert_relative_eq!(first[1].mean, 4.0);
        assert_relative_eq!(first[1].stddev, 2.0);
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        match aggregate_file(dir.path().join("missing.log")) {
            Err(Error::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::NotFound),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn malformed_file() {
        let mut log = tempfile::NamedTempFile::new().unwrap();
        writeln!(log, "{}GPU speed up of abc", group(4)).unwrap();
        log.flush().unwrap();

        assert!(matches!(aggregate_file(log.path()), Err(Error::Parse(_))));
    }
}
